//! Tokens produced by the byte tokenizer and consumed by the input decoder.

use std::fmt::Write as _;

/// Control sequence introduced by `ESC [`.
///
/// Parameters are split on `;` and sub-parameters on `:`. Empty fields read as 0. Private
/// markers (`<`, `=`, `>`, `?`) and intermediates (0x20..=0x2F) are both kept in
/// `intermediates`, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Csi {
    pub params: Vec<Vec<u32>>,
    pub intermediates: Vec<u8>,
    pub final_byte: char,
}

impl Csi {
    /// First sub-parameter of parameter `index`.
    pub fn param(&self, index: usize) -> Option<u32> {
        self.params.get(index).and_then(|sub| sub.first().copied())
    }

    pub fn param_or(&self, index: usize, default: u32) -> u32 {
        self.param(index).unwrap_or(default)
    }

    pub fn subparam(&self, index: usize, sub: usize) -> Option<u32> {
        self.params.get(index).and_then(|group| group.get(sub).copied())
    }

    pub fn private_marker(&self) -> Option<u8> {
        self.intermediates
            .first()
            .copied()
            .filter(|byte| is_private_marker(*byte))
    }

    pub fn has_intermediate(&self, byte: u8) -> bool {
        self.intermediates.contains(&byte)
    }
}

fn is_private_marker(byte: u8) -> bool {
    matches!(byte, b'<' | b'=' | b'>' | b'?')
}

/// Markers, then parameters, then the remaining intermediates.
fn push_sequence_body(out: &mut String, params: &[Vec<u32>], intermediates: &[u8], final_byte: char) {
    for byte in intermediates.iter().filter(|byte| is_private_marker(**byte)) {
        out.push(char::from(*byte));
    }
    for (index, group) in params.iter().enumerate() {
        if index > 0 {
            out.push(';');
        }
        for (sub, value) in group.iter().enumerate() {
            if sub > 0 {
                out.push(':');
            }
            let _ = write!(out, "{value}");
        }
    }
    for byte in intermediates.iter().filter(|byte| !is_private_marker(**byte)) {
        out.push(char::from(*byte));
    }
    out.push(final_byte);
}

/// Device control string: `ESC P params intermediates final data ST`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dcs {
    pub params: Vec<Vec<u32>>,
    pub intermediates: Vec<u8>,
    pub final_byte: char,
    pub data: String,
}

impl Dcs {
    pub fn param(&self, index: usize) -> Option<u32> {
        self.params.get(index).and_then(|sub| sub.first().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Print(char),
    /// C0 control byte, including DEL and a lone ESC flushed by timeout.
    C0(char),
    /// `ESC` followed by one character.
    Esc(char),
    /// `ESC O` followed by one character.
    Ss3(char),
    Csi(Csi),
    Osc(String),
    Dcs(Dcs),
    Apc(String),
}

impl Token {
    /// Append the token as it appeared on the wire. Empty parameter fields come back as `0`.
    pub fn encode_into(&self, out: &mut String) {
        match self {
            Token::Print(ch) | Token::C0(ch) => out.push(*ch),
            Token::Esc(ch) => {
                out.push('\x1b');
                out.push(*ch);
            }
            Token::Ss3(ch) => {
                out.push_str("\x1bO");
                out.push(*ch);
            }
            Token::Csi(csi) => {
                out.push_str("\x1b[");
                push_sequence_body(out, &csi.params, &csi.intermediates, csi.final_byte);
            }
            Token::Osc(payload) => {
                out.push_str("\x1b]");
                out.push_str(payload);
                out.push_str("\x1b\\");
            }
            Token::Dcs(dcs) => {
                out.push_str("\x1bP");
                push_sequence_body(out, &dcs.params, &dcs.intermediates, dcs.final_byte);
                out.push_str(&dcs.data);
                out.push_str("\x1b\\");
            }
            Token::Apc(payload) => {
                out.push_str("\x1b_");
                out.push_str(payload);
                out.push_str("\x1b\\");
            }
        }
    }
}
