//! Byte stream tokenizer.
//!
//! Splits raw terminal input into [`Token`]s. Incomplete sequences stay buffered until more bytes
//! arrive or the flush deadline passes, so a split read never reorders or duplicates input.

use std::time::{Duration, Instant};

use crate::core::token::{Csi, Dcs, Token};
use crate::logging::escape_for_log;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
const REPLACEMENT: char = '\u{fffd}';

pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 10;

#[derive(Debug)]
enum Scan {
    Token(Token, usize),
    Incomplete,
    /// Drop this many bytes and resume.
    Malformed(usize),
}

/// Buffers input bytes and emits complete tokens.
#[derive(Debug)]
pub struct Tokenizer {
    pending: Vec<u8>,
    timeout_ms: u64,
    flush_deadline: Option<Instant>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_TIMEOUT_MS)
    }
}

impl Tokenizer {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            pending: Vec::new(),
            timeout_ms,
            flush_deadline: None,
        }
    }

    pub fn process(&mut self, data: &[u8]) -> Vec<Token> {
        self.flush_deadline = None;
        self.pending.extend_from_slice(data);

        let mut tokens = Vec::new();
        let mut pos = 0;
        while pos < self.pending.len() {
            match scan(&self.pending[pos..]) {
                Scan::Token(token, used) => {
                    tokens.push(token);
                    pos += used;
                }
                Scan::Malformed(used) => {
                    tracing::debug!(
                        bytes = %escape_for_log(&self.pending[pos..pos + used]),
                        "dropping malformed input sequence"
                    );
                    pos += used;
                }
                Scan::Incomplete => break,
            }
        }
        self.pending.drain(..pos);

        if !self.pending.is_empty() {
            self.flush_deadline = Some(Instant::now() + Duration::from_millis(self.timeout_ms));
        }
        tokens
    }

    pub fn flush_due(&mut self, now: Instant) -> Vec<Token> {
        match self.flush_deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => Vec::new(),
        }
    }

    /// Milliseconds the reader may block before [`Tokenizer::flush_due`] has work.
    pub fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        if let Some(deadline) = self.flush_deadline {
            let remaining = deadline.saturating_duration_since(now);
            let ms = remaining.as_millis().min(i32::MAX as u128) as i32;
            return ms.min(default_ms).max(0);
        }
        default_ms
    }

    /// Resolve whatever is buffered without waiting for more bytes.
    ///
    /// A lone ESC is the Escape key. ESC plus a single introducer byte is an Alt chord. Any other
    /// partial sequence is dropped.
    pub fn flush(&mut self) -> Vec<Token> {
        self.flush_deadline = None;
        if self.pending.is_empty() {
            return Vec::new();
        }
        let pending = std::mem::take(&mut self.pending);
        let token = match pending.as_slice() {
            [ESC] => Some(Token::C0('\x1b')),
            [ESC, next] if next.is_ascii() => Some(Token::Esc(*next as char)),
            [ESC, ..] => None,
            _ => Some(Token::Print(REPLACEMENT)),
        };
        if token.is_none() {
            tracing::debug!(
                bytes = %escape_for_log(&pending),
                "dropping incomplete input sequence"
            );
        }
        token.into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.flush_deadline = None;
        self.pending.clear();
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

fn scan(buf: &[u8]) -> Scan {
    if buf[0] != ESC {
        return scan_text(buf);
    }
    let Some(&introducer) = buf.get(1) else {
        return Scan::Incomplete;
    };
    match introducer {
        b'[' => scan_csi(buf),
        b']' => scan_string(buf).map(|payload| Token::Osc(lossy(payload))),
        b'_' => scan_string(buf).map(|payload| Token::Apc(lossy(payload))),
        b'P' => scan_dcs(buf),
        b'O' => match buf.get(2) {
            None => Scan::Incomplete,
            Some(&byte) if (0x20..0x7f).contains(&byte) => Scan::Token(Token::Ss3(byte as char), 3),
            Some(_) => Scan::Malformed(2),
        },
        _ => match scan_text(&buf[1..]) {
            Scan::Token(Token::Print(ch) | Token::C0(ch), used) => {
                Scan::Token(Token::Esc(ch), used + 1)
            }
            Scan::Incomplete => Scan::Incomplete,
            _ => Scan::Malformed(1),
        },
    }
}

fn scan_text(buf: &[u8]) -> Scan {
    let first = buf[0];
    if first < 0x20 || first == 0x7f {
        return Scan::Token(Token::C0(first as char), 1);
    }
    let len = match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Scan::Token(Token::Print(REPLACEMENT), 1),
    };
    if buf.len() < len {
        // A continuation byte that cannot start a valid sequence will never complete.
        if buf[1..].iter().any(|byte| byte & 0xc0 != 0x80) {
            return Scan::Token(Token::Print(REPLACEMENT), 1);
        }
        return Scan::Incomplete;
    }
    match std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|text| text.chars().next())
    {
        Some(ch) => Scan::Token(Token::Print(ch), len),
        None => Scan::Token(Token::Print(REPLACEMENT), 1),
    }
}

/// Parameters, intermediates and the final byte of a CSI or DCS header.
struct Header {
    params: Vec<Vec<u32>>,
    intermediates: Vec<u8>,
    final_byte: char,
}

enum HeaderScan {
    Done(Header, usize),
    Incomplete,
    Malformed(usize),
}

fn scan_header(buf: &[u8], start: usize) -> HeaderScan {
    let mut params: Vec<Vec<u32>> = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    let mut value: Option<u32> = None;
    let mut intermediates = Vec::new();
    let mut seen_param = false;

    for (offset, &byte) in buf[start..].iter().enumerate() {
        match byte {
            b'0'..=b'9' => {
                seen_param = true;
                let digit = (byte - b'0') as u32;
                value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
            }
            b':' => {
                seen_param = true;
                current.push(value.take().unwrap_or(0));
            }
            b';' => {
                seen_param = true;
                current.push(value.take().unwrap_or(0));
                params.push(std::mem::take(&mut current));
            }
            b'<'..=b'?' | 0x20..=0x2f => intermediates.push(byte),
            0x40..=0x7e => {
                if seen_param {
                    current.push(value.take().unwrap_or(0));
                    params.push(current);
                }
                let header = Header {
                    params,
                    intermediates,
                    final_byte: byte as char,
                };
                return HeaderScan::Done(header, start + offset + 1);
            }
            _ => return HeaderScan::Malformed(start + offset),
        }
    }
    HeaderScan::Incomplete
}

fn scan_csi(buf: &[u8]) -> Scan {
    match scan_header(buf, 2) {
        HeaderScan::Done(header, used) => Scan::Token(
            Token::Csi(Csi {
                params: header.params,
                intermediates: header.intermediates,
                final_byte: header.final_byte,
            }),
            used,
        ),
        HeaderScan::Incomplete => Scan::Incomplete,
        HeaderScan::Malformed(used) => Scan::Malformed(used),
    }
}

fn scan_dcs(buf: &[u8]) -> Scan {
    let (header, header_end) = match scan_header(buf, 2) {
        HeaderScan::Done(header, used) => (header, used),
        HeaderScan::Incomplete => return Scan::Incomplete,
        HeaderScan::Malformed(used) => return Scan::Malformed(used),
    };
    match find_terminator(buf, header_end, false) {
        Terminator::Found { payload_end, used } => Scan::Token(
            Token::Dcs(Dcs {
                params: header.params,
                intermediates: header.intermediates,
                final_byte: header.final_byte,
                data: lossy(&buf[header_end..payload_end]),
            }),
            used,
        ),
        Terminator::Incomplete => Scan::Incomplete,
        Terminator::Aborted(used) => Scan::Malformed(used),
    }
}

enum Terminator {
    Found { payload_end: usize, used: usize },
    Incomplete,
    /// An ESC not followed by `\` cut the string short.
    Aborted(usize),
}

fn find_terminator(buf: &[u8], start: usize, allow_bel: bool) -> Terminator {
    let mut i = start;
    while i < buf.len() {
        match buf[i] {
            BEL if allow_bel => {
                return Terminator::Found {
                    payload_end: i,
                    used: i + 1,
                }
            }
            ESC => {
                return match buf.get(i + 1) {
                    None => Terminator::Incomplete,
                    Some(b'\\') => Terminator::Found {
                        payload_end: i,
                        used: i + 2,
                    },
                    Some(_) => Terminator::Aborted(i),
                }
            }
            _ => i += 1,
        }
    }
    Terminator::Incomplete
}

/// OSC and APC: payload runs to ST, or BEL for OSC.
fn scan_string(buf: &[u8]) -> StringScan<'_> {
    let allow_bel = buf[1] == b']';
    match find_terminator(buf, 2, allow_bel) {
        Terminator::Found { payload_end, used } => StringScan::Found(&buf[2..payload_end], used),
        Terminator::Incomplete => StringScan::Incomplete,
        Terminator::Aborted(used) => StringScan::Aborted(used),
    }
}

enum StringScan<'a> {
    Found(&'a [u8], usize),
    Incomplete,
    Aborted(usize),
}

impl StringScan<'_> {
    fn map(self, f: impl FnOnce(&[u8]) -> Token) -> Scan {
        match self {
            StringScan::Found(payload, used) => Scan::Token(f(payload), used),
            StringScan::Incomplete => Scan::Incomplete,
            StringScan::Aborted(used) => Scan::Malformed(used),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::Tokenizer;
    use crate::core::token::{Csi, Dcs, Token};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    fn csi(params: &[&[u32]], intermediates: &[u8], final_byte: char) -> Token {
        Token::Csi(Csi {
            params: params.iter().map(|p| p.to_vec()).collect(),
            intermediates: intermediates.to_vec(),
            final_byte,
        })
    }

    #[test]
    fn text_and_controls() {
        let mut tokenizer = Tokenizer::default();
        let tokens = tokenizer.process("a\ré\x7f".as_bytes());
        assert_eq!(
            tokens,
            vec![
                Token::Print('a'),
                Token::C0('\r'),
                Token::Print('é'),
                Token::C0('\x7f'),
            ]
        );
    }

    #[test]
    fn splits_partial_sequences() {
        let mut tokenizer = Tokenizer::default();
        assert!(tokenizer.process(b"\x1b").is_empty());
        assert!(tokenizer.process(b"[<35").is_empty());
        let tokens = tokenizer.process(b";20;5m");
        assert_eq!(tokens, vec![csi(&[&[35], &[20], &[5]], b"<", 'm')]);
    }

    #[test]
    fn split_utf8_waits_for_continuation() {
        let mut tokenizer = Tokenizer::default();
        let bytes = "漢".as_bytes();
        assert!(tokenizer.process(&bytes[..2]).is_empty());
        assert_eq!(tokenizer.process(&bytes[2..]), vec![Token::Print('漢')]);
    }

    #[test]
    fn subparams_and_empty_fields() {
        let mut tokenizer = Tokenizer::default();
        let tokens = tokenizer.process(b"\x1b[97:65;2:3;65u\x1b[;5H\x1b[A");
        assert_eq!(
            tokens,
            vec![
                csi(&[&[97, 65], &[2, 3], &[65]], b"", 'u'),
                csi(&[&[0], &[5]], b"", 'H'),
                csi(&[], b"", 'A'),
            ]
        );
    }

    #[test]
    fn mode_report_keeps_marker_and_intermediate() {
        let mut tokenizer = Tokenizer::default();
        let tokens = tokenizer.process(b"\x1b[?2026;2$y");
        assert_eq!(tokens, vec![csi(&[&[2026], &[2]], b"?$", 'y')]);
    }

    #[test]
    fn ss3_and_alt_chords() {
        let mut tokenizer = Tokenizer::default();
        let tokens = tokenizer.process(b"\x1bOP\x1ba\x1b\x7f");
        assert_eq!(
            tokens,
            vec![Token::Ss3('P'), Token::Esc('a'), Token::Esc('\x7f')]
        );
    }

    #[test]
    fn strings_end_at_st_or_bel() {
        let mut tokenizer = Tokenizer::default();
        let tokens =
            tokenizer.process(b"\x1b]11;rgb:0000/0000/0000\x07\x1b_Gi=31;OK\x1b\\\x1bP>|kitty(0.35)\x1b\\");
        assert_eq!(
            tokens,
            vec![
                Token::Osc("11;rgb:0000/0000/0000".to_string()),
                Token::Apc("Gi=31;OK".to_string()),
                Token::Dcs(Dcs {
                    params: Vec::new(),
                    intermediates: b">".to_vec(),
                    final_byte: '|',
                    data: "kitty(0.35)".to_string(),
                }),
            ]
        );
    }

    #[test]
    fn xtgettcap_reply_header() {
        let mut tokenizer = Tokenizer::default();
        let tokens = tokenizer.process(b"\x1bP1+r524742\x1b\\");
        assert_eq!(
            tokens,
            vec![Token::Dcs(Dcs {
                params: vec![vec![1]],
                intermediates: b"+".to_vec(),
                final_byte: 'r',
                data: "524742".to_string(),
            })]
        );
    }

    #[test]
    fn lone_escape_flushes_as_key() {
        let mut tokenizer = Tokenizer::new(10);
        assert!(tokenizer.process(b"\x1b").is_empty());
        assert!(tokenizer.flush_due(Instant::now()).is_empty());
        let tokens = tokenizer.flush_due(Instant::now() + Duration::from_millis(20));
        assert_eq!(tokens, vec![Token::C0('\x1b')]);
        assert!(tokenizer
            .flush_due(Instant::now() + Duration::from_millis(40))
            .is_empty());
    }

    #[test]
    fn bare_introducer_flushes_as_alt_chord() {
        let mut tokenizer = Tokenizer::new(0);
        assert!(tokenizer.process(b"\x1b[").is_empty());
        assert_eq!(tokenizer.flush(), vec![Token::Esc('[')]);
    }

    #[test]
    fn partial_sequence_is_dropped_on_flush() {
        let mut tokenizer = Tokenizer::new(0);
        assert!(tokenizer.process(b"\x1b[<35;1").is_empty());
        assert!(tokenizer.flush().is_empty());
        assert!(tokenizer.pending().is_empty());
    }

    #[test]
    fn malformed_csi_is_dropped_and_scanning_resumes() {
        let mut tokenizer = Tokenizer::default();
        let tokens = tokenizer.process(b"\x1b[12\x1b[Ab");
        assert_eq!(tokens, vec![csi(&[], b"", 'A'), Token::Print('b')]);
    }

    #[test]
    fn next_timeout_reflects_pending_deadline() {
        let mut tokenizer = Tokenizer::new(25);
        let now = Instant::now();
        assert_eq!(tokenizer.next_timeout_ms(now, 77), 77);
        tokenizer.process(b"\x1b[");
        assert!(tokenizer.next_timeout_ms(Instant::now(), 1000) <= 25);
        tokenizer.clear();
        assert_eq!(tokenizer.next_timeout_ms(Instant::now(), 77), 77);
    }
}
