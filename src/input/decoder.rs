//! Token to event decoding.
//!
//! Handles both keyboard dialects: legacy xterm encodings and the kitty keyboard protocol. The
//! decoder starts in the legacy dialect and switches to kitty permanently once the terminal
//! answers the kitty keyboard query.

use crate::core::capabilities::{CellDimensions, Report};
use crate::core::event::{Event, Inbound, Resize};
use crate::core::key::{
    from_kitty_functional, function_key, function_key_number, Key, KeyEventType, Modifiers,
    KEY_BACKSPACE, KEY_BEGIN, KEY_DELETE, KEY_DOWN, KEY_END, KEY_ENTER, KEY_ESCAPE, KEY_F00,
    KEY_HOME, KEY_INSERT, KEY_KP_BEGIN, KEY_KP_ENTER, KEY_LEFT, KEY_PAGE_DOWN, KEY_PAGE_UP,
    KEY_RIGHT, KEY_TAB, KEY_UP,
};
use crate::core::mouse::Mouse;
use crate::core::token::{Csi, Dcs, Token};

const PASTE_START: u32 = 200;
const PASTE_END: u32 = 201;

/// Modifier combinations that legacy terminals fold into the F13..F63 range, with the offset
/// added to the F-key number.
const FUNCTION_KEY_OFFSETS: [(Modifiers, u32); 5] = [
    (Modifiers::SHIFT, 12),
    (Modifiers::CTRL, 24),
    (Modifiers::CTRL.union(Modifiers::SHIFT), 36),
    (Modifiers::ALT, 48),
    (Modifiers::ALT.union(Modifiers::SHIFT), 60),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Legacy,
    Kitty,
}

#[derive(Debug, Default)]
pub struct Decoder {
    dialect: Dialect,
    paste: Option<String>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            paste: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn in_paste(&self) -> bool {
        self.paste.is_some()
    }

    pub fn decode(&mut self, token: Token) -> Vec<Inbound> {
        if self.paste.is_some() {
            if matches!(&token, Token::Csi(csi) if is_paste_marker(csi, PASTE_END)) {
                let text = self.paste.take().unwrap_or_default();
                return vec![Event::Paste(text).into()];
            }
            // Sequences inside a paste are pasted text, not input.
            if let Some(buffer) = self.paste.as_mut() {
                token.encode_into(buffer);
            }
            return Vec::new();
        }

        match token {
            Token::Print(ch) => key_event(self.key_from_char(ch)),
            Token::C0(ch) => key_event(self.key_from_c0(ch as u32)),
            Token::Esc(ch) => {
                let key = if (ch as u32) < 0x20 || ch == '\x7f' {
                    self.key_from_c0(ch as u32)
                } else {
                    self.key_from_char(ch)
                };
                let Some(mut key) = key else {
                    return drop_sequence("esc", &ch.to_string());
                };
                key.modifiers |= Modifiers::ALT;
                key.text.clear();
                key_event(Some(key))
            }
            Token::Ss3(ch) => match ss3_key(ch) {
                Some(code) => key_event(Some(function_key_quirk(Key::new(code)))),
                None => drop_sequence("ss3", &ch.to_string()),
            },
            Token::Csi(csi) => self.decode_csi(&csi),
            Token::Dcs(dcs) => decode_dcs(&dcs),
            Token::Apc(payload) => decode_apc(&payload),
            Token::Osc(payload) => drop_sequence("osc", &payload),
        }
    }

    fn key_from_char(&self, ch: char) -> Option<Key> {
        let mut lower = ch.to_lowercase();
        if ch.is_uppercase() {
            if let (Some(lowered), None) = (lower.next(), lower.next()) {
                let mut key = Key::new(lowered as u32)
                    .with_modifiers(Modifiers::SHIFT)
                    .with_text(ch.to_string());
                key.shifted_code = Some(ch as u32);
                return Some(key);
            }
        }
        Some(Key::new(ch as u32).with_text(ch.to_string()))
    }

    fn key_from_c0(&self, code: u32) -> Option<Key> {
        let key = match code {
            0x08 | 0x7f => Key::new(KEY_BACKSPACE),
            0x09 => Key::new(KEY_TAB),
            0x0d => Key::new(KEY_ENTER),
            0x1b => Key::new(KEY_ESCAPE),
            0x0a if self.dialect == Dialect::Kitty => {
                Key::new(KEY_ENTER).with_modifiers(Modifiers::SHIFT)
            }
            0x00 => Key::new('@' as u32).with_modifiers(Modifiers::CTRL),
            0x01..=0x1a => Key::new(code + 0x60).with_modifiers(Modifiers::CTRL),
            0x1c..=0x1f => Key::new(code + 0x40).with_modifiers(Modifiers::CTRL),
            _ => return None,
        };
        Some(key)
    }

    fn decode_csi(&mut self, csi: &Csi) -> Vec<Inbound> {
        match (csi.private_marker(), csi.final_byte) {
            (Some(b'?'), 'u') => {
                self.dialect = Dialect::Kitty;
                vec![Report::KittyKeyboard(csi.param_or(0, 0)).into()]
            }
            (Some(b'?'), 'c') => {
                let params = csi.params.iter().filter_map(|p| p.first().copied()).collect();
                vec![Report::PrimaryDeviceAttributes(params).into()]
            }
            (Some(b'?'), 'S') => match (csi.param(0), csi.param(1), csi.param(2), csi.param(3)) {
                (Some(2), Some(0), Some(width), Some(height)) => {
                    vec![Report::SixelGeometry { width, height }.into()]
                }
                _ => drop_csi(csi),
            },
            (Some(b'?'), 'y') if csi.has_intermediate(b'$') => {
                match (csi.param(0), csi.param(1)) {
                    (Some(mode), Some(setting)) => {
                        vec![Report::ModeStatus { mode, setting }.into()]
                    }
                    _ => drop_csi(csi),
                }
            }
            (Some(b'<'), 'M' | 'm') => {
                let parsed = match (csi.param(0), csi.param(1), csi.param(2)) {
                    (Some(b), Some(x), Some(y)) => Mouse::from_sgr(b, x, y, csi.final_byte == 'm'),
                    _ => None,
                };
                match parsed {
                    Some(mouse) => vec![Event::Mouse(mouse).into()],
                    None => drop_csi(csi),
                }
            }
            (None, 'u') if csi.intermediates.is_empty() => {
                let key = self.kitty_key(csi);
                self.emit_key(key, csi)
            }
            (None, '~') if csi.intermediates.is_empty() => match csi.param(0) {
                Some(PASTE_START) => {
                    self.paste = Some(String::new());
                    Vec::new()
                }
                // Paste end without a start.
                Some(PASTE_END) => Vec::new(),
                Some(number) => match tilde_key(number) {
                    Some(code) => {
                        let key = legacy_key(code, csi);
                        self.emit_key(key, csi)
                    }
                    None => drop_csi(csi),
                },
                None => drop_csi(csi),
            },
            (None, 'I') if csi.params.is_empty() => vec![Event::FocusIn.into()],
            (None, 'O') if csi.params.is_empty() => vec![Event::FocusOut.into()],
            (None, 't') => decode_window_report(csi),
            (None, 'Z') if csi.intermediates.is_empty() => {
                let Some(mut key) = legacy_key(KEY_TAB, csi) else {
                    return drop_csi(csi);
                };
                key.modifiers |= Modifiers::SHIFT;
                self.emit_key(Some(key), csi)
            }
            // Anything else ending in R is a cursor position report.
            (None, 'R') if !(csi.params.is_empty() || csi.param(0) == Some(1)) => drop_csi(csi),
            (None, final_byte) if csi.intermediates.is_empty() => match csi_final_key(final_byte) {
                Some(code) => {
                    let key = legacy_key(code, csi);
                    self.emit_key(key, csi)
                }
                None => drop_csi(csi),
            },
            _ => drop_csi(csi),
        }
    }

    fn emit_key(&self, key: Option<Key>, csi: &Csi) -> Vec<Inbound> {
        match key {
            Some(key) if key.event_type == KeyEventType::Release && self.dialect == Dialect::Legacy => {
                tracing::debug!(?csi, "dropping key release outside the kitty dialect");
                Vec::new()
            }
            Some(key) => vec![Event::Key(key).into()],
            None => drop_csi(csi),
        }
    }

    /// `CSI keycode[:shifted[:base]] ; modifiers[:event] ; text u`.
    fn kitty_key(&self, csi: &Csi) -> Option<Key> {
        let raw = csi.param(0)?;
        let keycode = from_kitty_functional(raw).unwrap_or(raw);
        let shifted_code = csi.subparam(0, 1).filter(|code| *code != 0);
        let base_layout_code = csi.subparam(0, 2).filter(|code| *code != 0);
        let modifiers = modifiers_from_param(csi.param(1));
        let event_type = csi
            .subparam(1, 1)
            .map(KeyEventType::from_kitty)
            .unwrap_or_default();

        let mut text: String = csi
            .params
            .get(2)
            .map(|codepoints| codepoints.iter().filter_map(|cp| char::from_u32(*cp)).collect())
            .unwrap_or_default();
        if text.is_empty() {
            text = implied_text(keycode, shifted_code, modifiers);
        }

        let key = Key {
            keycode,
            shifted_code,
            base_layout_code,
            modifiers,
            event_type: KeyEventType::Press,
            text,
        };
        Some(function_key_quirk(key.with_event_type(event_type)))
    }
}

fn key_event(key: Option<Key>) -> Vec<Inbound> {
    key.map(|key| vec![Event::Key(key).into()]).unwrap_or_default()
}

fn is_paste_marker(csi: &Csi, marker: u32) -> bool {
    csi.final_byte == '~' && csi.intermediates.is_empty() && csi.param(0) == Some(marker)
}

fn modifiers_from_param(param: Option<u32>) -> Modifiers {
    let value = param.unwrap_or(1).saturating_sub(1).min(u8::MAX as u32) as u8;
    Modifiers::from_bits_truncate(value)
}

/// Text a printable key produces when the terminal did not send it explicitly.
fn implied_text(keycode: u32, shifted_code: Option<u32>, modifiers: Modifiers) -> String {
    let chord = Modifiers::CTRL | Modifiers::ALT | Modifiers::SUPER | Modifiers::HYPER | Modifiers::META;
    if modifiers.intersects(chord) || keycode < 0x20 || keycode == KEY_BACKSPACE {
        return String::new();
    }
    let code = if modifiers.contains(Modifiers::SHIFT) {
        shifted_code.unwrap_or(keycode)
    } else {
        keycode
    };
    char::from_u32(code)
        .filter(|ch| !ch.is_control())
        .map(String::from)
        .unwrap_or_default()
}

/// Key from a legacy CSI form: `CSI [1;modifiers[:event]] final` or `CSI number;modifiers ~`.
fn legacy_key(code: u32, csi: &Csi) -> Option<Key> {
    let event_type = csi
        .subparam(1, 1)
        .map(KeyEventType::from_kitty)
        .unwrap_or_default();
    let key = Key::new(code)
        .with_modifiers(modifiers_from_param(csi.param(1)))
        .with_event_type(event_type);
    Some(function_key_quirk(key))
}

/// Fold F1..F12 plus a modifier into the extended F-key range and clear the modifier.
fn function_key_quirk(mut key: Key) -> Key {
    let Some(number) = function_key_number(key.keycode) else {
        return key;
    };
    if !(1..=12).contains(&number) {
        return key;
    }
    let held = key.modifiers.without_locks();
    let offset = FUNCTION_KEY_OFFSETS
        .iter()
        .find(|(modifiers, _)| *modifiers == held)
        .map(|(_, offset)| *offset);
    if let Some(code) = offset.and_then(|offset| function_key(number + offset)) {
        key.keycode = code;
        key.modifiers &= Modifiers::LOCKS;
    }
    key
}

fn csi_final_key(final_byte: char) -> Option<u32> {
    Some(match final_byte {
        'A' => KEY_UP,
        'B' => KEY_DOWN,
        'C' => KEY_RIGHT,
        'D' => KEY_LEFT,
        'E' => KEY_BEGIN,
        'F' => KEY_END,
        'H' => KEY_HOME,
        'P' => KEY_F00 + 1,
        'Q' => KEY_F00 + 2,
        'R' => KEY_F00 + 3,
        'S' => KEY_F00 + 4,
        _ => return None,
    })
}

fn ss3_key(final_byte: char) -> Option<u32> {
    match final_byte {
        'M' => Some(KEY_KP_ENTER),
        'A' | 'B' | 'C' | 'D' | 'E' | 'F' | 'H' | 'P' | 'Q' | 'R' | 'S' => {
            csi_final_key(final_byte)
        }
        _ => None,
    }
}

fn tilde_key(number: u32) -> Option<u32> {
    Some(match number {
        1 | 7 => KEY_HOME,
        2 => KEY_INSERT,
        3 => KEY_DELETE,
        4 | 8 => KEY_END,
        5 => KEY_PAGE_UP,
        6 => KEY_PAGE_DOWN,
        11..=15 => KEY_F00 + (number - 10),
        17..=21 => KEY_F00 + (number - 11),
        23 | 24 => KEY_F00 + (number - 12),
        57427 => KEY_KP_BEGIN,
        _ => return None,
    })
}

/// `CSI 6;h;w t` (cell size) and `CSI 48;rows;cols;hpx;wpx t` (in-band resize).
fn decode_window_report(csi: &Csi) -> Vec<Inbound> {
    match csi.param(0) {
        Some(6) => match (csi.param(1), csi.param(2)) {
            (Some(height_px), Some(width_px)) => vec![Report::CellSize(CellDimensions {
                width_px,
                height_px,
            })
            .into()],
            _ => drop_csi(csi),
        },
        Some(48) => match (csi.param(1), csi.param(2)) {
            (Some(rows), Some(cols)) => {
                let clamp = |value: Option<u32>| value.unwrap_or(0).min(u16::MAX as u32) as u16;
                vec![Event::Resize(Resize {
                    cols: clamp(Some(cols)),
                    rows: clamp(Some(rows)),
                    width_px: clamp(csi.param(4)),
                    height_px: clamp(csi.param(3)),
                })
                .into()]
            }
            _ => drop_csi(csi),
        },
        _ => drop_csi(csi),
    }
}

fn decode_dcs(dcs: &Dcs) -> Vec<Inbound> {
    match (dcs.intermediates.as_slice(), dcs.final_byte) {
        (b">", '|') => vec![Report::TerminalVersion(dcs.data.clone()).into()],
        (b"!", '|') => {
            let id = decode_hex(&dcs.data).unwrap_or_else(|| dcs.data.clone());
            vec![Report::TertiaryDeviceAttributes(id).into()]
        }
        (b"+", 'r') if dcs.param(0) == Some(1) => {
            let (name, value) = match dcs.data.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (dcs.data.as_str(), None),
            };
            match decode_hex(name) {
                Some(name) => vec![Report::Capability {
                    name,
                    value: value.and_then(decode_hex),
                }
                .into()],
                None => drop_sequence("dcs", &dcs.data),
            }
        }
        _ => drop_sequence("dcs", &dcs.data),
    }
}

/// Kitty graphics replies look like `G<key=value,...>;<message>`.
fn decode_apc(payload: &str) -> Vec<Inbound> {
    let Some(body) = payload.strip_prefix('G') else {
        return drop_sequence("apc", payload);
    };
    let message = body.split_once(';').map(|(_, message)| message).unwrap_or("");
    vec![Report::KittyGraphics {
        ok: message == "OK",
    }
    .into()]
}

fn decode_hex(hex: &str) -> Option<String> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

fn drop_csi(csi: &Csi) -> Vec<Inbound> {
    tracing::debug!(?csi, "dropping unrecognized csi sequence");
    Vec::new()
}

fn drop_sequence(kind: &str, payload: &str) -> Vec<Inbound> {
    tracing::debug!(kind, payload, "dropping unrecognized sequence");
    Vec::new()
}
