//! Control sequence encoders used by the diff renderer.

use std::io::Write;

use crate::core::capabilities::Capabilities;
use crate::core::color::{Color, ColorKind};
use crate::core::style::{AttributeMask, Hyperlink, UnderlineStyle};

pub(crate) const SYNC_START: &[u8] = b"\x1b[?2026h";
pub(crate) const SYNC_END: &[u8] = b"\x1b[?2026l";
pub(crate) const HIDE_CURSOR: &[u8] = b"\x1b[?25l";
pub(crate) const SHOW_CURSOR: &[u8] = b"\x1b[?25h";
pub(crate) const RESET: &[u8] = b"\x1b[0m";
pub(crate) const HYPERLINK_CLOSE: &[u8] = b"\x1b]8;;\x1b\\";

/// Set codes, in emission order.
const ATTRIBUTE_SET: [(AttributeMask, u8); 7] = [
    (AttributeMask::BOLD, 1),
    (AttributeMask::DIM, 2),
    (AttributeMask::ITALIC, 3),
    (AttributeMask::BLINK, 5),
    (AttributeMask::REVERSE, 7),
    (AttributeMask::INVISIBLE, 8),
    (AttributeMask::STRIKETHROUGH, 9),
];

/// Reset codes for everything except bold and dim, which share 22.
const ATTRIBUTE_RESET: [(AttributeMask, u8); 5] = [
    (AttributeMask::ITALIC, 23),
    (AttributeMask::BLINK, 25),
    (AttributeMask::REVERSE, 27),
    (AttributeMask::INVISIBLE, 28),
    (AttributeMask::STRIKETHROUGH, 29),
];

const INTENSITY: AttributeMask = AttributeMask::BOLD.union(AttributeMask::DIM);

/// 1-indexed CUP for a 0-indexed position.
pub(crate) fn push_cup(buf: &mut Vec<u8>, col: u16, row: u16) {
    let _ = write!(buf, "\x1b[{};{}H", row as u32 + 1, col as u32 + 1);
}

fn push_sgr(buf: &mut Vec<u8>, params: &str) {
    buf.extend_from_slice(b"\x1b[");
    buf.extend_from_slice(params.as_bytes());
    buf.push(b'm');
}

/// Emit the codes that move the terminal from `prev` to `next`.
///
/// Bits that turned off are reset first. Resetting either bold or dim (22) clears both, so
/// whichever of the two is still wanted is set again right after.
pub(crate) fn push_attributes(buf: &mut Vec<u8>, prev: AttributeMask, next: AttributeMask) {
    let off = prev.difference(next);
    let mut on = next.difference(prev);
    if off.is_empty() && on.is_empty() {
        return;
    }

    let mut codes: Vec<u8> = Vec::new();
    if off.intersects(INTENSITY) {
        codes.push(22);
        for (flag, code) in &ATTRIBUTE_SET[..2] {
            if next.contains(*flag) {
                codes.push(*code);
            }
        }
        on.remove(INTENSITY);
    }
    for (flag, code) in ATTRIBUTE_RESET {
        if off.contains(flag) {
            codes.push(code);
        }
    }
    for (flag, code) in ATTRIBUTE_SET {
        if on.contains(flag) {
            codes.push(code);
        }
    }

    let params = codes
        .iter()
        .map(|code| code.to_string())
        .collect::<Vec<_>>()
        .join(";");
    push_sgr(buf, &params);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorTarget {
    Foreground,
    Background,
    Underline,
}

impl ColorTarget {
    fn extended(self) -> u8 {
        match self {
            ColorTarget::Foreground => 38,
            ColorTarget::Background => 48,
            ColorTarget::Underline => 58,
        }
    }

    fn default_code(self) -> u8 {
        self.extended() + 1
    }
}

fn push_color(buf: &mut Vec<u8>, target: ColorTarget, color: Color, caps: &Capabilities) {
    let sep = if caps.legacy_sgr { ';' } else { ':' };
    let kind = match color.kind() {
        ColorKind::Rgb(..) if !caps.truecolor => color.to_indexed().kind(),
        kind => kind,
    };
    let params = match (kind, target) {
        (ColorKind::Default, _) => target.default_code().to_string(),
        (ColorKind::Indexed(n), ColorTarget::Foreground) if n < 8 => (30 + n).to_string(),
        (ColorKind::Indexed(n), ColorTarget::Foreground) if n < 16 => (90 + n - 8).to_string(),
        (ColorKind::Indexed(n), ColorTarget::Background) if n < 8 => (40 + n).to_string(),
        (ColorKind::Indexed(n), ColorTarget::Background) if n < 16 => (100 + n - 8).to_string(),
        (ColorKind::Indexed(n), _) => format!("{}{sep}5{sep}{n}", target.extended()),
        (ColorKind::Rgb(r, g, b), _) => {
            format!("{}{sep}2{sep}{r}{sep}{g}{sep}{b}", target.extended())
        }
    };
    push_sgr(buf, &params);
}

pub(crate) fn push_foreground(buf: &mut Vec<u8>, color: Color, caps: &Capabilities) {
    push_color(buf, ColorTarget::Foreground, color, caps);
}

pub(crate) fn push_background(buf: &mut Vec<u8>, color: Color, caps: &Capabilities) {
    push_color(buf, ColorTarget::Background, color, caps);
}

/// Underline color is only meaningful on terminals with styled underlines.
pub(crate) fn push_underline_color(buf: &mut Vec<u8>, color: Color, caps: &Capabilities) {
    if caps.styled_underline {
        push_color(buf, ColorTarget::Underline, color, caps);
    }
}

/// Styled underlines use `4:n`; without support every style degrades to a single underline.
pub(crate) fn push_underline_style(buf: &mut Vec<u8>, style: UnderlineStyle, caps: &Capabilities) {
    match style {
        UnderlineStyle::Off => push_sgr(buf, "24"),
        _ if caps.styled_underline && !caps.legacy_sgr => {
            push_sgr(buf, &format!("4:{}", style.sgr_subparam()))
        }
        _ => push_sgr(buf, "4"),
    }
}

/// OSC 8 open, or close when `link` is `None`.
pub(crate) fn push_hyperlink(buf: &mut Vec<u8>, link: Option<&Hyperlink>) {
    match link {
        Some(link) => {
            buf.extend_from_slice(b"\x1b]8;");
            if let Some(id) = &link.id {
                let _ = write!(buf, "id={id}");
            }
            buf.push(b';');
            buf.extend_from_slice(link.url.as_bytes());
            buf.extend_from_slice(b"\x1b\\");
        }
        None => buf.extend_from_slice(HYPERLINK_CLOSE),
    }
}

/// DECSCUSR.
pub(crate) fn push_cursor_shape(buf: &mut Vec<u8>, shape: u8) {
    let _ = write!(buf, "\x1b[{shape} q");
}
