//! Packed terminal colors.

/// A terminal color packed into one `u32`.
///
/// Layout: bits 0..24 carry the payload (index in the low byte, or `0xRRGGBB`), bit 24 tags an
/// indexed color and bit 25 tags an RGB color. The default color is all zeroes and carries no
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u32);

const INDEXED_TAG: u32 = 1 << 24;
const RGB_TAG: u32 = 1 << 25;
const PAYLOAD_MASK: u32 = 0x00ff_ffff;

/// Unpacked view of a [`Color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorKind {
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    pub const DEFAULT: Color = Color(0);

    pub const fn indexed(index: u8) -> Self {
        Color(INDEXED_TAG | index as u32)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(RGB_TAG | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        Some(Color(RGB_TAG | value))
    }

    pub const fn is_default(self) -> bool {
        self.0 == 0
    }

    pub const fn kind(self) -> ColorKind {
        if self.0 & RGB_TAG != 0 {
            let value = self.0 & PAYLOAD_MASK;
            ColorKind::Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
        } else if self.0 & INDEXED_TAG != 0 {
            ColorKind::Indexed(self.0 as u8)
        } else {
            ColorKind::Default
        }
    }

    /// Nearest entry of the xterm 256-color palette. Default and indexed colors are unchanged.
    pub fn to_indexed(self) -> Self {
        match self.kind() {
            ColorKind::Rgb(r, g, b) => Color::indexed(nearest_palette_index(r, g, b)),
            _ => self,
        }
    }
}

impl From<ColorKind> for Color {
    fn from(kind: ColorKind) -> Self {
        match kind {
            ColorKind::Default => Color::DEFAULT,
            ColorKind::Indexed(index) => Color::indexed(index),
            ColorKind::Rgb(r, g, b) => Color::rgb(r, g, b),
        }
    }
}

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

fn cube_level(value: u8) -> usize {
    if value < 48 {
        0
    } else if value < 115 {
        1
    } else {
        ((value as usize - 35) / 40).min(5)
    }
}

fn distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let dr = a.0 as i32 - b.0 as i32;
    let dg = a.1 as i32 - b.1 as i32;
    let db = a.2 as i32 - b.2 as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// Pick the closer of the 6x6x6 cube entry and the 24-step gray ramp.
pub(crate) fn nearest_palette_index(r: u8, g: u8, b: u8) -> u8 {
    let (ri, gi, bi) = (cube_level(r), cube_level(g), cube_level(b));
    let cube = (CUBE_LEVELS[ri], CUBE_LEVELS[gi], CUBE_LEVELS[bi]);
    let cube_index = 16 + 36 * ri + 6 * gi + bi;

    let average = (r as u32 + g as u32 + b as u32) / 3;
    let gray_step = if average > 238 {
        23
    } else {
        (average.saturating_sub(3) / 10).min(23)
    };
    let gray_value = (8 + gray_step * 10) as u8;
    let gray_index = 232 + gray_step as usize;

    let target = (r, g, b);
    if distance(target, (gray_value, gray_value, gray_value)) < distance(target, cube) {
        gray_index as u8
    } else {
        cube_index as u8
    }
}

#[cfg(test)]
mod tests {
    use super::{Color, ColorKind};

    #[test]
    fn packing_roundtrips_each_kind() {
        assert_eq!(Color::DEFAULT.kind(), ColorKind::Default);
        assert_eq!(Color::indexed(0).kind(), ColorKind::Indexed(0));
        assert_eq!(Color::indexed(255).kind(), ColorKind::Indexed(255));
        assert_eq!(Color::rgb(0, 0, 0).kind(), ColorKind::Rgb(0, 0, 0));
        assert_eq!(Color::rgb(1, 2, 3).kind(), ColorKind::Rgb(1, 2, 3));
    }

    #[test]
    fn black_rgb_is_not_default_or_indexed_zero() {
        assert_ne!(Color::rgb(0, 0, 0), Color::DEFAULT);
        assert_ne!(Color::rgb(0, 0, 0), Color::indexed(0));
        assert_ne!(Color::indexed(0), Color::DEFAULT);
        assert!(Color::DEFAULT.is_default());
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(Color::from_hex("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("#fff"), None);
    }

    #[test]
    fn rgb_degrades_to_palette() {
        assert_eq!(Color::rgb(255, 0, 0).to_indexed(), Color::indexed(196));
        assert_eq!(Color::rgb(0, 0, 0).to_indexed(), Color::indexed(16));
        assert_eq!(Color::rgb(128, 128, 128).to_indexed(), Color::indexed(244));
        assert_eq!(Color::indexed(3).to_indexed(), Color::indexed(3));
    }
}
