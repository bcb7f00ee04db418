//! SGR mouse reports.

use crate::core::key::Modifiers;

const BUTTON_MASK: u32 = 0b1100_0011;
const MOTION_BIT: u32 = 32;
const SHIFT_BIT: u32 = 4;
const ALT_BIT: u32 = 8;
const CTRL_BIT: u32 = 16;

/// Mouse button as encoded in the SGR mouse protocol after masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    None,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
    Button8,
    Button9,
    Button10,
    Button11,
}

impl MouseButton {
    fn from_masked(value: u32) -> Option<Self> {
        Some(match value {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            3 => MouseButton::None,
            64 => MouseButton::WheelUp,
            65 => MouseButton::WheelDown,
            66 => MouseButton::WheelLeft,
            67 => MouseButton::WheelRight,
            128 => MouseButton::Button8,
            129 => MouseButton::Button9,
            130 => MouseButton::Button10,
            131 => MouseButton::Button11,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventType {
    Press,
    Release,
    Motion,
}

/// A decoded mouse report with 0-indexed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mouse {
    pub button: MouseButton,
    pub event_type: MouseEventType,
    pub col: u16,
    pub row: u16,
    pub modifiers: Modifiers,
}

impl Mouse {
    /// Decode `CSI < b ; x ; y M|m`. `x` and `y` are the 1-indexed wire coordinates.
    pub(crate) fn from_sgr(b: u32, x: u32, y: u32, release: bool) -> Option<Self> {
        let button = MouseButton::from_masked(b & BUTTON_MASK)?;
        let event_type = if b & MOTION_BIT != 0 {
            MouseEventType::Motion
        } else if release {
            MouseEventType::Release
        } else {
            MouseEventType::Press
        };
        let mut modifiers = Modifiers::empty();
        if b & SHIFT_BIT != 0 {
            modifiers |= Modifiers::SHIFT;
        }
        if b & ALT_BIT != 0 {
            modifiers |= Modifiers::ALT;
        }
        if b & CTRL_BIT != 0 {
            modifiers |= Modifiers::CTRL;
        }
        Some(Self {
            button,
            event_type,
            col: clamp_coordinate(x),
            row: clamp_coordinate(y),
            modifiers,
        })
    }
}

fn clamp_coordinate(value: u32) -> u16 {
    value.saturating_sub(1).min(u16::MAX as u32) as u16
}
