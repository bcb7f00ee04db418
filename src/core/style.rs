//! Cell styling: colors, attribute bits, underline styles and hyperlinks.

use bitflags::bitflags;

use crate::core::color::Color;

bitflags! {
    /// Boolean text attributes. Transitions are computed by XOR of the previous and next mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeMask: u8 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const BLINK = 1 << 3;
        const REVERSE = 1 << 4;
        const INVISIBLE = 1 << 5;
        const STRIKETHROUGH = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineStyle {
    #[default]
    Off,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    /// Sub-parameter used in the styled `4:n` form.
    pub const fn sgr_subparam(self) -> u8 {
        match self {
            UnderlineStyle::Off => 0,
            UnderlineStyle::Single => 1,
            UnderlineStyle::Double => 2,
            UnderlineStyle::Curly => 3,
            UnderlineStyle::Dotted => 4,
            UnderlineStyle::Dashed => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub foreground: Color,
    pub background: Color,
    pub underline_color: Color,
    pub underline: UnderlineStyle,
    pub attributes: AttributeMask,
}

impl Style {
    pub fn fg(mut self, color: Color) -> Self {
        self.foreground = color;
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn underline(mut self, style: UnderlineStyle) -> Self {
        self.underline = style;
        self
    }

    pub fn underline_color(mut self, color: Color) -> Self {
        self.underline_color = color;
        self
    }

    pub fn attrs(mut self, attributes: AttributeMask) -> Self {
        self.attributes |= attributes;
        self
    }
}

/// OSC 8 hyperlink target. Cells sharing an `id` are highlighted together by the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Hyperlink {
    pub url: String,
    pub id: Option<String>,
}

impl Hyperlink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
