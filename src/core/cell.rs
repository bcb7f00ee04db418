//! Grid cells and grapheme width measurement.

use std::sync::Arc;

use emojis::get as emoji_get;
use smol_str::SmolStr;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::core::style::{Hyperlink, Style};

const VARIATION_SELECTOR_16: char = '\u{fe0f}';

/// How grapheme clusters are measured.
///
/// `Unicode` is used when the terminal reports grapheme-aware width (mode 2027); everything else
/// gets `Wcwidth`, which sums per-codepoint widths the way libc-based terminals do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WidthMethod {
    #[default]
    Wcwidth,
    Unicode,
}

impl WidthMethod {
    /// Columns occupied by one grapheme cluster, clamped to 0..=2.
    pub fn grapheme_width(self, grapheme: &str) -> u8 {
        if grapheme.is_empty() {
            return 0;
        }
        let width = match self {
            WidthMethod::Wcwidth => grapheme
                .chars()
                .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
                .sum::<usize>(),
            WidthMethod::Unicode => unicode_grapheme_width(grapheme),
        };
        width.min(2) as u8
    }

    /// Total columns of `text` split into grapheme clusters.
    pub fn str_width(self, text: &str) -> usize {
        text.graphemes(true)
            .map(|grapheme| self.grapheme_width(grapheme) as usize)
            .sum()
    }
}

fn unicode_grapheme_width(grapheme: &str) -> usize {
    if emoji_get(grapheme).is_some() || grapheme.contains(VARIATION_SELECTOR_16) {
        return 2;
    }
    // The first non-zero-width codepoint decides the cluster width.
    grapheme
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .find(|width| *width > 0)
        .unwrap_or(0)
}

/// A grapheme cluster and the width derived from it.
///
/// The width can only be set by measuring the grapheme; a width of 0 marks the continuation half
/// of a wide grapheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Character {
    grapheme: SmolStr,
    width: u8,
}

impl Character {
    pub fn new(grapheme: &str, method: WidthMethod) -> Self {
        Self {
            grapheme: SmolStr::new(grapheme),
            width: method.grapheme_width(grapheme),
        }
    }

    /// Continuation cell following a wide grapheme.
    pub fn continuation() -> Self {
        Self {
            grapheme: SmolStr::default(),
            width: 0,
        }
    }

    /// Placeholder for terminal state that is not known; never equal to any measured character.
    pub(crate) fn unknown() -> Self {
        Self {
            grapheme: SmolStr::new_inline("\u{0}"),
            width: 1,
        }
    }

    pub fn grapheme(&self) -> &str {
        &self.grapheme
    }

    pub fn width(&self) -> u8 {
        self.width
    }
}

impl Default for Character {
    fn default() -> Self {
        Self {
            grapheme: SmolStr::new_inline(" "),
            width: 1,
        }
    }
}

/// One grid position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub character: Character,
    pub style: Style,
    pub link: Option<Arc<Hyperlink>>,
    /// Set while a graphic placement covers this cell; the text renderer skips it.
    pub(crate) graphic: bool,
}

impl Cell {
    pub fn new(character: Character, style: Style) -> Self {
        Self {
            character,
            style,
            link: None,
            graphic: false,
        }
    }

    pub fn styled(grapheme: &str, style: Style, method: WidthMethod) -> Self {
        Self::new(Character::new(grapheme, method), style)
    }

    pub fn with_link(mut self, link: Arc<Hyperlink>) -> Self {
        self.link = Some(link);
        self
    }

    pub(crate) fn unknown() -> Self {
        Self::new(Character::unknown(), Style::default())
    }

    pub fn is_graphic(&self) -> bool {
        self.graphic
    }

    pub fn width(&self) -> u8 {
        self.character.width
    }
}
