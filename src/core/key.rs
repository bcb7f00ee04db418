//! Key events, keycode constants and the canonical key description strings.

use std::collections::HashMap;

use bitflags::bitflags;
use once_cell::sync::Lazy;

bitflags! {
    /// Modifier bits, laid out as the kitty keyboard protocol reports them (value - 1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const ALT = 2;
        const CTRL = 4;
        const SUPER = 8;
        const HYPER = 16;
        const META = 32;
        const CAPS_LOCK = 64;
        const NUM_LOCK = 128;
    }
}

impl Modifiers {
    pub const LOCKS: Modifiers = Modifiers::CAPS_LOCK.union(Modifiers::NUM_LOCK);

    pub fn without_locks(self) -> Self {
        self.difference(Self::LOCKS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventType {
    #[default]
    Press,
    Repeat,
    Release,
}

impl KeyEventType {
    /// Decode the kitty event sub-parameter (1 press, 2 repeat, 3 release).
    pub(crate) fn from_kitty(value: u32) -> Self {
        match value {
            2 => KeyEventType::Repeat,
            3 => KeyEventType::Release,
            _ => KeyEventType::Press,
        }
    }
}

pub const KEY_BACKSPACE: u32 = 0x7f;
pub const KEY_TAB: u32 = 0x09;
pub const KEY_ENTER: u32 = 0x0d;
pub const KEY_ESCAPE: u32 = 0x1b;
pub const KEY_SPACE: u32 = 0x20;

/// First keycode past the Unicode range; non-text keys live above it.
pub const EXTENDED: u32 = 0x11_0000;

pub const KEY_UP: u32 = EXTENDED + 1;
pub const KEY_RIGHT: u32 = EXTENDED + 2;
pub const KEY_DOWN: u32 = EXTENDED + 3;
pub const KEY_LEFT: u32 = EXTENDED + 4;
pub const KEY_INSERT: u32 = EXTENDED + 5;
pub const KEY_DELETE: u32 = EXTENDED + 6;
pub const KEY_PAGE_DOWN: u32 = EXTENDED + 7;
pub const KEY_PAGE_UP: u32 = EXTENDED + 8;
pub const KEY_HOME: u32 = EXTENDED + 9;
pub const KEY_END: u32 = EXTENDED + 10;
/// `F0`; `F1`..`F63` follow contiguously.
pub const KEY_F00: u32 = EXTENDED + 11;
pub const KEY_F01: u32 = KEY_F00 + 1;
pub const KEY_F02: u32 = KEY_F00 + 2;
pub const KEY_F03: u32 = KEY_F00 + 3;
pub const KEY_F04: u32 = KEY_F00 + 4;
pub const KEY_F05: u32 = KEY_F00 + 5;
pub const KEY_F06: u32 = KEY_F00 + 6;
pub const KEY_F07: u32 = KEY_F00 + 7;
pub const KEY_F08: u32 = KEY_F00 + 8;
pub const KEY_F09: u32 = KEY_F00 + 9;
pub const KEY_F10: u32 = KEY_F00 + 10;
pub const KEY_F11: u32 = KEY_F00 + 11;
pub const KEY_F12: u32 = KEY_F00 + 12;
pub const KEY_F63: u32 = KEY_F00 + 63;
pub const KEY_CLEAR: u32 = EXTENDED + 75;
pub const KEY_BEGIN: u32 = EXTENDED + 76;
pub const KEY_CAPS_LOCK: u32 = EXTENDED + 77;
pub const KEY_SCROLL_LOCK: u32 = EXTENDED + 78;
pub const KEY_NUM_LOCK: u32 = EXTENDED + 79;
pub const KEY_PRINT_SCREEN: u32 = EXTENDED + 80;
pub const KEY_PAUSE: u32 = EXTENDED + 81;
pub const KEY_MENU: u32 = EXTENDED + 82;
pub const KEY_KP_0: u32 = EXTENDED + 83;
pub const KEY_KP_DECIMAL: u32 = EXTENDED + 93;
pub const KEY_KP_DIVIDE: u32 = EXTENDED + 94;
pub const KEY_KP_MULTIPLY: u32 = EXTENDED + 95;
pub const KEY_KP_SUBTRACT: u32 = EXTENDED + 96;
pub const KEY_KP_ADD: u32 = EXTENDED + 97;
pub const KEY_KP_ENTER: u32 = EXTENDED + 98;
pub const KEY_KP_EQUAL: u32 = EXTENDED + 99;
pub const KEY_KP_SEPARATOR: u32 = EXTENDED + 100;
pub const KEY_KP_LEFT: u32 = EXTENDED + 101;
pub const KEY_KP_RIGHT: u32 = EXTENDED + 102;
pub const KEY_KP_UP: u32 = EXTENDED + 103;
pub const KEY_KP_DOWN: u32 = EXTENDED + 104;
pub const KEY_KP_PAGE_UP: u32 = EXTENDED + 105;
pub const KEY_KP_PAGE_DOWN: u32 = EXTENDED + 106;
pub const KEY_KP_HOME: u32 = EXTENDED + 107;
pub const KEY_KP_END: u32 = EXTENDED + 108;
pub const KEY_KP_INSERT: u32 = EXTENDED + 109;
pub const KEY_KP_DELETE: u32 = EXTENDED + 110;
pub const KEY_KP_BEGIN: u32 = EXTENDED + 111;
pub const KEY_MEDIA_PLAY: u32 = EXTENDED + 112;
pub const KEY_MEDIA_PAUSE: u32 = EXTENDED + 113;
pub const KEY_MEDIA_PLAY_PAUSE: u32 = EXTENDED + 114;
pub const KEY_MEDIA_REVERSE: u32 = EXTENDED + 115;
pub const KEY_MEDIA_STOP: u32 = EXTENDED + 116;
pub const KEY_MEDIA_FAST_FORWARD: u32 = EXTENDED + 117;
pub const KEY_MEDIA_REWIND: u32 = EXTENDED + 118;
pub const KEY_MEDIA_TRACK_NEXT: u32 = EXTENDED + 119;
pub const KEY_MEDIA_TRACK_PREVIOUS: u32 = EXTENDED + 120;
pub const KEY_MEDIA_RECORD: u32 = EXTENDED + 121;
pub const KEY_LOWER_VOLUME: u32 = EXTENDED + 122;
pub const KEY_RAISE_VOLUME: u32 = EXTENDED + 123;
pub const KEY_MUTE_VOLUME: u32 = EXTENDED + 124;
pub const KEY_LEFT_SHIFT: u32 = EXTENDED + 125;
pub const KEY_LEFT_CTRL: u32 = EXTENDED + 126;
pub const KEY_LEFT_ALT: u32 = EXTENDED + 127;
pub const KEY_LEFT_SUPER: u32 = EXTENDED + 128;
pub const KEY_LEFT_HYPER: u32 = EXTENDED + 129;
pub const KEY_LEFT_META: u32 = EXTENDED + 130;
pub const KEY_RIGHT_SHIFT: u32 = EXTENDED + 131;
pub const KEY_RIGHT_CTRL: u32 = EXTENDED + 132;
pub const KEY_RIGHT_ALT: u32 = EXTENDED + 133;
pub const KEY_RIGHT_SUPER: u32 = EXTENDED + 134;
pub const KEY_RIGHT_HYPER: u32 = EXTENDED + 135;
pub const KEY_RIGHT_META: u32 = EXTENDED + 136;
pub const KEY_ISO_LEVEL3_SHIFT: u32 = EXTENDED + 137;
pub const KEY_ISO_LEVEL5_SHIFT: u32 = EXTENDED + 138;

/// Keycode for `Fn`. Returns `None` past F63.
pub const fn function_key(n: u32) -> Option<u32> {
    if n > 63 {
        None
    } else {
        Some(KEY_F00 + n)
    }
}

/// Index `n` of an `Fn` keycode.
pub const fn function_key_number(keycode: u32) -> Option<u32> {
    if keycode >= KEY_F00 && keycode <= KEY_F63 {
        Some(keycode - KEY_F00)
    } else {
        None
    }
}

const KITTY_INSERT: u32 = 57348;
const KITTY_END: u32 = 57357;
const KITTY_CAPS_LOCK: u32 = 57358;
const KITTY_MENU: u32 = 57363;
const KITTY_F1: u32 = 57364;
const KITTY_F35: u32 = 57398;
const KITTY_KP_0: u32 = 57399;
const KITTY_ISO_LEVEL5_SHIFT: u32 = 57454;

const KITTY_NAVIGATION: [u32; 10] = [
    KEY_INSERT,
    KEY_DELETE,
    KEY_LEFT,
    KEY_RIGHT,
    KEY_UP,
    KEY_DOWN,
    KEY_PAGE_UP,
    KEY_PAGE_DOWN,
    KEY_HOME,
    KEY_END,
];

/// Map a kitty private-use functional keycode onto this crate's keycodes.
pub(crate) fn from_kitty_functional(codepoint: u32) -> Option<u32> {
    match codepoint {
        KITTY_INSERT..=KITTY_END => Some(KITTY_NAVIGATION[(codepoint - KITTY_INSERT) as usize]),
        KITTY_CAPS_LOCK..=KITTY_MENU => Some(KEY_CAPS_LOCK + (codepoint - KITTY_CAPS_LOCK)),
        KITTY_F1..=KITTY_F35 => function_key(codepoint - KITTY_F1 + 1),
        KITTY_KP_0..=KITTY_ISO_LEVEL5_SHIFT => Some(KEY_KP_0 + (codepoint - KITTY_KP_0)),
        _ => None,
    }
}

const KEY_NAME_TABLE: &[(u32, &str)] = &[
    (KEY_ENTER, "Enter"),
    (KEY_TAB, "Tab"),
    (KEY_ESCAPE, "Escape"),
    (KEY_SPACE, "space"),
    (KEY_BACKSPACE, "BackSpace"),
    (KEY_UP, "Up"),
    (KEY_RIGHT, "Right"),
    (KEY_DOWN, "Down"),
    (KEY_LEFT, "Left"),
    (KEY_INSERT, "Insert"),
    (KEY_DELETE, "Delete"),
    (KEY_PAGE_DOWN, "Page_Down"),
    (KEY_PAGE_UP, "Page_Up"),
    (KEY_HOME, "Home"),
    (KEY_END, "End"),
    (KEY_CLEAR, "Clear"),
    (KEY_BEGIN, "Begin"),
    (KEY_CAPS_LOCK, "Caps_Lock"),
    (KEY_SCROLL_LOCK, "Scroll_Lock"),
    (KEY_NUM_LOCK, "Num_Lock"),
    (KEY_PRINT_SCREEN, "Print"),
    (KEY_PAUSE, "Pause"),
    (KEY_MENU, "Menu"),
    (KEY_KP_DECIMAL, "KP_Decimal"),
    (KEY_KP_DIVIDE, "KP_Divide"),
    (KEY_KP_MULTIPLY, "KP_Multiply"),
    (KEY_KP_SUBTRACT, "KP_Subtract"),
    (KEY_KP_ADD, "KP_Add"),
    (KEY_KP_ENTER, "KP_Enter"),
    (KEY_KP_EQUAL, "KP_Equal"),
    (KEY_KP_SEPARATOR, "KP_Separator"),
    (KEY_KP_LEFT, "KP_Left"),
    (KEY_KP_RIGHT, "KP_Right"),
    (KEY_KP_UP, "KP_Up"),
    (KEY_KP_DOWN, "KP_Down"),
    (KEY_KP_PAGE_UP, "KP_Page_Up"),
    (KEY_KP_PAGE_DOWN, "KP_Page_Down"),
    (KEY_KP_HOME, "KP_Home"),
    (KEY_KP_END, "KP_End"),
    (KEY_KP_INSERT, "KP_Insert"),
    (KEY_KP_DELETE, "KP_Delete"),
    (KEY_KP_BEGIN, "KP_Begin"),
    (KEY_MEDIA_PLAY, "Media_Play"),
    (KEY_MEDIA_PAUSE, "Media_Pause"),
    (KEY_MEDIA_PLAY_PAUSE, "Media_Play_Pause"),
    (KEY_MEDIA_REVERSE, "Media_Reverse"),
    (KEY_MEDIA_STOP, "Media_Stop"),
    (KEY_MEDIA_FAST_FORWARD, "Media_Fast_Forward"),
    (KEY_MEDIA_REWIND, "Media_Rewind"),
    (KEY_MEDIA_TRACK_NEXT, "Media_Track_Next"),
    (KEY_MEDIA_TRACK_PREVIOUS, "Media_Track_Previous"),
    (KEY_MEDIA_RECORD, "Media_Record"),
    (KEY_LOWER_VOLUME, "Lower_Volume"),
    (KEY_RAISE_VOLUME, "Raise_Volume"),
    (KEY_MUTE_VOLUME, "Mute_Volume"),
    (KEY_LEFT_SHIFT, "Shift_L"),
    (KEY_LEFT_CTRL, "Control_L"),
    (KEY_LEFT_ALT, "Alt_L"),
    (KEY_LEFT_SUPER, "Super_L"),
    (KEY_LEFT_HYPER, "Hyper_L"),
    (KEY_LEFT_META, "Meta_L"),
    (KEY_RIGHT_SHIFT, "Shift_R"),
    (KEY_RIGHT_CTRL, "Control_R"),
    (KEY_RIGHT_ALT, "Alt_R"),
    (KEY_RIGHT_SUPER, "Super_R"),
    (KEY_RIGHT_HYPER, "Hyper_R"),
    (KEY_RIGHT_META, "Meta_R"),
    (KEY_ISO_LEVEL3_SHIFT, "ISO_Level3_Shift"),
    (KEY_ISO_LEVEL5_SHIFT, "ISO_Level5_Shift"),
];

static KEY_NAMES: Lazy<HashMap<u32, &'static str>> =
    Lazy::new(|| KEY_NAME_TABLE.iter().copied().collect());

/// Prefix order used by [`Key::describe`].
const MODIFIER_PREFIXES: [(Modifiers, &str); 6] = [
    (Modifiers::META, "Meta+"),
    (Modifiers::HYPER, "Hyper+"),
    (Modifiers::SUPER, "Super+"),
    (Modifiers::CTRL, "Ctrl+"),
    (Modifiers::ALT, "Alt+"),
    (Modifiers::SHIFT, "Shift+"),
];

/// Decoded key event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Key {
    pub keycode: u32,
    pub shifted_code: Option<u32>,
    /// Key position on a US layout, independent of the active keyboard layout.
    pub base_layout_code: Option<u32>,
    pub modifiers: Modifiers,
    pub event_type: KeyEventType,
    /// Text the key would produce. Always empty on release.
    pub text: String,
}

impl Key {
    pub fn new(keycode: u32) -> Self {
        Self {
            keycode,
            ..Self::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_event_type(mut self, event_type: KeyEventType) -> Self {
        self.event_type = event_type;
        if event_type == KeyEventType::Release {
            self.text.clear();
        }
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        if self.event_type != KeyEventType::Release {
            self.text = text.into();
        }
        self
    }

    /// Whether this key is `keycode` with exactly `modifiers`, ignoring lock keys.
    pub fn matches(&self, keycode: u32, modifiers: Modifiers) -> bool {
        let mods = self.modifiers.without_locks();
        if self.keycode == keycode && mods == modifiers {
            return true;
        }
        // Shifted letters also match their shifted codepoint without the Shift bit.
        if let Some(shifted) = self.shifted_code {
            if shifted == keycode && mods.difference(Modifiers::SHIFT) == modifiers {
                return true;
            }
        }
        // Non-latin layouts match on the key's US-layout position.
        self.base_layout_code == Some(keycode) && mods == modifiers
    }

    /// Whether [`Key::describe`] equals `description`.
    pub fn matches_description(&self, description: &str) -> bool {
        self.describe() == description
    }

    /// Stable human-readable form such as `Ctrl+Alt+j`, `F1` or `Shift+Tab`.
    ///
    /// Modifiers are emitted in the fixed order Meta, Hyper, Super, Ctrl, Alt, Shift. Control
    /// characters are described as Ctrl plus the corresponding printable character.
    pub fn describe(&self) -> String {
        let mut modifiers = self.modifiers.without_locks();
        let name = match KEY_NAMES.get(&self.keycode) {
            Some(name) => (*name).to_string(),
            None => match self.keycode {
                code if code < 0x20 => {
                    modifiers |= Modifiers::CTRL;
                    let printable = match code {
                        0x00 => '@' as u32,
                        0x01..=0x1a => code + 0x60,
                        _ => code + 0x40,
                    };
                    char_name(printable)
                }
                code if (KEY_KP_0..KEY_KP_DECIMAL).contains(&code) => {
                    format!("KP_{}", code - KEY_KP_0)
                }
                code => match function_key_number(code) {
                    Some(n) => format!("F{n}"),
                    None => char_name(code),
                },
            },
        };

        let mut out = String::new();
        for (flag, prefix) in MODIFIER_PREFIXES {
            if modifiers.contains(flag) {
                out.push_str(prefix);
            }
        }
        out.push_str(&name);
        out
    }
}

fn char_name(code: u32) -> String {
    match char::from_u32(code) {
        Some(ch) => ch.to_string(),
        None => format!("U+{code:X}"),
    }
}
