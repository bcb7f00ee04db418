//! Negotiated terminal capabilities.
//!
//! The registry is written while replies to the query battery arrive and once more when the
//! environment overrides are applied; everything else only reads it.

use crate::config::EnvConfig;
use crate::core::cell::WidthMethod;

/// DECRQM mode numbers queried during negotiation.
pub const MODE_SYNCHRONIZED_UPDATE: u32 = 2026;
pub const MODE_UNICODE_CORE: u32 = 2027;
pub const MODE_IN_BAND_RESIZE: u32 = 2048;

/// Graphics protocols, ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum GraphicsProtocol {
    #[default]
    None,
    HalfBlock,
    Sixel,
    Kitty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDimensions {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for CellDimensions {
    fn default() -> Self {
        Self {
            width_px: 9,
            height_px: 18,
        }
    }
}

/// A decoded reply to one of the negotiation queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// `CSI ? params c`. Always the last reply, so it terminates negotiation.
    PrimaryDeviceAttributes(Vec<u32>),
    /// `DCS ! | id ST`.
    TertiaryDeviceAttributes(String),
    /// `DCS > | name ST`.
    TerminalVersion(String),
    /// `CSI ? flags u`.
    KittyKeyboard(u32),
    /// `APC G i=31;OK ST` or an error message.
    KittyGraphics { ok: bool },
    /// `CSI ? 2 ; 0 ; w ; h S`.
    SixelGeometry { width: u32, height: u32 },
    /// `CSI ? mode ; setting $ y`.
    ModeStatus { mode: u32, setting: u32 },
    /// `DCS 1 + r name[=value] ST`, hex decoded.
    Capability { name: String, value: Option<String> },
    /// `CSI 6 ; height ; width t`.
    CellSize(CellDimensions),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub truecolor: bool,
    pub styled_underline: bool,
    pub synchronized_update: bool,
    pub sixel: bool,
    pub kitty_graphics: bool,
    pub kitty_keyboard: bool,
    pub unicode_width: bool,
    pub in_band_resize: bool,
    pub legacy_sgr: bool,
    pub width_method: WidthMethod,
    pub graphics_ceiling: Option<GraphicsProtocol>,
    pub terminal_name: Option<String>,
    pub terminal_id: Option<String>,
    pub sixel_geometry: Option<(u32, u32)>,
    pub cell_size: CellDimensions,
}

impl Capabilities {
    /// Seed from the process environment before any query is answered.
    pub fn from_colorterm(colorterm: Option<&str>) -> Self {
        let truecolor = colorterm
            .map(|value| {
                let value = value.trim().to_ascii_lowercase();
                value == "truecolor" || value == "24bit"
            })
            .unwrap_or(false);
        Self {
            truecolor,
            ..Self::default()
        }
    }

    /// Record one reply. Returns `true` when the reply ends negotiation.
    pub fn apply(&mut self, report: &Report) -> bool {
        match report {
            Report::PrimaryDeviceAttributes(params) => {
                if params.iter().skip(1).any(|param| *param == 4) {
                    self.sixel = true;
                }
                return true;
            }
            Report::TertiaryDeviceAttributes(id) => self.terminal_id = Some(id.clone()),
            Report::TerminalVersion(name) => self.terminal_name = Some(name.clone()),
            Report::KittyKeyboard(_) => self.kitty_keyboard = true,
            Report::KittyGraphics { ok } => self.kitty_graphics |= *ok,
            Report::SixelGeometry { width, height } => {
                self.sixel = true;
                self.sixel_geometry = Some((*width, *height));
            }
            Report::ModeStatus { mode, setting } => {
                let supported = matches!(setting, 1 | 2);
                match *mode {
                    MODE_SYNCHRONIZED_UPDATE => self.synchronized_update = supported,
                    MODE_UNICODE_CORE => {
                        self.unicode_width = supported;
                        if supported {
                            self.width_method = WidthMethod::Unicode;
                        }
                    }
                    MODE_IN_BAND_RESIZE => self.in_band_resize = supported,
                    other => tracing::debug!(mode = other, "ignoring unrequested mode report"),
                }
            }
            Report::Capability { name, .. } => match name.as_str() {
                "RGB" => self.truecolor = true,
                "Smulx" | "Setulc" => self.styled_underline = true,
                other => tracing::debug!(capability = other, "ignoring unrequested capability"),
            },
            Report::CellSize(dims) => {
                if dims.width_px > 0 && dims.height_px > 0 {
                    self.cell_size = *dims;
                }
            }
        }
        false
    }

    /// Apply the environment overrides. Overrides only narrow, except the width switch.
    pub fn apply_env(&mut self, config: &EnvConfig) {
        if config.legacy_sgr {
            self.legacy_sgr = true;
            self.styled_underline = false;
        }
        if let Some(method) = config.width_method {
            self.width_method = method;
        }
        if let Some(ceiling) = config.graphics_ceiling {
            self.graphics_ceiling = Some(ceiling);
        }
    }

    /// Best graphics protocol available under the configured ceiling. Half blocks need nothing
    /// beyond colors, so they are always available.
    pub fn graphics_protocol(&self) -> GraphicsProtocol {
        let ceiling = self.graphics_ceiling.unwrap_or(GraphicsProtocol::Kitty);
        if self.kitty_graphics && ceiling >= GraphicsProtocol::Kitty {
            GraphicsProtocol::Kitty
        } else if self.sixel && ceiling >= GraphicsProtocol::Sixel {
            GraphicsProtocol::Sixel
        } else {
            ceiling.min(GraphicsProtocol::HalfBlock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, CellDimensions, GraphicsProtocol, Report};
    use crate::config::EnvConfig;
    use crate::core::cell::WidthMethod;

    #[test]
    fn primary_da_ends_negotiation_and_reports_sixel() {
        let mut caps = Capabilities::default();
        assert!(!caps.apply(&Report::KittyKeyboard(1)));
        assert!(caps.apply(&Report::PrimaryDeviceAttributes(vec![62, 4, 22])));
        assert!(caps.sixel);
        assert!(caps.kitty_keyboard);
    }

    #[test]
    fn mode_reports_toggle_flags() {
        let mut caps = Capabilities::default();
        caps.apply(&Report::ModeStatus { mode: 2026, setting: 2 });
        caps.apply(&Report::ModeStatus { mode: 2027, setting: 1 });
        caps.apply(&Report::ModeStatus { mode: 2048, setting: 0 });
        assert!(caps.synchronized_update);
        assert!(caps.unicode_width);
        assert_eq!(caps.width_method, WidthMethod::Unicode);
        assert!(!caps.in_band_resize);
    }

    #[test]
    fn capability_replies() {
        let mut caps = Capabilities::default();
        caps.apply(&Report::Capability {
            name: "RGB".to_string(),
            value: Some("8".to_string()),
        });
        caps.apply(&Report::Capability {
            name: "Smulx".to_string(),
            value: None,
        });
        assert!(caps.truecolor);
        assert!(caps.styled_underline);
    }

    #[test]
    fn zero_cell_size_is_ignored() {
        let mut caps = Capabilities::default();
        caps.apply(&Report::CellSize(CellDimensions {
            width_px: 0,
            height_px: 20,
        }));
        assert_eq!(caps.cell_size, CellDimensions::default());
    }

    #[test]
    fn env_overrides_narrow() {
        let mut caps = Capabilities {
            styled_underline: true,
            kitty_graphics: true,
            unicode_width: true,
            width_method: WidthMethod::Unicode,
            ..Capabilities::default()
        };
        caps.apply_env(&EnvConfig {
            legacy_sgr: true,
            width_method: Some(WidthMethod::Wcwidth),
            graphics_ceiling: Some(GraphicsProtocol::Sixel),
            ..EnvConfig::default()
        });
        assert!(caps.legacy_sgr);
        assert!(!caps.styled_underline);
        assert_eq!(caps.width_method, WidthMethod::Wcwidth);
        assert_eq!(caps.graphics_protocol(), GraphicsProtocol::HalfBlock);
    }

    #[test]
    fn graphics_protocol_prefers_kitty() {
        let caps = Capabilities {
            kitty_graphics: true,
            sixel: true,
            ..Capabilities::default()
        };
        assert_eq!(caps.graphics_protocol(), GraphicsProtocol::Kitty);
        assert_eq!(
            Capabilities::default().graphics_protocol(),
            GraphicsProtocol::HalfBlock
        );
    }

    #[test]
    fn colorterm_seeds_truecolor() {
        assert!(Capabilities::from_colorterm(Some("truecolor")).truecolor);
        assert!(Capabilities::from_colorterm(Some("24BIT")).truecolor);
        assert!(!Capabilities::from_colorterm(Some("256")).truecolor);
        assert!(!Capabilities::from_colorterm(None).truecolor);
    }
}
