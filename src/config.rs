//! Environment configuration.
//!
//! Every variable is read once, when the engine is constructed.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::capabilities::GraphicsProtocol;
use crate::core::cell::WidthMethod;

const DEFAULT_NEGOTIATION_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// `TAPE_VT_LEGACY_SGR=1`: emit semicolon-delimited SGR parameters.
    pub legacy_sgr: bool,
    /// `TAPE_VT_WIDTH=wcwidth|unicode`: force a grapheme width algorithm.
    pub width_method: Option<WidthMethod>,
    /// `TAPE_VT_GRAPHICS=none|halfblock|sixel|kitty`: highest graphics protocol allowed.
    pub graphics_ceiling: Option<GraphicsProtocol>,
    /// `TAPE_VT_WRITE_LOG`: tee every output write to this file.
    pub write_log: Option<PathBuf>,
    /// `TAPE_VT_DEBUG_LOG`: install a tracing subscriber writing to this file.
    pub debug_log: Option<PathBuf>,
    /// `TAPE_VT_NEGOTIATION_TIMEOUT_MS`: negotiation deadline.
    pub negotiation_timeout: Duration,
    /// `COLORTERM`: `truecolor` or `24bit` enables 24-bit color before any query is answered.
    pub colorterm: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            legacy_sgr: false,
            width_method: None,
            graphics_ceiling: None,
            write_log: None,
            debug_log: None,
            negotiation_timeout: Duration::from_millis(DEFAULT_NEGOTIATION_TIMEOUT_MS),
            colorterm: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            legacy_sgr: env_flag("TAPE_VT_LEGACY_SGR"),
            width_method: env_string_opt("TAPE_VT_WIDTH").and_then(|value| parse_width(&value)),
            graphics_ceiling: env_string_opt("TAPE_VT_GRAPHICS")
                .and_then(|value| parse_graphics(&value)),
            write_log: env_string_opt("TAPE_VT_WRITE_LOG").map(PathBuf::from),
            debug_log: env_string_opt("TAPE_VT_DEBUG_LOG").map(PathBuf::from),
            negotiation_timeout: env_string_opt("TAPE_VT_NEGOTIATION_TIMEOUT_MS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(DEFAULT_NEGOTIATION_TIMEOUT_MS)),
            colorterm: env_string_opt("COLORTERM"),
        }
    }
}

fn parse_width(value: &str) -> Option<WidthMethod> {
    match value.trim().to_ascii_lowercase().as_str() {
        "wcwidth" => Some(WidthMethod::Wcwidth),
        "unicode" => Some(WidthMethod::Unicode),
        other => {
            tracing::debug!(value = other, "ignoring unknown TAPE_VT_WIDTH");
            None
        }
    }
}

fn parse_graphics(value: &str) -> Option<GraphicsProtocol> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => Some(GraphicsProtocol::None),
        "halfblock" | "half-block" | "blocks" => Some(GraphicsProtocol::HalfBlock),
        "sixel" => Some(GraphicsProtocol::Sixel),
        "kitty" => Some(GraphicsProtocol::Kitty),
        other => {
            tracing::debug!(value = other, "ignoring unknown TAPE_VT_GRAPHICS");
            None
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
