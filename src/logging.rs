//! File-backed tracing setup.
//!
//! The terminal is the UI, so diagnostics never go to stdout/stderr. When a debug log path is
//! configured, a `tracing-subscriber` fmt layer writes plain text to that file instead.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Env var holding an `EnvFilter` directive for the debug log.
pub const LOG_FILTER_ENV: &str = "TAPE_VT_LOG_FILTER";

const DEFAULT_FILTER: &str = "debug";

/// Install a global subscriber appending to `path`.
///
/// Fails if the file cannot be opened or another global subscriber is already installed.
pub fn init_file_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}

/// Escape control bytes so raw sequences are readable in log lines.
pub fn escape_for_log(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &byte in data {
        match byte {
            0x1b => out.push_str("\\e"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x00..=0x1f | 0x7f => out.push_str(&format!("\\x{byte:02x}")),
            _ => out.push(byte as char),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_for_log;

    #[test]
    fn control_bytes_are_escaped() {
        assert_eq!(escape_for_log(b"\x1b[?u\x07ok"), "\\e[?u\\x07ok");
        assert_eq!(escape_for_log(b"a\r\n"), "a\\r\\n");
    }
}
