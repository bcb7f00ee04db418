//! Capability negotiation and the terminal modes enabled after it.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use crate::core::capabilities::{
    Capabilities, MODE_IN_BAND_RESIZE, MODE_SYNCHRONIZED_UPDATE, MODE_UNICODE_CORE,
};
use crate::core::cell::WidthMethod;
use crate::core::event::{Event, Inbound};
use crate::error::{Error, Result};
use crate::runtime::queue::Queue;

/// XTGETTCAP names queried, in order.
const TERMCAP_QUERIES: [&str; 3] = ["RGB", "Smulx", "Setulc"];

const KITTY_GRAPHICS_PROBE: &str = "\x1b_Gi=31,s=1,v=1,a=q,t=d,f=24;AAAA\x1b\\";

/// Every query, written as one block. Primary device attributes go last: every terminal answers
/// them, so their reply means all other replies have arrived.
pub fn query_battery() -> String {
    let mut out = String::from("\x1b[?u");
    out.push_str(KITTY_GRAPHICS_PROBE);
    out.push_str("\x1b[?2;1;0S");
    for mode in [
        MODE_SYNCHRONIZED_UPDATE,
        MODE_UNICODE_CORE,
        MODE_IN_BAND_RESIZE,
    ] {
        let _ = write!(out, "\x1b[?{mode}$p");
    }
    out.push_str("\x1b[>0q");
    out.push_str("\x1b[=c");
    for name in TERMCAP_QUERIES {
        out.push_str("\x1bP+q");
        for byte in name.bytes() {
            let _ = write!(out, "{byte:02X}");
        }
        out.push_str("\x1b\\");
    }
    out.push_str("\x1b[16t");
    out.push_str("\x1b[c");
    out
}

/// Pull replies from `queue` into `caps` until primary device attributes arrive.
///
/// User events seen meanwhile are appended to `buffered` in arrival order. On timeout the
/// capabilities found so far stay set.
pub(crate) fn await_replies(
    queue: &Queue<Inbound>,
    caps: &mut Capabilities,
    timeout: Duration,
    buffered: &mut VecDeque<Event>,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::NegotiationTimeout(timeout));
        }
        match queue.pop_timeout(remaining) {
            Ok(Inbound::Report(report)) => {
                tracing::debug!(?report, "negotiation reply");
                if caps.apply(&report) {
                    return Ok(());
                }
            }
            Ok(Inbound::Event(event)) => buffered.push_back(event),
            Err(RecvTimeoutError::Timeout) => return Err(Error::NegotiationTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => return Err(Error::InputClosed),
        }
    }
}

/// Whether the terminal should measure graphemes with the Unicode core algorithm.
fn unicode_core(caps: &Capabilities) -> bool {
    caps.unicode_width && caps.width_method == WidthMethod::Unicode
}

/// Modes enabled after negotiation: alternate screen, bracketed paste, SGR any-motion mouse,
/// focus reporting, then whatever the terminal supports.
pub fn enable_modes(caps: &Capabilities) -> String {
    let mut out = String::from("\x1b[?1049h\x1b[?2004h\x1b[?1003h\x1b[?1006h\x1b[?1004h");
    if caps.kitty_keyboard {
        out.push_str("\x1b[>31u");
    }
    if unicode_core(caps) {
        let _ = write!(out, "\x1b[?{MODE_UNICODE_CORE}h");
    }
    if caps.in_band_resize {
        let _ = write!(out, "\x1b[?{MODE_IN_BAND_RESIZE}h");
    }
    out
}

/// Reverse of [`enable_modes`], plus a visible default cursor and reset attributes.
pub fn disable_modes(caps: &Capabilities) -> String {
    let mut out = String::from("\x1b[0m\x1b[0 q\x1b[?25h");
    if caps.in_band_resize {
        let _ = write!(out, "\x1b[?{MODE_IN_BAND_RESIZE}l");
    }
    if unicode_core(caps) {
        let _ = write!(out, "\x1b[?{MODE_UNICODE_CORE}l");
    }
    if caps.kitty_keyboard {
        out.push_str("\x1b[<u");
    }
    out.push_str("\x1b[?1004l\x1b[?1006l\x1b[?1003l\x1b[?2004l\x1b[?1049l");
    out
}
