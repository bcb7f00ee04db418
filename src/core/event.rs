//! Events delivered to the application.

use crate::core::capabilities::Report;
use crate::core::key::Key;
use crate::core::mouse::Mouse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resize {
    pub cols: u16,
    pub rows: u16,
    pub width_px: u16,
    pub height_px: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    Mouse(Mouse),
    Paste(String),
    Resize(Resize),
    /// Background work finished and the screen should be rendered again.
    Redraw,
    FocusIn,
    FocusOut,
    /// Cell pixel size changed after negotiation.
    CellSize,
}

/// One decoded item: either for the application or for the negotiation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Event(Event),
    Report(Report),
}

impl From<Event> for Inbound {
    fn from(event: Event) -> Self {
        Inbound::Event(event)
    }
}

impl From<Report> for Inbound {
    fn from(report: Report) -> Self {
        Inbound::Report(report)
    }
}
