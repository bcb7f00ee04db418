//! Diff renderer.
//!
//! Compares the desired grid against the committed grid (what the terminal is known to show)
//! and emits the smallest control sequence stream that reconciles them. A cycle with nothing to
//! change writes nothing.

use std::io::Write;
use std::sync::Arc;

use crate::core::capabilities::Capabilities;
use crate::core::cell::Cell;
use crate::core::grid::Grid;
use crate::core::style::{Hyperlink, Style};
use crate::error::Result;
use crate::graphics::placement::PlacementReconciler;
use crate::render::screen::{CursorState, Screen};
use crate::render::sgr::{
    push_attributes, push_background, push_cup, push_cursor_shape, push_foreground,
    push_hyperlink, push_underline_color, push_underline_style, HIDE_CURSOR, RESET, SHOW_CURSOR,
    SYNC_END, SYNC_START,
};

/// Terminal state tracked within one cycle.
#[derive(Debug, Default)]
struct Cycle {
    emitting: bool,
    sync_open: bool,
    /// Where the terminal cursor is after the last write, if known.
    positioned_at: Option<(u16, u16)>,
    pen: Style,
    link: Option<Arc<Hyperlink>>,
    cells_written: usize,
}

#[derive(Debug, Default)]
pub struct DiffRenderer {
    committed: Grid,
    placements: PlacementReconciler,
    /// Cursor state as last shown to the terminal.
    last_cursor: Option<CursorState>,
    force_full_redraw_next: bool,
    buffer: Vec<u8>,
}

impl DiffRenderer {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            committed: Grid::filled(cols, rows, Cell::unknown()),
            force_full_redraw_next: true,
            ..Self::default()
        }
    }

    /// Reallocate the committed grid; the next cycle redraws everything.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.committed = Grid::filled(cols, rows, Cell::unknown());
        self.last_cursor = None;
        self.force_full_redraw_next = true;
    }

    pub fn request_full_redraw_next(&mut self) {
        self.force_full_redraw_next = true;
    }

    pub fn committed(&self) -> &Grid {
        &self.committed
    }

    /// Incremental cycle. Writes once to `out`, and only if something changed.
    pub fn render<W: Write + ?Sized>(
        &mut self,
        screen: &mut Screen,
        caps: &Capabilities,
        out: &mut W,
    ) -> Result<()> {
        let full = std::mem::take(&mut self.force_full_redraw_next);
        self.cycle(screen, caps, full);
        self.flush(out)
    }

    /// Full cycle: every cell is re-sent and every placement re-issued.
    pub fn refresh<W: Write + ?Sized>(
        &mut self,
        screen: &mut Screen,
        caps: &Capabilities,
        out: &mut W,
    ) -> Result<()> {
        self.force_full_redraw_next = false;
        self.cycle(screen, caps, true);
        self.flush(out)
    }

    fn flush<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let result = out.write_all(&self.buffer).and_then(|()| out.flush());
        self.buffer.clear();
        result.map_err(Into::into)
    }

    fn cycle(&mut self, screen: &mut Screen, caps: &Capabilities, full: bool) {
        if self.committed.cols() != screen.cols() || self.committed.rows() != screen.rows() {
            self.resize(screen.cols(), screen.rows());
        }
        let full = full || std::mem::take(&mut self.force_full_redraw_next);
        if full {
            self.committed.fill(&Cell::unknown());
            self.last_cursor = None;
        }

        let mut cycle = Cycle::default();
        let next = screen.placements().to_vec();
        let reconciled =
            self.placements
                .reconcile(&next, screen.grid_mut(), &mut self.committed, full);
        if !reconciled.is_empty() {
            self.begin(&mut cycle, caps);
            for placement in &reconciled.deleted {
                placement.delete_into(&mut self.buffer);
            }
            for placement in &reconciled.added {
                push_cup(&mut self.buffer, placement.col, placement.row);
                placement.write_into(&mut self.buffer);
                cycle.positioned_at = None;
            }
        }

        self.diff_cells(screen.grid(), caps, &mut cycle);

        if cycle.emitting {
            if cycle.link.is_some() {
                push_hyperlink(&mut self.buffer, None);
            }
            self.buffer.extend_from_slice(RESET);
            if cycle.sync_open {
                self.buffer.extend_from_slice(SYNC_END);
            }
        }

        let cursor = screen.cursor();
        if cycle.emitting || self.last_cursor != Some(cursor) {
            self.push_cursor(cursor);
        }

        tracing::trace!(
            bytes = self.buffer.len(),
            cells = cycle.cells_written,
            placements_added = reconciled.added.len(),
            placements_deleted = reconciled.deleted.len(),
            full,
            "render cycle"
        );
    }

    /// Leave idle: hide the cursor and open the synchronized update bracket.
    fn begin(&mut self, cycle: &mut Cycle, caps: &Capabilities) {
        if cycle.emitting {
            return;
        }
        cycle.emitting = true;
        self.buffer.extend_from_slice(HIDE_CURSOR);
        if caps.synchronized_update {
            self.buffer.extend_from_slice(SYNC_START);
            cycle.sync_open = true;
        }
    }

    fn diff_cells(&mut self, desired: &Grid, caps: &Capabilities, cycle: &mut Cycle) {
        let cols = desired.cols();
        for row in 0..desired.rows() {
            // The cursor may have wrapped or stopped at the margin; never trust it across rows.
            cycle.positioned_at = None;
            let mut col = 0;
            while col < cols {
                let Some(cell) = desired.get(col, row) else {
                    break;
                };
                if cell.is_graphic() {
                    self.committed.set(col, row, cell.clone());
                    col += 1;
                    continue;
                }

                let lead = cell.width() == 2;
                let fits = lead
                    && desired
                        .get(col + 1, row)
                        .map(|next| next.width() == 0)
                        .unwrap_or(false);
                let unchanged = self.committed.get(col, row) == Some(cell)
                    && (!lead || self.committed.get(col + 1, row) == desired.get(col + 1, row));
                if unchanged {
                    col += if fits { 2 } else { 1 };
                    continue;
                }

                self.begin(cycle, caps);
                if cycle.positioned_at != Some((col, row)) {
                    push_cup(&mut self.buffer, col, row);
                }
                self.update_pen(cell, caps, cycle);

                if cell.width() == 0 || (lead && !fits) || cell == &Cell::unknown() {
                    // Orphaned continuation, or a wide grapheme with no second half.
                    self.buffer.push(b' ');
                } else {
                    self.buffer
                        .extend_from_slice(cell.character.grapheme().as_bytes());
                }
                cycle.cells_written += 1;

                let advance = if fits { 2 } else { 1 };
                // Overwriting the lead of a wide grapheme also erases its continuation.
                let clobbered = col + advance - 1;
                if self.committed.get(clobbered, row).map(Cell::width) == Some(2) {
                    self.committed.set(clobbered + 1, row, Cell::unknown());
                }
                self.committed.set(col, row, cell.clone());
                if fits {
                    if let Some(next) = desired.get(col + 1, row) {
                        self.committed.set(col + 1, row, next.clone());
                    }
                }
                col += advance;
                cycle.positioned_at = Some((col, row));
            }
        }
    }

    fn update_pen(&mut self, cell: &Cell, caps: &Capabilities, cycle: &mut Cycle) {
        let next = cell.style;
        let pen = &mut cycle.pen;
        if pen.foreground != next.foreground {
            push_foreground(&mut self.buffer, next.foreground, caps);
        }
        if pen.background != next.background {
            push_background(&mut self.buffer, next.background, caps);
        }
        if pen.underline_color != next.underline_color {
            push_underline_color(&mut self.buffer, next.underline_color, caps);
        }
        if pen.attributes != next.attributes {
            push_attributes(&mut self.buffer, pen.attributes, next.attributes);
        }
        if pen.underline != next.underline {
            push_underline_style(&mut self.buffer, next.underline, caps);
        }
        *pen = next;

        if cycle.link != cell.link {
            push_hyperlink(&mut self.buffer, cell.link.as_deref());
            cycle.link = cell.link.clone();
        }
    }

    fn push_cursor(&mut self, cursor: CursorState) {
        if cursor.visible {
            push_cup(&mut self.buffer, cursor.col, cursor.row);
            let shape_changed = self
                .last_cursor
                .map(|last| last.shape != cursor.shape)
                .unwrap_or(true);
            if shape_changed {
                push_cursor_shape(&mut self.buffer, cursor.shape.decscusr());
            }
            self.buffer.extend_from_slice(SHOW_CURSOR);
        } else {
            self.buffer.extend_from_slice(HIDE_CURSOR);
        }
        self.last_cursor = Some(cursor);
    }
}
