//! Graphic placements and their per-cycle reconciliation.

use std::fmt;
use std::sync::Arc;

use crate::core::cell::Cell;
use crate::core::grid::Grid;

/// Writes protocol bytes for a placement into the render buffer.
pub type PlacementAction = Arc<dyn Fn(&mut Vec<u8>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStyle {
    Kitty,
    /// Sixel has no delete primitive; stale pixels are painted over by the text pass.
    Sixel,
}

/// One graphic on screen. Equality is identity, origin and size; actions are ignored.
#[derive(Clone)]
pub struct Placement {
    pub id: u32,
    pub col: u16,
    pub row: u16,
    pub width: u16,
    pub height: u16,
    pub style: PlacementStyle,
    write: PlacementAction,
    delete: PlacementAction,
}

impl Placement {
    pub fn new(
        id: u32,
        col: u16,
        row: u16,
        width: u16,
        height: u16,
        style: PlacementStyle,
        write: PlacementAction,
        delete: PlacementAction,
    ) -> Self {
        Self {
            id,
            col,
            row,
            width,
            height,
            style,
            write,
            delete,
        }
    }

    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) {
        (self.write)(buf);
    }

    pub(crate) fn delete_into(&self, buf: &mut Vec<u8>) {
        (self.delete)(buf);
    }

    fn mark(&self, grid: &mut Grid, occupied: bool) {
        grid.for_each_in_rect(self.col, self.row, self.width, self.height, |cell| {
            cell.graphic = occupied;
        });
    }

    /// Whether the top-left corner lies inside the rectangle.
    pub(crate) fn origin_within(&self, col: u16, row: u16, width: u16, height: u16) -> bool {
        self.col >= col
            && self.row >= row
            && (self.col - col) < width
            && (self.row - row) < height
    }
}

impl PartialEq for Placement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.col == other.col
            && self.row == other.row
            && self.width == other.width
            && self.height == other.height
    }
}

impl Eq for Placement {}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placement")
            .field("id", &self.id)
            .field("col", &self.col)
            .field("row", &self.row)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("style", &self.style)
            .finish()
    }
}

/// Placements to delete and draw this cycle.
#[derive(Debug, Default)]
pub(crate) struct Reconciled {
    pub deleted: Vec<Placement>,
    pub added: Vec<Placement>,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.added.is_empty()
    }
}

/// Tracks the placements drawn by the previous cycle.
#[derive(Debug, Default)]
pub(crate) struct PlacementReconciler {
    active: Vec<Placement>,
}

impl PlacementReconciler {
    /// Diff `next` against the active set and update the occupied-by-graphic marks.
    ///
    /// With `redraw_all`, every active placement is deleted and every submitted one drawn.
    pub fn reconcile(
        &mut self,
        next: &[Placement],
        desired: &mut Grid,
        committed: &mut Grid,
        redraw_all: bool,
    ) -> Reconciled {
        let previous = std::mem::take(&mut self.active);
        let added: Vec<Placement> = next
            .iter()
            .filter(|placement| redraw_all || !previous.contains(placement))
            .cloned()
            .collect();
        let deleted: Vec<Placement> = previous
            .into_iter()
            .filter(|placement| redraw_all || !next.contains(placement))
            .collect();

        for placement in &deleted {
            placement.mark(desired, false);
            if placement.style == PlacementStyle::Kitty {
                committed.for_each_in_rect(
                    placement.col,
                    placement.row,
                    placement.width,
                    placement.height,
                    |cell| *cell = Cell::unknown(),
                );
            }
        }
        for placement in next {
            placement.mark(desired, true);
        }

        self.active = next.to_vec();

        Reconciled { deleted, added }
    }
}

#[cfg(test)]
mod tests {
    use super::{Placement, PlacementAction, PlacementReconciler, PlacementStyle};
    use crate::core::cell::Cell;
    use crate::core::grid::Grid;
    use std::sync::Arc;

    fn action(tag: &'static str) -> PlacementAction {
        Arc::new(move |buf: &mut Vec<u8>| buf.extend_from_slice(tag.as_bytes()))
    }

    fn placement(col: u16, row: u16, style: PlacementStyle) -> Placement {
        Placement::new(7, col, row, 2, 2, style, action("W"), action("D"))
    }

    #[test]
    fn identical_resubmission_is_a_no_op() {
        let mut reconciler = PlacementReconciler::default();
        let mut desired = Grid::new(10, 5);
        let mut committed = Grid::new(10, 5);
        let first = reconciler.reconcile(
            &[placement(1, 1, PlacementStyle::Kitty)],
            &mut desired,
            &mut committed,
            false,
        );
        assert_eq!(first.added.len(), 1);
        assert!(first.deleted.is_empty());

        let second = reconciler.reconcile(
            &[placement(1, 1, PlacementStyle::Kitty)],
            &mut desired,
            &mut committed,
            false,
        );
        assert!(second.is_empty());
    }

    #[test]
    fn moved_placement_is_one_delete_and_one_write() {
        let mut reconciler = PlacementReconciler::default();
        let mut desired = Grid::new(10, 5);
        let mut committed = Grid::new(10, 5);
        reconciler.reconcile(
            &[placement(0, 0, PlacementStyle::Kitty)],
            &mut desired,
            &mut committed,
            false,
        );
        let moved = reconciler.reconcile(
            &[placement(4, 2, PlacementStyle::Kitty)],
            &mut desired,
            &mut committed,
            false,
        );
        assert_eq!(moved.deleted, vec![placement(0, 0, PlacementStyle::Kitty)]);
        assert_eq!(moved.added, vec![placement(4, 2, PlacementStyle::Kitty)]);

        assert!(!desired.get(0, 0).unwrap().is_graphic());
        assert!(desired.get(4, 2).unwrap().is_graphic());
        assert!(desired.get(5, 3).unwrap().is_graphic());
        assert_eq!(committed.get(1, 1), Some(&Cell::unknown()));
    }

    #[test]
    fn sixel_delete_leaves_committed_cells_alone() {
        let mut reconciler = PlacementReconciler::default();
        let mut desired = Grid::new(10, 5);
        let mut committed = Grid::new(10, 5);
        reconciler.reconcile(
            &[placement(0, 0, PlacementStyle::Sixel)],
            &mut desired,
            &mut committed,
            false,
        );
        let cleared = reconciler.reconcile(&[], &mut desired, &mut committed, false);
        assert_eq!(cleared.deleted.len(), 1);
        assert_eq!(committed.get(0, 0), Some(&Cell::default()));
        assert!(!desired.get(0, 0).unwrap().is_graphic());
    }

    #[test]
    fn redraw_all_reissues_everything() {
        let mut reconciler = PlacementReconciler::default();
        let mut desired = Grid::new(10, 5);
        let mut committed = Grid::new(10, 5);
        let set = [placement(0, 0, PlacementStyle::Kitty)];
        reconciler.reconcile(&set, &mut desired, &mut committed, false);
        let again = reconciler.reconcile(&set, &mut desired, &mut committed, true);
        assert_eq!(again.deleted.len(), 1);
        assert_eq!(again.added.len(), 1);
        assert!(desired.get(0, 0).unwrap().is_graphic());
    }

    #[test]
    fn actions_write_into_buffer() {
        let p = placement(0, 0, PlacementStyle::Kitty);
        let mut buf = Vec::new();
        p.write_into(&mut buf);
        p.delete_into(&mut buf);
        assert_eq!(buf, b"WD");
    }
}
