//! Fixed-size cell grid.

use crate::core::cell::Cell;

/// A `cols x rows` array of cells stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::filled(cols, rows, Cell::default())
    }

    pub fn filled(cols: u16, rows: u16, cell: Cell) -> Self {
        Self {
            cols,
            rows,
            cells: vec![cell; cols as usize * rows as usize],
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    fn index(&self, col: u16, row: u16) -> Option<usize> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(row as usize * self.cols as usize + col as usize)
    }

    pub fn get(&self, col: u16, row: u16) -> Option<&Cell> {
        self.index(col, row).map(|idx| &self.cells[idx])
    }

    pub fn get_mut(&mut self, col: u16, row: u16) -> Option<&mut Cell> {
        self.index(col, row).map(move |idx| &mut self.cells[idx])
    }

    /// Out-of-bounds writes are discarded.
    pub fn set(&mut self, col: u16, row: u16, cell: Cell) {
        if let Some(slot) = self.get_mut(col, row) {
            *slot = cell;
        }
    }

    pub fn fill(&mut self, cell: &Cell) {
        for slot in &mut self.cells {
            slot.clone_from(cell);
        }
    }

    pub fn row(&self, row: u16) -> &[Cell] {
        if row >= self.rows {
            return &[];
        }
        let start = row as usize * self.cols as usize;
        &self.cells[start..start + self.cols as usize]
    }

    /// Apply `f` to every in-bounds cell of the given rectangle.
    pub(crate) fn for_each_in_rect(
        &mut self,
        col: u16,
        row: u16,
        width: u16,
        height: u16,
        mut f: impl FnMut(&mut Cell),
    ) {
        let col_end = col.saturating_add(width).min(self.cols);
        let row_end = row.saturating_add(height).min(self.rows);
        for r in row..row_end {
            for c in col..col_end {
                if let Some(cell) = self.get_mut(c, r) {
                    f(cell);
                }
            }
        }
    }
}
