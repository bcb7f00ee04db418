//! Desired screen state and the windows that write into it.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::core::cell::{Cell, Character, WidthMethod};
use crate::core::grid::Grid;
use crate::core::style::{Hyperlink, Style};
use crate::graphics::placement::Placement;

/// DECSCUSR cursor shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorShape {
    #[default]
    Default,
    BlockBlink,
    Block,
    UnderlineBlink,
    Underline,
    BeamBlink,
    Beam,
}

impl CursorShape {
    pub(crate) fn decscusr(self) -> u8 {
        match self {
            CursorShape::Default => 0,
            CursorShape::BlockBlink => 1,
            CursorShape::Block => 2,
            CursorShape::UnderlineBlink => 3,
            CursorShape::Underline => 4,
            CursorShape::BeamBlink => 5,
            CursorShape::Beam => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    pub visible: bool,
    pub col: u16,
    pub row: u16,
    pub shape: CursorShape,
}

/// What the application wants visible: the desired grid, cursor and graphic placements.
#[derive(Debug, Default)]
pub struct Screen {
    grid: Grid,
    cursor: CursorState,
    width_method: WidthMethod,
    placements: Vec<Placement>,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            grid: Grid::new(cols, rows),
            ..Self::default()
        }
    }

    pub fn cols(&self) -> u16 {
        self.grid.cols()
    }

    pub fn rows(&self) -> u16 {
        self.grid.rows()
    }

    /// Reallocate the grid. Contents and placements are dropped.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.grid = Grid::new(cols, rows);
        self.placements.clear();
        self.cursor.visible = false;
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    pub fn width_method(&self) -> WidthMethod {
        self.width_method
    }

    pub fn set_width_method(&mut self, method: WidthMethod) {
        self.width_method = method;
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Root window covering the whole screen.
    pub fn window(&mut self) -> Window<'_> {
        let (width, height) = (self.cols(), self.rows());
        Window {
            screen: self,
            col: 0,
            row: 0,
            width,
            height,
        }
    }
}

/// A rectangular view into a [`Screen`], in root-grid coordinates.
///
/// Every local coordinate is checked against the window bounds before translation, so writes
/// outside the window are discarded.
#[derive(Debug)]
pub struct Window<'a> {
    screen: &'a mut Screen,
    col: u16,
    row: u16,
    width: u16,
    height: u16,
}

impl<'a> Window<'a> {
    /// Nested window at local `(col, row)`. A negative `width` or `height` extends the child to
    /// this window's edge; otherwise the child is clipped to it.
    pub fn child(&mut self, col: u16, row: u16, width: i32, height: i32) -> Window<'_> {
        let col = col.min(self.width);
        let row = row.min(self.height);
        let max_width = self.width - col;
        let max_height = self.height - row;
        let clip = |requested: i32, max: u16| -> u16 {
            if requested < 0 {
                max
            } else {
                (requested.min(u16::MAX as i32) as u16).min(max)
            }
        };
        Window {
            col: self.col + col,
            row: self.row + row,
            width: clip(width, max_width),
            height: clip(height, max_height),
            screen: &mut *self.screen,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Root-grid origin of this window.
    pub fn origin(&self) -> (u16, u16) {
        (self.col, self.row)
    }

    pub fn width_method(&self) -> WidthMethod {
        self.screen.width_method
    }

    fn contains(&self, col: u16, row: u16) -> bool {
        col < self.width && row < self.height
    }

    /// Write one cell. A wide cell also claims the next column; if that column is outside the
    /// window the write is discarded.
    pub fn set_cell(&mut self, col: u16, row: u16, cell: Cell) {
        if !self.contains(col, row) {
            return;
        }
        let wide = cell.width() == 2;
        if wide && !self.contains(col + 1, row) {
            return;
        }
        let (abs_col, abs_row) = (self.col + col, self.row + row);
        if wide {
            let continuation = Cell {
                character: Character::continuation(),
                style: cell.style,
                link: cell.link.clone(),
                graphic: false,
            };
            self.screen.grid.set(abs_col + 1, abs_row, continuation);
        }
        self.screen.grid.set(abs_col, abs_row, cell);
    }

    pub fn get_cell(&self, col: u16, row: u16) -> Option<&Cell> {
        if !self.contains(col, row) {
            return None;
        }
        self.screen.grid.get(self.col + col, self.row + row)
    }

    pub fn fill(&mut self, cell: &Cell) {
        let (col, row, width, height) = (self.col, self.row, self.width, self.height);
        self.screen
            .grid
            .for_each_in_rect(col, row, width, height, |slot| {
                let graphic = slot.graphic;
                slot.clone_from(cell);
                slot.graphic = graphic;
            });
    }

    /// Reset every cell to a blank and drop placements anchored inside the window.
    pub fn clear(&mut self) {
        self.fill(&Cell::default());
        let (col, row, width, height) = (self.col, self.row, self.width, self.height);
        self.screen
            .placements
            .retain(|placement| !placement.origin_within(col, row, width, height));
    }

    /// Print `text` on one row starting at `col`, clipped at the window edge. Returns the column
    /// after the last grapheme written.
    pub fn print(&mut self, col: u16, row: u16, text: &str, style: Style) -> u16 {
        self.print_cells(col, row, text, style, None)
    }

    /// Like [`Window::print`], with every cell carrying `link`.
    pub fn print_link(
        &mut self,
        col: u16,
        row: u16,
        text: &str,
        style: Style,
        link: Hyperlink,
    ) -> u16 {
        self.print_cells(col, row, text, style, Some(Arc::new(link)))
    }

    fn print_cells(
        &mut self,
        mut col: u16,
        row: u16,
        text: &str,
        style: Style,
        link: Option<Arc<Hyperlink>>,
    ) -> u16 {
        let method = self.screen.width_method;
        for grapheme in text.graphemes(true) {
            let character = Character::new(grapheme, method);
            let width = character.width() as u16;
            if width == 0 {
                continue;
            }
            if col.saturating_add(width) > self.width {
                break;
            }
            let mut cell = Cell::new(character, style);
            cell.link = link.clone();
            self.set_cell(col, row, cell);
            col += width;
        }
        col
    }

    pub fn show_cursor(&mut self, col: u16, row: u16) {
        if !self.contains(col, row) {
            return;
        }
        self.screen.cursor.visible = true;
        self.screen.cursor.col = self.col + col;
        self.screen.cursor.row = self.row + row;
    }

    pub fn hide_cursor(&mut self) {
        self.screen.cursor.visible = false;
    }

    pub fn set_cursor_shape(&mut self, shape: CursorShape) {
        self.screen.cursor.shape = shape;
    }

    /// Submit a placement whose position is local to this window. The origin must lie inside the
    /// window and the size is clipped to it.
    pub fn place(&mut self, mut placement: Placement) {
        if !self.contains(placement.col, placement.row) {
            return;
        }
        placement.width = placement.width.min(self.width - placement.col);
        placement.height = placement.height.min(self.height - placement.row);
        placement.col += self.col;
        placement.row += self.row;
        if !self.screen.placements.contains(&placement) {
            self.screen.placements.push(placement);
        }
    }

    /// Drop every placement of image `id` anchored in this window.
    pub fn remove_placements(&mut self, id: u32) {
        let (col, row, width, height) = (self.col, self.row, self.width, self.height);
        self.screen.placements.retain(|placement| {
            placement.id != id || !placement.origin_within(col, row, width, height)
        });
    }
}
