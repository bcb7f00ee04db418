//! Images drawn through whichever graphics protocol the terminal supports.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::core::capabilities::{CellDimensions, GraphicsProtocol};
use crate::core::event::{Event, Inbound};
use crate::graphics::placement::{Placement, PlacementStyle};
use crate::graphics::{blocks, kitty, sixel};
use crate::render::screen::Window;
use crate::runtime::queue::Queue;

/// An image bound to one graphics protocol, chosen once at creation.
///
/// Every variant shares one contract: [`Image::draw`] submits the image to a window for the next
/// render, [`Image::resize`] changes the cell area it covers, [`Image::destroy`] releases it.
#[derive(Debug)]
pub enum Image {
    Kitty(KittyImage),
    Sixel(SixelImage),
    HalfBlock(HalfBlockImage),
}

/// Pixels plus the cell area they are drawn into.
#[derive(Debug, Clone)]
struct Frame {
    id: u32,
    source: Arc<RgbaImage>,
    cols: u16,
    rows: u16,
}

impl Frame {
    fn new(id: u32, source: RgbaImage, cell: CellDimensions) -> Self {
        let cells = |pixels: u32, per_cell: u32| -> u16 {
            let per_cell = per_cell.max(1);
            u16::try_from(pixels.div_ceil(per_cell)).unwrap_or(u16::MAX)
        };
        Self {
            id,
            cols: cells(source.width(), cell.width_px),
            rows: cells(source.height(), cell.height_px),
            source: Arc::new(source),
        }
    }

    /// Size clipped to what fits in `window`.
    fn fitted(&self, window: &Window<'_>) -> (u16, u16) {
        (
            self.cols.min(window.width()),
            self.rows.min(window.height()),
        )
    }
}

impl Image {
    /// Build the variant for `protocol`. `None` when graphics are disabled.
    pub(crate) fn new(
        id: u32,
        pixels: RgbaImage,
        protocol: GraphicsProtocol,
        cell: CellDimensions,
        queue: &Queue<Inbound>,
    ) -> Option<Self> {
        let frame = Frame::new(id, pixels, cell);
        match protocol {
            GraphicsProtocol::None => None,
            GraphicsProtocol::HalfBlock => Some(Image::HalfBlock(HalfBlockImage {
                frame,
                scaled: None,
            })),
            GraphicsProtocol::Sixel => Some(Image::Sixel(SixelImage {
                frame,
                cell,
                state: Arc::new(Mutex::new(SixelState::default())),
                queue: queue.clone(),
            })),
            GraphicsProtocol::Kitty => Some(Image::Kitty(KittyImage { frame })),
        }
    }

    fn frame(&self) -> &Frame {
        match self {
            Image::Kitty(image) => &image.frame,
            Image::Sixel(image) => &image.frame,
            Image::HalfBlock(image) => &image.frame,
        }
    }

    pub fn id(&self) -> u32 {
        self.frame().id
    }

    pub fn protocol(&self) -> GraphicsProtocol {
        match self {
            Image::Kitty(_) => GraphicsProtocol::Kitty,
            Image::Sixel(_) => GraphicsProtocol::Sixel,
            Image::HalfBlock(_) => GraphicsProtocol::HalfBlock,
        }
    }

    /// Cell area as `(cols, rows)`.
    pub fn cell_size(&self) -> (u16, u16) {
        let frame = self.frame();
        (frame.cols, frame.rows)
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        let frame = match self {
            Image::Kitty(image) => &mut image.frame,
            Image::Sixel(image) => &mut image.frame,
            Image::HalfBlock(image) => &mut image.frame,
        };
        frame.cols = cols;
        frame.rows = rows;
    }

    /// Submit the image at the window's top-left corner, clipped to the window.
    pub fn draw(&mut self, window: &mut Window<'_>) {
        match self {
            Image::Kitty(image) => image.draw(window),
            Image::Sixel(image) => image.draw(window),
            Image::HalfBlock(image) => image.draw(window),
        }
    }

    /// Bytes that free terminal-side resources. Placements must be removed from the screen
    /// separately.
    pub fn destroy(self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Image::Kitty(image) = &self {
            kitty::destroy(&mut buf, image.frame.id);
        }
        buf
    }

    /// Bytes that upload the pixels, for protocols that keep images terminal-side.
    pub(crate) fn upload(&self) -> Option<Vec<u8>> {
        let Image::Kitty(image) = self else {
            return None;
        };
        let mut buf = Vec::new();
        kitty::transmit(&mut buf, image.frame.id, &image.frame.source);
        Some(buf)
    }
}

#[derive(Debug)]
pub struct KittyImage {
    frame: Frame,
}

impl KittyImage {
    fn draw(&self, window: &mut Window<'_>) {
        let (cols, rows) = self.frame.fitted(window);
        if cols == 0 || rows == 0 {
            return;
        }
        let id = self.frame.id;
        let (col, row) = window.origin();
        let placement = kitty::placement_id(col, row);
        window.place(Placement::new(
            id,
            0,
            0,
            cols,
            rows,
            PlacementStyle::Kitty,
            Arc::new(move |buf: &mut Vec<u8>| kitty::place(buf, id, placement, cols, rows)),
            Arc::new(move |buf: &mut Vec<u8>| kitty::delete_placement(buf, id, placement)),
        ));
    }
}

#[derive(Debug, Default)]
struct SixelState {
    /// Cell size the current or last encode was started for.
    target: Option<(u16, u16)>,
    encoded: Option<Arc<Vec<u8>>>,
}

#[derive(Debug)]
pub struct SixelImage {
    frame: Frame,
    cell: CellDimensions,
    state: Arc<Mutex<SixelState>>,
    queue: Queue<Inbound>,
}

fn lock(state: &Mutex<SixelState>) -> MutexGuard<'_, SixelState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SixelImage {
    fn draw(&self, window: &mut Window<'_>) {
        let (cols, rows) = self.frame.fitted(window);
        if cols == 0 || rows == 0 {
            return;
        }
        let mut state = lock(&self.state);
        if state.target != Some((cols, rows)) {
            state.target = Some((cols, rows));
            state.encoded = None;
            drop(state);
            self.start_encode(cols, rows);
            return;
        }
        let Some(encoded) = state.encoded.clone() else {
            return;
        };
        window.place(Placement::new(
            self.frame.id,
            0,
            0,
            cols,
            rows,
            PlacementStyle::Sixel,
            Arc::new(move |buf: &mut Vec<u8>| buf.extend_from_slice(&encoded)),
            Arc::new(|_: &mut Vec<u8>| {}),
        ));
    }

    /// Resample and encode off the render path; a `Redraw` is posted when done.
    fn start_encode(&self, cols: u16, rows: u16) {
        let width = u32::from(cols) * self.cell.width_px;
        let height = u32::from(rows) * self.cell.height_px;
        if width == 0 || height == 0 {
            tracing::warn!(id = self.frame.id, "sixel target has no pixels");
            return;
        }
        let source = Arc::clone(&self.frame.source);
        let state = Arc::clone(&self.state);
        let queue = self.queue.clone();
        let spawned = thread::Builder::new()
            .name("tape-vt-sixel".to_string())
            .spawn(move || {
                let scaled = imageops::resize(&*source, width, height, FilterType::Triangle);
                let encoded = sixel::encode(&scaled);
                {
                    let mut state = lock(&state);
                    // A newer size superseded this encode.
                    if state.target != Some((cols, rows)) {
                        return;
                    }
                    state.encoded = Some(Arc::new(encoded));
                }
                queue.push(Inbound::Event(Event::Redraw));
            });
        if let Err(err) = spawned {
            tracing::warn!(id = self.frame.id, error = %err, "failed to start sixel encoder");
        }
    }
}

#[derive(Debug)]
pub struct HalfBlockImage {
    frame: Frame,
    scaled: Option<((u16, u16), RgbaImage)>,
}

impl HalfBlockImage {
    fn draw(&mut self, window: &mut Window<'_>) {
        let (cols, rows) = self.frame.fitted(window);
        if cols == 0 || rows == 0 {
            return;
        }
        let stale = self
            .scaled
            .as_ref()
            .map(|(size, _)| *size != (cols, rows))
            .unwrap_or(true);
        if stale {
            let scaled = blocks::scale(&self.frame.source, cols, rows);
            self.scaled = Some(((cols, rows), scaled));
        }
        if let Some((_, scaled)) = &self.scaled {
            blocks::draw(window, scaled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Image;
    use crate::core::capabilities::{Capabilities, CellDimensions, GraphicsProtocol};
    use crate::core::event::{Event, Inbound};
    use crate::render::renderer::DiffRenderer;
    use crate::render::screen::Screen;
    use crate::runtime::queue::Queue;
    use image::{Rgba, RgbaImage};
    use std::time::Duration;

    fn pixels(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]))
    }

    fn image(protocol: GraphicsProtocol, queue: &Queue<Inbound>) -> Image {
        Image::new(7, pixels(90, 36), protocol, CellDimensions::default(), queue).unwrap()
    }

    #[test]
    fn default_size_comes_from_cell_pixels() {
        let queue = Queue::new();
        assert_eq!(image(GraphicsProtocol::Kitty, &queue).cell_size(), (10, 2));
        let odd = Image::new(
            1,
            pixels(10, 19),
            GraphicsProtocol::HalfBlock,
            CellDimensions::default(),
            &queue,
        )
        .unwrap();
        assert_eq!(odd.cell_size(), (2, 2));
    }

    #[test]
    fn disabled_graphics_build_nothing() {
        let queue = Queue::new();
        assert!(Image::new(
            1,
            pixels(1, 1),
            GraphicsProtocol::None,
            CellDimensions::default(),
            &queue
        )
        .is_none());
    }

    #[test]
    fn kitty_draw_places_clipped_to_window() {
        let queue = Queue::new();
        let mut image = image(GraphicsProtocol::Kitty, &queue);
        let mut screen = Screen::new(20, 10);
        image.draw(&mut screen.window().child(15, 3, -1, -1));
        let placement = &screen.placements()[0];
        assert_eq!((placement.col, placement.row), (15, 3));
        assert_eq!((placement.width, placement.height), (5, 2));
        assert!(image.upload().unwrap().starts_with(b"\x1b_Ga=t"));
        assert_eq!(image.destroy(), b"\x1b_Ga=d,d=I,i=7,q=2\x1b\\".to_vec());
    }

    #[test]
    fn removing_one_kitty_placement_keeps_the_others() {
        let queue = Queue::new();
        let caps = Capabilities::default();
        let mut image = image(GraphicsProtocol::Kitty, &queue);
        image.resize(2, 1);
        let mut screen = Screen::new(10, 1);
        let mut renderer = DiffRenderer::new(10, 1);
        image.draw(&mut screen.window().child(0, 0, -1, -1));
        image.draw(&mut screen.window().child(5, 0, -1, -1));

        let mut out = Vec::new();
        renderer.render(&mut screen, &caps, &mut out).unwrap();
        let first = String::from_utf8(out).unwrap();
        assert!(first.contains("\x1b[1;1H\x1b_Ga=p,i=7,p=1,c=2,r=1,C=1,q=2\x1b\\"));
        assert!(first.contains("\x1b[1;6H\x1b_Ga=p,i=7,p=6,c=2,r=1,C=1,q=2\x1b\\"));

        screen.window().child(0, 0, 5, 1).remove_placements(7);
        assert_eq!(screen.placements().len(), 1);
        let mut out = Vec::new();
        renderer.render(&mut screen, &caps, &mut out).unwrap();
        let second = String::from_utf8(out).unwrap();
        assert!(second.contains("\x1b_Ga=d,d=i,i=7,p=1,q=2\x1b\\"));
        assert!(!second.contains("p=6"));
    }

    #[test]
    fn half_block_draw_writes_cells() {
        let queue = Queue::new();
        let mut image = image(GraphicsProtocol::HalfBlock, &queue);
        image.resize(3, 1);
        let mut screen = Screen::new(5, 2);
        image.draw(&mut screen.window());
        assert!(screen.placements().is_empty());
        assert_eq!(screen.grid().get(2, 0).unwrap().character.grapheme(), "▀");
        assert_eq!(screen.grid().get(3, 0).unwrap().character.grapheme(), " ");
        assert!(image.upload().is_none());
    }

    #[test]
    fn sixel_encodes_in_background_then_places() {
        let queue = Queue::new();
        let mut image = image(GraphicsProtocol::Sixel, &queue);
        let mut screen = Screen::new(20, 5);
        image.draw(&mut screen.window());
        assert!(screen.placements().is_empty());

        assert_eq!(
            queue.pop_timeout(Duration::from_secs(5)),
            Ok(Inbound::Event(Event::Redraw))
        );
        image.draw(&mut screen.window());
        assert_eq!(screen.placements().len(), 1);
        let mut buf = Vec::new();
        screen.placements()[0].write_into(&mut buf);
        assert!(buf.starts_with(b"\x1bP0;1;0q\"1;1;90;36"));
        assert!(image.destroy().is_empty());
    }
}
