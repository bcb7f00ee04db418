//! Half-block rendering: each cell shows two vertically stacked pixels.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::core::cell::{Cell, Character};
use crate::core::color::Color;
use crate::core::style::Style;
use crate::render::screen::Window;

const UPPER_HALF: &str = "▀";
const ALPHA_THRESHOLD: u8 = 128;

fn pixel_color(pixel: &Rgba<u8>) -> Color {
    let [r, g, b, a] = pixel.0;
    if a < ALPHA_THRESHOLD {
        Color::DEFAULT
    } else {
        Color::rgb(r, g, b)
    }
}

/// Resample `source` to `cols x rows*2` pixels.
pub(crate) fn scale(source: &RgbaImage, cols: u16, rows: u16) -> RgbaImage {
    imageops::resize(
        source,
        u32::from(cols),
        u32::from(rows) * 2,
        FilterType::Triangle,
    )
}

/// Paint `scaled` (as produced by [`scale`]) into the window's top-left corner.
pub(crate) fn draw(window: &mut Window<'_>, scaled: &RgbaImage) {
    let method = window.width_method();
    let rows = scaled.height() / 2;
    for row in 0..rows {
        for col in 0..scaled.width() {
            let top = pixel_color(scaled.get_pixel(col, row * 2));
            let bottom = pixel_color(scaled.get_pixel(col, row * 2 + 1));
            let style = Style::default().fg(top).bg(bottom);
            let cell = Cell::new(Character::new(UPPER_HALF, method), style);
            // Coordinates beyond u16 are outside any window anyway.
            let (Ok(col), Ok(row)) = (u16::try_from(col), u16::try_from(row)) else {
                continue;
            };
            window.set_cell(col, row, cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{draw, scale};
    use crate::core::color::Color;
    use crate::render::screen::Screen;
    use image::{Rgba, RgbaImage};

    #[test]
    fn top_and_bottom_pixels_become_fg_and_bg() {
        let mut pixels = RgbaImage::from_pixel(1, 2, Rgba([255, 0, 0, 255]));
        pixels.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        let mut screen = Screen::new(3, 2);
        draw(&mut screen.window(), &pixels);

        let cell = screen.grid().get(0, 0).unwrap();
        assert_eq!(cell.character.grapheme(), "▀");
        assert_eq!(cell.style.foreground, Color::rgb(255, 0, 0));
        assert_eq!(cell.style.background, Color::rgb(0, 0, 255));
        assert_eq!(screen.grid().get(1, 0).unwrap().character.grapheme(), " ");
    }

    #[test]
    fn transparent_pixels_use_default_colors() {
        let pixels = RgbaImage::from_pixel(1, 2, Rgba([10, 20, 30, 0]));
        let mut screen = Screen::new(1, 1);
        draw(&mut screen.window(), &pixels);
        let cell = screen.grid().get(0, 0).unwrap();
        assert!(cell.style.foreground.is_default());
        assert!(cell.style.background.is_default());
    }

    #[test]
    fn scale_doubles_rows() {
        let pixels = RgbaImage::from_pixel(40, 40, Rgba([1, 2, 3, 255]));
        let scaled = scale(&pixels, 10, 5);
        assert_eq!((scaled.width(), scaled.height()), (10, 10));
    }
}
