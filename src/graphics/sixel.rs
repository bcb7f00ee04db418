//! Sixel encoding against a fixed 6x6x6 color cube.

use std::io::Write;

use image::RgbaImage;

const LEVELS: u32 = 6;
const PALETTE_SIZE: usize = (LEVELS * LEVELS * LEVELS) as usize;
/// Pixels with less alpha than this are left transparent.
const ALPHA_THRESHOLD: u8 = 128;

fn level(channel: u8) -> u32 {
    (channel as u32 * (LEVELS - 1) + 127) / 255
}

fn palette_index(r: u8, g: u8, b: u8) -> usize {
    (level(r) * LEVELS * LEVELS + level(g) * LEVELS + level(b)) as usize
}

/// Color register definition in percent, the unit sixel uses for RGB.
fn push_register(buf: &mut Vec<u8>, index: usize) {
    let index = index as u32;
    let percent = |value: u32| value * 100 / (LEVELS - 1);
    let r = index / (LEVELS * LEVELS);
    let g = (index / LEVELS) % LEVELS;
    let b = index % LEVELS;
    let _ = write!(
        buf,
        "#{index};2;{};{};{}",
        percent(r),
        percent(g),
        percent(b)
    );
}

fn push_run(buf: &mut Vec<u8>, sixel: u8, count: usize) {
    let ch = 0x3f + sixel;
    match count {
        0 => {}
        1..=3 => buf.extend(std::iter::repeat(ch).take(count)),
        _ => {
            let _ = write!(buf, "!{count}");
            buf.push(ch);
        }
    }
}

/// Encode `pixels` as a complete DCS sixel sequence with a transparent background.
pub(crate) fn encode(pixels: &RgbaImage) -> Vec<u8> {
    let (width, height) = (pixels.width() as usize, pixels.height() as usize);
    let indices: Vec<Option<usize>> = pixels
        .pixels()
        .map(|pixel| {
            let [r, g, b, a] = pixel.0;
            (a >= ALPHA_THRESHOLD).then(|| palette_index(r, g, b))
        })
        .collect();

    let mut used = [false; PALETTE_SIZE];
    for index in indices.iter().flatten() {
        used[*index] = true;
    }

    let mut buf = Vec::new();
    let _ = write!(buf, "\x1bP0;1;0q\"1;1;{width};{height}");
    for (index, _) in used.iter().enumerate().filter(|(_, used)| **used) {
        push_register(&mut buf, index);
    }

    let mut band_columns = vec![0u8; width];
    for band_top in (0..height).step_by(6) {
        let band_rows = (height - band_top).min(6);
        let mut band_colors: Vec<usize> = (0..band_rows)
            .flat_map(|dy| {
                let start = (band_top + dy) * width;
                indices[start..start + width].iter().flatten().copied()
            })
            .collect();
        band_colors.sort_unstable();
        band_colors.dedup();

        for (position, color) in band_colors.iter().enumerate() {
            band_columns.iter_mut().for_each(|bits| *bits = 0);
            for dy in 0..band_rows {
                let start = (band_top + dy) * width;
                for (x, index) in indices[start..start + width].iter().enumerate() {
                    if *index == Some(*color) {
                        band_columns[x] |= 1 << dy;
                    }
                }
            }

            if position > 0 {
                buf.push(b'$');
            }
            let _ = write!(buf, "#{color}");
            let mut run_value = band_columns[0];
            let mut run_length = 0;
            for bits in &band_columns {
                if *bits == run_value {
                    run_length += 1;
                } else {
                    push_run(&mut buf, run_value, run_length);
                    run_value = *bits;
                    run_length = 1;
                }
            }
            // Trailing empty columns need not be sent.
            if run_value != 0 {
                push_run(&mut buf, run_value, run_length);
            }
        }
        buf.push(b'-');
    }
    buf.extend_from_slice(b"\x1b\\");
    buf
}
