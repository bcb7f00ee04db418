//! Kitty graphics protocol commands.

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;

/// Base64 bytes per transmission chunk.
const CHUNK_SIZE: usize = 4096;

/// Transmit raw RGBA pixels for image `id` without displaying them.
pub(crate) fn transmit(buf: &mut Vec<u8>, id: u32, pixels: &RgbaImage) {
    let encoded = STANDARD.encode(pixels.as_raw());
    let chunks: Vec<&[u8]> = if encoded.is_empty() {
        vec![&[][..]]
    } else {
        encoded.as_bytes().chunks(CHUNK_SIZE).collect()
    };
    let last = chunks.len() - 1;
    for (index, chunk) in chunks.into_iter().enumerate() {
        let more = u8::from(index != last);
        if index == 0 {
            let _ = write!(
                buf,
                "\x1b_Ga=t,t=d,f=32,s={},v={},i={id},q=2,m={more};",
                pixels.width(),
                pixels.height()
            );
        } else {
            let _ = write!(buf, "\x1b_Gm={more};");
        }
        buf.extend_from_slice(chunk);
        buf.extend_from_slice(b"\x1b\\");
    }
}

/// Placement number for a placement anchored at screen cell `(col, row)`. Never zero.
pub(crate) fn placement_id(col: u16, row: u16) -> u32 {
    ((u32::from(row) << 16) | u32::from(col)).saturating_add(1)
}

/// Display image `id` as placement `placement` at the cursor, scaled to `cols x rows` cells,
/// without moving the cursor.
pub(crate) fn place(buf: &mut Vec<u8>, id: u32, placement: u32, cols: u16, rows: u16) {
    let _ = write!(
        buf,
        "\x1b_Ga=p,i={id},p={placement},c={cols},r={rows},C=1,q=2\x1b\\"
    );
}

/// Remove one placement of image `id`, keeping the uploaded data and its other placements.
pub(crate) fn delete_placement(buf: &mut Vec<u8>, id: u32, placement: u32) {
    let _ = write!(buf, "\x1b_Ga=d,d=i,i={id},p={placement},q=2\x1b\\");
}

/// Remove every placement of image `id` and free its data.
pub(crate) fn destroy(buf: &mut Vec<u8>, id: u32) {
    let _ = write!(buf, "\x1b_Ga=d,d=I,i={id},q=2\x1b\\");
}
