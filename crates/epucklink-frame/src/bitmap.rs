//! Camera snapshot decoding.
//!
//! The robot ships 80x120 RGB565 frames with every 16-bit sample's bytes
//! swapped. Restoring the pair order gives native little-endian samples.

use image::{Rgb, RgbImage};

use crate::error::{FrameError, Result};

/// Snapshot width in pixels.
pub const IMAGE_WIDTH: u32 = 80;

/// Snapshot height in pixels.
pub const IMAGE_HEIGHT: u32 = 120;

const BYTES_PER_PIXEL: usize = 2;

/// Exact payload size of one snapshot: 19200 bytes.
pub const IMAGE_PAYLOAD_SIZE: usize = IMAGE_WIDTH as usize * IMAGE_HEIGHT as usize * BYTES_PER_PIXEL;

/// Swap every adjacent byte pair. A trailing odd byte is kept in place.
pub fn swap_byte_pairs(raw: &[u8]) -> Vec<u8> {
    let mut out = raw.to_vec();
    for pair in out.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
    out
}

/// Expand one RGB565 sample (red in the top 5 bits) to 8-bit channels.
pub fn rgb565_to_rgb(sample: u16) -> Rgb<u8> {
    let r = (sample >> 11) & 0x1f;
    let g = (sample >> 5) & 0x3f;
    let b = sample & 0x1f;
    Rgb([scale(r, 31), scale(g, 63), scale(b, 31)])
}

fn scale(value: u16, max: u16) -> u8 {
    (u32::from(value) * 255 / u32::from(max)) as u8
}

/// Decode a byte-pair-swapped RGB565 snapshot into an RGB raster.
pub fn decode_bitmap(raw: &[u8]) -> Result<RgbImage> {
    if raw.len() != IMAGE_PAYLOAD_SIZE {
        return Err(FrameError::BitmapSize {
            expected: IMAGE_PAYLOAD_SIZE,
            actual: raw.len(),
        });
    }

    let native = swap_byte_pairs(raw);
    Ok(RgbImage::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |x, y| {
        let offset = (y as usize * IMAGE_WIDTH as usize + x as usize) * BYTES_PER_PIXEL;
        rgb565_to_rgb(u16::from_le_bytes([native[offset], native[offset + 1]]))
    }))
}
