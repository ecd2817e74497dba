// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use png::{BitDepth, ColorType};
use crate::pixel_formats::{Fourcc, PixelFormat};

/// Png encoding of the linear layout of a format, if it has one.
pub(crate) fn png_color_type(format: &PixelFormat) -> Option<ColorType> {
    match format.fourcc {
        Fourcc::ABGR8888 | Fourcc::RGBA5551 => Some(ColorType::Rgba),
        Fourcc::BGR888 | Fourcc::RGB888 => Some(ColorType::Rgb),
        _ => None,
    }
}

pub(crate) fn png_bit_depth() -> BitDepth {
    BitDepth::Eight
}

/**
Repacks `height` rows of `pixels` (each `pitch` bytes apart) into tightly packed 8-bit png rows.

Returns `None` for formats [`png_color_type`] rejects.
*/
pub(crate) fn png_rows(format: &PixelFormat, pixels: &[u8], pitch: usize, width: u32, height: u32) -> Option<Vec<u8>> {
    let color = png_color_type(format)?;
    let channels = color.samples();
    let mut out = Vec::with_capacity(width as usize * height as usize * channels);
    for y in 0..height as usize {
        let row = &pixels[y * pitch..];
        for x in 0..width as usize {
            match format.fourcc {
                Fourcc::ABGR8888 => out.extend_from_slice(&row[x * 4..x * 4 + 4]),
                Fourcc::BGR888 => out.extend_from_slice(&row[x * 3..x * 3 + 3]),
                Fourcc::RGB888 => {
                    let p = &row[x * 3..x * 3 + 3];
                    out.extend_from_slice(&[p[2], p[1], p[0]]);
                }
                Fourcc::RGBA5551 => {
                    let v = u16::from_le_bytes([row[x * 2], row[x * 2 + 1]]);
                    let expand = |c: u16| ((c as u32 * 255 + 15) / 31) as u8;
                    out.extend_from_slice(&[
                        expand((v >> 11) & 31),
                        expand((v >> 6) & 31),
                        expand((v >> 1) & 31),
                        if v & 1 == 1 { 255 } else { 0 },
                    ]);
                }
                _ => return None,
            }
        }
    }
    Some(out)
}

#[cfg(test)] mod tests {
    use crate::pixel_formats::{lookup, Fourcc};
    use super::*;

    #[test] fn rgb888_is_swizzled() {
        let format = lookup(Fourcc::RGB888).unwrap();
        //one row, padded to 8 bytes
        let pixels = [1, 2, 3, 4, 5, 6, 0, 0];
        let rows = png_rows(format, &pixels, 8, 2, 1).unwrap();
        assert_eq!(rows, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test] fn rgba5551_expands() {
        let format = lookup(Fourcc::RGBA5551).unwrap();
        let white: u16 = 0xFFFF;
        let pixels = white.to_le_bytes();
        let rows = png_rows(format, &pixels, 2, 1, 1).unwrap();
        assert_eq!(rows, vec![255, 255, 255, 255]);
    }

    #[test] fn yuv_has_no_png() {
        let format = lookup(Fourcc::NV12).unwrap();
        assert!(png_color_type(format).is_none());
        assert!(png_rows(format, &[0; 16], 4, 4, 2).is_none());
    }
}
