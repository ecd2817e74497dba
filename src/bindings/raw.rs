/*!
Headerless raw pixel files.

A raw file holds rows of `width * bytes_per_pixel` bytes, back to back.  The destination may
use a wider row (`padded_width`), in which case the file is read row by row.
*/

use crate::pixel_formats::UNKNOWN_FORMAT_SIZE;
use std::io::{self, Read};

/**
Reads `height` rows of `width` pixels from `reader` into `dst`, placing row `i` at
`i * padded_width * bytes_per_pixel`.

When `width == padded_width` the whole frame is read in one go.  A `bytes_per_pixel` equal to
the unknown-format sentinel is rejected with [`io::ErrorKind::InvalidInput`].
*/
pub fn read_raw<R: Read>(
    mut reader: R,
    dst: &mut [u8],
    width: u32,
    padded_width: u32,
    height: u32,
    bytes_per_pixel: f32,
) -> io::Result<()> {
    if bytes_per_pixel <= UNKNOWN_FORMAT_SIZE || padded_width < width {
        return Err(io::Error::from(io::ErrorKind::InvalidInput));
    }
    let row_bytes = (width as f32 * bytes_per_pixel) as usize;
    let stride = (padded_width as f32 * bytes_per_pixel) as usize;
    if width == padded_width {
        let size = (width as f32 * height as f32 * bytes_per_pixel) as usize;
        let dst = dst.get_mut(..size).ok_or(io::ErrorKind::InvalidInput)?;
        return reader.read_exact(dst);
    }
    for row in 0..height as usize {
        let start = row * stride;
        let dst = dst
            .get_mut(start..start + row_bytes)
            .ok_or(io::ErrorKind::InvalidInput)?;
        reader.read_exact(dst)?;
    }
    Ok(())
}

/**
Reads `rows` rows of `row_bytes` bytes from `reader` into `dst`, `pitch` bytes apart.

Used to load one plane of a pitch-aligned surface.
*/
pub(crate) fn read_rows<R: Read>(reader: &mut R, dst: &mut [u8], row_bytes: usize, pitch: usize, rows: usize) -> io::Result<()> {
    for row in 0..rows {
        let start = row * pitch;
        let dst = dst
            .get_mut(start..start + row_bytes)
            .ok_or(io::ErrorKind::InvalidInput)?;
        reader.read_exact(dst)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_read() {
        let src: Vec<u8> = (0..12).collect();
        let mut dst = [0u8; 12];
        read_raw(&src[..], &mut dst, 2, 2, 2, 3.0).unwrap();
        assert_eq!(&dst[..], &src[..]);
    }

    #[test]
    fn padded_read() {
        let src: Vec<u8> = (1..=8).collect();
        let mut dst = [0u8; 16];
        //2x2 at 2 bytes per pixel into rows of 4 pixels
        read_raw(&src[..], &mut dst, 2, 4, 2, 2.0).unwrap();
        assert_eq!(&dst[..4], &[1, 2, 3, 4]);
        assert_eq!(&dst[4..8], &[0, 0, 0, 0]);
        assert_eq!(&dst[8..12], &[5, 6, 7, 8]);
    }

    #[test]
    fn fractional_size() {
        let src = vec![9u8; 6];
        let mut dst = [0u8; 6];
        read_raw(&src[..], &mut dst, 2, 2, 2, 1.5).unwrap();
        assert_eq!(dst, [9; 6]);
    }

    #[test]
    fn sentinel_rejected() {
        let mut dst = [0u8; 4];
        let err = read_raw(&[0u8; 4][..], &mut dst, 2, 2, 2, 0.0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn short_file() {
        let mut dst = [0u8; 8];
        let err = read_raw(&[0u8; 3][..], &mut dst, 2, 2, 2, 1.0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
