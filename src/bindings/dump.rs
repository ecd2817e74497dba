//! Raw and png dumps of surface memory.

use crate::pixel_formats::PixelFormat;
use crate::pixel_formats::png_support::{png_bit_depth, png_color_type, png_rows};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// `dumplayer_<index>_<w>x<h>_<tag>.bin` inside `dir`.
pub fn dump_path(dir: &Path, index: u32, width: u32, height: u32, tag: &str) -> PathBuf {
    dir.join(format!("dumplayer_{index}_{width}x{height}_{tag}.bin"))
}

/// Writes `bytes` to `path` with no header.
pub fn write_raw(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

#[derive(Debug, thiserror::Error)]
pub enum PngDumpError {
    #[error("{0} has no png encoding")]
    NoEncoding(crate::pixel_formats::Fourcc),
    #[error("Can't create png file: {0}")]
    Io(#[from] io::Error),
    #[error("Can't encode png: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// Writes the linear rows of an RGB surface as an 8-bit png.
pub fn write_png(path: &Path, format: &PixelFormat, pixels: &[u8], pitch: usize, width: u32, height: u32) -> Result<(), PngDumpError> {
    let color = png_color_type(format).ok_or(PngDumpError::NoEncoding(format.fourcc))?;
    let rows = png_rows(format, pixels, pitch, width, height).ok_or(PngDumpError::NoEncoding(format.fourcc))?;
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, width, height);
    encoder.set_color(color);
    encoder.set_depth(png_bit_depth());
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rows)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)] mod tests {
    use super::*;

    #[test] fn path_layout() {
        let p = dump_path(Path::new("/data/dump"), 1, 1920, 1080, "nv12_afbc");
        assert_eq!(p, Path::new("/data/dump/dumplayer_1_1920x1080_nv12_afbc.bin"));
    }
}
