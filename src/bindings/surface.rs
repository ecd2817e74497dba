// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The pixel buffer shared between the CPU and the compositor.

A [`Surface`] moves through these states:

```text
new -> allocate -> (load / write pixels) -> Engine::import -> render ... -> release / drop
```

Once imported, the texture and the CPU mapping alias the same memory: writes through
[`Surface::pixels_mut`] are visible to the next draw, and draws are visible to the CPU after
[`Engine::finish`](crate::images::Engine::finish).
*/

use crate::bindings::dump::{self, PngDumpError};
use crate::bindings::import::ImportError;
use crate::bindings::raw::read_rows;
use crate::bindings::surface_config::SurfaceConfig;
use crate::bindings::visible_to::SurfaceUsage;
use crate::dma::{AllocError, Allocator, DmaBuffer};
use crate::imp;
use crate::pixel_formats::{FormatError, Layout, MAX_IMPORT_SPAN, PixelFormat, require};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SurfaceError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Surface has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("Surface is too large to import ({width}x{height})")]
    TooLarge { width: u32, height: u32 },
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("Surface has no buffer; allocate it first")]
    NotAllocated,
    #[error("Surface already has a buffer")]
    AlreadyAllocated,
    #[error("Surface is already imported")]
    AlreadyImported,
    #[error("Can't read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Can't write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Png(#[from] PngDumpError),
}

/// One pixel buffer and, once imported, its texture.
#[derive(Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    format: &'static PixelFormat,
    layout: Layout,
    usage: SurfaceUsage,
    debug_name: String,
    pitch: u32,
    allocation: (u32, u32),
    //texture before buffer: the texture is released first
    texture: Option<imp::Texture>,
    buffer: Option<DmaBuffer>,
}

impl Surface {
    /**
    Validates `config` against the format table.  Nothing is allocated yet.

    Surfaces whose planes span more than [`MAX_IMPORT_SPAN`] bytes are rejected, since they
    couldn't be described to an importer.
    */
    pub fn new(config: SurfaceConfig) -> Result<Self, SurfaceError> {
        let format = require(config.format)?;
        let layout = config.layout();
        format.check_layout(layout)?;
        let (width, height) = (config.width, config.height);
        if width == 0 || height == 0 {
            return Err(SurfaceError::Empty { width, height });
        }
        let too_large = || SurfaceError::TooLarge { width, height };
        let span = format.layout_span(width, height).ok_or_else(too_large)?;
        if span > MAX_IMPORT_SPAN {
            return Err(too_large());
        }
        let pitch = u32::try_from(format.row_pitch(width)).map_err(|_| too_large())?;
        let allocation = format
            .allocation_width(width)
            .zip(format.allocation_height(width, height, layout))
            .ok_or_else(too_large)?;
        Ok(Surface {
            width,
            height,
            format,
            layout,
            usage: config.usage,
            debug_name: config.debug_name,
            pitch,
            allocation,
            texture: None,
            buffer: None,
        })
    }

    /**
    Allocates the kernel buffer.

    The width is aligned to the format's pitch alignment so every row covers the import pitch,
    and compressed layouts reserve twice the nominal bits per pixel.  Enough rows are requested
    to hold every plane, including a rounded-up chroma row for odd heights.
    */
    pub fn allocate(&mut self, allocator: &Allocator) -> Result<(), SurfaceError> {
        if self.buffer.is_some() {
            return Err(SurfaceError::AlreadyAllocated);
        }
        let (width, rows) = self.allocation;
        let buffer = allocator.allocate(width, rows, self.format.allocation_bits_per_pixel(self.layout))?;
        self.buffer = Some(buffer);
        logwise::info_sync!("allocated {surface}", surface = logwise::privacy::LogIt(self.describe()));
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> &'static PixelFormat {
        self.format
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn usage(&self) -> SurfaceUsage {
        self.usage
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Row pitch the surface is imported with.
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn is_imported(&self) -> bool {
        self.texture.is_some()
    }

    pub fn buffer(&self) -> Option<&DmaBuffer> {
        self.buffer.as_ref()
    }

    /// Texture name, once imported.
    pub fn texture_id(&self) -> Option<u32> {
        self.texture.as_ref().map(|t| t.texture_id())
    }

    /// Framebuffer name, for imported render targets.
    pub fn framebuffer_id(&self) -> Option<u32> {
        self.texture.as_ref().and_then(|t| t.framebuffer_id())
    }

    /// The mapped buffer.
    pub fn pixels(&self) -> Result<&[u8], SurfaceError> {
        self.buffer.as_ref().map(|b| b.bytes()).ok_or(SurfaceError::NotAllocated)
    }

    pub fn pixels_mut(&mut self) -> Result<&mut [u8], SurfaceError> {
        self.buffer.as_mut().map(|b| b.bytes_mut()).ok_or(SurfaceError::NotAllocated)
    }

    /**
    Loads a headerless raw file into the buffer.

    Linear surfaces read each plane row by row from a tightly packed file into the
    pitch-aligned layout.  Compressed surfaces are copied as an opaque blob, up to the end of
    the file or the buffer.
    */
    pub fn load_raw(&mut self, path: impl AsRef<Path>) -> Result<(), SurfaceError> {
        let path = path.as_ref();
        let read_err = |source| SurfaceError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
        self.load_from(&mut reader).map_err(read_err)?;
        logwise::info_sync!(
            "loaded {path} into {name}",
            path = logwise::privacy::LogIt(path),
            name = logwise::privacy::LogIt(&self.debug_name)
        );
        Ok(())
    }

    /// [`Surface::load_raw`] from any reader.
    pub fn load_from<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        let (width, height, layout, format) = (self.width, self.height, self.layout, self.format);
        let pitch = self.pitch() as usize;
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| io::Error::other("surface has no buffer"))?;
        let bytes = buffer.bytes_mut();
        if layout.is_compressed() {
            let mut filled = 0;
            while filled < bytes.len() {
                match reader.read(&mut bytes[filled..])? {
                    0 => break,
                    n => filled += n,
                }
            }
            return Ok(());
        }
        for (index, plane) in format.planes.iter().enumerate() {
            let offset = format
                .plane_offset(index, width, height)
                .and_then(|o| usize::try_from(o).ok())
                .ok_or(io::ErrorKind::InvalidInput)?;
            let rows = height.div_ceil(plane.vertical_subsampling) as usize;
            let row_bytes = width as usize * plane.pitch_bytes_per_pixel as usize;
            let dst = bytes.get_mut(offset..).ok_or(io::ErrorKind::InvalidInput)?;
            read_rows(reader, dst, row_bytes, pitch, rows)?;
        }
        Ok(())
    }

    /**
    Writes `dumplayer_<index>_<w>x<h>_<tag>.bin` into `dir` and returns its path.

    The file holds the first `w * h * bytes_per_pixel` bytes of the buffer, doubled for
    compressed layouts.  Call after [`Engine::finish`](crate::images::Engine::finish).
    */
    pub fn dump(&self, dir: impl AsRef<Path>, index: u32) -> Result<PathBuf, SurfaceError> {
        let pixels = self.pixels()?;
        let size = self.format.frame_size(self.width, self.height, self.layout).min(pixels.len());
        let path = dump::dump_path(
            dir.as_ref(),
            index,
            self.width,
            self.height,
            &self.format.dump_tag(self.layout),
        );
        dump::write_raw(&path, &pixels[..size]).map_err(|source| SurfaceError::Write {
            path: path.clone(),
            source,
        })?;
        logwise::info_sync!("dumped {path}", path = logwise::privacy::LogIt(&path));
        Ok(path)
    }

    /// Writes a png preview of a linear RGB surface.
    pub fn dump_png(&self, path: impl AsRef<Path>) -> Result<(), SurfaceError> {
        if self.layout.is_compressed() {
            return Err(FormatError::CompressionUnsupported(self.format.fourcc).into());
        }
        let pixels = self.pixels()?;
        dump::write_png(path.as_ref(), self.format, pixels, self.pitch() as usize, self.width, self.height)?;
        Ok(())
    }

    /// Releases the texture and framebuffer.  The buffer stays allocated.
    pub fn release(&mut self) {
        if self.texture.take().is_some() {
            logwise::info_sync!("released {surface}", surface = logwise::privacy::LogIt(self.describe()));
        }
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        let (fd, address) = match &self.buffer {
            Some(b) => (b.raw_fd(), b.bytes().as_ptr()),
            None => (-1, std::ptr::null()),
        };
        format!(
            "'{name}' {w}x{h} {fourcc} compressed={compressed} texture={texture} role={role} fbo={fbo} fd={fd} addr={address:p}",
            name = self.debug_name,
            w = self.width,
            h = self.height,
            fourcc = self.format.fourcc,
            compressed = self.layout.is_compressed(),
            texture = self.texture_id().unwrap_or(0),
            role = self.usage.role(),
            fbo = self.framebuffer_id().unwrap_or(0),
        )
    }

    pub(crate) fn set_texture(&mut self, texture: imp::Texture) {
        self.texture = Some(texture);
    }

    pub(crate) fn texture(&self) -> Option<&imp::Texture> {
        self.texture.as_ref()
    }

    pub(crate) fn texture_mut(&mut self) -> Option<&mut imp::Texture> {
        self.texture.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::Fourcc;

    #[test]
    fn rejects_bad_configs() {
        let bad = Surface::new(SurfaceConfig::new(16, 16, Fourcc(0)));
        assert!(matches!(bad, Err(SurfaceError::Format(FormatError::Unsupported(_)))));
        let bad = Surface::new(SurfaceConfig::new(16, 16, Fourcc::RGBA5551).with_compressed(true));
        assert!(matches!(bad, Err(SurfaceError::Format(FormatError::CompressionUnsupported(_)))));
        let bad = Surface::new(SurfaceConfig::new(0, 16, Fourcc::ABGR8888));
        assert!(matches!(bad, Err(SurfaceError::Empty { .. })));
    }

    #[test]
    fn lifecycle_errors() {
        let allocator = Allocator::memfd();
        let mut s = Surface::new(SurfaceConfig::new(20, 4, Fourcc::ABGR8888)).unwrap();
        assert!(matches!(s.pixels(), Err(SurfaceError::NotAllocated)));
        s.allocate(&allocator).unwrap();
        assert!(matches!(s.allocate(&allocator), Err(SurfaceError::AlreadyAllocated)));
        assert_eq!(allocator.live_buffers(), 1);
        //width 20 is allocated as 32 so rows cover the pitch
        assert_eq!(s.pitch(), 32 * 4);
        assert!(s.pixels().unwrap().len() >= 32 * 4 * 4);
        drop(s);
        assert_eq!(allocator.live_buffers(), 0);
    }

    #[test]
    fn nv12_load_places_chroma_after_luma() {
        let allocator = Allocator::memfd();
        let mut s = Surface::new(SurfaceConfig::new(4, 2, Fourcc::NV12)).unwrap();
        s.allocate(&allocator).unwrap();
        //4x2 luma then one row of 2 chroma pairs
        let file: Vec<u8> = (1..=12).collect();
        s.load_from(&mut &file[..]).unwrap();
        let pitch = s.pitch() as usize;
        assert_eq!(pitch, 32);
        let px = s.pixels().unwrap();
        assert_eq!(&px[..4], &[1, 2, 3, 4]);
        assert_eq!(&px[pitch..pitch + 4], &[5, 6, 7, 8]);
        assert_eq!(&px[2 * pitch..2 * pitch + 4], &[9, 10, 11, 12]);
    }

    #[test]
    fn odd_height_nv12_holds_both_planes() {
        let allocator = Allocator::memfd();
        let mut s = Surface::new(SurfaceConfig::new(64, 33, Fourcc::NV12)).unwrap();
        s.allocate(&allocator).unwrap();
        let pitch = s.pitch() as usize;
        //33 luma rows then 17 chroma rows
        assert!(s.pixels().unwrap().len() >= pitch * (33 + 17));
        let mut file = vec![16u8; 64 * 33];
        file.extend(std::iter::repeat_n(128u8, 64 * 17));
        s.load_from(&mut &file[..]).unwrap();
        let px = s.pixels().unwrap();
        assert_eq!(px[pitch * 33 - 1], 16);
        assert_eq!(px[pitch * 33], 128);
        assert_eq!(px[pitch * 49 + 63], 128);

        let engine = crate::images::Engine::software();
        let mut s2 = Surface::new(SurfaceConfig::new(64, 33, Fourcc::NV12)).unwrap();
        s2.allocate(engine.allocator()).unwrap();
        engine.import(&mut s2).unwrap();
        assert!(s2.is_imported());
    }

    #[test]
    fn oversized_surfaces_are_refused() {
        let big = Surface::new(SurfaceConfig::new(65536, 65536, Fourcc::NV12));
        assert!(matches!(big, Err(SurfaceError::TooLarge { width: 65536, height: 65536 })));
        let big = Surface::new(SurfaceConfig::new(u32::MAX, 1, Fourcc::ABGR8888));
        assert!(matches!(big, Err(SurfaceError::TooLarge { .. })));
        //largest square NV12 under the 31-bit limit still describes
        assert!(Surface::new(SurfaceConfig::new(32768, 32768, Fourcc::NV12)).is_ok());
    }

    #[test]
    fn dump_writes_tagged_file() {
        let allocator = Allocator::memfd();
        let mut s = Surface::new(SurfaceConfig::new(8, 2, Fourcc::RGB888)).unwrap();
        s.allocate(&allocator).unwrap();
        s.pixels_mut().unwrap()[0] = 42;
        let dir = std::env::temp_dir();
        let path = s.dump(&dir, 7).unwrap();
        assert_eq!(path, dir.join("dumplayer_7_8x2_RGB888.bin"));
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), 8 * 2 * 3);
        assert_eq!(written[0], 42);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn describe_mentions_state() {
        let s = Surface::new(
            SurfaceConfig::new(600, 48, Fourcc::ABGR8888).with_debug_name("osd"),
        )
        .unwrap();
        let d = s.describe();
        assert!(d.contains("'osd' 600x48 AB24"));
        assert!(d.contains("texture=0 role=sampled fbo=0 fd=-1"));
    }
}
