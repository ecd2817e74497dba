// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
CPU reference backend.

Imports map the exported descriptor directly, so a soft texture aliases the same memory as the
surface's own mapping, exactly as an imported GPU texture does.  The compositor runs the blend
shader's arithmetic per pixel over the destination quad.
*/

mod texel;

use crate::bindings::ImportError;
use crate::bindings::import::ImportDescriptor;
use crate::bindings::visible_to::SurfaceUsage;
use crate::dma::Mapping;
use crate::images::shader::YuvStandard;
use crate::images::vertex_algorithms::{Geometry, Quad};
use std::cell::Cell;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::rc::Rc;
use texel::TexelLayout;

#[derive(Debug)]
pub(crate) struct Engine {
    live: Rc<Cell<usize>>,
    next_id: Cell<u32>,
}

fn descriptor_len(fd: BorrowedFd<'_>) -> io::Result<usize> {
    // SAFETY: fd is open for the duration of the call
    let end = unsafe { libc::lseek(fd.as_raw_fd(), 0, libc::SEEK_END) };
    if end < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above
    if unsafe { libc::lseek(fd.as_raw_fd(), 0, libc::SEEK_SET) } < 0 {
        logwise::warn_sync!(
            "Can't rewind descriptor {fd}: {err}",
            fd = fd.as_raw_fd(),
            err = logwise::privacy::LogIt(&io::Error::last_os_error())
        );
    }
    usize::try_from(end).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))
}

impl Engine {
    pub(crate) fn new() -> Self {
        Engine {
            live: Rc::new(Cell::new(0)),
            next_id: Cell::new(1),
        }
    }

    pub(crate) fn import(&self, descriptor: &ImportDescriptor<'_>, usage: SurfaceUsage) -> Result<Texture, ImportError> {
        let fourcc = descriptor.fourcc();
        if descriptor.layout.is_compressed() || !TexelLayout::is_supported(fourcc) {
            return Err(ImportError::Unsupported {
                fourcc,
                layout: descriptor.layout,
                backend: "soft",
            });
        }
        let plane0 = descriptor.planes.first().ok_or(ImportError::NoImage { error: 0 })?;
        let len = descriptor_len(plane0.fd).map_err(ImportError::Map)?;
        let span = descriptor.span();
        if span > len {
            return Err(ImportError::OutOfBounds { span, len });
        }
        let mapping = Mapping::new(plane0.fd, len, 0).map_err(ImportError::Map)?;
        let layout = TexelLayout {
            fourcc,
            width: descriptor.width,
            height: descriptor.height,
            pitch: plane0.pitch as usize,
            chroma_offset: descriptor.planes.get(1).map_or(0, |p| p.offset as usize),
        };
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let framebuffer = usage.needs_framebuffer().then_some(id);
        self.live.set(self.live.get() + 1);
        Ok(Texture {
            id,
            framebuffer,
            mapping,
            layout,
            live: self.live.clone(),
        })
    }

    pub(crate) fn program(&self, standard: YuvStandard) -> Program {
        Program { standard }
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.live.get()
    }
}

#[derive(Debug)]
pub(crate) struct Texture {
    id: u32,
    framebuffer: Option<u32>,
    mapping: Mapping,
    layout: TexelLayout,
    live: Rc<Cell<usize>>,
}

impl Texture {
    pub(crate) fn texture_id(&self) -> u32 {
        self.id
    }

    pub(crate) fn framebuffer_id(&self) -> Option<u32> {
        self.framebuffer
    }

    /// Nearest sample at normalized `(u, v)`, clamped to the edge.
    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let x = ((u * self.layout.width as f32).floor() as i64).clamp(0, self.layout.width as i64 - 1);
        let y = ((v * self.layout.height as f32).floor() as i64).clamp(0, self.layout.height as i64 - 1);
        texel::load(self.mapping.as_slice(), &self.layout, x as u32, y as u32)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug)]
pub(crate) struct Program {
    standard: YuvStandard,
}

/// First pixel whose centre lies at or after device coordinate `ndc`, on an axis of `size` pixels.
fn first_pixel(ndc: f32, size: u32) -> i64 {
    ((ndc + 1.0) / 2.0 * size as f32 - 0.5).ceil() as i64
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Program {
    /**
    Draws the quad into `background`, sampling `overlay` and `background` at the interpolated
    texture coordinates.

    Pixels are covered when their centre falls inside the destination quad.
    */
    pub(crate) fn draw(&self, overlay: &Texture, background: &mut Texture, geometry: &Geometry) {
        let (min, max) = geometry.position.bounds();
        let target = background.layout;
        let x0 = first_pixel(min.x, target.width).max(0);
        let x1 = first_pixel(max.x, target.width).min(target.width as i64);
        let y0 = first_pixel(min.y, target.height).max(0);
        let y1 = first_pixel(max.y, target.height).min(target.height as i64);

        let interpolate = |quad: &Quad, tx: f32, ty: f32| {
            let u = lerp(quad.top_left.x, quad.top_right.x, tx);
            let v = lerp(quad.top_left.y, quad.bottom_left.y, ty);
            (u, v)
        };
        let span_x = max.x - min.x;
        let span_y = max.y - min.y;
        for py in y0..y1 {
            let cy = (py as f32 + 0.5) / target.height as f32 * 2.0 - 1.0;
            let ty = if span_y == 0.0 { 0.0 } else { (cy - geometry.position.top_left.y) / (geometry.position.bottom_left.y - geometry.position.top_left.y) };
            for px in x0..x1 {
                let cx = (px as f32 + 0.5) / target.width as f32 * 2.0 - 1.0;
                let tx = if span_x == 0.0 { 0.0 } else { (cx - geometry.position.top_left.x) / (geometry.position.top_right.x - geometry.position.top_left.x) };
                let (ou, ov) = interpolate(&geometry.overlay, tx, ty);
                let (bu, bv) = interpolate(&geometry.background, tx, ty);
                let osd = overlay.sample(ou, ov);
                let bg = background.sample(bu, bv);
                let yuv = self.standard.rgb_to_yuv([osd[0], osd[1], osd[2]]);
                let a = osd[3];
                let out = [
                    bg[0] * (1.0 - a) + yuv[0] * a,
                    bg[1] * (1.0 - a) + yuv[1] * a,
                    bg[2] * (1.0 - a) + yuv[2] * a,
                    1.0,
                ];
                texel::store(background.mapping.as_mut_slice(), &target, px as u32, py as u32, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_centre_coverage() {
        //a full-width quad covers every column
        assert_eq!(first_pixel(-1.0, 8), 0);
        assert_eq!(first_pixel(1.0, 8), 8);
        //[0, 0.5] in device space is columns 4 and 5 of 8
        assert_eq!(first_pixel(0.0, 8), 4);
        assert_eq!(first_pixel(0.5, 8), 6);
    }

    #[test]
    fn descriptor_len_rewinds() {
        use std::os::fd::AsFd;
        let path = std::env::temp_dir().join(format!("descriptor_len_{}", std::process::id()));
        std::fs::write(&path, [7u8; 100]).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        assert_eq!(descriptor_len(file.as_fd()).unwrap(), 100);
        // SAFETY: file is open
        assert_eq!(unsafe { libc::lseek(file.as_raw_fd(), 0, libc::SEEK_CUR) }, 0);
        std::fs::remove_file(path).unwrap();

        //pipes can't seek
        let (reader, _writer) = std::io::pipe().unwrap();
        assert!(descriptor_len(reader.as_fd()).is_err());
    }
}
