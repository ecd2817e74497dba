// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Describes a DMA buffer to an importer.

An [`ImportDescriptor`] is the backend-neutral form of the `EGL_EXT_image_dma_buf_import`
attribute list: image size, fourcc, and one (descriptor, offset, pitch, modifier) entry per
plane.  [`ImportDescriptor::attrib_list`] renders it in the EGL form.
*/

use crate::bittricks::u64_to_u32s;
use crate::pixel_formats::{Fourcc, Layout, MAX_IMPORT_SPAN, PixelFormat};
use std::os::fd::{AsRawFd, BorrowedFd};

pub const EGL_NONE: i32 = 0x3038;
pub const EGL_HEIGHT: i32 = 0x3056;
pub const EGL_WIDTH: i32 = 0x3057;
pub const EGL_LINUX_DMA_BUF_EXT: u32 = 0x3270;
pub const EGL_LINUX_DRM_FOURCC_EXT: i32 = 0x3271;

struct PlaneAttribs {
    fd: i32,
    offset: i32,
    pitch: i32,
    modifier_lo: i32,
    modifier_hi: i32,
}

const PLANE_ATTRIBS: [PlaneAttribs; 2] = [
    PlaneAttribs {
        fd: 0x3272,
        offset: 0x3273,
        pitch: 0x3274,
        modifier_lo: 0x3443,
        modifier_hi: 0x3444,
    },
    PlaneAttribs {
        fd: 0x3275,
        offset: 0x3276,
        pitch: 0x3277,
        modifier_lo: 0x3445,
        modifier_hi: 0x3446,
    },
];

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("Importer returned no image (error 0x{error:x})")]
    NoImage { error: u32 },
    #[error("The {backend} backend can't import {fourcc} with the {layout:?} layout")]
    Unsupported {
        fourcc: Fourcc,
        layout: Layout,
        backend: &'static str,
    },
    #[error("A {width}x{height} image doesn't fit the importer's 31-bit offsets")]
    TooLarge { width: u32, height: u32 },
    #[error("Planes span {span} bytes but the buffer holds {len}")]
    OutOfBounds { span: usize, len: usize },
    #[error("Can't map imported buffer: {0}")]
    Map(std::io::Error),
    #[error("Can't create texture: {0}")]
    Texture(String),
    #[error("Can't create framebuffer: {0}")]
    Framebuffer(String),
}

/// One plane of an imported buffer.
#[derive(Debug, Clone, Copy)]
pub struct PlaneDescriptor<'a> {
    pub fd: BorrowedFd<'a>,
    /// Byte offset of the plane from the start of the buffer.
    pub offset: u32,
    /// Row pitch in bytes.
    pub pitch: u32,
    /// Present only for compressed layouts.
    pub modifier: Option<u64>,
}

/// Everything an importer needs to know about a buffer.
#[derive(Debug, Clone)]
pub struct ImportDescriptor<'a> {
    pub width: u32,
    pub height: u32,
    pub format: &'static PixelFormat,
    pub layout: Layout,
    pub planes: Vec<PlaneDescriptor<'a>>,
}

impl<'a> ImportDescriptor<'a> {
    /**
    Describes a `width` x `height` buffer of `format` exported as `fd`.

    Every plane shares the buffer's descriptor and the first plane's pitch.  The second plane of
    a semi-planar format starts `pitch * height` bytes in.  Images whose planes reach past
    [`MAX_IMPORT_SPAN`] are rejected, so every value in [`ImportDescriptor::attrib_list`] is a
    valid `EGLint`.
    */
    pub fn new(
        format: &'static PixelFormat,
        layout: Layout,
        width: u32,
        height: u32,
        fd: BorrowedFd<'a>,
    ) -> Result<Self, ImportError> {
        let too_large = || ImportError::TooLarge { width, height };
        match format.layout_span(width, height) {
            Some(span) if span <= MAX_IMPORT_SPAN => {}
            _ => return Err(too_large()),
        }
        //the span bounds the width, the height, every pitch and every offset
        let pitch = u32::try_from(format.row_pitch(width)).map_err(|_| too_large())?;
        let planes = (0..format.plane_count())
            .map(|plane| {
                let offset = format
                    .plane_offset(plane, width, height)
                    .and_then(|o| u32::try_from(o).ok())
                    .ok_or_else(too_large)?;
                Ok(PlaneDescriptor {
                    fd,
                    offset,
                    pitch,
                    modifier: format.modifier(plane, layout),
                })
            })
            .collect::<Result<Vec<_>, ImportError>>()?;
        Ok(ImportDescriptor {
            width,
            height,
            format,
            layout,
            planes,
        })
    }

    pub fn fourcc(&self) -> Fourcc {
        self.format.fourcc
    }

    /// Total bytes the planes span, given each plane's pitch and row count.
    pub fn span(&self) -> usize {
        self.planes
            .iter()
            .zip(self.format.planes)
            .map(|(p, desc)| {
                p.offset as usize + p.pitch as usize * self.height.div_ceil(desc.vertical_subsampling) as usize
            })
            .max()
            .unwrap_or(0)
    }

    /// The `EGL_LINUX_DMA_BUF_EXT` attribute list, terminated by `EGL_NONE`.
    pub fn attrib_list(&self) -> Vec<i32> {
        let mut attribs = vec![
            EGL_WIDTH,
            self.width as i32,
            EGL_HEIGHT,
            self.height as i32,
            EGL_LINUX_DRM_FOURCC_EXT,
            self.fourcc().raw() as i32,
        ];
        for (plane, names) in self.planes.iter().zip(PLANE_ATTRIBS.iter()) {
            attribs.extend_from_slice(&[
                names.fd,
                plane.fd.as_raw_fd(),
                names.offset,
                plane.offset as i32,
                names.pitch,
                plane.pitch as i32,
            ]);
            if let Some(modifier) = plane.modifier {
                let (hi, lo) = u64_to_u32s(modifier);
                attribs.extend_from_slice(&[names.modifier_lo, lo as i32, names.modifier_hi, hi as i32]);
            }
        }
        attribs.push(EGL_NONE);
        attribs
    }
}
