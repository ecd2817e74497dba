// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Pixel format catalog for DMA-buf backed surfaces.
//!
//! Every format the crate can allocate, import, load and dump is described by a single
//! [`PixelFormat`] record in a static table.  A record holds:
//!
//! - the DRM fourcc code used on import
//! - the per-pixel byte cost (fractional for 4:2:0 semi-planar formats)
//! - the bits per pixel requested from the kernel allocator
//! - the row pitch alignment rule
//! - the plane layout, including the compressed block size of each plane
//! - whether the linear layout, the compressed layout, or both are supported
//!
//! Adding a format means adding a record; nothing else in the crate branches on a fourcc
//! except the software backend's texel codec.
//!
//! # Available formats
//!
//! | Fourcc        | Bytes/pixel | Planes | Pitch alignment | Layouts             |
//! |---------------|-------------|--------|-----------------|---------------------|
//! | `ABGR8888`    | 4           | 1      | 32 px           | linear, compressed  |
//! | `BGR888`      | 3           | 1      | 32 px           | linear, compressed  |
//! | `RGB888`      | 3           | 1      | 32 px           | linear, compressed  |
//! | `RGBA5551`    | 2           | 1      | 16 px           | linear              |
//! | `YUYV`        | 2           | 1      | 32 px           | linear, compressed  |
//! | `NV12`        | 1.5         | 2      | 32 px           | linear, compressed  |
//! | `YUV420_8BIT` | 1.5         | 1      | 32 px           | compressed          |
//!
//! # Examples
//!
//! ```
//! use planes_and_pixels::pixel_formats::{Fourcc, format_byte_size, lookup};
//!
//! assert_eq!(format_byte_size(Fourcc::NV12), 1.5);
//! // unknown formats report the zero sentinel
//! assert_eq!(format_byte_size(Fourcc::from_chars(*b"XR30")), 0.0);
//!
//! let nv12 = lookup(Fourcc::NV12).unwrap();
//! assert_eq!(nv12.row_pitch(1920), 1920);
//! assert_eq!(nv12.plane_count(), 2);
//! ```

pub mod afbc;
pub(crate) mod png_support;

use crate::bittricks::align_up;
use afbc::BlockSize;
use std::fmt::{Debug, Display, Formatter};

/// Per-pixel byte cost reported by [`format_byte_size`] for formats outside the catalog.
///
/// Callers must treat this as a hard failure, never as a zero-sized allocation.
pub const UNKNOWN_FORMAT_SIZE: f32 = 0.0;

/// Largest plane span, offset or pitch an import can carry; EGL attributes are `EGLint`.
pub const MAX_IMPORT_SPAN: u64 = i32::MAX as u64;

/// A DRM fourcc pixel format code.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Fourcc(pub u32);

impl Fourcc {
    pub const ABGR8888: Fourcc = Fourcc::from_chars(*b"AB24");
    pub const BGR888: Fourcc = Fourcc::from_chars(*b"BG24");
    pub const RGB888: Fourcc = Fourcc::from_chars(*b"RG24");
    pub const RGBA5551: Fourcc = Fourcc::from_chars(*b"RA15");
    ///YUV 4:2:2, one packed plane
    pub const YUYV: Fourcc = Fourcc::from_chars(*b"YUYV");
    ///YUV 4:2:0, luma plane followed by interleaved chroma
    pub const NV12: Fourcc = Fourcc::from_chars(*b"NV12");
    ///YUV 4:2:0 in a single plane; only meaningful with the compressed layout
    pub const YUV420_8BIT: Fourcc = Fourcc::from_chars(*b"YU08");

    /// Builds a code from its four characters, least significant byte first.
    pub const fn from_chars(code: [u8; 4]) -> Self {
        Fourcc(
            code[0] as u32 | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24,
        )
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    fn chars(self) -> [char; 4] {
        let b = self.0.to_le_bytes();
        b.map(|c| if c.is_ascii_graphic() { c as char } else { '?' })
    }
}

impl Debug for Fourcc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.chars();
        write!(f, "{a}{b}{c}{d} (0x{:08x})", self.0)
    }
}

impl Display for Fourcc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.chars();
        write!(f, "{a}{b}{c}{d}")
    }
}

/// Whether a format's samples are RGB(A) or Y/U/V.
///
/// Sampling through a YUV-target external sampler returns raw Y/U/V for YUV formats and
/// RGBA for RGB formats; the compositor relies on this distinction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorModel {
    Rgb,
    Yuv,
}

/// Memory layout of a surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    #[default]
    Linear,
    ///Arm frame buffer compression block layout
    Compressed,
}

impl Layout {
    pub const fn from_compressed(compressed: bool) -> Self {
        if compressed { Layout::Compressed } else { Layout::Linear }
    }
    pub const fn is_compressed(self) -> bool {
        matches!(self, Layout::Compressed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutSupport {
    LinearOnly,
    CompressedOnly,
    Both,
}

/// Description of one plane of a format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlaneDesc {
    /// Bytes per pixel column used to compute this plane's row pitch.
    pub pitch_bytes_per_pixel: u32,
    /// Number of image rows per plane row (2 for 4:2:0 chroma).
    pub vertical_subsampling: u32,
    /// Compressed block size of this plane, if the format has a compressed layout.
    pub block: Option<BlockSize>,
}

/// One record of the format catalog.
#[derive(Debug, PartialEq)]
pub struct PixelFormat {
    pub fourcc: Fourcc,
    /// Short name used in dump file names.
    pub tag: &'static str,
    pub bytes_per_pixel: f32,
    /// Bits per pixel requested from the kernel for the linear layout.
    pub bits_per_pixel: u32,
    /// Row pitch is computed from the width aligned up to this many pixels.
    pub pitch_alignment: u32,
    pub planes: &'static [PlaneDesc],
    pub model: ColorModel,
    pub layouts: LayoutSupport,
}

const fn packed(pitch_bytes_per_pixel: u32, block: Option<BlockSize>) -> [PlaneDesc; 1] {
    [PlaneDesc {
        pitch_bytes_per_pixel,
        vertical_subsampling: 1,
        block,
    }]
}

const ABGR8888_PLANES: [PlaneDesc; 1] = packed(4, Some(BlockSize::B16x16));
const RGB24_PLANES: [PlaneDesc; 1] = packed(3, Some(BlockSize::B16x16));
const RGBA5551_PLANES: [PlaneDesc; 1] = packed(2, None);
const YUYV_PLANES: [PlaneDesc; 1] = packed(2, Some(BlockSize::B16x16));
const YUV420_8BIT_PLANES: [PlaneDesc; 1] = packed(1, Some(BlockSize::B16x16));
const NV12_PLANES: [PlaneDesc; 2] = [
    PlaneDesc {
        pitch_bytes_per_pixel: 1,
        vertical_subsampling: 1,
        block: Some(BlockSize::B32x8),
    },
    PlaneDesc {
        pitch_bytes_per_pixel: 1,
        vertical_subsampling: 2,
        block: Some(BlockSize::B64x4),
    },
];

static CATALOG: [PixelFormat; 7] = [
    PixelFormat {
        fourcc: Fourcc::ABGR8888,
        tag: "ABGR8888",
        bytes_per_pixel: 4.0,
        bits_per_pixel: 32,
        pitch_alignment: 32,
        planes: &ABGR8888_PLANES,
        model: ColorModel::Rgb,
        layouts: LayoutSupport::Both,
    },
    PixelFormat {
        fourcc: Fourcc::BGR888,
        tag: "BGR888",
        bytes_per_pixel: 3.0,
        bits_per_pixel: 24,
        pitch_alignment: 32,
        planes: &RGB24_PLANES,
        model: ColorModel::Rgb,
        layouts: LayoutSupport::Both,
    },
    PixelFormat {
        fourcc: Fourcc::RGB888,
        tag: "RGB888",
        bytes_per_pixel: 3.0,
        bits_per_pixel: 24,
        pitch_alignment: 32,
        planes: &RGB24_PLANES,
        model: ColorModel::Rgb,
        layouts: LayoutSupport::Both,
    },
    PixelFormat {
        fourcc: Fourcc::RGBA5551,
        tag: "RGBA5551",
        bytes_per_pixel: 2.0,
        bits_per_pixel: 16,
        pitch_alignment: 16,
        planes: &RGBA5551_PLANES,
        model: ColorModel::Rgb,
        layouts: LayoutSupport::LinearOnly,
    },
    PixelFormat {
        fourcc: Fourcc::YUYV,
        tag: "YUYV",
        bytes_per_pixel: 2.0,
        bits_per_pixel: 16,
        pitch_alignment: 32,
        planes: &YUYV_PLANES,
        model: ColorModel::Yuv,
        layouts: LayoutSupport::Both,
    },
    PixelFormat {
        fourcc: Fourcc::NV12,
        tag: "nv12",
        bytes_per_pixel: 1.5,
        bits_per_pixel: 12,
        pitch_alignment: 32,
        planes: &NV12_PLANES,
        model: ColorModel::Yuv,
        layouts: LayoutSupport::Both,
    },
    PixelFormat {
        fourcc: Fourcc::YUV420_8BIT,
        tag: "YUV420I",
        bytes_per_pixel: 1.5,
        bits_per_pixel: 12,
        pitch_alignment: 32,
        planes: &YUV420_8BIT_PLANES,
        model: ColorModel::Yuv,
        layouts: LayoutSupport::CompressedOnly,
    },
];

/// Looks up the catalog record for `fourcc`.
pub fn lookup(fourcc: Fourcc) -> Option<&'static PixelFormat> {
    CATALOG.iter().find(|f| f.fourcc == fourcc)
}

/// Like [`lookup`], but reports unsupported formats as an error.
pub fn require(fourcc: Fourcc) -> Result<&'static PixelFormat, FormatError> {
    lookup(fourcc).ok_or(FormatError::Unsupported(fourcc))
}

/// All supported formats, in catalog order.
pub fn supported() -> &'static [PixelFormat] {
    &CATALOG
}

/**
Per-pixel byte cost of `fourcc`.

Returns [`UNKNOWN_FORMAT_SIZE`] (0) for formats outside the catalog.  Every caller must check
for the sentinel before multiplying or dividing by the result.
*/
pub fn format_byte_size(fourcc: Fourcc) -> f32 {
    lookup(fourcc).map_or(UNKNOWN_FORMAT_SIZE, |f| f.bytes_per_pixel)
}

impl PixelFormat {
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn is_semi_planar(&self) -> bool {
        self.planes.len() == 2
    }

    /// Checks that this format can be used with `layout`.
    pub fn check_layout(&self, layout: Layout) -> Result<(), FormatError> {
        match (self.layouts, layout) {
            (LayoutSupport::LinearOnly, Layout::Compressed) => {
                Err(FormatError::CompressionUnsupported(self.fourcc))
            }
            (LayoutSupport::CompressedOnly, Layout::Linear) => {
                Err(FormatError::LinearUnsupported(self.fourcc))
            }
            _ => Ok(()),
        }
    }

    /// Row pitch in bytes of every plane.
    ///
    /// All planes share the first plane's pitch.
    pub fn row_pitch(&self, width: u32) -> u64 {
        align_up(u64::from(width), u64::from(self.pitch_alignment)) * u64::from(self.planes[0].pitch_bytes_per_pixel)
    }

    /// Byte offset of `plane` from the start of the buffer, or `None` if it doesn't fit in 64 bits.
    ///
    /// The second plane of a semi-planar format starts `row_pitch * height` bytes in, for
    /// both layouts.  Passing the plane count gives the end of the last plane.
    pub fn plane_offset(&self, plane: usize, width: u32, height: u32) -> Option<u64> {
        let pitch = self.row_pitch(width);
        self.planes[..plane].iter().try_fold(0u64, |offset, p| {
            offset.checked_add(pitch.checked_mul(u64::from(height.div_ceil(p.vertical_subsampling)))?)
        })
    }

    /// Bytes covered by every plane of a `width` x `height` image.
    pub fn layout_span(&self, width: u32, height: u32) -> Option<u64> {
        self.plane_offset(self.planes.len(), width, height)
    }

    /// Width, in pixels, to request from the allocator so rows cover the import pitch.
    pub fn allocation_width(&self, width: u32) -> Option<u32> {
        u32::try_from(align_up(u64::from(width), u64::from(self.pitch_alignment))).ok()
    }

    /**
    Rows to request from the allocator.

    At least `height`, and enough rows of [`PixelFormat::allocation_width`] pixels at
    [`PixelFormat::allocation_bits_per_pixel`] to cover [`PixelFormat::layout_span`].  For 4:2:0
    formats with an odd height this adds a row for the rounded-up chroma plane.
    */
    pub fn allocation_height(&self, width: u32, height: u32, layout: Layout) -> Option<u32> {
        let pitch = (u64::from(self.allocation_width(width)?) * u64::from(self.allocation_bits_per_pixel(layout))).div_ceil(8);
        if pitch == 0 {
            return None;
        }
        let rows = self.layout_span(width, height)?.div_ceil(pitch).max(u64::from(height));
        u32::try_from(rows).ok()
    }

    /// Bits per pixel to request from the allocator.
    ///
    /// Compressed layouts reserve twice the nominal size.
    pub fn allocation_bits_per_pixel(&self, layout: Layout) -> u32 {
        match layout {
            Layout::Linear => self.bits_per_pixel,
            Layout::Compressed => self.bits_per_pixel * 2,
        }
    }

    /// Number of bytes in one frame of `width` x `height`, as written by dumps.
    pub fn frame_size(&self, width: u32, height: u32, layout: Layout) -> usize {
        let base = (width as f64 * height as f64 * self.bytes_per_pixel as f64) as usize;
        match layout {
            Layout::Linear => base,
            Layout::Compressed => base * 2,
        }
    }

    /// Tag used in dump file names.
    pub fn dump_tag(&self, layout: Layout) -> String {
        match layout {
            Layout::Linear => self.tag.to_string(),
            Layout::Compressed => format!("{}_afbc", self.tag),
        }
    }

    /// Format modifier for `plane`, present only for the compressed layout.
    pub fn modifier(&self, plane: usize, layout: Layout) -> Option<u64> {
        if !layout.is_compressed() {
            return None;
        }
        self.planes[plane].block.map(afbc::modifier)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatError {
    #[error("Unsupported pixel format {0}")]
    Unsupported(Fourcc),
    #[error("{0} has no compressed layout")]
    CompressionUnsupported(Fourcc),
    #[error("{0} only supports the compressed layout")]
    LinearUnsupported(Fourcc),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes() {
        assert_eq!(format_byte_size(Fourcc::ABGR8888), 4.0);
        assert_eq!(format_byte_size(Fourcc::BGR888), 3.0);
        assert_eq!(format_byte_size(Fourcc::RGB888), 3.0);
        assert_eq!(format_byte_size(Fourcc::RGBA5551), 2.0);
        assert_eq!(format_byte_size(Fourcc::YUYV), 2.0);
        assert_eq!(format_byte_size(Fourcc::NV12), 1.5);
        assert_eq!(format_byte_size(Fourcc::YUV420_8BIT), 1.5);
        for format in supported() {
            assert!(format.bytes_per_pixel > 0.0, "{:?}", format.fourcc);
        }
    }

    #[test]
    fn unknown_is_sentinel() {
        assert_eq!(format_byte_size(Fourcc(0)), UNKNOWN_FORMAT_SIZE);
        assert_eq!(format_byte_size(Fourcc::from_chars(*b"Y210")), UNKNOWN_FORMAT_SIZE);
        assert!(lookup(Fourcc::from_chars(*b"YU10")).is_none());
        assert_eq!(
            require(Fourcc(0)),
            Err(FormatError::Unsupported(Fourcc(0)))
        );
    }

    #[test]
    fn fourcc_codes_match_drm() {
        assert_eq!(Fourcc::NV12.raw(), 0x3231_564e);
        assert_eq!(Fourcc::ABGR8888.raw(), 0x3432_4241);
        assert_eq!(Fourcc::RGBA5551.to_string(), "RA15");
    }

    #[test]
    fn pitches() {
        let abgr = lookup(Fourcc::ABGR8888).unwrap();
        assert_eq!(abgr.row_pitch(600), 608 * 4);
        let rgba5551 = lookup(Fourcc::RGBA5551).unwrap();
        assert_eq!(rgba5551.row_pitch(600), 608 * 2);
        assert_eq!(rgba5551.row_pitch(610), 624 * 2);
        let rgb = lookup(Fourcc::RGB888).unwrap();
        assert_eq!(rgb.row_pitch(610), 640 * 3);
        let nv12 = lookup(Fourcc::NV12).unwrap();
        assert_eq!(nv12.row_pitch(1920), 1920);
    }

    #[test]
    fn semi_planar_offset() {
        let nv12 = lookup(Fourcc::NV12).unwrap();
        assert_eq!(nv12.plane_offset(0, 1920, 1080), Some(0));
        assert_eq!(nv12.plane_offset(1, 1920, 1080), Some(1920 * 1080));
        assert_eq!(nv12.plane_offset(1, 1000, 10), Some(1024 * 10));
        assert_eq!(nv12.layout_span(64, 33), Some(64 * 33 + 64 * 17));
    }

    #[test]
    fn spans_are_computed_without_wrapping() {
        let nv12 = lookup(Fourcc::NV12).unwrap();
        let span = nv12.layout_span(65536, 65536).unwrap();
        assert_eq!(span, 65536 * 65536 + 65536 * 32768);
        assert!(span > MAX_IMPORT_SPAN);
        let abgr = lookup(Fourcc::ABGR8888).unwrap();
        assert_eq!(abgr.row_pitch(u32::MAX), (1 << 32) * 4);
        assert_eq!(abgr.allocation_width(u32::MAX), None);
    }

    #[test]
    fn odd_heights_allocate_the_rounded_chroma_row() {
        let nv12 = lookup(Fourcc::NV12).unwrap();
        for layout in [Layout::Linear, Layout::Compressed] {
            for height in [1, 2, 33, 1080, 1081] {
                let width = nv12.allocation_width(64).unwrap();
                let rows = nv12.allocation_height(64, height, layout).unwrap();
                let bytes = (u64::from(width) * u64::from(nv12.allocation_bits_per_pixel(layout))).div_ceil(8) * u64::from(rows);
                assert!(rows >= height);
                assert!(bytes >= nv12.layout_span(64, height).unwrap(), "{height} {layout:?}");
            }
        }
        //even heights keep the nominal 12 bits per pixel
        assert_eq!(nv12.allocation_height(1920, 1080, Layout::Linear), Some(1080));
        assert_eq!(nv12.allocation_height(64, 33, Layout::Linear), Some(34));
        let abgr = lookup(Fourcc::ABGR8888).unwrap();
        assert_eq!(abgr.allocation_height(600, 48, Layout::Linear), Some(48));
    }

    #[test]
    fn layouts() {
        let rgba5551 = lookup(Fourcc::RGBA5551).unwrap();
        assert!(rgba5551.check_layout(Layout::Linear).is_ok());
        assert_eq!(
            rgba5551.check_layout(Layout::Compressed),
            Err(FormatError::CompressionUnsupported(Fourcc::RGBA5551))
        );
        let yu08 = lookup(Fourcc::YUV420_8BIT).unwrap();
        assert_eq!(
            yu08.check_layout(Layout::Linear),
            Err(FormatError::LinearUnsupported(Fourcc::YUV420_8BIT))
        );
        assert!(yu08.check_layout(Layout::Compressed).is_ok());
    }

    #[test]
    fn allocation_and_dump_sizes() {
        let abgr = lookup(Fourcc::ABGR8888).unwrap();
        assert_eq!(abgr.allocation_bits_per_pixel(Layout::Linear), 32);
        assert_eq!(abgr.allocation_bits_per_pixel(Layout::Compressed), 64);
        let nv12 = lookup(Fourcc::NV12).unwrap();
        assert_eq!(nv12.frame_size(1920, 1080, Layout::Linear), 1920 * 1080 * 3 / 2);
        assert_eq!(nv12.frame_size(1920, 1080, Layout::Compressed), 1920 * 1080 * 3);
        assert_eq!(nv12.dump_tag(Layout::Linear), "nv12");
        assert_eq!(nv12.dump_tag(Layout::Compressed), "nv12_afbc");
    }

    #[test]
    fn modifiers_only_when_compressed() {
        let nv12 = lookup(Fourcc::NV12).unwrap();
        assert_eq!(nv12.modifier(0, Layout::Linear), None);
        assert_eq!(
            nv12.modifier(0, Layout::Compressed),
            Some(afbc::modifier(BlockSize::B32x8))
        );
        assert_eq!(
            nv12.modifier(1, Layout::Compressed),
            Some(afbc::modifier(BlockSize::B64x4))
        );
    }
}
