// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Builder-style configuration for [`Surface`](crate::bindings::Surface) creation.

use crate::bindings::visible_to::SurfaceUsage;
use crate::pixel_formats::{Fourcc, Layout};

/// Size, format and role of a surface.
///
/// ```
/// use planes_and_pixels::bindings::{SurfaceConfig, visible_to::SurfaceUsage};
/// use planes_and_pixels::pixel_formats::Fourcc;
///
/// let config = SurfaceConfig::new(1920, 1080, Fourcc::NV12)
///     .with_usage(SurfaceUsage::RenderTarget)
///     .with_debug_name("background");
/// assert!(!config.compressed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub format: Fourcc,
    /// Use the compressed (AFBC) layout.
    pub compressed: bool,
    pub usage: SurfaceUsage,
    pub debug_name: String,
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32, format: Fourcc) -> Self {
        Self {
            width,
            height,
            format,
            compressed: false,
            usage: SurfaceUsage::Sampled,
            debug_name: String::new(),
        }
    }

    pub fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn with_usage(mut self, usage: SurfaceUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_debug_name(mut self, debug_name: impl Into<String>) -> Self {
        self.debug_name = debug_name.into();
        self
    }

    pub fn layout(&self) -> Layout {
        Layout::from_compressed(self.compressed)
    }
}
