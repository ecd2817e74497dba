//! How a surface takes part in a compositing pass.
//!
//! A surface is either sampled by the compositor or rendered into by it.  The role is a flag
//! on an otherwise identical surface: both roles are imported the same way, but a render
//! target additionally gets a framebuffer with the surface attached as its color attachment.
//!
//! # Examples
//!
//! ```
//! use planes_and_pixels::bindings::visible_to::SurfaceUsage;
//!
//! assert!(!SurfaceUsage::Sampled.needs_framebuffer());
//! assert!(SurfaceUsage::RenderTarget.needs_framebuffer());
//! ```

/// Declares whether a surface will be sampled or rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceUsage {
    /// The surface is only read by the compositor's fragment shader.
    #[default]
    Sampled,
    /// The surface is read by the compositor and also receives its output.
    ///
    /// Import attaches the texture to a framebuffer object.
    RenderTarget,
}

impl SurfaceUsage {
    pub const fn needs_framebuffer(self) -> bool {
        matches!(self, SurfaceUsage::RenderTarget)
    }

    pub const fn from_need_fbo(need_fbo: bool) -> Self {
        if need_fbo { SurfaceUsage::RenderTarget } else { SurfaceUsage::Sampled }
    }

    pub(crate) const fn role(self) -> &'static str {
        match self {
            SurfaceUsage::Sampled => "sampled",
            SurfaceUsage::RenderTarget => "render-target",
        }
    }
}
