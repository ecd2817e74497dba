/*!
The two-layer compositor.

A [`Compositor`] owns the linked blend program.  It is built once per engine and reused for
every render call.
*/

use crate::bindings::Surface;
use crate::images::shader::YuvStandard;
use crate::images::vertex_algorithms::Geometry;
use crate::imp;
use std::time::Instant;

/// Fixed settings of a compositor's program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositorConfig {
    /// Standard the overlay is converted with before blending.
    pub standard: YuvStandard,
}

/// Setup failures.  No program means no rendering, so these are returned, never just logged.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProgramError {
    #[error("Can't create GL object: {0}")]
    Create(String),
    #[error("Can't compile shader 0x{kind:x}: {log}")]
    Compile { kind: u32, log: String },
    #[error("Can't link program: {0}")]
    Link(String),
    #[error("Program has no attribute {0}")]
    MissingAttribute(&'static str),
    #[error("Program has no uniform {0}")]
    MissingUniform(&'static str),
}

/// Preconditions of a render call.  GPU errors during the draw are logged instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RenderError {
    #[error("The {0} surface is not imported")]
    NotImported(&'static str),
    #[error("The background surface has no framebuffer; create it as a render target")]
    NotRenderTarget,
    #[error("Surfaces and compositor come from different backends")]
    BackendMismatch,
}

#[derive(Debug)]
pub struct Compositor {
    program: imp::Program,
    config: CompositorConfig,
}

impl Compositor {
    pub(crate) fn new(program: imp::Program, config: CompositorConfig) -> Self {
        Compositor { program, config }
    }

    pub fn config(&self) -> CompositorConfig {
        self.config
    }

    /**
    Blends `overlay` over `background` inside `geometry.position`, writing into `background`.

    Overlay samples come from texture unit 0 and background samples from unit 1.  Output alpha
    is always 1.  Call [`Engine::finish`](crate::images::Engine::finish) before reading the
    result back.
    */
    pub fn render(&self, overlay: &Surface, background: &mut Surface, geometry: &Geometry) -> Result<(), RenderError> {
        let overlay = overlay.texture().ok_or(RenderError::NotImported("overlay"))?;
        let target = background.texture_mut().ok_or(RenderError::NotImported("background"))?;
        if target.framebuffer_id().is_none() {
            return Err(RenderError::NotRenderTarget);
        }
        let start = Instant::now();
        let drawn = self.program.draw(overlay, target, geometry);
        logwise::trace_sync!(
            "render use time {elapsed}",
            elapsed = logwise::privacy::LogIt(start.elapsed())
        );
        drawn
    }
}
