// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::import::ImportDescriptor;
use crate::bindings::{Surface, SurfaceError};
use crate::dma::{Allocator, OpenError};
#[cfg(feature = "backend_egl")]
use crate::entry_point::{EntryPoint, EntryPointError};
use crate::images::compositor::{Compositor, CompositorConfig, ProgramError};
use crate::imp;
use std::path::PathBuf;
use std::time::Instant;

/// Where the engine gets its buffers and how big its off-screen surface is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// DRM node dumb buffers are allocated on.
    pub card_path: PathBuf,
    pub pbuffer_width: u32,
    pub pbuffer_height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            card_path: PathBuf::from("/dev/dri/card0"),
            pbuffer_width: 100,
            pbuffer_height: 100,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CreateError {
    #[cfg(feature = "backend_egl")]
    #[error("Can't load the display library: {0}")]
    EntryPoint(#[from] EntryPointError),
    #[error(transparent)]
    Device(#[from] OpenError),
    #[error("No EGL display")]
    NoDisplay,
    #[error("No EGL config with an ES 3 pbuffer")]
    NoConfig,
    #[error("{op} failed with EGL error 0x{code:x}")]
    Egl { op: &'static str, code: i32 },
    #[error("Missing extension entry point {0}")]
    MissingExtension(&'static str),
}

/**
The display context: a rendering backend plus the allocator its surfaces come from.

Every import and render goes through the engine that created the compositor, on the thread
that created the engine.
*/
#[derive(Debug)]
pub struct Engine {
    backend: imp::Engine,
    allocator: Allocator,
}

impl Engine {
    /**
    Opens `config.card_path` for allocation and creates an EGL context on an off-screen
    pbuffer.

    Fails if either the device or the context can't be acquired; nothing else can proceed
    without them.
    */
    #[cfg(feature = "backend_egl")]
    pub fn egl(config: EngineConfig) -> Result<Self, CreateError> {
        let allocator = Allocator::open(&config.card_path)?;
        let entry_point = EntryPoint::new()?;
        let backend = imp::egl::Engine::new(&entry_point.0, &config)?;
        logwise::info_sync!(
            "EGL engine ready on {card}",
            card = logwise::privacy::LogIt(&config.card_path)
        );
        Ok(Engine {
            backend: imp::Engine::Egl(backend),
            allocator,
        })
    }

    /// A CPU engine over anonymous shared memory.
    pub fn software() -> Self {
        Self::software_with(Allocator::memfd())
    }

    /// A CPU engine allocating from `allocator`.
    pub fn software_with(allocator: Allocator) -> Self {
        Engine {
            backend: imp::Engine::Soft(imp::soft::Engine::new()),
            allocator,
        }
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /**
    Imports an allocated surface as a texture, aliasing its memory.

    Render targets also get a framebuffer.  Framebuffer incompleteness is logged, not returned.
    */
    pub fn import(&self, surface: &mut Surface) -> Result<(), SurfaceError> {
        if surface.is_imported() {
            return Err(SurfaceError::AlreadyImported);
        }
        let buffer = surface.buffer().ok_or(SurfaceError::NotAllocated)?;
        let descriptor = ImportDescriptor::new(
            surface.format(),
            surface.layout(),
            surface.width(),
            surface.height(),
            buffer.fd(),
        )?;
        let texture = self.backend.import(&descriptor, surface.usage())?;
        surface.set_texture(texture);
        logwise::info_sync!("imported {surface}", surface = logwise::privacy::LogIt(surface.describe()));
        Ok(())
    }

    /// Builds the blend program.  Compile and link failures are returned.
    pub fn compositor(&self, config: CompositorConfig) -> Result<Compositor, ProgramError> {
        let program = self.backend.program(config.standard)?;
        Ok(Compositor::new(program, config))
    }

    /// Blocks until every submitted draw has landed in memory.
    pub fn finish(&self) {
        let start = Instant::now();
        self.backend.finish();
        logwise::trace_sync!(
            "finish use time {elapsed}",
            elapsed = logwise::privacy::LogIt(start.elapsed())
        );
    }

    /// Textures imported through this engine that are still alive.
    pub fn live_textures(&self) -> usize {
        self.backend.live_textures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.card_path, PathBuf::from("/dev/dri/card0"));
        assert_eq!((c.pbuffer_width, c.pbuffer_height), (100, 100));
    }

    #[test]
    fn software_engine_starts_empty() {
        let engine = Engine::software();
        assert_eq!(engine.backend_name(), "soft");
        assert_eq!(engine.live_textures(), 0);
        assert_eq!(engine.allocator().live_buffers(), 0);
        engine.finish();
    }
}
