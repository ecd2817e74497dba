/*! The compositing component of planes_and_pixels */

pub use engine::{CreateError, Engine, EngineConfig};
pub use compositor::{Compositor, CompositorConfig, ProgramError, RenderError};

pub(crate) mod engine;
pub(crate) mod compositor;
pub mod shader;
pub mod vertex_algorithms;
