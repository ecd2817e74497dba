/*! Surface types and the plumbing between them and the GPU: import descriptors, raw loading and dumps. */

pub mod dump;
pub mod import;
pub mod raw;
mod surface;
mod surface_config;
pub mod visible_to;

pub use import::ImportError;
pub use surface::{Surface, SurfaceError};
pub use surface_config::SurfaceConfig;
pub use visible_to::SurfaceUsage;
