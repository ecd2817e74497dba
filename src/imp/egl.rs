// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
EGL / OpenGL ES 3 backend.

The display library is loaded at runtime.  A pbuffer context is created once per engine and
stays current on the creating thread; textures and programs hold a reference to it so they are
deleted on the context that created them.
*/

mod context;
mod error;
mod program;
mod texture;

pub(crate) use error::Error;
pub(crate) use program::Program;
pub(crate) use texture::Texture;

use crate::bindings::ImportError;
use crate::bindings::import::ImportDescriptor;
use crate::bindings::visible_to::SurfaceUsage;
use crate::images::shader::{FragmentShader, VertexShader, YuvStandard};
use crate::images::{CreateError, EngineConfig, ProgramError};
use context::Context;
use std::rc::Rc;

pub(crate) type EglInstance = khronos_egl::DynamicInstance<khronos_egl::EGL1_4>;

/// The loaded display library.
#[derive(Clone)]
pub(crate) struct EntryPoint {
    egl: Rc<EglInstance>,
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint").finish_non_exhaustive()
    }
}

impl EntryPoint {
    pub(crate) fn new() -> Result<Self, Error> {
        // SAFETY: loading libEGL runs its initializers, which have no preconditions
        let egl = unsafe { EglInstance::load_required() }.map_err(|e| Error::Load(format!("{e:?}")))?;
        Ok(EntryPoint { egl: Rc::new(egl) })
    }
}

#[derive(Debug)]
pub(crate) struct Engine {
    context: Rc<Context>,
}

impl Engine {
    pub(crate) fn new(entry_point: &EntryPoint, config: &EngineConfig) -> Result<Self, CreateError> {
        let context = Context::new(entry_point.egl.clone(), config)?;
        Ok(Engine {
            context: Rc::new(context),
        })
    }

    pub(crate) fn import(&self, descriptor: &ImportDescriptor<'_>, usage: SurfaceUsage) -> Result<Texture, ImportError> {
        Texture::import(&self.context, descriptor, usage)
    }

    pub(crate) fn program(&self, standard: YuvStandard) -> Result<Program, ProgramError> {
        Program::build(&self.context, &VertexShader::composite(), &FragmentShader::composite(standard))
    }

    pub(crate) fn finish(&self) {
        self.context.finish();
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.context.live_textures()
    }
}
