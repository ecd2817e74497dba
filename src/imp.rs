// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Backend dispatch.
//!
//! The software backend is always available; the EGL backend is compiled with `backend_egl`.
//! Textures and programs remember which backend made them, and a draw mixing backends is
//! refused.

use crate::bindings::ImportError;
use crate::bindings::import::ImportDescriptor;
use crate::bindings::visible_to::SurfaceUsage;
use crate::images::shader::YuvStandard;
use crate::images::vertex_algorithms::Geometry;
use crate::images::{ProgramError, RenderError};

pub(crate) mod soft;

#[cfg(feature = "backend_egl")]
pub(crate) mod egl;

#[derive(Debug)]
pub(crate) enum Engine {
    Soft(soft::Engine),
    #[cfg(feature = "backend_egl")]
    Egl(egl::Engine),
}

#[derive(Debug)]
pub(crate) enum Texture {
    Soft(soft::Texture),
    #[cfg(feature = "backend_egl")]
    Egl(egl::Texture),
}

#[derive(Debug)]
pub(crate) enum Program {
    Soft(soft::Program),
    #[cfg(feature = "backend_egl")]
    Egl(egl::Program),
}

impl Engine {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Engine::Soft(_) => "soft",
            #[cfg(feature = "backend_egl")]
            Engine::Egl(_) => "egl",
        }
    }

    pub(crate) fn import(&self, descriptor: &ImportDescriptor<'_>, usage: SurfaceUsage) -> Result<Texture, ImportError> {
        match self {
            Engine::Soft(e) => e.import(descriptor, usage).map(Texture::Soft),
            #[cfg(feature = "backend_egl")]
            Engine::Egl(e) => e.import(descriptor, usage).map(Texture::Egl),
        }
    }

    pub(crate) fn program(&self, standard: YuvStandard) -> Result<Program, ProgramError> {
        match self {
            Engine::Soft(e) => Ok(Program::Soft(e.program(standard))),
            #[cfg(feature = "backend_egl")]
            Engine::Egl(e) => e.program(standard).map(Program::Egl),
        }
    }

    pub(crate) fn finish(&self) {
        match self {
            //soft draws complete before returning
            Engine::Soft(_) => {}
            #[cfg(feature = "backend_egl")]
            Engine::Egl(e) => e.finish(),
        }
    }

    pub(crate) fn live_textures(&self) -> usize {
        match self {
            Engine::Soft(e) => e.live_textures(),
            #[cfg(feature = "backend_egl")]
            Engine::Egl(e) => e.live_textures(),
        }
    }
}

impl Texture {
    pub(crate) fn texture_id(&self) -> u32 {
        match self {
            Texture::Soft(t) => t.texture_id(),
            #[cfg(feature = "backend_egl")]
            Texture::Egl(t) => t.texture_id(),
        }
    }

    pub(crate) fn framebuffer_id(&self) -> Option<u32> {
        match self {
            Texture::Soft(t) => t.framebuffer_id(),
            #[cfg(feature = "backend_egl")]
            Texture::Egl(t) => t.framebuffer_id(),
        }
    }
}

impl Program {
    pub(crate) fn draw(&self, overlay: &Texture, background: &mut Texture, geometry: &Geometry) -> Result<(), RenderError> {
        match (self, overlay, background) {
            (Program::Soft(p), Texture::Soft(o), Texture::Soft(b)) => {
                p.draw(o, b, geometry);
                Ok(())
            }
            #[cfg(feature = "backend_egl")]
            (Program::Egl(p), Texture::Egl(o), Texture::Egl(b)) => {
                p.draw(o, b, geometry);
                Ok(())
            }
            #[cfg(feature = "backend_egl")]
            _ => Err(RenderError::BackendMismatch),
        }
    }
}
