use super::context::Context;
use super::error::{Hex, check_gl};
use crate::bindings::ImportError;
use crate::bindings::import::ImportDescriptor;
use crate::bindings::visible_to::SurfaceUsage;
use glow::HasContext;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::rc::Rc;

pub(crate) const GL_TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

/// Destroys an `EGLImage` once the texture has taken its storage.
struct ImageGuard<'a> {
    context: &'a Context,
    image: NonNull<c_void>,
}

impl Drop for ImageGuard<'_> {
    fn drop(&mut self) {
        self.context.destroy_image(self.image);
    }
}

/// An external texture whose storage is an imported dma-buf.
#[derive(Debug)]
pub(crate) struct Texture {
    context: Rc<Context>,
    texture: glow::Texture,
    framebuffer: Option<glow::Framebuffer>,
    width: u32,
    height: u32,
}

impl Texture {
    pub(crate) fn import(context: &Rc<Context>, descriptor: &ImportDescriptor<'_>, usage: SurfaceUsage) -> Result<Self, ImportError> {
        let attribs = descriptor.attrib_list();
        let image = context
            .create_dma_buf_image(&attribs)
            .map_err(|error| ImportError::NoImage { error })?;
        let image = ImageGuard { context, image };

        let gl = &context.gl;
        // SAFETY: the context is current on this thread
        let texture = unsafe { gl.create_texture() }.map_err(ImportError::Texture)?;
        context.texture_created();
        let mut imported = Texture {
            context: context.clone(),
            texture,
            framebuffer: None,
            width: descriptor.width,
            height: descriptor.height,
        };
        // SAFETY: current context, texture is live
        unsafe {
            gl.bind_texture(GL_TEXTURE_EXTERNAL_OES, Some(texture));
            check_gl(gl, "glBindTexture");
            gl.tex_parameter_i32(GL_TEXTURE_EXTERNAL_OES, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            check_gl(gl, "glTexParameteri");
            gl.tex_parameter_i32(GL_TEXTURE_EXTERNAL_OES, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            check_gl(gl, "glTexParameteri");
        }
        context.image_target_texture(GL_TEXTURE_EXTERNAL_OES, image.image);
        drop(image);

        if usage.needs_framebuffer() {
            // SAFETY: current context
            let framebuffer = unsafe { gl.create_framebuffer() }.map_err(ImportError::Framebuffer)?;
            imported.framebuffer = Some(framebuffer);
            // SAFETY: current context, framebuffer and texture are live
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
                check_gl(gl, "glBindFramebuffer");
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    GL_TEXTURE_EXTERNAL_OES,
                    Some(texture),
                    0,
                );
                check_gl(gl, "glFramebufferTexture2D");
                let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
                if status != glow::FRAMEBUFFER_COMPLETE {
                    logwise::error_sync!(
                        "Framebuffer incomplete: status {status}",
                        status = logwise::privacy::LogIt(Hex(status))
                    );
                }
            }
        }
        Ok(imported)
    }

    pub(crate) fn texture_id(&self) -> u32 {
        self.texture.0.get()
    }

    pub(crate) fn framebuffer_id(&self) -> Option<u32> {
        self.framebuffer.map(|f| f.0.get())
    }

    pub(crate) fn raw_texture(&self) -> glow::Texture {
        self.texture
    }

    pub(crate) fn raw_framebuffer(&self) -> Option<glow::Framebuffer> {
        self.framebuffer
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let gl = &self.context.gl;
        // SAFETY: current context; both objects were created on it
        unsafe {
            if let Some(framebuffer) = self.framebuffer.take() {
                gl.delete_framebuffer(framebuffer);
                check_gl(gl, "glDeleteFramebuffers");
            }
            gl.delete_texture(self.texture);
            check_gl(gl, "glDeleteTextures");
        }
        self.context.texture_deleted();
    }
}
