// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use super::EglInstance;
use super::error::{Hex, check_egl, check_gl};
use crate::images::{CreateError, EngineConfig};
use glow::HasContext;
use khronos_egl as egl;
use std::cell::Cell;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::rc::Rc;

const EGL_OPENGL_ES3_BIT: egl::Int = 0x0040;
const EGL_NO_CONTEXT: *mut c_void = std::ptr::null_mut();

type CreateImageKhr =
    unsafe extern "system" fn(*mut c_void, *mut c_void, egl::Enum, *mut c_void, *const egl::Int) -> *mut c_void;
type DestroyImageKhr = unsafe extern "system" fn(*mut c_void, *mut c_void) -> egl::Boolean;
type ImageTargetTexture2dOes = unsafe extern "system" fn(u32, *mut c_void);

/// Extension entry points the core profile doesn't expose.
#[derive(Debug)]
struct ImageFns {
    create_image: CreateImageKhr,
    destroy_image: DestroyImageKhr,
    image_target_texture: ImageTargetTexture2dOes,
}

fn load_fn(egl: &EglInstance, name: &'static str) -> Result<extern "system" fn(), CreateError> {
    egl.get_proc_address(name).ok_or(CreateError::MissingExtension(name))
}

impl ImageFns {
    fn load(egl: &EglInstance) -> Result<Self, CreateError> {
        let create = load_fn(egl, "eglCreateImageKHR")?;
        let destroy = load_fn(egl, "eglDestroyImageKHR")?;
        let target = load_fn(egl, "glEGLImageTargetTexture2DOES")?;
        // SAFETY: the entry points have these signatures in the extension registry
        unsafe {
            Ok(ImageFns {
                create_image: std::mem::transmute::<extern "system" fn(), CreateImageKhr>(create),
                destroy_image: std::mem::transmute::<extern "system" fn(), DestroyImageKhr>(destroy),
                image_target_texture: std::mem::transmute::<extern "system" fn(), ImageTargetTexture2dOes>(target),
            })
        }
    }
}

/**
An EGL display with a current ES 3 context on an off-screen pbuffer.

Every GL call in the crate goes through [`Context::gl`].  The context is made current on the
creating thread and never moves.
*/
pub(crate) struct Context {
    pub(crate) gl: glow::Context,
    fns: ImageFns,
    live: Cell<usize>,
    //dropped in declaration order: context, then pbuffer, then display
    context: ContextGuard,
    surface: PbufferGuard,
    display: DisplayGuard,
    egl: Rc<EglInstance>,
}

fn warn_failed(op: &'static str, result: Result<(), egl::Error>) {
    if let Err(e) = result {
        logwise::warn_sync!(
            "{op} failed: {e}",
            op = logwise::privacy::LogIt(op),
            e = logwise::privacy::LogIt(&e)
        );
    }
}

/// Terminates an initialized display.
struct DisplayGuard {
    egl: Rc<EglInstance>,
    display: egl::Display,
}

impl Drop for DisplayGuard {
    fn drop(&mut self) {
        warn_failed("eglTerminate", self.egl.terminate(self.display));
    }
}

struct PbufferGuard {
    egl: Rc<EglInstance>,
    display: egl::Display,
    surface: egl::Surface,
}

impl Drop for PbufferGuard {
    fn drop(&mut self) {
        warn_failed("eglDestroySurface", self.egl.destroy_surface(self.display, self.surface));
    }
}

/// Releases and destroys a context, which may or may not be current.
struct ContextGuard {
    egl: Rc<EglInstance>,
    display: egl::Display,
    context: egl::Context,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        warn_failed("eglMakeCurrent", self.egl.make_current(self.display, None, None, None));
        warn_failed("eglDestroyContext", self.egl.destroy_context(self.display, self.context));
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("display", &self.display.display.as_ptr())
            .field("surface", &self.surface.surface.as_ptr())
            .field("context", &self.context.context.as_ptr())
            .field("live", &self.live.get())
            .finish_non_exhaustive()
    }
}

fn egl_failed(op: &'static str) -> impl FnOnce(egl::Error) -> CreateError {
    move |e| {
        logwise::error_sync!(
            "after {op}() eglError ({error})",
            op = logwise::privacy::LogIt(op),
            error = logwise::privacy::LogIt(Hex(e.native() as u32))
        );
        CreateError::Egl { op, code: e.native() }
    }
}

impl Context {
    pub(crate) fn new(egl: Rc<EglInstance>, config: &EngineConfig) -> Result<Self, CreateError> {
        // SAFETY: DEFAULT_DISPLAY is always a valid native display
        let display = unsafe { egl.get_display(egl::DEFAULT_DISPLAY) }.ok_or(CreateError::NoDisplay)?;
        let (major, minor) = egl.initialize(display).map_err(egl_failed("eglInitialize"))?;
        let display = DisplayGuard {
            egl: egl.clone(),
            display,
        };
        logwise::info_sync!("EGL version {major}.{minor}", major = major, minor = minor);
        egl.bind_api(egl::OPENGL_ES_API).map_err(egl_failed("eglBindAPI"))?;

        let config_attribs = [
            egl::SURFACE_TYPE,
            egl::PBUFFER_BIT,
            egl::RENDERABLE_TYPE,
            EGL_OPENGL_ES3_BIT,
            egl::RED_SIZE,
            8,
            egl::GREEN_SIZE,
            8,
            egl::BLUE_SIZE,
            8,
            egl::ALPHA_SIZE,
            8,
            egl::NONE,
        ];
        let egl_config = egl
            .choose_first_config(display.display, &config_attribs)
            .map_err(egl_failed("eglChooseConfig"))?
            .ok_or(CreateError::NoConfig)?;

        let surface_attribs = [
            egl::WIDTH,
            config.pbuffer_width as egl::Int,
            egl::HEIGHT,
            config.pbuffer_height as egl::Int,
            egl::NONE,
        ];
        let surface = PbufferGuard {
            egl: egl.clone(),
            display: display.display,
            surface: egl
                .create_pbuffer_surface(display.display, egl_config, &surface_attribs)
                .map_err(egl_failed("eglCreatePbufferSurface"))?,
        };
        let context_attribs = [egl::CONTEXT_CLIENT_VERSION, 3, egl::NONE];
        let context = ContextGuard {
            egl: egl.clone(),
            display: display.display,
            context: egl
                .create_context(display.display, egl_config, None, &context_attribs)
                .map_err(egl_failed("eglCreateContext"))?,
        };
        egl.make_current(
            display.display,
            Some(surface.surface),
            Some(surface.surface),
            Some(context.context),
        )
        .map_err(egl_failed("eglMakeCurrent"))?;
        let fns = ImageFns::load(&egl)?;

        // SAFETY: the context was just made current on this thread
        let gl = unsafe {
            glow::Context::from_loader_function(|name| {
                egl.get_proc_address(name)
                    .map_or(std::ptr::null(), |f| f as *const c_void)
            })
        };

        let width = egl.query_surface(display.display, surface.surface, egl::WIDTH).unwrap_or(0);
        let height = egl.query_surface(display.display, surface.surface, egl::HEIGHT).unwrap_or(0);
        logwise::info_sync!("Window dimensions: {width} x {height}", width = width, height = height);
        // SAFETY: current context
        unsafe {
            for (name, id) in [
                ("Version", glow::VERSION),
                ("Vendor", glow::VENDOR),
                ("Renderer", glow::RENDERER),
                ("Extensions", glow::EXTENSIONS),
            ] {
                let value = gl.get_parameter_string(id);
                logwise::info_sync!(
                    "GL {name} = {value}",
                    name = logwise::privacy::LogIt(name),
                    value = logwise::privacy::LogIt(&value)
                );
            }
        }
        check_gl(&gl, "glGetString");

        Ok(Context {
            gl,
            fns,
            live: Cell::new(0),
            context,
            surface,
            display,
            egl,
        })
    }

    /// Creates an `EGLImage` from a dma-buf attribute list, or returns the EGL error code.
    pub(crate) fn create_dma_buf_image(&self, attribs: &[egl::Int]) -> Result<NonNull<c_void>, u32> {
        // SAFETY: attribs is EGL_NONE-terminated and its descriptors are open
        let image = unsafe {
            (self.fns.create_image)(
                self.display.display.as_ptr(),
                EGL_NO_CONTEXT,
                crate::bindings::import::EGL_LINUX_DMA_BUF_EXT,
                std::ptr::null_mut(),
                attribs.as_ptr(),
            )
        };
        let error = check_egl(&self.egl, "eglCreateImageKHR").map_or(0, |e| e.native() as u32);
        NonNull::new(image).ok_or(error)
    }

    pub(crate) fn destroy_image(&self, image: NonNull<c_void>) {
        // SAFETY: image came from create_dma_buf_image on this display
        unsafe { (self.fns.destroy_image)(self.display.display.as_ptr(), image.as_ptr()) };
        check_egl(&self.egl, "eglDestroyImageKHR");
    }

    /// Makes `image` the storage of the texture bound to `target`.
    pub(crate) fn image_target_texture(&self, target: u32, image: NonNull<c_void>) {
        // SAFETY: a texture is bound to target and image is live
        unsafe { (self.fns.image_target_texture)(target, image.as_ptr()) };
        check_gl(&self.gl, "glEGLImageTargetTexture2DOES");
    }

    pub(crate) fn texture_created(&self) {
        self.live.set(self.live.get() + 1);
    }

    pub(crate) fn texture_deleted(&self) {
        self.live.set(self.live.get().saturating_sub(1));
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.live.get()
    }

    pub(crate) fn finish(&self) {
        // SAFETY: current context
        unsafe { self.gl.finish() };
        check_gl(&self.gl, "glFinish");
    }
}
