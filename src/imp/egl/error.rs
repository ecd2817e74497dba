//! Error draining for EGL and GL calls.
//!
//! Per-call failures are logged, not returned.  Callers that need to know whether an object
//! was created check the object itself.

use glow::HasContext;
use std::fmt::{Debug, Display, Formatter};

/// Formats an error code as `0x..` in logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hex(pub u32);

impl Debug for Hex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Display for Hex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Logs and clears every pending GL error, attributing them to `op`.
///
/// Returns the first error, if any.
pub(crate) fn check_gl(gl: &glow::Context, op: &str) -> Option<u32> {
    let mut first = None;
    loop {
        // SAFETY: the context is current on this thread
        let error = unsafe { gl.get_error() };
        if error == glow::NO_ERROR {
            return first;
        }
        logwise::error_sync!(
            "after {op}() glError ({error})",
            op = logwise::privacy::LogIt(op),
            error = logwise::privacy::LogIt(Hex(error))
        );
        first.get_or_insert(error);
    }
}

/// Logs the current EGL error, if any, attributing it to `op`.
pub(crate) fn check_egl(egl: &super::EglInstance, op: &str) -> Option<khronos_egl::Error> {
    let error = egl.get_error()?;
    logwise::error_sync!(
        "after {op}() eglError ({error})",
        op = logwise::privacy::LogIt(op),
        error = logwise::privacy::LogIt(Hex(error.native() as u32))
    );
    Some(error)
}

/// Display library failures.
#[derive(Debug)]
pub(crate) enum Error {
    Load(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Load(reason) => write!(f, "Can't load libEGL: {reason}"),
        }
    }
}
