// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Loads the platform display library.
use crate::imp;
use std::fmt::Formatter;

#[derive(Debug)]
pub struct EntryPoint(pub(crate) imp::egl::EntryPoint);
///platform-independent error type
#[derive(Debug)]
pub struct EntryPointError(imp::egl::Error);
impl std::fmt::Display for EntryPointError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
impl std::error::Error for EntryPointError {}

impl EntryPoint {
    ///Loads `libEGL` and resolves its entry points.
    pub fn new() -> Result<Self, EntryPointError> {
        imp::egl::EntryPoint::new()
            .map(EntryPoint)
            .map_err(|e| {
                logwise::error_sync!("{e}", e = logwise::privacy::LogIt(&e));
                EntryPointError(e)
            })
    }
}
