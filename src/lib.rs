/*! planes_and_pixels composites an on-screen-display layer over a video layer, sharing buffers
between the CPU and the GPU without copies.

Buffers are kernel dumb buffers exported as DMA-BUF file descriptors.  The CPU writes them through
a shared mapping; the GPU sees the same memory as an external texture imported with
`EGL_EXT_image_dma_buf_import`.  A two-layer shader blends an RGBA overlay into a YUV background
in place.

```text
Allocator ──allocate──▶ Surface ──Engine::import──▶ texture (+ framebuffer)
                                                          │
                       Compositor::render(overlay, background, geometry)
                                                          │
                                      Engine::finish ──▶ read back / dump
```

# Pieces

| Module                    | Concern                                                           |
|---------------------------|-------------------------------------------------------------------|
| [`pixel_formats`]         | Supported fourccs, plane layouts, pitches and compression modifiers |
| [`dma`]                   | Dumb-buffer allocation, prime export and CPU mappings             |
| [`bindings`]              | Surfaces, import descriptors, raw file loading and dumps          |
| [`images`]                | The engine, the compositor program and its geometry               |

# Backends

The `backend_egl` feature (on by default) loads `libEGL` at runtime and renders with OpenGL ES 3.
A software backend is always compiled.  It maps the imported descriptors itself and runs the same
blend on the CPU, which keeps every surface operation testable on machines without a GPU.

Surfaces, textures and programs must be used on the thread that created their engine.
*/

pub mod bindings;
mod bittricks;
pub mod dma;
#[cfg(feature = "backend_egl")]
mod entry_point;
pub mod images;
mod imp;
pub mod pixel_formats;

#[cfg(feature = "backend_egl")]
pub use entry_point::{EntryPoint, EntryPointError};
