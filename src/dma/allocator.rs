use crate::dma::{DrmCard, DumbBuffer, DumbDevice, Mapping, MemfdDevice};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("Can't create {width}x{height}@{bits_per_pixel} dumb buffer: {source}")]
    Create {
        width: u32,
        height: u32,
        bits_per_pixel: u32,
        source: io::Error,
    },
    #[error("Can't export dumb buffer handle {handle}: {source}")]
    Export { handle: u32, source: io::Error },
    #[error("Can't map dumb buffer handle {handle}: {source}")]
    Map { handle: u32, source: io::Error },
}

#[derive(Debug, thiserror::Error)]
#[error("Can't open {}: {source}", .path.display())]
pub struct OpenError {
    path: PathBuf,
    source: io::Error,
}

impl OpenError {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/**
Allocates [`DmaBuffer`]s on a [`DumbDevice`].

Cloning an allocator shares the device and the live-buffer count.
*/
#[derive(Debug, Clone)]
pub struct Allocator {
    device: Arc<dyn DumbDevice>,
    live: Arc<AtomicUsize>,
}

impl Allocator {
    /// Opens the DRM node at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let card = DrmCard::open(path).map_err(|source| OpenError {
            path: path.to_path_buf(),
            source,
        })?;
        logwise::info_sync!("opened {path}", path = logwise::privacy::LogIt(&path));
        Ok(Self::with_device(Arc::new(card)))
    }

    /// An allocator backed by anonymous shared memory.
    pub fn memfd() -> Self {
        Self::with_device(Arc::new(MemfdDevice::new()))
    }

    pub fn with_device(device: Arc<dyn DumbDevice>) -> Self {
        Allocator {
            device,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /**
    Creates, exports and maps a buffer of at least `width` x `height` pixels of `bits_per_pixel`.

    On failure, everything acquired so far is released before returning.
    */
    pub fn allocate(&self, width: u32, height: u32, bits_per_pixel: u32) -> Result<DmaBuffer, AllocError> {
        let created = self
            .device
            .create_dumb(width, height, bits_per_pixel)
            .map_err(|source| AllocError::Create {
                width,
                height,
                bits_per_pixel,
                source,
            })?;
        let handle = HandleGuard::new(self.device.clone(), self.live.clone(), created);
        let fd = self
            .device
            .prime_export(created.handle)
            .map_err(|source| AllocError::Export {
                handle: created.handle,
                source,
            })?;
        let mapping = self
            .device
            .map_dumb(&created, fd.as_fd())
            .map_err(|source| AllocError::Map {
                handle: created.handle,
                source,
            })?;
        logwise::trace_sync!(
            "allocated dumb buffer {handle}: {width}x{height}@{bpp} pitch={pitch} size={size}",
            handle = created.handle,
            width = width,
            height = height,
            bpp = bits_per_pixel,
            pitch = created.pitch,
            size = created.size
        );
        Ok(DmaBuffer {
            mapping,
            handle,
            fd,
            width,
            height,
            bits_per_pixel,
        })
    }

    /// Number of buffers created by this allocator (or its clones) that have not been released.
    pub fn live_buffers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// Destroys a dumb handle on the device that created it.
#[derive(Debug)]
struct HandleGuard {
    device: Arc<dyn DumbDevice>,
    live: Arc<AtomicUsize>,
    buffer: DumbBuffer,
}

impl HandleGuard {
    fn new(device: Arc<dyn DumbDevice>, live: Arc<AtomicUsize>, buffer: DumbBuffer) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        HandleGuard { device, live, buffer }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if let Err(err) = self.device.destroy_dumb(self.buffer.handle) {
            logwise::error_sync!(
                "Can't destroy dumb buffer handle {handle}: {err}",
                handle = self.buffer.handle,
                err = logwise::privacy::LogIt(&err)
            );
        }
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/**
A mapped, exported dumb buffer.

Dropping the buffer unmaps it, destroys the handle, then closes the exported descriptor.
*/
#[derive(Debug)]
pub struct DmaBuffer {
    //field order is drop order
    mapping: Mapping,
    handle: HandleGuard,
    fd: OwnedFd,
    width: u32,
    height: u32,
    bits_per_pixel: u32,
}

impl DmaBuffer {
    /// The exported descriptor.  Valid for as long as the buffer lives.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    pub fn handle(&self) -> u32 {
        self.handle.buffer.handle
    }

    /// Row pitch reported by the device, in bytes.
    pub fn pitch(&self) -> u32 {
        self.handle.buffer.pitch
    }

    pub fn size(&self) -> u64 {
        self.handle.buffer.size
    }

    /// Width as requested from the allocator.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    pub fn bytes(&self) -> &[u8] {
        self.mapping.as_slice()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.mapping.as_mut_slice()
    }
}

impl AsFd for DmaBuffer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
