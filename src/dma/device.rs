// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::dma::Mapping;
use std::collections::HashMap;
use std::ffi::CString;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// A dumb buffer as reported by the device that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumbBuffer {
    /// Device-local handle; only meaningful on the device that created it.
    pub handle: u32,
    /// Row pitch chosen by the device, in bytes.
    pub pitch: u32,
    /// Total size in bytes.
    pub size: u64,
}

/**
A device that can create, export, map and destroy dumb buffers.

Handles are scoped to the device: every operation on a handle must go to the device that
created it.
*/
pub trait DumbDevice: Debug + Send + Sync {
    fn create_dumb(&self, width: u32, height: u32, bits_per_pixel: u32) -> io::Result<DumbBuffer>;
    /// Exports `handle` as a shareable file descriptor.
    fn prime_export(&self, handle: u32) -> io::Result<OwnedFd>;
    /// Maps `buffer` for CPU access.  `exported` is the descriptor returned by
    /// [`DumbDevice::prime_export`] for the same handle.
    fn map_dumb(&self, buffer: &DumbBuffer, exported: BorrowedFd<'_>) -> io::Result<Mapping>;
    fn destroy_dumb(&self, handle: u32) -> io::Result<()>;
}

#[repr(C)]
#[derive(Debug, Default)]
struct drm_mode_create_dumb {
    height: u32,
    width: u32,
    bpp: u32,
    flags: u32,
    handle: u32,
    pitch: u32,
    size: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
struct drm_mode_map_dumb {
    handle: u32,
    pad: u32,
    offset: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
struct drm_mode_destroy_dumb {
    handle: u32,
}

#[repr(C)]
#[derive(Debug, Default)]
struct drm_prime_handle {
    handle: u32,
    flags: u32,
    fd: i32,
}

const DRM_IOCTL_BASE: u64 = b'd' as u64;

const fn drm_iowr(nr: u64, size: usize) -> u64 {
    (3 << 30) | ((size as u64) << 16) | (DRM_IOCTL_BASE << 8) | nr
}

const DRM_IOCTL_MODE_CREATE_DUMB: u64 = drm_iowr(0xB2, size_of::<drm_mode_create_dumb>());
const DRM_IOCTL_MODE_MAP_DUMB: u64 = drm_iowr(0xB3, size_of::<drm_mode_map_dumb>());
const DRM_IOCTL_MODE_DESTROY_DUMB: u64 = drm_iowr(0xB4, size_of::<drm_mode_destroy_dumb>());
const DRM_IOCTL_PRIME_HANDLE_TO_FD: u64 = drm_iowr(0x2d, size_of::<drm_prime_handle>());

const DRM_CLOEXEC: u32 = libc::O_CLOEXEC as u32;
const DRM_RDWR: u32 = libc::O_RDWR as u32;

/// Issues a DRM ioctl, restarting on EINTR and EAGAIN.
fn drm_ioctl<T>(fd: BorrowedFd<'_>, request: u64, arg: &mut T) -> io::Result<()> {
    loop {
        // SAFETY: arg is a live, correctly sized repr(C) struct for `request`
        let r = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, arg as *mut T) };
        if r != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
            _ => return Err(err),
        }
    }
}

/**
A DRM device node.

The node stays open for the lifetime of the value, so handles it creates stay valid.
*/
#[derive(Debug)]
pub struct DrmCard {
    fd: OwnedFd,
    path: PathBuf,
}

impl DrmCard {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(path)?;
        Ok(DrmCard {
            fd: file.into(),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DumbDevice for DrmCard {
    fn create_dumb(&self, width: u32, height: u32, bits_per_pixel: u32) -> io::Result<DumbBuffer> {
        let mut req = drm_mode_create_dumb {
            height,
            width,
            bpp: bits_per_pixel,
            ..Default::default()
        };
        drm_ioctl(self.fd.as_fd(), DRM_IOCTL_MODE_CREATE_DUMB, &mut req)?;
        Ok(DumbBuffer {
            handle: req.handle,
            pitch: req.pitch,
            size: req.size,
        })
    }

    fn prime_export(&self, handle: u32) -> io::Result<OwnedFd> {
        let mut req = drm_prime_handle {
            handle,
            flags: DRM_CLOEXEC | DRM_RDWR,
            fd: -1,
        };
        drm_ioctl(self.fd.as_fd(), DRM_IOCTL_PRIME_HANDLE_TO_FD, &mut req)?;
        if req.fd < 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        // SAFETY: the kernel handed us a new descriptor that nothing else owns
        Ok(unsafe { OwnedFd::from_raw_fd(req.fd) })
    }

    fn map_dumb(&self, buffer: &DumbBuffer, _exported: BorrowedFd<'_>) -> io::Result<Mapping> {
        let mut req = drm_mode_map_dumb {
            handle: buffer.handle,
            ..Default::default()
        };
        drm_ioctl(self.fd.as_fd(), DRM_IOCTL_MODE_MAP_DUMB, &mut req)?;
        let len = usize::try_from(buffer.size).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        Mapping::new(self.fd.as_fd(), len, req.offset)
    }

    fn destroy_dumb(&self, handle: u32) -> io::Result<()> {
        let mut req = drm_mode_destroy_dumb { handle };
        drm_ioctl(self.fd.as_fd(), DRM_IOCTL_MODE_DESTROY_DUMB, &mut req)
    }
}

#[derive(Debug)]
struct MemfdBuffer {
    fd: OwnedFd,
    size: u64,
}

/**
Dumb buffers backed by anonymous shared memory.

Pitch and size follow the kernel's generic dumb-buffer rule: `pitch = ceil(width * bpp / 8)`,
`size = pitch * height`.  Exported descriptors are duplicates of the memfd, so a mapping made
through any of them sees the same bytes.
*/
#[derive(Debug)]
pub struct MemfdDevice {
    next_handle: AtomicU32,
    buffers: Mutex<HashMap<u32, MemfdBuffer>>,
}

impl MemfdDevice {
    pub fn new() -> Self {
        MemfdDevice {
            next_handle: AtomicU32::new(1),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    fn with_buffer<R>(&self, handle: u32, f: impl FnOnce(&MemfdBuffer) -> io::Result<R>) -> io::Result<R> {
        let buffers = self.buffers.lock().map_err(|_| io::Error::from(io::ErrorKind::Other))?;
        match buffers.get(&handle) {
            Some(b) => f(b),
            None => Err(io::Error::from_raw_os_error(libc::ENOENT)),
        }
    }
}

impl Default for MemfdDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DumbDevice for MemfdDevice {
    fn create_dumb(&self, width: u32, height: u32, bits_per_pixel: u32) -> io::Result<DumbBuffer> {
        if width == 0 || height == 0 || bits_per_pixel == 0 {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let pitch = (width as u64 * bits_per_pixel as u64).div_ceil(8);
        let size = pitch * height as u64;
        let pitch = u32::try_from(pitch).map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        let size_off = libc::off_t::try_from(size).map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;

        let name = CString::new("planes_and_pixels-dumb").map_err(io::Error::other)?;
        // SAFETY: name is a valid nul-terminated string
        let raw = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: memfd_create returned a new descriptor that nothing else owns
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        // SAFETY: fd is open
        if unsafe { libc::ftruncate(fd.as_raw_fd(), size_off) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.buffers
            .lock()
            .map_err(|_| io::Error::from(io::ErrorKind::Other))?
            .insert(handle, MemfdBuffer { fd, size });
        Ok(DumbBuffer { handle, pitch, size })
    }

    fn prime_export(&self, handle: u32) -> io::Result<OwnedFd> {
        self.with_buffer(handle, |b| b.fd.try_clone())
    }

    fn map_dumb(&self, buffer: &DumbBuffer, exported: BorrowedFd<'_>) -> io::Result<Mapping> {
        let size = self.with_buffer(buffer.handle, |b| Ok(b.size))?;
        let len = usize::try_from(size).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        Mapping::new(exported, len, 0)
    }

    fn destroy_dumb(&self, handle: u32) -> io::Result<()> {
        self.buffers
            .lock()
            .map_err(|_| io::Error::from(io::ErrorKind::Other))?
            .remove(&handle)
            .map(drop)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioctl_numbers() {
        assert_eq!(DRM_IOCTL_MODE_CREATE_DUMB, 0xC020_64B2);
        assert_eq!(DRM_IOCTL_MODE_MAP_DUMB, 0xC010_64B3);
        assert_eq!(DRM_IOCTL_MODE_DESTROY_DUMB, 0xC004_64B4);
        assert_eq!(DRM_IOCTL_PRIME_HANDLE_TO_FD, 0xC00C_642D);
    }

    #[test]
    fn memfd_pitch_follows_bpp() {
        let device = MemfdDevice::new();
        let b = device.create_dumb(1920, 1080, 12).unwrap();
        assert_eq!(b.pitch, 2880);
        assert_eq!(b.size, 2880 * 1080);
        device.destroy_dumb(b.handle).unwrap();
        assert!(device.destroy_dumb(b.handle).is_err());
    }

    #[test]
    fn memfd_export_shares_bytes() {
        let device = MemfdDevice::new();
        let b = device.create_dumb(16, 2, 32).unwrap();
        let first = device.prime_export(b.handle).unwrap();
        let second = device.prime_export(b.handle).unwrap();
        let mut a = device.map_dumb(&b, first.as_fd()).unwrap();
        let c = device.map_dumb(&b, second.as_fd()).unwrap();
        a.as_mut_slice()[5] = 0xAB;
        assert_eq!(c.as_slice()[5], 0xAB);
        assert_eq!(c.len(), 128);
        device.destroy_dumb(b.handle).unwrap();
    }

    #[test]
    fn memfd_rejects_empty() {
        let device = MemfdDevice::new();
        assert!(device.create_dumb(0, 10, 32).is_err());
    }
}
