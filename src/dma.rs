// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Kernel-backed buffer allocation.

An [`Allocator`] turns a width, height and bits-per-pixel request into a [`DmaBuffer`]: a
dumb buffer created on a [`DumbDevice`], exported as a shareable file descriptor, and mapped
into the process for CPU access.  The buffer owns all three resources and releases them in
reverse order on drop.

Two devices are provided:

* [`DrmCard`], a DRM node such as `/dev/dri/card0`, driven through the dumb-buffer ioctls
* [`MemfdDevice`], anonymous shared memory with the same contract, for hosts without a
  render node
*/

mod allocator;
mod device;
mod mapping;

pub use allocator::{AllocError, Allocator, DmaBuffer, OpenError};
pub use device::{DrmCard, DumbBuffer, DumbDevice, MemfdDevice};
pub use mapping::Mapping;
