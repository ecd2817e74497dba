/*!
Arm frame buffer compression (AFBC) format modifiers.

Compressed surfaces are imported with a 64-bit modifier that names the vendor (Arm) in the top
byte and the compression flags in the low bits.
*/

///Vendor code for Arm in the top byte of a DRM format modifier.
pub const DRM_FORMAT_MOD_VENDOR_ARM: u64 = 0x08;

pub const AFBC_FORMAT_MOD_BLOCK_SIZE_16X16: u64 = 1;
pub const AFBC_FORMAT_MOD_BLOCK_SIZE_32X8: u64 = 2;
pub const AFBC_FORMAT_MOD_BLOCK_SIZE_64X4: u64 = 3;
///Superblocks may be left unallocated.
pub const AFBC_FORMAT_MOD_SPARSE: u64 = 1 << 6;

/// Superblock size of one compressed plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockSize {
    B16x16,
    B32x8,
    B64x4,
}

impl BlockSize {
    pub const fn flag(self) -> u64 {
        match self {
            BlockSize::B16x16 => AFBC_FORMAT_MOD_BLOCK_SIZE_16X16,
            BlockSize::B32x8 => AFBC_FORMAT_MOD_BLOCK_SIZE_32X8,
            BlockSize::B64x4 => AFBC_FORMAT_MOD_BLOCK_SIZE_64X4,
        }
    }
}

/// Builds an Arm AFBC modifier from its flag bits.
pub const fn arm_afbc(flags: u64) -> u64 {
    (DRM_FORMAT_MOD_VENDOR_ARM << 56) | flags
}

/// The sparse modifier for a plane compressed with `block`.
pub const fn modifier(block: BlockSize) -> u64 {
    arm_afbc(AFBC_FORMAT_MOD_SPARSE | block.flag())
}

#[cfg(test)] mod tests {
    use super::*;
    use crate::bittricks::u64_to_u32s;

    #[test] fn modifier_words() {
        let (hi, lo) = u64_to_u32s(modifier(BlockSize::B16x16));
        assert_eq!(hi, 0x0800_0000);
        assert_eq!(lo, 0x41);
        let (hi, lo) = u64_to_u32s(modifier(BlockSize::B32x8));
        assert_eq!(hi, 0x0800_0000);
        assert_eq!(lo, 0x42);
        assert_eq!(u64_to_u32s(modifier(BlockSize::B64x4)).1, 0x43);
    }
}
