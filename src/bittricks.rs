/*!
Alignment and bit packing.
*/

/// Rounds `value` up to the next multiple of `alignment`, which must be a power of two.
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + (alignment - 1)) & !(alignment - 1)
}

/// Splits a 64-bit value into its (high, low) 32-bit halves.
pub const fn u64_to_u32s(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, (packed & 0xFFFF_FFFF) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align() {
        assert_eq!(align_up(600, 16), 608);
        assert_eq!(align_up(600, 32), 608);
        assert_eq!(align_up(1920, 32), 1920);
        assert_eq!(align_up(1, 32), 32);
        assert_eq!(align_up(0, 32), 0);
        assert_eq!(align_up(u32::MAX as u64, 32), 1 << 32);
    }

    #[test]
    fn split() {
        assert_eq!(u64_to_u32s(0x0800_0000_0000_0041), (0x0800_0000, 0x41));
        assert_eq!(u64_to_u32s(u64::MAX), (u32::MAX, u32::MAX));
    }
}
