//! Per-format texel loads and stores over linear surface memory.
//!
//! Loads follow external Y2Y sampling: YUV formats yield `(Y, U, V, 1)`, RGB formats yield
//! `(R, G, B, A)`.  Stores write the components back in the same order, so a load followed
//! by a store of the same value leaves the bytes unchanged.

use crate::pixel_formats::Fourcc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TexelLayout {
    pub fourcc: Fourcc,
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
    /// Byte offset of the interleaved chroma plane, for semi-planar formats.
    pub chroma_offset: usize,
}

impl TexelLayout {
    pub(crate) fn is_supported(fourcc: Fourcc) -> bool {
        matches!(
            fourcc,
            Fourcc::ABGR8888 | Fourcc::BGR888 | Fourcc::RGB888 | Fourcc::RGBA5551 | Fourcc::YUYV | Fourcc::NV12
        )
    }
}

fn unorm8(b: u8) -> f32 {
    b as f32 / 255.0
}

fn to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_unorm5(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 31.0).round() as u16
}

pub(crate) fn load(bytes: &[u8], layout: &TexelLayout, x: u32, y: u32) -> [f32; 4] {
    let (x, y) = (x as usize, y as usize);
    let row = y * layout.pitch;
    match layout.fourcc {
        Fourcc::ABGR8888 => {
            let p = &bytes[row + x * 4..row + x * 4 + 4];
            [unorm8(p[0]), unorm8(p[1]), unorm8(p[2]), unorm8(p[3])]
        }
        Fourcc::BGR888 => {
            let p = &bytes[row + x * 3..row + x * 3 + 3];
            [unorm8(p[0]), unorm8(p[1]), unorm8(p[2]), 1.0]
        }
        Fourcc::RGB888 => {
            let p = &bytes[row + x * 3..row + x * 3 + 3];
            [unorm8(p[2]), unorm8(p[1]), unorm8(p[0]), 1.0]
        }
        Fourcc::RGBA5551 => {
            let v = u16::from_le_bytes([bytes[row + x * 2], bytes[row + x * 2 + 1]]);
            let c = |s: u16| ((v >> s) & 31) as f32 / 31.0;
            [c(11), c(6), c(1), (v & 1) as f32]
        }
        Fourcc::YUYV => {
            let pair = row + (x / 2) * 4;
            let luma = if x % 2 == 0 { bytes[pair] } else { bytes[pair + 2] };
            [unorm8(luma), unorm8(bytes[pair + 1]), unorm8(bytes[pair + 3]), 1.0]
        }
        Fourcc::NV12 => {
            let uv = layout.chroma_offset + (y / 2) * layout.pitch + (x / 2) * 2;
            [unorm8(bytes[row + x]), unorm8(bytes[uv]), unorm8(bytes[uv + 1]), 1.0]
        }
        _ => [0.0, 0.0, 0.0, 1.0],
    }
}

pub(crate) fn store(bytes: &mut [u8], layout: &TexelLayout, x: u32, y: u32, value: [f32; 4]) {
    let (x, y) = (x as usize, y as usize);
    let row = y * layout.pitch;
    let [a, b, c, d] = value;
    match layout.fourcc {
        Fourcc::ABGR8888 => {
            bytes[row + x * 4..row + x * 4 + 4].copy_from_slice(&[to_unorm8(a), to_unorm8(b), to_unorm8(c), to_unorm8(d)]);
        }
        Fourcc::BGR888 => {
            bytes[row + x * 3..row + x * 3 + 3].copy_from_slice(&[to_unorm8(a), to_unorm8(b), to_unorm8(c)]);
        }
        Fourcc::RGB888 => {
            bytes[row + x * 3..row + x * 3 + 3].copy_from_slice(&[to_unorm8(c), to_unorm8(b), to_unorm8(a)]);
        }
        Fourcc::RGBA5551 => {
            let alpha = if d >= 0.5 { 1 } else { 0 };
            let v = to_unorm5(a) << 11 | to_unorm5(b) << 6 | to_unorm5(c) << 1 | alpha;
            bytes[row + x * 2..row + x * 2 + 2].copy_from_slice(&v.to_le_bytes());
        }
        Fourcc::YUYV => {
            let pair = row + (x / 2) * 4;
            let luma = if x % 2 == 0 { pair } else { pair + 2 };
            bytes[luma] = to_unorm8(a);
            bytes[pair + 1] = to_unorm8(b);
            bytes[pair + 3] = to_unorm8(c);
        }
        Fourcc::NV12 => {
            bytes[row + x] = to_unorm8(a);
            let uv = layout.chroma_offset + (y / 2) * layout.pitch + (x / 2) * 2;
            bytes[uv] = to_unorm8(b);
            bytes[uv + 1] = to_unorm8(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(fourcc: Fourcc, pitch: usize, height: u32) -> TexelLayout {
        TexelLayout {
            fourcc,
            width: 4,
            height,
            pitch,
            chroma_offset: pitch * height as usize,
        }
    }

    #[test]
    fn rgb888_is_bgr_in_memory() {
        let l = layout(Fourcc::RGB888, 12, 1);
        let bytes = [255, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(load(&bytes, &l, 0, 0), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn nv12_addresses_shared_chroma() {
        let l = layout(Fourcc::NV12, 4, 2);
        let mut bytes = vec![0u8; 12];
        store(&mut bytes, &l, 3, 1, [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(bytes[4 + 3], 255);
        assert_eq!(bytes[8 + 2], 128);
        assert_eq!(bytes[8 + 3], 64);
        let [_, u, v, a] = load(&bytes, &l, 2, 0);
        assert_eq!((to_unorm8(u), to_unorm8(v), a), (128, 64, 1.0));
    }

    #[test]
    fn load_store_preserves_bytes() {
        for (fourcc, bpp) in [
            (Fourcc::ABGR8888, 4),
            (Fourcc::BGR888, 3),
            (Fourcc::RGB888, 3),
            (Fourcc::RGBA5551, 2),
            (Fourcc::YUYV, 2),
        ] {
            let l = layout(fourcc, 4 * bpp, 1);
            let bytes: Vec<u8> = (0..4 * bpp as u8).map(|b| b.wrapping_mul(37)).collect();
            let mut out = bytes.clone();
            for x in 0..4 {
                let v = load(&bytes, &l, x, 0);
                store(&mut out, &l, x, 0, v);
            }
            assert_eq!(out, bytes, "{fourcc}");
        }
    }
}
