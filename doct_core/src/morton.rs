//! Morton (Z-order) keys for octree nodes.
//!
//! A node at depth `d` is identified by the interleaved bits of its integer
//! cell coordinates in `[0, 2^d)`. The parent of key `k` is `k >> 3` and its
//! children are `(k << 3) | c` for `c` in `0..8`, so sorting keys at one
//! depth groups siblings together.

use crate::types::Point3;

/// Maximum octree depth representable by a 63-bit Morton key (21 bits per axis).
pub const MAX_DEPTH: u32 = 21;

/// Deepest fully subdivided level. Level `d` holds `8^d` dense nodes.
pub const MAX_FULL_DEPTH: u32 = 8;

/// Spread bits of a 21-bit value with 2-bit gaps for 3D Morton encoding.
///
/// Input:  ....... ....... ...xxxxx xxxxxxxx xxxxxxxx (21 bits)
/// Output: ..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x..x (63 bits)
#[inline]
pub fn spread_bits_3d(x: u32) -> u64 {
    let mut x = (x & 0x1FFFFF) as u64;
    x = (x | (x << 32)) & 0x1F00000000FFFF;
    x = (x | (x << 16)) & 0x1F0000FF0000FF;
    x = (x | (x << 8)) & 0x100F00F00F00F00F;
    x = (x | (x << 4)) & 0x10C30C30C30C30C3;
    x = (x | (x << 2)) & 0x1249249249249249;
    x
}

/// Inverse of [`spread_bits_3d`].
#[inline]
pub fn compact_bits_3d(mut x: u64) -> u32 {
    x &= 0x1249249249249249;
    x = (x | (x >> 2)) & 0x10C30C30C30C30C3;
    x = (x | (x >> 4)) & 0x100F00F00F00F00F;
    x = (x | (x >> 8)) & 0x1F0000FF0000FF;
    x = (x | (x >> 16)) & 0x1F00000000FFFF;
    x = (x | (x >> 32)) & 0x1FFFFF;
    x as u32
}

/// Morton encode three unsigned 21-bit coordinates into a 63-bit key.
///
/// Bits are interleaved as `z2y2x2 z1y1x1 z0y0x0`, so the child index
/// `key & 7` is `x | y << 1 | z << 2` of the lowest level.
#[inline]
pub fn morton_encode_3d(x: u32, y: u32, z: u32) -> u64 {
    spread_bits_3d(x) | (spread_bits_3d(y) << 1) | (spread_bits_3d(z) << 2)
}

/// Morton decode a 63-bit key into three unsigned coordinates.
#[inline]
pub fn morton_decode_3d(key: u64) -> (u32, u32, u32) {
    (
        compact_bits_3d(key),
        compact_bits_3d(key >> 1),
        compact_bits_3d(key >> 2),
    )
}

/// Integer cell coordinates of a point in the cube `[-1, 1]^3` at `depth`.
///
/// Computes `floor((p + 1) / 2 * 2^depth)` per axis and clamps to
/// `[0, 2^depth - 1]`, so points on the upper boundary land in the last cell.
#[inline]
pub fn cell_coords(point: Point3, depth: u32) -> (u32, u32, u32) {
    let res = (1u64 << depth) as f32;
    let max = (1u64 << depth) as u32 - 1;
    let axis = |v: f32| -> u32 {
        let c = ((v + 1.0) * 0.5 * res).floor();
        if c.is_nan() || c <= 0.0 {
            0
        } else if c >= max as f32 {
            max
        } else {
            c as u32
        }
    };
    (axis(point.x), axis(point.y), axis(point.z))
}

/// Morton key of the cell containing `point` at `depth`.
#[inline]
pub fn point_key(point: Point3, depth: u32) -> u64 {
    let (x, y, z) = cell_coords(point, depth);
    morton_encode_3d(x, y, z)
}

/// Key of the ancestor `levels` levels above `key`.
#[inline]
pub fn ancestor_key(key: u64, levels: u32) -> u64 {
    key >> (3 * levels)
}

/// Center of the cell with `key` at `depth`, in `[-1, 1]^3`.
#[inline]
pub fn cell_center(key: u64, depth: u32) -> Point3 {
    let (x, y, z) = morton_decode_3d(key);
    let size = 2.0 / (1u64 << depth) as f32;
    Point3::new(
        -1.0 + (x as f32 + 0.5) * size,
        -1.0 + (y as f32 + 0.5) * size,
        -1.0 + (z as f32 + 0.5) * size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_compact_roundtrip() {
        for x in [0, 1, 100, 1000, 0x1FFFFF] {
            let spread = spread_bits_3d(x);
            let back = compact_bits_3d(spread);
            assert_eq!(back, x & 0x1FFFFF, "Roundtrip failed for {}", x);
        }
    }

    #[test]
    fn test_morton_encode_decode() {
        let cases = [(0, 0, 0), (1, 0, 0), (0, 1, 0), (0, 0, 1), (5, 3, 7)];
        for (x, y, z) in cases {
            assert_eq!(morton_decode_3d(morton_encode_3d(x, y, z)), (x, y, z));
        }
    }

    #[test]
    fn test_child_index_bits() {
        assert_eq!(morton_encode_3d(1, 0, 0), 1);
        assert_eq!(morton_encode_3d(0, 1, 0), 2);
        assert_eq!(morton_encode_3d(0, 0, 1), 4);
        assert_eq!(morton_encode_3d(1, 1, 1), 7);
    }

    #[test]
    fn test_cell_coords_boundaries() {
        assert_eq!(cell_coords(Point3::splat(-1.0), 3), (0, 0, 0));
        // Upper boundary is clamped into the last cell
        assert_eq!(cell_coords(Point3::splat(1.0), 3), (7, 7, 7));
        assert_eq!(cell_coords(Point3::new(0.0, -0.01, 0.99), 1), (1, 0, 1));
        // Out-of-cube coordinates clamp as well
        assert_eq!(cell_coords(Point3::new(-5.0, 5.0, 0.0), 2), (0, 3, 2));
    }

    #[test]
    fn test_ancestor_matches_coarser_key() {
        let p = Point3::new(0.3, -0.7, 0.1);
        let fine = point_key(p, 6);
        for d in 0..=6 {
            assert_eq!(ancestor_key(fine, 6 - d), point_key(p, d));
        }
    }

    #[test]
    fn test_cell_center_contains_point() {
        let p = Point3::new(0.3, -0.7, 0.1);
        let depth = 4;
        let center = cell_center(point_key(p, depth), depth);
        let half = 1.0 / (1u32 << depth) as f32;
        assert!((center - p).max_abs() <= half + 1e-6);
    }
}
