//! Space-filling-curve keys.
//!
//! Positions are projected to the unit square with an octahedral
//! (butterfly) map and then run through a hierarchical Hilbert curve. The
//! resulting scalar is an ascending-compare locality proxy: particles that
//! sort next to each other by key are spatially close, which is what lets
//! the integrator treat slot distance as spatial distance.

use glam::{Vec2, Vec3};

/// Branchless sign with `sgn(0) = 1`, matching the WGSL side.
#[inline]
fn sgn(v: f32) -> f32 {
    if v >= 0.0 { 1.0 } else { -1.0 }
}

/// Octahedral projection of a 3D point onto `[0, 1]^2`.
///
/// The point is L1-normalized onto the octahedron and the lower hemisphere
/// is folded out into the square's corners. Radius is discarded; the key
/// orders particles by direction, which is sufficient for a layout that
/// keeps its mass near the origin.
#[inline]
pub fn octahedral_project(p: Vec3) -> Vec2 {
    let n = p.x.abs() + p.y.abs() + p.z.abs();
    if n < 1e-12 {
        return Vec2::new(0.5, 0.5);
    }
    let mut u = Vec2::new(p.x / n, p.y / n);
    if p.z < 0.0 {
        u = Vec2::new(
            (1.0 - u.y.abs()) * sgn(u.x),
            (1.0 - u.x.abs()) * sgn(u.y),
        );
    }
    (u + Vec2::ONE) * 0.5
}

/// Hilbert curve index of cell `(x, y)` on a `side x side` grid.
///
/// `side` must be a power of two. Classic iterative form: accumulate the
/// quadrant digit, then rotate the coordinates into the quadrant's
/// canonical orientation.
pub fn hilbert_index(x: u32, y: u32, side: u32) -> u32 {
    debug_assert!(side.is_power_of_two());
    let mut x = x;
    let mut y = y;
    let mut d = 0u32;
    let mut s = side / 2;
    while s > 0 {
        let rx = u32::from(x & s != 0);
        let ry = u32::from(y & s != 0);
        d += s * s * ((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                x = side - 1 - x;
                y = side - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}

/// SFC sort key for a position, in `[0, 1)`.
pub fn sfc_key(p: Vec3, side: u32) -> f32 {
    let u = octahedral_project(p);
    let max_cell = side - 1;
    let xi = ((u.x * side as f32) as u32).min(max_cell);
    let yi = ((u.y * side as f32) as u32).min(max_cell);
    hilbert_index(xi, yi, side) as f32 / (side * side) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hilbert_side_2() {
        assert_eq!(hilbert_index(0, 0, 2), 0);
        assert_eq!(hilbert_index(0, 1, 2), 1);
        assert_eq!(hilbert_index(1, 1, 2), 2);
        assert_eq!(hilbert_index(1, 0, 2), 3);
    }

    #[test]
    fn test_hilbert_side_4_full_table() {
        let expected = [
            ((0, 0), 0),
            ((1, 0), 1),
            ((1, 1), 2),
            ((0, 1), 3),
            ((0, 2), 4),
            ((0, 3), 5),
            ((1, 3), 6),
            ((1, 2), 7),
            ((2, 2), 8),
            ((2, 3), 9),
            ((3, 3), 10),
            ((3, 2), 11),
            ((3, 1), 12),
            ((2, 1), 13),
            ((2, 0), 14),
            ((3, 0), 15),
        ];
        for ((x, y), d) in expected {
            assert_eq!(hilbert_index(x, y, 4), d, "cell ({x}, {y})");
        }
    }

    #[test]
    fn test_hilbert_is_a_path() {
        // Consecutive indices must be grid neighbours (Manhattan distance 1).
        let side = 8u32;
        let mut cells = vec![(0u32, 0u32); (side * side) as usize];
        for x in 0..side {
            for y in 0..side {
                cells[hilbert_index(x, y, side) as usize] = (x, y);
            }
        }
        for w in cells.windows(2) {
            let dx = w[0].0.abs_diff(w[1].0);
            let dy = w[0].1.abs_diff(w[1].1);
            assert_eq!(dx + dy, 1, "jump between {:?} and {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn test_key_range() {
        let side = 64;
        for p in [
            Vec3::ZERO,
            Vec3::X,
            Vec3::NEG_Y,
            Vec3::new(0.3, -0.7, 0.2),
            Vec3::new(-5.0, 2.0, -1.0),
        ] {
            let k = sfc_key(p, side);
            assert!((0.0..1.0).contains(&k), "key {k} for {p:?}");
        }
    }

    #[test]
    fn test_key_is_deterministic_and_directional() {
        let side = 64;
        let p = Vec3::new(0.25, 0.5, -0.125);
        assert_eq!(sfc_key(p, side), sfc_key(p, side));
        // Radius is discarded, only direction matters.
        assert_eq!(sfc_key(p, side), sfc_key(p * 3.0, side));
        // Opposite octants land on different keys.
        assert_ne!(sfc_key(Vec3::X, side), sfc_key(Vec3::NEG_X, side));
    }

    #[test]
    fn test_octahedral_stays_in_unit_square() {
        for p in [
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 0.5, -0.25),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 1.0, 0.0),
        ] {
            let u = octahedral_project(p);
            assert!((0.0..=1.0).contains(&u.x));
            assert!((0.0..=1.0).contains(&u.y));
        }
    }
}
