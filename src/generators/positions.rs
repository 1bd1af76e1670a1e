//! Seeded particle cloud generators.
//!
//! All generators take an explicit seed and are deterministic, so runs and
//! tests reproduce exactly.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::simulation::Particle;

fn finish(positions: Vec<Vec3>) -> Vec<Particle> {
    positions
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let mut particle = Particle::new(p.x, p.y, p.z, i as u32);
            particle.tint = (i as u32).wrapping_mul(0x9e37_79b9);
            particle
        })
        .collect()
}

/// Uniform cloud inside a ball of the given radius.
pub fn ball_cloud(n: usize, radius: f32, seed: u64) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let positions = (0..n)
        .map(|_| {
            // Rejection sample the unit ball; ~52% acceptance.
            loop {
                let v = Vec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                );
                if v.length_squared() <= 1.0 {
                    break v * radius;
                }
            }
        })
        .collect();
    finish(positions)
}

/// Cloud on a spherical shell of the given radius.
pub fn shell_cloud(n: usize, radius: f32, seed: u64) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let positions = (0..n)
        .map(|_| {
            let z: f32 = rng.random_range(-1.0..1.0);
            let theta: f32 = rng.random_range(0.0..std::f32::consts::TAU);
            let r = (1.0 - z * z).max(0.0).sqrt();
            Vec3::new(r * theta.cos(), r * theta.sin(), z) * radius
        })
        .collect();
    finish(positions)
}

/// Gaussian cloud with the given standard deviation per axis.
pub fn gaussian_cloud(n: usize, sigma: f32, seed: u64) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut normal = || {
        // Box-Muller from two uniforms.
        let u1: f32 = rng.random_range(f32::EPSILON..1.0);
        let u2: f32 = rng.random_range(0.0..std::f32::consts::TAU);
        (-2.0 * u1.ln()).sqrt() * u2.cos()
    };
    let positions = (0..n)
        .map(|_| Vec3::new(normal(), normal(), normal()) * sigma)
        .collect();
    finish(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_cloud_properties() {
        let particles = ball_cloud(200, 2.0, 9);
        assert_eq!(particles.len(), 200);
        for (i, p) in particles.iter().enumerate() {
            assert_eq!(p.pid, i as u32);
            assert!(p.position().length() <= 2.0 + 1e-5);
            assert_eq!(p.speed(), 0.0);
        }
    }

    #[test]
    fn test_shell_cloud_radius() {
        for p in shell_cloud(100, 3.0, 10) {
            assert!((p.position().length() - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_generators_are_deterministic() {
        let a = ball_cloud(50, 1.0, 123);
        let b = ball_cloud(50, 1.0, 123);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.position(), y.position());
        }
        let c = ball_cloud(50, 1.0, 124);
        assert!(a.iter().zip(&c).any(|(x, y)| x.position() != y.position()));
    }

    #[test]
    fn test_gaussian_cloud_is_centred() {
        let particles = gaussian_cloud(2000, 1.0, 77);
        let mean: glam::Vec3 = particles.iter().map(|p| p.position()).sum::<glam::Vec3>()
            / particles.len() as f32;
        assert!(mean.length() < 0.15);
    }
}
