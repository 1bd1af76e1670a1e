//! Physics integrator for the layout simulation.
//!
//! One semi-implicit Euler step per particle: near-field gravity over a
//! window of sorted slots, spring forces along graph edges, and an
//! optional radial boundary pull. The slot window stands in for spatial
//! neighbourhood because particles were SFC-sorted on the previous tick.

use glam::Vec3;
use rayon::prelude::*;

use super::graph::{CsrGraph, EMPTY};
use super::particle::{ParticleIdMass, ParticlePosKey, ParticleVel};
use super::sfc::sfc_key;
use crate::config::LayoutConfig;

/// Acceleration on the particle at slot `i`.
fn accumulate_forces(
    i: usize,
    pos: &[ParticlePosKey],
    idm: &[ParticleIdMass],
    graph: &CsrGraph,
    config: &LayoutConfig,
) -> Vec3 {
    let n = pos.len() as i64;
    let p = pos[i].position();
    let mut acc = Vec3::ZERO;

    // Near-field gravity over the slot window, self skipped, ends clamped
    // rather than wrapped.
    let w = config.gravity_window as i64;
    let ii = i as i64;
    let lo = (ii - w).max(0);
    let hi = (ii + w).min(n - 1);
    for j in lo..=hi {
        if j == ii {
            continue;
        }
        let j = j as usize;
        let d = pos[j].position() - p;
        let r2 = d.length_squared() + config.eps;
        acc += config.gravity * idm[j].mass * d / (r2 * r2.sqrt());
    }

    // Springs along this slot's edges; sentinel holes are skipped.
    for &t in graph.edges_of(i) {
        if t == EMPTY {
            continue;
        }
        acc += config.spring_k * (pos[t as usize].position() - p);
    }

    // Optional pull back toward the unit-sphere region.
    if config.boundary_strength > 0.0 {
        let r = p.length();
        if r > 1e-12 {
            acc -= p / r * (r - 1.2).clamp(0.0, 1.0) * config.boundary_strength;
        }
    }

    acc
}

/// Integrate one step, reading `pos`/`vel`/`idm` and writing the scratch
/// arrays. The id/mass array is an identity copy; positions get a fresh
/// SFC key.
///
/// A zero `dt` passes all state through untouched so that a zero-step tick
/// still reshuffles and relocates without perturbing the physics.
#[allow(clippy::too_many_arguments)]
pub fn integrate_particles(
    pos: &[ParticlePosKey],
    vel: &[ParticleVel],
    idm: &[ParticleIdMass],
    graph: &CsrGraph,
    out_pos: &mut [ParticlePosKey],
    out_vel: &mut [ParticleVel],
    out_idm: &mut [ParticleIdMass],
    config: &LayoutConfig,
) {
    if config.dt == 0.0 {
        out_pos.copy_from_slice(pos);
        out_vel.copy_from_slice(vel);
        out_idm.copy_from_slice(idm);
        return;
    }

    let side = config.sfc_resolution;
    out_pos
        .par_iter_mut()
        .zip(out_vel.par_iter_mut())
        .zip(out_idm.par_iter_mut())
        .enumerate()
        .for_each(|(i, ((op, ov), oi))| {
            let acc = accumulate_forces(i, pos, idm, graph, config);

            let v = (vel[i].velocity() + acc * config.dt) * (1.0 - config.damping);
            let np = pos[i].position() + v * config.dt;

            *op = ParticlePosKey {
                x: np.x,
                y: np.y,
                z: np.z,
                key: sfc_key(np, side),
            };
            *ov = ParticleVel {
                vx: v.x,
                vy: v.y,
                vz: v.z,
                _pad: 0.0,
            };
            *oi = idm[i];
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Particle;

    fn split(particles: &[Particle]) -> (Vec<ParticlePosKey>, Vec<ParticleVel>, Vec<ParticleIdMass>) {
        (
            particles.iter().map(ParticlePosKey::from).collect(),
            particles.iter().map(ParticleVel::from).collect(),
            particles.iter().map(ParticleIdMass::from).collect(),
        )
    }

    fn step(
        particles: &[Particle],
        graph: &CsrGraph,
        config: &LayoutConfig,
    ) -> (Vec<ParticlePosKey>, Vec<ParticleVel>) {
        let (pos, vel, idm) = split(particles);
        let mut op = pos.clone();
        let mut ov = vel.clone();
        let mut oi = idm.clone();
        integrate_particles(&pos, &vel, &idm, graph, &mut op, &mut ov, &mut oi, config);
        (op, ov)
    }

    #[test]
    fn test_two_body_repulsion_magnitude() {
        // Two unit masses one unit apart on the x axis, repulsive gravity.
        // |acc| = |G| / (1 + eps)^(3/2), directed away from the neighbour.
        let particles = vec![Particle::new(0.0, 0.0, 0.0, 0), Particle::new(1.0, 0.0, 0.0, 1)];
        let config = LayoutConfig {
            gravity: -1.0,
            spring_k: 0.0,
            eps: 0.1,
            damping: 0.002,
            dt: 0.1,
            ..Default::default()
        };
        let graph = CsrGraph::empty(2);
        let (_, vel) = step(&particles, &graph, &config);

        let expected = 1.0 / 1.1f32.powf(1.5) * 0.1 * (1.0 - 0.002);
        assert!((vel[0].vx + expected).abs() < 1e-5, "vx = {}", vel[0].vx);
        assert!((vel[1].vx - expected).abs() < 1e-5);
        assert_eq!(vel[0].vy, 0.0);
        assert_eq!(vel[0].vz, 0.0);
    }

    #[test]
    fn test_spring_attraction_magnitude() {
        // Pure spring, no gravity: acc = k * delta exactly.
        let particles = vec![Particle::new(0.0, 0.0, 0.0, 0), Particle::new(0.0, 2.0, 0.0, 1)];
        let config = LayoutConfig {
            gravity: 0.0,
            spring_k: 1.5,
            damping: 0.002,
            dt: 0.1,
            ..Default::default()
        };
        let graph = CsrGraph::from_edges(2, &[(0, 1)], true);
        let (_, vel) = step(&particles, &graph, &config);

        let expected = 1.5 * 2.0 * 0.1 * (1.0 - 0.002);
        assert!((vel[0].vy - expected).abs() < 1e-5);
        assert!((vel[1].vy + expected).abs() < 1e-5);
    }

    #[test]
    fn test_three_body_signs() {
        // Repulsive triangle with one spring pair: the springed pair is
        // pulled together harder than gravity pushes them apart.
        let particles = vec![
            Particle::new(0.0, 0.0, 0.0, 0),
            Particle::new(1.0, 0.0, 0.0, 1),
            Particle::new(0.0, 1.0, 0.0, 2),
        ];
        let config = LayoutConfig {
            gravity: -1.0,
            spring_k: 2.0,
            eps: 0.1,
            damping: 0.002,
            dt: 0.1,
            ..Default::default()
        };
        let graph = CsrGraph::from_edges(3, &[(0, 2)], true);
        let (_, vel) = step(&particles, &graph, &config);

        // Particle 0: pushed -x by particle 1, pulled +y on balance.
        assert!(vel[0].vx < 0.0);
        assert!(vel[0].vy > 0.0);
        // Particle 1: pushed away from both others, net +x.
        assert!(vel[1].vx > 0.0);
        // Particle 2: the spring beats both repulsion terms, net -y.
        assert!(vel[2].vy < 0.0);
    }

    #[test]
    fn test_sentinel_edges_are_skipped() {
        let particles = vec![Particle::new(0.0, 0.0, 0.0, 0), Particle::new(1.0, 0.0, 0.0, 1)];
        let config = LayoutConfig {
            gravity: 0.0,
            spring_k: 1.0,
            dt: 0.1,
            ..Default::default()
        };
        let mut graph = CsrGraph::from_edges(2, &[(0, 1)], false);
        graph.store[0] = EMPTY;
        let (_, vel) = step(&particles, &graph, &config);
        assert_eq!(vel[0].velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_window_clamps_instead_of_wrapping() {
        // With a window of 1, slot 0 only sees slot 1; slot 2 is beyond
        // the window and the far end must not wrap around.
        let particles = vec![
            Particle::new(0.0, 0.0, 0.0, 0),
            Particle::new(0.0, 0.0, 1.0, 1),
            Particle::new(5.0, 0.0, 0.0, 2),
        ];
        let config = LayoutConfig {
            gravity: -1.0,
            spring_k: 0.0,
            gravity_window: 1,
            dt: 0.1,
            ..Default::default()
        };
        let graph = CsrGraph::empty(3);
        let (_, vel) = step(&particles, &graph, &config);
        // Only the z-axis neighbour acts on slot 0.
        assert_eq!(vel[0].vx, 0.0);
        assert!(vel[0].vz < 0.0);
    }

    #[test]
    fn test_zero_dt_is_identity() {
        let particles = vec![Particle::with_velocity(0.5, -0.25, 1.0, 0.1, 0.2, 0.3, 0)];
        let (pos, vel, idm) = split(&particles);
        let mut op = pos.clone();
        let mut ov = vel.clone();
        let mut oi = idm.clone();
        let config = LayoutConfig {
            dt: 0.0,
            ..Default::default()
        };
        integrate_particles(
            &pos,
            &vel,
            &idm,
            &CsrGraph::empty(1),
            &mut op,
            &mut ov,
            &mut oi,
            &config,
        );
        assert_eq!(op, pos);
        assert_eq!(ov, vel);
        assert_eq!(oi, idm);
    }

    #[test]
    fn test_single_particle_drift() {
        // No neighbours, no edges: velocity only damps, position follows.
        let particles = vec![Particle::with_velocity(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0)];
        let config = LayoutConfig {
            dt: 0.5,
            damping: 0.002,
            ..Default::default()
        };
        let (_, vel) = step(&particles, &CsrGraph::empty(1), &config);
        let (pos, _) = step(&particles, &CsrGraph::empty(1), &config);
        let v = 1.0 * (1.0 - 0.002);
        assert!((vel[0].vx - v).abs() < 1e-6);
        assert!((pos[0].x - v * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_pull_points_inward() {
        let particles = vec![Particle::new(3.0, 0.0, 0.0, 0)];
        let config = LayoutConfig {
            gravity: 0.0,
            spring_k: 0.0,
            boundary_strength: 1.0,
            damping: 0.0,
            dt: 0.1,
            ..Default::default()
        };
        let (_, vel) = step(&particles, &CsrGraph::empty(1), &config);
        // |p| - 1.2 clamps to 1, so acc = -x_hat and v = -dt.
        assert!((vel[0].vx + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_orbit_stability_sun_earth() {
        // One simulated year of a circular-ish Earth orbit in SI units.
        // Semi-implicit Euler is symplectic, so the radius stays within
        // a tenth of a percent and the phase comes back around.
        let sun_mass = 1.989e30f32;
        let r0 = 1.496e11f32;
        let v0 = 29_782.0f32;
        let mut sun = Particle::new(0.0, 0.0, 0.0, 0);
        sun.mass = sun_mass;
        let mut earth = Particle::with_velocity(r0, 0.0, 0.0, 0.0, v0, 0.0, 1);
        earth.mass = 5.972e24;

        let config = LayoutConfig {
            gravity: 6.6743e-11,
            spring_k: 0.0,
            eps: 1000.0,
            damping: 0.0,
            dt: 526.0,
            ..Default::default()
        };
        let graph = CsrGraph::empty(2);

        let (mut pos, mut vel, mut idm) = split(&[sun, earth]);
        let mut op = pos.clone();
        let mut ov = vel.clone();
        let mut oi = idm.clone();
        for _ in 0..60_000 {
            integrate_particles(&pos, &vel, &idm, &graph, &mut op, &mut ov, &mut oi, &config);
            std::mem::swap(&mut pos, &mut op);
            std::mem::swap(&mut vel, &mut ov);
            std::mem::swap(&mut idm, &mut oi);
        }

        let e = pos[1].position();
        let r = e.length();
        assert!((r - r0).abs() / r0 < 1e-3, "radius drifted to {r}");
        let angle = e.y.atan2(e.x);
        assert!(angle.abs() < 0.02, "phase error {angle}");
        assert!(e.z.abs() < 1.0);
    }
}
