//! Particle data structures for the layout simulation.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A single particle in the layout.
///
/// Particles carry a persistent identifier (`pid`) that survives the
/// per-tick re-sorting; the array index a particle currently occupies is
/// its physical slot and changes every tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Particle {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Z position.
    pub z: f32,
    /// X velocity component.
    pub vx: f32,
    /// Y velocity component.
    pub vy: f32,
    /// Z velocity component.
    pub vz: f32,
    /// Particle mass.
    pub mass: f32,
    /// Persistent particle identifier, stable across ticks.
    pub pid: u32,
    /// Display tint, carried through untouched.
    pub tint: u32,
}

impl Particle {
    /// Create a new particle at the given position with zero velocity and
    /// unit mass.
    pub fn new(x: f32, y: f32, z: f32, pid: u32) -> Self {
        Self {
            x,
            y,
            z,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            mass: 1.0,
            pid,
            tint: 0,
        }
    }

    /// Create a new particle with position and velocity.
    #[allow(clippy::too_many_arguments)]
    pub fn with_velocity(x: f32, y: f32, z: f32, vx: f32, vy: f32, vz: f32, pid: u32) -> Self {
        Self {
            x,
            y,
            z,
            vx,
            vy,
            vz,
            mass: 1.0,
            pid,
            tint: 0,
        }
    }

    /// Get position as a glam Vec3.
    #[inline]
    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }

    /// Get velocity as a glam Vec3.
    #[inline]
    pub fn velocity(&self) -> glam::Vec3 {
        glam::Vec3::new(self.vx, self.vy, self.vz)
    }

    /// Get the speed (magnitude of velocity).
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity().length()
    }
}

/// Position plus SFC key (SoA layout).
///
/// Matches WGSL `vec4<f32>`: xyz is the position, w the space-filling-curve
/// key derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ParticlePosKey {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// SFC sort key recomputed by the integrator every tick.
    pub key: f32,
}

impl ParticlePosKey {
    #[inline]
    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }
}

impl From<&Particle> for ParticlePosKey {
    fn from(p: &Particle) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
            key: 0.0,
        }
    }
}

/// Velocity (SoA layout).
///
/// Matches WGSL `vec4<f32>`; vec3 in a storage array would pad to 16 bytes
/// anyway, so the fourth lane is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ParticleVel {
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub _pad: f32,
}

impl ParticleVel {
    #[inline]
    pub fn velocity(&self) -> glam::Vec3 {
        glam::Vec3::new(self.vx, self.vy, self.vz)
    }
}

impl From<&Particle> for ParticleVel {
    fn from(p: &Particle) -> Self {
        Self {
            vx: p.vx,
            vy: p.vy,
            vz: p.vz,
            _pad: 0.0,
        }
    }
}

/// Identity and mass (SoA layout). Size 16, matching the WGSL struct
/// `{ pid: u32, mass: f32, tint: u32, pad: u32 }`.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ParticleIdMass {
    /// Persistent particle identifier.
    pub pid: u32,
    /// Particle mass.
    pub mass: f32,
    /// Display tint.
    pub tint: u32,
    pub _pad: u32,
}

impl From<&Particle> for ParticleIdMass {
    fn from(p: &Particle) -> Self {
        Self {
            pid: p.pid,
            mass: p.mass,
            tint: p.tint,
            _pad: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_creation() {
        let p = Particle::new(1.0, 2.0, 3.0, 7);
        assert_eq!(p.position(), glam::Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.pid, 7);
        assert_eq!(p.mass, 1.0);
        assert_eq!(p.speed(), 0.0);
    }

    #[test]
    fn test_soa_split() {
        let p = Particle::with_velocity(0.0, 0.0, 0.0, 3.0, 0.0, 4.0, 1);
        let vel = ParticleVel::from(&p);
        assert!((vel.velocity().length() - 5.0).abs() < 1e-4);
        let idm = ParticleIdMass::from(&p);
        assert_eq!(idm.pid, 1);
        assert_eq!(idm.mass, 1.0);
    }

    #[test]
    fn test_gpu_layout_sizes() {
        assert_eq!(std::mem::size_of::<ParticlePosKey>(), 16);
        assert_eq!(std::mem::size_of::<ParticleVel>(), 16);
        assert_eq!(std::mem::size_of::<ParticleIdMass>(), 16);
    }
}
