//! Layout engine configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Sort span size. Each bitonic sort chunk covers this many particle slots;
/// the GPU encoder keeps the whole chunk in registers, so the value is
/// compile-time fixed.
pub const SPAN_SIZE: u32 = 128;

/// Configuration for the force-directed layout simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Integration time step in seconds.
    #[serde(default = "default_dt")]
    pub dt: f32,

    /// Gravitational constant for the near-field term.
    /// Negative values repel, which is what a layout usually wants.
    #[serde(default = "default_gravity")]
    pub gravity: f32,

    /// Spring constant for graph edges.
    #[serde(default = "default_spring_k")]
    pub spring_k: f32,

    /// Softening added to squared distance in the gravity denominator.
    #[serde(default = "default_eps")]
    pub eps: f32,

    /// Velocity damping factor applied each step (0.0 - 1.0).
    #[serde(default = "default_damping")]
    pub damping: f32,

    /// Half-width of the near-field gravity window in sorted slot space.
    /// Each particle interacts with slots `[i - w, i + w]`.
    #[serde(default = "default_gravity_window")]
    pub gravity_window: u32,

    /// Side of the Hilbert grid used for SFC keys. Must be a power of two.
    #[serde(default = "default_sfc_resolution")]
    pub sfc_resolution: u32,

    /// Sort span size. Pinned to [`SPAN_SIZE`]; kept in the config so
    /// presets record it explicitly.
    #[serde(default = "default_span_size")]
    pub span_size: u32,

    /// Edge coarse-map stride: one owner sample every this many edges.
    #[serde(default = "default_coarse_stride")]
    pub coarse_stride: u32,

    /// Strength of the optional radial pull toward the unit-sphere region.
    /// Zero disables the term.
    #[serde(default)]
    pub boundary_strength: f32,
}

fn default_dt() -> f32 {
    0.016
}
fn default_gravity() -> f32 {
    -0.0001
}
fn default_spring_k() -> f32 {
    1.0
}
fn default_eps() -> f32 {
    0.1
}
fn default_damping() -> f32 {
    0.002
}
fn default_gravity_window() -> u32 {
    16
}
fn default_sfc_resolution() -> u32 {
    64
}
fn default_span_size() -> u32 {
    SPAN_SIZE
}
fn default_coarse_stride() -> u32 {
    128
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            gravity: default_gravity(),
            spring_k: default_spring_k(),
            eps: default_eps(),
            damping: default_damping(),
            gravity_window: default_gravity_window(),
            sfc_resolution: default_sfc_resolution(),
            span_size: default_span_size(),
            coarse_stride: default_coarse_stride(),
            boundary_strength: 0.0,
        }
    }
}

impl LayoutConfig {
    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.dt.is_finite() || self.dt < 0.0 {
            return Err("dt must be finite and non-negative".to_string());
        }
        if !self.gravity.is_finite() {
            return Err("gravity must be finite".to_string());
        }
        if !self.spring_k.is_finite() {
            return Err("spring_k must be finite".to_string());
        }
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err("eps must be finite and non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err("damping must be between 0.0 and 1.0".to_string());
        }
        if self.sfc_resolution < 2 || !self.sfc_resolution.is_power_of_two() {
            return Err("sfc_resolution must be a power of two >= 2".to_string());
        }
        if self.sfc_resolution > 4096 {
            return Err("sfc_resolution above 4096 loses key precision in f32".to_string());
        }
        if self.span_size != SPAN_SIZE {
            return Err(format!("span_size must be {SPAN_SIZE}"));
        }
        if self.coarse_stride == 0 || self.coarse_stride > 256 {
            return Err("coarse_stride must be between 1 and 256".to_string());
        }
        if self.boundary_strength < 0.0 || !self.boundary_strength.is_finite() {
            return Err("boundary_strength must be finite and non-negative".to_string());
        }
        Ok(())
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut c = LayoutConfig::default();
        c.damping = 1.5;
        assert!(c.validate().is_err());

        let mut c = LayoutConfig::default();
        c.sfc_resolution = 48; // not a power of two
        assert!(c.validate().is_err());

        let mut c = LayoutConfig::default();
        c.span_size = 64;
        assert!(c.validate().is_err());

        let mut c = LayoutConfig::default();
        c.coarse_stride = 512; // exceeds the relocation walk bound
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = LayoutConfig {
            gravity: -0.5,
            gravity_window: 8,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: LayoutConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.gravity, -0.5);
        assert_eq!(back.gravity_window, 8);
        assert_eq!(back.span_size, SPAN_SIZE);
    }
}
