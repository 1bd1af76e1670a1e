//! GPU layout engine built on wgpu compute pipelines.
//!
//! # Submodules
//!
//! - [`context`]: headless wgpu instance/adapter/device management
//! - [`buffers`]: storage buffers, uniforms, and readback
//! - [`pipelines`]: the per-stage compute pipelines
//! - [`orchestrator`]: the engine struct that runs one tick

mod buffers;
mod context;
mod orchestrator;
mod pipelines;

pub use buffers::{CsrBuffers, ParticleBuffers, SortBuffers, TickParamsUniform};
pub use context::GpuContext;
pub use orchestrator::GpuLayoutEngine;

use thiserror::Error;

/// Fatal construction-time errors.
///
/// There is no per-tick error type: once built, a tick either completes or
/// the device's uncaptured-error hook aborts the process, because every
/// tick mutates persistent state and cannot be retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration, particle set, or graph.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// No usable GPU adapter.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    /// Device acquisition failed.
    #[error("failed to acquire GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
