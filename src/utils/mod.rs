//! Shared utility functions.

pub mod math;

pub use math::{ceil_log2, chunk_count, coarse_len};
