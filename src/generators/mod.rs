//! Procedural generators for initial particle clouds and graph topologies.

pub mod graphs;
pub mod positions;

pub use graphs::{preferential_graph, random_graph, ring_graph};
pub use positions::{ball_cloud, gaussian_cloud, shell_cloud};
