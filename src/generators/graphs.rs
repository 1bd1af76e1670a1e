//! Seeded graph topology generators.
//!
//! All generators emit symmetric CSR stores: every undirected edge appears
//! in both endpoints' adjacency lists so springs act on both ends.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::simulation::CsrGraph;

/// A simple ring: particle `i` connects to `i + 1` modulo `n`.
pub fn ring_graph(n: usize) -> CsrGraph {
    if n < 2 {
        return CsrGraph::empty(n);
    }
    let edges: Vec<(u32, u32)> = (0..n)
        .map(|i| (i as u32, ((i + 1) % n) as u32))
        .collect();
    CsrGraph::from_edges(n, &edges, true)
}

/// `m` undirected edges between uniformly random distinct endpoints.
/// Parallel edges are allowed; self loops are not.
pub fn random_graph(n: usize, m: usize, seed: u64) -> CsrGraph {
    if n < 2 {
        return CsrGraph::empty(n);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let edges: Vec<(u32, u32)> = (0..m)
        .map(|_| {
            let a = rng.random_range(0..n as u32);
            let b = loop {
                let b = rng.random_range(0..n as u32);
                if b != a {
                    break b;
                }
            };
            (a, b)
        })
        .collect();
    CsrGraph::from_edges(n, &edges, true)
}

/// Preferential attachment: each new particle links to `links` earlier
/// ones, biased toward well-connected targets. Produces the hub-and-spoke
/// shape typical of real graph datasets.
pub fn preferential_graph(n: usize, links: usize, seed: u64) -> CsrGraph {
    if n < 2 {
        return CsrGraph::empty(n);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut edges: Vec<(u32, u32)> = Vec::new();
    // Endpoint pool: every edge endpoint appears once, so sampling the
    // pool is degree-proportional.
    let mut pool: Vec<u32> = vec![0];
    for i in 1..n as u32 {
        for _ in 0..links.min(i as usize) {
            let t = pool[rng.random_range(0..pool.len())];
            if t == i {
                continue;
            }
            edges.push((i, t));
            pool.push(t);
        }
        pool.push(i);
    }
    CsrGraph::from_edges(n, &edges, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_graph_degrees() {
        let g = ring_graph(8);
        assert!(g.validate().is_ok());
        for i in 0..8 {
            assert_eq!(g.degree(i), 2);
        }
        assert_eq!(g.num_edges(), 16);
    }

    #[test]
    fn test_random_graph_shape() {
        let g = random_graph(50, 120, 5);
        assert!(g.validate().is_ok());
        assert_eq!(g.num_edges(), 240);
        // No self loops.
        for p in 0..50 {
            for &t in g.edges_of(p) {
                assert_ne!(t as usize, p);
            }
        }
    }

    #[test]
    fn test_preferential_graph_has_hubs() {
        let g = preferential_graph(300, 2, 6);
        assert!(g.validate().is_ok());
        let max_degree = (0..300).map(|p| g.degree(p)).max().unwrap();
        assert!(max_degree > 6, "expected a hub, max degree {max_degree}");
    }

    #[test]
    fn test_degenerate_sizes() {
        assert_eq!(ring_graph(1).num_edges(), 0);
        assert_eq!(random_graph(0, 10, 1).num_edges(), 0);
        assert_eq!(preferential_graph(1, 3, 1).num_edges(), 0);
    }
}
