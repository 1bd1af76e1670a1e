//! Chunked bitonic sort of particle slots by SFC key.
//!
//! Particles are partitioned into spans of 128 contiguous slots at a
//! rolling offset that alternates between 0 and 64 across ticks; each span
//! is sorted independently and the resulting permutation (the "sort
//! atlas") drives the reshuffle, CSR prefix-sum, and edge relocation
//! stages. Staggering the span boundaries mixes particles across seams on
//! successive ticks.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::config::SPAN_SIZE;
use crate::utils::chunk_count;

/// Rolling sort offset for a given pass counter: 0 on even passes, half a
/// span on odd ones.
#[inline]
pub fn sort_offset_for_pass(pass: u64, span: u32) -> u32 {
    (pass % 2) as u32 * (span / 2)
}

/// A chunked permutation over particle slots.
///
/// Entry `chunk * 128 + local` holds the local index (within the chunk) of
/// the slot that sorts into position `local`. Slots before the rolling
/// offset or past the last chunk map to themselves.
#[derive(Debug, Clone)]
pub struct SortAtlas {
    perm: Vec<u32>,
    offset: u32,
    chunks: u32,
}

impl SortAtlas {
    /// Sort every span of `keys` and record the permutation.
    ///
    /// Slots past the end of `keys` enter the network with a `+inf`
    /// sentinel key so they sink to the back of their chunk; ties break by
    /// original local index, making the order total and the result
    /// identical to a stable ascending sort.
    pub fn build(keys: &[f32], offset: u32) -> Self {
        let n = keys.len() as u32;
        let span = SPAN_SIZE;
        let chunks = chunk_count(n, offset, span);
        let mut perm = vec![0u32; (chunks * span) as usize];

        perm.par_chunks_mut(span as usize)
            .enumerate()
            .for_each(|(k, chunk_perm)| {
                let base = k as u32 * span + offset;
                let mut pairs: Vec<(f32, u32)> = (0..span)
                    .map(|l| {
                        let g = base + l;
                        let key = if g < n { keys[g as usize] } else { f32::INFINITY };
                        (key, l)
                    })
                    .collect();
                pairs.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(Ordering::Equal)
                        .then(a.1.cmp(&b.1))
                });
                for (l, &(_, src)) in pairs.iter().enumerate() {
                    chunk_perm[l] = src;
                }
            });

        Self {
            perm,
            offset,
            chunks,
        }
    }

    /// The rolling offset this atlas was built with.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of chunks in the sorted region.
    #[inline]
    pub fn chunks(&self) -> u32 {
        self.chunks
    }

    /// Raw permutation entries, `chunks() * 128` of them.
    #[inline]
    pub fn perm(&self) -> &[u32] {
        &self.perm
    }

    /// Source slot that feeds destination slot `i` during the reshuffle.
    ///
    /// Identity for slots outside the sorted region.
    #[inline]
    pub fn source(&self, i: u32) -> u32 {
        if i < self.offset {
            return i;
        }
        let rel = i - self.offset;
        let chunk = rel / SPAN_SIZE;
        if chunk >= self.chunks {
            return i;
        }
        chunk * SPAN_SIZE + self.offset + self.perm[rel as usize]
    }
}
