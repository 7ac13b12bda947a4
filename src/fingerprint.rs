//! Circular (ECFP-style) fingerprints used to key the result cache.

use crate::{MolecularGraph, RingInfo};

pub const FINGERPRINT_RADIUS: usize = 6;
pub const FINGERPRINT_BITS: usize = 1024;

/// A fixed-size bit vector fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bits: Vec<u64>,
    nbits: usize,
}

impl Fingerprint {
    /// Create an empty fingerprint of `nbits` bits (storage rounded up to a
    /// multiple of 64). There is no zero-bit fingerprint.
    pub fn new(nbits: usize) -> Option<Self> {
        if nbits == 0 {
            return None;
        }
        Some(Fingerprint {
            bits: vec![0u64; nbits.div_ceil(64)],
            nbits,
        })
    }

    pub fn set_bit(&mut self, pos: usize) {
        let pos = pos % self.nbits;
        self.bits[pos / 64] |= 1u64 << (pos % 64);
    }

    pub fn get_bit(&self, pos: usize) -> bool {
        let pos = pos % self.nbits;
        (self.bits[pos / 64] >> (pos % 64)) & 1 == 1
    }

    pub fn count_ones(&self) -> u32 {
        self.bits.iter().map(|word| word.count_ones()).sum()
    }

    pub fn nbits(&self) -> usize {
        self.nbits
    }

    /// Positions of the set bits in ascending order.
    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nbits).filter(|&pos| self.get_bit(pos))
    }
}

/// Circular fingerprint of `graph`: every atom environment up to `radius`
/// bonds is hashed and folded into `nbits` bits. Atom invariants include
/// tetrahedral parity, so stereoisomers differ. The result does not depend on
/// atom order. `None` when `nbits` is zero.
pub fn circular_fingerprint(
    graph: &MolecularGraph,
    radius: usize,
    nbits: usize,
) -> Option<Fingerprint> {
    Fingerprint::new(nbits).map(|fp| fill_fingerprint(fp, graph, radius))
}

fn fill_fingerprint(mut fp: Fingerprint, graph: &MolecularGraph, radius: usize) -> Fingerprint {
    let nbits = fp.nbits;
    let n = graph.atom_count();
    if n == 0 {
        return fp;
    }
    let rings = RingInfo::perceive(graph);

    let mut identifiers: Vec<u64> = (0..n)
        .map(|i| {
            let atom = graph.atom(i);
            let mut h = fnv1a_init();
            h = fnv1a_update(h, atom.element.atomic_number() as u64);
            h = fnv1a_update(h, graph.degree(i) as u64);
            h = fnv1a_update(h, atom.hydrogens as u64);
            h = fnv1a_update(h, atom.charge as u64);
            h = fnv1a_update(h, rings.is_ring_atom(i) as u64);
            h = fnv1a_update(h, atom.aromatic as u64);
            h = fnv1a_update(h, atom.chirality.map_or(0, |c| c as u64 + 1));
            h
        })
        .collect();

    for &id in &identifiers {
        fp.set_bit(fold_hash(id, nbits));
    }

    for _ in 0..radius {
        let next: Vec<u64> = (0..n)
            .map(|i| {
                let mut h = fnv1a_update(fnv1a_init(), identifiers[i]);
                // Sorted neighbour identifiers keep the hash order-independent.
                let mut neighbor_ids: Vec<(u64, u32)> = graph
                    .bonded(i)
                    .map(|(other, order)| (identifiers[other], order.half_units()))
                    .collect();
                neighbor_ids.sort_unstable();
                for (id, order) in neighbor_ids {
                    h = fnv1a_update(h, id);
                    h = fnv1a_update(h, order as u64);
                }
                h
            })
            .collect();
        for &id in &next {
            fp.set_bit(fold_hash(id, nbits));
        }
        identifiers = next;
    }
    fp
}

/// The cache-key fingerprint: radius 6, 1024 bits.
pub fn key_fingerprint(graph: &MolecularGraph) -> Fingerprint {
    let fp = Fingerprint {
        bits: vec![0u64; FINGERPRINT_BITS.div_ceil(64)],
        nbits: FINGERPRINT_BITS,
    };
    fill_fingerprint(fp, graph, FINGERPRINT_RADIUS)
}

// FNV-1a keeps fingerprints stable across processes and platforms.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a_init() -> u64 {
    FNV_OFFSET
}

fn fnv1a_update(hash: u64, value: u64) -> u64 {
    let mut h = hash;
    for b in value.to_le_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

fn fold_hash(hash: u64, nbits: usize) -> usize {
    (hash % nbits as u64) as usize
}
