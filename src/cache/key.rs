use std::fmt::{Display, Formatter, Result as FmtResult};

use tracing::*;

use crate::{key_fingerprint, Fingerprint, MatcherFlags, MolecularGraph, RingHints};

/// Everything the reuse key is derived from.
#[derive(Debug, Clone, Copy)]
pub struct KeyInputs<'a> {
    pub query: &'a MolecularGraph,
    pub target: &'a MolecularGraph,
    /// The flag triple actually used for this lookup.
    pub flags: MatcherFlags,
    pub hints: RingHints,
}

/// Deterministic reuse key of one pair. Equal keys mean a stored
/// correspondence can be rebound to the current pair by atom index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(inputs: &KeyInputs) -> Self {
        let query_fp = key_fingerprint(inputs.query);
        let target_fp = key_fingerprint(inputs.target);
        trace!(
            "Fingerprints for {} / {}: {} and {} bits set",
            inputs.query.label(),
            inputs.target.label(),
            query_fp.count_ones(),
            target_fp.count_ones()
        );

        let flags = inputs.flags;
        CacheKey(format!(
            "{}|{}|{}|{}|{}|{}|{}{}{}|{}|{}|{}|{}",
            inputs.query.label(),
            inputs.target.label(),
            inputs.query.atom_count(),
            inputs.target.atom_count(),
            inputs.query.bond_count(),
            inputs.target.bond_count(),
            u8::from(flags.match_bonds),
            u8::from(flags.match_rings),
            u8::from(flags.match_atoms),
            inputs.hints.query_cycles,
            inputs.hints.target_cycles,
            joined_bits(&query_fp),
            joined_bits(&target_fp),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn joined_bits(fp: &Fingerprint) -> String {
    fp.set_bits()
        .map(|bit| bit.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}
