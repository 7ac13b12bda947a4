//! Isomorphism engines: exact substructure embedding and two maximum common
//! substructure strategies, plus the scores and ranking they share.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::{AtomMapping, EngineError, MolecularGraph, RingInfo};

mod greedy;
mod mcsplit;
mod score;
mod vf2;

pub use greedy::*;
pub use mcsplit::*;
pub use score::*;
pub use vf2::*;

/// Constraints an engine applies when pairing atoms and bonds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    /// Paired bonds must have the same order.
    pub match_bonds: bool,
    /// Ring atoms pair only with ring atoms, and query ring bonds only with
    /// target ring bonds.
    pub match_rings: bool,
    /// A query ring atom pairs only with a target atom whose smallest ring
    /// has the same size.
    pub perfect_rings: bool,
    /// Paired atoms must carry the same perceived atom type.
    pub match_atom_types: bool,
}

/// Scoring toggles. When an engine finds several equally large
/// correspondences, the enabled filters pick one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChemFilters {
    pub stereo: bool,
    pub fragment: bool,
    pub energy: bool,
}

impl ChemFilters {
    pub fn all() -> Self {
        ChemFilters {
            stereo: true,
            fragment: true,
            energy: true,
        }
    }

    pub fn any(&self) -> bool {
        self.stereo || self.fragment || self.energy
    }

    /// Orders two scored candidates, best first: higher stereo score, then
    /// fewer fragments, then lower energy. Disabled filters compare equal.
    pub fn compare(&self, a: &Scores, b: &Scores) -> Ordering {
        let mut ordering = Ordering::Equal;
        if self.stereo {
            ordering = ordering.then_with(|| b.stereo.total_cmp(&a.stereo));
        }
        if self.fragment {
            ordering = ordering.then_with(|| a.fragments.cmp(&b.fragments));
        }
        if self.energy {
            ordering = ordering.then_with(|| a.energy.total_cmp(&b.energy));
        }
        ordering
    }
}

/// A correspondence found by an engine together with its scores.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineMatch {
    pub mapping: AtomMapping,
    pub scores: Scores,
}

/// Scores every candidate and keeps the best one under `filters`. The sort is
/// stable, so with no filter enabled the first candidate wins.
pub fn rank_candidates(
    query: &MolecularGraph,
    target: &MolecularGraph,
    candidates: Vec<AtomMapping>,
    filters: &ChemFilters,
) -> Option<EngineMatch> {
    let mut scored: Vec<EngineMatch> = candidates
        .into_iter()
        .map(|mapping| {
            let scores = score(query, target, &mapping);
            EngineMatch { mapping, scores }
        })
        .collect();
    scored.sort_by(|a, b| filters.compare(&a.scores, &b.scores));
    scored.into_iter().next()
}

/// Common interface of the two maximum common substructure strategies.
pub trait McsEngine {
    fn find_mcs(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
    ) -> Result<EngineMatch, EngineError>;
}

/// Engines only accept simple graphs.
pub fn validate_input(graph: &MolecularGraph) -> Result<(), EngineError> {
    let malformed = |reason: String| EngineError::MalformedInput {
        graph: graph.label().to_string(),
        reason,
    };
    let n = graph.atom_count();
    let mut seen = BTreeSet::new();
    for (a, b, _) in graph.bonds() {
        if a == b {
            return Err(malformed(format!("self-loop on atom {a}")));
        }
        if b >= n {
            return Err(malformed(format!("bond to missing atom {b}")));
        }
        if !seen.insert((a, b)) {
            return Err(malformed(format!("parallel bonds between {a} and {b}")));
        }
    }
    Ok(())
}

/// Which graph of a pair an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Query,
    Target,
}

/// Label an atom must share with its partner. Used by engines that partition
/// atoms into classes instead of testing pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct AtomLabel {
    element: u8,
    atom_type: Option<String>,
    ring: Option<bool>,
    ring_size: Option<Option<usize>>,
}

/// Label of a bond (or of a missing bond) between two atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum BondLabel {
    Absent,
    Present { order: Option<u32>, ring: bool },
}

/// A validated query/target pair with the ring facts the constraints need.
pub(crate) struct PairContext<'a> {
    pub query: &'a MolecularGraph,
    pub target: &'a MolecularGraph,
    query_rings: RingInfo,
    target_rings: RingInfo,
    pub config: EngineConfig,
}

impl<'a> PairContext<'a> {
    pub fn new(
        query: &'a MolecularGraph,
        target: &'a MolecularGraph,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        validate_input(query)?;
        validate_input(target)?;
        Ok(PairContext {
            query,
            target,
            query_rings: RingInfo::perceive(query),
            target_rings: RingInfo::perceive(target),
            config,
        })
    }

    fn graph(&self, side: Side) -> &'a MolecularGraph {
        match side {
            Side::Query => self.query,
            Side::Target => self.target,
        }
    }

    fn rings(&self, side: Side) -> &RingInfo {
        match side {
            Side::Query => &self.query_rings,
            Side::Target => &self.target_rings,
        }
    }

    /// Whether query atom `q` may be placed on target atom `t`.
    pub fn atoms_compatible(&self, q: usize, t: usize) -> bool {
        let (qa, ta) = (self.query.atom(q), self.target.atom(t));
        if qa.element != ta.element {
            return false;
        }
        if self.config.match_atom_types && qa.tag() != ta.tag() {
            return false;
        }
        let q_ring = self.query_rings.is_ring_atom(q);
        if self.config.match_rings && q_ring != self.target_rings.is_ring_atom(t) {
            return false;
        }
        if self.config.perfect_rings
            && q_ring
            && self.query_rings.smallest_ring_size(q) != self.target_rings.smallest_ring_size(t)
        {
            return false;
        }
        true
    }

    /// Whether query bond `qa-qb` may be placed on target bond `ta-tb`. Both
    /// bonds must exist.
    pub fn bonds_compatible(&self, (qa, qb): (usize, usize), (ta, tb): (usize, usize)) -> bool {
        let (Some(q_order), Some(t_order)) =
            (self.query.bond_between(qa, qb), self.target.bond_between(ta, tb))
        else {
            return false;
        };
        if self.config.match_bonds && q_order != t_order {
            return false;
        }
        if self.config.match_rings
            && self.query_rings.is_ring_bond(qa, qb)
            && !self.target_rings.is_ring_bond(ta, tb)
        {
            return false;
        }
        true
    }

    pub fn atom_label(&self, side: Side, atom: usize) -> AtomLabel {
        let graph = self.graph(side);
        let rings = self.rings(side);
        let data = graph.atom(atom);
        AtomLabel {
            element: data.element.atomic_number(),
            atom_type: self
                .config
                .match_atom_types
                .then(|| data.tag().to_string()),
            ring: self.config.match_rings.then(|| rings.is_ring_atom(atom)),
            ring_size: self
                .config
                .perfect_rings
                .then(|| rings.smallest_ring_size(atom)),
        }
    }

    pub fn bond_label(&self, side: Side, a: usize, b: usize) -> BondLabel {
        match self.graph(side).bond_between(a, b) {
            None => BondLabel::Absent,
            Some(order) => BondLabel::Present {
                order: self.config.match_bonds.then(|| order.half_units()),
                ring: self.config.match_rings && self.rings(side).is_ring_bond(a, b),
            },
        }
    }
}
