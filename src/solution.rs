use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::{AtomMapping, McsStrategy, MolecularGraph, Name, Scores};

/// Which stage of a matching task produced a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOrigin {
    /// The query embeds completely in the target.
    Embedding,
    /// The target embeds completely in the query; the mapping was inverted.
    ReverseEmbedding,
    Mcs(McsStrategy),
    /// Rebound from an earlier solution with the same cache key.
    Cache,
}

impl Display for MatchOrigin {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            MatchOrigin::Embedding => write!(f, "embedding"),
            MatchOrigin::ReverseEmbedding => write!(f, "reverse embedding"),
            MatchOrigin::Mcs(strategy) => write!(f, "{strategy} MCS"),
            MatchOrigin::Cache => write!(f, "cache"),
        }
    }
}

/// The correspondence found for one ordered pair. The mapping always runs
/// from `query` atoms to `target` atoms, whichever direction the embedding
/// was found in.
#[derive(Debug, Clone)]
pub struct MatchingSolution {
    pub query_position: usize,
    pub target_position: usize,
    pub query: Arc<MolecularGraph>,
    pub target: Arc<MolecularGraph>,
    pub mapping: AtomMapping,
    pub scores: Scores,
    pub origin: MatchOrigin,
}

impl MatchingSolution {
    pub fn mapped_atoms(&self) -> usize {
        self.mapping.len()
    }

    pub fn energy(&self) -> f64 {
        self.scores.energy
    }

    pub fn fragment_size(&self) -> usize {
        self.scores.fragments
    }

    pub fn stereo_score(&self) -> f64 {
        self.scores.stereo
    }

    /// Whether every atom of the smaller graph is mapped.
    pub fn is_total(&self) -> bool {
        self.mapping.len() == self.query.atom_count().min(self.target.atom_count())
    }

    /// A copy of this solution bound to another pair of graph instances with
    /// the same atom order. The correspondence is copied by index and the
    /// scores are kept unchanged.
    pub fn rebind(
        &self,
        query_position: usize,
        target_position: usize,
        query: Arc<MolecularGraph>,
        target: Arc<MolecularGraph>,
    ) -> Self {
        debug_assert_eq!(query.atom_count(), self.query.atom_count());
        debug_assert_eq!(target.atom_count(), self.target.atom_count());
        MatchingSolution {
            query_position,
            target_position,
            query,
            target,
            mapping: self.mapping.clone(),
            scores: self.scores,
            origin: MatchOrigin::Cache,
        }
    }

    /// Mapped atom identifier pairs, query first.
    pub fn id_pairs(&self) -> Vec<(Name, Name)> {
        self.mapping.id_pairs(&self.query, &self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    fn solution() -> MatchingSolution {
        let query = Arc::new(parse_smiles("CCO").unwrap());
        let target = Arc::new(parse_smiles("CC(C)O").unwrap());
        MatchingSolution {
            query_position: 0,
            target_position: 1,
            query,
            target,
            mapping: AtomMapping::from_pairs([(0, 0), (1, 1), (2, 3)]).unwrap(),
            scores: Scores {
                energy: 346.0,
                fragments: 1,
                stereo: 2.0,
            },
            origin: MatchOrigin::Embedding,
        }
    }

    #[test]
    fn test_total() {
        let solution = solution();
        assert!(solution.is_total());
        assert_eq!(solution.mapped_atoms(), 3);
    }

    #[test]
    fn test_rebind_keeps_mapping_and_scores() {
        let original = solution();
        let query = Arc::new(parse_smiles("CCO").unwrap());
        let target = Arc::new(parse_smiles("CC(C)O").unwrap());
        let rebound = original.rebind(4, 5, query.clone(), target);
        assert!(Arc::ptr_eq(&rebound.query, &query));
        assert!(!Arc::ptr_eq(&rebound.query, &original.query));
        assert_eq!(rebound.mapping, original.mapping);
        assert_eq!(rebound.scores, original.scores);
        assert_eq!((rebound.query_position, rebound.target_position), (4, 5));
        assert_eq!(rebound.origin, MatchOrigin::Cache);
    }
}
