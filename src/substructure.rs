//! The exact-embedding stage: a short cascade of increasingly relaxed
//! substructure searches, tried in both directions.

use tracing::*;

use crate::{
    ChemFilters, EngineConfig, EngineError, EngineMatch, MatchOrigin, MolecularGraph,
    PairAssessment, RingHints, SubstructureEngine, Theory,
};

/// One configuration of the substructure search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EmbeddingAttempt {
    pub match_bonds: bool,
    pub match_rings: bool,
    pub perfect_rings: bool,
}

impl EmbeddingAttempt {
    pub fn engine_config(&self, match_atom_types: bool) -> EngineConfig {
        EngineConfig {
            match_bonds: self.match_bonds,
            match_rings: self.match_rings,
            perfect_rings: self.perfect_rings,
            match_atom_types,
        }
    }
}

/// The cascade in the order it is tried. Every attempt ignores bond orders.
/// The last one drops all ring constraints and is left out for
/// [`Theory::Rings`].
pub fn embedding_attempts(
    theory: Theory,
    hints: RingHints,
    has_perfect_rings: bool,
) -> Vec<EmbeddingAttempt> {
    let mut attempts = vec![
        EmbeddingAttempt {
            match_bonds: false,
            match_rings: hints.both_cyclic(),
            perfect_rings: has_perfect_rings,
        },
        EmbeddingAttempt {
            match_bonds: false,
            match_rings: has_perfect_rings,
            perfect_rings: !has_perfect_rings,
        },
    ];
    if theory != Theory::Rings {
        attempts.push(EmbeddingAttempt::default());
    }
    attempts
}

/// Runs the cascade over an ordered pair.
#[derive(Debug, Clone)]
pub struct SubstructureMatcher {
    attempts: Vec<EmbeddingAttempt>,
    filters: ChemFilters,
    match_atom_types: bool,
}

impl SubstructureMatcher {
    pub fn new(attempts: Vec<EmbeddingAttempt>, filters: ChemFilters, match_atom_types: bool) -> Self {
        SubstructureMatcher {
            attempts,
            filters,
            match_atom_types,
        }
    }

    pub fn attempts(&self) -> &[EmbeddingAttempt] {
        &self.attempts
    }

    /// The first total embedding of `query` in `target` the cascade finds.
    /// An embedding is total when it maps every query atom.
    pub fn embed(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
    ) -> Result<Option<EngineMatch>, EngineError> {
        for (i, attempt) in self.attempts.iter().enumerate() {
            let engine = SubstructureEngine::new(attempt.engine_config(self.match_atom_types), self.filters);
            match engine.find(query, target)? {
                Some(found) if found.mapping.len() == query.atom_count() => {
                    debug!(
                        "Attempt {} ({:?}) embedded {} in {}",
                        i + 1,
                        attempt,
                        query.label(),
                        target.label()
                    );
                    return Ok(Some(found));
                }
                _ => trace!("Attempt {} ({:?}) found no total embedding", i + 1, attempt),
            }
        }
        Ok(None)
    }

    /// Tries `query` in `target`, then `target` in `query`, each only when
    /// the element counts allow it. A reverse embedding is inverted so the
    /// mapping still runs from `query` to `target`. Its scores stay as the
    /// engine computed them.
    pub fn find_total_match(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
        assessment: &PairAssessment,
    ) -> Result<Option<(EngineMatch, MatchOrigin)>, EngineError> {
        if assessment.query_in_target {
            if let Some(found) = self.embed(query, target)? {
                return Ok(Some((found, MatchOrigin::Embedding)));
            }
        }
        if assessment.target_in_query {
            if let Some(found) = self.embed(target, query)? {
                let reversed = EngineMatch {
                    mapping: found.mapping.inverted(),
                    scores: found.scores,
                };
                return Ok(Some((reversed, MatchOrigin::ReverseEmbedding)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    fn matcher(theory: Theory, hints: RingHints, perfect: bool) -> SubstructureMatcher {
        SubstructureMatcher::new(
            embedding_attempts(theory, hints, perfect),
            ChemFilters::default(),
            false,
        )
    }

    #[test]
    fn test_attempt_table() {
        let cyclic = RingHints {
            query_cycles: 1,
            target_cycles: 2,
        };
        let attempts = embedding_attempts(Theory::Default, cyclic, false);
        assert_eq!(attempts.len(), 3);
        assert!(attempts[0].match_rings && !attempts[0].perfect_rings);
        assert!(!attempts[1].match_rings && attempts[1].perfect_rings);
        assert_eq!(attempts[2], EmbeddingAttempt::default());
        assert!(attempts.iter().all(|attempt| !attempt.match_bonds));

        let attempts = embedding_attempts(Theory::Rings, RingHints::default(), true);
        assert_eq!(attempts.len(), 2);
        assert!(!attempts[0].match_rings && attempts[0].perfect_rings);
        assert!(attempts[1].match_rings && !attempts[1].perfect_rings);

        assert_eq!(embedding_attempts(Theory::Min, cyclic, true).len(), 3);
    }

    #[test]
    fn test_forward_and_reverse() {
        let small = parse_smiles("CCO").unwrap();
        let large = parse_smiles("CC(C)O").unwrap();
        let matcher = matcher(Theory::Default, RingHints::from_graphs(&small, &large), false);

        let assessment = PairAssessment::assess(&small, &large);
        let (found, origin) = matcher.find_total_match(&small, &large, &assessment).unwrap().unwrap();
        assert_eq!(origin, MatchOrigin::Embedding);
        assert_eq!(found.mapping.len(), small.atom_count());

        let assessment = PairAssessment::assess(&large, &small);
        let (found, origin) = matcher.find_total_match(&large, &small, &assessment).unwrap().unwrap();
        assert_eq!(origin, MatchOrigin::ReverseEmbedding);
        assert_eq!(found.mapping.len(), small.atom_count());
        // Query slot stays the larger graph.
        for (q, t) in found.mapping.pairs() {
            assert!(q < large.atom_count() && t < small.atom_count());
            assert_eq!(large.atom(q).element, small.atom(t).element);
        }
    }

    #[test]
    fn test_rings_theory_keeps_ring_constraints() {
        // The propyl chain only fits onto ring atoms once ring constraints
        // are dropped.
        let query = parse_smiles("C1CC1CCC").unwrap();
        let target = parse_smiles("C1CCCCC1C1CC1").unwrap();
        let hints = RingHints::from_graphs(&query, &target);
        let rings = matcher(Theory::Rings, hints, true);
        assert_eq!(rings.attempts().len(), 2);
        assert!(rings.embed(&query, &target).unwrap().is_none());
        let found = matcher(Theory::Default, hints, true).embed(&query, &target).unwrap();
        assert_eq!(found.unwrap().mapping.len(), 6);
    }

    #[test]
    fn test_relaxed_attempt_covers_stricter_ones() {
        let pairs = [
            ("CCO", "CC(C)O"),
            ("C1CCCCC1", "CC1CCCCC1"),
            ("c1ccccc1", "c1ccc2ccccc2c1"),
            ("C1CCC1", "C1CCCCC1"),
            ("CC=O", "CCCO"),
            ("C1CC1C", "CC1CCC1"),
        ];
        for (query, target) in pairs {
            let query = parse_smiles(query).unwrap();
            let target = parse_smiles(target).unwrap();
            let hints = RingHints::from_graphs(&query, &target);
            for perfect in [false, true] {
                let attempts = embedding_attempts(Theory::Default, hints, perfect);
                let loosest = attempts.last().copied().unwrap();
                let found_loose = SubstructureEngine::new(loosest.engine_config(false), ChemFilters::default())
                    .find(&query, &target)
                    .unwrap()
                    .is_some();
                for attempt in &attempts {
                    let found = SubstructureEngine::new(attempt.engine_config(false), ChemFilters::default())
                        .find(&query, &target)
                        .unwrap()
                        .is_some();
                    assert!(!found || found_loose);
                }
            }
        }
    }
}
