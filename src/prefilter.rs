//! Cheap checks run before any isomorphism search.

use std::collections::BTreeMap;

use crate::MolecularGraph;

/// Expected-match threshold above which the exhaustive MCS strategy is used.
pub const EXPECTED_MATCH_THRESHOLD: usize = 3;
/// Both graphs need more bonds than this for the exhaustive MCS strategy.
pub const BOND_COUNT_THRESHOLD: usize = 2;

/// A graph counts as connected here when none of its fragments is a single
/// isolated atom.
pub fn is_connected(graph: &MolecularGraph) -> bool {
    !graph.has_isolated_atom()
}

/// Whether the element multiset of `query` fits inside that of `target`.
/// Direction matters: swapping the arguments asks a different question.
pub fn is_possible_subgraph(query: &MolecularGraph, target: &MolecularGraph) -> bool {
    let query_counts = query.symbol_counts();
    let target_counts = target.symbol_counts();
    if query_counts.len() > target_counts.len() {
        return false;
    }
    query_counts.iter().all(|(symbol, &count)| {
        target_counts
            .get(symbol)
            .is_some_and(|&available| count <= available)
    })
}

fn tag_counts(graph: &MolecularGraph) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for atom in graph.atoms() {
        *counts.entry(atom.tag()).or_insert(0) += 1;
    }
    counts
}

/// Size of the multiset intersection of the two graphs' atom tags (atom
/// type when known, element symbol otherwise).
pub fn expected_max_match(query: &MolecularGraph, target: &MolecularGraph) -> usize {
    let target_counts = tag_counts(target);
    tag_counts(query)
        .into_iter()
        .map(|(tag, count)| count.min(target_counts.get(tag).copied().unwrap_or(0)))
        .sum()
}

/// The prefilter verdicts for one ordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairAssessment {
    /// Both graphs are connected in the sense of [`is_connected`].
    pub connected: bool,
    pub query_in_target: bool,
    pub target_in_query: bool,
    pub expected_matches: usize,
    /// The pair qualifies for the exhaustive MCS strategy.
    pub favourable: bool,
}

impl PairAssessment {
    pub fn assess(query: &MolecularGraph, target: &MolecularGraph) -> Self {
        let connected = is_connected(query) && is_connected(target);
        let expected_matches = expected_max_match(query, target);
        let favourable = connected
            && expected_matches > EXPECTED_MATCH_THRESHOLD
            && query.bond_count() > BOND_COUNT_THRESHOLD
            && target.bond_count() > BOND_COUNT_THRESHOLD;
        PairAssessment {
            connected,
            query_in_target: is_possible_subgraph(query, target),
            target_in_query: is_possible_subgraph(target, query),
            expected_matches,
            favourable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize, parse_smiles};

    #[test]
    fn test_connectivity() {
        assert!(is_connected(&parse_smiles("CCO").unwrap()));
        assert!(is_connected(&parse_smiles("CC.OO").unwrap()));
        assert!(!is_connected(&parse_smiles("CC(=O)[O-].[Na+]").unwrap()));
        assert!(!is_connected(&parse_smiles("C").unwrap()));
    }

    #[test]
    fn test_possible_subgraph_is_directional() {
        let ethanol = parse_smiles("CCO").unwrap();
        let propanol = parse_smiles("CCCO").unwrap();
        assert!(is_possible_subgraph(&ethanol, &propanol));
        assert!(!is_possible_subgraph(&propanol, &ethanol));

        let amine = parse_smiles("CCN").unwrap();
        assert!(!is_possible_subgraph(&ethanol, &amine));
        assert!(!is_possible_subgraph(&amine, &ethanol));

        // More distinct symbols than the target can never fit.
        let glycine = parse_smiles("NCC(=O)O").unwrap();
        assert!(!is_possible_subgraph(&glycine, &propanol));
    }

    #[test]
    fn test_expected_max_match() {
        let mut acid = parse_smiles("CC(=O)O").unwrap();
        let mut ester = parse_smiles("CC(=O)OC").unwrap();
        // Plain symbols before perception.
        assert_eq!(expected_max_match(&acid, &ester), 4);

        normalize(&mut acid);
        normalize(&mut ester);
        // C.sp3 x1, C.sp2 x1, O.sp2 x1, O.sp3 x1 in common.
        assert_eq!(expected_max_match(&acid, &ester), 4);
        assert_eq!(expected_max_match(&ester, &acid), 4);

        let mut water = parse_smiles("O").unwrap();
        normalize(&mut water);
        assert_eq!(expected_max_match(&water, &acid), 0);
    }

    #[test]
    fn test_favourable_pairs() {
        let big = parse_smiles("CCCCO").unwrap();
        let bigger = parse_smiles("CCCCCO").unwrap();
        let assessment = PairAssessment::assess(&big, &bigger);
        assert!(assessment.connected);
        assert!(assessment.favourable);

        let small = parse_smiles("CCO").unwrap();
        assert!(!PairAssessment::assess(&small, &bigger).favourable);

        let salt = parse_smiles("CCCCC(=O)[O-].[Na+]").unwrap();
        let assessment = PairAssessment::assess(&salt, &bigger);
        assert!(!assessment.connected);
        assert!(!assessment.favourable);
    }
}
