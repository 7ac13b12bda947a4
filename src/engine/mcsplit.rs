//! Exhaustive maximum common induced substructure search in the McSplit
//! style: atoms are partitioned into label classes that are split further
//! every time a pair is matched, and the class sizes bound the search.

use std::collections::BTreeMap;

use tracing::*;

use super::{
    rank_candidates, AtomLabel, BondLabel, ChemFilters, EngineConfig, EngineMatch, McsEngine,
    PairContext, Side,
};
use crate::{AtomMapping, EngineError, MolecularGraph};

pub const DEFAULT_EXPANSION_BUDGET: usize = 2_000_000;

/// Branch-and-bound MCS. Finds the largest common substructure unless the
/// expansion budget runs out first, in which case the best found so far is
/// returned.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveMcs {
    pub config: EngineConfig,
    pub filters: ChemFilters,
    pub budget: usize,
    /// Equally large solutions kept for ranking when a filter is enabled.
    pub candidate_limit: usize,
}

impl ExhaustiveMcs {
    pub fn new(config: EngineConfig, filters: ChemFilters) -> Self {
        ExhaustiveMcs {
            config,
            filters,
            budget: DEFAULT_EXPANSION_BUDGET,
            candidate_limit: super::DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }
}

impl McsEngine for ExhaustiveMcs {
    fn find_mcs(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
    ) -> Result<EngineMatch, EngineError> {
        let ctx = PairContext::new(query, target, self.config)?;
        let tie_limit = if self.filters.any() {
            self.candidate_limit.max(1)
        } else {
            1
        };
        let mut search = Search {
            ctx: &ctx,
            budget: self.budget,
            expansions: 0,
            exhausted: false,
            best: Vec::new(),
            ties: Vec::new(),
            tie_limit,
        };
        let mut current = Vec::new();
        search.expand(initial_domains(&ctx), &mut current, false);
        if search.exhausted {
            debug!(
                "MCS of {} and {} hit the expansion budget of {}, keeping {} atoms",
                query.label(),
                target.label(),
                self.budget,
                search.best.len()
            );
        }

        let candidates = if search.ties.is_empty() {
            vec![search.best]
        } else {
            search.ties
        };
        let candidates = candidates
            .into_iter()
            .map(AtomMapping::from_pairs)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rank_candidates(query, target, candidates, &self.filters).unwrap_or_else(|| {
            EngineMatch {
                mapping: AtomMapping::new(),
                scores: super::score(query, target, &AtomMapping::new()),
            }
        }))
    }
}

/// Query and target atoms that are still interchangeable: same label, and the
/// same bond relation to every pair matched so far.
#[derive(Debug, Clone, PartialEq)]
struct Bidomain {
    left: Vec<usize>,
    right: Vec<usize>,
}

impl Bidomain {
    fn bound(&self) -> usize {
        self.left.len().min(self.right.len())
    }
}

fn initial_domains(ctx: &PairContext) -> Vec<Bidomain> {
    let mut classes: BTreeMap<AtomLabel, Bidomain> = BTreeMap::new();
    for q in 0..ctx.query.atom_count() {
        classes
            .entry(ctx.atom_label(Side::Query, q))
            .or_insert_with(|| Bidomain {
                left: Vec::new(),
                right: Vec::new(),
            })
            .left
            .push(q);
    }
    for t in 0..ctx.target.atom_count() {
        if let Some(domain) = classes.get_mut(&ctx.atom_label(Side::Target, t)) {
            domain.right.push(t);
        }
    }
    classes
        .into_values()
        .filter(|domain| !domain.left.is_empty() && !domain.right.is_empty())
        .collect()
}

struct Search<'c, 'a> {
    ctx: &'c PairContext<'a>,
    budget: usize,
    expansions: usize,
    exhausted: bool,
    best: Vec<(usize, usize)>,
    ties: Vec<Vec<(usize, usize)>>,
    tie_limit: usize,
}

impl Search<'_, '_> {
    fn record(&mut self, current: &[(usize, usize)]) {
        if current.len() > self.best.len() {
            self.best = current.to_vec();
            self.ties = vec![current.to_vec()];
        } else if current.len() == self.best.len() && self.ties.len() < self.tie_limit {
            self.ties.push(current.to_vec());
        }
    }

    /// `fresh` is set when `current` just grew, so each partial mapping is
    /// recorded once.
    fn expand(&mut self, domains: Vec<Bidomain>, current: &mut Vec<(usize, usize)>, fresh: bool) {
        if self.exhausted {
            return;
        }
        self.expansions += 1;
        if self.expansions > self.budget {
            self.exhausted = true;
            return;
        }
        if fresh {
            self.record(current);
        }

        let bound = current.len() + domains.iter().map(Bidomain::bound).sum::<usize>();
        let ties_full = self.ties.len() >= self.tie_limit;
        if bound < self.best.len() || (bound == self.best.len() && ties_full) {
            return;
        }

        // Smallest class first, lowest position on ties.
        let Some(chosen) = domains
            .iter()
            .enumerate()
            .min_by_key(|(i, domain)| (domain.left.len().max(domain.right.len()), *i))
            .map(|(i, _)| i)
        else {
            return;
        };
        let Some(&v) = domains[chosen]
            .left
            .iter()
            .max_by_key(|&&q| (self.ctx.query.degree(q), std::cmp::Reverse(q)))
        else {
            return;
        };

        let mut without_v = domains;
        without_v[chosen].left.retain(|&q| q != v);

        let mut right = without_v[chosen].right.clone();
        right.sort_unstable();
        for w in right {
            let next = self.refine(&without_v, chosen, v, w);
            current.push((v, w));
            self.expand(next, current, true);
            current.pop();
            if self.exhausted {
                return;
            }
        }

        // Leave v unmatched.
        if without_v[chosen].left.is_empty() {
            without_v.remove(chosen);
        }
        self.expand(without_v, current, false);
    }

    /// Splits every class by bond relation to the newly matched pair `v -> w`.
    fn refine(&self, domains: &[Bidomain], chosen: usize, v: usize, w: usize) -> Vec<Bidomain> {
        let mut refined = Vec::new();
        for (i, domain) in domains.iter().enumerate() {
            let mut split: BTreeMap<BondLabel, Bidomain> = BTreeMap::new();
            for &q in &domain.left {
                split
                    .entry(self.ctx.bond_label(Side::Query, v, q))
                    .or_insert_with(|| Bidomain {
                        left: Vec::new(),
                        right: Vec::new(),
                    })
                    .left
                    .push(q);
            }
            for &t in &domain.right {
                if i == chosen && t == w {
                    continue;
                }
                if let Some(part) = split.get_mut(&self.ctx.bond_label(Side::Target, w, t)) {
                    part.right.push(t);
                }
            }
            refined.extend(
                split
                    .into_values()
                    .filter(|part| !part.left.is_empty() && !part.right.is_empty()),
            );
        }
        refined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    fn mcs_size(query: &str, target: &str) -> usize {
        let query = parse_smiles(query).unwrap();
        let target = parse_smiles(target).unwrap();
        ExhaustiveMcs::new(EngineConfig::default(), ChemFilters::default())
            .find_mcs(&query, &target)
            .unwrap()
            .mapping
            .len()
    }

    #[test]
    fn test_simple_pairs() {
        assert_eq!(mcs_size("CCO", "CCN"), 2);
        assert_eq!(mcs_size("c1ccccc1", "Cc1ccccc1"), 6);
        assert_eq!(mcs_size("CC(=O)O", "CC(=O)OC"), 4);
        assert_eq!(mcs_size("O", "C"), 0);
    }

    #[test]
    fn test_disconnected_common_substructure() {
        let query = parse_smiles("CCOCC").unwrap();
        let target = parse_smiles("CCSCC").unwrap();
        let found = ExhaustiveMcs::new(EngineConfig::default(), ChemFilters::default())
            .find_mcs(&query, &target)
            .unwrap();
        assert_eq!(found.mapping.len(), 4);
        assert_eq!(found.scores.fragments, 2);
    }

    #[test]
    fn test_mapping_is_induced() {
        let query = parse_smiles("C1CC1").unwrap();
        let target = parse_smiles("CCC").unwrap();
        let found = ExhaustiveMcs::new(EngineConfig::default(), ChemFilters::default())
            .find_mcs(&query, &target)
            .unwrap();
        assert_eq!(found.mapping.len(), 2);
        for (qa, ta) in found.mapping.pairs() {
            for (qb, tb) in found.mapping.pairs() {
                assert_eq!(
                    query.bond_between(qa, qb).is_some(),
                    target.bond_between(ta, tb).is_some()
                );
            }
        }
    }

    #[test]
    fn test_bond_matching() {
        let query = parse_smiles("C=CC").unwrap();
        let target = parse_smiles("CCC").unwrap();
        let strict = EngineConfig {
            match_bonds: true,
            ..EngineConfig::default()
        };
        let found = ExhaustiveMcs::new(strict, ChemFilters::default())
            .find_mcs(&query, &target)
            .unwrap();
        assert_eq!(found.mapping.len(), 2);
        assert_eq!(mcs_size("C=CC", "CCC"), 3);
    }

    #[test]
    fn test_budget_keeps_best_so_far() {
        let query = parse_smiles("c1ccc2ccccc2c1").unwrap();
        let target = parse_smiles("c1ccc2cc3ccccc3cc2c1").unwrap();
        let full = ExhaustiveMcs::new(EngineConfig::default(), ChemFilters::default())
            .find_mcs(&query, &target)
            .unwrap();
        assert_eq!(full.mapping.len(), 10);
        let cut = ExhaustiveMcs::new(EngineConfig::default(), ChemFilters::default())
            .with_budget(5)
            .find_mcs(&query, &target)
            .unwrap();
        assert!(cut.mapping.len() <= full.mapping.len());
    }

    #[test]
    fn test_deterministic() {
        let query = parse_smiles("CC(C)CC(=O)O").unwrap();
        let target = parse_smiles("OC(=O)CCC(C)C").unwrap();
        let engine = ExhaustiveMcs::new(EngineConfig::default(), ChemFilters::all());
        let first = engine.find_mcs(&query, &target).unwrap();
        let second = engine.find_mcs(&query, &target).unwrap();
        assert_eq!(first, second);
    }
}
