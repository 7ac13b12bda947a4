//! Substructure search via VF2-style backtracking. Embeddings are
//! non-induced: every query bond needs a target bond, extra target bonds
//! between mapped atoms are allowed.

use tracing::*;

use super::{rank_candidates, ChemFilters, EngineConfig, EngineMatch, PairContext};
use crate::{AtomMapping, EngineError, MolecularGraph};

pub const DEFAULT_CANDIDATE_LIMIT: usize = 64;
pub const DEFAULT_STATE_LIMIT: usize = 1_000_000;

/// Finds a complete embedding of a query graph in a target graph.
#[derive(Debug, Clone, Copy)]
pub struct SubstructureEngine {
    pub config: EngineConfig,
    pub filters: ChemFilters,
    /// Complete embeddings collected for ranking when a filter is enabled.
    pub candidate_limit: usize,
    /// Search states visited before giving up.
    pub state_limit: usize,
}

impl SubstructureEngine {
    pub fn new(config: EngineConfig, filters: ChemFilters) -> Self {
        SubstructureEngine {
            config,
            filters,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            state_limit: DEFAULT_STATE_LIMIT,
        }
    }

    /// The best complete embedding of `query` in `target`, if any exists.
    pub fn find(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
    ) -> Result<Option<EngineMatch>, EngineError> {
        let ctx = PairContext::new(query, target, self.config)?;
        if query.atom_count() > target.atom_count() || query.bond_count() > target.bond_count() {
            return Ok(None);
        }

        let limit = if self.filters.any() {
            self.candidate_limit.max(1)
        } else {
            1
        };
        let mut state = Vf2State::new(&ctx, limit, self.state_limit);
        state.match_recursive(0);
        if state.exhausted {
            debug!(
                "Substructure search of {} in {} stopped after {} states",
                query.label(),
                target.label(),
                state.states
            );
        }

        let candidates = state
            .matches
            .into_iter()
            .map(|pairs| AtomMapping::from_pairs(pairs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rank_candidates(query, target, candidates, &self.filters))
    }
}

/// Query atoms in search order: each fragment starts at its highest-degree
/// atom and grows breadth-first, so every later atom has a mapped neighbour.
fn matching_order(graph: &MolecularGraph) -> Vec<usize> {
    let mut order = Vec::with_capacity(graph.atom_count());
    let mut placed = vec![false; graph.atom_count()];
    for fragment in graph.fragments() {
        let Some(&start) = fragment
            .iter()
            .max_by_key(|&&atom| (graph.degree(atom), std::cmp::Reverse(atom)))
        else {
            continue;
        };
        placed[start] = true;
        let first = order.len();
        order.push(start);
        let mut cursor = first;
        while cursor < order.len() {
            let mut next: Vec<usize> = graph
                .neighbors(order[cursor])
                .filter(|&n| !placed[n])
                .collect();
            next.sort_unstable();
            for n in next {
                placed[n] = true;
                order.push(n);
            }
            cursor += 1;
        }
    }
    order
}

struct Vf2State<'c, 'a> {
    ctx: &'c PairContext<'a>,
    order: Vec<usize>,
    // core_query[q] = Some(t) means query atom q is mapped to target atom t
    core_query: Vec<Option<usize>>,
    // core_target[t] = Some(q) means target atom t is mapped to query atom q
    core_target: Vec<Option<usize>>,
    matches: Vec<Vec<(usize, usize)>>,
    limit: usize,
    states: usize,
    state_limit: usize,
    exhausted: bool,
}

impl<'c, 'a> Vf2State<'c, 'a> {
    fn new(ctx: &'c PairContext<'a>, limit: usize, state_limit: usize) -> Self {
        Vf2State {
            ctx,
            order: matching_order(ctx.query),
            core_query: vec![None; ctx.query.atom_count()],
            core_target: vec![None; ctx.target.atom_count()],
            matches: Vec::new(),
            limit,
            states: 0,
            state_limit,
            exhausted: false,
        }
    }

    fn done(&self) -> bool {
        self.exhausted || self.matches.len() >= self.limit
    }

    fn match_recursive(&mut self, depth: usize) {
        if self.done() {
            return;
        }
        self.states += 1;
        if self.states > self.state_limit {
            self.exhausted = true;
            return;
        }

        if depth == self.order.len() {
            let mapping = self
                .core_query
                .iter()
                .enumerate()
                .filter_map(|(q, t)| t.map(|t| (q, t)))
                .collect();
            self.matches.push(mapping);
            return;
        }

        let query_atom = self.order[depth];
        for target_atom in self.find_candidates(query_atom) {
            if self.core_target[target_atom].is_some() || !self.is_feasible(query_atom, target_atom) {
                continue;
            }
            self.core_query[query_atom] = Some(target_atom);
            self.core_target[target_atom] = Some(query_atom);

            self.match_recursive(depth + 1);

            self.core_query[query_atom] = None;
            self.core_target[target_atom] = None;
            if self.done() {
                return;
            }
        }
    }

    /// Neighbours of the image of an already mapped neighbour, or every target
    /// atom when the query atom starts a new fragment.
    fn find_candidates(&self, query_atom: usize) -> Vec<usize> {
        let anchor = self
            .ctx
            .query
            .neighbors(query_atom)
            .find_map(|n| self.core_query[n]);
        let mut candidates: Vec<usize> = match anchor {
            Some(t) => self.ctx.target.neighbors(t).collect(),
            None => (0..self.ctx.target.atom_count()).collect(),
        };
        candidates.sort_unstable();
        candidates
    }

    fn is_feasible(&self, query_atom: usize, target_atom: usize) -> bool {
        let ctx = self.ctx;
        if ctx.query.degree(query_atom) > ctx.target.degree(target_atom) {
            return false;
        }
        if !ctx.atoms_compatible(query_atom, target_atom) {
            return false;
        }
        ctx.query.neighbors(query_atom).all(|n| match self.core_query[n] {
            Some(t) => ctx.bonds_compatible((query_atom, n), (target_atom, t)),
            None => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    fn embed(query: &str, target: &str, config: EngineConfig) -> Option<EngineMatch> {
        let query = parse_smiles(query).unwrap();
        let target = parse_smiles(target).unwrap();
        SubstructureEngine::new(config, ChemFilters::default())
            .find(&query, &target)
            .unwrap()
    }

    #[test]
    fn test_chain_in_branched_chain() {
        let found = embed("CCO", "CC(C)O", EngineConfig::default()).unwrap();
        assert_eq!(found.mapping.len(), 3);
        assert_eq!(found.mapping.target_of(2), Some(3));
    }

    #[test]
    fn test_no_embedding() {
        assert!(embed("CCN", "CCO", EngineConfig::default()).is_none());
        assert!(embed("CCCC", "CCC", EngineConfig::default()).is_none());
    }

    #[test]
    fn test_bond_orders() {
        assert!(embed("C=C", "CC", EngineConfig::default()).is_some());
        let strict = EngineConfig {
            match_bonds: true,
            ..EngineConfig::default()
        };
        assert!(embed("C=C", "CC", strict).is_none());
        assert!(embed("C=C", "CC=C", strict).is_some());
    }

    #[test]
    fn test_ring_matching() {
        let rings = EngineConfig {
            match_rings: true,
            ..EngineConfig::default()
        };
        // A chain fits into a ring only when rings are ignored.
        assert!(embed("CCC", "C1CCCCC1", EngineConfig::default()).is_some());
        assert!(embed("CCC", "C1CCCCC1", rings).is_none());
        assert!(embed("C1CCCCC1", "CC1CCCCC1", rings).is_some());

        let perfect = EngineConfig {
            perfect_rings: true,
            ..EngineConfig::default()
        };
        assert!(embed("C1CCCC1", "C1CCCC1C", perfect).is_some());
        assert!(embed("CC1CCC1", "CC1CCCC1", perfect).is_none());
    }

    #[test]
    fn test_disconnected_query() {
        let found = embed("C.O", "CCO", EngineConfig::default()).unwrap();
        assert_eq!(found.mapping.len(), 2);
    }

    #[test]
    fn test_filters_pick_among_embeddings() {
        let query = parse_smiles("CC=O").unwrap();
        let target = parse_smiles("O=CCC=O").unwrap();
        let engine = SubstructureEngine::new(EngineConfig::default(), ChemFilters::all());
        let found = engine.find(&query, &target).unwrap().unwrap();
        // Both carbonyl ends embed; the best keeps C=O on a double bond.
        assert_eq!(found.scores.stereo, 2.0);
        let o = found.mapping.target_of(2).unwrap();
        assert!(o == 0 || o == 4);
    }

    #[test]
    fn test_matching_order_keeps_connectivity() {
        let graph = parse_smiles("CC(C)(C)CO").unwrap();
        let order = matching_order(&graph);
        assert_eq!(order[0], 1);
        assert_eq!(order.len(), graph.atom_count());
        for (position, &atom) in order.iter().enumerate().skip(1) {
            assert!(graph.neighbors(atom).any(|n| order[..position].contains(&n)));
        }
    }
}
