//! Fast approximate MCS: greedy seed-and-extend. Each round seeds a new
//! fragment at the most promising compatible pair and grows it breadth-first
//! until no neighbour can be added; rounds repeat until no seed is left.

use std::collections::VecDeque;

use super::{rank_candidates, ChemFilters, EngineConfig, EngineMatch, McsEngine, PairContext, Side};
use crate::{AtomMapping, EngineError, MolecularGraph};

#[derive(Debug, Clone, Copy)]
pub struct ApproximateMcs {
    pub config: EngineConfig,
    pub filters: ChemFilters,
}

impl ApproximateMcs {
    pub fn new(config: EngineConfig, filters: ChemFilters) -> Self {
        ApproximateMcs { config, filters }
    }
}

impl McsEngine for ApproximateMcs {
    fn find_mcs(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
    ) -> Result<EngineMatch, EngineError> {
        let ctx = PairContext::new(query, target, self.config)?;
        let mut state = GreedyState {
            ctx: &ctx,
            core_query: vec![None; query.atom_count()],
            core_target: vec![None; target.atom_count()],
            mapped: Vec::new(),
        };
        while let Some((q, t)) = state.best_seed() {
            state.assign(q, t);
            state.extend_from(q);
        }

        let mapping = AtomMapping::from_pairs(state.mapped)?;
        let scores = super::score(query, target, &mapping);
        Ok(rank_candidates(query, target, vec![mapping.clone()], &self.filters)
            .unwrap_or(EngineMatch { mapping, scores }))
    }
}

struct GreedyState<'c, 'a> {
    ctx: &'c PairContext<'a>,
    core_query: Vec<Option<usize>>,
    core_target: Vec<Option<usize>>,
    mapped: Vec<(usize, usize)>,
}

impl GreedyState<'_, '_> {
    fn assign(&mut self, q: usize, t: usize) {
        self.core_query[q] = Some(t);
        self.core_target[t] = Some(q);
        self.mapped.push((q, t));
    }

    /// Same label, and the same bond relation to every pair already mapped.
    fn consistent(&self, q: usize, t: usize) -> bool {
        if self.core_query[q].is_some() || self.core_target[t].is_some() {
            return false;
        }
        let ctx = self.ctx;
        if ctx.atom_label(Side::Query, q) != ctx.atom_label(Side::Target, t) {
            return false;
        }
        self.mapped.iter().all(|&(mq, mt)| {
            ctx.bond_label(Side::Query, q, mq) == ctx.bond_label(Side::Target, t, mt)
        })
    }

    /// How many neighbours the pair could bring along, judged by degree and
    /// whether the atom types already agree.
    fn seed_score(&self, q: usize, t: usize) -> usize {
        let ctx = self.ctx;
        let degree = ctx.query.degree(q).min(ctx.target.degree(t));
        let same_type = ctx.query.atom(q).tag() == ctx.target.atom(t).tag();
        degree * 2 + usize::from(same_type)
    }

    fn best_seed(&self) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), usize)> = None;
        for q in 0..self.ctx.query.atom_count() {
            for t in 0..self.ctx.target.atom_count() {
                if !self.consistent(q, t) {
                    continue;
                }
                let score = self.seed_score(q, t);
                match best {
                    Some((_, best_score)) if best_score >= score => {}
                    _ => best = Some(((q, t), score)),
                }
            }
        }
        best.map(|(pair, _)| pair)
    }

    fn extend_from(&mut self, seed: usize) {
        let mut queue = VecDeque::from([seed]);
        while let Some(q) = queue.pop_front() {
            let Some(t) = self.core_query[q] else {
                continue;
            };
            let mut query_neighbors: Vec<usize> = self.ctx.query.neighbors(q).collect();
            query_neighbors.sort_unstable();
            for qn in query_neighbors {
                let mut target_neighbors: Vec<usize> = self.ctx.target.neighbors(t).collect();
                target_neighbors.sort_unstable();
                let partner = target_neighbors
                    .into_iter()
                    .filter(|&tn| self.consistent(qn, tn))
                    .max_by_key(|&tn| (self.seed_score(qn, tn), std::cmp::Reverse(tn)));
                if let Some(tn) = partner {
                    self.assign(qn, tn);
                    queue.push_back(qn);
                }
            }
        }
    }
}
