//! The maximum common substructure stage, with strategy selection by theory
//! and reuse through the shared result cache.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use tracing::*;

use crate::{
    ApproximateMcs, CacheKey, ChemFilters, EngineConfig, EngineError, EngineMatch, ExhaustiveMcs,
    KeyInputs, MatchOrigin, MatcherFlags, MatchingSolution, McsEngine, MolecularGraph,
    PairAssessment, ResultCache, RingHints, DEFAULT_EXPANSION_BUDGET,
};

/// Selects the ring handling and the isomorphism strategy of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Theory {
    /// Ring constraints are never fully dropped during embedding.
    Rings,
    /// MCS ignores rings altogether.
    Min,
    #[default]
    Default,
}

impl Display for Theory {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Theory::Rings => write!(f, "RINGS"),
            Theory::Min => write!(f, "MIN"),
            Theory::Default => write!(f, "DEFAULT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McsStrategy {
    Exhaustive,
    Approximate,
}

impl Display for McsStrategy {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            McsStrategy::Exhaustive => write!(f, "exhaustive"),
            McsStrategy::Approximate => write!(f, "approximate"),
        }
    }
}

/// Whether a pair qualifies for the exhaustive strategy (see
/// [`PairAssessment::favourable`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McsBranch {
    Favourable,
    Fallback,
}

impl From<&PairAssessment> for McsBranch {
    fn from(assessment: &PairAssessment) -> Self {
        if assessment.favourable {
            McsBranch::Favourable
        } else {
            McsBranch::Fallback
        }
    }
}

/// What the MCS stage runs for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct McsPlan {
    pub strategy: McsStrategy,
    pub match_rings: bool,
}

impl McsPlan {
    /// The flag triple recorded in the cache key. Bonds and atom types are
    /// never matched during MCS.
    pub fn key_flags(&self) -> MatcherFlags {
        MatcherFlags {
            match_bonds: false,
            match_rings: self.match_rings,
            match_atoms: false,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            match_rings: self.match_rings,
            ..EngineConfig::default()
        }
    }
}

impl Theory {
    /// | theory  | favourable              | fallback                 |
    /// |---------|-------------------------|--------------------------|
    /// | RINGS   | exhaustive, rings = hint | approximate, rings = hint |
    /// | MIN     | exhaustive, rings off   | approximate, rings off   |
    /// | DEFAULT | exhaustive, rings = hint | approximate, rings = hint |
    pub fn mcs_plan(&self, branch: McsBranch, has_perfect_rings: bool) -> McsPlan {
        let strategy = match branch {
            McsBranch::Favourable => McsStrategy::Exhaustive,
            McsBranch::Fallback => McsStrategy::Approximate,
        };
        let match_rings = match self {
            Theory::Min => false,
            Theory::Rings | Theory::Default => has_perfect_rings,
        };
        McsPlan {
            strategy,
            match_rings,
        }
    }
}

/// One ordered pair handed to the MCS stage.
#[derive(Debug, Clone, Copy)]
pub struct McsRequest<'a> {
    pub query: &'a Arc<MolecularGraph>,
    pub target: &'a Arc<MolecularGraph>,
    pub query_position: usize,
    pub target_position: usize,
    pub assessment: &'a PairAssessment,
    pub hints: RingHints,
    pub has_perfect_rings: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct McsSolver {
    pub theory: Theory,
    pub filters: ChemFilters,
    pub budget: usize,
}

impl McsSolver {
    pub fn new(theory: Theory, filters: ChemFilters) -> Self {
        McsSolver {
            theory,
            filters,
            budget: DEFAULT_EXPANSION_BUDGET,
        }
    }

    pub fn plan(&self, request: &McsRequest) -> McsPlan {
        self.theory
            .mcs_plan(McsBranch::from(request.assessment), request.has_perfect_rings)
    }

    /// Runs the planned strategy without touching any cache.
    pub fn compute(
        &self,
        query: &MolecularGraph,
        target: &MolecularGraph,
        plan: McsPlan,
    ) -> Result<EngineMatch, EngineError> {
        let config = plan.engine_config();
        match plan.strategy {
            McsStrategy::Exhaustive => ExhaustiveMcs::new(config, self.filters)
                .with_budget(self.budget)
                .find_mcs(query, target),
            McsStrategy::Approximate => {
                ApproximateMcs::new(config, self.filters).find_mcs(query, target)
            }
        }
    }

    /// Looks the pair up in `cache` first when one is given, and stores a
    /// freshly computed solution there unless another task got in first.
    pub fn solve(
        &self,
        request: &McsRequest,
        cache: Option<&ResultCache>,
    ) -> Result<MatchingSolution, EngineError> {
        let plan = self.plan(request);
        let key = cache.map(|_| {
            CacheKey::new(&KeyInputs {
                query: request.query,
                target: request.target,
                flags: plan.key_flags(),
                hints: request.hints,
            })
        });

        if let (Some(cache), Some(key)) = (cache, &key) {
            if let Some(stored) = cache.get(key) {
                debug!(
                    "Reusing cached MCS for {} / {}",
                    request.query.label(),
                    request.target.label()
                );
                return Ok(stored.rebind(
                    request.query_position,
                    request.target_position,
                    Arc::clone(request.query),
                    Arc::clone(request.target),
                ));
            }
        }

        debug!(
            "Running {} MCS on {} / {} (rings: {})",
            plan.strategy,
            request.query.label(),
            request.target.label(),
            plan.match_rings
        );
        let found = self.compute(request.query, request.target, plan)?;
        let solution = MatchingSolution {
            query_position: request.query_position,
            target_position: request.target_position,
            query: Arc::clone(request.query),
            target: Arc::clone(request.target),
            mapping: found.mapping,
            scores: found.scores,
            origin: MatchOrigin::Mcs(plan.strategy),
        };
        if let (Some(cache), Some(key)) = (cache, key) {
            cache.insert_if_absent(key, solution.clone());
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    #[test]
    fn test_plan_table() {
        use McsBranch::*;
        use McsStrategy::*;
        for perfect in [false, true] {
            for theory in [Theory::Rings, Theory::Default] {
                assert_eq!(
                    theory.mcs_plan(Favourable, perfect),
                    McsPlan {
                        strategy: Exhaustive,
                        match_rings: perfect
                    }
                );
                assert_eq!(
                    theory.mcs_plan(Fallback, perfect),
                    McsPlan {
                        strategy: Approximate,
                        match_rings: perfect
                    }
                );
            }
            assert!(!Theory::Min.mcs_plan(Favourable, perfect).match_rings);
            assert!(!Theory::Min.mcs_plan(Fallback, perfect).match_rings);
        }
    }

    #[test]
    fn test_solve_uses_and_fills_cache() {
        let mut query = parse_smiles("CCCCOCC").unwrap();
        query.set_id("ether");
        let mut target = parse_smiles("CCCCSCC").unwrap();
        target.set_id("thioether");
        let (query, target) = (Arc::new(query), Arc::new(target));
        let assessment = PairAssessment::assess(&query, &target);
        assert!(assessment.favourable);

        let request = McsRequest {
            query: &query,
            target: &target,
            query_position: 0,
            target_position: 1,
            assessment: &assessment,
            hints: RingHints::from_graphs(&query, &target),
            has_perfect_rings: false,
        };
        let solver = McsSolver::new(Theory::Default, ChemFilters::default());
        let cache = ResultCache::new();

        let first = solver.solve(&request, Some(&cache)).unwrap();
        assert_eq!(first.origin, MatchOrigin::Mcs(McsStrategy::Exhaustive));
        assert_eq!(first.mapped_atoms(), 6);
        assert_eq!(cache.len(), 1);

        let second = solver.solve(&request, Some(&cache)).unwrap();
        assert_eq!(second.origin, MatchOrigin::Cache);
        assert_eq!(second.mapping, first.mapping);
        assert_eq!(cache.stats().hits, 1);

        let uncached = solver.solve(&request, None).unwrap();
        assert_eq!(uncached.origin, MatchOrigin::Mcs(McsStrategy::Exhaustive));
        assert_eq!(cache.stats().hits + cache.stats().misses, 2);
    }
}
