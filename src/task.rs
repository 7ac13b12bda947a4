//! The matching task: one ordered (query, target) pair taken through the
//! prefilter, the substructure cascade and the MCS stage.

use std::sync::Arc;

use tracing::*;

use crate::{
    canonical_string, embedding_attempts, normalize, ChemFilters, MappingError, MatchingSolution,
    McsRequest, McsSolver, MolecularGraph, NormalizationOutcome, PairAssessment, ResultCache,
    SubstructureMatcher, Theory, DEFAULT_EXPANSION_BUDGET,
};

/// The per-run matcher flags. Bond and ring flags are recorded for the run;
/// the atom flag makes the exact-embedding stage compare atom types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MatcherFlags {
    pub match_bonds: bool,
    pub match_rings: bool,
    pub match_atoms: bool,
}

/// Independent cycle counts of the two graphs of a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RingHints {
    pub query_cycles: usize,
    pub target_cycles: usize,
}

impl RingHints {
    pub fn from_graphs(query: &MolecularGraph, target: &MolecularGraph) -> Self {
        RingHints {
            query_cycles: query.circuit_rank(),
            target_cycles: target.circuit_rank(),
        }
    }

    pub fn both_cyclic(&self) -> bool {
        self.query_cycles > 0 && self.target_cycles > 0
    }
}

/// One unit of work: an ordered pair of graphs and everything needed to
/// produce a single [`MatchingSolution`] for it.
///
/// The task works on its own normalized duplicates of the graphs it was
/// given; the caller's graphs are never touched.
#[derive(Debug, Clone)]
pub struct MatchingTask {
    query: Arc<MolecularGraph>,
    target: Arc<MolecularGraph>,
    query_position: usize,
    target_position: usize,
    flags: MatcherFlags,
    theory: Theory,
    filters: ChemFilters,
    hints: RingHints,
    has_perfect_rings: bool,
    mcs_budget: usize,
    normalization: (NormalizationOutcome, NormalizationOutcome),
    cache: Arc<ResultCache>,
}

fn prepare(graph: &MolecularGraph) -> Result<(MolecularGraph, NormalizationOutcome), MappingError> {
    let mut copy = graph.duplicate()?;
    let outcome = normalize(&mut copy);
    for error in &outcome.errors {
        warn!("Normalization of {} incomplete: {}", copy.label(), error);
    }
    Ok((copy, outcome))
}

impl MatchingTask {
    /// Duplicates and normalizes both graphs. A graph that cannot be
    /// duplicated fails the task; normalization problems are only logged and
    /// can be inspected with [`MatchingTask::normalization`]. Tied candidates
    /// are ranked by all three chemical filters until
    /// [`MatchingTask::set_filters`] says otherwise.
    pub fn new(
        query: &MolecularGraph,
        target: &MolecularGraph,
        query_position: usize,
        target_position: usize,
        flags: MatcherFlags,
        theory: Theory,
        cache: Arc<ResultCache>,
    ) -> Result<Self, MappingError> {
        let (query, query_outcome) = prepare(query)?;
        let (target, target_outcome) = prepare(target)?;
        let hints = RingHints::from_graphs(&query, &target);
        Ok(MatchingTask {
            query: Arc::new(query),
            target: Arc::new(target),
            query_position,
            target_position,
            flags,
            theory,
            filters: ChemFilters::all(),
            hints,
            has_perfect_rings: false,
            mcs_budget: DEFAULT_EXPANSION_BUDGET,
            normalization: (query_outcome, target_outcome),
            cache,
        })
    }

    /// Rejects the task if normalization of either graph reported a problem.
    pub fn require_clean_normalization(self) -> Result<Self, MappingError> {
        let (query, target) = &self.normalization;
        if let Some(error) = query.errors.first().or(target.errors.first()) {
            return Err(MappingError::Normalization(error.clone()));
        }
        Ok(self)
    }

    pub fn set_filters(&mut self, filters: ChemFilters) {
        self.filters = filters;
    }

    /// Overrides the cycle counts taken from the graphs at construction.
    pub fn set_ring_hints(&mut self, hints: RingHints) {
        self.hints = hints;
    }

    pub fn set_has_perfect_rings(&mut self, has_perfect_rings: bool) {
        self.has_perfect_rings = has_perfect_rings;
    }

    pub fn set_mcs_budget(&mut self, budget: usize) {
        self.mcs_budget = budget;
    }

    pub fn query(&self) -> &Arc<MolecularGraph> {
        &self.query
    }

    pub fn target(&self) -> &Arc<MolecularGraph> {
        &self.target
    }

    pub fn positions(&self) -> (usize, usize) {
        (self.query_position, self.target_position)
    }

    pub fn flags(&self) -> MatcherFlags {
        self.flags
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    pub fn filters(&self) -> ChemFilters {
        self.filters
    }

    pub fn ring_hints(&self) -> RingHints {
        self.hints
    }

    pub fn normalization(&self) -> (&NormalizationOutcome, &NormalizationOutcome) {
        (&self.normalization.0, &self.normalization.1)
    }

    pub fn assess(&self) -> PairAssessment {
        PairAssessment::assess(&self.query, &self.target)
    }

    fn substructure_matcher(&self) -> SubstructureMatcher {
        SubstructureMatcher::new(
            embedding_attempts(self.theory, self.hints, self.has_perfect_rings),
            self.filters,
            self.flags.match_atoms,
        )
    }

    fn mcs_solver(&self) -> McsSolver {
        McsSolver {
            budget: self.mcs_budget,
            ..McsSolver::new(self.theory, self.filters)
        }
    }

    fn mcs_request<'a>(&'a self, assessment: &'a PairAssessment) -> McsRequest<'a> {
        McsRequest {
            query: &self.query,
            target: &self.target,
            query_position: self.query_position,
            target_position: self.target_position,
            assessment,
            hints: self.hints,
            has_perfect_rings: self.has_perfect_rings,
        }
    }

    fn log_engine_error(&self, error: &MappingError) {
        error!(
            "Matching {} against {} failed: {}",
            self.query.label(),
            self.target.label(),
            error
        );
    }

    /// Runs the prefilter, the substructure cascade in both directions and,
    /// when no total embedding exists, the cached MCS stage.
    pub fn execute(&self) -> Result<MatchingSolution, MappingError> {
        self.run().inspect_err(|error| self.log_engine_error(error))
    }

    fn run(&self) -> Result<MatchingSolution, MappingError> {
        let assessment = self.assess();
        if enabled!(Level::DEBUG) {
            debug!(
                "Matching {} [{}] against {} [{}], {} theory, {:?}",
                self.query.label(),
                canonical_string(&self.query),
                self.target.label(),
                canonical_string(&self.target),
                self.theory,
                self.flags
            );
        }

        if assessment.connected {
            let matcher = self.substructure_matcher();
            if let Some((found, origin)) =
                matcher.find_total_match(&self.query, &self.target, &assessment)?
            {
                return Ok(MatchingSolution {
                    query_position: self.query_position,
                    target_position: self.target_position,
                    query: Arc::clone(&self.query),
                    target: Arc::clone(&self.target),
                    mapping: found.mapping,
                    scores: found.scores,
                    origin,
                });
            }
            debug!("No total embedding between {} and {}", self.query.label(), self.target.label());
        } else {
            debug!(
                "Isolated atom in {} or {}, skipping substructure search",
                self.query.label(),
                self.target.label()
            );
        }

        let request = self.mcs_request(&assessment);
        Ok(self.mcs_solver().solve(&request, Some(self.cache.as_ref()))?)
    }

    /// The MCS stage alone, bypassing the cache.
    pub fn compute_mcs(&self) -> Result<MatchingSolution, MappingError> {
        let assessment = self.assess();
        let request = self.mcs_request(&assessment);
        self.mcs_solver()
            .solve(&request, None)
            .map_err(MappingError::from)
            .inspect_err(|error| self.log_engine_error(error))
    }
}
