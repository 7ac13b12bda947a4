use std::collections::BTreeMap;

use crate::{EngineError, MolecularGraph, Name};

/// A partial bijection from query atom indices to target atom indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AtomMapping {
    forward: BTreeMap<usize, usize>,
    backward: BTreeMap<usize, usize>,
}

impl AtomMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(query, target)` pairs, failing if either side
    /// repeats an atom.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Result<Self, EngineError> {
        let mut mapping = Self::new();
        for (query, target) in pairs {
            mapping.insert(query, target)?;
        }
        Ok(mapping)
    }

    pub fn insert(&mut self, query: usize, target: usize) -> Result<(), EngineError> {
        if self.forward.contains_key(&query) {
            return Err(EngineError::NonBijective(query));
        }
        if self.backward.contains_key(&target) {
            return Err(EngineError::NonBijective(target));
        }
        self.forward.insert(query, target);
        self.backward.insert(target, query);
        Ok(())
    }

    pub fn target_of(&self, query: usize) -> Option<usize> {
        self.forward.get(&query).copied()
    }

    pub fn query_of(&self, target: usize) -> Option<usize> {
        self.backward.get(&target).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Pairs in ascending query order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.forward.iter().map(|(&q, &t)| (q, t))
    }

    pub fn query_atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.forward.keys().copied()
    }

    /// The same correspondence seen from the other side.
    pub fn inverted(&self) -> Self {
        AtomMapping {
            forward: self.backward.clone(),
            backward: self.forward.clone(),
        }
    }

    /// Pairs of atom identifiers, for reporting.
    pub fn id_pairs(&self, query: &MolecularGraph, target: &MolecularGraph) -> Vec<(Name, Name)> {
        let id = |graph: &MolecularGraph, index: usize| {
            graph.atom(index).id.clone().unwrap_or_else(|| Name::for_index(index))
        };
        self.pairs()
            .map(|(q, t)| (id(query, q), id(target, t)))
            .collect()
    }
}
