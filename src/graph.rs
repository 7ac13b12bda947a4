use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::{Element, GraphError, Name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Bond-order units counted in halves, so an aromatic bond contributes 3.
    pub fn half_units(&self) -> u32 {
        match self {
            BondOrder::Single => 2,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Aromatic => 3,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            BondOrder::Single => '-',
            BondOrder::Double => '=',
            BondOrder::Triple => '#',
            BondOrder::Aromatic => ':',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hybridization {
    Sp,
    Sp2,
    Sp3,
}

impl Display for Hybridization {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Hybridization::Sp => write!(f, "sp"),
            Hybridization::Sp2 => write!(f, "sp2"),
            Hybridization::Sp3 => write!(f, "sp3"),
        }
    }
}

/// Tetrahedral parity as written in SMILES (`@` / `@@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chirality {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    /// Stable identifier; survives every duplication of the graph.
    pub id: Option<Name>,
    pub hybridization: Option<Hybridization>,
    pub atom_type: Option<Name>,
    pub aromatic: bool,
    pub charge: i8,
    pub hydrogens: u8,
    pub chirality: Option<Chirality>,
    pub map_class: Option<u32>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Atom {
            element,
            id: None,
            hybridization: None,
            atom_type: None,
            aromatic: false,
            charge: 0,
            hydrogens: 0,
            chirality: None,
            map_class: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Name>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol()
    }

    /// The perceived atom-type name when hybridization is known, else the
    /// plain element symbol.
    pub fn tag(&self) -> &str {
        match (&self.hybridization, &self.atom_type) {
            (Some(_), Some(atom_type)) => atom_type.as_str(),
            _ => self.symbol(),
        }
    }
}

impl From<Element> for Atom {
    fn from(element: Element) -> Self {
        Atom::new(element)
    }
}

pub type MoleculeGraph = UnGraph<Atom, BondOrder>;

/// A molecule as handed over by the loader: ordered atoms, bonds between them,
/// and an optional identifier.
#[derive(Debug, Clone, Default)]
pub struct MolecularGraph {
    id: Option<String>,
    graph: MoleculeGraph,
}

impl MolecularGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        MolecularGraph {
            id: Some(id.into()),
            graph: MoleculeGraph::default(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The identifier, or an empty string for anonymous graphs.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn add_atom(&mut self, atom: impl Into<Atom>) -> usize {
        self.graph.add_node(atom.into()).index()
    }

    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<(), GraphError> {
        let n = self.atom_count();
        for index in [a, b] {
            if index >= n {
                return Err(GraphError::AtomOutOfRange(index, n));
            }
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.bond_between(a, b).is_some() {
            return Err(GraphError::DuplicateBond(a, b));
        }
        self.graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), order);
        Ok(())
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn atom(&self, index: usize) -> &Atom {
        &self.graph[NodeIndex::new(index)]
    }

    pub fn atom_mut(&mut self, index: usize) -> &mut Atom {
        &mut self.graph[NodeIndex::new(index)]
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> + '_ {
        self.graph.node_weights()
    }

    pub fn atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> + '_ {
        self.graph.node_weights_mut()
    }

    /// Every bond as `(lower index, higher index, order)`.
    pub fn bonds(&self) -> impl Iterator<Item = (usize, usize, BondOrder)> + '_ {
        self.graph.edge_references().map(|edge| {
            let (a, b) = (edge.source().index(), edge.target().index());
            (a.min(b), a.max(b), *edge.weight())
        })
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<BondOrder> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|edge| self.graph[edge])
    }

    pub fn set_bond_order(&mut self, a: usize, b: usize, order: BondOrder) {
        if let Some(edge) = self.graph.find_edge(NodeIndex::new(a), NodeIndex::new(b)) {
            self.graph[edge] = order;
        }
    }

    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors(NodeIndex::new(index)).map(|n| n.index())
    }

    /// Neighbours together with the order of the connecting bond.
    pub fn bonded(&self, index: usize) -> impl Iterator<Item = (usize, BondOrder)> + '_ {
        let node = NodeIndex::new(index);
        self.graph.edges(node).map(move |edge| {
            let other = if edge.source() == node { edge.target() } else { edge.source() };
            (other.index(), *edge.weight())
        })
    }

    pub fn degree(&self, index: usize) -> usize {
        self.graph.neighbors(NodeIndex::new(index)).count()
    }

    /// Atom indices of each maximal connected subgraph, in order of each
    /// fragment's lowest atom index.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        let n = self.atom_count();
        let mut union_find = UnionFind::<usize>::new(n);
        for (a, b, _) in self.bonds() {
            union_find.union(a, b);
        }
        let mut by_root: BTreeMap<usize, usize> = BTreeMap::new();
        let mut fragments: Vec<Vec<usize>> = Vec::new();
        for atom in 0..n {
            let root = union_find.find(atom);
            let slot = *by_root.entry(root).or_insert_with(|| {
                fragments.push(Vec::new());
                fragments.len() - 1
            });
            fragments[slot].push(atom);
        }
        fragments
    }

    pub fn has_isolated_atom(&self) -> bool {
        self.fragments().iter().any(|fragment| fragment.len() == 1)
    }

    /// Number of independent cycles: bonds - atoms + fragments.
    pub fn circuit_rank(&self) -> usize {
        let fragments = self.fragments().len();
        (self.bond_count() + fragments).saturating_sub(self.atom_count())
    }

    pub fn symbol_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for atom in self.atoms() {
            *counts.entry(atom.symbol()).or_insert(0) += 1;
        }
        counts
    }

    /// Checks that the graph is simple and that atom identifiers are unique.
    pub fn validate(&self) -> Result<(), GraphError> {
        let malformed = |reason: String| GraphError::Malformed {
            graph: self.label().to_string(),
            reason,
        };
        let mut seen_bonds = BTreeSet::new();
        for (a, b, _) in self.bonds() {
            if a == b {
                return Err(malformed(format!("atom {a} is bonded to itself")));
            }
            if !seen_bonds.insert((a, b)) {
                return Err(malformed(format!("atoms {a} and {b} share more than one bond")));
            }
        }
        let mut seen_ids = BTreeSet::new();
        for atom in self.atoms() {
            if let Some(id) = &atom.id {
                if !seen_ids.insert(id.clone()) {
                    return Err(malformed(format!("atom id {id} is used twice")));
                }
            }
        }
        Ok(())
    }

    /// Deep copy that keeps the atom order, atom identifiers and graph id.
    pub fn duplicate(&self) -> Result<Self, GraphError> {
        self.validate()?;
        let mut graph = MoleculeGraph::with_capacity(self.atom_count(), self.bond_count());
        for atom in self.atoms() {
            graph.add_node(atom.clone());
        }
        for edge in self.graph.edge_references() {
            graph.add_edge(edge.source(), edge.target(), *edge.weight());
        }
        Ok(MolecularGraph {
            id: self.id.clone(),
            graph,
        })
    }

    pub fn as_petgraph(&self) -> &MoleculeGraph {
        &self.graph
    }
}

impl From<MoleculeGraph> for MolecularGraph {
    fn from(graph: MoleculeGraph) -> Self {
        MolecularGraph { id: None, graph }
    }
}
