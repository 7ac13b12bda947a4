//! Random small molecular graphs for property tests.

use quickcheck::{Arbitrary, Gen};

use crate::{Atom, BondOrder, Element, MolecularGraph};

const ELEMENTS: [Element; 5] = [Element::C, Element::C, Element::C, Element::N, Element::O];
const ORDERS: [BondOrder; 3] = [BondOrder::Single, BondOrder::Single, BondOrder::Double];

/// A graph of one to `max_atoms` atoms with random bonds, kept small so the
/// exact engines never run into their search limits.
#[derive(Debug, Clone)]
pub(crate) struct SmallGraph(pub MolecularGraph);

impl SmallGraph {
    pub fn generate(g: &mut Gen, max_atoms: usize) -> Self {
        let mut graph = MolecularGraph::new();
        let atoms = 1 + usize::arbitrary(g) % max_atoms;
        for _ in 0..atoms {
            let element = *g.choose(&ELEMENTS).unwrap_or(&Element::C);
            graph.add_atom(Atom::new(element));
        }
        let attempts = usize::arbitrary(g) % (2 * atoms + 1);
        for _ in 0..attempts {
            let a = usize::arbitrary(g) % atoms;
            let b = usize::arbitrary(g) % atoms;
            let order = *g.choose(&ORDERS).unwrap_or(&BondOrder::Single);
            // Self-loops and repeated bonds are refused; skipping them is fine.
            let _ = graph.add_bond(a, b, order);
        }
        SmallGraph(graph)
    }
}

impl Arbitrary for SmallGraph {
    fn arbitrary(g: &mut Gen) -> Self {
        SmallGraph::generate(g, 6)
    }
}

/// A graph pair where the target is usually the larger one.
#[derive(Debug, Clone)]
pub(crate) struct GraphPair {
    pub query: MolecularGraph,
    pub target: MolecularGraph,
}

impl Arbitrary for GraphPair {
    fn arbitrary(g: &mut Gen) -> Self {
        GraphPair {
            query: SmallGraph::generate(g, 4).0,
            target: SmallGraph::generate(g, 7).0,
        }
    }
}
