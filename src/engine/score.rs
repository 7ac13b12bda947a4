//! The three scores attached to every correspondence: bond energy change,
//! fragment count and stereo agreement.

use petgraph::unionfind::UnionFind;

use crate::{AtomMapping, BondOrder, Element, MolecularGraph};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scores {
    /// Energy of the bonds the correspondence breaks, forms or changes.
    pub energy: f64,
    /// Connected components of the mapped part of the query.
    pub fragments: usize,
    /// Agreement of conserved bond orders and tetrahedral parities.
    pub stereo: f64,
}

/// Approximate bond dissociation energies in kJ/mol.
pub fn bond_energy(a: Element, b: Element, order: BondOrder) -> f64 {
    use BondOrder::*;
    use Element::*;
    // The table lists each pair once, lighter element first.
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    match (a, b, order) {
        (H, C, _) => 411.0,
        (H, N, _) => 386.0,
        (H, O, _) => 459.0,
        (C, C, Single) => 346.0,
        (C, C, Double) => 602.0,
        (C, C, Triple) => 835.0,
        (C, C, Aromatic) => 518.0,
        (C, N, Single) => 305.0,
        (C, N, Double) => 615.0,
        (C, N, Triple) => 887.0,
        (C, N, Aromatic) => 460.0,
        (C, O, Single) => 358.0,
        (C, O, Double) => 799.0,
        (C, O, Aromatic) => 578.0,
        (C, F, _) => 485.0,
        (C, S, _) => 272.0,
        (C, Cl, _) => 327.0,
        (C, Br, _) => 285.0,
        (C, I, _) => 213.0,
        (N, N, Single) => 167.0,
        (N, N, Double) => 418.0,
        (N, N, Triple) => 942.0,
        (N, O, _) => 201.0,
        (O, O, _) => 142.0,
        (_, _, Single) => 300.0,
        (_, _, Double) => 550.0,
        (_, _, Triple) => 800.0,
        (_, _, Aromatic) => 450.0,
    }
}

fn bond_energy_in(graph: &MolecularGraph, a: usize, b: usize, order: BondOrder) -> f64 {
    bond_energy(graph.atom(a).element, graph.atom(b).element, order)
}

/// Scores a correspondence of `query` atoms onto `target` atoms.
pub fn score(query: &MolecularGraph, target: &MolecularGraph, mapping: &AtomMapping) -> Scores {
    let mut energy = 0.0;
    let mut stereo = 0.0;

    for (a, b, order) in query.bonds() {
        let image = mapping
            .target_of(a)
            .zip(mapping.target_of(b))
            .and_then(|(ta, tb)| target.bond_between(ta, tb).map(|t_order| (ta, tb, t_order)));
        match image {
            Some((_, _, t_order)) if t_order == order => stereo += 1.0,
            Some((ta, tb, t_order)) => {
                stereo -= 1.0;
                let before = bond_energy_in(query, a, b, order);
                let after = bond_energy_in(target, ta, tb, t_order);
                energy += (before - after).abs();
            }
            // Broken bond.
            None => energy += bond_energy_in(query, a, b, order),
        }
    }
    for (a, b, order) in target.bonds() {
        let conserved = mapping
            .query_of(a)
            .zip(mapping.query_of(b))
            .is_some_and(|(qa, qb)| query.bond_between(qa, qb).is_some());
        if !conserved {
            // Formed bond.
            energy += bond_energy_in(target, a, b, order);
        }
    }

    for (q, t) in mapping.pairs() {
        match (query.atom(q).chirality, target.atom(t).chirality) {
            (Some(x), Some(y)) if x == y => stereo += 1.0,
            (Some(_), Some(_)) => stereo -= 1.0,
            _ => {}
        }
    }

    Scores {
        energy,
        fragments: mapped_fragments(query, mapping),
        stereo,
    }
}

/// Connected components of the query subgraph induced by the mapped atoms.
pub fn mapped_fragments(query: &MolecularGraph, mapping: &AtomMapping) -> usize {
    if mapping.is_empty() {
        return 0;
    }
    let mut union_find = UnionFind::<usize>::new(query.atom_count());
    for (a, b, _) in query.bonds() {
        if mapping.target_of(a).is_some() && mapping.target_of(b).is_some() {
            union_find.union(a, b);
        }
    }
    let mut roots: Vec<usize> = mapping.query_atoms().map(|q| union_find.find(q)).collect();
    roots.sort_unstable();
    roots.dedup();
    roots.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    #[test]
    fn test_identity_scores() {
        let graph = parse_smiles("CCO").unwrap();
        let mapping = AtomMapping::from_pairs([(0, 0), (1, 1), (2, 2)]).unwrap();
        let scores = score(&graph, &graph, &mapping);
        assert_eq!(scores.energy, 0.0);
        assert_eq!(scores.fragments, 1);
        assert_eq!(scores.stereo, 2.0);
    }

    #[test]
    fn test_broken_and_changed_bonds() {
        let query = parse_smiles("CC=O").unwrap();
        let target = parse_smiles("CCO").unwrap();
        let mapping = AtomMapping::from_pairs([(0, 0), (1, 1), (2, 2)]).unwrap();
        let scores = score(&query, &target, &mapping);
        assert_eq!(scores.stereo, 0.0);
        assert_eq!(scores.energy, 799.0 - 358.0);

        // Leaving the oxygen out breaks C=O and forms C-O.
        let partial = AtomMapping::from_pairs([(0, 0), (1, 1)]).unwrap();
        let scores = score(&query, &target, &partial);
        assert_eq!(scores.energy, 799.0 + 358.0);
        assert_eq!(scores.stereo, 1.0);
    }

    #[test]
    fn test_fragment_count() {
        let query = parse_smiles("CCCCC").unwrap();
        let two_pieces = AtomMapping::from_pairs([(0, 0), (1, 1), (3, 3), (4, 4)]).unwrap();
        assert_eq!(mapped_fragments(&query, &two_pieces), 2);
        assert_eq!(mapped_fragments(&query, &AtomMapping::new()), 0);
    }

    #[test]
    fn test_chirality_pairs() {
        let left = parse_smiles("N[C@@H](C)C(=O)O").unwrap();
        let right = parse_smiles("N[C@H](C)C(=O)O").unwrap();
        let mapping = AtomMapping::from_pairs((0..6).map(|i| (i, i))).unwrap();
        let same = score(&left, &left, &mapping);
        let flipped = score(&left, &right, &mapping);
        assert_eq!(same.stereo - flipped.stereo, 2.0);
    }

    #[test]
    fn test_bond_energy_is_symmetric() {
        assert_eq!(
            bond_energy(Element::O, Element::C, BondOrder::Double),
            bond_energy(Element::C, Element::O, BondOrder::Double)
        );
    }
}
