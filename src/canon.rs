//! Morgan label refinement and a canonical string for diagnostic log output.
//! Nothing here feeds into matching results.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::{Atom, MolecularGraph};

/// Computes a hash value for any hashable object.
fn compute_hash<T: Hash>(t: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    t.hash(&mut hasher);
    hasher.finish()
}

fn initial_label(atom: &Atom) -> u64 {
    compute_hash(&(
        atom.element.atomic_number(),
        atom.aromatic,
        atom.charge,
        atom.hydrogens,
    ))
}

fn class_count(labels: &[u64]) -> usize {
    labels.iter().collect::<BTreeSet<_>>().len()
}

/// Implements the Morgan algorithm for a molecular graph.
///
/// Labels are refined from each atom's neighbourhood until the number of
/// distinct classes stops growing or `max_iterations` is reached. Returns
/// one label per atom index.
pub fn morgan_algorithm(graph: &MolecularGraph, max_iterations: usize) -> Vec<u64> {
    let mut labels: Vec<u64> = graph.atoms().map(initial_label).collect();
    let mut classes = class_count(&labels);

    for _ in 0..max_iterations {
        let updated: Vec<u64> = (0..graph.atom_count())
            .map(|atom| {
                // Gather and sort the labels of neighbouring atoms.
                let mut neighbor_labels: Vec<(u64, u32)> = graph
                    .bonded(atom)
                    .map(|(other, order)| (labels[other], order.half_units()))
                    .collect();
                neighbor_labels.sort_unstable();
                compute_hash(&(labels[atom], neighbor_labels))
            })
            .collect();

        let updated_classes = class_count(&updated);
        if updated_classes <= classes {
            break;
        }
        labels = updated;
        classes = updated_classes;
    }
    labels
}

/// Atom indices sorted by Morgan label; the atom index breaks ties.
pub fn canonical_order(graph: &MolecularGraph) -> Vec<usize> {
    let labels = morgan_algorithm(graph, graph.atom_count().max(1));
    let mut order: Vec<usize> = (0..graph.atom_count()).collect();
    order.sort_by_key(|&atom| (labels[atom], atom));
    order
}

/// A line-notation-like string of the graph in canonical atom order, e.g.
/// `C.sp3 C.sp3 O.sp3|0-1 1-2`. Only meant for log output.
pub fn canonical_string(graph: &MolecularGraph) -> String {
    let order = canonical_order(graph);
    let mut rank = vec![0; graph.atom_count()];
    for (position, &atom) in order.iter().enumerate() {
        rank[atom] = position;
    }

    let atoms: Vec<&str> = order.iter().map(|&atom| graph.atom(atom).tag()).collect();
    let mut bonds: Vec<(usize, usize, char)> = graph
        .bonds()
        .map(|(a, b, order)| {
            let (x, y) = (rank[a], rank[b]);
            (x.min(y), x.max(y), order.symbol())
        })
        .collect();
    bonds.sort_unstable();

    let bonds: Vec<String> = bonds
        .into_iter()
        .map(|(a, b, symbol)| format!("{a}{symbol}{b}"))
        .collect();
    format!("{}|{}", atoms.join(" "), bonds.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    #[test]
    fn test_canonical_string_ignores_input_order() {
        let forward = parse_smiles("CCO").unwrap();
        let backward = parse_smiles("OCC").unwrap();
        assert_eq!(canonical_string(&forward), canonical_string(&backward));

        let acid = parse_smiles("CC(=O)O").unwrap();
        let reordered = parse_smiles("OC(=O)C").unwrap();
        assert_eq!(canonical_string(&acid), canonical_string(&reordered));
    }

    #[test]
    fn test_morgan_separates_environments() {
        let graph = parse_smiles("CCCO").unwrap();
        let labels = morgan_algorithm(&graph, 10);
        let distinct: BTreeSet<u64> = labels.iter().copied().collect();
        assert_eq!(distinct.len(), 4);

        // Symmetric ends of propane share a label.
        let propane = parse_smiles("CCC").unwrap();
        let labels = morgan_algorithm(&propane, 10);
        assert_eq!(labels[0], labels[2]);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(canonical_string(&MolecularGraph::new()), "|");
    }
}
