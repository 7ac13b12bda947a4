//! Best-effort chemical normalization of input graphs: identifiers, atom
//! types and aromaticity.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::*;

use crate::{BondOrder, Hybridization, MolecularGraph, Name, PerceptionError, RingInfo};

static ANONYMOUS_GRAPHS: AtomicU64 = AtomicU64::new(0);

/// What normalization managed to do. Failures are collected, not raised, so
/// the caller decides whether a partially normalized graph is good enough.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationOutcome {
    pub errors: Vec<PerceptionError>,
    pub aromatic_rings: usize,
}

impl NormalizationOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fill in missing identifiers: atoms default to their index, anonymous graphs
/// get a process-unique `mol-<n>`.
pub fn assign_ids(graph: &mut MolecularGraph) {
    if graph.id().is_none() {
        let n = ANONYMOUS_GRAPHS.fetch_add(1, Ordering::Relaxed);
        graph.set_id(format!("mol-{n}"));
    }
    for (index, atom) in graph.atoms_mut().enumerate() {
        if atom.id.is_none() {
            atom.id = Some(Name::for_index(index));
        }
    }
}

fn hybridization_of(graph: &MolecularGraph, atom: usize) -> Option<Hybridization> {
    if graph.degree(atom) == 0 {
        return None;
    }
    let mut doubles = 0;
    let mut triple = false;
    let mut aromatic = graph.atom(atom).aromatic;
    for (_, order) in graph.bonded(atom) {
        match order {
            BondOrder::Double => doubles += 1,
            BondOrder::Triple => triple = true,
            BondOrder::Aromatic => aromatic = true,
            BondOrder::Single => {}
        }
    }
    Some(if triple || doubles >= 2 {
        Hybridization::Sp
    } else if doubles == 1 || aromatic {
        Hybridization::Sp2
    } else {
        Hybridization::Sp3
    })
}

/// Assigns hybridization and an atom-type name (`"C.sp3"`) to every bonded
/// atom. Atoms are typed even when an earlier atom failed; the first failure
/// is returned.
pub fn perceive_atom_types(graph: &mut MolecularGraph) -> Result<(), PerceptionError> {
    let mut first_error = None;
    for index in 0..graph.atom_count() {
        let half_units: u32 = graph.bonded(index).map(|(_, order)| order.half_units()).sum();
        let atom = graph.atom(index);
        let valence = (half_units + 1) / 2 + atom.hydrogens as u32;
        let max = atom.element.max_valence() + atom.charge.unsigned_abs() as u32;
        if valence > max && first_error.is_none() {
            first_error = Some(PerceptionError::ValenceExceeded {
                atom: index,
                symbol: atom.symbol(),
                valence,
                max,
            });
        }

        let hybridization = hybridization_of(graph, index);
        let symbol = atom.symbol();
        let atom = graph.atom_mut(index);
        atom.hybridization = hybridization;
        atom.atom_type = hybridization.map(|h| Name::new(&format!("{symbol}.{h}")));
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn is_aromatic_ring(
    graph: &MolecularGraph,
    rings: &RingInfo,
    ring: &[usize],
) -> Result<bool, PerceptionError> {
    let bonds: Vec<(usize, usize, BondOrder)> = (0..ring.len())
        .filter_map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
            graph.bond_between(a, b).map(|order| (a, b, order))
        })
        .collect();
    let aromatic_bonds = bonds.iter().filter(|(_, _, o)| *o == BondOrder::Aromatic).count();
    let double_bonds = bonds.iter().filter(|(_, _, o)| *o == BondOrder::Double).count();

    if aromatic_bonds == bonds.len() {
        return Ok(true);
    }
    if aromatic_bonds > 0 && double_bonds > 0 {
        return Err(PerceptionError::InconsistentAromaticRing(ring.to_vec()));
    }

    // Every ring atom needs one double bond that stays inside the ring system.
    let has_ring_double = |atom: usize| {
        graph
            .bonded(atom)
            .any(|(other, order)| order == BondOrder::Double && rings.is_ring_bond(atom, other))
    };
    match ring.len() {
        6 => Ok(double_bonds >= 2 && ring.iter().all(|&atom| has_ring_double(atom))),
        5 => {
            let donors: Vec<usize> = ring
                .iter()
                .copied()
                .filter(|&atom| !has_ring_double(atom))
                .collect();
            Ok(double_bonds == 2
                && donors.len() == 1
                && graph.atom(donors[0]).element.has_lone_pair()
                && graph.bonded(donors[0]).all(|(_, order)| order == BondOrder::Single))
        }
        _ => Ok(false),
    }
}

/// Marks five- and six-membered Hückel rings aromatic and rewrites their bonds
/// to [`BondOrder::Aromatic`]. Returns the number of aromatic rings.
pub fn detect_aromaticity(graph: &mut MolecularGraph) -> Result<usize, PerceptionError> {
    let rings = RingInfo::perceive(graph);
    let mut aromatic: Vec<Vec<usize>> = Vec::new();
    let mut first_error = None;
    for ring in rings.rings() {
        match is_aromatic_ring(graph, &rings, ring) {
            Ok(true) => aromatic.push(ring.clone()),
            Ok(false) => {}
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }

    for ring in &aromatic {
        for i in 0..ring.len() {
            let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
            graph.set_bond_order(a, b, BondOrder::Aromatic);
            graph.atom_mut(a).aromatic = true;
        }
    }
    for ring in &aromatic {
        for &atom in ring {
            let symbol = graph.atom(atom).symbol();
            let atom = graph.atom_mut(atom);
            atom.hybridization = Some(Hybridization::Sp2);
            atom.atom_type = Some(Name::new(&format!("{symbol}.{}", Hybridization::Sp2)));
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(aromatic.len()),
    }
}

/// Runs every normalization step, collecting failures instead of stopping.
pub fn normalize(graph: &mut MolecularGraph) -> NormalizationOutcome {
    let mut outcome = NormalizationOutcome::default();
    assign_ids(graph);
    if let Err(error) = perceive_atom_types(graph) {
        outcome.errors.push(error);
    }
    match detect_aromaticity(graph) {
        Ok(count) => outcome.aromatic_rings = count,
        Err(error) => outcome.errors.push(error),
    }
    debug!(
        "Normalized {}: {} aromatic rings, {} perception errors",
        graph.label(),
        outcome.aromatic_rings,
        outcome.errors.len()
    );
    outcome
}
