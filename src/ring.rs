//! Ring perception: ring membership, smallest ring sizes and a smallest set of
//! smallest rings.

use std::collections::{BTreeSet, VecDeque};

use crate::MolecularGraph;

/// Ring facts about one graph, computed once and looked up by atom index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingInfo {
    ring_atoms: Vec<bool>,
    ring_bonds: BTreeSet<(usize, usize)>,
    smallest_ring: Vec<Option<usize>>,
    rings: Vec<Vec<usize>>,
}

impl RingInfo {
    pub fn perceive(graph: &MolecularGraph) -> Self {
        let n = graph.atom_count();
        let mut ring_bonds = BTreeSet::new();
        let mut rings: Vec<Vec<usize>> = Vec::new();

        for (a, b, _) in graph.bonds() {
            // A bond lies on a ring exactly when its ends stay connected without it.
            if let Some(path) = shortest_path_avoiding(graph, a, b) {
                ring_bonds.insert((a, b));
                let mut ring = path;
                normalize_ring(&mut ring);
                if !rings.contains(&ring) {
                    rings.push(ring);
                }
            }
        }

        rings.sort_by(|x, y| x.len().cmp(&y.len()).then_with(|| x.cmp(y)));
        rings.truncate(graph.circuit_rank());

        let mut ring_atoms = vec![false; n];
        for &(a, b) in &ring_bonds {
            ring_atoms[a] = true;
            ring_atoms[b] = true;
        }

        let mut smallest_ring = vec![None; n];
        for ring in &rings {
            for &atom in ring {
                let size = smallest_ring[atom].map_or(ring.len(), |s: usize| s.min(ring.len()));
                smallest_ring[atom] = Some(size);
            }
        }
        // Ring atoms left out of the truncated set still get a size.
        for (a, b) in ring_bonds.iter().copied() {
            for atom in [a, b] {
                if smallest_ring[atom].is_none() {
                    smallest_ring[atom] =
                        shortest_path_avoiding(graph, a, b).map(|path| path.len());
                }
            }
        }

        RingInfo {
            ring_atoms,
            ring_bonds,
            smallest_ring,
            rings,
        }
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.ring_atoms.get(atom).copied().unwrap_or(false)
    }

    pub fn is_ring_bond(&self, a: usize, b: usize) -> bool {
        self.ring_bonds.contains(&(a.min(b), a.max(b)))
    }

    /// Size of the smallest ring through `atom`, if any.
    pub fn smallest_ring_size(&self, atom: usize) -> Option<usize> {
        self.smallest_ring.get(atom).copied().flatten()
    }

    /// The smallest set of smallest rings, each as an ordered atom cycle.
    pub fn rings(&self) -> &[Vec<usize>] {
        &self.rings
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }
}

/// BFS path from `from` to `to` (both included) that does not use the direct
/// bond between them.
fn shortest_path_avoiding(graph: &MolecularGraph, from: usize, to: usize) -> Option<Vec<usize>> {
    let n = graph.atom_count();
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    visited[from] = true;
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        let mut neighbors: Vec<usize> = graph.neighbors(current).collect();
        neighbors.sort_unstable();
        for next in neighbors {
            if current == from && next == to {
                continue;
            }
            if visited[next] {
                continue;
            }
            visited[next] = true;
            parent[next] = Some(current);
            if next == to {
                let mut path = vec![to];
                let mut walk = to;
                while let Some(p) = parent[walk] {
                    path.push(p);
                    walk = p;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Rotate so the smallest atom comes first and pick the direction with the
/// smaller second atom.
fn normalize_ring(ring: &mut Vec<usize>) {
    if ring.is_empty() {
        return;
    }
    let start = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, atom)| *atom)
        .map(|(i, _)| i)
        .unwrap_or(0);
    ring.rotate_left(start);
    if ring.len() > 2 && ring[ring.len() - 1] < ring[1] {
        ring[1..].reverse();
    }
}
