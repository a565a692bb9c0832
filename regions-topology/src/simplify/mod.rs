//! Simplification de Visvalingam sur les arcs d'une topologie
//!
//! La simplification se fait en deux temps:
//! - `presimplify` calcule un poids par sommet (aire effective du triangle),
//!   rendu monotone pour qu'un sommet ne survive jamais à un sommet déjà retiré
//! - `Presimplified::simplify` retire les sommets dont le poids est sous le seuil
//!
//! Le seuil peut être absolu ou calibré sur un quantile de la distribution
//! des poids (`Presimplified::quantile`).

pub mod weight;

pub use weight::WeightSystem;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo::Coord;
use rayon::prelude::*;
use tracing::debug;

use crate::types::Topology;

/// Topologie dont chaque position porte un poids
///
/// `weights[i][j]` est le poids de `topology.arcs[i][j]`; les extrémités
/// d'arcs ont un poids infini et ne sont jamais retirées.
#[derive(Debug, Clone)]
pub struct Presimplified {
    topology: Topology,
    weights: Vec<Vec<f64>>,
}

/// Calcule les poids de tous les sommets de la topologie
pub fn presimplify(topology: Topology, system: WeightSystem) -> Presimplified {
    let transform = topology.transform;
    let weights: Vec<Vec<f64>> = topology
        .arcs
        .par_iter()
        .map(|arc| match transform {
            Some(t) => {
                let real: Vec<Coord> = arc.iter().map(|&c| t.apply(c)).collect();
                arc_weights(&real, system)
            }
            None => arc_weights(arc, system),
        })
        .collect();

    debug!(
        arcs = topology.arcs.len(),
        points = topology.point_count(),
        system = system.name(),
        "Topology presimplified"
    );

    Presimplified { topology, weights }
}

impl Presimplified {
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Poids correspondant au quantile `p` de la distribution
    ///
    /// Les poids finis sont triés par ordre décroissant: `p = 0.07` conserve
    /// environ 7 % des sommets, `p = 1` n'en retire aucun. Retourne 0 si
    /// aucun sommet intérieur n'existe.
    pub fn quantile(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self
            .weights
            .iter()
            .flatten()
            .copied()
            .filter(|w| w.is_finite())
            .collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(|a, b| b.total_cmp(a));

        let n = sorted.len();
        if p <= 0.0 || n < 2 {
            return sorted[0];
        }
        if p >= 1.0 {
            return sorted[n - 1];
        }
        let h = (n - 1) as f64 * p;
        let i = h.floor() as usize;
        let (a, b) = (sorted[i], sorted[i + 1]);
        a + (b - a) * (h - i as f64)
    }

    /// Retire les sommets dont le poids est strictement inférieur à `min_weight`
    pub fn simplify(self, min_weight: f64) -> Topology {
        let Presimplified {
            mut topology,
            weights,
        } = self;
        let before = topology.point_count();

        topology.arcs = topology
            .arcs
            .into_iter()
            .zip(weights)
            .map(|(arc, weights)| {
                arc.into_iter()
                    .zip(weights)
                    .filter(|&(_, w)| w >= min_weight)
                    .map(|(c, _)| c)
                    .collect()
            })
            .collect();

        debug!(
            min_weight,
            before,
            after = topology.point_count(),
            "Topology simplified"
        );
        topology
    }
}

/// Sommet candidat au retrait, ordonné par poids croissant
#[derive(Debug, Clone, Copy)]
struct Candidate {
    weight: f64,
    index: usize,
    version: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // BinaryHeap est un tas max: ordre inversé pour sortir le plus petit poids
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Poids de Visvalingam des sommets d'un arc
fn arc_weights(arc: &[Coord], system: WeightSystem) -> Vec<f64> {
    let n = arc.len();
    let mut weights = vec![f64::INFINITY; n];
    if n < 3 {
        return weights;
    }

    // Liste doublement chaînée des sommets restants
    let mut previous: Vec<usize> = (0..n).map(|i| i.saturating_sub(1)).collect();
    let mut next: Vec<usize> = (0..n).map(|i| (i + 1).min(n - 1)).collect();
    // Une entrée du tas est périmée si sa version ne correspond plus
    let mut version = vec![0u32; n];
    let mut heap = BinaryHeap::with_capacity(n);

    for i in 1..n - 1 {
        let weight = system.triangle_area([arc[i - 1], arc[i], arc[i + 1]]);
        weights[i] = weight;
        heap.push(Candidate {
            weight,
            index: i,
            version: 0,
        });
    }

    let mut max_weight = 0.0_f64;
    while let Some(candidate) = heap.pop() {
        let i = candidate.index;
        if candidate.version != version[i] {
            continue;
        }

        // Un sommet ne peut pas peser moins qu'un sommet retiré avant lui
        if candidate.weight < max_weight {
            weights[i] = max_weight;
        } else {
            max_weight = candidate.weight;
            weights[i] = candidate.weight;
        }

        let (p, q) = (previous[i], next[i]);
        next[p] = q;
        previous[q] = p;

        if p > 0 {
            version[p] += 1;
            let weight = system.triangle_area([arc[previous[p]], arc[p], arc[q]]);
            weights[p] = weight;
            heap.push(Candidate {
                weight,
                index: p,
                version: version[p],
            });
        }
        if q < n - 1 {
            version[q] += 1;
            let weight = system.triangle_area([arc[p], arc[q], arc[next[q]]]);
            weights[q] = weight;
            heap.push(Candidate {
                weight,
                index: q,
                version: version[q],
            });
        }
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn c(x: f64, y: f64) -> Coord {
        Coord { x, y }
    }

    fn topology_with(arcs: Vec<Vec<Coord>>) -> Topology {
        Topology {
            bbox: None,
            transform: None,
            arcs,
            objects: BTreeMap::new(),
        }
    }

    #[test]
    fn test_endpoints_are_infinite() {
        let weights = arc_weights(
            &[c(0.0, 0.0), c(1.0, 1.0), c(2.0, 0.0), c(3.0, 1.0)],
            WeightSystem::Planar,
        );
        assert!(weights[0].is_infinite());
        assert!(weights[3].is_infinite());
        assert!(weights[1].is_finite() && weights[2].is_finite());
    }

    #[test]
    fn test_short_arcs_have_no_interior_weight() {
        assert!(arc_weights(&[c(0.0, 0.0), c(1.0, 1.0)], WeightSystem::Planar)
            .iter()
            .all(|w| w.is_infinite()));
    }

    #[test]
    fn test_weights_are_monotone() {
        // Le petit pic (aire 1) part d'abord, ses voisins sont recalculés
        let arc = [c(0.0, 0.0), c(1.0, 1.0), c(2.0, 0.0), c(4.0, 4.0), c(6.0, 0.0)];
        let weights = arc_weights(&arc, WeightSystem::Planar);
        assert_eq!(&weights[1..4], &[1.0, 4.0, 12.0]);

        // Le sommet 2 devient aligné une fois le sommet 1 retiré: relevé à 2
        let arc = [c(0.0, 0.0), c(1.0, 2.0), c(2.0, 0.0), c(3.0, 0.0), c(4.0, 0.0)];
        let weights = arc_weights(&arc, WeightSystem::Planar);
        assert_eq!(&weights[1..4], &[2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_quantile_bounds() {
        let pre = presimplify(
            topology_with(vec![vec![
                c(0.0, 0.0),
                c(1.0, 1.0),
                c(2.0, 0.0),
                c(4.0, 4.0),
                c(6.0, 0.0),
            ]]),
            WeightSystem::Planar,
        );
        let finite: Vec<f64> = pre.weights()[0][1..4].to_vec();
        let max = finite.iter().cloned().fold(f64::MIN, f64::max);
        let min = finite.iter().cloned().fold(f64::MAX, f64::min);

        assert_eq!(pre.quantile(0.0), max);
        assert_eq!(pre.quantile(1.0), min);
        let mid = pre.quantile(0.5);
        assert!(mid >= min && mid <= max);
    }

    #[test]
    fn test_quantile_without_interior_points() {
        let pre = presimplify(
            topology_with(vec![vec![c(0.0, 0.0), c(1.0, 0.0)]]),
            WeightSystem::Spherical,
        );
        assert_eq!(pre.quantile(0.07), 0.0);
    }

    #[test]
    fn test_simplify_keeps_endpoints() {
        let arc = vec![c(0.0, 0.0), c(1.0, 0.1), c(2.0, 0.0), c(3.0, 5.0), c(4.0, 0.0)];
        let simplified = presimplify(topology_with(vec![arc]), WeightSystem::Planar)
            .simplify(f64::MAX);
        assert_eq!(simplified.arcs[0], vec![c(0.0, 0.0), c(4.0, 0.0)]);
    }

    #[test]
    fn test_quantile_one_keeps_everything() {
        let arc = vec![c(0.0, 0.0), c(1.0, 0.1), c(2.0, 0.0), c(3.0, 5.0), c(4.0, 0.0)];
        let pre = presimplify(topology_with(vec![arc.clone()]), WeightSystem::Planar);
        let threshold = pre.quantile(1.0);
        assert_eq!(pre.simplify(threshold).arcs[0], arc);
    }
}
