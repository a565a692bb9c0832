//! Quantification des coordonnées sur une grille entière
//!
//! Les positions sont ramenées sur une grille de `n` × `n` couvrant l'emprise
//! de la topologie. Les positions consécutives confondues sont supprimées,
//! chaque arc gardant au moins deux positions.

use geo::Coord;
use tracing::debug;

use crate::types::{BBox, Topology, Transform};
use crate::TopologyError;

/// Quantifie la topologie avec un facteur `n` (ex: 10 000)
///
/// # Errors
///
/// `AlreadyQuantized` si la topologie porte déjà une transformation,
/// `InvalidQuantization` si `n < 2`.
pub fn quantize(mut topology: Topology, n: u64) -> Result<Topology, TopologyError> {
    if topology.transform.is_some() {
        return Err(TopologyError::AlreadyQuantized);
    }
    if n < 2 {
        return Err(TopologyError::InvalidQuantization(n));
    }

    let Some(bbox) = topology.bbox.or_else(|| compute_bbox(&topology)) else {
        // Aucune coordonnée: rien à quantifier
        return Ok(topology);
    };
    let transform = Transform::from_bbox(bbox, n);
    let before = topology.point_count();

    topology.arcs = topology
        .arcs
        .iter()
        .map(|arc| quantize_arc(arc, &transform))
        .collect();
    for object in topology.objects.values_mut() {
        object.geometry.map_points(&mut |c| transform.invert(c));
    }
    topology.bbox = Some(bbox);
    topology.transform = Some(transform);

    debug!(n, before, after = topology.point_count(), "Topology quantized");
    Ok(topology)
}

fn quantize_arc(arc: &[Coord], transform: &Transform) -> Vec<Coord> {
    let mut output: Vec<Coord> = Vec::with_capacity(arc.len());
    for &c in arc {
        let q = transform.invert(c);
        if output.last() != Some(&q) {
            output.push(q);
        }
    }
    if output.len() == 1 {
        output.push(output[0]);
    }
    output
}

fn compute_bbox(topology: &Topology) -> Option<BBox> {
    let mut bbox = None;
    for &c in topology.arcs.iter().flatten() {
        BBox::include(&mut bbox, c);
    }
    bbox
}
