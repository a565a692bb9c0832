//! Filtrage des anneaux dégénérés après simplification
//!
//! Un anneau dont l'aire est sous le seuil est retiré. Un extérieur retiré
//! emporte tout le polygone; une feature sans géométrie restante est retirée
//! de sa collection. Les arcs qui ne sont plus référencés sont ensuite élagués.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use crate::feature::ArcReader;
use crate::simplify::WeightSystem;
use crate::types::{ArcPath, ArcRef, TopoGeometry, TopoObject, Topology};
use crate::TopologyError;

/// Politique de filtrage des anneaux
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RingFilter {
    /// Aucun anneau retiré
    #[default]
    None,
    /// Tout anneau sous le seuil est retiré
    All,
    /// Seuls les anneaux isolés (sans arc partagé) sont retirés
    Detached,
}

impl FromStr for RingFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RingFilter::None),
            "all" => Ok(RingFilter::All),
            "detached" => Ok(RingFilter::Detached),
            _ => Err(format!("Invalid ring filter: {}. Use: none, all, detached", s)),
        }
    }
}

impl RingFilter {
    pub fn name(self) -> &'static str {
        match self {
            RingFilter::None => "none",
            RingFilter::All => "all",
            RingFilter::Detached => "detached",
        }
    }

    /// Applique le filtre avec le seuil `min_weight` (aire d'anneau)
    pub fn apply(
        self,
        topology: Topology,
        min_weight: f64,
        system: WeightSystem,
    ) -> Result<Topology, TopologyError> {
        if self == RingFilter::None {
            return Ok(topology);
        }

        // Décisions calculées sur la topologie d'entrée, puis appliquées
        let owners = match self {
            RingFilter::Detached => Some(ArcOwners::collect(&topology)),
            _ => None,
        };
        let mut keep = |ring: &ArcPath, interior: bool| -> Result<bool, TopologyError> {
            if let Some(owners) = &owners {
                if owners.is_attached(ring) {
                    return Ok(true);
                }
            }
            let coords = ArcReader::new(&topology).ring(ring)?;
            Ok(system.ring_area(&coords, interior) >= min_weight)
        };

        let mut objects = std::collections::BTreeMap::new();
        for (name, object) in &topology.objects {
            let filtered = filter_object(object, &mut keep)?;
            objects.insert(name.clone(), filtered);
        }

        let filtered = Topology {
            bbox: topology.bbox,
            transform: topology.transform,
            arcs: topology.arcs,
            objects,
        };
        Ok(prune(filtered))
    }
}

type KeepRing<'a> = dyn FnMut(&ArcPath, bool) -> Result<bool, TopologyError> + 'a;

fn filter_object(object: &TopoObject, keep: &mut KeepRing<'_>) -> Result<TopoObject, TopologyError> {
    Ok(TopoObject {
        id: object.id.clone(),
        properties: object.properties.clone(),
        geometry: filter_geometry(&object.geometry, keep)?,
    })
}

fn filter_geometry(
    geometry: &TopoGeometry,
    keep: &mut KeepRing<'_>,
) -> Result<TopoGeometry, TopologyError> {
    let filtered = match geometry {
        TopoGeometry::Polygon(rings) => match filter_rings(rings, keep)? {
            Some(rings) => TopoGeometry::Polygon(rings),
            None => TopoGeometry::Null,
        },
        TopoGeometry::MultiPolygon(polygons) => {
            let mut kept = Vec::with_capacity(polygons.len());
            for rings in polygons {
                if let Some(rings) = filter_rings(rings, keep)? {
                    kept.push(rings);
                }
            }
            if kept.is_empty() {
                TopoGeometry::Null
            } else {
                TopoGeometry::MultiPolygon(kept)
            }
        }
        TopoGeometry::GeometryCollection(members) => {
            let mut kept = Vec::with_capacity(members.len());
            for member in members {
                let member = filter_object(member, keep)?;
                if !member.geometry.is_null() {
                    kept.push(member);
                }
            }
            TopoGeometry::GeometryCollection(kept)
        }
        other => other.clone(),
    };
    Ok(filtered)
}

/// Extérieur retiré → `None`; trous filtrés individuellement
fn filter_rings(
    rings: &[ArcPath],
    keep: &mut KeepRing<'_>,
) -> Result<Option<Vec<ArcPath>>, TopologyError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Ok(None);
    };
    if !keep(exterior, false)? {
        return Ok(None);
    }
    let mut kept = vec![exterior.clone()];
    for ring in interiors {
        if keep(ring, true)? {
            kept.push(ring.clone());
        }
    }
    Ok(Some(kept))
}

/// Propriétaire de chaque arc: un anneau unique, ou plusieurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Ring(usize),
    Shared,
}

struct ArcOwners {
    by_arc: HashMap<usize, Owner>,
}

impl ArcOwners {
    fn collect(topology: &Topology) -> Self {
        let mut owners = Self {
            by_arc: HashMap::new(),
        };
        let mut ring_index = 0;
        for object in topology.objects.values() {
            owners.scan(&object.geometry, &mut ring_index);
        }
        owners
    }

    fn scan(&mut self, geometry: &TopoGeometry, ring_index: &mut usize) {
        match geometry {
            TopoGeometry::Polygon(rings) => self.scan_rings(rings, ring_index),
            TopoGeometry::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.scan_rings(rings, ring_index);
                }
            }
            TopoGeometry::GeometryCollection(members) => {
                for member in members {
                    self.scan(&member.geometry, ring_index);
                }
            }
            _ => {}
        }
    }

    fn scan_rings(&mut self, rings: &[ArcPath], ring_index: &mut usize) {
        for ring in rings {
            for arc_ref in ring {
                self.by_arc
                    .entry(arc_ref.index)
                    .and_modify(|owner| {
                        if *owner != Owner::Ring(*ring_index) {
                            *owner = Owner::Shared;
                        }
                    })
                    .or_insert(Owner::Ring(*ring_index));
            }
            *ring_index += 1;
        }
    }

    /// Un anneau est rattaché s'il partage au moins un arc avec un autre anneau
    fn is_attached(&self, ring: &ArcPath) -> bool {
        ring.iter()
            .any(|arc_ref| self.by_arc.get(&arc_ref.index) == Some(&Owner::Shared))
    }
}

/// Supprime les arcs non référencés et renumérote les références
///
/// L'ordre relatif des arcs conservés est préservé.
pub fn prune(mut topology: Topology) -> Topology {
    let mut used = vec![false; topology.arcs.len()];
    for object in topology.objects.values() {
        object.geometry.for_each_arc_ref(&mut |r: ArcRef| used[r.index] = true);
    }

    let mut new_index = vec![usize::MAX; topology.arcs.len()];
    let mut arcs = Vec::with_capacity(topology.arcs.len());
    for (old, arc) in topology.arcs.into_iter().enumerate() {
        if used[old] {
            new_index[old] = arcs.len();
            arcs.push(arc);
        }
    }
    let removed = used.len() - arcs.len();
    topology.arcs = arcs;

    for object in topology.objects.values_mut() {
        object.geometry.map_arc_refs(&mut |r: ArcRef| ArcRef {
            index: new_index[r.index],
            reversed: r.reversed,
        });
    }

    if removed > 0 {
        debug!(removed, remaining = topology.arcs.len(), "Unused arcs pruned");
    }
    topology
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::TopologyBuilder;
    use crate::types::InputFeature;
    use geo::{polygon, Geometry};

    fn feature(id: &str, geometry: Geometry) -> InputFeature {
        InputFeature {
            id: Some(id.to_string()),
            properties: Default::default(),
            geometry: Some(geometry),
        }
    }

    fn members(topology: &Topology) -> &[TopoObject] {
        match &topology.object("data").unwrap().geometry {
            TopoGeometry::GeometryCollection(members) => members,
            _ => panic!("expected collection"),
        }
    }

    /// Grand carré Q1, petit carré adjacent Q2, îlot isolé Q3
    fn sample() -> Topology {
        let big = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 10.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 1.0),
            (x: 10.0, y: 0.0),
        ];
        let small = polygon![(x: 10.0, y: 0.0), (x: 10.0, y: 1.0), (x: 11.0, y: 1.0), (x: 11.0, y: 0.0)];
        let islet = polygon![(x: 20.0, y: 0.0), (x: 20.0, y: 1.0), (x: 21.0, y: 1.0), (x: 21.0, y: 0.0)];
        TopologyBuilder::new()
            .build(
                "data",
                vec![
                    feature("Q1", Geometry::Polygon(big)),
                    feature("Q2", Geometry::Polygon(small)),
                    feature("Q3", Geometry::Polygon(islet)),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_filter_none_is_identity() {
        let topology = sample();
        let arcs = topology.arcs.clone();
        let filtered = RingFilter::None
            .apply(topology, 5.0, WeightSystem::Planar)
            .unwrap();
        assert_eq!(filtered.arcs, arcs);
        assert_eq!(members(&filtered).len(), 3);
    }

    #[test]
    fn test_filter_all_removes_small_rings() {
        let filtered = RingFilter::All
            .apply(sample(), 5.0, WeightSystem::Planar)
            .unwrap();
        let ids: Vec<_> = members(&filtered)
            .iter()
            .map(|m| m.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["Q1"]);
        // Les arcs restants sont tous référencés
        let mut used = vec![false; filtered.arcs.len()];
        members(&filtered)[0]
            .geometry
            .for_each_arc_ref(&mut |r| used[r.index] = true);
        assert!(used.iter().all(|&u| u));
    }

    #[test]
    fn test_filter_detached_keeps_attached_rings() {
        let filtered = RingFilter::Detached
            .apply(sample(), 5.0, WeightSystem::Planar)
            .unwrap();
        let ids: Vec<_> = members(&filtered)
            .iter()
            .map(|m| m.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_prune_reindexes() {
        let mut topology = sample();
        topology.arcs.insert(0, vec![]);
        topology
            .objects
            .values_mut()
            .for_each(|o| o.geometry.map_arc_refs(&mut |r| ArcRef { index: r.index + 1, ..r }));
        let arc_count = topology.arcs.len();
        let pruned = prune(topology);
        assert_eq!(pruned.arcs.len(), arc_count - 1);
        assert!(!pruned.arcs[0].is_empty());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!("detached".parse::<RingFilter>(), Ok(RingFilter::Detached));
        assert!("some".parse::<RingFilter>().is_err());
    }
}
