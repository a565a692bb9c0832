//! Reconstruction des géométries à partir des arcs

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};

use crate::types::{ArcPath, Properties, TopoGeometry, TopoObject, Topology};
use crate::TopologyError;

/// Une feature reconstruite
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFeature {
    pub id: Option<String>,
    pub properties: Option<Properties>,
    pub geometry: Option<Geometry>,
}

/// Reconstruit les features d'un objet de la topologie
///
/// Une `GeometryCollection` donne une feature par membre, tout autre objet
/// une seule feature.
pub fn features(topology: &Topology, object_name: &str) -> Result<Vec<OutputFeature>, TopologyError> {
    let object = topology
        .object(object_name)
        .ok_or_else(|| TopologyError::UnknownObject(object_name.to_string()))?;
    let reader = ArcReader::new(topology);

    match &object.geometry {
        TopoGeometry::GeometryCollection(members) => {
            members.iter().map(|member| reader.feature(member)).collect()
        }
        _ => Ok(vec![reader.feature(object)?]),
    }
}

/// Lecture des arcs en coordonnées réelles (transformation appliquée)
pub struct ArcReader<'a> {
    topology: &'a Topology,
}

impl<'a> ArcReader<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        Self { topology }
    }

    fn point(&self, c: Coord) -> Coord {
        match &self.topology.transform {
            Some(t) => t.apply(c),
            None => c,
        }
    }

    /// Concatène les arcs d'un chemin (le point de raccord n'est pas dupliqué)
    pub fn line(&self, path: &[crate::ArcRef]) -> Result<Vec<Coord>, TopologyError> {
        let mut points: Vec<Coord> = Vec::new();
        for arc_ref in path {
            let arc = self.topology.arcs.get(arc_ref.index).ok_or(
                TopologyError::ArcOutOfBounds {
                    index: arc_ref.index,
                    count: self.topology.arcs.len(),
                },
            )?;
            points.pop();
            let start = points.len();
            points.extend(arc.iter().map(|&c| self.point(c)));
            if arc_ref.reversed {
                points[start..].reverse();
            }
        }
        if points.len() == 1 {
            points.push(points[0]);
        }
        Ok(points)
    }

    /// Anneau fermé, complété à au moins 4 positions
    pub fn ring(&self, path: &[crate::ArcRef]) -> Result<Vec<Coord>, TopologyError> {
        let mut points = self.line(path)?;
        if let Some(&first) = points.first() {
            while points.len() < 4 {
                points.push(first);
            }
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[ArcPath]) -> Result<Polygon, TopologyError> {
        let mut rings = rings
            .iter()
            .map(|ring| self.ring(ring).map(LineString::new));
        let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(vec![]));
        let interiors = rings.collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    /// Géométrie d'un objet, `None` pour une géométrie nulle
    pub fn geometry(&self, geometry: &TopoGeometry) -> Result<Option<Geometry>, TopologyError> {
        let geometry = match geometry {
            TopoGeometry::Null => return Ok(None),
            TopoGeometry::Point(c) => Geometry::Point(Point(self.point(*c))),
            TopoGeometry::MultiPoint(cs) => Geometry::MultiPoint(MultiPoint(
                cs.iter().map(|&c| Point(self.point(c))).collect(),
            )),
            TopoGeometry::LineString(path) => Geometry::LineString(LineString::new(self.line(path)?)),
            TopoGeometry::MultiLineString(paths) => Geometry::MultiLineString(MultiLineString(
                paths
                    .iter()
                    .map(|path| self.line(path).map(LineString::new))
                    .collect::<Result<_, _>>()?,
            )),
            TopoGeometry::Polygon(rings) => Geometry::Polygon(self.polygon(rings)?),
            TopoGeometry::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| self.polygon(rings))
                    .collect::<Result<_, _>>()?,
            )),
            TopoGeometry::GeometryCollection(members) => {
                let mut geometries = Vec::with_capacity(members.len());
                for member in members {
                    if let Some(g) = self.geometry(&member.geometry)? {
                        geometries.push(g);
                    }
                }
                Geometry::GeometryCollection(GeometryCollection(geometries))
            }
        };
        Ok(Some(geometry))
    }

    fn feature(&self, object: &TopoObject) -> Result<OutputFeature, TopologyError> {
        Ok(OutputFeature {
            id: object.id.clone(),
            properties: object.properties.clone(),
            geometry: self.geometry(&object.geometry)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArcRef, Transform};
    use std::collections::BTreeMap;

    fn c(x: f64, y: f64) -> Coord {
        Coord { x, y }
    }

    fn two_arc_topology() -> Topology {
        let ring = TopoObject {
            id: Some("Q1".into()),
            properties: None,
            geometry: TopoGeometry::Polygon(vec![vec![ArcRef::forward(0), ArcRef::backward(1)]]),
        };
        let mut objects = BTreeMap::new();
        objects.insert(
            "data".to_string(),
            TopoObject::anonymous(TopoGeometry::GeometryCollection(vec![ring])),
        );
        Topology {
            bbox: None,
            transform: None,
            arcs: vec![
                vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)],
                vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)],
            ],
            objects,
        }
    }

    #[test]
    fn test_line_joins_arcs_without_duplicates() {
        let topology = two_arc_topology();
        let reader = ArcReader::new(&topology);
        let ring = reader
            .ring(&[ArcRef::forward(0), ArcRef::backward(1)])
            .unwrap();
        assert_eq!(
            ring,
            vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)]
        );
    }

    #[test]
    fn test_collapsed_ring_is_padded() {
        let mut topology = two_arc_topology();
        topology.arcs = vec![vec![c(2.0, 2.0), c(2.0, 2.0)]];
        let reader = ArcReader::new(&topology);
        let ring = reader.ring(&[ArcRef::forward(0)]).unwrap();
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_features_apply_transform() {
        let mut topology = two_arc_topology();
        topology.transform = Some(Transform {
            scale: [0.5, 0.5],
            translate: [10.0, 20.0],
        });
        let features = features(&topology, "data").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id.as_deref(), Some("Q1"));
        let Some(Geometry::Polygon(p)) = &features[0].geometry else {
            panic!("expected polygon");
        };
        assert_eq!(p.exterior().0[1], c(10.5, 20.0));
    }

    #[test]
    fn test_unknown_object() {
        let topology = two_arc_topology();
        assert!(matches!(
            features(&topology, "missing"),
            Err(TopologyError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_arc_out_of_bounds() {
        let topology = two_arc_topology();
        let reader = ArcReader::new(&topology);
        assert!(reader.line(&[ArcRef::forward(5)]).is_err());
    }
}
