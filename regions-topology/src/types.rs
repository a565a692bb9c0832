//! Types de données pour le crate regions-topology

use std::collections::BTreeMap;

use geo::{Coord, Geometry};
use serde_json::{Map, Value};

/// Propriétés d'une feature (objet JSON)
pub type Properties = Map<String, Value>;

/// Une feature en entrée de la construction de topologie
#[derive(Debug, Clone, Default)]
pub struct InputFeature {
    /// Identifiant de la feature (ex: "Q30")
    pub id: Option<String>,

    /// Attributs de la feature
    pub properties: Properties,

    /// Géométrie, `None` pour une géométrie nulle
    pub geometry: Option<Geometry>,
}

/// Référence vers un arc, éventuellement parcouru à l'envers
///
/// En TopoJSON, un arc inversé est encodé par le complément à un de son index (`!i`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcRef {
    pub index: usize,
    pub reversed: bool,
}

impl ArcRef {
    pub fn forward(index: usize) -> Self {
        Self {
            index,
            reversed: false,
        }
    }

    pub fn backward(index: usize) -> Self {
        Self {
            index,
            reversed: true,
        }
    }

    /// Encodage TopoJSON (`i` ou `!i`)
    pub fn to_signed(self) -> i64 {
        let index = self.index as i64;
        if self.reversed {
            !index
        } else {
            index
        }
    }
}

/// Anneau ou ligne: suite de références d'arcs
pub type ArcPath = Vec<ArcRef>;

/// Emprise (min, max)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Coord,
    pub max: Coord,
}

impl BBox {
    pub fn from_coord(c: Coord) -> Self {
        Self { min: c, max: c }
    }

    pub fn extend(&mut self, c: Coord) {
        self.min.x = self.min.x.min(c.x);
        self.min.y = self.min.y.min(c.y);
        self.max.x = self.max.x.max(c.x);
        self.max.y = self.max.y.max(c.y);
    }

    /// Étend une emprise optionnelle (création au premier point)
    pub fn include(bbox: &mut Option<BBox>, c: Coord) {
        match bbox {
            Some(b) => b.extend(c),
            None => *bbox = Some(BBox::from_coord(c)),
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }
}

/// Transformation de quantification: `réel = grille * scale + translate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    /// Grille de `n` × `n` positions couvrant l'emprise
    pub fn from_bbox(bbox: BBox, n: u64) -> Self {
        let steps = (n - 1) as f64;
        let dx = bbox.max.x - bbox.min.x;
        let dy = bbox.max.y - bbox.min.y;
        Self {
            scale: [
                if dx != 0.0 { dx / steps } else { 1.0 },
                if dy != 0.0 { dy / steps } else { 1.0 },
            ],
            translate: [bbox.min.x, bbox.min.y],
        }
    }

    /// Coordonnée de grille → coordonnée réelle
    pub fn apply(&self, c: Coord) -> Coord {
        Coord {
            x: c.x * self.scale[0] + self.translate[0],
            y: c.y * self.scale[1] + self.translate[1],
        }
    }

    /// Coordonnée réelle → position entière sur la grille
    pub fn invert(&self, c: Coord) -> Coord {
        Coord {
            x: ((c.x - self.translate[0]) / self.scale[0]).round(),
            y: ((c.y - self.translate[1]) / self.scale[1]).round(),
        }
    }
}

/// Géométrie topologique (les lignes et anneaux référencent des arcs)
#[derive(Debug, Clone, PartialEq)]
pub enum TopoGeometry {
    Null,
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(ArcPath),
    MultiLineString(Vec<ArcPath>),
    Polygon(Vec<ArcPath>),
    MultiPolygon(Vec<Vec<ArcPath>>),
    GeometryCollection(Vec<TopoObject>),
}

impl TopoGeometry {
    pub fn is_null(&self) -> bool {
        matches!(self, TopoGeometry::Null)
    }

    /// Nom du type TopoJSON
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            TopoGeometry::Null => None,
            TopoGeometry::Point(_) => Some("Point"),
            TopoGeometry::MultiPoint(_) => Some("MultiPoint"),
            TopoGeometry::LineString(_) => Some("LineString"),
            TopoGeometry::MultiLineString(_) => Some("MultiLineString"),
            TopoGeometry::Polygon(_) => Some("Polygon"),
            TopoGeometry::MultiPolygon(_) => Some("MultiPolygon"),
            TopoGeometry::GeometryCollection(_) => Some("GeometryCollection"),
        }
    }

    /// Visite toutes les références d'arcs
    pub fn for_each_arc_ref(&self, f: &mut impl FnMut(ArcRef)) {
        match self {
            TopoGeometry::Null | TopoGeometry::Point(_) | TopoGeometry::MultiPoint(_) => {}
            TopoGeometry::LineString(path) => path.iter().copied().for_each(&mut *f),
            TopoGeometry::MultiLineString(paths) | TopoGeometry::Polygon(paths) => {
                paths.iter().flatten().copied().for_each(&mut *f)
            }
            TopoGeometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().copied().for_each(&mut *f)
            }
            TopoGeometry::GeometryCollection(objects) => {
                for object in objects {
                    object.geometry.for_each_arc_ref(f);
                }
            }
        }
    }

    /// Réécrit toutes les références d'arcs
    pub fn map_arc_refs(&mut self, f: &mut impl FnMut(ArcRef) -> ArcRef) {
        match self {
            TopoGeometry::Null | TopoGeometry::Point(_) | TopoGeometry::MultiPoint(_) => {}
            TopoGeometry::LineString(path) => path.iter_mut().for_each(|r| *r = f(*r)),
            TopoGeometry::MultiLineString(paths) | TopoGeometry::Polygon(paths) => paths
                .iter_mut()
                .flatten()
                .for_each(|r| *r = f(*r)),
            TopoGeometry::MultiPolygon(polygons) => polygons
                .iter_mut()
                .flatten()
                .flatten()
                .for_each(|r| *r = f(*r)),
            TopoGeometry::GeometryCollection(objects) => {
                for object in objects {
                    object.geometry.map_arc_refs(f);
                }
            }
        }
    }

    /// Réécrit toutes les positions portées directement (points)
    pub fn map_points(&mut self, f: &mut impl FnMut(Coord) -> Coord) {
        match self {
            TopoGeometry::Point(c) => *c = f(*c),
            TopoGeometry::MultiPoint(cs) => cs.iter_mut().for_each(|c| *c = f(*c)),
            TopoGeometry::GeometryCollection(objects) => {
                for object in objects {
                    object.geometry.map_points(f);
                }
            }
            _ => {}
        }
    }
}

/// Objet d'une topologie: une géométrie avec identifiant et propriétés optionnels
#[derive(Debug, Clone, PartialEq)]
pub struct TopoObject {
    pub id: Option<String>,
    pub properties: Option<Properties>,
    pub geometry: TopoGeometry,
}

impl TopoObject {
    pub fn anonymous(geometry: TopoGeometry) -> Self {
        Self {
            id: None,
            properties: None,
            geometry,
        }
    }
}

/// Topologie: arcs partagés + objets qui les référencent
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Emprise des coordonnées d'origine
    pub bbox: Option<BBox>,

    /// Présente une fois la topologie quantifiée
    pub transform: Option<Transform>,

    /// Arcs dédupliqués (coordonnées absolues, sur la grille si quantifiés)
    pub arcs: Vec<Vec<Coord>>,

    /// Objets nommés
    pub objects: BTreeMap<String, TopoObject>,
}

impl Topology {
    /// Nombre total de positions dans les arcs
    pub fn point_count(&self) -> usize {
        self.arcs.iter().map(Vec::len).sum()
    }

    /// Récupère un objet par son nom
    pub fn object(&self, name: &str) -> Option<&TopoObject> {
        self.objects.get(name)
    }
}
