//! Construction de la topologie
//!
//! Les étapes reprennent le principe de TopoJSON:
//! 1. extraction des lignes et anneaux de toutes les features
//! 2. détection des jonctions (points où les voisins divergent)
//! 3. découpe des lignes et anneaux aux jonctions
//! 4. déduplication des arcs, dans les deux sens de parcours
//!
//! Deux polygones adjacents référencent ainsi le *même* arc pour leur frontière
//! commune, ce qui garantit une simplification identique des deux côtés.

use std::collections::{BTreeMap, HashMap, HashSet};

use geo::{Coord, Geometry, LineString, Polygon};
use tracing::debug;

use crate::types::{ArcPath, ArcRef, BBox, InputFeature, TopoGeometry, TopoObject, Topology};
use crate::TopologyError;

/// Clé de hachage exacte d'une coordonnée (-0.0 et 0.0 confondus)
type PointKey = (u64, u64);

fn point_key(c: Coord) -> PointKey {
    // `v + 0.0` ramène -0.0 à 0.0
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

/// Partie extraite d'une géométrie
#[derive(Debug)]
enum Part {
    Line(Vec<Coord>),
    Ring(Vec<Coord>),
}

/// Géométrie extraite, dont les lignes/anneaux pointent vers des parties
#[derive(Debug)]
enum Shape {
    Null,
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(usize),
    MultiLineString(Vec<usize>),
    Polygon(Vec<usize>),
    MultiPolygon(Vec<Vec<usize>>),
    Collection(Vec<Shape>),
}

/// Construit une topologie à partir de features
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    parts: Vec<Part>,
    bbox: Option<BBox>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construit une topologie contenant un objet `GeometryCollection` nommé `object_name`
    ///
    /// # Errors
    ///
    /// Retourne `TopologyError::InvalidGeometry` si une géométrie contient des
    /// coordonnées non finies.
    pub fn build(
        mut self,
        object_name: &str,
        features: Vec<InputFeature>,
    ) -> Result<Topology, TopologyError> {
        // 1. Extraction
        let mut shapes = Vec::with_capacity(features.len());
        for feature in &features {
            let shape = match &feature.geometry {
                Some(geometry) => {
                    let label = feature.id.as_deref().unwrap_or("unknown");
                    self.extract(geometry, label)?
                }
                None => Shape::Null,
            };
            shapes.push(shape);
        }

        // 2. Jonctions
        let junctions = find_junctions(&self.parts);

        // 3 + 4. Découpe et déduplication
        let mut index = ArcIndex::default();
        let paths: Vec<ArcPath> = self
            .parts
            .iter()
            .map(|part| cut(part, &junctions, &mut index))
            .collect();

        debug!(
            parts = self.parts.len(),
            junctions = junctions.len(),
            arcs = index.arcs.len(),
            "Topology built"
        );

        let geometries = features
            .into_iter()
            .zip(shapes)
            .map(|(feature, shape)| TopoObject {
                id: feature.id,
                properties: Some(feature.properties),
                geometry: resolve(shape, &paths),
            })
            .collect();

        let mut objects = BTreeMap::new();
        objects.insert(
            object_name.to_string(),
            TopoObject::anonymous(TopoGeometry::GeometryCollection(geometries)),
        );

        Ok(Topology {
            bbox: self.bbox,
            transform: None,
            arcs: index.arcs,
            objects,
        })
    }

    fn extract(&mut self, geometry: &Geometry, label: &str) -> Result<Shape, TopologyError> {
        let shape = match geometry {
            Geometry::Point(p) => Shape::Point(self.track(p.0, label)?),
            Geometry::MultiPoint(mp) => Shape::MultiPoint(
                mp.0.iter()
                    .map(|p| self.track(p.0, label))
                    .collect::<Result<_, _>>()?,
            ),
            Geometry::Line(l) => self.extract_line(&LineString::new(vec![l.start, l.end]), label)?,
            Geometry::LineString(ls) => self.extract_line(ls, label)?,
            Geometry::MultiLineString(mls) => {
                let mut lines = Vec::with_capacity(mls.0.len());
                for ls in &mls.0 {
                    if let Shape::LineString(i) = self.extract_line(ls, label)? {
                        lines.push(i);
                    }
                }
                Shape::MultiLineString(lines)
            }
            Geometry::Polygon(p) => match self.extract_polygon(p, label)? {
                Some(rings) => Shape::Polygon(rings),
                None => Shape::Null,
            },
            Geometry::MultiPolygon(mp) => {
                let mut polygons = Vec::with_capacity(mp.0.len());
                for p in &mp.0 {
                    if let Some(rings) = self.extract_polygon(p, label)? {
                        polygons.push(rings);
                    }
                }
                Shape::MultiPolygon(polygons)
            }
            Geometry::Rect(r) => match self.extract_polygon(&r.to_polygon(), label)? {
                Some(rings) => Shape::Polygon(rings),
                None => Shape::Null,
            },
            Geometry::Triangle(t) => match self.extract_polygon(&t.to_polygon(), label)? {
                Some(rings) => Shape::Polygon(rings),
                None => Shape::Null,
            },
            Geometry::GeometryCollection(gc) => Shape::Collection(
                gc.0.iter()
                    .map(|g| self.extract(g, label))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(shape)
    }

    fn extract_line(&mut self, ls: &LineString, label: &str) -> Result<Shape, TopologyError> {
        if ls.0.is_empty() {
            return Ok(Shape::Null);
        }
        let mut coords = Vec::with_capacity(ls.0.len().max(2));
        for c in &ls.0 {
            coords.push(self.track(*c, label)?);
        }
        if coords.len() == 1 {
            coords.push(coords[0]);
        }
        self.parts.push(Part::Line(coords));
        Ok(Shape::LineString(self.parts.len() - 1))
    }

    /// Extrait les anneaux d'un polygone; `None` si l'extérieur est vide
    fn extract_polygon(
        &mut self,
        polygon: &Polygon,
        label: &str,
    ) -> Result<Option<Vec<usize>>, TopologyError> {
        if polygon.exterior().0.is_empty() {
            return Ok(None);
        }
        let mut rings = Vec::with_capacity(1 + polygon.interiors().len());
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            if ring.0.is_empty() {
                continue;
            }
            let mut coords = Vec::with_capacity(ring.0.len() + 1);
            for c in &ring.0 {
                coords.push(self.track(*c, label)?);
            }
            // Fermeture si nécessaire
            if point_key(coords[0]) != point_key(coords[coords.len() - 1]) || coords.len() == 1 {
                coords.push(coords[0]);
            }
            self.parts.push(Part::Ring(coords));
            rings.push(self.parts.len() - 1);
        }
        Ok(Some(rings))
    }

    /// Vérifie une coordonnée et étend l'emprise
    fn track(&mut self, c: Coord, label: &str) -> Result<Coord, TopologyError> {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(TopologyError::invalid_geometry(
                label,
                format!("non-finite coordinate ({}, {})", c.x, c.y),
            ));
        }
        BBox::include(&mut self.bbox, c);
        Ok(c)
    }
}

/// Détecte les jonctions: extrémités de lignes, et points visités par
/// plusieurs parties avec des voisins différents
fn find_junctions(parts: &[Part]) -> HashSet<PointKey> {
    let mut finder = JunctionFinder::default();

    for (part_id, part) in parts.iter().enumerate() {
        match part {
            Part::Line(coords) => {
                let n = coords.len();
                finder.junctions.insert(point_key(coords[0]));
                finder.junctions.insert(point_key(coords[n - 1]));
                for k in 1..n.saturating_sub(1) {
                    finder.visit(part_id, coords[k - 1], coords[k], coords[k + 1]);
                }
            }
            Part::Ring(coords) => {
                // Le dernier point duplique le premier
                let n = coords.len() - 1;
                for k in 0..n {
                    let previous = coords[(k + n - 1) % n];
                    finder.visit(part_id, previous, coords[k], coords[k + 1]);
                }
            }
        }
    }

    finder.junctions
}

#[derive(Default)]
struct JunctionFinder {
    neighbours: HashMap<PointKey, (PointKey, PointKey)>,
    visited_by: HashMap<PointKey, usize>,
    junctions: HashSet<PointKey>,
}

impl JunctionFinder {
    fn visit(&mut self, part_id: usize, previous: Coord, current: Coord, next: Coord) {
        let current = point_key(current);
        // Auto-intersection d'une même partie: ignorée
        if self.visited_by.insert(current, part_id) == Some(part_id) {
            return;
        }

        let previous = point_key(previous);
        let next = point_key(next);
        match self.neighbours.get(&current) {
            Some(&(left, right)) => {
                let same = left == previous && right == next;
                let reversed = left == next && right == previous;
                if !same && !reversed {
                    self.junctions.insert(current);
                }
            }
            None => {
                self.neighbours.insert(current, (previous, next));
            }
        }
    }
}

/// Découpe une partie aux jonctions et enregistre ses arcs
fn cut(part: &Part, junctions: &HashSet<PointKey>, index: &mut ArcIndex) -> ArcPath {
    match part {
        Part::Line(coords) => split_at_junctions(coords, junctions)
            .into_iter()
            .map(|arc| index.intern_open(arc))
            .collect(),
        Part::Ring(coords) => {
            let n = coords.len() - 1;
            let first_junction = (0..n).find(|&k| junctions.contains(&point_key(coords[k])));
            match first_junction {
                None => vec![index.intern_ring(coords.clone())],
                Some(start) => {
                    // Rotation pour démarrer sur une jonction
                    let mut rotated = Vec::with_capacity(coords.len());
                    rotated.extend_from_slice(&coords[start..n]);
                    rotated.extend_from_slice(&coords[..start]);
                    rotated.push(coords[start]);
                    split_at_junctions(&rotated, junctions)
                        .into_iter()
                        .map(|arc| index.intern_open(arc))
                        .collect()
                }
            }
        }
    }
}

/// Coupe une suite de coordonnées à chaque jonction intérieure
fn split_at_junctions(coords: &[Coord], junctions: &HashSet<PointKey>) -> Vec<Vec<Coord>> {
    let mut arcs = Vec::new();
    let mut start = 0;
    for k in 1..coords.len().saturating_sub(1) {
        if junctions.contains(&point_key(coords[k])) {
            arcs.push(coords[start..=k].to_vec());
            start = k;
        }
    }
    arcs.push(coords[start..].to_vec());
    arcs
}

/// Registre des arcs dédupliqués
#[derive(Default)]
struct ArcIndex {
    arcs: Vec<Vec<Coord>>,
    by_ends: HashMap<(PointKey, PointKey), Vec<usize>>,
    rings_by_min: HashMap<PointKey, Vec<(usize, Vec<PointKey>)>>,
}

impl ArcIndex {
    /// Arc ouvert (extrémités sur des jonctions): recherche par extrémités
    fn intern_open(&mut self, arc: Vec<Coord>) -> ArcRef {
        let keys: Vec<PointKey> = arc.iter().copied().map(point_key).collect();
        let start = keys[0];
        let end = keys[keys.len() - 1];

        if let Some(candidates) = self.by_ends.get(&(start, end)) {
            for &i in candidates {
                if same_keys(self.arcs[i].iter(), keys.iter()) {
                    return ArcRef::forward(i);
                }
            }
        }
        if let Some(candidates) = self.by_ends.get(&(end, start)) {
            for &i in candidates {
                if same_keys(self.arcs[i].iter(), keys.iter().rev()) {
                    return ArcRef::backward(i);
                }
            }
        }

        let i = self.arcs.len();
        self.arcs.push(arc);
        self.by_ends.entry((start, end)).or_default().push(i);
        ArcRef::forward(i)
    }

    /// Anneau sans jonction: comparaison indépendante du point de départ
    fn intern_ring(&mut self, ring: Vec<Coord>) -> ArcRef {
        let open: Vec<PointKey> = ring[..ring.len() - 1]
            .iter()
            .copied()
            .map(point_key)
            .collect();
        let forward = normalize_ring(&open);
        let reversed: Vec<PointKey> = open.iter().rev().copied().collect();
        let backward = normalize_ring(&reversed);
        let min = forward[0];

        if let Some(candidates) = self.rings_by_min.get(&min) {
            for (i, normalized) in candidates {
                if *normalized == forward {
                    return ArcRef::forward(*i);
                }
                if *normalized == backward {
                    return ArcRef::backward(*i);
                }
            }
        }

        // L'arc conserve le point de départ d'origine
        let i = self.arcs.len();
        self.arcs.push(ring);
        self.rings_by_min.entry(min).or_default().push((i, forward));
        ArcRef::forward(i)
    }
}

/// Fait démarrer un anneau ouvert sur son sommet lexicographiquement le plus petit
fn normalize_ring(open: &[PointKey]) -> Vec<PointKey> {
    let as_coord = |k: &PointKey| (f64::from_bits(k.0), f64::from_bits(k.1));
    let min_idx = (0..open.len())
        .min_by(|&a, &b| {
            let (ax, ay) = as_coord(&open[a]);
            let (bx, by) = as_coord(&open[b]);
            ax.total_cmp(&bx).then_with(|| ay.total_cmp(&by))
        })
        .unwrap_or(0);
    open[min_idx..].iter().chain(&open[..min_idx]).copied().collect()
}

fn same_keys<'a>(
    arc: impl ExactSizeIterator<Item = &'a Coord>,
    keys: impl ExactSizeIterator<Item = &'a PointKey>,
) -> bool {
    arc.len() == keys.len() && arc.zip(keys).all(|(c, k)| point_key(*c) == *k)
}

/// Remplace les index de parties par leurs chemins d'arcs
fn resolve(shape: Shape, paths: &[ArcPath]) -> TopoGeometry {
    match shape {
        Shape::Null => TopoGeometry::Null,
        Shape::Point(c) => TopoGeometry::Point(c),
        Shape::MultiPoint(cs) => TopoGeometry::MultiPoint(cs),
        Shape::LineString(i) => TopoGeometry::LineString(paths[i].clone()),
        Shape::MultiLineString(lines) => {
            TopoGeometry::MultiLineString(lines.into_iter().map(|i| paths[i].clone()).collect())
        }
        Shape::Polygon(rings) => {
            TopoGeometry::Polygon(rings.into_iter().map(|i| paths[i].clone()).collect())
        }
        Shape::MultiPolygon(polygons) => TopoGeometry::MultiPolygon(
            polygons
                .into_iter()
                .map(|rings| rings.into_iter().map(|i| paths[i].clone()).collect())
                .collect(),
        ),
        Shape::Collection(shapes) => TopoGeometry::GeometryCollection(
            shapes
                .into_iter()
                .map(|s| TopoObject::anonymous(resolve(s, paths)))
                .collect(),
        ),
    }
}
