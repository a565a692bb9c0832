//! Écriture GeoJSON (geozero, streaming) et TopoJSON (serde_json)

use std::io::Write;

use geo::Coord;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{json, Map, Value};

use crate::feature::OutputFeature;
use crate::types::{ArcPath, Properties, TopoGeometry, TopoObject, Topology};
use crate::TopologyError;

/// Écrit une FeatureCollection GeoJSON
pub fn write_geojson<W: Write>(
    writer: &mut W,
    features: &[OutputFeature],
) -> Result<(), TopologyError> {
    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;
    for (i, feature) in features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, feature)?;
    }
    write!(writer, "]}}")?;
    Ok(())
}

/// Écrit une feature GeoJSON
pub fn write_feature<W: Write>(
    writer: &mut W,
    feature: &OutputFeature,
) -> Result<(), TopologyError> {
    write!(writer, r#"{{"type":"Feature""#)?;
    if let Some(id) = &feature.id {
        write!(writer, r#","id":"#)?;
        serde_json::to_writer(&mut *writer, id)?;
    }

    write!(writer, r#","geometry":"#)?;
    match &feature.geometry {
        Some(geometry) => {
            // Géométrie via geozero
            let mut geom_buf = Vec::new();
            let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
            geometry.process_geom(&mut geom_writer)?;
            writer.write_all(&geom_buf)?;
        }
        None => write!(writer, "null")?,
    }

    write_properties(writer, feature.properties.as_ref())?;
    write!(writer, "}}")?;
    Ok(())
}

/// Écrit une feature dont la géométrie est déjà un fragment GeoJSON
///
/// Le fragment est recopié tel quel, sans être analysé.
pub fn write_raw_feature<W: Write>(
    writer: &mut W,
    id: &str,
    properties: Option<&Properties>,
    geometry: &str,
) -> Result<(), TopologyError> {
    write!(writer, r#"{{"type":"Feature","id":"#)?;
    serde_json::to_writer(&mut *writer, id)?;
    write!(writer, r#","geometry":{}"#, geometry)?;
    write_properties(writer, properties)?;
    write!(writer, "}}")?;
    Ok(())
}

fn write_properties<W: Write>(
    writer: &mut W,
    properties: Option<&Properties>,
) -> Result<(), TopologyError> {
    write!(writer, r#","properties":"#)?;
    match properties {
        Some(properties) => serde_json::to_writer(&mut *writer, properties)?,
        None => write!(writer, "{{}}")?,
    }
    Ok(())
}

/// Écrit la topologie au format TopoJSON
pub fn write_topojson<W: Write>(writer: &mut W, topology: &Topology) -> Result<(), TopologyError> {
    serde_json::to_writer(writer, &topojson_value(topology))?;
    Ok(())
}

/// Représentation TopoJSON de la topologie
///
/// Une topologie quantifiée a des arcs encodés en delta et des positions entières.
pub fn topojson_value(topology: &Topology) -> Value {
    let mut root = Map::new();
    root.insert("type".into(), json!("Topology"));
    if let Some(bbox) = topology.bbox {
        root.insert("bbox".into(), json!(bbox.to_array()));
    }
    if let Some(transform) = topology.transform {
        root.insert(
            "transform".into(),
            json!({ "scale": transform.scale, "translate": transform.translate }),
        );
    }

    let quantized = topology.transform.is_some();
    let objects: Map<String, Value> = topology
        .objects
        .iter()
        .map(|(name, object)| (name.clone(), object_value(object, quantized)))
        .collect();
    root.insert("objects".into(), Value::Object(objects));

    let arcs: Vec<Value> = topology
        .arcs
        .iter()
        .map(|arc| {
            if quantized {
                delta_arc(arc)
            } else {
                Value::Array(arc.iter().map(|&c| position(c, false)).collect())
            }
        })
        .collect();
    root.insert("arcs".into(), Value::Array(arcs));

    Value::Object(root)
}

fn object_value(object: &TopoObject, quantized: bool) -> Value {
    let mut value = Map::new();
    value.insert(
        "type".into(),
        object.geometry.type_name().map_or(Value::Null, Value::from),
    );
    if let Some(id) = &object.id {
        value.insert("id".into(), json!(id));
    }
    if let Some(properties) = &object.properties {
        value.insert("properties".into(), Value::Object(properties.clone()));
    }

    match &object.geometry {
        TopoGeometry::Null => {}
        TopoGeometry::Point(c) => {
            value.insert("coordinates".into(), position(*c, quantized));
        }
        TopoGeometry::MultiPoint(cs) => {
            value.insert(
                "coordinates".into(),
                cs.iter().map(|&c| position(c, quantized)).collect(),
            );
        }
        TopoGeometry::LineString(path) => {
            value.insert("arcs".into(), path_value(path));
        }
        TopoGeometry::MultiLineString(paths) | TopoGeometry::Polygon(paths) => {
            value.insert("arcs".into(), paths.iter().map(path_value).collect());
        }
        TopoGeometry::MultiPolygon(polygons) => {
            value.insert(
                "arcs".into(),
                polygons
                    .iter()
                    .map(|rings| rings.iter().map(path_value).collect::<Value>())
                    .collect(),
            );
        }
        TopoGeometry::GeometryCollection(members) => {
            value.insert(
                "geometries".into(),
                members
                    .iter()
                    .map(|member| object_value(member, quantized))
                    .collect(),
            );
        }
    }
    Value::Object(value)
}

fn path_value(path: &ArcPath) -> Value {
    path.iter().map(|r| Value::from(r.to_signed())).collect()
}

fn position(c: Coord, quantized: bool) -> Value {
    if quantized {
        json!([c.x as i64, c.y as i64])
    } else {
        json!([c.x, c.y])
    }
}

/// Première position absolue, les suivantes en delta
fn delta_arc(arc: &[Coord]) -> Value {
    let mut previous = (0_i64, 0_i64);
    arc.iter()
        .map(|c| {
            let (x, y) = (c.x as i64, c.y as i64);
            let delta = json!([x - previous.0, y - previous.1]);
            previous = (x, y);
            delta
        })
        .collect()
}
