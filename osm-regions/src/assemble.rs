//! Assemblage des géométries et des attributs en FeatureCollection

use anyhow::Context;
use regions_topology::{write_raw_feature, InputFeature};

use crate::error::Result;
use crate::identity::{Properties, PropertyBag, WikidataId};
use crate::store::GeometryRecord;

/// Une région: identifiant, attributs SPARQL et géométrie GeoJSON brute
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub id: WikidataId,
    pub properties: Properties,
    pub geometry: String,
}

/// Collection ordonnée comme les lignes du stockage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<RegionFeature>,
}

impl FeatureCollection {
    /// Associe chaque ligne à ses attributs
    ///
    /// Une entrée d'attributs sans géométrie correspondante est ignorée.
    pub fn assemble(records: Vec<GeometryRecord>, properties: &PropertyBag) -> Self {
        let features = records
            .into_iter()
            .map(|record| RegionFeature {
                properties: properties.get(&record.id).cloned().unwrap_or_default(),
                id: record.id,
                geometry: record.data,
            })
            .collect();
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// FeatureCollection GeoJSON, géométries recopiées sans analyse
    pub fn to_geojson_string(&self) -> Result<String> {
        let mut buffer = Vec::with_capacity(
            64 + self.features.iter().map(|f| f.geometry.len() + 64).sum::<usize>(),
        );
        buffer.extend_from_slice(br#"{"type":"FeatureCollection","features":["#);
        for (i, feature) in self.features.iter().enumerate() {
            if i > 0 {
                buffer.push(b',');
            }
            write_raw_feature(
                &mut buffer,
                feature.id.as_str(),
                Some(&feature.properties),
                &feature.geometry,
            )?;
        }
        buffer.extend_from_slice(b"]}");
        Ok(String::from_utf8(buffer).context("GeoJSON output is not UTF-8")?)
    }

    /// Features prêtes pour la construction de topologie
    pub fn to_topology_input(&self) -> Result<Vec<InputFeature>> {
        self.features
            .iter()
            .map(|feature| -> Result<InputFeature> {
                let geometry: geojson::Geometry = serde_json::from_str(&feature.geometry)
                    .with_context(|| format!("Invalid GeoJSON geometry for {}", feature.id))?;
                let geometry = geo::Geometry::<f64>::try_from(geometry)
                    .with_context(|| format!("Unsupported geometry for {}", feature.id))?;
                Ok(InputFeature {
                    id: Some(feature.id.to_string()),
                    properties: feature.properties.clone(),
                    geometry: Some(geometry),
                })
            })
            .collect()
    }
}
