//! Génération des requêtes PostGIS
//!
//! Chaque identifiant donne une seule ligne: l'union de ses géométries, forcée
//! en règle de la main droite, reprojetée en WGS84 et sérialisée en GeoJSON.
//! Les identifiants passent par le paramètre `$1` (`text[]`), seuls les noms
//! de tables sont interpolés après échappement.

use std::str::FromStr;

/// Disposition de la table des régions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaLayout {
    /// Tags OSM dans une colonne `hstore` (`tags->'wikidata'`), géométries éclatées avant l'union
    #[default]
    Hstore,
    /// Colonne `wikidata` dédiée
    Column,
}

impl FromStr for SchemaLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hstore" => Ok(SchemaLayout::Hstore),
            "column" => Ok(SchemaLayout::Column),
            _ => Err(format!("Invalid schema layout: {}. Use: hstore, column", s)),
        }
    }
}

/// Échappe un identifiant SQL, éventuellement qualifié par un schéma
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Requête d'union des géométries par identifiant
///
/// Avec `water_table`, chaque fragment est privé de l'union des plans d'eau
/// qui l'intersectent; un résultat vide ou nul retombe sur le fragment d'origine.
pub fn union_query(layout: SchemaLayout, table: &str, water_table: Option<&str>) -> String {
    let fragments = match layout {
        SchemaLayout::Hstore => format!(
            "SELECT tags->'wikidata' AS id, (ST_Dump(way)).geom AS way
    FROM {}
    WHERE tags ? 'wikidata' AND tags->'wikidata' = ANY($1)",
            quote_ident(table)
        ),
        SchemaLayout::Column => format!(
            "SELECT wikidata AS id, way
    FROM {}
    WHERE wikidata = ANY($1)",
            quote_ident(table)
        ),
    };

    let fragments = match water_table {
        None => fragments,
        Some(water) => format!(
            "SELECT src.id,
      CASE WHEN clip.way IS NULL OR ST_IsEmpty(clip.way) THEN src.way ELSE clip.way END AS way
    FROM (
    {fragments}
    ) src
    CROSS JOIN LATERAL (
      SELECT ST_Difference(src.way, ST_Union(water.way)) AS way
      FROM {} water
      WHERE ST_Intersects(src.way, water.way)
    ) clip",
            quote_ident(water)
        ),
    };

    format!(
        "SELECT id, ST_AsGeoJSON(ST_Transform(ST_ForceRHR(way), 4326)) AS data FROM
(
  SELECT id, ST_Multi(ST_Union(way)) AS way
  FROM (
    {fragments}
  ) tbl1
  GROUP BY id
) tbl2"
    )
}
