//! Validation des paramètres de requête
//!
//! Toutes les vérifications ont lieu avant le moindre appel externe; les
//! messages d'erreur sont renvoyés tels quels à l'appelant.

use std::collections::HashMap;
use std::str::FromStr;

use regions_topology::{RingFilter, WeightSystem};

use crate::error::{RegionsError, Result};
use crate::identity::{IdentitySource, SparqlService, WikidataId};

/// Nombre maximal d'identifiants dans `ids`
pub const MAX_IDS: usize = 1000;

/// Quantile appliqué quand aucun paramètre de simplification n'est donné
pub const DEFAULT_QUANTILE: f64 = 0.07;

/// Exposant de quantification par défaut quand la simplification est active
pub const DEFAULT_QUANTIZE: u8 = 4;

/// Exposant de quantification maximal
pub const MAX_QUANTIZE: u8 = 8;

/// Format de sortie (dernier segment du chemin)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    GeoJson,
    TopoJson,
}

impl FromStr for OutputFormat {
    type Err = RegionsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "geojson.json" => Ok(OutputFormat::GeoJson),
            "topojson.json" => Ok(OutputFormat::TopoJson),
            _ => Err(RegionsError::invalid(
                r#"bad format parameter. Allows "geojson.json" and "topojson.json""#,
            )),
        }
    }
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "geojson.json",
            OutputFormat::TopoJson => "topojson.json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "application/geo+json",
            OutputFormat::TopoJson => "application/topo+json",
        }
    }
}

/// Seuil de simplification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Poids minimal absolu
    Absolute(f64),
    /// Quantile de la distribution des poids, dans [0, 1]
    Quantile(f64),
}

impl Threshold {
    pub fn value(self) -> f64 {
        match self {
            Threshold::Absolute(v) | Threshold::Quantile(v) => v,
        }
    }
}

/// Simplification demandée
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simplification {
    pub system: WeightSystem,
    pub threshold: Threshold,
}

impl Simplification {
    /// Nom du paramètre équivalent (`sphericalQuantile`, ...)
    pub fn command(&self) -> &'static str {
        match (self.system, self.threshold) {
            (WeightSystem::Spherical, Threshold::Absolute(_)) => "sphericalArea",
            (WeightSystem::Spherical, Threshold::Quantile(_)) => "sphericalQuantile",
            (WeightSystem::Planar, Threshold::Absolute(_)) => "planarArea",
            (WeightSystem::Planar, Threshold::Quantile(_)) => "planarQuantile",
        }
    }
}

/// Requête normalisée
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub identity: IdentitySource,
    pub format: OutputFormat,
    /// `None`: géométrie d'origine
    pub simplification: Option<Simplification>,
    pub filter: RingFilter,
    /// Exposant de quantification, 0 pour aucune
    pub quantize: u8,
}

impl PipelineRequest {
    /// Facteur de quantification `10^quantize`, `None` si désactivée
    pub fn quantization_factor(&self) -> Option<u64> {
        (self.quantize > 0).then(|| 10_u64.pow(u32::from(self.quantize)))
    }

    /// La topologie n'est construite que pour simplifier ou sortir du TopoJSON
    pub fn needs_topology(&self) -> bool {
        self.simplification.is_some() || self.format == OutputFormat::TopoJson
    }
}

struct NumericParam {
    name: &'static str,
    desc: &'static str,
    max: Option<f64>,
    system: WeightSystem,
    quantile: bool,
    enabled: bool,
}

static NUMERIC_PARAMS: [NumericParam; 4] = [
    NumericParam {
        name: "planarArea",
        desc: "minimum planar triangle area (absolute)",
        max: None,
        system: WeightSystem::Planar,
        quantile: false,
        enabled: false,
    },
    NumericParam {
        name: "planarQuantile",
        desc: "minimum planar triangle area (quantile)",
        max: Some(1.0),
        system: WeightSystem::Planar,
        quantile: true,
        enabled: false,
    },
    NumericParam {
        name: "sphericalArea",
        desc: "minimum spherical excess (absolute)",
        max: None,
        system: WeightSystem::Spherical,
        quantile: false,
        enabled: true,
    },
    NumericParam {
        name: "sphericalQuantile",
        desc: "minimum spherical excess (quantile)",
        max: Some(1.0),
        system: WeightSystem::Spherical,
        quantile: true,
        enabled: true,
    },
];

/// Valide les paramètres et construit la requête normalisée
pub fn resolve(format: &str, params: &HashMap<String, String>) -> Result<PipelineRequest> {
    let identity = resolve_identity(params)?;
    let format: OutputFormat = format.parse()?;
    let simplification = resolve_simplification(params)?;

    let filter = match params.get("filter") {
        None if simplification.is_some() => RingFilter::All,
        None => RingFilter::None,
        Some(value) => value.parse().map_err(|_| {
            RegionsError::invalid(r#"bad filter parameter. Allows "none", "all" and "detached""#)
        })?,
    };

    let quantize = match params.get("quantize") {
        None if simplification.is_some() => DEFAULT_QUANTIZE,
        None => 0,
        Some(value) => value
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|q| *q <= MAX_QUANTIZE)
            .ok_or_else(|| {
                RegionsError::invalid(format!(
                    "quantize parameter, exponent to use for quantizing, must be a non-negative integer not larger than {}",
                    MAX_QUANTIZE
                ))
            })?,
    };

    Ok(PipelineRequest {
        identity,
        format,
        simplification,
        filter,
        quantize,
    })
}

fn resolve_identity(params: &HashMap<String, String>) -> Result<IdentitySource> {
    let ids = params.get("ids");
    let sparql = params.get("sparql");
    let service = params.get("service");

    match (ids, sparql) {
        (Some(ids), None) => {
            if service.is_some() {
                return Err(RegionsError::invalid(
                    r#"Parameter "service" must be used with "sparql""#,
                ));
            }
            Ok(IdentitySource::Explicit(parse_ids(ids)?))
        }
        (None, Some(query)) => {
            let service = match service {
                None => SparqlService::default(),
                Some(value) => value.parse().map_err(|_| {
                    RegionsError::invalid(
                        r#"If set, "service" param must be either "sophox" or "wikidata""#,
                    )
                })?,
            };
            Ok(IdentitySource::Sparql {
                query: query.clone(),
                service,
            })
        }
        _ => Err(RegionsError::invalid(
            r#"Either "ids" or "query" parameter must be given, but not both"#,
        )),
    }
}

/// Liste séparée par des virgules; jetons vides ignorés, doublons fusionnés
pub fn parse_ids(raw: &str) -> Result<Vec<WikidataId>> {
    let tokens: Vec<&str> = raw.split(',').filter(|t| !t.is_empty()).collect();
    if tokens.len() > MAX_IDS {
        return Err(RegionsError::invalid(format!(
            "No more than {} IDs is allowed",
            MAX_IDS
        )));
    }

    let mut ids: Vec<WikidataId> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let id: WikidataId = token
            .parse()
            .map_err(|_| RegionsError::invalid(format!("Invalid Wikidata ID {:?}", token)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn resolve_simplification(params: &HashMap<String, String>) -> Result<Option<Simplification>> {
    let mut selected: Option<(&NumericParam, f64)> = None;
    for param in &NUMERIC_PARAMS {
        let Some(raw) = params.get(param.name) else {
            continue;
        };
        if let Some((first, _)) = selected {
            return Err(RegionsError::invalid(format!(
                "{} parameter cannot be used together with {}",
                param.name, first.name
            )));
        }
        selected = Some((param, parse_number(param, raw)?));
    }

    let Some((param, value)) = selected else {
        // Sans paramètre, simplification par défaut
        return Ok(Some(Simplification {
            system: WeightSystem::Spherical,
            threshold: Threshold::Quantile(DEFAULT_QUANTILE),
        }));
    };

    if !param.enabled {
        return Err(RegionsError::invalid(format!(
            "{} parameter is not supported",
            param.name
        )));
    }
    // Quantile 1: aucune simplification
    if param.quantile && value == 1.0 {
        return Ok(None);
    }

    let threshold = if param.quantile {
        Threshold::Quantile(value)
    } else {
        Threshold::Absolute(value)
    };
    Ok(Some(Simplification {
        system: param.system,
        threshold,
    }))
}

fn parse_number(param: &NumericParam, raw: &str) -> Result<f64> {
    let max = param.max.unwrap_or(f64::MAX);
    match raw.trim().parse::<f64>() {
        Ok(value) if value >= 0.0 && value <= max => Ok(value),
        _ => Err(RegionsError::invalid(format!(
            "{} parameter, {}, must be a non-negative number{}",
            param.name,
            param.desc,
            param
                .max
                .map(|m| format!(" not larger than {}", m))
                .unwrap_or_default()
        ))),
    }
}
