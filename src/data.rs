use crate::config::AppConfig;
use crate::topology::Topology;
use crate::types::{Country, Meteorite, MeteoriteProperties};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::Point;
use geojson::GeoJson;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Both documents, decoded. Only produced when every source loaded.
#[derive(Debug, Clone)]
pub struct MapData {
    pub countries: Vec<Country>,
    pub meteorites: Vec<Meteorite>,
}

pub async fn load_data(config: &AppConfig) -> Result<MapData> {
    info!("Loading data...");
    let client = reqwest::Client::new();

    // 1. Fetch both documents concurrently; the first failure aborts the load
    let (world_bytes, meteor_bytes) = tokio::try_join!(
        async {
            fetch_document(&client, &config.input.world_topology)
                .await
                .with_context(|| format!("Failed to load world topology from {}", config.input.world_topology))
        },
        async {
            fetch_document(&client, &config.input.meteorites)
                .await
                .with_context(|| format!("Failed to load meteorites from {}", config.input.meteorites))
        },
    )?;

    // 2. Decode
    let topology = Topology::from_slice(&world_bytes)?;
    let countries = topology.countries(&config.input.countries_object)?;
    info!("Loaded {} countries", countries.len());

    let meteorites = parse_meteorites(&meteor_bytes, &config.input.meteorites)?;
    info!("Loaded {} meteorites with position and mass", meteorites.len());

    Ok(MapData {
        countries,
        meteorites,
    })
}

/// Reads a document from an HTTP(S) URL or a local path.
pub async fn fetch_document(client: &reqwest::Client, location: &str) -> Result<Vec<u8>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        debug!("GET {}", location);
        let response = client.get(location).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    } else {
        debug!("Reading {}", location);
        tokio::fs::read(location)
            .await
            .with_context(|| format!("Failed to read file: {:?}", location))
    }
}

/// Parses strikes and keeps those with a position and a positive mass,
/// heaviest first.
pub fn parse_meteorites(bytes: &[u8], location: &str) -> Result<Vec<Meteorite>> {
    let extension = location
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase());

    let records = match extension.as_deref() {
        Some("csv") => load_csv_records(bytes)?,
        _ => load_geojson_records(bytes)?,
    };
    debug!("Parsed {} meteorite records", records.len());

    Ok(select_meteorites(records))
}

#[derive(Debug, Clone)]
struct Record {
    point: Option<Point<f64>>,
    mass: f64,
    properties: MeteoriteProperties,
}

fn select_meteorites(records: Vec<Record>) -> Vec<Meteorite> {
    let mut meteorites: Vec<Meteorite> = records
        .into_iter()
        .filter_map(|r| match r.point {
            Some(point) if r.mass.is_finite() && r.mass > 0.0 => Some(Meteorite {
                point,
                mass: r.mass,
                properties: r.properties,
            }),
            _ => None,
        })
        .collect();

    // Stable, so equal masses keep document order
    meteorites.sort_by(|a, b| b.mass.total_cmp(&a.mass));
    meteorites
}

fn load_geojson_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let geojson: GeoJson = serde_json::from_slice(bytes).context("Failed to parse meteorite GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Meteorite GeoJSON must be a FeatureCollection")),
    };

    let records = collection
        .features
        .into_iter()
        .map(|feature| {
            let point = feature.geometry.and_then(|g| match g.value {
                geojson::Value::Point(position) => finite_point(&position),
                _ => None,
            });

            let props = feature.properties.unwrap_or_default();
            let field = |key: &str| display_value(props.get(key));

            Record {
                point,
                mass: props.get("mass").map(coerce_number).unwrap_or(f64::NAN),
                properties: MeteoriteProperties {
                    id: field("id"),
                    name: field("name"),
                    nametype: field("nametype"),
                    recclass: field("recclass"),
                    mass: field("mass"),
                    fall: field("fall"),
                    year: field("year"),
                    reclat: field("reclat"),
                    reclong: field("reclong"),
                },
            }
        })
        .collect();

    Ok(records)
}

fn load_csv_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new().from_reader(bytes);
    let headers = rdr.headers().context("Failed to read meteorite CSV header")?.clone();

    let col_indices: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();
    let mass_idx = col_indices
        .get("mass (g)")
        .or_else(|| col_indices.get("mass"))
        .copied()
        .ok_or_else(|| anyhow!("Meteorite CSV has no mass column"))?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let field = |name: &str| {
            col_indices
                .get(name)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
                .to_string()
        };

        let mass_text = record.get(mass_idx).unwrap_or("").to_string();
        let reclat = field("reclat");
        let reclong = field("reclong");
        let point = match (reclong.trim().parse::<f64>(), reclat.trim().parse::<f64>()) {
            (Ok(lon), Ok(lat)) => finite_point(&[lon, lat]),
            _ => None,
        };

        records.push(Record {
            point,
            mass: coerce_number(&Value::String(mass_text.clone())),
            properties: MeteoriteProperties {
                id: field("id"),
                name: field("name"),
                nametype: field("nametype"),
                recclass: field("recclass"),
                mass: mass_text,
                fall: field("fall"),
                year: field("year"),
                reclat,
                reclong,
            },
        });
    }

    Ok(records)
}

fn finite_point(position: &[f64]) -> Option<Point<f64>> {
    match position {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some(Point::new(*lon, *lat)),
        _ => None,
    }
}

/// Numeric reading of a JSON property: numeric strings count, blanks and
/// nulls are zero, anything else is NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
