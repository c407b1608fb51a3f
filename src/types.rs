use geo::{MultiPolygon, Point};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Country {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
    // Raw topology properties, if the object carried any
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub struct Meteorite {
    pub point: Point<f64>, // x = longitude, y = latitude
    pub mass: f64,
    pub properties: MeteoriteProperties,
}

/// Display values for a strike, kept as the source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeteoriteProperties {
    pub id: String,
    pub name: String,
    pub nametype: String,
    pub recclass: String,
    pub mass: String,
    pub fall: String,
    pub year: String,
    pub reclat: String,
    pub reclong: String,
}
