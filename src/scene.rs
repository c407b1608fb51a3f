use crate::config::AppConfig;
use crate::data::MapData;
use crate::interaction::stroke_width;
use crate::projection::Mercator;
use crate::scales::MeteorScales;
use crate::types::{Country, Meteorite, MeteoriteProperties};
use geo::{Coord, MapCoords, MultiPolygon};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::info;

pub const COUNTRY_FILL: &str = "#ccc";
pub const METEOR_STROKE: &str = "#222";

/// Fill colour for strikes: saturation and lightness are fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

impl Hsla {
    pub fn meteor(hue: f64, alpha: f64) -> Self {
        Self {
            hue: hue.floor(),
            saturation: 80.0,
            lightness: 60.0,
            alpha,
        }
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({}, {}%, {}%, {})",
            self.hue, self.saturation, self.lightness, self.alpha
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryShape {
    pub id: String,
    pub path: String,
    pub fill: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    // Projected outline in scene coordinates, for hit testing
    #[serde(skip)]
    pub outline: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeteorCircle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: String,
    pub opacity: f64,
    pub stroke: &'static str,
    pub stroke_width: f64,
    pub properties: MeteoriteProperties,
}

/// Everything drawn inside the zoomable group, in paint order.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub projection: Mercator,
    pub scales: Option<MeteorScales>,
    pub countries: Vec<CountryShape>,
    pub meteors: Vec<MeteorCircle>,
}

impl Scene {
    /// `meteorites` are expected filtered and sorted heaviest first.
    pub fn new(
        width: f64,
        height: f64,
        projection: Mercator,
        countries: &[Country],
        meteorites: &[Meteorite],
    ) -> Self {
        let countries: Vec<CountryShape> = countries
            .par_iter()
            .map(|country| CountryShape {
                id: country.id.clone(),
                path: projection.path(&country.geometry),
                fill: COUNTRY_FILL,
                properties: country.properties.clone(),
                outline: country
                    .geometry
                    .map_coords(|c| {
                        let [x, y] = projection.project(c.x, c.y);
                        Coord { x, y }
                    }),
            })
            .collect();

        let scales = MeteorScales::from_meteorites(meteorites, width);
        let meteors = match &scales {
            Some(scales) => meteorites
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let [cx, cy] = projection.project(m.point.x(), m.point.y());
                    let opacity = scales.opacity.apply(m.mass);
                    MeteorCircle {
                        cx,
                        cy,
                        r: scales.radius.apply(m.mass),
                        fill: Hsla::meteor(scales.hue.apply(i as f64), opacity).to_string(),
                        opacity,
                        stroke: METEOR_STROKE,
                        stroke_width: stroke_width(1.0),
                        properties: m.properties.clone(),
                    }
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            width,
            height,
            projection,
            scales,
            countries,
            meteors,
        }
    }
}

pub fn build_scene(config: &AppConfig, data: &MapData) -> Scene {
    let projection = Mercator::for_viewport(config.projection.scale, &config.viewport);
    let scene = Scene::new(
        config.viewport.width,
        config.viewport.height,
        projection,
        &data.countries,
        &data.meteorites,
    );
    info!(
        "Built scene with {} country shapes and {} meteor circles",
        scene.countries.len(),
        scene.meteors.len()
    );
    scene
}
