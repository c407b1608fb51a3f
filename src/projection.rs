use crate::config::ViewportConfig;
use geo::{LineString, MultiPolygon};
use serde::Serialize;
use std::fmt::Write;

/// Latitude at which the square Mercator world ends; beyond it y diverges.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical Mercator scaled by `scale` pixels per radian and centred on
/// `translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mercator {
    pub scale: f64,
    pub translate: [f64; 2],
}

impl Mercator {
    pub fn new(scale: f64, translate: [f64; 2]) -> Self {
        Self { scale, translate }
    }

    /// Centred in the viewport.
    pub fn for_viewport(scale: f64, viewport: &ViewportConfig) -> Self {
        Self::new(scale, [viewport.width / 2.0, viewport.height / 2.0])
    }

    pub fn project(&self, lon: f64, lat: f64) -> [f64; 2] {
        let lambda = lon.to_radians();
        let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        [
            self.translate[0] + self.scale * lambda,
            self.translate[1] - self.scale * phi.tan().asinh(),
        ]
    }

    pub fn invert(&self, x: f64, y: f64) -> [f64; 2] {
        let lambda = (x - self.translate[0]) / self.scale;
        let y = (self.translate[1] - y) / self.scale;
        let phi = y.sinh().atan();
        [lambda.to_degrees(), phi.to_degrees()]
    }

    /// SVG path data for every ring of `geometry`. Empty geometry gives "".
    pub fn path(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in geometry {
            self.ring(&mut d, polygon.exterior());
            for interior in polygon.interiors() {
                self.ring(&mut d, interior);
            }
        }
        d
    }

    fn ring(&self, d: &mut String, ring: &LineString<f64>) {
        let coords = &ring.0;
        // Closing vertex is implied by Z
        let open = match (coords.first(), coords.last()) {
            (Some(first), Some(last)) if coords.len() > 1 && first == last => &coords[..coords.len() - 1],
            _ => &coords[..],
        };
        for (i, c) in open.iter().enumerate() {
            let [x, y] = self.project(c.x, c.y);
            let _ = write!(d, "{}{:.2},{:.2}", if i == 0 { 'M' } else { 'L' }, x, y);
        }
        if !open.is_empty() {
            d.push('Z');
        }
    }
}
