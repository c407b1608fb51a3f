//! Continuous scales mapping a data interval onto a visual interval.
//!
//! Scales are unclamped: inputs outside the domain extrapolate. A collapsed
//! domain maps every input to the start of the range.

use crate::types::Meteorite;
use serde::Serialize;

const RADIUS_MIN: f64 = 0.5;
const OPACITY_RANGE: [f64; 2] = [0.6, 0.1];
const HUE_RANGE: [f64; 2] = [0.0, 360.0];

fn normalize(a: f64, b: f64, x: f64) -> f64 {
    let span = b - a;
    if span == 0.0 {
        0.0
    } else {
        (x - a) / span
    }
}

fn interpolate(range: [f64; 2], t: f64) -> f64 {
    range[0] * (1.0 - t) + range[1] * t
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, x: f64) -> f64 {
        interpolate(self.range, normalize(self.domain[0], self.domain[1], x))
    }
}

/// Square-root scale: area, not radius, grows linearly with the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SqrtScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

fn signed_sqrt(x: f64) -> f64 {
    if x < 0.0 {
        -(-x).sqrt()
    } else {
        x.sqrt()
    }
}

impl SqrtScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, x: f64) -> f64 {
        let (a, b) = (signed_sqrt(self.domain[0]), signed_sqrt(self.domain[1]));
        interpolate(self.range, normalize(a, b, signed_sqrt(x)))
    }
}

/// Minimum and maximum, skipping NaN. `None` when nothing comparable is left.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// The three mappings used to style strikes, fixed at load time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeteorScales {
    pub radius: SqrtScale,
    pub hue: LinearScale,
    pub opacity: LinearScale,
}

impl MeteorScales {
    /// `meteorites` must already be filtered and sorted; hue follows rank.
    pub fn from_meteorites(meteorites: &[Meteorite], viewport_width: f64) -> Option<Self> {
        let (lo, hi) = extent(meteorites.iter().map(|m| m.mass))?;
        Some(Self {
            radius: SqrtScale::new([lo, hi], [RADIUS_MIN, viewport_width / 20.0]),
            hue: LinearScale::new([0.0, meteorites.len() as f64], HUE_RANGE),
            opacity: LinearScale::new([lo, hi], OPACITY_RANGE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeteoriteProperties;
    use geo::Point;

    fn strikes(masses: &[f64]) -> Vec<Meteorite> {
        masses
            .iter()
            .map(|&mass| Meteorite {
                point: Point::new(0.0, 0.0),
                mass,
                properties: MeteoriteProperties::default(),
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn radius_spans_half_pixel_to_twentieth_of_width() {
        let scales = MeteorScales::from_meteorites(&strikes(&[1000.0, 100.0, 10.0]), 960.0).unwrap();
        assert!(close(scales.radius.apply(10.0), 0.5));
        assert!(close(scales.radius.apply(1000.0), 48.0));

        let mut last = f64::NEG_INFINITY;
        for mass in [10.0, 11.0, 50.0, 100.0, 999.0, 1000.0] {
            let r = scales.radius.apply(mass);
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn radius_grows_with_square_root() {
        let scale = SqrtScale::new([0.0, 100.0], [0.0, 10.0]);
        assert!(close(scale.apply(25.0), 5.0));
        assert!(close(scale.apply(64.0), 8.0));
    }

    #[test]
    fn opacity_falls_from_point_six_to_point_one() {
        let scales = MeteorScales::from_meteorites(&strikes(&[1000.0, 10.0]), 960.0).unwrap();
        assert!(close(scales.opacity.apply(10.0), 0.6));
        assert!(close(scales.opacity.apply(1000.0), 0.1));

        let mut last = f64::INFINITY;
        for mass in [10.0, 20.0, 500.0, 1000.0] {
            let o = scales.opacity.apply(mass);
            assert!(o <= last);
            last = o;
        }
    }

    #[test]
    fn hue_starts_at_zero_and_approaches_full_turn() {
        let scales = MeteorScales::from_meteorites(&strikes(&[4.0, 3.0, 2.0, 1.0]), 960.0).unwrap();
        assert_eq!(scales.hue.apply(0.0), 0.0);
        assert_eq!(scales.hue.apply(3.0), 270.0);
        assert!(scales.hue.apply(3.0) < 360.0);
    }

    #[test]
    fn collapsed_domain_maps_to_range_start() {
        let scales = MeteorScales::from_meteorites(&strikes(&[7.0]), 960.0).unwrap();
        assert!(close(scales.opacity.apply(7.0), 0.6));
        assert!(close(scales.radius.apply(7.0), 0.5));

        let same = MeteorScales::from_meteorites(&strikes(&[3.0, 3.0, 3.0]), 960.0).unwrap();
        assert!(close(same.radius.apply(3.0), 0.5));
        assert!(close(same.opacity.apply(3.0), 0.6));
    }

    #[test]
    fn no_strikes_no_scales() {
        assert!(MeteorScales::from_meteorites(&[], 960.0).is_none());
    }

    #[test]
    fn extent_skips_nan() {
        assert_eq!(extent([3.0, f64::NAN, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(extent([f64::NAN]), None);
    }

    #[test]
    fn linear_extrapolates_outside_domain() {
        let scale = LinearScale::new([0.0, 10.0], [100.0, 200.0]);
        assert!(close(scale.apply(2.5), 125.0));
        assert!(close(scale.apply(20.0), 300.0));
    }
}
