use crate::interaction::ViewTransform;
use crate::scene::Scene;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;

// Wrapper for RTree indexing
struct ShapeIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for ShapeIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// What lies under the pointer. A meteor on top hides the country below it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    pub meteor: Option<usize>,
    pub country: Option<usize>,
}

/// Spatial index over the scene, in scene (pre-transform) coordinates.
pub struct HitIndex {
    meteors: RTree<ShapeIndex>,
    countries: RTree<ShapeIndex>,
}

impl HitIndex {
    pub fn build(scene: &Scene) -> Self {
        let meteors = scene
            .meteors
            .iter()
            .enumerate()
            .map(|(index, m)| ShapeIndex {
                index,
                aabb: AABB::from_corners([m.cx - m.r, m.cy - m.r], [m.cx + m.r, m.cy + m.r]),
            })
            .collect();

        // Countries without geometry have no bounds and can never be hit
        let countries = scene
            .countries
            .iter()
            .enumerate()
            .filter_map(|(index, c)| {
                let rect = c.outline.bounding_rect()?;
                Some(ShapeIndex {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self {
            meteors: RTree::bulk_load(meteors),
            countries: RTree::bulk_load(countries),
        }
    }

    /// Topmost circle containing `point`; later circles paint over earlier ones.
    pub fn meteor_at(&self, scene: &Scene, point: [f64; 2]) -> Option<usize> {
        self.meteors
            .locate_in_envelope_intersecting(&AABB::from_point(point))
            .filter(|candidate| {
                scene.meteors.get(candidate.index).is_some_and(|m| {
                    let (dx, dy) = (point[0] - m.cx, point[1] - m.cy);
                    dx * dx + dy * dy <= m.r * m.r
                })
            })
            .map(|candidate| candidate.index)
            .max()
    }

    pub fn country_at(&self, scene: &Scene, point: [f64; 2]) -> Option<usize> {
        let p = Point::new(point[0], point[1]);
        self.countries
            .locate_in_envelope_intersecting(&AABB::from_point(point))
            .filter(|candidate| {
                scene
                    .countries
                    .get(candidate.index)
                    .is_some_and(|c| c.outline.contains(&p))
            })
            .map(|candidate| candidate.index)
            .max()
    }

    /// Resolves a screen point under the given view transform.
    pub fn pick(&self, scene: &Scene, transform: ViewTransform, screen: [f64; 2]) -> Hit {
        let point = transform.invert(screen);
        let meteor = self.meteor_at(scene, point);
        let country = match meteor {
            Some(_) => None,
            None => self.country_at(scene, point),
        };
        Hit { meteor, country }
    }
}
