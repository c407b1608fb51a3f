//! TopoJSON decoding.
//!
//! A topology stores shared boundaries once, as arcs, and geometries refer to
//! arcs by index. Decoding stitches the arcs back into standalone rings.

use crate::types::Country;
use anyhow::{anyhow, Context, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: HashMap<String, TopoObject>,
}

/// Quantization transform; arcs are delta-encoded when present.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone)]
pub struct TopoObject {
    /// `None` for a null, missing or unrecognised `type`.
    pub geometry: Option<TopoGeometry>,
    pub id: Option<Value>,
    pub properties: Option<Map<String, Value>>,
}

const GEOMETRY_TYPES: [&str; 7] = [
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

// The tag is inspected before the body is decoded, so a known type with a
// broken body fails instead of collapsing into an empty geometry.
impl<'de> Deserialize<'de> for TopoObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut raw = Map::<String, Value>::deserialize(deserializer)?;
        let id = raw.remove("id").filter(|v| !v.is_null());
        let properties = match raw.remove("properties") {
            Some(value) => serde_json::from_value(value).map_err(D::Error::custom)?,
            None => None,
        };
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .filter(|kind| GEOMETRY_TYPES.contains(kind))
            .map(str::to_owned);
        let geometry = match kind {
            Some(kind) => Some(
                TopoGeometry::deserialize(Value::Object(raw))
                    .map_err(|e| D::Error::custom(format!("invalid {} geometry: {}", kind, e)))?,
            ),
            None => None,
        };
        Ok(Self {
            geometry,
            id,
            properties,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    GeometryCollection { geometries: Vec<TopoObject> },
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Failed to parse TopoJSON topology")
    }

    /// Converts the named object into one country per member geometry.
    pub fn countries(&self, object: &str) -> Result<Vec<Country>> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| anyhow!("Topology has no object named '{}'", object))?;

        let decoder = Decoder::new(self)?;

        let members: Vec<&TopoObject> = match &root.geometry {
            Some(TopoGeometry::GeometryCollection { geometries }) => geometries.iter().collect(),
            _ => vec![root],
        };

        members
            .into_iter()
            .enumerate()
            .map(|(i, member)| {
                let geometry = match &member.geometry {
                    Some(g) => decoder
                        .geometry(g)
                        .with_context(|| format!("Failed to decode geometry #{} of '{}'", i, object))?,
                    None => Geometry::MultiPolygon(MultiPolygon::new(vec![])),
                };
                Ok(Country {
                    id: member.id.as_ref().map(id_string).unwrap_or_default(),
                    geometry: polygons_of(geometry),
                    properties: member.properties.clone(),
                })
            })
            .collect()
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keeps only the polygonal parts of a geometry.
fn polygons_of(geometry: Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        Geometry::GeometryCollection(gc) => MultiPolygon::new(
            gc.into_iter().flat_map(|g| polygons_of(g).0).collect(),
        ),
        _ => MultiPolygon::new(vec![]),
    }
}

struct Decoder {
    arcs: Vec<Vec<Coord<f64>>>,
    transform: Option<Transform>,
}

impl Decoder {
    fn new(topology: &Topology) -> Result<Self> {
        let arcs = topology
            .arcs
            .iter()
            .enumerate()
            .map(|(i, arc)| {
                decode_arc(arc, topology.transform).with_context(|| format!("Malformed arc #{}", i))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            arcs,
            transform: topology.transform,
        })
    }

    fn position(&self, p: &[f64]) -> Result<Coord<f64>> {
        let (x, y) = pair(p)?;
        Ok(match self.transform {
            Some(t) => Coord {
                x: x * t.scale[0] + t.translate[0],
                y: y * t.scale[1] + t.translate[1],
            },
            None => Coord { x, y },
        })
    }

    fn arc(&self, index: i64) -> Result<Vec<Coord<f64>>> {
        let (slot, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(slot)
            .ok()
            .and_then(|slot| self.arcs.get(slot))
            .ok_or_else(|| anyhow!("Arc index {} out of range ({} arcs)", index, self.arcs.len()))?;
        let mut points = arc.clone();
        if reversed {
            points.reverse();
        }
        Ok(points)
    }

    // Consecutive arcs share an endpoint; it is emitted once.
    fn line(&self, indices: &[i64]) -> Result<Vec<Coord<f64>>> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for &index in indices {
            let arc = self.arc(index)?;
            if !points.is_empty() {
                points.pop();
            }
            points.extend(arc);
        }
        Ok(points)
    }

    fn ring(&self, indices: &[i64]) -> Result<LineString<f64>> {
        let mut points = self.line(indices)?;
        if let Some(&first) = points.first() {
            while points.len() < 4 {
                points.push(first);
            }
        }
        Ok(LineString::new(points))
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Option<Polygon<f64>>> {
        let mut rings = rings.iter().map(|r| self.ring(r));
        let exterior = match rings.next() {
            Some(ring) => ring?,
            None => return Ok(None),
        };
        let interiors = rings.collect::<Result<Vec<_>>>()?;
        Ok(Some(Polygon::new(exterior, interiors)))
    }

    fn geometry(&self, geometry: &TopoGeometry) -> Result<Geometry<f64>> {
        Ok(match geometry {
            TopoGeometry::Point { coordinates } => {
                Geometry::Point(Point::from(self.position(coordinates)?))
            }
            TopoGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|c| self.position(c).map(Point::from))
                    .collect::<Result<_>>()?,
            )),
            TopoGeometry::LineString { arcs } => {
                Geometry::LineString(LineString::new(self.line(arcs)?))
            }
            TopoGeometry::MultiLineString { arcs } => Geometry::MultiLineString(MultiLineString::new(
                arcs.iter()
                    .map(|a| self.line(a).map(LineString::new))
                    .collect::<Result<_>>()?,
            )),
            TopoGeometry::Polygon { arcs } => match self.polygon(arcs)? {
                Some(p) => Geometry::Polygon(p),
                None => Geometry::MultiPolygon(MultiPolygon::new(vec![])),
            },
            TopoGeometry::MultiPolygon { arcs } => {
                let mut polygons = Vec::with_capacity(arcs.len());
                for rings in arcs {
                    if let Some(p) = self.polygon(rings)? {
                        polygons.push(p);
                    }
                }
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
            TopoGeometry::GeometryCollection { geometries } => {
                let mut members = Vec::with_capacity(geometries.len());
                for member in geometries {
                    if let Some(g) = &member.geometry {
                        members.push(self.geometry(g)?);
                    }
                }
                Geometry::GeometryCollection(GeometryCollection::from(members))
            }
        })
    }
}

fn pair(p: &[f64]) -> Result<(f64, f64)> {
    match p {
        [x, y, ..] => Ok((*x, *y)),
        _ => Err(anyhow!("Position needs two values, got {}", p.len())),
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<Transform>) -> Result<Vec<Coord<f64>>> {
    match transform {
        Some(t) => {
            let (mut x, mut y) = (0.0, 0.0);
            arc.iter()
                .map(|p| {
                    let (dx, dy) = pair(p)?;
                    x += dx;
                    y += dy;
                    Ok(Coord {
                        x: x * t.scale[0] + t.translate[0],
                        y: y * t.scale[1] + t.translate[1],
                    })
                })
                .collect()
        }
        None => arc
            .iter()
            .map(|p| pair(p).map(|(x, y)| Coord { x, y }))
            .collect(),
    }
}
