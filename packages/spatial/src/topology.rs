//! `TopoJSON` decoding into district polygons.
//!
//! A topology stores shared boundary arcs once and references them by
//! index from each geometry. Decoding resolves the arc references into
//! closed rings and builds one [`MultiPolygon`] per district, carrying the
//! three required district attributes.
//!
//! Quantized topologies (with a `transform`) store delta-encoded integer
//! positions; these are accumulated and scaled back to WGS84 degrees.
//!
//! See <https://github.com/topojson/topojson-specification>

use std::collections::BTreeMap;
use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use power_map_district_models::{
    CODE_PROPERTY, COMBINED_PROPERTY, DistrictAttributes, NAME_PROPERTY,
};
use serde::Deserialize;

use crate::{District, SpatialError};

/// Default object name for the Oslo district topology.
pub const DEFAULT_OBJECT_NAME: &str = "Bydeler";

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    transform: Option<Transform>,
    objects: BTreeMap<String, Geometry>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

type Properties = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection {
        #[serde(default)]
        geometries: Vec<Geometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    #[serde(other)]
    Unsupported,
}

/// A geometry object as it appears in the document. Null geometries
/// (`"type": null` or no `type` member) decode as
/// [`TopoGeometry::Unsupported`].
#[derive(Debug)]
struct Geometry(TopoGeometry);

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let untyped = value
            .as_object()
            .is_some_and(|object| object.get("type").is_none_or(serde_json::Value::is_null));
        if untyped {
            return Ok(Self(TopoGeometry::Unsupported));
        }
        serde_json::from_value(value)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Reads a `TopoJSON` file and decodes the named object into districts.
///
/// # Errors
///
/// Returns [`SpatialError`] if the file cannot be read, is not valid
/// JSON, or is not a well-formed district topology.
pub fn load_topology_file(path: &Path, object_name: &str) -> Result<Vec<District>, SpatialError> {
    let contents = std::fs::read_to_string(path)?;
    let districts = load_topology(&contents, object_name)?;
    log::info!(
        "Loaded {} districts from {} (object '{object_name}')",
        districts.len(),
        path.display()
    );
    Ok(districts)
}

/// Decodes the named object of a `TopoJSON` document into districts,
/// preserving the order of geometries in the document.
///
/// # Errors
///
/// Returns [`SpatialError::MalformedTopology`] if the document is not a
/// `Topology`, the object is missing, an arc index is out of range, or any
/// polygon lacks one of the required district attributes.
pub fn load_topology(json: &str, object_name: &str) -> Result<Vec<District>, SpatialError> {
    let topology: Topology = serde_json::from_str(json)?;

    if topology.kind != "Topology" {
        return Err(malformed(format!(
            "expected type 'Topology', found '{}'",
            topology.kind
        )));
    }

    let object = topology
        .objects
        .get(object_name)
        .ok_or_else(|| malformed(format!("object '{object_name}' not found")))?;

    let arcs = decode_arcs(&topology.arcs, topology.transform);

    let mut districts = Vec::new();
    collect_districts(&object.0, &arcs, &mut districts)?;

    if districts.is_empty() {
        return Err(malformed(format!(
            "object '{object_name}' contains no polygons"
        )));
    }

    Ok(districts)
}

fn collect_districts(
    geometry: &TopoGeometry,
    arcs: &[Vec<Coord<f64>>],
    out: &mut Vec<District>,
) -> Result<(), SpatialError> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for child in geometries {
                collect_districts(&child.0, arcs, out)?;
            }
        }
        TopoGeometry::Polygon { arcs: rings, properties } => {
            let attributes = district_attributes(properties.as_ref(), out.len())?;
            let polygon = build_polygon(rings, arcs)?;
            out.push(District {
                attributes,
                boundary: MultiPolygon(vec![polygon]),
            });
        }
        TopoGeometry::MultiPolygon {
            arcs: polygons,
            properties,
        } => {
            let attributes = district_attributes(properties.as_ref(), out.len())?;
            let polygons = polygons
                .iter()
                .map(|rings| build_polygon(rings, arcs))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(District {
                attributes,
                boundary: MultiPolygon(polygons),
            });
        }
        TopoGeometry::Unsupported => {
            log::debug!("Skipping non-polygon geometry in topology");
        }
    }
    Ok(())
}

/// Extracts the three required attributes from a geometry's properties.
fn district_attributes(
    properties: Option<&Properties>,
    index: usize,
) -> Result<DistrictAttributes, SpatialError> {
    let properties =
        properties.ok_or_else(|| malformed(format!("polygon #{index} has no properties")))?;

    let get = |key: &str| {
        property_string(properties, key)
            .ok_or_else(|| malformed(format!("polygon #{index} is missing property '{key}'")))
    };

    Ok(DistrictAttributes {
        name: get(NAME_PROPERTY)?,
        code: get(CODE_PROPERTY)?,
        combined: get(COMBINED_PROPERTY)?,
    })
}

/// Reads a property as a string. Numeric codes are rendered as text.
fn property_string(properties: &Properties, key: &str) -> Option<String> {
    match properties.get(key)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts raw arc positions to absolute coordinates, undoing delta
/// encoding and quantization when a transform is present.
fn decode_arcs(raw: &[Vec<Vec<f64>>], transform: Option<Transform>) -> Vec<Vec<Coord<f64>>> {
    raw.iter()
        .map(|arc| {
            let Some(t) = transform else {
                return arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect();
            };

            let mut x = 0.0;
            let mut y = 0.0;
            arc.iter()
                .filter(|p| p.len() >= 2)
                .map(|p| {
                    x += p[0];
                    y += p[1];
                    Coord {
                        x: x.mul_add(t.scale[0], t.translate[0]),
                        y: y.mul_add(t.scale[1], t.translate[1]),
                    }
                })
                .collect()
        })
        .collect()
}

/// Builds a polygon from rings of arc references. The first ring is the
/// exterior, the rest are holes.
fn build_polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>, SpatialError> {
    let mut lines = rings
        .iter()
        .map(|ring| build_ring(ring, arcs))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    let exterior = lines
        .next()
        .ok_or_else(|| malformed("polygon has no rings".to_string()))?;

    Ok(Polygon::new(exterior, lines.collect()))
}

/// Stitches arc references into one ring. A negative index `i` refers to
/// arc `!i` traversed in reverse. Consecutive arcs share an endpoint,
/// which is emitted only once.
fn build_ring(refs: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<LineString<f64>, SpatialError> {
    let mut coords: Vec<Coord<f64>> = Vec::new();

    for &arc_ref in refs {
        let (index, reversed) = if arc_ref < 0 {
            (!arc_ref, true)
        } else {
            (arc_ref, false)
        };

        let arc = usize::try_from(index)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or_else(|| malformed(format!("arc index {arc_ref} out of range")))?;

        if !coords.is_empty() {
            coords.pop();
        }

        if reversed {
            coords.extend(arc.iter().rev().copied());
        } else {
            coords.extend(arc.iter().copied());
        }
    }

    if coords.len() < 3 {
        return Err(malformed(format!(
            "ring {refs:?} has fewer than 3 positions"
        )));
    }

    Ok(LineString::new(coords))
}

const fn malformed(message: String) -> SpatialError {
    SpatialError::MalformedTopology { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit-ish squares sharing the edge at x = 1, unquantized.
    fn two_squares() -> serde_json::Value {
        serde_json::json!({
            "type": "Topology",
            "objects": {
                "Bydeler": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {
                            "type": "Polygon",
                            "arcs": [[0, 1]],
                            "properties": {"BYDELSNAVN": "West", "BYDEL": "030101", "Kombinert": "West"}
                        },
                        {
                            "type": "Polygon",
                            "arcs": [[2, -1]],
                            "properties": {"BYDELSNAVN": "East", "BYDEL": 30102, "Kombinert": "East"}
                        }
                    ]
                }
            },
            "arcs": [
                [[1.0, 0.0], [1.0, 1.0]],
                [[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
                [[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0]]
            ]
        })
    }

    #[test]
    fn decodes_polygons_in_order() {
        let districts = load_topology(&two_squares().to_string(), "Bydeler").unwrap();
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[0].attributes.name, "West");
        assert_eq!(districts[1].attributes.name, "East");
        assert_eq!(districts[1].attributes.code, "30102");
    }

    #[test]
    fn stitches_shared_arcs_without_duplicates() {
        let districts = load_topology(&two_squares().to_string(), "Bydeler").unwrap();
        let exterior = districts[0].boundary.0[0].exterior();
        // 4 corners + closing point
        assert_eq!(exterior.0.len(), 5);
        assert!(exterior.is_closed());

        let east = districts[1].boundary.0[0].exterior();
        assert_eq!(east.0.first(), Some(&Coord { x: 1.0, y: 0.0 }));
        assert_eq!(east.0.len(), 5);
    }

    #[test]
    fn decodes_quantized_arcs() {
        let topo = serde_json::json!({
            "type": "Topology",
            "transform": {"scale": [0.01, 0.01], "translate": [10.70, 59.91]},
            "objects": {
                "Bydeler": {
                    "type": "GeometryCollection",
                    "geometries": [{
                        "type": "MultiPolygon",
                        "arcs": [[[0]]],
                        "properties": {"BYDELSNAVN": "Frogner", "BYDEL": "030105", "Kombinert": "Frogner"}
                    }]
                }
            },
            "arcs": [[[0, 0], [2, 0], [0, 2], [-2, 0], [0, -2]]]
        });

        let districts = load_topology(&topo.to_string(), "Bydeler").unwrap();
        let ring = &districts[0].boundary.0[0].exterior().0;
        assert!((ring[1].x - 10.72).abs() < 1e-9);
        assert!((ring[2].y - 59.93).abs() < 1e-9);
        assert!((ring[4].x - 10.70).abs() < 1e-9);
    }

    #[test]
    fn missing_attribute_is_malformed() {
        let mut topo = two_squares();
        topo["objects"]["Bydeler"]["geometries"][1]["properties"]
            .as_object_mut()
            .unwrap()
            .remove("Kombinert");

        let err = load_topology(&topo.to_string(), "Bydeler").unwrap_err();
        assert!(matches!(err, SpatialError::MalformedTopology { .. }));
        assert!(err.to_string().contains("Kombinert"));
    }

    #[test]
    fn missing_object_is_malformed() {
        let err = load_topology(&two_squares().to_string(), "Kommuner").unwrap_err();
        assert!(matches!(err, SpatialError::MalformedTopology { .. }));
    }

    #[test]
    fn out_of_range_arc_is_malformed() {
        let mut topo = two_squares();
        topo["objects"]["Bydeler"]["geometries"][0]["arcs"] = serde_json::json!([[0, 7]]);
        let err = load_topology(&topo.to_string(), "Bydeler").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn null_geometries_are_skipped() {
        let mut topo = two_squares();
        let geometries = topo["objects"]["Bydeler"]["geometries"]
            .as_array_mut()
            .unwrap();
        geometries.insert(0, serde_json::json!({"type": null}));
        geometries.push(serde_json::json!({"properties": {"BYDELSNAVN": "Marka"}}));
        geometries.push(serde_json::json!({"type": "Point", "coordinates": [0, 0]}));

        let districts = load_topology(&topo.to_string(), "Bydeler").unwrap();
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[0].attributes.name, "West");
        assert_eq!(districts[1].attributes.name, "East");
    }

    #[test]
    fn null_object_has_no_polygons() {
        let mut topo = two_squares();
        topo["objects"]["Bydeler"] = serde_json::json!({"type": null});
        let err = load_topology(&topo.to_string(), "Bydeler").unwrap_err();
        assert!(err.to_string().contains("no polygons"));
    }

    #[test]
    fn rejects_non_topology() {
        let json = serde_json::json!({"type": "FeatureCollection", "objects": {}}).to_string();
        assert!(load_topology(&json, "Bydeler").is_err());
    }
}
