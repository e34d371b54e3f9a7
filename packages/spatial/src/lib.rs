#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial lookups for consumption enrichment.
//!
//! Loads district polygons from a `TopoJSON` topology once at startup,
//! builds an R-tree over their bounding boxes, and provides
//! point-in-polygon district resolution. Also provides the linear
//! nearest-station scan used to pair addresses with weather stations.

pub mod nearest;
pub mod topology;

use geo::{BoundingRect as _, Contains as _, MultiPolygon};
use power_map_consumption_models::Coordinate;
use power_map_district_models::DistrictAttributes;
use rstar::{AABB, RTree, RTreeObject};

pub use nearest::{match_station, resolve_nearest};
pub use topology::{DEFAULT_OBJECT_NAME, load_topology, load_topology_file};

/// Errors that can occur while loading spatial reference data.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The topology is incomplete or inconsistent.
    #[error("Malformed topology: {message}")]
    MalformedTopology {
        /// Description of what is wrong.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named district polygon. Coordinates are WGS84 degrees with
/// `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct District {
    /// Name, code and combined-group code.
    pub attributes: DistrictAttributes,
    /// District boundary.
    pub boundary: MultiPolygon<f64>,
}

impl District {
    /// Returns `true` if `point` lies strictly inside the boundary.
    /// Points on the boundary line are not contained.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.boundary.contains(&to_geo_point(point))
    }

    /// Converts the district into a `GeoJSON` feature carrying its
    /// attributes plus any `extra` properties.
    #[must_use]
    pub fn to_feature(
        &self,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> geojson::Feature {
        let mut properties = match serde_json::to_value(&self.attributes) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        properties.extend(extra);

        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.boundary))),
            id: Some(geojson::feature::Id::String(self.attributes.code.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Returns the first district in `districts` containing `point`.
///
/// Districts are tested in slice order, so if polygons overlap the earliest
/// one wins.
#[must_use]
pub fn resolve(point: Coordinate, districts: &[District]) -> Option<&District> {
    districts.iter().find(|d| d.contains(point))
}

/// A district's bounding box stored in the R-tree, pointing back at its
/// position in load order.
struct DistrictEntry {
    order: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for DistrictEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over the district polygons.
///
/// Constructed once per run and shared read-only across all per-record
/// resolutions. Gives the same answer as [`resolve`]: when polygons
/// overlap, the district loaded first wins.
pub struct DistrictIndex {
    districts: Vec<District>,
    tree: RTree<DistrictEntry>,
}

impl DistrictIndex {
    /// Builds the index. The order of `districts` defines precedence for
    /// overlapping polygons.
    #[must_use]
    pub fn new(districts: Vec<District>) -> Self {
        let entries = districts
            .iter()
            .enumerate()
            .map(|(order, d)| DistrictEntry {
                order,
                envelope: compute_envelope(&d.boundary),
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built district index over {} polygons", tree.size());

        Self { districts, tree }
    }

    /// Resolves the district containing `point`, or `None` if the point
    /// lies outside every district.
    #[must_use]
    pub fn resolve(&self, point: Coordinate) -> Option<&District> {
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| self.districts[entry.order].contains(point))
            .map(|entry| entry.order)
            .min()
            .map(|order| &self.districts[order])
    }

    /// Resolves an optional location. A missing location yields `None`.
    #[must_use]
    pub fn resolve_location(&self, location: Option<Coordinate>) -> Option<&District> {
        location.and_then(|point| self.resolve(point))
    }

    /// The indexed districts in load order.
    #[must_use]
    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    /// Number of indexed districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.len()
    }

    /// Returns `true` if no districts are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

impl std::fmt::Debug for DistrictIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistrictIndex")
            .field("districts", &self.districts.len())
            .finish_non_exhaustive()
    }
}

fn to_geo_point(point: Coordinate) -> geo::Point<f64> {
    geo::Point::new(point.longitude, point.latitude)
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use geo::{LineString, MultiPolygon, Polygon};
    use power_map_district_models::DistrictAttributes;

    use crate::District;

    /// Axis-aligned square district from (lat, lon) corners.
    pub fn square(name: &str, south_west: (f64, f64), north_east: (f64, f64)) -> District {
        let (lat0, lon0) = south_west;
        let (lat1, lon1) = north_east;
        let ring = LineString::from(vec![
            (lon0, lat0),
            (lon1, lat0),
            (lon1, lat1),
            (lon0, lat1),
            (lon0, lat0),
        ]);
        District {
            attributes: DistrictAttributes::new(name, format!("code-{name}"), name),
            boundary: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::square;
    use super::*;

    fn oslo() -> Vec<District> {
        vec![
            square("Frogner", (59.91, 10.70), (59.93, 10.72)),
            square("Sagene", (59.93, 10.74), (59.95, 10.77)),
        ]
    }

    #[test]
    fn point_inside_frogner() {
        let index = DistrictIndex::new(oslo());
        let found = index.resolve(Coordinate::new(59.92, 10.71)).unwrap();
        assert_eq!(found.attributes.name, "Frogner");
    }

    #[test]
    fn point_outside_every_district() {
        let index = DistrictIndex::new(oslo());
        assert!(index.resolve(Coordinate::new(60.00, 10.71)).is_none());
        assert!(resolve(Coordinate::new(60.00, 10.71), index.districts()).is_none());
    }

    #[test]
    fn missing_location_has_no_district() {
        let index = DistrictIndex::new(oslo());
        assert!(index.resolve_location(None).is_none());
    }

    #[test]
    fn overlapping_polygons_first_loaded_wins() {
        let districts = vec![
            square("First", (59.90, 10.70), (59.94, 10.74)),
            square("Second", (59.91, 10.71), (59.95, 10.75)),
        ];
        let point = Coordinate::new(59.92, 10.72);

        let index = DistrictIndex::new(districts.clone());
        assert_eq!(index.resolve(point).unwrap().attributes.name, "First");
        assert_eq!(resolve(point, &districts).unwrap().attributes.name, "First");

        let reversed: Vec<District> = districts.into_iter().rev().collect();
        let index = DistrictIndex::new(reversed);
        assert_eq!(index.resolve(point).unwrap().attributes.name, "Second");
    }

    #[test]
    fn index_agrees_with_linear_scan() {
        let districts = oslo();
        let index = DistrictIndex::new(districts.clone());

        for i in 0..40 {
            for j in 0..40 {
                let point = Coordinate::new(
                    f64::from(i).mul_add(0.0013, 59.90),
                    f64::from(j).mul_add(0.0021, 10.69),
                );
                assert_eq!(
                    index.resolve(point).map(|d| &d.attributes.name),
                    resolve(point, &districts).map(|d| &d.attributes.name),
                    "disagreement at {point:?}"
                );
            }
        }
    }

    #[test]
    fn strictly_inside_exactly_one_district() {
        let index = DistrictIndex::new(oslo());
        let point = Coordinate::new(59.94, 10.75);
        let containing: Vec<_> = index
            .districts()
            .iter()
            .filter(|d| d.contains(point))
            .collect();
        assert_eq!(containing.len(), 1);
        assert_eq!(index.resolve(point).unwrap().attributes.name, "Sagene");
    }

    #[test]
    fn feature_carries_attributes_and_extra_properties() {
        let district = square("Frogner", (59.91, 10.70), (59.93, 10.72));
        let mut extra = serde_json::Map::new();
        extra.insert("forbruk_kwh".to_string(), serde_json::json!(12.5));

        let feature = district.to_feature(extra);
        let props = feature.properties.unwrap();
        assert_eq!(props["BYDELSNAVN"], "Frogner");
        assert_eq!(props["forbruk_kwh"], 12.5);
        assert!(feature.geometry.is_some());
    }
}
