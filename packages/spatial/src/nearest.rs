//! Nearest weather station resolution.
//!
//! Distance is Euclidean in raw (latitude, longitude) degree space. The
//! stations cover a single metro area, so the distortion of treating
//! degrees as planar does not change which station is nearest in
//! practice. Station counts are in the tens, so a linear scan is used.

use power_map_consumption_models::Coordinate;
use power_map_weather_models::{StationMatch, WeatherStation};

/// Returns the station nearest to `point` and its distance.
///
/// Ties are broken by the first station in slice order. Returns `None`
/// when `stations` is empty.
#[must_use]
pub fn resolve_nearest(point: Coordinate, stations: &[WeatherStation]) -> Option<(&WeatherStation, f64)> {
    let mut best: Option<(&WeatherStation, f64)> = None;

    for station in stations {
        let distance = point.degree_distance(&station.location);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((station, distance)),
        }
    }

    best
}

/// Matches an optional location to its nearest station, recording both
/// locations for auditing. A missing location yields `None`.
#[must_use]
pub fn match_station(location: Option<Coordinate>, stations: &[WeatherStation]) -> Option<StationMatch> {
    let point = location?;
    let (station, distance) = resolve_nearest(point, stations)?;

    Some(StationMatch {
        station_id: station.id.clone(),
        distance,
        station_location: station.location,
        address_location: point,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, latitude: f64, longitude: f64) -> WeatherStation {
        WeatherStation {
            id: id.to_string(),
            name: None,
            location: Coordinate::new(latitude, longitude),
        }
    }

    #[test]
    fn picks_closest_station() {
        let stations = vec![station("A", 59.90, 10.70), station("B", 59.95, 10.80)];
        let (nearest, _) = resolve_nearest(Coordinate::new(59.91, 10.71), &stations).unwrap();
        assert_eq!(nearest.id, "A");
    }

    #[test]
    fn empty_station_set_has_no_match() {
        assert!(resolve_nearest(Coordinate::new(59.91, 10.71), &[]).is_none());
    }

    #[test]
    fn missing_location_has_no_match() {
        let stations = vec![station("A", 59.90, 10.70)];
        assert!(match_station(None, &stations).is_none());
    }

    #[test]
    fn ties_go_to_first_station() {
        let stations = vec![station("A", 1.0, 0.0), station("B", 3.0, 0.0)];
        let (nearest, _) = resolve_nearest(Coordinate::new(2.0, 0.0), &stations).unwrap();
        assert_eq!(nearest.id, "A");
    }

    #[test]
    fn nearest_distance_is_minimal() {
        let stations: Vec<WeatherStation> = (0..25)
            .map(|i| {
                let f = f64::from(i);
                station(
                    &format!("SN{i}"),
                    (f * 0.37).sin().mul_add(0.1, 59.9),
                    (f * 0.73).cos().mul_add(0.2, 10.75),
                )
            })
            .collect();

        for k in 0..30 {
            let f = f64::from(k);
            let point = Coordinate::new(f.mul_add(0.007, 59.8), f.mul_add(0.011, 10.6));
            let (_, distance) = resolve_nearest(point, &stations).unwrap();
            for other in &stations {
                assert!(distance <= point.degree_distance(&other.location));
            }
        }
    }

    #[test]
    fn match_records_both_locations() {
        let stations = vec![station("A", 59.90, 10.70), station("B", 59.95, 10.80)];
        let point = Coordinate::new(59.94, 10.79);
        let matched = match_station(Some(point), &stations).unwrap();
        assert_eq!(matched.station_id, "B");
        assert_eq!(matched.station_location, Coordinate::new(59.95, 10.80));
        assert_eq!(matched.address_location, point);
        assert!((matched.distance - point.degree_distance(&matched.station_location)).abs() < 1e-12);
    }
}
