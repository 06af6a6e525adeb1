//! Great-circle distance on a spherical Earth.

use lampstand_directory::Coordinate;

mod region;

pub use region::{REGION_BOUNDS, RegionBounds, approximate_region};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Unrounded haversine distance in kilometres.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = ((d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2))
        .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Round to one decimal place, the precision distances are compared and shown at.
pub fn round_km(distance: f64) -> f64 {
    (distance * 10.0).round() / 10.0
}

/// Haversine distance rounded to one decimal place.
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    round_km(haversine_km(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYDNEY: Coordinate = Coordinate::new(-33.87, 151.21);
    const MELBOURNE: Coordinate = Coordinate::new(-37.81, 144.96);
    const PERTH: Coordinate = Coordinate::new(-31.95, 115.86);
    const LONDON: Coordinate = Coordinate::new(51.5074, -0.1278);

    #[test]
    fn test_distance_to_self_is_zero() {
        for coord in [SYDNEY, MELBOURNE, PERTH, LONDON] {
            assert_eq!(haversine_km(coord, coord), 0.0);
            assert_eq!(distance_km(coord, coord), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let points = [SYDNEY, MELBOURNE, PERTH, LONDON];
        for a in points {
            for b in points {
                assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
                assert_eq!(distance_km(a, b), distance_km(b, a));
            }
        }
    }

    #[test]
    fn test_known_distances() {
        // Sydney to Melbourne is roughly 713 km as the crow flies
        let d = distance_km(SYDNEY, MELBOURNE);
        assert!((d - 713.4).abs() < 1.0, "got {d}");

        let d = distance_km(SYDNEY, Coordinate::new(-33.80, 151.00));
        assert!((d - 20.9).abs() < 0.2, "got {d}");
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let d = haversine_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(20.8998), 20.9);
        assert_eq!(round_km(20.84), 20.8);
        assert_eq!(round_km(0.04), 0.0);
    }
}
