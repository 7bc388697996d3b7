use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the latitude/longitude ranges.
    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Key for exact coordinate equality; `-0.0` and `0.0` compare equal.
    pub fn bits_key(self) -> (u64, u64) {
        ((self.latitude + 0.0).to_bits(), (self.longitude + 0.0).to_bits())
    }
}

pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Haversine great-circle distance in kilometres. NaN inputs yield NaN.
pub fn distance_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = to_radians(to.latitude - from.latitude);
    let d_lon = to_radians(to.longitude - from.longitude);
    let a = (d_lat / 2.0).sin().powi(2)
        + to_radians(from.latitude).cos()
            * to_radians(to.latitude).cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: GeoPoint = GeoPoint::new(48.8566, 2.3522);
    const MILAN: GeoPoint = GeoPoint::new(45.4642, 9.19);

    fn close(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= scale * 1e-6
    }

    #[test]
    fn distance_to_self_is_zero() {
        for point in [PARIS, MILAN, GeoPoint::new(0.0, 0.0), GeoPoint::new(-33.9, 151.2)] {
            assert!(distance_km(point, point).abs() < 1e-9);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let samples = [
            (PARIS, MILAN),
            (GeoPoint::new(0.0, 179.9), GeoPoint::new(0.0, -179.9)),
            (GeoPoint::new(89.0, 10.0), GeoPoint::new(-89.0, -170.0)),
        ];
        for (a, b) in samples {
            assert!(close(distance_km(a, b), distance_km(b, a)));
        }
    }

    #[test]
    fn paris_to_milan_is_about_640_km() {
        let distance = distance_km(PARIS, MILAN);
        assert!((distance - 640.0).abs() < 10.0, "got {distance}");
    }

    #[test]
    fn nan_coordinates_propagate() {
        let broken = GeoPoint::new(f64::NAN, 2.0);
        assert!(distance_km(broken, PARIS).is_nan());
        assert!(!broken.is_valid());
    }

    #[test]
    fn validity_checks_ranges() {
        assert!(PARIS.is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn radians_round_trip() {
        assert!(close(to_degrees(to_radians(123.4)), 123.4));
    }

    #[test]
    fn signed_zero_shares_a_key() {
        assert_eq!(
            GeoPoint::new(0.0, -0.0).bits_key(),
            GeoPoint::new(-0.0, 0.0).bits_key()
        );
    }
}
