//! Geographic points and great-circle distance math.
//!
//! Locations are validated once at construction and embedded into the
//! pending-request spatial index as unit-sphere coordinates. Chord
//! (straight-line) distance on the unit sphere is monotonic in
//! great-circle distance, so R-tree nearest-neighbor ordering over
//! these coordinates matches geographic ordering.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Mean Earth radius in meters, as used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A validated geographic point (WGS84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Longitude in degrees, within [-180, 180].
    pub longitude: f64,
    /// Latitude in degrees, within [-90, 90].
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a validated point.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if either coordinate is
    /// non-finite or outside its valid range.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, GatewayError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(GatewayError::Validation(
                "location coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GatewayError::Validation(format!(
                "longitude {longitude} out of range [-180, 180]"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GatewayError::Validation(format!(
                "latitude {latitude} out of range [-90, 90]"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Great-circle distance to `other` in meters (haversine).
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_M * c
    }

    /// Projects the point onto the unit sphere as 3D Cartesian coordinates.
    ///
    /// Used as the R-tree key for the pending-request index.
    #[must_use]
    pub fn to_unit_sphere(&self) -> [f64; 3] {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

/// Converts a great-circle arc length in meters to the equivalent chord
/// length on the unit sphere.
///
/// Arcs longer than half the Earth's circumference clamp to the maximum
/// chord (the sphere's diameter).
#[must_use]
pub fn chord_for_arc_m(arc_m: f64) -> f64 {
    let half_angle = (arc_m / EARTH_RADIUS_M / 2.0).min(std::f64::consts::FRAC_PI_2);
    2.0 * half_angle.sin()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn point(longitude: f64, latitude: f64) -> GeoPoint {
        let Ok(p) = GeoPoint::new(longitude, latitude) else {
            panic!("valid point");
        };
        p
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(181.0, 0.0).is_err());
        assert!(GeoPoint::new(-181.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 91.0).is_err());
        assert!(GeoPoint::new(0.0, -91.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(GeoPoint::new(180.0, 90.0).is_ok());
        assert!(GeoPoint::new(-180.0, -90.0).is_ok());
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = point(77.21, 28.61);
        assert!(p.distance_m(&p) < 1e-6);
    }

    #[test]
    fn one_degree_latitude_is_about_111_km() {
        let a = point(77.0, 28.0);
        let b = point(77.0, 29.0);
        let d = a.distance_m(&b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn chord_tracks_small_arcs() {
        // For small arcs chord ≈ arc / R.
        let chord = chord_for_arc_m(10_000.0);
        let expected = 10_000.0 / EARTH_RADIUS_M;
        assert!((chord - expected).abs() < 1e-9);
    }

    #[test]
    fn chord_clamps_to_diameter() {
        let chord = chord_for_arc_m(f64::MAX);
        assert!((chord - 2.0).abs() < 1e-12);
    }

    #[test]
    fn unit_sphere_projection_has_unit_norm() {
        let p = point(77.21, 28.61);
        let [x, y, z] = p.to_unit_sphere();
        let norm = (x * x + y * y + z * z).sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn chord_between_projections_matches_haversine() {
        let a = point(77.21, 28.61);
        let b = point(77.23, 28.62);
        let [ax, ay, az] = a.to_unit_sphere();
        let [bx, by, bz] = b.to_unit_sphere();
        let chord =
            ((ax - bx).powi(2) + (ay - by).powi(2) + (az - bz).powi(2)).sqrt();
        let via_chord = chord_for_arc_m(a.distance_m(&b));
        assert!((chord - via_chord).abs() < 1e-9);
    }
}
