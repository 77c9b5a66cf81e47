use crate::GeoscopeError;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A point on the globe in degrees. Both components are finite and
/// latitude lies in [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

impl TryFrom<RawCoordinate> for GeoCoordinate {
    type Error = GeoscopeError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        GeoCoordinate::new(raw.latitude, raw.longitude)
    }
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoscopeError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeoscopeError::Precondition(format!(
                "coordinate must be finite, got ({latitude}, {longitude})"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoscopeError::Precondition(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_m(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // Rounding can push `a` a hair above 1 for antipodal points.
        let c = 2.0 * a.min(1.0).sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// Unit vector `(cos φ cos λ, cos φ sin λ, sin φ)`.
    fn unit_vector(&self) -> [f64; 3] {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

/// Geometric center on the sphere: average the unit vectors and convert back.
///
/// A (near-)zero average, e.g. two antipodal points, has no meaningful
/// direction; `atan2` still yields a finite point, which is returned as is.
pub fn spherical_midpoint(coords: &[GeoCoordinate]) -> Option<GeoCoordinate> {
    if coords.is_empty() {
        return None;
    }

    let mut sum = [0.0_f64; 3];
    for c in coords {
        let v = c.unit_vector();
        sum[0] += v[0];
        sum[1] += v[1];
        sum[2] += v[2];
    }
    let n = coords.len() as f64;
    let (x, y, z) = (sum[0] / n, sum[1] / n, sum[2] / n);

    let lon = y.atan2(x);
    let hyp = (x * x + y * y).sqrt();
    let lat = z.atan2(hyp);

    Some(GeoCoordinate {
        latitude: lat.to_degrees(),
        longitude: lon.to_degrees(),
    })
}

/// Plain arithmetic mean of latitudes and longitudes.
pub fn centroid(coords: &[GeoCoordinate]) -> Option<GeoCoordinate> {
    if coords.is_empty() {
        return None;
    }
    let n = coords.len() as f64;
    let lat = coords.iter().map(|c| c.latitude).sum::<f64>() / n;
    let lon = coords.iter().map(|c| c.longitude).sum::<f64>() / n;
    Some(GeoCoordinate {
        latitude: lat,
        longitude: lon,
    })
}
