use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance in km (haversine, mean Earth radius).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1_r = a.lat.to_radians();
    let lat2_r = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let c = 2.0 * h.min(1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Lat/lng rectangle guaranteed to contain every point within `radius_km` of
/// its center. Used as a cheap pre-filter before the exact haversine check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let d_lat = angular.to_degrees();
        let min_lat = center.lat - d_lat;
        let max_lat = center.lat + d_lat;

        // Poles inside the circle: every longitude is reachable.
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return Self {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let ratio = angular.sin() / center.lat.to_radians().cos();
        if ratio >= 1.0 {
            return Self { min_lat, max_lat, min_lng: -180.0, max_lng: 180.0 };
        }

        let d_lng = ratio.asin().to_degrees();
        let min_lng = center.lng - d_lng;
        let max_lng = center.lng + d_lng;

        // Crossing the antimeridian: widen rather than split the range.
        if min_lng < -180.0 || max_lng > 180.0 {
            return Self { min_lat, max_lat, min_lng: -180.0, max_lng: 180.0 };
        }

        Self { min_lat, max_lat, min_lng, max_lng }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }
}
