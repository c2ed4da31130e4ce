//! Longitude/latitude points and the few spherical measures the tile codecs need

use geo::Point;
use serde::{Deserialize, Serialize};

/// Fixed-point scale used on disk: 1e-7 degrees
pub const FIXED_SCALE: f64 = 10_000_000.0;

const LNG_BITS: u32 = 32;

/// A WGS84 position, longitude first
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointLL {
    pub lon: f64,
    pub lat: f64,
}

impl PointLL {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn lng(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Whether this is a valid position on the globe
    pub fn in_range(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Great-circle distance in meters
    #[allow(deprecated)]
    pub fn distance(&self, other: &PointLL) -> f64 {
        use geo::HaversineDistance;
        let p1 = Point::new(self.lon, self.lat);
        let p2 = Point::new(other.lon, other.lat);
        p1.haversine_distance(&p2)
    }

    /// Initial bearing towards `other` in degrees, clockwise from north, in `[0, 360)`
    #[allow(deprecated)]
    pub fn heading(&self, other: &PointLL) -> f64 {
        use geo::HaversineBearing;
        let p1 = Point::new(self.lon, self.lat);
        let bearing = p1.haversine_bearing(Point::new(other.lon, other.lat));
        bearing.rem_euclid(360.0)
    }

    /// Radius in meters of the circle through `self`, `p2` and `p3`.
    ///
    /// Returns `None` when the three points do not define a circle
    /// (coincident or collinear points).
    pub fn circumradius(&self, p2: &PointLL, p3: &PointLL) -> Option<f64> {
        let a = self.distance(p2);
        let b = p2.distance(p3);
        let c = p3.distance(self);

        // Heron's formula for the triangle area
        let s = (a + b + c) * 0.5;
        let radicand = s * (s - a) * (s - b) * (s - c);
        if radicand.is_nan() || radicand <= 0.0 {
            return None;
        }
        let radius = (a * b * c) / (4.0 * radicand.sqrt());
        radius.is_finite().then_some(radius)
    }

    /// Fixed-point (1e-7 degree) representation, `(lat, lon)`
    pub fn to_fixed(&self) -> (i32, i32) {
        (
            (self.lat * FIXED_SCALE).round() as i32,
            (self.lon * FIXED_SCALE).round() as i32,
        )
    }

    pub fn from_fixed(lat: i32, lon: i32) -> Self {
        Self::new(lon as f64 / FIXED_SCALE, lat as f64 / FIXED_SCALE)
    }

    /// Pack into the low 63 bits of a u64: longitude in bits 0..32,
    /// latitude in bits 32..63, both shifted to be non-negative.
    ///
    /// Only meaningful for points that are [`in_range`](Self::in_range).
    pub fn pack(&self) -> u64 {
        let lon = ((self.lon + 180.0) * FIXED_SCALE).round() as u64;
        let lat = ((self.lat + 90.0) * FIXED_SCALE).round() as u64;
        lon | (lat << LNG_BITS)
    }

    pub fn unpack(packed: u64) -> Self {
        let lon = (packed & 0xffff_ffff) as f64 / FIXED_SCALE - 180.0;
        let lat = ((packed >> LNG_BITS) & 0x7fff_ffff) as f64 / FIXED_SCALE - 90.0;
        Self::new(lon, lat)
    }
}
