//! # Fixed-Point Geometry
//!
//! Coordinates travel as `int32` degrees multiplied by 10^7 ([`COORD_FACTOR`]).
//! This module adds the handful of operations the service needs on the
//! generated [`Point`] and [`Rectangle`] messages:
//!
//! - exact equality for feature lookups (derived by prost)
//! - inclusive containment in a rectangle whose corners may arrive in any
//!   order
//! - the route "distance" between consecutive points
//!
//! No range validation is performed; any `i32` pair is a valid point.

use crate::proto::{Feature, Point, Rectangle};

/// Scale between fixed-point coordinates and degrees.
pub const COORD_FACTOR: f64 = 1e7;

impl Point {
    pub const fn new(latitude: i32, longitude: i32) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Key identifying this exact location.
    pub const fn key(&self) -> (i32, i32) {
        (self.latitude, self.longitude)
    }

    /// Route distance from `self` to `other`.
    ///
    /// Computed as `floor(sqrt(dLat² - dLon²))`. The longitude term is
    /// subtracted, so this is not a geographic distance, and clients depend on
    /// the exact value. When the longitude delta dominates the radicand is
    /// negative and the result is clamped to `0`.
    pub fn distance_to(&self, other: &Point) -> i32 {
        let d_lat = f64::from(self.latitude) - f64::from(other.latitude);
        let d_lon = f64::from(self.longitude) - f64::from(other.longitude);
        let radicand = d_lat * d_lat - d_lon * d_lon;
        if radicand <= 0.0 {
            return 0;
        }
        // `as` saturates at i32::MAX
        radicand.sqrt().floor() as i32
    }
}

impl Feature {
    /// The absence sentinel: an unnamed feature at the queried location.
    pub fn not_found(location: Point) -> Self {
        Self {
            name: String::new(),
            location: Some(location),
        }
    }

    /// An empty name means nothing is recorded at this location.
    pub fn is_found(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Per-axis inclusive bounds of a [`Rectangle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_latitude: i32,
    pub max_latitude: i32,
    pub min_longitude: i32,
    pub max_longitude: i32,
}

impl Bounds {
    pub fn contains(&self, point: &Point) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

impl Rectangle {
    pub const fn new(lo: Point, hi: Point) -> Self {
        Self {
            lo: Some(lo),
            hi: Some(hi),
        }
    }

    /// Normalizes the two corners into per-axis min/max bounds.
    ///
    /// A missing corner reads as the origin, matching protobuf defaults.
    pub fn bounds(&self) -> Bounds {
        let (lo_lat, lo_lon) = self.lo.as_ref().map_or((0, 0), Point::key);
        let (hi_lat, hi_lon) = self.hi.as_ref().map_or((0, 0), Point::key);
        Bounds {
            min_latitude: lo_lat.min(hi_lat),
            max_latitude: lo_lat.max(hi_lat),
            min_longitude: lo_lon.min(hi_lon),
            max_longitude: lo_lon.max(hi_lon),
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        self.bounds().contains(point)
    }
}
