//! Geographic coordinates and their unit-sphere positions.

use glam::Vec3;

/// A city location in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoord {
    /// Degrees north of the equator, in `[-90, 90]`.
    pub latitude_deg: f32,
    /// Degrees east of Greenwich, in `[-180, 180]`.
    pub longitude_deg: f32,
}

impl GeoCoord {
    pub const fn new(latitude_deg: f32, longitude_deg: f32) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    /// Position on the unit sphere.
    pub fn position(&self) -> Vec3 {
        to_position(
            self.latitude_deg.to_radians(),
            self.longitude_deg.to_radians(),
        )
    }
}

/// Map latitude/longitude (radians) onto the unit sphere.
///
/// +Y is the north pole. Longitude 0 lies on -X and longitude increases
/// towards +Z; the globe mesh and its shading assume this orientation.
pub fn to_position(latitude: f32, longitude: f32) -> Vec3 {
    let y = latitude.sin();
    let r = latitude.cos();
    let z = r * longitude.sin();
    let x = -r * longitude.cos();
    Vec3::new(x, y, z)
}
