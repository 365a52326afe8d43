//! Flight-path geometry for graph edges.
//!
//! An arc walks from one city to another along the normalized linear blend of
//! the two endpoint vectors and is pushed outward by a parabolic bulge, so the
//! path leaves and lands on the surface and peaks halfway.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::graph::GraphParams;

/// Samples per arc.
pub const ARC_SAMPLES: usize = 256;

/// One sample of an arc: position plus its progress `t` along the curve.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ArcVertex {
    pub position: [f32; 3],
    pub t: f32,
}

/// Bulge height for a connection of chord length `distance`.
///
/// Interpolates linearly from `min_height` at distance 0 to `max_height` at
/// the connection threshold.
pub fn arc_height(distance: f32, params: &GraphParams) -> f32 {
    let ratio = if params.threshold > 0.0 {
        distance / params.threshold
    } else {
        0.0
    };
    params.min_height + ratio * (params.max_height - params.min_height)
}

/// Outward scale of the arc at progress `t`: 1 at both ends, `1 + height` at the middle.
pub fn bulge(t: f32, height: f32) -> f32 {
    1.0 + height * (1.0 - 4.0 * (t - 0.5) * (t - 0.5))
}

/// Sample the arc between two unit-sphere points.
///
/// Produces `samples` vertices with `t` uniform over `[0, 1]`. With fewer than
/// two samples there is no parameter range to cover: zero samples yield an
/// empty arc and one sample yields the start point alone.
///
/// Antipodal endpoints have no defined blend direction at the midpoint; that
/// sample collapses to the origin. The graph threshold keeps such pairs out.
pub fn build_arc(from: Vec3, to: Vec3, height: f32, samples: usize) -> Vec<ArcVertex> {
    match samples {
        0 => return Vec::new(),
        1 => {
            return vec![ArcVertex {
                position: from.to_array(),
                t: 0.0,
            }];
        }
        _ => {}
    }

    let last = (samples - 1) as f32;
    (0..samples)
        .map(|i| {
            let t = i as f32 / last;
            let direction = (from + t * (to - from)).normalize_or_zero();
            ArcVertex {
                position: (direction * bulge(t, height)).to_array(),
                t,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GeoCoord;

    fn london() -> Vec3 {
        GeoCoord::new(51.51, -0.13).position()
    }

    fn paris() -> Vec3 {
        GeoCoord::new(48.86, 2.35).position()
    }

    #[test]
    fn test_sample_count_is_fixed() {
        let arc = build_arc(london(), paris(), 0.1, ARC_SAMPLES);
        assert_eq!(arc.len(), 256);
    }

    #[test]
    fn test_bulge_profile() {
        let h = 0.3;
        assert!((bulge(0.0, h) - 1.0).abs() < 1e-6);
        assert!((bulge(1.0, h) - 1.0).abs() < 1e-6);
        assert!((bulge(0.5, h) - (1.0 + h)).abs() < 1e-6);
    }

    #[test]
    fn test_endpoints_sit_on_the_sphere() {
        let (from, to) = (london(), paris());
        let arc = build_arc(from, to, 0.2, ARC_SAMPLES);

        let first = Vec3::from_array(arc[0].position);
        let last = Vec3::from_array(arc[ARC_SAMPLES - 1].position);
        assert!((first - from).length() < 1e-5);
        assert!((last - to).length() < 1e-5);
        assert_eq!(arc[0].t, 0.0);
        assert_eq!(arc[ARC_SAMPLES - 1].t, 1.0);
    }

    #[test]
    fn test_midpoint_peaks_at_one_plus_height() {
        let height = 0.25;
        // Odd sample count puts a sample exactly at t = 0.5.
        let arc = build_arc(london(), paris(), height, 257);
        let mid = &arc[128];
        assert!((mid.t - 0.5).abs() < 1e-6);
        let radius = Vec3::from_array(mid.position).length();
        assert!((radius - (1.0 + height)).abs() < 1e-5);

        let max_radius = arc
            .iter()
            .map(|v| Vec3::from_array(v.position).length())
            .fold(0.0_f32, f32::max);
        assert!((max_radius - radius).abs() < 1e-5);
    }

    #[test]
    fn test_t_is_monotonic_and_uniform() {
        let arc = build_arc(london(), paris(), 0.1, ARC_SAMPLES);
        let step = 1.0 / (ARC_SAMPLES - 1) as f32;
        for pair in arc.windows(2) {
            assert!(pair[1].t > pair[0].t);
            assert!((pair[1].t - pair[0].t - step).abs() < 1e-5);
        }
    }

    #[test]
    fn test_same_inputs_same_samples() {
        let a = build_arc(london(), paris(), 0.17, ARC_SAMPLES);
        let b = build_arc(london(), paris(), 0.17, ARC_SAMPLES);
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_sample_counts() {
        assert!(build_arc(london(), paris(), 0.1, 0).is_empty());
        let single = build_arc(london(), paris(), 0.1, 1);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].t, 0.0);
    }

    #[test]
    fn test_height_interpolates_with_distance() {
        let params = GraphParams::default();
        assert!((arc_height(0.0, &params) - params.min_height).abs() < 1e-6);
        assert!((arc_height(params.threshold, &params) - params.max_height).abs() < 1e-6);
        let half = arc_height(params.threshold / 2.0, &params);
        assert!((half - (params.min_height + params.max_height) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertex_layout_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<ArcVertex>(), 16);
    }
}
