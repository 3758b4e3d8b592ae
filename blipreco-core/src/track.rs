//! Reconstructed tracks, used read-only for vetoes.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A reconstructed charged-particle track, reduced to its end points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Track id, as referenced by [`crate::Hit::track_id`].
    pub id: i32,
    /// Trajectory length (cm).
    pub length: f64,
    /// Start point (cm).
    pub start: Point3<f64>,
    /// End point (cm).
    pub end: Point3<f64>,
}

impl Track {
    /// Creates a track; the length is taken as the straight start-end distance.
    #[must_use]
    pub fn straight(id: i32, start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            id,
            length: (end - start).norm(),
            start,
            end,
        }
    }

    /// Distance from `p` to the infinite line through start and end.
    ///
    /// Degenerates to the distance to `start` when the end points coincide.
    #[must_use]
    pub fn distance_to_line(&self, p: &Point3<f64>) -> f64 {
        let axis: Vector3<f64> = self.end - self.start;
        let to_p: Vector3<f64> = p - self.start;
        let len = axis.norm();
        if len <= 0.0 {
            return to_p.norm();
        }
        axis.cross(&to_p).norm() / len
    }

    /// Angles (degrees) between the track line and the segments from `p`
    /// to the start and end points, as asin(d / |endpoint - p|).
    ///
    /// A point lying on an end point sees that end point at 0 degrees.
    #[must_use]
    pub fn subtended_angles(&self, p: &Point3<f64>) -> (f64, f64) {
        let d = self.distance_to_line(p);
        let angle = |end: &Point3<f64>| {
            let r = (end - p).norm();
            if r <= 0.0 {
                0.0
            } else {
                (d / r).clamp(0.0, 1.0).asin().to_degrees()
            }
        };
        (angle(&self.start), angle(&self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn z_track(length: f64) -> Track {
        Track::straight(1, Point3::origin(), Point3::new(0.0, 0.0, length))
    }

    #[test]
    fn test_straight_length() {
        assert_relative_eq!(z_track(50.0).length, 50.0);
    }

    #[test]
    fn test_distance_to_line() {
        let t = z_track(50.0);
        assert_relative_eq!(t.distance_to_line(&Point3::new(3.0, 0.0, 25.0)), 3.0);
        assert_relative_eq!(t.distance_to_line(&Point3::new(0.0, 4.0, -10.0)), 4.0);
    }

    #[test]
    fn test_distance_degenerate_track() {
        let t = Track::straight(2, Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(t.distance_to_line(&Point3::new(1.0, 1.0, 4.0)), 3.0);
    }

    #[test]
    fn test_subtended_angles() {
        let t = z_track(50.0);
        let (a1, a2) = t.subtended_angles(&Point3::new(3.0, 0.0, 25.0));
        assert!(a1 < 45.0 && a2 < 45.0);
        assert_relative_eq!(a1, a2, epsilon = 1e-9);

        // beside the end point: 90 degrees to the nearer end
        let (_, a_end) = t.subtended_angles(&Point3::new(3.0, 0.0, 50.0));
        assert_relative_eq!(a_end, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_subtended_angles_beyond_end() {
        let t = z_track(50.0);
        // d = 3, r = 5 from the end point
        let (_, beyond) = t.subtended_angles(&Point3::new(3.0, 0.0, 54.0));
        assert_relative_eq!(beyond, 0.6_f64.asin().to_degrees(), epsilon = 1e-9);

        let (_, on_end) = t.subtended_angles(&Point3::new(0.0, 0.0, 50.0));
        assert_relative_eq!(on_end, 0.0);
    }
}
