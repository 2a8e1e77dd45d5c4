//! Geometry helpers for circles, segments and axis-aligned rectangles
//!
//! Balls are circles; every obstacle is either a circle, a thick segment
//! (capsule) or an axis-aligned rectangle, so these few queries cover the
//! whole narrow phase and the generator's clearance audit.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Closest point on segment `a`-`b` to `p`, and its parameter `t` in [0, 1]
///
/// A zero-length segment collapses to `a` with `t = 0`.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest point on (or in) the rectangle `[min, max]` to `p`
#[inline]
pub fn closest_point_on_rect(p: Vec2, min: Vec2, max: Vec2) -> Vec2 {
    p.clamp(min, max)
}

/// Distance from `p` to segment `a`-`b`
#[inline]
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    (p - closest).length()
}

/// Distance from `p` to the rectangle `[min, max]` (0 when inside)
#[inline]
pub fn point_rect_distance(p: Vec2, min: Vec2, max: Vec2) -> f32 {
    (p - closest_point_on_rect(p, min, max)).length()
}

#[inline]
fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Whether segments `a1`-`b1` and `a2`-`b2` intersect (touching counts)
pub fn segments_intersect(a1: Vec2, b1: Vec2, a2: Vec2, b2: Vec2) -> bool {
    let d1 = b1 - a1;
    let d2 = b2 - a2;
    let denom = cross(d1, d2);
    if denom.abs() < 1e-8 {
        // Parallel: only collinear overlap counts, covered by endpoint distances
        return point_segment_distance(a1, a2, b2) < 1e-5
            || point_segment_distance(b1, a2, b2) < 1e-5
            || point_segment_distance(a2, a1, b1) < 1e-5;
    }
    let t = cross(a2 - a1, d2) / denom;
    let u = cross(a2 - a1, d1) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Shortest distance between two segments (0 when they intersect)
pub fn segment_segment_distance(a1: Vec2, b1: Vec2, a2: Vec2, b2: Vec2) -> f32 {
    if segments_intersect(a1, b1, a2, b2) {
        return 0.0;
    }
    point_segment_distance(a1, a2, b2)
        .min(point_segment_distance(b1, a2, b2))
        .min(point_segment_distance(a2, a1, b1))
        .min(point_segment_distance(b2, a1, b1))
}

/// Shortest distance between a segment and a rectangle (0 when they touch)
pub fn segment_rect_distance(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> f32 {
    let corners = [
        min,
        Vec2::new(max.x, min.y),
        max,
        Vec2::new(min.x, max.y),
    ];
    let inside = |p: Vec2| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
    if inside(a) || inside(b) {
        return 0.0;
    }
    let mut best = f32::MAX;
    for i in 0..4 {
        let c1 = corners[i];
        let c2 = corners[(i + 1) % 4];
        best = best.min(segment_segment_distance(a, b, c1, c2));
    }
    best
}

/// Region an obstacle can ever occupy, used to measure openings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Footprint {
    Disc { center: Vec2, radius: f32 },
    Capsule { a: Vec2, b: Vec2, radius: f32 },
    Rect { min: Vec2, max: Vec2 },
}

impl Footprint {
    /// Horizontal extent (min_x, max_x)
    pub fn x_range(&self) -> (f32, f32) {
        match *self {
            Footprint::Disc { center, radius } => (center.x - radius, center.x + radius),
            Footprint::Capsule { a, b, radius } => (a.x.min(b.x) - radius, a.x.max(b.x) + radius),
            Footprint::Rect { min, max } => (min.x, max.x),
        }
    }

    /// Vertical extent (min_y, max_y)
    pub fn y_range(&self) -> (f32, f32) {
        match *self {
            Footprint::Disc { center, radius } => (center.y - radius, center.y + radius),
            Footprint::Capsule { a, b, radius } => (a.y.min(b.y) - radius, a.y.max(b.y) + radius),
            Footprint::Rect { min, max } => (min.y, max.y),
        }
    }

    /// Width of the free opening between two footprints (<= 0 when they touch)
    pub fn gap_to(&self, other: &Footprint) -> f32 {
        use Footprint::*;
        match (*self, *other) {
            (Disc { center: c1, radius: r1 }, Disc { center: c2, radius: r2 }) => {
                (c1 - c2).length() - r1 - r2
            }
            (Disc { center, radius: r }, Capsule { a, b, radius })
            | (Capsule { a, b, radius }, Disc { center, radius: r }) => {
                point_segment_distance(center, a, b) - r - radius
            }
            (Disc { center, radius }, Rect { min, max })
            | (Rect { min, max }, Disc { center, radius }) => {
                point_rect_distance(center, min, max) - radius
            }
            (Capsule { a: a1, b: b1, radius: r1 }, Capsule { a: a2, b: b2, radius: r2 }) => {
                segment_segment_distance(a1, b1, a2, b2) - r1 - r2
            }
            (Capsule { a, b, radius }, Rect { min, max })
            | (Rect { min, max }, Capsule { a, b, radius }) => {
                segment_rect_distance(a, b, min, max) - radius
            }
            (Rect { min: min1, max: max1 }, Rect { min: min2, max: max2 }) => {
                let dx = (min1.x - max2.x).max(min2.x - max1.x).max(0.0);
                let dy = (min1.y - max2.y).max(min2.y - max1.y).max(0.0);
                (dx * dx + dy * dy).sqrt()
            }
        }
    }

    /// Openings to the left and right walls (inner wall faces at `left` / `right`)
    pub fn wall_gaps(&self, left: f32, right: f32) -> (f32, f32) {
        let (min_x, max_x) = self.x_range();
        (min_x - left, right - max_x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        let (p, t) = closest_point_on_segment(Vec2::new(5.0, 3.0), a, b);
        assert!((p - Vec2::new(5.0, 0.0)).length() < 1e-5);
        assert!((t - 0.5).abs() < 1e-5);

        let (p, t) = closest_point_on_segment(Vec2::new(-4.0, 1.0), a, b);
        assert_eq!(p, a);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_degenerate_segment() {
        let a = Vec2::new(3.0, 3.0);
        let (p, t) = closest_point_on_segment(Vec2::new(10.0, 10.0), a, a);
        assert_eq!(p, a);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_segment_segment_distance() {
        // Crossing segments
        let d = segment_segment_distance(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 0.0),
        );
        assert_eq!(d, 0.0);

        // Parallel, 5 apart
        let d = segment_segment_distance(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 5.0),
            Vec2::new(10.0, 5.0),
        );
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_segment_rect_distance() {
        let min = Vec2::new(0.0, 0.0);
        let max = Vec2::new(10.0, 10.0);
        // Passing through
        assert_eq!(
            segment_rect_distance(Vec2::new(-5.0, 5.0), Vec2::new(15.0, 5.0), min, max),
            0.0
        );
        // Above the rectangle
        let d = segment_rect_distance(Vec2::new(0.0, -4.0), Vec2::new(10.0, -4.0), min, max);
        assert!((d - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_footprint_gaps() {
        let disc = Footprint::Disc {
            center: Vec2::new(0.0, 0.0),
            radius: 5.0,
        };
        let other = Footprint::Disc {
            center: Vec2::new(30.0, 0.0),
            radius: 5.0,
        };
        assert!((disc.gap_to(&other) - 20.0).abs() < 1e-5);
        assert!((other.gap_to(&disc) - 20.0).abs() < 1e-5);

        let rect = Footprint::Rect {
            min: Vec2::new(50.0, -5.0),
            max: Vec2::new(80.0, 5.0),
        };
        assert!((other.gap_to(&rect) - 15.0).abs() < 1e-5);

        let capsule = Footprint::Capsule {
            a: Vec2::new(0.0, 20.0),
            b: Vec2::new(80.0, 20.0),
            radius: 4.0,
        };
        assert!((capsule.gap_to(&rect) - 11.0).abs() < 1e-5);
        assert!((disc.gap_to(&capsule) - 11.0).abs() < 1e-5);
    }

    #[test]
    fn test_footprint_wall_gaps() {
        let rect = Footprint::Rect {
            min: Vec2::new(4.0, 0.0),
            max: Vec2::new(100.0, 8.0),
        };
        let (left, right) = rect.wall_gaps(4.0, 396.0);
        assert_eq!(left, 0.0);
        assert_eq!(right, 296.0);
    }
}
