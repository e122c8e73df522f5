//! Geometry calculations for line-of-sight and obstacle intersection.
//!
//! Obstacles are footprints on the ground plane extruded up to a height.
//! A 3-D segment is obstructed by an obstacle when its ground projection
//! passes over the footprint while the segment is below the obstacle top.
//!
//! Contains helper functions for:
//! - Point-in-shape tests (rectangles, circles)
//! - Segment clipping against footprints (parametric ranges)
//! - Obstruction counting for a 3-D segment

use super::scene::{CirclePos, Obstacle, Point, RectPos};
use super::types::Vec3;

/// Check if a straight 3-D segment is obstructed by any obstacle.
///
/// This is the line-of-sight check used by the geometric engine.
///
/// # Returns
///
/// `true` if the segment passes through any obstacle volume.
pub fn is_obstructed(a: &Vec3, b: &Vec3, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|obs| obstructs(obs, a, b))
}

/// Count how many obstacles a 3-D segment passes through.
///
/// Used to attenuate refracted paths once per crossed obstacle.
pub fn count_obstructions(a: &Vec3, b: &Vec3, obstacles: &[Obstacle]) -> usize {
    obstacles.iter().filter(|obs| obstructs(obs, a, b)).count()
}

/// True if segment a–b enters the volume of `obstacle`.
fn obstructs(obstacle: &Obstacle, a: &Vec3, b: &Vec3) -> bool {
    let p1 = Point { x: a.x, y: a.y };
    let p2 = Point { x: b.x, y: b.y };
    let range = match obstacle {
        Obstacle::Rectangle { position, .. } => clip_rect(&p1, &p2, position),
        Obstacle::Circle { position, .. } => clip_circle(&p1, &p2, position),
    };
    let Some((t0, t1)) = range else {
        return false;
    };
    // Height varies linearly along the segment, so its minimum over the
    // covered range sits at one of the range ends.
    let z0 = a.z + t0 * (b.z - a.z);
    let z1 = a.z + t1 * (b.z - a.z);
    z0.min(z1) < obstacle.height()
}

// ---------- Footprint helpers ----------

/// Normalize rectangle corners to (left,right,top,bottom) tuple.
fn rect_bounds(rect: &RectPos) -> (f64, f64, f64, f64) {
    let left = rect.top_left.x.min(rect.bottom_right.x);
    let right = rect.top_left.x.max(rect.bottom_right.x);
    let top = rect.top_left.y.min(rect.bottom_right.y);
    let bottom = rect.top_left.y.max(rect.bottom_right.y);
    (left, right, top, bottom)
}

/// Inclusive point-in-rectangle test.
pub fn point_in_rect(p: &Point, rect: &RectPos) -> bool {
    let (left, right, top, bottom) = rect_bounds(rect);
    p.x >= left && p.x <= right && p.y >= top && p.y <= bottom
}

/// Inclusive point-inside-circle test.
pub fn point_in_circle(p: &Point, circle: &CirclePos) -> bool {
    let dx = p.x - circle.center.x;
    let dy = p.y - circle.center.y;
    dx * dx + dy * dy <= circle.radius * circle.radius
}

/// Parametric range `[t0, t1]` ⊆ `[0, 1]` of segment p1–p2 inside the rectangle
/// (Liang–Barsky clipping), or `None` if the segment misses it.
fn clip_rect(p1: &Point, p2: &Point, rect: &RectPos) -> Option<(f64, f64)> {
    let (left, right, top, bottom) = rect_bounds(rect);
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [(-dx, p1.x - left), (dx, right - p1.x), (-dy, p1.y - top), (dy, bottom - p1.y)] {
        if p == 0.0 {
            // Parallel to this edge: reject when outside it
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Parametric range of segment p1–p2 inside the circle, or `None`.
fn clip_circle(p1: &Point, p2: &Point, circle: &CirclePos) -> Option<(f64, f64)> {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let fx = p1.x - circle.center.x;
    let fy = p1.y - circle.center.y;

    let a = dx * dx + dy * dy;
    if a == 0.0 {
        // Degenerate segment: treat as a point
        return point_in_circle(p1, circle).then_some((0.0, 1.0));
    }
    let b = 2.0 * (fx * dx + fy * dy);
    let c = fx * fx + fy * fy - circle.radius * circle.radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = ((-b - sqrt_disc) / (2.0 * a)).max(0.0);
    let t1 = ((-b + sqrt_disc) / (2.0 * a)).min(1.0);
    (t0 <= t1).then_some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    fn building(height: f64) -> Obstacle {
        Obstacle::Rectangle {
            position: RectPos {
                top_left: p(10.0, -5.0),
                bottom_right: p(20.0, 5.0),
            },
            height,
        }
    }

    #[test]
    fn geometry_point_in_rect_and_circle() {
        let rect = RectPos {
            top_left: p(10.0, 10.0),
            bottom_right: p(20.0, 20.0),
        };
        assert!(point_in_rect(&p(10.0, 10.0), &rect));
        assert!(point_in_rect(&p(15.0, 15.0), &rect));
        assert!(point_in_rect(&p(20.0, 20.0), &rect));
        assert!(!point_in_rect(&p(9.0, 10.0), &rect));

        let circle = CirclePos {
            center: p(50.0, 50.0),
            radius: 10.0,
        };
        assert!(point_in_circle(&p(50.0, 50.0), &circle));
        assert!(point_in_circle(&p(60.0, 50.0), &circle));
        assert!(!point_in_circle(&p(61.0, 50.0), &circle));
    }

    #[test]
    fn low_segment_through_building_is_obstructed() {
        let a = Vec3::new(0.0, 0.0, 1.5);
        let b = Vec3::new(30.0, 0.0, 1.5);
        assert!(is_obstructed(&a, &b, &[building(10.0)]));
    }

    #[test]
    fn segment_above_building_is_clear() {
        let a = Vec3::new(0.0, 0.0, 15.0);
        let b = Vec3::new(30.0, 0.0, 15.0);
        assert!(!is_obstructed(&a, &b, &[building(10.0)]));
    }

    #[test]
    fn segment_beside_building_is_clear() {
        let a = Vec3::new(0.0, 10.0, 1.5);
        let b = Vec3::new(30.0, 10.0, 1.5);
        assert!(!is_obstructed(&a, &b, &[building(10.0)]));
    }

    #[test]
    fn counts_each_crossed_obstacle() {
        let second = Obstacle::Circle {
            position: CirclePos {
                center: p(40.0, 0.0),
                radius: 2.0,
            },
            height: 5.0,
        };
        let a = Vec3::new(0.0, 0.0, 1.5);
        let b = Vec3::new(50.0, 0.0, 1.5);
        assert_eq!(count_obstructions(&a, &b, &[building(10.0), second]), 2);
    }

    #[test]
    fn circle_clip_handles_degenerate_segment() {
        let circle = CirclePos {
            center: p(0.0, 0.0),
            radius: 1.0,
        };
        assert_eq!(clip_circle(&p(0.5, 0.0), &p(0.5, 0.0), &circle), Some((0.0, 1.0)));
        assert_eq!(clip_circle(&p(5.0, 0.0), &p(5.0, 0.0), &circle), None);
    }
}
