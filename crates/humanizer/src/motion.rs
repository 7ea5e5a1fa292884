//! Curved pointer-path synthesis for move-submission gestures.

use rand::Rng;
use serde::Serialize;

/// A point in surface (pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A two-phase pointer gesture for one move submission.
///
/// The pointer wanders along `approach` to the source square, presses,
/// then follows `drag` to the destination and releases. Both legs are
/// independently randomized curves.
#[derive(Debug, Clone)]
pub struct Gesture {
    /// Path toward the source square (15-24 steps).
    pub approach: Vec<Point>,
    /// Path from the pressed point to the destination (12-19 steps).
    pub drag: Vec<Point>,
}

/// Builds a randomized curved path from `from` to `to`.
///
/// The path is a cubic Bezier whose two control points are offset from
/// the straight line by fractions drawn independently per axis, sampled
/// at a step count drawn uniformly from `steps`. Endpoints are exact.
pub fn motion_path<R: Rng>(
    rng: &mut R,
    from: Point,
    to: Point,
    steps: std::ops::RangeInclusive<u32>,
) -> Vec<Point> {
    let controls = control_points(rng, from, to);
    let steps = rng.gen_range(steps);

    (0..=steps)
        .map(|i| bezier_point(&controls, f64::from(i) / f64::from(steps)))
        .collect()
}

/// Builds the full two-phase gesture for one submission.
pub fn gesture<R: Rng>(rng: &mut R, from: Point, to: Point) -> Gesture {
    Gesture {
        approach: motion_path(rng, from, to, 15..=24),
        drag: motion_path(rng, from, to, 12..=19),
    }
}

/// Adds a small random offset to a point, simulating hand tremor.
pub fn jitter<R: Rng>(rng: &mut R, point: Point, amount: f64) -> Point {
    Point {
        x: point.x + (rng.gen::<f64>() - 0.5) * amount * 2.0,
        y: point.y + (rng.gen::<f64>() - 0.5) * amount * 2.0,
    }
}

/// Draws the four control points of one curve pass.
fn control_points<R: Rng>(rng: &mut R, from: Point, to: Point) -> [Point; 4] {
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    let c1 = Point {
        x: from.x + dx * rng.gen_range(0.2..0.5),
        y: from.y + dy * rng.gen_range(0.1..0.4) + (rng.gen::<f64>() - 0.5) * 50.0,
    };
    let c2 = Point {
        x: from.x + dx * rng.gen_range(0.6..0.9),
        y: from.y + dy * rng.gen_range(0.6..0.9) + (rng.gen::<f64>() - 0.5) * 50.0,
    };

    [from, c1, c2, to]
}

/// Evaluates a cubic Bezier at parameter `t` in `[0, 1]`.
fn bezier_point(points: &[Point; 4], t: f64) -> Point {
    let [p0, p1, p2, p3] = points;
    let u = 1.0 - t;
    let uu = u * u;
    let tt = t * t;
    let uuu = uu * u;
    let ttt = tt * t;

    Point {
        x: uuu * p0.x + 3.0 * uu * t * p1.x + 3.0 * u * tt * p2.x + ttt * p3.x,
        y: uuu * p0.y + 3.0 * uu * t * p1.y + 3.0 * u * tt * p2.y + ttt * p3.y,
    }
}
