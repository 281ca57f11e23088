//! Rectangles and contour measurements
//!
//! `Rect` follows the usual image convention: origin top-left, integer
//! extent, and `width <= 0 || height <= 0` means "no region".

use imageproc::point::Point;
use serde::Serialize;

/// Axis-aligned integer rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates (right/bottom exclusive)
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area, zero for degenerate rectangles
    pub fn area(&self) -> i64 {
        if self.is_valid() {
            self.width as i64 * self.height as i64
        } else {
            0
        }
    }

    /// Positive extent on both axes
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// `|1 - width / height|`
    pub fn aspect_deviation(&self) -> f64 {
        (1.0 - self.width as f64 / self.height as f64).abs()
    }

    /// Overlapping part of two rectangles, `Rect::default()` when disjoint
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return Rect::default();
        }
        Rect::from_corners(x1, y1, x2, y2)
    }

    /// Smallest rectangle containing both; a degenerate side is ignored
    pub fn union(&self, other: &Rect) -> Rect {
        if !self.is_valid() {
            return *other;
        }
        if !other.is_valid() {
            return *self;
        }
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Shift by an offset
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow by `pad` on every side
    pub fn pad(&self, pad: i32) -> Rect {
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + 2 * pad,
            self.height + 2 * pad,
        )
    }

    /// Clip to `[0, width) x [0, height)`; `None` if nothing remains
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);

        let clamped = Rect::from_corners(x1, y1, x2, y2);
        clamped.is_valid().then_some(clamped)
    }
}

/// Bounding box of a point set. Points are pixel positions, so the box
/// covers `max - min + 1` pixels on each axis.
pub fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Rect::from_corners(min_x, min_y, max_x + 1, max_y + 1)
}

/// Unsigned polygon area (shoelace)
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice_area as f64 / 2.0).abs()
}

/// Drop points in the middle of straight horizontal, vertical or diagonal
/// runs, keeping only the points where the boundary changes direction.
pub fn compress_runs(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut points = points.to_vec();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: &Point<i32>, b: &Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = &points[(i + n - 1) % n];
            let next = &points[(i + 1) % n];
            step(prev, &points[i]) != step(&points[i], next)
        })
        .map(|i| points[i])
        .collect();

    // A closed straight run has no turning point; keep its ends
    if kept.is_empty() {
        vec![points[0], points[n - 1]]
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, side: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for i in 0..side {
            pts.push(Point::new(x + i, y));
        }
        for i in 0..side {
            pts.push(Point::new(x + side, y + i));
        }
        for i in 0..side {
            pts.push(Point::new(x + side - i, y + side));
        }
        for i in 0..side {
            pts.push(Point::new(x, y + side - i));
        }
        pts
    }

    #[test]
    fn test_intersection_and_area() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
        assert_eq!(a.intersect(&b).area(), 25);

        let far = Rect::new(20, 20, 5, 5);
        assert_eq!(a.intersect(&far).area(), 0);
        // Touching edges do not overlap
        assert_eq!(a.intersect(&Rect::new(10, 0, 5, 5)).area(), 0);
    }

    #[test]
    fn test_union_ignores_degenerate() {
        let a = Rect::new(2, 3, 4, 5);
        assert_eq!(a.union(&Rect::default()), a);
        assert_eq!(Rect::default().union(&a), a);
        assert_eq!(
            a.union(&Rect::new(10, 0, 2, 2)),
            Rect::from_corners(2, 0, 12, 8)
        );
    }

    #[test]
    fn test_clamp_to_bounds() {
        let r = Rect::new(-3, -2, 20, 20);
        assert_eq!(r.clamp_to(10, 8), Some(Rect::new(0, 0, 10, 8)));
        assert_eq!(Rect::new(12, 0, 5, 5).clamp_to(10, 10), None);
        assert!(!Rect::new(0, 0, 0, 5).is_valid());
    }

    #[test]
    fn test_aspect_deviation() {
        assert!((Rect::new(0, 0, 360, 90).aspect_deviation() - 3.0).abs() < 1e-12);
        assert!((Rect::new(0, 0, 10, 20).aspect_deviation() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_rect_is_inclusive() {
        let pts = vec![Point::new(2, 3), Point::new(7, 3), Point::new(7, 9)];
        assert_eq!(bounding_rect(&pts), Rect::new(2, 3, 6, 7));
        assert_eq!(bounding_rect(&[]), Rect::default());
    }

    #[test]
    fn test_contour_area_orientation_free() {
        let cw = vec![
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 3),
            Point::new(0, 3),
        ];
        let mut ccw = cw.clone();
        ccw.reverse();
        assert_eq!(contour_area(&cw), 12.0);
        assert_eq!(contour_area(&ccw), 12.0);
    }

    #[test]
    fn test_compress_runs_keeps_corners() {
        let pts = square(1, 1, 5);
        let compressed = compress_runs(&pts);

        assert_eq!(compressed.len(), 4);
        assert_eq!(bounding_rect(&compressed), bounding_rect(&pts));
        assert_eq!(contour_area(&compressed), contour_area(&pts));
    }
}
