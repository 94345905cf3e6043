//! Integer grid geometry
//!
//! Small vector algebra over `(x, z)` grid coordinates, an absolute/relative
//! `Position` wrapper, axis-aligned boxes and cardinal directions.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A horizontal grid coordinate. `x` runs along the width, `z` along the length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub z: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, z: 0 };

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn dot(self, other: Point) -> i32 {
        self.x * other.x + self.z * other.z
    }

    /// Euclidean length.
    pub fn norm(self) -> f32 {
        ((self.x * self.x + self.z * self.z) as f32).sqrt()
    }

    pub fn distance(self, other: Point) -> f32 {
        (self - other).norm()
    }

    pub fn manhattan(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }

    /// Chebyshev distance (king moves).
    pub fn chebyshev(self, other: Point) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// Component-wise sign, so that `(5, -3)` becomes `(1, -1)`.
    pub fn signum(self) -> Point {
        Point::new(self.x.signum(), self.z.signum())
    }

    /// The 4 orthogonal neighbours.
    pub fn neighbors4(self) -> [Point; 4] {
        [
            Point::new(self.x - 1, self.z),
            Point::new(self.x + 1, self.z),
            Point::new(self.x, self.z - 1),
            Point::new(self.x, self.z + 1),
        ]
    }

    /// The 8 surrounding cells, orthogonal ones first.
    pub fn neighbors8(self) -> [Point; 8] {
        [
            Point::new(self.x - 1, self.z),
            Point::new(self.x + 1, self.z),
            Point::new(self.x, self.z - 1),
            Point::new(self.x, self.z + 1),
            Point::new(self.x - 1, self.z - 1),
            Point::new(self.x + 1, self.z - 1),
            Point::new(self.x - 1, self.z + 1),
            Point::new(self.x + 1, self.z + 1),
        ]
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<i32> for Point {
    type Output = Point;
    fn mul(self, rhs: i32) -> Point {
        Point::new(self.x * rhs, self.z * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.z)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A point relative to the build area, optionally carrying a height, that
/// remembers the build area origin so it can be converted to world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub local: Point,
    pub y: Option<i32>,
    pub origin: Point,
}

impl Position {
    pub fn new(local: Point, origin: Point) -> Self {
        Self { local, y: None, origin }
    }

    pub fn with_height(self, y: i32) -> Self {
        Self { y: Some(y), ..self }
    }

    /// Build from world coordinates.
    pub fn from_absolute(absolute: Point, origin: Point) -> Self {
        Self::new(absolute - origin, origin)
    }

    /// World coordinates.
    pub fn absolute(&self) -> Point {
        self.local + self.origin
    }
}

/// Inclusive axis-aligned rectangle of grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.z.min(b.z)),
            max: Point::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    /// Box of `width` x `length` cells centred (rounding down) on `center`.
    pub fn centered(center: Point, width: i32, length: i32) -> Self {
        let min = Point::new(center.x - (width - 1) / 2, center.z - (length - 1) / 2);
        Self {
            min,
            max: Point::new(min.x + width - 1, min.z + length - 1),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = BoundingBox { min: first, max: first };
        for p in iter {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.z = bb.min.z.min(p.z);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.z = bb.max.z.max(p.z);
        }
        Some(bb)
    }

    /// Smallest box holding both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Point::new(self.min.x.min(other.min.x), self.min.z.min(other.min.z)),
            max: Point::new(self.max.x.max(other.max.x), self.max.z.max(other.max.z)),
        }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn length(&self) -> i32 {
        self.max.z - self.min.z + 1
    }

    pub fn area(&self) -> i32 {
        self.width() * self.length()
    }

    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2, (self.min.z + self.max.z) / 2)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// Grow (or shrink, with a negative margin) on every side.
    pub fn inflate(&self, margin: i32) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.z - margin),
            max: Point::new(self.max.x + margin, self.max.z + margin),
        }
    }

    pub fn translate(&self, offset: Point) -> Self {
        Self { min: self.min + offset, max: self.max + offset }
    }

    /// Box grown by one cell towards `direction`.
    pub fn extend(&self, direction: Direction) -> Self {
        let mut bb = *self;
        match direction {
            Direction::East => bb.max.x += 1,
            Direction::West => bb.min.x -= 1,
            Direction::South => bb.max.z += 1,
            Direction::North => bb.min.z -= 1,
        }
        bb
    }

    /// The one-cell strip that `extend(direction)` would add.
    pub fn strip(&self, direction: Direction) -> Self {
        match direction {
            Direction::East => BoundingBox::new(
                Point::new(self.max.x + 1, self.min.z),
                Point::new(self.max.x + 1, self.max.z),
            ),
            Direction::West => BoundingBox::new(
                Point::new(self.min.x - 1, self.min.z),
                Point::new(self.min.x - 1, self.max.z),
            ),
            Direction::South => BoundingBox::new(
                Point::new(self.min.x, self.max.z + 1),
                Point::new(self.max.x, self.max.z + 1),
            ),
            Direction::North => BoundingBox::new(
                Point::new(self.min.x, self.min.z - 1),
                Point::new(self.max.x, self.min.z - 1),
            ),
        }
    }

    /// Iterate all cells row by row.
    pub fn cells(&self) -> impl Iterator<Item = Point> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| Point::new(x, z)))
    }
}

/// Cardinal direction on the grid. North is towards negative `z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

    pub fn vector(self) -> Point {
        match self {
            Direction::North => Point::new(0, -1),
            Direction::East => Point::new(1, 0),
            Direction::South => Point::new(0, 1),
            Direction::West => Point::new(-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn rotate_cw(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Dominant direction of a vector, `None` for the zero vector.
    pub fn from_vector(v: Point) -> Option<Direction> {
        if v == Point::ZERO {
            return None;
        }
        Some(if v.x.abs() >= v.z.abs() {
            if v.x > 0 { Direction::East } else { Direction::West }
        } else if v.z > 0 {
            Direction::South
        } else {
            Direction::North
        })
    }

    /// Directions ordered by how well they point along `v`: the dominant
    /// direction, then the two laterals (the one closer to `v` first), then
    /// the opposite.
    pub fn ordered_towards(v: Point) -> [Direction; 4] {
        let main = Direction::from_vector(v).unwrap_or(Direction::North);
        let cw = main.rotate_cw();
        let ccw = cw.opposite();
        let (first, second) = if cw.vector().dot(v) >= ccw.vector().dot(v) { (cw, ccw) } else { (ccw, cw) };
        [main, first, second, main.opposite()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_algebra() {
        let a = Point::new(3, 4);
        let b = Point::new(1, -2);
        assert_eq!(a + b, Point::new(4, 2));
        assert_eq!(a - b, Point::new(2, 6));
        assert_eq!(a * 2, Point::new(6, 8));
        assert_eq!(a.dot(b), -5);
        assert!((a.norm() - 5.0).abs() < 1e-6);
        assert_eq!(a.manhattan(b), 8);
        assert_eq!(a.chebyshev(b), 6);
    }

    #[test]
    fn test_position_round_trip() {
        let origin = Point::new(-120, 340);
        let pos = Position::new(Point::new(5, 7), origin).with_height(64);
        assert_eq!(pos.absolute(), Point::new(-115, 347));
        let back = Position::from_absolute(pos.absolute(), origin);
        assert_eq!(back.local, pos.local);
    }

    #[test]
    fn test_box_extend_and_strip() {
        let bb = BoundingBox::centered(Point::new(10, 10), 3, 5);
        assert_eq!(bb.width(), 3);
        assert_eq!(bb.length(), 5);
        assert!(bb.contains(Point::new(10, 10)));

        let grown = bb.extend(Direction::East);
        let strip = bb.strip(Direction::East);
        assert_eq!(grown.area(), bb.area() + strip.area());
        assert!(strip.cells().all(|p| grown.contains(p) && !bb.contains(p)));
    }

    #[test]
    fn test_direction_ordering() {
        let order = Direction::ordered_towards(Point::new(5, 1));
        assert_eq!(order[0], Direction::East);
        assert_eq!(order[1], Direction::South);
        assert_eq!(order[3], Direction::West);
    }
}
