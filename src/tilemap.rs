use rayon::prelude::*;

use crate::geometry::{BoundingBox, Point};

/// A 2D raster over the build area, addressed by `Point` (x along the width,
/// z along the length). Shape is fixed at construction; reads outside the
/// raster return `None` rather than wrapping.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub length: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, length: usize) -> Self {
        Self {
            width,
            length,
            data: vec![T::default(); width * length],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, length: usize, value: T) -> Self {
        Self {
            width,
            length,
            data: vec![value; width * length],
        }
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Copy of the cells inside `bounds`, clipped to the raster.
    pub fn slice(&self, bounds: BoundingBox) -> Option<Tilemap<T>> {
        let clipped = self.clip(bounds)?;
        let width = clipped.width() as usize;
        let length = clipped.length() as usize;
        let data = clipped.cells().map(|p| self[p].clone()).collect();
        Some(Tilemap { width, length, data })
    }
}

impl<T> Tilemap<T> {
    /// Build a raster by evaluating `f` at every cell.
    pub fn from_fn(width: usize, length: usize, mut f: impl FnMut(Point) -> T) -> Self {
        let mut data = Vec::with_capacity(width * length);
        for z in 0..length {
            for x in 0..width {
                data.push(f(Point::new(x as i32, z as i32)));
            }
        }
        Self { width, length, data }
    }

    /// Parallel variant of `from_fn`, rows are evaluated on the rayon pool.
    pub fn par_from_fn(width: usize, length: usize, f: impl Fn(Point) -> T + Sync) -> Self
    where
        T: Send,
    {
        let data = (0..width * length)
            .into_par_iter()
            .map(|idx| f(Point::new((idx % width) as i32, (idx / width) as i32)))
            .collect();
        Self { width, length, data }
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.z >= 0 && (p.x as usize) < self.width && (p.z as usize) < self.length
    }

    fn offset(&self, p: Point) -> usize {
        p.z as usize * self.width + p.x as usize
    }

    pub fn get(&self, p: Point) -> Option<&T> {
        if self.in_bounds(p) {
            Some(&self.data[self.offset(p)])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, p: Point) -> Option<&mut T> {
        if self.in_bounds(p) {
            let idx = self.offset(p);
            Some(&mut self.data[idx])
        } else {
            None
        }
    }

    /// Write a value, ignoring out-of-bounds points. Returns whether it landed.
    pub fn set(&mut self, p: Point, value: T) -> bool {
        match self.get_mut(p) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// The part of `bounds` that lies inside the raster.
    pub fn clip(&self, bounds: BoundingBox) -> Option<BoundingBox> {
        let min = Point::new(bounds.min.x.max(0), bounds.min.z.max(0));
        let max = Point::new(
            bounds.max.x.min(self.width as i32 - 1),
            bounds.max.z.min(self.length as i32 - 1),
        );
        if min.x > max.x || min.z > max.z {
            None
        } else {
            Some(BoundingBox { min, max })
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(Point::ZERO, Point::new(self.width as i32 - 1, self.length as i32 - 1))
    }

    /// In-bounds 4-neighbours of `p`.
    pub fn neighbors4(&self, p: Point) -> impl Iterator<Item = Point> + '_ {
        p.neighbors4().into_iter().filter(move |n| self.in_bounds(*n))
    }

    /// In-bounds 8-neighbours of `p`.
    pub fn neighbors8(&self, p: Point) -> impl Iterator<Item = Point> + '_ {
        p.neighbors8().into_iter().filter(move |n| self.in_bounds(*n))
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (Point, &T)> {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(idx, val)| (Point::new((idx % width) as i32, (idx / width) as i32), val))
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Point, &mut T)> {
        let width = self.width;
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(idx, val)| (Point::new((idx % width) as i32, (idx / width) as i32), val))
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Elementwise transform into a new raster.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Tilemap<U> {
        Tilemap {
            width: self.width,
            length: self.length,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Elementwise combination of two rasters of the same shape.
    pub fn zip_map<U, V>(&self, other: &Tilemap<U>, f: impl Fn(&T, &U) -> V) -> Tilemap<V> {
        assert_eq!((self.width, self.length), (other.width, other.length), "raster shapes differ");
        Tilemap {
            width: self.width,
            length: self.length,
            data: self.data.iter().zip(other.data.iter()).map(|(a, b)| f(a, b)).collect(),
        }
    }

    pub fn same_shape<U>(&self, other: &Tilemap<U>) -> bool {
        self.width == other.width && self.length == other.length
    }
}

impl<T> std::ops::Index<Point> for Tilemap<T> {
    type Output = T;

    fn index(&self, p: Point) -> &T {
        assert!(self.in_bounds(p), "point {} outside {}x{} raster", p, self.width, self.length);
        &self.data[self.offset(p)]
    }
}

impl<T> std::ops::IndexMut<Point> for Tilemap<T> {
    fn index_mut(&mut self, p: Point) -> &mut T {
        assert!(self.in_bounds(p), "point {} outside {}x{} raster", p, self.width, self.length);
        let idx = self.offset(p);
        &mut self.data[idx]
    }
}

impl Tilemap<f32> {
    /// Value at a given percentile (0..=100) of the cells accepted by `keep`.
    pub fn percentile_where(&self, percentile: f32, keep: impl Fn(f32) -> bool) -> Option<f32> {
        let mut values: Vec<f32> = self.data.iter().copied().filter(|v| keep(*v)).collect();
        if values.is_empty() {
            return None;
        }
        let rank = ((percentile.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f32).round() as usize;
        let (_, value, _) = values.select_nth_unstable_by(rank, |a, b| a.total_cmp(b));
        Some(*value)
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_checked_access() {
        let mut map = Tilemap::new_with(4, 3, 0u8);
        assert!(map.set(Point::new(3, 2), 7));
        assert!(!map.set(Point::new(4, 0), 9));
        assert_eq!(map.get(Point::new(3, 2)), Some(&7));
        assert_eq!(map.get(Point::new(-1, 0)), None);
        assert_eq!(map[Point::new(3, 2)], 7);
    }

    #[test]
    fn test_slice_clips_to_raster() {
        let map = Tilemap::from_fn(5, 5, |p| p.x + 10 * p.z);
        let slice = map.slice(BoundingBox::new(Point::new(3, 3), Point::new(8, 8))).unwrap();
        assert_eq!((slice.width, slice.length), (2, 2));
        assert_eq!(slice[Point::new(0, 0)], 33);
        assert_eq!(slice[Point::new(1, 1)], 44);
        assert!(map.slice(BoundingBox::new(Point::new(6, 6), Point::new(9, 9))).is_none());
    }

    #[test]
    fn test_map_and_zip() {
        let a = Tilemap::from_fn(3, 2, |p| p.x as f32);
        let b = Tilemap::par_from_fn(3, 2, |p| p.z as f32);
        let sum = a.zip_map(&b, |x, z| x + z);
        assert_eq!(sum[Point::new(2, 1)], 3.0);
        let doubled = sum.map(|v| v * 2.0);
        assert_eq!(doubled[Point::new(2, 1)], 6.0);
    }

    #[test]
    fn test_percentile() {
        let map = Tilemap::from_fn(10, 1, |p| p.x as f32);
        assert_eq!(map.percentile_where(0.0, |_| true), Some(0.0));
        assert_eq!(map.percentile_where(100.0, |_| true), Some(9.0));
        assert_eq!(map.percentile_where(50.0, |v| v >= 5.0), Some(7.0));
        assert_eq!(map.percentile_where(50.0, |v| v > 100.0), None);
    }

    #[test]
    fn test_neighbors_respect_edges() {
        let map = Tilemap::new_with(3, 3, ());
        assert_eq!(map.neighbors8(Point::new(0, 0)).count(), 3);
        assert_eq!(map.neighbors8(Point::new(1, 1)).count(), 8);
        assert_eq!(map.neighbors4(Point::new(2, 1)).count(), 3);
    }
}
