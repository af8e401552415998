//! Dense 2-D storage for projected maps.
//!
//! Pixels without data hold [`NO_DATA`] (`NaN`), keeping empty regions distinguishable from
//! genuine zeros.

/// Sentinel for pixels that received no contribution.
pub const NO_DATA: f64 = f64::NAN;

/// Row-major `f64` map; `x` (horizontal) varies fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Map2D {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Map2D {
    /// Create a map of the given size, filled with `value`.
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Create a map with every pixel set to [`NO_DATA`].
    pub fn empty(width: usize, height: usize) -> Self {
        Self::filled(width, height, NO_DATA)
    }

    /// Get the size of the map as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the value at `(i, j)`, returning `None` outside the map.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.width || j >= self.height {
            return None;
        }
        Some(self.data[j * self.width + i])
    }

    /// Pixels that hold data.
    pub fn valid(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| !v.is_nan())
    }

    /// Sum over pixels holding data.
    pub fn sum(&self) -> f64 {
        self.valid().sum()
    }

    /// Smallest and largest value holding data.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.valid().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// `true` if no pixel holds data.
    pub fn is_all_no_data(&self) -> bool {
        self.data.iter().all(|v| v.is_nan())
    }

    /// Multiplies every pixel by `factor`.
    pub fn scale(&mut self, factor: f64) {
        if factor != 1.0 {
            for v in &mut self.data {
                *v *= factor;
            }
        }
    }

    /// Iterates over rows from `j = 0` upwards.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.width.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_is_all_no_data() {
        let map = Map2D::empty(3, 2);
        assert_eq!(map.size(), (3, 2));
        assert!(map.is_all_no_data());
        assert_eq!(map.sum(), 0.0);
        assert_eq!(map.min_max(), None);
    }

    #[test]
    fn get_returns_none_outside_bounds() {
        let map = Map2D::filled(2, 2, 1.0);
        assert_eq!(map.get(1, 1), Some(1.0));
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.get(0, 2), None);
    }

    #[test]
    fn reductions_skip_no_data() {
        let mut map = Map2D::empty(2, 2);
        map.data[0] = 2.0;
        map.data[3] = -1.0;
        assert_eq!(map.sum(), 1.0);
        assert_eq!(map.min_max(), Some((-1.0, 2.0)));
        map.scale(2.0);
        assert_eq!(map.sum(), 2.0);
        assert!(map.data[1].is_nan());
    }
}
