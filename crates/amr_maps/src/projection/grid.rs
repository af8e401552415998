//! Power-of-two pixel grids over the simulation box.
//!
//! A [`PixelGrid`] is a rectangular window of the `2^level x 2^level` grid covering the whole
//! box face perpendicular to the projection axis. Because pixel edges sit on the same
//! power-of-two lattice as cell edges, every cell covers a whole number of pixels or lies
//! inside exactly one pixel.
use crate::cells::{Axis, Cell};
use crate::error::{Error, Result};

/// Tolerance, in pixel units, when snapping physical bounds to pixel edges.
const SNAP_EPS: f64 = 1e-9;

/// Half-open pixel index rectangle, relative to the grid window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub i0: usize,
    pub i1: usize,
    pub j0: usize,
    pub j1: usize,
}

impl PixelRect {
    pub fn width(&self) -> usize {
        self.i1 - self.i0
    }

    pub fn height(&self) -> usize {
        self.j1 - self.j0
    }
}

/// Window of the full-box pixel lattice at one level.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    /// Effective level; the full box is `2^level` pixels across.
    pub level: u8,
    pub boxlen: f64,
    /// Projection axis.
    pub axis: Axis,
    /// First pixel column of the window in the full-box lattice.
    pub origin_i: u64,
    /// First pixel row of the window in the full-box lattice.
    pub origin_j: u64,
    pub width: usize,
    pub height: usize,
}

impl PixelGrid {
    /// Builds the smallest window covering `[h0, h1] x [v0, v1]` (code units) on the
    /// in-plane axes of `axis`. Bounds are clamped to the box.
    pub fn covering(
        level: u8,
        boxlen: f64,
        axis: Axis,
        horizontal: [f64; 2],
        vertical: [f64; 2],
    ) -> Result<Self> {
        let n = 1u64 << level;
        let px = boxlen / n as f64;
        let span = |[lo, hi]: [f64; 2]| -> (u64, u64) {
            let lo = (lo.clamp(0.0, boxlen) / px + SNAP_EPS).floor().max(0.0) as u64;
            let hi = (hi.clamp(0.0, boxlen) / px - SNAP_EPS).ceil().max(0.0) as u64;
            let lo = lo.min(n - 1);
            let hi = hi.clamp(lo + 1, n);
            (lo, hi)
        };
        let (i0, i1) = span(horizontal);
        let (j0, j1) = span(vertical);

        let width = usize::try_from(i1 - i0).map_err(|_| Error::config("map too wide"))?;
        let height = usize::try_from(j1 - j0).map_err(|_| Error::config("map too tall"))?;
        width
            .checked_mul(height)
            .ok_or_else(|| Error::config(format!("{width}x{height} pixels do not fit in memory")))?;

        Ok(Self {
            level,
            boxlen,
            axis,
            origin_i: i0,
            origin_j: j0,
            width,
            height,
        })
    }

    /// Pixels per box side.
    #[inline]
    pub fn pixels_per_side(&self) -> u64 {
        1u64 << self.level
    }

    /// Pixel edge length in code units.
    #[inline]
    pub fn pixel_size(&self) -> f64 {
        self.boxlen / self.pixels_per_side() as f64
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical extent `[h_min, h_max, v_min, v_max]` of the window in code units.
    pub fn extent(&self) -> [f64; 4] {
        let px = self.pixel_size();
        [
            self.origin_i as f64 * px,
            (self.origin_i + self.width as u64) as f64 * px,
            self.origin_j as f64 * px,
            (self.origin_j + self.height as u64) as f64 * px,
        ]
    }

    /// Lattice span `[lo, hi)` of a cell along one axis.
    #[inline]
    fn lattice_span(&self, level: u8, coord: u32) -> (u64, u64) {
        let c = coord as u64 - 1;
        if level <= self.level {
            let k = 1u64 << (self.level - level);
            (c * k, (c + 1) * k)
        } else {
            let p = c >> (level - self.level);
            (p, p + 1)
        }
    }

    /// Window pixels covered by `cell`, or `None` if the cell lies outside the window.
    pub fn cell_rect(&self, cell: &Cell) -> Option<PixelRect> {
        let (h, v) = self.axis.plane();
        let (a0, a1) = self.lattice_span(cell.level, cell.coord[h.index()]);
        let (b0, b1) = self.lattice_span(cell.level, cell.coord[v.index()]);

        let clip = |lo: u64, hi: u64, origin: u64, len: usize| -> Option<(usize, usize)> {
            let end = origin + len as u64;
            let lo = lo.max(origin);
            let hi = hi.min(end);
            (lo < hi).then(|| ((lo - origin) as usize, (hi - origin) as usize))
        };
        let (i0, i1) = clip(a0, a1, self.origin_i, self.width)?;
        let (j0, j1) = clip(b0, b1, self.origin_j, self.height)?;
        Some(PixelRect { i0, i1, j0, j1 })
    }

    /// Fraction of the cell's projected area taken by one pixel; `1` when the cell is no
    /// larger than a pixel.
    #[inline]
    pub fn footprint_fraction(&self, level: u8) -> f64 {
        if level < self.level {
            let k = (1u64 << (self.level - level)) as f64;
            1.0 / (k * k)
        } else {
            1.0
        }
    }

    /// Converts window indices to a flat row-major index.
    #[inline]
    pub fn flat(&self, i: usize, j: usize) -> usize {
        j * self.width + i
    }
}
