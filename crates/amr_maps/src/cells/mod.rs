//! Leaf-cell storage for adaptive-mesh-refinement data.
//!
//! Cells are kept in a flat columnar [`CellTable`]; positions and sizes are recomputed from
//! `(level, coord)` on demand instead of maintaining an explicit tree.
pub mod center;
pub mod table;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use center::{CenterCoord, CenterSpec};
pub use table::{Cell, CellTable, CellTableBuilder, MAX_LEVEL};

/// Cartesian axis of the simulation box.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (`0`, `1` or `2`).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two axes spanning the plane perpendicular to `self`, in map order
    /// (horizontal, vertical).
    #[inline]
    pub fn plane(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_excludes_projection_axis() {
        for axis in Axis::ALL {
            let (h, v) = axis.plane();
            assert_ne!(h, axis);
            assert_ne!(v, axis);
            assert!(h.index() < v.index());
        }
    }
}
