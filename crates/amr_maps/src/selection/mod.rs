//! Geometric sub-selection of cell tables.
//!
//! Selection is a pure filter: [`select`] returns a table with the same schema, box length
//! and units as its input, so calls chain into intersections, and [`select_any`] builds
//! unions. A region that matches no cell yields an empty table, not an error.
//!
//! Cells are tested by their center. Related modules: [crate::projection] accepts the
//! row-aligned output of [`select_mask`] as a projection mask.
pub mod geometry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use geometry::{GeometrySpec, Predicate, ShellShape};

use crate::cells::CellTable;
use crate::error::Result;
use crate::units::STANDARD;

/// A geometry plus the unit of its lengths and an optional complement.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub geometry: GeometrySpec,
    /// Unit of radii, heights and box ranges.
    pub unit: String,
    /// Select everything outside the geometry instead.
    pub inverse: bool,
}

impl Region {
    /// Region with lengths in code units.
    pub fn new(geometry: GeometrySpec) -> Self {
        Self {
            geometry,
            unit: STANDARD.to_string(),
            inverse: false,
        }
    }

    /// Sets the length unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Complements the selection.
    pub fn inverted(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    /// Resolves the region against a table's box length and units.
    pub fn predicate(&self, table: &CellTable) -> Result<Predicate> {
        self.geometry
            .resolve(&self.unit, table.boxlen(), table.scale())
    }
}

impl From<GeometrySpec> for Region {
    fn from(geometry: GeometrySpec) -> Self {
        Region::new(geometry)
    }
}

/// Row-aligned membership of every cell in `region`.
pub fn select_mask(table: &CellTable, region: &Region) -> Result<Vec<bool>> {
    let predicate = region.predicate(table)?;
    Ok((0..table.len())
        .map(|row| predicate.contains(table.cell_center(row)) != region.inverse)
        .collect())
}

/// Cells of `table` inside `region`.
pub fn select(table: &CellTable, region: &Region) -> Result<CellTable> {
    let mask = select_mask(table, region)?;
    let subset = table.filter(&mask)?;
    debug!(
        "Selected {} of {} cells with {}{}.",
        subset.len(),
        table.len(),
        if region.inverse { "inverse " } else { "" },
        region.geometry.kind_name()
    );
    Ok(subset)
}

/// Cells inside every region.
pub fn select_all(table: &CellTable, regions: &[Region]) -> Result<CellTable> {
    let mut keep = vec![true; table.len()];
    for region in regions {
        for (k, m) in keep.iter_mut().zip(select_mask(table, region)?) {
            *k &= m;
        }
    }
    table.filter(&keep)
}

/// Cells inside at least one region.
pub fn select_any(table: &CellTable, regions: &[Region]) -> Result<CellTable> {
    let mut keep = vec![false; table.len()];
    for region in regions {
        for (k, m) in keep.iter_mut().zip(select_mask(table, region)?) {
            *k |= m;
        }
    }
    table.filter(&keep)
}
