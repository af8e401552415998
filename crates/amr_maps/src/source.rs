//! Loading cell tables from an external source.
//!
//! Readers of simulation outputs implement [`CellSource`]; a [`LoadDescriptor`] says which
//! columns, which part of the box and how deep a hierarchy to return. [`MemorySource`]
//! applies a descriptor to a table already in memory.
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cells::{Axis, Cell, CellTable, MAX_LEVEL};
use crate::error::{Error, Result};

/// Unit of the per-axis load ranges.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RangeUnit {
    /// Fractions of the box length in `[0, 1]`.
    #[default]
    BoxFraction,
    /// A unit token resolved through the table's scale.
    Unit(String),
}

/// What a [`CellSource`] should return.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadDescriptor {
    /// Columns to keep, in order; empty keeps every column.
    pub fields: Vec<String>,
    /// Absolute per-axis ranges of cell centers.
    pub ranges: [Option<[f64; 2]>; 3],
    pub range_unit: RangeUnit,
    /// Values below the floor are replaced by it.
    pub floors: Vec<(String, f64)>,
    /// Cells finer than this are merged into their ancestor at this level.
    pub max_level: Option<u8>,
}

impl LoadDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, axis: Axis, lo: f64, hi: f64) -> Self {
        self.ranges[axis.index()] = Some([lo, hi]);
        self
    }

    pub fn with_range_unit(mut self, unit: impl Into<String>) -> Self {
        self.range_unit = RangeUnit::Unit(unit.into());
        self
    }

    pub fn with_floor(mut self, field: impl Into<String>, min: f64) -> Self {
        self.floors.push((field.into(), min));
        self
    }

    pub fn with_max_level(mut self, level: u8) -> Self {
        self.max_level = Some(level);
        self
    }

    /// Validates the descriptor, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        for axis in Axis::ALL {
            if let Some([lo, hi]) = self.ranges[axis.index()] {
                if lo.is_nan() || hi.is_nan() || lo > hi {
                    return Err(Error::config(format!(
                        "{}-range must satisfy lo <= hi, got [{lo}, {hi}]",
                        axis.name()
                    )));
                }
                if self.range_unit == RangeUnit::BoxFraction && (lo < 0.0 || hi > 1.0) {
                    return Err(Error::config(format!(
                        "{}-range [{lo}, {hi}] is not a box fraction",
                        axis.name()
                    )));
                }
            }
        }
        if let Some((name, min)) = self.floors.iter().find(|(_, min)| min.is_nan()) {
            return Err(Error::config(format!("floor for '{name}' is {min}")));
        }
        if self.max_level.is_some_and(|l| l > MAX_LEVEL) {
            return Err(Error::config(format!(
                "max level must be <= {MAX_LEVEL}"
            )));
        }
        Ok(())
    }
}

/// Producer of leaf-cell tables.
///
/// Implementations return only leaf cells, populate every requested column and carry a
/// populated scale.
pub trait CellSource {
    fn load_cells(&self, descriptor: &LoadDescriptor) -> Result<CellTable>;
}

/// A [`CellSource`] over a table held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    table: CellTable,
}

impl MemorySource {
    pub fn new(table: CellTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CellTable {
        &self.table
    }
}

impl From<CellTable> for MemorySource {
    fn from(table: CellTable) -> Self {
        Self::new(table)
    }
}

impl CellSource for MemorySource {
    fn load_cells(&self, descriptor: &LoadDescriptor) -> Result<CellTable> {
        descriptor.validate()?;
        let source = &self.table;

        let coarse = match descriptor.max_level {
            Some(l) if source.lmax() > l => coarsen(source, l)?,
            _ => source.clone(),
        };

        let factor = match &descriptor.range_unit {
            RangeUnit::BoxFraction => 1.0 / coarse.boxlen(),
            RangeUnit::Unit(unit) => coarse.scale().resolve_extent(unit, "load range")?,
        };
        let keep: Vec<bool> = (0..coarse.len())
            .map(|row| {
                let c = coarse.cell_center(row);
                Axis::ALL.iter().all(|axis| {
                    descriptor.ranges[axis.index()].is_none_or(|[lo, hi]| {
                        let p = c[axis.index()] * factor;
                        lo <= p && p <= hi
                    })
                })
            })
            .collect();
        let mut table = coarse.filter(&keep)?;

        if !descriptor.fields.is_empty() {
            table = table.select_columns(&descriptor.fields)?;
        }
        for (name, min) in &descriptor.floors {
            let min = *min;
            table = table.map_column(name, |v| if v < min { min } else { v })?;
        }

        debug!(
            "Loaded {} of {} cells with {} column(s).",
            table.len(),
            source.len(),
            table.column_names().len()
        );
        Ok(table)
    }
}

/// Merges cells finer than `level` into their ancestors. Columns are volume-averaged,
/// except `mass`, which is summed.
fn coarsen(table: &CellTable, level: u8) -> Result<CellTable> {
    let names = table.column_names().to_vec();
    let columns: Vec<&[f64]> = names
        .iter()
        .map(|n| table.column(n))
        .collect::<Result<_>>()?;
    let mass_col = names.iter().position(|n| n == "mass");

    let mut cells = Vec::with_capacity(table.len());
    let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(table.len()); names.len()];
    // Ancestor cell -> (output row, accumulated volume).
    let mut merged: HashMap<Cell, (usize, f64)> = HashMap::new();

    for row in 0..table.len() {
        let cell = table.cell(row);
        if cell.level <= level {
            cells.push(cell);
            for (out, col) in values.iter_mut().zip(&columns) {
                out.push(col[row]);
            }
            continue;
        }

        let shift = cell.level - level;
        let parent = Cell::new(level, cell.coord.map(|c| ((c - 1) >> shift) + 1));
        let vol = table.cell_size(row).powi(3);
        let (out_row, acc) = match merged.get(&parent) {
            Some(&entry) => entry,
            None => {
                cells.push(parent);
                for out in values.iter_mut() {
                    out.push(0.0);
                }
                (cells.len() - 1, 0.0)
            }
        };
        let total = acc + vol;
        for (i, (out, col)) in values.iter_mut().zip(&columns).enumerate() {
            let v = col[row];
            if Some(i) == mass_col {
                out[out_row] += v;
            } else {
                out[out_row] += (v - out[out_row]) * vol / total;
            }
        }
        merged.insert(parent, (out_row, total));
    }

    debug!(
        "Merged {} cells above level {level} into {} ancestors.",
        table.len() - (cells.len() - merged.len()),
        merged.len()
    );
    CellTable::from_columns(
        table.boxlen(),
        cells,
        names.into_iter().zip(values).collect(),
        table.scale().clone(),
    )
}
