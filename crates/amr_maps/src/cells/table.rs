//! Columnar leaf-cell table.
//!
//! A [`CellTable`] stores one row per leaf cell: its refinement level, integer coordinates
//! in `[1, 2^level]` per axis, and one `f64` per schema column. Tables are immutable once
//! built; filtering produces a new table with the same schema, box length and [`Scale`].
use std::collections::HashMap;

use glam::DVec3;

use crate::error::{Error, Result};
use crate::units::Scale;

/// Finest refinement level representable by the integer coordinates.
pub const MAX_LEVEL: u8 = 31;

/// Spatial identity of one leaf cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub level: u8,
    pub coord: [u32; 3],
}

impl Cell {
    pub fn new(level: u8, coord: [u32; 3]) -> Self {
        Self { level, coord }
    }

    /// Edge length of the cell for a box of length `boxlen`.
    #[inline]
    pub fn size(&self, boxlen: f64) -> f64 {
        boxlen / (1u64 << self.level) as f64
    }

    /// Physical center, `(coord - 0.5) * size` per axis.
    #[inline]
    pub fn center(&self, boxlen: f64) -> DVec3 {
        let size = self.size(boxlen);
        DVec3::new(
            (self.coord[0] as f64 - 0.5) * size,
            (self.coord[1] as f64 - 0.5) * size,
            (self.coord[2] as f64 - 0.5) * size,
        )
    }

    fn is_valid(&self) -> bool {
        if self.level > MAX_LEVEL {
            return false;
        }
        let n = 1u64 << self.level;
        self.coord.iter().all(|&c| c >= 1 && (c as u64) <= n)
    }
}

/// Immutable columnar store of leaf cells.
#[derive(Clone, Debug)]
pub struct CellTable {
    boxlen: f64,
    levels: Vec<u8>,
    coords: Vec<[u32; 3]>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
    level_range: (u8, u8),
    scale: Scale,
}

impl CellTable {
    /// Builds a table from whole columns.
    ///
    /// Every column must have one value per cell, column names must be unique and every
    /// cell coordinate must lie in `[1, 2^level]`.
    pub fn from_columns(
        boxlen: f64,
        cells: Vec<Cell>,
        columns: Vec<(String, Vec<f64>)>,
        scale: Scale,
    ) -> Result<Self> {
        if !(boxlen.is_finite() && boxlen > 0.0) {
            return Err(Error::config(format!("boxlen must be > 0, got {boxlen}")));
        }

        let mut index = HashMap::with_capacity(columns.len());
        let mut names = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (i, (name, values)) in columns.into_iter().enumerate() {
            if values.len() != cells.len() {
                return Err(Error::config(format!(
                    "column '{}' has {} values for {} cells",
                    name,
                    values.len(),
                    cells.len()
                )));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(Error::config(format!("duplicate column '{name}'")));
            }
            names.push(name);
            data.push(values);
        }

        if let Some(bad) = cells.iter().find(|c| !c.is_valid()) {
            return Err(Error::config(format!(
                "cell coordinate {:?} outside [1, 2^{}]",
                bad.coord, bad.level
            )));
        }

        let levels: Vec<u8> = cells.iter().map(|c| c.level).collect();
        let coords: Vec<[u32; 3]> = cells.iter().map(|c| c.coord).collect();
        let level_range = observed_levels(&levels).unwrap_or((0, 0));

        Ok(Self {
            boxlen,
            levels,
            coords,
            names,
            columns: data,
            index,
            level_range,
            scale,
        })
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    pub fn boxlen(&self) -> f64 {
        self.boxlen
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Coarsest and finest level observed in the table.
    ///
    /// Empty tables produced by filtering keep the range of their parent.
    pub fn level_range(&self) -> (u8, u8) {
        self.level_range
    }

    pub fn lmin(&self) -> u8 {
        self.level_range.0
    }

    pub fn lmax(&self) -> u8 {
        self.level_range.1
    }

    /// Spatial identity of `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.len()`; this and the other per-row geometry accessors are
    /// unchecked, use [`CellTable::check_row`] first for untrusted indices.
    #[inline]
    pub fn cell(&self, row: usize) -> Cell {
        Cell {
            level: self.levels[row],
            coord: self.coords[row],
        }
    }

    #[inline]
    pub fn level(&self, row: usize) -> u8 {
        self.levels[row]
    }

    #[inline]
    pub fn cell_size(&self, row: usize) -> f64 {
        self.cell(row).size(self.boxlen)
    }

    #[inline]
    pub fn cell_center(&self, row: usize) -> DVec3 {
        self.cell(row).center(self.boxlen)
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Whole column by name.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].as_slice())
            .ok_or_else(|| Error::UnknownField {
                id: name.to_string(),
            })
    }

    /// Direct base-column lookup for one row.
    #[inline]
    pub fn get_base(&self, row: usize, name: &str) -> Result<f64> {
        let column = self.column(name)?;
        self.check_row(row)?;
        Ok(column[row])
    }

    /// Fails with [`Error::Configuration`] when `row` is not a row of this table.
    #[inline]
    pub fn check_row(&self, row: usize) -> Result<()> {
        if row < self.len() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "row {row} out of range for {} rows",
                self.len()
            )))
        }
    }

    /// Returns a same-schema table holding the rows where `keep` is `true`.
    pub fn filter(&self, keep: &[bool]) -> Result<CellTable> {
        if keep.len() != self.len() {
            return Err(Error::config(format!(
                "mask has {} entries for {} rows",
                keep.len(),
                self.len()
            )));
        }
        let selected: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        Ok(self.take_rows(&selected))
    }

    /// Returns a same-schema table holding `rows`, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index in `rows` is `>= self.len()`.
    pub fn take_rows(&self, rows: &[usize]) -> CellTable {
        let levels: Vec<u8> = rows.iter().map(|&r| self.levels[r]).collect();
        let coords: Vec<[u32; 3]> = rows.iter().map(|&r| self.coords[r]).collect();
        let columns: Vec<Vec<f64>> = self
            .columns
            .iter()
            .map(|col| rows.iter().map(|&r| col[r]).collect())
            .collect();
        let level_range = observed_levels(&levels).unwrap_or(self.level_range);

        CellTable {
            boxlen: self.boxlen,
            levels,
            coords,
            names: self.names.clone(),
            columns,
            index: self.index.clone(),
            level_range,
            scale: self.scale.clone(),
        }
    }

    /// Returns a table restricted to the named columns, in the order given.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<CellTable> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            columns.push((name.to_string(), self.column(name)?.to_vec()));
        }
        let cells = (0..self.len()).map(|r| self.cell(r)).collect();
        let mut table = CellTable::from_columns(self.boxlen, cells, columns, self.scale.clone())?;
        if table.is_empty() {
            table.level_range = self.level_range;
        }
        Ok(table)
    }

    /// Replaces the unit table, keeping all rows.
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Applies `f` to every value of column `name` in place, producing a new table.
    pub(crate) fn map_column(mut self, name: &str, f: impl Fn(f64) -> f64) -> Result<Self> {
        let i = *self.index.get(name).ok_or_else(|| Error::UnknownField {
            id: name.to_string(),
        })?;
        for v in self.columns[i].iter_mut() {
            *v = f(*v);
        }
        Ok(self)
    }
}

fn observed_levels(levels: &[u8]) -> Option<(u8, u8)> {
    let lmin = levels.iter().copied().min()?;
    let lmax = levels.iter().copied().max()?;
    Some((lmin, lmax))
}

/// Row-by-row builder for [`CellTable`].
#[derive(Clone, Debug)]
pub struct CellTableBuilder {
    boxlen: f64,
    names: Vec<String>,
    cells: Vec<Cell>,
    columns: Vec<Vec<f64>>,
    scale: Scale,
}

impl CellTableBuilder {
    /// Creates a builder with the given column schema.
    pub fn new<S: Into<String>>(boxlen: f64, names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let columns = vec![Vec::new(); names.len()];
        Self {
            boxlen,
            names,
            cells: Vec::new(),
            columns,
            scale: Scale::new(),
        }
    }

    /// Sets the unit table of the resulting table.
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Reserves space for `additional` more cells.
    pub fn reserve(&mut self, additional: usize) {
        self.cells.reserve(additional);
        for col in &mut self.columns {
            col.reserve(additional);
        }
    }

    /// Appends one cell; `values` follow the schema order.
    pub fn push(&mut self, level: u8, coord: [u32; 3], values: &[f64]) -> Result<&mut Self> {
        if values.len() != self.names.len() {
            return Err(Error::config(format!(
                "expected {} values, got {}",
                self.names.len(),
                values.len()
            )));
        }
        self.cells.push(Cell::new(level, coord));
        for (col, &v) in self.columns.iter_mut().zip(values) {
            col.push(v);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Validates and builds the table.
    pub fn build(self) -> Result<CellTable> {
        let columns = self.names.into_iter().zip(self.columns).collect();
        CellTable::from_columns(self.boxlen, self.cells, columns, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_table() -> CellTable {
        let mut b = CellTableBuilder::new(2.0, ["rho", "p"]);
        b.push(1, [1, 1, 1], &[1.0, 0.1]).unwrap();
        b.push(2, [3, 1, 1], &[2.0, 0.2]).unwrap();
        b.push(2, [4, 4, 4], &[3.0, 0.3]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn cell_geometry_follows_level() {
        let cell = Cell::new(2, [1, 2, 4]);
        assert_eq!(cell.size(1.0), 0.25);
        assert_eq!(cell.center(1.0), DVec3::new(0.125, 0.375, 0.875));
    }

    #[test]
    fn build_records_level_range_and_columns() {
        let t = two_level_table();
        assert_eq!(t.len(), 3);
        assert_eq!(t.level_range(), (1, 2));
        assert_eq!(t.column_names(), &["rho".to_string(), "p".to_string()]);
        assert_eq!(t.get_base(2, "rho").unwrap(), 3.0);
        assert_eq!(t.cell_size(0), 1.0);
    }

    #[test]
    fn unknown_column_is_reported() {
        let t = two_level_table();
        assert!(matches!(
            t.get_base(0, "vx"),
            Err(Error::UnknownField { ref id }) if id == "vx"
        ));
    }

    #[test]
    fn out_of_range_rows_are_errors() {
        let t = two_level_table();
        assert!(t.check_row(2).is_ok());
        assert!(matches!(t.get_base(3, "rho"), Err(Error::Configuration(_))));
        assert!(matches!(t.check_row(usize::MAX), Err(Error::Configuration(_))));
    }

    #[test]
    #[should_panic]
    fn take_rows_panics_past_the_end() {
        two_level_table().take_rows(&[0, 3]);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut b = CellTableBuilder::new(1.0, ["rho"]);
        b.push(1, [3, 1, 1], &[1.0]).unwrap();
        assert!(matches!(b.build(), Err(Error::Configuration(_))));

        let mut b = CellTableBuilder::new(1.0, ["rho"]);
        b.push(1, [0, 1, 1], &[1.0]).unwrap();
        assert!(matches!(b.build(), Err(Error::Configuration(_))));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let res = CellTable::from_columns(
            1.0,
            vec![Cell::new(0, [1, 1, 1])],
            vec![("rho".into(), vec![1.0, 2.0])],
            Scale::new(),
        );
        assert!(matches!(res, Err(Error::Configuration(_))));

        let res = CellTable::from_columns(
            1.0,
            vec![Cell::new(0, [1, 1, 1])],
            vec![("rho".into(), vec![1.0]), ("rho".into(), vec![2.0])],
            Scale::new(),
        );
        assert!(matches!(res, Err(Error::Configuration(_))));
    }

    #[test]
    fn filter_keeps_schema_and_recomputes_levels() {
        let t = two_level_table();
        let sub = t.filter(&[false, true, true]).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.level_range(), (2, 2));
        assert_eq!(sub.column("rho").unwrap(), &[2.0, 3.0]);
        assert_eq!(sub.boxlen(), t.boxlen());
    }

    #[test]
    fn empty_filter_keeps_parent_levels() {
        let t = two_level_table();
        let empty = t.filter(&[false, false, false]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.level_range(), (1, 2));
        assert_eq!(empty.column_names().len(), 2);
    }

    #[test]
    fn filter_rejects_wrong_mask_length() {
        let t = two_level_table();
        assert!(t.filter(&[true]).is_err());
    }

    #[test]
    fn select_columns_reorders_schema() {
        let t = two_level_table();
        let s = t.select_columns(&["p"]).unwrap();
        assert_eq!(s.column_names(), &["p".to_string()]);
        assert!(!s.has_column("rho"));
    }
}
