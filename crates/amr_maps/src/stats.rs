//! Weighted reductions over values and cell tables.
//!
//! [`weighted_stats`] works on any value sequence; the table helpers evaluate fields through
//! [`FieldEvaluator`] and weight rows by mass, volume or not at all. Moments are computed in
//! two passes around the weighted mean.
use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cells::CellTable;
use crate::error::{Error, Result};
use crate::fields::{DerivedField, EvalContext, Field, FieldEvaluator};
use crate::projection::Weighting;

/// Summary of a weighted sample.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedStats {
    pub mean: f64,
    /// Smallest value whose cumulative weight reaches half the total.
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    pub skewness: f64,
    /// Excess kurtosis; `0` for a normal distribution.
    pub kurtosis: f64,
    pub min: f64,
    pub max: f64,
    /// Entries with positive weight.
    pub count: usize,
    pub weight_sum: f64,
}

/// Computes weighted statistics of `values`; `None` weights every value `1`.
///
/// Values with zero weight do not take part in the median, `min` or `max`.
pub fn weighted_stats(values: &[f64], weights: Option<&[f64]>) -> Result<WeightedStats> {
    if let Some(w) = weights {
        if w.len() != values.len() {
            return Err(Error::config(format!(
                "{} weights for {} values",
                w.len(),
                values.len()
            )));
        }
        if let Some(bad) = w.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(Error::config(format!(
                "weights must be finite and >= 0, got {bad}"
            )));
        }
    }
    let weight = |i: usize| weights.map_or(1.0, |w| w[i]);

    let mut samples: Vec<(f64, f64)> = (0..values.len())
        .map(|i| (values[i], weight(i)))
        .filter(|&(_, w)| w > 0.0)
        .collect();
    let total: f64 = samples.iter().map(|&(_, w)| w).sum();
    if samples.is_empty() || total == 0.0 {
        return Err(Error::DegenerateWeight(format!(
            "weights of {} values sum to zero",
            values.len()
        )));
    }

    let mean = samples.iter().map(|&(v, w)| w * v).sum::<f64>() / total;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &(v, w) in &samples {
        let d = v - mean;
        let d2 = d * d;
        m2 += w * d2;
        m3 += w * d2 * d;
        m4 += w * d2 * d2;
    }
    m2 /= total;
    m3 /= total;
    m4 /= total;
    let std = m2.sqrt();
    let (skewness, kurtosis) = if std > 0.0 {
        (m3 / (m2 * std), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    let half = 0.5 * total;
    let mut acc = 0.0;
    let mut median = samples[samples.len() - 1].0;
    for &(v, w) in &samples {
        acc += w;
        if acc >= half {
            median = v;
            break;
        }
    }

    Ok(WeightedStats {
        mean,
        median,
        std,
        skewness,
        kurtosis,
        min: samples[0].0,
        max: samples[samples.len() - 1].0,
        count: samples.len(),
        weight_sum: total,
    })
}

/// Per-row weights of a table.
fn row_weights(ev: &FieldEvaluator<'_>, weighting: Weighting) -> Result<Option<Vec<f64>>> {
    let table = ev.table();
    match weighting {
        Weighting::None => Ok(None),
        Weighting::Mass => ev.column(&Field::Derived(DerivedField::Mass)).map(Some),
        Weighting::Volume => Ok(Some(
            (0..table.len())
                .map(|row| table.cell_size(row).powi(3))
                .collect(),
        )),
    }
}

/// Statistics of `field` over every row of `table`.
pub fn field_stats(
    table: &CellTable,
    field: &str,
    weighting: Weighting,
    ctx: &EvalContext,
) -> Result<WeightedStats> {
    ctx.validate()?;
    let ev = FieldEvaluator::new(table, *ctx);
    let values = ev.column(&Field::parse(field))?;
    let weights = row_weights(&ev, weighting)?;
    let stats = weighted_stats(&values, weights.as_deref())?;
    debug!(
        "Stats of '{}' over {} cells: mean {:.6e}, std {:.6e}.",
        field, stats.count, stats.mean, stats.std
    );
    Ok(stats)
}

/// Sum of cell masses; `0` for an empty table.
pub fn total_mass(table: &CellTable) -> Result<f64> {
    let ev = FieldEvaluator::new(table, EvalContext::default());
    Ok(ev.column(&Field::Derived(DerivedField::Mass))?.iter().sum())
}

/// Mass-weighted mean of cell centers in code units.
pub fn center_of_mass(table: &CellTable) -> Result<DVec3> {
    let ev = FieldEvaluator::new(table, EvalContext::default());
    let mass = ev.column(&Field::Derived(DerivedField::Mass))?;
    let positions: Vec<DVec3> = (0..table.len()).map(|row| table.cell_center(row)).collect();
    weighted_mean_vec(&positions, Some(&mass), "center of mass")
}

/// Weighted mean velocity `(vx, vy, vz)`.
pub fn bulk_velocity(table: &CellTable, weighting: Weighting) -> Result<DVec3> {
    let ev = FieldEvaluator::new(table, EvalContext::default());
    let vx = ev.column(&Field::base("vx"))?;
    let vy = ev.column(&Field::base("vy"))?;
    let vz = ev.column(&Field::base("vz"))?;
    let velocities: Vec<DVec3> = (0..table.len())
        .map(|row| DVec3::new(vx[row], vy[row], vz[row]))
        .collect();
    let weights = row_weights(&ev, weighting)?;
    weighted_mean_vec(&velocities, weights.as_deref(), "bulk velocity")
}

fn weighted_mean_vec(values: &[DVec3], weights: Option<&[f64]>, what: &str) -> Result<DVec3> {
    let mut sum = DVec3::ZERO;
    let mut total = 0.0;
    for (i, v) in values.iter().enumerate() {
        let w = weights.map_or(1.0, |w| w[i]);
        sum += *v * w;
        total += w;
    }
    if total == 0.0 {
        return Err(Error::DegenerateWeight(format!(
            "{what} of {} cells has zero total weight",
            values.len()
        )));
    }
    Ok(sum / total)
}
