//! Unit scale lookup for converting code units to physical units.
//!
//! A [`Scale`] maps unit tokens (e.g. `"kpc"`, `"km_s"`, `"Msol_pc2"`) to the multiplicative
//! factor that converts a value in code units into that unit. The token `"standard"` is
//! always registered with factor `1.0`.
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Token for code units; always resolves to `1.0`.
pub const STANDARD: &str = "standard";

const CM_PER_PC: f64 = 3.085_677_581_491_367e18;
const G_PER_MSOL: f64 = 1.988_47e33;
const S_PER_YR: f64 = 3.155_76e7;
const PROTON_MASS_G: f64 = 1.672_621_92e-24;
const BOLTZMANN_ERG_K: f64 = 1.380_649e-16;

/// Registry of unit factors keyed by unit token.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    factors: HashMap<String, f64>,
}

impl Scale {
    /// Creates a scale holding only the `standard` unit.
    pub fn new() -> Self {
        let mut factors = HashMap::new();
        factors.insert(STANDARD.to_string(), 1.0);
        Self { factors }
    }

    /// Builds the common astrophysical unit set from the code-unit base scales
    /// (length in cm, density in g/cm^3, time in s).
    pub fn from_code_units(unit_l_cm: f64, unit_d_g_cm3: f64, unit_t_s: f64) -> Self {
        let unit_m = unit_d_g_cm3 * unit_l_cm.powi(3);
        let unit_v = unit_l_cm / unit_t_s;
        let pc3 = CM_PER_PC.powi(3);
        let pc2 = CM_PER_PC.powi(2);

        Self::new()
            .with_unit("cm", unit_l_cm)
            .with_unit("m", unit_l_cm / 1.0e2)
            .with_unit("km", unit_l_cm / 1.0e5)
            .with_unit("pc", unit_l_cm / CM_PER_PC)
            .with_unit("kpc", unit_l_cm / (CM_PER_PC * 1.0e3))
            .with_unit("Mpc", unit_l_cm / (CM_PER_PC * 1.0e6))
            .with_unit("g", unit_m)
            .with_unit("Msol", unit_m / G_PER_MSOL)
            .with_unit("g_cm3", unit_d_g_cm3)
            .with_unit("Msol_pc3", unit_d_g_cm3 * pc3 / G_PER_MSOL)
            .with_unit("g_cm2", unit_d_g_cm3 * unit_l_cm)
            .with_unit("Msol_pc2", unit_d_g_cm3 * unit_l_cm * pc2 / G_PER_MSOL)
            .with_unit("cm_s", unit_v)
            .with_unit("km_s", unit_v / 1.0e5)
            .with_unit("s", unit_t_s)
            .with_unit("yr", unit_t_s / S_PER_YR)
            .with_unit("Myr", unit_t_s / (S_PER_YR * 1.0e6))
            .with_unit("erg", unit_m * unit_v * unit_v)
            .with_unit("ba", unit_d_g_cm3 * unit_v * unit_v)
            .with_unit("K", unit_v * unit_v * PROTON_MASS_G / BOLTZMANN_ERG_K)
    }

    /// Registers (or replaces) a unit factor and returns the scale.
    pub fn with_unit(mut self, unit: impl Into<String>, factor: f64) -> Self {
        self.insert(unit, factor);
        self
    }

    /// Registers (or replaces) a unit factor.
    pub fn insert(&mut self, unit: impl Into<String>, factor: f64) {
        self.factors.insert(unit.into(), factor);
    }

    /// Returns the factor for `unit`, failing with [`Error::UnknownUnit`] when unregistered.
    pub fn get(&self, unit: &str) -> Result<f64> {
        self.factors
            .get(unit)
            .copied()
            .ok_or_else(|| Error::UnknownUnit {
                unit: unit.to_string(),
            })
    }

    /// Resolves a unit used to express a region or extent.
    ///
    /// Fails with [`Error::UnitResolution`] instead of [`Error::UnknownUnit`] and rejects
    /// non-positive or non-finite factors, which cannot be inverted.
    pub fn resolve_extent(&self, unit: &str, context: &str) -> Result<f64> {
        match self.factors.get(unit) {
            Some(&f) if f.is_finite() && f > 0.0 => Ok(f),
            _ => Err(Error::UnitResolution {
                unit: unit.to_string(),
                context: context.to_string(),
            }),
        }
    }

    /// Converts a value given in `unit` back to code units.
    pub fn to_code(&self, value: f64, unit: &str, context: &str) -> Result<f64> {
        Ok(value / self.resolve_extent(unit, context)?)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.factors.contains_key(unit)
    }

    /// Returns the number of registered units.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Returns `true` if no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Iterates over the registered unit tokens in arbitrary order.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.factors.keys().map(String::as_str)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::new()
    }
}
