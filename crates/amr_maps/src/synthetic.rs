//! Seeded synthetic cell tables for tests, benches and demos.
//!
//! [`uniform_table`] fills the box with cells of one level. [`refined_table`] refines cells
//! at random, preferring the densest region, and fills them with a rotating, centrally
//! concentrated gas disk, so projections show structure at several levels.
use glam::DVec3;
use rand::rand_core::RngCore;

use crate::cells::{CellTable, CellTableBuilder, MAX_LEVEL};
use crate::error::{Error, Result};
use crate::units::Scale;

/// Columns written by the generators.
pub const COLUMNS: [&str; 5] = ["rho", "vx", "vy", "vz", "p"];

/// Finest level for which every cell of the box is materialized.
const MAX_BASE_LEVEL: u8 = 8;

#[inline]
fn rand01(rng: &mut dyn RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Fills the box with `8^level` cells holding the same values.
pub fn uniform_table(level: u8, boxlen: f64, values: [f64; 5]) -> Result<CellTable> {
    if level > MAX_BASE_LEVEL {
        return Err(Error::config(format!(
            "uniform level must be <= {MAX_BASE_LEVEL}, got {level}"
        )));
    }
    let n = 1u32 << level;
    let mut b = CellTableBuilder::new(boxlen, COLUMNS);
    b.reserve((n as usize).pow(3));
    for x in 1..=n {
        for y in 1..=n {
            for z in 1..=n {
                b.push(level, [x, y, z], &values)?;
            }
        }
    }
    b.build()
}

/// Parameters of [`refined_table`].
#[derive(Clone, Debug)]
pub struct RefinedTableConfig {
    pub boxlen: f64,
    /// Level every cell reaches.
    pub lmin: u8,
    /// Finest level a cell may reach.
    pub lmax: u8,
    /// Probability that a cell at the disk center refines; decays outwards.
    pub refine_probability: f64,
    /// Central density of the disk.
    pub rho0: f64,
    /// Scale radius in box fractions.
    pub scale_radius: f64,
    /// Circular velocity.
    pub v_rot: f64,
    /// Amplitude of random velocity noise.
    pub v_noise: f64,
    /// Pressure-to-density ratio.
    pub temperature: f64,
    pub scale: Scale,
}

impl Default for RefinedTableConfig {
    fn default() -> Self {
        Self {
            boxlen: 1.0,
            lmin: 3,
            lmax: 6,
            refine_probability: 0.9,
            rho0: 100.0,
            scale_radius: 0.05,
            v_rot: 1.0,
            v_noise: 0.1,
            temperature: 0.01,
            scale: Scale::new(),
        }
    }
}

impl RefinedTableConfig {
    pub fn new(lmin: u8, lmax: u8) -> Self {
        Self {
            lmin,
            lmax,
            ..Default::default()
        }
    }

    pub fn with_boxlen(mut self, boxlen: f64) -> Self {
        self.boxlen = boxlen;
        self
    }

    pub fn with_refine_probability(mut self, p: f64) -> Self {
        self.refine_probability = p;
        self
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.lmin > MAX_BASE_LEVEL {
            return Err(Error::config(format!(
                "lmin must be <= {MAX_BASE_LEVEL}, got {}",
                self.lmin
            )));
        }
        if self.lmax < self.lmin || self.lmax > MAX_LEVEL {
            return Err(Error::config(format!(
                "lmax must lie in [{}, {MAX_LEVEL}], got {}",
                self.lmin, self.lmax
            )));
        }
        if !(0.0..=1.0).contains(&self.refine_probability) {
            return Err(Error::config("refine_probability must be in [0, 1]"));
        }
        if !(self.scale_radius.is_finite() && self.scale_radius > 0.0) {
            return Err(Error::config("scale_radius must be > 0"));
        }
        Ok(())
    }
}

/// Generates a randomly refined table; the same seed yields the same table.
pub fn refined_table(config: &RefinedTableConfig, rng: &mut dyn RngCore) -> Result<CellTable> {
    config.validate()?;
    let boxlen = config.boxlen;
    let center = DVec3::splat(0.5 * boxlen);
    let rs = config.scale_radius * boxlen;

    let n = 1u32 << config.lmin;
    let mut stack: Vec<(u8, [u32; 3])> = Vec::new();
    for x in 1..=n {
        for y in 1..=n {
            for z in 1..=n {
                stack.push((config.lmin, [x, y, z]));
            }
        }
    }

    let mut b = CellTableBuilder::new(boxlen, COLUMNS).with_scale(config.scale.clone());
    while let Some((level, coord)) = stack.pop() {
        let size = boxlen / (1u64 << level) as f64;
        let pos = DVec3::new(
            (coord[0] as f64 - 0.5) * size,
            (coord[1] as f64 - 0.5) * size,
            (coord[2] as f64 - 0.5) * size,
        );
        let d = pos - center;
        let r = d.length();

        let p = config.refine_probability * (-r / (4.0 * rs)).exp();
        if level < config.lmax && rand01(rng) < p {
            for child in 0..8u32 {
                stack.push((
                    level + 1,
                    [
                        2 * coord[0] - 1 + (child & 1),
                        2 * coord[1] - 1 + ((child >> 1) & 1),
                        2 * coord[2] - 1 + ((child >> 2) & 1),
                    ],
                ));
            }
            continue;
        }

        let rho = config.rho0 / (1.0 + (r / rs).powi(2)) * (-(d.z / rs).powi(2)).exp()
            + 1e-3 * config.rho0;
        let r_cyl = d.x.hypot(d.y);
        let (vx, vy) = if r_cyl > 0.0 {
            let v = config.v_rot * r_cyl / (r_cyl + rs);
            (-v * d.y / r_cyl, v * d.x / r_cyl)
        } else {
            (0.0, 0.0)
        };
        let mut noise = || config.v_noise * (2.0 * rand01(rng) - 1.0);
        let values = [
            rho,
            vx + noise(),
            vy + noise(),
            noise(),
            rho * config.temperature,
        ];
        b.push(level, coord, &values)?;
    }
    b.build()
}
