//! Per-row evaluation of base and derived fields.
//!
//! [`FieldEvaluator`] borrows a [`CellTable`] and an [`EvalContext`] (reference center and
//! adiabatic index). Evaluation holds no mutable state, so one evaluator can be shared by
//! any number of threads.
use glam::DVec3;

use crate::cells::CellTable;
use crate::error::{Error, Result};
use crate::fields::{DerivedField, Field};

/// Adiabatic index of a monatomic ideal gas.
pub const DEFAULT_GAMMA: f64 = 5.0 / 3.0;

/// Parameters shared by every derived-field evaluation in one call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalContext {
    /// Reference center in code units.
    pub center: DVec3,
    /// Adiabatic index used by `cs`, `mach` and `etherm`.
    pub gamma: f64,
}

impl EvalContext {
    pub fn new(center: DVec3) -> Self {
        Self {
            center,
            gamma: DEFAULT_GAMMA,
        }
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Rejects a non-finite center and an adiabatic index that is not finite and `> 1`.
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 1.0) {
            return Err(Error::config(format!(
                "adiabatic index must be > 1, got {}",
                self.gamma
            )));
        }
        if !self.center.is_finite() {
            return Err(Error::config(format!(
                "reference center must be finite, got {}",
                self.center
            )));
        }
        Ok(())
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new(DVec3::ZERO)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Inputs<'a> {
    rho: Option<&'a [f64]>,
    vx: Option<&'a [f64]>,
    vy: Option<&'a [f64]>,
    vz: Option<&'a [f64]>,
    p: Option<&'a [f64]>,
    mass: Option<&'a [f64]>,
}

#[inline]
fn at(col: Option<&[f64]>, row: usize) -> f64 {
    col.map_or(f64::NAN, |c| c[row])
}

/// Evaluates fields for rows of one table.
#[derive(Clone, Debug)]
pub struct FieldEvaluator<'a> {
    table: &'a CellTable,
    ctx: EvalContext,
    inputs: Inputs<'a>,
}

/// A field whose prerequisites were checked, ready for repeated per-row evaluation.
#[derive(Clone, Copy, Debug)]
pub enum PreparedField<'a> {
    Column(&'a [f64]),
    Derived(DerivedField),
}

impl<'a> FieldEvaluator<'a> {
    pub fn new(table: &'a CellTable, ctx: EvalContext) -> Self {
        let col = |name: &str| table.column(name).ok();
        Self {
            table,
            ctx,
            inputs: Inputs {
                rho: col("rho"),
                vx: col("vx"),
                vy: col("vy"),
                vz: col("vz"),
                p: col("p"),
                mass: col("mass"),
            },
        }
    }

    pub fn table(&self) -> &'a CellTable {
        self.table
    }

    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    /// Direct column lookup.
    pub fn get_base(&self, row: usize, name: &str) -> Result<f64> {
        self.table.get_base(row, name)
    }

    /// Evaluates a derived field by name for one row.
    pub fn get_derived(&self, row: usize, name: &str) -> Result<f64> {
        let field = DerivedField::from_name(name).ok_or_else(|| Error::UnknownField {
            id: name.to_string(),
        })?;
        self.check_derived(field)?;
        self.table.check_row(row)?;
        Ok(self.derived(row, field))
    }

    /// Evaluates any per-row field for one row.
    pub fn get(&self, row: usize, field: &Field) -> Result<f64> {
        let prepared = self.prepare(field)?;
        self.table.check_row(row)?;
        Ok(prepared.value(self, row))
    }

    /// Verifies prerequisites once and returns a handle for fast per-row evaluation.
    pub fn prepare(&self, field: &Field) -> Result<PreparedField<'a>> {
        match field {
            Field::Base(name) => Ok(PreparedField::Column(self.table.column(name)?)),
            Field::Derived(d) => {
                self.check_derived(*d)?;
                Ok(PreparedField::Derived(*d))
            }
            Field::Dispersion(s) => Err(Error::config(format!(
                "'{}' is only defined for projections",
                s.name()
            ))),
        }
    }

    /// Evaluates `field` for every row.
    pub fn column(&self, field: &Field) -> Result<Vec<f64>> {
        let prepared = self.prepare(field)?;
        Ok((0..self.table.len())
            .map(|row| prepared.value(self, row))
            .collect())
    }

    /// Missing base columns for a derived field.
    pub fn missing_prerequisites(&self, field: DerivedField) -> Vec<String> {
        // A direct mass column replaces `rho * volume`.
        let mass_column = self.inputs.mass.is_some()
            && matches!(
                field,
                DerivedField::Mass | DerivedField::SurfaceDensity | DerivedField::KineticEnergy
            );
        field
            .prerequisites()
            .iter()
            .filter(|name| !(mass_column && **name == "rho"))
            .filter(|name| !self.table.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    fn check_derived(&self, field: DerivedField) -> Result<()> {
        let missing = self.missing_prerequisites(field);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingPrerequisite {
                field: field.name().to_string(),
                missing,
            })
        }
    }

    /// Cell-center offset from the reference center.
    #[inline]
    pub fn offset(&self, row: usize) -> DVec3 {
        self.table.cell_center(row) - self.ctx.center
    }

    #[inline]
    fn velocity(&self, row: usize) -> DVec3 {
        DVec3::new(
            at(self.inputs.vx, row),
            at(self.inputs.vy, row),
            at(self.inputs.vz, row),
        )
    }

    /// Mass of the cell: the `mass` column when present, else `rho * volume`.
    #[inline]
    pub fn mass(&self, row: usize) -> f64 {
        match self.inputs.mass {
            Some(m) => m[row],
            None => at(self.inputs.rho, row) * self.table.cell_size(row).powi(3),
        }
    }

    /// Derived value; prerequisites must have been checked.
    pub(crate) fn derived(&self, row: usize, field: DerivedField) -> f64 {
        match field {
            DerivedField::X => self.offset(row).x,
            DerivedField::Y => self.offset(row).y,
            DerivedField::Z => self.offset(row).z,
            DerivedField::CellSize => self.table.cell_size(row),
            DerivedField::Volume => self.table.cell_size(row).powi(3),
            DerivedField::Mass => self.mass(row),
            DerivedField::SurfaceDensity => self.mass(row) / self.table.cell_size(row).powi(2),
            DerivedField::Speed => self.velocity(row).length(),
            DerivedField::SpeedSquared => self.velocity(row).length_squared(),
            DerivedField::KineticEnergy => {
                0.5 * self.mass(row) * self.velocity(row).length_squared()
            }
            DerivedField::RCylinder => {
                let d = self.offset(row);
                d.x.hypot(d.y)
            }
            DerivedField::RSphere => self.offset(row).length(),
            DerivedField::Phi => {
                let d = self.offset(row);
                d.y.atan2(d.x)
            }
            DerivedField::Theta => polar_angle(self.offset(row)),
            DerivedField::VrCylinder => {
                let (d, v) = (self.offset(row), self.velocity(row));
                let r = d.x.hypot(d.y);
                if r > 0.0 {
                    (d.x * v.x + d.y * v.y) / r
                } else {
                    0.0
                }
            }
            DerivedField::VphiCylinder => {
                let (d, v) = (self.offset(row), self.velocity(row));
                let r = d.x.hypot(d.y);
                if r > 0.0 {
                    (d.x * v.y - d.y * v.x) / r
                } else {
                    0.0
                }
            }
            DerivedField::VrSphere => {
                let (d, v) = (self.offset(row), self.velocity(row));
                let r = d.length();
                if r > 0.0 {
                    d.dot(v) / r
                } else {
                    0.0
                }
            }
            DerivedField::VthetaSphere => {
                let (d, v) = (self.offset(row), self.velocity(row));
                let theta = polar_angle(d);
                let phi = d.y.atan2(d.x);
                theta.cos() * phi.cos() * v.x + theta.cos() * phi.sin() * v.y - theta.sin() * v.z
            }
            DerivedField::VphiSphere => {
                let (d, v) = (self.offset(row), self.velocity(row));
                let phi = d.y.atan2(d.x);
                -phi.sin() * v.x + phi.cos() * v.y
            }
            DerivedField::SoundSpeed => self.sound_speed(row),
            DerivedField::Mach => self.velocity(row).length() / self.sound_speed(row),
            DerivedField::Temperature => at(self.inputs.p, row) / at(self.inputs.rho, row),
            DerivedField::ThermalEnergy => {
                at(self.inputs.p, row) / (self.ctx.gamma - 1.0) * self.table.cell_size(row).powi(3)
            }
        }
    }

    #[inline]
    fn sound_speed(&self, row: usize) -> f64 {
        (self.ctx.gamma * at(self.inputs.p, row) / at(self.inputs.rho, row)).sqrt()
    }
}

impl PreparedField<'_> {
    #[inline]
    pub fn value(&self, evaluator: &FieldEvaluator<'_>, row: usize) -> f64 {
        match *self {
            PreparedField::Column(col) => col[row],
            PreparedField::Derived(d) => evaluator.derived(row, d),
        }
    }
}

fn polar_angle(d: DVec3) -> f64 {
    let r = d.length();
    if r > 0.0 {
        (d.z / r).clamp(-1.0, 1.0).acos()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::CellTableBuilder;
    use crate::fields::Dispersion;

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    fn gas_table() -> CellTable {
        let mut b = CellTableBuilder::new(1.0, ["rho", "vx", "vy", "vz", "p"]);
        // Level 1 cell centered at (0.75, 0.25, 0.25).
        b.push(1, [2, 1, 1], &[2.0, 0.0, 1.0, 0.0, 0.6]).unwrap();
        // Level 2 cell centered at (0.125, 0.125, 0.875).
        b.push(2, [1, 1, 4], &[4.0, 3.0, 4.0, 0.0, 0.3]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn geometry_fields_use_cell_level() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        approx_eq(ev.get_derived(0, "cellsize").unwrap(), 0.5);
        approx_eq(ev.get_derived(0, "volume").unwrap(), 0.125);
        approx_eq(ev.get_derived(1, "volume").unwrap(), 0.25f64.powi(3));
        approx_eq(ev.get_derived(0, "x").unwrap(), 0.75);
    }

    #[test]
    fn mass_prefers_direct_column() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        approx_eq(ev.get_derived(0, "mass").unwrap(), 0.25);
        approx_eq(ev.get_derived(0, "sd").unwrap(), 1.0);

        let mut b = CellTableBuilder::new(1.0, ["mass"]);
        b.push(0, [1, 1, 1], &[7.0]).unwrap();
        let t = b.build().unwrap();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        approx_eq(ev.get_derived(0, "mass").unwrap(), 7.0);
    }

    #[test]
    fn cylindrical_components_about_center() {
        let t = gas_table();
        let ctx = EvalContext::new(DVec3::new(0.5, 0.25, 0.5));
        let ev = FieldEvaluator::new(&t, ctx);
        // Offset (0.25, 0, -0.25), velocity (0, 1, 0): purely azimuthal.
        approx_eq(ev.get_derived(0, "r_cylinder").unwrap(), 0.25);
        approx_eq(ev.get_derived(0, "vr_cylinder").unwrap(), 0.0);
        approx_eq(ev.get_derived(0, "vphi_cylinder").unwrap(), 1.0);
        approx_eq(ev.get_derived(0, "vphi_sphere").unwrap(), 1.0);
        approx_eq(ev.get_derived(0, "phi").unwrap(), 0.0);
    }

    #[test]
    fn spherical_radial_velocity_projects_onto_offset() {
        let t = gas_table();
        let ctx = EvalContext::new(DVec3::new(0.125, 0.125, 0.875) - DVec3::new(3.0, 4.0, 0.0));
        let ev = FieldEvaluator::new(&t, ctx);
        approx_eq(ev.get_derived(1, "r_sphere").unwrap(), 5.0);
        approx_eq(ev.get_derived(1, "vr_sphere").unwrap(), 5.0);
        approx_eq(ev.get_derived(1, "theta").unwrap(), std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn context_requires_gamma_above_one() {
        assert!(EvalContext::default().validate().is_ok());
        for gamma in [1.0, 0.5, -1.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    EvalContext::default().with_gamma(gamma).validate(),
                    Err(Error::Configuration(_))
                ),
                "gamma {gamma}"
            );
        }
        assert!(EvalContext::new(DVec3::new(f64::NAN, 0.0, 0.0))
            .validate()
            .is_err());
    }

    #[test]
    fn thermodynamic_fields_use_gamma() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default().with_gamma(1.5));
        approx_eq(ev.get_derived(0, "cs").unwrap(), (1.5 * 0.6 / 2.0f64).sqrt());
        approx_eq(ev.get_derived(0, "T").unwrap(), 0.3);
        approx_eq(ev.get_derived(0, "etherm").unwrap(), 0.6 / 0.5 * 0.125);
        approx_eq(
            ev.get_derived(1, "mach").unwrap(),
            5.0 / (1.5 * 0.3 / 4.0f64).sqrt(),
        );
    }

    #[test]
    fn speed_and_kinetic_energy() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        approx_eq(ev.get_derived(1, "v").unwrap(), 5.0);
        approx_eq(ev.get_derived(1, "v2").unwrap(), 25.0);
        let m = 4.0 * 0.25f64.powi(3);
        approx_eq(ev.get_derived(1, "ekin").unwrap(), 0.5 * m * 25.0);
    }

    #[test]
    fn missing_prerequisites_are_named() {
        let mut b = CellTableBuilder::new(1.0, ["rho"]);
        b.push(0, [1, 1, 1], &[1.0]).unwrap();
        let t = b.build().unwrap();
        let ev = FieldEvaluator::new(&t, EvalContext::default());

        match ev.get_derived(0, "cs") {
            Err(Error::MissingPrerequisite { field, missing }) => {
                assert_eq!(field, "cs");
                assert_eq!(missing, vec!["p".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match ev.prepare(&Field::parse("v")) {
            Err(Error::MissingPrerequisite { missing, .. }) => assert_eq!(missing.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_names_fail() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        assert!(matches!(
            ev.get_derived(0, "rho"),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            ev.get(0, &Field::base("metals")),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn rows_past_the_end_fail() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        let past = t.len();
        assert!(matches!(ev.get_derived(past, "v"), Err(Error::Configuration(_))));
        assert!(matches!(ev.get(past, &Field::base("rho")), Err(Error::Configuration(_))));
        assert!(matches!(ev.get_base(past, "rho"), Err(Error::Configuration(_))));
    }

    #[test]
    fn dispersions_are_not_row_fields() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        assert!(matches!(
            ev.prepare(&Field::Dispersion(Dispersion::Vx)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn column_evaluates_every_row() {
        let t = gas_table();
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        let col = ev.column(&Field::parse("vx")).unwrap();
        assert_eq!(col, vec![0.0, 3.0]);
    }
}
