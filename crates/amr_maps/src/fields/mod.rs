//! Field vocabulary and per-row field evaluation.
//!
//! A [`Field`] is either a stored base column, a [`DerivedField`] computed from base columns
//! and cell geometry, or a projection-only [`Dispersion`]. Names are parsed with
//! [`Field::parse`]; anything that is not a known derived or dispersion name is treated as a
//! base column.
pub mod evaluator;

use std::fmt;

pub use evaluator::{EvalContext, FieldEvaluator, PreparedField, DEFAULT_GAMMA};

/// Field identifier used across the crate.
pub type FieldId = String;

/// Quantities computed from base columns, cell geometry and the reference center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DerivedField {
    X,
    Y,
    Z,
    CellSize,
    Volume,
    Mass,
    SurfaceDensity,
    Speed,
    SpeedSquared,
    KineticEnergy,
    RCylinder,
    RSphere,
    Phi,
    Theta,
    VrCylinder,
    VphiCylinder,
    VrSphere,
    VthetaSphere,
    VphiSphere,
    SoundSpeed,
    Mach,
    Temperature,
    ThermalEnergy,
}

impl DerivedField {
    pub const ALL: [DerivedField; 23] = [
        DerivedField::X,
        DerivedField::Y,
        DerivedField::Z,
        DerivedField::CellSize,
        DerivedField::Volume,
        DerivedField::Mass,
        DerivedField::SurfaceDensity,
        DerivedField::Speed,
        DerivedField::SpeedSquared,
        DerivedField::KineticEnergy,
        DerivedField::RCylinder,
        DerivedField::RSphere,
        DerivedField::Phi,
        DerivedField::Theta,
        DerivedField::VrCylinder,
        DerivedField::VphiCylinder,
        DerivedField::VrSphere,
        DerivedField::VthetaSphere,
        DerivedField::VphiSphere,
        DerivedField::SoundSpeed,
        DerivedField::Mach,
        DerivedField::Temperature,
        DerivedField::ThermalEnergy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DerivedField::X => "x",
            DerivedField::Y => "y",
            DerivedField::Z => "z",
            DerivedField::CellSize => "cellsize",
            DerivedField::Volume => "volume",
            DerivedField::Mass => "mass",
            DerivedField::SurfaceDensity => "sd",
            DerivedField::Speed => "v",
            DerivedField::SpeedSquared => "v2",
            DerivedField::KineticEnergy => "ekin",
            DerivedField::RCylinder => "r_cylinder",
            DerivedField::RSphere => "r_sphere",
            DerivedField::Phi => "phi",
            DerivedField::Theta => "theta",
            DerivedField::VrCylinder => "vr_cylinder",
            DerivedField::VphiCylinder => "vphi_cylinder",
            DerivedField::VrSphere => "vr_sphere",
            DerivedField::VthetaSphere => "vtheta_sphere",
            DerivedField::VphiSphere => "vphi_sphere",
            DerivedField::SoundSpeed => "cs",
            DerivedField::Mach => "mach",
            DerivedField::Temperature => "T",
            DerivedField::ThermalEnergy => "etherm",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Base columns this field reads. `mass` is satisfied by either a `mass` or a `rho`
    /// column and reports `rho` when both are absent.
    pub fn prerequisites(self) -> &'static [&'static str] {
        match self {
            DerivedField::X
            | DerivedField::Y
            | DerivedField::Z
            | DerivedField::CellSize
            | DerivedField::Volume
            | DerivedField::RCylinder
            | DerivedField::RSphere
            | DerivedField::Phi
            | DerivedField::Theta => &[],
            DerivedField::Mass | DerivedField::SurfaceDensity => &["rho"],
            DerivedField::Speed
            | DerivedField::SpeedSquared
            | DerivedField::VrCylinder
            | DerivedField::VphiCylinder
            | DerivedField::VrSphere
            | DerivedField::VthetaSphere
            | DerivedField::VphiSphere => &["vx", "vy", "vz"],
            DerivedField::KineticEnergy => &["rho", "vx", "vy", "vz"],
            DerivedField::SoundSpeed | DerivedField::Temperature => &["p", "rho"],
            DerivedField::Mach => &["p", "rho", "vx", "vy", "vz"],
            DerivedField::ThermalEnergy => &["p"],
        }
    }
}

/// Velocity dispersions; only meaningful as projected quantities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dispersion {
    Vx,
    Vy,
    Vz,
    Total,
    RCylinder,
    PhiCylinder,
}

impl Dispersion {
    pub const ALL: [Dispersion; 6] = [
        Dispersion::Vx,
        Dispersion::Vy,
        Dispersion::Vz,
        Dispersion::Total,
        Dispersion::RCylinder,
        Dispersion::PhiCylinder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dispersion::Vx => "sigmax",
            Dispersion::Vy => "sigmay",
            Dispersion::Vz => "sigmaz",
            Dispersion::Total => "sigma",
            Dispersion::RCylinder => "sigmar_cylinder",
            Dispersion::PhiCylinder => "sigmaphi_cylinder",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }

    /// Per-row quantities whose first and second moments make up this dispersion.
    pub fn components(self) -> Vec<Field> {
        match self {
            Dispersion::Vx => vec![Field::base("vx")],
            Dispersion::Vy => vec![Field::base("vy")],
            Dispersion::Vz => vec![Field::base("vz")],
            Dispersion::Total => vec![Field::base("vx"), Field::base("vy"), Field::base("vz")],
            Dispersion::RCylinder => vec![Field::Derived(DerivedField::VrCylinder)],
            Dispersion::PhiCylinder => vec![Field::Derived(DerivedField::VphiCylinder)],
        }
    }
}

/// A requested field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Base(FieldId),
    Derived(DerivedField),
    Dispersion(Dispersion),
}

impl Field {
    /// Parses a field name. Unknown names become [`Field::Base`] and are checked against the
    /// table schema at evaluation time.
    pub fn parse(name: &str) -> Field {
        if let Some(d) = DerivedField::from_name(name) {
            Field::Derived(d)
        } else if let Some(s) = Dispersion::from_name(name) {
            Field::Dispersion(s)
        } else {
            Field::Base(name.to_string())
        }
    }

    pub fn base(name: impl Into<FieldId>) -> Field {
        Field::Base(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Base(id) => id,
            Field::Derived(d) => d.name(),
            Field::Dispersion(s) => s.name(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::parse(value)
    }
}
