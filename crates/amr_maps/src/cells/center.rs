//! Reference points given either as literal coordinates or as the box center.
use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::units::{Scale, STANDARD};

/// One component of a center: a literal coordinate or the symbolic box center.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CenterCoord {
    /// Coordinate expressed in the owning [`CenterSpec`]'s unit.
    Value(f64),
    /// Resolves to `boxlen / 2`.
    BoxCenter,
}

/// A point in the box with the unit its literal components are expressed in.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CenterSpec {
    pub coords: [CenterCoord; 3],
    pub unit: String,
}

impl CenterSpec {
    pub fn new(coords: [CenterCoord; 3], unit: impl Into<String>) -> Self {
        Self {
            coords,
            unit: unit.into(),
        }
    }

    /// The center of the simulation box on every axis.
    pub fn box_center() -> Self {
        Self::new([CenterCoord::BoxCenter; 3], STANDARD)
    }

    /// Literal coordinates in `unit`.
    pub fn at(coords: [f64; 3], unit: impl Into<String>) -> Self {
        Self::new(coords.map(CenterCoord::Value), unit)
    }

    /// Literal coordinates in code units.
    pub fn code(coords: [f64; 3]) -> Self {
        Self::at(coords, STANDARD)
    }

    /// Literal coordinates from any `mint`-compatible vector.
    pub fn from_mint(p: mint::Vector3<f64>, unit: impl Into<String>) -> Self {
        Self::at([p.x, p.y, p.z], unit)
    }

    /// Resolves the center to code units.
    ///
    /// The unit is only looked up when at least one component is a literal value.
    pub fn resolve(&self, boxlen: f64, scale: &Scale, context: &str) -> Result<DVec3> {
        let needs_unit = self
            .coords
            .iter()
            .any(|c| matches!(c, CenterCoord::Value(_)));
        let factor = if needs_unit {
            scale.resolve_extent(&self.unit, context)?
        } else {
            1.0
        };

        let mut out = [0.0; 3];
        for (o, c) in out.iter_mut().zip(self.coords.iter()) {
            *o = match *c {
                CenterCoord::Value(v) => v / factor,
                CenterCoord::BoxCenter => boxlen * 0.5,
            };
        }
        Ok(DVec3::from_array(out))
    }
}

impl Default for CenterSpec {
    fn default() -> Self {
        Self::code([0.0; 3])
    }
}
