//! Shape definitions for region selection.
//!
//! [`GeometrySpec`] is the declarative form given by callers; [`Predicate`] is the same shape
//! resolved to code units and ready to test cell-center offsets.
use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cells::{Axis, CenterSpec};
use crate::error::{Error, Result};
use crate::units::Scale;

/// Shape of the outer and inner boundary of a shell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShellShape {
    Sphere,
    /// Cylindrical shell extending `±height` along `axis`.
    Cylinder { height: f64, axis: Axis },
}

/// A selectable region. Lengths are in the owning [`super::Region`]'s unit; each center
/// carries its own unit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum GeometrySpec {
    /// Axis-aligned box; each range is an inclusive offset interval from `center`,
    /// `None` meaning unbounded.
    Box {
        xrange: Option<[f64; 2]>,
        yrange: Option<[f64; 2]>,
        zrange: Option<[f64; 2]>,
        center: CenterSpec,
    },
    /// Cylinder of `radius` around `axis`, extending `±height` along it.
    Cylinder {
        radius: f64,
        height: f64,
        axis: Axis,
        center: CenterSpec,
    },
    Sphere {
        radius: f64,
        center: CenterSpec,
    },
    /// Cells with `inner < r <= outer`.
    Shell {
        inner: f64,
        outer: f64,
        shape: ShellShape,
        center: CenterSpec,
    },
}

impl GeometrySpec {
    pub fn sphere(radius: f64, center: CenterSpec) -> Self {
        GeometrySpec::Sphere { radius, center }
    }

    pub fn cylinder(radius: f64, height: f64, axis: Axis, center: CenterSpec) -> Self {
        GeometrySpec::Cylinder {
            radius,
            height,
            axis,
            center,
        }
    }

    pub fn spherical_shell(inner: f64, outer: f64, center: CenterSpec) -> Self {
        GeometrySpec::Shell {
            inner,
            outer,
            shape: ShellShape::Sphere,
            center,
        }
    }

    pub fn cylindrical_shell(
        inner: f64,
        outer: f64,
        height: f64,
        axis: Axis,
        center: CenterSpec,
    ) -> Self {
        GeometrySpec::Shell {
            inner,
            outer,
            shape: ShellShape::Cylinder { height, axis },
            center,
        }
    }

    /// Box given as offset ranges from `center`.
    pub fn boxed(
        xrange: Option<[f64; 2]>,
        yrange: Option<[f64; 2]>,
        zrange: Option<[f64; 2]>,
        center: CenterSpec,
    ) -> Self {
        GeometrySpec::Box {
            xrange,
            yrange,
            zrange,
            center,
        }
    }

    pub fn center(&self) -> &CenterSpec {
        match self {
            GeometrySpec::Box { center, .. }
            | GeometrySpec::Cylinder { center, .. }
            | GeometrySpec::Sphere { center, .. }
            | GeometrySpec::Shell { center, .. } => center,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            GeometrySpec::Box { .. } => "box",
            GeometrySpec::Cylinder { .. } => "cylinder",
            GeometrySpec::Sphere { .. } => "sphere",
            GeometrySpec::Shell { .. } => "shell",
        }
    }

    /// Checks parameter consistency independent of units.
    pub fn validate(&self) -> Result<()> {
        fn non_negative(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(Error::config(format!("{name} must be finite and >= 0, got {v}")))
            }
        }
        fn range(name: &str, r: &Option<[f64; 2]>) -> Result<()> {
            match r {
                Some([lo, hi]) if lo.is_nan() || hi.is_nan() || lo > hi => Err(Error::config(
                    format!("{name} must satisfy lo <= hi, got [{lo}, {hi}]"),
                )),
                _ => Ok(()),
            }
        }

        match self {
            GeometrySpec::Box {
                xrange,
                yrange,
                zrange,
                ..
            } => {
                range("xrange", xrange)?;
                range("yrange", yrange)?;
                range("zrange", zrange)
            }
            GeometrySpec::Cylinder { radius, height, .. } => {
                non_negative("radius", *radius)?;
                non_negative("height", *height)
            }
            GeometrySpec::Sphere { radius, .. } => non_negative("radius", *radius),
            GeometrySpec::Shell {
                inner,
                outer,
                shape,
                ..
            } => {
                non_negative("inner radius", *inner)?;
                non_negative("outer radius", *outer)?;
                if inner >= outer {
                    return Err(Error::config(format!(
                        "shell inner radius {inner} must be < outer radius {outer}"
                    )));
                }
                if let ShellShape::Cylinder { height, .. } = shape {
                    non_negative("height", *height)?;
                }
                Ok(())
            }
        }
    }

    /// Resolves center and lengths to code units.
    pub fn resolve(&self, unit: &str, boxlen: f64, scale: &Scale) -> Result<Predicate> {
        self.validate()?;
        let center = self
            .center()
            .resolve(boxlen, scale, &format!("{} center", self.kind_name()))?;
        let factor = scale.resolve_extent(unit, &format!("{} extent", self.kind_name()))?;
        let len = |v: f64| v / factor;

        let predicate = match self {
            GeometrySpec::Box {
                xrange,
                yrange,
                zrange,
                ..
            } => {
                let bounds = |r: &Option<[f64; 2]>| match r {
                    Some([lo, hi]) => (len(*lo), len(*hi)),
                    None => (f64::NEG_INFINITY, f64::INFINITY),
                };
                let (x, y, z) = (bounds(xrange), bounds(yrange), bounds(zrange));
                Predicate::Box {
                    center,
                    lo: DVec3::new(x.0, y.0, z.0),
                    hi: DVec3::new(x.1, y.1, z.1),
                }
            }
            GeometrySpec::Cylinder {
                radius,
                height,
                axis,
                ..
            } => Predicate::Cylinder {
                center,
                radius2: len(*radius).powi(2),
                height: len(*height),
                axis: *axis,
            },
            GeometrySpec::Sphere { radius, .. } => Predicate::Sphere {
                center,
                radius2: len(*radius).powi(2),
            },
            GeometrySpec::Shell {
                inner,
                outer,
                shape,
                ..
            } => Predicate::Shell {
                center,
                inner2: len(*inner).powi(2),
                outer2: len(*outer).powi(2),
                cylinder: match shape {
                    ShellShape::Sphere => None,
                    ShellShape::Cylinder { height, axis } => Some((len(*height), *axis)),
                },
            },
        };
        Ok(predicate)
    }
}

/// A shape resolved to code units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Predicate {
    Box {
        center: DVec3,
        lo: DVec3,
        hi: DVec3,
    },
    Cylinder {
        center: DVec3,
        radius2: f64,
        height: f64,
        axis: Axis,
    },
    Sphere {
        center: DVec3,
        radius2: f64,
    },
    Shell {
        center: DVec3,
        inner2: f64,
        outer2: f64,
        cylinder: Option<(f64, Axis)>,
    },
}

impl Predicate {
    pub fn center(&self) -> DVec3 {
        match *self {
            Predicate::Box { center, .. }
            | Predicate::Cylinder { center, .. }
            | Predicate::Sphere { center, .. }
            | Predicate::Shell { center, .. } => center,
        }
    }

    /// Tests a point in code units.
    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        let d = p - self.center();
        match *self {
            Predicate::Box { lo, hi, .. } => d.cmpge(lo).all() && d.cmple(hi).all(),
            Predicate::Cylinder {
                radius2,
                height,
                axis,
                ..
            } => {
                let (r2, h) = split_axis(d, axis);
                r2 <= radius2 && h.abs() <= height
            }
            Predicate::Sphere { radius2, .. } => d.length_squared() <= radius2,
            Predicate::Shell {
                inner2,
                outer2,
                cylinder,
                ..
            } => match cylinder {
                None => {
                    let r2 = d.length_squared();
                    r2 > inner2 && r2 <= outer2
                }
                Some((height, axis)) => {
                    let (r2, h) = split_axis(d, axis);
                    r2 > inner2 && r2 <= outer2 && h.abs() <= height
                }
            },
        }
    }
}

/// Squared in-plane distance and signed offset along `axis`.
#[inline]
fn split_axis(d: DVec3, axis: Axis) -> (f64, f64) {
    let (a, b) = axis.plane();
    let (u, v) = (d[a.index()], d[b.index()]);
    (u * u + v * v, d[axis.index()])
}
