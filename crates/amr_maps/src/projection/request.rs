//! Declarative projection requests.
//!
//! A [`ProjectionRequest`] is built with `with_*` methods and checked by
//! [`ProjectionRequest::validate`] at the start of every projection call.
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cells::{Axis, CenterSpec};
use crate::error::{Error, Result};
use crate::fields::{FieldId, DEFAULT_GAMMA};
use crate::units::STANDARD;

/// Weight applied to each cell's contribution.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Weighting {
    #[default]
    Mass,
    Volume,
    /// Every contributing cell counts once.
    None,
}

/// How the output pixel grid is chosen.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// `2^level` pixels across the box.
    Level(u8),
    /// At least this many pixels across the box, rounded up to a power of two.
    Pixels(usize),
    /// Pixels no larger than `size`, expressed in `unit`.
    PixelSize { size: f64, unit: String },
}

/// One requested output map.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRequest {
    pub name: FieldId,
    /// Unit tag the map is converted to.
    pub unit: String,
}

impl FieldRequest {
    pub fn new(name: impl Into<FieldId>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

/// Spatial window of a projection, as offsets from `center` in `unit`.
///
/// `center` defaults to the box center, the same point as
/// [`ProjectionRequest::data_center`], so `full().with_z(-h, h)` is a slab through the
/// middle of the box.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialRange {
    pub x: Option<[f64; 2]>,
    pub y: Option<[f64; 2]>,
    pub z: Option<[f64; 2]>,
    pub center: CenterSpec,
    pub unit: String,
}

impl SpatialRange {
    /// The whole box; offsets added later are measured from the box center.
    pub fn full() -> Self {
        Self {
            x: None,
            y: None,
            z: None,
            center: CenterSpec::box_center(),
            unit: STANDARD.to_string(),
        }
    }

    /// Offsets around `center` in `unit`; set ranges with `with_x`/`with_y`/`with_z`.
    pub fn around(center: CenterSpec, unit: impl Into<String>) -> Self {
        Self {
            center,
            unit: unit.into(),
            ..Self::full()
        }
    }

    pub fn with_x(mut self, lo: f64, hi: f64) -> Self {
        self.x = Some([lo, hi]);
        self
    }

    pub fn with_y(mut self, lo: f64, hi: f64) -> Self {
        self.y = Some([lo, hi]);
        self
    }

    pub fn with_z(mut self, lo: f64, hi: f64) -> Self {
        self.z = Some([lo, hi]);
        self
    }

    pub fn get(&self, axis: Axis) -> Option<[f64; 2]> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for axis in Axis::ALL {
            if let Some([lo, hi]) = self.get(axis) {
                if lo.is_nan() || hi.is_nan() || lo > hi {
                    return Err(Error::config(format!(
                        "{}-range must satisfy lo <= hi, got [{lo}, {hi}]",
                        axis.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for SpatialRange {
    fn default() -> Self {
        Self::full()
    }
}

/// Everything needed to project a cell table onto a pixel grid.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ProjectionRequest {
    /// Output maps in order.
    pub fields: Vec<FieldRequest>,
    pub weighting: Weighting,
    /// Axis integrated out by the projection.
    pub axis: Axis,
    pub level: Option<u8>,
    pub pixels: Option<usize>,
    pub pixel_size: Option<(f64, String)>,
    pub range: SpatialRange,
    /// Reference center for coordinate-dependent fields; defaults to the box center, like
    /// the center of [`SpatialRange::full`].
    pub data_center: CenterSpec,
    /// Row-aligned inclusion mask.
    pub mask: Option<Vec<bool>>,
    /// Adiabatic index for thermodynamic fields.
    pub gamma: f64,
    /// Upper bound on worker threads; `None` uses all hardware threads.
    pub max_concurrency: Option<usize>,
}

impl Default for ProjectionRequest {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            weighting: Weighting::Mass,
            axis: Axis::Z,
            level: None,
            pixels: None,
            pixel_size: None,
            range: SpatialRange::full(),
            data_center: CenterSpec::box_center(),
            mask: None,
            gamma: DEFAULT_GAMMA,
            max_concurrency: None,
        }
    }
}

impl ProjectionRequest {
    /// Creates a request for the given fields in code units.
    pub fn new<S: Into<FieldId>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|f| FieldRequest::new(f, STANDARD))
                .collect(),
            ..Default::default()
        }
    }

    /// Adds a field with its output unit.
    pub fn with_field(mut self, name: impl Into<FieldId>, unit: impl Into<String>) -> Self {
        self.fields.push(FieldRequest::new(name, unit));
        self
    }

    /// Sets the output unit of an already requested field.
    pub fn with_field_unit(mut self, name: &str, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        for f in self.fields.iter_mut().filter(|f| f.name == name) {
            f.unit = unit.clone();
        }
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_pixels(mut self, pixels: usize) -> Self {
        self.pixels = Some(pixels);
        self
    }

    pub fn with_pixel_size(mut self, size: f64, unit: impl Into<String>) -> Self {
        self.pixel_size = Some((size, unit.into()));
        self
    }

    pub fn with_range(mut self, range: SpatialRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_data_center(mut self, center: CenterSpec) -> Self {
        self.data_center = center;
        self
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = Some(workers);
        self
    }

    /// The single resolution mode, if any was given.
    pub fn resolution(&self) -> Result<Option<Resolution>> {
        let mut modes = Vec::with_capacity(1);
        if let Some(level) = self.level {
            modes.push(Resolution::Level(level));
        }
        if let Some(pixels) = self.pixels {
            modes.push(Resolution::Pixels(pixels));
        }
        if let Some((size, unit)) = &self.pixel_size {
            modes.push(Resolution::PixelSize {
                size: *size,
                unit: unit.clone(),
            });
        }
        if modes.len() > 1 {
            return Err(Error::config(
                "specify at most one of level, pixel count and pixel size",
            ));
        }
        Ok(modes.pop())
    }

    /// Validates the request, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::config("at least one field must be requested"));
        }
        let mut seen = HashSet::with_capacity(self.fields.len());
        for f in &self.fields {
            if !seen.insert(f.name.as_str()) {
                return Err(Error::config(format!("field '{}' requested twice", f.name)));
            }
        }

        match self.resolution()? {
            Some(Resolution::Pixels(0)) => {
                return Err(Error::config("pixel count must be > 0"));
            }
            Some(Resolution::PixelSize { size, .. }) if !(size.is_finite() && size > 0.0) => {
                return Err(Error::config(format!("pixel size must be > 0, got {size}")));
            }
            _ => {}
        }

        if !(self.gamma.is_finite() && self.gamma > 1.0) {
            return Err(Error::config(format!(
                "adiabatic index must be > 1, got {}",
                self.gamma
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(Error::config("max_concurrency must be >= 1"));
        }
        self.range.validate()
    }
}
