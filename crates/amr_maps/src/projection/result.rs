//! Projection output: ordered maps plus shared geometry metadata.
use glam::DVec3;

use crate::cells::Axis;
use crate::projection::raster::Map2D;

/// One projected field.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedMap {
    pub name: String,
    /// Unit tag the values are expressed in.
    pub unit: String,
    pub map: Map2D,
}

/// Geometry shared by every map of one projection.
#[derive(Clone, Debug, PartialEq)]
pub struct MapGeometry {
    /// Projection axis.
    pub axis: Axis,
    /// Effective level; the full box is `2^level` pixels across.
    pub level: u8,
    /// Pixel edge length in code units.
    pub pixel_size: f64,
    /// Pixel edge length in [`MapGeometry::unit`].
    pub pixel_size_unit: f64,
    /// Unit of the spatial range, used by the centered extent.
    pub unit: String,
    /// Range center in code units.
    pub center: DVec3,
    /// `[h_min, h_max, v_min, v_max]` in code units.
    pub extent: [f64; 4],
    /// Extent relative to the range center, in [`MapGeometry::unit`].
    pub extent_centered: [f64; 4],
    /// Vertical over horizontal physical span.
    pub ratio: f64,
    /// First pixel column and row of the map in the full-box grid.
    pub origin: [u64; 2],
    pub width: usize,
    pub height: usize,
}

/// Ordered field maps of one projection.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionResult {
    /// Maps in request order.
    pub maps: Vec<ProjectedMap>,
    /// Accumulated weight per pixel in code units.
    pub weights: Map2D,
    pub geometry: MapGeometry,
    /// Cells that touched the map.
    pub cells_used: usize,
}

impl ProjectionResult {
    pub fn get(&self, name: &str) -> Option<&ProjectedMap> {
        self.maps.iter().find(|m| m.name == name)
    }

    /// Values of one map.
    pub fn map(&self, name: &str) -> Option<&Map2D> {
        self.get(name).map(|m| &m.map)
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        self.get(name).map(|m| m.unit.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|m| m.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectedMap> {
        self.maps.iter()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Map size as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.geometry.width, self.geometry.height)
    }
}
