#![forbid(unsafe_code)]
//! amr_maps: geometric selection, multi-resolution projection and weighted statistics for
//! adaptive-mesh-refinement cell data.
//!
//! Modules:
//! - cells: columnar leaf-cell tables, axes and reference centers
//! - fields: base, derived and dispersion field vocabulary and per-row evaluation
//! - selection: box, cylinder, sphere and shell regions with inverse, union and intersection
//! - projection: power-of-two pixel grids, weighted accumulation, worker pool, events
//! - stats: weighted moments, median and whole-table reductions
//! - source: the loader seam and an in-memory implementation
//! - synthetic: seeded test tables
//! - units: unit-name to factor lookup
//!
//! For examples, see the README and the `amr_maps_examples` crate.
pub mod cells;
pub mod error;
pub mod fields;
pub mod projection;
pub mod selection;
pub mod source;
pub mod stats;
pub mod synthetic;
pub mod units;

/// Convenient re-exports for common types. Import with `use amr_maps::prelude::*;`.
pub mod prelude {
    pub use crate::cells::{
        Axis, Cell, CellTable, CellTableBuilder, CenterCoord, CenterSpec, MAX_LEVEL,
    };
    pub use crate::error::{Error, Result};
    pub use crate::fields::{
        DerivedField, Dispersion, EvalContext, Field, FieldEvaluator, DEFAULT_GAMMA,
    };
    pub use crate::projection::{
        project, project_with_events, EventSink, FilterSink, FnSink, Map2D, MapGeometry,
        ProjectedMap, ProjectionEngine, ProjectionEvent, ProjectionEventKind, ProjectionRequest,
        ProjectionResult, SpatialRange, TracingSink, VecSink, Weighting, NO_DATA,
    };
    pub use crate::selection::{
        select, select_all, select_any, select_mask, GeometrySpec, Region, ShellShape,
    };
    pub use crate::source::{CellSource, LoadDescriptor, MemorySource, RangeUnit};
    pub use crate::stats::{
        bulk_velocity, center_of_mass, field_stats, total_mass, weighted_stats, WeightedStats,
    };
    pub use crate::synthetic::{refined_table, uniform_table, RefinedTableConfig};
    pub use crate::units::{Scale, STANDARD};
}
