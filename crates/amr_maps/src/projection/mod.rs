//! Multi-resolution projection of cell tables onto 2-D maps.
//!
//! This module exposes:
//! - [`ProjectionRequest`] and its parts ([`Weighting`], [`SpatialRange`], [`Resolution`]),
//! - [`project`] / [`project_with_events`] and the [`ProjectionEngine`] handle,
//! - [`ProjectionResult`] with its ordered [`ProjectedMap`]s and [`MapGeometry`],
//! - projection [events] and sinks.
//!
//! The output grid is always `2^level` pixels across the box, so cells either cover whole
//! blocks of pixels (their value is replicated) or fall inside one pixel (they are
//! combined by weighted accumulation). `mass` and `sd` are summed fields, dispersions
//! (`sigmax`, `sigma`, ...) are built from first and second moments, and every other field
//! is a weighted mean. Pixels without data hold [`NO_DATA`].
//!
//! Fields are partitioned across a dedicated worker pool; each worker owns all grids for its
//! fields, so there is no shared mutable state and no merge step.
mod accumulate;
pub mod engine;
pub mod events;
pub mod grid;
pub mod raster;
pub mod request;
pub mod result;

pub use engine::{project, project_with_events, ProjectionEngine, MAX_MAP_PIXELS};
pub use events::{
    EventSink, FilterSink, FnSink, ProjectionEvent, ProjectionEventKind, TracingSink, VecSink,
};
pub use grid::{PixelGrid, PixelRect};
pub use raster::{Map2D, NO_DATA};
pub use request::{FieldRequest, ProjectionRequest, Resolution, SpatialRange, Weighting};
pub use result::{MapGeometry, ProjectedMap, ProjectionResult};
