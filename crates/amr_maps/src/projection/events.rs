//! Event types and sinks for observing projection calls.
//!
//! [`crate::projection::project_with_events`] reports to an [`EventSink`]; the sinks here
//! record, filter, log or hand events to a closure. Events are coarse progress only and
//! are always emitted from the calling thread, never from workers.
use tracing::{debug, warn};

use crate::cells::Axis;

/// Describes events emitted by projection calls.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionEvent {
    /// Emitted after the request was validated.
    Started {
        /// Requested field names in output order.
        fields: Vec<String>,
        /// Rows in the input table.
        rows: usize,
        /// Projection axis.
        axis: Axis,
    },

    /// Emitted once the output grid is known.
    ResolutionResolved {
        /// Effective level of the pixel grid.
        level: u8,
        /// Map width in pixels.
        width: usize,
        /// Map height in pixels.
        height: usize,
        /// Pixel edge length in code units.
        pixel_size: f64,
    },

    /// Emitted before accumulation starts.
    WorkersPlanned {
        /// Number of worker groups.
        workers: usize,
        /// Fields owned by each group.
        groups: Vec<Vec<String>>,
    },

    /// Emitted when a worker group's maps are finalized.
    FieldsFinished {
        /// Index of the group.
        worker: usize,
        /// Fields produced by the group.
        fields: Vec<String>,
    },

    /// Emitted when the projection finishes.
    Finished {
        /// Cells that contributed to at least one pixel.
        cells_used: usize,
    },

    /// Non-fatal warning generated during projection.
    Warning {
        /// Phase that raised it: `"resolution"` or `"selection"`.
        context: String,
        message: String,
    },
}

/// Discriminant of [`ProjectionEvent`] used to filter what a sink receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionEventKind {
    Started,
    ResolutionResolved,
    WorkersPlanned,
    FieldsFinished,
    Finished,
    Warning,
}

impl ProjectionEvent {
    pub fn kind(&self) -> ProjectionEventKind {
        match self {
            ProjectionEvent::Started { .. } => ProjectionEventKind::Started,
            ProjectionEvent::ResolutionResolved { .. } => ProjectionEventKind::ResolutionResolved,
            ProjectionEvent::WorkersPlanned { .. } => ProjectionEventKind::WorkersPlanned,
            ProjectionEvent::FieldsFinished { .. } => ProjectionEventKind::FieldsFinished,
            ProjectionEvent::Finished { .. } => ProjectionEventKind::Finished,
            ProjectionEvent::Warning { .. } => ProjectionEventKind::Warning,
        }
    }
}

/// Receiver of [`ProjectionEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: ProjectionEvent);

    /// Whether events of `kind` should be built at all.
    #[inline]
    fn wants(&self, _kind: ProjectionEventKind) -> bool {
        true
    }
}

/// Discards everything; used by [`crate::projection::project`].
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: ProjectionEvent) {}

    #[inline]
    fn wants(&self, _kind: ProjectionEventKind) -> bool {
        false
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    #[inline]
    fn send(&mut self, event: ProjectionEvent) {
        (**self).send(event);
    }

    #[inline]
    fn wants(&self, kind: ProjectionEventKind) -> bool {
        (**self).wants(kind)
    }
}

/// Calls a closure for every event.
pub struct FnSink<F: FnMut(ProjectionEvent)>(F);

impl<F: FnMut(ProjectionEvent)> FnSink<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: FnMut(ProjectionEvent)> EventSink for FnSink<F> {
    #[inline]
    fn send(&mut self, event: ProjectionEvent) {
        (self.0)(event);
    }
}

/// Records events in arrival order.
#[derive(Debug, Default)]
pub struct VecSink(Vec<ProjectionEvent>);

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ProjectionEvent] {
        &self.0
    }

    pub fn kinds(&self) -> Vec<ProjectionEventKind> {
        self.0.iter().map(ProjectionEvent::kind).collect()
    }

    pub fn into_inner(self) -> Vec<ProjectionEvent> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: ProjectionEvent) {
        self.0.push(event);
    }
}

/// Forwards only the listed event kinds.
pub struct FilterSink<S: EventSink> {
    inner: S,
    kinds: Vec<ProjectionEventKind>,
}

impl<S: EventSink> FilterSink<S> {
    pub fn new(inner: S, kinds: impl IntoIterator<Item = ProjectionEventKind>) -> Self {
        Self {
            inner,
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSink> EventSink for FilterSink<S> {
    fn send(&mut self, event: ProjectionEvent) {
        if self.kinds.contains(&event.kind()) {
            self.inner.send(event);
        }
    }

    fn wants(&self, kind: ProjectionEventKind) -> bool {
        self.kinds.contains(&kind) && self.inner.wants(kind)
    }
}

/// Writes every event to the `tracing` subscriber at `debug` level, warnings at `warn`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send(&mut self, event: ProjectionEvent) {
        match event {
            ProjectionEvent::Warning { context, message } => {
                warn!("[{context}] {message}");
            }
            ProjectionEvent::ResolutionResolved {
                level,
                width,
                height,
                pixel_size,
            } => debug!("Grid: level {level}, {width}x{height} pixels of size {pixel_size:.6e}."),
            ProjectionEvent::WorkersPlanned { workers, groups } => {
                debug!("Planned {workers} worker(s): {groups:?}.");
            }
            ProjectionEvent::FieldsFinished { worker, fields } => {
                debug!("Worker {worker} done: {}.", fields.join(", "));
            }
            other => debug!("{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(context: &str) -> ProjectionEvent {
        ProjectionEvent::Warning {
            context: context.into(),
            message: "pixel finer than cell".into(),
        }
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut sink = VecSink::new();
        assert!(sink.is_empty());
        sink.send(ProjectionEvent::Finished { cells_used: 1 });
        sink.send(warning("resolution"));
        assert_eq!(
            sink.kinds(),
            vec![ProjectionEventKind::Finished, ProjectionEventKind::Warning]
        );
        assert_eq!(sink.events()[1], warning("resolution"));
    }

    #[test]
    fn closures_receive_owned_events() {
        let mut contexts = Vec::new();
        let mut sink = FnSink::new(|event| {
            if let ProjectionEvent::Warning { context, .. } = event {
                contexts.push(context);
            }
        });
        sink.send(warning("selection"));
        sink.send(ProjectionEvent::Finished { cells_used: 0 });
        drop(sink);
        assert_eq!(contexts, vec!["selection".to_string()]);
    }

    #[test]
    fn filter_sink_drops_other_kinds() {
        let mut sink = FilterSink::new(VecSink::new(), [ProjectionEventKind::Finished]);
        assert!(!sink.wants(ProjectionEventKind::Warning));
        sink.send(warning("resolution"));
        sink.send(ProjectionEvent::Finished { cells_used: 3 });
        let events = sink.into_inner().into_inner();
        assert_eq!(events, vec![ProjectionEvent::Finished { cells_used: 3 }]);
    }

    #[test]
    fn borrowed_sinks_can_be_wrapped() {
        let mut recorded = VecSink::new();
        {
            let mut filtered = FilterSink::new(&mut recorded, [ProjectionEventKind::Warning]);
            filtered.send(warning("resolution"));
            filtered.send(ProjectionEvent::Finished { cells_used: 2 });
        }
        assert_eq!(recorded.len(), 1);
    }

    #[test]
    fn unit_sink_wants_nothing() {
        let sink = ();
        assert!(!sink.wants(ProjectionEventKind::Started));
        assert!(TracingSink.wants(ProjectionEventKind::Started));
    }
}
