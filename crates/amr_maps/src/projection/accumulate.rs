//! Per-worker accumulation grids.
//!
//! A [`Worker`] owns every grid its fields need (sums, moments, weights) and streams the
//! shared contribution list once. Moments are accumulated relative to the first value seen in
//! each pixel, so a pixel fed a single repeated value reproduces it exactly and its variance
//! is exactly zero.
use crate::fields::{FieldEvaluator, PreparedField};
use crate::projection::grid::{PixelGrid, PixelRect};
use crate::projection::raster::Map2D;
use crate::projection::request::Weighting;

/// One cell's footprint on the output grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Contribution {
    pub row: usize,
    pub rect: PixelRect,
    /// Share of the cell's projected area taken by one pixel.
    pub frac: f64,
}

/// How a field is reduced onto pixels.
#[derive(Clone, Debug)]
pub(crate) enum JobKind<'a> {
    /// Deposited mass; divided by the pixel area when `per_area` is set.
    Summed { per_area: bool },
    /// Weighted mean of a per-row value.
    Mean(PreparedField<'a>),
    /// Root of the summed weighted variances of each component.
    Dispersion(Vec<PreparedField<'a>>),
}

/// A fully resolved output field.
#[derive(Clone, Debug)]
pub(crate) struct FieldJob<'a> {
    pub name: String,
    pub unit: String,
    /// Code-to-unit factor applied after finalization.
    pub factor: f64,
    pub kind: JobKind<'a>,
}

/// Weighted first and second moments about a per-pixel shift.
struct Moments {
    shift: Vec<f64>,
    s1: Vec<f64>,
    s2: Vec<f64>,
}

impl Moments {
    fn new(len: usize) -> Self {
        Self {
            shift: vec![0.0; len],
            s1: vec![0.0; len],
            s2: vec![0.0; len],
        }
    }

    #[inline]
    fn add(&mut self, idx: usize, first: bool, w: f64, v: f64) {
        if first {
            self.shift[idx] = v;
        }
        let d = v - self.shift[idx];
        self.s1[idx] += w * d;
        self.s2[idx] += w * d * d;
    }

    #[inline]
    fn mean(&self, idx: usize, wsum: f64) -> f64 {
        self.shift[idx] + self.s1[idx] / wsum
    }

    #[inline]
    fn variance(&self, idx: usize, wsum: f64) -> f64 {
        let m = self.s1[idx] / wsum;
        (self.s2[idx] / wsum - m * m).max(0.0)
    }
}

enum JobState<'a> {
    Summed {
        sum: Vec<f64>,
        per_area: bool,
    },
    Mean {
        field: PreparedField<'a>,
        moments: Moments,
        value: f64,
    },
    Dispersion {
        fields: Vec<PreparedField<'a>>,
        moments: Vec<Moments>,
        values: Vec<f64>,
    },
}

impl<'a> JobState<'a> {
    fn new(kind: JobKind<'a>, len: usize) -> Self {
        match kind {
            JobKind::Summed { per_area } => JobState::Summed {
                sum: vec![0.0; len],
                per_area,
            },
            JobKind::Mean(field) => JobState::Mean {
                field,
                moments: Moments::new(len),
                value: 0.0,
            },
            JobKind::Dispersion(fields) => JobState::Dispersion {
                moments: fields.iter().map(|_| Moments::new(len)).collect(),
                values: vec![0.0; fields.len()],
                fields,
            },
        }
    }

    /// Evaluates the row once before it is spread over its pixels.
    #[inline]
    fn load_row(&mut self, ev: &FieldEvaluator<'_>, row: usize) {
        match self {
            JobState::Summed { .. } => {}
            JobState::Mean { field, value, .. } => *value = field.value(ev, row),
            JobState::Dispersion { fields, values, .. } => {
                for (f, v) in fields.iter().zip(values.iter_mut()) {
                    *v = f.value(ev, row);
                }
            }
        }
    }

    #[inline]
    fn add(&mut self, idx: usize, first: bool, w: f64, mass: f64) {
        match self {
            JobState::Summed { sum, .. } => sum[idx] += mass,
            JobState::Mean { moments, value, .. } => moments.add(idx, first, w, *value),
            JobState::Dispersion {
                moments, values, ..
            } => {
                for (m, v) in moments.iter_mut().zip(values.iter()) {
                    m.add(idx, first, w, *v);
                }
            }
        }
    }

    fn finalize(self, grid: &PixelGrid, weights: &[f64], hits: &[u32]) -> Map2D {
        let mut map = Map2D::empty(grid.width, grid.height);
        match self {
            JobState::Summed { sum, per_area } => {
                let area = if per_area {
                    grid.pixel_size() * grid.pixel_size()
                } else {
                    1.0
                };
                for (idx, out) in map.data.iter_mut().enumerate() {
                    if hits[idx] > 0 {
                        *out = sum[idx] / area;
                    }
                }
            }
            JobState::Mean { moments, .. } => {
                for (idx, out) in map.data.iter_mut().enumerate() {
                    if weights[idx] > 0.0 {
                        *out = moments.mean(idx, weights[idx]);
                    }
                }
            }
            JobState::Dispersion { moments, .. } => {
                for (idx, out) in map.data.iter_mut().enumerate() {
                    let wsum = weights[idx];
                    if wsum > 0.0 {
                        let var: f64 = moments.iter().map(|m| m.variance(idx, wsum)).sum();
                        *out = var.sqrt();
                    }
                }
            }
        }
        map
    }
}

/// Maps produced by one worker, plus its weight grid.
#[derive(Debug)]
pub(crate) struct WorkerOutput {
    pub worker: usize,
    pub maps: Vec<(String, String, Map2D)>,
    pub weights: Map2D,
}

/// A disjoint group of fields accumulated together.
#[derive(Debug)]
pub(crate) struct Worker<'a> {
    pub index: usize,
    pub jobs: Vec<FieldJob<'a>>,
}

impl<'a> Worker<'a> {
    /// Splits `jobs` round-robin into `workers` groups, dropping empty groups.
    pub fn partition(jobs: Vec<FieldJob<'a>>, workers: usize) -> Vec<Worker<'a>> {
        let workers = workers.max(1);
        let mut groups: Vec<Worker<'a>> = (0..workers)
            .map(|index| Worker {
                index,
                jobs: Vec::new(),
            })
            .collect();
        for (i, job) in jobs.into_iter().enumerate() {
            groups[i % workers].jobs.push(job);
        }
        groups.retain(|w| !w.jobs.is_empty());
        groups
    }

    pub fn field_names(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.name.clone()).collect()
    }

    /// Streams every contribution into this worker's grids and finalizes its maps.
    pub fn run(
        self,
        ev: &FieldEvaluator<'_>,
        grid: &PixelGrid,
        contributions: &[Contribution],
        weighting: Weighting,
    ) -> WorkerOutput {
        let len = grid.len();
        let mut weights = vec![0.0; len];
        let mut hits = vec![0u32; len];

        let mut meta = Vec::with_capacity(self.jobs.len());
        let mut states = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            meta.push((job.name, job.unit, job.factor));
            states.push(JobState::new(job.kind, len));
        }
        let needs_mass = weighting == Weighting::Mass
            || states.iter().any(|s| matches!(s, JobState::Summed { .. }));

        for c in contributions {
            let mass = if needs_mass {
                ev.mass(c.row) * c.frac
            } else {
                0.0
            };
            let w = match weighting {
                Weighting::Mass => mass,
                Weighting::Volume => ev.table().cell_size(c.row).powi(3) * c.frac,
                Weighting::None => 1.0,
            };
            for state in &mut states {
                state.load_row(ev, c.row);
            }

            for j in c.rect.j0..c.rect.j1 {
                for i in c.rect.i0..c.rect.i1 {
                    let idx = grid.flat(i, j);
                    let first = hits[idx] == 0;
                    hits[idx] += 1;
                    weights[idx] += w;
                    for state in &mut states {
                        state.add(idx, first, w, mass);
                    }
                }
            }
        }

        let maps = meta
            .into_iter()
            .zip(states)
            .map(|((name, unit, factor), state)| {
                let mut map = state.finalize(grid, &weights, &hits);
                map.scale(factor);
                (name, unit, map)
            })
            .collect();

        WorkerOutput {
            worker: self.index,
            maps,
            weights: Map2D {
                width: grid.width,
                height: grid.height,
                data: weights,
            },
        }
    }
}
