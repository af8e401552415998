//! Projection of cell tables onto power-of-two pixel grids.
//!
//! A call runs through fixed phases: resolve the grid, resolve the field list, collect cell
//! footprints, accumulate per worker group, finalize and package. Every unit, prerequisite
//! and configuration error surfaces before accumulation starts, so a failing field aborts the
//! call without partial output.
use std::collections::HashMap;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::cells::{Axis, CellTable, MAX_LEVEL};
use crate::error::{Error, Result};
use crate::fields::{DerivedField, EvalContext, Field, FieldEvaluator};
use crate::projection::accumulate::{Contribution, FieldJob, JobKind, Worker, WorkerOutput};
use crate::projection::events::{EventSink, ProjectionEvent, ProjectionEventKind};
use crate::projection::grid::PixelGrid;
use crate::projection::raster::Map2D;
use crate::projection::request::{ProjectionRequest, Resolution, Weighting};
use crate::projection::result::{MapGeometry, ProjectedMap, ProjectionResult};

/// Upper bound on pixels per map.
pub const MAX_MAP_PIXELS: usize = 1 << 30;

/// Projects fields of one table; a thin handle over [`project_with_events`].
#[derive(Clone, Copy, Debug)]
pub struct ProjectionEngine<'a> {
    pub table: &'a CellTable,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(table: &'a CellTable) -> Self {
        Self { table }
    }

    /// Runs `request`, returning the result.
    pub fn project(&self, request: &ProjectionRequest) -> Result<ProjectionResult> {
        project(self.table, request)
    }

    pub fn project_with_events(
        &self,
        request: &ProjectionRequest,
        sink: &mut dyn EventSink,
    ) -> Result<ProjectionResult> {
        project_with_events(self.table, request, sink)
    }
}

/// Projects `table` as described by `request`.
pub fn project(table: &CellTable, request: &ProjectionRequest) -> Result<ProjectionResult> {
    project_with_events(table, request, &mut ())
}

/// Projects `table` as described by `request`, reporting progress to `sink`.
pub fn project_with_events(
    table: &CellTable,
    request: &ProjectionRequest,
    sink: &mut dyn EventSink,
) -> Result<ProjectionResult> {
    request.validate()?;
    if let Some(mask) = &request.mask {
        if mask.len() != table.len() {
            return Err(Error::config(format!(
                "mask has {} entries for {} rows",
                mask.len(),
                table.len()
            )));
        }
    }

    if sink.wants(ProjectionEventKind::Started) {
        sink.send(ProjectionEvent::Started {
            fields: request.fields.iter().map(|f| f.name.clone()).collect(),
            rows: table.len(),
            axis: request.axis,
        });
    }

    // Resolve resolution.
    let level = resolve_level(table, request)?;
    if !table.is_empty() && level > table.lmax() {
        let message = format!(
            "level {level} is finer than the finest cell (level {}); cell values are replicated",
            table.lmax()
        );
        warn!("Projection {message}.");
        warn_event(sink, "resolution", message);
    }

    let scale = table.scale();
    let boxlen = table.boxlen();
    let range = &request.range;
    let range_factor = scale.resolve_extent(&range.unit, "projection range")?;
    let range_center = range.center.resolve(boxlen, scale, "projection range center")?;
    let bounds = request.axis.plane();
    let absolute = |axis: Axis| -> [f64; 2] {
        match range.get(axis) {
            Some([lo, hi]) => {
                let c = range_center[axis.index()];
                [c + lo / range_factor, c + hi / range_factor]
            }
            None => [0.0, boxlen],
        }
    };
    let grid = PixelGrid::covering(
        level,
        boxlen,
        request.axis,
        absolute(bounds.0),
        absolute(bounds.1),
    )?;
    if grid.len() > MAX_MAP_PIXELS {
        return Err(Error::config(format!(
            "{}x{} pixels at level {level} exceed the map size limit",
            grid.width, grid.height
        )));
    }
    if sink.wants(ProjectionEventKind::ResolutionResolved) {
        sink.send(ProjectionEvent::ResolutionResolved {
            level,
            width: grid.width,
            height: grid.height,
            pixel_size: grid.pixel_size(),
        });
    }

    // Resolve field list.
    let data_center = request
        .data_center
        .resolve(boxlen, scale, "data center")?;
    let ev = FieldEvaluator::new(table, EvalContext::new(data_center).with_gamma(request.gamma));
    let jobs = resolve_jobs(&ev, request)?;

    // Collect cell footprints. A window disjoint from the box keeps its clamped edge pixels
    // but receives no cells.
    let los = absolute(request.axis);
    let disjoint = [bounds.0, bounds.1].into_iter().any(|a| {
        let [lo, hi] = absolute(a);
        hi < 0.0 || lo > boxlen
    });
    let contributions: Vec<Contribution> = (0..table.len())
        .filter(|_| !disjoint)
        .filter(|&row| request.mask.as_ref().is_none_or(|m| m[row]))
        .filter_map(|row| {
            let cell = table.cell(row);
            let c = cell.center(boxlen)[request.axis.index()];
            if c < los[0] || c > los[1] {
                return None;
            }
            grid.cell_rect(&cell).map(|rect| Contribution {
                row,
                rect,
                frac: grid.footprint_fraction(cell.level),
            })
        })
        .collect();
    if contributions.is_empty() {
        let message = "no cells fall inside the projected region".to_string();
        warn!("Projection: {message}.");
        warn_event(sink, "selection", message);
    }

    // Accumulate.
    let max_workers = request.max_concurrency.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let groups = Worker::partition(jobs, max_workers.min(request.fields.len()));
    info!(
        "Projecting {} field(s) along {} | level {} | {}x{} pixels | {} cells | {} worker(s).",
        request.fields.len(),
        request.axis.name(),
        level,
        grid.width,
        grid.height,
        contributions.len(),
        groups.len(),
    );
    if sink.wants(ProjectionEventKind::WorkersPlanned) {
        sink.send(ProjectionEvent::WorkersPlanned {
            workers: groups.len(),
            groups: groups.iter().map(Worker::field_names).collect(),
        });
    }

    let weighting = request.weighting;
    let outputs: Vec<WorkerOutput> = if groups.len() <= 1 {
        groups
            .into_iter()
            .map(|w| w.run(&ev, &grid, &contributions, weighting))
            .collect()
    } else {
        let pool = ThreadPoolBuilder::new()
            .num_threads(groups.len())
            .build()
            .map_err(|e| Error::Other(format!("failed to start projection workers: {e}")))?;
        pool.install(|| {
            groups
                .into_par_iter()
                .map(|w| w.run(&ev, &grid, &contributions, weighting))
                .collect()
        })
    };

    // Package.
    let mut weights = None;
    let mut by_name: HashMap<String, ProjectedMap> = HashMap::with_capacity(request.fields.len());
    for out in outputs {
        let fields: Vec<String> = out.maps.iter().map(|(name, _, _)| name.clone()).collect();
        debug!("Worker {} finished: {}.", out.worker, fields.join(", "));
        if sink.wants(ProjectionEventKind::FieldsFinished) {
            sink.send(ProjectionEvent::FieldsFinished {
                worker: out.worker,
                fields,
            });
        }
        for (name, unit, map) in out.maps {
            by_name.insert(name.clone(), ProjectedMap { name, unit, map });
        }
        weights.get_or_insert(out.weights);
    }
    let maps = request
        .fields
        .iter()
        .filter_map(|f| by_name.remove(&f.name))
        .collect();

    let extent = grid.extent();
    let (h, v) = request.axis.plane();
    let (ch, cv) = (range_center[h.index()], range_center[v.index()]);
    let geometry = MapGeometry {
        axis: request.axis,
        level,
        pixel_size: grid.pixel_size(),
        pixel_size_unit: grid.pixel_size() * range_factor,
        unit: range.unit.clone(),
        center: range_center,
        extent,
        extent_centered: [
            (extent[0] - ch) * range_factor,
            (extent[1] - ch) * range_factor,
            (extent[2] - cv) * range_factor,
            (extent[3] - cv) * range_factor,
        ],
        ratio: (extent[3] - extent[2]) / (extent[1] - extent[0]),
        origin: [grid.origin_i, grid.origin_j],
        width: grid.width,
        height: grid.height,
    };

    let result = ProjectionResult {
        maps,
        weights: weights.unwrap_or_else(|| Map2D::filled(grid.width, grid.height, 0.0)),
        geometry,
        cells_used: contributions.len(),
    };

    if sink.wants(ProjectionEventKind::Finished) {
        sink.send(ProjectionEvent::Finished {
            cells_used: result.cells_used,
        });
    }
    Ok(result)
}

fn warn_event(sink: &mut dyn EventSink, context: &str, message: String) {
    if sink.wants(ProjectionEventKind::Warning) {
        sink.send(ProjectionEvent::Warning {
            context: context.into(),
            message,
        });
    }
}

/// Smallest `l` with `2^l >= n`.
fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

fn resolve_level(table: &CellTable, request: &ProjectionRequest) -> Result<u8> {
    let level = match request.resolution()? {
        None => return Ok(table.lmax()),
        Some(Resolution::Level(level)) => u32::from(level),
        Some(Resolution::Pixels(n)) => ceil_log2(n),
        Some(Resolution::PixelSize { size, unit }) => {
            let size = table.scale().to_code(size, &unit, "pixel size")?;
            let pixels = (table.boxlen() / size).ceil();
            if !pixels.is_finite() || pixels > (1u64 << MAX_LEVEL) as f64 {
                return Err(Error::config(format!(
                    "pixel size {size} is too small for box length {}",
                    table.boxlen()
                )));
            }
            ceil_log2(pixels.max(1.0) as usize)
        }
    };
    if level > u32::from(MAX_LEVEL) {
        return Err(Error::config(format!(
            "level {level} exceeds the finest supported level {MAX_LEVEL}"
        )));
    }
    u8::try_from(level).map_err(|_| Error::config(format!("invalid level {level}")))
}

/// Checks prerequisites and units of every requested field up front.
fn resolve_jobs<'a>(
    ev: &FieldEvaluator<'a>,
    request: &ProjectionRequest,
) -> Result<Vec<FieldJob<'a>>> {
    let scale = ev.table().scale();
    let mass = Field::Derived(DerivedField::Mass);
    if request.weighting == Weighting::Mass {
        ev.prepare(&mass)?;
    }

    request
        .fields
        .iter()
        .map(|f| {
            let factor = scale.get(&f.unit)?;
            let kind = match Field::parse(&f.name) {
                Field::Derived(DerivedField::Mass) => {
                    ev.prepare(&mass)?;
                    JobKind::Summed { per_area: false }
                }
                Field::Derived(DerivedField::SurfaceDensity) => {
                    ev.prepare(&mass)?;
                    JobKind::Summed { per_area: true }
                }
                Field::Dispersion(d) => JobKind::Dispersion(
                    d.components()
                        .iter()
                        .map(|c| ev.prepare(c))
                        .collect::<Result<_>>()?,
                ),
                field => JobKind::Mean(ev.prepare(&field)?),
            };
            Ok(FieldJob {
                name: f.name.clone(),
                unit: f.unit.clone(),
                factor,
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::{Axis, CellTableBuilder, CenterSpec};
    use crate::projection::events::VecSink;
    use crate::projection::request::SpatialRange;
    use crate::selection::{select_mask, GeometrySpec, Region};
    use crate::units::{Scale, STANDARD};

    fn approx_eq(a: f64, b: f64) {
        assert!(
            (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0),
            "{a} != {b}"
        );
    }

    /// All 8 level-1 cells of a unit box with `rho = 2`.
    fn level1_uniform() -> CellTable {
        let mut b = CellTableBuilder::new(1.0, ["rho", "vx", "vy", "vz", "p"]);
        for x in 1..=2 {
            for y in 1..=2 {
                for z in 1..=2 {
                    b.push(1, [x, y, z], &[2.0, 3.0, 0.0, 0.0, 1.0]).unwrap();
                }
            }
        }
        b.build().unwrap()
    }

    /// Seven level-1 cells plus the first octant refined into eight level-2 cells.
    fn refined() -> CellTable {
        let mut b = CellTableBuilder::new(2.0, ["rho", "vx", "vy", "vz", "p"]);
        let mut k = 1.0;
        for x in 1..=2u32 {
            for y in 1..=2u32 {
                for z in 1..=2u32 {
                    if (x, y, z) != (1, 1, 1) {
                        b.push(1, [x, y, z], &[k, 3.0, -k, 0.5, 1.0]).unwrap();
                        k += 1.0;
                    }
                }
            }
        }
        for x in 1..=2u32 {
            for y in 1..=2u32 {
                for z in 1..=2u32 {
                    b.push(2, [x, y, z], &[0.5 * k, 3.0, k, -0.5, 2.0]).unwrap();
                    k += 1.0;
                }
            }
        }
        b.build().unwrap()
    }

    fn total_mass(t: &CellTable) -> f64 {
        let ev = FieldEvaluator::new(t, EvalContext::default());
        (0..t.len()).map(|r| ev.mass(r)).sum()
    }

    #[test]
    fn uniform_cube_has_constant_surface_density() {
        let t = level1_uniform();
        let res = project(&t, &ProjectionRequest::new(["sd"]).with_level(1)).unwrap();
        let sd = res.map("sd").unwrap();
        assert_eq!(sd.size(), (2, 2));
        for v in &sd.data {
            approx_eq(*v, 2.0);
        }
        assert_eq!(res.geometry.extent, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(res.cells_used, 8);
    }

    #[test]
    fn constant_velocity_has_zero_dispersion() {
        let t = refined();
        for level in 0..=3 {
            let req = ProjectionRequest::new(["sigmax", "vx"]).with_level(level);
            let res = project(&t, &req).unwrap();
            assert!(res.map("sigmax").unwrap().data.iter().all(|&s| s == 0.0));
            assert!(res.map("vx").unwrap().data.iter().all(|&v| v == 3.0));
        }
    }

    #[test]
    fn total_dispersion_combines_components() {
        let t = refined();
        let req = ProjectionRequest::new(["sigma", "sigmay", "sigmaz"]).with_level(0);
        let res = project(&t, &req).unwrap();
        let s = res.map("sigma").unwrap().data[0];
        let sy = res.map("sigmay").unwrap().data[0];
        let sz = res.map("sigmaz").unwrap().data[0];
        approx_eq(s * s, sy * sy + sz * sz);
        assert!(sy > 0.0 && sz > 0.0);
    }

    #[test]
    fn mass_is_conserved_at_every_level() {
        let t = refined();
        let expected = total_mass(&t);
        for level in 0..=4 {
            let res = project(&t, &ProjectionRequest::new(["mass"]).with_level(level)).unwrap();
            approx_eq(res.map("mass").unwrap().sum(), expected);
            approx_eq(res.weights.sum(), expected);
        }
    }

    #[test]
    fn surface_density_integrates_to_mass() {
        let t = refined();
        let res = project(&t, &ProjectionRequest::new(["sd"]).with_level(3)).unwrap();
        let area = res.geometry.pixel_size * res.geometry.pixel_size;
        approx_eq(res.map("sd").unwrap().sum() * area, total_mass(&t));
    }

    #[test]
    fn finer_pixels_replicate_cell_values() {
        let mut b = CellTableBuilder::new(1.0, ["rho"]);
        b.push(1, [1, 1, 1], &[0.1]).unwrap();
        b.push(1, [2, 1, 1], &[0.7]).unwrap();
        b.push(2, [1, 3, 1], &[1.3]).unwrap();
        let t = b.build().unwrap();

        let mut sink = VecSink::new();
        let req = ProjectionRequest::new(["rho"]).with_level(3);
        let res = project_with_events(&t, &req, &mut sink).unwrap();
        let rho = res.map("rho").unwrap();
        for j in 0..4 {
            for i in 0..4 {
                assert_eq!(rho.get(i, j), Some(0.1));
                assert_eq!(rho.get(i + 4, j), Some(0.7));
            }
        }
        for j in 4..6 {
            for i in 0..2 {
                assert_eq!(rho.get(i, j), Some(1.3));
            }
        }
        assert!(rho.get(7, 7).unwrap().is_nan());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, ProjectionEvent::Warning { context, .. } if context == "resolution")));
    }

    #[test]
    fn empty_table_yields_no_data_maps() {
        let t = CellTableBuilder::new(1.0, ["rho", "vx"]).build().unwrap();
        let req = ProjectionRequest::new(["sd", "vx", "sigmax"]).with_level(2);
        let res = project(&t, &req).unwrap();
        assert_eq!(res.size(), (4, 4));
        for m in res.iter() {
            assert!(m.map.is_all_no_data(), "{}", m.name);
        }
        assert_eq!(res.cells_used, 0);
    }

    #[test]
    fn selection_and_inverse_sum_to_whole() {
        let t = refined();
        let region = Region::new(GeometrySpec::sphere(0.6, CenterSpec::code([0.5, 0.5, 0.5])));
        let inside = select_mask(&t, &region).unwrap();
        let outside = select_mask(&t, &region.inverted()).unwrap();

        let base = ProjectionRequest::new(["mass", "sd"]).with_level(2);
        let whole = project(&t, &base).unwrap();
        let a = project(&t, &base.clone().with_mask(inside)).unwrap();
        let b = project(&t, &base.with_mask(outside)).unwrap();

        for name in ["mass", "sd"] {
            let (w, a, b) = (whole.map(name).unwrap(), a.map(name).unwrap(), b.map(name).unwrap());
            for idx in 0..w.data.len() {
                let parts = [a.data[idx], b.data[idx]]
                    .iter()
                    .filter(|v| !v.is_nan())
                    .sum::<f64>();
                approx_eq(parts, w.data[idx]);
            }
        }
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let t = refined();
        let fields = ["sd", "vx", "sigma", "v", "rho", "T"];
        let serial = project(
            &t,
            &ProjectionRequest::new(fields)
                .with_level(3)
                .with_max_concurrency(1),
        )
        .unwrap();
        let parallel = project(
            &t,
            &ProjectionRequest::new(fields)
                .with_level(3)
                .with_max_concurrency(4),
        )
        .unwrap();
        assert_eq!(
            serial.names().collect::<Vec<_>>(),
            parallel.names().collect::<Vec<_>>()
        );
        for (s, p) in serial.iter().zip(parallel.iter()) {
            for (a, b) in s.map.data.iter().zip(&p.map.data) {
                assert!(a == b || (a.is_nan() && b.is_nan()), "{}", s.name);
            }
        }
    }

    #[test]
    fn events_arrive_in_phase_order() {
        let t = level1_uniform();
        let mut sink = VecSink::new();
        let req = ProjectionRequest::new(["sd", "vx"]).with_max_concurrency(2);
        project_with_events(&t, &req, &mut sink).unwrap();
        let kinds: Vec<_> = sink.kinds();
        assert_eq!(kinds[0], ProjectionEventKind::Started);
        assert_eq!(kinds[1], ProjectionEventKind::ResolutionResolved);
        assert_eq!(kinds[2], ProjectionEventKind::WorkersPlanned);
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == ProjectionEventKind::FieldsFinished)
                .count(),
            2
        );
        assert_eq!(kinds.last(), Some(&ProjectionEventKind::Finished));
    }

    #[test]
    fn resolution_modes_pick_power_of_two_levels() {
        let t = refined().with_scale(Scale::new().with_unit("kpc", 10.0));
        let level = |req: ProjectionRequest| project(&t, &req).unwrap().geometry.level;
        assert_eq!(level(ProjectionRequest::new(["rho"])), 2);
        assert_eq!(level(ProjectionRequest::new(["rho"]).with_pixels(5)), 3);
        assert_eq!(level(ProjectionRequest::new(["rho"]).with_pixels(1)), 0);
        // boxlen 2 = 20 kpc; 3 kpc pixels need at least 7 per side.
        assert_eq!(
            level(ProjectionRequest::new(["rho"]).with_pixel_size(3.0, "kpc")),
            3
        );
        assert_eq!(
            level(ProjectionRequest::new(["rho"]).with_pixel_size(100.0, "kpc")),
            0
        );
    }

    #[test]
    fn range_selects_pixel_window_and_slab() {
        let t = refined().with_scale(Scale::new().with_unit("kpc", 10.0));
        let range = SpatialRange::around(CenterSpec::box_center(), "kpc")
            .with_x(-10.0, 0.0)
            .with_z(-10.0, 0.0);
        let req = ProjectionRequest::new(["mass"])
            .with_level(2)
            .with_range(range);
        let res = project(&t, &req).unwrap();
        let g = &res.geometry;
        assert_eq!((g.width, g.height), (2, 4));
        assert_eq!(g.origin, [0, 0]);
        assert_eq!(g.extent, [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(g.extent_centered, [-10.0, 0.0, -10.0, 10.0]);
        approx_eq(g.pixel_size_unit, 5.0);
        approx_eq(g.ratio, 2.0);

        // Only (1,2,1) and the eight fine cells lie in the window and the z slab.
        let ev = FieldEvaluator::new(&t, EvalContext::default());
        let expected: f64 = (0..t.len())
            .filter(|&r| {
                let c = t.cell_center(r);
                c.x < 1.0 && c.z < 1.0
            })
            .map(|r| ev.mass(r))
            .sum();
        approx_eq(res.map("mass").unwrap().sum(), expected);
    }

    #[test]
    fn window_outside_box_collects_nothing() {
        let t = level1_uniform();
        let range = SpatialRange::around(CenterSpec::code([0.0; 3]), STANDARD)
            .with_x(5.0, 6.0)
            .with_y(5.0, 6.0);
        let mut sink = VecSink::new();
        let req = ProjectionRequest::new(["mass", "rho"])
            .with_level(1)
            .with_range(range);
        let res = project_with_events(&t, &req, &mut sink).unwrap();
        assert_eq!(res.cells_used, 0);
        assert!(res.map("mass").unwrap().is_all_no_data());
        assert!(res.map("rho").unwrap().is_all_no_data());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, ProjectionEvent::Warning { context, .. } if context == "selection")));

        // A window overlapping the box edge still sees the edge cells.
        let range = SpatialRange::around(CenterSpec::code([0.0; 3]), STANDARD)
            .with_x(0.75, 6.0)
            .with_y(0.75, 6.0);
        let res = project(&t, &ProjectionRequest::new(["mass"]).with_level(1).with_range(range))
            .unwrap();
        assert_eq!(res.cells_used, 2);
        approx_eq(res.map("mass").unwrap().sum(), 0.5);
    }

    #[test]
    fn full_range_offsets_start_at_box_center() {
        let t = level1_uniform();
        let res = project(&t, &ProjectionRequest::new(["mass"]).with_level(1)).unwrap();
        assert_eq!(res.geometry.extent_centered, [-0.5, 0.5, -0.5, 0.5]);

        // Slab [0.8, 1.5] in absolute z misses both cell layers.
        let req = ProjectionRequest::new(["mass"])
            .with_level(1)
            .with_range(SpatialRange::full().with_z(0.3, 1.0));
        assert_eq!(project(&t, &req).unwrap().cells_used, 0);

        // Slab [0.5, 0.8] holds the upper layer only.
        let req = ProjectionRequest::new(["mass"])
            .with_level(1)
            .with_range(SpatialRange::full().with_z(0.0, 0.3));
        let res = project(&t, &req).unwrap();
        assert_eq!(res.cells_used, 4);
        approx_eq(res.map("mass").unwrap().sum(), 1.0);
    }

    #[test]
    fn field_units_scale_values() {
        let t = level1_uniform().with_scale(Scale::new().with_unit("km_s", 2.0));
        let req = ProjectionRequest::new(["vx"]).with_field_unit("vx", "km_s");
        let res = project(&t, &req).unwrap();
        assert_eq!(res.unit("vx"), Some("km_s"));
        assert!(res.map("vx").unwrap().data.iter().all(|&v| v == 6.0));
    }

    #[test]
    fn unit_and_configuration_errors() {
        let t = level1_uniform();
        let unknown_field_unit = ProjectionRequest::new(["vx"]).with_field_unit("vx", "parsec");
        assert!(matches!(
            project(&t, &unknown_field_unit),
            Err(Error::UnknownUnit { .. })
        ));

        let bad_range = ProjectionRequest::new(["vx"])
            .with_range(SpatialRange::around(CenterSpec::box_center(), "kpc").with_x(-1.0, 1.0));
        assert!(matches!(
            project(&t, &bad_range),
            Err(Error::UnitResolution { .. })
        ));

        let bad_pixel_unit = ProjectionRequest::new(["vx"]).with_pixel_size(1.0, "kpc");
        assert!(matches!(
            project(&t, &bad_pixel_unit),
            Err(Error::UnitResolution { .. })
        ));

        let short_mask = ProjectionRequest::new(["vx"]).with_mask(vec![true; 3]);
        assert!(matches!(
            project(&t, &short_mask),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn missing_prerequisite_aborts_whole_call() {
        let mut b = CellTableBuilder::new(1.0, ["rho", "vx"]);
        b.push(0, [1, 1, 1], &[1.0, 0.0]).unwrap();
        let t = b.build().unwrap();

        let req = ProjectionRequest::new(["sd", "cs"]);
        match project(&t, &req) {
            Err(Error::MissingPrerequisite { field, missing }) => {
                assert_eq!(field, "cs");
                assert_eq!(missing, vec!["p".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }

        let req = ProjectionRequest::new(["metals"]);
        assert!(matches!(
            project(&t, &req),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn other_axes_use_their_planes() {
        let t = refined();
        let expected = total_mass(&t);
        for axis in Axis::ALL {
            let req = ProjectionRequest::new(["mass"]).with_axis(axis).with_level(2);
            let res = project(&t, &req).unwrap();
            assert_eq!(res.geometry.axis, axis);
            approx_eq(res.map("mass").unwrap().sum(), expected);
        }
    }

    #[test]
    fn volume_weighting_averages_by_cell_volume() {
        let mut b = CellTableBuilder::new(1.0, ["rho"]);
        b.push(1, [1, 1, 1], &[1.0]).unwrap();
        b.push(2, [1, 1, 3], &[5.0]).unwrap();
        let t = b.build().unwrap();
        let req = ProjectionRequest::new(["rho"])
            .with_level(1)
            .with_weighting(Weighting::Volume);
        let res = project(&t, &req).unwrap();
        // Volumes 1/8 and 1/64.
        approx_eq(res.map("rho").unwrap().data[0], (1.0 * 8.0 + 5.0) / 9.0);

        let req = req.with_weighting(Weighting::None);
        let res = project(&t, &req).unwrap();
        approx_eq(res.map("rho").unwrap().data[0], 3.0);
    }
}
