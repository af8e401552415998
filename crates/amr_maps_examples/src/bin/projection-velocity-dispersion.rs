use amr_maps::prelude::*;
use amr_maps_examples::{galaxy_table, init_tracing, render_map_to_png, ColorScale, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let table = galaxy_table(4, 8, 7)?;

    // Edge-on view: project along y, keep a 10 kpc thick slab.
    let range = SpatialRange::around(CenterSpec::box_center(), "kpc")
        .with_x(-25.0, 25.0)
        .with_y(-5.0, 5.0)
        .with_z(-25.0, 25.0);
    let request = ProjectionRequest::default()
        .with_field("sigma", "km_s")
        .with_field("vphi_cylinder", "km_s")
        .with_field("rho", "g_cm3")
        .with_axis(Axis::Y)
        .with_level(7)
        .with_range(range)
        .with_max_concurrency(3);

    let mut sink = FnSink::new(|event: ProjectionEvent| match event {
        ProjectionEvent::WorkersPlanned { workers, groups } => {
            info!("{} workers: {:?}", workers, groups);
        }
        ProjectionEvent::FieldsFinished { worker, fields } => {
            info!("Worker {} finished {:?}.", worker, fields);
        }
        ProjectionEvent::Warning { context, message } => {
            info!("[{}] {}", context, message);
        }
        other => info!("{:?}", other),
    });

    let result = project_with_events(&table, &request, &mut sink)?;

    let sigma = result
        .map("sigma")
        .ok_or_else(|| anyhow::anyhow!("missing sigma map"))?;
    render_map_to_png(
        sigma,
        &RenderConfig::new(ColorScale::Linear).with_upscale(4),
        "projection-velocity-dispersion.png",
    )?;

    let vphi = result
        .map("vphi_cylinder")
        .ok_or_else(|| anyhow::anyhow!("missing vphi_cylinder map"))?;
    render_map_to_png(
        vphi,
        &RenderConfig::new(ColorScale::Linear).with_upscale(4),
        "projection-rotation-velocity.png",
    )?;

    Ok(())
}
