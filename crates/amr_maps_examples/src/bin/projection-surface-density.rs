use amr_maps::prelude::*;
use amr_maps_examples::{galaxy_table, init_tracing, render_map_to_png, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Disk refined from level 5 down to level 9 around the box center.
    let table = galaxy_table(5, 9, 2025)?;
    info!("Generated {} cells.", table.len());

    // Face-on surface density in Msol/pc^2 on a 256 pixel grid over the central 40 kpc.
    let range = SpatialRange::around(CenterSpec::box_center(), "kpc")
        .with_x(-20.0, 20.0)
        .with_y(-20.0, 20.0);
    let request = ProjectionRequest::default()
        .with_field("sd", "Msol_pc2")
        .with_pixels(256)
        .with_range(range);

    let result = project_with_events(&table, &request, &mut TracingSink)?;
    let sd = result.map("sd").ok_or_else(|| anyhow::anyhow!("missing sd map"))?;
    if let Some((lo, hi)) = sd.min_max() {
        info!("Surface density spans {:.3e} to {:.3e} Msol/pc^2.", lo, hi);
    }

    let out = "projection-surface-density.png";
    render_map_to_png(sd, &RenderConfig::default().with_upscale(2), out)?;

    Ok(())
}
