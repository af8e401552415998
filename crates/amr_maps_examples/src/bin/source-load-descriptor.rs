use amr_maps::prelude::*;
use amr_maps_examples::{galaxy_table, init_tracing};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let source = MemorySource::new(galaxy_table(4, 9, 11)?);
    let (lmin, lmax) = source.table().level_range();
    info!("Source holds {} cells, levels {}..={}.", source.table().len(), lmin, lmax);

    // Central 20 kpc cube, density and velocities only, capped at level 7, with a density floor.
    let descriptor = LoadDescriptor::new()
        .with_fields(["rho", "vx", "vy", "vz"])
        .with_range_unit("kpc")
        .with_range(Axis::X, 40.0, 60.0)
        .with_range(Axis::Y, 40.0, 60.0)
        .with_range(Axis::Z, 40.0, 60.0)
        .with_floor("rho", 1.0e-4)
        .with_max_level(7);

    let cells = source.load_cells(&descriptor)?;
    let (lmin, lmax) = cells.level_range();
    info!(
        "Loaded {} cells, levels {}..={}, columns {:?}.",
        cells.len(),
        lmin,
        lmax,
        cells.column_names()
    );

    let msol = cells.scale().get("Msol")?;
    info!("Loaded mass: {:.3e} Msol", total_mass(&cells)? * msol);

    let res = project(&cells, &ProjectionRequest::new(["rho"]).with_level(lmax))?;
    let (w, h) = res.size();
    info!("Projected rho onto {}x{} pixels from {} cells.", w, h, res.cells_used);

    Ok(())
}
