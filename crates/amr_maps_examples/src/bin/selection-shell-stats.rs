use amr_maps::prelude::*;
use amr_maps_examples::{galaxy_table, init_tracing};
use glam::DVec3;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let table = galaxy_table(4, 8, 42)?;
    let center = CenterSpec::box_center();
    let ctx = EvalContext::new(center.resolve(table.boxlen(), table.scale(), "center")?);
    let km_s = table.scale().get("km_s")?;

    // Radial profile of the rotation curve in 5 kpc cylindrical shells, 2 kpc thick.
    for i in 0..6 {
        let inner = 5.0 * i as f64;
        let outer = inner + 5.0;
        let shell = Region::new(GeometrySpec::cylindrical_shell(
            inner,
            outer,
            2.0,
            Axis::Z,
            center.clone(),
        ))
        .with_unit("kpc");
        let cells = select(&table, &shell)?;
        if cells.is_empty() {
            info!("{:>4.1}-{:>4.1} kpc: empty", inner, outer);
            continue;
        }

        let vphi = field_stats(&cells, "vphi_cylinder", Weighting::Mass, &ctx)?;
        info!(
            "{:>4.1}-{:>4.1} kpc: {:>6} cells, vphi = {:>6.1} +/- {:>5.1} km/s (median {:>6.1})",
            inner,
            outer,
            vphi.count,
            vphi.mean * km_s,
            vphi.std * km_s,
            vphi.median * km_s,
        );
    }

    // Whole-disk reductions inside 20 kpc.
    let disk = select(
        &table,
        &Region::new(GeometrySpec::sphere(20.0, center.clone())).with_unit("kpc"),
    )?;
    let msol = table.scale().get("Msol")?;
    let kpc = table.scale().get("kpc")?;
    let com: DVec3 = center_of_mass(&disk)? * kpc;
    let bulk: DVec3 = bulk_velocity(&disk, Weighting::Mass)? * km_s;
    info!("Mass inside 20 kpc: {:.3e} Msol", total_mass(&disk)? * msol);
    info!("Center of mass: ({:.2}, {:.2}, {:.2}) kpc", com.x, com.y, com.z);
    info!("Bulk velocity: ({:.2}, {:.2}, {:.2}) km/s", bulk.x, bulk.y, bulk.z);

    // Everything outside the disk plane.
    let halo = select(
        &table,
        &Region::new(GeometrySpec::cylinder(50.0, 2.0, Axis::Z, center))
            .with_unit("kpc")
            .inverted(),
    )?;
    let rho = field_stats(&halo, "rho", Weighting::Volume, &ctx)?;
    info!(
        "Off-plane gas: {} cells, volume-weighted rho mean {:.3e}, skewness {:.2}",
        rho.count, rho.mean, rho.skewness
    );

    Ok(())
}
