use amr_maps::prelude::{refined_table, CellTable, RefinedTableConfig, Scale};
use rand::rngs::StdRng;
use rand::SeedableRng;

const CM_PER_KPC: f64 = 3.085_677_581_491_367e21;
const PROTON_MASS_G: f64 = 1.672_621_92e-24;

/// Units of a 100 kpc box with densities in protons per cm^3 and velocities in 100 km/s.
pub fn galaxy_scale() -> Scale {
    let unit_l = 100.0 * CM_PER_KPC;
    let unit_v = 1.0e7;
    Scale::from_code_units(unit_l, PROTON_MASS_G, unit_l / unit_v)
}

/// Refined rotating disk in a 100 kpc box.
pub fn galaxy_table(lmin: u8, lmax: u8, seed: u64) -> anyhow::Result<CellTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = RefinedTableConfig::new(lmin, lmax).with_scale(galaxy_scale());
    Ok(refined_table(&config, &mut rng)?)
}
