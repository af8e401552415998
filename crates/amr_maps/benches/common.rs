#![allow(dead_code)]

use std::time::Duration;

use amr_maps::prelude::{refined_table, CellTable, RefinedTableConfig};
use criterion::{Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(3);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Refined disk table shared by the benches.
pub fn disk_table(lmin: u8, lmax: u8, seed: u64) -> CellTable {
    let mut rng = StdRng::seed_from_u64(seed);
    refined_table(&RefinedTableConfig::new(lmin, lmax), &mut rng).expect("valid bench table")
}
