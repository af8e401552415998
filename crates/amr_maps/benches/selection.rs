mod common;

use std::hint::black_box;

use amr_maps::prelude::{select, select_mask, Axis, CenterSpec, GeometrySpec, Region};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn selection_shape_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/shape");
    let table = common::disk_table(5, 7, 0xDEADBEEF);
    group.throughput(common::elements_throughput(table.len()));

    let center = CenterSpec::box_center();
    let shapes = [
        (
            "box",
            GeometrySpec::boxed(
                Some([-0.2, 0.2]),
                Some([-0.2, 0.2]),
                Some([-0.05, 0.05]),
                center.clone(),
            ),
        ),
        ("sphere", GeometrySpec::sphere(0.2, center.clone())),
        (
            "cylinder",
            GeometrySpec::cylinder(0.2, 0.05, Axis::Z, center.clone()),
        ),
        (
            "spherical_shell",
            GeometrySpec::spherical_shell(0.1, 0.2, center.clone()),
        ),
    ];

    for (name, geometry) in shapes {
        let region = Region::new(geometry);
        group.bench_with_input(BenchmarkId::new("mask", name), &region, |b, region| {
            b.iter(|| black_box(select_mask(&table, region).expect("mask")));
        });
        group.bench_with_input(BenchmarkId::new("subset", name), &region, |b, region| {
            b.iter(|| black_box(select(&table, region).expect("select")));
        });
    }

    group.finish();
}

fn selection_chain_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/chain");
    let table = common::disk_table(5, 7, 0x12345678);
    group.throughput(common::elements_throughput(table.len()));

    let center = CenterSpec::box_center();
    let sphere = Region::new(GeometrySpec::sphere(0.3, center.clone()));
    let hole = Region::new(GeometrySpec::cylinder(0.05, 0.5, Axis::Z, center)).inverted();

    group.bench_function("sphere_minus_cylinder", |b| {
        b.iter(|| {
            let outer = select(&table, &sphere).expect("select");
            black_box(select(&outer, &hole).expect("select"))
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = selection_shape_benches,
              selection_chain_benches
}
criterion_main!(benches);
