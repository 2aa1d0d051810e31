use criterion::{criterion_group, criterion_main, Criterion};
use gsw_grid::{Axis, ParameterGrid};

fn make_grid() -> ParameterGrid {
    ParameterGrid::grid(&[
        Axis::new("n", vec![50.0, 100.0, 200.0, 300.0]),
        Axis::new("b", vec![0.5, 0.7, 1.0, 1.5]),
        Axis::new("g", vec![0.5, 0.7, 1.0, 1.5]),
        Axis::new("c", vec![0.5, 0.7, 1.0, 1.3]),
    ])
    .expect("grid")
}

fn bench_enumeration(c: &mut Criterion) {
    let grid = make_grid();
    c.bench_function("grid_validate_identifiers", |b| {
        b.iter(|| {
            let ids = grid.validate_identifiers().expect("ids");
            assert_eq!(ids.len(), 256);
        });
    });
}

criterion_group!(benches, bench_enumeration);
criterion_main!(benches);
