use cfarray::{
    array::{InMemoryArray, LazyArray, MaskedArray},
    array_index::{extract, normalise, AxisExpr, IndexExpr, SliceExpr},
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn array_index_slice(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_index_slice");
    for size in [64u64, 128u64, 256u64].iter() {
        let num_elements: u64 = size * size * size;
        group.throughput(Throughput::Bytes(num_elements * 4));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let elements: Vec<f32> = (0..num_elements).map(|i| i as f32).collect();
            let array = InMemoryArray::new(
                MaskedArray::from_elements(vec![size; 3], &elements).unwrap(),
            );
            let index = IndexExpr::axes([
                AxisExpr::full(),
                AxisExpr::Slice(SliceExpr::new(None, None, Some(2))),
                AxisExpr::Slice(SliceExpr::new(None, None, Some(-1))),
            ]);
            b.iter(|| array.read(&index).unwrap());
        });
    }
    group.finish();
}

fn array_index_positions(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_index_positions");
    for size in [64u64, 128u64, 256u64].iter() {
        let num_elements: u64 = size * size * size;
        group.throughput(Throughput::Bytes(num_elements / 8));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let elements: Vec<f32> = (0..num_elements).map(|i| i as f32).collect();
            let array = MaskedArray::from_elements(vec![size; 3], &elements).unwrap();
            let positions: Vec<i64> = (0..size as i64).rev().step_by(2).collect();
            let index = normalise(
                array.shape(),
                &IndexExpr::axes([
                    AxisExpr::from(positions.clone()),
                    AxisExpr::from(positions.clone()),
                    AxisExpr::from(positions),
                ]),
            )
            .unwrap();
            b.iter(|| extract(&array, &index, false).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, array_index_slice, array_index_positions);
criterion_main!(benches);
