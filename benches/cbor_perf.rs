use std::hint::black_box;

use cbor_codec::number::DecimalFraction;
use cbor_codec::{EncodeOptions, Value, from_slice, to_vec, to_vec_with};
use codspeed_criterion_compat::{Criterion, criterion_group, criterion_main};
use num_bigint::BigInt;

/// A manifest-like document: a map of records mixing text, bytes and numbers.
fn sample_document(records: usize) -> Value {
    let root = Value::new_map();
    let list = Value::new_array();
    for i in 0..records {
        let record = Value::new_map();
        record.add("id", i as i64).unwrap();
        record.add("name", format!("record-{i}")).unwrap();
        record.add("hash", vec![i as u8; 32]).unwrap();
        record.add("price", DecimalFraction::new(i as i64 * 1999, -2)).unwrap();
        record.add("ratio", i as f64 / 7.0).unwrap();
        record
            .add("big", BigInt::from(u64::MAX) * (i as u64 + 2))
            .unwrap();
        let flags = Value::array(vec![true.into(), Value::Null]);
        record.add("flags", Value::tagged(1000, flags)).unwrap();
        list.push(record).unwrap();
    }
    root.add("records", list).unwrap();
    root.add("version", 3).unwrap();
    root
}

fn bench_encode(c: &mut Criterion) {
    let small = sample_document(10);
    let large = sample_document(1000);
    let sorted = EncodeOptions {
        sort_map_keys: true,
        ..Default::default()
    };

    let mut group = c.benchmark_group("encode");
    group.bench_function("records_10", |b| b.iter(|| to_vec(black_box(&small)).unwrap()));
    group.bench_function("records_1000", |b| b.iter(|| to_vec(black_box(&large)).unwrap()));
    group.bench_function("records_1000_sorted", |b| {
        b.iter(|| to_vec_with(black_box(&large), sorted).unwrap())
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let small = to_vec(&sample_document(10)).unwrap();
    let large = to_vec(&sample_document(1000)).unwrap();

    let mut group = c.benchmark_group("decode");
    group.bench_function("records_10", |b| b.iter(|| from_slice(black_box(&small)).unwrap()));
    group.bench_function("records_1000", |b| b.iter(|| from_slice(black_box(&large)).unwrap()));
    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let a = sample_document(100);
    let b = from_slice(&to_vec(&a).unwrap()).unwrap();

    c.bench_function("total_cmp_records_100", |bench| {
        bench.iter(|| black_box(&a).total_cmp(black_box(&b)))
    });
}

criterion_group!(cbor_perf, bench_encode, bench_decode, bench_compare);
criterion_main!(cbor_perf);
