use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tomostream::matcher::{assign, locate};
use tomostream::metadata::TiltRecord;
use tomostream::micrographs::MicrographRecord;

/// Tilt records as SerialEM names them, plus micrographs from `sessions`
/// concurrent series so most candidates are decoys.
fn create_session(tilts: usize, sessions: usize) -> (Vec<TiltRecord>, Vec<MicrographRecord>) {
    let records = (0..tilts)
        .map(|i| {
            TiltRecord::new(
                format!("X:\\frames\\TS_00_{:03}_{:.1}.tif", i, i as f64 * 3.0),
                i as u32 + 1,
                i as f64 * 3.0,
            )
        })
        .collect();

    let mut micrographs = Vec::with_capacity(tilts * sessions);
    for s in (0..sessions).rev() {
        for i in (0..tilts).rev() {
            let name = format!("TS_{:02}_{:03}_{:.1}.mrc", s, i, i as f64 * 3.0);
            micrographs.push(MicrographRecord::new(
                name.clone(),
                format!("/data/motioncorr/{}", name),
                1.35,
            ));
        }
    }
    (records, micrographs)
}

/// Benchmark pairing a whole series against a shared micrograph collection
fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign");

    for sessions in [1, 10, 50] {
        let (records, micrographs) = create_session(61, sessions);
        group.throughput(Throughput::Elements(records.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}series", sessions)),
            &(records, micrographs),
            |b, (records, micrographs)| {
                b.iter(|| assign(black_box(records), black_box(micrographs)))
            },
        );
    }

    group.finish();
}

/// Benchmark a single lookup that only succeeds at the substring tier
fn bench_locate_fallback(c: &mut Criterion) {
    let (_, micrographs) = create_session(61, 10);

    c.bench_function("locate_substring", |b| {
        b.iter(|| locate(black_box("00_030_90.0"), black_box(&micrographs)))
    });
}

criterion_group!(benches, bench_assign, bench_locate_fallback);
criterion_main!(benches);
