use std::fmt::Write as _;
use std::hint::black_box;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use steelscan::batch::aggregate_dir;
use tempfile::{TempDir, tempdir};

const FILE_COUNT: usize = 500;
const RECORDS_PER_FILE: usize = 8;

fn write_label_file(dir: &Path, index: usize) {
    let mut body = String::new();
    for record in 0..RECORDS_PER_FILE {
        let class_id = (index + record) % 7;
        let size = 0.02 + (record as f64) * 0.03;
        let confidence = 0.3 + ((index * 31 + record * 7) % 70) as f64 / 100.0;
        let _ = writeln!(body, "{class_id} 0.5 0.5 {size:.3} {size:.3} {confidence:.2}");
    }
    body.push_str("garbage line\n");
    std::fs::write(dir.join(format!("img_{index:05}.txt")), body).expect("write label file");
}

fn setup_labels() -> TempDir {
    let dir = tempdir().expect("tempdir");
    for index in 0..FILE_COUNT {
        write_label_file(dir.path(), index);
    }
    dir
}

fn bench_aggregate_dir(c: &mut Criterion) {
    let dir = setup_labels();
    c.bench_with_input(
        BenchmarkId::new("aggregate_dir", FILE_COUNT * RECORDS_PER_FILE),
        dir.path(),
        |b, path| {
            b.iter(|| {
                let stats = aggregate_dir(black_box(path)).expect("aggregate");
                black_box(stats.summary());
            });
        },
    );
}

criterion_group!(benches, bench_aggregate_dir);
criterion_main!(benches);
