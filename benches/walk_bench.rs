//! Benchmark the walk engine over a generated tree.

use criterion::{criterion_group, criterion_main, Criterion};
use pathwalk::Walk;
use std::fs;

fn build_tree(dirs: usize, files_per_dir: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();

    for d in 0..dirs {
        let sub = dir.path().join(format!("dir-{d}"));
        fs::create_dir(&sub).unwrap();
        for f in 0..files_per_dir {
            fs::write(sub.join(format!("file-{f}")), b"").unwrap();
        }
    }

    dir
}

fn bench_walk(c: &mut Criterion) {
    let tree = build_tree(20, 50);

    c.bench_function("walk_1000_files", |b| {
        b.iter(|| {
            let walk = Walk::new(tree.path(), |_, _| Ok(()));
            walk.run().unwrap();
        })
    });

    let flat = build_tree(1, 2000);

    c.bench_function("walk_flat_2000_files", |b| {
        b.iter(|| {
            let walk = Walk::new(flat.path(), |_, _| Ok(()));
            walk.run().unwrap();
        })
    });
}

criterion_group!(benches, bench_walk);
criterion_main!(benches);
