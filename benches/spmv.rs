use criterion::{black_box, criterion_group, criterion_main, Criterion};
use blocksparse::{Executor, SerialExec, SparseMatrix};

/// 5-point Laplacian on an `m × m` grid, general and lower-symmetric storage.
fn laplacian(m: usize) -> (SparseMatrix<f64>, SparseMatrix<f64>) {
    let n = m * m;
    let mut general = SparseMatrix::with_uniform_capacity(n, 5);
    let mut lower = SparseMatrix::symmetric_with_uniform_capacity(n, 3);
    for i in 0..n {
        let (r, c) = (i / m, i % m);
        *general.entry_mut(i, i).unwrap() = 4.0;
        *lower.entry_mut(i, i).unwrap() = 4.0;
        let mut neighbours = Vec::new();
        if r > 0 { neighbours.push(i - m); }
        if c > 0 { neighbours.push(i - 1); }
        if c + 1 < m { neighbours.push(i + 1); }
        if r + 1 < m { neighbours.push(i + m); }
        for j in neighbours {
            *general.entry_mut(i, j).unwrap() = -1.0;
            if j < i {
                *lower.entry_mut(i, j).unwrap() = -1.0;
            }
        }
    }
    general.finish_structure();
    lower.finish_structure();
    (general, lower)
}

fn bench_spmv(c: &mut Criterion) {
    let (general, lower) = laplacian(300);
    let n = general.height();
    let x: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
    let mut y = vec![0.0; n];
    let parallel = Executor::default();

    c.bench_function("general mult_add serial", |b| {
        b.iter(|| general.mult_add_with(&SerialExec, 1.0, black_box(&x), black_box(&mut y)))
    });
    c.bench_function("general mult_add default", |b| {
        b.iter(|| general.mult_add_with(&parallel, 1.0, black_box(&x), black_box(&mut y)))
    });
    c.bench_function("symmetric mult_add serial", |b| {
        b.iter(|| lower.mult_add_with(&SerialExec, 1.0, black_box(&x), black_box(&mut y)))
    });
    c.bench_function("symmetric mult_add default", |b| {
        b.iter(|| lower.mult_add_with(&parallel, 1.0, black_box(&x), black_box(&mut y)))
    });
}

criterion_group!(benches, bench_spmv);
criterion_main!(benches);
