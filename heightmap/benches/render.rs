use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion,
};
use heightmap::{
    region::Region,
    render::{render, CancelToken, HeightmapRenderConfig, ThreadPool},
    tree::Tree,
    vm::VmEval,
};

/// Several overlapping spheres, so that branch disabling has some effect
fn blobs() -> Tree {
    let (x, y, z) = Tree::axes();
    let mut out: Option<Tree> = None;
    for i in 0..6 {
        let a = i as f64 * std::f64::consts::PI / 3.0;
        let (cx, cy) = (a.cos() * 0.5, a.sin() * 0.5);
        let s = ((x.clone() - cx).square()
            + (y.clone() - cy).square()
            + z.square())
        .sqrt()
            - 0.3;
        out = Some(match out {
            Some(t) => t.min(s),
            None => s,
        });
    }
    out.unwrap()
}

pub fn blobs_size_sweep(c: &mut Criterion) {
    let eval = VmEval::new(&blobs());

    let mut group = c.benchmark_group("speed vs region size (blobs)");
    for size in [64, 128, 256] {
        let region =
            Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 1.0], [size; 3])
                .unwrap();
        group.bench_function(BenchmarkId::new("vm", size), |b| {
            b.iter(|| {
                let mut eval = eval.clone();
                black_box(render(&mut eval, region, &CancelToken::new(), false))
            })
        });
    }
}

pub fn blobs_thread_sweep(c: &mut Criterion) {
    let eval = VmEval::new(&blobs());
    let region =
        Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 1.0], [256; 3]).unwrap();

    let mut group = c.benchmark_group("speed vs threads (blobs) (256^3)");
    for threads in [1, 2, 4, 8] {
        let pool = ThreadPool::Custom(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        );
        let cfg = HeightmapRenderConfig {
            threads: Some(&pool),
            tile_size: 32,
            ..HeightmapRenderConfig::new(region)
        };
        group.bench_function(BenchmarkId::new("vm", threads), |b| {
            b.iter(|| black_box(cfg.run(&eval).unwrap()))
        });
    }
}

criterion_group!(benches, blobs_size_sweep, blobs_thread_sweep);
criterion_main!(benches);
