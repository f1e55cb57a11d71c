//! Integration tests for heightmap rendering with the VM evaluator
use heightmap::{
    eval::{Evaluator, ResultBuffer},
    region::Region,
    render::{
        render, unpack_normal, CancelToken, DepthImage, HeightmapRenderConfig,
        NormalImage, ThreadPool, CLIP_NORMAL,
    },
    tree::Tree,
    types::Interval,
    vm::VmEval,
};

/// Evaluator wrapper which counts calls, and can optionally cancel a render
/// or ignore `push` / `pop`
#[derive(Clone)]
struct Instrumented {
    inner: VmEval,
    intervals: usize,
    values: usize,
    grads: usize,
    pushes: usize,
    pops: usize,

    /// Cancels the token after the given number of interval evaluations
    cancel_after: Option<(CancelToken, usize)>,

    /// Makes `push` and `pop` into no-ops
    no_push: bool,
}

impl Instrumented {
    fn new(t: &Tree) -> Self {
        Self {
            inner: VmEval::new(t),
            intervals: 0,
            values: 0,
            grads: 0,
            pushes: 0,
            pops: 0,
            cancel_after: None,
            no_push: false,
        }
    }
}

impl Evaluator for Instrumented {
    fn interval(&mut self, x: Interval, y: Interval, z: Interval) -> Interval {
        self.intervals += 1;
        if let Some((cancel, n)) = &self.cancel_after {
            if self.intervals >= *n {
                cancel.cancel();
            }
        }
        self.inner.interval(x, y, z)
    }
    fn set_point(&mut self, x: f32, y: f32, z: f32, index: usize) {
        self.inner.set_point(x, y, z, index)
    }
    fn eval_values(&mut self, count: usize) -> &ResultBuffer {
        self.values += 1;
        self.inner.eval_values(count)
    }
    fn eval_grads(&mut self, count: usize) -> &ResultBuffer {
        self.grads += 1;
        self.inner.eval_grads(count)
    }
    fn push(&mut self) {
        self.pushes += 1;
        if !self.no_push {
            self.inner.push()
        }
    }
    fn pop(&mut self) {
        self.pops += 1;
        if !self.no_push {
            self.inner.pop()
        }
    }
}

fn sphere(r: f64) -> Tree {
    let (x, y, z) = Tree::axes();
    (x.square() + y.square() + z.square()).sqrt() - r
}

/// Union of two spheres, so that branch disabling has something to do
fn blobs() -> Tree {
    let (x, y, z) = Tree::axes();
    let a = ((x.clone() + 0.4).square() + y.square() + z.square()).sqrt() - 0.5;
    let b = ((x - 0.4).square() + (y - 0.1).square() + z.square())
        .sqrt()
        - 0.45;
    a.min(b)
}

fn cube(n: usize) -> Region {
    Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 1.0], [n; 3]).unwrap()
}

fn render_vm(t: &Tree, region: Region, clip: bool) -> (DepthImage, NormalImage) {
    render(&mut VmEval::new(t), region, &CancelToken::new(), clip)
}

/// Checks that every pixel of `partial` is either untouched or matches `full`
fn assert_prefix(
    partial: &(DepthImage, NormalImage),
    full: &(DepthImage, NormalImage),
) {
    let (pd, pn) = partial;
    let (fd, fn_) = full;
    for row in 0..fd.height() {
        for col in 0..fd.width() {
            let p = (row, col);
            assert!(
                pd[p] == f64::NEG_INFINITY || pd[p] == fd[p],
                "depth mismatch at {p:?}: {} vs {}",
                pd[p],
                fd[p]
            );
            assert!(
                pn[p] == 0 || pn[p] == fn_[p],
                "normal mismatch at {p:?}: {:x} vs {:x}",
                pn[p],
                fn_[p]
            );
        }
    }
}

#[test]
fn fully_outside() {
    let (depth, normal) = render_vm(&Tree::constant(1.0), cube(16), false);
    assert_eq!((depth.width(), depth.height()), (16, 16));
    assert!(depth.iter().all(|d| *d == f64::NEG_INFINITY));
    assert!(normal.iter().all(|n| *n == 0));
}

#[test]
fn fully_inside() {
    let region = cube(16);
    let (depth, normal) = render_vm(&Tree::constant(-1.0), region, false);
    assert!(depth.iter().all(|d| *d == region.front()));
    assert!(normal.iter().all(|n| *n == 0));

    let (depth, normal) = render_vm(&Tree::constant(-1.0), region, true);
    assert!(depth.iter().all(|d| *d == region.front()));
    assert!(normal.iter().all(|n| *n == CLIP_NORMAL));
}

#[test]
fn small_sphere() {
    let region =
        Region::new([-1.6, 1.6], [-1.6, 1.6], [-1.6, 1.6], [4; 3]).unwrap();
    let (depth, normal) = render_vm(&sphere(1.0), region, false);
    for row in 0..4 {
        for col in 0..4 {
            let p = (row, col);
            if (1..=2).contains(&row) && (1..=2).contains(&col) {
                assert_eq!(depth[p], region.z.pos(2), "bad depth at {p:?}");
                assert_ne!(normal[p], 0, "missing normal at {p:?}");
            } else {
                assert_eq!(depth[p], f64::NEG_INFINITY, "bad depth at {p:?}");
                assert_eq!(normal[p], 0, "unexpected normal at {p:?}");
            }
        }
    }

    // The normal at (x, y, z) = (-0.4, -0.4, 0.4) points away from the center
    let n = unpack_normal(normal[(1, 1)]);
    assert!(n.x < 0.0 && n.y < 0.0 && n.z > 0.0, "bad normal {n}");
    let n = unpack_normal(normal[(2, 2)]);
    assert!(n.x > 0.0 && n.y > 0.0 && n.z > 0.0, "bad normal {n}");
}

#[test]
fn brute_force() {
    // No voxel center is within 2e-4 of this sphere's surface, so the result
    // is exact
    let r = 0.7;
    let region = cube(32);
    let (depth, normal) = render_vm(&sphere(r), region, false);

    for row in 0..32 {
        let y = region.y.pos(row);
        for col in 0..32 {
            let x = region.x.pos(col);
            let expected = (0..32)
                .rev()
                .map(|k| region.z.pos(k))
                .find(|z| x * x + y * y + z * z < r * r)
                .unwrap_or(f64::NEG_INFINITY);
            let p = (row, col);
            assert_eq!(depth[p], expected, "bad depth at {p:?}");

            if normal[p] != 0 {
                let n = unpack_normal(normal[p]);
                let len = (x * x + y * y + expected * expected).sqrt();
                for (a, b) in [(n.x, x), (n.y, y), (n.z, expected)] {
                    let err = (a as f64 - b / len).abs();
                    assert!(err < 0.02, "bad normal at {p:?}: {n}");
                }
            }
        }
    }
    assert!(normal.iter().any(|n| *n != 0));
}

#[test]
fn nan_intervals() {
    // The root interval of this shape is NaN (from the square root of a
    // negative range), so it must be subdivided rather than skipped.  No voxel
    // center lies on the surface `r^2 = 0.75`.
    let (x, y, z) = Tree::axes();
    let r2 = x.square() + y.square() + z.square();
    let shape = Tree::constant(0.5) - (Tree::constant(1.0) - r2).sqrt();
    let region = cube(32);
    let (depth, normal) = render_vm(&shape, region, false);

    let mut count = 0;
    for row in 0..32 {
        let y = region.y.pos(row);
        for col in 0..32 {
            let x = region.x.pos(col);
            let expected = (0..32)
                .rev()
                .map(|k| region.z.pos(k))
                .find(|z| x * x + y * y + z * z < 0.75)
                .unwrap_or(f64::NEG_INFINITY);
            let p = (row, col);
            assert_eq!(depth[p], expected, "bad depth at {p:?}");
            if expected != f64::NEG_INFINITY {
                count += 1;
            }
            if normal[p] != 0 {
                let n = unpack_normal(normal[p]);
                assert!(n.z > 0.0, "bad normal at {p:?}: {n}");
            }
        }
    }
    assert!(count > 0);
    assert!(normal.iter().any(|n| *n != 0));
}

#[test]
fn tiny_gradients() {
    // Gradients of this shape are around 1e-30, which underflow when squared
    // in `f32`; normals should match the unscaled shape.
    let (x, y, z) = Tree::axes();
    let r2 = x.square() + y.square() + z.square();
    let scaled = (r2.clone() - 0.5) * 1e-30;
    let region = cube(16);
    let (depth, normal) = render_vm(&scaled, region, false);
    let (depth_ref, normal_ref) = render_vm(&(r2 - 0.5), region, false);

    assert!(depth == depth_ref);
    assert!(normal.iter().all(|n| *n != 0xffffffff));
    for row in 0..16 {
        for col in 0..16 {
            let p = (row, col);
            let a = unpack_normal(normal[p]);
            let b = unpack_normal(normal_ref[p]);
            assert!((a - b).norm() < 0.02, "bad normal at {p:?}: {a} vs {b}");
        }
    }
}

#[test]
fn idempotent() {
    let region = cube(48);
    let mut eval = VmEval::new(&blobs());
    let cancel = CancelToken::new();
    let a = render(&mut eval, region, &cancel, true);
    let b = render(&mut eval, region, &cancel, true);
    assert!(a == b);
}

#[test]
fn split_ordering() {
    // The near half is filled in a single interval evaluation, which hides
    // the far half completely
    let region =
        Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 1.0], [8, 8, 64]).unwrap();
    let z = Tree::z();
    let mut eval = Instrumented::new(&-(z + 0.5));
    let (depth, normal) = render(&mut eval, region, &CancelToken::new(), false);

    assert_eq!(eval.intervals, 2);
    assert_eq!(eval.values, 0);
    assert_eq!(eval.grads, 0);
    assert_eq!(eval.pushes, 1);
    assert_eq!(eval.pops, 1);
    assert!(depth.iter().all(|d| *d == region.front()));
    assert!(normal.iter().all(|n| *n == 0));
}

#[test]
fn cancel_prefix() {
    let region = cube(64);
    let full = render_vm(&blobs(), region, false);
    assert!(full.0.iter().any(|d| *d != f64::NEG_INFINITY));

    let mut prev: Option<DepthImage> = None;
    for n in [1, 2, 5, 10, 20, 40] {
        let cancel = CancelToken::new();
        let mut eval = Instrumented::new(&blobs());
        eval.cancel_after = Some((cancel.clone(), n));
        let partial = render(&mut eval, region, &cancel, false);
        assert!(cancel.is_cancelled());
        assert_eq!(eval.pushes, eval.pops);
        assert_prefix(&partial, &full);

        // Depth only increases as the render progresses
        if let Some(prev) = &prev {
            for (a, b) in prev.iter().zip(partial.0.iter()) {
                assert!(a <= b);
            }
        }
        prev = Some(partial.0.clone());

        if n == 1 {
            // Cancelled right after the first interval evaluation
            assert!(partial.0.iter().all(|d| *d == f64::NEG_INFINITY));
        }
    }
}

#[test]
fn cancel_before_start() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut eval = Instrumented::new(&sphere(0.5));
    let (depth, normal) = render(&mut eval, cube(32), &cancel, false);
    assert_eq!(eval.intervals, 0);
    assert!(depth.iter().all(|d| *d == f64::NEG_INFINITY));
    assert!(normal.iter().all(|n| *n == 0));
}

#[test]
fn culling() {
    let region = cube(64);
    let eval = VmEval::new(&blobs());
    let run = |cull| {
        let cfg = HeightmapRenderConfig {
            cull,
            clip: true,
            ..HeightmapRenderConfig::new(region)
        };
        cfg.run(&eval).unwrap()
    };
    let with_cull = run(true);
    let without_cull = run(false);
    assert!(with_cull == without_cull);

    // The default configuration matches the plain render function
    let plain = render(&mut eval.clone(), region, &CancelToken::new(), true);
    assert!(plain == with_cull);
}

#[test]
fn push_pop_is_transparent() {
    let region = cube(64);
    let mut pushed = Instrumented::new(&blobs());
    let a = render(&mut pushed, region, &CancelToken::new(), false);
    assert!(pushed.pushes > 0);
    assert_eq!(pushed.pushes, pushed.pops);

    let mut flat = Instrumented::new(&blobs());
    flat.no_push = true;
    let b = render(&mut flat, region, &CancelToken::new(), false);
    assert_eq!(flat.pushes, pushed.pushes);
    assert!(a == b);
}

#[test]
fn threaded_depth() {
    let region =
        Region::new([-1.0, 1.0], [-0.6, 0.6], [-1.0, 1.0], [80, 48, 64])
            .unwrap();
    let eval = VmEval::new(&blobs());
    let (single, _) = HeightmapRenderConfig::new(region).run(&eval).unwrap();

    let pool = ThreadPool::Custom(
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap(),
    );
    for threads in [&pool, &ThreadPool::Global] {
        for tile_size in [7, 16, 64, 1000] {
            let cfg = HeightmapRenderConfig {
                threads: Some(threads),
                tile_size,
                ..HeightmapRenderConfig::new(region)
            };
            let (depth, normal) = cfg.run(&eval).unwrap();
            assert!(depth == single, "depth mismatch with tile {tile_size}");
            for (d, n) in depth.iter().zip(normal.iter()) {
                if *d == f64::NEG_INFINITY {
                    assert_eq!(*n, 0);
                }
            }
        }
    }
}

#[test]
fn threaded_cancel() {
    let region = cube(64);
    let eval = VmEval::new(&blobs());
    let cfg = HeightmapRenderConfig {
        threads: Some(&ThreadPool::Global),
        tile_size: 16,
        ..HeightmapRenderConfig::new(region)
    };
    cfg.cancel.cancel();
    let (depth, _) = cfg.run(&eval).unwrap();
    assert!(depth.iter().all(|d| *d == f64::NEG_INFINITY));
}

#[test]
fn clip_front() {
    // The sphere pokes through the front of the region
    let region =
        Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 0.25], [32; 3]).unwrap();
    let (d0, n0) = render_vm(&sphere(0.8), region, false);
    let (d1, n1) = render_vm(&sphere(0.8), region, true);
    assert!(d0 == d1);

    let mut clipped = 0;
    for row in 0..32 {
        for col in 0..32 {
            let p = (row, col);
            if d1[p] == region.front() {
                assert_eq!(n1[p], CLIP_NORMAL);
                clipped += 1;
            } else {
                assert_eq!(n1[p], n0[p]);
            }
        }
    }
    assert!(clipped > 0);
}

#[test]
fn dyn_evaluator() {
    let region = cube(32);
    let mut eval = VmEval::new(&sphere(0.5));
    let a = render(
        &mut eval as &mut dyn Evaluator,
        region,
        &CancelToken::new(),
        false,
    );
    let b = render_vm(&sphere(0.5), region, false);
    assert!(a == b);
}

#[cfg(feature = "oracle")]
#[test]
fn bezier_tube() {
    use heightmap::oracle::BezierOracle;
    use nalgebra::Vector3;

    let curve = BezierOracle::new(
        Vector3::new(-0.75, -0.5, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.75, -0.5, 0.0),
    );
    let tube = Tree::oracle(curve) - 0.1;
    let region = cube(64);
    let (depth, normal) = render_vm(&tube, region, false);

    // The apex of the curve is at (0, 0.25, 0); the pixel next to it is at
    // (0.015625, 0.265625)
    let p = (40, 32);
    assert!(depth[p] > 0.0 && depth[p] < 0.1, "bad depth {}", depth[p]);
    assert_ne!(normal[p], 0);
    let n = unpack_normal(normal[p]);
    assert!(n.z > 0.5, "bad normal {n}");

    // Far from the curve, nothing is rendered
    assert_eq!(depth[(0, 32)], f64::NEG_INFINITY);
    assert_eq!(depth[(63, 0)], f64::NEG_INFINITY);
}
