//! Adaptive heightmap rendering
use crate::{
    eval::{Evaluator, Pushed, BATCH_SIZE},
    region::Region,
    render::{
        pack_normal, CancelToken, DepthImage, HeightmapRenderConfig,
        NormalImage, ThreadPool, CLIP_NORMAL,
    },
};
use arrayvec::ArrayVec;
use log::{debug, trace};
use std::ops::Range;

/// Pixels waiting for gradient evaluation, as `(row, col)` positions
type Pending = ArrayVec<(usize, usize), BATCH_SIZE>;

/// Evaluation counters, logged at the end of each render
#[derive(Copy, Clone, Debug, Default)]
struct Stats {
    intervals: usize,
    fills: usize,
    prunes: usize,
    pixel_batches: usize,
    grad_batches: usize,
}

impl std::ops::AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.intervals += rhs.intervals;
        self.fills += rhs.fills;
        self.prunes += rhs.prunes;
        self.pixel_batches += rhs.pixel_batches;
        self.grad_batches += rhs.grad_batches;
    }
}

struct Worker<'a> {
    cancel: &'a CancelToken,
    cull: bool,

    /// Image position of the root region, as `(row, col)`
    origin: (usize, usize),

    /// Output images, covering the root region
    depth: DepthImage,
    normal: NormalImage,

    stats: Stats,
}

impl<'a> Worker<'a> {
    fn new(region: &Region, cancel: &'a CancelToken, cull: bool) -> Self {
        let (w, h) = (region.x.size(), region.y.size());
        Self {
            cancel,
            cull,
            origin: (region.y.min(), region.x.min()),
            depth: DepthImage::filled(w, h, f64::NEG_INFINITY),
            normal: NormalImage::new(w, h),
            stats: Stats::default(),
        }
    }

    /// Returns the block of image rows and columns covered by a region
    fn block(&self, r: &Region) -> (Range<usize>, Range<usize>) {
        let row = r.y.min() - self.origin.0;
        let col = r.x.min() - self.origin.1;
        (row..row + r.y.size(), col..col + r.x.size())
    }

    /// Checks whether every pixel in the region is at or in front of the
    /// region's front plane
    fn is_occluded(&self, r: &Region) -> bool {
        let front = r.front();
        let (rows, cols) = self.block(r);
        rows.into_iter().all(|row| {
            cols.clone().all(|col| self.depth[(row, col)] >= front)
        })
    }

    fn recurse<E: Evaluator + ?Sized>(&mut self, eval: &mut E, r: Region) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.cull && self.is_occluded(&r) {
            self.stats.prunes += 1;
            return;
        }
        if r.voxels() <= BATCH_SIZE {
            self.pixels(eval, &r);
            return;
        }

        let (x, y, z) = r.intervals();
        let i = eval.interval(x, y, z);
        self.stats.intervals += 1;

        // A NaN interval fails both comparisons, so it's treated as ambiguous
        if i.upper() < 0.0 {
            self.fill(&r);
        } else if i.lower() > 0.0 {
            // empty
        } else {
            let mut eval = Pushed::new(eval);
            assert!(r.can_split(), "cannot split region {r:?}");
            let (far, near) = r.split();
            self.recurse(&mut *eval, near);
            self.recurse(&mut *eval, far);
        }
    }

    /// Raises every pixel in the region to its front plane
    fn fill(&mut self, r: &Region) {
        self.stats.fills += 1;
        let front = r.front();
        let (rows, cols) = self.block(r);
        for row in rows {
            for col in cols.clone() {
                let d = &mut self.depth[(row, col)];
                *d = d.max(front);
            }
        }
    }

    /// Evaluates every voxel in a small region
    fn pixels<E: Evaluator + ?Sized>(&mut self, eval: &mut E, r: &Region) {
        let (nx, ny, nz) = (r.x.size(), r.y.size(), r.z.size());

        // Each column is loaded front-to-back, so that the first interior
        // sample in a column is also the nearest
        let mut n = 0;
        for j in 0..ny {
            let y = r.y.pos(j) as f32;
            for i in 0..nx {
                let x = r.x.pos(i) as f32;
                for k in (0..nz).rev() {
                    eval.set_point(x, y, r.z.pos(k) as f32, n);
                    n += 1;
                }
            }
        }
        debug_assert_eq!(n, r.voxels());

        // Gradient points are loaded into the same slots, so we copy values
        // out of the evaluator's buffer first
        let mut values = [0f32; BATCH_SIZE];
        values[..n].copy_from_slice(&eval.eval_values(n).values()[..n]);
        self.stats.pixel_batches += 1;

        let (rows, cols) = self.block(r);
        let mut pending = Pending::new();
        for (c, column) in values[..n].chunks_exact(nz).enumerate() {
            let Some(pos) = column.iter().position(|v| *v < 0.0) else {
                continue;
            };
            let (j, i) = (c / nx, c % nx);
            let z = r.z.pos(nz - 1 - pos);
            let p = (rows.start + j, cols.start + i);
            if self.depth[p] < z {
                self.depth[p] = z;
                eval.set_point(
                    r.x.pos(i) as f32,
                    r.y.pos(j) as f32,
                    z as f32,
                    pending.len(),
                );
                pending.push(p);
                if pending.is_full() {
                    self.flush(eval, &mut pending);
                }
            }
        }
        if !pending.is_empty() {
            self.flush(eval, &mut pending);
        }
    }

    /// Evaluates gradients for every pending pixel, writing their normals
    fn flush<E: Evaluator + ?Sized>(
        &mut self,
        eval: &mut E,
        pending: &mut Pending,
    ) {
        let out = eval.eval_grads(pending.len());
        self.stats.grad_batches += 1;
        for (slot, p) in pending.drain(..).enumerate() {
            let g = out.grad(slot);
            self.normal[p] = pack_normal(g.dx, g.dy, g.dz);
        }
    }
}

/// Assigns [`CLIP_NORMAL`] to every pixel at the front plane
fn clip(depth: &DepthImage, normal: &mut NormalImage, front: f64) {
    for row in 0..depth.height() {
        for col in 0..depth.width() {
            if depth[(row, col)] == front {
                normal[(row, col)] = CLIP_NORMAL;
            }
        }
    }
}

fn log_stats(stats: &Stats, region: &Region) {
    debug!(
        "rendered {}x{}x{} region: {} interval evaluations, {} fills, \
         {} prunes, {} pixel batches, {} gradient batches",
        region.x.size(),
        region.y.size(),
        region.z.size(),
        stats.intervals,
        stats.fills,
        stats.prunes,
        stats.pixel_batches,
        stats.grad_batches,
    );
}

/// Renders a heightmap and normal map of the given region
///
/// Depth pixels are `-inf` where no surface was found; otherwise, they're the
/// Z position of the nearest voxel center which is inside the shape.  Normals
/// are only computed for pixels resolved voxel-by-voxel; pixels which were
/// filled in bulk have a normal of 0 (or [`CLIP_NORMAL`] if `clip` is set and
/// they're at the front of the region).
///
/// If `cancel` is triggered, rendering stops early and the partial images are
/// returned; every pixel in a partial image is either untouched or has its
/// final value.
///
/// ```
/// use heightmap::{
///     region::Region,
///     render::{render, CancelToken},
///     tree::Tree,
///     vm::VmEval,
/// };
///
/// let (x, y, z) = Tree::axes();
/// let sphere = (x.square() + y.square() + z.square()).sqrt() - 1.0;
/// let mut eval = VmEval::new(&sphere);
/// let region = Region::new([-1.6, 1.6], [-1.6, 1.6], [-1.6, 1.6], [4; 3])?;
///
/// let (depth, normal) = render(&mut eval, region, &CancelToken::new(), false);
/// assert_eq!(depth[(1, 1)], region.z.pos(2));
/// assert_eq!(depth[(0, 0)], f64::NEG_INFINITY);
/// assert_ne!(normal[(1, 1)], 0);
/// # Ok::<(), heightmap::Error>(())
/// ```
pub fn render<E: Evaluator + ?Sized>(
    eval: &mut E,
    region: Region,
    cancel: &CancelToken,
    clip: bool,
) -> (DepthImage, NormalImage) {
    let cfg = HeightmapRenderConfig {
        clip,
        cancel: cancel.clone(),
        ..HeightmapRenderConfig::new(region)
    };
    render_single(eval, &cfg)
}

pub(super) fn render_single<E: Evaluator + ?Sized>(
    eval: &mut E,
    cfg: &HeightmapRenderConfig,
) -> (DepthImage, NormalImage) {
    let mut w = Worker::new(&cfg.region, &cfg.cancel, cfg.cull);
    w.recurse(eval, cfg.region);
    log_stats(&w.stats, &cfg.region);

    if cfg.clip {
        clip(&w.depth, &mut w.normal, cfg.region.front());
    }
    (w.depth, w.normal)
}

pub(super) fn render_tiles<E: Evaluator + Clone + Send + Sync>(
    eval: &E,
    cfg: &HeightmapRenderConfig,
    pool: &ThreadPool,
) -> (DepthImage, NormalImage) {
    use rayon::prelude::*;

    let tiles = cfg.region.tiles(cfg.tile_size);
    debug!(
        "rendering {} tiles on {} threads",
        tiles.len(),
        pool.thread_count()
    );
    let out: Vec<_> = pool.run(|| {
        tiles
            .into_par_iter()
            .map_init(
                || eval.clone(),
                |eval, tile| {
                    let mut w = Worker::new(&tile, &cfg.cancel, cfg.cull);
                    w.recurse(eval, tile);
                    trace!(
                        "tile at ({}, {}): {:?}",
                        tile.x.min(),
                        tile.y.min(),
                        w.stats
                    );
                    (tile, w.depth, w.normal, w.stats)
                },
            )
            .collect()
    });

    let r = &cfg.region;
    let (w, h) = (r.x.size(), r.y.size());
    let mut depth = DepthImage::filled(w, h, f64::NEG_INFINITY);
    let mut normal = NormalImage::new(w, h);
    let mut stats = Stats::default();
    for (tile, d, n, s) in &out {
        let row = tile.y.min() - r.y.min();
        let col = tile.x.min() - r.x.min();
        depth.blit(d, row, col);
        normal.blit(n, row, col);
        stats += *s;
    }
    log_stats(&stats, r);

    if cfg.clip {
        clip(&depth, &mut normal, r.front());
    }
    (depth, normal)
}
