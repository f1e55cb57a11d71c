use crate::{
    eval::Evaluator,
    region::Region,
    render::{DepthImage, NormalImage},
    Error,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Thread pool to use for multithreaded rendering
///
/// Most users will use the global Rayon pool, but it's possible to provide your
/// own as well.
pub enum ThreadPool {
    /// User-provided pool
    Custom(rayon::ThreadPool),
    /// Global Rayon pool
    Global,
}

impl ThreadPool {
    /// Runs a function across the thread pool
    pub fn run<F: FnOnce() -> V + Send, V: Send>(&self, f: F) -> V {
        match self {
            ThreadPool::Custom(p) => p.install(f),
            ThreadPool::Global => f(),
        }
    }

    /// Returns the number of threads in the pool
    pub fn thread_count(&self) -> usize {
        match self {
            ThreadPool::Custom(p) => p.current_num_threads(),
            ThreadPool::Global => rayon::current_num_threads(),
        }
    }
}

/// Token to cancel an in-progress render
///
/// Clones share the same flag, so a token may be cancelled from another
/// thread while a render is running.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Builds a new token, which is initialized as "not cancelled"
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this token as cancelled
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Checks whether the token is cancelled
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings for heightmap rendering
///
/// ```
/// use heightmap::{
///     region::Region,
///     render::{HeightmapRenderConfig, ThreadPool},
///     tree::Tree,
///     vm::VmEval,
/// };
///
/// let (x, y, z) = Tree::axes();
/// let sphere = (x.square() + y.square() + z.square()).sqrt() - 0.5;
/// let eval = VmEval::new(&sphere);
///
/// let region = Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 1.0], [32; 3])?;
/// let cfg = HeightmapRenderConfig {
///     threads: Some(&ThreadPool::Global),
///     ..HeightmapRenderConfig::new(region)
/// };
/// let (depth, _normal) = cfg.run(&eval)?;
/// assert!(depth[(16, 16)] > 0.4);
/// assert_eq!(depth[(0, 0)], f64::NEG_INFINITY);
/// # Ok::<(), heightmap::Error>(())
/// ```
pub struct HeightmapRenderConfig<'a> {
    /// Voxel region to render
    pub region: Region,

    /// Assign [`CLIP_NORMAL`](crate::render::CLIP_NORMAL) to pixels at the
    /// front plane of the region
    pub clip: bool,

    /// Token to cancel rendering
    pub cancel: CancelToken,

    /// Skip subregions which are hidden behind already-rendered pixels
    ///
    /// This never changes the output; it's only exposed for testing and
    /// benchmarking.
    pub cull: bool,

    /// Thread pool to use for rendering
    ///
    /// If this is `None`, then rendering is done in a single thread; otherwise,
    /// the region is cut into tiles which are rendered on the provided pool.
    pub threads: Option<&'a ThreadPool>,

    /// Tile size (in pixels) for multithreaded rendering
    pub tile_size: usize,
}

impl HeightmapRenderConfig<'_> {
    /// Builds a single-threaded configuration for the given region
    pub fn new(region: Region) -> Self {
        Self {
            region,
            clip: false,
            cancel: CancelToken::new(),
            cull: true,
            threads: None,
            tile_size: 64,
        }
    }

    /// Renders a shape using this configuration
    ///
    /// If the render is cancelled, the partially-rendered images are
    /// returned.
    pub fn run<E: Evaluator + Clone + Send + Sync>(
        &self,
        eval: &E,
    ) -> Result<(DepthImage, NormalImage), Error> {
        if self.tile_size == 0 {
            return Err(Error::BadTileSize(self.tile_size));
        }
        Ok(match self.threads {
            None => {
                let mut eval = eval.clone();
                super::heightmap::render_single(&mut eval, self)
            }
            Some(pool) => super::heightmap::render_tiles(eval, self, pool),
        })
    }
}
