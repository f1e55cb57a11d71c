use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;
use nalgebra::Vector3;

use heightmap::{
    oracle::BezierOracle,
    region::Region,
    render::{DepthImage, HeightmapRenderConfig, NormalImage, ThreadPool},
    tree::Tree,
    vm::VmEval,
};

/// Renders a built-in shape as a heightmap and normal map
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Shape to render
    #[clap(value_enum, default_value_t = Shape::Blobs)]
    shape: Shape,

    /// Name of a `.png` file to write with the heightmap
    #[clap(short, long)]
    depth: Option<PathBuf>,

    /// Name of a `.png` file to write with the normal map
    #[clap(long)]
    normal: Option<PathBuf>,

    /// Image size (and number of voxels along the Z axis)
    #[clap(short, long, default_value_t = 256)]
    size: usize,

    /// Half-width of the render region, which is centered on the origin
    #[clap(short, long, default_value_t = 1.0)]
    bound: f64,

    /// Position of the front of the render region (defaults to `bound`)
    #[clap(short, long)]
    front: Option<f64>,

    /// Mark pixels at the front of the region with a fixed normal
    #[clap(long)]
    clip: bool,

    /// Number of threads to use
    #[clap(short, long)]
    threads: Option<NonZeroUsize>,

    /// Tile size for multithreaded rendering
    #[clap(long, default_value_t = 64)]
    tile_size: usize,

    /// Number of times to render (for benchmarking)
    #[clap(short = 'N', default_value_t = 1)]
    n: usize,
}

#[derive(ValueEnum, Copy, Clone)]
enum Shape {
    /// A single sphere of radius 0.8
    Sphere,
    /// The union of several overlapping spheres
    Blobs,
    /// A tube around a quadratic Bezier curve
    Bezier,
}

fn build(shape: Shape) -> Tree {
    let (x, y, z) = Tree::axes();
    let sphere = |cx: f64, cy: f64, cz: f64, r: f64| {
        ((x.clone() - cx).square()
            + (y.clone() - cy).square()
            + (z.clone() - cz).square())
        .sqrt()
            - r
    };
    match shape {
        Shape::Sphere => sphere(0.0, 0.0, 0.0, 0.8),
        Shape::Blobs => sphere(-0.35, -0.2, 0.0, 0.45)
            .min(sphere(0.35, -0.2, 0.1, 0.4))
            .min(sphere(0.0, 0.35, -0.1, 0.5)),
        Shape::Bezier => {
            let curve = BezierOracle::new(
                Vector3::new(-0.7, -0.6, 0.0),
                Vector3::new(0.0, 1.2, 0.3),
                Vector3::new(0.7, -0.6, 0.0),
            );
            Tree::oracle(curve) - 0.15
        }
    }
}

/// Converts a heightmap into grayscale + alpha, with +Y pointing up
fn depth_to_la8(depth: &DepthImage, lower: f64, upper: f64) -> Vec<u8> {
    let mut out = Vec::with_capacity(depth.len() * 2);
    for row in (0..depth.height()).rev() {
        for col in 0..depth.width() {
            let d = depth[(row, col)];
            if d == f64::NEG_INFINITY {
                out.extend([0, 0]);
            } else {
                let v = ((d - lower) / (upper - lower) * 255.0).clamp(0.0, 255.0);
                out.extend([v as u8, 255]);
            }
        }
    }
    out
}

/// Converts a normal map into RGBA, with +Y pointing up
fn normal_to_rgba8(normal: &NormalImage) -> Vec<u8> {
    let mut out = Vec::with_capacity(normal.len() * 4);
    for row in (0..normal.height()).rev() {
        for col in 0..normal.width() {
            out.extend(normal[(row, col)].to_le_bytes());
        }
    }
    out
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();

    let start = Instant::now();
    let eval = VmEval::new(&build(args.shape));
    info!("Built shape in {:?}", start.elapsed());

    let b = args.bound;
    let front = args.front.unwrap_or(b);
    let region = Region::new(
        [-b, b],
        [-b, b],
        [-b, front],
        [args.size, args.size, args.size],
    )
    .context("invalid render region")?;

    let pool = match args.threads {
        Some(n) if n.get() == 1 => None,
        Some(n) => Some(ThreadPool::Custom(
            rayon::ThreadPoolBuilder::new()
                .num_threads(n.get())
                .build()
                .context("could not build thread pool")?,
        )),
        None => Some(ThreadPool::Global),
    };
    let cfg = HeightmapRenderConfig {
        clip: args.clip,
        threads: pool.as_ref(),
        tile_size: args.tile_size,
        ..HeightmapRenderConfig::new(region)
    };

    let start = Instant::now();
    let mut out = cfg.run(&eval)?;
    for _ in 1..args.n {
        out = cfg.run(&eval)?;
    }
    info!(
        "Rendered {}x at {:?} ms/frame",
        args.n,
        start.elapsed().as_micros() as f64 / 1000.0 / (args.n.max(1) as f64)
    );
    let (depth, normal) = out;

    let (w, h) = (depth.width() as u32, depth.height() as u32);
    if let Some(path) = args.depth {
        let buffer = depth_to_la8(&depth, -b, front);
        image::save_buffer(&path, &buffer, w, h, image::ColorType::La8)
            .with_context(|| format!("could not save {path:?}"))?;
        info!("Saved heightmap to {path:?}");
    }
    if let Some(path) = args.normal {
        let buffer = normal_to_rgba8(&normal);
        image::save_buffer(&path, &buffer, w, h, image::ColorType::Rgba8)
            .with_context(|| format!("could not save {path:?}"))?;
        info!("Saved normal map to {path:?}");
    }
    Ok(())
}
