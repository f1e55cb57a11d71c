//! Heightmap and normal-map rendering
//!
//! To render something, either call [`render`] directly or build a
//! [`HeightmapRenderConfig`] and call its [`run`](HeightmapRenderConfig::run)
//! function.
//!
//! Rendering works by recursively subdividing a [`Region`]:
//!
//! - Interval evaluation over a subregion proves it to be entirely outside the
//!   shape (skip it), entirely inside (fill its pixels with its front plane),
//!   or ambiguous (split it, then recurse on the nearer half first).
//! - Subregions which are hidden behind already-rendered pixels are skipped.
//! - Small subregions are evaluated voxel-by-voxel, then the gradient is
//!   evaluated at each newly-found surface voxel to compute its normal.
//!
//! [`Region`]: crate::region::Region
mod config;
mod heightmap;
mod image;

pub use config::{CancelToken, HeightmapRenderConfig, ThreadPool};
pub use heightmap::render;
pub use image::{
    pack_normal, unpack_normal, DepthImage, Image, NormalImage, CLIP_NORMAL,
};
