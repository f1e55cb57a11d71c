//! Adaptive heightmap rendering of implicit surfaces
//!
//! This crate renders a **heightmap** (the depth of the nearest surface at
//! each pixel) and a **normal map** (a packed surface normal at each pixel) of
//! a shape defined by a function `f(x, y, z)`, which is negative inside the
//! shape and positive outside.
//!
//! The renderer only talks to shapes through the [`Evaluator`] trait, which
//! provides interval, value, and gradient evaluation.  The crate includes a
//! small reference implementation, [`VmEval`](vm::VmEval), which evaluates
//! math expressions built as a [`Tree`](tree::Tree).
//!
//! ```
//! use heightmap::{
//!     region::Region,
//!     render::{render, CancelToken, CLIP_NORMAL},
//!     tree::Tree,
//!     vm::VmEval,
//! };
//!
//! // A sphere of radius 1, truncated by the front of the render region
//! let (x, y, z) = Tree::axes();
//! let sphere = (x.square() + y.square() + z.square()).sqrt() - 1.0;
//! let mut eval = VmEval::new(&sphere);
//!
//! let region = Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 0.5], [64; 3])?;
//! let (depth, normal) = render(&mut eval, region, &CancelToken::new(), true);
//!
//! // The center pixel is at the front of the region
//! assert_eq!(depth[(32, 32)], region.front());
//! assert_eq!(normal[(32, 32)], CLIP_NORMAL);
//! # Ok::<(), heightmap::Error>(())
//! ```
//!
//! [`Evaluator`]: eval::Evaluator
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

pub mod eval;
pub mod region;
pub mod render;
pub mod tree;
pub mod types;
pub mod vm;

#[cfg(feature = "oracle")]
pub mod oracle;

mod error;
pub use error::Error;
