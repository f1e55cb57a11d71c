//! Module containing the universal error type
use thiserror::Error;

/// Universal error type for the heightmap renderer
///
/// Rendering itself cannot fail; these errors are only produced while building
/// regions and render configurations.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// An axis must contain at least one voxel
    #[error("axis {0} has no voxels")]
    EmptyAxis(char),

    /// Axis bounds must be finite and in ascending order
    #[error("bad bounds on axis {axis}: [{lower}, {upper}]")]
    BadBounds {
        /// Axis name
        axis: char,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// The total voxel count must fit in a `usize`
    #[error("too many voxels: {0:?}")]
    TooManyVoxels([usize; 3]),

    /// Resolution must be finite and positive
    #[error("bad resolution {0}; must be finite and positive")]
    BadResolution(f64),

    /// Tiles must contain at least one pixel
    #[error("bad tile size {0}; must be non-zero")]
    BadTileSize(usize),
}
