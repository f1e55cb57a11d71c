//! Voxel regions
//!
//! A [`Region`] is a box of voxels, made of one [`Subregion`] per axis.  The
//! renderer recursively [splits](Region::split) regions until it can prove
//! that they're empty or filled, or until they're small enough to evaluate
//! voxel-by-voxel.
//!
//! Every subregion remembers the axis that it was cut from, so voxel positions
//! are computed the same way regardless of how many times a region has been
//! split:
//!
//! ```
//! use heightmap::region::Region;
//!
//! let r = Region::new([-1.0, 1.0], [-1.0, 1.0], [-1.0, 1.0], [4, 4, 4])?;
//! assert_eq!(r.z.pos(3), 0.75);
//! assert_eq!(r.front(), 0.75);
//!
//! // The second half is always the higher-index half
//! let (_a, b) = r.split();
//! assert_eq!(b.x.pos(0), 0.25);
//! assert_eq!(b.x.pos(0), r.x.pos(2));
//! # Ok::<(), heightmap::Error>(())
//! ```
use crate::{types::Interval, Error};

/// A contiguous range of voxels along a single axis
///
/// The subregion covers voxels `min..min + size` of an axis that spans
/// `[lower, upper]` with `total` voxels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Subregion {
    lower: f64,
    upper: f64,
    total: usize,
    min: usize,
    size: usize,
}

impl Subregion {
    /// Builds a subregion covering an entire axis
    ///
    /// # Panics
    /// Panics if `size == 0` or if the bounds are reversed; use
    /// [`Region::new`] for validated construction.
    pub fn new(lower: f64, upper: f64, size: usize) -> Self {
        assert!(size > 0, "subregion must contain at least one voxel");
        assert!(lower < upper, "invalid bounds [{lower}, {upper}]");
        Self {
            lower,
            upper,
            total: size,
            min: 0,
            size,
        }
    }

    /// Index of the first voxel, relative to the full axis
    pub fn min(&self) -> usize {
        self.min
    }

    /// Number of voxels in this subregion
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of voxels in the full axis
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns the center of voxel `i` (relative to this subregion)
    #[inline]
    pub fn pos(&self, i: usize) -> f64 {
        let t = (self.min + i) as f64 + 0.5;
        self.lower + (self.upper - self.lower) * t / self.total as f64
    }

    /// Returns the continuous span covered by this subregion
    pub fn interval(&self) -> Interval {
        let w = self.upper - self.lower;
        let lo = self.lower + w * self.min as f64 / self.total as f64;
        let hi =
            self.lower + w * (self.min + self.size) as f64 / self.total as f64;
        Interval::new(lo as f32, hi as f32)
    }

    /// Splits into lower and upper halves
    ///
    /// The lower half contains `size / 2` voxels; the upper half contains the
    /// remainder.
    ///
    /// # Panics
    /// Panics if the subregion only contains a single voxel
    pub fn split(&self) -> (Self, Self) {
        assert!(self.size > 1, "cannot split a single voxel");
        let half = self.size / 2;
        (self.slice(0, half), self.slice(half, self.size - half))
    }

    /// Returns a smaller subregion, starting at local index `start`
    fn slice(&self, start: usize, size: usize) -> Self {
        debug_assert!(size > 0 && start + size <= self.size);
        Self {
            min: self.min + start,
            size,
            ..*self
        }
    }
}

/// A box of voxels
///
/// The image plane is XY; Z points towards the viewer, so higher Z voxels
/// are nearer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    /// Horizontal axis (image columns)
    pub x: Subregion,
    /// Vertical axis (image rows)
    pub y: Subregion,
    /// Depth axis
    pub z: Subregion,
}

impl Region {
    /// Builds a new region with the given bounds and voxel counts
    ///
    /// Bounds must be finite, ascending, and within the range of an `f32`;
    /// the total voxel count must fit in a `usize`.
    pub fn new(
        x: [f64; 2],
        y: [f64; 2],
        z: [f64; 2],
        size: [usize; 3],
    ) -> Result<Self, Error> {
        let axis = |axis: char, [lower, upper]: [f64; 2], size: usize| {
            let max = f32::MAX as f64;
            if !(lower >= -max && upper <= max && lower < upper) {
                Err(Error::BadBounds { axis, lower, upper })
            } else if size == 0 {
                Err(Error::EmptyAxis(axis))
            } else {
                Ok(Subregion::new(lower, upper, size))
            }
        };
        let out = Self {
            x: axis('x', x, size[0])?,
            y: axis('y', y, size[1])?,
            z: axis('z', z, size[2])?,
        };
        if size.iter().try_fold(1usize, |a, b| a.checked_mul(*b)).is_none() {
            return Err(Error::TooManyVoxels(size));
        }
        Ok(out)
    }

    /// Builds a new region with roughly `voxels_per_unit` voxels along each
    /// unit of distance
    ///
    /// Each axis is rounded up to a whole number of voxels.
    pub fn with_resolution(
        x: [f64; 2],
        y: [f64; 2],
        z: [f64; 2],
        voxels_per_unit: f64,
    ) -> Result<Self, Error> {
        if !(voxels_per_unit.is_finite() && voxels_per_unit > 0.0) {
            return Err(Error::BadResolution(voxels_per_unit));
        }
        let n = |[lower, upper]: [f64; 2]| {
            ((upper - lower) * voxels_per_unit).ceil().max(1.0) as usize
        };
        match Self::new(x, y, z, [n(x), n(y), n(z)]) {
            Err(Error::TooManyVoxels(..)) => {
                Err(Error::BadResolution(voxels_per_unit))
            }
            r => r,
        }
    }

    /// Returns the Z position of the nearest voxel plane
    pub fn front(&self) -> f64 {
        self.z.pos(self.z.size - 1)
    }

    /// Returns the total number of voxels
    pub fn voxels(&self) -> usize {
        self.x.size * self.y.size * self.z.size
    }

    /// Checks whether this region can be split
    pub fn can_split(&self) -> bool {
        self.x.size > 1 || self.y.size > 1 || self.z.size > 1
    }

    /// Returns the continuous span of each axis
    pub fn intervals(&self) -> (Interval, Interval, Interval) {
        (self.x.interval(), self.y.interval(), self.z.interval())
    }

    /// Bisects the largest axis
    ///
    /// Ties are broken in X, Y, Z order.  The first region contains the lower
    /// voxel indices; when splitting along Z, this means that the second
    /// region is nearer to the viewer.
    ///
    /// # Panics
    /// Panics if the region is a single voxel
    pub fn split(&self) -> (Self, Self) {
        let (sx, sy, sz) = (self.x.size, self.y.size, self.z.size);
        if sx >= sy && sx >= sz {
            let (a, b) = self.x.split();
            (Self { x: a, ..*self }, Self { x: b, ..*self })
        } else if sy >= sz {
            let (a, b) = self.y.split();
            (Self { y: a, ..*self }, Self { y: b, ..*self })
        } else {
            let (a, b) = self.z.split();
            (Self { z: a, ..*self }, Self { z: b, ..*self })
        }
    }

    /// Cuts the region into XY tiles, each covering the full Z range
    ///
    /// Tiles along the right and bottom edges may be smaller than
    /// `tile_size`.
    ///
    /// # Panics
    /// Panics if `tile_size == 0`
    pub fn tiles(&self, tile_size: usize) -> Vec<Self> {
        assert!(tile_size > 0, "tile size must be non-zero");
        let mut out = vec![];
        for j in (0..self.y.size).step_by(tile_size) {
            let y = self.y.slice(j, tile_size.min(self.y.size - j));
            for i in (0..self.x.size).step_by(tile_size) {
                let x = self.x.slice(i, tile_size.min(self.x.size - i));
                out.push(Self { x, y, z: self.z });
            }
        }
        out
    }
}
