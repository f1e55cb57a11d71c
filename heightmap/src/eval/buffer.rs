//! Fixed-size storage for batch evaluation results
use crate::types::{Grad, Interval};
use static_assertions::const_assert_eq;

/// Number of points in a single evaluation batch
///
/// This bounds the size of the regions that are evaluated voxel-by-voxel, as
/// well as the number of normals computed in a single gradient batch.  It must
/// be a multiple of the 8-lane (AVX) register width, so that loops over the
/// batch can be vectorized without a scalar tail.
pub const BATCH_SIZE: usize = 256;
const_assert_eq!(BATCH_SIZE % 8, 0);

/// Results of evaluating a single clause on a batch of points
///
/// Each slot stores a value and its partial derivatives; in addition, there's
/// a single interval slot which is used independently (by interval
/// evaluation).
///
/// Slots beyond the count requested from the evaluator are unspecified.
#[derive(Clone)]
#[repr(C, align(32))]
pub struct ResultBuffer {
    f: [f32; BATCH_SIZE],
    dx: [f32; BATCH_SIZE],
    dy: [f32; BATCH_SIZE],
    dz: [f32; BATCH_SIZE],
    i: Interval,
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self {
            f: [0.0; BATCH_SIZE],
            dx: [0.0; BATCH_SIZE],
            dy: [0.0; BATCH_SIZE],
            dz: [0.0; BATCH_SIZE],
            i: Interval::default(),
        }
    }
}

impl std::fmt::Debug for ResultBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultBuffer")
            .field("i", &self.i)
            .finish_non_exhaustive()
    }
}

impl ResultBuffer {
    /// Builds a new buffer, filled with zeros
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value at the given index
    ///
    /// # Panics
    /// If `index >= BATCH_SIZE`
    #[inline]
    pub fn set(&mut self, v: f32, index: usize) {
        self.f[index] = v;
    }

    /// Returns the value at the given index
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.f[index]
    }

    /// Sets the interval slot
    #[inline]
    pub fn set_interval(&mut self, i: Interval) {
        self.i = i;
    }

    /// Returns the interval slot
    #[inline]
    pub fn interval(&self) -> Interval {
        self.i
    }

    /// Sets the value and partial derivatives at the given index
    #[inline]
    pub fn set_grad(&mut self, g: Grad, index: usize) {
        self.f[index] = g.v;
        self.dx[index] = g.dx;
        self.dy[index] = g.dy;
        self.dz[index] = g.dz;
    }

    /// Returns the value and partial derivatives at the given index
    #[inline]
    pub fn grad(&self, index: usize) -> Grad {
        Grad::new(
            self.f[index],
            self.dx[index],
            self.dy[index],
            self.dz[index],
        )
    }

    /// Sets every value (and the interval) to the given constant, and every
    /// partial derivative to zero
    pub fn fill(&mut self, v: f32) {
        self.f.fill(v);
        self.dx.fill(0.0);
        self.dy.fill(0.0);
        self.dz.fill(0.0);
        self.i = Interval::from(v);
    }

    /// Sets every partial derivative to the given seed
    pub fn deriv(&mut self, x: f32, y: f32, z: f32) {
        self.dx.fill(x);
        self.dy.fill(y);
        self.dz.fill(z);
    }

    /// Borrows the value array
    #[inline]
    pub fn values(&self) -> &[f32; BATCH_SIZE] {
        &self.f
    }

    /// Mutably borrows the value array
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f32; BATCH_SIZE] {
        &mut self.f
    }

    /// Copies the first `count` values and derivatives from another buffer
    ///
    /// The interval slot is copied as well.
    pub fn copy_from(&mut self, other: &ResultBuffer, count: usize) {
        self.f[..count].copy_from_slice(&other.f[..count]);
        self.dx[..count].copy_from_slice(&other.dx[..count]);
        self.dy[..count].copy_from_slice(&other.dy[..count]);
        self.dz[..count].copy_from_slice(&other.dz[..count]);
        self.i = other.i;
    }
}
