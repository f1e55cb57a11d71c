//! Traits and data structures for evaluation
//!
//! The renderer never looks inside a shape; it only talks to an
//! [`Evaluator`], which offers three flavors of evaluation:
//!
//! - Interval evaluation, to prove that a whole region is inside or outside
//! - Batch evaluation of values, to resolve a region voxel-by-voxel
//! - Batch evaluation of partial derivatives, to compute surface normals
//!
//! plus the [`push`](Evaluator::push) / [`pop`](Evaluator::pop) pair, which
//! lets an evaluator skip branches that the most recent interval evaluation
//! proved to be inactive.
//!
//! The reference implementation is [`VmEval`](crate::vm::VmEval):
//! ```
//! use heightmap::{eval::Evaluator, tree::Tree, types::Interval, vm::VmEval};
//!
//! let (x, y, _z) = Tree::axes();
//! let mut eval = VmEval::new(&(x + y));
//! let out = eval.interval(
//!     Interval::new(0.0, 1.0),
//!     Interval::new(2.0, 3.0),
//!     Interval::new(0.0, 0.0),
//! );
//! assert_eq!(out, Interval::new(2.0, 4.0));
//!
//! eval.set_point(1.0, 2.0, 0.0, 0);
//! eval.set_point(-1.0, 0.5, 0.0, 1);
//! let out = eval.eval_values(2);
//! assert_eq!(out.get(0), 3.0);
//! assert_eq!(out.get(1), -0.5);
//! ```
use crate::types::Interval;

mod buffer;
pub use buffer::{ResultBuffer, BATCH_SIZE};

/// Evaluation capabilities required by the renderer
///
/// # Contract
/// - [`interval`](Evaluator::interval) must be conservative (every value of
///   the function within the box is contained in the result) and
///   deterministic.  The `NaN` interval is allowed, and is treated as
///   ambiguous.
/// - Batch functions evaluate points `0..count`, which must have been loaded
///   with [`set_point`](Evaluator::set_point); `count` must not exceed
///   [`BATCH_SIZE`].
/// - [`push`](Evaluator::push) and [`pop`](Evaluator::pop) follow stack
///   discipline and must never change results for points within the most
///   recent interval region.  Prefer [`Pushed`] to calling them directly.
///
/// The push / pop state belongs to a single evaluator; concurrent renders of
/// the same shape must use separate evaluators (e.g. by cloning).
pub trait Evaluator {
    /// Evaluates the function over a box, returning a conservative bound
    fn interval(&mut self, x: Interval, y: Interval, z: Interval) -> Interval;

    /// Loads a point into the given slot of the batch
    fn set_point(&mut self, x: f32, y: f32, z: f32, index: usize);

    /// Evaluates values for the first `count` points in the batch
    fn eval_values(&mut self, count: usize) -> &ResultBuffer;

    /// Evaluates values and partial derivatives (with respect to `x`, `y`,
    /// and `z`) for the first `count` points in the batch
    fn eval_grads(&mut self, count: usize) -> &ResultBuffer;

    /// Disables branches which were proven inactive by the most recent call
    /// to [`interval`](Evaluator::interval)
    fn push(&mut self);

    /// Re-enables the branches disabled by the matching [`push`]
    ///
    /// [`push`]: Evaluator::push
    fn pop(&mut self);
}

/// Scoped guard which disables inactive branches of an evaluator
///
/// Construction calls [`Evaluator::push`]; dropping the guard calls the
/// matching [`Evaluator::pop`], on every exit path.
pub struct Pushed<'a, E: Evaluator + ?Sized>(&'a mut E);

impl<'a, E: Evaluator + ?Sized> Pushed<'a, E> {
    /// Pushes the evaluator, returning a guard which pops it when dropped
    pub fn new(eval: &'a mut E) -> Self {
        eval.push();
        Self(eval)
    }
}

impl<E: Evaluator + ?Sized> Drop for Pushed<'_, E> {
    fn drop(&mut self) {
        self.0.pop();
    }
}

impl<E: Evaluator + ?Sized> std::ops::Deref for Pushed<'_, E> {
    type Target = E;
    fn deref(&self) -> &E {
        self.0
    }
}

impl<E: Evaluator + ?Sized> std::ops::DerefMut for Pushed<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.0
    }
}
