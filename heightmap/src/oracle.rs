//! Closed-form primitives which can be embedded in a [`Tree`]
//!
//! An [`Oracle`] is evaluated as a black box: rather than being expanded into
//! math operations, it computes its own values, partial derivatives, and
//! interval bounds.  This is useful for primitives which don't have a compact
//! closed-form expression, e.g. the distance to a Bezier curve.
//!
//! ```
//! use heightmap::{eval::Evaluator, oracle::BezierOracle, tree::Tree, vm::VmEval};
//! use nalgebra::Vector3;
//!
//! let curve = BezierOracle::new(
//!     Vector3::new(-1.0, 0.0, 0.0),
//!     Vector3::new(0.0, 1.0, 0.0),
//!     Vector3::new(1.0, 0.0, 0.0),
//! );
//! let tube = Tree::oracle(curve) - 0.25;
//! let mut eval = VmEval::new(&tube);
//! eval.set_point(-1.0, 0.0, 0.0, 0);
//! assert_eq!(eval.eval_values(1).get(0), -0.25);
//! ```
//!
//! [`Tree`]: crate::tree::Tree
use crate::types::{Grad, Interval};
use nalgebra::Vector3;

/// A black-box primitive, evaluated through dynamic dispatch
///
/// Implementations must be pure: the same inputs always produce the same
/// outputs, and [`interval`](Oracle::interval) must contain every value of
/// [`value`](Oracle::value) within the given box.
pub trait Oracle: Send + Sync {
    /// Human-readable name, used for debug printing
    fn name(&self) -> &str;

    /// Returns a conservative bound on the oracle's value within a box
    fn interval(&self, x: Interval, y: Interval, z: Interval) -> Interval;

    /// Evaluates the oracle at a single point
    fn value(&self, x: f32, y: f32, z: f32) -> f32;

    /// Evaluates the oracle and its partial derivatives (with respect to its
    /// own inputs) at a single point
    fn grad(&self, x: f32, y: f32, z: f32) -> Grad;
}

/// Distance to a quadratic Bezier curve
///
/// The curve is defined by endpoints `a` and `c`, with control point `b`.
#[derive(Clone, Debug)]
pub struct BezierOracle {
    a: Vector3<f32>,
    b: Vector3<f32>,
    c: Vector3<f32>,
}

impl BezierOracle {
    /// Number of evenly-spaced samples used to seed the closest-point search
    const SAMPLES: usize = 16;

    /// Number of Newton steps used to refine the closest point
    const NEWTON_STEPS: usize = 4;

    /// Builds a new curve from its endpoints and control point
    pub fn new(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Self {
        Self { a, b, c }
    }

    /// Returns the position along the curve at parameter `t`
    pub fn point(&self, t: f32) -> Vector3<f32> {
        let s = 1.0 - t;
        self.a * (s * s) + self.b * (2.0 * s * t) + self.c * (t * t)
    }

    fn tangent(&self, t: f32) -> Vector3<f32> {
        (self.b - self.a) * (2.0 * (1.0 - t)) + (self.c - self.b) * (2.0 * t)
    }

    /// Finds the curve parameter closest to the given point
    pub fn closest(&self, q: Vector3<f32>) -> f32 {
        let mut best = 0.0;
        let mut best_dist = f32::INFINITY;
        for i in 0..=Self::SAMPLES {
            let t = i as f32 / Self::SAMPLES as f32;
            let d = (self.point(t) - q).norm_squared();
            if d < best_dist {
                best = t;
                best_dist = d;
            }
        }

        // Minimize |p(t) - q|^2 by finding a root of its derivative
        let curvature = (self.a - self.b * 2.0 + self.c) * 2.0;
        let mut t = best;
        for _ in 0..Self::NEWTON_STEPS {
            let p = self.point(t) - q;
            let dp = self.tangent(t);
            let g = p.dot(&dp);
            let dg = dp.norm_squared() + p.dot(&curvature);
            if dg <= 0.0 {
                break;
            }
            let next = (t - g / dg).clamp(0.0, 1.0);
            if (self.point(next) - q).norm_squared() > best_dist {
                break;
            }
            best_dist = (self.point(next) - q).norm_squared();
            t = next;
        }
        t
    }
}

impl Oracle for BezierOracle {
    fn name(&self) -> &str {
        "BezierOracle"
    }

    /// The distance field is 1-Lipschitz, so it can't change by more than the
    /// distance from the center of the box to its corners.
    fn interval(&self, x: Interval, y: Interval, z: Interval) -> Interval {
        if x.has_nan() || y.has_nan() || z.has_nan() {
            return f32::NAN.into();
        }
        let center = self.value(x.midpoint(), y.midpoint(), z.midpoint());
        if !center.is_finite() {
            return f32::NAN.into();
        }
        let radius = Vector3::new(x.width(), y.width(), z.width()).norm() / 2.0;
        Interval::new((center - radius).max(0.0), center + radius)
    }

    fn value(&self, x: f32, y: f32, z: f32) -> f32 {
        let q = Vector3::new(x, y, z);
        (self.point(self.closest(q)) - q).norm()
    }

    fn grad(&self, x: f32, y: f32, z: f32) -> Grad {
        let q = Vector3::new(x, y, z);
        let d = q - self.point(self.closest(q));
        let v = d.norm();
        if v == 0.0 {
            Grad::from(0.0)
        } else {
            let n = d / v;
            Grad::new(v, n.x, n.y, n.z)
        }
    }
}
