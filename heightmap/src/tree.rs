//! Context-free math trees
//!
//! A [`Tree`] is a minimal expression type used to drive the reference
//! [`VmEval`](crate::vm::VmEval) evaluator.  Trees are immutable and cheap to
//! clone; shared subtrees are evaluated once.
//!
//! ```
//! use heightmap::tree::Tree;
//!
//! let (x, y, z) = Tree::axes();
//! let sphere = (x.square() + y.square() + z.square()).sqrt() - 1.0;
//! # let _ = sphere;
//! ```
use std::sync::Arc;

#[cfg(feature = "oracle")]
use crate::oracle::Oracle;

/// A one-argument math operation
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum UnaryOpcode {
    Neg,
    Abs,
    Recip,
    Sqrt,
    Square,
}

/// A two-argument math operation
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum BinaryOpcode {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

/// One of the three input axes
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Returns the index of this axis (0 for X, 1 for Y, 2 for Z)
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Opcode type for trees
#[allow(missing_docs)]
pub enum TreeOp {
    Input(Axis),
    Const(f64),
    Binary(BinaryOpcode, Tree, Tree),
    Unary(UnaryOpcode, Tree),
    /// Closed-form primitive, evaluated at the position given by three input
    /// trees
    #[cfg(feature = "oracle")]
    Oracle(Arc<dyn Oracle>, [Tree; 3]),
}

impl std::fmt::Debug for TreeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeOp::Input(a) => f.debug_tuple("Input").field(a).finish(),
            TreeOp::Const(c) => f.debug_tuple("Const").field(c).finish(),
            TreeOp::Binary(op, a, b) => f
                .debug_tuple("Binary")
                .field(op)
                .field(a)
                .field(b)
                .finish(),
            TreeOp::Unary(op, a) => {
                f.debug_tuple("Unary").field(op).field(a).finish()
            }
            #[cfg(feature = "oracle")]
            TreeOp::Oracle(o, xyz) => {
                f.debug_tuple("Oracle").field(&o.name()).field(xyz).finish()
            }
        }
    }
}

impl From<f64> for Tree {
    fn from(v: f64) -> Tree {
        Tree::constant(v)
    }
}

impl From<f32> for Tree {
    fn from(v: f32) -> Tree {
        Tree::constant(v as f64)
    }
}

/// Owned handle for a standalone math tree
#[derive(Clone, Debug)]
pub struct Tree(Arc<TreeOp>);

impl std::ops::Deref for Tree {
    type Target = TreeOp;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Tree {
    /// Shallow (pointer) comparison
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.as_ptr(), other.as_ptr())
    }
}
impl Eq for Tree {}

#[allow(missing_docs)]
impl Tree {
    pub fn x() -> Self {
        Tree(Arc::new(TreeOp::Input(Axis::X)))
    }
    pub fn y() -> Self {
        Tree(Arc::new(TreeOp::Input(Axis::Y)))
    }
    pub fn z() -> Self {
        Tree(Arc::new(TreeOp::Input(Axis::Z)))
    }
    /// Returns an `(x, y, z)` tuple
    pub fn axes() -> (Self, Self, Self) {
        (Self::x(), Self::y(), Self::z())
    }
    pub fn constant(f: f64) -> Self {
        Tree(Arc::new(TreeOp::Const(f)))
    }
    fn op_unary(a: Tree, op: UnaryOpcode) -> Self {
        Tree(Arc::new(TreeOp::Unary(op, a)))
    }
    fn op_binary(a: Tree, b: Tree, op: BinaryOpcode) -> Self {
        Tree(Arc::new(TreeOp::Binary(op, a, b)))
    }
    pub fn square(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Square)
    }
    pub fn sqrt(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Sqrt)
    }
    pub fn abs(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Abs)
    }
    pub fn recip(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Recip)
    }
    pub fn max<T: Into<Tree>>(&self, other: T) -> Self {
        Self::op_binary(self.clone(), other.into(), BinaryOpcode::Max)
    }
    pub fn min<T: Into<Tree>>(&self, other: T) -> Self {
        Self::op_binary(self.clone(), other.into(), BinaryOpcode::Min)
    }

    /// Builds a tree which evaluates an oracle at `(x, y, z)`
    #[cfg(feature = "oracle")]
    pub fn oracle<O: Oracle + 'static>(oracle: O) -> Self {
        Self::oracle_at(Arc::new(oracle), Self::axes())
    }

    /// Builds a tree which evaluates an oracle at a position given by three
    /// other trees
    #[cfg(feature = "oracle")]
    pub fn oracle_at(
        oracle: Arc<dyn Oracle>,
        (x, y, z): (Tree, Tree, Tree),
    ) -> Self {
        Tree(Arc::new(TreeOp::Oracle(oracle, [x, y, z])))
    }

    /// Returns a pointer to the inner [`TreeOp`]
    ///
    /// This can be used as a strong (but not unique) identity.
    pub fn as_ptr(&self) -> *const TreeOp {
        Arc::as_ptr(&self.0)
    }
}

impl std::ops::Neg for Tree {
    type Output = Tree;
    fn neg(self) -> Tree {
        Tree::op_unary(self, UnaryOpcode::Neg)
    }
}

macro_rules! impl_binary {
    ($op:ident, $op_assign:ident, $base_fn:ident, $assign_fn:ident) => {
        impl<A: Into<Tree>> std::ops::$op<A> for Tree {
            type Output = Self;

            fn $base_fn(self, other: A) -> Self {
                Self::op_binary(self, other.into(), BinaryOpcode::$op)
            }
        }
        impl<A: Into<Tree>> std::ops::$op_assign<A> for Tree {
            fn $assign_fn(&mut self, other: A) {
                use std::ops::$op;
                self.0 = self.clone().$base_fn(other.into()).0
            }
        }
        impl std::ops::$op<Tree> for f32 {
            type Output = Tree;
            fn $base_fn(self, other: Tree) -> Tree {
                Tree::op_binary(self.into(), other, BinaryOpcode::$op)
            }
        }
        impl std::ops::$op<Tree> for f64 {
            type Output = Tree;
            fn $base_fn(self, other: Tree) -> Tree {
                Tree::op_binary(self.into(), other, BinaryOpcode::$op)
            }
        }
    };
}

impl_binary!(Add, AddAssign, add, add_assign);
impl_binary!(Sub, SubAssign, sub, sub_assign);
impl_binary!(Mul, MulAssign, mul, mul_assign);
impl_binary!(Div, DivAssign, div, div_assign);
