//! Flattened clause list built from a [`Tree`]
use crate::tree::{Axis, BinaryOpcode, Tree, TreeOp, UnaryOpcode};
use std::collections::HashMap;

#[cfg(feature = "oracle")]
use crate::oracle::Oracle;
#[cfg(feature = "oracle")]
use std::sync::Arc;

/// A single clause, referring to earlier clauses by index
#[derive(Clone)]
pub(crate) enum Op {
    Input(Axis),
    Const(f32),
    Unary(UnaryOpcode, usize),
    Binary(BinaryOpcode, usize, usize),
    #[cfg(feature = "oracle")]
    Oracle(Arc<dyn Oracle>, [usize; 3]),
}

impl Op {
    /// Calls the given function on each child index
    pub fn for_each_child<F: FnMut(usize)>(&self, mut f: F) {
        match self {
            Op::Input(..) | Op::Const(..) => (),
            Op::Unary(_, a) => f(*a),
            Op::Binary(_, a, b) => {
                f(*a);
                f(*b);
            }
            #[cfg(feature = "oracle")]
            Op::Oracle(_, xyz) => xyz.iter().for_each(|i| f(*i)),
        }
    }
}

/// Clauses in evaluation order
///
/// Every clause only refers to clauses with lower indices; the root is the
/// last clause.
pub(crate) struct Tape {
    pub ops: Vec<Op>,

    /// Clause index for each input axis, if it is used
    pub axes: [Option<usize>; 3],
}

impl Tape {
    /// Flattens a tree
    ///
    /// Shared subtrees (by pointer) become a single clause, and each input
    /// axis is only stored once.
    pub fn new(root: &Tree) -> Self {
        let mut ops = vec![];
        let mut axes = [None; 3];
        let mut seen: HashMap<*const TreeOp, usize> = HashMap::new();

        // Postorder traversal, using an explicit stack so that deep trees
        // don't overflow the call stack
        let mut todo = vec![(root.clone(), false)];
        while let Some((t, ready)) = todo.pop() {
            if seen.contains_key(&t.as_ptr()) {
                continue;
            }
            if !ready {
                todo.push((t.clone(), true));
                for_each_tree_child(&t, |c| todo.push((c.clone(), false)));
                continue;
            }
            let op = match &*t {
                TreeOp::Input(a) => {
                    if let Some(i) = axes[a.index()] {
                        seen.insert(t.as_ptr(), i);
                        continue;
                    }
                    axes[a.index()] = Some(ops.len());
                    Op::Input(*a)
                }
                TreeOp::Const(c) => Op::Const(*c as f32),
                TreeOp::Unary(op, a) => Op::Unary(*op, seen[&a.as_ptr()]),
                TreeOp::Binary(op, a, b) => {
                    Op::Binary(*op, seen[&a.as_ptr()], seen[&b.as_ptr()])
                }
                #[cfg(feature = "oracle")]
                TreeOp::Oracle(o, [x, y, z]) => Op::Oracle(
                    o.clone(),
                    [seen[&x.as_ptr()], seen[&y.as_ptr()], seen[&z.as_ptr()]],
                ),
            };
            seen.insert(t.as_ptr(), ops.len());
            ops.push(op);
        }

        // The root is visited last, so it's always the final clause
        debug_assert_eq!(seen[&root.as_ptr()] + 1, ops.len());
        Self { ops, axes }
    }

    /// Returns the index of the root clause
    pub fn root(&self) -> usize {
        self.ops.len() - 1
    }

    /// Returns the number of clauses
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

fn for_each_tree_child<F: FnMut(&Tree)>(t: &Tree, mut f: F) {
    match &**t {
        TreeOp::Input(..) | TreeOp::Const(..) => (),
        TreeOp::Unary(_, a) => f(a),
        TreeOp::Binary(_, a, b) => {
            f(a);
            f(b);
        }
        #[cfg(feature = "oracle")]
        TreeOp::Oracle(_, xyz) => xyz.iter().for_each(f),
    }
}
