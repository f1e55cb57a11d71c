//! Simple interpreter for shape evaluation
//!
//! [`VmEval`] is the reference implementation of [`Evaluator`].  It flattens
//! a [`Tree`] into a list of clauses, each with its own [`ResultBuffer`], and
//! evaluates them in order.
//!
//! During interval evaluation, every `min` and `max` clause records a
//! [`Choice`].  Calling [`push`](Evaluator::push) uses those choices to narrow
//! each clause to the branch that was chosen, then drops every clause which is
//! no longer reachable from the root; [`pop`](Evaluator::pop) restores the
//! previous state.
//!
//! ```
//! use heightmap::{eval::Evaluator, tree::Tree, types::Interval, vm::VmEval};
//!
//! let (x, y, _z) = Tree::axes();
//! let mut eval = VmEval::new(&x.min(y));
//! assert_eq!(eval.active(), 3);
//!
//! // In this region, `x < y` everywhere
//! let i = eval.interval(
//!     Interval::new(0.0, 1.0),
//!     Interval::new(2.0, 3.0),
//!     Interval::new(0.0, 0.0),
//! );
//! assert_eq!(i, Interval::new(0.0, 1.0));
//!
//! eval.push();
//! assert_eq!(eval.active(), 2); // only `x` and the min clause remain
//! eval.pop();
//! assert_eq!(eval.active(), 3);
//! ```
use crate::{
    eval::{Evaluator, ResultBuffer, BATCH_SIZE},
    tree::{BinaryOpcode, Tree, UnaryOpcode},
    types::Interval,
};
use std::sync::Arc;

mod choice;
mod tape;

pub use choice::Choice;
use tape::{Op, Tape};

/// Set of active clauses, along with the choice for each `min` / `max`
#[derive(Clone, Default)]
struct Frame {
    /// Active clause indices, in ascending order
    active: Vec<usize>,

    /// Per-clause choices (only meaningful for `min` / `max` clauses)
    choices: Vec<Choice>,
}

/// Interpreter-based evaluator
///
/// Cloning the evaluator shares the (immutable) clause list, but copies the
/// result buffers and push / pop state, so clones may be used on separate
/// threads.
#[derive(Clone)]
pub struct VmEval {
    tape: Arc<Tape>,

    /// One result buffer per clause
    results: Vec<ResultBuffer>,

    /// Choices recorded by the most recent interval evaluation
    trace: Vec<Choice>,

    /// Every clause, with no choices made
    base: Frame,

    /// Frames created by `push`
    stack: Vec<Frame>,

    /// Frames released by `pop`, kept to reuse their allocations
    spare: Vec<Frame>,

    /// Scratch array used when building a new frame
    live: Vec<bool>,
}

impl VmEval {
    /// Builds an evaluator for the given tree
    pub fn new(t: &Tree) -> Self {
        let tape = Tape::new(t);
        let n = tape.len();

        let mut results = vec![ResultBuffer::default(); n];
        for (op, r) in tape.ops.iter().zip(results.iter_mut()) {
            match op {
                Op::Const(c) => r.fill(*c),
                Op::Input(a) => match a.index() {
                    0 => r.deriv(1.0, 0.0, 0.0),
                    1 => r.deriv(0.0, 1.0, 0.0),
                    _ => r.deriv(0.0, 0.0, 1.0),
                },
                _ => (),
            }
        }

        let base = Frame {
            active: (0..n).collect(),
            choices: vec![Choice::Both; n],
        };
        Self {
            tape: Arc::new(tape),
            results,
            trace: vec![Choice::Both; n],
            base,
            stack: vec![],
            spare: vec![],
            live: vec![false; n],
        }
    }

    /// Returns the number of active clauses
    pub fn active(&self) -> usize {
        self.frame().active.len()
    }

    /// Returns the number of frames pushed with [`Evaluator::push`]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn frame(&self) -> &Frame {
        self.stack.last().unwrap_or(&self.base)
    }
}

fn unary(out: &mut [f32], a: &[f32], f: impl Fn(f32) -> f32) {
    for (o, a) in out.iter_mut().zip(a) {
        *o = f(*a);
    }
}

fn binary(out: &mut [f32], a: &[f32], b: &[f32], f: impl Fn(f32, f32) -> f32) {
    for ((o, a), b) in out.iter_mut().zip(a).zip(b) {
        *o = f(*a, *b);
    }
}

impl Evaluator for VmEval {
    fn interval(&mut self, x: Interval, y: Interval, z: Interval) -> Interval {
        let frame = self.stack.last().unwrap_or(&self.base);
        let xyz = [x, y, z];
        for &i in &frame.active {
            let (prev, rest) = self.results.split_at_mut(i);
            let out = &mut rest[0];
            let v = match &self.tape.ops[i] {
                Op::Input(a) => xyz[a.index()],
                Op::Const(..) => continue,
                Op::Unary(op, a) => {
                    let a = prev[*a].interval();
                    match op {
                        UnaryOpcode::Neg => -a,
                        UnaryOpcode::Abs => a.abs(),
                        UnaryOpcode::Recip => a.recip(),
                        UnaryOpcode::Sqrt => a.sqrt(),
                        UnaryOpcode::Square => a.square(),
                    }
                }
                Op::Binary(op, a, b) => {
                    let a = prev[*a].interval();
                    let b = prev[*b].interval();
                    match op {
                        BinaryOpcode::Add => a + b,
                        BinaryOpcode::Sub => a - b,
                        BinaryOpcode::Mul => a * b,
                        BinaryOpcode::Div => a / b,
                        BinaryOpcode::Min | BinaryOpcode::Max => {
                            let (v, c) = match frame.choices[i] {
                                Choice::Left => (a, Choice::Left),
                                Choice::Right => (b, Choice::Right),
                                Choice::Both if *op == BinaryOpcode::Min => {
                                    a.min_choice(b)
                                }
                                Choice::Both => a.max_choice(b),
                            };
                            self.trace[i] = c;
                            v
                        }
                    }
                }
                #[cfg(feature = "oracle")]
                Op::Oracle(o, [x, y, z]) => o.interval(
                    prev[*x].interval(),
                    prev[*y].interval(),
                    prev[*z].interval(),
                ),
            };
            out.set_interval(v);
        }
        self.results[self.tape.root()].interval()
    }

    fn set_point(&mut self, x: f32, y: f32, z: f32, index: usize) {
        for (axis, v) in self.tape.axes.iter().zip([x, y, z]) {
            if let Some(i) = axis {
                self.results[*i].set(v, index);
            }
        }
    }

    fn eval_values(&mut self, count: usize) -> &ResultBuffer {
        assert!(count <= BATCH_SIZE, "batch is too large ({count})");
        let frame = self.stack.last().unwrap_or(&self.base);
        for &i in &frame.active {
            let (prev, rest) = self.results.split_at_mut(i);
            let out = &mut rest[0].values_mut()[..count];
            match &self.tape.ops[i] {
                Op::Input(..) | Op::Const(..) => (),
                Op::Unary(op, a) => {
                    let a = &prev[*a].values()[..count];
                    match op {
                        UnaryOpcode::Neg => unary(out, a, |a| -a),
                        UnaryOpcode::Abs => unary(out, a, f32::abs),
                        UnaryOpcode::Recip => unary(out, a, f32::recip),
                        UnaryOpcode::Sqrt => unary(out, a, f32::sqrt),
                        UnaryOpcode::Square => unary(out, a, |a| a * a),
                    }
                }
                Op::Binary(op, a, b) => {
                    let a = &prev[*a].values()[..count];
                    let b = &prev[*b].values()[..count];
                    match (op, frame.choices[i]) {
                        (BinaryOpcode::Add, _) => binary(out, a, b, |a, b| a + b),
                        (BinaryOpcode::Sub, _) => binary(out, a, b, |a, b| a - b),
                        (BinaryOpcode::Mul, _) => binary(out, a, b, |a, b| a * b),
                        (BinaryOpcode::Div, _) => binary(out, a, b, |a, b| a / b),
                        (BinaryOpcode::Min | BinaryOpcode::Max, Choice::Left) => {
                            out.copy_from_slice(a)
                        }
                        (BinaryOpcode::Min | BinaryOpcode::Max, Choice::Right) => {
                            out.copy_from_slice(b)
                        }
                        (BinaryOpcode::Min, Choice::Both) => {
                            binary(out, a, b, f32::min)
                        }
                        (BinaryOpcode::Max, Choice::Both) => {
                            binary(out, a, b, f32::max)
                        }
                    }
                }
                #[cfg(feature = "oracle")]
                Op::Oracle(o, [x, y, z]) => {
                    let x = &prev[*x].values()[..count];
                    let y = &prev[*y].values()[..count];
                    let z = &prev[*z].values()[..count];
                    for (j, v) in out.iter_mut().enumerate() {
                        *v = o.value(x[j], y[j], z[j]);
                    }
                }
            }
        }
        &self.results[self.tape.root()]
    }

    fn eval_grads(&mut self, count: usize) -> &ResultBuffer {
        assert!(count <= BATCH_SIZE, "batch is too large ({count})");
        let frame = self.stack.last().unwrap_or(&self.base);
        for &i in &frame.active {
            let (prev, rest) = self.results.split_at_mut(i);
            let out = &mut rest[0];
            match &self.tape.ops[i] {
                Op::Input(..) | Op::Const(..) => (),
                Op::Unary(op, a) => {
                    let a = &prev[*a];
                    for j in 0..count {
                        let a = a.grad(j);
                        let v = match op {
                            UnaryOpcode::Neg => -a,
                            UnaryOpcode::Abs => a.abs(),
                            UnaryOpcode::Recip => a.recip(),
                            UnaryOpcode::Sqrt => a.sqrt(),
                            UnaryOpcode::Square => a.square(),
                        };
                        out.set_grad(v, j);
                    }
                }
                Op::Binary(op, a, b) => {
                    let (a, b) = (&prev[*a], &prev[*b]);
                    match (op, frame.choices[i]) {
                        (BinaryOpcode::Min | BinaryOpcode::Max, Choice::Left) => {
                            out.copy_from(a, count)
                        }
                        (BinaryOpcode::Min | BinaryOpcode::Max, Choice::Right) => {
                            out.copy_from(b, count)
                        }
                        _ => {
                            for j in 0..count {
                                let (a, b) = (a.grad(j), b.grad(j));
                                let v = match op {
                                    BinaryOpcode::Add => a + b,
                                    BinaryOpcode::Sub => a - b,
                                    BinaryOpcode::Mul => a * b,
                                    BinaryOpcode::Div => a / b,
                                    BinaryOpcode::Min => a.min(b),
                                    BinaryOpcode::Max => a.max(b),
                                };
                                out.set_grad(v, j);
                            }
                        }
                    }
                }
                #[cfg(feature = "oracle")]
                Op::Oracle(o, [x, y, z]) => {
                    let (x, y, z) = (&prev[*x], &prev[*y], &prev[*z]);
                    for j in 0..count {
                        let (x, y, z) = (x.grad(j), y.grad(j), z.grad(j));
                        // Chain rule, since the oracle's inputs may themselves
                        // be functions of x, y, z
                        let g = o.grad(x.v, y.v, z.v);
                        let v = crate::types::Grad::new(
                            g.v,
                            g.dx * x.dx + g.dy * y.dx + g.dz * z.dx,
                            g.dx * x.dy + g.dy * y.dy + g.dz * z.dy,
                            g.dx * x.dz + g.dy * y.dz + g.dz * z.dz,
                        );
                        out.set_grad(v, j);
                    }
                }
            }
        }
        &self.results[self.tape.root()]
    }

    fn push(&mut self) {
        let mut next = self.spare.pop().unwrap_or_default();
        let cur = self.stack.last().unwrap_or(&self.base);
        next.choices.clear();
        next.choices.extend_from_slice(&cur.choices);

        // Walk backwards from the root, marking clauses which are still used
        self.live.fill(false);
        self.live[self.tape.root()] = true;
        for &i in cur.active.iter().rev() {
            if !self.live[i] {
                continue;
            }
            let op = &self.tape.ops[i];
            match op {
                Op::Binary(BinaryOpcode::Min | BinaryOpcode::Max, a, b) => {
                    let c = self.trace[i];
                    next.choices[i] = c;
                    if c.has_left() {
                        self.live[*a] = true;
                    }
                    if c.has_right() {
                        self.live[*b] = true;
                    }
                }
                _ => op.for_each_child(|c| self.live[c] = true),
            }
        }
        next.active.clear();
        next.active
            .extend(cur.active.iter().filter(|i| self.live[**i]).cloned());
        self.stack.push(next);
    }

    fn pop(&mut self) {
        let frame = self.stack.pop().expect("pop without a matching push");
        self.spare.push(frame);
    }
}
