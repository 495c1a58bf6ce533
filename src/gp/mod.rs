//! Common items related to Genetic Programming.
//!
//! Expressions are trees of operations, each with some level of arity - aka the number of
//! inputs - over constant and sensor leaves. They are written as s-expressions wrapped in a
//! synthetic `root`:
//!
//! ```text
//! (root (cos (* (+ (* -1.912 -9.178) (cos S0)) 3.113)))
//! ```
//!
//! - `ops`: the catalog of operations an expression may use.
//! - `expr`: the node model and the folds computing complexity, formal strings, text and values.
//! - `parse`: reading text into an expression.
//! - `simplify`: algebraic reduction into a new expression.
//! - `tree`: `TreeExpr`, tying the above together.

pub mod expr;
pub mod ops;
pub mod parse;
pub mod simplify;
pub mod tree;
