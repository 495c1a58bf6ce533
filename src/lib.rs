//! Operator-tree expressions for genetic programming and symbolic regression.
//!
//! Candidate solutions are s-expressions such as `(root (cos (* S0 3.113)))`. The `gp` module
//! parses them into trees, measures them (complexity, formal string), evaluates them against
//! sensor readings and simplifies them. The `ga` module ranks many trees at once.

pub mod config;
pub mod error;
pub mod ga;
pub mod gp;

pub use crate::config::Config;
pub use crate::error::{CatalogError, Error, Result};
pub use crate::gp::ops::{Catalog, Domain, Operation};
pub use crate::gp::tree::TreeExpr;
