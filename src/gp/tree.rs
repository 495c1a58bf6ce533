//! The tree-expression object handed to the rest of a genetic programming system.

use crate::config::Config;
use crate::error::Result;
use crate::gp::expr::{Expr, Node};
use crate::gp::ops::Catalog;
use crate::gp::{parse, simplify};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A parsed `(root ...)` expression along with its cached metrics.
///
/// Complexity and formal string are computed once, from the tree as parsed, before any
/// simplification takes place. Simplifying afterwards only yields an additional canonical
/// text and never changes these metrics. Evaluation, expansion and node iteration likewise
/// always operate on the tree as parsed.
///
/// Evaluation does not write into the tree, so a `TreeExpr` may be shared between threads and
/// evaluated concurrently.
#[derive(Clone, Debug)]
pub struct TreeExpr {
    catalog: Arc<Catalog>,
    expr: Expr,
    complexity: u32,
    formals: Vec<String>,
    formal: String,
    simplified: Option<Simplified>,
}

#[derive(Clone, Debug)]
struct Simplified {
    expr: Expr,
    text: String,
}

impl TreeExpr {
    /// Parse the given text using the standard operations catalog.
    pub fn new(text: &str, config: &Config) -> Result<Self> {
        Self::with_catalog(text, Catalog::standard(), config)
    }

    /// Parse the given text using the given operations catalog.
    pub fn with_catalog(text: &str, catalog: Arc<Catalog>, config: &Config) -> Result<Self> {
        let expr = parse::parse(text, &catalog, config.max_depth)?;
        let complexity = expr.complexity(&catalog);
        let formals = expr.formals(&catalog);
        let formal = formals.join(",");
        debug!(nodes = expr.node_count(), complexity, "parsed expression");

        let mut tree = TreeExpr {
            catalog,
            expr,
            complexity,
            formals,
            formal,
            simplified: None,
        };
        if config.simplify {
            tree.simplify()?;
        }
        Ok(tree)
    }

    /// Compute and cache the simplified form of the tree.
    ///
    /// The complexity and formal string are left as they were computed at construction.
    pub fn simplify(&mut self) -> Result<&str> {
        let expr = simplify::simplify(&self.expr, &self.catalog)?;
        let text = expr.text(&self.catalog);
        debug!(simplified = %text, "simplified expression");
        let simplified = self.simplified.insert(Simplified { expr, text });
        Ok(&simplified.text)
    }

    /// Evaluate the tree against the given sensor readings, returning its first output.
    ///
    /// Fails if a sensor index lies beyond `sensors`; the tree remains usable afterwards.
    /// Operations evaluated outside their domain produce NaN.
    pub fn calculate_expression(&self, sensors: &[f64]) -> Result<f64> {
        let outputs = self.calculate_outputs(sensors)?;
        Ok(outputs.first().cloned().unwrap_or(f64::NAN))
    }

    /// Evaluate every top-level argument of the tree against the given sensor readings.
    pub fn calculate_outputs(&self, sensors: &[f64]) -> Result<Vec<f64>> {
        self.expr.evaluate(&self.catalog, sensors)
    }

    /// The weighted count of operations and leaves, as parsed.
    pub fn complexity(&self) -> u32 {
        self.complexity
    }

    /// The formal string of the tree as parsed. Multiple outputs are separated by `,`.
    pub fn formal(&self) -> &str {
        &self.formal
    }

    /// The formal string of each output, as parsed.
    pub fn formals(&self) -> &[String] {
        &self.formals
    }

    /// Reconstruct the full text, including the `root` wrapper.
    pub fn expanded_text(&self) -> String {
        self.expr.text(&self.catalog)
    }

    /// The text of the simplified tree, if simplification has been performed.
    pub fn simplified_text(&self) -> Option<&str> {
        self.simplified.as_ref().map(|s| s.text.as_str())
    }

    /// The simplified tree, if simplification has been performed.
    pub fn simplified(&self) -> Option<&Expr> {
        self.simplified.as_ref().map(|s| &s.expr)
    }

    /// The tree as parsed.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The operator symbol of an internal node.
    pub fn symbol(&self, node: &Node) -> Option<&str> {
        node.op().map(|op| self.catalog.operation(op).symbol())
    }

    /// Every node in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.expr.nodes()
    }

    /// Every leaf in creation order.
    pub fn leaf_nodes(&self) -> impl Iterator<Item = &Node> {
        self.expr.nodes().filter(|n| n.is_leaf())
    }

    /// Every internal node in creation order.
    pub fn internal_nodes(&self) -> impl Iterator<Item = &Node> {
        self.expr.nodes().filter(|n| !n.is_leaf())
    }
}

impl fmt::Display for TreeExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expanded_text())
    }
}
