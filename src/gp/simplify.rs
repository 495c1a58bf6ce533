//! Bottom-up algebraic simplification.
//!
//! Each internal node is reduced after its inputs. A node whose inputs are all constants is
//! folded into a constant when the result is finite and its arguments lie within the
//! operation's domain. Otherwise the operation's catalog rule, if any, may replace the node
//! with a constant or one of its inputs. Rules must hold for every input, infinities and NaN
//! included, so that the reduced tree evaluates exactly as the original does.
//!
//! The reduced text is parsed into a fresh `Expr`, so the original tree is never touched.

use crate::error::Result;
use crate::gp::expr::{fold, Evaluate, Expr, Node, NodeKind, Terminal};
use crate::gp::ops::{Catalog, OpId, Operand, Rewrite, ROOT};
use crate::gp::parse;
/// Folds a tree into its reduced form.
#[derive(Copy, Clone, Debug)]
pub struct Simplify<'a> {
    pub catalog: &'a Catalog,
}

/// A reduced subtree, in text form.
#[derive(Clone, Debug, PartialEq)]
pub struct Reduced {
    pub shape: Shape,
    pub text: String,
}

/// The outermost node of a reduced subtree.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Constant(f64),
    Sensor(usize),
    Internal(OpId),
}

/// Simplify the given expression into a new one.
pub fn simplify(expr: &Expr, catalog: &Catalog) -> Result<Expr> {
    let text = simplified_text(expr, catalog);
    // Reduction never nests more deeply than its input.
    parse::parse(&text, catalog, expr.subtree_depth() + 1)
}

/// The text of the simplified form of `expr`, including the `root` wrapper.
pub fn simplified_text(expr: &Expr, catalog: &Catalog) -> String {
    let mut reduced = fold(expr.graph(), &Simplify { catalog });
    let args = expr
        .roots()
        .iter()
        .map(|r| reduced.remove(r).map(|r| r.text).unwrap_or_default())
        .collect::<Vec<_>>();
    format!("({} {})", ROOT, args.join(" "))
}

impl Reduced {
    fn constant(value: f64) -> Self {
        Reduced {
            shape: Shape::Constant(value),
            text: format!("{}", value),
        }
    }

    fn operand<'a>(&self, catalog: &'a Catalog) -> Operand<'a> {
        match self.shape {
            Shape::Constant(c) => Operand::Constant(c),
            Shape::Sensor(ix) => Operand::Sensor(ix),
            Shape::Internal(op) => Operand::Function(catalog.operation(op).symbol()),
        }
    }
}

impl<'a> Evaluate<Simplify<'a>> for Node {
    type Value = Reduced;
    fn evaluate(&self, inputs: &[&Reduced], env: &Simplify<'a>) -> Reduced {
        let op = match self.kind {
            NodeKind::Leaf(ref leaf) => {
                let shape = match leaf.terminal() {
                    Terminal::Sensor(ix) => Shape::Sensor(ix),
                    Terminal::Constant(c) => Shape::Constant(c),
                };
                return Reduced {
                    shape,
                    text: leaf.arg().to_string(),
                };
            }
            NodeKind::Internal(op) => op,
        };
        let operation = env.catalog.operation(op);

        // Constant folding.
        let constants = inputs
            .iter()
            .map(|r| match r.shape {
                Shape::Constant(c) => Some(c),
                _ => None,
            })
            .collect::<Option<Vec<f64>>>();
        if let Some(args) = constants {
            if operation.domain().contains(&args) {
                let value = operation.apply(&args);
                if value.is_finite() {
                    return Reduced::constant(value);
                }
            }
        }

        // Identities.
        if let Some(rule) = operation.rule() {
            let operands = inputs
                .iter()
                .map(|r| r.operand(env.catalog))
                .collect::<Vec<_>>();
            match rule(&operands) {
                Some(Rewrite::Constant(c)) => return Reduced::constant(c),
                Some(Rewrite::Input(i)) => {
                    if let Some(r) = inputs.get(i) {
                        return (*r).clone();
                    }
                }
                None => (),
            }
        }

        let mut text = format!("({}", operation.symbol());
        for input in inputs {
            text.push(' ');
            text.push_str(&input.text);
        }
        text.push(')');
        Reduced {
            shape: Shape::Internal(op),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_DEPTH;

    fn simplified(text: &str) -> String {
        let catalog = Catalog::default();
        let expr = parse::parse(text, &catalog, DEFAULT_MAX_DEPTH).unwrap();
        simplified_text(&expr, &catalog)
    }

    #[test]
    fn folds_constants() {
        assert_eq!(simplified("(root (+ (* 2 3) S0))"), "(root (+ 6 S0))");
        assert_eq!(
            simplified("(root (cos 5.046))"),
            format!("(root {})", 5.046f64.cos())
        );
    }

    #[test]
    fn keeps_domain_errors() {
        assert_eq!(simplified("(root (log -2))"), "(root (log -2))");
        assert_eq!(simplified("(root (/ 1 0))"), "(root (/ 1 0))");
        assert_eq!(simplified("(root (exp 1000))"), "(root (exp 1000))");
    }

    #[test]
    fn removes_neutral_operands() {
        assert_eq!(simplified("(root (+ S0 0))"), "(root S0)");
        assert_eq!(simplified("(root (+ 0.0 (sin S1)))"), "(root (sin S1))");
        assert_eq!(simplified("(root (- S0 0))"), "(root S0)");
        assert_eq!(simplified("(root (- 0 S0))"), "(root (- 0 S0))");
        assert_eq!(simplified("(root (* 1.0 (cos S1)))"), "(root (cos S1))");
        assert_eq!(simplified("(root (/ S2 1))"), "(root S2)");
        assert_eq!(simplified("(root (/ S2 0))"), "(root (/ S2 0))");
    }

    #[test]
    fn keeps_inverse_pairs() {
        // exp overflows and log rejects non-positive input, so neither pair cancels.
        assert_eq!(simplified("(root (log (exp S0)))"), "(root (log (exp S0)))");
        assert_eq!(simplified("(root (exp (log S0)))"), "(root (exp (log S0)))");
        assert_eq!(simplified("(root (log (exp (* 1 S0))))"), "(root (log (exp S0)))");
    }

    #[test]
    fn rewrites_cascade_upwards() {
        assert_eq!(simplified("(root (* (+ S0 (- 2 2)) (/ 3 3)))"), "(root S0)");
        assert_eq!(simplified("(root S0 (+ 1 1))"), "(root S0 2)");
    }

    #[test]
    fn idempotent() {
        let catalog = Catalog::default();
        let texts = [
            "(root (cos (* (+ (* -1.912 -9.178) (cos S0)) 3.113)))",
            "(root (log (/ (* (sin 4.37) (- -8.815 -3.902)) (log (+ 2.025 -8.685)))))",
            "(root (+ (log (exp S1)) (* S0 1)))",
            "(root (/ S0 (- S1 S1)))",
        ];
        for text in texts.iter() {
            let parsed = parse::parse(text, &catalog, DEFAULT_MAX_DEPTH).unwrap();
            let once = simplify(&parsed, &catalog).unwrap();
            let twice = simplify(&once, &catalog).unwrap();
            assert_eq!(once.text(&catalog), twice.text(&catalog));
            assert_eq!(once.node_count(), twice.node_count());
        }
    }

    #[test]
    fn reparse_allows_the_input_depth() {
        let catalog = Catalog::default();
        let n = DEFAULT_MAX_DEPTH as usize + 100;
        let text = format!("(root {}(+ S0 0){})", "(cos ".repeat(n), ")".repeat(n));
        let expr = parse::parse(&text, &catalog, n as u32 + 2).unwrap();
        let simple = simplify(&expr, &catalog).unwrap();
        assert_eq!(simple.node_count(), n + 1);
        assert_eq!(simple.subtree_depth(), n as u32);
    }

    #[test]
    fn result_is_a_fresh_tree() {
        let catalog = Catalog::default();
        let expr = parse::parse("(root (+ (cos S0) 0))", &catalog, DEFAULT_MAX_DEPTH).unwrap();
        let simple = simplify(&expr, &catalog).unwrap();
        assert_eq!(expr.node_count(), 4);
        assert_eq!(simple.node_count(), 2);
        assert_eq!(simple.node(simple.roots()[0]).depth, 2);
        assert_eq!(simple.node(simple.roots()[0]).expr_index, 6);
        assert_eq!(expr.text(&catalog), "(root (+ (cos S0) 0))");
    }
}
