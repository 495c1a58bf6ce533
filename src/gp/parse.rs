//! Reading the textual s-expression form into an `Expr`.
//!
//! ```text
//! tree := '(' "root" (ws arg)+ ws? ')'
//! expr := '(' SYMBOL (ws arg)* ws? ')'
//! arg  := expr | leaf
//! leaf := float-literal | 'S' digits
//! ```
//!
//! The parser is a recursive descent over a shared cursor. Nodes are added to the graph as they
//! are completed, so a node's inputs always precede it in the resulting node order.

use crate::error::{Error, Result};
use crate::gp::expr::{DiGraph, Expr, Leaf, Node, NodeIndex, NodeKind};
use crate::gp::ops::{Catalog, ROOT};
use tracing::debug;

/// Parse the given `(root ...)` text using the operations in `catalog`.
///
/// Any node nested more deeply than `max_depth` fails the parse before it is descended into.
pub fn parse(text: &str, catalog: &Catalog, max_depth: u32) -> Result<Expr> {
    let mut parser = Parser {
        src: text,
        pos: 0,
        catalog,
        max_depth,
        graph: DiGraph::default(),
    };
    let result = parser.tree();
    if let Err(ref err) = result {
        debug!(%err, text, "failed to parse expression");
    }
    let roots = result?;
    Ok(Expr::from_parts(parser.graph, roots))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    catalog: &'a Catalog,
    max_depth: u32,
    graph: DiGraph<Node>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).cloned()
    }

    fn skip_ws(&mut self) -> usize {
        let start = self.pos;
        while self.peek().map_or(false, |b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(Error::malformed(
                self.pos,
                format!("expected `{}`, found `{}`", byte as char, b as char),
            )),
            None => Err(self.eof()),
        }
    }

    fn eof(&self) -> Error {
        Error::malformed(self.pos, "unexpected end of input")
    }

    /// Read a token up to the next whitespace or parenthesis.
    fn token(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b'(' || b == b')' {
                break;
            }
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn check_depth(&self, depth: u32, offset: usize) -> Result<()> {
        if depth > self.max_depth {
            Err(Error::DepthExceeded { max: self.max_depth, offset })
        } else {
            Ok(())
        }
    }

    /// Parse the whole text, returning the inputs of the synthetic root.
    fn tree(&mut self) -> Result<Vec<NodeIndex>> {
        self.skip_ws();
        let start = self.pos;
        self.expect(b'(')?;
        if self.token() != ROOT {
            return Err(Error::malformed(start, "expected `(root`"));
        }
        self.check_depth(1, start)?;

        let mut roots = vec![];
        loop {
            let gap = self.skip_ws();
            match self.peek() {
                Some(b')') => break,
                Some(_) if gap == 0 => {
                    return Err(Error::malformed(self.pos, "expected whitespace before argument"))
                }
                Some(_) => roots.push(self.arg(1)?),
                None => return Err(self.eof()),
            }
        }
        if roots.is_empty() {
            return Err(Error::malformed(self.pos, "root has no arguments"));
        }
        self.pos += 1;

        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(Error::malformed(self.pos, "unexpected text after expression"));
        }
        Ok(roots)
    }

    /// Parse an argument of a node at nesting level `level`.
    fn arg(&mut self, level: u32) -> Result<NodeIndex> {
        match self.peek() {
            Some(b'(') => self.internal(level),
            Some(b')') => Err(Error::malformed(self.pos, "unexpected `)`")),
            Some(_) => self.leaf(level),
            None => Err(self.eof()),
        }
    }

    fn leaf(&mut self, level: u32) -> Result<NodeIndex> {
        let offset = self.pos;
        let arg = self.token();
        if arg.is_empty() {
            return Err(Error::malformed(offset, "empty argument"));
        }
        let leaf = Leaf::parse(arg).ok_or_else(|| Error::InvalidConstant {
            text: arg.to_string(),
            offset,
        })?;
        let node = Node {
            kind: NodeKind::Leaf(leaf),
            depth: level,
            expr_index: offset,
            subtree_depth: 0,
        };
        Ok(self.graph.add_node(node))
    }

    /// Parse an internal node whose opening parenthesis sits at the cursor.
    fn internal(&mut self, level: u32) -> Result<NodeIndex> {
        let offset = self.pos;
        let depth = level + 1;
        self.check_depth(depth, offset)?;
        self.expect(b'(')?;

        let symbol = self.token();
        let op = match self.catalog.lookup(symbol) {
            Some(op) => op,
            None if symbol.is_empty() => {
                return Err(Error::malformed(self.pos, "missing operation symbol"))
            }
            None => {
                return Err(Error::UnknownOperation {
                    symbol: symbol.to_string(),
                    offset: offset + 1,
                })
            }
        };
        let arity = self.catalog.operation(op).arity();

        let mut args = Vec::with_capacity(arity as usize);
        loop {
            let gap = self.skip_ws();
            match self.peek() {
                Some(b')') => break,
                Some(_) if gap == 0 => {
                    return Err(Error::malformed(self.pos, "expected whitespace before argument"))
                }
                Some(_) => args.push(self.arg(depth)?),
                None => return Err(self.eof()),
            }
        }
        self.pos += 1;

        if args.len() != arity as usize {
            return Err(Error::ArityMismatch {
                symbol: symbol.to_string(),
                offset,
                expected: arity,
                found: args.len() as u32,
            });
        }

        let subtree_depth = 1 + args
            .iter()
            .map(|&ix| self.graph[ix].subtree_depth)
            .max()
            .unwrap_or(0);
        let nx = self.graph.add_node(Node {
            kind: NodeKind::Internal(op),
            depth,
            expr_index: offset,
            subtree_depth,
        });
        for (i, ix) in args.into_iter().enumerate() {
            self.graph.add_edge(ix, nx, i as u32);
        }
        Ok(nx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_DEPTH;

    fn parse_std(text: &str) -> Result<Expr> {
        parse(text, &Catalog::default(), DEFAULT_MAX_DEPTH)
    }

    #[test]
    fn single_leaf() {
        let expr = parse_std("(root S0)").unwrap();
        assert_eq!(expr.node_count(), 1);
        let leaf = expr.node(expr.roots()[0]);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.depth, 1);
        assert_eq!(leaf.expr_index, 6);
        assert_eq!(leaf.subtree_depth, 0);
    }

    #[test]
    fn creation_order_and_depths() {
        let expr = parse_std("(root (cos (* S0 3.113)))").unwrap();
        let nodes = expr.nodes().collect::<Vec<_>>();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].leaf().unwrap().arg(), "S0");
        assert_eq!(nodes[1].leaf().unwrap().arg(), "3.113");
        assert!(!nodes[2].is_leaf());
        assert!(!nodes[3].is_leaf());
        // cos
        assert_eq!(nodes[3].depth, 2);
        assert_eq!(nodes[3].subtree_depth, 2);
        assert_eq!(nodes[3].expr_index, 6);
        // *
        assert_eq!(nodes[2].depth, 3);
        assert_eq!(nodes[2].subtree_depth, 1);
        assert_eq!(nodes[2].expr_index, 11);
        // leaves sit at the level of their enclosing parentheses
        assert_eq!(nodes[0].depth, 3);
        assert_eq!(nodes[0].expr_index, 14);
        assert_eq!(expr.subtree_depth(), 3);
    }

    #[test]
    fn multiple_roots() {
        let expr = parse_std("(root S0 (sin S1) 2.0)").unwrap();
        assert_eq!(expr.roots().len(), 3);
        assert_eq!(expr.node_count(), 4);
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let catalog = Catalog::default();
        let expr = parse(" (root  (+ S0\t1.5 ) ) ", &catalog, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(expr.text(&catalog), "(root (+ S0 1.5))");
    }

    #[test]
    fn unknown_operation() {
        assert_eq!(
            parse_std("(root (sqrt 4.0))").unwrap_err(),
            Error::UnknownOperation { symbol: "sqrt".into(), offset: 7 }
        );
        match parse_std("(root (root 1.0))").unwrap_err() {
            Error::UnknownOperation { ref symbol, .. } => assert_eq!(symbol, "root"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn arity_is_enforced() {
        assert_eq!(
            parse_std("(root (cos 1.0 2.0))").unwrap_err(),
            Error::ArityMismatch {
                symbol: "cos".into(),
                offset: 6,
                expected: 1,
                found: 2,
            }
        );
        match parse_std("(root (+ 1.0))").unwrap_err() {
            Error::ArityMismatch { expected: 2, found: 1, .. } => (),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn malformed_text() {
        let cases = [
            "",
            "root S0",
            "(tree S0)",
            "(root)",
            "(root S0",
            "(root (cos S0)",
            "(root (cos S0)))",
            "(root S0) S1",
            "(root (cos S0)S1)",
            "(root ())",
        ];
        for text in cases.iter() {
            match parse_std(text) {
                Err(Error::MalformedExpression { .. }) => (),
                other => panic!("{:?} parsed as {:?}", text, other),
            }
        }
    }

    #[test]
    fn invalid_constant() {
        assert_eq!(
            parse_std("(root (cos 1.0.0))").unwrap_err(),
            Error::InvalidConstant { text: "1.0.0".into(), offset: 11 }
        );
    }

    #[test]
    fn depth_ceiling() {
        let catalog = Catalog::default();
        let text = "(root (cos (sin (exp S0))))";
        assert!(parse(text, &catalog, 4).is_ok());
        assert_eq!(
            parse(text, &catalog, 3).unwrap_err(),
            Error::DepthExceeded { max: 3, offset: 16 }
        );
    }

    #[test]
    fn deep_nesting_stops_at_the_ceiling() {
        let n = 100_000;
        let text = format!("(root {}S0{})", "(cos ".repeat(n), ")".repeat(n));
        match parse_std(&text) {
            Err(Error::DepthExceeded { max, offset }) => {
                assert_eq!(max, DEFAULT_MAX_DEPTH);
                assert_eq!(offset, 6 + 5 * DEFAULT_MAX_DEPTH as usize - 5);
            }
            other => panic!("unexpected result: {:?}", other.map(|e| e.node_count())),
        }
    }
}
