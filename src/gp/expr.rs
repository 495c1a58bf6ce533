//! Items related to expressions.

use crate::error::{Error, Result};
use crate::gp::ops::{Catalog, OpId, ROOT};
use fnv::FnvHashMap;
use petgraph::visit::{EdgeRef, Topo};
use petgraph::{self, Incoming};

/// A node/expression type that can be evaluated to a single value.
pub trait Evaluate<E> {
    /// The type of the value produced by the node type.
    type Value;
    /// Evaluate this node in terms of the given inputs to produce the given value.
    fn evaluate(&self, inputs: &[&Self::Value], env: &E) -> Self::Value;
}

/// Node types that know their number of inputs / arguments.
pub trait Arity {
    /// The number of arguments to the node.
    ///
    /// Internal nodes will return 1 or more. Leaf nodes will return 0.
    fn arity(&self, catalog: &Catalog) -> u32;
}

/// The directed graph type used to represent an expression.
///
/// Each node within the graph is either a leaf or an internal node. Internal nodes have one or
/// more input expressions stored on `Incoming` edges, each weighted by its argument position.
/// Leaves are either constants or sensor references.
pub type DiGraph<N> = petgraph::graph::DiGraph<N, Arg, u32>;

/// The position of an input within the argument list of the node it feeds.
pub type Arg = u32;

/// The node index type used within the expr DiGraph type.
pub type NodeIndex = petgraph::graph::NodeIndex<u32>;

/// A single node of a parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Parenthesis nesting level of the node within the source text.
    pub depth: u32,
    /// Byte offset of the node's first character within the source text.
    pub expr_index: usize,
    /// `0` for leaves, otherwise one more than the deepest input.
    pub subtree_depth: u32,
}

/// The two kinds of expression nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Leaf(Leaf),
    Internal(OpId),
}

/// A constant or sensor reference along with the text it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    arg: String,
    terminal: Terminal,
}

/// The resolved meaning of a leaf.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Terminal {
    /// An index into the sensor vector.
    Sensor(usize),
    Constant(f64),
}

/// A parsed expression: the graph of nodes along with the inputs of the synthetic root.
///
/// Node indices follow creation order, so iterating the graph's nodes yields every node with
/// each input before the node it feeds. The synthetic root has no node of its own.
#[derive(Clone, Debug)]
pub struct Expr {
    graph: DiGraph<Node>,
    roots: Vec<NodeIndex>,
}

// Evaluation environments.

/// Folds a tree into its complexity.
#[derive(Copy, Clone, Debug)]
pub struct Complexity<'a> {
    pub catalog: &'a Catalog,
}

/// Folds a tree into its formal string.
#[derive(Copy, Clone, Debug)]
pub struct Formal<'a> {
    pub catalog: &'a Catalog,
}

/// Folds a tree back into its parenthesized text.
#[derive(Copy, Clone, Debug)]
pub struct Text<'a> {
    pub catalog: &'a Catalog,
}

/// Folds a tree into its numeric value for the given sensor readings.
///
/// Sensor indices must already be checked against `values`.
#[derive(Copy, Clone, Debug)]
pub struct Sensors<'a> {
    pub catalog: &'a Catalog,
    pub values: &'a [f64],
}

/// Evaluate the given expression.
///
/// Nodes are visited in topological order so that every input is evaluated before the node it
/// feeds. Returns the value of every node.
pub fn eval<N, E>(expr: &DiGraph<N>, env: &E) -> FnvHashMap<NodeIndex, N::Value>
where
    N: Evaluate<E>,
{
    let mut topo = Topo::new(expr);
    let mut evaluated = FnvHashMap::with_capacity_and_hasher(expr.node_count(), Default::default());
    while let Some(nx) = topo.next(expr) {
        let value = {
            let inputs = inputs(expr, nx)
                .into_iter()
                .map(|ix| &evaluated[&ix])
                .collect::<Vec<_>>();
            N::evaluate(&expr[nx], &inputs[..], env)
        };
        evaluated.insert(nx, value);
    }
    evaluated
}

/// Like `eval`, but each node's value is moved out of the map once the node it feeds has been
/// evaluated. Only the values of nodes feeding no other node are returned.
///
/// Every node must feed at most one other node, as in a tree.
pub fn fold<N, E>(expr: &DiGraph<N>, env: &E) -> FnvHashMap<NodeIndex, N::Value>
where
    N: Evaluate<E>,
{
    let mut topo = Topo::new(expr);
    let mut evaluated: FnvHashMap<NodeIndex, N::Value> = FnvHashMap::default();
    while let Some(nx) = topo.next(expr) {
        let owned = inputs(expr, nx)
            .into_iter()
            .filter_map(|ix| evaluated.remove(&ix))
            .collect::<Vec<_>>();
        let value = {
            let inputs = owned.iter().collect::<Vec<_>>();
            N::evaluate(&expr[nx], &inputs[..], env)
        };
        evaluated.insert(nx, value);
    }
    evaluated
}

/// The inputs to the node at `nx` ordered by argument position.
pub fn inputs<N>(expr: &DiGraph<N>, nx: NodeIndex) -> Vec<NodeIndex> {
    let mut edges = expr
        .edges_directed(nx, Incoming)
        .map(|e| (*e.weight(), e.source()))
        .collect::<Vec<_>>();
    edges.sort_by_key(|&(arg, _)| arg);
    edges.into_iter().map(|(_, ix)| ix).collect()
}

// Impls.

impl Node {
    pub fn is_leaf(&self) -> bool {
        match self.kind {
            NodeKind::Leaf(_) => true,
            NodeKind::Internal(_) => false,
        }
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        match self.kind {
            NodeKind::Leaf(ref leaf) => Some(leaf),
            NodeKind::Internal(_) => None,
        }
    }

    pub fn op(&self) -> Option<OpId> {
        match self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(op) => Some(op),
        }
    }
}

impl Arity for Node {
    fn arity(&self, catalog: &Catalog) -> u32 {
        match self.kind {
            NodeKind::Leaf(_) => 0,
            NodeKind::Internal(op) => catalog.operation(op).arity(),
        }
    }
}

impl Leaf {
    /// Classify the given text as a sensor (`S` followed by digits) or a constant.
    ///
    /// Returns `None` if the text is neither.
    pub fn parse(arg: &str) -> Option<Self> {
        let terminal = match sensor_index(arg) {
            Some(Ok(ix)) => Terminal::Sensor(ix),
            Some(Err(())) => return None,
            None => Terminal::Constant(arg.parse().ok()?),
        };
        Some(Leaf { arg: arg.to_string(), terminal })
    }

    /// The text the leaf was read from.
    pub fn arg(&self) -> &str {
        &self.arg
    }

    pub fn terminal(&self) -> Terminal {
        self.terminal
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor_index().is_some()
    }

    pub fn sensor_index(&self) -> Option<usize> {
        match self.terminal {
            Terminal::Sensor(ix) => Some(ix),
            Terminal::Constant(_) => None,
        }
    }

    /// The leaf as it appears within a formal string.
    ///
    /// Negative constants are parenthesized so that they survive substitution into operators.
    pub fn formal(&self) -> String {
        if self.arg.starts_with('-') {
            format!("({})", self.arg)
        } else {
            self.arg.clone()
        }
    }
}

/// `Some(Ok(ix))` for a well-formed sensor name, `Some(Err)` for an `S`-digits name too large to
/// index with, `None` for anything else.
fn sensor_index(arg: &str) -> Option<std::result::Result<usize, ()>> {
    let digits = arg.strip_prefix('S')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().map_err(|_| ()))
}

impl Expr {
    /// Assemble an expression from a graph built in creation order.
    pub(crate) fn from_parts(graph: DiGraph<Node>, roots: Vec<NodeIndex>) -> Self {
        Expr { graph, roots }
    }

    pub fn graph(&self) -> &DiGraph<Node> {
        &self.graph
    }

    /// The inputs of the synthetic root, in order.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, nx: NodeIndex) -> &Node {
        &self.graph[nx]
    }

    /// The inputs to the node at `nx` ordered by argument position.
    pub fn inputs(&self, nx: NodeIndex) -> Vec<NodeIndex> {
        inputs(&self.graph, nx)
    }

    /// Every node in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(move |nx| &self.graph[nx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The subtree depth of the synthetic root.
    pub fn subtree_depth(&self) -> u32 {
        1 + self
            .roots
            .iter()
            .map(|&r| self.graph[r].subtree_depth)
            .max()
            .unwrap_or(0)
    }

    /// The number of sensors a vector must hold to evaluate this expression.
    pub fn sensor_count(&self) -> usize {
        self.nodes()
            .filter_map(|n| n.leaf().and_then(Leaf::sensor_index))
            .max()
            .map_or(0, |ix| ix + 1)
    }

    /// The summed complexity of every output, saturating at `u32::MAX`.
    pub fn complexity(&self, catalog: &Catalog) -> u32 {
        let values = eval(&self.graph, &Complexity { catalog });
        self.roots
            .iter()
            .fold(0u32, |acc, r| acc.saturating_add(values[r]))
    }

    /// The formal string of each output.
    pub fn formals(&self, catalog: &Catalog) -> Vec<String> {
        let mut values = fold(&self.graph, &Formal { catalog });
        self.roots
            .iter()
            .map(|r| values.remove(r).unwrap_or_default())
            .collect()
    }

    /// The full parenthesized text, including the synthetic `root` wrapper.
    pub fn text(&self, catalog: &Catalog) -> String {
        let values = fold(&self.graph, &Text { catalog });
        let args = self
            .roots
            .iter()
            .map(|r| values[r].as_str())
            .collect::<Vec<_>>();
        format!("({} {})", ROOT, args.join(" "))
    }

    /// Compute the value of each output for the given sensor readings.
    ///
    /// Fails if any sensor index lies beyond `sensors`. Operations evaluated outside their
    /// domain produce NaN rather than failing.
    pub fn evaluate(&self, catalog: &Catalog, sensors: &[f64]) -> Result<Vec<f64>> {
        let needed = self.sensor_count();
        if needed > sensors.len() {
            return Err(Error::SensorIndexOutOfRange {
                index: needed - 1,
                len: sensors.len(),
            });
        }
        let values = eval(&self.graph, &Sensors { catalog, values: sensors });
        Ok(self.roots.iter().map(|r| values[r]).collect())
    }
}

impl<'a> Evaluate<Complexity<'a>> for Node {
    type Value = u32;
    fn evaluate(&self, inputs: &[&u32], env: &Complexity<'a>) -> u32 {
        match self.kind {
            NodeKind::Leaf(_) => env.catalog.leaf_complexity(),
            NodeKind::Internal(op) => inputs
                .iter()
                .fold(env.catalog.operation(op).complexity(), |acc, c| {
                    acc.saturating_add(**c)
                }),
        }
    }
}

impl<'a> Evaluate<Formal<'a>> for Node {
    type Value = String;
    fn evaluate(&self, inputs: &[&String], env: &Formal<'a>) -> String {
        match self.kind {
            NodeKind::Leaf(ref leaf) => leaf.formal(),
            NodeKind::Internal(op) => {
                let args = inputs.iter().map(|s| s.as_str()).collect::<Vec<_>>();
                env.catalog.operation(op).formal(&args)
            }
        }
    }
}

impl<'a> Evaluate<Text<'a>> for Node {
    type Value = String;
    fn evaluate(&self, inputs: &[&String], env: &Text<'a>) -> String {
        match self.kind {
            NodeKind::Leaf(ref leaf) => leaf.arg.clone(),
            NodeKind::Internal(op) => {
                let mut s = format!("({}", env.catalog.operation(op).symbol());
                for input in inputs {
                    s.push(' ');
                    s.push_str(input);
                }
                s.push(')');
                s
            }
        }
    }
}

impl<'a> Evaluate<Sensors<'a>> for Node {
    type Value = f64;
    fn evaluate(&self, inputs: &[&f64], env: &Sensors<'a>) -> f64 {
        match self.kind {
            NodeKind::Leaf(ref leaf) => match leaf.terminal {
                Terminal::Sensor(ix) => env.values.get(ix).cloned().unwrap_or(f64::NAN),
                Terminal::Constant(c) => c,
            },
            NodeKind::Internal(op) => {
                debug_assert_eq!(inputs.len(), self.arity(env.catalog) as usize);
                let op = env.catalog.operation(op);
                let args = inputs.iter().map(|v| **v).collect::<Vec<_>>();
                op.apply(&args)
            }
        }
    }
}
