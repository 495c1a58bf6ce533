//! The operations catalog: every operator symbol an expression may use.
//!
//! Each `Operation` knows its arity, its structural weight, how to render itself as a formal
//! string, how to compute itself and, optionally, how to simplify itself. A `Catalog` is
//! validated once on construction and then only looked up by symbol.

use crate::error::CatalogError;
use fnv::FnvHashMap;
use lazy_static::lazy_static;
use std::fmt;
use std::sync::Arc;

/// The symbol of the synthetic root wrapping every expression.
pub const ROOT: &str = "root";

/// The highest arity an operation may declare.
pub const MAX_ARITY: u32 = 2;

lazy_static! {
    static ref STANDARD: Arc<Catalog> = Arc::new(Catalog::default());
}

/// Identifies an operation within the `Catalog` that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(usize);

/// The arguments for which an operation is mathematically defined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    /// Defined everywhere.
    Real,
    /// The argument at the given position must be strictly positive.
    Positive(usize),
    /// The argument at the given position must not be zero.
    NonZero(usize),
}

/// A view of a reduced input, handed to simplification rules.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Operand<'a> {
    Constant(f64),
    Sensor(usize),
    /// An internal node, by operator symbol.
    Function(&'a str),
}

/// The result of a simplification rule.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Rewrite {
    /// Replace the node with a constant.
    Constant(f64),
    /// Replace the node with its input at the given position.
    Input(usize),
}

/// An algebraic identity applied to a node whose inputs are already simplified.
///
/// A rule must preserve the node's value for every input, including infinities and NaN.
pub type Rule = fn(&[Operand]) -> Option<Rewrite>;

/// A catalog entry.
#[derive(Clone)]
pub struct Operation {
    symbol: String,
    arity: u32,
    complexity: u32,
    template: Template,
    function: fn(&[f64]) -> f64,
    domain: Domain,
    rule: Option<Rule>,
}

/// A parsed formal template such as `(arg1 + arg2)`.
#[derive(Clone, Debug, PartialEq)]
struct Template {
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Text(String),
    /// Zero-based argument position.
    Arg(usize),
}

/// A validated table of operations keyed by symbol.
#[derive(Clone, Debug)]
pub struct Catalog {
    operations: Vec<Operation>,
    by_symbol: FnvHashMap<String, OpId>,
    leaf_complexity: u32,
}

// Impls.

impl Domain {
    /// Whether the given arguments lie within the domain.
    pub fn contains(&self, args: &[f64]) -> bool {
        match *self {
            Domain::Real => true,
            Domain::Positive(i) => args.get(i).map_or(false, |&x| x > 0.0),
            Domain::NonZero(i) => args.get(i).map_or(false, |&x| x != 0.0),
        }
    }
}

impl Operation {
    /// Describe a new operation.
    ///
    /// The `template` refers to the rendered inputs as `arg1`, `arg2`, ... and must mention
    /// each of them at least once.
    pub fn new<S>(
        symbol: S,
        arity: u32,
        complexity: u32,
        template: &str,
        function: fn(&[f64]) -> f64,
    ) -> Result<Self, CatalogError>
    where
        S: Into<String>,
    {
        let symbol = symbol.into();
        if symbol.is_empty()
            || symbol.chars().any(|c| c.is_whitespace() || c == '(' || c == ')')
        {
            return Err(CatalogError::InvalidSymbol(symbol));
        }
        if symbol == ROOT {
            return Err(CatalogError::ReservedSymbol(symbol));
        }
        if arity == 0 || arity > MAX_ARITY {
            return Err(CatalogError::InvalidArity { symbol, arity });
        }
        let template = match Template::parse(template, arity) {
            Ok(t) => t,
            Err(reason) => return Err(CatalogError::TemplateMismatch { symbol, arity, reason }),
        };
        Ok(Operation {
            symbol,
            arity,
            complexity,
            template,
            function,
            domain: Domain::Real,
            rule: None,
        })
    }

    /// The same operation, returning NaN outside the given domain.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// The same operation, simplified with the given rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn arity(&self) -> u32 {
        self.arity
    }

    /// The structural weight added by each occurrence of this operation.
    pub fn complexity(&self) -> u32 {
        self.complexity
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn rule(&self) -> Option<Rule> {
        self.rule
    }

    /// Compute the operation, yielding NaN for arguments outside its domain.
    pub fn apply(&self, args: &[f64]) -> f64 {
        if self.domain.contains(args) {
            (self.function)(args)
        } else {
            f64::NAN
        }
    }

    /// Substitute the given rendered inputs into the formal template.
    pub fn formal(&self, args: &[&str]) -> String {
        let mut s = String::new();
        for seg in &self.template.segments {
            match *seg {
                Segment::Text(ref t) => s.push_str(t),
                Segment::Arg(i) => s.push_str(args.get(i).map_or("", |a| *a)),
            }
        }
        s
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Operation")
            .field("symbol", &self.symbol)
            .field("arity", &self.arity)
            .field("complexity", &self.complexity)
            .field("domain", &self.domain)
            .field("rule", &self.rule.is_some())
            .finish()
    }
}

impl Template {
    /// Split a template at its `argN` placeholders, checking them against `arity`.
    fn parse(s: &str, arity: u32) -> Result<Self, String> {
        let mut segments = vec![];
        let mut seen = vec![false; arity as usize];
        let mut text = String::new();
        let mut rest = s;
        while let Some(pos) = rest.find("arg") {
            let digits = rest[pos + 3..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if digits == 0 {
                text.push_str(&rest[..pos + 3]);
                rest = &rest[pos + 3..];
                continue;
            }
            let n: usize = rest[pos + 3..pos + 3 + digits]
                .parse()
                .map_err(|_| format!("invalid placeholder in `{}`", s))?;
            if n == 0 || n > arity as usize {
                return Err(format!("placeholder arg{} out of range", n));
            }
            seen[n - 1] = true;
            text.push_str(&rest[..pos]);
            if !text.is_empty() {
                segments.push(Segment::Text(text.split_off(0)));
            }
            segments.push(Segment::Arg(n - 1));
            rest = &rest[pos + 3 + digits..];
        }
        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(format!("placeholder arg{} is never used", missing + 1));
        }
        Ok(Template { segments })
    }
}

impl Catalog {
    /// Validate and index the given operations.
    pub fn new<I>(operations: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = Operation>,
    {
        let operations: Vec<Operation> = operations.into_iter().collect();
        let mut by_symbol =
            FnvHashMap::with_capacity_and_hasher(operations.len(), Default::default());
        for (i, op) in operations.iter().enumerate() {
            if by_symbol.insert(op.symbol.clone(), OpId(i)).is_some() {
                return Err(CatalogError::DuplicateSymbol(op.symbol.clone()));
            }
        }
        Ok(Catalog {
            operations,
            by_symbol,
            leaf_complexity: 1,
        })
    }

    /// The shared standard catalog.
    pub fn standard() -> Arc<Catalog> {
        STANDARD.clone()
    }

    /// The same catalog, weighting each constant or sensor leaf as given.
    pub fn with_leaf_complexity(mut self, complexity: u32) -> Self {
        self.leaf_complexity = complexity;
        self
    }

    /// The weight of a single constant or sensor leaf.
    pub fn leaf_complexity(&self) -> u32 {
        self.leaf_complexity
    }

    /// Look up an operation by symbol.
    pub fn lookup(&self, symbol: &str) -> Option<OpId> {
        self.by_symbol.get(symbol).cloned()
    }

    /// The operation with the given id.
    ///
    /// Panics if `id` was produced by another catalog with fewer operations.
    pub fn operation(&self, id: OpId) -> &Operation {
        &self.operations[id.0]
    }

    /// Look up an operation by symbol, returning the entry itself.
    pub fn get(&self, symbol: &str) -> Option<&Operation> {
        self.lookup(symbol).map(|id| self.operation(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for Catalog {
    /// The standard arithmetic and transcendental operations.
    fn default() -> Self {
        standard::operations()
            .and_then(Catalog::new)
            .expect("the standard catalog must be valid")
    }
}

/// The standard operations and their simplification rules.
pub mod standard {
    use super::{Domain, Operand, Operation, Rewrite};
    use crate::error::CatalogError;

    /// Build the standard operation table.
    pub fn operations() -> Result<Vec<Operation>, CatalogError> {
        let table = vec![
            Operation::new("+", 2, 1, "(arg1 + arg2)", |a| a[0] + a[1])
                .map(|op| op.with_rule(add)),
            Operation::new("-", 2, 1, "(arg1 - arg2)", |a| a[0] - a[1])
                .map(|op| op.with_rule(sub)),
            Operation::new("*", 2, 1, "(arg1 .* arg2)", |a| a[0] * a[1])
                .map(|op| op.with_rule(mul)),
            Operation::new("/", 2, 1, "(my_div(arg1,arg2))", |a| a[0] / a[1])
                .map(|op| op.with_domain(Domain::NonZero(1)).with_rule(div)),
            Operation::new("sin", 1, 3, "sin(arg1)", |a| a[0].sin()),
            Operation::new("cos", 1, 3, "cos(arg1)", |a| a[0].cos()),
            Operation::new("log", 1, 5, "my_log(arg1)", |a| a[0].ln())
                .map(|op| op.with_domain(Domain::Positive(0))),
            Operation::new("exp", 1, 5, "exp(arg1)", |a| a[0].exp()),
            Operation::new("tanh", 1, 5, "tanh(arg1)", |a| a[0].tanh()),
        ];
        table.into_iter().collect()
    }

    fn is_const(operand: &Operand, value: f64) -> bool {
        match *operand {
            Operand::Constant(c) => c == value,
            _ => false,
        }
    }

    /// `0 + x` and `x + 0` reduce to `x`.
    pub fn add(args: &[Operand]) -> Option<Rewrite> {
        if is_const(&args[0], 0.0) {
            Some(Rewrite::Input(1))
        } else if is_const(&args[1], 0.0) {
            Some(Rewrite::Input(0))
        } else {
            None
        }
    }

    /// `x - 0` reduces to `x`.
    pub fn sub(args: &[Operand]) -> Option<Rewrite> {
        if is_const(&args[1], 0.0) {
            Some(Rewrite::Input(0))
        } else {
            None
        }
    }

    /// `1 * x` and `x * 1` reduce to `x`.
    pub fn mul(args: &[Operand]) -> Option<Rewrite> {
        if is_const(&args[0], 1.0) {
            Some(Rewrite::Input(1))
        } else if is_const(&args[1], 1.0) {
            Some(Rewrite::Input(0))
        } else {
            None
        }
    }

    /// `x / 1` reduces to `x`.
    pub fn div(args: &[Operand]) -> Option<Rewrite> {
        if is_const(&args[1], 1.0) {
            Some(Rewrite::Input(0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neg(a: &[f64]) -> f64 {
        -a[0]
    }

    #[test]
    fn standard_table() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 9);
        let cos = catalog.get("cos").unwrap();
        assert_eq!(cos.arity(), 1);
        assert_eq!(cos.complexity(), 3);
        assert_eq!(catalog.get("log").unwrap().complexity(), 5);
        assert_eq!(catalog.get("/").unwrap().arity(), 2);
        assert!(catalog.get(ROOT).is_none());
        assert!(catalog.lookup("sqrt").is_none());
        assert_eq!(catalog.leaf_complexity(), 1);
    }

    #[test]
    fn templates_render() {
        let catalog = Catalog::default();
        assert_eq!(catalog.get("*").unwrap().formal(&["a", "b"]), "(a .* b)");
        assert_eq!(catalog.get("/").unwrap().formal(&["a", "b"]), "(my_div(a,b))");
        assert_eq!(catalog.get("log").unwrap().formal(&["x"]), "my_log(x)");
    }

    #[test]
    fn domains_yield_nan() {
        let catalog = Catalog::default();
        assert!(catalog.get("log").unwrap().apply(&[0.0]).is_nan());
        assert!(catalog.get("log").unwrap().apply(&[-1.0]).is_nan());
        assert!(catalog.get("/").unwrap().apply(&[1.0, 0.0]).is_nan());
        assert_eq!(catalog.get("/").unwrap().apply(&[1.0, 4.0]), 0.25);
        assert_eq!(catalog.get("-").unwrap().apply(&[5.0, 3.0]), 2.0);
    }

    #[test]
    fn rejects_template_mismatch() {
        let err = Operation::new("neg", 1, 1, "-(arg2)", neg).unwrap_err();
        match err {
            CatalogError::TemplateMismatch { ref symbol, arity: 1, .. } => {
                assert_eq!(symbol, "neg")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(Operation::new("neg", 2, 1, "-(arg1)", neg).is_err());
    }

    #[test]
    fn rejects_bad_symbols_and_arities() {
        assert_eq!(
            Operation::new("root", 1, 1, "r(arg1)", neg).unwrap_err(),
            CatalogError::ReservedSymbol("root".into())
        );
        assert_eq!(
            Operation::new("a b", 1, 1, "f(arg1)", neg).unwrap_err(),
            CatalogError::InvalidSymbol("a b".into())
        );
        assert_eq!(
            Operation::new("if", 3, 1, "if(arg1,arg2,arg3)", neg).unwrap_err(),
            CatalogError::InvalidArity { symbol: "if".into(), arity: 3 }
        );
    }

    #[test]
    fn rejects_duplicates() {
        let a = Operation::new("neg", 1, 1, "(-arg1)", neg).unwrap();
        let err = Catalog::new(vec![a.clone(), a]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateSymbol("neg".into()));
    }

    #[test]
    fn template_keeps_plain_text() {
        let op = Operation::new("f", 1, 1, "argmax(arg1)", neg).unwrap();
        assert_eq!(op.formal(&["x"]), "argmax(x)");
    }

    #[test]
    fn standard_is_shared() {
        let a = Catalog::standard();
        let b = Catalog::standard();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn rules() {
        use self::standard::*;
        let x = Operand::Sensor(0);
        assert_eq!(add(&[Operand::Constant(0.0), x]), Some(Rewrite::Input(1)));
        assert_eq!(sub(&[Operand::Constant(0.0), x]), None);
        assert_eq!(mul(&[x, Operand::Constant(1.0)]), Some(Rewrite::Input(0)));
        assert_eq!(div(&[Operand::Constant(1.0), x]), None);
        assert_eq!(
            add(&[Operand::Function("exp"), Operand::Constant(0.0)]),
            Some(Rewrite::Input(0))
        );
        assert!(Catalog::default().get("log").unwrap().rule().is_none());
    }
}
