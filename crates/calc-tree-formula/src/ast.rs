//! Formula syntax tree
//!
//! A target cell's tree is the full expansion of every formula it transitively
//! references: there is no reference node kind. The root of each referenced cell's
//! parsed content carries that cell's address as its *origin*.

use crate::error::{FormulaError, FormulaResult};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Shared handle to a tree node
///
/// Subtrees of cells referenced more than once may be shared between parents.
pub type NodeRef = Arc<SyntaxTreeNode>;

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    /// Operator symbol as written in formulas
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

/// The closed set of supported spreadsheet functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionName {
    Sum,
    Average,
    Round,
}

impl FunctionName {
    /// Every supported function
    pub const ALL: [FunctionName; 3] = [FunctionName::Sum, FunctionName::Average, FunctionName::Round];

    /// Function name as written in formulas
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionName::Sum => "SUM",
            FunctionName::Average => "AVERAGE",
            FunctionName::Round => "ROUND",
        }
    }

    /// Look up a function by its exact (upper-case) name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Check an argument count against this function's arity
    pub fn check_arity(self, actual: usize) -> FormulaResult<()> {
        let (ok, expected) = match self {
            FunctionName::Sum | FunctionName::Average => (actual >= 1, "at least 1"),
            FunctionName::Round => (actual == 2, "exactly 2"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::ArgumentCount {
                function: self.as_str().to_string(),
                expected: expected.to_string(),
                actual,
            })
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node computes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Left fold of the children with an arithmetic operator
    Binary(BinaryOperator),
    /// Stored value; `None` for a placeholder only resolvable through overrides
    Literal(Option<f64>),
    /// Function applied to the children
    Function(FunctionName),
}

/// A node of the expanded formula tree
///
/// Nodes are immutable once built, except for the baseline cache which a baseline
/// evaluation pass fills in once.
#[derive(Debug)]
pub struct SyntaxTreeNode {
    kind: NodeKind,
    children: Vec<NodeRef>,
    origin: Option<String>,
    /// Operator and function levels below this node; 0 for literals
    height: usize,
    cached: OnceLock<f64>,
}

/// An address-bearing node found by [`SyntaxTreeNode::addressed_nodes`]
#[derive(Debug, Clone, Copy)]
pub struct AddressedNode<'a> {
    /// The cell's address
    pub address: &'a str,
    /// Number of address-bearing ancestors
    pub depth: usize,
    /// The node itself
    pub node: &'a SyntaxTreeNode,
}

impl SyntaxTreeNode {
    fn new(kind: NodeKind, children: Vec<NodeRef>) -> Self {
        let height = children.iter().map(|c| c.height + 1).max().unwrap_or(0);
        Self {
            kind,
            children,
            origin: None,
            height,
            cached: OnceLock::new(),
        }
    }

    /// Numeric literal
    pub fn literal(value: f64) -> Self {
        Self::new(NodeKind::Literal(Some(value)), Vec::new())
    }

    /// Literal with no stored value, tagged with `address`
    ///
    /// Evaluating it fails unless an override supplies a value for the address.
    pub fn placeholder(address: &str) -> Self {
        let mut node = Self::new(NodeKind::Literal(None), Vec::new());
        node.origin = Some(address.to_string());
        node
    }

    /// Arithmetic operation on two operands
    pub fn binary(op: BinaryOperator, left: NodeRef, right: NodeRef) -> Self {
        Self::new(NodeKind::Binary(op), vec![left, right])
    }

    /// Function call
    ///
    /// Arity is not checked here; evaluation rejects a wrong argument count.
    pub fn function(name: FunctionName, args: Vec<NodeRef>) -> Self {
        Self::new(NodeKind::Function(name), args)
    }

    /// Move into a shared handle
    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }

    /// Tag a subtree as the parsed content of the cell at `address`
    ///
    /// An origin address is never overwritten. When the subtree already belongs to
    /// another cell (content like `=B3`), it is wrapped in a single-argument `SUM`
    /// that carries the new address, so both cells stay visible.
    pub fn tag(node: NodeRef, address: &str) -> NodeRef {
        if node.origin.is_some() {
            let mut wrapper = Self::function(FunctionName::Sum, vec![node]);
            wrapper.origin = Some(address.to_string());
            return wrapper.into_ref();
        }

        let mut tagged = Arc::try_unwrap(node).unwrap_or_else(|shared| Self {
            kind: shared.kind,
            children: shared.children.clone(),
            origin: None,
            height: shared.height,
            cached: OnceLock::new(),
        });
        tagged.origin = Some(address.to_string());
        tagged.into_ref()
    }

    /// What this node computes
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Operands or arguments, in order
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Length of the longest path from this node down to a literal
    ///
    /// Every recursive walk of the tree goes this many levels deep.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Address of the cell whose content this node is the root of
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// True for literal nodes
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    /// Value recorded by the last baseline evaluation, if any
    pub fn cached_value(&self) -> Option<f64> {
        self.cached.get().copied()
    }

    pub(crate) fn store_cached(&self, value: f64) {
        // A repeated baseline pass computes the same value, so the first write wins.
        let _ = self.cached.set(value);
    }

    /// Address-bearing nodes in depth-first order
    pub fn addressed_nodes(&self) -> Vec<AddressedNode<'_>> {
        let mut found = Vec::new();
        self.collect_addressed(0, &mut found);
        found
    }

    fn collect_addressed<'a>(&'a self, depth: usize, found: &mut Vec<AddressedNode<'a>>) {
        let child_depth = match self.origin.as_deref() {
            Some(address) => {
                found.push(AddressedNode {
                    address,
                    depth,
                    node: self,
                });
                depth + 1
            }
            None => depth,
        };
        for child in &self.children {
            child.collect_addressed(child_depth, found);
        }
    }

    /// Addresses of literal cells, the ones an override can replace
    ///
    /// Each address appears once, in depth-first order of first occurrence.
    pub fn input_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = Vec::new();
        for entry in self.addressed_nodes() {
            if entry.node.is_literal() && !addresses.iter().any(|a| a == entry.address) {
                addresses.push(entry.address.to_string());
            }
        }
        addresses
    }
}

/// Structural equality: kind, origin and children. The baseline cache is ignored.
impl PartialEq for SyntaxTreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.origin == other.origin && self.children == other.children
    }
}

/// Renders the expanded expression; address-bearing subtrees print as `B3{...}`
impl fmt::Display for SyntaxTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(address) = &self.origin {
            write!(f, "{}{{", address)?;
        }
        match self.kind {
            NodeKind::Literal(Some(value)) => write!(f, "{}", value)?,
            NodeKind::Literal(None) => f.write_str("?")?,
            NodeKind::Binary(op) => {
                f.write_str("(")?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.symbol())?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")?;
            }
            NodeKind::Function(name) => {
                write!(f, "{}(", name)?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")?;
            }
        }
        if self.origin.is_some() {
            f.write_str("}")?;
        }
        Ok(())
    }
}
