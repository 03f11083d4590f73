//! Per-cell outline of a resolved tree
//!
//! Flattens the tree to the nodes a person cares about: one panel per
//! address-bearing node, nested the way the cells reference each other. Nodes
//! without an address are skipped and their address-bearing descendants are lifted
//! into the nearest enclosing panel.

use calc_tree_formula::{NodeKind, SyntaxTreeNode};

/// What a panel shows
#[derive(Debug, Clone, PartialEq)]
pub enum PanelKind {
    /// A literal cell; overrides replace its value
    Input {
        /// Stored value (`None` for placeholders)
        stored: Option<f64>,
    },
    /// A formula cell
    Formula {
        /// Value from the baseline pass, if one has run
        baseline: Option<f64>,
    },
}

/// One cell in the outline
#[derive(Debug, Clone, PartialEq)]
pub struct CellPanel {
    /// Cell address
    pub address: String,
    /// Nesting level, starting at 1 for the outermost panels
    pub depth: usize,
    /// Input or formula
    pub kind: PanelKind,
    /// Panels of the cells this one references
    pub children: Vec<CellPanel>,
}

impl CellPanel {
    /// Visit this panel and all nested panels in depth-first order
    pub fn walk(&self, visit: &mut impl FnMut(&CellPanel)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Build the outline of `tree`
///
/// A tree resolved for a cell has a tagged root, so the result then holds exactly
/// one panel.
pub fn outline(tree: &SyntaxTreeNode) -> Vec<CellPanel> {
    let mut panels = Vec::new();
    collect(tree, 1, &mut panels);
    panels
}

fn collect(node: &SyntaxTreeNode, depth: usize, panels: &mut Vec<CellPanel>) {
    let Some(address) = node.origin() else {
        for child in node.children() {
            collect(child, depth, panels);
        }
        return;
    };

    let kind = match node.kind() {
        NodeKind::Literal(stored) => PanelKind::Input { stored },
        _ => PanelKind::Formula {
            baseline: node.cached_value(),
        },
    };

    let mut children = Vec::new();
    for child in node.children() {
        collect(child, depth + 1, &mut children);
    }

    panels.push(CellPanel {
        address: address.to_string(),
        depth,
        kind,
        children,
    });
}
