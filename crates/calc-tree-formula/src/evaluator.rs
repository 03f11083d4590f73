//! Formula tree evaluator
//!
//! Post-order evaluation with two modes:
//! - **baseline**: no overrides and no result callback. Every node records its value
//!   in its baseline cache.
//! - **override**: literal cells may be replaced by value, and every address-bearing
//!   node reports its value through a callback. The tree is left untouched.

use crate::ast::{BinaryOperator, FunctionName, NodeKind, SyntaxTreeNode};
use crate::error::{FormulaError, FormulaResult};
use crate::numeric::round_to_places;
use ahash::AHashMap;
use tracing::trace;

/// Address → value mapping, used for overrides and per-cell results
pub type ValueMap = AHashMap<String, f64>;

/// Result of an override pass
#[derive(Debug, Clone, PartialEq)]
pub struct Recalculation {
    /// Value of the root node
    pub value: f64,
    /// Value of every address-bearing node visited
    pub cells: ValueMap,
}

/// Evaluate a tree
///
/// `overrides` replaces the value of literal nodes whose origin address it contains.
/// `on_result` is called with `(address, value)` for every address-bearing node
/// visited, the root included. When both are absent this is a baseline pass and
/// each node's baseline cache is filled in.
///
/// # Example
/// ```rust
/// use calc_tree_formula::{evaluate, parse, ValueMap};
/// use std::collections::HashMap;
///
/// let mut cells = HashMap::new();
/// cells.insert("B4".to_string(), "=B3 * 2".to_string());
/// cells.insert("B3".to_string(), "6".to_string());
///
/// let tree = parse("B4", &cells).unwrap();
/// assert_eq!(evaluate(&tree, None, None).unwrap(), 12.0);
///
/// let mut overrides = ValueMap::new();
/// overrides.insert("B3".to_string(), 10.0);
/// let mut seen = Vec::new();
/// let mut record = |address: &str, value: f64| seen.push((address.to_string(), value));
/// assert_eq!(evaluate(&tree, Some(&overrides), Some(&mut record)).unwrap(), 20.0);
/// assert_eq!(seen, vec![("B3".to_string(), 10.0), ("B4".to_string(), 20.0)]);
/// assert_eq!(tree.cached_value(), Some(12.0));
/// ```
pub fn evaluate(
    node: &SyntaxTreeNode,
    overrides: Option<&ValueMap>,
    on_result: Option<&mut dyn FnMut(&str, f64)>,
) -> FormulaResult<f64> {
    let mut pass = EvaluationPass {
        baseline: overrides.is_none() && on_result.is_none(),
        overrides,
        on_result,
        memo: AHashMap::new(),
    };
    pass.eval(node)
}

/// State of one evaluation pass
struct EvaluationPass<'a, 'cb> {
    overrides: Option<&'a ValueMap>,
    on_result: Option<&'cb mut dyn FnMut(&str, f64)>,
    baseline: bool,
    /// Values of address-bearing nodes already computed in this pass, by node identity
    memo: AHashMap<*const SyntaxTreeNode, f64>,
}

impl EvaluationPass<'_, '_> {
    fn eval(&mut self, node: &SyntaxTreeNode) -> FormulaResult<f64> {
        let key = node as *const SyntaxTreeNode;
        if let Some(address) = node.origin() {
            if let Some(&value) = self.memo.get(&key) {
                self.report(address, value);
                return Ok(value);
            }
        }

        let mut values = Vec::with_capacity(node.children().len());
        for child in node.children() {
            values.push(self.eval(child)?);
        }

        let value = match node.kind() {
            NodeKind::Binary(op) => fold(op, &values)?,
            NodeKind::Literal(stored) => self.literal_value(node, stored)?,
            NodeKind::Function(name) => apply_function(name, &values)?,
        };

        if self.baseline {
            node.store_cached(value);
        }
        if let Some(address) = node.origin() {
            self.memo.insert(key, value);
            self.report(address, value);
        }

        Ok(value)
    }

    fn literal_value(&self, node: &SyntaxTreeNode, stored: Option<f64>) -> FormulaResult<f64> {
        let overridden = node
            .origin()
            .and_then(|address| self.overrides.and_then(|o| o.get(address)));

        overridden
            .copied()
            .or(stored)
            .ok_or_else(|| FormulaError::MissingLiteralValue(node.origin().map(str::to_string)))
    }

    fn report(&mut self, address: &str, value: f64) {
        trace!(address, value, "cell evaluated");
        if let Some(callback) = self.on_result.as_mut() {
            callback(address, value);
        }
    }
}

/// Left-fold operands with an arithmetic operator
fn fold(op: BinaryOperator, values: &[f64]) -> FormulaResult<f64> {
    let Some((&first, rest)) = values.split_first() else {
        return Err(FormulaError::ArgumentCount {
            function: op.symbol().to_string(),
            expected: "at least 1".to_string(),
            actual: 0,
        });
    };

    if op == BinaryOperator::Divide && rest.iter().any(|&v| v == 0.0) {
        return Err(FormulaError::DivisionByZero);
    }

    Ok(rest.iter().fold(first, |acc, &v| match op {
        BinaryOperator::Add => acc + v,
        BinaryOperator::Subtract => acc - v,
        BinaryOperator::Multiply => acc * v,
        BinaryOperator::Divide => acc / v,
    }))
}

/// Apply a function to already evaluated arguments
fn apply_function(name: FunctionName, args: &[f64]) -> FormulaResult<f64> {
    name.check_arity(args.len())?;

    let value = match name {
        FunctionName::Sum => args.iter().sum(),
        FunctionName::Average => args.iter().sum::<f64>() / args.len() as f64,
        FunctionName::Round => round_to_places(args[0], args[1]),
    };
    Ok(value)
}

impl SyntaxTreeNode {
    /// Baseline pass: compute the value and fill every node's baseline cache
    pub fn evaluate_baseline(&self) -> FormulaResult<f64> {
        evaluate(self, None, None)
    }

    /// Override pass collecting the value of every address-bearing node
    ///
    /// An empty `overrides` map reproduces the baseline values without touching
    /// the baseline cache.
    pub fn recalculate(&self, overrides: &ValueMap) -> FormulaResult<Recalculation> {
        let mut cells = ValueMap::new();
        let mut collect = |address: &str, value: f64| {
            cells.insert(address.to_string(), value);
        };
        let value = evaluate(self, Some(overrides), Some(&mut collect))?;
        Ok(Recalculation { value, cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeRef;
    use crate::parser::Parser;
    use crate::lookup::NoCells;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn lit(v: f64) -> NodeRef {
        SyntaxTreeNode::literal(v).into_ref()
    }

    fn eval(content: &str) -> FormulaResult<f64> {
        let tree = Parser::new(&NoCells).parse_content(content)?;
        tree.evaluate_baseline()
    }

    fn sheet(cells: &[(&str, &str)]) -> HashMap<String, String> {
        cells
            .iter()
            .map(|(a, c)| (a.to_string(), c.to_string()))
            .collect()
    }

    fn overrides(values: &[(&str, f64)]) -> ValueMap {
        values.iter().map(|(a, v)| (a.to_string(), *v)).collect()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("=1 + 2").unwrap(), 3.0);
        assert_eq!(eval("=(3 + 4) * 5").unwrap(), 35.0);
        assert_eq!(eval("=3 / 5 * 10").unwrap(), 6.0);
        assert_eq!(eval("=-4 - 5").unwrap(), -9.0);
        assert_eq!(eval("=1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval("=10 - 4 - 3").unwrap(), 3.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("=SUM(1, 5, 8)").unwrap(), 14.0);
        assert_eq!(eval("=AVERAGE(3, 12, 15)").unwrap(), 10.0);
        assert_eq!(eval("=SUM(1, SUM(3, 4))").unwrap(), 8.0);
        assert_eq!(eval("=ROUND(123.456, 0)").unwrap(), 123.0);
        assert_eq!(eval("=ROUND(123.456, 1)").unwrap(), 123.5);
        assert_eq!(eval("=ROUND(-123.456, -1)").unwrap(), -120.0);
    }

    #[test]
    fn test_plain_literal() {
        assert_eq!(eval("42").unwrap(), 42.0);
        assert_eq!(eval("-.5").unwrap(), -0.5);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("=1 / 0"), Err(FormulaError::DivisionByZero));
        assert_eq!(eval("=1 / (2 - 2)"), Err(FormulaError::DivisionByZero));
        assert_eq!(eval("=0 / 5").unwrap(), 0.0);
    }

    #[test]
    fn test_round_arity() {
        assert_eq!(
            eval("=ROUND(1.5)"),
            Err(FormulaError::ArgumentCount {
                function: "ROUND".into(),
                expected: "exactly 2".into(),
                actual: 1,
            })
        );
        assert!(eval("=ROUND(1, 2, 3)").is_err());
    }

    #[test]
    fn test_missing_literal_value() {
        let node = SyntaxTreeNode::placeholder("A1");
        assert_eq!(
            node.evaluate_baseline(),
            Err(FormulaError::MissingLiteralValue(Some("A1".into())))
        );

        let result = node.recalculate(&overrides(&[("A1", 4.0)])).unwrap();
        assert_eq!(result.value, 4.0);
    }

    #[test]
    fn test_baseline_fills_cache() {
        let cells = sheet(&[("B4", "=B3 * 2"), ("B3", "6")]);
        let tree = crate::parse("B4", &cells).unwrap();
        assert_eq!(tree.cached_value(), None);

        assert_eq!(tree.evaluate_baseline().unwrap(), 12.0);
        assert_eq!(tree.cached_value(), Some(12.0));
        let b3 = &tree.children()[0];
        assert_eq!(b3.origin(), Some("B3"));
        assert_eq!(b3.cached_value(), Some(6.0));
        assert_eq!(tree.children()[1].cached_value(), Some(2.0));
    }

    #[test]
    fn test_override_pass_leaves_cache() {
        let cells = sheet(&[("B4", "=B3 * 2"), ("B3", "6")]);
        let tree = crate::parse("B4", &cells).unwrap();
        tree.evaluate_baseline().unwrap();

        let result = tree.recalculate(&overrides(&[("B3", 10.0)])).unwrap();
        assert_eq!(result.value, 20.0);
        assert_eq!(result.cells.get("B3"), Some(&10.0));
        assert_eq!(result.cells.get("B4"), Some(&20.0));

        assert_eq!(tree.cached_value(), Some(12.0));
        assert_eq!(tree.children()[0].cached_value(), Some(6.0));
    }

    #[test]
    fn test_concurrent_baseline_passes() {
        let cells = sheet(&[("A1", "=(B1 + B2) * B3"), ("B1", "5"), ("B2", "6"), ("B3", "=1 + 2")]);
        let tree = crate::parse("A1", &cells).unwrap();

        let values: Vec<f64> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..4)
                .map(|_| s.spawn(|| tree.evaluate_baseline().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(values, vec![33.0; 4]);
        assert_eq!(tree.cached_value(), Some(33.0));
        let b3 = &tree.children()[1];
        assert_eq!(b3.origin(), Some("B3"));
        assert_eq!(b3.cached_value(), Some(3.0));
    }

    #[test]
    fn test_override_only_hits_literals() {
        // B3 is a formula cell: overriding it has no effect
        let cells = sheet(&[("B1", "5"), ("B2", "6"), ("B3", "=1 + 2")]);
        let tree = Parser::new(&cells)
            .parse_content("=(B1 + B2) * B3")
            .unwrap();
        assert_eq!(tree.evaluate_baseline().unwrap(), 33.0);

        let result = tree.recalculate(&overrides(&[("B3", 100.0)])).unwrap();
        assert_eq!(result.value, 33.0);

        let result = tree.recalculate(&overrides(&[("B1", 1.0)])).unwrap();
        assert_eq!(result.value, 21.0);
        assert_eq!(result.cells.get("B3"), Some(&3.0));
    }

    #[test]
    fn test_empty_overrides_match_baseline() {
        let cells = sheet(&[("A1", "=ROUND(B1 / 3, 2) + SUM(B1, B2)"), ("B1", "10"), ("B2", "=B1 * 4")]);
        let tree = crate::parse("A1", &cells).unwrap();
        let baseline = tree.evaluate_baseline().unwrap();

        let result = tree.recalculate(&ValueMap::new()).unwrap();
        assert_eq!(result.value, baseline);
        for entry in tree.addressed_nodes() {
            assert_eq!(result.cells.get(entry.address).copied(), entry.node.cached_value());
        }
    }

    #[test]
    fn test_callback_reports_every_occurrence() {
        let cells = sheet(&[("A1", "=B1 + B1"), ("B1", "2")]);
        let tree = crate::parse("A1", &cells).unwrap();

        let mut seen = Vec::new();
        let mut record = |address: &str, value: f64| seen.push((address.to_string(), value));
        let no_overrides = ValueMap::new();
        let value = evaluate(&tree, Some(&no_overrides), Some(&mut record)).unwrap();

        assert_eq!(value, 4.0);
        assert_eq!(
            seen,
            vec![
                ("B1".to_string(), 2.0),
                ("B1".to_string(), 2.0),
                ("A1".to_string(), 4.0),
            ]
        );
    }

    #[test]
    fn test_fold_longer_operand_lists() {
        let add = SyntaxTreeNode::function(FunctionName::Sum, vec![lit(1.0), lit(2.0), lit(3.0)]);
        assert_eq!(add.evaluate_baseline().unwrap(), 6.0);
        assert_eq!(fold(BinaryOperator::Subtract, &[10.0, 1.0, 2.0]).unwrap(), 7.0);
        assert_eq!(fold(BinaryOperator::Divide, &[0.0, 4.0]).unwrap(), 0.0);
        assert_eq!(
            fold(BinaryOperator::Divide, &[8.0, 2.0, 0.0]),
            Err(FormulaError::DivisionByZero)
        );
        assert!(fold(BinaryOperator::Add, &[]).is_err());
    }

    proptest! {
        #[test]
        fn prop_arithmetic_matches_f64(a in -1000i32..1000, b in -1000i32..1000, c in 1i32..1000) {
            let (a, b, c) = (a as f64, b as f64, c as f64);
            let content = format!("=({} + {}) * {} - {} / {}", a, b, c, a, c);
            let tree = Parser::new(&NoCells).parse_content(&content).unwrap();
            prop_assert_eq!(tree.evaluate_baseline().unwrap(), (a + b) * c - a / c);
        }

        #[test]
        fn prop_baseline_is_idempotent(x in 0u32..10_000, y in 1u32..100) {
            let cells = sheet(&[("A1", "=AVERAGE(B1, B2) / B2"), ("B1", &x.to_string()), ("B2", &y.to_string())]);
            let tree = crate::parse("A1", &cells).unwrap();
            let first = tree.evaluate_baseline().unwrap();
            let second = tree.evaluate_baseline().unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(tree.cached_value(), Some(first));
        }

        #[test]
        fn prop_override_changes_only_its_cell(v in -500i32..500) {
            let cells = sheet(&[("A1", "=B1 * 3 + B2"), ("B1", "2"), ("B2", "7")]);
            let tree = crate::parse("A1", &cells).unwrap();
            tree.evaluate_baseline().unwrap();

            let result = tree.recalculate(&overrides(&[("B1", v as f64)])).unwrap();
            prop_assert_eq!(result.value, v as f64 * 3.0 + 7.0);
            prop_assert_eq!(result.cells.get("B2").copied(), Some(7.0));
            prop_assert_eq!(tree.cached_value(), Some(13.0));
        }
    }
}
