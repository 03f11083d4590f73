//! Formula parser
//!
//! A recursive descent parser that expands cell references in place. Whenever a
//! cell address appears where an operand is expected, the parser looks the cell up,
//! tokenizes its content, parses it with a fresh cursor and splices the resulting
//! subtree, tagged with the address, where the reference was.
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! expr    := add
//! add     := mul (("+" | "-") mul)*
//! mul     := unary (("*" | "/") unary)*
//! unary   := "-" primary | primary
//! primary := NUMBER | "(" add ")" | FUNCNAME "(" args ")" | CELLREF
//! args    := add ("," add)*
//! ```

use crate::ast::{BinaryOperator, FunctionName, NodeRef, SyntaxTreeNode};
use crate::error::{FormulaError, FormulaResult};
use crate::lookup::FormulaLookup;
use crate::token::{tokenize, Token};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What to do when the lookup knows nothing about a referenced address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingReference {
    /// Treat the cell as the literal `0` and log a warning
    #[default]
    Zero,
    /// Fail with [`FormulaError::UnresolvedReference`]
    Error,
}

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Maximum nesting of parenthesised groups, function calls, cell references and
    /// operator levels
    ///
    /// Every `+ - * /` step adds a level above the operands before it, so a flat
    /// chain of N operands nests N - 1 levels deep.
    pub max_depth: usize,
    /// Policy for addresses the lookup does not know
    pub missing_reference: MissingReference,
    /// Parse each referenced cell once and share its subtree between all references
    pub share_references: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            missing_reference: MissingReference::Zero,
            share_references: true,
        }
    }
}

/// Resolve the cell at `root_address` into a fully expanded tree with default options
///
/// # Example
/// ```rust
/// use calc_tree_formula::{parse, LookupFn};
///
/// let lookup = LookupFn(|address: &str| match address {
///     "B4" => Some("=B3 * 2".to_string()),
///     "B3" => Some("6".to_string()),
///     _ => None,
/// });
/// let tree = parse("B4", &lookup).unwrap();
/// assert_eq!(tree.origin(), Some("B4"));
/// assert_eq!(tree.evaluate_baseline().unwrap(), 12.0);
/// ```
pub fn parse<L: FormulaLookup + ?Sized>(root_address: &str, lookup: &L) -> FormulaResult<NodeRef> {
    Parser::new(lookup).parse(root_address)
}

/// Operators and punctuation, which never name a cell
const OPERATOR_SYMBOLS: [&str; 7] = ["(", ")", "+", "-", "*", "/", ","];

/// What `primary` accepts, for error messages
const OPERAND: &str = "number, '(', function or cell reference";

/// Position in one cell's token sequence
struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenCursor {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Step over the reserved symbol `symbol` if it is next
    fn consume(&mut self, symbol: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_symbol(symbol)) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Step over the reserved symbol `symbol`, failing if something else is next
    fn expect(&mut self, symbol: &str) -> FormulaResult<()> {
        match self.peek() {
            Some(token) if token.is_symbol(symbol) => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(FormulaError::UnexpectedToken {
                expected: format!("'{}'", symbol),
                found: token.to_string(),
            }),
            None => Err(FormulaError::UnexpectedEnd {
                expected: format!("'{}'", symbol),
            }),
        }
    }

    fn expect_number(&mut self) -> FormulaResult<f64> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            Some(token) => Err(FormulaError::UnexpectedToken {
                expected: "number".into(),
                found: token.to_string(),
            }),
            None => Err(FormulaError::UnexpectedEnd {
                expected: "number".into(),
            }),
        }
    }

    fn expect_end(&self) -> FormulaResult<()> {
        match self.peek() {
            Some(token) => Err(FormulaError::UnexpectedToken {
                expected: "end of input".into(),
                found: token.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Reference-expanding formula parser
///
/// One parser may be reused for several targets; each `parse*` call starts from a
/// clean state.
pub struct Parser<'a, L: ?Sized> {
    lookup: &'a L,
    options: ParserOptions,
    /// Addresses currently being resolved, outermost first
    active: Vec<String>,
    /// Subtrees of cells already resolved during this call
    resolved: AHashMap<String, NodeRef>,
    depth: usize,
}

impl<'a, L: FormulaLookup + ?Sized> Parser<'a, L> {
    /// Create a parser with default options
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            options: ParserOptions::default(),
            active: Vec::new(),
            resolved: AHashMap::new(),
            depth: 0,
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Look up the cell at `root_address` and expand it into a tree tagged with that address
    pub fn parse(&mut self, root_address: &str) -> FormulaResult<NodeRef> {
        self.reset();
        debug!(root = root_address, "resolving cell");
        let tree = self.resolve_cell(root_address)?;
        debug!(
            root = root_address,
            cells = self.resolved.len(),
            "cell resolved"
        );
        Ok(tree)
    }

    /// Parse raw content that belongs to no cell; the root is left untagged
    pub fn parse_content(&mut self, content: &str) -> FormulaResult<NodeRef> {
        self.parse_tokens(tokenize(content)?)
    }

    /// Parse an already tokenized formula; the root is left untagged
    pub fn parse_tokens(&mut self, tokens: Vec<Token>) -> FormulaResult<NodeRef> {
        self.reset();
        self.parse_complete(tokens)
    }

    fn reset(&mut self) {
        self.active.clear();
        self.resolved.clear();
        self.depth = 0;
    }

    /// Parse a whole token sequence, rejecting leftovers
    fn parse_complete(&mut self, tokens: Vec<Token>) -> FormulaResult<NodeRef> {
        let mut cursor = TokenCursor::new(tokens);
        let node = self.parse_additive(&mut cursor)?;
        cursor.expect_end()?;
        Ok(node)
    }

    /// Run `f` one nesting level deeper
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> FormulaResult<T>) -> FormulaResult<T> {
        if self.depth >= self.options.max_depth {
            return Err(FormulaError::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Share a freshly built node, failing when the levels below it and the nesting
    /// around it together exceed the limit
    fn build(&self, node: SyntaxTreeNode) -> FormulaResult<NodeRef> {
        let node = node.into_ref();
        self.check_height(&node)?;
        Ok(node)
    }

    fn check_height(&self, node: &SyntaxTreeNode) -> FormulaResult<()> {
        if self.depth + node.height() > self.options.max_depth {
            return Err(FormulaError::DepthLimitExceeded(self.options.max_depth));
        }
        Ok(())
    }

    // === Cell reference expansion ===

    fn resolve_cell(&mut self, address: &str) -> FormulaResult<NodeRef> {
        if let Some(start) = self.active.iter().position(|a| a == address) {
            let mut cycle: Vec<&str> = self.active[start..].iter().map(String::as_str).collect();
            cycle.push(address);
            return Err(FormulaError::CircularReference(cycle.join(" -> ")));
        }

        if self.options.share_references {
            if let Some(node) = self.resolved.get(address) {
                return Ok(Arc::clone(node));
            }
        }

        let content = match self.lookup.lookup(address) {
            Some(content) => content.into_owned(),
            None => match self.options.missing_reference {
                MissingReference::Zero => {
                    warn!(address, "reference to unknown cell, using 0");
                    "0".to_string()
                }
                MissingReference::Error => {
                    return Err(FormulaError::UnresolvedReference(address.to_string()))
                }
            },
        };

        self.active.push(address.to_string());
        let parsed = self.nested(|parser| {
            let tokens = tokenize(&content)?;
            parser.parse_complete(tokens)
        });
        self.active.pop();

        let node = SyntaxTreeNode::tag(parsed.map_err(|e| e.in_cell(address))?, address);
        self.check_height(&node)?;
        if self.options.share_references {
            self.resolved.insert(address.to_string(), Arc::clone(&node));
        }
        Ok(node)
    }

    // === Expression parsing with precedence ===

    fn parse_additive(&mut self, cursor: &mut TokenCursor) -> FormulaResult<NodeRef> {
        let mut left = self.parse_multiplicative(cursor)?;

        loop {
            let op = if cursor.consume("+") {
                BinaryOperator::Add
            } else if cursor.consume("-") {
                BinaryOperator::Subtract
            } else {
                break;
            };

            let right = self.parse_multiplicative(cursor)?;
            left = self.build(SyntaxTreeNode::binary(op, left, right))?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self, cursor: &mut TokenCursor) -> FormulaResult<NodeRef> {
        let mut left = self.parse_unary(cursor)?;

        loop {
            let op = if cursor.consume("*") {
                BinaryOperator::Multiply
            } else if cursor.consume("/") {
                BinaryOperator::Divide
            } else {
                break;
            };

            let right = self.parse_unary(cursor)?;
            left = self.build(SyntaxTreeNode::binary(op, left, right))?;
        }

        Ok(left)
    }

    /// Prefix minus is sugar for `0 - operand`
    fn parse_unary(&mut self, cursor: &mut TokenCursor) -> FormulaResult<NodeRef> {
        if cursor.consume("-") {
            let operand = self.parse_primary(cursor)?;
            let zero = SyntaxTreeNode::literal(0.0).into_ref();
            return self.build(SyntaxTreeNode::binary(BinaryOperator::Subtract, zero, operand));
        }
        self.parse_primary(cursor)
    }

    fn parse_primary(&mut self, cursor: &mut TokenCursor) -> FormulaResult<NodeRef> {
        let symbol = match cursor.peek() {
            None => {
                return Err(FormulaError::UnexpectedEnd {
                    expected: OPERAND.into(),
                })
            }
            Some(Token::Number(_)) => {
                let value = cursor.expect_number()?;
                return Ok(SyntaxTreeNode::literal(value).into_ref());
            }
            Some(Token::Reserved(symbol)) => symbol.clone(),
        };

        if symbol == "(" {
            cursor.advance();
            return self.nested(|parser| {
                let inner = parser.parse_additive(cursor)?;
                cursor.expect(")")?;
                Ok(inner)
            });
        }

        if let Some(function) = FunctionName::from_name(&symbol) {
            cursor.advance();
            return self.nested(|parser| parser.parse_call(function, cursor));
        }

        if OPERATOR_SYMBOLS.contains(&symbol.as_str()) {
            return Err(FormulaError::UnexpectedToken {
                expected: OPERAND.into(),
                found: symbol,
            });
        }

        if cursor.peek_at(1).is_some_and(|t| t.is_symbol("(")) {
            return Err(FormulaError::UnknownFunction(symbol));
        }

        cursor.advance();
        self.resolve_cell(&symbol)
    }

    fn parse_call(
        &mut self,
        function: FunctionName,
        cursor: &mut TokenCursor,
    ) -> FormulaResult<NodeRef> {
        cursor.expect("(")?;

        let mut args = vec![self.parse_additive(cursor)?];
        while cursor.consume(",") {
            args.push(self.parse_additive(cursor)?);
        }

        cursor.expect(")")?;
        self.build(SyntaxTreeNode::function(function, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::lookup::{LookupFn, NoCells};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn sheet(cells: &[(&str, &str)]) -> HashMap<String, String> {
        cells
            .iter()
            .map(|(a, c)| (a.to_string(), c.to_string()))
            .collect()
    }

    fn r(s: &str) -> Token {
        Token::reserved(s)
    }

    fn n(v: f64) -> Token {
        Token::Number(v)
    }

    fn eval_tokens(tokens: Vec<Token>) -> f64 {
        let tree = Parser::new(&NoCells).parse_tokens(tokens).unwrap();
        tree.evaluate_baseline().unwrap()
    }

    #[test]
    fn test_parse_token_sequences() {
        assert_eq!(eval_tokens(vec![n(1.0), r("+"), n(2.0)]), 3.0);
        assert_eq!(
            eval_tokens(vec![r("("), n(3.0), r("+"), n(4.0), r(")"), r("*"), n(5.0)]),
            35.0
        );
        assert_eq!(
            eval_tokens(vec![n(3.0), r("/"), n(5.0), r("*"), n(10.0)]),
            6.0
        );
        assert_eq!(eval_tokens(vec![r("-"), n(4.0), r("-"), n(5.0)]), -9.0);
        assert_eq!(
            eval_tokens(vec![
                r("SUM"),
                r("("),
                n(1.0),
                r(","),
                r("SUM"),
                r("("),
                n(3.0),
                r(","),
                n(4.0),
                r(")"),
                r(")")
            ]),
            8.0
        );
    }

    #[test]
    fn test_left_associative_fold() {
        // -4-5 parses as (0-4)-5
        let tree = Parser::new(&NoCells).parse_content("=-4-5").unwrap();
        assert_eq!(tree.to_string(), "((0 - 4) - 5)");

        let tree = Parser::new(&NoCells).parse_content("=8/4/2").unwrap();
        assert_eq!(tree.to_string(), "((8 / 4) / 2)");
    }

    #[test]
    fn test_precedence() {
        let tree = Parser::new(&NoCells).parse_content("=1+2*3").unwrap();
        assert_eq!(tree.to_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn test_nested_reference() {
        let cells = sheet(&[("B4", "=B3 * 2"), ("B3", "6")]);
        let tree = parse("B4", &cells).unwrap();

        assert_eq!(tree.to_string(), "B4{(B3{6} * 2)}");
        assert_eq!(tree.evaluate_baseline().unwrap(), 12.0);
    }

    #[test]
    fn test_multiple_references() {
        let cells = sheet(&[("B1", "5"), ("B2", "6"), ("B3", "=1 + 2")]);
        let tree = Parser::new(&cells)
            .parse_content("=(B1 + B2) * B3")
            .unwrap();

        assert_eq!(tree.origin(), None);
        assert_eq!(tree.to_string(), "((B1{5} + B2{6}) * B3{(1 + 2)})");
        assert_eq!(tree.evaluate_baseline().unwrap(), 33.0);
    }

    #[test]
    fn test_range_is_opaque_address() {
        let looked_up = Cell::new(0);
        let lookup = LookupFn(|address: &str| -> Option<String> {
            assert_eq!(address, "A1:A3");
            looked_up.set(looked_up.get() + 1);
            None
        });
        let tree = Parser::new(&lookup).parse_content("=SUM(A1:A3)").unwrap();

        assert_eq!(looked_up.get(), 1);
        assert_eq!(tree.children()[0].origin(), Some("A1:A3"));
        assert_eq!(tree.evaluate_baseline().unwrap(), 0.0);
    }

    #[test]
    fn test_alias_cell_keeps_both_addresses() {
        let cells = sheet(&[("B4", "=B3"), ("B3", "6")]);
        let tree = parse("B4", &cells).unwrap();

        assert_eq!(tree.origin(), Some("B4"));
        assert_eq!(tree.kind(), NodeKind::Function(FunctionName::Sum));
        assert_eq!(tree.children()[0].origin(), Some("B3"));
        assert_eq!(tree.input_addresses(), vec!["B3"]);
        assert_eq!(tree.evaluate_baseline().unwrap(), 6.0);
    }

    #[test]
    fn test_shared_references() {
        let lookups = Cell::new(0);
        let lookup = LookupFn(|address: &str| {
            lookups.set(lookups.get() + 1);
            match address {
                "A1" => Some("=B1 + B1 * C1".to_string()),
                "C1" => Some("=B1".to_string()),
                "B1" => Some("2".to_string()),
                _ => None,
            }
        });

        let tree = parse("A1", &lookup).unwrap();
        assert_eq!(lookups.get(), 3);
        assert_eq!(tree.evaluate_baseline().unwrap(), 6.0);

        let first = &tree.children()[0];
        let product = &tree.children()[1];
        assert!(Arc::ptr_eq(first, &product.children()[0]));
    }

    #[test]
    fn test_unshared_references() {
        let lookups = Cell::new(0);
        let lookup = LookupFn(|address: &str| {
            lookups.set(lookups.get() + 1);
            match address {
                "A1" => Some("=B1 + B1".to_string()),
                "B1" => Some("2".to_string()),
                _ => None,
            }
        });

        let options = ParserOptions {
            share_references: false,
            ..Default::default()
        };
        let tree = Parser::new(&lookup).with_options(options).parse("A1").unwrap();
        assert_eq!(lookups.get(), 3);
        assert!(!Arc::ptr_eq(&tree.children()[0], &tree.children()[1]));
        assert_eq!(tree.children()[0], tree.children()[1]);
        assert_eq!(tree.evaluate_baseline().unwrap(), 4.0);
        assert_eq!(tree.children()[1].cached_value(), Some(2.0));
    }

    #[test]
    fn test_circular_reference() {
        let cells = sheet(&[("A1", "=B1 + 1"), ("B1", "=C1 * 2"), ("C1", "=A1")]);
        assert_eq!(
            parse("A1", &cells),
            Err(FormulaError::CircularReference("A1 -> B1 -> C1 -> A1".into()))
        );

        let cells = sheet(&[("A1", "=A1")]);
        assert_eq!(
            parse("A1", &cells),
            Err(FormulaError::CircularReference("A1 -> A1".into()))
        );
    }

    #[test]
    fn test_diamond_is_not_circular() {
        let cells = sheet(&[("A1", "=B1 + C1"), ("B1", "=D1"), ("C1", "=D1 * 2"), ("D1", "3")]);
        for share_references in [true, false] {
            let options = ParserOptions {
                share_references,
                ..Default::default()
            };
            let tree = Parser::new(&cells).with_options(options).parse("A1").unwrap();
            assert_eq!(tree.evaluate_baseline().unwrap(), 9.0);
        }
    }

    #[test]
    fn test_missing_reference_policy() {
        let cells = sheet(&[("A1", "=Z9 + 1")]);
        let tree = parse("A1", &cells).unwrap();
        assert_eq!(tree.evaluate_baseline().unwrap(), 1.0);

        let options = ParserOptions {
            missing_reference: MissingReference::Error,
            ..Default::default()
        };
        let err = Parser::new(&cells).with_options(options).parse("A1").unwrap_err();
        assert_eq!(
            err,
            FormulaError::InCell {
                address: "A1".into(),
                source: Box::new(FormulaError::UnresolvedReference("Z9".into())),
            }
        );
        assert_eq!(err.root_cause(), &FormulaError::UnresolvedReference("Z9".into()));
    }

    #[test]
    fn test_errors_name_innermost_cell() {
        let cells = sheet(&[("A1", "=B1 * 2"), ("B1", "=C1 + 1"), ("C1", "oops")]);
        assert_eq!(
            parse("A1", &cells),
            Err(FormulaError::InCell {
                address: "C1".into(),
                source: Box::new(FormulaError::MalformedLiteral("oops".into())),
            })
        );
    }

    #[test]
    fn test_expectation_errors() {
        let mut parser = Parser::new(&NoCells);
        assert_eq!(
            parser.parse_content("=(1 + 2"),
            Err(FormulaError::UnexpectedEnd {
                expected: "')'".into()
            })
        );
        assert_eq!(
            parser.parse_content("=SUM 1"),
            Err(FormulaError::UnexpectedToken {
                expected: "'('".into(),
                found: "1".into(),
            })
        );
        assert_eq!(
            parser.parse_content("=1 2"),
            Err(FormulaError::UnexpectedToken {
                expected: "end of input".into(),
                found: "2".into(),
            })
        );
        assert_eq!(
            parser.parse_content("="),
            Err(FormulaError::UnexpectedEnd {
                expected: OPERAND.into()
            })
        );
        assert_eq!(
            parser.parse_content("=1 + * 2"),
            Err(FormulaError::UnexpectedToken {
                expected: OPERAND.into(),
                found: "*".into(),
            })
        );
    }

    #[test]
    fn test_unknown_function() {
        let mut parser = Parser::new(&NoCells);
        assert_eq!(
            parser.parse_content("=MAX(1, 2)"),
            Err(FormulaError::UnknownFunction("MAX".into()))
        );
        assert_eq!(
            parser.parse_content("=SUM(1, sum(2))"),
            Err(FormulaError::UnknownFunction("sum".into()))
        );
    }

    #[test]
    fn test_depth_limit() {
        let options = ParserOptions {
            max_depth: 3,
            ..Default::default()
        };
        let mut parser = Parser::new(&NoCells).with_options(options.clone());
        assert!(parser.parse_content("=((1))").is_ok());
        assert_eq!(
            parser.parse_content("=((((1))))"),
            Err(FormulaError::DepthLimitExceeded(3))
        );

        // Reference chains count toward the same limit
        let cells = sheet(&[("A1", "=A2"), ("A2", "=A3"), ("A3", "=A4"), ("A4", "1")]);
        assert_eq!(
            Parser::new(&cells).with_options(options).parse("A1"),
            Err(FormulaError::DepthLimitExceeded(3))
        );
    }

    #[test]
    fn test_operator_chains_count_toward_depth() {
        let chain = |terms: usize, op: &str| format!("=1{}", format!("{}1", op).repeat(terms - 1));

        let tree = Parser::new(&NoCells).parse_content(&chain(200, "+")).unwrap();
        assert_eq!(tree.height(), 199);
        assert_eq!(tree.evaluate_baseline().unwrap(), 200.0);

        for op in ["+", "-", "*", "/"] {
            assert_eq!(
                Parser::new(&NoCells).parse_content(&chain(10_000, op)),
                Err(FormulaError::DepthLimitExceeded(256))
            );
        }

        let cells = sheet(&[("A1", chain(10_000, "+").as_str())]);
        assert_eq!(parse("A1", &cells), Err(FormulaError::DepthLimitExceeded(256)));

        let options = ParserOptions {
            max_depth: 3,
            ..Default::default()
        };
        let mut parser = Parser::new(&NoCells).with_options(options);
        assert!(parser.parse_content("=1 + 2 - 3 + 4").is_ok());
        assert_eq!(
            parser.parse_content("=1 + 2 - 3 + 4 - 5"),
            Err(FormulaError::DepthLimitExceeded(3))
        );
        // Levels built inside a group add to the group's own nesting
        assert_eq!(
            parser.parse_content("=(1 + 2 - 3 + 4)"),
            Err(FormulaError::DepthLimitExceeded(3))
        );
    }

    #[test]
    fn test_parser_is_reusable() {
        let cells = sheet(&[("A1", "=B1"), ("B1", "=A1"), ("C1", "4")]);
        let mut parser = Parser::new(&cells);
        assert!(parser.parse("A1").is_err());
        assert_eq!(parser.parse("C1").unwrap().evaluate_baseline().unwrap(), 4.0);
    }
}
