//! Formula tokenizer
//!
//! Splits one raw cell content string into [`Token`]s. Content starting with `=` is a
//! formula; anything else must be a plain numeric literal.

use crate::error::{FormulaError, FormulaResult};
use crate::numeric::parse_numeric;
use std::fmt;

/// Characters that end the pending symbol and are emitted as tokens themselves
const PUNCTUATION: [char; 7] = ['(', ')', '+', '-', '*', '/', ','];

/// A lexical unit of a formula
///
/// Tokens carry no position information. Everything that is not a number is an
/// opaque reserved symbol: operators, punctuation, function names, and cell
/// addresses (including range spellings such as `A1:A3`).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Operator, punctuation, function name or cell address
    Reserved(String),
    /// Numeric literal
    Number(f64),
}

impl Token {
    /// Shorthand for a reserved token
    pub fn reserved<S: Into<String>>(symbol: S) -> Self {
        Token::Reserved(symbol.into())
    }

    /// True if this is the reserved symbol `symbol`
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self, Token::Reserved(s) if s == symbol)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Reserved(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Tokenize one raw cell content string
///
/// # Example
/// ```rust
/// use calc_tree_formula::{tokenize, Token};
///
/// let tokens = tokenize("=SUM(A1:A3)").unwrap();
/// assert_eq!(tokens, vec![
///     Token::reserved("SUM"),
///     Token::reserved("("),
///     Token::reserved("A1:A3"),
///     Token::reserved(")"),
/// ]);
///
/// assert_eq!(tokenize("5").unwrap(), vec![Token::Number(5.0)]);
/// assert!(tokenize("hello").is_err());
/// ```
pub fn tokenize(content: &str) -> FormulaResult<Vec<Token>> {
    let Some(formula) = content.strip_prefix('=') else {
        return parse_numeric(content)
            .map(|n| vec![Token::Number(n)])
            .ok_or_else(|| FormulaError::MalformedLiteral(content.to_string()));
    };

    let mut tokens = Vec::new();
    let mut pending = String::new();

    for c in formula.chars() {
        if c == ' ' {
            continue;
        }
        if PUNCTUATION.contains(&c) {
            flush(&mut pending, &mut tokens);
            tokens.push(Token::Reserved(c.to_string()));
            continue;
        }
        pending.push(c);
    }
    flush(&mut pending, &mut tokens);

    Ok(tokens)
}

/// Emit the pending symbol as a number or reserved token, leaving `pending` empty
fn flush(pending: &mut String, tokens: &mut Vec<Token>) {
    if pending.is_empty() {
        return;
    }
    let symbol = std::mem::take(pending);
    match parse_numeric(&symbol) {
        Some(n) => tokens.push(Token::Number(n)),
        None => tokens.push(Token::Reserved(symbol)),
    }
}
