//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula tokenizing, parsing or evaluation
///
/// Every variant is fatal to the call that produced it: no partial tree and no
/// partial result is ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    // === Parse errors ===
    /// Content that is neither a formula nor a plain number
    #[error("Malformed literal: {0:?} is neither a formula nor a number")]
    MalformedLiteral(String),

    /// A specific terminal was required but another token was found
    #[error("Expected {expected}, got {found}")]
    UnexpectedToken { expected: String, found: String },

    /// A specific terminal was required but the input ran out
    #[error("Expected {expected}, got end of input")]
    UnexpectedEnd { expected: String },

    /// Circular reference, with the cycle spelled out
    #[error("Circular reference: {0}")]
    CircularReference(String),

    /// Nesting of groups, calls and references went deeper than allowed
    #[error("Nesting depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    /// Lookup found nothing for an address
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A parse error inside a referenced cell's content
    #[error("In cell {address}: {source}")]
    InCell {
        address: String,
        #[source]
        source: Box<FormulaError>,
    },

    // === Evaluation errors ===
    /// Literal with neither a stored value nor an override
    #[error("Literal has no value{}", .0.as_deref().map(|a| format!(" (cell {})", a)).unwrap_or_default())]
    MissingLiteralValue(Option<String>),

    /// Zero divisor
    #[error("Division by zero")]
    DivisionByZero,

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },
}

impl FormulaError {
    /// Attach the cell whose content produced this error
    ///
    /// Errors already attributed to a (deeper) cell keep that attribution.
    pub fn in_cell(self, address: &str) -> Self {
        match self {
            err @ FormulaError::InCell { .. } => err,
            err @ FormulaError::CircularReference(_) => err,
            err @ FormulaError::DepthLimitExceeded(_) => err,
            other => FormulaError::InCell {
                address: address.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Strip any cell attribution
    pub fn root_cause(&self) -> &FormulaError {
        match self {
            FormulaError::InCell { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
