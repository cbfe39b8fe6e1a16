use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragTreeError {
    /// Syntax error in the Newick input
    ParseError {
        /// A human-readable message explaining the error
        message: String,
        /// The line number (1-based)
        line: usize,
        /// The column number (1-based)
        column: usize,
        /// The snippet of input where the error occurred
        snippet: String,
    },
    /// A node label is not a molecular formula
    FormulaError(String),
    /// Structurally valid tree that is not a fragmentation tree
    LogicError(String),
}

impl fmt::Display for FragTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragTreeError::ParseError {
                message,
                line,
                column,
                snippet,
            } => {
                write!(
                    f,
                    "Parse error at line {}, column {}:\n{}\nSnippet: \"{}\"",
                    line, column, message, snippet
                )
            }
            FragTreeError::FormulaError(msg) => write!(f, "Formula error: {}", msg),
            FragTreeError::LogicError(msg) => write!(f, "Fragmentation tree error: {}", msg),
        }
    }
}

impl std::error::Error for FragTreeError {}
