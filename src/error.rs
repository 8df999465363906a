use thiserror::Error;

/// A syntax error in a Handlebars source, positioned at the offending tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

/// Errors that abort the transpilation of a template.
#[derive(Error, Debug)]
pub enum TranspileError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Literal interpolation is not implemented: {0}")]
    LiteralInterpolation(String),
    #[error("Partial '{partial}' is passed a context ({context}); Django includes can only add named variables")]
    PartialContext { partial: String, context: String },
}
