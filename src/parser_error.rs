use crate::lexer::SourcePosition;

/// A parsing error: an unexpected token, an unmatched o-code opener, or a
/// statement used outside its valid context.
///
/// The position is the offending token's where possible; errors at end of
/// input reuse the last consumed token's position so locations are never
/// missing.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: SourcePosition,
    pub message: String,
}

impl ParseError {
    pub fn new(position: SourcePosition, message: impl Into<String>) -> Self {
        ParseError {
            position,
            message: message.into(),
        }
    }
}
