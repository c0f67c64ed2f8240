use crate::lexer::SourcePosition;

/// Translation failure. These are module-level validation errors; anything
/// the parsers already reject (stray `break`, unmatched closers) is checked
/// again here so hand-built trees get the same guarantees.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CompileError {
    #[error("{position}: call to undefined subroutine '{name}'")]
    UndefinedProcedure {
        position: SourcePosition,
        name: String,
    },

    #[error("{position}: subroutine '{name}' is defined more than once")]
    DuplicateProcedure {
        position: SourcePosition,
        name: String,
    },

    #[error("{position}: 'break' outside of a loop")]
    BreakOutsideLoop { position: SourcePosition },

    #[error("{position}: 'continue' outside of a loop")]
    ContinueOutsideLoop { position: SourcePosition },

    #[error("{position}: 'return' outside of a subroutine")]
    ReturnOutsideProcedure { position: SourcePosition },

    #[error("label {label} is referenced but never defined")]
    UndefinedLabel { label: usize },

    #[error("{position}: expression node in statement position")]
    ExpressionInStatement { position: SourcePosition },

    #[error("{position}: statement node in expression position")]
    StatementInExpression { position: SourcePosition },

    #[error("{position}: subroutine definitions belong in the program's procedure table")]
    MisplacedDefinition { position: SourcePosition },
}
