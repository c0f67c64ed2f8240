use crate::lexer::SourcePosition;
use crate::runtime::host::HostError;

/// Interpreter failure. Every variant carries the source position of the
/// statement whose instruction raised it; the interpreter's state stays
/// inspectable afterwards but execution never resumes.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("{position}: operand stack underflow")]
    StackUnderflow { position: SourcePosition },

    #[error("{position}: division by zero")]
    DivisionByZero { position: SourcePosition },

    #[error("{position}: {message}")]
    InvalidOperand {
        position: SourcePosition,
        message: String,
    },

    #[error("{position}: unknown function '{name}'")]
    UnknownFunction {
        position: SourcePosition,
        name: String,
    },

    #[error("{position}: 'return' outside of a subroutine")]
    ReturnOutsideProcedure { position: SourcePosition },

    #[error("{position}: syscall failed: {host}")]
    Syscall {
        position: SourcePosition,
        #[source]
        host: HostError,
    },

    #[error("{position}: execution cancelled")]
    Cancelled { position: SourcePosition },

    #[error("{position}: call depth limit exceeded ({limit})")]
    CallDepthExceeded {
        position: SourcePosition,
        limit: usize,
    },

    #[error("{position}: operand stack limit exceeded ({limit})")]
    StackLimitExceeded {
        position: SourcePosition,
        limit: usize,
    },

    /// The module is malformed (e.g. a syscall with an unknown kind code,
    /// or an argument word outside a block). Translation never produces
    /// such modules; decoded or hand-built ones might.
    #[error("{position}: malformed module: {message}")]
    MalformedModule {
        position: SourcePosition,
        message: String,
    },
}

impl RuntimeError {
    pub fn position(&self) -> &SourcePosition {
        match self {
            RuntimeError::StackUnderflow { position }
            | RuntimeError::DivisionByZero { position }
            | RuntimeError::InvalidOperand { position, .. }
            | RuntimeError::UnknownFunction { position, .. }
            | RuntimeError::ReturnOutsideProcedure { position }
            | RuntimeError::Syscall { position, .. }
            | RuntimeError::Cancelled { position }
            | RuntimeError::CallDepthExceeded { position, .. }
            | RuntimeError::StackLimitExceeded { position, .. }
            | RuntimeError::MalformedModule { position, .. } => position,
        }
    }
}
