use crate::bytecode::compile_error::CompileError;
use crate::lexer::LexicalError;
use crate::parser_error::ParseError;
use crate::runtime::runtime_error::RuntimeError;

/// Any failure of the compile-and-execute pipeline. Each stage keeps its
/// own error type; this wraps them for callers driving the whole chain.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
