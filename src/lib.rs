//! A G-code compilation and execution library.
//!
//! Source programs in either the LinuxCNC dialect (with o-code control
//! flow, subroutines and named parameters) or plain RS-274 are scanned,
//! parsed and translated into a compact linear IR, which a stack-based
//! interpreter executes by raising one syscall per executable block to a
//! host implementing [`runtime::Host`].
//!
//! ```no_run
//! use gcvm::lexer::Dialect;
//! use gcvm::runtime::{Interpreter, RecordingHost};
//!
//! let module = gcvm::compile("part", "G1 X10 Y20 F100", Dialect::LinuxCnc).unwrap();
//! let mut vm = Interpreter::new(&module, RecordingHost::new());
//! vm.execute().unwrap();
//! for call in &vm.host().calls {
//!     println!("{:?} {}", call.kind, call.value);
//! }
//! ```
//!
//! Compiled modules are immutable; they can be shared between interpreter
//! instances, listed with [`bytecode::disasm`], and serialized with
//! [`bytecode::codec`].

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod runtime;
pub mod token;

pub use error::Error;

use bytecode::IrModule;
use lexer::Dialect;

/// Compiles a source program down to an IR module.
///
/// The pipeline is transactional: a failure in any stage yields no
/// partial module.
pub fn compile(tag: &str, source: &str, dialect: Dialect) -> Result<IrModule, Error> {
    let program = parser::parse(tag, source, dialect)?;
    Ok(bytecode::compile(&program)?)
}
