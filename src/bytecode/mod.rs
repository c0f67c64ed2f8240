pub mod codec;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod op;

pub use compile::compile;
pub use compile_error::CompileError;
pub use ir::{IrModule, Procedure};
pub use op::{Instr, Opcode};
