pub mod functions;
pub mod host;
pub mod runtime_error;
pub mod scope;
pub mod value;
pub mod vm;

pub use host::{BlockWords, Host, HostError, RecordingHost, SyscallKind, SyscallRecord};
pub use runtime_error::RuntimeError;
pub use scope::{ScopeStack, SystemScope};
pub use value::Value;
pub use vm::{ExecutionState, Interpreter, RuntimeConfig};
