//! The IR interpreter.
//!
//! A single fetch/execute loop over an immutable module: instruction
//! pointer, operand stack, call stack of activation frames, and the two
//! parameter scope stacks. Syscalls run synchronously on the calling
//! thread; the stop flag is checked before every fetch, so cancellation is
//! deterministic with respect to syscalls already raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bytecode::ir::IrModule;
use crate::bytecode::op::Opcode;
use crate::lexer::SourcePosition;
use crate::runtime::functions::FunctionTable;
use crate::runtime::host::{BlockWords, Host, SyscallKind};
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::scope::ScopeStack;
use crate::runtime::value::{self, Comparison, LogicOp, Value, ValueError};

/// Execution limits. Programs hitting a limit fail with a runtime error;
/// state stays inspectable.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub max_call_depth: usize,
    pub max_operand_stack: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_call_depth: 1000,
            max_operand_stack: 10_000,
        }
    }
}

/// Read-only snapshot of the interpreter's position, for progress
/// reporting and post-mortem inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionState {
    pub ip: usize,
    pub operand_depth: usize,
    pub frame_depth: usize,
}

/// An activation record: where to return to and how deep the scope and
/// operand stacks were at call time.
struct Frame {
    return_ip: usize,
    numbered_depth: usize,
    named_depth: usize,
    watermark: usize,
}

pub struct Interpreter<'m, H: Host> {
    module: &'m IrModule,
    host: H,
    config: RuntimeConfig,
    functions: FunctionTable,
    ip: usize,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    numbered: ScopeStack<u16>,
    named: ScopeStack<String>,
    /// Open scratch scopes for in-flight blocks (Prologue..Syscall).
    scratch: Vec<BlockWords>,
    /// Arguments popped by `Call`, waiting for the procedure's `PushScope`
    /// to bind them into numbered parameters 1..=n.
    pending_args: Vec<Value>,
    stop: Arc<AtomicBool>,
}

impl<'m, H: Host> Interpreter<'m, H> {
    pub fn new(module: &'m IrModule, host: H) -> Self {
        Self::with_config(module, host, RuntimeConfig::default())
    }

    pub fn with_config(module: &'m IrModule, host: H, config: RuntimeConfig) -> Self {
        Interpreter {
            module,
            host,
            config,
            functions: FunctionTable::standard(),
            ip: 0,
            stack: Vec::new(),
            frames: Vec::new(),
            numbered: ScopeStack::new(),
            named: ScopeStack::new(),
            scratch: Vec::new(),
            pending_args: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    /// Shared flag that cancels execution at the next fetch.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState {
            ip: self.ip,
            operand_depth: self.stack.len(),
            frame_depth: self.frames.len(),
        }
    }

    /// Seeds a numbered parameter before execution.
    pub fn set_numbered(&mut self, key: u16, value: Value) {
        self.numbered.set(key, value);
    }

    /// Seeds a named parameter before execution.
    pub fn set_named(&mut self, name: impl Into<String>, value: Value) {
        self.named.set(name.into(), value);
    }

    /// Reads a numbered parameter, falling through to the host's system
    /// scope; unbound reads are `None`.
    pub fn numbered(&self, key: u16) -> Value {
        self.numbered
            .get(&key)
            .cloned()
            .or_else(|| self.host.system_numbered(key))
            .unwrap_or(Value::None)
    }

    /// Reads a named parameter with the same fallthrough.
    pub fn named(&self, name: &str) -> Value {
        self.named
            .get(&name.to_string())
            .cloned()
            .or_else(|| self.host.system_named(name))
            .unwrap_or(Value::None)
    }

    /// Runs the module to completion or the first error.
    pub fn execute(&mut self) -> Result<(), RuntimeError> {
        while self.ip < self.module.instructions().len() {
            if self.stop.load(Ordering::Relaxed) {
                return Err(RuntimeError::Cancelled {
                    position: self.position(),
                });
            }
            let instr = self.module.instructions()[self.ip];
            self.ip += 1;
            self.step(instr.opcode, instr.imm)?;
        }
        Ok(())
    }

    fn step(&mut self, opcode: Opcode, imm: i64) -> Result<(), RuntimeError> {
        match opcode {
            Opcode::Push => {
                let value = self.module.constant(imm).clone();
                self.push(value)?;
            }

            Opcode::Prologue => self.scratch.push(BlockWords::new()),

            Opcode::SetArg => {
                let value = self.pop()?;
                let letter = (imm as u8) as char;
                match self.scratch.last_mut() {
                    Some(words) => words.set(letter, value),
                    None => {
                        return Err(self.malformed("argument word outside of a block"));
                    }
                }
            }

            Opcode::Syscall => {
                let value = self.pop()?;
                let words = match self.scratch.pop() {
                    Some(words) => words,
                    None => return Err(self.malformed("syscall outside of a block")),
                };
                let kind = SyscallKind::from_code(imm)
                    .ok_or_else(|| self.malformed("unknown syscall kind"))?;
                self.host
                    .syscall(kind, value, &words)
                    .map_err(|host| RuntimeError::Syscall {
                        position: self.position(),
                        host,
                    })?;
            }

            Opcode::Invoke => {
                let name = match self.module.constant(imm) {
                    Value::String(name) => name.clone(),
                    _ => return Err(self.malformed("function name is not a string constant")),
                };
                let (arity, run) = self.functions.get(&name).ok_or_else(|| {
                    RuntimeError::UnknownFunction {
                        position: self.position(),
                        name: name.clone(),
                    }
                })?;
                if self.stack.len() < arity {
                    return Err(RuntimeError::StackUnderflow {
                        position: self.position(),
                    });
                }
                let args: Vec<Value> = self.stack.split_off(self.stack.len() - arity);
                let result = run(&args).map_err(|e| self.value_error(e))?;
                self.push(result)?;
            }

            Opcode::Jump => self.ip = self.module.label_target(imm),

            Opcode::JumpIf => {
                let value = self.pop()?;
                if value::truthy(&value).map_err(|e| self.value_error(e))? {
                    self.ip = self.module.label_target(imm);
                }
            }

            Opcode::JumpEq => self.compare_jump(Comparison::Eq, imm)?,
            Opcode::JumpNe => self.compare_jump(Comparison::Ne, imm)?,
            Opcode::JumpLt => self.compare_jump(Comparison::Lt, imm)?,
            Opcode::JumpLe => self.compare_jump(Comparison::Le, imm)?,
            Opcode::JumpGt => self.compare_jump(Comparison::Gt, imm)?,
            Opcode::JumpGe => self.compare_jump(Comparison::Ge, imm)?,

            Opcode::Call => {
                let argc = match self.pop()? {
                    Value::Integer(n) if n >= 0 => n as usize,
                    _ => return Err(self.malformed("call without an argument count")),
                };
                if self.stack.len() < argc {
                    return Err(RuntimeError::StackUnderflow {
                        position: self.position(),
                    });
                }
                if self.frames.len() >= self.config.max_call_depth {
                    return Err(RuntimeError::CallDepthExceeded {
                        position: self.position(),
                        limit: self.config.max_call_depth,
                    });
                }
                self.pending_args = self.stack.split_off(self.stack.len() - argc);
                self.frames.push(Frame {
                    return_ip: self.ip,
                    numbered_depth: self.numbered.depth(),
                    named_depth: self.named.depth(),
                    watermark: self.stack.len(),
                });
                self.ip = self.module.label_target(imm);
            }

            Opcode::Ret => {
                let frame = match self.frames.pop() {
                    Some(frame) => frame,
                    None => {
                        return Err(RuntimeError::ReturnOutsideProcedure {
                            position: self.position(),
                        })
                    }
                };
                self.numbered.truncate(frame.numbered_depth);
                self.named.truncate(frame.named_depth);
                self.stack.truncate(frame.watermark);
                self.ip = frame.return_ip;
            }

            Opcode::Dup => {
                let value = self.pop()?;
                self.push(value.clone())?;
                self.push(value)?;
            }

            Opcode::Neg => self.unary(value::neg)?,
            Opcode::Not => self.unary(value::not)?,

            Opcode::Add => self.binary(value::add)?,
            Opcode::Sub => self.binary(value::sub)?,
            Opcode::Mul => self.binary(value::mul)?,
            Opcode::Div => self.binary(value::div)?,
            Opcode::Mod => self.binary(value::modulo)?,

            Opcode::Eq => self.comparison(Comparison::Eq)?,
            Opcode::Ne => self.comparison(Comparison::Ne)?,
            Opcode::Lt => self.comparison(Comparison::Lt)?,
            Opcode::Le => self.comparison(Comparison::Le)?,
            Opcode::Gt => self.comparison(Comparison::Gt)?,
            Opcode::Ge => self.comparison(Comparison::Ge)?,

            Opcode::And => self.logic(LogicOp::And)?,
            Opcode::Or => self.logic(LogicOp::Or)?,
            Opcode::Xor => self.logic(LogicOp::Xor)?,

            Opcode::LoadNumbered => {
                let value = self.numbered(imm as u16);
                self.push(value)?;
            }

            Opcode::StoreNumbered => {
                let value = self.pop()?;
                self.numbered.set(imm as u16, value);
            }

            Opcode::LoadNamed => {
                let name = match self.module.constant(imm) {
                    Value::String(name) => name.clone(),
                    _ => return Err(self.malformed("parameter name is not a string constant")),
                };
                let value = self.named(&name);
                self.push(value)?;
            }

            Opcode::StoreNamed => {
                let name = match self.module.constant(imm) {
                    Value::String(name) => name.clone(),
                    _ => return Err(self.malformed("parameter name is not a string constant")),
                };
                let value = self.pop()?;
                self.named.set(name, value);
            }

            Opcode::PushScope => {
                self.numbered.push_frame();
                let args = std::mem::take(&mut self.pending_args);
                for (index, value) in args.into_iter().enumerate() {
                    self.numbered.define((index + 1) as u16, value);
                }
            }

            Opcode::PopScope => {
                if !self.numbered.pop_frame() {
                    return Err(self.malformed("scope stack underflow"));
                }
            }
        }
        Ok(())
    }

    // -- helpers --

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_operand_stack {
            return Err(RuntimeError::StackLimitExceeded {
                position: self.position(),
                limit: self.config.max_operand_stack,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| RuntimeError::StackUnderflow {
            position: self.position(),
        })
    }

    fn unary(
        &mut self,
        op: fn(&Value) -> Result<Value, ValueError>,
    ) -> Result<(), RuntimeError> {
        let a = self.pop()?;
        let result = op(&a).map_err(|e| self.value_error(e))?;
        self.push(result)
    }

    fn binary(
        &mut self,
        op: fn(&Value, &Value) -> Result<Value, ValueError>,
    ) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = op(&a, &b).map_err(|e| self.value_error(e))?;
        self.push(result)
    }

    fn comparison(&mut self, cmp: Comparison) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = value::compare(cmp, &a, &b).map_err(|e| self.value_error(e))?;
        self.push(result)
    }

    fn logic(&mut self, op: LogicOp) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = value::logical(op, &a, &b).map_err(|e| self.value_error(e))?;
        self.push(result)
    }

    fn compare_jump(&mut self, cmp: Comparison, label: i64) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = value::compare(cmp, &a, &b).map_err(|e| self.value_error(e))?;
        if matches!(result, Value::Logical(true)) {
            self.ip = self.module.label_target(label);
        }
        Ok(())
    }

    /// The source position of the instruction currently executing.
    fn position(&self) -> SourcePosition {
        let index = self.ip.saturating_sub(1);
        self.module
            .position_at(index)
            .cloned()
            .unwrap_or_else(|| SourcePosition::new(self.module.tag(), 0, 0))
    }

    fn value_error(&self, error: ValueError) -> RuntimeError {
        match error {
            ValueError::DivisionByZero => RuntimeError::DivisionByZero {
                position: self.position(),
            },
            other => RuntimeError::InvalidOperand {
                position: self.position(),
                message: other.to_string(),
            },
        }
    }

    fn malformed(&self, message: &str) -> RuntimeError {
        RuntimeError::MalformedModule {
            position: self.position(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::compile;
    use crate::bytecode::op::Instr;
    use crate::lexer::Dialect;
    use crate::parser::parse;
    use crate::runtime::host::RecordingHost;

    fn module_for(source: &str) -> IrModule {
        compile(&parse("test", source, Dialect::LinuxCnc).unwrap()).unwrap()
    }

    #[test]
    fn test_arithmetic_and_store() {
        let module = module_for("#1=[2+3*4]\n#2=[#1/2]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.numbered(1), Value::Integer(14));
        assert_eq!(vm.numbered(2), Value::Float(7.0));
    }

    #[test]
    fn test_unbound_parameter_reads_none_promoted_to_zero() {
        let module = module_for("#1=[#55+1]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.numbered(1), Value::Integer(1));
    }

    #[test]
    fn test_system_scope_fallthrough() {
        let module = module_for("#1=[#5220+1]\n#2=#<_coolant>");
        let mut host = RecordingHost::new();
        host.system.set_numbered(5220, Value::Integer(54));
        host.system.set_named("_coolant", Value::Logical(true));
        let mut vm = Interpreter::new(&module, host);
        vm.execute().unwrap();
        assert_eq!(vm.numbered(1), Value::Integer(55));
        assert_eq!(vm.numbered(2), Value::Logical(true));
    }

    #[test]
    fn test_program_store_shadows_system_scope() {
        let module = module_for("#5220=9");
        let mut host = RecordingHost::new();
        host.system.set_numbered(5220, Value::Integer(54));
        let mut vm = Interpreter::new(&module, host);
        vm.execute().unwrap();
        // The program-root binding wins on read; the system value is the
        // host's to change.
        assert_eq!(vm.numbered(5220), Value::Integer(9));
        assert_eq!(vm.host().system.numbered(5220), Some(Value::Integer(54)));
    }

    #[test]
    fn test_division_by_zero_has_position() {
        let module = module_for("G0 X1\nG1 X[1/0]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        let err = vm.execute().unwrap_err();
        match err {
            RuntimeError::DivisionByZero { position } => assert_eq!(position.line, 2),
            other => panic!("expected division by zero, got {:?}", other),
        }
        // The failing block raised no syscall.
        assert_eq!(vm.host().calls.len(), 1);
    }

    #[test]
    fn test_state_is_inspectable_after_error() {
        let module = module_for("G1 X[1/0]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        assert!(vm.execute().is_err());
        let state = vm.state();
        assert!(state.ip > 0);
        assert!(state.ip <= module.instructions().len());
    }

    #[test]
    fn test_conditional_branches() {
        let module = module_for(
            "o1 if [#1 GT 0]\n#2=1\no1 elseif [#1 LT 0]\n#2=2\no1 else\n#2=3\no1 endif",
        );
        for (seed, expected) in [(5, 1), (-5, 2), (0, 3)] {
            let mut vm = Interpreter::new(&module, RecordingHost::new());
            vm.set_numbered(1, Value::Integer(seed));
            vm.execute().unwrap();
            assert_eq!(vm.numbered(2), Value::Integer(expected), "seed {}", seed);
        }
    }

    #[test]
    fn test_while_loop_runs_to_condition() {
        let module = module_for("o1 while [#1 LT 3]\n#1=[#1+1]\no1 endwhile");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.set_numbered(1, Value::Integer(0));
        vm.execute().unwrap();
        assert_eq!(vm.numbered(1), Value::Integer(3));
        assert!(vm.host().calls.is_empty());
    }

    #[test]
    fn test_do_while_runs_body_first() {
        let module = module_for("o1 do\n#1=[#1+1]\no1 while [0]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.numbered(1), Value::Integer(1));
    }

    #[test]
    fn test_repeat_count_and_stack_hygiene() {
        let module = module_for("o1 repeat [3]\nG0 X1\no1 endrepeat");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.host().calls.len(), 3);
        assert_eq!(vm.state().operand_depth, 0, "counter fully consumed");
    }

    #[test]
    fn test_repeat_zero_and_negative_counts() {
        for count in ["0", "-2"] {
            let module = module_for(&format!("o1 repeat [{}]\nG0 X1\no1 endrepeat", count));
            let mut vm = Interpreter::new(&module, RecordingHost::new());
            vm.execute().unwrap();
            assert!(vm.host().calls.is_empty(), "count {}", count);
            assert_eq!(vm.state().operand_depth, 0);
        }
    }

    #[test]
    fn test_break_leaves_loop_clean() {
        let module = module_for(
            "o1 repeat [5]\nG0 X1\no2 if [#1 EQ 0]\no1 break\no2 endif\no1 endrepeat",
        );
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.host().calls.len(), 1);
        assert_eq!(vm.state().operand_depth, 0, "break consumed the counter");
    }

    #[test]
    fn test_continue_skips_rest_of_body() {
        let module = module_for(
            "o1 while [#1 LT 3]\n#1=[#1+1]\no2 if [#1 EQ 2]\no1 continue\no2 endif\nG0 X#1\no1 endwhile",
        );
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        // Iteration #1=2 skipped its syscall.
        assert_eq!(vm.host().calls.len(), 2);
    }

    #[test]
    fn test_procedure_arguments_bind_locally() {
        let module = module_for("#1=99\no100 sub\n#2=#1\no100 endsub\no100 call [7]\n#3=#1");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        // Inside the sub, #1 was the bound argument.
        assert_eq!(vm.numbered(2), Value::Integer(7));
        // After return the outer #1 is visible again.
        assert_eq!(vm.numbered(3), Value::Integer(99));
    }

    #[test]
    fn test_procedure_writes_to_outer_parameters() {
        // Parameters the sub does not shadow follow the
        // innermost-defining-frame rule and hit the root scope.
        let module = module_for("o100 sub\n#10=42\no100 endsub\no100 call");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.numbered(10), Value::Integer(42));
    }

    #[test]
    fn test_early_return_unwinds_scopes() {
        let module = module_for(
            "o100 sub\no1 if [#1 GT 0]\no100 return\no1 endif\n#20=1\no100 endsub\no100 call [5]\n#21=7",
        );
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.numbered(20), Value::None);
        assert_eq!(vm.numbered(21), Value::Integer(7));
        assert_eq!(vm.state().frame_depth, 0);
    }

    #[test]
    fn test_recursion_hits_depth_limit() {
        let module = module_for("o1 sub\no1 call\no1 endsub\no1 call");
        let mut vm = Interpreter::with_config(
            &module,
            RecordingHost::new(),
            RuntimeConfig {
                max_call_depth: 16,
                max_operand_stack: 1000,
            },
        );
        assert!(matches!(
            vm.execute(),
            Err(RuntimeError::CallDepthExceeded { limit: 16, .. })
        ));
    }

    #[test]
    fn test_cancellation_stops_between_instructions() {
        let module = module_for("o1 while [1]\n#1=[#1+1]\no1 endwhile");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.cancel_flag().store(true, Ordering::Relaxed);
        assert!(matches!(
            vm.execute(),
            Err(RuntimeError::Cancelled { .. })
        ));
    }

    #[test]
    fn test_host_error_propagates_unchanged() {
        struct FailingHost;
        impl Host for FailingHost {
            fn syscall(
                &mut self,
                _kind: SyscallKind,
                _value: Value,
                _words: &BlockWords,
            ) -> Result<(), crate::runtime::host::HostError> {
                Err(crate::runtime::host::HostError::new("spindle jammed"))
            }
        }
        let module = module_for("G1 X1");
        let mut vm = Interpreter::new(&module, FailingHost);
        match vm.execute() {
            Err(RuntimeError::Syscall { host, .. }) => {
                assert_eq!(host.0, "spindle jammed");
            }
            other => panic!("expected syscall error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invoke_functions() {
        let module = module_for("#1=ABS[-3]\n#2=ATAN[1]/[1]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.numbered(1), Value::Float(3.0));
        match vm.numbered(2) {
            Value::Float(x) => assert!((x - 45.0).abs() < 1e-9),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_function_errors() {
        let module = module_for("#1=NOPE[1]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        assert!(matches!(
            vm.execute(),
            Err(RuntimeError::UnknownFunction { name, .. }) if name == "NOPE"
        ));
    }

    #[test]
    fn test_stack_underflow_on_malformed_module() {
        let module = IrModule {
            tag: "test".to_string(),
            instructions: vec![Instr::plain(Opcode::Add)],
            constants: vec![],
            labels: vec![],
            procedures: vec![],
            source_map: vec![],
        };
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        assert!(matches!(
            vm.execute(),
            Err(RuntimeError::StackUnderflow { .. })
        ));
    }

    #[test]
    fn test_ret_without_frame_is_return_out_of_context() {
        let module = IrModule {
            tag: "test".to_string(),
            instructions: vec![Instr::plain(Opcode::Ret)],
            constants: vec![],
            labels: vec![],
            procedures: vec![],
            source_map: vec![],
        };
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        assert!(matches!(
            vm.execute(),
            Err(RuntimeError::ReturnOutsideProcedure { .. })
        ));
    }

    #[test]
    fn test_named_parameters() {
        let module = module_for("#<depth>=2.5\n#1=[#<depth>*2]");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        assert_eq!(vm.named("depth"), Value::Float(2.5));
        assert_eq!(vm.numbered(1), Value::Float(5.0));
    }

    #[test]
    fn test_word_set_passed_to_host() {
        let module = module_for("G1 X10 Y20 F100");
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        vm.execute().unwrap();
        let call = &vm.host().calls[0];
        assert_eq!(call.kind, SyscallKind::Motion);
        assert_eq!(call.value, Value::Integer(1));
        assert_eq!(
            call.words,
            vec![
                ('X', Value::Integer(10)),
                ('Y', Value::Integer(20)),
                ('F', Value::Integer(100)),
            ]
        );
    }
}
