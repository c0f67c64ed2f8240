//! AST → IR translation.
//!
//! Structured control flow is lowered to labels and conditional jumps;
//! labels are allocated monotonically and resolved through the module's
//! label table, so nothing is ever patched inside an instruction. Source
//! map entries are emitted at every statement boundary.
//!
//! Two peepholes run during emission: constant arithmetic subtrees fold
//! into pool constants (never when the operation would trap, so runtime
//! errors keep their position), and a comparison followed by a conditional
//! branch fuses into one compare-jump instruction.

use std::collections::HashMap;

use crate::ast::{BinOp, CondArm, Node, NodeKind, ParamId, Program, UnOp};
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::{IrModule, Procedure};
use crate::bytecode::op::{Instr, Opcode};
use crate::lexer::SourcePosition;
use crate::runtime::host::SyscallKind;
use crate::runtime::value::{self, Comparison, LogicOp, Value};

/// Translates a parsed program into an immutable IR module.
pub fn compile(program: &Program) -> Result<IrModule, CompileError> {
    let mut compiler = Compiler::new(&program.tag);

    // Declare procedures up front so forward calls resolve.
    for node in &program.procedures {
        if let NodeKind::ProcedureDefinition { name, .. } = &node.kind {
            compiler.declare_procedure(name, &node.position)?;
        }
    }

    for node in &program.body {
        compiler.statement(node)?;
    }

    if !program.procedures.is_empty() {
        let end = compiler.new_label();
        compiler.emit(Opcode::Jump, end as i64);
        for node in &program.procedures {
            compiler.procedure(node)?;
        }
        compiler.bind(end);
    }

    compiler.finish()
}

/// The principal command letters, in the order they claim a block.
const COMMAND_LETTERS: [char; 5] = ['G', 'M', 'T', 'S', 'F'];

struct LoopLabels {
    continue_to: usize,
    break_to: usize,
}

struct Compiler {
    tag: String,
    instructions: Vec<Instr>,
    constants: Vec<Value>,
    constant_ids: HashMap<ConstKey, usize>,
    labels: Vec<Option<usize>>,
    procedures: Vec<Procedure>,
    procedure_ids: HashMap<String, usize>,
    source_map: Vec<(usize, SourcePosition)>,
    loops: Vec<LoopLabels>,
    in_procedure: bool,
    /// Index below which the branch peephole must not rewrite: reset at
    /// every label binding and statement boundary.
    fuse_barrier: usize,
}

/// Hashable identity of a pool constant; floats dedup by bit pattern.
#[derive(PartialEq, Eq, Hash)]
enum ConstKey {
    None,
    Int(i64),
    Float(u64),
    Str(String),
    Logical(bool),
}

impl ConstKey {
    fn of(value: &Value) -> Self {
        match value {
            Value::None => ConstKey::None,
            Value::Integer(n) => ConstKey::Int(*n),
            Value::Float(n) => ConstKey::Float(n.to_bits()),
            Value::String(s) => ConstKey::Str(s.clone()),
            Value::Logical(b) => ConstKey::Logical(*b),
        }
    }
}

impl Compiler {
    fn new(tag: &str) -> Self {
        Compiler {
            tag: tag.to_string(),
            instructions: Vec::new(),
            constants: Vec::new(),
            constant_ids: HashMap::new(),
            labels: Vec::new(),
            procedures: Vec::new(),
            procedure_ids: HashMap::new(),
            source_map: Vec::new(),
            loops: Vec::new(),
            in_procedure: false,
            fuse_barrier: 0,
        }
    }

    // -- emission primitives --

    fn emit(&mut self, opcode: Opcode, imm: i64) {
        self.instructions.push(Instr::new(opcode, imm));
    }

    fn emit_plain(&mut self, opcode: Opcode) {
        self.instructions.push(Instr::plain(opcode));
    }

    fn constant(&mut self, value: Value) -> i64 {
        let key = ConstKey::of(&value);
        if let Some(&index) = self.constant_ids.get(&key) {
            return index as i64;
        }
        let index = self.constants.len();
        self.constants.push(value);
        self.constant_ids.insert(key, index);
        index as i64
    }

    fn push_constant(&mut self, value: Value) {
        let index = self.constant(value);
        self.emit(Opcode::Push, index);
    }

    fn new_label(&mut self) -> usize {
        self.labels.push(None);
        self.labels.len() - 1
    }

    fn bind(&mut self, label: usize) {
        self.labels[label] = Some(self.instructions.len());
        self.fuse_barrier = self.instructions.len();
    }

    /// Records a statement boundary in the source map.
    fn mark(&mut self, position: &SourcePosition) {
        self.source_map
            .push((self.instructions.len(), position.clone()));
        self.fuse_barrier = self.instructions.len();
    }

    /// Branch to `label` when the popped value is true, fusing a trailing
    /// comparison into a compare-jump.
    fn branch_true(&mut self, label: usize) {
        if let Some(cmp) = self.fusible_comparison() {
            self.instructions.pop();
            self.emit(fused_jump(cmp), label as i64);
        } else {
            self.emit(Opcode::JumpIf, label as i64);
        }
    }

    /// Branch to `label` when the popped value is false.
    fn branch_false(&mut self, label: usize) {
        if let Some(cmp) = self.fusible_comparison() {
            self.instructions.pop();
            self.emit(fused_jump(invert(cmp)), label as i64);
        } else {
            self.emit_plain(Opcode::Not);
            self.emit(Opcode::JumpIf, label as i64);
        }
    }

    fn fusible_comparison(&self) -> Option<Comparison> {
        if self.instructions.len() <= self.fuse_barrier {
            return None;
        }
        match self.instructions.last()?.opcode {
            Opcode::Eq => Some(Comparison::Eq),
            Opcode::Ne => Some(Comparison::Ne),
            Opcode::Lt => Some(Comparison::Lt),
            Opcode::Le => Some(Comparison::Le),
            Opcode::Gt => Some(Comparison::Gt),
            Opcode::Ge => Some(Comparison::Ge),
            _ => None,
        }
    }

    // -- procedures --

    fn declare_procedure(
        &mut self,
        name: &str,
        position: &SourcePosition,
    ) -> Result<(), CompileError> {
        if self.procedure_ids.contains_key(name) {
            return Err(CompileError::DuplicateProcedure {
                position: position.clone(),
                name: name.to_string(),
            });
        }
        let entry = self.new_label();
        let name_index = self.constant(Value::String(name.to_string())) as usize;
        self.procedure_ids
            .insert(name.to_string(), self.procedures.len());
        self.procedures.push(Procedure {
            name: name_index,
            entry,
        });
        Ok(())
    }

    fn procedure(&mut self, node: &Node) -> Result<(), CompileError> {
        let (name, body) = match &node.kind {
            NodeKind::ProcedureDefinition { name, body } => (name, body),
            _ => {
                return Err(CompileError::MisplacedDefinition {
                    position: node.position.clone(),
                })
            }
        };
        let entry = self.procedures[self.procedure_ids[name]].entry;
        self.mark(&node.position);
        self.bind(entry);
        self.emit_plain(Opcode::PushScope);

        let saved_loops = std::mem::take(&mut self.loops);
        self.in_procedure = true;
        for statement in body {
            self.statement(statement)?;
        }
        self.in_procedure = false;
        self.loops = saved_loops;

        self.emit_plain(Opcode::PopScope);
        self.emit_plain(Opcode::Ret);
        Ok(())
    }

    // -- statements --

    fn statement(&mut self, node: &Node) -> Result<(), CompileError> {
        if let NodeKind::Labelled { body, .. } = &node.kind {
            return self.statement(body);
        }
        self.mark(&node.position);

        match &node.kind {
            NodeKind::Command {
                words,
                assignments,
            } => self.command(words, assignments),

            NodeKind::Assignment { target, value } => {
                self.expression(value)?;
                self.store(target);
                Ok(())
            }

            NodeKind::ProcedureCall { name, args } => {
                let id = self.procedure_ids.get(name).copied().ok_or_else(|| {
                    CompileError::UndefinedProcedure {
                        position: node.position.clone(),
                        name: name.clone(),
                    }
                })?;
                for arg in args {
                    self.expression(arg)?;
                }
                self.push_constant(Value::Integer(args.len() as i64));
                let entry = self.procedures[id].entry;
                self.emit(Opcode::Call, entry as i64);
                Ok(())
            }

            NodeKind::Conditional { arms, otherwise } => self.conditional(arms, otherwise),

            NodeKind::While { condition, body } => {
                let top = self.new_label();
                let end = self.new_label();
                self.bind(top);
                self.expression(condition)?;
                self.branch_false(end);
                self.loops.push(LoopLabels {
                    continue_to: top,
                    break_to: end,
                });
                let result = self.statements(body);
                self.loops.pop();
                result?;
                self.emit(Opcode::Jump, top as i64);
                self.bind(end);
                Ok(())
            }

            NodeKind::DoWhile { body, condition } => {
                let start = self.new_label();
                let test = self.new_label();
                let end = self.new_label();
                self.bind(start);
                self.loops.push(LoopLabels {
                    continue_to: test,
                    break_to: end,
                });
                let result = self.statements(body);
                self.loops.pop();
                result?;
                self.bind(test);
                self.expression(condition)?;
                self.branch_true(start);
                self.bind(end);
                Ok(())
            }

            NodeKind::Repeat { count, body } => self.repeat(count, body),

            NodeKind::Break => match self.loops.last() {
                Some(labels) => {
                    self.emit(Opcode::Jump, labels.break_to as i64);
                    Ok(())
                }
                None => Err(CompileError::BreakOutsideLoop {
                    position: node.position.clone(),
                }),
            },

            NodeKind::Continue => match self.loops.last() {
                Some(labels) => {
                    self.emit(Opcode::Jump, labels.continue_to as i64);
                    Ok(())
                }
                None => Err(CompileError::ContinueOutsideLoop {
                    position: node.position.clone(),
                }),
            },

            NodeKind::Return => {
                if !self.in_procedure {
                    return Err(CompileError::ReturnOutsideProcedure {
                        position: node.position.clone(),
                    });
                }
                self.emit_plain(Opcode::Ret);
                Ok(())
            }

            NodeKind::ProcedureDefinition { .. } => Err(CompileError::MisplacedDefinition {
                position: node.position.clone(),
            }),

            NodeKind::Labelled { .. } => unreachable!("unwrapped above"),

            // Expression kinds have no statement meaning.
            NodeKind::Number(_)
            | NodeKind::Text(_)
            | NodeKind::Unary { .. }
            | NodeKind::Binary { .. }
            | NodeKind::FunctionCall { .. }
            | NodeKind::VariableRef(_)
            | NodeKind::Word { .. } => Err(CompileError::ExpressionInStatement {
                position: node.position.clone(),
            }),
        }
    }

    fn statements(&mut self, nodes: &[Node]) -> Result<(), CompileError> {
        for node in nodes {
            self.statement(node)?;
        }
        Ok(())
    }

    /// One block: prologue, argument words into the scratch scope, the
    /// principal value, deferred assignments, then the syscall.
    ///
    /// All expressions evaluate against the pre-block parameter state:
    /// assignment right-hand sides are pushed (in reverse) before any
    /// store runs, and stores then apply in source order.
    fn command(&mut self, words: &[Node], assignments: &[Node]) -> Result<(), CompileError> {
        let principal = words.iter().position(|w| match &w.kind {
            NodeKind::Word { letter, .. } => COMMAND_LETTERS.contains(letter),
            _ => false,
        });

        if !words.is_empty() {
            self.emit_plain(Opcode::Prologue);
        }

        for (index, word) in words.iter().enumerate() {
            if Some(index) == principal {
                continue;
            }
            let (letter, value) = match &word.kind {
                NodeKind::Word { letter, value } => (*letter, value),
                _ => {
                    return Err(CompileError::ExpressionInStatement {
                        position: word.position.clone(),
                    })
                }
            };
            self.expression(value)?;
            self.emit(Opcode::SetArg, letter as i64);
        }

        let mut kind = SyscallKind::General;
        if let Some(index) = principal {
            if let NodeKind::Word { letter, value } = &words[index].kind {
                kind = syscall_kind(*letter, value);
                self.expression(value)?;
            }
        } else if !words.is_empty() {
            self.push_constant(Value::None);
        }

        for assignment in assignments.iter().rev() {
            if let NodeKind::Assignment { value, .. } = &assignment.kind {
                self.expression(value)?;
            }
        }
        for assignment in assignments {
            if let NodeKind::Assignment { target, .. } = &assignment.kind {
                self.store(target);
            }
        }

        if !words.is_empty() {
            self.emit(Opcode::Syscall, kind.code());
        }
        Ok(())
    }

    fn conditional(
        &mut self,
        arms: &[CondArm],
        otherwise: &Option<Vec<Node>>,
    ) -> Result<(), CompileError> {
        let end = self.new_label();
        for arm in arms {
            let next = self.new_label();
            self.expression(&arm.condition)?;
            self.branch_false(next);
            self.statements(&arm.body)?;
            self.emit(Opcode::Jump, end as i64);
            self.bind(next);
        }
        if let Some(body) = otherwise {
            self.statements(body)?;
        }
        self.bind(end);
        Ok(())
    }

    /// Counted loop with the counter held on the operand stack. The exit
    /// branch consumes the spent counter: its taken and fall-through
    /// targets coincide.
    fn repeat(&mut self, count: &Node, body: &[Node]) -> Result<(), CompileError> {
        let top = self.new_label();
        let enter = self.new_label();
        let next = self.new_label();
        let exit = self.new_label();
        let end = self.new_label();

        self.expression(count)?;
        self.bind(top);
        self.emit_plain(Opcode::Dup);
        self.push_constant(Value::Integer(0));
        self.emit_plain(Opcode::Gt);
        self.branch_true(enter);
        self.emit(Opcode::Jump, exit as i64);

        self.bind(enter);
        self.loops.push(LoopLabels {
            continue_to: next,
            break_to: exit,
        });
        let result = self.statements(body);
        self.loops.pop();
        result?;

        self.bind(next);
        self.push_constant(Value::Integer(1));
        self.emit_plain(Opcode::Sub);
        self.emit(Opcode::Jump, top as i64);

        self.bind(exit);
        self.emit(Opcode::JumpIf, end as i64);
        self.bind(end);
        Ok(())
    }

    fn store(&mut self, target: &ParamId) {
        match target {
            ParamId::Numbered(key) => self.emit(Opcode::StoreNumbered, *key as i64),
            ParamId::Named(name) => {
                let index = self.constant(Value::String(name.clone()));
                self.emit(Opcode::StoreNamed, index);
            }
        }
    }

    // -- expressions --

    fn expression(&mut self, node: &Node) -> Result<(), CompileError> {
        if let Some(folded) = try_fold(node) {
            self.push_constant(folded);
            return Ok(());
        }

        match &node.kind {
            NodeKind::Number(value) => {
                self.push_constant(value.clone());
                Ok(())
            }
            NodeKind::Text(text) => {
                self.push_constant(Value::String(text.clone()));
                Ok(())
            }
            NodeKind::Unary { op, operand } => {
                self.expression(operand)?;
                self.emit_plain(match op {
                    UnOp::Minus => Opcode::Neg,
                    UnOp::Not => Opcode::Not,
                });
                Ok(())
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.expression(lhs)?;
                self.expression(rhs)?;
                self.emit_plain(binary_opcode(*op));
                Ok(())
            }
            NodeKind::FunctionCall { name, args } => {
                for arg in args {
                    self.expression(arg)?;
                }
                let index = self.constant(Value::String(name.clone()));
                self.emit(Opcode::Invoke, index);
                Ok(())
            }
            NodeKind::VariableRef(ParamId::Numbered(key)) => {
                self.emit(Opcode::LoadNumbered, *key as i64);
                Ok(())
            }
            NodeKind::VariableRef(ParamId::Named(name)) => {
                let index = self.constant(Value::String(name.clone()));
                self.emit(Opcode::LoadNamed, index);
                Ok(())
            }
            _ => Err(CompileError::StatementInExpression {
                position: node.position.clone(),
            }),
        }
    }

    fn finish(self) -> Result<IrModule, CompileError> {
        let mut labels = Vec::with_capacity(self.labels.len());
        for (id, target) in self.labels.iter().enumerate() {
            match target {
                Some(index) => labels.push(*index),
                None => return Err(CompileError::UndefinedLabel { label: id }),
            }
        }
        Ok(IrModule {
            tag: self.tag,
            instructions: self.instructions,
            constants: self.constants,
            labels,
            procedures: self.procedures,
            source_map: self.source_map,
        })
    }
}

/// Folds a constant subtree to its value. Returns `None` for anything that
/// reads state or whose evaluation would trap, so traps stay runtime
/// events with a source position.
fn try_fold(node: &Node) -> Option<Value> {
    match &node.kind {
        NodeKind::Number(value) => Some(value.clone()),
        NodeKind::Unary { op, operand } => {
            let operand = try_fold(operand)?;
            match op {
                UnOp::Minus => value::neg(&operand).ok(),
                UnOp::Not => value::not(&operand).ok(),
            }
        }
        NodeKind::Binary { op, lhs, rhs } => {
            let lhs = try_fold(lhs)?;
            let rhs = try_fold(rhs)?;
            match op {
                BinOp::Add => value::add(&lhs, &rhs).ok(),
                BinOp::Sub => value::sub(&lhs, &rhs).ok(),
                BinOp::Mul => value::mul(&lhs, &rhs).ok(),
                BinOp::Div => value::div(&lhs, &rhs).ok(),
                BinOp::Mod => value::modulo(&lhs, &rhs).ok(),
                BinOp::Eq => value::compare(Comparison::Eq, &lhs, &rhs).ok(),
                BinOp::Ne => value::compare(Comparison::Ne, &lhs, &rhs).ok(),
                BinOp::Lt => value::compare(Comparison::Lt, &lhs, &rhs).ok(),
                BinOp::Le => value::compare(Comparison::Le, &lhs, &rhs).ok(),
                BinOp::Gt => value::compare(Comparison::Gt, &lhs, &rhs).ok(),
                BinOp::Ge => value::compare(Comparison::Ge, &lhs, &rhs).ok(),
                BinOp::And => value::logical(LogicOp::And, &lhs, &rhs).ok(),
                BinOp::Or => value::logical(LogicOp::Or, &lhs, &rhs).ok(),
                BinOp::Xor => value::logical(LogicOp::Xor, &lhs, &rhs).ok(),
            }
        }
        _ => None,
    }
}

fn binary_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
        BinOp::Xor => Opcode::Xor,
    }
}

fn fused_jump(cmp: Comparison) -> Opcode {
    match cmp {
        Comparison::Eq => Opcode::JumpEq,
        Comparison::Ne => Opcode::JumpNe,
        Comparison::Lt => Opcode::JumpLt,
        Comparison::Le => Opcode::JumpLe,
        Comparison::Gt => Opcode::JumpGt,
        Comparison::Ge => Opcode::JumpGe,
    }
}

fn invert(cmp: Comparison) -> Comparison {
    match cmp {
        Comparison::Eq => Comparison::Ne,
        Comparison::Ne => Comparison::Eq,
        Comparison::Lt => Comparison::Ge,
        Comparison::Le => Comparison::Gt,
        Comparison::Gt => Comparison::Le,
        Comparison::Ge => Comparison::Lt,
    }
}

/// Principal letter → syscall kind. Constant coolant M-codes go to `Io`.
fn syscall_kind(letter: char, value: &Node) -> SyscallKind {
    match letter {
        'G' => SyscallKind::Motion,
        'T' => SyscallKind::ToolChange,
        'S' => SyscallKind::SpindleSpeed,
        'F' => SyscallKind::FeedRate,
        'M' => match try_fold(value) {
            Some(Value::Integer(code)) if (7..=9).contains(&code) => SyscallKind::Io,
            _ => SyscallKind::Misc,
        },
        _ => SyscallKind::General,
    }
}
