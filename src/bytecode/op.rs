/// Bytecode operation codes.
///
/// Every instruction is a fixed-width pair of opcode and `i64` immediate;
/// the immediate's meaning depends on the opcode (constant-pool index,
/// label id, parameter key, syscall kind, word letter, argument count).
/// The numeric values are part of the serialized module format and must
/// not be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Push constant-pool entry `imm`.
    Push = 0x01,
    /// Open the scratch word scope for the current block's syscall.
    Prologue = 0x02,
    /// Pop a value and record it in the scratch scope under letter `imm`.
    SetArg = 0x03,
    /// Pop the principal value and raise a syscall of kind `imm`.
    Syscall = 0x04,
    /// Call the built-in function named by constant-pool entry `imm`.
    Invoke = 0x05,

    /// Unconditional jump to label `imm`.
    Jump = 0x10,
    /// Pop a logical; jump to label `imm` when it is true.
    JumpIf = 0x11,
    /// Activate the procedure whose entry is label `imm`. Expects the
    /// argument count on top of the stack, above the arguments.
    Call = 0x12,
    /// Return from the current activation frame.
    Ret = 0x13,

    // Fused comparison-and-jump forms, produced by the translator's
    // peephole from a comparison followed by a conditional jump.
    JumpEq = 0x14,
    JumpNe = 0x15,
    JumpLt = 0x16,
    JumpLe = 0x17,
    JumpGt = 0x18,
    JumpGe = 0x19,

    Dup = 0x20,
    Neg = 0x21,
    Not = 0x22,

    Add = 0x30,
    Sub = 0x31,
    Mul = 0x32,
    Div = 0x33,
    Mod = 0x34,

    Eq = 0x38,
    Ne = 0x39,
    Lt = 0x3A,
    Le = 0x3B,
    Gt = 0x3C,
    Ge = 0x3D,

    And = 0x40,
    Or = 0x41,
    Xor = 0x42,

    /// Load numbered parameter `imm`.
    LoadNumbered = 0x50,
    /// Pop a value into numbered parameter `imm`.
    StoreNumbered = 0x51,
    /// Load the named parameter whose name is constant-pool entry `imm`.
    LoadNamed = 0x52,
    /// Pop a value into the named parameter of constant-pool entry `imm`.
    StoreNamed = 0x53,

    /// Push a frame on the numbered scope stack, binding any pending
    /// call arguments into parameters 1..=n.
    PushScope = 0x60,
    /// Pop the top frame of the numbered scope stack.
    PopScope = 0x61,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::Prologue => "PROLOGUE",
            Opcode::SetArg => "SET_ARG",
            Opcode::Syscall => "SYSCALL",
            Opcode::Invoke => "INVOKE",
            Opcode::Jump => "JUMP",
            Opcode::JumpIf => "JUMP_IF",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::JumpEq => "JUMP_EQ",
            Opcode::JumpNe => "JUMP_NE",
            Opcode::JumpLt => "JUMP_LT",
            Opcode::JumpLe => "JUMP_LE",
            Opcode::JumpGt => "JUMP_GT",
            Opcode::JumpGe => "JUMP_GE",
            Opcode::Dup => "DUP",
            Opcode::Neg => "NEG",
            Opcode::Not => "NOT",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::LoadNumbered => "LOAD_NUM",
            Opcode::StoreNumbered => "STORE_NUM",
            Opcode::LoadNamed => "LOAD_NAME",
            Opcode::StoreNamed => "STORE_NAME",
            Opcode::PushScope => "PUSH_SCOPE",
            Opcode::PopScope => "POP_SCOPE",
        }
    }

    /// True for the jump family; their immediates are label ids.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Opcode::Jump
                | Opcode::JumpIf
                | Opcode::Call
                | Opcode::JumpEq
                | Opcode::JumpNe
                | Opcode::JumpLt
                | Opcode::JumpLe
                | Opcode::JumpGt
                | Opcode::JumpGe
        )
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Ok(match byte {
            0x01 => Opcode::Push,
            0x02 => Opcode::Prologue,
            0x03 => Opcode::SetArg,
            0x04 => Opcode::Syscall,
            0x05 => Opcode::Invoke,
            0x10 => Opcode::Jump,
            0x11 => Opcode::JumpIf,
            0x12 => Opcode::Call,
            0x13 => Opcode::Ret,
            0x14 => Opcode::JumpEq,
            0x15 => Opcode::JumpNe,
            0x16 => Opcode::JumpLt,
            0x17 => Opcode::JumpLe,
            0x18 => Opcode::JumpGt,
            0x19 => Opcode::JumpGe,
            0x20 => Opcode::Dup,
            0x21 => Opcode::Neg,
            0x22 => Opcode::Not,
            0x30 => Opcode::Add,
            0x31 => Opcode::Sub,
            0x32 => Opcode::Mul,
            0x33 => Opcode::Div,
            0x34 => Opcode::Mod,
            0x38 => Opcode::Eq,
            0x39 => Opcode::Ne,
            0x3A => Opcode::Lt,
            0x3B => Opcode::Le,
            0x3C => Opcode::Gt,
            0x3D => Opcode::Ge,
            0x40 => Opcode::And,
            0x41 => Opcode::Or,
            0x42 => Opcode::Xor,
            0x50 => Opcode::LoadNumbered,
            0x51 => Opcode::StoreNumbered,
            0x52 => Opcode::LoadNamed,
            0x53 => Opcode::StoreNamed,
            0x60 => Opcode::PushScope,
            0x61 => Opcode::PopScope,
            other => return Err(other),
        })
    }
}

/// One IR instruction. Opcodes without an immediate carry zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub opcode: Opcode,
    pub imm: i64,
}

impl Instr {
    pub fn new(opcode: Opcode, imm: i64) -> Self {
        Instr { opcode, imm }
    }

    pub fn plain(opcode: Opcode) -> Self {
        Instr { opcode, imm: 0 }
    }
}
