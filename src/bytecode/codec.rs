//! Binary serialization of IR modules.
//!
//! Layout: a magic/version header, then the constants, labels, procedures,
//! instructions and source-map sections, each length-prefixed. Everything
//! is little-endian; each instruction is one opcode byte plus its `i64`
//! immediate. Decoding validates structure: unknown opcodes, out-of-range
//! label or constant references, and trailing bytes are all rejected.

use crate::bytecode::ir::{IrModule, Procedure};
use crate::bytecode::op::{Instr, Opcode};
use crate::lexer::SourcePosition;
use crate::runtime::value::Value;

const MAGIC: &[u8; 4] = b"GCIR";
const VERSION: u16 = 1;

const CONST_NONE: u8 = 0;
const CONST_INTEGER: u8 = 1;
const CONST_FLOAT: u8 = 2;
const CONST_STRING: u8 = 3;
const CONST_LOGICAL: u8 = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("not an IR module (bad magic)")]
    BadMagic,
    #[error("unsupported module version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown opcode byte 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("unknown constant tag {0}")]
    UnknownConstantTag(u8),
    #[error("string constant is not valid UTF-8")]
    InvalidUtf8,
    #[error("truncated module")]
    Truncated,
    #[error("{0} bytes of trailing garbage")]
    TrailingBytes(usize),
    #[error("label reference out of range")]
    LabelOutOfRange,
    #[error("label target out of range")]
    LabelTargetOutOfRange,
    #[error("constant reference out of range")]
    ConstantOutOfRange,
    #[error("procedure entry out of range")]
    ProcedureOutOfRange,
}

/// Encodes a module to its binary form.
pub fn encode(module: &IrModule) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    write_u16(&mut out, VERSION);
    write_str(&mut out, module.tag());

    write_u32(&mut out, module.constants().len() as u32);
    for constant in module.constants() {
        match constant {
            Value::None => out.push(CONST_NONE),
            Value::Integer(n) => {
                out.push(CONST_INTEGER);
                write_i64(&mut out, *n);
            }
            Value::Float(n) => {
                out.push(CONST_FLOAT);
                out.extend_from_slice(&n.to_bits().to_le_bytes());
            }
            Value::String(s) => {
                out.push(CONST_STRING);
                write_str(&mut out, s);
            }
            Value::Logical(b) => {
                out.push(CONST_LOGICAL);
                out.push(*b as u8);
            }
        }
    }

    write_u32(&mut out, module.labels().len() as u32);
    for target in module.labels() {
        write_u32(&mut out, *target as u32);
    }

    write_u32(&mut out, module.procedures().len() as u32);
    for procedure in module.procedures() {
        write_u32(&mut out, procedure.name as u32);
        write_u32(&mut out, procedure.entry as u32);
    }

    write_u32(&mut out, module.instructions().len() as u32);
    for instr in module.instructions() {
        out.push(instr.opcode as u8);
        write_i64(&mut out, instr.imm);
    }

    write_u32(&mut out, module.source_map().len() as u32);
    for (index, position) in module.source_map() {
        write_u32(&mut out, *index as u32);
        write_u32(&mut out, position.line);
        write_u32(&mut out, position.column);
        out.push(position.checksum);
    }

    out
}

/// Decodes and validates a module.
pub fn decode(bytes: &[u8]) -> Result<IrModule, DecodeError> {
    let mut reader = Reader { bytes, at: 0 };

    if reader.take(4)? != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = reader.u16()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let tag = reader.string()?;

    let constant_count = reader.u32()? as usize;
    let mut constants = Vec::with_capacity(constant_count);
    for _ in 0..constant_count {
        let value = match reader.u8()? {
            CONST_NONE => Value::None,
            CONST_INTEGER => Value::Integer(reader.i64()?),
            CONST_FLOAT => Value::Float(f64::from_bits(reader.u64()?)),
            CONST_STRING => Value::String(reader.string()?),
            CONST_LOGICAL => Value::Logical(reader.u8()? != 0),
            other => return Err(DecodeError::UnknownConstantTag(other)),
        };
        constants.push(value);
    }

    let label_count = reader.u32()? as usize;
    let mut labels = Vec::with_capacity(label_count);
    for _ in 0..label_count {
        labels.push(reader.u32()? as usize);
    }

    let procedure_count = reader.u32()? as usize;
    let mut procedures = Vec::with_capacity(procedure_count);
    for _ in 0..procedure_count {
        let name = reader.u32()? as usize;
        let entry = reader.u32()? as usize;
        procedures.push(Procedure { name, entry });
    }

    let instruction_count = reader.u32()? as usize;
    let mut instructions = Vec::with_capacity(instruction_count);
    for _ in 0..instruction_count {
        let byte = reader.u8()?;
        let opcode = Opcode::try_from(byte).map_err(DecodeError::UnknownOpcode)?;
        let imm = reader.i64()?;
        instructions.push(Instr::new(opcode, imm));
    }

    let map_count = reader.u32()? as usize;
    let mut source_map = Vec::with_capacity(map_count);
    for _ in 0..map_count {
        let index = reader.u32()? as usize;
        let line = reader.u32()?;
        let column = reader.u32()?;
        let checksum = reader.u8()?;
        let mut position = SourcePosition::new(&tag, line, column);
        position.checksum = checksum;
        source_map.push((index, position));
    }

    if reader.at != bytes.len() {
        return Err(DecodeError::TrailingBytes(bytes.len() - reader.at));
    }

    // Structural validation: every stored reference must resolve.
    for target in &labels {
        if *target > instructions.len() {
            return Err(DecodeError::LabelTargetOutOfRange);
        }
    }
    for procedure in &procedures {
        if procedure.entry >= labels.len() || procedure.name >= constants.len() {
            return Err(DecodeError::ProcedureOutOfRange);
        }
    }
    for instr in &instructions {
        if instr.opcode.is_jump() {
            let label = instr.imm;
            if label < 0 || label as usize >= labels.len() {
                return Err(DecodeError::LabelOutOfRange);
            }
        }
        if matches!(
            instr.opcode,
            Opcode::Push | Opcode::Invoke | Opcode::LoadNamed | Opcode::StoreNamed
        ) {
            let index = instr.imm;
            if index < 0 || index as usize >= constants.len() {
                return Err(DecodeError::ConstantOutOfRange);
            }
        }
    }

    Ok(IrModule {
        tag,
        instructions,
        constants,
        labels,
        procedures,
        source_map,
    })
}

fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_str(out: &mut Vec<u8>, text: &str) {
    write_u32(out, text.len() as u32);
    out.extend_from_slice(text.as_bytes());
}

struct Reader<'b> {
    bytes: &'b [u8],
    at: usize,
}

impl<'b> Reader<'b> {
    fn take(&mut self, count: usize) -> Result<&'b [u8], DecodeError> {
        if self.at + count > self.bytes.len() {
            return Err(DecodeError::Truncated);
        }
        let slice = &self.bytes[self.at..self.at + count];
        self.at += count;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        // take() bounds the length, so the conversion is infallible.
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let length = self.u32()? as usize;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }
}
