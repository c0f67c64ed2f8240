use crate::bytecode::op::Instr;
use crate::lexer::SourcePosition;
use crate::runtime::value::Value;

/// A compiled, immutable IR module.
///
/// Labels and procedures reference instructions by index through the label
/// table, never by pointer, so modules can be shared freely between
/// interpreter instances once translation has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    pub(crate) tag: String,
    pub(crate) instructions: Vec<Instr>,
    pub(crate) constants: Vec<Value>,
    /// Label id → instruction index. An index equal to the instruction
    /// count is a valid "past the end" target.
    pub(crate) labels: Vec<usize>,
    pub(crate) procedures: Vec<Procedure>,
    /// Statement boundaries: (instruction index, position), weakly
    /// monotonic in instruction index.
    pub(crate) source_map: Vec<(usize, SourcePosition)>,
}

/// A subroutine entry: its name lives in the constant pool, its body
/// starts at the entry label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Procedure {
    pub name: usize,
    pub entry: usize,
}

impl IrModule {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.instructions
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn constant(&self, index: i64) -> &Value {
        &self.constants[index as usize]
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Instruction index a label resolves to. Translation and decoding
    /// both guarantee every label id stored in an instruction is in range.
    pub fn label_target(&self, label: i64) -> usize {
        self.labels[label as usize]
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    pub fn procedure_by_name(&self, name: &str) -> Option<&Procedure> {
        self.procedures
            .iter()
            .find(|p| matches!(self.constants.get(p.name), Some(Value::String(s)) if s == name))
    }

    pub fn source_map(&self) -> &[(usize, SourcePosition)] {
        &self.source_map
    }

    /// The source position of the statement covering an instruction index:
    /// the last map entry at or before it.
    pub fn position_at(&self, index: usize) -> Option<&SourcePosition> {
        let upper = self.source_map.partition_point(|(i, _)| *i <= index);
        if upper == 0 {
            None
        } else {
            Some(&self.source_map[upper - 1].1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::Opcode;

    fn position(line: u32) -> SourcePosition {
        SourcePosition::new("test", line, 1)
    }

    fn sample() -> IrModule {
        IrModule {
            tag: "test".to_string(),
            instructions: vec![
                Instr::new(Opcode::Push, 0),
                Instr::plain(Opcode::Neg),
                Instr::new(Opcode::StoreNumbered, 1),
            ],
            constants: vec![Value::Integer(5), Value::String("sq".to_string())],
            labels: vec![0, 3],
            procedures: vec![Procedure { name: 1, entry: 1 }],
            source_map: vec![(0, position(1)), (2, position(2))],
        }
    }

    #[test]
    fn test_label_targets() {
        let module = sample();
        assert_eq!(module.label_target(0), 0);
        // Past-the-end targets are legal.
        assert_eq!(module.label_target(1), 3);
    }

    #[test]
    fn test_position_lookup_takes_latest_entry() {
        let module = sample();
        assert_eq!(module.position_at(0).unwrap().line, 1);
        assert_eq!(module.position_at(1).unwrap().line, 1);
        assert_eq!(module.position_at(2).unwrap().line, 2);
        assert_eq!(module.position_at(100).unwrap().line, 2);
    }

    #[test]
    fn test_procedure_by_name() {
        let module = sample();
        assert!(module.procedure_by_name("sq").is_some());
        assert!(module.procedure_by_name("nope").is_none());
    }
}
