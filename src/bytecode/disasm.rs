//! Textual listing of an IR module.

use std::fmt::Write;

use crate::bytecode::ir::IrModule;
use crate::bytecode::op::{Instr, Opcode};
use crate::runtime::host::SyscallKind;

/// Renders the module as a listing: label marks on the left, one
/// instruction per line, immediates decoded per opcode.
pub fn disassemble(module: &IrModule) -> String {
    let mut out = String::new();
    let count = module.instructions().len();

    for (index, instr) in module.instructions().iter().enumerate() {
        write_label_marks(&mut out, module, index);
        let _ = writeln!(out, "{:04}  {}", index, render(module, *instr));
    }
    // Labels may point one past the last instruction.
    write_label_marks(&mut out, module, count);
    out
}

/// Prints the listing to stdout.
pub fn print_listing(module: &IrModule) {
    println!("; module {}", module.tag());
    println!(
        "; {} instructions, {} constants, {} procedures",
        module.instructions().len(),
        module.constants().len(),
        module.procedures().len()
    );
    print!("{}", disassemble(module));
}

fn write_label_marks(out: &mut String, module: &IrModule, index: usize) {
    for (id, target) in module.labels().iter().enumerate() {
        if *target == index {
            let name = module
                .procedures()
                .iter()
                .find(|p| p.entry == id)
                .map(|p| format!(" ({})", module.constant(p.name as i64)));
            let _ = writeln!(out, "L{}:{}", id, name.unwrap_or_default());
        }
    }
}

fn render(module: &IrModule, instr: Instr) -> String {
    let Instr { opcode, imm } = instr;
    let mnemonic = opcode.mnemonic();
    match opcode {
        Opcode::Push | Opcode::Invoke | Opcode::LoadNamed | Opcode::StoreNamed => {
            format!("{:<12}{} ; {}", mnemonic, imm, module.constant(imm))
        }
        Opcode::SetArg => {
            format!("{:<12}'{}'", mnemonic, (imm as u8) as char)
        }
        Opcode::Syscall => match SyscallKind::from_code(imm) {
            Some(kind) => format!("{:<12}{:?}", mnemonic, kind),
            None => format!("{:<12}{} ; unknown kind", mnemonic, imm),
        },
        Opcode::LoadNumbered | Opcode::StoreNumbered => {
            format!("{:<12}#{}", mnemonic, imm)
        }
        _ if opcode.is_jump() => {
            format!("{:<12}L{} (-> {:04})", mnemonic, imm, module.label_target(imm))
        }
        _ => mnemonic.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::compile;
    use crate::lexer::Dialect;
    use crate::parser::parse;

    fn listing(source: &str) -> String {
        let module = compile(&parse("test", source, Dialect::LinuxCnc).unwrap()).unwrap();
        disassemble(&module)
    }

    #[test]
    fn test_block_listing() {
        let text = listing("G1 X10");
        assert!(text.contains("PROLOGUE"));
        assert!(text.contains("SET_ARG     'X'"));
        assert!(text.contains("SYSCALL     Motion"));
    }

    #[test]
    fn test_jump_targets_resolved() {
        let text = listing("o1 while [#1 LT 3]\n#1=[#1+1]\no1 endwhile");
        assert!(text.contains("JUMP_GE"));
        assert!(text.contains("L0:"), "loop head label:\n{}", text);
    }

    #[test]
    fn test_procedure_entry_is_named() {
        let text = listing("o100 sub\no100 endsub\no100 call");
        assert!(text.contains("(100)"), "listing:\n{}", text);
    }

    #[test]
    fn test_constants_shown_inline() {
        let text = listing("#<depth>=5");
        assert!(text.contains("; 5"));
        assert!(text.contains("; depth"));
    }
}
