//! Demo driver: compile a G-code file and run it against a printing or
//! recording host.

use std::{env, fs, process};

use gcvm::bytecode::disasm;
use gcvm::lexer::{Dialect, Scanner};
use gcvm::runtime::{
    BlockWords, Host, HostError, Interpreter, RecordingHost, SyscallKind, Value,
};

fn main() {
    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let show_disasm = args.contains(&"--disasm".to_string());
    let trace_json = args.contains(&"--trace-json".to_string());
    let dialect = match args.iter().position(|a| a == "--dialect") {
        Some(index) => match args.get(index + 1).map(String::as_str) {
            Some("linuxcnc") => Dialect::LinuxCnc,
            Some("rs274") => Dialect::Rs274,
            other => {
                eprintln!(
                    "unknown dialect '{}' (expected 'linuxcnc' or 'rs274')",
                    other.unwrap_or("")
                );
                process::exit(2);
            }
        },
        None => Dialect::LinuxCnc,
    };

    // First non-flag argument that is not the dialect value.
    let mut filename = None;
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--dialect" {
            skip_next = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        filename = Some(arg.clone());
        break;
    }
    let filename = match filename {
        Some(name) => name,
        None => {
            print_usage();
            process::exit(2);
        }
    };

    let source = match fs::read_to_string(&filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    };

    if tokens_only {
        dump_tokens(&filename, &source, dialect);
        return;
    }

    let module = match gcvm::compile(&filename, &source, dialect) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if show_disasm {
        disasm::print_listing(&module);
        return;
    }

    if trace_json {
        let mut vm = Interpreter::new(&module, RecordingHost::new());
        if let Err(e) = vm.execute() {
            eprintln!("{}", e);
            process::exit(1);
        }
        match serde_json::to_string_pretty(&vm.host().calls) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("failed to render trace: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let mut vm = Interpreter::new(&module, PrintingHost);
    if let Err(e) = vm.execute() {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn print_usage() {
    println!("gcvm-run - compile and execute a G-code program");
    println!();
    println!("Usage:");
    println!("  gcvm-run <file>                 Run, printing each syscall");
    println!("  gcvm-run --dialect rs274 <file> Select the RS-274 dialect");
    println!("  gcvm-run --tokens <file>        Dump the token stream");
    println!("  gcvm-run --disasm <file>        Dump the compiled module");
    println!("  gcvm-run --trace-json <file>    Run and print the trace as JSON");
}

fn dump_tokens(filename: &str, source: &str, dialect: Dialect) {
    match Scanner::new(filename, source, dialect).tokenize() {
        Ok(tokens) => {
            for spanned in tokens {
                println!(
                    "{}:{}\t{:?}",
                    spanned.position.line, spanned.position.column, spanned.token
                );
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Prints one line per syscall.
struct PrintingHost;

impl Host for PrintingHost {
    fn syscall(
        &mut self,
        kind: SyscallKind,
        value: Value,
        words: &BlockWords,
    ) -> Result<(), HostError> {
        let mut line = format!("{:?} {}", kind, value);
        for (letter, word) in words.iter() {
            line.push_str(&format!(" {}{}", letter, word));
        }
        println!("{}", line);
        Ok(())
    }
}
