//! CLI host wrapper: parses a file (or stdin line-by-line in REPL mode) and
//! reports success or a [`Diagnostic`]. There is no VM here to execute
//! anything with (spec.md section 1) — `--debug-tokens`/`--debug-bytecode`
//! exist to inspect what the parser produced, not to run it.

use std::env;
use std::fs;
use std::io::{self, Write};

use compactjs::bytecode::{Disassembler, DisassemblyOptions};
use compactjs::error::Diagnostic;
use compactjs::lexer::{Lexer, SlashContext};
use compactjs::literals::LiteralStore;
use compactjs::{parse_script, Result};

fn main() {
    if let Err(code) = run() {
        std::process::exit(code);
    }
}

fn run() -> std::result::Result<(), i32> {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl_mode(),
        2 if args[1] == "--debug-tokens" => repl_tokens(),
        2 if args[1] == "--debug-bytecode" => repl_bytecode(),
        2 => execute_file(&args[1]),
        3 if args[1] == "--debug-tokens" => debug_tokens_for_file(&args[2]),
        3 if args[1] == "--debug-bytecode" => debug_bytecode_for_file(&args[2]),
        _ => {
            eprintln!("usage: {} [file.js]", args[0]);
            eprintln!("       {} --debug-tokens [file.js]", args[0]);
            eprintln!("       {} --debug-bytecode [file.js]", args[0]);
            Err(1)
        }
    }
}

fn report(source: &str, source_name: &str, result: Result<()>) -> std::result::Result<(), i32> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let diagnostic = Diagnostic::from(e).with_source(source_name);
            eprintln!("{}", diagnostic.format_with_source(source));
            Err(1)
        }
    }
}

fn execute_file(filename: &str) -> std::result::Result<(), i32> {
    let source = fs::read_to_string(filename).map_err(|e| {
        eprintln!("error reading {}: {}", filename, e);
        1
    })?;
    let mut store = LiteralStore::new();
    let result = parse_script(&source, &mut store).map(|_| ());
    report(&source, filename, result)
}

fn debug_bytecode_for_file(filename: &str) -> std::result::Result<(), i32> {
    let source = fs::read_to_string(filename).map_err(|e| {
        eprintln!("error reading {}: {}", filename, e);
        1
    })?;
    let mut store = LiteralStore::new();
    let result = parse_script(&source, &mut store);
    match result {
        Ok(output) => {
            let disassembler = Disassembler::with_options(DisassemblyOptions::default());
            println!("{}", disassembler.disassemble_function(&output.top_level, &store));
            for (i, func) in output.functions.iter().enumerate() {
                println!("--- function #{} ---", i);
                println!("{}", disassembler.disassemble_function(func, &store));
            }
            Ok(())
        }
        Err(e) => report(&source, filename, Err(e)),
    }
}

fn debug_tokens_for_file(filename: &str) -> std::result::Result<(), i32> {
    let source = fs::read_to_string(filename).map_err(|e| {
        eprintln!("error reading {}: {}", filename, e);
        1
    })?;
    match print_tokens(&source) {
        Ok(()) => Ok(()),
        Err(e) => report(&source, filename, Err(e)),
    }
}

fn print_tokens(source: &str) -> Result<()> {
    let mut lexer = Lexer::new(source)?;
    loop {
        let tok = lexer.current();
        println!("{:?} {:?}", tok.kind, lexer.text(tok.span));
        if tok.is_eof() {
            break;
        }
        lexer.advance(SlashContext::RegexpAllowed)?;
    }
    Ok(())
}

fn repl_mode() -> std::result::Result<(), i32> {
    println!("compactjs v{} — parses each line, there is no VM to run it with", compactjs::VERSION);
    println!("type '.exit' to quit");
    loop {
        print!("js> ");
        io::stdout().flush().ok();
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let line = input.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ".exit" {
                    break;
                }
                let mut store = LiteralStore::new();
                match parse_script(line, &mut store) {
                    Ok(_) => println!("ok"),
                    Err(e) => {
                        let diagnostic = Diagnostic::from(e);
                        eprintln!("{}", diagnostic.format_with_source(line));
                    }
                }
            }
            Err(e) => {
                eprintln!("error reading stdin: {}", e);
                break;
            }
        }
    }
    Ok(())
}

fn repl_tokens() -> std::result::Result<(), i32> {
    println!("type JavaScript to see its tokens, '.exit' to quit");
    loop {
        print!("tokens> ");
        io::stdout().flush().ok();
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {
                let line = input.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ".exit" {
                    break;
                }
                if let Err(e) = print_tokens(line) {
                    eprintln!("{}", Diagnostic::from(e).format_with_source(line));
                }
            }
            Err(e) => {
                eprintln!("error reading stdin: {}", e);
                break;
            }
        }
    }
    Ok(())
}

fn repl_bytecode() -> std::result::Result<(), i32> {
    println!("type JavaScript to see its compiled byte code, '.exit' to quit");
    let disassembler = Disassembler::new();
    loop {
        print!("bytecode> ");
        io::stdout().flush().ok();
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {
                let line = input.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ".exit" {
                    break;
                }
                let mut store = LiteralStore::new();
                match parse_script(line, &mut store) {
                    Ok(output) => println!("{}", disassembler.disassemble_function(&output.top_level, &store)),
                    Err(e) => eprintln!("{}", Diagnostic::from(e).format_with_source(line)),
                }
            }
            Err(e) => {
                eprintln!("error reading stdin: {}", e);
                break;
            }
        }
    }
    Ok(())
}
