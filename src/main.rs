// ABOUTME: Thin CLI front-end (§6): file argument, `-e <code>`, or a bare
// ABOUTME: REPL, calling only the public `execute`/`compile` API.

use aviator_script::interpreter::Interpreter;
use aviator_script::{config, execute};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

/// A dynamically-typed scripting engine.
#[derive(Parser, Debug)]
#[command(name = "aviator")]
#[command(version = config::VERSION)]
#[command(about = "Lex, parse, and evaluate Aviator Script source")]
struct CliArgs {
    /// Script file to execute. If omitted (and `-e` is not given), starts a REPL.
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Evaluate an inline snippet instead of a file.
    #[arg(short = 'e', value_name = "CODE")]
    eval: Option<String>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Some(code) = args.eval {
        return run_source(&code);
    }

    if let Some(path) = args.script {
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("cannot read script file {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        return run_source(&source);
    }

    run_repl()
}

fn run_source(source: &str) -> ExitCode {
    match execute(source, None) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_repl() -> ExitCode {
    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);

    let rl_config = Config::builder().auto_add_history(true).build();
    let mut rl = match DefaultEditor::with_config(rl_config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("failed to initialize REPL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let history_file = ".aviator_history";
    let _ = rl.load_history(history_file);

    // One global frame for the whole session, so a `let` on one line stays
    // visible on the next — the same frame `execute` would build, kept alive
    // across readline calls instead of being thrown away after each one.
    let env = aviator_script::new_global_env(None);
    let interpreter = Interpreter::new();

    loop {
        match rl.readline("aviator> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(rest) = line.strip_prefix('.') {
                    if handle_dot_command(rest, &env, &interpreter) {
                        break;
                    }
                    continue;
                }
                match aviator_script::parser::parse_script(line) {
                    Ok(stmts) => match interpreter.run(&stmts, &env) {
                        Ok(value) => println!("=> {value}"),
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Err(e) => eprintln!("parse error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("bye");
                break;
            }
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    ExitCode::SUCCESS
}

/// Dispatches a dot-prefixed REPL convenience (§6: implementation-defined,
/// outside the specification). Returns true if the REPL should exit.
fn handle_dot_command(rest: &str, env: &Rc<aviator_script::env::Environment>, interpreter: &Interpreter) -> bool {
    let mut parts = rest.splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("") {
        "help" => {
            println!("{}", config::HELP_TEXT);
            println!("Built-in functions by category:");
            for (category, names) in aviator_script::builtins::catalog_by_category() {
                println!("  {category}: {}", names.join(", "));
            }
            false
        }
        "exit" => true,
        "clear" => {
            print!("\x1B[2J\x1B[H");
            false
        }
        "vars" => {
            let mut names = env.local_names();
            names.sort();
            if names.is_empty() {
                println!("(no top-level bindings yet)");
            } else {
                for name in names {
                    println!("{name}");
                }
            }
            false
        }
        "load" => {
            let path = parts.next().unwrap_or("").trim();
            if path.is_empty() {
                eprintln!(".load requires a file path");
                return false;
            }
            match std::fs::read_to_string(path) {
                Ok(source) => match aviator_script::parser::parse_script(&source) {
                    Ok(stmts) => match interpreter.run(&stmts, env) {
                        Ok(value) => println!("=> {value}"),
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Err(e) => eprintln!("parse error: {e}"),
                },
                Err(e) => eprintln!("cannot read {path}: {e}"),
            }
            false
        }
        other => {
            eprintln!("unknown REPL command: .{other}");
            false
        }
    }
}
