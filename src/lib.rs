// ABOUTME: Public entry points (§6): `execute` runs a script once, `compile`
// ABOUTME: returns a reusable handle that can also be walked by the static analyzer.

pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod config;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pending;
pub mod token;
pub mod value;

use analyzer::{Analyzer, Ty};
use ast::Stmt;
use diagnostics::Diagnostic;
use env::Environment;
use error::EngineError;
use interpreter::Interpreter;
use std::collections::HashMap;
use std::rc::Rc;
use value::Value;

/// Builds a fresh global environment with the built-in catalog already
/// registered, the frame every `execute`/`compile` call runs against. Also
/// useful to hosts (e.g. the REPL) that need a frame to keep reusing across
/// several `Interpreter::run` calls instead of the one-shot `execute` API.
pub fn new_global_env(context: Option<HashMap<String, Value>>) -> Rc<Environment> {
    let env = Environment::new();
    builtins::register_builtins(&env);
    if let Some(ctx) = context {
        for (name, value) in ctx {
            env.define(name, value);
        }
    }
    env
}

/// Parses and runs `source` once against an optional name→value context
/// (§6). Returns the script's value: the last statement's value, or nil.
pub fn execute(source: &str, context: Option<HashMap<String, Value>>) -> Result<Value, EngineError> {
    let stmts = parser::parse_script(source)?;
    let env = new_global_env(context);
    Ok(Interpreter::new().run(&stmts, &env)?)
}

/// A parsed statement list bound for repeated execution and/or static
/// analysis without re-parsing (§6, SPEC_FULL §B).
pub struct CompiledScript {
    stmts: Vec<Stmt>,
}

/// Parses `source` into a reusable handle.
pub fn compile(source: &str) -> Result<CompiledScript, EngineError> {
    let stmts = parser::parse_script(source)?;
    Ok(CompiledScript { stmts })
}

impl CompiledScript {
    /// Re-runs the parsed statement list against a fresh environment seeded
    /// with an optional name→value context.
    pub fn execute(&self, context: Option<HashMap<String, Value>>) -> Result<Value, EngineError> {
        let env = new_global_env(context);
        Ok(Interpreter::new().run(&self.stmts, &env)?)
    }

    /// Runs the static analyzer (§4.6) over the same parsed tree, seeding
    /// its root scope with the built-in catalog plus any caller-supplied
    /// variable types. Never executes the script.
    pub fn analyze_with_types(&self, type_env: &HashMap<String, Ty>) -> Vec<Diagnostic> {
        let catalog = builtins::catalog();
        Analyzer::new(&catalog, type_env).analyze_script(&self.stmts)
    }

    /// `analyze_with_types` with an empty caller type environment.
    pub fn analyze(&self) -> Vec<Diagnostic> {
        self.analyze_with_types(&HashMap::new())
    }
}

/// A [`pending::Runtime`] backed by this crate's own parser and interpreter,
/// for hosts that don't need to supply their own evaluator.
pub struct EngineRuntime {
    builtin_names: Vec<&'static str>,
}

impl Default for EngineRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRuntime {
    pub fn new() -> Self {
        EngineRuntime {
            builtin_names: builtins::catalog().into_iter().map(|(name, _)| name).collect(),
        }
    }
}

impl pending::Runtime for EngineRuntime {
    fn run(&self, expression_text: &str, context: &HashMap<String, Value>) -> Result<Value, error::EvalError> {
        let expr = parser::parse_expr_str(expression_text)
            .map_err(|e| error::EvalError::runtime_error("pending", e.to_string()))?;
        let env = new_global_env(None);
        for (name, value) in context {
            env.define(name.clone(), value.clone());
        }
        Interpreter::new().eval_expr(&expr, &env)
    }

    fn builtin_identifiers(&self) -> &[&str] {
        &self.builtin_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_returns_last_statement_value() {
        assert!(matches!(execute("1 + 2", None), Ok(Value::Long(3))));
    }

    #[test]
    fn execute_honors_supplied_context() {
        let mut ctx = HashMap::new();
        ctx.insert("x".to_string(), Value::Long(41));
        assert!(matches!(execute("x + 1", Some(ctx)), Ok(Value::Long(42))));
    }

    #[test]
    fn compile_allows_repeated_execution() {
        let script = compile("x + 1").unwrap();
        let mut ctx = HashMap::new();
        ctx.insert("x".to_string(), Value::Long(1));
        assert!(matches!(script.execute(Some(ctx)), Ok(Value::Long(2))));
        let mut ctx2 = HashMap::new();
        ctx2.insert("x".to_string(), Value::Long(10));
        assert!(matches!(script.execute(Some(ctx2)), Ok(Value::Long(11))));
    }

    #[test]
    fn compile_analyze_flags_undefined_identifiers() {
        let script = compile("let y = z + 1;").unwrap();
        let diags = script.analyze();
        assert!(diags.iter().any(|d| d.message.contains("Undefined variable 'z'")));
    }

    #[test]
    fn engine_runtime_drives_pending_execution() {
        let rt = std::rc::Rc::new(EngineRuntime::new());
        let pending = pending::compile("a && math.sqrt(4) == 2.0", rt).unwrap();
        pending.provide("a", Value::Boolean(true));
        assert!(matches!(pending.execute(), Ok(Value::Boolean(true))));
    }
}
