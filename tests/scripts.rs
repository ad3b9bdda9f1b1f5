// ABOUTME: End-to-end tests driving the public API against full scripts,
// ABOUTME: the pending-execution engine, and the static analyzer.

use aviator_script::analyzer::Ty;
use aviator_script::value::Value;
use aviator_script::{compile, execute, EngineRuntime};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::rc::Rc;

#[test]
fn for_loop_accumulates_the_running_sum() {
    let v = execute("let sum = 0; for i in range(0, 5) { sum = sum + i; } sum", None).unwrap();
    assert!(matches!(v, Value::Long(10)));
}

#[test]
fn if_else_picks_the_true_branch() {
    let v = execute(r#"let a = 10; if (a > 5) { "greater" } else { "lte" }"#, None).unwrap();
    assert!(matches!(v, Value::Str(s) if &*s == "greater"));
}

#[test]
fn recursive_fibonacci() {
    let v = execute(
        "fn fib(n) { if (n <= 1) { return n; } return fib(n-1) + fib(n-2); } fib(10)",
        None,
    )
    .unwrap();
    assert!(matches!(v, Value::Long(55)));
}

#[test]
fn string_interpolation_embeds_expressions() {
    let v = execute(r#"let name = "World"; "Hello, #{name}! #{1+2}""#, None).unwrap();
    assert!(matches!(v, Value::Str(s) if &*s == "Hello, World! 3"));
}

#[test]
fn a_lambda_closes_over_its_defining_frame() {
    let v = execute(
        "fn counter() { let c = 0; return lambda() -> c = c + 1 end; } let f = counter(); f(); f(); f()",
        None,
    )
    .unwrap();
    assert!(matches!(v, Value::Long(3)));
}

#[test]
fn map_then_reduce_over_a_seq_list() {
    let v = execute(
        "let arr = seq.list(1,2,3,4,5); reduce(map(arr, lambda(x) -> x*2 end), lambda(a,x) -> a+x end, 0)",
        None,
    )
    .unwrap();
    assert!(matches!(v, Value::Long(30)));
}

#[test]
fn a_trailing_semicolon_discards_the_expression_value() {
    assert!(matches!(execute("1 + 2;", None), Ok(Value::Nil)));
    assert!(matches!(execute("1 + 2", None), Ok(Value::Long(3))));
}

#[test]
fn pending_execution_short_circuits_and_is_false_with_only_the_left_operand() {
    let rt = Rc::new(EngineRuntime::new());
    let pending = aviator_script::pending::compile("a && b", rt).unwrap();
    pending.provide("a", Value::Boolean(false));
    assert!(pending.can_execute());
    assert!(matches!(pending.execute(), Ok(Value::Boolean(false))));
}

#[test]
fn pending_execution_needs_both_operands_when_the_left_is_true() {
    let rt = Rc::new(EngineRuntime::new());
    let pending = aviator_script::pending::compile("a && b", rt).unwrap();
    pending.provide("a", Value::Boolean(true));
    assert!(!pending.can_execute());
    pending.provide("b", Value::Boolean(true));
    assert!(pending.can_execute());
    assert!(matches!(pending.execute(), Ok(Value::Boolean(true))));
}

#[test]
fn analyzer_flags_an_undefined_variable_at_its_line() {
    let script = compile("a + 1").unwrap();
    let diags = script.analyze();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].line, 1);
    assert!(diags[0].message.contains("Undefined variable 'a'"));
}

#[test]
fn analyzer_flags_a_non_boolean_if_condition() {
    let script = compile("if 1 + 2 { 0 }").unwrap();
    let diags = script.analyze();
    assert!(diags
        .iter()
        .any(|d| d.message.contains("'if' condition expects boolean, got long")));
}

#[test]
fn analyzer_flags_a_non_boolean_right_operand_of_and_with_typed_context() {
    let script = compile("if b == 2 && c = 1 { 0 }").unwrap();
    let mut types = HashMap::new();
    types.insert("b".to_string(), Ty::Long);
    types.insert("c".to_string(), Ty::Long);
    let diags = script.analyze_with_types(&types);
    assert!(diags
        .iter()
        .any(|d| d.message.contains("Right operand of '&&' must be boolean, got long")));
}

#[test]
fn compiled_scripts_can_be_executed_more_than_once_with_different_contexts() {
    let script = compile("x + 1").unwrap();
    let mut ctx1 = HashMap::new();
    ctx1.insert("x".to_string(), Value::Long(1));
    assert!(matches!(script.execute(Some(ctx1)), Ok(Value::Long(2))));

    let mut ctx2 = HashMap::new();
    ctx2.insert("x".to_string(), Value::Long(10));
    assert!(matches!(script.execute(Some(ctx2)), Ok(Value::Long(11))));
}
