// ABOUTME: Engine-wide constants: version, REPL banner, and the string-op and
// ABOUTME: recursion guards the interpreter and built-in catalog share.

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "Aviator Script";
pub const WELCOME_SUBTITLE: &str = "A dynamically-typed scripting engine";

/// Upper bound on how many frames deep a single `execute` call may recurse
/// before the interpreter raises a runtime error instead of letting the
/// host stack overflow silently (§5: "deep recursion is bounded by that
/// stack" — this guard makes the bound observable as a catchable error
/// rather than a process abort).
pub const MAX_CALL_DEPTH: usize = 2_000;

/// Built-in string operations (`string.substring`, `string.split`, …) refuse
/// inputs longer than this, to keep a pathological script from allocating
/// without bound.
pub const MAX_STRING_OP_LEN: usize = 16 * 1024 * 1024;

pub const HELP_TEXT: &str = r#"
Dot-prefixed REPL commands:
  .help          Show this help message
  .exit          Exit the REPL
  .clear         Clear the screen
  .vars          List bindings in the current top-level scope
  .load <file>   Load and execute a script file

Type any expression or statement to evaluate it. Ctrl-D also exits.
"#;
