//! End-to-end tests driving the real parse pipeline: source text in,
//! [`CompiledCode`](compactjs::CompiledCode) (inspected through the
//! disassembler) or a specific [`ErrorKind`] out. These catch regressions
//! in how statement/expression compiling and the post-processor cooperate
//! that a unit test inside a single module wouldn't see.

use compactjs::bytecode::{Disassembler, DisassemblyOptions};
use compactjs::literals::LiteralStore;
use compactjs::{parse_eval, parse_function, parse_script, ErrorKind};

fn disassemble(source: &str) -> (String, LiteralStore) {
    let mut store = LiteralStore::new();
    let output = parse_script(source, &mut store).unwrap_or_else(|e| panic!("parse failed for {:?}: {:?}", source, e));
    let options = DisassemblyOptions { show_constant_values: true, show_analysis: false, show_jump_labels: true };
    let text = Disassembler::with_options(options).disassemble_function(&output.top_level, &store);
    (text, store)
}

#[test]
fn simple_arithmetic_pushes_operands_and_adds() {
    let (text, _) = disassemble("1 + 2;");
    assert!(text.contains("CbcPushLiteral"));
    assert!(text.contains("CbcAdd") || text.contains("CbcAddRightLiteral"));
    assert!(text.contains("CbcPop"));
}

#[test]
fn var_declaration_with_initializer_assigns_ident() {
    let (text, _) = disassemble("var x = 10;");
    assert!(text.contains("CbcAssignIdent"));
    assert!(text.contains("10"));
}

#[test]
fn function_declaration_and_call_round_trip() {
    let mut store = LiteralStore::new();
    let output = parse_script("function add(a, b) { return a + b; } add(1, 2);", &mut store).unwrap();
    assert_eq!(output.functions.len(), 1);
    let nested = &output.functions[0];
    assert_eq!(nested.groups.argument_count(), 2);

    let disassembler = Disassembler::new();
    let nested_text = disassembler.disassemble_function(nested, &store);
    assert!(nested_text.contains("CbcReturn"));

    let top_text = disassembler.disassemble_function(&output.top_level, &store);
    assert!(top_text.contains("CbcAssignIdent"));
    assert!(top_text.contains("CbcCall"));
}

#[test]
fn if_else_branches_around_each_other() {
    let (text, _) = disassemble("if (x) { y = 1; } else { y = 2; }");
    assert!(text.contains("CbcBranchIfFalseForward"));
    assert!(text.contains("CbcJumpForward"));
}

#[test]
fn while_loop_tests_after_the_body() {
    let (text, _) = disassemble("while (x < 10) { x = x + 1; }");
    assert!(text.contains("CbcBranchIfTrueBackward"));
}

#[test]
fn three_clause_for_emits_update_then_test_after_body() {
    let (text, _) = disassemble("for (var i = 0; i < 10; i = i + 1) { total = total + i; }");
    assert!(text.contains("CbcBranchIfTrueBackward"));
    assert!(text.contains("CbcJumpForward"));
}

#[test]
fn for_in_uses_the_extended_context_opcodes() {
    let (text, _) = disassemble("for (var k in obj) { seen = k; }");
    assert!(text.contains("CbcExtForInCreateContext"));
    assert!(text.contains("CbcExtForInGetNext"));
    assert!(text.contains("CbcExtBranchIfForInHasNext"));
}

#[test]
fn switch_with_default_builds_a_mismatch_chain() {
    let (text, _) = disassemble("switch (x) { case 1: y = 1; break; case 2: y = 2; break; default: y = 0; }");
    assert!(text.contains("CbcStrictEqual"));
    assert!(text.contains("CbcBranchIfFalseForward"));
}

#[test]
fn try_catch_finally_emits_the_context_family() {
    let (text, _) = disassemble("try { risky(); } catch (e) { handle(e); } finally { cleanup(); }");
    assert!(text.contains("CbcExtTryCreateContext"));
    assert!(text.contains("CbcExtCatch"));
    assert!(text.contains("CbcExtFinally"));
    assert!(text.contains("CbcContextEnd"));
}

#[test]
fn with_statement_emits_a_create_context() {
    let (text, _) = disassemble("with (obj) { x = 1; }");
    assert!(text.contains("CbcExtWithCreateContext"));
    assert!(text.contains("CbcContextEnd"));
}

#[test]
fn labeled_continue_targets_the_named_loop_not_the_switch() {
    let (text, _) = disassemble(
        "outer: for (var i = 0; i < 3; i = i + 1) { switch (i) { case 1: continue outer; } }",
    );
    assert!(text.contains("CbcJumpForward"));
}

#[test]
fn directive_prologue_turns_on_strict_mode() {
    let mut store = LiteralStore::new();
    let output = parse_script("\"use strict\";\nvar x = 1;", &mut store).unwrap();
    assert!(output.top_level.is_strict());
}

#[test]
fn eval_is_flagged_direct_even_though_it_shares_script_shape() {
    let mut store = LiteralStore::new();
    let output = parse_eval("1 + 1;", false, &mut store).unwrap();
    assert!(output.top_level.has_flag(compactjs::bytecode::compiled_code::status_flags::DIRECT_EVAL));
}

#[test]
fn parse_function_binds_declared_parameters() {
    let mut store = LiteralStore::new();
    let output = parse_function(&["a", "b"], "return a + b;", &mut store).unwrap();
    assert_eq!(output.top_level.groups.argument_count(), 2);
}

#[test]
fn break_outside_a_loop_is_a_parse_error() {
    let mut store = LiteralStore::new();
    let err = parse_script("break;", &mut store).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::BreakNotInLoopOrSwitch));
}

#[test]
fn duplicate_default_clauses_are_rejected() {
    let mut store = LiteralStore::new();
    let err = parse_script("switch (x) { default: a = 1; default: a = 2; }", &mut store).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MultipleDefaultNotAllowed));
}

#[test]
fn assigning_to_eval_in_strict_mode_is_rejected() {
    let mut store = LiteralStore::new();
    let err = parse_script("\"use strict\";\neval = 1;", &mut store).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::EvalCannotBeAssigned));
}

#[test]
fn deeply_nested_object_and_array_literals_still_compile() {
    let (text, _) = disassemble("var point = { x: 1, y: [1, 2, 3], tag: \"p\" };");
    assert!(text.contains("CbcAssignIdent"));
}
