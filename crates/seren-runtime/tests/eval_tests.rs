//! Integration tests for the Seren evaluator.
//!
//! Covers the core semantics:
//! - assignment and cell reads at top level
//! - `if` / `while` / `until` / `loop` / `break`
//! - method, macro, and block activation
//! - argument laziness (arguments evaluate only when the callable asks)
//! - callable self-naming and documentation
//! - list and text natives

use pretty_assertions::assert_eq;
use seren_runtime::{FatalError, ObjRef, Runtime};
use seren_types::Message;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn msg(name: &str) -> Message {
    Message::new(name)
}

/// `name = <value>` as a message tree.
fn assign(name: &str, value: impl Into<seren_types::MessageArg>) -> Message {
    Message::new("=").with_arg(Message::new(name)).with_arg(value)
}

/// Evaluate at top level, panicking on faults.
fn eval(rt: &mut Runtime, m: &Message) -> ObjRef {
    rt.evaluate(m).expect("evaluation failed")
}

fn eval_number(rt: &mut Runtime, m: &Message) -> i64 {
    let value = eval(rt, m);
    rt.number_value(value).expect("result is not a number")
}

fn eval_text(rt: &mut Runtime, m: &Message) -> String {
    let value = eval(rt, m);
    rt.text_value(value).expect("result is not a text").to_string()
}

/// Register a counting probe native on the Ground; returns the counter.
fn probe(rt: &mut Runtime, name: &'static str) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    rt.register_native(rt.ground, name, "test probe", move |rt, _ctx, _msg, _on| {
        h.set(h.get() + 1);
        Ok(rt.nil)
    });
    hits
}

// ══════════════════════════════════════════════════════════════════════════════
// Assignment & cell reads
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn assignment_binds_a_ground_cell() {
    let mut rt = Runtime::new();
    let returned = eval_number(&mut rt, &assign("x", 42));
    assert_eq!(returned, 42);
    assert_eq!(eval_number(&mut rt, &msg("x")), 42);
}

#[test]
fn reading_an_unbound_name_reports_a_lookup_condition() {
    let mut rt = Runtime::new();
    let err = rt.evaluate(&msg("nonexistent")).unwrap_err();
    let FatalError::Unhandled(report) = err else {
        panic!("expected an unhandled condition");
    };
    assert_eq!(report.kind, "Condition Error Lookup");
    assert_eq!(report.fields, vec![("cellName".to_string(), "\"nonexistent\"".to_string())]);
}

#[test]
fn assignment_on_an_explicit_receiver_stays_local() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("obj", msg("Origin").then(msg("mimic"))));
    eval(&mut rt, &msg("obj").then(assign("answer", 42)));
    assert_eq!(eval_number(&mut rt, &msg("obj").then(msg("answer"))), 42);
    // the unqualified name never landed on Ground or Origin
    assert!(rt.evaluate(&msg("answer")).is_err());
    assert!(rt.get_cell(rt.origin, "answer").is_none());
}

#[test]
fn increment_reads_sends_succ_and_writes_back() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("n", 5));
    let bumped = eval_number(&mut rt, &Message::new("++").with_arg(msg("n")));
    assert_eq!(bumped, 6);
    assert_eq!(eval_number(&mut rt, &msg("n")), 6);
}

#[test]
fn increment_dispatches_through_a_redefined_assignment() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("n", 5));

    // shadow `=` on Ground with a counting version
    let writes = Rc::new(Cell::new(0));
    let w = Rc::clone(&writes);
    rt.register_native(rt.ground, "=", "counting assignment", move |rt, ctx, msg, on| {
        w.set(w.get() + 1);
        let name = rt.unevaluated_name(msg, 0, ctx)?;
        let value = rt.eval_arg(msg, 1, ctx)?;
        rt.set_cell(on, &name, value);
        Ok(value)
    });

    let bumped = eval_number(&mut rt, &Message::new("++").with_arg(msg("n")));
    assert_eq!(bumped, 6);
    assert_eq!(writes.get(), 1);
    assert_eq!(eval_number(&mut rt, &msg("n")), 6);
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn if_takes_the_matching_branch() {
    let mut rt = Runtime::new();
    let then_branch = Message::new("if").with_arg(msg("true")).with_arg(1).with_arg(2);
    assert_eq!(eval_number(&mut rt, &then_branch), 1);

    let else_branch = Message::new("if").with_arg(msg("false")).with_arg(1).with_arg(2);
    assert_eq!(eval_number(&mut rt, &else_branch), 2);
}

#[test]
fn if_without_a_matching_branch_returns_the_test_value() {
    let mut rt = Runtime::new();
    let no_else = Message::new("if").with_arg(msg("false")).with_arg(1);
    let value = eval(&mut rt, &no_else);
    assert_eq!(value, rt.falsity);
}

#[test]
fn if_never_touches_the_untaken_branch() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let m = Message::new("if").with_arg(msg("false")).with_arg(msg("probe")).with_arg(7);
    assert_eq!(eval_number(&mut rt, &m), 7);
    assert_eq!(hits.get(), 0);
}

#[test]
fn while_reevaluates_its_condition_and_returns_the_last_body_value() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("x", 0));
    let m = Message::new("while")
        .with_arg(msg("x").then(Message::new("<").with_arg(3)))
        .with_arg(Message::new("++").with_arg(msg("x")));
    assert_eq!(eval_number(&mut rt, &m), 3);
    assert_eq!(eval_number(&mut rt, &msg("x")), 3);
}

#[test]
fn while_with_a_false_condition_never_runs_the_body() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let m = Message::new("while").with_arg(msg("false")).with_arg(msg("probe"));
    let value = eval(&mut rt, &m);
    assert_eq!(value, rt.nil);
    assert_eq!(hits.get(), 0);

    // the bodiless form yields nil as well
    let bare = Message::new("while").with_arg(msg("false"));
    let value = eval(&mut rt, &bare);
    assert_eq!(value, rt.nil);
}

#[test]
fn until_loops_while_the_condition_is_false() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("x", 0));
    let m = Message::new("until")
        .with_arg(msg("x").then(Message::new(">").with_arg(2)))
        .with_arg(Message::new("++").with_arg(msg("x")));
    assert_eq!(eval_number(&mut rt, &m), 3);
}

#[test]
fn break_terminates_loop_with_its_value() {
    let mut rt = Runtime::new();
    let m = Message::new("loop").with_arg(Message::new("break").with_arg(42));
    assert_eq!(eval_number(&mut rt, &m), 42);
}

#[test]
fn break_in_a_while_condition_terminates_that_while() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let m = Message::new("while")
        .with_arg(Message::new("break").with_arg(9))
        .with_arg(msg("probe"));
    assert_eq!(eval_number(&mut rt, &m), 9);
    assert_eq!(hits.get(), 0);
}

#[test]
fn break_binds_to_the_innermost_loop() {
    let mut rt = Runtime::new();
    let inner = Message::new("loop").with_arg(Message::new("break").with_arg(1));
    let body = inner.then(Message::new("break").with_arg(2));
    let outer = Message::new("loop").with_arg(body);
    assert_eq!(eval_number(&mut rt, &outer), 2);
}

#[test]
fn break_outside_any_loop_is_a_top_level_fault() {
    let mut rt = Runtime::new();
    let err = rt.evaluate(&msg("break")).unwrap_err();
    assert!(matches!(err, FatalError::StrayControlFlow("break")));
}

// ══════════════════════════════════════════════════════════════════════════════
// Methods
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn method_binds_parameters_and_evaluates_its_body() {
    let mut rt = Runtime::new();
    let body = msg("x").then(Message::new("+").with_arg(msg("x")));
    let define = assign("double", Message::new("method").with_arg(msg("x")).with_arg(body));
    eval(&mut rt, &define);
    assert_eq!(eval_number(&mut rt, &Message::new("double").with_arg(21)), 42);
}

#[test]
fn method_body_resolves_against_the_receiver_not_the_definition_site() {
    let mut rt = Runtime::new();
    // obj = Origin mimic; obj answer = 42
    eval(&mut rt, &assign("obj", msg("Origin").then(msg("mimic"))));
    eval(&mut rt, &msg("obj").then(assign("answer", 42)));
    // getter defined at top level, installed on obj without activation
    let getter = assign("getter", Message::new("method").with_arg(msg("answer")));
    eval(&mut rt, &getter);
    let install = msg("obj").then(assign("get", Message::new("cell").with_arg("getter")));
    eval(&mut rt, &install);

    assert_eq!(eval_number(&mut rt, &msg("obj").then(msg("get"))), 42);
    // the cell lives on obj, not on Ground
    assert!(rt.evaluate(&msg("get")).is_err());
}

#[test]
fn method_with_wrong_argument_count_reports_an_arity_condition() {
    let mut rt = Runtime::new();
    let define = assign("f", Message::new("method").with_arg(msg("x")).with_arg(msg("x")));
    eval(&mut rt, &define);
    let err = rt.evaluate(&msg("f")).unwrap_err();
    let FatalError::Unhandled(report) = err else {
        panic!("expected an unhandled condition");
    };
    assert_eq!(report.kind, "Condition Error Arity");
    assert_eq!(
        report.fields,
        vec![
            ("expected".to_string(), "1".to_string()),
            ("given".to_string(), "0".to_string()),
        ]
    );
}

#[test]
fn arity_is_checked_before_any_argument_evaluates() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let define = assign("f", Message::new("method").with_arg(msg("x")).with_arg(msg("x")));
    eval(&mut rt, &define);
    let call = Message::new("f").with_arg(msg("probe")).with_arg(msg("probe"));
    assert!(rt.evaluate(&call).is_err());
    assert_eq!(hits.get(), 0);
}

#[test]
fn assignment_stamps_a_callable_name_once() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("foo", Message::new("method").with_arg(msg("nil"))));
    let foo = rt.get_cell(rt.ground, "foo").unwrap();
    assert_eq!(rt.callable_name(foo), Some("foo"));

    // re-binding under another name keeps the original
    eval(&mut rt, &assign("bar", Message::new("cell").with_arg("foo")));
    let bar = rt.get_cell(rt.ground, "bar").unwrap();
    assert_eq!(rt.callable_name(bar), Some("foo"));
}

#[test]
fn name_cell_reports_the_identity_name() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("foo", Message::new("method").with_arg(msg("nil"))));
    let m = Message::new("cell").with_arg("foo").then(msg("name"));
    assert_eq!(eval_text(&mut rt, &m), "foo");
}

#[test]
fn method_documentation_literal_is_kept() {
    let mut rt = Runtime::new();
    let define = assign(
        "incr",
        Message::new("method")
            .with_arg("adds one to its argument")
            .with_arg(msg("x"))
            .with_arg(msg("x").then(Message::new("+").with_arg(1))),
    );
    eval(&mut rt, &define);
    let m = Message::new("cell").with_arg("incr").then(msg("documentation"));
    assert_eq!(eval_text(&mut rt, &m), "adds one to its argument");
    // the doc literal is not a parameter
    assert_eq!(eval_number(&mut rt, &Message::new("incr").with_arg(4)), 5);
}

// ══════════════════════════════════════════════════════════════════════════════
// Macros & laziness
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn macro_arguments_stay_unevaluated() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    eval(&mut rt, &assign("skip", Message::new("macro").with_arg(msg("nil"))));
    let value = eval(&mut rt, &Message::new("skip").with_arg(msg("probe")));
    assert_eq!(value, rt.nil);
    assert_eq!(hits.get(), 0);
}

#[test]
fn macro_evaluates_arguments_on_demand_through_call() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let body = msg("call").then(Message::new("evalArgAt").with_arg(0));
    eval(&mut rt, &assign("first", Message::new("macro").with_arg(body)));
    eval(&mut rt, &Message::new("first").with_arg(msg("probe")));
    assert_eq!(hits.get(), 1);
}

#[test]
fn macro_receives_arguments_as_reified_messages() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let body = msg("call").then(Message::new("argAt").with_arg(0));
    eval(&mut rt, &assign("quote", Message::new("macro").with_arg(body)));
    let reified = eval(&mut rt, &Message::new("quote").with_arg(msg("probe")));
    assert_eq!(rt.kind_name(reified), "Message");
    assert_eq!(hits.get(), 0);
}

#[test]
fn macro_inspects_arguments_through_call_without_evaluating() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    let body = msg("call").then(msg("argCount"));
    eval(&mut rt, &assign("count", Message::new("macro").with_arg(body)));
    let m = Message::new("count").with_arg(msg("probe")).with_arg(msg("probe"));
    assert_eq!(eval_number(&mut rt, &m), 2);
    assert_eq!(hits.get(), 0);
}

// ══════════════════════════════════════════════════════════════════════════════
// Blocks
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn block_closes_over_its_definition_context() {
    let mut rt = Runtime::new();
    // maker = method(v, fn(v)); b = maker(10); b call
    let block = Message::new("fn").with_arg(msg("v"));
    let define = assign("maker", Message::new("method").with_arg(msg("v")).with_arg(block));
    eval(&mut rt, &define);
    eval(&mut rt, &assign("b", Message::new("maker").with_arg(10)));
    assert_eq!(eval_number(&mut rt, &msg("b").then(msg("call"))), 10);
}

#[test]
fn block_access_does_not_activate() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("b", Message::new("fn").with_arg(7)));
    let value = eval(&mut rt, &msg("b"));
    assert_eq!(rt.kind_name(value), "LexicalBlock");
    assert_eq!(eval_number(&mut rt, &msg("b").then(msg("call"))), 7);
}

#[test]
fn block_parameters_shadow_the_enclosing_scope() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("v", 1));
    eval(&mut rt, &assign("b", Message::new("fn").with_arg(msg("v")).with_arg(msg("v"))));
    let call = msg("b").then(Message::new("call").with_arg(99));
    assert_eq!(eval_number(&mut rt, &call), 99);
}

// ══════════════════════════════════════════════════════════════════════════════
// Lists
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn list_grows_with_append_and_indexes_from_both_ends() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    let fill = msg("l")
        .then(Message::new("<<").with_arg(10))
        .then(Message::new("<<").with_arg(20))
        .then(Message::new("<<").with_arg(30));
    eval(&mut rt, &fill);

    assert_eq!(eval_number(&mut rt, &msg("l").then(msg("size"))), 3);
    assert_eq!(eval_number(&mut rt, &msg("l").then(Message::new("at").with_arg(1))), 20);
    assert_eq!(eval_number(&mut rt, &msg("l").then(Message::new("at").with_arg(-1))), 30);
    let oob = eval(&mut rt, &msg("l").then(Message::new("at").with_arg(9)));
    assert_eq!(oob, rt.nil);
}

#[test]
fn list_set_past_the_end_pads_with_nils() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    eval(&mut rt, &msg("l").then(Message::new("<<").with_arg(1)));
    let put = msg("l").then(Message::new("at=").with_arg(4).with_arg(9));
    assert_eq!(eval_number(&mut rt, &put), 9);
    assert_eq!(eval_number(&mut rt, &msg("l").then(msg("size"))), 5);
    let gap = eval(&mut rt, &msg("l").then(Message::new("at").with_arg(2)));
    assert_eq!(gap, rt.nil);
    assert_eq!(eval_number(&mut rt, &msg("l").then(Message::new("at").with_arg(-1))), 9);
}

#[test]
fn list_each_sends_its_chain_to_every_element() {
    let mut rt = Runtime::new();
    let hits = probe(&mut rt, "probe");
    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    let fill = msg("l")
        .then(Message::new("<<").with_arg(1))
        .then(Message::new("<<").with_arg(2))
        .then(Message::new("<<").with_arg(3));
    eval(&mut rt, &fill);
    eval(&mut rt, &msg("l").then(Message::new("each").with_arg(msg("probe"))));
    assert_eq!(hits.get(), 3);
}

#[test]
fn list_each_with_names_binds_index_and_element() {
    let mut rt = Runtime::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    rt.register_native(rt.ground, "record", "test recorder", move |rt, ctx, msg, _on| {
        let value = rt.eval_arg(msg, 0, ctx)?;
        if let Some(n) = rt.number_value(value) {
            s.borrow_mut().push(n);
        }
        Ok(rt.nil)
    });

    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    let fill = msg("l")
        .then(Message::new("<<").with_arg(10))
        .then(Message::new("<<").with_arg(20));
    eval(&mut rt, &fill);

    let body = Message::new("record")
        .with_arg(msg("i"))
        .then(Message::new("record").with_arg(msg("x")));
    let each = Message::new("each").with_arg(msg("i")).with_arg(msg("x")).with_arg(body);
    eval(&mut rt, &msg("l").then(each));
    assert_eq!(*seen.borrow(), [0, 10, 1, 20]);
}

#[test]
fn list_clear_empties_in_place() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    eval(&mut rt, &msg("l").then(Message::new("<<").with_arg(1)));
    let t = eval(&mut rt, &msg("l").then(msg("empty?")));
    assert_eq!(t, rt.falsity);
    eval(&mut rt, &msg("l").then(msg("clear!")));
    let t = eval(&mut rt, &msg("l").then(msg("empty?")));
    assert_eq!(t, rt.truth);
}

#[test]
fn self_referential_list_compares_and_renders() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    eval(&mut rt, &msg("l").then(Message::new("<<").with_arg(msg("l"))));

    let value = eval(&mut rt, &msg("l").then(Message::new("==").with_arg(msg("l"))));
    assert_eq!(value, rt.truth);
    assert_eq!(eval_text(&mut rt, &msg("l").then(msg("inspect"))), "[[...]]");
    assert_eq!(eval_text(&mut rt, &msg("l").then(msg("notice"))), "[[...]]");
}

#[test]
fn list_inspect_renders_elements() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("l", msg("List").then(msg("mimic"))));
    let fill = msg("l")
        .then(Message::new("<<").with_arg(1))
        .then(Message::new("<<").with_arg("two"));
    eval(&mut rt, &fill);
    assert_eq!(eval_text(&mut rt, &msg("l").then(msg("inspect"))), "[1, \"two\"]");
}

// ══════════════════════════════════════════════════════════════════════════════
// Text & misc behavior
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn text_length_and_indexing() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("t", "hi"));
    assert_eq!(eval_number(&mut rt, &msg("t").then(msg("length"))), 2);
    assert_eq!(
        eval_number(&mut rt, &msg("t").then(Message::new("[]").with_arg(0))),
        'h' as i64
    );
    assert_eq!(
        eval_number(&mut rt, &msg("t").then(Message::new("[]").with_arg(-1))),
        'i' as i64
    );
    let oob = eval(&mut rt, &msg("t").then(Message::new("[]").with_arg(5)));
    assert_eq!(oob, rt.nil);
}

#[test]
fn derive_routes_through_the_mimic_cell() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("obj", msg("Origin").then(msg("mimic"))));
    let obj = rt.get_cell(rt.ground, "obj").unwrap();

    let clones = Rc::new(Cell::new(0));
    let c = Rc::clone(&clones);
    rt.register_native(obj, "mimic", "counting clone", move |rt, _ctx, _msg, on| {
        c.set(c.get() + 1);
        Ok(rt.mimic_of(on))
    });

    let derived = eval(&mut rt, &msg("obj").then(msg("derive")));
    assert_eq!(clones.get(), 1);
    assert!(rt.is_a(derived, obj));
}

#[test]
fn kind_reports_the_nearest_kind_label() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("x", 42));
    assert_eq!(eval_text(&mut rt, &msg("x").then(msg("kind"))), "Number");
    assert_eq!(eval_text(&mut rt, &msg("Origin").then(msg("mimic")).then(msg("kind"))), "Origin");
}

#[test]
fn equality_is_structural_on_payloads() {
    let mut rt = Runtime::new();
    eval(&mut rt, &assign("x", 1));
    eval(&mut rt, &assign("y", 1));
    let value = eval(&mut rt, &msg("x").then(Message::new("==").with_arg(msg("y"))));
    assert_eq!(value, rt.truth);
    let value = eval(&mut rt, &msg("x").then(Message::new("==").with_arg("1")));
    assert_eq!(value, rt.falsity);
}

#[test]
fn literal_carrier_messages_construct_their_values() {
    let mut rt = Runtime::new();
    assert_eq!(eval_number(&mut rt, &Message::new("internal:createNumber").with_arg(7)), 7);
    assert_eq!(eval_text(&mut rt, &Message::new("internal:createText").with_arg("ok")), "ok");
}
