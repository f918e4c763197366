//! Native operations shared by every object — the DefaultBehavior cells.
//!
//! These are ordinary cells, registered once on the shared base; at
//! dispatch level they are indistinguishable from user-defined methods,
//! so user code can shadow `if` or `while` on any object and resolution
//! picks the redefinition up like any other cell. The evaluator never
//! special-cases them.

use crate::callable::{Callable, NativeMethod, UserBody};
use crate::error::{EvalResult, Unwind};
use crate::heap::{ObjRef, Object, Payload};
use crate::runtime::{arg_as_message, Runtime};
use seren_types::{Message, MessageArg};
use std::rc::Rc;

pub(crate) fn install(rt: &mut Runtime) {
    let on = rt.default_behavior;

    rt.register_native(
        on,
        "",
        "returns the result of evaluating its first argument",
        |rt, ctx, msg, _on| rt.eval_arg(msg, 0, ctx),
    );

    rt.register_native(
        on,
        "if",
        "evaluates the first argument; if the result is true evaluates and returns the second argument, otherwise the third. a missing branch returns the test value itself",
        |rt, ctx, msg, _on| {
            let test = rt.eval_arg(msg, 0, ctx)?;
            if rt.is_true(test) {
                if msg.arg_count() > 1 {
                    rt.eval_arg(msg, 1, ctx)
                } else {
                    Ok(test)
                }
            } else if msg.arg_count() > 2 {
                rt.eval_arg(msg, 2, ctx)
            } else {
                Ok(test)
            }
        },
    );

    rt.register_native(
        on,
        "while",
        "while the first argument evaluates to something true, loops and evaluates the second argument",
        |rt, ctx, msg, _on| run_loop(rt, ctx, msg, false),
    );

    rt.register_native(
        on,
        "until",
        "until the first argument evaluates to something true, loops and evaluates the second argument",
        |rt, ctx, msg, _on| run_loop(rt, ctx, msg, true),
    );

    rt.register_native(
        on,
        "loop",
        "loops forever evaluating its argument, until a break unwinds it",
        |rt, ctx, msg, _on| loop {
            if msg.arg_count() == 0 {
                continue;
            }
            match rt.eval_arg(msg, 0, ctx) {
                Ok(_) => {}
                Err(Unwind::Break(value)) => return Ok(value),
                Err(other) => return Err(other),
            }
        },
    );

    rt.register_native(
        on,
        "break",
        "unwinds to the nearest enclosing loop construct, which yields the given value (default nil) as its result",
        |rt, ctx, msg, _on| {
            let value = if msg.arg_count() > 0 {
                rt.eval_arg(msg, 0, ctx)?
            } else {
                rt.nil
            };
            Err(Unwind::Break(value))
        },
    );

    rt.register_native(
        on,
        "=",
        "assigns the result of evaluating the second argument, in the caller's context, to the unevaluated name given by the first argument, on the receiver. a still-nameless method-like value is named after the cell",
        |rt, ctx, msg, on| {
            let name = rt.unevaluated_name(msg, 0, ctx)?;
            let value = rt.eval_arg(msg, 1, ctx)?;
            rt.assign_cell(on, &name, value);
            Ok(value)
        },
    );

    rt.register_native(
        on,
        "++",
        "reads the named cell on the receiver, sends succ to its value, assigns the result back under the same name through the = cell, and returns the new value",
        |rt, ctx, msg, on| {
            let name = rt.unevaluated_name(msg, 0, ctx)?;
            let lookup = Message::new(name.clone());
            let current = rt.cell_for(on, &lookup, ctx)?;
            let succ = Message::new("succ");
            let value = rt.send(&succ, ctx, current)?;

            // The write-back goes through the receiver's `=` cell like
            // any other assignment, so a redefined `=` sees it. The
            // computed value rides in a scratch binding on a fresh
            // context, since message arguments carry no values.
            let (ground, real) = rt.context_pair(ctx);
            let scope = rt.new_context(ground, real, Some(ctx));
            rt.set_cell(scope, "internal:incremented", value);
            let set = Message::new("=")
                .with_arg(Message::new(name))
                .with_arg(Message::new("internal:incremented"));
            let assign = rt.cell_for(on, &set, scope)?;
            rt.activate(assign, scope, &set, on)
        },
    );

    rt.register_native(
        on,
        "method",
        "builds a method from unevaluated arguments: an optional leading documentation literal, parameter names, and a body. the body evaluates against the receiver at activation time, so the definition cannot see the surrounding scope. no arguments yields the trivial nil-returning method",
        |rt, ctx, msg, _on| build_callable(rt, ctx, msg, Flavor::Method),
    );

    rt.register_native(
        on,
        "macro",
        "builds a macro from unevaluated arguments: an optional documentation literal and a body. arguments are not evaluated before the body runs; the body reaches them through the reified call cell",
        |rt, ctx, msg, _on| build_callable(rt, ctx, msg, Flavor::Macro),
    );

    rt.register_native(
        on,
        "fn",
        "builds a lexical block closing over the definition context: an optional documentation literal, parameter names, and a body. blocks activate through their call cell",
        |rt, ctx, msg, _on| build_callable(rt, ctx, msg, Flavor::Block),
    );

    rt.register_native(
        on,
        "cell",
        "takes one evaluated text argument and returns the cell with that name, without activating it",
        |rt, ctx, msg, on| {
            let value = rt.eval_arg(msg, 0, ctx)?;
            let name = rt.coerce_text(value, msg, ctx)?;
            let lookup = Message::new(name);
            rt.cell_for(on, &lookup, ctx)
        },
    );

    rt.register_native(
        on,
        "mimic",
        "returns a new object whose single mimic is the receiver",
        |rt, _ctx, _msg, on| Ok(rt.mimic_of(on)),
    );

    rt.register_native(
        on,
        "derive",
        "resolves the receiver's mimic cell and activates it, so a redefined mimic also changes derive",
        |rt, ctx, msg, on| {
            let forward = Message::new("mimic").with_args(msg.args.iter().cloned());
            rt.send(&forward, ctx, on)
        },
    );

    rt.register_native(
        on,
        "asText",
        "returns a textual representation of the receiver",
        |rt, _ctx, _msg, on| {
            let kind = rt.kind_name(on).to_string();
            Ok(rt.new_text(kind))
        },
    );

    rt.register_native(
        on,
        "notice",
        "returns a brief text inspection of the receiver",
        |rt, _ctx, _msg, on| {
            let short = rt.describe(on);
            Ok(rt.new_text(short))
        },
    );

    rt.register_native(
        on,
        "inspect",
        "returns a text inspection of the receiver",
        |rt, _ctx, _msg, on| {
            let long = rt.describe(on);
            Ok(rt.new_text(long))
        },
    );

    rt.register_native(
        on,
        "documentation",
        "returns the documentation text of the receiver, or nil",
        |rt, _ctx, _msg, on| {
            let doc = rt.heap.get(on).documentation.clone();
            match doc {
                Some(d) => Ok(rt.new_text(d)),
                None => Ok(rt.nil),
            }
        },
    );

    rt.register_native(
        on,
        "kind",
        "returns the kind label visible from the receiver",
        |rt, _ctx, _msg, on| {
            let kind = rt.kind_name(on).to_string();
            Ok(rt.new_text(kind))
        },
    );

    rt.register_native(
        on,
        "==",
        "structural equality on payloads, identity otherwise",
        |rt, ctx, msg, on| {
            let other = rt.eval_arg(msg, 0, ctx)?;
            Ok(rt.new_bool(rt.equal(on, other)))
        },
    );

    rt.register_native(
        on,
        "internal:createText",
        "creates a Text from its literal argument",
        |rt, ctx, msg, _on| match msg.arg_at(0) {
            Some(MessageArg::Text(t)) => {
                let t = t.clone();
                Ok(rt.new_text(t))
            }
            _ => literal_mismatch(rt, ctx, msg, "Text"),
        },
    );

    rt.register_native(
        on,
        "internal:createNumber",
        "creates a Number from its literal argument",
        |rt, ctx, msg, _on| match msg.arg_at(0) {
            Some(MessageArg::Number(n)) => Ok(rt.new_number(*n)),
            _ => literal_mismatch(rt, ctx, msg, "Number"),
        },
    );
}

/// Shared `while`/`until` machinery. The governing expression is
/// re-evaluated immediately before every iteration; a break raised in
/// either the condition or the body terminates this loop with the
/// carried value.
fn run_loop(rt: &mut Runtime, ctx: ObjRef, msg: &Message, until: bool) -> EvalResult<ObjRef> {
    if msg.arg_count() == 0 {
        return Ok(rt.nil);
    }
    let has_body = msg.arg_count() > 1;
    let mut ret = rt.nil;
    loop {
        let test = match rt.eval_arg(msg, 0, ctx) {
            Ok(value) => value,
            Err(Unwind::Break(value)) => return Ok(value),
            Err(other) => return Err(other),
        };
        if rt.is_true(test) == until {
            return Ok(ret);
        }
        if has_body {
            match rt.eval_arg(msg, 1, ctx) {
                Ok(value) => ret = value,
                Err(Unwind::Break(value)) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Flavor {
    Method,
    Macro,
    Block,
}

/// Build a user callable from a `method`/`macro`/`fn` argument list:
/// `([doc-literal,] param-name..., body)`. The doc literal is detected
/// by position and shape, matching the parser's carrier form.
fn build_callable(
    rt: &mut Runtime,
    ctx: ObjRef,
    msg: &Message,
    flavor: Flavor,
) -> EvalResult<ObjRef> {
    if msg.arg_count() == 0 {
        // Bare `method` yields the trivial nil-returning native.
        let object = rt.heap.alloc(Object {
            mimics: vec![rt.native_method],
            payload: Payload::Callable(Callable::Native(NativeMethod {
                name: "nil",
                doc: "returns nil",
                f: Rc::new(|rt, _ctx, _msg, _on| Ok(rt.nil)),
            })),
            documentation: Some("returns nil".to_string()),
            ..Object::default()
        });
        return Ok(object);
    }

    let mut start = 0;
    let mut doc = None;
    if msg.arg_count() > 1 {
        match msg.arg_at(0) {
            Some(MessageArg::Text(t)) => {
                doc = Some(t.clone());
                start = 1;
            }
            Some(MessageArg::Message(m)) if m.name == "internal:createText" => {
                if let Some(MessageArg::Text(t)) = m.arg_at(0) {
                    doc = Some(t.clone());
                    start = 1;
                }
            }
            _ => {}
        }
    }

    let mut params = Vec::new();
    if !matches!(flavor, Flavor::Macro) {
        for i in start..msg.arg_count() - 1 {
            params.push(rt.unevaluated_name(msg, i, ctx)?);
        }
    }

    let body = match msg.arg_at(msg.arg_count() - 1) {
        Some(arg) => arg_as_message(arg),
        None => Message::new("nil"),
    };

    let user = UserBody {
        params,
        body,
        name: None,
        doc: doc.clone(),
    };
    let (proto, callable) = match flavor {
        Flavor::Method => (rt.default_method, Callable::Method(user)),
        Flavor::Macro => (rt.default_macro, Callable::Macro(user)),
        Flavor::Block => (
            rt.lexical_block,
            Callable::Block {
                body: user,
                scope: ctx,
            },
        ),
    };
    Ok(rt.heap.alloc(Object {
        mimics: vec![proto],
        payload: Payload::Callable(callable),
        documentation: doc,
        ..Object::default()
    }))
}

/// A carrier message arrived without its literal payload.
fn literal_mismatch(
    rt: &mut Runtime,
    ctx: ObjRef,
    msg: &Message,
    expected: &str,
) -> EvalResult<ObjRef> {
    let condition = rt.new_condition(rt.condition_type, msg, ctx, rt.ground);
    let text = rt.new_text(format!("expected a literal {expected} argument"));
    rt.set_cell(condition, "text", text);
    rt.error_condition(condition)
}
