//! List payload natives, including the condition/restart worked example:
//! `at=` with a negative out-of-range index signals an `Index` condition
//! armed with a `useValue` restart and re-runs its own validation on the
//! replacement index.

use crate::condition::{Protected, Restart};
use crate::error::EvalResult;
use crate::heap::{ObjRef, Payload};
use crate::runtime::{arg_as_message, Runtime};
use seren_types::{Message, MessageArg};

pub(crate) fn install(rt: &mut Runtime) {
    let on = rt.list;

    rt.register_native(
        on,
        "each",
        "takes one, two, or three arguments. with one, the argument chain is sent to each element. with two, the first is an unevaluated name bound to each element in a lexical context while the second is evaluated there. with three, the first name is bound to the element index. returns the list",
        |rt, ctx, msg, on| {
            let items = items_of(rt, on, msg, ctx)?;
            match msg.arg_count() {
                0 => {}
                1 => {
                    let code = code_arg(msg, 0);
                    for element in items {
                        rt.evaluate_chain(&code, ctx, element)?;
                    }
                }
                2 => {
                    let name = rt.unevaluated_name(msg, 0, ctx)?;
                    let code = code_arg(msg, 1);
                    let (ground, real) = rt.context_pair(ctx);
                    let scope = rt.new_context(ground, real, Some(ctx));
                    for element in items {
                        rt.set_cell(scope, &name, element);
                        rt.evaluate_chain(&code, scope, scope)?;
                    }
                }
                _ => {
                    let index_name = rt.unevaluated_name(msg, 0, ctx)?;
                    let name = rt.unevaluated_name(msg, 1, ctx)?;
                    let code = code_arg(msg, 2);
                    let (ground, real) = rt.context_pair(ctx);
                    let scope = rt.new_context(ground, real, Some(ctx));
                    for (i, element) in items.into_iter().enumerate() {
                        let index = rt.new_number(i as i64);
                        rt.set_cell(scope, &index_name, index);
                        rt.set_cell(scope, &name, element);
                        rt.evaluate_chain(&code, scope, scope)?;
                    }
                }
            }
            Ok(on)
        },
    );

    rt.register_native(
        on,
        "<<",
        "takes one evaluated argument, adds it at the end of the list, and returns the list",
        |rt, ctx, msg, on| {
            let value = rt.eval_arg(msg, 0, ctx)?;
            items_of(rt, on, msg, ctx)?;
            if let Payload::List(items) = &mut rt.heap.get_mut(on).payload {
                items.push(value);
            }
            Ok(on)
        },
    );

    rt.register_native(
        on,
        "at",
        "takes one evaluated index and returns the element at that position. negative indices count from the end; out of range yields nil",
        |rt, ctx, msg, on| {
            let items = items_of(rt, on, msg, ctx)?;
            let value = rt.eval_arg(msg, 0, ctx)?;
            let mut index = rt.coerce_number(value, msg, ctx)?;
            if index < 0 {
                index += items.len() as i64;
            }
            if index >= 0 && (index as usize) < items.len() {
                Ok(items[index as usize])
            } else {
                Ok(rt.nil)
            }
        },
    );

    rt.alias_cell(on, "at", "[]");

    rt.register_native(
        on,
        "at=",
        "takes an evaluated index and value, and sets the element at that position. negative indices count from the end; an index past the end expands the list with nils. a negative index beyond the front signals an Index condition armed with a useValue restart, and the replacement index goes through the same validation",
        |rt, ctx, msg, on| {
            let index_value = rt.eval_arg(msg, 0, ctx)?;
            let value = rt.eval_arg(msg, 1, ctx)?;
            items_of(rt, on, msg, ctx)?;
            let mut index = rt.coerce_number(index_value, msg, ctx)?;
            if index < 0 {
                index += list_len(rt, on);
            }

            // The replacement may itself be negative, so the whole
            // sanity check runs again each time a handler resumes us.
            while index < 0 {
                let condition = rt.new_condition(rt.condition_index, msg, ctx, on);
                let idx = rt.new_number(index);
                rt.set_cell(condition, "index", idx);
                let text = rt.new_text(format!("index {index} is before the start of the list"));
                rt.set_cell(condition, "text", text);

                let outcome = rt.with_restarts(
                    vec![Restart::returning_argument("useValue")],
                    |rt| rt.error_condition(condition),
                )?;
                if let Protected::Restarted { args, .. } = outcome {
                    index = rt.coerce_number(args[0], msg, ctx)?;
                    if index < 0 {
                        index += list_len(rt, on);
                    }
                }
            }

            if let Payload::List(items) = &mut rt.heap.get_mut(on).payload {
                let index = index as usize;
                while items.len() <= index {
                    items.push(rt.nil);
                }
                items[index] = value;
            }
            Ok(value)
        },
    );

    rt.alias_cell(on, "at=", "[]=");

    rt.register_native(
        on,
        "size",
        "returns the number of elements in the list",
        |rt, ctx, msg, on| {
            let items = items_of(rt, on, msg, ctx)?;
            Ok(rt.new_number(items.len() as i64))
        },
    );

    rt.alias_cell(on, "size", "length");

    rt.register_native(
        on,
        "empty?",
        "true if the list has no elements",
        |rt, ctx, msg, on| {
            let items = items_of(rt, on, msg, ctx)?;
            Ok(rt.new_bool(items.is_empty()))
        },
    );

    rt.register_native(
        on,
        "clear!",
        "removes every element from the list and returns it",
        |rt, ctx, msg, on| {
            items_of(rt, on, msg, ctx)?;
            if let Payload::List(items) = &mut rt.heap.get_mut(on).payload {
                items.clear();
            }
            Ok(on)
        },
    );

    rt.register_native(
        on,
        "inspect",
        "returns a text inspection of the list, inspecting each element",
        |rt, ctx, msg, on| render(rt, ctx, msg, on, "inspect"),
    );

    rt.register_native(
        on,
        "notice",
        "returns a brief text inspection of the list, noticing each element",
        |rt, ctx, msg, on| render(rt, ctx, msg, on, "notice"),
    );
}

/// The receiver's element vector (cloned snapshot), or a `Type`
/// condition.
fn items_of(rt: &mut Runtime, on: ObjRef, msg: &Message, ctx: ObjRef) -> EvalResult<Vec<ObjRef>> {
    if let Payload::List(items) = &rt.heap.get(on).payload {
        return Ok(items.clone());
    }
    let condition = rt.new_condition(rt.condition_type, msg, ctx, on);
    let text = rt.new_text("receiver is not a List");
    rt.set_cell(condition, "text", text);
    rt.error_condition(condition).map(|_| Vec::new())
}

fn list_len(rt: &Runtime, on: ObjRef) -> i64 {
    match &rt.heap.get(on).payload {
        Payload::List(items) => items.len() as i64,
        _ => 0,
    }
}

/// Argument `index` as an evaluatable chain (literals in carrier form).
fn code_arg(msg: &Message, index: usize) -> Message {
    match msg.arg_at(index) {
        Some(MessageArg::Message(m)) => m.clone(),
        Some(other) => arg_as_message(other),
        None => Message::new("nil"),
    }
}

/// Element-wise rendering through dispatch, so user overrides of
/// `inspect`/`notice` are honored. A list reached again while its own
/// rendering is in flight shows as `[...]`.
fn render(
    rt: &mut Runtime,
    ctx: ObjRef,
    msg: &Message,
    on: ObjRef,
    form: &str,
) -> EvalResult<ObjRef> {
    if rt.rendering.contains(&on) {
        return Ok(rt.new_text("[...]"));
    }
    let items = items_of(rt, on, msg, ctx)?;
    let request = Message::new(form);
    let mut parts = Vec::with_capacity(items.len());
    rt.rendering.push(on);
    for element in items {
        let rendered = match rt.send(&request, ctx, element) {
            Ok(value) => value,
            Err(unwind) => {
                rt.rendering.pop();
                return Err(unwind);
            }
        };
        match rt.text_value(rendered) {
            Some(s) => parts.push(s.to_string()),
            None => parts.push(rt.describe(element)),
        }
    }
    rt.rendering.pop();
    Ok(rt.new_text(format!("[{}]", parts.join(", "))))
}
