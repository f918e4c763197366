//! Text payload natives. Indexing mirrors list indexing: negative
//! indices count from the end, out-of-range yields nil.

use crate::error::EvalResult;
use crate::heap::{ObjRef, Payload};
use crate::runtime::Runtime;
use seren_types::Message;

pub(crate) fn install(rt: &mut Runtime) {
    let on = rt.text;

    rt.register_native(
        on,
        "asText",
        "returns the receiver itself",
        |_rt, _ctx, _msg, on| Ok(on),
    );

    rt.register_native(
        on,
        "inspect",
        "returns a quoted text inspection of the receiver",
        |rt, ctx, msg, on| {
            let s = text_of(rt, on, msg, ctx)?;
            Ok(rt.new_text(format!("{s:?}")))
        },
    );

    rt.alias_cell(on, "inspect", "notice");

    rt.register_native(
        on,
        "length",
        "returns the number of characters in the receiver",
        |rt, ctx, msg, on| {
            let s = text_of(rt, on, msg, ctx)?;
            Ok(rt.new_number(s.chars().count() as i64))
        },
    );

    rt.register_native(
        on,
        "[]",
        "takes one evaluated index and returns the character code at that position. negative indices count from the end; out of range yields nil",
        |rt, ctx, msg, on| {
            let s = text_of(rt, on, msg, ctx)?;
            let value = rt.eval_arg(msg, 0, ctx)?;
            let mut index = rt.coerce_number(value, msg, ctx)?;
            let len = s.chars().count() as i64;
            if index < 0 {
                index += len;
            }
            if index < 0 || index >= len {
                return Ok(rt.nil);
            }
            match s.chars().nth(index as usize) {
                Some(c) => Ok(rt.new_number(c as i64)),
                None => Ok(rt.nil),
            }
        },
    );
}

/// The receiver's text payload, or a `Type` condition.
fn text_of(rt: &mut Runtime, on: ObjRef, msg: &Message, ctx: ObjRef) -> EvalResult<String> {
    if let Payload::Text(s) = &rt.heap.get(on).payload {
        return Ok(s.clone());
    }
    let condition = rt.new_condition(rt.condition_type, msg, ctx, on);
    let text = rt.new_text("receiver is not a Text");
    rt.set_cell(condition, "text", text);
    rt.error_condition(condition).map(|_| String::new())
}
