//! Number payload natives — the minimal arithmetic capability set the
//! core consumes (`succ` drives `++`; comparisons drive loop tests).

use crate::runtime::Runtime;

pub(crate) fn install(rt: &mut Runtime) {
    let on = rt.number;

    rt.register_native(
        on,
        "succ",
        "returns the successor of the receiver",
        |rt, ctx, msg, on| {
            let n = rt.coerce_number(on, msg, ctx)?;
            Ok(rt.new_number(n.wrapping_add(1)))
        },
    );

    rt.register_native(
        on,
        "+",
        "adds the evaluated argument to the receiver",
        |rt, ctx, msg, on| {
            let a = rt.coerce_number(on, msg, ctx)?;
            let value = rt.eval_arg(msg, 0, ctx)?;
            let b = rt.coerce_number(value, msg, ctx)?;
            Ok(rt.new_number(a.wrapping_add(b)))
        },
    );

    rt.register_native(
        on,
        "-",
        "subtracts the evaluated argument from the receiver",
        |rt, ctx, msg, on| {
            let a = rt.coerce_number(on, msg, ctx)?;
            let value = rt.eval_arg(msg, 0, ctx)?;
            let b = rt.coerce_number(value, msg, ctx)?;
            Ok(rt.new_number(a.wrapping_sub(b)))
        },
    );

    rt.register_native(
        on,
        "<",
        "true if the receiver is less than the evaluated argument",
        |rt, ctx, msg, on| {
            let a = rt.coerce_number(on, msg, ctx)?;
            let value = rt.eval_arg(msg, 0, ctx)?;
            let b = rt.coerce_number(value, msg, ctx)?;
            Ok(rt.new_bool(a < b))
        },
    );

    rt.register_native(
        on,
        ">",
        "true if the receiver is greater than the evaluated argument",
        |rt, ctx, msg, on| {
            let a = rt.coerce_number(on, msg, ctx)?;
            let value = rt.eval_arg(msg, 0, ctx)?;
            let b = rt.coerce_number(value, msg, ctx)?;
            Ok(rt.new_bool(a > b))
        },
    );

    rt.register_native(
        on,
        "asText",
        "returns the decimal rendering of the receiver",
        |rt, ctx, msg, on| {
            let n = rt.coerce_number(on, msg, ctx)?;
            Ok(rt.new_text(n.to_string()))
        },
    );

    rt.register_native(
        on,
        "inspect",
        "returns a text inspection of the receiver",
        |rt, ctx, msg, on| {
            let n = rt.coerce_number(on, msg, ctx)?;
            Ok(rt.new_text(n.to_string()))
        },
    );

    rt.alias_cell(on, "inspect", "notice");
}
