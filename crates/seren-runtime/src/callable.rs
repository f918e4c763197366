//! Callable values: native operations, user methods, macros, and lexical
//! blocks. All four share one activation contract — the evaluator hands
//! them the unevaluated argument messages plus the capability to evaluate
//! each argument against a context.

use crate::error::EvalResult;
use crate::heap::{ObjRef, Payload};
use crate::runtime::Runtime;
use seren_types::Message;
use std::fmt;
use std::rc::Rc;

/// Host function conforming to the activation contract:
/// `(runtime, context, message, receiver) -> value`.
pub type NativeFn = Rc<dyn Fn(&mut Runtime, ObjRef, &Message, ObjRef) -> EvalResult<ObjRef>>;

/// A native operation: fixed host behavior behind an ordinary cell,
/// indistinguishable at dispatch level from a user-defined method.
#[derive(Clone)]
pub struct NativeMethod {
    pub name: &'static str,
    pub doc: &'static str,
    pub f: NativeFn,
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeMethod({})", self.name)
    }
}

/// Shared shape of user-defined callables.
///
/// `name` starts unset and is stamped once, at the first assignment of
/// the callable to a cell; it is never overwritten afterwards.
#[derive(Debug, Clone)]
pub struct UserBody {
    pub params: Vec<String>,
    pub body: Message,
    pub name: Option<String>,
    pub doc: Option<String>,
}

/// The callable tagged union consumed by [`Runtime::activate`].
#[derive(Debug, Clone)]
pub enum Callable {
    /// Fixed host-level operation.
    Native(NativeMethod),
    /// User method: body re-evaluates in a fresh context built from the
    /// receiver, not the definition site. Methods are not closures.
    Method(UserBody),
    /// Like a method, but arguments arrive unevaluated through the
    /// reified `call` cell.
    Macro(UserBody),
    /// Lexical block: `scope` is the context active at definition time;
    /// the activation context's enclosing link points there.
    Block { body: UserBody, scope: ObjRef },
}

impl Callable {
    /// Whether plain cell access activates this value. Blocks do not
    /// activate on access; they are invoked through their `call` cell.
    pub fn activates_on_access(&self) -> bool {
        !matches!(self, Callable::Block { .. })
    }

    /// The identity name used in self-describing output, if set.
    pub fn name(&self) -> Option<&str> {
        match self {
            Callable::Native(n) => Some(n.name),
            Callable::Method(b) | Callable::Macro(b) | Callable::Block { body: b, .. } => {
                b.name.as_deref()
            }
        }
    }

    /// Stamp the identity name if it is still unset. Natives carry fixed
    /// names and are never renamed.
    pub fn set_name_if_unset(&mut self, name: &str) {
        match self {
            Callable::Native(_) => {}
            Callable::Method(b) | Callable::Macro(b) | Callable::Block { body: b, .. } => {
                if b.name.is_none() {
                    b.name = Some(name.to_string());
                }
            }
        }
    }
}

/// Natives on the reified `call` object and the `call` cell on the
/// callable prototypes themselves.
pub(crate) fn install(rt: &mut Runtime) {
    let call = rt.call;

    rt.register_native(
        call,
        "argCount",
        "returns the number of arguments of the activating message",
        |rt, _ctx, _msg, on| {
            let count = match &rt.heap.get(on).payload {
                Payload::Call(info) => info.message.arg_count() as i64,
                _ => 0,
            };
            Ok(rt.new_number(count))
        },
    );

    rt.register_native(
        call,
        "argAt",
        "takes one evaluated index and returns the argument message at that position, unevaluated and reified",
        |rt, ctx, msg, on| {
            let idx_value = rt.eval_arg(msg, 0, ctx)?;
            let index = rt.coerce_number(idx_value, msg, ctx)?;
            let info = match &rt.heap.get(on).payload {
                Payload::Call(info) => info.clone(),
                _ => return Ok(rt.nil),
            };
            match reify_arg(&info.message, index) {
                Some(m) => Ok(rt.new_message(m)),
                None => Ok(rt.nil),
            }
        },
    );

    rt.register_native(
        call,
        "evalArgAt",
        "takes one evaluated index and evaluates the argument message at that position in the caller's context",
        |rt, ctx, msg, on| {
            let idx_value = rt.eval_arg(msg, 0, ctx)?;
            let index = rt.coerce_number(idx_value, msg, ctx)?;
            let info = match &rt.heap.get(on).payload {
                Payload::Call(info) => info.clone(),
                _ => return Ok(rt.nil),
            };
            if index < 0 {
                return Ok(rt.nil);
            }
            rt.eval_arg(&info.message, index as usize, info.caller)
        },
    );

    // `call` and `name` on every callable prototype. `call` activates
    // the receiver against the calling context's real context.
    for proto in [
        rt.default_method,
        rt.native_method,
        rt.default_macro,
        rt.lexical_block,
    ] {
        rt.register_native(
            proto,
            "call",
            "activates the receiver with the given arguments",
            |rt, ctx, msg, on| {
                let receiver = rt.real_context(ctx);
                rt.activate(on, ctx, msg, receiver)
            },
        );

        rt.register_native(
            proto,
            "name",
            "returns the identity name of the receiver, or nil if unset",
            |rt, _ctx, _msg, on| {
                let name = match &rt.heap.get(on).payload {
                    Payload::Callable(c) => c.name().map(str::to_string),
                    _ => None,
                };
                match name {
                    Some(n) => Ok(rt.new_text(n)),
                    None => Ok(rt.nil),
                }
            },
        );
    }
}

/// Turn argument `index` of `message` into a standalone message, wrapping
/// bare literals in their carrier form.
fn reify_arg(message: &Message, index: i64) -> Option<Message> {
    if index < 0 {
        return None;
    }
    message.arg_at(index as usize).map(crate::runtime::arg_as_message)
}
