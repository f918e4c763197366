//! The Seren runtime: object graph bootstrap, message dispatch, and the
//! activation protocol.
//!
//! Bootstrap builds the fixed prototype spine — `Base` ← `DefaultBehavior`
//! ← `Ground` ← `Origin` — and registers every native operation as an
//! ordinary cell on it, so user code can shadow `if` or `while` like any
//! other cell. Evaluation is a strictly synchronous, single-threaded
//! tree-walk over message chains.

use crate::callable::{Callable, NativeMethod, UserBody};
use crate::condition::{Protected, Restart, RestartEntry};
use crate::error::{EvalResult, FatalError, Unwind};
use crate::heap::{CallInfo, Context, Heap, ObjRef, Object, Payload};
use crate::{behavior, callable, condition::Handler, list, number, text};
use rustc_hash::FxHashSet;
use seren_types::{Message, MessageArg};
use std::rc::Rc;

/// One evaluation universe: the heap, the bootstrap objects, and the
/// dynamic restart/handler stacks.
pub struct Runtime {
    pub(crate) heap: Heap,

    // Bootstrap spine.
    pub base: ObjRef,
    pub default_behavior: ObjRef,
    pub ground: ObjRef,
    pub origin: ObjRef,

    // Singletons.
    pub nil: ObjRef,
    pub truth: ObjRef,
    pub falsity: ObjRef,

    // Data prototypes.
    pub text: ObjRef,
    pub number: ObjRef,
    pub list: ObjRef,
    pub message: ObjRef,
    pub call: ObjRef,

    // Callable prototypes.
    pub default_method: ObjRef,
    pub native_method: ObjRef,
    pub default_macro: ObjRef,
    pub lexical_block: ObjRef,

    // Condition prototypes.
    pub condition: ObjRef,
    pub condition_error: ObjRef,
    pub condition_lookup: ObjRef,
    pub condition_arity: ObjRef,
    pub condition_type: ObjRef,
    pub condition_index: ObjRef,

    // Dynamic stacks (ambient, single evaluation thread).
    pub(crate) restarts: Vec<RestartEntry>,
    pub(crate) next_restart_token: u64,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) handler_limit: usize,
    /// Lists with an element-wise inspect/notice in flight; a
    /// re-entered list renders as `[...]`.
    pub(crate) rendering: Vec<ObjRef>,
}

impl Runtime {
    /// Bootstrap a fresh runtime with the full base object graph.
    pub fn new() -> Self {
        let mut heap = Heap::new();

        let base = heap.alloc(Object::with_kind("Base"));
        let default_behavior = heap.alloc(Object::with_kind("DefaultBehavior"));
        heap.get_mut(default_behavior).mimics.push(base);
        let ground = heap.alloc(Object::with_kind("Ground"));
        heap.get_mut(ground).mimics.push(default_behavior);
        let origin = heap.alloc(Object::with_kind("Origin"));
        heap.get_mut(origin).mimics.push(ground);

        let derived = |heap: &mut Heap, kind: &str, payload: Payload| {
            heap.alloc(Object {
                kind: Some(kind.to_string()),
                payload,
                mimics: vec![origin],
                ..Object::default()
            })
        };

        let nil = derived(&mut heap, "nil", Payload::Nil);
        let truth = derived(&mut heap, "true", Payload::Boolean(true));
        let falsity = derived(&mut heap, "false", Payload::Boolean(false));
        let text = derived(&mut heap, "Text", Payload::Text(String::new()));
        let number = derived(&mut heap, "Number", Payload::Number(0));
        let list = derived(&mut heap, "List", Payload::List(Vec::new()));
        let message = derived(&mut heap, "Message", Payload::Message(Message::new("")));
        let call = derived(&mut heap, "Call", Payload::None);
        let default_method = derived(&mut heap, "DefaultMethod", Payload::None);
        let native_method = derived(&mut heap, "NativeMethod", Payload::None);
        let default_macro = derived(&mut heap, "DefaultMacro", Payload::None);
        let lexical_block = derived(&mut heap, "LexicalBlock", Payload::None);
        let condition = derived(&mut heap, "Condition", Payload::None);

        let sub = |heap: &mut Heap, proto: ObjRef, kind: &str| {
            let r = heap.mimic(proto);
            heap.get_mut(r).kind = Some(kind.to_string());
            r
        };
        let condition_error = sub(&mut heap, condition, "Condition Error");
        let condition_lookup = sub(&mut heap, condition_error, "Condition Error Lookup");
        let condition_arity = sub(&mut heap, condition_error, "Condition Error Arity");
        let condition_type = sub(&mut heap, condition_error, "Condition Error Type");
        let condition_index = sub(&mut heap, condition_error, "Condition Error Index");

        let mut rt = Runtime {
            heap,
            base,
            default_behavior,
            ground,
            origin,
            nil,
            truth,
            falsity,
            text,
            number,
            list,
            message,
            call,
            default_method,
            native_method,
            default_macro,
            lexical_block,
            condition,
            condition_error,
            condition_lookup,
            condition_arity,
            condition_type,
            condition_index,
            restarts: Vec::new(),
            next_restart_token: 0,
            handlers: Vec::new(),
            handler_limit: 0,
            rendering: Vec::new(),
        };

        rt.register_ground_cells();
        behavior::install(&mut rt);
        callable::install(&mut rt);
        number::install(&mut rt);
        text::install(&mut rt);
        list::install(&mut rt);
        rt
    }

    /// Everything is reachable by name from the Ground — the lookup root
    /// for unqualified names at top level.
    fn register_ground_cells(&mut self) {
        let cells: &[(&str, ObjRef)] = &[
            ("Base", self.base),
            ("DefaultBehavior", self.default_behavior),
            ("Ground", self.ground),
            ("Origin", self.origin),
            ("Text", self.text),
            ("Number", self.number),
            ("List", self.list),
            ("Message", self.message),
            ("Call", self.call),
            ("DefaultMethod", self.default_method),
            ("NativeMethod", self.native_method),
            ("DefaultMacro", self.default_macro),
            ("LexicalBlock", self.lexical_block),
            ("Condition", self.condition),
            ("nil", self.nil),
            ("true", self.truth),
            ("false", self.falsity),
        ];
        for &(name, value) in cells {
            self.heap.set_cell(self.ground, name, value);
        }
        self.heap.set_cell(self.condition, "Error", self.condition_error);
        self.heap
            .set_cell(self.condition_error, "Lookup", self.condition_lookup);
        self.heap
            .set_cell(self.condition_error, "Arity", self.condition_arity);
        self.heap
            .set_cell(self.condition_error, "Type", self.condition_type);
        self.heap
            .set_cell(self.condition_error, "Index", self.condition_index);
    }

    // ══════════════════════════════════════════════════════════════════
    // Evaluation
    // ══════════════════════════════════════════════════════════════════

    /// Top-level entry: evaluate a message chain against the Ground.
    pub fn evaluate(&mut self, message: &Message) -> Result<ObjRef, FatalError> {
        match self.evaluate_chain(message, self.ground, self.ground) {
            Ok(value) => Ok(value),
            Err(Unwind::Fatal(fault)) => Err(fault),
            Err(Unwind::Break(_)) => Err(FatalError::StrayControlFlow("break")),
            Err(Unwind::ToRestart { .. }) => Err(FatalError::StrayControlFlow("restart")),
        }
    }

    /// Evaluate a chain left to right: the first message is sent to
    /// `receiver`, each following message to the previous result.
    pub fn evaluate_chain(
        &mut self,
        message: &Message,
        ctx: ObjRef,
        receiver: ObjRef,
    ) -> EvalResult<ObjRef> {
        let mut current = receiver;
        let mut last = self.nil;
        let mut link = Some(message);
        while let Some(msg) = link {
            last = self.send(msg, ctx, current)?;
            current = last;
            link = msg.next.as_deref();
        }
        Ok(last)
    }

    /// Send one message: resolve its name against the receiver, then
    /// activate the result if it is an access-activatable callable.
    pub fn send(&mut self, message: &Message, ctx: ObjRef, receiver: ObjRef) -> EvalResult<ObjRef> {
        let value = self.cell_for(receiver, message, ctx)?;
        let activates = matches!(
            &self.heap.get(value).payload,
            Payload::Callable(c) if c.activates_on_access()
        );
        if activates {
            self.activate(value, ctx, message, receiver)
        } else {
            Ok(value)
        }
    }

    /// Evaluate argument `index` of `message` in `ctx` — the per-argument
    /// capability handed to callables. A missing argument evaluates to
    /// nil; literal payloads construct their value directly.
    pub fn eval_arg(&mut self, message: &Message, index: usize, ctx: ObjRef) -> EvalResult<ObjRef> {
        match message.arg_at(index) {
            None => Ok(self.nil),
            Some(MessageArg::Message(m)) => self.evaluate_chain(m, ctx, ctx),
            Some(MessageArg::Text(t)) => {
                let t = t.clone();
                Ok(self.new_text(t))
            }
            Some(MessageArg::Number(n)) => Ok(self.new_number(*n)),
        }
    }

    /// Non-signaling lookup. Context objects resolve through their own
    /// cells, then the lexical enclosing chain, and finally the full
    /// mimic graph from their ground.
    pub fn lookup(&self, from: ObjRef, name: &str) -> Option<ObjRef> {
        let mut current = from;
        loop {
            match &self.heap.get(current).payload {
                Payload::Context(cx) => {
                    if let Some(&value) = self.heap.get(current).cells.get(name) {
                        return Some(value);
                    }
                    match cx.enclosing {
                        Some(outer) => current = outer,
                        None => return self.heap.resolve(cx.ground, name),
                    }
                }
                _ => return self.heap.resolve(current, name),
            }
        }
    }

    /// Lookup that signals a `Lookup` condition (armed with a `useValue`
    /// restart) on a miss instead of producing a silent nil.
    pub(crate) fn cell_for(
        &mut self,
        receiver: ObjRef,
        message: &Message,
        ctx: ObjRef,
    ) -> EvalResult<ObjRef> {
        if let Some(value) = self.lookup(receiver, &message.name) {
            return Ok(value);
        }
        let condition = self.new_condition(self.condition_lookup, message, ctx, receiver);
        let name = self.new_text(message.name.clone());
        self.heap.set_cell(condition, "cellName", name);
        let text = self.new_text(format!("couldn't resolve cell \"{}\"", message.name));
        self.heap.set_cell(condition, "text", text);

        match self.with_restarts(vec![Restart::returning_argument("useValue")], |rt| {
            rt.error_condition(condition)
        })? {
            Protected::Restarted { args, .. } => Ok(args[0]),
            Protected::Value(value) => Ok(value),
        }
    }

    // ══════════════════════════════════════════════════════════════════
    // Activation
    // ══════════════════════════════════════════════════════════════════

    /// Activate a callable value: `(callable, context, message, receiver)
    /// -> value`. Argument messages stay unevaluated; the callable pulls
    /// them through [`Runtime::eval_arg`] as it chooses.
    pub fn activate(
        &mut self,
        value: ObjRef,
        ctx: ObjRef,
        message: &Message,
        receiver: ObjRef,
    ) -> EvalResult<ObjRef> {
        let callable = match &self.heap.get(value).payload {
            Payload::Callable(c) => c.clone(),
            _ => {
                let condition = self.new_condition(self.condition_type, message, ctx, receiver);
                let text = self.new_text("value is not activatable");
                self.heap.set_cell(condition, "text", text);
                return self.error_condition(condition);
            }
        };
        match callable {
            Callable::Native(native) => (native.f)(self, ctx, message, receiver),
            Callable::Method(body) => self.activate_method(&body, ctx, message, receiver),
            Callable::Macro(body) => self.activate_macro(&body, ctx, message, receiver),
            Callable::Block { body, scope } => {
                self.activate_block(&body, scope, ctx, message, receiver)
            }
        }
    }

    /// Methods re-evaluate their body in a fresh context grounded at the
    /// receiver — never at the definition site.
    fn activate_method(
        &mut self,
        method: &UserBody,
        ctx: ObjRef,
        message: &Message,
        receiver: ObjRef,
    ) -> EvalResult<ObjRef> {
        self.check_arity(method, ctx, message, receiver)?;
        let mut args = Vec::with_capacity(message.arg_count());
        for i in 0..message.arg_count() {
            args.push(self.eval_arg(message, i, ctx)?);
        }
        let locals = self.new_context(receiver, receiver, None);
        self.heap.set_cell(locals, "self", receiver);
        for (param, arg) in method.params.iter().zip(args) {
            self.heap.set_cell(locals, param, arg);
        }
        self.evaluate_chain(&method.body, locals, locals)
    }

    /// Macros receive their arguments unevaluated, reified as the `call`
    /// cell; the body decides what to evaluate and when.
    fn activate_macro(
        &mut self,
        makro: &UserBody,
        ctx: ObjRef,
        message: &Message,
        receiver: ObjRef,
    ) -> EvalResult<ObjRef> {
        let locals = self.new_context(receiver, receiver, None);
        self.heap.set_cell(locals, "self", receiver);
        let call = self.heap.alloc(Object {
            mimics: vec![self.call],
            payload: Payload::Call(CallInfo {
                message: message.clone(),
                caller: ctx,
                receiver,
            }),
            ..Object::default()
        });
        self.heap.set_cell(locals, "call", call);
        self.evaluate_chain(&makro.body, locals, locals)
    }

    /// Blocks close over their definition context: the activation's
    /// enclosing link points there, so outer-scope reads work without an
    /// explicit receiver.
    fn activate_block(
        &mut self,
        block: &UserBody,
        scope: ObjRef,
        ctx: ObjRef,
        message: &Message,
        receiver: ObjRef,
    ) -> EvalResult<ObjRef> {
        self.check_arity(block, ctx, message, receiver)?;
        let mut args = Vec::with_capacity(message.arg_count());
        for i in 0..message.arg_count() {
            args.push(self.eval_arg(message, i, ctx)?);
        }
        let (ground, real) = self.context_pair(scope);
        let locals = self.new_context(ground, real, Some(scope));
        for (param, arg) in block.params.iter().zip(args) {
            self.heap.set_cell(locals, param, arg);
        }
        self.evaluate_chain(&block.body, locals, locals)
    }

    /// Wrong argument count signals an `Arity` condition before any
    /// argument is evaluated.
    fn check_arity(
        &mut self,
        callable: &UserBody,
        ctx: ObjRef,
        message: &Message,
        receiver: ObjRef,
    ) -> EvalResult<()> {
        if message.arg_count() == callable.params.len() {
            return Ok(());
        }
        let condition = self.new_condition(self.condition_arity, message, ctx, receiver);
        let expected = self.new_number(callable.params.len() as i64);
        self.heap.set_cell(condition, "expected", expected);
        let given = self.new_number(message.arg_count() as i64);
        self.heap.set_cell(condition, "given", given);
        let text = self.new_text(format!(
            "expected {} argument(s), got {}",
            callable.params.len(),
            message.arg_count()
        ));
        self.heap.set_cell(condition, "text", text);
        self.error_condition(condition).map(|_| ())
    }

    // ══════════════════════════════════════════════════════════════════
    // Object construction
    // ══════════════════════════════════════════════════════════════════

    /// A fresh object mimicking Origin.
    pub fn new_object(&mut self) -> ObjRef {
        self.heap.mimic(self.origin)
    }

    /// A fresh object with no mimics at all (graph-shape tests and
    /// advanced embedding use).
    pub fn bare_object(&mut self) -> ObjRef {
        self.heap.alloc(Object::new())
    }

    /// Prototype-clone any object.
    pub fn mimic_of(&mut self, source: ObjRef) -> ObjRef {
        self.heap.mimic(source)
    }

    /// Append a mimic to an object's parent list.
    pub fn add_mimic(&mut self, on: ObjRef, mimic: ObjRef) {
        self.heap.get_mut(on).mimics.push(mimic);
    }

    pub fn new_number(&mut self, value: i64) -> ObjRef {
        let r = self.heap.mimic(self.number);
        self.heap.get_mut(r).payload = Payload::Number(value);
        r
    }

    pub fn new_text(&mut self, value: impl Into<String>) -> ObjRef {
        let r = self.heap.mimic(self.text);
        self.heap.get_mut(r).payload = Payload::Text(value.into());
        r
    }

    pub fn new_list(&mut self, items: Vec<ObjRef>) -> ObjRef {
        let r = self.heap.mimic(self.list);
        self.heap.get_mut(r).payload = Payload::List(items);
        r
    }

    pub fn new_message(&mut self, message: Message) -> ObjRef {
        let r = self.heap.mimic(self.message);
        self.heap.get_mut(r).payload = Payload::Message(message);
        r
    }

    pub fn new_bool(&self, value: bool) -> ObjRef {
        if value {
            self.truth
        } else {
            self.falsity
        }
    }

    /// A fresh activation context object.
    pub(crate) fn new_context(
        &mut self,
        ground: ObjRef,
        real_context: ObjRef,
        enclosing: Option<ObjRef>,
    ) -> ObjRef {
        self.heap.alloc(Object {
            kind: Some("Locals".to_string()),
            payload: Payload::Context(Context {
                ground,
                real_context,
                enclosing,
            }),
            ..Object::default()
        })
    }

    /// Build a condition instance: a mimic of the given prototype
    /// carrying the standard `message`/`context`/`receiver` cells.
    pub fn new_condition(
        &mut self,
        proto: ObjRef,
        message: &Message,
        ctx: ObjRef,
        receiver: ObjRef,
    ) -> ObjRef {
        let condition = self.heap.mimic(proto);
        let reified = self.new_message(message.clone());
        self.heap.set_cell(condition, "message", reified);
        self.heap.set_cell(condition, "context", ctx);
        self.heap.set_cell(condition, "receiver", receiver);
        condition
    }

    /// Register a native operation as a cell on `on`.
    pub fn register_native(
        &mut self,
        on: ObjRef,
        name: &'static str,
        doc: &'static str,
        f: impl Fn(&mut Runtime, ObjRef, &Message, ObjRef) -> EvalResult<ObjRef> + 'static,
    ) {
        let object = self.heap.alloc(Object {
            mimics: vec![self.native_method],
            payload: Payload::Callable(Callable::Native(NativeMethod {
                name,
                doc,
                f: Rc::new(f),
            })),
            documentation: Some(doc.to_string()),
            ..Object::default()
        });
        self.heap.set_cell(on, name, object);
    }

    /// Copy an existing cell under a second name (shared value).
    pub fn alias_cell(&mut self, on: ObjRef, existing: &str, alias: &str) {
        if let Some(value) = self.heap.resolve(on, existing) {
            self.heap.set_cell(on, alias, value);
        }
    }

    // ══════════════════════════════════════════════════════════════════
    // Cells & assignment
    // ══════════════════════════════════════════════════════════════════

    /// Core assignment: bind `value` under `name` in the receiver's own
    /// cell store, stamping a still-unset callable identity name. The
    /// name binding happens once, at first assignment, and is never
    /// overwritten.
    pub fn assign_cell(&mut self, on: ObjRef, name: &str, value: ObjRef) {
        self.heap.set_cell(on, name, value);
        if let Payload::Callable(c) = &mut self.heap.get_mut(value).payload {
            c.set_name_if_unset(name);
        }
    }

    /// Raw (non-activating, non-signaling) cell read.
    pub fn get_cell(&self, on: ObjRef, name: &str) -> Option<ObjRef> {
        self.lookup(on, name)
    }

    /// Public wrapper over the heap's own-store write.
    pub fn set_cell(&mut self, on: ObjRef, name: &str, value: ObjRef) {
        self.heap.set_cell(on, name, value);
    }

    /// The unevaluated name of argument `index`, for assignment-style
    /// operators. A literal in name position is a `Type` condition.
    pub fn unevaluated_name(
        &mut self,
        message: &Message,
        index: usize,
        ctx: ObjRef,
    ) -> EvalResult<String> {
        match message.arg_at(index) {
            Some(MessageArg::Message(m)) => Ok(m.name.clone()),
            _ => {
                let condition = self.new_condition(self.condition_type, message, ctx, self.ground);
                let text = self.new_text("expected an unevaluated name argument");
                self.heap.set_cell(condition, "text", text);
                self.error_condition(condition).map(|_| String::new())
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════
    // Coercion & inspection helpers
    // ══════════════════════════════════════════════════════════════════

    /// Truthiness: everything except nil and false.
    pub fn is_true(&self, value: ObjRef) -> bool {
        value != self.nil && value != self.falsity
    }

    pub fn number_value(&self, of: ObjRef) -> Option<i64> {
        match &self.heap.get(of).payload {
            Payload::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn text_value(&self, of: ObjRef) -> Option<&str> {
        match &self.heap.get(of).payload {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn list_value(&self, of: ObjRef) -> Option<&[ObjRef]> {
        match &self.heap.get(of).payload {
            Payload::List(items) => Some(items),
            _ => None,
        }
    }

    /// The identity name of a callable object, if set.
    pub fn callable_name(&self, of: ObjRef) -> Option<&str> {
        match &self.heap.get(of).payload {
            Payload::Callable(c) => c.name(),
            _ => None,
        }
    }

    /// The kind label visible from this object.
    pub fn kind_name(&self, of: ObjRef) -> &str {
        self.heap.kind_name(of)
    }

    /// Whether `kind` is in `of`'s mimic closure.
    pub fn is_a(&self, of: ObjRef, kind: ObjRef) -> bool {
        self.heap.is_kind(of, kind)
    }

    /// Coerce to a host integer, signaling a `Type` condition (armed
    /// with a `useValue` restart) until the value is a number. A handler
    /// that keeps supplying non-numbers keeps getting re-signaled.
    pub fn coerce_number(
        &mut self,
        mut value: ObjRef,
        message: &Message,
        ctx: ObjRef,
    ) -> EvalResult<i64> {
        loop {
            if let Payload::Number(n) = &self.heap.get(value).payload {
                return Ok(*n);
            }
            let condition = self.new_condition(self.condition_type, message, ctx, value);
            self.heap.set_cell(condition, "value", value);
            let expected = self.new_text("Number");
            self.heap.set_cell(condition, "expectedKind", expected);
            let text = self.new_text(format!(
                "couldn't convert {} to Number",
                self.heap.kind_name(value)
            ));
            self.heap.set_cell(condition, "text", text);

            match self.with_restarts(vec![Restart::returning_argument("useValue")], |rt| {
                rt.error_condition(condition)
            })? {
                Protected::Restarted { args, .. } => value = args[0],
                Protected::Value(v) => value = v,
            }
        }
    }

    /// Coerce to text through `asText` dispatch, signaling a `Type`
    /// condition when the result is not a text.
    pub fn coerce_text(
        &mut self,
        value: ObjRef,
        message: &Message,
        ctx: ObjRef,
    ) -> EvalResult<String> {
        let as_text = Message::new("asText");
        let result = self.send(&as_text, ctx, value)?;
        if let Payload::Text(s) = &self.heap.get(result).payload {
            return Ok(s.clone());
        }
        let condition = self.new_condition(self.condition_type, message, ctx, value);
        let expected = self.new_text("Text");
        self.heap.set_cell(condition, "expectedKind", expected);
        let text = self.new_text(format!(
            "couldn't convert {} to Text",
            self.heap.kind_name(value)
        ));
        self.heap.set_cell(condition, "text", text);
        self.error_condition(condition).map(|_| String::new())
    }

    /// Short, non-dispatching rendering of a value — the host-side
    /// "notice" used in condition reports, where re-entering the
    /// evaluator is off the table.
    pub fn describe(&self, value: ObjRef) -> String {
        let mut rendering = FxHashSet::default();
        self.describe_guarded(value, &mut rendering)
    }

    /// Lists can contain themselves; a list already being rendered
    /// shows as `[...]` instead of recursing.
    fn describe_guarded(&self, value: ObjRef, rendering: &mut FxHashSet<ObjRef>) -> String {
        match &self.heap.get(value).payload {
            Payload::Nil => "nil".to_string(),
            Payload::Boolean(b) => b.to_string(),
            Payload::Number(n) => n.to_string(),
            Payload::Text(s) => format!("{s:?}"),
            Payload::List(items) => {
                if !rendering.insert(value) {
                    return "[...]".to_string();
                }
                let parts: Vec<String> = items
                    .iter()
                    .map(|&i| self.describe_guarded(i, rendering))
                    .collect();
                rendering.remove(&value);
                format!("[{}]", parts.join(", "))
            }
            Payload::Callable(c) => match c.name() {
                Some(name) => format!("{}({})", self.heap.kind_name(value), name),
                None => self.heap.kind_name(value).to_string(),
            },
            Payload::Message(m) => m.to_string(),
            _ => self.heap.kind_name(value).to_string(),
        }
    }

    /// Structural payload equality with identity fallback.
    pub fn equal(&self, a: ObjRef, b: ObjRef) -> bool {
        let mut comparing = FxHashSet::default();
        self.equal_guarded(a, b, &mut comparing)
    }

    /// A pair already under comparison is taken as equal: two lists are
    /// unequal only if some finite unrolling distinguishes them, which
    /// keeps self-referential lists from recursing without bound.
    fn equal_guarded(&self, a: ObjRef, b: ObjRef, comparing: &mut FxHashSet<(ObjRef, ObjRef)>) -> bool {
        if a == b {
            return true;
        }
        match (&self.heap.get(a).payload, &self.heap.get(b).payload) {
            (Payload::Number(x), Payload::Number(y)) => x == y,
            (Payload::Text(x), Payload::Text(y)) => x == y,
            (Payload::Boolean(x), Payload::Boolean(y)) => x == y,
            (Payload::Nil, Payload::Nil) => true,
            (Payload::List(x), Payload::List(y)) => {
                if x.len() != y.len() {
                    return false;
                }
                if !comparing.insert((a, b)) {
                    return true;
                }
                x.iter()
                    .zip(y.iter())
                    .all(|(&i, &j)| self.equal_guarded(i, j, comparing))
            }
            _ => false,
        }
    }

    /// The receiver behind a context wrapper (the object a native like
    /// `each` should hand to user code), or the object itself.
    pub fn real_context(&self, of: ObjRef) -> ObjRef {
        match &self.heap.get(of).payload {
            Payload::Context(cx) => cx.real_context,
            _ => of,
        }
    }

    /// Ground/real pair seen from a context or plain object.
    pub(crate) fn context_pair(&self, of: ObjRef) -> (ObjRef, ObjRef) {
        match &self.heap.get(of).payload {
            Payload::Context(cx) => (cx.ground, cx.real_context),
            _ => (of, of),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// View an argument as a standalone message, wrapping bare literals in
/// their carrier messages.
pub(crate) fn arg_as_message(arg: &MessageArg) -> Message {
    match arg {
        MessageArg::Message(m) => m.clone(),
        MessageArg::Text(t) => {
            Message::new("internal:createText").with_arg(MessageArg::Text(t.clone()))
        }
        MessageArg::Number(n) => {
            Message::new("internal:createNumber").with_arg(MessageArg::Number(*n))
        }
    }
}
