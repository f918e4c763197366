//! Condition/restart subsystem.
//!
//! Two independent dynamic stacks live on the runtime: restarts (named
//! recovery strategies, invokable while their registering frame is on
//! the stack) and handlers (kind-guarded callbacks searched
//! most-recently-registered-first when a condition is signaled). Both
//! follow scoped push/pop discipline: every registration is undone on
//! every exit path, including signal-driven unwinding.

use crate::error::{EvalResult, FatalError, Unwind};
use crate::heap::{ObjRef, Payload};
use crate::runtime::Runtime;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// A named, dynamically scoped recovery strategy.
pub struct Restart {
    pub name: String,
    pub argument_count: usize,
    /// Runs at the unwind target, while the registering frame is still
    /// armed; its result becomes `Protected::Restarted::value`.
    pub invoke: Rc<dyn Fn(&mut Runtime, &[ObjRef]) -> EvalResult<ObjRef>>,
}

impl Restart {
    pub fn new(
        name: impl Into<String>,
        argument_count: usize,
        invoke: impl Fn(&mut Runtime, &[ObjRef]) -> EvalResult<ObjRef> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            argument_count,
            invoke: Rc::new(invoke),
        }
    }

    /// One-argument restart whose result is that argument — the common
    /// `useValue` shape.
    pub fn returning_argument(name: impl Into<String>) -> Self {
        Self::new(name, 1, |_rt, args| Ok(args[0]))
    }
}

impl fmt::Debug for Restart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restart")
            .field("name", &self.name)
            .field("argument_count", &self.argument_count)
            .finish_non_exhaustive()
    }
}

/// Stack entry: the token ties an in-flight unwind to the registration
/// it targets.
pub(crate) struct RestartEntry {
    pub token: u64,
    pub restart: Restart,
}

/// A condition handler guarded by a condition kind.
pub struct Handler {
    /// Guard: the handler runs for conditions whose mimic closure
    /// contains this object.
    pub kind: ObjRef,
    /// May invoke a restart (unwinds), or return `Ok(())` to decline.
    pub action: Rc<dyn Fn(&mut Runtime, ObjRef) -> EvalResult<()>>,
}

impl Handler {
    pub fn new(
        kind: ObjRef,
        action: impl Fn(&mut Runtime, ObjRef) -> EvalResult<()> + 'static,
    ) -> Self {
        Self {
            kind,
            action: Rc::new(action),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`Runtime::with_restarts`].
#[derive(Debug)]
pub enum Protected {
    /// The body completed normally.
    Value(ObjRef),
    /// One of the frame's own restarts was invoked; evaluation resumes
    /// here with the invocation arguments and the invoke callback's
    /// result.
    Restarted {
        name: String,
        args: Vec<ObjRef>,
        value: ObjRef,
    },
}

/// What an unhandled error condition looks like to the embedding front
/// end. The core performs no output of its own; this is the whole
/// reporting surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionReport {
    /// Kind label, e.g. `Condition Error Index`.
    pub kind: String,
    /// The condition's report text, if any.
    pub text: Option<String>,
    /// Rendering of the message whose evaluation signaled.
    pub message: Option<String>,
    /// Kind of the receiver the failing message was sent to.
    pub receiver_kind: Option<String>,
    /// Subtype-specific fields (e.g. the out-of-range index), rendered.
    pub fields: Vec<(String, String)>,
}

impl fmt::Display for ConditionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(text) = &self.text {
            write!(f, ": {text}")?;
        }
        if let Some(message) = &self.message {
            write!(f, " (signaled by `{message}`")?;
            if let Some(rk) = &self.receiver_kind {
                write!(f, " on {rk}")?;
            }
            write!(f, ")")?;
        }
        for (name, value) in &self.fields {
            write!(f, "; {name} = {value}")?;
        }
        Ok(())
    }
}

impl Runtime {
    /// Run `body` with the given restarts armed. The restart stack depth
    /// is recorded on entry and restored on every exit path — normal
    /// return, restart transfer, or unrelated unwinding.
    pub fn with_restarts<F>(&mut self, restarts: Vec<Restart>, body: F) -> EvalResult<Protected>
    where
        F: FnOnce(&mut Runtime) -> EvalResult<ObjRef>,
    {
        let depth = self.restarts.len();
        for restart in restarts {
            let token = self.next_restart_token;
            self.next_restart_token += 1;
            self.restarts.push(RestartEntry { token, restart });
        }

        match body(self) {
            Ok(value) => {
                self.restarts.truncate(depth);
                Ok(Protected::Value(value))
            }
            Err(Unwind::ToRestart { token, args }) => {
                let owned = self.restarts[depth..]
                    .iter()
                    .find(|e| e.token == token)
                    .map(|e| (e.restart.name.clone(), Rc::clone(&e.restart.invoke)));
                match owned {
                    Some((name, invoke)) => {
                        // The frame stays armed while the invoke callback
                        // runs; only then is the depth restored.
                        let value = match invoke(self, &args) {
                            Ok(v) => v,
                            Err(e) => {
                                self.restarts.truncate(depth);
                                return Err(e);
                            }
                        };
                        self.restarts.truncate(depth);
                        Ok(Protected::Restarted { name, args, value })
                    }
                    None => {
                        self.restarts.truncate(depth);
                        Err(Unwind::ToRestart { token, args })
                    }
                }
            }
            Err(other) => {
                self.restarts.truncate(depth);
                Err(other)
            }
        }
    }

    /// Start unwinding to the topmost live restart with the given name.
    ///
    /// Always returns `Err`: either the restart transfer, or a fatal
    /// fault when no such restart is armed (invoking a popped restart is
    /// a programming error) or the arity is wrong.
    pub fn invoke_restart(&mut self, name: &str, args: Vec<ObjRef>) -> EvalResult<()> {
        match self.restarts.iter().rev().find(|e| e.restart.name == name) {
            Some(entry) => {
                if entry.restart.argument_count != args.len() {
                    return Err(Unwind::Fatal(FatalError::RestartArity {
                        name: name.to_string(),
                        expected: entry.restart.argument_count,
                        given: args.len(),
                    }));
                }
                Err(Unwind::ToRestart {
                    token: entry.token,
                    args,
                })
            }
            None => Err(Unwind::Fatal(FatalError::NoSuchRestart(name.to_string()))),
        }
    }

    /// Whether a restart with this name is currently invokable.
    pub fn restart_active(&self, name: &str) -> bool {
        self.restarts.iter().any(|e| e.restart.name == name)
    }

    /// Run `body` with the given handlers registered, most recent last.
    /// The handler stack is restored on every exit path.
    pub fn with_handlers<F, T>(&mut self, handlers: Vec<Handler>, body: F) -> EvalResult<T>
    where
        F: FnOnce(&mut Runtime) -> EvalResult<T>,
    {
        let depth = self.handlers.len();
        let saved_limit = self.handler_limit;
        self.handlers.extend(handlers);
        self.handler_limit = self.handlers.len();

        let result = body(self);

        self.handlers.truncate(depth);
        self.handler_limit = saved_limit;
        result
    }

    /// Signal a condition: search the handler stack most recently
    /// registered first for a handler whose kind guard matches the
    /// condition's mimic closure. A matching handler runs with only the
    /// handlers registered outside it visible, so re-signaling inside a
    /// handler searches outward. A handler that returns normally has
    /// declined, and the search continues. Returns `Ok(())` when every
    /// handler declined (or none matched).
    pub fn signal(&mut self, condition: ObjRef) -> EvalResult<()> {
        let mut idx = self.handler_limit.min(self.handlers.len());
        while idx > 0 {
            idx -= 1;
            if !self.heap.is_kind(condition, self.handlers[idx].kind) {
                continue;
            }
            let action = Rc::clone(&self.handlers[idx].action);
            let saved_limit = self.handler_limit;
            self.handler_limit = idx;
            let outcome = action(self, condition);
            self.handler_limit = saved_limit;
            outcome?;
        }
        Ok(())
    }

    /// Signal an error-kind condition. If no handler recovers via a
    /// restart, the default action applies: abort the current top-level
    /// evaluation with the condition's report. Never returns a value.
    pub fn error_condition(&mut self, condition: ObjRef) -> EvalResult<ObjRef> {
        self.signal(condition)?;
        Err(Unwind::Fatal(FatalError::Unhandled(
            self.condition_report(condition),
        )))
    }

    /// Build the embedder-facing report for a condition object.
    pub fn condition_report(&self, condition: ObjRef) -> ConditionReport {
        let text = self
            .heap
            .resolve(condition, "text")
            .and_then(|t| match &self.heap.get(t).payload {
                Payload::Text(s) => Some(s.clone()),
                _ => None,
            });
        let message = self
            .heap
            .resolve(condition, "message")
            .and_then(|m| match &self.heap.get(m).payload {
                Payload::Message(msg) => Some(msg.to_string()),
                _ => None,
            });
        let receiver_kind = self
            .heap
            .resolve(condition, "receiver")
            .map(|r| self.heap.kind_name(r).to_string());

        let mut fields: Vec<(String, String)> = self
            .heap
            .get(condition)
            .cells
            .iter()
            .filter(|(name, _)| !matches!(name.as_str(), "message" | "context" | "receiver" | "text"))
            .map(|(name, &value)| (name.clone(), self.describe(value)))
            .collect();
        fields.sort();

        ConditionReport {
            kind: self.heap.kind_name(condition).to_string(),
            text,
            message,
            receiver_kind,
            fields,
        }
    }
}
