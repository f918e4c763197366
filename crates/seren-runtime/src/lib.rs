//! Seren evaluation core.
//!
//! Seren is a prototype-based, message-passing dynamic language. This
//! crate is its evaluator: it resolves identifiers through a multi-parent
//! prototype graph ("mimics"), activates callable values against
//! unevaluated argument message trees, and implements a resumable
//! condition/restart protocol as a structured alternative to terminating
//! exceptions.
//!
//! The parser is an external collaborator: it produces the
//! [`seren_types::Message`] trees this crate consumes. The embedding
//! surface is [`Runtime`]: bootstrap a runtime, optionally register
//! native cells, and feed it message chains with [`Runtime::evaluate`].

mod behavior;
mod callable;
mod condition;
mod error;
mod heap;
mod list;
mod number;
mod runtime;
mod text;

pub use callable::{Callable, NativeFn, NativeMethod, UserBody};
pub use condition::{ConditionReport, Handler, Protected, Restart};
pub use error::{EvalResult, FatalError, Unwind};
pub use heap::{CallInfo, Context, Heap, ObjRef, Object, Payload};
pub use runtime::Runtime;
