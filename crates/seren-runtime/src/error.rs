//! Control-flow signals and host-level faults.

use crate::condition::ConditionReport;
use crate::heap::ObjRef;
use thiserror::Error;

/// Non-local transfer unwinding through the evaluator.
///
/// `Break` and `ToRestart` are control flow, not faults: each is
/// consumed by exactly one frame — the nearest enclosing loop construct,
/// or the restart's registering frame. Condition handlers never see
/// either. `Fatal` is the only variant that reaches the embedder.
#[derive(Debug, Clone, Error)]
pub enum Unwind {
    /// `break(value)` travelling to the nearest enclosing loop construct.
    #[error("break signal escaped every loop construct")]
    Break(ObjRef),
    /// A restart was invoked; unwinding to its registering frame. The
    /// frame resumes with the restart's invocation arguments.
    #[error("restart transfer escaped its registering frame")]
    ToRestart { token: u64, args: Vec<ObjRef> },
    /// Unrecoverable; aborts the current top-level evaluation.
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Faults reported to the embedding front end.
#[derive(Debug, Clone, Error)]
pub enum FatalError {
    /// An error-kind condition fell through every handler.
    #[error("unhandled condition: {0}")]
    Unhandled(ConditionReport),
    /// A restart was invoked by name while no restart with that name was
    /// on the dynamic stack.
    #[error("no restart named '{0}' is active")]
    NoSuchRestart(String),
    /// A restart was invoked with the wrong number of arguments.
    #[error("restart '{name}' expects {expected} argument(s), got {given}")]
    RestartArity {
        name: String,
        expected: usize,
        given: usize,
    },
    /// A break or restart transfer reached the top level unconsumed.
    #[error("control flow signal escaped to top level: {0}")]
    StrayControlFlow(&'static str),
}

/// Result alias used throughout the runtime.
pub type EvalResult<T> = Result<T, Unwind>;
