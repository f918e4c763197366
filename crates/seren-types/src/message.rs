//! The message tree consumed by the evaluator.
//!
//! A message is a name, an ordered list of arguments, and an optional
//! link to the next message in a chain — `a b c` is a right-growing
//! chain where each link is sent to the result of the previous one.
//! Messages are immutable after construction; arguments stay unevaluated
//! until the receiving callable chooses to evaluate them.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One parsed message: `name(arg, ...) next`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    pub args: Vec<MessageArg>,
    pub next: Option<Box<Message>>,
    pub span: Span,
}

/// An argument position: either a sub-message or a literal payload.
///
/// Parsers may ship literals either directly or wrapped in
/// `internal:createText` / `internal:createNumber` carrier messages;
/// the runtime accepts both forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageArg {
    Message(Message),
    Text(String),
    Number(i64),
}

impl Message {
    /// Create a message with no arguments and no chain link.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            next: None,
            span: Span::UNKNOWN,
        }
    }

    /// Append one argument.
    pub fn with_arg(mut self, arg: impl Into<MessageArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<MessageArg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Attach a span.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Append `next` at the end of this chain, so
    /// `msg("a").then(msg("b")).then(msg("c"))` builds `a b c`.
    pub fn then(mut self, next: Message) -> Self {
        let mut tail = &mut self;
        while let Some(ref mut n) = tail.next {
            tail = n;
        }
        tail.next = Some(Box::new(next));
        self
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn arg_at(&self, index: usize) -> Option<&MessageArg> {
        self.args.get(index)
    }

    /// Iterate the chain starting at this message.
    pub fn chain(&self) -> impl Iterator<Item = &Message> {
        let mut cur = Some(self);
        std::iter::from_fn(move || {
            let this = cur?;
            cur = this.next.as_deref();
            Some(this)
        })
    }
}

impl From<Message> for MessageArg {
    fn from(m: Message) -> Self {
        MessageArg::Message(m)
    }
}

impl From<i64> for MessageArg {
    fn from(n: i64) -> Self {
        MessageArg::Number(n)
    }
}

impl From<&str> for MessageArg {
    fn from(s: &str) -> Self {
        MessageArg::Text(s.to_string())
    }
}

impl From<String> for MessageArg {
    fn from(s: String) -> Self {
        MessageArg::Text(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ")")?;
        }
        if let Some(next) = &self.next {
            write!(f, " {next}")?;
        }
        Ok(())
    }
}

impl fmt::Display for MessageArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageArg::Message(m) => write!(f, "{m}"),
            MessageArg::Text(t) => write!(f, "{t:?}"),
            MessageArg::Number(n) => write!(f, "{n}"),
        }
    }
}
