//! Shared types for the Seren runtime.
//!
//! This crate defines the `Message` tree — the parsed unit of syntax the
//! parser collaborator hands to the evaluator — along with source spans
//! and the builder helpers embedders and tests use to construct message
//! chains by hand.

mod message;
mod span;

pub use message::{Message, MessageArg};
pub use span::Span;
