#![deny(clippy::unwrap_used)]
//! Deferred attribute/call chains.
//!
//! A [`DotChain`] records member accesses and calls against a root value
//! without evaluating them. Forcing the chain (with [`DotChain::result`], by
//! awaiting it, or by iterating it) replays the recorded steps against the
//! root, resolving names the current value lacks against a list of context
//! objects and finally the [`builtins`] namespace.

mod builtins;
mod engine;
mod error;
mod facade;
mod iteration;
mod link;
mod namespace;
mod options;
mod values;

pub use builtins::builtins;
pub use engine::{resolve_async, resolve_sync};
pub use error::{ChainError, R, ok};
pub use facade::{ChainIter, DotChain};
pub use link::{Contexts, Link, Member, Step, StepLabel};
pub use namespace::Namespace;
pub use options::{ChainOptions, ReplayOptions};
pub use values::{
    BuiltinImpl, BuiltinValue, CallArgs, FutureValue, IterValue, Receiver, Resolve, StreamValue,
    Value, format_value, repr_value, values_equal,
};
