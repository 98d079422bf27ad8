//! Chain replay.
//!
//! Both drivers walk the steps root-to-tip and share the bookkeeping in
//! [`Replay`]: the current value, the context the last name was resolved
//! from, and the log of root/call results that pipe mode draws on.

use std::sync::Arc;

use crate::builtins::builtins;
use crate::error::ChainError;
use crate::link::{Link, Member};
use crate::options::ReplayOptions;
use crate::values::{CallArgs, Value};

mod async_replay;
mod sync_replay;

pub use async_replay::resolve_async;
pub use sync_replay::resolve_sync;

pub(crate) struct Replay<'a> {
    tip: &'a Link,
    contexts: &'a [Value],
    options: ReplayOptions,
    current: Value,
    context: Option<Value>,
    log: Vec<Value>,
}

impl<'a> Replay<'a> {
    fn new(tip: &'a Link, contexts: &'a [Value], options: ReplayOptions) -> Self {
        Self {
            tip,
            contexts,
            options,
            current: Value::Unit,
            context: None,
            log: Vec::with_capacity(tip.depth()),
        }
    }

    fn enter_root(&mut self, data: &Value) {
        self.current = data.clone();
    }

    fn enter_member(&mut self, member: &Member) -> Result<(), ChainError> {
        match member {
            Member::Callable(callable) => {
                self.current = callable.clone();
            }
            Member::Name(name) => {
                if let Some(value) = self.own_member(name) {
                    if needs_receiver(&value) {
                        let owner = std::mem::replace(&mut self.current, Value::Unit);
                        self.context = Some(owner);
                    }
                    self.current = value;
                } else {
                    let (value, context) = self.resolve_in_contexts(name)?;
                    self.current = value;
                    self.context = Some(context);
                }
            }
        }
        Ok(())
    }

    fn own_member(&self, name: &str) -> Option<Value> {
        if is_private(name) {
            return None;
        }
        self.current.member(name)
    }

    /// Searches the contexts, then the builtins fallback. A member beats a
    /// key within the same context; earlier contexts beat later ones.
    fn resolve_in_contexts(&self, name: &str) -> Result<(Value, Value), ChainError> {
        if !is_private(name) {
            let fallback = self.options.builtin_fallback.then(builtins);
            for context in self.contexts.iter().chain(fallback.as_ref()) {
                let found = context.member(name).or_else(|| context.key(name));
                if let Some(value) = found {
                    tracing::debug!(
                        name,
                        context = context.type_name(),
                        "name resolved from context"
                    );
                    return Ok((value, context.clone()));
                }
            }
        }
        Err(ChainError::AttributeResolution {
            chain: self.tip.to_string(),
            name: name.to_string(),
        })
    }

    /// Piped calls get the last logged value first; callables that declare a
    /// receiver get the resolving context in front of that.
    fn prepare_call(&self, link: &Link, args: &CallArgs) -> CallArgs {
        let mut args = args.clone();
        if link.pipe() {
            if let Some(last) = self.log.last() {
                args.prepend(last.clone());
            }
        }
        if needs_receiver(&self.current) {
            args.prepend(self.context.clone().unwrap_or(Value::Unit));
        }
        args
    }

    fn record(&mut self, link: &Arc<Link>) {
        if link.is_logged() {
            self.log.push(self.current.clone());
        }
    }

    fn finish(self) -> Value {
        self.current
    }
}

fn needs_receiver(value: &Value) -> bool {
    matches!(value, Value::Builtin(builtin) if builtin.receiver().is_required())
}

fn is_private(name: &str) -> bool {
    name.starts_with("__")
}
