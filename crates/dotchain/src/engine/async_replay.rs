use std::sync::Arc;

use super::Replay;
use crate::error::{ChainError, R};
use crate::link::{Contexts, Link, Step};
use crate::options::ReplayOptions;
use crate::values::{CallArgs, Value};

/// Replays the chain ending at `tip`, awaiting every awaitable step result
/// before the next step runs.
#[tracing::instrument(level = "debug", skip_all, fields(chain = %tip))]
pub async fn resolve_async(tip: Arc<Link>, contexts: Contexts, options: ReplayOptions) -> R {
    let mut replay = Replay::new(&tip, contexts.as_slice(), options);
    for link in tip.steps() {
        tracing::trace!(step = %link.label(), "replay step");
        match link.step() {
            Step::Root(data) => replay.enter_root(data),
            Step::Member(member) => replay.enter_member(member)?,
            Step::Call(args) => {
                let args = replay.prepare_call(&link, args);
                let callee = replay.current.clone();
                replay.current = invoke(callee, args, options).await?;
            }
        }
        if let Value::Future(future) = &replay.current {
            let future = future.clone();
            replay.current = future.resolve().await?;
        }
        replay.record(&link);
    }
    Ok(replay.finish())
}

/// Async callables are invoked in place (they only build a future).
/// Synchronous ones go to the blocking pool when a tokio runtime is around.
async fn invoke(callee: Value, args: CallArgs, options: ReplayOptions) -> R {
    let Value::Builtin(builtin) = callee else {
        return callee.call(args);
    };
    if builtin.is_async() || !options.offload_blocking {
        return builtin.call(args);
    }
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return builtin.call(args);
    };
    tracing::debug!(callable = builtin.name(), "offloading call to blocking pool");
    let joined = handle.spawn_blocking(move || builtin.call(args)).await;
    joined.map_err(|err| ChainError::Join(err.to_string()))?
}
