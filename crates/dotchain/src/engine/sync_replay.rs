use std::sync::Arc;

use super::Replay;
use crate::error::R;
use crate::link::{Contexts, Link, Step};
use crate::options::ReplayOptions;

/// Replays the chain ending at `tip` on the calling thread.
///
/// Async callables are not driven: their pending result comes back as a
/// `Value::Future`, and a lazy final value is returned unconsumed.
#[tracing::instrument(level = "debug", skip_all, fields(chain = %tip))]
pub fn resolve_sync(tip: &Arc<Link>, contexts: &Contexts, options: ReplayOptions) -> R {
    let mut replay = Replay::new(tip, contexts.as_slice(), options);
    for link in tip.steps() {
        tracing::trace!(step = %link.label(), "replay step");
        match link.step() {
            Step::Root(data) => replay.enter_root(data),
            Step::Member(member) => replay.enter_member(member)?,
            Step::Call(args) => {
                let args = replay.prepare_call(&link, args);
                replay.current = replay.current.call(args)?;
            }
        }
        replay.record(&link);
    }
    Ok(replay.finish())
}
