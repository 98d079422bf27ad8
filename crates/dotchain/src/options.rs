use crate::link::Contexts;
use crate::values::Value;

/// Construction-time configuration of a chain root.
///
/// The resolution knobs travel with every facade derived from the root.
#[derive(Clone, Debug)]
pub struct ChainOptions {
    pub contexts: Contexts,
    pub pipe: bool,
    /// Search the `builtins` namespace after the user contexts.
    pub builtin_fallback: bool,
    /// During async replay, run synchronous callables on tokio's blocking
    /// pool instead of the calling task.
    pub offload_blocking: bool,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            contexts: Contexts::new(),
            pipe: false,
            builtin_fallback: true,
            offload_blocking: true,
        }
    }
}

impl ChainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, context: impl Into<Value>) -> Self {
        self.contexts.insert(context.into());
        self
    }

    pub fn contexts(mut self, contexts: impl IntoIterator<Item = Value>) -> Self {
        self.contexts.extend(contexts);
        self
    }

    pub fn pipe(mut self, pipe: bool) -> Self {
        self.pipe = pipe;
        self
    }

    pub fn builtin_fallback(mut self, enabled: bool) -> Self {
        self.builtin_fallback = enabled;
        self
    }

    pub fn offload_blocking(mut self, enabled: bool) -> Self {
        self.offload_blocking = enabled;
        self
    }

    pub(crate) fn replay(&self) -> ReplayOptions {
        ReplayOptions {
            builtin_fallback: self.builtin_fallback,
            offload_blocking: self.offload_blocking,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ReplayOptions {
    pub builtin_fallback: bool,
    pub offload_blocking: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        ChainOptions::default().replay()
    }
}
