use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, Stream};

use crate::engine::{resolve_async, resolve_sync};
use crate::error::{ChainError, R};
use crate::iteration::{AsyncCursor, Cursor, Iteration};
use crate::link::{Contexts, Link, Member};
use crate::options::{ChainOptions, ReplayOptions};
use crate::values::{BuiltinValue, CallArgs, Receiver, Value};

/// Records member accesses and calls against a root value and replays them
/// on demand.
///
/// Extending a chain ([`attr`](Self::attr), [`call`](Self::call), ...) never
/// evaluates anything; it returns a new `DotChain` whose tip is one step
/// longer and shares every earlier step. Evaluation happens in
/// [`result`](Self::result), when the chain is awaited, or when it is
/// iterated.
///
/// ```
/// use dotchain::{CallArgs, DotChain, Value};
///
/// let chain = DotChain::new("0,1,2").attr("split").call(CallArgs::new().arg(","));
/// let parts = chain.result().unwrap();
/// assert_eq!(parts, Value::list(["0", "1", "2"].map(Value::from)));
/// ```
pub struct DotChain {
    link: Arc<Link>,
    contexts: Contexts,
    pipe: bool,
    options: ReplayOptions,
    iteration: Iteration,
}

impl DotChain {
    pub fn new(data: impl Into<Value>) -> Self {
        Self::with_options(data, ChainOptions::default())
    }

    pub fn with_options(data: impl Into<Value>, options: ChainOptions) -> Self {
        let replay = options.replay();
        let ChainOptions { contexts, pipe, .. } = options;
        Self {
            link: Link::root(data.into(), contexts.clone(), pipe),
            contexts,
            pipe,
            options: replay,
            iteration: Iteration::default(),
        }
    }

    /// Calls recorded from now on receive the previous result as their first
    /// argument.
    pub fn pipe(mut self) -> Self {
        self.pipe = true;
        self
    }

    /// Switches back to plain method-chaining calls.
    pub fn chain(mut self) -> Self {
        self.pipe = false;
        self
    }

    pub fn with<I>(self, contexts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.with_contexts(contexts, false)
    }

    pub fn with_contexts<I>(mut self, contexts: I, clear: bool) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        if clear {
            self.contexts.clear();
        }
        self.contexts.extend(contexts.into_iter().map(Into::into));
        self
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.derive(Link::member(
            &self.link,
            Member::Name(name.into()),
            self.contexts.clone(),
            self.pipe,
        ))
    }

    pub fn call(&self, args: impl Into<CallArgs>) -> Self {
        self.derive(Link::call(
            &self.link,
            args.into(),
            self.contexts.clone(),
            self.pipe,
        ))
    }

    /// Splices `callable` in as the next member and calls it without extra
    /// arguments. In pipe mode it receives the previous result.
    pub fn call_fn(&self, callable: impl Into<Value>) -> Self {
        let member = self.derive(Link::member(
            &self.link,
            Member::Callable(callable.into()),
            self.contexts.clone(),
            self.pipe,
        ));
        member.call(CallArgs::new())
    }

    /// Closure form of [`call_fn`](Self::call_fn).
    pub fn then(&self, func: impl Fn(CallArgs) -> R + Send + Sync + 'static) -> Self {
        self.call_fn(BuiltinValue::new("<closure>", Receiver::None, func))
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    pub fn contexts(&self) -> &Contexts {
        &self.contexts
    }

    pub fn is_piping(&self) -> bool {
        self.pipe
    }

    /// Replays the chain synchronously. Async callables are not driven and
    /// come back as a pending [`Value::Future`].
    pub fn result(&self) -> R {
        resolve_sync(&self.link, &self.contexts, self.options)
    }

    /// Replays the chain asynchronously, awaiting every awaitable step.
    pub async fn resolve(&self) -> R {
        resolve_async(self.link.clone(), self.contexts.clone(), self.options).await
    }

    /// Starts a fresh synchronous iteration over the chain's result.
    pub fn iter(&mut self) -> ChainIter<'_> {
        self.iteration.restart();
        ChainIter { chain: self }
    }

    /// Continues the iteration in progress, replaying the chain first if
    /// none is.
    pub fn next_item(&mut self) -> Option<R> {
        if matches!(self.iteration, Iteration::NotStarted) {
            let started = self.result().and_then(Cursor::from_value);
            match started {
                Ok(cursor) => self.iteration = Iteration::Sync(cursor),
                Err(err) => return self.fail(err),
            }
        }
        let item = match &mut self.iteration {
            Iteration::Sync(cursor) | Iteration::Async(AsyncCursor::Sync(cursor)) => {
                cursor.next_item()
            }
            Iteration::Async(AsyncCursor::Stream(_)) => Some(Err(ChainError::message(
                "an async stream cannot be iterated synchronously",
            ))),
            Iteration::NotStarted | Iteration::Done => None,
        };
        self.settle(item)
    }

    /// Starts a fresh asynchronous iteration. A stream result is delegated
    /// to; any other iterable yields its items one per poll.
    pub fn stream(&mut self) -> impl Stream<Item = R> + Send + '_ {
        self.iteration.restart();
        stream::unfold(self, |chain| async move {
            let item = chain.next_item_async().await?;
            Some((item, chain))
        })
    }

    pub async fn next_item_async(&mut self) -> Option<R> {
        if matches!(self.iteration, Iteration::NotStarted) {
            let started = self.resolve().await.and_then(AsyncCursor::from_value);
            match started {
                Ok(cursor) => self.iteration = Iteration::Async(cursor),
                Err(err) => return self.fail(err),
            }
        }
        let item = match &mut self.iteration {
            Iteration::Async(cursor) => cursor.next_item().await,
            Iteration::Sync(cursor) => cursor.next_item(),
            Iteration::NotStarted | Iteration::Done => None,
        };
        self.settle(item)
    }

    fn derive(&self, link: Arc<Link>) -> Self {
        Self {
            link,
            contexts: self.contexts.clone(),
            pipe: self.pipe,
            options: self.options,
            iteration: Iteration::default(),
        }
    }

    fn fail(&mut self, err: ChainError) -> Option<R> {
        self.iteration = Iteration::Done;
        Some(Err(err))
    }

    /// Exhaustion and errors both end the iteration.
    fn settle(&mut self, item: Option<R>) -> Option<R> {
        if !matches!(item, Some(Ok(_))) {
            self.iteration = Iteration::Done;
        }
        item
    }
}

impl Clone for DotChain {
    /// Clones the chain, not the iteration in progress.
    fn clone(&self) -> Self {
        self.derive(self.link.clone())
    }
}

impl fmt::Display for DotChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.link, f)
    }
}

impl fmt::Debug for DotChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DotChain")
            .field("chain", &self.link.to_string())
            .field("contexts", &self.contexts.len())
            .field("pipe", &self.pipe)
            .finish()
    }
}

impl IntoFuture for DotChain {
    type Output = R;
    type IntoFuture = BoxFuture<'static, R>;

    fn into_future(self) -> Self::IntoFuture {
        resolve_async(self.link, self.contexts, self.options).boxed()
    }
}

impl IntoFuture for &DotChain {
    type Output = R;
    type IntoFuture = BoxFuture<'static, R>;

    fn into_future(self) -> Self::IntoFuture {
        resolve_async(self.link.clone(), self.contexts.clone(), self.options).boxed()
    }
}

/// Synchronous iterator returned by [`DotChain::iter`].
pub struct ChainIter<'a> {
    chain: &'a mut DotChain,
}

impl Iterator for ChainIter<'_> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        self.chain.next_item()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::IterValue;

    #[test]
    fn extending_does_not_mutate_the_parent() {
        let root = DotChain::new("a,b");
        let split = root.attr("split").call(CallArgs::new().arg(","));
        assert_eq!(root.result().expect("root"), Value::from("a,b"));
        insta::assert_snapshot!(split.to_string(), @"DotChain('a,b').split(',')");
    }

    #[test]
    fn builder_flags_do_not_reach_back() {
        let piped = DotChain::new(Value::list([Value::Int(3), Value::Int(1)]))
            .pipe()
            .attr("sorted")
            .call(());
        let chained = piped.clone().chain();
        assert!(piped.link().pipe());
        assert!(!chained.is_piping());
        assert_eq!(
            chained.result().expect("sorted"),
            Value::list([Value::Int(1), Value::Int(3)])
        );
    }

    #[test]
    fn contexts_skip_unit_and_duplicates() {
        let ctx = Value::record([("x", Value::Int(1))]);
        let chain = DotChain::new(())
            .with([ctx.clone(), Value::Unit, ctx.clone()])
            .with([Value::Int(2)]);
        assert_eq!(chain.contexts().len(), 2);
        let cleared = chain.with_contexts([Value::Int(9)], true);
        assert_eq!(cleared.contexts().as_slice(), &[Value::Int(9)]);
    }

    #[test]
    fn then_pipes_the_previous_result() {
        let chain = DotChain::new(20).pipe().then(|args: CallArgs| {
            let n = args.require(0, "n", "inc")?.as_int().unwrap_or(0);
            Ok(Value::Int(n + 1))
        });
        assert_eq!(chain.result().expect("then"), Value::Int(21));
    }

    #[test]
    fn iteration_restarts_by_replaying() {
        let mut chain = DotChain::new(3).pipe().attr("range").call(());
        let first: Vec<_> = chain.iter().collect::<Result<_, _>>().expect("first");
        assert_eq!(first, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
        assert!(chain.next_item().is_none());
        let again: Vec<_> = chain.iter().collect::<Result<_, _>>().expect("again");
        assert_eq!(again, first);
    }

    #[test]
    fn shared_lazy_root_is_consumed_once() {
        let mut chain = DotChain::new(IterValue::from_values(vec![Value::Int(1)]));
        assert_eq!(chain.iter().count(), 1);
        assert_eq!(chain.iter().count(), 0);
    }

    #[test]
    fn iteration_error_ends_the_iteration() {
        let mut chain = DotChain::new(5);
        let mut iter = chain.iter();
        assert!(matches!(iter.next(), Some(Err(_))));
        assert!(iter.next().is_none());
    }

    #[tokio::test]
    async fn awaiting_by_reference_keeps_the_chain() {
        let chain = DotChain::new("abc").attr("upper").call(());
        assert_eq!((&chain).await.expect("first"), Value::from("ABC"));
        assert_eq!(chain.await.expect("second"), Value::from("ABC"));
    }
}
