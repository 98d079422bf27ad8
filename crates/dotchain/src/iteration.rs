//! Iteration state held by a [`DotChain`](crate::DotChain) between
//! `next_item` calls.

use crate::builtins::iterable_items;
use crate::error::{ChainError, R};
use crate::values::{IterValue, StreamValue, Value};

#[derive(Default)]
pub(crate) enum Iteration {
    #[default]
    NotStarted,
    Sync(Cursor),
    Async(AsyncCursor),
    Done,
}

impl Iteration {
    pub(crate) fn restart(&mut self) {
        if !matches!(self, Iteration::NotStarted) {
            tracing::trace!("restarting iteration");
        }
        *self = Iteration::NotStarted;
    }
}

pub(crate) enum Cursor {
    Items { items: Vec<Value>, next: usize },
    Lazy(IterValue),
}

impl Cursor {
    /// Lazy sequences are consumed item by item; every other iterable is
    /// materialized up front.
    pub(crate) fn from_value(value: Value) -> Result<Self, ChainError> {
        match value {
            Value::Iter(iter) => Ok(Cursor::Lazy(iter)),
            Value::Stream(_) => Err(ChainError::message(
                "an async stream cannot be iterated synchronously",
            )),
            other => Ok(Cursor::Items {
                items: iterable_items(&other)?,
                next: 0,
            }),
        }
    }

    pub(crate) fn next_item(&mut self) -> Option<R> {
        match self {
            Cursor::Items { items, next } => {
                let item = items.get(*next).cloned()?;
                *next += 1;
                Some(Ok(item))
            }
            Cursor::Lazy(iter) => iter.next_item(),
        }
    }
}

pub(crate) enum AsyncCursor {
    Sync(Cursor),
    Stream(StreamValue),
}

impl AsyncCursor {
    pub(crate) fn from_value(value: Value) -> Result<Self, ChainError> {
        match value {
            Value::Stream(stream) => Ok(AsyncCursor::Stream(stream)),
            other => Cursor::from_value(other).map(AsyncCursor::Sync),
        }
    }

    pub(crate) async fn next_item(&mut self) -> Option<R> {
        match self {
            AsyncCursor::Sync(cursor) => cursor.next_item(),
            AsyncCursor::Stream(stream) => stream.next_item().await,
        }
    }
}
