use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::R;
use crate::values::{BuiltinValue, CallArgs, Receiver, Resolve, Value};

/// A named bag of members, usable as a chain value or as a resolution
/// context.
///
/// Callables registered with [`Namespace::method`] or
/// [`Namespace::class_method`] receive the namespace they were resolved from
/// as their first positional argument; [`Namespace::function`] callables do
/// not.
///
/// ```
/// use dotchain::{CallArgs, Namespace, Value};
///
/// let ops = Namespace::new("Ops")
///     .function("double", |args: CallArgs| {
///         let n = args.positional()[0].as_int().unwrap_or(0);
///         Ok(Value::Int(n * 2))
///     })
///     .into_value();
/// assert!(ops.member("double").is_some());
/// ```
#[derive(Clone)]
pub struct Namespace {
    name: String,
    members: HashMap<String, Value>,
    entries: HashMap<String, Value>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    pub fn function(
        self,
        name: impl Into<String>,
        func: impl Fn(CallArgs) -> R + Send + Sync + 'static,
    ) -> Self {
        self.register(name.into(), Receiver::None, func)
    }

    pub fn method(
        self,
        name: impl Into<String>,
        func: impl Fn(CallArgs) -> R + Send + Sync + 'static,
    ) -> Self {
        self.register(name.into(), Receiver::Instance, func)
    }

    pub fn class_method(
        self,
        name: impl Into<String>,
        func: impl Fn(CallArgs) -> R + Send + Sync + 'static,
    ) -> Self {
        self.register(name.into(), Receiver::Class, func)
    }

    pub fn async_function<F, Fut>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let name = name.into();
        let builtin = BuiltinValue::new_async(name.clone(), Receiver::None, func);
        self.members.insert(name, Value::Builtin(builtin));
        self
    }

    /// Adds a key-lookup entry. Entries are invisible to member access and
    /// only found when the namespace acts as a context.
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }

    fn register(
        mut self,
        name: String,
        receiver: Receiver,
        func: impl Fn(CallArgs) -> R + Send + Sync + 'static,
    ) -> Self {
        let builtin = BuiltinValue::new(name.clone(), receiver, func);
        self.members.insert(name, Value::Builtin(builtin));
        self
    }
}

impl Resolve for Namespace {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn member(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }

    fn key(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }
}
