use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::{FutureExt, StreamExt};
use parking_lot::Mutex;

use crate::builtins;
use crate::error::{ChainError, R};

pub(crate) type SyncFunc = dyn Fn(CallArgs) -> R + Send + Sync;
pub(crate) type AsyncFunc = dyn Fn(CallArgs) -> BoxFuture<'static, R> + Send + Sync;

/// Whether a callable expects the object it was resolved from as its first
/// positional argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Receiver {
    #[default]
    None,
    Instance,
    Class,
}

impl Receiver {
    pub fn is_required(self) -> bool {
        !matches!(self, Receiver::None)
    }
}

pub(crate) enum BuiltinBody {
    Sync(Arc<SyncFunc>),
    Async(Arc<AsyncFunc>),
}

pub struct BuiltinImpl {
    pub(crate) name: String,
    pub(crate) receiver: Receiver,
    pub(crate) body: BuiltinBody,
}

/// A native callable, optionally with leading arguments already bound.
///
/// Bound methods on values (`"abc".upper`) are builtins whose receiver sits in
/// `bound`.
#[derive(Clone)]
pub struct BuiltinValue {
    pub(crate) imp: Arc<BuiltinImpl>,
    pub(crate) bound: Vec<Value>,
}

impl BuiltinValue {
    pub fn new(
        name: impl Into<String>,
        receiver: Receiver,
        func: impl Fn(CallArgs) -> R + Send + Sync + 'static,
    ) -> Self {
        Self {
            imp: Arc::new(BuiltinImpl {
                name: name.into(),
                receiver,
                body: BuiltinBody::Sync(Arc::new(func)),
            }),
            bound: Vec::new(),
        }
    }

    pub fn new_async<F, Fut>(name: impl Into<String>, receiver: Receiver, func: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self {
            imp: Arc::new(BuiltinImpl {
                name: name.into(),
                receiver,
                body: BuiltinBody::Async(Arc::new(move |args| func(args).boxed())),
            }),
            bound: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.imp.name
    }

    pub fn receiver(&self) -> Receiver {
        self.imp.receiver
    }

    pub fn is_async(&self) -> bool {
        matches!(self.imp.body, BuiltinBody::Async(_))
    }

    /// Returns a copy with `value` appended to the bound leading arguments.
    pub fn bind(&self, value: Value) -> Self {
        let mut bound = self.bound.clone();
        bound.push(value);
        Self {
            imp: self.imp.clone(),
            bound,
        }
    }

    /// Invokes the callable. An async body is not driven here: its pending
    /// work comes back as a [`Value::Future`].
    pub fn call(&self, mut args: CallArgs) -> R {
        for value in self.bound.iter().rev() {
            args.prepend(value.clone());
        }
        match &self.imp.body {
            BuiltinBody::Sync(func) => func(args),
            BuiltinBody::Async(func) => Ok(Value::Future(FutureValue::from_boxed(func(args)))),
        }
    }

    pub(crate) fn ptr_eq(&self, other: &BuiltinValue) -> bool {
        Arc::ptr_eq(&self.imp, &other.imp)
            && self.bound.len() == other.bound.len()
            && self
                .bound
                .iter()
                .zip(other.bound.iter())
                .all(|(a, b)| values_equal(a, b))
    }
}

/// Positional and named arguments of one call.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub(crate) fn prepend(&mut self, value: Value) {
        self.positional.insert(0, value);
    }

    /// Looks an argument up by position first, then by keyword.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.named.get(name))
    }

    pub fn require(&self, index: usize, name: &str, ctx: &str) -> Result<&Value, ChainError> {
        self.get(index, name).ok_or_else(|| {
            ChainError::Message(format!("{ctx}() missing required argument '{name}'"))
        })
    }

    pub fn into_parts(self) -> (Vec<Value>, BTreeMap<String, Value>) {
        (self.positional, self.named)
    }
}

impl From<()> for CallArgs {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: BTreeMap::new(),
        }
    }
}

/// Member lookup capability for host objects used as chain values or
/// contexts.
pub trait Resolve: Send + Sync {
    fn type_name(&self) -> &str;

    /// Returns the member called `name`, if the object exposes one.
    fn member(&self, name: &str) -> Option<Value>;

    /// Key lookup for container-like objects. Consulted only during context
    /// resolution, after `member` came up empty.
    fn key(&self, _name: &str) -> Option<Value> {
        None
    }
}

type BoxIter = Box<dyn Iterator<Item = R> + Send>;

/// Single-pass lazy sequence.
#[derive(Clone)]
pub struct IterValue {
    inner: Arc<Mutex<BoxIter>>,
}

impl IterValue {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = R> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(iter))),
        }
    }

    pub fn from_values<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::new(items.into_iter().map(Ok))
    }

    pub fn next_item(&self) -> Option<R> {
        self.inner.lock().next()
    }

    /// Drains the remaining items.
    pub fn drain(&self) -> Result<Vec<Value>, ChainError> {
        let mut guard = self.inner.lock();
        guard.by_ref().collect()
    }

    pub(crate) fn ptr_eq(&self, other: &IterValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Asynchronous single-pass sequence.
#[derive(Clone)]
pub struct StreamValue {
    inner: Arc<tokio::sync::Mutex<BoxStream<'static, R>>>,
}

impl StreamValue {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = R> + Send + 'static,
    {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(stream.boxed())),
        }
    }

    pub fn from_values<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(items.into_iter().map(Ok)))
    }

    pub async fn next_item(&self) -> Option<R> {
        self.inner.lock().await.next().await
    }

    pub(crate) fn ptr_eq(&self, other: &StreamValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Pending asynchronous result. Can be awaited exactly once.
#[derive(Clone)]
pub struct FutureValue {
    inner: Arc<Mutex<Option<BoxFuture<'static, R>>>>,
}

impl FutureValue {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = R> + Send + 'static,
    {
        Self::from_boxed(future.boxed())
    }

    fn from_boxed(future: BoxFuture<'static, R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(future))),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub async fn resolve(&self) -> R {
        let future = self.inner.lock().take();
        match future {
            Some(future) => future.await,
            None => Err(ChainError::AlreadyAwaited),
        }
    }

    pub(crate) fn ptr_eq(&self, other: &FutureValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Arc<Vec<Value>>),
    Tuple(Vec<Value>),
    Record(Arc<HashMap<String, Value>>),
    Builtin(BuiltinValue),
    Object(Arc<dyn Resolve>),
    Iter(IterValue),
    Stream(StreamValue),
    Future(FutureValue),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Tuple(v) => f.debug_tuple("Tuple").field(v).finish(),
            Value::Record(v) => f.debug_tuple("Record").field(v).finish(),
            Value::Builtin(b) => write!(f, "Builtin({})", b.imp.name),
            Value::Object(o) => write!(f, "Object({})", o.type_name()),
            Value::Iter(_) => write!(f, "Iter(<lazy>)"),
            Value::Stream(_) => write!(f, "Stream(<async>)"),
            Value::Future(_) => write!(f, "Future(<pending>)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

impl Value {
    pub fn object(object: impl Resolve + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Record(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Record(_) => "record",
            Value::Builtin(_) => "builtin",
            Value::Object(object) => object.type_name(),
            Value::Iter(_) => "iterator",
            Value::Stream(_) => "stream",
            Value::Future(_) => "future",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Builtin(_))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Text(text) => !text.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Record(fields) => !fields.is_empty(),
            _ => true,
        }
    }

    /// Member lookup on the value itself: bound methods for text and
    /// sequences, fields then methods for records, `Resolve::member` for
    /// objects.
    pub fn member(&self, name: &str) -> Option<Value> {
        match self {
            Value::Text(text) => builtins::text_member(text, name),
            Value::List(_) | Value::Tuple(_) => builtins::sequence_member(self, name),
            Value::Record(fields) => fields
                .get(name)
                .cloned()
                .or_else(|| builtins::record_member(self, name)),
            Value::Object(object) => object.member(name),
            _ => None,
        }
    }

    /// Key lookup used when the value serves as a context.
    pub fn key(&self, name: &str) -> Option<Value> {
        match self {
            Value::Record(fields) => fields.get(name).cloned(),
            Value::Object(object) => object.key(name),
            _ => None,
        }
    }

    pub fn call(&self, args: CallArgs) -> R {
        match self {
            Value::Builtin(builtin) => builtin.call(args),
            other => Err(ChainError::NotCallable(other.type_name().to_string())),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ChainError> {
        Ok(match self {
            Value::Unit => serde_json::Value::Null,
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .ok_or_else(|| ChainError::message(format!("{value} has no JSON form")))?,
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_, _>>()?,
            ),
            Value::Tuple(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_, _>>()?,
            ),
            Value::Record(fields) => {
                let mut map = serde_json::Map::new();
                for (key, value) in fields.iter() {
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            other => {
                return Err(ChainError::message(format!(
                    "{} has no JSON form",
                    other.type_name()
                )))
            }
        })
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(fields: HashMap<String, Value>) -> Self {
        Value::Record(Arc::new(fields))
    }
}

impl From<BuiltinValue> for Value {
    fn from(builtin: BuiltinValue) -> Self {
        Value::Builtin(builtin)
    }
}

impl From<IterValue> for Value {
    fn from(iter: IterValue) -> Self {
        Value::Iter(iter)
    }
}

impl From<StreamValue> for Value {
    fn from(stream: StreamValue) -> Self {
        Value::Stream(stream)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Unit, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Unit,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Int(value),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(text) => Value::Text(text),
            serde_json::Value::Array(items) => {
                Value::List(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(fields) => Value::Record(Arc::new(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            )),
        }
    }
}

pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Unit, Value::Unit) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Record(a), Value::Record(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key)
                        .map(|other| values_equal(value, other))
                        .unwrap_or(false)
                })
        }
        (Value::Builtin(a), Value::Builtin(b)) => a.ptr_eq(b),
        // Objects compare by identity: thin-pointer equality ignores vtables.
        (Value::Object(a), Value::Object(b)) => {
            std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
        }
        (Value::Iter(a), Value::Iter(b)) => a.ptr_eq(b),
        (Value::Stream(a), Value::Stream(b)) => a.ptr_eq(b),
        (Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
        _ => false,
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// `str`-style rendering: text is printed bare, containers render their items
/// with [`repr_value`].
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Unit => "Unit".to_string(),
        Value::Bool(value) => {
            if *value {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        Value::Int(value) => value.to_string(),
        Value::Float(value) => format_float(*value),
        Value::Text(value) => value.clone(),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(repr_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Tuple(items) if items.len() == 1 => format!("({},)", repr_value(&items[0])),
        Value::Tuple(items) => format!(
            "({})",
            items.iter().map(repr_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Record(fields) => {
            let mut entries: Vec<_> = fields.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            format!(
                "{{{}}}",
                entries
                    .into_iter()
                    .map(|(key, value)| format!("{key}: {}", repr_value(value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
        Value::Builtin(builtin) => format!("<builtin:{}>", builtin.imp.name),
        Value::Object(object) => format!("<object:{}>", object.type_name()),
        Value::Iter(_) => "<iterator>".to_string(),
        Value::Stream(_) => "<stream>".to_string(),
        Value::Future(_) => "<future>".to_string(),
    }
}

/// `repr`-style rendering: like [`format_value`] but text is quoted.
pub fn repr_value(value: &Value) -> String {
    match value {
        Value::Text(text) => {
            let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
            format!("'{escaped}'")
        }
        other => format_value(other),
    }
}
