#![allow(dead_code, clippy::unwrap_used)]

use dotchain::{
    BuiltinValue, CallArgs, ChainError, DotChain, IterValue, Namespace, R, Receiver, Resolve,
    StreamValue, Value, ok,
};

/// Host object with a property, plain/async methods and both generator
/// flavours.
pub struct Sample {
    pub prop_value: Value,
    pub meth_value: Value,
    pub generator_items: Vec<Value>,
}

impl Sample {
    pub fn new() -> Self {
        Self::with_values(Value::from("P"), Value::from("M"))
    }

    pub fn with_values(prop_value: Value, meth_value: Value) -> Self {
        Self {
            prop_value,
            meth_value,
            generator_items: ints([1, 2, 3]),
        }
    }

    pub fn into_value(self) -> Value {
        Value::object(self)
    }
}

impl Resolve for Sample {
    fn type_name(&self) -> &str {
        "Sample"
    }

    fn member(&self, name: &str) -> Option<Value> {
        let member = match name {
            "prop" => return Some(self.prop_value.clone()),
            "meth" => {
                let value = self.meth_value.clone();
                BuiltinValue::new("meth", Receiver::None, move |_| ok(value.clone()))
            }
            "arg_meth" => BuiltinValue::new("arg_meth", Receiver::None, |args| Ok(echo(args))),
            "async_arg_meth" => {
                BuiltinValue::new_async("async_arg_meth", Receiver::None, |args| async move {
                    tokio::task::yield_now().await;
                    Ok(echo(args))
                })
            }
            "args_meth" => BuiltinValue::new("args_meth", Receiver::None, |args| {
                args.require(0, "args", "args_meth").cloned()
            }),
            "kwargs_meth" => BuiltinValue::new("kwargs_meth", Receiver::None, |args| {
                args.require(0, "kwargs", "kwargs_meth").cloned()
            }),
            "explode" => BuiltinValue::new("explode", Receiver::None, |args| {
                let payload = args.get(0, "payload").cloned().unwrap_or(Value::from("boom"));
                Err(ChainError::Raised(payload))
            }),
            "generator" => {
                let defaults = self.generator_items.clone();
                BuiltinValue::new("generator", Receiver::None, move |args| {
                    let items = items_or(&args, &defaults);
                    Ok(Value::Iter(IterValue::from_values(items)))
                })
            }
            "async_generator" => {
                let defaults = self.generator_items.clone();
                BuiltinValue::new("async_generator", Receiver::None, move |args| {
                    let items = items_or(&args, &defaults);
                    Ok(Value::Stream(StreamValue::from_values(items)))
                })
            }
            _ => return None,
        };
        Some(Value::Builtin(member))
    }
}

fn items_or(args: &CallArgs, defaults: &[Value]) -> Vec<Value> {
    match args.get(0, "items") {
        Some(Value::List(items)) => items.as_ref().clone(),
        _ => defaults.to_vec(),
    }
}

/// `(args, kwargs)` as a tuple of a tuple and a record.
pub fn echo(args: CallArgs) -> Value {
    let (positional, named) = args.into_parts();
    Value::tuple([Value::tuple(positional), Value::record(named)])
}

pub fn ints<const N: usize>(values: [i64; N]) -> Vec<Value> {
    values.into_iter().map(Value::Int).collect()
}

pub fn int_list<const N: usize>(values: [i64; N]) -> Value {
    Value::list(ints(values))
}

/// Wraps a predicate on a single value as a callable.
pub fn pred(test: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Value {
    Value::Builtin(BuiltinValue::new("pred", Receiver::None, move |args| {
        Ok(Value::Bool(test(args.require(0, "item", "pred")?)))
    }))
}

fn items_of(value: &Value) -> Result<Vec<Value>, ChainError> {
    match value {
        Value::List(items) => Ok(items.as_ref().clone()),
        Value::Tuple(items) => Ok(items.clone()),
        other => Err(ChainError::NotIterable(other.type_name().to_string())),
    }
}

fn select(args: &CallArgs, offset: usize) -> R {
    let items = items_of(args.require(offset, "iterable", "select")?)?;
    let pred = args.get(offset + 1, "pred").filter(|value| !value.is_unit());
    let mut kept = Vec::new();
    for item in items {
        let keep = match pred {
            Some(pred) => pred.call(CallArgs::new().arg(item.clone()))?.truthy(),
            None => item.truthy(),
        };
        if keep {
            kept.push(item);
        }
    }
    Ok(if kept.is_empty() {
        Value::Unit
    } else {
        Value::list(kept)
    })
}

fn first(args: &CallArgs, offset: usize) -> R {
    let items = items_of(args.require(offset, "iterable", "first")?)?;
    Ok(items.into_iter().next().unwrap_or(Value::Unit))
}

fn last(args: &CallArgs, offset: usize) -> R {
    let items = items_of(args.require(offset, "iterable", "last")?)?;
    Ok(items.into_iter().next_back().unwrap_or(Value::Unit))
}

/// Context with `select`, `first` and `last` in three flavours: plain
/// functions, class-level (`_c`) and instance-level (`_i`) callables. The
/// latter two receive the context as their first argument.
pub fn list_ops() -> Value {
    Namespace::new("ListOps")
        .function("select", |args| select(&args, 0))
        .class_method("select_c", |args| select(&args, 1))
        .method("select_i", |args| select(&args, 1))
        .function("first", |args| first(&args, 0))
        .class_method("first_c", |args| first(&args, 1))
        .method("first_i", |args| first(&args, 1))
        .function("last", |args| last(&args, 0))
        .class_method("last_c", |args| last(&args, 1))
        .method("last_i", |args| last(&args, 1))
        .into_value()
}

/// Forces `chain` both ways and checks the results agree.
pub async fn both(chain: &DotChain) -> Value {
    let sync = chain.result().unwrap();
    let awaited = chain.await.unwrap();
    assert_eq!(sync, awaited, "sync and async replay of {chain} disagree");
    awaited
}
