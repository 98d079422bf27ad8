use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ChainError, R};
use crate::values::{BuiltinValue, CallArgs, Receiver, Value};

pub(crate) fn builtin(
    name: &str,
    func: impl Fn(CallArgs) -> R + Send + Sync + 'static,
) -> BuiltinValue {
    BuiltinValue::new(name, Receiver::None, func)
}

/// Shared method table: one `BuiltinImpl` per name, bound to a receiver on
/// every lookup.
pub(super) fn method_table(methods: Vec<BuiltinValue>) -> HashMap<String, BuiltinValue> {
    methods
        .into_iter()
        .map(|method| (method.name().to_string(), method))
        .collect()
}

pub(super) fn list_value(items: Vec<Value>) -> Value {
    Value::List(Arc::new(items))
}

pub(super) fn expect_text<'a>(value: &'a Value, ctx: &str) -> Result<&'a str, ChainError> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(ChainError::Message(format!(
            "{ctx} expects str, got {}",
            other.type_name()
        ))),
    }
}

pub(super) fn expect_int(value: &Value, ctx: &str) -> Result<i64, ChainError> {
    match value {
        Value::Int(value) => Ok(*value),
        Value::Bool(value) => Ok(i64::from(*value)),
        other => Err(ChainError::Message(format!(
            "{ctx} expects int, got {}",
            other.type_name()
        ))),
    }
}

pub(super) fn expect_char(value: &Value, ctx: &str) -> Result<char, ChainError> {
    let text = expect_text(value, ctx)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(ChainError::Message(format!(
            "{ctx} fill character must be exactly one character long"
        ))),
    }
}

/// The bound receiver of a value method.
pub(super) fn receiver<'a>(args: &'a CallArgs, ctx: &str) -> Result<&'a Value, ChainError> {
    args.positional()
        .first()
        .ok_or_else(|| ChainError::Message(format!("{ctx} called without a receiver")))
}

/// Materializes anything iterable. Lazy iterators are drained.
pub(crate) fn iterable_items(value: &Value) -> Result<Vec<Value>, ChainError> {
    match value {
        Value::List(items) => Ok(items.as_ref().clone()),
        Value::Tuple(items) => Ok(items.clone()),
        Value::Text(text) => Ok(text.chars().map(|ch| Value::Text(ch.to_string())).collect()),
        Value::Record(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            Ok(keys.into_iter().map(|key| Value::Text(key.clone())).collect())
        }
        Value::Iter(iter) => iter.drain(),
        other => Err(ChainError::NotIterable(other.type_name().to_string())),
    }
}

/// Applies a predicate; `Unit` means "use the item's truthiness".
pub(super) fn test_predicate(pred: &Value, item: &Value) -> Result<bool, ChainError> {
    if pred.is_unit() {
        return Ok(item.truthy());
    }
    Ok(pred.call(CallArgs::from(vec![item.clone()]))?.truthy())
}

pub(super) fn compare_values(left: &Value, right: &Value) -> Result<Ordering, ChainError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => Some(compare_sequences(a, b)?),
        (Value::Tuple(a), Value::Tuple(b)) => Some(compare_sequences(a, b)?),
        _ => None,
    };
    ordering.ok_or_else(|| {
        ChainError::Message(format!(
            "'<' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn compare_sequences(left: &[Value], right: &[Value]) -> Result<Ordering, ChainError> {
    for (a, b) in left.iter().zip(right.iter()) {
        let ordering = compare_values(a, b)?;
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(left.len().cmp(&right.len()))
}
