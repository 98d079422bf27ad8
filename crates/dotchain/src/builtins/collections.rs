use std::collections::HashMap;
use std::sync::OnceLock;

use super::util::{builtin, list_value, method_table, receiver};
use crate::error::ChainError;
use crate::values::{BuiltinValue, CallArgs, Value, repr_value, values_equal};

static SEQUENCE_METHODS: OnceLock<HashMap<String, BuiltinValue>> = OnceLock::new();
static RECORD_METHODS: OnceLock<HashMap<String, BuiltinValue>> = OnceLock::new();

pub(crate) fn sequence_member(value: &Value, name: &str) -> Option<Value> {
    SEQUENCE_METHODS
        .get_or_init(build_sequence_methods)
        .get(name)
        .map(|method| Value::Builtin(method.bind(value.clone())))
}

pub(crate) fn record_member(value: &Value, name: &str) -> Option<Value> {
    RECORD_METHODS
        .get_or_init(build_record_methods)
        .get(name)
        .map(|method| Value::Builtin(method.bind(value.clone())))
}

fn sequence_items<'a>(args: &'a CallArgs, ctx: &str) -> Result<&'a [Value], ChainError> {
    match receiver(args, ctx)? {
        Value::List(items) => Ok(items.as_slice()),
        Value::Tuple(items) => Ok(items.as_slice()),
        other => Err(ChainError::Message(format!(
            "{ctx} expects a list or tuple, got {}",
            other.type_name()
        ))),
    }
}

fn record_entries(args: &CallArgs, ctx: &str) -> Result<Vec<(String, Value)>, ChainError> {
    match receiver(args, ctx)? {
        Value::Record(fields) => {
            let mut entries: Vec<(String, Value)> = fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(entries)
        }
        other => Err(ChainError::Message(format!(
            "{ctx} expects a record, got {}",
            other.type_name()
        ))),
    }
}

fn build_sequence_methods() -> HashMap<String, BuiltinValue> {
    method_table(vec![
        builtin("count", |args| {
            let items = sequence_items(&args, "count")?;
            let needle = args.require(1, "value", "count")?;
            let count = items.iter().filter(|item| values_equal(item, needle)).count();
            Ok(Value::Int(count as i64))
        }),
        builtin("index", |args| {
            let items = sequence_items(&args, "index")?;
            let needle = args.require(1, "value", "index")?;
            items
                .iter()
                .position(|item| values_equal(item, needle))
                .map(|idx| Value::Int(idx as i64))
                .ok_or_else(|| {
                    ChainError::Message(format!("{} is not in sequence", repr_value(needle)))
                })
        }),
    ])
}

fn build_record_methods() -> HashMap<String, BuiltinValue> {
    method_table(vec![
        builtin("keys", |args| {
            let entries = record_entries(&args, "keys")?;
            Ok(list_value(
                entries.into_iter().map(|(key, _)| Value::Text(key)).collect(),
            ))
        }),
        builtin("values", |args| {
            let entries = record_entries(&args, "values")?;
            Ok(list_value(entries.into_iter().map(|(_, value)| value).collect()))
        }),
        builtin("items", |args| {
            let entries = record_entries(&args, "items")?;
            Ok(list_value(
                entries
                    .into_iter()
                    .map(|(key, value)| Value::Tuple(vec![Value::Text(key), value]))
                    .collect(),
            ))
        }),
        builtin("get", |args| {
            let Value::Record(fields) = receiver(&args, "get")? else {
                return Err(ChainError::message("get expects a record"));
            };
            let key = args.require(1, "key", "get")?;
            let default = args.get(2, "default").cloned().unwrap_or(Value::Unit);
            Ok(key
                .as_text()
                .and_then(|key| fields.get(key).cloned())
                .unwrap_or(default))
        }),
    ])
}
