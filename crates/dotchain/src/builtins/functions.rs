use std::cmp::Ordering;

use super::util::{
    builtin, compare_values, expect_int, iterable_items, list_value, test_predicate,
};
use crate::error::{ChainError, R};
use crate::namespace::Namespace;
use crate::values::{BuiltinValue, CallArgs, IterValue, Value, format_value, repr_value};

pub(super) fn build_builtins_namespace() -> Namespace {
    let functions: Vec<BuiltinValue> = vec![
        builtin("str", |args| {
            Ok(Value::Text(
                args.get(0, "object").map(format_value).unwrap_or_default(),
            ))
        }),
        builtin("repr", |args| {
            Ok(Value::Text(repr_value(args.require(0, "object", "repr")?)))
        }),
        builtin("int", |args| to_int(args.get(0, "x").unwrap_or(&Value::Int(0)))),
        builtin("float", |args| {
            to_float(args.get(0, "x").unwrap_or(&Value::Float(0.0)))
        }),
        builtin("bool", |args| {
            Ok(Value::Bool(args.get(0, "x").is_some_and(Value::truthy)))
        }),
        builtin("len", |args| length(args.require(0, "obj", "len")?)),
        builtin("list", |args| {
            let items = match args.get(0, "iterable") {
                Some(value) => iterable_items(value)?,
                None => Vec::new(),
            };
            Ok(list_value(items))
        }),
        builtin("tuple", |args| {
            let items = match args.get(0, "iterable") {
                Some(value) => iterable_items(value)?,
                None => Vec::new(),
            };
            Ok(Value::Tuple(items))
        }),
        builtin("sorted", |args| {
            let mut items = iterable_items(args.require(0, "iterable", "sorted")?)?;
            sort_values(&mut items)?;
            if args.get(1, "reverse").is_some_and(Value::truthy) {
                items.reverse();
            }
            Ok(list_value(items))
        }),
        builtin("reversed", |args| {
            let mut items = iterable_items(args.require(0, "sequence", "reversed")?)?;
            items.reverse();
            Ok(Value::Iter(IterValue::from_values(items)))
        }),
        builtin("sum", |args| {
            let items = iterable_items(args.require(0, "iterable", "sum")?)?;
            let start = args.get(1, "start").cloned().unwrap_or(Value::Int(0));
            items.into_iter().try_fold(start, add_numbers)
        }),
        builtin("min", |args| extreme(&args, "min", Ordering::Less)),
        builtin("max", |args| extreme(&args, "max", Ordering::Greater)),
        builtin("abs", |args| match args.require(0, "x", "abs")? {
            Value::Int(value) => value
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| ChainError::message("integer overflow in abs()")),
            Value::Float(value) => Ok(Value::Float(value.abs())),
            other => Err(ChainError::Message(format!(
                "bad operand type for abs(): '{}'",
                other.type_name()
            ))),
        }),
        builtin("range", |args| {
            let bounds = args
                .positional()
                .iter()
                .map(|value| expect_int(value, "range"))
                .collect::<Result<Vec<_>, _>>()?;
            let (start, stop, step) = match bounds.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => return Err(ChainError::message("range expects 1 to 3 integer arguments")),
            };
            if step == 0 {
                return Err(ChainError::message("range() arg 3 must not be zero"));
            }
            let iter = std::iter::successors(Some(start), move |current| current.checked_add(step))
                .take_while(move |current| {
                    if step > 0 {
                        *current < stop
                    } else {
                        *current > stop
                    }
                })
                .map(|current| Ok(Value::Int(current)));
            Ok(Value::Iter(IterValue::new(iter)))
        }),
        builtin("filter", |args| {
            let pred = args.require(0, "function", "filter")?.clone();
            let items = iterable_items(args.require(1, "iterable", "filter")?)?;
            let iter = items.into_iter().filter_map(move |item| {
                match test_predicate(&pred, &item) {
                    Ok(true) => Some(Ok(item)),
                    Ok(false) => None,
                    Err(err) => Some(Err(err)),
                }
            });
            Ok(Value::Iter(IterValue::new(iter)))
        }),
        builtin("map", |args| {
            let func = args.require(0, "function", "map")?.clone();
            let items = iterable_items(args.require(1, "iterable", "map")?)?;
            let iter = items
                .into_iter()
                .map(move |item| func.call(CallArgs::from(vec![item])));
            Ok(Value::Iter(IterValue::new(iter)))
        }),
        builtin("any", |args| {
            let items = iterable_items(args.require(0, "iterable", "any")?)?;
            Ok(Value::Bool(items.iter().any(Value::truthy)))
        }),
        builtin("all", |args| {
            let items = iterable_items(args.require(0, "iterable", "all")?)?;
            Ok(Value::Bool(items.iter().all(Value::truthy)))
        }),
        builtin("next", |args| {
            let Value::Iter(iter) = args.require(0, "iterator", "next")? else {
                return Err(ChainError::Message(format!(
                    "'{}' object is not an iterator",
                    args.positional()
                        .first()
                        .map(Value::type_name)
                        .unwrap_or("unit")
                )));
            };
            match iter.next_item() {
                Some(item) => item,
                None => args
                    .get(1, "default")
                    .cloned()
                    .ok_or_else(|| ChainError::message("StopIteration")),
            }
        }),
    ];
    functions
        .into_iter()
        .fold(Namespace::new("builtins"), |namespace, function| {
            namespace.value(function.name().to_string(), function)
        })
}

fn to_int(value: &Value) -> R {
    match value {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Bool(value) => Ok(Value::Int(i64::from(*value))),
        Value::Float(value) if value.is_nan() => {
            Err(ChainError::message("cannot convert float NaN to integer"))
        }
        Value::Float(value) if value.is_infinite() => {
            Err(ChainError::message("cannot convert float infinity to integer"))
        }
        // `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
        Value::Float(value) if *value >= i64::MIN as f64 && *value < i64::MAX as f64 => {
            Ok(Value::Int(value.trunc() as i64))
        }
        Value::Float(value) => Err(ChainError::Message(format!(
            "int() argument out of range: {}",
            format_value(&Value::Float(*value))
        ))),
        Value::Text(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            ChainError::Message(format!(
                "invalid literal for int() with base 10: {}",
                repr_value(value)
            ))
        }),
        other => Err(ChainError::Message(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> R {
    match value {
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Int(value) => Ok(Value::Float(*value as f64)),
        Value::Bool(value) => Ok(Value::Float(if *value { 1.0 } else { 0.0 })),
        Value::Text(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            ChainError::Message(format!(
                "could not convert string to float: {}",
                repr_value(value)
            ))
        }),
        other => Err(ChainError::Message(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn length(value: &Value) -> R {
    let len = match value {
        Value::Text(text) => text.chars().count(),
        Value::List(items) => items.len(),
        Value::Tuple(items) => items.len(),
        Value::Record(fields) => fields.len(),
        other => {
            return Err(ChainError::Message(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(len as i64))
}

fn add_numbers(acc: Value, item: Value) -> R {
    match (&acc, &item) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| ChainError::message("integer overflow in sum()")),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        _ => Err(ChainError::Message(format!(
            "unsupported operand type(s) for +: '{}' and '{}'",
            acc.type_name(),
            item.type_name()
        ))),
    }
}

fn sort_values(items: &mut [Value]) -> Result<(), ChainError> {
    let mut failure = None;
    items.sort_by(|a, b| {
        compare_values(a, b).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// `min`/`max` over either one iterable argument or several positional ones.
fn extreme(args: &CallArgs, ctx: &str, wanted: Ordering) -> R {
    let items = match args.positional() {
        [single] => iterable_items(single)?,
        many => many.to_vec(),
    };
    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| ChainError::Message(format!("{ctx}() arg is an empty sequence")))?;
    for item in iter {
        if compare_values(&item, &best)? == wanted {
            best = item;
        }
    }
    Ok(best)
}
