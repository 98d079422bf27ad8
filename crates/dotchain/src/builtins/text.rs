use std::collections::HashMap;
use std::sync::OnceLock;

use super::util::{
    builtin, expect_char, expect_int, expect_text, iterable_items, list_value, method_table,
    receiver,
};
use crate::error::ChainError;
use crate::values::{BuiltinValue, CallArgs, Value, format_value};

static TEXT_METHODS: OnceLock<HashMap<String, BuiltinValue>> = OnceLock::new();

pub(crate) fn text_member(text: &str, name: &str) -> Option<Value> {
    TEXT_METHODS
        .get_or_init(build_text_methods)
        .get(name)
        .map(|method| Value::Builtin(method.bind(Value::Text(text.to_string()))))
}

fn this<'a>(args: &'a CallArgs, ctx: &str) -> Result<&'a str, ChainError> {
    expect_text(receiver(args, ctx)?, ctx)
}

/// Optional text argument after the receiver; `Unit` counts as absent.
fn optional_text<'a>(
    args: &'a CallArgs,
    index: usize,
    name: &str,
    ctx: &str,
) -> Result<Option<&'a str>, ChainError> {
    match args.get(index, name) {
        None | Some(Value::Unit) => Ok(None),
        Some(value) => expect_text(value, ctx).map(Some),
    }
}

fn pad(args: &CallArgs, ctx: &str, left: bool) -> Result<Value, ChainError> {
    let text = this(args, ctx)?;
    let width = expect_int(args.require(1, "width", ctx)?, ctx)?;
    let fill = match args.get(2, "fillchar") {
        Some(value) => expect_char(value, ctx)?,
        None => ' ',
    };
    let len = text.chars().count() as i64;
    if width <= len {
        return Ok(Value::Text(text.to_string()));
    }
    let count = usize::try_from(width - len).unwrap_or(usize::MAX);
    let mut padding = String::new();
    count
        .checked_mul(fill.len_utf8())
        .and_then(|bytes| padding.try_reserve(bytes).ok())
        .ok_or_else(|| ChainError::Message(format!("{ctx}: width {width} is too large")))?;
    padding.extend(std::iter::repeat_n(fill, count));
    Ok(Value::Text(if left {
        format!("{padding}{text}")
    } else {
        format!("{text}{padding}")
    }))
}

fn strip_with(
    args: &CallArgs,
    ctx: &str,
    strip: fn(&str, &dyn Fn(char) -> bool) -> String,
) -> Result<Value, ChainError> {
    let text = this(args, ctx)?;
    let chars = optional_text(args, 1, "chars", ctx)?;
    let stripped = match chars {
        Some(chars) => strip(text, &|ch| chars.contains(ch)),
        None => strip(text, &char::is_whitespace),
    };
    Ok(Value::Text(stripped))
}

fn split(args: &CallArgs) -> Result<Value, ChainError> {
    let text = this(args, "split")?;
    let sep = optional_text(args, 1, "sep", "split")?;
    let maxsplit = match args.get(2, "maxsplit") {
        Some(value) => expect_int(value, "split")?,
        None => -1,
    };
    let parts: Vec<String> = match (sep, maxsplit) {
        (Some(""), _) => return Err(ChainError::message("split: empty separator")),
        (Some(sep), n) if n >= 0 => text.splitn(n as usize + 1, sep).map(str::to_string).collect(),
        (Some(sep), _) => text.split(sep).map(str::to_string).collect(),
        (None, n) if n >= 0 => {
            let mut parts = Vec::new();
            let mut rest = text.trim_start();
            while !rest.is_empty() && (parts.len() as i64) < n {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            if !rest.is_empty() {
                parts.push(rest.to_string());
            }
            parts
        }
        (None, _) => text.split_whitespace().map(str::to_string).collect(),
    };
    Ok(list_value(parts.into_iter().map(Value::Text).collect()))
}

fn build_text_methods() -> HashMap<String, BuiltinValue> {
    method_table(vec![
        builtin("upper", |args| {
            Ok(Value::Text(this(&args, "upper")?.to_uppercase()))
        }),
        builtin("lower", |args| {
            Ok(Value::Text(this(&args, "lower")?.to_lowercase()))
        }),
        builtin("strip", |args| {
            strip_with(&args, "strip", |text, pred| {
                text.trim_matches(|ch| pred(ch)).to_string()
            })
        }),
        builtin("lstrip", |args| {
            strip_with(&args, "lstrip", |text, pred| {
                text.trim_start_matches(|ch| pred(ch)).to_string()
            })
        }),
        builtin("rstrip", |args| {
            strip_with(&args, "rstrip", |text, pred| {
                text.trim_end_matches(|ch| pred(ch)).to_string()
            })
        }),
        builtin("split", |args| split(&args)),
        builtin("join", |args| {
            let sep = this(&args, "join")?;
            let items = iterable_items(args.require(1, "iterable", "join")?)?;
            let parts = items
                .iter()
                .map(|item| expect_text(item, "join").map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Text(parts.join(sep)))
        }),
        builtin("replace", |args| {
            let text = this(&args, "replace")?;
            let old = expect_text(args.require(1, "old", "replace")?, "replace")?;
            let new = expect_text(args.require(2, "new", "replace")?, "replace")?;
            Ok(Value::Text(text.replace(old, new)))
        }),
        builtin("startswith", |args| {
            let text = this(&args, "startswith")?;
            let prefix = expect_text(args.require(1, "prefix", "startswith")?, "startswith")?;
            Ok(Value::Bool(text.starts_with(prefix)))
        }),
        builtin("endswith", |args| {
            let text = this(&args, "endswith")?;
            let suffix = expect_text(args.require(1, "suffix", "endswith")?, "endswith")?;
            Ok(Value::Bool(text.ends_with(suffix)))
        }),
        builtin("rjust", |args| pad(&args, "rjust", true)),
        builtin("ljust", |args| pad(&args, "ljust", false)),
        builtin("find", |args| {
            let text = this(&args, "find")?;
            let sub = expect_text(args.require(1, "sub", "find")?, "find")?;
            Ok(Value::Int(match text.find(sub) {
                Some(byte) => text[..byte].chars().count() as i64,
                None => -1,
            }))
        }),
        builtin("count", |args| {
            let text = this(&args, "count")?;
            let sub = expect_text(args.require(1, "sub", "count")?, "count")?;
            let count = if sub.is_empty() {
                text.chars().count() + 1
            } else {
                text.matches(sub).count()
            };
            Ok(Value::Int(count as i64))
        }),
        builtin("format", |args| {
            // Positional `{}` placeholders only.
            let template = this(&args, "format")?;
            let mut values = args.positional().iter().skip(1);
            let mut out = String::with_capacity(template.len());
            let mut pieces = template.split("{}").peekable();
            while let Some(piece) = pieces.next() {
                out.push_str(piece);
                if pieces.peek().is_some() {
                    let value = values.next().ok_or_else(|| {
                        ChainError::message("format: not enough arguments for template")
                    })?;
                    out.push_str(&format_value(value));
                }
            }
            Ok(Value::Text(out))
        }),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn call(text: &str, name: &str, args: CallArgs) -> Value {
        text_member(text, name)
            .expect("member")
            .call(args)
            .expect("call")
    }

    #[test]
    fn padding_uses_fill_character() {
        let args = CallArgs::new().arg(2).arg("_");
        assert_eq!(call("0", "rjust", args.clone()), Value::from("_0"));
        assert_eq!(call("0", "ljust", args), Value::from("0_"));
        assert_eq!(call("long", "rjust", CallArgs::new().arg(2)), Value::from("long"));
    }

    #[test]
    fn oversized_padding_is_an_error() {
        let err = text_member("0", "rjust")
            .expect("rjust")
            .call(CallArgs::new().arg(i64::MAX))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("rjust: width {} is too large", i64::MAX)
        );
    }

    #[test]
    fn split_with_and_without_separator() {
        assert_eq!(
            call("0,1,2", "split", CallArgs::new().arg(",")),
            Value::list(["0", "1", "2"].map(Value::from))
        );
        assert_eq!(
            call("  a b\tc ", "split", CallArgs::new()),
            Value::list(["a", "b", "c"].map(Value::from))
        );
        assert_eq!(
            call("a,b,c", "split", CallArgs::new().arg(",").kwarg("maxsplit", 1)),
            Value::list(["a", "b,c"].map(Value::from))
        );
    }

    #[test]
    fn join_requires_text_items() {
        let items = Value::list(["a", "b"].map(Value::from));
        assert_eq!(call("-", "join", CallArgs::new().arg(items)), Value::from("a-b"));
        let err = text_member("-", "join")
            .expect("join")
            .call(CallArgs::new().arg(Value::list([Value::Int(1)])))
            .unwrap_err();
        assert!(err.to_string().contains("expects str"));
    }

    #[test]
    fn strip_family() {
        assert_eq!(call("  x  ", "strip", CallArgs::new()), Value::from("x"));
        assert_eq!(call("xxaxx", "lstrip", CallArgs::new().arg("x")), Value::from("axx"));
        assert_eq!(call("xxaxx", "rstrip", CallArgs::new().arg("x")), Value::from("xxa"));
    }

    #[test]
    fn format_fills_placeholders() {
        assert_eq!(
            call("{}-{}", "format", CallArgs::new().arg(1).arg("b")),
            Value::from("1-b")
        );
    }

    #[test]
    fn unknown_method_is_absent() {
        assert!(text_member("x", "nope").is_none());
    }
}
