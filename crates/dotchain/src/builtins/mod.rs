//! Members available without any user-supplied context: methods on text,
//! sequences and records, plus the `builtins` fallback namespace searched
//! after every context.

use std::sync::OnceLock;

use crate::values::Value;

mod collections;
mod functions;
mod text;
mod util;

pub(crate) use collections::{record_member, sequence_member};
pub(crate) use text::text_member;
pub(crate) use util::iterable_items;

static BUILTINS: OnceLock<Value> = OnceLock::new();

/// The fallback namespace (`str`, `len`, `list`, `sorted`, ...).
pub fn builtins() -> Value {
    BUILTINS
        .get_or_init(|| functions::build_builtins_namespace().into_value())
        .clone()
}
