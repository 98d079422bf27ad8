use std::fmt;
use std::sync::Arc;

use crate::values::{CallArgs, Value, format_value, repr_value, values_equal};

/// Insertion-ordered set of resolution contexts. `Unit` is never stored.
#[derive(Clone, Debug, Default)]
pub struct Contexts(Vec<Value>);

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` unless it is `Unit` or already present. Returns whether
    /// the set changed.
    pub fn insert(&mut self, value: Value) -> bool {
        if value.is_unit() || self.0.iter().any(|known| values_equal(known, &value)) {
            return false;
        }
        self.0.push(value);
        true
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.insert(value);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }
}

impl FromIterator<Value> for Contexts {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut contexts = Contexts::new();
        contexts.extend(iter);
        contexts
    }
}

/// The member named by a member-access step.
#[derive(Clone, Debug)]
pub enum Member {
    Name(String),
    /// A callable spliced in directly, bypassing name resolution.
    Callable(Value),
}

#[derive(Clone, Debug)]
pub enum Step {
    Root(Value),
    Member(Member),
    Call(CallArgs),
}

/// One recorded step of a chain. Immutable once built; shared by every chain
/// extended from it.
#[derive(Debug)]
pub struct Link {
    step: Step,
    parent: Option<Arc<Link>>,
    contexts: Contexts,
    pipe: bool,
}

impl Link {
    pub fn root(data: Value, contexts: Contexts, pipe: bool) -> Arc<Self> {
        Arc::new(Self {
            step: Step::Root(data),
            parent: None,
            contexts,
            pipe,
        })
    }

    pub fn member(parent: &Arc<Link>, member: Member, contexts: Contexts, pipe: bool) -> Arc<Self> {
        Arc::new(Self {
            step: Step::Member(member),
            parent: Some(parent.clone()),
            contexts,
            pipe,
        })
    }

    pub fn call(parent: &Arc<Link>, args: CallArgs, contexts: Contexts, pipe: bool) -> Arc<Self> {
        Arc::new(Self {
            step: Step::Call(args),
            parent: Some(parent.clone()),
            contexts,
            pipe,
        })
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn parent(&self) -> Option<&Arc<Link>> {
        self.parent.as_ref()
    }

    /// Contexts in effect when this step was recorded.
    pub fn contexts(&self) -> &Contexts {
        &self.contexts
    }

    /// Pipe flag in effect when this step was recorded, i.e. the parent's
    /// flag at that moment. A call step pipes iff this is set.
    pub fn pipe(&self) -> bool {
        self.pipe
    }

    /// Whether this step's result goes into the replay log.
    pub fn is_logged(&self) -> bool {
        !matches!(self.step, Step::Member(_))
    }

    /// The steps from the root to `self`, in replay order.
    pub fn steps(self: &Arc<Self>) -> Vec<Arc<Link>> {
        let mut steps = Vec::new();
        let mut cursor = Some(self.clone());
        while let Some(link) = cursor {
            cursor = link.parent.clone();
            steps.push(link);
        }
        steps.reverse();
        steps
    }

    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut cursor = self.parent.as_deref();
        while let Some(link) = cursor {
            depth += 1;
            cursor = link.parent.as_deref();
        }
        depth
    }

    /// Rendering of this step alone, e.g. `.split` or `(',')`.
    pub fn label(&self) -> StepLabel<'_> {
        StepLabel(self)
    }

    fn fmt_step(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Step::Root(data) => write!(f, "DotChain({})", repr_value(data)),
            Step::Member(Member::Name(name)) => write!(f, ".{name}"),
            Step::Member(Member::Callable(callable)) => {
                write!(f, ".Call({})", format_value(callable))
            }
            Step::Call(args) => {
                let mut parts: Vec<String> = args.positional().iter().map(repr_value).collect();
                parts.extend(
                    args.kwargs()
                        .iter()
                        .map(|(name, value)| format!("{name}={}", repr_value(value))),
                );
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

pub struct StepLabel<'a>(&'a Link);

impl fmt::Display for StepLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_step(f)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chain = Vec::with_capacity(self.depth());
        let mut cursor = Some(self);
        while let Some(link) = cursor {
            chain.push(link);
            cursor = link.parent.as_deref();
        }
        for link in chain.into_iter().rev() {
            link.fmt_step(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chain() -> Arc<Link> {
        let root = Link::root(Value::from("0,1"), Contexts::new(), false);
        let split = Link::member(&root, Member::Name("split".into()), Contexts::new(), false);
        Link::call(
            &split,
            CallArgs::new().arg(",").kwarg("maxsplit", 1),
            Contexts::new(),
            true,
        )
    }

    #[test]
    fn steps_run_root_to_tip() {
        let tip = sample_chain();
        let steps = tip.steps();
        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[0].step(), Step::Root(_)));
        assert!(matches!(steps[1].step(), Step::Member(Member::Name(name)) if name == "split"));
        assert!(matches!(steps[2].step(), Step::Call(_)));
        assert!(Arc::ptr_eq(&steps[2], &tip));
        assert_eq!(tip.depth(), 3);
    }

    #[test]
    fn display_renders_the_whole_chain() {
        insta::assert_snapshot!(sample_chain().to_string(), @"DotChain('0,1').split(',', maxsplit=1)");
    }

    #[test]
    fn contexts_dedupe_and_skip_unit() {
        let mut contexts = Contexts::new();
        assert!(contexts.insert(Value::Int(1)));
        assert!(!contexts.insert(Value::Int(1)));
        assert!(!contexts.insert(Value::Unit));
        assert!(contexts.insert(Value::from("a")));
        assert_eq!(contexts.as_slice(), &[Value::Int(1), Value::from("a")]);
        contexts.clear();
        assert!(contexts.is_empty());
    }

    #[test]
    fn only_member_steps_are_unlogged() {
        let tip = sample_chain();
        let logged: Vec<bool> = tip.steps().iter().map(|link| link.is_logged()).collect();
        assert_eq!(logged, vec![true, false, true]);
    }
}
