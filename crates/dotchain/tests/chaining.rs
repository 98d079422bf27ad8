#![allow(clippy::unwrap_used)]

mod support;

use dotchain::{CallArgs, ChainError, DotChain, Value};
use futures_util::StreamExt;
use support::{Sample, both, echo, int_list, ints};

fn sample() -> DotChain {
    DotChain::new(Sample::new().into_value())
}

#[tokio::test]
async fn property_access() {
    assert_eq!(both(&sample().attr("prop")).await, Value::from("P"));
}

#[tokio::test]
async fn property_then_value_method() {
    let chain = sample().attr("prop").attr("upper").call(());
    assert_eq!(both(&chain).await, Value::from("P"));

    let lowered = DotChain::new(Sample::with_values("Abc".into(), "M".into()).into_value())
        .attr("prop")
        .attr("lower")
        .call(());
    assert_eq!(both(&lowered).await, Value::from("abc"));
}

#[tokio::test]
async fn method_call_and_chained_method() {
    assert_eq!(both(&sample().attr("meth").call(())).await, Value::from("M"));
    let upper = sample().attr("meth").call(()).attr("lower").call(());
    assert_eq!(both(&upper).await, Value::from("m"));
}

#[tokio::test]
async fn positional_and_keyword_arguments_reach_the_callee() {
    let args = CallArgs::new().arg("test").kwarg("bool", true);
    let expected = echo(args.clone());
    assert_eq!(both(&sample().attr("arg_meth").call(args)).await, expected);
}

#[tokio::test]
async fn async_method_is_awaited() {
    let args = CallArgs::new().arg("test").kwarg("bool", true);
    let expected = echo(args.clone());
    let chain = sample().attr("async_arg_meth").call(args);

    assert!(matches!(chain.result().unwrap(), Value::Future(_)));
    assert_eq!((&chain).await.unwrap(), expected);
}

#[test]
fn generator_result_stays_lazy() {
    let result = sample().attr("generator").call(()).result().unwrap();
    let Value::Iter(iter) = result else {
        panic!("expected a lazy sequence, got {result:?}");
    };
    assert_eq!(iter.drain().unwrap(), ints([1, 2, 3]));
}

#[test]
fn generator_iterates_synchronously() {
    let mut chain = sample()
        .attr("generator")
        .call(CallArgs::new().arg(int_list([7, 8, 9])));
    let items: Vec<Value> = chain.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(items, ints([7, 8, 9]));
}

#[test]
fn restarting_iteration_replays_the_chain() {
    let mut chain = sample().attr("generator").call(());
    assert_eq!(chain.next_item().unwrap().unwrap(), Value::Int(1));
    assert_eq!(chain.next_item().unwrap().unwrap(), Value::Int(2));
    let restarted: Vec<Value> = chain.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(restarted, ints([1, 2, 3]));
    assert!(chain.next_item().is_none());
}

#[tokio::test]
async fn generator_iterates_asynchronously() {
    let mut chain = sample().attr("generator").call(());
    let items: Vec<Value> = chain
        .stream()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(items, ints([1, 2, 3]));
}

#[tokio::test]
async fn async_generator_iterates_asynchronously() {
    let mut chain = sample().attr("async_generator").call(());
    let items: Vec<Value> = chain.stream().map(|item| item.unwrap()).collect().await;
    assert_eq!(items, ints([1, 2, 3]));

    let mut custom = sample()
        .attr("async_generator")
        .call(CallArgs::new().arg(int_list([7, 8, 9])));
    let mut seen = Vec::new();
    while let Some(item) = custom.next_item_async().await {
        seen.push(item.unwrap());
    }
    assert_eq!(seen, ints([7, 8, 9]));
}

#[test]
fn async_generator_cannot_be_iterated_synchronously() {
    let mut chain = sample().attr("async_generator").call(());
    let mut iter = chain.iter();
    assert!(matches!(iter.next(), Some(Err(ChainError::Message(_)))));
    assert!(iter.next().is_none());
}

#[tokio::test]
async fn failed_replay_leaves_the_chain_usable() {
    let chain = sample().attr("missing");
    let err = chain.result().unwrap_err();
    assert_eq!(err.missing_name(), Some("missing"));
    let again = (&chain).await.unwrap_err();
    assert_eq!(again.to_string(), err.to_string());
    assert_eq!(chain.result().unwrap_err().missing_name(), Some("missing"));
}

#[tokio::test]
async fn callee_errors_pass_through_unchanged() {
    let chain = sample().attr("explode").call(CallArgs::new().arg(7));
    let sync = chain.result().unwrap_err();
    assert!(matches!(&sync, ChainError::Raised(Value::Int(7))));
    assert_eq!(sync.to_string(), "raised 7");
    let awaited = chain.await.unwrap_err();
    assert!(matches!(awaited, ChainError::Raised(Value::Int(7))));
}
