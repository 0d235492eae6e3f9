#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Cross-module scenarios from spec.md §8 that don't fit naturally inside a single
//! source file's `#[cfg(test)]` block.

use futures_util::FutureExt;
use hooked::flavors::{async_parallel_hook, sync_hook, sync_waterfall_hook};
use hooked::{Interceptor, TapOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn with_options_empty_defaults_is_observationally_equal_to_tap() {
    let mut direct = sync_hook::<(), ()>(Vec::<&str>::new());
    direct.tap("only", |_| Ok(None)).unwrap();

    let mut via_facade = sync_hook::<(), ()>(Vec::<&str>::new());
    via_facade
        .with_options(TapOptions::default())
        .tap("only", |_| Ok(None))
        .unwrap();

    assert_eq!(direct.tap_names(), via_facade.tap_names());
}

#[test]
fn with_options_defaults_apply_only_when_caller_is_silent() {
    let mut hook = sync_hook::<(), ()>(Vec::<&str>::new());
    {
        let mut facade = hook.with_options(TapOptions::new("").stage(5));
        facade.tap("explicit-stage", |_| Ok(None)).unwrap();
        facade
            .tap(TapOptions::new("own-stage").stage(1), |_| Ok(None))
            .unwrap();
    }

    // Both taps keep their own names (defaults only fill an *empty* name), but the
    // first picks up the default stage since it didn't set one of its own.
    assert_eq!(hook.tap_names(), vec!["own-stage", "explicit-stage"]);
}

#[test]
fn no_op_interceptor_still_invalidates_the_compiled_snapshot() {
    let mut hook = sync_hook::<(), ()>(Vec::<&str>::new());
    hook.tap("a", |_| Ok(None)).unwrap();

    let before = hook.call(()).unwrap();
    hook.intercept(Interceptor::new());
    let after = hook.call(());

    assert_eq!(before, None);
    assert!(after.is_ok());
}

#[tokio::test]
async fn promise_completion_fires_exactly_once_with_zero_taps() {
    let hook = sync_hook::<(), i32>(Vec::<&str>::new());
    let result = hook.promise(()).await;
    assert_eq!(result.unwrap(), None);
}

#[tokio::test]
async fn call_async_delivers_completion_exactly_once() {
    let mut hook = async_parallel_hook::<(i32,), i32>(["x"]);
    hook.tap_promise("double", |(x,)| async move { Ok(Some(x * 2)) }.boxed())
        .unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = tokio::sync::oneshot::channel();
    {
        let invocations = invocations.clone();
        hook.call_async((21,), move |result| {
            invocations.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });
    }

    let result = rx.await.unwrap();
    assert_eq!(result.unwrap(), Some(42));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn waterfall_threads_each_defined_result_into_the_next_tap() {
    let mut hook = sync_waterfall_hook::<i32>(["acc"]);
    hook.tap("add-one", |acc| Ok(Some(acc + 1))).unwrap();
    hook.tap("skip", |_acc| Ok(None)).unwrap();
    hook.tap("double", |acc| Ok(Some(acc * 2))).unwrap();

    assert_eq!(hook.call(10).unwrap(), Some(22));
}

#[test]
fn context_deprecation_notice_is_accepted_without_erroring() {
    let mut hook = sync_hook::<(), ()>(Vec::<&str>::new());
    hook.tap(TapOptions::new("legacy").context(true), |_| Ok(None))
        .unwrap();
    hook.tap(TapOptions::new("also-legacy").context(true), |_| Ok(None))
        .unwrap();

    assert_eq!(hook.call(()).unwrap(), None);
}
