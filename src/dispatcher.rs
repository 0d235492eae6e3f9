//! The dispatcher factory (C2): orchestration templates that invoke a tap snapshot
//! under a chosen strategy (series / looping / parallel) and a chosen calling
//! convention (sync / async / promise).
//!
//! The source compiles a dispatcher by emitting and evaluating source text (§9).
//! Rust has no runtime codegen story that fits a library crate, and the design
//! notes explicitly permit the alternative: "a tree of closure objects ... one per
//! orchestration node". Each [`Orchestration`] implementation *is* that closure
//! tree — `run_sync`/`run_promise` are monomorphized (or vtable-dispatched through
//! `Arc<dyn Orchestration<_, _>>`) the same way a synthesized function would be
//! specialized to the tap snapshot, without ever touching `eval`-equivalent code.

use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use crate::context::HookContext;
use crate::descriptor::{AsyncCompletion, Tap, TapBody};
use crate::error::HookError;
use crate::interceptor::Interceptor;

/// The result of running an orchestration to completion.
pub type OrchestrationFuture<R> =
    futures_util::future::BoxFuture<'static, Result<Option<R>, HookError>>;

/// A snapshot an orchestration runs against: the tap list and interceptor list as
/// they stood at the moment of compilation (§4.1 "Snapshot safety").
pub struct Snapshot<Args, R> {
    pub taps: Arc<[Tap<Args, R>]>,
    pub interceptors: Arc<[Interceptor<Args, R>]>,
}

impl<Args, R> Clone for Snapshot<Args, R> {
    fn clone(&self) -> Self {
        Self {
            taps: self.taps.clone(),
            interceptors: self.interceptors.clone(),
        }
    }
}

/// An orchestration strategy: the shape by which a hook composes its taps (§4.2).
///
/// Base form is abstract: a custom orchestration that doesn't override a method
/// gets [`HookError::AbstractOverride`] at the call site, mirroring the source's
/// `HookCodeFactory.template()` throwing "Abstract: should be overridden" (§7).
pub trait Orchestration<Args, R>: Send + Sync
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Run under the `sync` calling convention. Must fail with
    /// [`HookError::NotSync`] if the snapshot contains a non-sync tap — a sync
    /// invocation cannot suspend waiting for one (§4.2 input/output contract).
    fn run_sync(&self, snapshot: &Snapshot<Args, R>, args: Args) -> Result<Option<R>, HookError> {
        let _ = (snapshot, args);
        Err(HookError::AbstractOverride)
    }

    /// Run under the `promise` calling convention. May freely mix sync, async, and
    /// promise taps.
    fn run_promise(&self, snapshot: Snapshot<Args, R>, args: Args) -> OrchestrationFuture<R> {
        let _ = (snapshot, args);
        Box::pin(async { Err(HookError::AbstractOverride) })
    }
}

/// Invoke every `tap`-callback interceptor for a single tap, in registration order.
fn fire_tap_interceptors<Args, R>(
    interceptors: &[Interceptor<Args, R>],
    ctx: &HookContext,
    tap: &Tap<Args, R>,
) {
    for interceptor in interceptors {
        if let Some(f) = &interceptor.tap {
            f(ctx, tap);
        }
    }
}

/// Invoke every `call`-callback interceptor once, before any tap runs.
fn fire_call_interceptors<Args, R>(interceptors: &[Interceptor<Args, R>], ctx: &HookContext) {
    for interceptor in interceptors {
        if let Some(f) = &interceptor.call {
            f(ctx);
        }
    }
}

/// Invoke every `loop`-callback interceptor at the top of an iteration.
fn fire_loop_interceptors<Args, R>(interceptors: &[Interceptor<Args, R>], ctx: &HookContext) {
    for interceptor in interceptors {
        if let Some(f) = &interceptor.loop_start {
            f(ctx);
        }
    }
}

/// Run one tap synchronously. Fails with [`HookError::NotSync`] if the tap itself
/// is `async`/`promise` — a sync calling convention has no suspension point to wait
/// on it at (§4.2).
fn call_tap_sync<Args, R>(
    tap: &Tap<Args, R>,
    interceptors: &[Interceptor<Args, R>],
    ctx: &HookContext,
    args: Args,
) -> Result<Option<R>, HookError> {
    fire_tap_interceptors(interceptors, ctx, tap);
    match &tap.body {
        TapBody::Sync(f) => f(args).map_err(HookError::Tap),
        TapBody::Async(_) | TapBody::Promise(_) => Err(HookError::NotSync {
            tap: tap.name.clone(),
        }),
    }
}

/// Run one tap under the `promise` calling convention, regardless of the tap's own
/// type. Async-style taps are bridged through a oneshot channel so their trailing
/// completion continuation still fires exactly once (§4.2 "Per-tap invocation").
async fn call_tap_async<Args, R>(
    tap: Arc<Tap<Args, R>>,
    interceptors: Arc<[Interceptor<Args, R>]>,
    ctx: Arc<HookContext>,
    args: Args,
) -> Result<Option<R>, HookError>
where
    Args: Send + 'static,
    R: Send + 'static,
{
    fire_tap_interceptors(&interceptors, &ctx, &tap);
    match &tap.body {
        TapBody::Sync(f) => f(args).map_err(HookError::Tap),
        TapBody::Promise(f) => f(args).await.map_err(HookError::Tap),
        TapBody::Async(f) => {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let completion: AsyncCompletion<R> = Box::new(move |result| {
                let _ = tx.send(result);
            });
            f(args, completion);
            match rx.await {
                Ok(result) => result.map_err(HookError::Tap),
                Err(_) => Err(HookError::Tap(Box::from(format!(
                    "tap '{}' dropped its completion callback without calling it",
                    tap.name
                )))),
            }
        }
    }
}

/// **Series**: run taps in registration order, one after another (§4.2).
///
/// `bail: true` short-circuits on the first tap that returns a defined (`Some`)
/// result — the bail-early flavor. `bail: false` runs every tap and ignores
/// results — the basic flavor.
pub struct SeriesOrchestration {
    pub bail: bool,
}

impl<Args, R> Orchestration<Args, R> for SeriesOrchestration
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    fn run_sync(&self, snapshot: &Snapshot<Args, R>, args: Args) -> Result<Option<R>, HookError> {
        let ctx = HookContext::new();
        fire_call_interceptors(&snapshot.interceptors, &ctx);
        for tap in snapshot.taps.iter() {
            let result = call_tap_sync(tap, &snapshot.interceptors, &ctx, args.clone())?;
            if self.bail && result.is_some() {
                return Ok(result);
            }
        }
        Ok(None)
    }

    fn run_promise(&self, snapshot: Snapshot<Args, R>, args: Args) -> OrchestrationFuture<R> {
        let bail = self.bail;
        Box::pin(async move {
            let ctx = Arc::new(HookContext::new());
            fire_call_interceptors(&snapshot.interceptors, &ctx);
            for tap in snapshot.taps.iter() {
                let result = call_tap_async(
                    Arc::new(tap.clone()),
                    snapshot.interceptors.clone(),
                    ctx.clone(),
                    args.clone(),
                )
                .await?;
                if bail && result.is_some() {
                    return Ok(result);
                }
            }
            Ok(None)
        })
    }
}

/// **Waterfall**: run taps in registration order, threading each defined result
/// into the next tap's sole argument. Requires `Args == R` (the accumulator type),
/// matching the source's waterfall hooks which are always single-argument.
pub struct WaterfallOrchestration;

impl<T> Orchestration<T, T> for WaterfallOrchestration
where
    T: Clone + Send + 'static,
{
    fn run_sync(&self, snapshot: &Snapshot<T, T>, args: T) -> Result<Option<T>, HookError> {
        let ctx = HookContext::new();
        fire_call_interceptors(&snapshot.interceptors, &ctx);
        let mut acc = args;
        for tap in snapshot.taps.iter() {
            if let Some(next) = call_tap_sync(tap, &snapshot.interceptors, &ctx, acc.clone())? {
                acc = next;
            }
        }
        Ok(Some(acc))
    }

    fn run_promise(&self, snapshot: Snapshot<T, T>, args: T) -> OrchestrationFuture<T> {
        Box::pin(async move {
            let ctx = Arc::new(HookContext::new());
            fire_call_interceptors(&snapshot.interceptors, &ctx);
            let mut acc = args;
            for tap in snapshot.taps.iter() {
                if let Some(next) = call_tap_async(
                    Arc::new(tap.clone()),
                    snapshot.interceptors.clone(),
                    ctx.clone(),
                    acc.clone(),
                )
                .await?
                {
                    acc = next;
                }
            }
            Ok(Some(acc))
        })
    }
}

/// **Looping**: run a series pass, then re-run it from the top whenever any tap in
/// the pass produced a defined result, until a pass produces none (§4.2, Glossary
/// "Orchestration").
pub struct LoopingOrchestration;

impl<Args, R> Orchestration<Args, R> for LoopingOrchestration
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    fn run_sync(&self, snapshot: &Snapshot<Args, R>, args: Args) -> Result<Option<R>, HookError> {
        let ctx = HookContext::new();
        fire_call_interceptors(&snapshot.interceptors, &ctx);
        loop {
            fire_loop_interceptors(&snapshot.interceptors, &ctx);
            let mut looped = false;
            for tap in snapshot.taps.iter() {
                let result = call_tap_sync(tap, &snapshot.interceptors, &ctx, args.clone())?;
                if result.is_some() {
                    looped = true;
                }
            }
            if !looped {
                return Ok(None);
            }
        }
    }

    fn run_promise(&self, snapshot: Snapshot<Args, R>, args: Args) -> OrchestrationFuture<R> {
        Box::pin(async move {
            let ctx = Arc::new(HookContext::new());
            fire_call_interceptors(&snapshot.interceptors, &ctx);
            loop {
                fire_loop_interceptors(&snapshot.interceptors, &ctx);
                let mut looped = false;
                for tap in snapshot.taps.iter() {
                    let result = call_tap_async(
                        Arc::new(tap.clone()),
                        snapshot.interceptors.clone(),
                        ctx.clone(),
                        args.clone(),
                    )
                    .await?;
                    if result.is_some() {
                        looped = true;
                    }
                }
                if !looped {
                    return Ok(None);
                }
            }
        })
    }
}

/// **Parallel**: launch every tap without waiting for its predecessor (§4.2).
///
/// Degenerates to series for a sync invocation (single-threaded, nothing to run
/// concurrently) and for snapshots with at most one tap. `bail: true` resolves as
/// soon as any tap produces a defined result or an error, dropping the remaining
/// in-flight tap futures — the async analogue of the source's counter-zero gate.
pub struct ParallelOrchestration {
    pub bail: bool,
}

impl<Args, R> Orchestration<Args, R> for ParallelOrchestration
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    fn run_sync(&self, snapshot: &Snapshot<Args, R>, args: Args) -> Result<Option<R>, HookError> {
        let ctx = HookContext::new();
        fire_call_interceptors(&snapshot.interceptors, &ctx);
        let mut result = None;
        for tap in snapshot.taps.iter() {
            let r = call_tap_sync(tap, &snapshot.interceptors, &ctx, args.clone())?;
            if self.bail && r.is_some() {
                result = r;
                break;
            }
        }
        Ok(result)
    }

    fn run_promise(&self, snapshot: Snapshot<Args, R>, args: Args) -> OrchestrationFuture<R> {
        let bail = self.bail;
        Box::pin(async move {
            if snapshot.taps.len() <= 1 {
                return SeriesOrchestration { bail }.run_promise(snapshot, args).await;
            }

            let ctx = Arc::new(HookContext::new());
            fire_call_interceptors(&snapshot.interceptors, &ctx);

            let mut in_flight = FuturesUnordered::new();
            for tap in snapshot.taps.iter() {
                in_flight.push(call_tap_async(
                    Arc::new(tap.clone()),
                    snapshot.interceptors.clone(),
                    ctx.clone(),
                    args.clone(),
                ));
            }

            while let Some(outcome) = in_flight.next().await {
                match outcome {
                    Ok(Some(value)) if bail => return Ok(Some(value)),
                    Ok(_) => {}
                    // A tap error always zeros the counter and reports once (§4.2
                    // "doneBreak", §7 "first error is reported once and subsequent
                    // completions are swallowed") — `bail` only governs early-exit
                    // on a defined *result*, not on an error.
                    Err(err) => return Err(err),
                }
            }
            Ok(None)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::flavors::{async_parallel_hook, sync_hook};
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;

    #[test]
    fn sync_call_rejects_non_sync_taps() {
        let mut hook = sync_hook::<(), ()>(Vec::<&str>::new());
        hook.tap_promise("p", |_| async { Ok(None) }.boxed())
            .unwrap();

        let err = hook.call(()).unwrap_err();
        assert!(matches!(err, HookError::NotSync { .. }));
    }

    #[tokio::test]
    async fn promise_rejects_instead_of_panicking_on_sync_throw() {
        // Unlike a JS Promise executor, constructing this future never runs the
        // tap body eagerly — nothing can "leak" a synchronous throw before a
        // `.await` attaches, so there is no separate sync-leak guard to build.
        let mut hook = sync_hook::<(), ()>(Vec::<&str>::new());
        hook.tap("boom", |_| Err(Box::<dyn std::error::Error + Send + Sync>::from("boom")))
            .unwrap();

        let fut = hook.promise(());
        let result = fut.await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "boom");
    }

    #[tokio::test]
    async fn parallel_error_is_reported_once_and_others_are_suppressed() {
        let mut hook = async_parallel_hook::<(), i32>(Vec::<&str>::new());
        let completed = Arc::new(AtomicUsize::new(0));

        {
            let completed = completed.clone();
            hook.tap_promise("ok-0", move |_| {
                let completed = completed.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    completed.fetch_add(1, AtomicOrdering::SeqCst);
                    Ok(None)
                }
                .boxed()
            })
            .unwrap();
        }
        hook.tap_promise("err-1", |_| {
            async { Err(Box::<dyn std::error::Error + Send + Sync>::from("boom")) }.boxed()
        })
        .unwrap();
        {
            let completed = completed.clone();
            hook.tap_promise("ok-2", move |_| {
                let completed = completed.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    completed.fetch_add(1, AtomicOrdering::SeqCst);
                    Ok(None)
                }
                .boxed()
            })
            .unwrap();
        }

        let result = hook.promise(()).await;
        assert!(result.is_err());
        // The error tap has no await point, so it resolves before the two 5ms
        // sleeps do; the orchestration returns immediately and drops the
        // in-flight set, cancelling the still-sleeping taps before their bodies
        // ever increment `completed` — the counter-zero gate (§4.2, §7) means
        // their completions are suppressed, not merely ignored after the fact.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(completed.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn looping_restarts_while_any_tap_returns_a_defined_result() {
        let mut hook = crate::flavors::sync_loop_hook::<(), i32>(Vec::<&str>::new());
        let pass = Arc::new(AtomicUsize::new(0));
        let iterations = Arc::new(AtomicUsize::new(0));

        {
            let pass = pass.clone();
            let iterations = iterations.clone();
            hook.tap("first", move |_| {
                iterations.fetch_add(1, AtomicOrdering::SeqCst);
                let _ = pass.load(AtomicOrdering::SeqCst);
                Ok(None)
            })
            .unwrap();
        }
        {
            let pass = pass.clone();
            hook.tap("second", move |_| {
                let current = pass.fetch_add(1, AtomicOrdering::SeqCst);
                if current == 0 { Ok(Some(42)) } else { Ok(None) }
            })
            .unwrap();
        }

        let result = hook.call(()).unwrap();
        assert_eq!(result, None);
        assert_eq!(iterations.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(pass.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn interceptor_tap_callbacks_fire_before_each_tap_in_order() {
        let mut hook = sync_hook::<(), ()>(Vec::<&str>::new());
        let order = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));

        {
            let order = order.clone();
            let order_call = order.clone();
            hook.intercept(
                Interceptor::new()
                    .on_call(move |_ctx| order_call.lock().push("I1.call".to_string()))
                    .on_tap(move |_ctx, tap| {
                        order.lock().push(format!("I1.tap({})", tap.name));
                    }),
            );
        }
        {
            let order = order.clone();
            let order_call = order.clone();
            hook.intercept(
                Interceptor::new()
                    .on_call(move |_ctx| order_call.lock().push("I2.call".to_string()))
                    .on_tap(move |_ctx, tap| {
                        order.lock().push(format!("I2.tap({})", tap.name));
                    }),
            );
        }
        {
            let order = order.clone();
            hook.tap("T1", move |_| {
                order.lock().push("T1".to_string());
                Ok(None)
            })
            .unwrap();
        }
        {
            let order = order.clone();
            hook.tap("T2", move |_| {
                order.lock().push("T2".to_string());
                Ok(None)
            })
            .unwrap();
        }

        hook.call(()).unwrap();

        assert_eq!(
            *order.lock(),
            vec![
                "I1.call",
                "I2.call",
                "I1.tap(T1)",
                "I2.tap(T1)",
                "T1",
                "I1.tap(T2)",
                "I2.tap(T2)",
                "T2",
            ]
        );
    }
}
