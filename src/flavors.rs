//! The five standard flavors §1 calls out as a SHOULD: thin constructors over the
//! shared [`Hook`] engine, each wired to one [`Orchestration`] template. None of
//! these re-implement dispatch — they only pick which closure tree `Hook::new`
//! should use.

use std::sync::Arc;

use crate::dispatcher::{LoopingOrchestration, ParallelOrchestration, SeriesOrchestration, WaterfallOrchestration};
use crate::registry::Hook;

/// Series orchestration, tap results ignored. The bail-none, loop-none baseline.
pub fn sync_hook<Args, R>(args: impl IntoIterator<Item = impl Into<String>>) -> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    Hook::new(args, Arc::new(SeriesOrchestration { bail: false }))
}

/// Series orchestration, short-circuits on the first tap to return a defined
/// result.
pub fn sync_bail_hook<Args, R>(args: impl IntoIterator<Item = impl Into<String>>) -> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    Hook::new(args, Arc::new(SeriesOrchestration { bail: true }))
}

/// Series orchestration over a single threaded accumulator: each tap's defined
/// result becomes the next tap's argument.
pub fn sync_waterfall_hook<T>(args: impl IntoIterator<Item = impl Into<String>>) -> Hook<T, T>
where
    T: Clone + Send + 'static,
{
    Hook::new(args, Arc::new(WaterfallOrchestration))
}

/// Looping orchestration: re-runs the full tap pass while any tap keeps returning a
/// defined result.
pub fn sync_loop_hook<Args, R>(args: impl IntoIterator<Item = impl Into<String>>) -> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    Hook::new(args, Arc::new(LoopingOrchestration))
}

/// Parallel orchestration: every tap launches without waiting on its
/// predecessors; the hook settles once the last one does.
pub fn async_parallel_hook<Args, R>(args: impl IntoIterator<Item = impl Into<String>>) -> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    Hook::new(args, Arc::new(ParallelOrchestration { bail: false }))
}

/// Parallel orchestration that resolves as soon as any tap produces a defined
/// result or an error.
pub fn async_parallel_bail_hook<Args, R>(
    args: impl IntoIterator<Item = impl Into<String>>,
) -> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    Hook::new(args, Arc::new(ParallelOrchestration { bail: true }))
}
