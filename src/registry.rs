//! The hook base (C1): the ordered tap/interceptor registry and its three
//! invocation entry points.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

use parking_lot::Mutex;

use crate::descriptor::{AsyncCompletion, Before, Tap, TapBody, TapFuture, TapOptions};
use crate::dispatcher::{Orchestration, OrchestrationFuture, Snapshot};
use crate::error::HookError;
use crate::interceptor::Interceptor;

static CONTEXT_DEPRECATION_NOTICE: Once = Once::new();

fn warn_context_deprecated_once() {
    CONTEXT_DEPRECATION_NOTICE.call_once(|| {
        tracing::warn!("Hook.context is deprecated and will be removed");
    });
}

/// A compiled snapshot cached against the generation it was built from (§3
/// "dispatcher slots", §9 "mutation-invalidation").
struct CompiledSnapshot<Args, R> {
    generation: u64,
    snapshot: Snapshot<Args, R>,
}

/// A named extension point. Third parties attach callbacks ("taps"); the hook
/// invokes all attached taps under whatever [`Orchestration`] it was built with.
pub struct Hook<Args, R> {
    name: Option<String>,
    arg_names: Vec<String>,
    orchestration: Arc<dyn Orchestration<Args, R>>,
    taps: Vec<Tap<Args, R>>,
    interceptors: Vec<Interceptor<Args, R>>,
    generation: AtomicU64,
    compiled: Mutex<Option<CompiledSnapshot<Args, R>>>,
}

impl<Args, R> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Build a hook over the given argument names, using `orchestration` to compose
    /// its taps. `args` is opaque to the registry — it exists for introspection and
    /// for interceptors/taps that want to name their parameters (§6).
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>, orchestration: Arc<dyn Orchestration<Args, R>>) -> Self {
        Self {
            name: None,
            arg_names: args.into_iter().map(Into::into).collect(),
            orchestration,
            taps: Vec::new(),
            interceptors: Vec::new(),
            generation: AtomicU64::new(0),
            compiled: Mutex::new(None),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arg_names(&self) -> &[String] {
        &self.arg_names
    }

    /// True iff any taps or interceptors are registered (§4.1).
    pub fn is_used(&self) -> bool {
        !self.taps.is_empty() || !self.interceptors.is_empty()
    }

    /// Current tap count, in registry order — mostly useful for tests and
    /// introspection.
    pub fn tap_names(&self) -> Vec<&str> {
        self.taps.iter().map(|t| t.name.as_str()).collect()
    }

    fn bump_generation(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Fold the registration-time interceptor chain over a freshly normalized
    /// descriptor (§4.1 "Interceptor registration fold"). Each interceptor with a
    /// `register` callback is applied in turn; a `None` return carries the running
    /// descriptor through unchanged — unlike [`Hook::intercept`]'s fold over
    /// *existing* taps, which does not preserve that behavior (§9).
    fn run_register_interceptors(&self, mut tap: Tap<Args, R>) -> Tap<Args, R> {
        for interceptor in &self.interceptors {
            if let Some(register) = &interceptor.register {
                if let Some(replaced) = register(tap.clone()) {
                    tap = replaced;
                }
            }
        }
        tap
    }

    /// The ordered insertion algorithm (§4.1 "Insertion algorithm").
    fn insert(&mut self, item: Tap<Args, R>) {
        let mut before = item.before.clone();
        let stage = item.stage;
        let mut i = self.taps.len();
        while i > 0 {
            i -= 1;
            let neighbor = &self.taps[i];
            let mut skip = false;
            if !before.is_empty() {
                if before.remove(&neighbor.name) {
                    skip = true;
                } else if !before.is_empty() {
                    skip = true;
                }
            }
            if !skip && neighbor.stage > stage {
                skip = true;
            }
            if skip {
                continue;
            }
            i += 1;
            break;
        }
        self.taps.insert(i, item);
    }

    fn normalize(
        opts: impl Into<TapOptions>,
        body: TapBody<Args, R>,
    ) -> Result<Tap<Args, R>, HookError> {
        let opts: TapOptions = opts.into();
        if opts.name.is_empty() {
            return Err(HookError::MissingName);
        }
        let context = opts.context.unwrap_or(false);
        if context {
            warn_context_deprecated_once();
        }
        Ok(Tap {
            name: opts.name,
            before: opts.before.unwrap_or_default().0,
            stage: opts.stage.unwrap_or(0),
            context,
            body,
        })
    }

    fn register(&mut self, tap: Tap<Args, R>) {
        self.bump_generation();
        let tap = self.run_register_interceptors(tap);
        self.insert(tap);
    }

    /// Register a sync tap.
    pub fn tap(
        &mut self,
        opts: impl Into<TapOptions>,
        f: impl Fn(Args) -> Result<Option<R>, crate::error::TapError> + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        let tap = Self::normalize(opts, TapBody::Sync(Arc::new(f)))?;
        self.register(tap);
        Ok(())
    }

    /// Register an async (trailing-completion-callback) tap.
    pub fn tap_async(
        &mut self,
        opts: impl Into<TapOptions>,
        f: impl Fn(Args, AsyncCompletion<R>) + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        let tap = Self::normalize(opts, TapBody::Async(Arc::new(f)))?;
        self.register(tap);
        Ok(())
    }

    /// Register a promise (future-returning) tap.
    pub fn tap_promise(
        &mut self,
        opts: impl Into<TapOptions>,
        f: impl Fn(Args) -> TapFuture<R> + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        let tap = Self::normalize(opts, TapBody::Promise(Arc::new(f)))?;
        self.register(tap);
        Ok(())
    }

    /// Attach an interceptor. Resets the compiled snapshot; if the interceptor
    /// defines `register`, applies it to every *existing* tap in place.
    ///
    /// Unlike [`Hook::run_register_interceptors`] (the registration-time fold),
    /// this replaces each existing tap with whatever `register` returns —
    /// including `None`, which overwrites the tap with nothing. This is the
    /// source's behavior and §9 flags it as a likely bug; it is preserved here for
    /// compatibility. Prefer giving `register` a total function (always returning
    /// `Some`) when attaching it via `intercept` to an already-populated hook.
    pub fn intercept(&mut self, interceptor: Interceptor<Args, R>) {
        self.bump_generation();
        if let Some(register) = interceptor.register.clone() {
            let mut rewritten = Vec::with_capacity(self.taps.len());
            for tap in self.taps.drain(..) {
                if let Some(replaced) = register(tap) {
                    rewritten.push(replaced);
                }
                // A `None` return drops the tap entirely — the asymmetric fold
                // §9 describes. Faithful to the source; flagged as a hazard.
            }
            self.taps = rewritten;
        }
        self.interceptors.push(interceptor);
    }

    /// Snapshot the current taps/interceptors, reusing the cached `Arc` slices if
    /// no mutation has happened since the last call (§3 "dispatcher slots", §9
    /// "mutation-invalidation"). This is the Rust realization of the source's
    /// compile-then-delegate trampoline: instead of synthesizing and evaluating
    /// source text, we lazily materialize an immutable snapshot the first time
    /// it's needed after a mutation, then serve every subsequent call from that
    /// same `Arc` until the next `tap*`/`intercept` bumps the generation.
    fn snapshot(&self) -> Snapshot<Args, R> {
        let generation = self.generation.load(Ordering::Acquire);
        let mut compiled = self.compiled.lock();
        if let Some(existing) = compiled.as_ref() {
            if existing.generation == generation {
                return existing.snapshot.clone();
            }
        }
        let snapshot = Snapshot {
            taps: Arc::from(self.taps.clone().into_boxed_slice()),
            interceptors: Arc::from(self.interceptors.clone().into_boxed_slice()),
        };
        *compiled = Some(CompiledSnapshot {
            generation,
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    /// Sync invocation. Fails with [`HookError::NotSync`] if any tap in the current
    /// snapshot is `async`/`promise` (§4.2 input/output contract).
    pub fn call(&self, args: Args) -> Result<Option<R>, HookError> {
        let snapshot = self.snapshot();
        self.orchestration.run_sync(&snapshot, args)
    }

    /// Promise invocation: returns a future that resolves with the orchestration's
    /// result or rejects (resolves to `Err`) with its error.
    pub fn promise(&self, args: Args) -> OrchestrationFuture<R> {
        let snapshot = self.snapshot();
        self.orchestration.run_promise(snapshot, args)
    }

    /// Async (trailing-completion-callback) invocation. `callback` fires exactly
    /// once, from within a tokio task — the caller must be running inside a tokio
    /// runtime (the calling convention's suspension points, §5, are driven by
    /// whatever executor polls the returned task).
    pub fn call_async(
        &self,
        args: Args,
        callback: impl FnOnce(Result<Option<R>, HookError>) + Send + 'static,
    ) {
        let fut = self.promise(args);
        tokio::spawn(async move {
            let result = fut.await;
            callback(result);
        });
    }
}

/// A façade returned by [`Hook::with_options`] that merges caller-supplied defaults
/// over each tap's options before delegating to the underlying hook (§4.1).
pub struct HookFacade<'a, Args, R> {
    hook: &'a mut Hook<Args, R>,
    defaults: TapOptions,
}

/// Merge caller-supplied `opts` over `defaults`, field by field. Each of
/// `before`/`stage`/`context` is `Option`-wrapped precisely so this can tell
/// "the caller left it unset" (falls through to `defaults`) apart from "the
/// caller explicitly chose this value" (wins even when it equals a type
/// default, e.g. `stage(0)` or `context(false)`) — §4.1 "user fields win over
/// defaults".
fn merge_defaults(defaults: &TapOptions, opts: TapOptions) -> TapOptions {
    TapOptions {
        name: if opts.name.is_empty() {
            defaults.name.clone()
        } else {
            opts.name
        },
        before: opts.before.or_else(|| defaults.before.clone()),
        stage: opts.stage.or(defaults.stage),
        context: opts.context.or(defaults.context),
    }
}

impl<'a, Args, R> HookFacade<'a, Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    pub fn tap(
        &mut self,
        opts: impl Into<TapOptions>,
        f: impl Fn(Args) -> Result<Option<R>, crate::error::TapError> + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.hook.tap(merge_defaults(&self.defaults, opts.into()), f)
    }

    pub fn tap_async(
        &mut self,
        opts: impl Into<TapOptions>,
        f: impl Fn(Args, AsyncCompletion<R>) + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.hook
            .tap_async(merge_defaults(&self.defaults, opts.into()), f)
    }

    pub fn tap_promise(
        &mut self,
        opts: impl Into<TapOptions>,
        f: impl Fn(Args) -> TapFuture<R> + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.hook
            .tap_promise(merge_defaults(&self.defaults, opts.into()), f)
    }

    pub fn intercept(&mut self, interceptor: Interceptor<Args, R>) {
        self.hook.intercept(interceptor);
    }

    pub fn is_used(&self) -> bool {
        self.hook.is_used()
    }
}

impl<Args, R> Hook<Args, R>
where
    Args: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Returns a façade whose `tap*` methods merge `defaults` over each
    /// caller-supplied option set (§4.1 "withOptions").
    pub fn with_options(&mut self, defaults: impl Into<TapOptions>) -> HookFacade<'_, Args, R> {
        HookFacade {
            hook: self,
            defaults: defaults.into(),
        }
    }
}

impl TapOptions {
    pub fn named_before(name: impl Into<String>, before: impl Into<Before>) -> Self {
        TapOptions::new(name).before(before)
    }
}
