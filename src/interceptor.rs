//! Interceptors: cross-cutting observers that may rewrite taps at registration and
//! observe invocations (§3, §4.1).

use std::sync::Arc;

use crate::context::HookContext;
use crate::descriptor::Tap;

/// A registration/invocation observer attached via [`crate::Hook::intercept`].
///
/// Every field is optional; an interceptor with no callbacks at all is a legal
/// no-op that still invalidates the compiled dispatcher on attach (§8 "Round-trip
/// laws").
#[derive(Clone, Default)]
pub struct Interceptor<Args, R> {
    /// Invoked on each tap at registration time. A `Some` return replaces the
    /// running descriptor; `None` carries it through unchanged (§4.1 "Interceptor
    /// registration fold") — except inside [`crate::Hook::intercept`] itself, which
    /// replicates the source's asymmetric fold over *existing* taps (§9).
    pub register: Option<Arc<dyn Fn(Tap<Args, R>) -> Option<Tap<Args, R>> + Send + Sync>>,
    /// Invoked once at the start of every invocation, before any tap runs.
    pub call: Option<Arc<dyn Fn(&HookContext) + Send + Sync>>,
    /// Invoked before each tap executes, in `taps` order.
    pub tap: Option<Arc<dyn Fn(&HookContext, &Tap<Args, R>) + Send + Sync>>,
    /// Invoked at the top of every loop iteration (looping orchestration only).
    pub loop_start: Option<Arc<dyn Fn(&HookContext) + Send + Sync>>,
}

impl<Args, R> Interceptor<Args, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_register(
        mut self,
        f: impl Fn(Tap<Args, R>) -> Option<Tap<Args, R>> + Send + Sync + 'static,
    ) -> Self {
        self.register = Some(Arc::new(f));
        self
    }

    pub fn on_call(mut self, f: impl Fn(&HookContext) + Send + Sync + 'static) -> Self {
        self.call = Some(Arc::new(f));
        self
    }

    pub fn on_tap(
        mut self,
        f: impl Fn(&HookContext, &Tap<Args, R>) + Send + Sync + 'static,
    ) -> Self {
        self.tap = Some(Arc::new(f));
        self
    }

    pub fn on_loop(mut self, f: impl Fn(&HookContext) + Send + Sync + 'static) -> Self {
        self.loop_start = Some(Arc::new(f));
        self
    }
}

impl<Args, R> std::fmt::Debug for Interceptor<Args, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("register", &self.register.is_some())
            .field("call", &self.call.is_some())
            .field("tap", &self.tap.is_some())
            .field("loop_start", &self.loop_start.is_some())
            .finish()
    }
}
