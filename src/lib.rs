//! Pluggable hook registry and dispatcher compiler.
//!
//! A [`Hook`] is a named extension point: third parties attach callbacks ("taps")
//! with `tap`/`tap_async`/`tap_promise`, the owner invokes every attached tap with
//! `call`/`call_async`/`promise` under whichever [`Orchestration`] the hook was
//! built with. Taps are ordered deterministically by explicit `before`/`stage`
//! hints; an [`Interceptor`] pipeline can rewrite taps at registration time and
//! observe every invocation.
//!
//! ```
//! use hooked::flavors::sync_bail_hook;
//!
//! let mut hook = sync_bail_hook::<(i32,), &'static str>(["x"]);
//! hook.tap("first", |(x,)| Ok(if x > 10 { Some("big") } else { None })).unwrap();
//! hook.tap("second", |_| Ok(Some("fallback"))).unwrap();
//!
//! assert_eq!(hook.call((20,)).unwrap(), Some("big"));
//! assert_eq!(hook.call((1,)).unwrap(), Some("fallback"));
//! ```

pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod flavors;
pub mod interceptor;
pub mod registry;

pub use context::HookContext;
pub use descriptor::{AsyncCompletion, Before, Tap, TapBody, TapFuture, TapKind, TapOptions};
pub use dispatcher::{
    LoopingOrchestration, Orchestration, OrchestrationFuture, ParallelOrchestration,
    SeriesOrchestration, Snapshot, WaterfallOrchestration,
};
pub use error::{HookError, TapError};
pub use interceptor::Interceptor;
pub use registry::{Hook, HookFacade};
