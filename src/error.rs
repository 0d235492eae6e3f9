//! Error taxonomy for the hook registry and dispatcher.

use thiserror::Error;

/// An opaque tap-originated error: whatever the tap author threw, rejected, or
/// passed to its completion callback.
pub type TapError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors observable at the hook/dispatcher boundary.
///
/// The usage errors (`InvalidOptions`, `MissingName`) are thrown synchronously from
/// the `tap*` registration methods. The contract-violation errors
/// (`NonPromiseReturn`, `AbstractOverride`) surface at invocation time. `Tap` carries
/// whatever the tap author's own code produced, propagated according to the calling
/// convention in use.
#[derive(Debug, Error)]
pub enum HookError {
    /// `tap*` was called with something other than a bare name or an options object.
    #[error("Invalid tap options")]
    InvalidOptions,

    /// A tap's `name` was absent or empty.
    #[error("Missing name for tap")]
    MissingName,

    /// A `tapPromise` function did not return a future.
    ///
    /// The source message embeds what was returned instead; callers that build taps
    /// from dynamically typed data should format the offending value into `found`.
    #[error("Tap function (tapPromise) did not return promise (returned {found})")]
    NonPromiseReturn {
        /// Debug rendering of whatever the tap handed back.
        found: String,
    },

    /// A custom `Orchestration` did not override `compile` — see
    /// [`crate::dispatcher::Orchestration`].
    #[error("Abstract: should be overridden")]
    AbstractOverride,

    /// `call` (the sync calling convention) hit a tap whose own type is
    /// `async`/`promise`. Only `call_async`/`promise` can wait on such a tap
    /// (§4.2 input/output contract).
    #[error("tap '{tap}' cannot run under the sync calling convention")]
    NotSync {
        /// Name of the offending tap.
        tap: String,
    },

    /// The tap's own error, propagated unchanged.
    #[error(transparent)]
    Tap(#[from] TapError),
}
