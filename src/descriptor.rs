//! Tap descriptors: the value type stored in a [`crate::Hook`]'s ordered tap list.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::TapError;

/// A boxed future as returned by a `tapPromise`-style tap.
pub type TapFuture<R> = futures_util::future::BoxFuture<'static, Result<Option<R>, TapError>>;

/// The trailing completion continuation an `tapAsync`-style tap must call exactly once.
pub type AsyncCompletion<R> = Box<dyn FnOnce(Result<Option<R>, TapError>) + Send>;

/// The calling convention a single tap was registered under.
///
/// This mirrors the tap descriptor's `type` field (§3); it is independent of which
/// of the hook's three invocation entry points (`call`/`callAsync`/`promise`, §4.2)
/// is used to drive the hook as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapKind {
    Sync,
    Async,
    Promise,
}

impl std::fmt::Display for TapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TapKind::Sync => "sync",
            TapKind::Async => "async",
            TapKind::Promise => "promise",
        };
        f.write_str(s)
    }
}

/// The tap author's callback, type-erased behind its calling convention.
///
/// `Arc` rather than `Box` so a `Tap` can be cheaply cloned into the snapshot a
/// compiled dispatcher captures (§4.1 "Snapshot safety") without disturbing the
/// live registry.
#[derive(Clone)]
pub enum TapBody<Args, R> {
    Sync(Arc<dyn Fn(Args) -> Result<Option<R>, TapError> + Send + Sync>),
    Async(Arc<dyn Fn(Args, AsyncCompletion<R>) + Send + Sync>),
    Promise(Arc<dyn Fn(Args) -> TapFuture<R> + Send + Sync>),
}

impl<Args, R> TapBody<Args, R> {
    pub fn kind(&self) -> TapKind {
        match self {
            TapBody::Sync(_) => TapKind::Sync,
            TapBody::Async(_) => TapKind::Async,
            TapBody::Promise(_) => TapKind::Promise,
        }
    }
}

/// A registered tap: a user callback plus the ordering metadata the insertion
/// algorithm (§4.1) uses to place it in the hook's tap list.
#[derive(Clone)]
pub struct Tap<Args, R> {
    /// Required, non-empty (enforced at registration — see [`crate::error::HookError::MissingName`]).
    pub name: String,
    /// Names this tap must precede. Folded to set semantics at registration.
    pub before: HashSet<String>,
    /// Secondary ordering key; lower runs earlier. Default 0.
    pub stage: i32,
    /// Deprecated opt-in to receive a [`crate::context::HookContext`]. Still accepted;
    /// see `tap_context_deprecation_notice_fires_once`.
    pub context: bool,
    /// The callback itself plus its calling convention.
    pub body: TapBody<Args, R>,
}

impl<Args, R> Tap<Args, R> {
    pub fn kind(&self) -> TapKind {
        self.body.kind()
    }
}

impl<Args, R> std::fmt::Debug for Tap<Args, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("name", &self.name)
            .field("before", &self.before)
            .field("stage", &self.stage)
            .field("context", &self.context)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Registration-time options, accepted either as a bare name or a fully populated
/// struct — mirrors the JS API's `string | object` tap options (§4.1).
///
/// `before`/`stage`/`context` are `Option`-wrapped rather than defaulted
/// truthily: §4.1's `withOptions` contract is "user fields win over
/// defaults", which means the merge must distinguish "the caller didn't set
/// this field" from "the caller explicitly set this field to the type's
/// default value" (`stage(0)`, `context(false)`, an empty `before`). A bare
/// `i32`/`bool`/`Before` can't carry that distinction; `Option` can.
#[derive(Debug, Clone, Default)]
pub struct TapOptions {
    pub name: String,
    pub before: Option<Before>,
    pub stage: Option<i32>,
    pub context: Option<bool>,
}

impl TapOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn before(mut self, before: impl Into<Before>) -> Self {
        self.before = Some(before.into());
        self
    }

    pub fn stage(mut self, stage: i32) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn context(mut self, context: bool) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<&str> for TapOptions {
    fn from(name: &str) -> Self {
        TapOptions::new(name)
    }
}

impl From<String> for TapOptions {
    fn from(name: String) -> Self {
        TapOptions::new(name)
    }
}

/// The `before` ordering hint: a single name, or a set of names, folded to set
/// semantics exactly as §4.1 describes ("duplicate before names are folded by set
/// semantics").
#[derive(Debug, Clone, Default)]
pub struct Before(pub HashSet<String>);

impl From<&str> for Before {
    fn from(name: &str) -> Self {
        Before(HashSet::from([name.to_string()]))
    }
}

impl From<String> for Before {
    fn from(name: String) -> Self {
        Before(HashSet::from([name]))
    }
}

impl<const N: usize> From<[&str; N]> for Before {
    fn from(names: [&str; N]) -> Self {
        Before(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<&str>> for Before {
    fn from(names: Vec<&str>) -> Self {
        Before(names.into_iter().map(|s| s.to_string()).collect())
    }
}

impl From<HashSet<String>> for Before {
    fn from(set: HashSet<String>) -> Self {
        Before(set)
    }
}
