//! Per-invocation shared record passed to context-opted taps and interceptors.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A fresh, per-call record shared across every interceptor and context-opted tap
/// within a single invocation (§5). Not thread-safe by design — it lives for the
/// duration of one `call`/`callAsync`/`promise` invocation and is never shared
/// across invocations.
///
/// Modeled as a small type map, the way `tower`/`http` middleware stacks thread an
/// `Extensions`-style bag through a request rather than a fixed struct of fields.
#[derive(Default)]
pub struct HookContext {
    slots: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl HookContext {
    /// Build an empty context. Called once per invocation by the dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, keyed by its type. Replaces any previous value of the same type.
    pub fn insert<T: Send + 'static>(&mut self, value: T) {
        self.slots.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Fetch a previously stored value of type `T`.
    pub fn get<T: Send + 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Fetch a mutable reference to a previously stored value of type `T`.
    pub fn get_mut<T: Send + 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_typed_values() {
        let mut ctx = HookContext::new();
        assert!(ctx.get::<u32>().is_none());

        ctx.insert(7u32);
        assert_eq!(ctx.get::<u32>(), Some(&7));

        if let Some(v) = ctx.get_mut::<u32>() {
            *v += 1;
        }
        assert_eq!(ctx.get::<u32>(), Some(&8));
    }

    #[test]
    fn distinct_types_do_not_collide() {
        let mut ctx = HookContext::new();
        ctx.insert(1i32);
        ctx.insert("hello".to_string());
        assert_eq!(ctx.get::<i32>(), Some(&1));
        assert_eq!(ctx.get::<String>(), Some(&"hello".to_string()));
    }
}
