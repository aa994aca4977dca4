//! Extension-point (hook) vocabulary shared with the external hook registry.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Origin label for hooks declared by the engine itself.
pub const CORE_ORIGIN: &str = "core";

/// Whether a hook point transforms a value or only signals an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Observers receive a value and must return the (possibly changed) value.
    Filter,
    /// Observers are notified; nothing is returned.
    Action,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// A named hook point together with how to subscribe to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookPoint {
    /// Hook name as the registry knows it.
    pub name: String,
    /// Filter or action.
    pub kind: HookKind,
    /// Number of arguments the observer accepts, counting a filter's value.
    pub accepted_args: usize,
    /// Who declares this hook: [`CORE_ORIGIN`] or an extension name.
    pub origin: String,
}

impl HookPoint {
    /// Declares a core filter hook.
    #[must_use]
    pub fn filter(name: impl Into<String>, accepted_args: usize) -> Self {
        Self {
            name: name.into(),
            kind: HookKind::Filter,
            accepted_args,
            origin: CORE_ORIGIN.to_string(),
        }
    }

    /// Declares a core action hook.
    #[must_use]
    pub fn action(name: impl Into<String>, accepted_args: usize) -> Self {
        Self {
            name: name.into(),
            kind: HookKind::Action,
            accepted_args,
            origin: CORE_ORIGIN.to_string(),
        }
    }

    /// Builder method to set the declaring origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Returns true if the engine itself declares this hook.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.origin == CORE_ORIGIN
    }
}

/// Callback interface the registry invokes when a hook fires.
///
/// The registry passes the hook name with every call, so observers never
/// need to reach back into the registry for context.
pub trait HookObserver {
    /// A filter fired. `args` excludes the filtered value and is truncated
    /// to the subscription's accepted argument count. The return value is
    /// passed to the next subscriber.
    fn on_filter(&self, hook: &str, value: Value, args: &[Value]) -> Value;

    /// An action fired.
    fn on_action(&self, hook: &str, args: &[Value]);
}

/// The external registry that dispatches hook points to subscribers.
pub trait HookRegistry {
    /// Subscribes `observer` to `point` at `priority`.
    fn attach(&mut self, point: &HookPoint, observer: Rc<dyn HookObserver>, priority: i32);

    /// Removes the subscription of exactly this observer (by identity) from
    /// `point` at `priority`. Returns true if a subscription was removed.
    fn detach(&mut self, point: &HookPoint, observer: &Rc<dyn HookObserver>, priority: i32)
    -> bool;
}

/// Identity comparison for observer handles.
#[must_use]
pub fn observer_eq(a: &Rc<dyn HookObserver>, b: &Rc<dyn HookObserver>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
