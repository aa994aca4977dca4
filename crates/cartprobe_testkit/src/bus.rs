//! An in-memory hook registry with priority-ordered dispatch.

use std::collections::BTreeMap;
use std::rc::Rc;

use cartprobe_foundation::{HookObserver, HookPoint, HookRegistry, Value, observer_eq};

#[derive(Clone)]
struct Entry {
    point: HookPoint,
    observer: Rc<dyn HookObserver>,
    priority: i32,
    seq: u64,
}

/// Dispatches hook invocations to subscribed observers.
///
/// Subscribers run in ascending priority, ties in subscription order. A
/// filter's arguments are cut to the subscription's accepted count, the
/// filtered value counting as the first.
#[derive(Clone, Default)]
pub struct HookBus {
    entries: BTreeMap<String, Vec<Entry>>,
    next_seq: u64,
}

impl HookBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribers on one hook.
    #[must_use]
    pub fn subscriber_count(&self, hook: &str) -> usize {
        self.entries.get(hook).map_or(0, Vec::len)
    }

    /// Number of subscribers across every hook.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Runs a filter through every subscriber and returns the final value.
    pub fn fire_filter(&self, hook: &str, value: Value, args: &[Value]) -> Value {
        self.snapshot(hook).into_iter().fold(value, |value, entry| {
            let take = entry.point.accepted_args.saturating_sub(1).min(args.len());
            entry.observer.on_filter(hook, value, &args[..take])
        })
    }

    /// Notifies every subscriber of an action.
    pub fn fire_action(&self, hook: &str, args: &[Value]) {
        for entry in self.snapshot(hook) {
            let take = entry.point.accepted_args.min(args.len());
            entry.observer.on_action(hook, &args[..take]);
        }
    }

    fn snapshot(&self, hook: &str) -> Vec<Entry> {
        let mut entries = self.entries.get(hook).cloned().unwrap_or_default();
        entries.sort_by_key(|e| (e.priority, e.seq));
        entries
    }
}

impl HookRegistry for HookBus {
    fn attach(&mut self, point: &HookPoint, observer: Rc<dyn HookObserver>, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.entry(point.name.clone()).or_default().push(Entry {
            point: point.clone(),
            observer,
            priority,
            seq,
        });
    }

    fn detach(
        &mut self,
        point: &HookPoint,
        observer: &Rc<dyn HookObserver>,
        priority: i32,
    ) -> bool {
        let Some(list) = self.entries.get_mut(&point.name) else {
            return false;
        };
        let Some(index) = list
            .iter()
            .position(|e| e.priority == priority && observer_eq(&e.observer, observer))
        else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.entries.remove(&point.name);
        }
        true
    }
}

impl std::fmt::Debug for HookBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<_, _> = self.entries.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("HookBus").field("subscribers", &counts).finish()
    }
}

// =============================================================================
// Filter Functions
// =============================================================================

/// Adapts a closure into a filter observer, for simulating third-party code.
pub struct FilterFn<F>(pub F);

impl<F> HookObserver for FilterFn<F>
where
    F: Fn(Value, &[Value]) -> Value,
{
    fn on_filter(&self, _hook: &str, value: Value, args: &[Value]) -> Value {
        (self.0)(value, args)
    }

    fn on_action(&self, _hook: &str, _args: &[Value]) {}
}
