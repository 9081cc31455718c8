use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::timer::Timer;

/// Name-to-timer lookup table.
///
/// Explicitly owned rather than process-global: everything holding a clone
/// shares the same table, and tests can run fully isolated registries. A
/// timer stays registered from the factory call that created it until its
/// destroy completes.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    timers: Arc<Mutex<HashMap<String, Timer>>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Timer>> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert `timer` under `name`. Last write wins: an existing entry with
    /// the same name is silently replaced and becomes unreachable by name.
    /// The replaced timer is marked as no longer registered, so a later
    /// destroy on it cannot evict the live entry.
    pub(crate) fn register(&self, name: &str, timer: Timer) {
        let replaced = self.lock().insert(name.to_string(), timer);
        if let Some(old) = replaced {
            old.clear_registered();
            log::warn!("timer '{}' replaced an existing registry entry", name);
        }
    }

    /// Remove the entry for `name`, if any.
    pub(crate) fn unregister(&self, name: &str) {
        if self.lock().remove(name).is_some() {
            log::debug!("timer '{}' removed from registry", name);
        }
    }

    /// Look up a timer by name, returning a handle to it.
    pub fn lookup(&self, name: &str) -> Option<Timer> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn detached_timer(registry: &TimerRegistry, name: &str, duration: i64) -> Timer {
        Timer::new(
            name.to_string(),
            duration,
            1,
            Duration::from_millis(10),
            false,
            16,
            registry.clone(),
        )
    }

    #[test]
    fn register_lookup_unregister_roundtrip() {
        let registry = TimerRegistry::new();
        assert!(registry.is_empty());

        let timer = detached_timer(&registry, "a", 3);
        registry.register("a", timer);

        assert!(registry.contains("a"));
        assert_eq!(registry.lookup("a").unwrap().duration(), 3);
        assert!(registry.lookup("b").is_none());

        registry.unregister("a");
        assert!(registry.lookup("a").is_none());

        // Unregistering an absent name is a no-op.
        registry.unregister("a");
        assert!(registry.is_empty());
    }

    #[test]
    fn same_name_overwrites_previous_entry() {
        let registry = TimerRegistry::new();
        let first = detached_timer(&registry, "dup", 5);
        let second = detached_timer(&registry, "dup", 9);

        registry.register("dup", first);
        registry.register("dup", second);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("dup").unwrap().duration(), 9);
    }

    #[test]
    fn overwrite_clears_the_replaced_timers_registration() {
        let registry = TimerRegistry::new();
        let first = detached_timer(&registry, "dup", 5);
        registry.register("dup", first.clone());
        first.mark_registered();

        let second = detached_timer(&registry, "dup", 9);
        registry.register("dup", second.clone());
        second.mark_registered();

        // Destroying the evicted timer leaves the live entry alone.
        first.destroy();
        assert_eq!(registry.lookup("dup").unwrap().duration(), 9);

        second.destroy();
        assert!(registry.is_empty());
    }

    #[test]
    fn clones_share_the_same_table() {
        let registry = TimerRegistry::new();
        let view = registry.clone();

        let timer = detached_timer(&registry, "shared", 2);
        registry.register("shared", timer);

        assert!(view.contains("shared"));
        view.unregister("shared");
        assert!(registry.is_empty());
    }
}
