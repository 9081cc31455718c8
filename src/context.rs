//! External collaborators of the factory: the creation-permission gate and
//! the cross-process discovery channel.
//!
//! Both are deliberately thin traits. The core only needs "may this context
//! create timers?" and "expose a discoverable endpoint in a shared
//! namespace"; how a host environment answers is its own business.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::TimerError;

/// Predicate deciding whether the current execution context may create
/// timers. Typically "am I the authoritative/server process".
pub trait CreationContext: Send + Sync {
    fn can_create_timers(&self) -> bool;
}

/// Context that always permits creation, for authoritative processes and
/// tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Privileged;

impl CreationContext for Privileged {
    fn can_create_timers(&self) -> bool {
        true
    }
}

/// Context that never permits creation, for display/client processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unprivileged;

impl CreationContext for Unprivileged {
    fn can_create_timers(&self) -> bool {
        false
    }
}

/// Adapter turning any `Fn() -> bool` predicate into a creation gate.
pub struct GateFn<F>(F);

/// Wrap a closure as a [`CreationContext`].
pub fn gate<F>(predicate: F) -> GateFn<F>
where
    F: Fn() -> bool + Send + Sync,
{
    GateFn(predicate)
}

impl<F> CreationContext for GateFn<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn can_create_timers(&self) -> bool {
        (self.0)()
    }
}

/// Locates-or-creates a named endpoint inside a well-known shared
/// namespace, so other processes can discover the timer factory.
#[async_trait]
pub trait DiscoveryChannel: Send + Sync {
    async fn expose(&self, namespace: &str, endpoint: &str) -> Result<(), TimerError>;
}

/// In-process stand-in for a shared namespace. Good enough for
/// single-process deployments and tests; real hosts plug in their own
/// transport.
#[derive(Debug, Default)]
pub struct InMemoryDiscovery {
    namespaces: Mutex<HashMap<String, HashSet<String>>>,
}

impl InMemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashSet<String>>> {
        self.namespaces.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `endpoint` has been exposed under `namespace`.
    pub fn is_exposed(&self, namespace: &str, endpoint: &str) -> bool {
        self.lock()
            .get(namespace)
            .is_some_and(|links| links.contains(endpoint))
    }
}

#[async_trait]
impl DiscoveryChannel for InMemoryDiscovery {
    async fn expose(&self, namespace: &str, endpoint: &str) -> Result<(), TimerError> {
        let mut namespaces = self.lock();
        let links = namespaces.entry(namespace.to_string()).or_default();
        if links.insert(endpoint.to_string()) {
            log::debug!("exposed endpoint '{}' in namespace '{}'", endpoint, namespace);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_creation_contexts() {
        assert!(!gate(|| false).can_create_timers());
        assert!(gate(|| true).can_create_timers());
        assert!(Privileged.can_create_timers());
        assert!(!Unprivileged.can_create_timers());
    }

    #[tokio::test]
    async fn expose_is_idempotent() {
        let discovery = InMemoryDiscovery::new();
        assert!(!discovery.is_exposed("ns", "factory"));

        discovery.expose("ns", "factory").await.unwrap();
        discovery.expose("ns", "factory").await.unwrap();

        assert!(discovery.is_exposed("ns", "factory"));
        assert!(!discovery.is_exposed("ns", "other"));
    }
}
