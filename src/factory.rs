use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::context::{CreationContext, DiscoveryChannel};
use crate::error::TimerError;
use crate::registry::TimerRegistry;
use crate::timer::Timer;

/// Well-known namespace under which factories expose their discovery
/// endpoint.
pub const SHARED_NAMESPACE: &str = "countdown-timers";

const DEFAULT_EVENT_BUFFER: usize = 64;

/// Creation input for [`TimerFactory::create_timer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    name: String,
    duration: u64,
    tick_interval: Option<u64>,
    auto_destroy: Option<bool>,
}

impl TimerConfig {
    /// A countdown of `duration` time units, ticking every unit, that
    /// destroys itself on completion. Use the builder methods to override.
    pub fn new(name: impl Into<String>, duration: u64) -> Self {
        Self {
            name: name.into(),
            duration,
            tick_interval: None,
            auto_destroy: None,
        }
    }

    /// Time units per tick. Zero is treated as unspecified and falls back
    /// to 1.
    pub fn tick_interval(mut self, ticks: u64) -> Self {
        self.tick_interval = Some(ticks);
        self
    }

    /// Whether the timer destroys itself on natural completion. Defaults
    /// to true; an explicit `false` is honored.
    pub fn auto_destroy(mut self, auto: bool) -> Self {
        self.auto_destroy = Some(auto);
        self
    }
}

/// Builds, validates, and registers timers.
///
/// The factory is the only way to create a [`Timer`]. It checks the
/// creation gate, applies config defaults, exposes the factory's discovery
/// endpoint on first use, and registers the finished timer so it can be
/// looked up by name.
pub struct TimerFactory {
    /// Factory instance name, used for logging and as the discovery
    /// endpoint name.
    name: String,
    registry: TimerRegistry,
    context: Arc<dyn CreationContext>,
    discovery: Option<Arc<dyn DiscoveryChannel>>,
    exposed: OnceCell<()>,
    /// Wall-clock length of one abstract time unit.
    unit: Duration,
    event_buffer: usize,
}

impl TimerFactory {
    pub fn new(
        name: impl Into<String>,
        registry: TimerRegistry,
        context: Arc<dyn CreationContext>,
    ) -> Self {
        Self {
            name: name.into(),
            registry,
            context,
            discovery: None,
            exposed: OnceCell::new(),
            unit: Duration::from_secs(1),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Override the wall-clock length of one time unit (default 1 s).
    pub fn unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Override the per-channel notification buffer (default 64). Slow
    /// subscribers past this many undelivered events start lagging.
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Attach a discovery channel; the factory's endpoint is exposed on the
    /// first successful creation.
    pub fn discovery(mut self, channel: Arc<dyn DiscoveryChannel>) -> Self {
        self.discovery = Some(channel);
        self
    }

    /// Create and register a timer. Fails without side effects when the
    /// execution context forbids creation or the config is invalid; a
    /// failed call never leaves a partially registered timer behind.
    pub async fn create_timer(&self, config: TimerConfig) -> Result<Timer, TimerError> {
        if !self.context.can_create_timers() {
            return Err(TimerError::ContextDenied);
        }

        let duration = i64::try_from(config.duration)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| TimerError::invalid_config("duration must be a positive time span"))?;
        let tick_interval = match config.tick_interval {
            None | Some(0) => 1,
            Some(ticks) => i64::try_from(ticks)
                .map_err(|_| TimerError::invalid_config("tick interval is too large"))?,
        };
        let auto_destroy = config.auto_destroy.unwrap_or(true);

        self.ensure_exposed().await?;

        let tick_wait = self
            .unit
            .saturating_mul(u32::try_from(tick_interval).unwrap_or(u32::MAX));
        let timer = Timer::new(
            config.name.clone(),
            duration,
            tick_interval,
            tick_wait,
            auto_destroy,
            self.event_buffer,
            self.registry.clone(),
        );
        self.registry.register(&config.name, timer.clone());
        timer.mark_registered();

        log::info!(
            "factory '{}' created timer '{}' ({} units, ticking every {})",
            self.name,
            config.name,
            duration,
            tick_interval
        );
        Ok(timer)
    }

    /// Expose the factory's endpoint in the shared namespace exactly once,
    /// lazily on first use.
    async fn ensure_exposed(&self) -> Result<(), TimerError> {
        let Some(discovery) = &self.discovery else {
            return Ok(());
        };
        self.exposed
            .get_or_try_init(|| discovery.expose(SHARED_NAMESPACE, &self.name))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{gate, InMemoryDiscovery, Privileged, Unprivileged};
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn creation_is_denied_outside_privileged_contexts() {
        let registry = TimerRegistry::new();
        let factory = TimerFactory::new("client", registry.clone(), Arc::new(Unprivileged));

        let result = factory.create_timer(TimerConfig::new("t", 5)).await;
        assert!(matches!(result, Err(TimerError::ContextDenied)));
        // Nothing was partially registered.
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn closure_gates_are_consulted_per_call() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let registry = TimerRegistry::new();
        let allowed = Arc::new(AtomicBool::new(true));
        let flag = allowed.clone();
        let factory = TimerFactory::new(
            "gated",
            registry.clone(),
            Arc::new(gate(move || flag.load(Ordering::SeqCst))),
        );

        tokio_test::assert_ok!(factory.create_timer(TimerConfig::new("a", 5)).await);

        allowed.store(false, Ordering::SeqCst);
        let result = factory.create_timer(TimerConfig::new("b", 5)).await;
        assert!(matches!(result, Err(TimerError::ContextDenied)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn zero_duration_is_rejected() {
        let registry = TimerRegistry::new();
        let factory = TimerFactory::new("validator", registry.clone(), Arc::new(Privileged));

        let result = factory.create_timer(TimerConfig::new("t", 0)).await;
        assert!(matches!(result, Err(TimerError::InvalidConfig { .. })));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn zero_tick_interval_defaults_to_one() {
        let registry = TimerRegistry::new();
        let factory = TimerFactory::new("validator", registry.clone(), Arc::new(Privileged));

        let timer = factory
            .create_timer(TimerConfig::new("explicit-zero", 5).tick_interval(0))
            .await
            .unwrap();
        assert_eq!(timer.tick_interval(), 1);

        let timer = factory
            .create_timer(TimerConfig::new("unspecified", 5))
            .await
            .unwrap();
        assert_eq!(timer.tick_interval(), 1);
    }

    #[tokio::test]
    async fn defaults_applied_to_fresh_timer() {
        let registry = TimerRegistry::new();
        let factory = TimerFactory::new("defaults", registry.clone(), Arc::new(Privileged));

        let timer = factory
            .create_timer(TimerConfig::new("t", 7).tick_interval(2))
            .await
            .unwrap();

        assert_eq!(timer.name(), "t");
        assert_eq!(timer.duration(), 7);
        assert_eq!(timer.tick_interval(), 2);
        assert_eq!(timer.remaining_time(), 7);
        assert!(timer.auto_destroy());
        assert!(registry.contains("t"));
    }

    #[tokio::test]
    async fn same_name_creation_replaces_the_registry_entry() {
        let registry = TimerRegistry::new();
        let factory = TimerFactory::new("collisions", registry.clone(), Arc::new(Privileged));

        factory
            .create_timer(TimerConfig::new("dup", 5))
            .await
            .unwrap();
        factory
            .create_timer(TimerConfig::new("dup", 9))
            .await
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("dup").unwrap().duration(), 9);
    }

    #[tokio::test]
    async fn discovery_endpoint_is_exposed_once_on_first_use() {
        let registry = TimerRegistry::new();
        let discovery = Arc::new(InMemoryDiscovery::new());
        let factory = TimerFactory::new("shared", registry.clone(), Arc::new(Privileged))
            .discovery(discovery.clone());

        assert!(!discovery.is_exposed(SHARED_NAMESPACE, "shared"));

        factory
            .create_timer(TimerConfig::new("a", 5))
            .await
            .unwrap();
        assert!(discovery.is_exposed(SHARED_NAMESPACE, "shared"));

        // Subsequent creations reuse the exposed endpoint.
        factory
            .create_timer(TimerConfig::new("b", 5))
            .await
            .unwrap();
        assert!(discovery.is_exposed(SHARED_NAMESPACE, "shared"));
    }
}
