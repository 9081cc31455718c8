//! # Countdown Timer
//!
//! Named, shareable countdown timers for Rust, built on top of Tokio.
//!
//! Each timer counts down from a configured duration in fixed tick
//! increments, exposes lifecycle controls (start, pause, resume, stop,
//! destroy), and broadcasts notifications on every tick and status
//! transition. Timers are created through a factory, registered by name,
//! and can be looked up and observed by any other component.
//!
//! ## Features
//!
//! - **Asynchronous**: cooperative tick loops on the Tokio runtime, one
//!   cancellable task per running timer
//! - **Named Timers**: create, look up, and destroy timers by string name
//!   through an injectable registry
//! - **Lifecycle State Machine**: start, pause, resume, stop, and destroy
//!   with no-op semantics for transitions that do not apply
//! - **Broadcast Notifications**: per-tick remaining time, status changes,
//!   and completion, delivered in order to current subscribers
//! - **Auto-Destroy**: timers can deregister and release themselves on
//!   natural completion
//! - **Pluggable Gating**: timer creation restricted to privileged
//!   execution contexts via a predicate trait
//!
//! ## Quick Start
//!
//! ```rust
//! use countdown_timer::{Privileged, TimerConfig, TimerFactory, TimerRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = TimerRegistry::new();
//!     let factory = TimerFactory::new("my_factory", registry.clone(), Arc::new(Privileged))
//!         .unit(Duration::from_millis(10));
//!
//!     // Three time units, ticking every unit.
//!     let timer = factory
//!         .create_timer(TimerConfig::new("countdown", 3).auto_destroy(false))
//!         .await?;
//!
//!     let mut ticks = timer.on_tick();
//!     let mut completed = timer.on_completed();
//!
//!     timer.start();
//!     for _ in 0..4 {
//!         let remaining = ticks.recv().await?;
//!         println!("remaining: {remaining}");
//!     }
//!     completed.recv().await?;
//!
//!     timer.destroy();
//!     assert!(registry.lookup("countdown").is_none());
//!     Ok(())
//! }
//! ```

mod context;
mod error;
mod factory;
mod registry;
mod timer;

pub use context::{
    gate, CreationContext, DiscoveryChannel, GateFn, InMemoryDiscovery, Privileged, Unprivileged,
};
pub use error::TimerError;
pub use factory::{TimerConfig, TimerFactory, SHARED_NAMESPACE};
pub use registry::TimerRegistry;
pub use timer::{Timer, TimerStatus};

// Re-export commonly used types for convenience
pub use std::time::Duration;
