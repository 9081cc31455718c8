use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::TimerRegistry;

/// Lifecycle state of a [`Timer`].
///
/// `Completed` is terminal for the tick loop, but a timer may be reused:
/// `stop` resets the remaining time and a later `start` counts down again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
    Completed,
}

/// The one scheduled tick loop a timer may own at a time.
struct TickTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-timer notification channels. Dropped as a unit on destroy, which
/// closes every subscriber's receiver.
struct Channels {
    tick: broadcast::Sender<i64>,
    status: broadcast::Sender<TimerStatus>,
    completed: broadcast::Sender<()>,
}

impl Channels {
    fn new(capacity: usize) -> Self {
        let (tick, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        let (completed, _) = broadcast::channel(capacity);
        Self {
            tick,
            status,
            completed,
        }
    }
}

struct TimerInner {
    name: String,
    duration: i64,
    tick_interval: i64,
    /// Wall-clock length of one tick: `tick_interval` times the factory's
    /// time unit.
    tick_wait: Duration,
    remaining_time: i64,
    auto_destroy: bool,
    status: TimerStatus,
    /// Whether destroy must remove this timer from the registry.
    /// Duplicated timers are never registered.
    registered: bool,
    active_task: Option<TickTask>,
    event_buffer: usize,
    channels: Option<Channels>,
}

impl TimerInner {
    fn cancel_active_task(&mut self) {
        if let Some(task) = self.active_task.take() {
            task.token.cancel();
            task.handle.abort();
        }
    }

    fn publish_tick(&self, remaining: i64) {
        if let Some(ch) = &self.channels {
            let _ = ch.tick.send(remaining);
        }
    }

    fn publish_status(&self, status: TimerStatus) {
        if let Some(ch) = &self.channels {
            let _ = ch.status.send(status);
        }
    }

    fn publish_completed(&self) {
        if let Some(ch) = &self.channels {
            let _ = ch.completed.send(());
        }
    }
}

impl Drop for TimerInner {
    fn drop(&mut self) {
        self.cancel_active_task();
    }
}

/// A named countdown timer.
///
/// `Timer` is a cloneable handle; all clones (including the one held by the
/// registry) drive the same countdown. State is mutated only through the
/// lifecycle methods, each of which cancels the in-flight tick loop before
/// the status change becomes observable, so a stale loop can never fire
/// ticks or completion after `pause`/`stop`/`destroy` returns.
///
/// Lifecycle methods spawn onto the ambient Tokio runtime and must be
/// called from within one.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<Mutex<TimerInner>>,
    registry: TimerRegistry,
}

fn lock(inner: &Mutex<TimerInner>) -> MutexGuard<'_, TimerInner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

fn closed_receiver<T: Clone>() -> broadcast::Receiver<T> {
    let (tx, rx) = broadcast::channel(1);
    drop(tx);
    rx
}

impl Timer {
    pub(crate) fn new(
        name: String,
        duration: i64,
        tick_interval: i64,
        tick_wait: Duration,
        auto_destroy: bool,
        event_buffer: usize,
        registry: TimerRegistry,
    ) -> Self {
        let inner = TimerInner {
            name,
            duration,
            tick_interval,
            tick_wait,
            remaining_time: duration,
            auto_destroy,
            status: TimerStatus::Stopped,
            registered: false,
            active_task: None,
            event_buffer,
            channels: Some(Channels::new(event_buffer)),
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            registry,
        }
    }

    pub(crate) fn mark_registered(&self) {
        self.lock().registered = true;
    }

    /// Called by the registry when this timer's entry is overwritten by a
    /// same-named newcomer. Once evicted, this timer's destroy must not
    /// touch the registry, or it would remove the live replacement.
    pub(crate) fn clear_registered(&self) {
        self.lock().registered = false;
    }

    fn lock(&self) -> MutexGuard<'_, TimerInner> {
        lock(&self.inner)
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn duration(&self) -> i64 {
        self.lock().duration
    }

    pub fn tick_interval(&self) -> i64 {
        self.lock().tick_interval
    }

    /// Remaining time in ticks' worth of time units. May be zero or
    /// negative after completion when the interval does not divide the
    /// duration evenly.
    pub fn remaining_time(&self) -> i64 {
        self.lock().remaining_time
    }

    pub fn auto_destroy(&self) -> bool {
        self.lock().auto_destroy
    }

    pub fn status(&self) -> TimerStatus {
        self.lock().status
    }

    /// Subscribe to per-tick notifications carrying the remaining time as
    /// it was *before* the decrement. Only events published after
    /// subscribing are delivered. A destroyed timer yields a receiver that
    /// reports closed immediately.
    pub fn on_tick(&self) -> broadcast::Receiver<i64> {
        match &self.lock().channels {
            Some(ch) => ch.tick.subscribe(),
            None => closed_receiver(),
        }
    }

    /// Subscribe to status transitions, carrying the new status.
    pub fn on_status_changed(&self) -> broadcast::Receiver<TimerStatus> {
        match &self.lock().channels {
            Some(ch) => ch.status.subscribe(),
            None => closed_receiver(),
        }
    }

    /// Subscribe to the completion notification, published once per natural
    /// countdown exhaustion.
    pub fn on_completed(&self) -> broadcast::Receiver<()> {
        match &self.lock().channels {
            Some(ch) => ch.completed.subscribe(),
            None => closed_receiver(),
        }
    }

    /// Begin (or restart) the countdown from whatever `remaining_time`
    /// currently holds. No-op if already running.
    pub fn start(&self) {
        let mut t = self.lock();
        if t.status == TimerStatus::Running {
            return;
        }
        t.cancel_active_task();
        t.status = TimerStatus::Running;
        self.spawn_tick_loop(&mut t);
        t.publish_status(TimerStatus::Running);
        log::debug!("timer '{}' started, {} remaining", t.name, t.remaining_time);
    }

    /// Suspend the countdown, keeping `remaining_time`. No-op unless
    /// running.
    pub fn pause(&self) {
        let mut t = self.lock();
        if t.status != TimerStatus::Running {
            return;
        }
        t.cancel_active_task();
        t.status = TimerStatus::Paused;
        t.publish_status(TimerStatus::Paused);
        log::debug!("timer '{}' paused, {} remaining", t.name, t.remaining_time);
    }

    /// Continue a paused countdown from where it left off. No-op unless
    /// paused.
    pub fn resume(&self) {
        let mut t = self.lock();
        if t.status != TimerStatus::Paused {
            return;
        }
        t.cancel_active_task();
        t.status = TimerStatus::Running;
        self.spawn_tick_loop(&mut t);
        t.publish_status(TimerStatus::Running);
        log::debug!("timer '{}' resumed, {} remaining", t.name, t.remaining_time);
    }

    /// Halt the countdown and reset `remaining_time` to the full duration.
    /// No-op if already stopped.
    pub fn stop(&self) {
        let mut t = self.lock();
        if t.status == TimerStatus::Stopped {
            return;
        }
        t.cancel_active_task();
        t.status = TimerStatus::Stopped;
        t.remaining_time = t.duration;
        t.publish_status(TimerStatus::Stopped);
        log::debug!("timer '{}' stopped", t.name);
    }

    /// Tear the timer down: cancel any scheduled work, release the
    /// notification channels (closing all subscribers), and remove the
    /// timer from the registry. Safe to call repeatedly.
    pub fn destroy(&self) {
        let (name, was_registered) = {
            let mut t = self.lock();
            t.cancel_active_task();
            t.status = TimerStatus::Stopped;
            t.channels = None;
            (t.name.clone(), std::mem::take(&mut t.registered))
        };
        if was_registered {
            self.registry.unregister(&name);
            log::info!("timer '{}' destroyed", name);
        }
    }

    /// Create an independent timer seeded from this one's configuration and
    /// current countdown progress. The copy has fresh notification
    /// channels, no scheduled work, status `Stopped`, and is *not*
    /// registered; destroying it never touches the original's registry
    /// entry.
    pub fn duplicate(&self) -> Timer {
        let t = self.lock();
        let copy = Timer::new(
            t.name.clone(),
            t.duration,
            t.tick_interval,
            t.tick_wait,
            t.auto_destroy,
            t.event_buffer,
            self.registry.clone(),
        );
        copy.lock().remaining_time = t.remaining_time;
        copy
    }

    fn spawn_tick_loop(&self, t: &mut TimerInner) {
        let token = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.inner),
            self.registry.clone(),
            token.clone(),
        ));
        t.active_task = Some(TickTask { token, handle });
    }
}

/// The cooperative countdown driven by `start`/`resume`.
///
/// Every wakeup re-checks the cancellation token and the status under the
/// timer's mutex before publishing anything; a loop that lost a race with a
/// lifecycle transition exits without side effects.
async fn tick_loop(inner: Arc<Mutex<TimerInner>>, registry: TimerRegistry, token: CancellationToken) {
    loop {
        let wait = {
            let t = lock(&inner);
            if token.is_cancelled() || t.status != TimerStatus::Running {
                return;
            }
            if t.remaining_time <= 0 {
                break;
            }
            t.tick_wait
        };

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        let mut t = lock(&inner);
        if token.is_cancelled() || t.status != TimerStatus::Running {
            return;
        }
        t.publish_tick(t.remaining_time);
        t.remaining_time -= t.tick_interval;
    }

    // Natural exhaustion. The final tick deliberately reports the raw
    // remaining value, which is zero or negative when the interval does not
    // divide the duration evenly.
    let auto_destroy = {
        let mut t = lock(&inner);
        if token.is_cancelled() || t.status != TimerStatus::Running {
            return;
        }
        t.status = TimerStatus::Completed;
        // Clear our own handle so an auto-destroy below does not abort the
        // task that is performing it.
        t.active_task = None;
        t.publish_completed();
        t.publish_status(TimerStatus::Completed);
        t.publish_tick(t.remaining_time);
        log::debug!("timer '{}' completed", t.name);
        t.auto_destroy
    };

    if auto_destroy {
        Timer { inner, registry }.destroy();
    }
}
