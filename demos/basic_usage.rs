//! Basic usage example for countdown timers

use countdown_timer::{Duration, Privileged, TimerConfig, TimerFactory, TimerRegistry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let registry = TimerRegistry::new();
    let factory = TimerFactory::new("example_factory", registry.clone(), Arc::new(Privileged))
        .unit(Duration::from_millis(200));

    // A five-unit countdown that sticks around after completing.
    let timer = factory
        .create_timer(TimerConfig::new("demo", 5).auto_destroy(false))
        .await?;

    let mut ticks = timer.on_tick();
    let mut statuses = timer.on_status_changed();
    let mut completed = timer.on_completed();

    timer.start();
    println!("Timer started! Counting down...");

    // Pause briefly mid-countdown to show continuation.
    let remaining = ticks.recv().await?;
    println!("tick: {} remaining", remaining);
    timer.pause();
    println!("Paused at {} remaining", timer.remaining_time());
    tokio::time::sleep(Duration::from_millis(500)).await;
    timer.resume();
    println!("Resumed");

    // Drain the rest of the countdown.
    loop {
        tokio::select! {
            tick = ticks.recv() => {
                println!("tick: {} remaining", tick?);
            }
            _ = completed.recv() => {
                println!("Timer completed!");
                break;
            }
        }
    }

    while let Ok(status) = statuses.try_recv() {
        println!("status changed: {:?}", status);
    }

    // Look the timer up by name, like any other component would.
    let found = registry.lookup("demo").expect("timer should still be registered");
    println!("'{}' still registered, status {:?}", found.name(), found.status());

    timer.destroy();
    println!("Destroyed: lookup now fails: {}", registry.lookup("demo").is_none());
    Ok(())
}
