//! Refresh-driven elapsed time for running animations.
//!
//! A [`FrameClock`] fans every display refresh out to its registered
//! consumers. Each consumer measures time from the first refresh it sees, so
//! a consumer attached mid-session still starts at `0.0`.
//!
//! ```text
//!   RefreshDriver ──tick──▶ FrameClock::deliver(instant)
//!                                 │  (lock: pick consumer, compute elapsed)
//!                                 ▼
//!                         on_tick(elapsed)   (lock released)
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::{debug, trace};

type TickCallback = Box<dyn FnMut(f32) + Send>;

struct Consumer {
    origin: Option<Instant>,
    last: Option<Instant>,
    on_tick: TickCallback,
}

impl Consumer {
    /// Elapsed seconds for `instant`, or `None` when it is not later than
    /// the previous delivery.
    fn advance(&mut self, instant: Instant) -> Option<f32> {
        match (self.origin, self.last) {
            (Some(origin), Some(last)) => {
                if instant <= last {
                    return None;
                }
                self.last = Some(instant);
                Some(instant.duration_since(origin).as_secs_f32())
            }
            _ => {
                self.origin = Some(instant);
                self.last = Some(instant);
                Some(0.0)
            }
        }
    }
}

#[derive(Default)]
struct ConsumerTable {
    next_id: u64,
    idle: HashMap<u64, Consumer>,
    /// Consumers whose callback is running right now.
    in_flight: HashSet<u64>,
    /// In-flight consumers stopped while their callback ran.
    cancelled: HashSet<u64>,
}

#[derive(Default)]
struct ClockShared {
    table: Mutex<ConsumerTable>,
}

impl ClockShared {
    fn lock(&self) -> MutexGuard<'_, ConsumerTable> {
        // A panicking consumer callback never holds the lock, so the table
        // is consistent even when poisoned.
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn deregister(&self, id: u64) {
        let removed = {
            let mut table = self.lock();
            let removed = table.idle.remove(&id);
            if removed.is_none() && table.in_flight.contains(&id) {
                table.cancelled.insert(id);
            }
            removed
        };
        drop(removed);
    }
}

/// Source of per-consumer elapsed time, advanced once per refresh.
#[derive(Clone, Default)]
pub struct FrameClock {
    shared: Arc<ClockShared>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `on_tick` to receive elapsed seconds on every later refresh.
    ///
    /// The first value delivered is `0.0`. Dropping the returned registration
    /// deregisters the consumer.
    pub fn start<F>(&self, on_tick: F) -> FrameRegistration
    where
        F: FnMut(f32) + Send + 'static,
    {
        let mut table = self.shared.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.idle.insert(
            id,
            Consumer {
                origin: None,
                last: None,
                on_tick: Box::new(on_tick),
            },
        );
        debug!(consumer = id, "frame clock consumer registered");
        FrameRegistration {
            id,
            clock: Arc::downgrade(&self.shared),
        }
    }

    /// Delivers one refresh to every registered consumer.
    ///
    /// Callbacks run without the clock's lock held, so a consumer may stop
    /// itself (or start others) from inside its callback.
    pub fn deliver(&self, refresh: Instant) {
        let ids: Vec<u64> = self.shared.lock().idle.keys().copied().collect();
        for id in ids {
            let taken = {
                let mut table = self.shared.lock();
                match table.idle.remove(&id) {
                    Some(mut consumer) => match consumer.advance(refresh) {
                        Some(elapsed) => {
                            table.in_flight.insert(id);
                            Some((consumer, elapsed))
                        }
                        None => {
                            table.idle.insert(id, consumer);
                            None
                        }
                    },
                    None => None,
                }
            };
            let Some((mut consumer, elapsed)) = taken else {
                continue;
            };

            trace!(consumer = id, elapsed, "frame tick");
            (consumer.on_tick)(elapsed);

            let mut table = self.shared.lock();
            table.in_flight.remove(&id);
            if table.cancelled.remove(&id) {
                drop(table);
                drop(consumer);
            } else {
                table.idle.insert(id, consumer);
            }
        }
    }

    /// Deregisters every consumer, as when the refresh source goes away.
    pub fn disconnect(&self) {
        let dropped = {
            let mut table = self.shared.lock();
            let in_flight: Vec<u64> = table.in_flight.iter().copied().collect();
            table.cancelled.extend(in_flight);
            std::mem::take(&mut table.idle)
        };
        debug!(consumers = dropped.len(), "frame clock disconnected");
    }

    /// Number of registered consumers, including ones mid-callback.
    pub fn consumer_count(&self) -> usize {
        let table = self.shared.lock();
        table.idle.len() + table.in_flight.len() - table.cancelled.len()
    }
}

/// Handle for one registered consumer. Dropping it stops delivery.
pub struct FrameRegistration {
    id: u64,
    clock: Weak<ClockShared>,
}

impl FrameRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops delivery. A tick already in progress may still complete.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for FrameRegistration {
    fn drop(&mut self) {
        if let Some(shared) = self.clock.upgrade() {
            shared.deregister(self.id);
            debug!(consumer = self.id, "frame clock consumer stopped");
        }
    }
}

/// Background thread that stands in for the display's vsync, calling
/// [`FrameClock::deliver`] at a fixed cadence.
pub struct RefreshDriver {
    clock: FrameClock,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshDriver {
    pub fn spawn(clock: FrameClock, fps: f32) -> Result<Self> {
        let interval = refresh_interval(fps)?;
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let ticking = clock.clone();
        let handle = thread::Builder::new()
            .name("refresh-driver".into())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> instant => match instant {
                            Ok(instant) => ticking.deliver(instant),
                            Err(_) => break,
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
            })
            .map_err(|err| anyhow!("failed to spawn refresh driver thread: {err}"))?;
        debug!(fps, interval_ms = interval.as_secs_f64() * 1000.0, "refresh driver started");
        Ok(Self {
            clock,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stops refreshing and disconnects every consumer of the clock.
    pub fn stop(mut self) {
        self.shutdown_now();
    }

    fn shutdown_now(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("refresh driver thread panicked");
            }
            self.clock.disconnect();
        }
    }
}

impl Drop for RefreshDriver {
    fn drop(&mut self) {
        self.shutdown_now();
    }
}

/// Interval between refreshes for a frames-per-second rate.
pub fn refresh_interval(fps: f32) -> Result<Duration> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(anyhow!("refresh rate must be a positive number, got {fps}"));
    }
    Ok(Duration::from_secs_f64(1.0 / f64::from(fps)))
}
