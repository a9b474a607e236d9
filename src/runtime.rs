use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::alarm::scheduler::run_scheduler_loop;
use crate::alarm::store::AlarmStore;
use crate::notify::NotificationSink;
use crate::time_provider::TimeProvider;
use crate::timer::{Countdown, run_countdown_loop};

/// Upper bound on how long a poller sleeps before rechecking the running flag.
const SHUTDOWN_SLICE: Duration = Duration::from_millis(100);

/// Owns the shared alarm store and countdown plus the two poller threads.
/// Built once at startup; `shutdown` (or drop) stops and joins the pollers.
pub struct ClockRuntime {
    store: Arc<AlarmStore>,
    countdown: Arc<Countdown>,
    running: Arc<AtomicBool>,
    pollers: Vec<JoinHandle<()>>,
}

impl ClockRuntime {
    pub fn start(
        store: AlarmStore,
        clock: Arc<dyn TimeProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let mut runtime = Self {
            store: Arc::new(store),
            countdown: Arc::new(Countdown::new()),
            running: Arc::new(AtomicBool::new(true)),
            pollers: Vec::with_capacity(2),
        };

        let scheduler = {
            let store = Arc::clone(&runtime.store);
            let sink = Arc::clone(&sink);
            let running = Arc::clone(&runtime.running);
            thread::Builder::new()
                .name("alarm-scheduler".to_string())
                .spawn(move || run_scheduler_loop(store, clock, sink, running))
                .context("failed to spawn alarm scheduler thread")?
        };
        runtime.pollers.push(scheduler);

        let countdown = {
            let countdown = Arc::clone(&runtime.countdown);
            let running = Arc::clone(&runtime.running);
            thread::Builder::new()
                .name("countdown".to_string())
                .spawn(move || run_countdown_loop(countdown, sink, running))
                .context("failed to spawn countdown thread")?
        };
        runtime.pollers.push(countdown);

        Ok(runtime)
    }

    pub fn store(&self) -> &Arc<AlarmStore> {
        &self.store
    }

    pub fn countdown(&self) -> &Arc<Countdown> {
        &self.countdown
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for poller in self.pollers.drain(..) {
            let name = poller.thread().name().unwrap_or("poller").to_string();
            if poller.join().is_err() {
                warn!("{name} thread panicked");
            } else {
                debug!("{name} thread joined");
            }
        }
    }
}

impl Drop for ClockRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleeps until `deadline`, waking at least every [`SHUTDOWN_SLICE`] to
/// check `running`. Returns `false` if shutdown was requested.
pub(crate) fn sleep_until(deadline: Instant, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(deadline.saturating_duration_since(now).min(SHUTDOWN_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use tempfile::tempdir;

    use super::*;
    use crate::alarm::model::Day;
    use crate::alarm::sound::{SoundCatalog, SoundSelection};
    use crate::notify::{ChannelSink, ClockEvent};
    use crate::time_provider::testing::{ManualTimeProvider, monday_at};

    #[test]
    fn sleep_until_returns_early_on_shutdown() {
        let running = AtomicBool::new(false);
        let started = Instant::now();
        assert!(!sleep_until(started + Duration::from_secs(30), &running));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_until_reaches_deadline() {
        let running = AtomicBool::new(true);
        let deadline = Instant::now() + Duration::from_millis(150);
        assert!(sleep_until(deadline, &running));
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn runtime_delivers_events_and_shuts_down() {
        let dir = tempdir().expect("tempdir");
        let store = AlarmStore::open(dir.path().join("alarms.json"), SoundCatalog::new("sounds"));
        store
            .create(7, 0, "Wake Up", &[Day::Monday], &SoundSelection::DefaultBeep)
            .expect("valid alarm");

        let (tx, rx) = mpsc::channel();
        let clock = Arc::new(ManualTimeProvider::new(monday_at(7, 0, 0)));
        let mut runtime =
            ClockRuntime::start(store, clock, Arc::new(ChannelSink::new(tx))).expect("start");
        runtime.countdown().start(0, 1).expect("countdown");

        let mut events = Vec::new();
        while events.len() < 2 {
            let event = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("event before timeout");
            events.push(event);
        }
        assert!(events.contains(&ClockEvent::TimerExpired));
        let fired: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                ClockEvent::AlarmFired(alarm) => Some(alarm.label.as_str()),
                ClockEvent::TimerExpired => None,
            })
            .collect();
        assert_eq!(fired, vec!["Wake Up"]);

        assert!(runtime.running.load(Ordering::SeqCst));
        runtime.shutdown();
        assert!(!runtime.running.load(Ordering::SeqCst));
        assert!(runtime.pollers.is_empty());
        assert_eq!(runtime.store().len(), 1);
    }
}
