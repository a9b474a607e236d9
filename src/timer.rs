//! Countdown timer state machine.
//!
//! ```text
//!            start(m, s)             pause()
//!   Idle ───────────────► Running ──────────► Paused
//!    ▲                     │  ▲                 │
//!    │  expiry / stop()    │  └──── resume() ───┘
//!    └─────────────────────┘                    │
//!    ▲            stop()                        │
//!    └──────────────────────────────────────────┘
//! ```
//!
//! The poller calls [`Countdown::tick`] several times a second. Each call
//! performs every one-second decrement whose deadline has passed, so pausing
//! takes effect immediately and a late wake-up does not stretch the
//! countdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::alarm::model::ValidationError;
use crate::notify::NotificationSink;
use crate::runtime::sleep_until;

const DECREMENT_STEP: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownSnapshot {
    pub phase: TimerPhase,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
}

impl CountdownSnapshot {
    /// Elapsed share of the countdown in `0.0..=1.0`; zero while idle.
    pub fn progress(&self) -> f32 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        let elapsed = self.total_seconds.saturating_sub(self.remaining_seconds);
        (elapsed as f32 / self.total_seconds as f32).clamp(0.0, 1.0)
    }

    pub fn display(&self) -> String {
        let minutes = self.remaining_seconds / 60;
        let seconds = self.remaining_seconds % 60;
        format!("{minutes:02}:{seconds:02}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Idle or paused; nothing to do.
    Inactive,
    Counting { remaining_seconds: u32 },
    /// Reached zero on this tick. The countdown is already back to idle.
    Expired,
}

#[derive(Debug)]
struct CountdownState {
    phase: TimerPhase,
    remaining: u32,
    total: u32,
    next_decrement: Option<Instant>,
    /// Time left until the next decrement, kept across a pause.
    carried: Duration,
}

impl CountdownState {
    fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            remaining: 0,
            total: 0,
            next_decrement: None,
            carried: Duration::ZERO,
        }
    }
}

pub struct Countdown {
    state: Mutex<CountdownState>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CountdownState::idle()),
        }
    }

    pub fn start(&self, minutes: u32, seconds: u32) -> Result<(), ValidationError> {
        self.start_at(minutes, seconds, Instant::now())
    }

    pub fn pause(&self) -> bool {
        self.pause_at(Instant::now())
    }

    pub fn resume(&self) -> bool {
        self.resume_at(Instant::now())
    }

    pub fn stop(&self) {
        let mut state = self.lock();
        if state.phase != TimerPhase::Idle {
            info!("countdown stopped with {}s remaining", state.remaining);
        }
        *state = CountdownState::idle();
    }

    pub fn tick(&self) -> CountdownTick {
        self.tick_at(Instant::now())
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        let state = self.lock();
        CountdownSnapshot {
            phase: state.phase,
            remaining_seconds: state.remaining,
            total_seconds: state.total,
        }
    }

    pub(crate) fn start_at(
        &self,
        minutes: u32,
        seconds: u32,
        now: Instant,
    ) -> Result<(), ValidationError> {
        let mut state = self.lock();
        if state.phase != TimerPhase::Idle {
            return Err(ValidationError::TimerBusy);
        }
        let total = minutes.saturating_mul(60).saturating_add(seconds);
        if total == 0 {
            return Err(ValidationError::NonPositiveDuration);
        }

        *state = CountdownState {
            phase: TimerPhase::Running,
            remaining: total,
            total,
            next_decrement: Some(now + DECREMENT_STEP),
            carried: Duration::ZERO,
        };
        info!("countdown started for {total}s");
        Ok(())
    }

    pub(crate) fn pause_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if state.phase != TimerPhase::Running {
            return false;
        }
        state.carried = state
            .next_decrement
            .take()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(DECREMENT_STEP);
        state.phase = TimerPhase::Paused;
        info!("countdown paused at {}s", state.remaining);
        true
    }

    pub(crate) fn resume_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if state.phase != TimerPhase::Paused {
            return false;
        }
        state.next_decrement = Some(now + state.carried);
        state.carried = Duration::ZERO;
        state.phase = TimerPhase::Running;
        info!("countdown resumed at {}s", state.remaining);
        true
    }

    pub(crate) fn tick_at(&self, now: Instant) -> CountdownTick {
        let mut state = self.lock();
        if state.phase != TimerPhase::Running {
            return CountdownTick::Inactive;
        }
        let Some(mut deadline) = state.next_decrement else {
            return CountdownTick::Inactive;
        };

        while state.remaining > 0 && now >= deadline {
            state.remaining -= 1;
            deadline += DECREMENT_STEP;
        }
        state.next_decrement = Some(deadline);

        if state.remaining == 0 {
            info!("countdown of {}s finished", state.total);
            *state = CountdownState::idle();
            return CountdownTick::Expired;
        }
        CountdownTick::Counting {
            remaining_seconds: state.remaining,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CountdownState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body of the countdown poller thread. Runs until `running` is cleared.
pub fn run_countdown_loop(
    countdown: Arc<Countdown>,
    sink: Arc<dyn NotificationSink>,
    running: Arc<AtomicBool>,
) {
    debug!("countdown poller started");
    while running.load(Ordering::SeqCst) {
        if countdown.tick() == CountdownTick::Expired {
            sink.on_timer_expired();
        }
        if !sleep_until(Instant::now() + POLL_INTERVAL, &running) {
            break;
        }
    }
    debug!("countdown poller stopped");
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::notify::ClockEvent;
    use crate::notify::testing::RecordingSink;

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn zero_duration_is_rejected_and_stays_idle() {
        let countdown = Countdown::new();
        assert_eq!(
            countdown.start(0, 0),
            Err(ValidationError::NonPositiveDuration)
        );
        let snapshot = countdown.snapshot();
        assert_eq!(snapshot.phase, TimerPhase::Idle);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(snapshot.total_seconds, 0);
    }

    #[test]
    fn start_is_only_valid_from_idle() {
        let countdown = Countdown::new();
        countdown.start(1, 0).expect("first start");
        assert_eq!(countdown.start(2, 0), Err(ValidationError::TimerBusy));
        assert!(countdown.pause());
        assert_eq!(countdown.start(2, 0), Err(ValidationError::TimerBusy));
        assert_eq!(countdown.snapshot().total_seconds, 60);
    }

    #[test]
    fn counts_down_once_per_second_and_expires() {
        let countdown = Countdown::new();
        let t0 = Instant::now();
        countdown.start_at(0, 3, t0).expect("start");

        assert_eq!(
            countdown.tick_at(t0 + secs(0.5)),
            CountdownTick::Counting { remaining_seconds: 3 }
        );
        assert_eq!(
            countdown.tick_at(t0 + secs(1.0)),
            CountdownTick::Counting { remaining_seconds: 2 }
        );
        assert_eq!(
            countdown.tick_at(t0 + secs(2.1)),
            CountdownTick::Counting { remaining_seconds: 1 }
        );
        assert_eq!(countdown.tick_at(t0 + secs(3.0)), CountdownTick::Expired);
        assert_eq!(countdown.snapshot().phase, TimerPhase::Idle);
        assert_eq!(countdown.tick_at(t0 + secs(4.0)), CountdownTick::Inactive);
    }

    #[test]
    fn late_tick_catches_up() {
        let countdown = Countdown::new();
        let t0 = Instant::now();
        countdown.start_at(0, 10, t0).expect("start");
        assert_eq!(
            countdown.tick_at(t0 + secs(4.2)),
            CountdownTick::Counting { remaining_seconds: 6 }
        );
    }

    #[test]
    fn pause_and_resume_match_uninterrupted_run() {
        let countdown = Countdown::new();
        let t0 = Instant::now();
        countdown.start_at(5, 0, t0).expect("start");

        countdown.tick_at(t0 + secs(10.0));
        assert!(countdown.pause_at(t0 + secs(10.4)));
        assert_eq!(countdown.tick_at(t0 + secs(50.0)), CountdownTick::Inactive);
        assert_eq!(countdown.snapshot().remaining_seconds, 290);
        assert_eq!(countdown.snapshot().phase, TimerPhase::Paused);

        let resumed = t0 + secs(100.0);
        assert!(countdown.resume_at(resumed));
        // 10.4s ran before the pause, so 289.6s of running time remain
        assert_eq!(
            countdown.tick_at(resumed + secs(288.0)),
            CountdownTick::Counting { remaining_seconds: 2 }
        );
        assert_eq!(
            countdown.tick_at(resumed + secs(289.5)),
            CountdownTick::Counting { remaining_seconds: 1 }
        );
        assert_eq!(countdown.tick_at(resumed + secs(289.7)), CountdownTick::Expired);
    }

    #[test]
    fn pause_and_resume_are_phase_checked() {
        let countdown = Countdown::new();
        assert!(!countdown.pause());
        assert!(!countdown.resume());
        countdown.start(0, 30).expect("start");
        assert!(!countdown.resume());
        assert!(countdown.pause());
        assert!(!countdown.pause());
        assert!(countdown.resume());
        assert_eq!(countdown.snapshot().phase, TimerPhase::Running);
    }

    #[test]
    fn stop_resets_from_any_phase() {
        let countdown = Countdown::new();
        countdown.start(1, 5).expect("start");
        countdown.pause();
        countdown.stop();
        let snapshot = countdown.snapshot();
        assert_eq!(snapshot.phase, TimerPhase::Idle);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(snapshot.total_seconds, 0);
        countdown.start(0, 1).expect("restart after stop");
    }

    #[test]
    fn snapshot_reports_progress_and_display() {
        let snapshot = CountdownSnapshot {
            phase: TimerPhase::Running,
            remaining_seconds: 75,
            total_seconds: 100,
        };
        assert_eq!(snapshot.display(), "01:15");
        assert!((snapshot.progress() - 0.25).abs() < f32::EPSILON);

        let idle = CountdownSnapshot {
            phase: TimerPhase::Idle,
            remaining_seconds: 0,
            total_seconds: 0,
        };
        assert_eq!(idle.progress(), 0.0);
        assert_eq!(idle.display(), "00:00");
    }

    #[test]
    fn poller_reports_expiry_once() {
        let countdown = Arc::new(Countdown::new());
        let sink = Arc::new(RecordingSink::default());
        let running = Arc::new(AtomicBool::new(true));
        countdown.start(0, 1).expect("start");

        let handle = {
            let countdown = Arc::clone(&countdown);
            let sink: Arc<dyn NotificationSink> = sink.clone();
            let running = Arc::clone(&running);
            thread::spawn(move || run_countdown_loop(countdown, sink, running))
        };
        thread::sleep(Duration::from_millis(1_800));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("countdown thread");

        assert_eq!(sink.events(), vec![ClockEvent::TimerExpired]);
        assert_eq!(countdown.snapshot().phase, TimerPhase::Idle);
    }
}
