use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use log::{debug, info};

use crate::alarm::model::{AlarmRecord, Day};
use crate::alarm::store::AlarmStore;
use crate::notify::NotificationSink;
use crate::runtime::sleep_until;
use crate::time_provider::TimeProvider;

const TICK: Duration = Duration::from_secs(1);
/// Longest gap between ticks that is still walked boundary by boundary.
const MAX_CATCH_UP_SECS: i64 = 90;

/// Decides which alarms are due on each once-per-second tick.
///
/// An alarm fires on the minute boundary (second 0) that matches its day and
/// `(hour, minute)`. The scheduler remembers the previous tick, so a late
/// wake-up that skips second 0 by a few seconds still fires exactly once,
/// and re-ticking the same instant fires nothing.
#[derive(Debug, Default)]
pub struct AlarmScheduler {
    last_tick: Option<NaiveDateTime>,
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now: NaiveDateTime, alarms: &[AlarmRecord]) -> Vec<AlarmRecord> {
        let now = now.with_nanosecond(0).unwrap_or(now);
        let boundaries = minute_boundaries(self.last_tick, now);
        self.last_tick = Some(now);

        if boundaries.len() > 1 {
            debug!("catching up {} minute boundaries", boundaries.len());
        }

        let mut due = Vec::new();
        for boundary in boundaries {
            due.extend(
                alarms
                    .iter()
                    .filter(|alarm| is_due(alarm, boundary))
                    .cloned(),
            );
        }
        due
    }
}

pub fn is_due(alarm: &AlarmRecord, at: NaiveDateTime) -> bool {
    alarm.active
        && at.second() == 0
        && u32::from(alarm.hour) == at.hour()
        && u32::from(alarm.minute) == at.minute()
        && alarm.occurs_on(Day::from_chrono(at.weekday()))
}

fn minute_boundaries(previous: Option<NaiveDateTime>, now: NaiveDateTime) -> Vec<NaiveDateTime> {
    let only_now = || {
        if now.second() == 0 {
            vec![now]
        } else {
            Vec::new()
        }
    };

    let Some(previous) = previous else {
        return only_now();
    };
    if previous == now {
        return Vec::new();
    }
    let gap = now - previous;
    if gap < TimeDelta::zero() || gap > TimeDelta::seconds(MAX_CATCH_UP_SECS) {
        return only_now();
    }

    let mut boundaries = Vec::new();
    let Some(mut boundary) = previous
        .with_second(0)
        .map(|minute| minute + TimeDelta::minutes(1))
    else {
        return only_now();
    };
    while boundary <= now {
        boundaries.push(boundary);
        boundary += TimeDelta::minutes(1);
    }
    boundaries
}

/// Earliest upcoming fire time among active alarms, looking up to a week
/// ahead.
pub fn next_occurrence(
    alarms: &[AlarmRecord],
    now: NaiveDateTime,
) -> Option<(NaiveDateTime, &AlarmRecord)> {
    alarms
        .iter()
        .filter(|alarm| alarm.active)
        .filter_map(|alarm| next_occurrence_for_alarm(alarm, now).map(|at| (at, alarm)))
        .min_by_key(|(at, _)| *at)
}

fn next_occurrence_for_alarm(alarm: &AlarmRecord, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(u32::from(alarm.hour), u32::from(alarm.minute), 0)?;
    for day_offset in 0_u64..8 {
        let date = now.date().checked_add_days(Days::new(day_offset))?;
        if !alarm.occurs_on(Day::from_chrono(date.weekday())) {
            continue;
        }
        let candidate = date.and_time(time);
        if candidate >= now {
            return Some(candidate);
        }
    }
    None
}

/// Body of the scheduler poller thread. Runs until `running` is cleared.
pub fn run_scheduler_loop(
    store: Arc<AlarmStore>,
    clock: Arc<dyn TimeProvider>,
    sink: Arc<dyn NotificationSink>,
    running: Arc<AtomicBool>,
) {
    debug!("alarm scheduler started");
    let mut scheduler = AlarmScheduler::new();
    let mut next_tick = Instant::now();
    while running.load(Ordering::SeqCst) {
        let alarms = store.active_alarms();
        for alarm in scheduler.tick(clock.now(), &alarms) {
            info!("alarm #{} '{}' fired at {}", alarm.id, alarm.label, alarm.time_text());
            sink.on_alarm_fired(&alarm);
        }

        next_tick += TICK;
        let now = Instant::now();
        if next_tick < now {
            next_tick = now + TICK;
        }
        if !sleep_until(next_tick, &running) {
            break;
        }
    }
    debug!("alarm scheduler stopped");
}
