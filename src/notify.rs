use std::sync::mpsc::Sender;

use log::debug;

use crate::alarm::model::AlarmRecord;

/// Receives fire events from the pollers. Called on a poller thread, so an
/// implementation must hand any presentation work over to the UI context.
pub trait NotificationSink: Send + Sync {
    fn on_alarm_fired(&self, alarm: &AlarmRecord);
    fn on_timer_expired(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    AlarmFired(AlarmRecord),
    TimerExpired,
}

type Waker = Box<dyn Fn() + Send + Sync>;

/// Forwards events over a channel drained by the UI, then wakes the UI so it
/// drains promptly instead of on its next scheduled repaint.
pub struct ChannelSink {
    sender: Sender<ClockEvent>,
    waker: Option<Waker>,
}

impl ChannelSink {
    pub fn new(sender: Sender<ClockEvent>) -> Self {
        Self {
            sender,
            waker: None,
        }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Box::new(waker));
        self
    }

    fn forward(&self, event: ClockEvent) {
        if self.sender.send(event).is_err() {
            debug!("notification dropped, receiver is gone");
            return;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

impl NotificationSink for ChannelSink {
    fn on_alarm_fired(&self, alarm: &AlarmRecord) {
        self.forward(ClockEvent::AlarmFired(alarm.clone()));
    }

    fn on_timer_expired(&self) {
        self.forward(ClockEvent::TimerExpired);
    }
}
