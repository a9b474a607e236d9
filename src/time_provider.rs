use chrono::{Local, NaiveDateTime};

/// Source of local wall-clock time for the pollers.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}


#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use chrono::{Datelike, Weekday};

    use super::testing::{ManualTimeProvider, monday_at};
    use super::*;

    #[test]
    fn system_provider_moves_forward() {
        let provider = SystemTimeProvider;
        let first = provider.now();
        thread::sleep(Duration::from_millis(2));
        let second = provider.now();
        assert!(second >= first);
    }

    #[test]
    fn manual_provider_reports_what_it_was_set_to() {
        let provider = ManualTimeProvider::new(monday_at(7, 0, 0));
        assert_eq!(provider.now().weekday(), Weekday::Mon);
        provider.set(monday_at(7, 0, 1));
        assert_eq!(provider.now(), monday_at(7, 0, 1));
    }
}
