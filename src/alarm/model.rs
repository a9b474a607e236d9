use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::alarm::sound::DEFAULT_BEEP_LABEL;

/// Bad user input. Surfaced to the user; never changes any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a label for the alarm")]
    EmptyLabel,
    #[error("please select at least one day")]
    NoDays,
    #[error("hour {0} is out of range, expected 0-23")]
    HourOutOfRange(u8),
    #[error("minute {0} is out of range, expected 0-59")]
    MinuteOutOfRange(u8),
    #[error("please set a valid duration")]
    NonPositiveDuration,
    #[error("a countdown is already active; stop it first")]
    TimerBusy,
    #[error("unknown catalog track '{0}'")]
    UnknownTrack(String),
    #[error("no alarm ids left; delete the alarm with the highest id first")]
    IdsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn from_chrono(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }

    pub fn short_name(self) -> &'static str {
        &self.name()[..3]
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One persisted alarm. Field names are the on-disk JSON keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub id: u64,
    pub hour: u8,
    pub minute: u8,
    pub label: String,
    pub days: Vec<Day>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default)]
    pub sound_path: String,
}

impl AlarmRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(self.hour, self.minute, &self.label, &self.days)
    }

    pub fn occurs_on(&self, day: Day) -> bool {
        self.days.contains(&day)
    }

    pub fn sound_file(&self) -> Option<&Path> {
        if self.sound_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.sound_path))
        }
    }

    pub fn time_text(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    pub fn days_text(&self) -> String {
        self.days
            .iter()
            .map(|day| day.short_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AlarmRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} [{}] {}, sound: {}",
            self.id,
            self.time_text(),
            self.label,
            self.days_text(),
            if self.active { "on" } else { "off" },
            self.sound
        )
    }
}

pub(crate) fn validate_fields(
    hour: u8,
    minute: u8,
    label: &str,
    days: &[Day],
) -> Result<(), ValidationError> {
    if hour > 23 {
        return Err(ValidationError::HourOutOfRange(hour));
    }
    if minute > 59 {
        return Err(ValidationError::MinuteOutOfRange(minute));
    }
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    if days.is_empty() {
        return Err(ValidationError::NoDays);
    }
    Ok(())
}

pub fn load_alarm_file(path: &Path) -> Result<Vec<AlarmRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read alarm file {}", path.display()))?;
    parse_alarm_file_text(&content)
}

/// Parses the flat JSON array. Records that fail to decode or validate are
/// skipped with a warning; a document that is not an array is an error.
pub fn parse_alarm_file_text(content: &str) -> Result<Vec<AlarmRecord>> {
    let raw = serde_json::from_str::<Value>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;
    let Value::Array(entries) = raw else {
        return Err(anyhow!("expected a JSON array of alarms"));
    };

    let mut alarms = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        let alarm = match serde_json::from_value::<AlarmRecord>(entry) {
            Ok(alarm) => alarm,
            Err(err) => {
                warn!("skipping alarm entry {position}: {err}");
                continue;
            }
        };
        if let Err(err) = alarm.validate() {
            warn!("skipping alarm #{} '{}': {err}", alarm.id, alarm.label);
            continue;
        }
        alarms.push(alarm);
    }
    Ok(alarms)
}

pub fn save_alarm_file(path: &Path, alarms: &[AlarmRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create directory {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(alarms)?;
    fs::write(path, format!("{text}\n"))
        .with_context(|| format!("unable to write alarm file {}", path.display()))?;
    Ok(())
}

fn default_active() -> bool {
    true
}

fn default_sound() -> String {
    DEFAULT_BEEP_LABEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_in_any_key_order() {
        let json = r#"
[
  {
    "sound_path": "",
    "days": ["Monday", "Friday"],
    "label": "Wake Up",
    "minute": 30,
    "hour": 6,
    "id": 1,
    "active": true,
    "sound": "Default Beep"
  },
  {
    "id": 2,
    "hour": 22,
    "minute": 0,
    "label": "Sleep",
    "days": ["Sunday"],
    "active": false,
    "sound": "Soja",
    "sound_path": "assets/sounds/soja.mp3"
  }
]
"#;
        let alarms = parse_alarm_file_text(json).expect("valid file");
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].days, vec![Day::Monday, Day::Friday]);
        assert_eq!(alarms[0].time_text(), "06:30");
        assert!(alarms[0].sound_file().is_none());
        assert!(!alarms[1].active);
        assert_eq!(
            alarms[1].sound_file(),
            Some(Path::new("assets/sounds/soja.mp3"))
        );
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json = r#"[{"id": 4, "hour": 7, "minute": 5, "label": "Gym", "days": ["Tuesday"]}]"#;
        let alarms = parse_alarm_file_text(json).expect("valid file");
        assert!(alarms[0].active);
        assert_eq!(alarms[0].sound, "Default Beep");
        assert_eq!(alarms[0].sound_path, "");
    }

    #[test]
    fn skips_invalid_records_and_keeps_the_rest() {
        let json = r#"
[
  {"id": 1, "hour": 25, "minute": 0, "label": "bad hour", "days": ["Monday"]},
  {"id": 2, "hour": 8, "minute": 0, "label": "", "days": ["Monday"]},
  {"id": 3, "hour": 8, "minute": 0, "label": "no days", "days": []},
  {"id": 4, "hour": 8, "minute": 0, "label": "bad day", "days": ["Funday"]},
  {"id": 5, "hour": 8, "minute": 15, "label": "ok", "days": ["Monday"]}
]
"#;
        let alarms = parse_alarm_file_text(json).expect("array parses");
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].id, 5);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_alarm_file_text("{ not-valid-json ").expect_err("should fail");
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn rejects_non_array_document() {
        let err = parse_alarm_file_text(r#"{"alarms": []}"#).expect_err("should fail");
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn writes_full_weekday_names() {
        let alarm = AlarmRecord {
            id: 9,
            hour: 7,
            minute: 0,
            label: "Wake Up".to_string(),
            days: vec![Day::Wednesday],
            active: true,
            sound: "Default Beep".to_string(),
            sound_path: String::new(),
        };
        let text = serde_json::to_string(&[alarm]).expect("serialize");
        assert!(text.contains(r#""days":["Wednesday"]"#));
        assert!(text.contains(r#""sound_path":"""#));
    }

    #[test]
    fn validation_reports_first_problem() {
        assert_eq!(
            validate_fields(24, 0, "x", &[Day::Monday]),
            Err(ValidationError::HourOutOfRange(24))
        );
        assert_eq!(
            validate_fields(7, 60, "x", &[Day::Monday]),
            Err(ValidationError::MinuteOutOfRange(60))
        );
        assert_eq!(
            validate_fields(7, 0, "   ", &[Day::Monday]),
            Err(ValidationError::EmptyLabel)
        );
        assert_eq!(validate_fields(7, 0, "x", &[]), Err(ValidationError::NoDays));
        assert!(validate_fields(23, 59, "x", &[Day::Sunday]).is_ok());
    }

    #[test]
    fn day_names_follow_chrono_weekdays() {
        assert_eq!(Day::from_chrono(Weekday::Mon), Day::Monday);
        assert_eq!(Day::from_chrono(Weekday::Sun).name(), "Sunday");
        assert_eq!(Day::Thursday.short_name(), "Thu");
    }
}
