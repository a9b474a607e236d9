use chrono::NaiveDateTime;
use eframe::egui::{self, Color32, ProgressBar, RichText, Ui};

use crate::alarm::model::{AlarmRecord, Day};
use crate::timer::{CountdownSnapshot, TimerPhase};

pub const ACCENT: Color32 = Color32::from_rgb(96, 228, 206);
pub const CLOCK: Color32 = Color32::from_rgb(255, 214, 117);
pub const MUTED: Color32 = Color32::from_rgb(169, 188, 209);
pub const GOOD: Color32 = Color32::from_rgb(108, 228, 138);
pub const WARNING: Color32 = Color32::from_rgb(255, 183, 95);
pub const DANGER: Color32 = Color32::from_rgb(255, 124, 124);
pub const DANGER_FILL: Color32 = Color32::from_rgb(51, 20, 24);

pub fn clock_text(now: NaiveDateTime) -> String {
    now.format("%H:%M:%S").to_string()
}

pub fn date_text(now: NaiveDateTime) -> String {
    now.format("%A, %B %d, %Y").to_string()
}

/// "Today 07:30 · Wake Up", or the weekday name when the alarm is not today.
pub fn next_alarm_text(next: Option<(NaiveDateTime, &AlarmRecord)>, now: NaiveDateTime) -> String {
    let Some((at, alarm)) = next else {
        return "No upcoming alarms".to_string();
    };
    let day = if at.date() == now.date() {
        "Today".to_string()
    } else if Some(at.date()) == now.date().succ_opt() {
        "Tomorrow".to_string()
    } else {
        at.format("%A").to_string()
    };
    format!("{day} {} · {}", at.format("%H:%M"), alarm.label)
}

/// Second line of the alarm window: time, repeat days and the sound.
pub fn ringing_alarm_detail(alarm: &AlarmRecord) -> String {
    format!(
        "{} · {}\n♪ {}",
        alarm.time_text(),
        alarm.days_text(),
        alarm.sound
    )
}

pub fn phase_text(phase: TimerPhase) -> (&'static str, Color32) {
    match phase {
        TimerPhase::Idle => ("Ready", MUTED),
        TimerPhase::Running => ("Running", GOOD),
        TimerPhase::Paused => ("Paused", WARNING),
    }
}

pub fn selected_days(flags: &[bool; 7]) -> Vec<Day> {
    Day::ALL
        .iter()
        .zip(flags)
        .filter_map(|(day, on)| on.then_some(*day))
        .collect()
}

pub fn section_heading(ui: &mut Ui, text: &str) {
    ui.heading(RichText::new(text).color(ACCENT).strong());
    ui.add_space(4.0);
}

pub fn stat_card(ui: &mut Ui, title: &str, value: &str, color: Color32) {
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(10))
        .show(ui, |ui| {
            ui.set_min_width(150.0);
            ui.vertical(|ui| {
                ui.label(RichText::new(title).color(MUTED));
                ui.label(RichText::new(value).size(22.0).color(color).strong());
            });
        });
}

pub fn day_toggles(ui: &mut Ui, flags: &mut [bool; 7]) {
    ui.horizontal_wrapped(|ui| {
        for (day, on) in Day::ALL.iter().zip(flags.iter_mut()) {
            ui.toggle_value(on, day.short_name());
        }
    });
}

pub fn sound_picker(ui: &mut Ui, id_salt: &str, selected: &mut String, labels: &[&str]) {
    egui::ComboBox::from_id_salt(id_salt)
        .selected_text(selected.as_str())
        .width(220.0)
        .show_ui(ui, |ui| {
            for label in labels {
                ui.selectable_value(&mut *selected, (*label).to_string(), *label);
            }
        });
}

pub fn countdown_dial(ui: &mut Ui, snapshot: &CountdownSnapshot) {
    let (phase, color) = phase_text(snapshot.phase);
    ui.vertical_centered(|ui| {
        ui.label(
            RichText::new(snapshot.display())
                .size(64.0)
                .monospace()
                .color(CLOCK)
                .strong(),
        );
        ui.label(RichText::new(phase).color(color).strong());
        ui.add_space(6.0);
        ui.add(
            ProgressBar::new(snapshot.progress())
                .desired_width(ui.available_width().min(420.0))
                .show_percentage(),
        );
    });
}
