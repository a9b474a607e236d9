use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDateTime};
use eframe::egui::{
    self, Align2, Color32, RichText, ScrollArea, TextEdit, TopBottomPanel, Ui,
};
use log::info;

use crate::alarm::model::AlarmRecord;
use crate::alarm::scheduler::next_occurrence;
use crate::alarm::sound::{CUSTOM_SOUND_LABEL, DEFAULT_BEEP_LABEL, SoundSelection};
use crate::alarm::store::AlarmStore;
use crate::audio::AlarmPlayer;
use crate::notify::{ChannelSink, ClockEvent};
use crate::runtime::ClockRuntime;
use crate::time_provider::SystemTimeProvider;
use crate::timer::TimerPhase;
use crate::ui::render;

const DEFAULT_LABEL: &str = "Wake Up";
const IDLE_REPAINT: Duration = Duration::from_millis(250);

pub fn run_gui(store: AlarmStore, volume: f32) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Alarm Clock")
            .with_inner_size([760.0, 580.0])
            .with_min_inner_size([560.0, 460.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Alarm Clock",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            let (sender, events) = mpsc::channel();
            let ctx = cc.egui_ctx.clone();
            let sink = ChannelSink::new(sender).with_waker(move || ctx.request_repaint());
            let runtime =
                ClockRuntime::start(store, Arc::new(SystemTimeProvider), Arc::new(sink))?;
            Ok(Box::new(AlarmClockApp::new(runtime, events, volume)))
        }),
    )
    .map_err(|err| anyhow!("failed to launch alarm clock window: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(Color32::from_rgb(226, 234, 246));
    visuals.panel_fill = Color32::from_rgb(8, 16, 26);
    visuals.window_fill = Color32::from_rgb(12, 20, 32);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(16, 24, 38);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(26, 42, 62);
    visuals.widgets.active.bg_fill = Color32::from_rgb(34, 60, 88);
    visuals.selection.bg_fill = Color32::from_rgb(43, 148, 178);
    ctx.set_visuals(visuals);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Home,
    CreateAlarm,
    ActiveAlarms,
    Countdown,
}

impl View {
    const ALL: [View; 4] = [
        View::Home,
        View::CreateAlarm,
        View::ActiveAlarms,
        View::Countdown,
    ];

    fn title(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::CreateAlarm => "Create Alarm",
            View::ActiveAlarms => "Active Alarms",
            View::Countdown => "Countdown",
        }
    }
}

/// Sound picker state shared by the alarm form and the countdown form.
#[derive(Debug, Clone)]
struct SoundForm {
    label: String,
    custom_path: String,
}

impl Default for SoundForm {
    fn default() -> Self {
        Self {
            label: DEFAULT_BEEP_LABEL.to_string(),
            custom_path: String::new(),
        }
    }
}

impl SoundForm {
    fn selection(&self, store: &AlarmStore) -> SoundSelection {
        let custom = self.custom_path.trim();
        let custom = (!custom.is_empty()).then(|| Path::new(custom));
        SoundSelection::from_label(&self.label, store.catalog(), custom)
    }

    fn resolve(&self, store: &AlarmStore) -> Option<PathBuf> {
        store
            .catalog()
            .resolve(&self.selection(store))
            .ok()
            .flatten()
    }
}

#[derive(Debug, Clone)]
struct AlarmForm {
    hour: u8,
    minute: u8,
    label: String,
    days: [bool; 7],
    sound: SoundForm,
}

impl Default for AlarmForm {
    fn default() -> Self {
        Self {
            hour: 7,
            minute: 0,
            label: DEFAULT_LABEL.to_string(),
            days: [false; 7],
            sound: SoundForm::default(),
        }
    }
}

impl AlarmForm {
    fn reset_after_create(&mut self) {
        self.label = DEFAULT_LABEL.to_string();
        self.days = [false; 7];
    }
}

#[derive(Debug, Clone)]
struct TimerForm {
    minutes: u32,
    seconds: u32,
    sound: SoundForm,
}

impl Default for TimerForm {
    fn default() -> Self {
        Self {
            minutes: 5,
            seconds: 0,
            sound: SoundForm::default(),
        }
    }
}

#[derive(Debug, Clone)]
enum Ringing {
    Alarm(AlarmRecord),
    Timer,
}

struct AlarmClockApp {
    runtime: ClockRuntime,
    events: Receiver<ClockEvent>,
    player: AlarmPlayer,
    view: View,
    alarm_form: AlarmForm,
    timer_form: TimerForm,
    /// Sound captured when the running countdown was started.
    timer_sound: Option<PathBuf>,
    ringing: VecDeque<Ringing>,
    pending_delete: Option<(usize, AlarmRecord)>,
    status_message: Option<(String, Color32, Instant)>,
}

impl AlarmClockApp {
    fn new(runtime: ClockRuntime, events: Receiver<ClockEvent>, volume: f32) -> Self {
        Self {
            runtime,
            events,
            player: AlarmPlayer::new(volume),
            view: View::Home,
            alarm_form: AlarmForm::default(),
            timer_form: TimerForm::default(),
            timer_sound: None,
            ringing: VecDeque::new(),
            pending_delete: None,
            status_message: None,
        }
    }

    fn store(&self) -> &AlarmStore {
        self.runtime.store()
    }

    fn set_status(&mut self, text: impl Into<String>, color: Color32, ttl: Duration) {
        self.status_message = Some((text.into(), color, Instant::now() + ttl));
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let ringing = match event {
                ClockEvent::AlarmFired(alarm) => Ringing::Alarm(alarm),
                ClockEvent::TimerExpired => Ringing::Timer,
            };
            self.ringing.push_back(ringing);
            if self.ringing.len() == 1 {
                self.play_front();
            }
        }
    }

    fn play_front(&mut self) {
        let sound = match self.ringing.front() {
            Some(Ringing::Alarm(alarm)) => alarm.sound_file().map(Path::to_path_buf),
            Some(Ringing::Timer) => self.timer_sound.clone(),
            None => return,
        };
        self.player.play_looping(sound.as_deref());
    }

    fn dismiss_front(&mut self) {
        self.player.stop();
        if let Some(dismissed) = self.ringing.pop_front() {
            match dismissed {
                Ringing::Alarm(alarm) => info!("alarm #{} dismissed", alarm.id),
                Ringing::Timer => info!("countdown alert dismissed"),
            }
        }
        self.play_front();
    }

    fn show_header(&mut self, ui: &mut Ui, now: NaiveDateTime) {
        ui.horizontal_wrapped(|ui| {
            ui.label(
                RichText::new("Alarm Clock")
                    .size(24.0)
                    .color(render::ACCENT)
                    .strong(),
            );
            ui.separator();
            ui.label(
                RichText::new(render::clock_text(now))
                    .size(28.0)
                    .color(render::CLOCK)
                    .strong(),
            );
            ui.separator();
            ui.label(
                RichText::new(render::date_text(now))
                    .size(16.0)
                    .color(render::MUTED),
            );
        });
        ui.horizontal(|ui| {
            for view in View::ALL {
                ui.selectable_value(&mut self.view, view, view.title());
            }
        });
        if let Some((msg, color, _)) = &self.status_message {
            ui.label(RichText::new(msg).color(*color).strong());
        }
    }

    fn show_footer(&mut self, ui: &mut Ui) {
        ui.horizontal_wrapped(|ui| {
            let mut volume = self.player.volume();
            if ui
                .add(egui::Slider::new(&mut volume, 0.0..=1.0).text("Volume"))
                .changed()
            {
                self.player.set_volume(volume);
            }
            if self.player.is_playing()
                && self.ringing.is_empty()
                && ui.button("Stop sound").clicked()
            {
                self.player.stop();
            }
            ui.separator();
            ui.label(
                RichText::new(format!(
                    "Alarms: {} | Sounds: {}",
                    self.store().path().display(),
                    self.store().catalog().sounds_dir().display()
                ))
                .color(render::MUTED),
            );
        });
    }

    fn show_home(&mut self, ui: &mut Ui, now: NaiveDateTime) {
        render::section_heading(ui, "Overview");
        let alarms = self.store().alarms();
        let active = alarms.iter().filter(|alarm| alarm.active).count();
        let next = render::next_alarm_text(next_occurrence(&alarms, now), now);
        let countdown = self.runtime.countdown().snapshot();

        ui.horizontal_wrapped(|ui| {
            render::stat_card(ui, "Total alarms", &alarms.len().to_string(), render::ACCENT);
            render::stat_card(ui, "Active alarms", &active.to_string(), render::GOOD);
            render::stat_card(ui, "Next alarm", &next, render::CLOCK);
            if countdown.phase != TimerPhase::Idle {
                let (phase, color) = render::phase_text(countdown.phase);
                render::stat_card(
                    ui,
                    &format!("Countdown ({phase})"),
                    &countdown.display(),
                    color,
                );
            }
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("New alarm").clicked() {
                self.view = View::CreateAlarm;
            }
            if ui.button("Manage alarms").clicked() {
                self.view = View::ActiveAlarms;
            }
            if ui.button("Countdown").clicked() {
                self.view = View::Countdown;
            }
        });
    }

    fn show_create_alarm(&mut self, ui: &mut Ui) {
        render::section_heading(ui, "Create Alarm");
        let labels: Vec<String> = self
            .store()
            .catalog()
            .picker_labels()
            .into_iter()
            .map(str::to_string)
            .collect();

        egui::Grid::new("alarm_form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Time");
                ui.horizontal(|ui| {
                    ui.add(
                        egui::DragValue::new(&mut self.alarm_form.hour)
                            .range(0..=23)
                            .custom_formatter(|value, _| format!("{value:02}")),
                    );
                    ui.label(":");
                    ui.add(
                        egui::DragValue::new(&mut self.alarm_form.minute)
                            .range(0..=59)
                            .custom_formatter(|value, _| format!("{value:02}")),
                    );
                });
                ui.end_row();

                ui.label("Label");
                ui.add(TextEdit::singleline(&mut self.alarm_form.label).desired_width(240.0));
                ui.end_row();

                ui.label("Repeat on");
                render::day_toggles(ui, &mut self.alarm_form.days);
                ui.end_row();
            });

        ui.add_space(6.0);
        let preview = show_sound_form(ui, "alarm_sound", &mut self.alarm_form.sound, &labels);
        if preview {
            let sound = self.alarm_form.sound.resolve(self.store());
            self.player.preview(sound.as_deref());
        }

        ui.add_space(10.0);
        if ui
            .add(
                egui::Button::new(RichText::new("Save alarm").strong())
                    .min_size(egui::vec2(140.0, 28.0)),
            )
            .clicked()
        {
            self.create_alarm_from_form();
        }
    }

    fn create_alarm_from_form(&mut self) {
        let form = &self.alarm_form;
        let days = render::selected_days(&form.days);
        let selection = form.sound.selection(self.store());
        let result = self
            .store()
            .create(form.hour, form.minute, &form.label, &days, &selection);
        match result {
            Ok(alarm) => {
                self.set_status(
                    format!("Alarm '{}' set for {}.", alarm.label, alarm.time_text()),
                    render::GOOD,
                    Duration::from_secs(3),
                );
                self.alarm_form.reset_after_create();
            }
            Err(err) => self.set_status(
                format!("Cannot save alarm: {err}"),
                render::WARNING,
                Duration::from_secs(4),
            ),
        }
    }

    fn show_active_alarms(&mut self, ui: &mut Ui) {
        render::section_heading(ui, "Active Alarms");
        let alarms = self.store().alarms();
        if alarms.is_empty() {
            ui.label(
                RichText::new("No alarms set yet.")
                    .color(render::WARNING)
                    .strong(),
            );
            return;
        }

        let mut toggle_index: Option<usize> = None;
        let mut delete_index: Option<usize> = None;
        ScrollArea::vertical()
            .id_salt("alarms_scroll")
            .show(ui, |ui| {
                egui::Grid::new("alarms_grid")
                    .striped(true)
                    .num_columns(6)
                    .spacing([14.0, 6.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("Time").strong());
                        ui.label(RichText::new("Label").strong());
                        ui.label(RichText::new("Days").strong());
                        ui.label(RichText::new("Sound").strong());
                        ui.label(RichText::new("On").strong());
                        ui.label(RichText::new("Remove").strong());
                        ui.end_row();

                        for (index, alarm) in alarms.iter().enumerate() {
                            ui.label(
                                RichText::new(alarm.time_text())
                                    .monospace()
                                    .color(render::CLOCK),
                            );
                            ui.label(alarm.label.as_str());
                            ui.label(alarm.days_text());
                            ui.label(alarm.sound.as_str());
                            let mut active = alarm.active;
                            if ui.checkbox(&mut active, "").changed() {
                                toggle_index = Some(index);
                            }
                            if ui
                                .add(
                                    egui::Button::new(
                                        RichText::new("Delete").color(render::DANGER).strong(),
                                    )
                                    .fill(render::DANGER_FILL),
                                )
                                .clicked()
                            {
                                delete_index = Some(index);
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(index) = toggle_index
            && let Some(active) = self.store().toggle(index)
        {
            let text = if active { "Alarm enabled." } else { "Alarm disabled." };
            self.set_status(text, render::GOOD, Duration::from_secs(2));
        }
        if let Some(index) = delete_index
            && let Some(alarm) = alarms.get(index)
        {
            self.pending_delete = Some((index, alarm.clone()));
        }
    }

    fn show_delete_confirmation(&mut self, ctx: &egui::Context) {
        let Some((index, alarm)) = &self.pending_delete else {
            return;
        };
        let (index, alarm) = (*index, alarm.clone());

        let mut decision: Option<bool> = None;
        egui::Window::new("Delete alarm?")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Delete '{}' at {}? This cannot be undone.",
                    alarm.label,
                    alarm.time_text()
                ));
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui
                        .add(
                            egui::Button::new(RichText::new("Delete").color(render::DANGER))
                                .fill(render::DANGER_FILL),
                        )
                        .clicked()
                    {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });

        match decision {
            Some(true) => {
                self.pending_delete = None;
                // the list may have changed under the dialog; only delete the same alarm
                let still_there = self
                    .store()
                    .alarms()
                    .get(index)
                    .is_some_and(|current| current.id == alarm.id);
                if still_there && self.store().delete(index).is_some() {
                    self.set_status(
                        format!("Deleted alarm '{}'.", alarm.label),
                        render::GOOD,
                        Duration::from_secs(3),
                    );
                }
            }
            Some(false) => self.pending_delete = None,
            None => {}
        }
    }

    fn show_countdown(&mut self, ui: &mut Ui) {
        render::section_heading(ui, "Countdown");
        let snapshot = self.runtime.countdown().snapshot();
        let labels: Vec<String> = self
            .store()
            .catalog()
            .picker_labels()
            .into_iter()
            .map(str::to_string)
            .collect();

        ui.add_enabled_ui(snapshot.phase == TimerPhase::Idle, |ui| {
            ui.horizontal(|ui| {
                ui.label("Minutes");
                ui.add(egui::DragValue::new(&mut self.timer_form.minutes).range(0..=999));
                ui.label("Seconds");
                ui.add(egui::DragValue::new(&mut self.timer_form.seconds).range(0..=59));
            });
        });
        ui.add_space(6.0);
        if show_sound_form(ui, "timer_sound", &mut self.timer_form.sound, &labels) {
            let sound = self.timer_form.sound.resolve(self.store());
            self.player.preview(sound.as_deref());
        }

        ui.add_space(12.0);
        render::countdown_dial(ui, &snapshot);
        ui.add_space(12.0);

        ui.horizontal(|ui| match snapshot.phase {
            TimerPhase::Idle => {
                if ui.button("Start").clicked() {
                    self.start_countdown();
                }
            }
            TimerPhase::Running => {
                if ui.button("Pause").clicked() {
                    self.runtime.countdown().pause();
                }
                if ui.button("Stop").clicked() {
                    self.runtime.countdown().stop();
                }
            }
            TimerPhase::Paused => {
                if ui.button("Resume").clicked() {
                    self.runtime.countdown().resume();
                }
                if ui.button("Stop").clicked() {
                    self.runtime.countdown().stop();
                }
            }
        });
    }

    fn start_countdown(&mut self) {
        let sound = self.timer_form.sound.resolve(self.store());
        match self
            .runtime
            .countdown()
            .start(self.timer_form.minutes, self.timer_form.seconds)
        {
            Ok(()) => self.timer_sound = sound,
            Err(err) => self.set_status(
                format!("Cannot start countdown: {err}"),
                render::WARNING,
                Duration::from_secs(3),
            ),
        }
    }

    fn show_ringing(&mut self, ctx: &egui::Context) {
        let Some(front) = self.ringing.front() else {
            return;
        };
        let (title, heading, detail) = match front {
            Ringing::Alarm(alarm) => (
                "Alarm",
                alarm.label.clone(),
                render::ringing_alarm_detail(alarm),
            ),
            Ringing::Timer => (
                "Timer",
                "Time's up!".to_string(),
                "The countdown has finished.".to_string(),
            ),
        };
        let waiting = self.ringing.len() - 1;

        let mut open = true;
        let mut stop = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .anchor(Align2::CENTER_CENTER, [0.0, -40.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new(&heading)
                            .size(26.0)
                            .color(render::CLOCK)
                            .strong(),
                    );
                    ui.label(RichText::new(&detail).color(render::MUTED));
                    if waiting > 0 {
                        ui.label(
                            RichText::new(format!("{waiting} more waiting"))
                                .color(render::WARNING),
                        );
                    }
                    ui.add_space(8.0);
                    if ui
                        .add(
                            egui::Button::new(RichText::new("Stop").size(18.0).strong())
                                .min_size(egui::vec2(120.0, 32.0)),
                        )
                        .clicked()
                    {
                        stop = true;
                    }
                });
            });

        if stop || !open {
            self.dismiss_front();
        }
    }
}

/// Sound picker row plus the custom path field. Returns true when the
/// user asked for a preview.
fn show_sound_form(ui: &mut Ui, id_salt: &str, form: &mut SoundForm, labels: &[String]) -> bool {
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    let mut preview = false;
    ui.horizontal(|ui| {
        ui.label("Sound");
        render::sound_picker(ui, id_salt, &mut form.label, &labels);
        if ui.button("Test sound").clicked() {
            preview = true;
        }
    });
    if form.label == CUSTOM_SOUND_LABEL {
        ui.horizontal(|ui| {
            ui.label("File");
            ui.add(
                TextEdit::singleline(&mut form.custom_path)
                    .hint_text("/path/to/sound.mp3")
                    .desired_width(320.0),
            );
        });
    }
    preview
}

impl eframe::App for AlarmClockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((_, _, expires_at)) = &self.status_message
            && Instant::now() >= *expires_at
        {
            self.status_message = None;
        }
        self.drain_events();
        let now = Local::now().naive_local();

        TopBottomPanel::top("header")
            .resizable(false)
            .show(ctx, |ui| self.show_header(ui, now));

        TopBottomPanel::bottom("footer")
            .resizable(false)
            .show(ctx, |ui| self.show_footer(ui));

        let view = self.view;
        egui::CentralPanel::default().show(ctx, |ui| match view {
            View::Home => self.show_home(ui, now),
            View::CreateAlarm => self.show_create_alarm(ui),
            View::ActiveAlarms => self.show_active_alarms(ui),
            View::Countdown => self.show_countdown(ui),
        });

        self.show_delete_confirmation(ctx);
        self.show_ringing(ctx);

        ctx.request_repaint_after(IDLE_REPAINT);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::alarm::sound::SoundCatalog;

    fn store_in(dir: &Path) -> AlarmStore {
        AlarmStore::open(dir.join("alarms.json"), SoundCatalog::new(dir.join("sounds")))
    }

    #[test]
    fn form_reset_keeps_time_and_sound() {
        let mut form = AlarmForm {
            hour: 6,
            minute: 45,
            label: "Gym".to_string(),
            days: [true; 7],
            sound: SoundForm {
                label: "Destiny".to_string(),
                custom_path: String::new(),
            },
        };
        form.reset_after_create();
        assert_eq!(form.label, DEFAULT_LABEL);
        assert_eq!(form.days, [false; 7]);
        assert_eq!((form.hour, form.minute), (6, 45));
        assert_eq!(form.sound.label, "Destiny");
    }

    #[test]
    fn sound_form_resolves_catalog_and_custom_files() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());

        let beep = SoundForm::default();
        assert_eq!(beep.selection(&store), SoundSelection::DefaultBeep);
        assert_eq!(beep.resolve(&store), None);

        let track = SoundForm {
            label: "Soja".to_string(),
            custom_path: String::new(),
        };
        assert_eq!(
            track.resolve(&store),
            Some(dir.path().join("sounds").join("soja.mp3"))
        );

        let custom = SoundForm {
            label: CUSTOM_SOUND_LABEL.to_string(),
            custom_path: "  /tmp/ring.ogg ".to_string(),
        };
        assert_eq!(
            custom.selection(&store),
            SoundSelection::CustomFile(PathBuf::from("/tmp/ring.ogg"))
        );

        let unbrowsed = SoundForm {
            label: CUSTOM_SOUND_LABEL.to_string(),
            custom_path: "   ".to_string(),
        };
        assert_eq!(unbrowsed.selection(&store), SoundSelection::DefaultBeep);
    }
}
