mod alarm;
mod audio;
mod notify;
mod runtime;
mod time_provider;
mod timer;
mod ui;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use log::{info, warn};

use crate::alarm::sound::SoundCatalog;
use crate::alarm::store::AlarmStore;

#[derive(Parser, Debug)]
#[command(
    name = "alarmclock",
    version,
    about = "Desktop alarm clock and countdown timer"
)]
struct Cli {
    #[arg(long, default_value = "alarms.json")]
    alarms: PathBuf,

    #[arg(long, default_value = "assets/sounds")]
    sounds_dir: PathBuf,

    /// Playback volume between 0.0 and 1.0.
    #[arg(long, default_value_t = 0.7)]
    volume: f32,

    /// Print the saved alarms and exit without opening a window.
    #[arg(long)]
    list: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.volume) {
        bail!("--volume must be between 0.0 and 1.0, got {}", cli.volume);
    }

    let catalog = SoundCatalog::new(&cli.sounds_dir);
    let store = AlarmStore::open(&cli.alarms, catalog);
    info!(
        "using alarm file {} ({} alarms)",
        store.path().display(),
        store.len()
    );

    if cli.list {
        print_alarms(&store);
        return Ok(());
    }

    if let Err(err) = store.catalog().ensure_sounds_dir() {
        warn!("{err:#}");
    }

    ui::app::run_gui(store, cli.volume)
}

fn print_alarms(store: &AlarmStore) {
    if store.is_empty() {
        println!("No alarms set yet");
        return;
    }
    for alarm in store.alarms() {
        println!("{alarm}");
    }
}
