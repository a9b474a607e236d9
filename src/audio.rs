//! Alarm and timer playback through `rodio`.
//!
//! A missing or undecodable sound file falls back to a generated 440 Hz
//! beep, and a missing output device leaves the player silent. Neither case
//! is an error for the caller.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

const BEEP_FREQUENCY_HZ: f32 = 440.0;
const BEEP_PREVIEW: Duration = Duration::from_secs(2);
const BEEP_GAIN: f32 = 0.5;

pub struct AlarmPlayer {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    volume: f32,
}

impl AlarmPlayer {
    pub fn new(volume: f32) -> Self {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(err) => {
                warn!("no audio output device, alarms will be silent: {err}");
                None
            }
        };
        Self {
            stream,
            sink: None,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    #[cfg(test)]
    fn silent(volume: f32) -> Self {
        Self {
            stream: None,
            sink: None,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    /// Plays `sound_file` (or the beep) on repeat until [`stop`](Self::stop).
    pub fn play_looping(&mut self, sound_file: Option<&Path>) {
        self.play(sound_file, true);
    }

    /// Plays `sound_file` (or a short beep) once.
    pub fn preview(&mut self, sound_file: Option<&Path>) {
        self.play(sound_file, false);
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }

    fn play(&mut self, sound_file: Option<&Path>, looping: bool) {
        self.stop();
        let Some(stream) = &self.stream else {
            return;
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(self.volume);

        let decoded = match sound_file {
            Some(path) => match open_decoder(path) {
                Ok(source) => {
                    info!("playing {}", path.display());
                    Some(source)
                }
                Err(err) => {
                    warn!("falling back to beep: {err:#}");
                    None
                }
            },
            None => None,
        };

        match decoded {
            Some(source) if looping => sink.append(source.repeat_infinite()),
            Some(source) => sink.append(source),
            None => {
                let beep = SineWave::new(BEEP_FREQUENCY_HZ).amplify(BEEP_GAIN);
                if looping {
                    sink.append(beep);
                } else {
                    sink.append(beep.take_duration(BEEP_PREVIEW));
                }
            }
        }
        sink.play();
        self.sink = Some(sink);
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("unable to open sound file {}", path.display()))?;
    Decoder::new(BufReader::new(file))
        .with_context(|| format!("unable to decode sound file {}", path.display()))
}
