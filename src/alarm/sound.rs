use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::alarm::model::ValidationError;

pub const DEFAULT_BEEP_LABEL: &str = "Default Beep";
pub const CUSTOM_SOUND_LABEL: &str = "Custom Sound";

const BUILTIN_TRACKS: [(&str, &str); 5] = [
    ("kwaku_the_traveller", "Kwaku The Traveller"),
    ("second_sermon", "Second Sermon"),
    ("destiny", "Destiny"),
    ("oil_in_my_head", "Oil In My Head"),
    ("soja", "Soja"),
];

/// What the user picked for an alarm or the countdown. Resolved to a file
/// once, when the alarm is created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SoundSelection {
    #[default]
    DefaultBeep,
    CatalogTrack(String),
    CustomFile(PathBuf),
}

impl SoundSelection {
    /// Maps a picker label onto a selection: the beep sentinel, an exact
    /// catalog title, or otherwise the previously browsed custom file.
    pub fn from_label(label: &str, catalog: &SoundCatalog, custom_file: Option<&Path>) -> Self {
        if label == DEFAULT_BEEP_LABEL {
            return SoundSelection::DefaultBeep;
        }
        if let Some(track) = catalog.track_by_title(label) {
            return SoundSelection::CatalogTrack(track.id.to_string());
        }
        match custom_file {
            Some(path) if !path.as_os_str().is_empty() => {
                SoundSelection::CustomFile(path.to_path_buf())
            }
            _ => SoundSelection::DefaultBeep,
        }
    }

    /// The value persisted in the record's `sound` field.
    pub fn label(&self, catalog: &SoundCatalog) -> String {
        match self {
            SoundSelection::DefaultBeep => DEFAULT_BEEP_LABEL.to_string(),
            SoundSelection::CatalogTrack(id) => catalog
                .track(id)
                .map(|track| track.title.to_string())
                .unwrap_or_else(|| id.clone()),
            SoundSelection::CustomFile(_) => CUSTOM_SOUND_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: &'static str,
    pub title: &'static str,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SoundCatalog {
    sounds_dir: PathBuf,
    tracks: Vec<Track>,
}

impl SoundCatalog {
    pub fn new(sounds_dir: impl Into<PathBuf>) -> Self {
        let sounds_dir = sounds_dir.into();
        let tracks = BUILTIN_TRACKS
            .iter()
            .map(|&(id, title)| Track {
                id,
                title,
                path: sounds_dir.join(format!("{id}.mp3")),
            })
            .collect();
        Self { sounds_dir, tracks }
    }

    pub fn sounds_dir(&self) -> &Path {
        &self.sounds_dir
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn track_by_title(&self, title: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.title == title)
    }

    /// Labels offered by the sound picker, in display order.
    pub fn picker_labels(&self) -> Vec<&str> {
        let mut labels = Vec::with_capacity(self.tracks.len() + 2);
        labels.push(DEFAULT_BEEP_LABEL);
        labels.extend(self.tracks.iter().map(|track| track.title));
        labels.push(CUSTOM_SOUND_LABEL);
        labels
    }

    pub fn resolve(&self, selection: &SoundSelection) -> Result<Option<PathBuf>, ValidationError> {
        match selection {
            SoundSelection::DefaultBeep => Ok(None),
            SoundSelection::CatalogTrack(id) => self
                .track(id)
                .map(|track| Some(track.path.clone()))
                .ok_or_else(|| ValidationError::UnknownTrack(id.clone())),
            SoundSelection::CustomFile(path) => Ok(Some(path.clone())),
        }
    }

    pub fn ensure_sounds_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.sounds_dir).with_context(|| {
            format!(
                "unable to create sounds directory {}",
                self.sounds_dir.display()
            )
        })
    }
}
