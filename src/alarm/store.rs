use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::alarm::model::{
    AlarmRecord, Day, ValidationError, load_alarm_file, save_alarm_file, validate_fields,
};
use crate::alarm::sound::{SoundCatalog, SoundSelection};

/// Sole owner of the alarm list. Every mutation is written through to the
/// alarm file; persistence failures are logged and otherwise ignored.
pub struct AlarmStore {
    path: PathBuf,
    catalog: SoundCatalog,
    state: Mutex<StoreState>,
}

struct StoreState {
    alarms: Vec<AlarmRecord>,
    /// `None` once `u64::MAX` has been used.
    next_id: Option<u64>,
}

impl StoreState {
    fn replace(&mut self, alarms: Vec<AlarmRecord>) {
        let highest = alarms.iter().map(|alarm| alarm.id).max().unwrap_or(0);
        // ids handed out earlier in this process stay retired
        self.next_id = match (self.next_id, highest.checked_add(1)) {
            (Some(current), Some(after_highest)) => Some(current.max(after_highest)),
            _ => None,
        };
        if self.next_id.is_none() {
            warn!("alarm ids are exhausted (highest id {highest}), new alarms cannot be created");
        }
        self.alarms = alarms;
    }
}

impl AlarmStore {
    pub fn new(path: impl Into<PathBuf>, catalog: SoundCatalog) -> Self {
        Self {
            path: path.into(),
            catalog,
            state: Mutex::new(StoreState {
                alarms: Vec::new(),
                next_id: Some(1),
            }),
        }
    }

    /// Builds the store and loads whatever is on disk.
    pub fn open(path: impl Into<PathBuf>, catalog: SoundCatalog) -> Self {
        let store = Self::new(path, catalog);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    /// Replaces the in-memory list with the file contents. A missing file is
    /// an empty list; an unreadable or malformed one is logged and also
    /// yields an empty list. Returns the number of alarms loaded.
    pub fn load(&self) -> usize {
        let alarms = if self.path.exists() {
            match load_alarm_file(&self.path) {
                Ok(alarms) => alarms,
                Err(err) => {
                    warn!("could not load alarms: {err:#}");
                    Vec::new()
                }
            }
        } else {
            info!(
                "no alarm file at {}, starting with an empty list",
                self.path.display()
            );
            Vec::new()
        };

        let count = alarms.len();
        self.lock().replace(alarms);
        count
    }

    /// Writes the current list to the alarm file. Holds the lock for the
    /// write so concurrent saves land in mutation order.
    pub fn save(&self) {
        let state = self.lock();
        if let Err(err) = save_alarm_file(&self.path, &state.alarms) {
            warn!("could not save alarms: {err:#}");
        }
    }

    pub fn create(
        &self,
        hour: u8,
        minute: u8,
        label: &str,
        days: &[Day],
        sound: &SoundSelection,
    ) -> Result<AlarmRecord, ValidationError> {
        validate_fields(hour, minute, label, days)?;
        let sound_path = self.catalog.resolve(sound)?;

        let mut days = days.to_vec();
        days.sort_unstable();
        days.dedup();

        let mut state = self.lock();
        let Some(id) = state.next_id else {
            warn!("cannot create alarm '{}': ids exhausted", label.trim());
            return Err(ValidationError::IdsExhausted);
        };
        let alarm = AlarmRecord {
            id,
            hour,
            minute,
            label: label.trim().to_string(),
            days,
            active: true,
            sound: sound.label(&self.catalog),
            sound_path: sound_path
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        state.next_id = id.checked_add(1);
        state.alarms.push(alarm.clone());
        drop(state);
        self.save();
        info!("created alarm {alarm}");
        Ok(alarm)
    }

    /// Flips `active` on the alarm at `index` and returns the new value.
    pub fn toggle(&self, index: usize) -> Option<bool> {
        let mut state = self.lock();
        let alarm = state.alarms.get_mut(index)?;
        alarm.active = !alarm.active;
        let active = alarm.active;
        info!(
            "alarm #{} '{}' is now {}",
            alarm.id,
            alarm.label,
            if active { "on" } else { "off" }
        );
        drop(state);
        self.save();
        Some(active)
    }

    pub fn delete(&self, index: usize) -> Option<AlarmRecord> {
        let mut state = self.lock();
        if index >= state.alarms.len() {
            return None;
        }
        let removed = state.alarms.remove(index);
        drop(state);
        self.save();
        info!("deleted alarm #{} '{}'", removed.id, removed.label);
        Some(removed)
    }

    pub fn alarms(&self) -> Vec<AlarmRecord> {
        self.lock().alarms.clone()
    }

    pub fn active_alarms(&self) -> Vec<AlarmRecord> {
        self.lock()
            .alarms
            .iter()
            .filter(|alarm| alarm.active)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().alarms.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
