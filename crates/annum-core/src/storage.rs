use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::model::{DayDetail, Preferences, YearData};

/// All detail records for every year, keyed by date string.
pub type DetailMap = BTreeMap<String, DayDetail>;

const DETAILS_FILE: &str = "day_details.json";
const PREFERENCES_FILE: &str = "app_preferences.json";

/// Key-value persistence for the three calendar records: one snapshot file
/// per visited year, one detail map, one preferences blob.
///
/// Reads never fail outward: a missing or corrupt record decodes to the
/// absent value. Writes are best-effort and atomic; a failed write is logged
/// and dropped because in-memory state stays authoritative for the session.
#[derive(Debug)]
pub struct Storage {
    pub data_dir: PathBuf,
    details_path: PathBuf,
    preferences_path: PathBuf,
}

impl Storage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .map_err(|err| anyhow!("failed to create {}: {err}", data_dir.display()))?;

        let details_path = data_dir.join(DETAILS_FILE);
        let preferences_path = data_dir.join(PREFERENCES_FILE);

        info!(
            data_dir = %data_dir.display(),
            details = %details_path.display(),
            preferences = %preferences_path.display(),
            "opened storage"
        );

        Ok(Self {
            data_dir,
            details_path,
            preferences_path,
        })
    }

    pub fn year_path(&self, year: i32) -> PathBuf {
        self.data_dir.join(format!("calendar_year_{year}.json"))
    }

    #[tracing::instrument(skip(self))]
    pub fn load_year(&self, year: i32) -> Option<YearData> {
        read_json(&self.year_path(year))
    }

    #[tracing::instrument(skip(self, data), fields(year = data.year))]
    pub fn save_year(&self, data: &YearData) {
        write_json_logged(&self.year_path(data.year), data);
    }

    #[tracing::instrument(skip(self))]
    pub fn load_day_details(&self) -> DetailMap {
        read_json(&self.details_path).unwrap_or_default()
    }

    #[tracing::instrument(skip(self, details), fields(count = details.len()))]
    pub fn save_day_details(&self, details: &DetailMap) {
        write_json_logged(&self.details_path, details);
    }

    #[tracing::instrument(skip(self))]
    pub fn load_preferences(&self) -> Option<Preferences> {
        read_json(&self.preferences_path)
    }

    #[tracing::instrument(skip(self, preferences))]
    pub fn save_preferences(&self, preferences: &Preferences) {
        write_json_logged(&self.preferences_path, preferences);
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        debug!(file = %path.display(), "record absent");
        return None;
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "unreadable record; treating as absent");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(file = %path.display(), error = %err, "corrupt record; treating as absent");
            None
        }
    }
}

fn write_json_logged<T: Serialize>(path: &Path, value: &T) {
    if let Err(err) = write_json_atomic(path, value) {
        warn!(
            file = %path.display(),
            error = %err,
            "failed to persist record; in-memory state remains authoritative"
        );
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    debug!(file = %path.display(), "writing record atomically");
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut temp, value)?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}
