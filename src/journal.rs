//! Observation journal — JSONL sink for drained METAR records.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use common::MetarRecord;
use serde_json::json;
use tracing::warn;

/// Daily-rotated JSONL journal of accepted observations.
///
/// Write failures are logged and swallowed; the journal must never take the
/// controller down with it.
pub struct ObservationJournal {
    dir: PathBuf,
    day_key: String,
    file: File,
}

impl ObservationJournal {
    pub fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let day_key = Utc::now().format("%Y-%m-%d").to_string();
        let file = Self::open_day_file(&dir, &day_key)?;
        Ok(Self { dir, day_key, file })
    }

    fn open_day_file(dir: &Path, day_key: &str) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("metar-{}.jsonl", day_key)))
    }

    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if today != self.day_key {
            self.file = Self::open_day_file(&self.dir, &today)?;
            self.day_key = today;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &MetarRecord) {
        let event = json!({
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "station": record.station_id,
            "age_min": record.age_min,
            "metar": record.raw,
        });

        let write_result = (|| -> std::io::Result<()> {
            self.rotate_if_needed()?;
            let line = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            warn!("Observation journal write failed: {}", e);
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
