// Daily session log, one JSON line per finished session

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::PartyLapsError;
use crate::telemetry::TrackInfo;
use crate::timing::{ReferencePolicy, SessionSummary};

use super::sanitize_file_stem;

const SESSIONS_DIR_NAME: &str = "sessions";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    /// Position of the session within the day, starting at 1
    pub session: u32,
    pub laps_ms: Vec<u32>,
    /// Absent when the reference is the all-time best lap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferencePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_ms: Option<u32>,
    pub best_ms: u32,
    pub total_ms: u64,
}

impl SessionLogEntry {
    pub fn from_summary(session: u32, summary: &SessionSummary) -> Self {
        let reference = (summary.reference != ReferencePolicy::Best).then_some(summary.reference);
        Self {
            session,
            laps_ms: summary.laps_ms.clone(),
            reference,
            reference_ms: reference.map(|_| summary.reference_ms),
            best_ms: summary.best_ms,
            total_ms: summary.total_ms,
        }
    }
}

/// Writes finished sessions to `<data dir>/sessions/<track> - <car> - <date>.jsonl`.
#[derive(Clone, Debug)]
pub struct SessionLog {
    directory: PathBuf,
}

impl SessionLog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            directory: data_dir.join(SESSIONS_DIR_NAME),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_path(&self, track: &TrackInfo, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!(
                "{} - {}.jsonl",
                sanitize_file_stem(&track.record_stem()),
                date.format("%Y-%m-%d")
            ))
    }

    /// Sessions already logged in `path`. Unreadable lines are skipped.
    pub fn read_entries(path: &Path) -> Vec<SessionLogEntry> {
        match serde_jsonlines::json_lines::<SessionLogEntry, _>(path) {
            Ok(lines) => lines
                .filter_map(|line| match line {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable session log line in {:?}: {}", path, e);
                        None
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Append `summary` to today's log for `track`, returning the session number used.
    pub fn append(&self, track: &TrackInfo, summary: &SessionSummary) -> Result<u32, PartyLapsError> {
        self.append_on(track, summary, Local::now().date_naive())
    }

    pub fn append_on(
        &self,
        track: &TrackInfo,
        summary: &SessionSummary,
        date: NaiveDate,
    ) -> Result<u32, PartyLapsError> {
        let path = self.file_path(track, date);
        fs::create_dir_all(&self.directory).map_err(|e| PartyLapsError::SessionLogError {
            path: self.directory.clone(),
            source: e,
        })?;

        let session = Self::read_entries(&path)
            .iter()
            .map(|entry| entry.session)
            .max()
            .unwrap_or(0)
            + 1;
        let entry = SessionLogEntry::from_summary(session, summary);

        serde_jsonlines::append_json_lines(&path, [&entry]).map_err(|e| {
            PartyLapsError::SessionLogError {
                path: path.clone(),
                source: e,
            }
        })?;

        info!(
            "Logged session {} ({} laps) to {:?}",
            session,
            entry.laps_ms.len(),
            path
        );
        Ok(session)
    }
}
