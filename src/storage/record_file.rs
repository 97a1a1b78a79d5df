// File based storage for best laps and personal bests, one JSON document per track and car

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::PartyLapsError;
use crate::telemetry::TrackInfo;
use crate::timing::{LapRecord, PersonalBestTable};

use super::{LapRecordStorage, sanitize_file_stem};

/// Current version of the record document layout
pub const RECORD_FORMAT_VERSION: u32 = 1;
const RECORDS_DIR_NAME: &str = "records";

/// Everything stored for one track and car.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecordDocument {
    pub version: u32,
    #[serde(default)]
    pub best_lap: Option<LapRecord>,
    #[serde(default)]
    pub personal_bests: PersonalBestTable,
}

impl Default for RecordDocument {
    fn default() -> Self {
        Self {
            version: RECORD_FORMAT_VERSION,
            best_lap: None,
            personal_bests: PersonalBestTable::new(),
        }
    }
}

/// Read before the full document so that a newer layout is reported as such
#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Record storage backed by a JSON file, written through a temporary file and renamed into
/// place. The previous good file is kept next to it with a `.backup` extension.
#[derive(Clone, Debug)]
pub struct FileRecordStorage {
    path: PathBuf,
}

impl FileRecordStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Storage for `track` under the application data directory
    pub fn for_track(data_dir: &Path, track: &TrackInfo) -> Self {
        let file_name = format!("{}.json", sanitize_file_stem(&track.record_stem()));
        Self::new(data_dir.join(RECORDS_DIR_NAME).join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.backup")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn read_from(path: &Path) -> Result<Option<RecordDocument>, PartyLapsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(record_io_error(path, e)),
        };

        let header: VersionHeader = serde_json::from_str(&content)
            .map_err(|e| PartyLapsError::RecordSerializeError { source: e })?;
        if header.version > RECORD_FORMAT_VERSION {
            return Err(PartyLapsError::UnsupportedRecordVersion {
                path: path.to_path_buf(),
                version: header.version,
            });
        }

        let document = serde_json::from_str(&content)
            .map_err(|e| PartyLapsError::RecordSerializeError { source: e })?;
        Ok(Some(document))
    }

    fn recover_from_backup(&self) -> RecordDocument {
        match Self::read_from(&self.backup_path()) {
            Ok(Some(document)) => {
                warn!("Recovered lap records from backup {:?}", self.backup_path());
                document
            }
            Ok(None) => RecordDocument::default(),
            Err(e) => {
                warn!("Lap record backup is unusable too: {}", e);
                RecordDocument::default()
            }
        }
    }

    /// The stored document, empty when there is nothing usable on disk
    pub fn load_document(&self) -> RecordDocument {
        match Self::read_from(&self.path) {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!("No lap records at {:?}", self.path);
                RecordDocument::default()
            }
            Err(e @ PartyLapsError::UnsupportedRecordVersion { .. }) => {
                warn!("{}", e);
                RecordDocument::default()
            }
            Err(e) => {
                warn!("Could not read lap records from {:?}: {}", self.path, e);
                self.recover_from_backup()
            }
        }
    }

    /// Document to update on write, and whether the primary file parsed and is worth backing up
    fn document_for_update(&self) -> Result<(RecordDocument, bool), PartyLapsError> {
        match Self::read_from(&self.path) {
            Ok(Some(document)) => Ok((document, true)),
            Ok(None) => Ok((RecordDocument::default(), false)),
            Err(e @ PartyLapsError::UnsupportedRecordVersion { .. }) => Err(e),
            Err(e) => {
                warn!("Overwriting unreadable lap records at {:?}: {}", self.path, e);
                Ok((self.recover_from_backup(), false))
            }
        }
    }

    fn write_document(
        &self,
        document: &RecordDocument,
        backup_current: bool,
    ) -> Result<(), PartyLapsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| record_io_error(parent, e))?;
        }

        let content = serde_json::to_string_pretty(document)
            .map_err(|e| PartyLapsError::RecordSerializeError { source: e })?;

        let temp_path = self.temp_path();
        {
            let mut temp_file =
                fs::File::create(&temp_path).map_err(|e| record_io_error(&temp_path, e))?;
            temp_file
                .write_all(content.as_bytes())
                .map_err(|e| record_io_error(&temp_path, e))?;
            temp_file
                .sync_all()
                .map_err(|e| record_io_error(&temp_path, e))?;
        }

        if backup_current {
            if let Err(e) = fs::copy(&self.path, self.backup_path()) {
                warn!("Failed to back up lap records {:?}: {}", self.path, e);
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            record_io_error(&self.path, e)
        })?;

        debug!("Wrote lap records to {:?}", self.path);
        Ok(())
    }

    fn remove_files(&self) -> Result<(), PartyLapsError> {
        for path in [self.path.clone(), self.backup_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {:?}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(record_io_error(&path, e)),
            }
        }
        Ok(())
    }
}

impl LapRecordStorage for FileRecordStorage {
    fn load_best_lap(&self) -> Option<LapRecord> {
        self.load_document().best_lap
    }

    fn save_best_lap(&mut self, record: &LapRecord) -> Result<bool, PartyLapsError> {
        let (mut document, backup_current) = self.document_for_update()?;

        let stored_is_faster = document
            .best_lap
            .as_ref()
            .is_some_and(|stored| stored.time_ms != 0 && stored.time_ms < record.time_ms);
        if stored_is_faster {
            debug!(
                "Stored best lap is faster than {} ms, keeping it",
                record.time_ms
            );
            return Ok(false);
        }

        document.version = RECORD_FORMAT_VERSION;
        document.best_lap = Some(record.clone());
        self.write_document(&document, backup_current)?;
        info!(
            "Saved best lap {} ms ({}) to {:?}",
            record.time_ms, record.holder, self.path
        );
        Ok(true)
    }

    fn load_personal_bests(&self) -> PersonalBestTable {
        self.load_document().personal_bests
    }

    fn save_personal_bests(&mut self, table: &PersonalBestTable) -> Result<(), PartyLapsError> {
        let (mut document, backup_current) = self.document_for_update()?;

        let mut changed = false;
        for (driver, record) in table {
            match document.personal_bests.get(driver) {
                Some(stored) if stored.time_ms != 0 && stored.time_ms < record.time_ms => {
                    debug!("Stored personal best for {:?} is faster, keeping it", driver);
                }
                Some(stored) if stored == record => {}
                _ => {
                    document.personal_bests.insert(driver.clone(), record.clone());
                    changed = true;
                }
            }
        }

        if changed {
            document.version = RECORD_FORMAT_VERSION;
            self.write_document(&document, backup_current)?;
        }
        Ok(())
    }

    fn replace_records(
        &mut self,
        best_lap: Option<&LapRecord>,
        personal_bests: &PersonalBestTable,
    ) -> Result<(), PartyLapsError> {
        // refuse to clobber a file written by a newer release
        let (_, backup_current) = self.document_for_update()?;

        if best_lap.is_none() && personal_bests.is_empty() {
            info!("No lap records left, removing {:?}", self.path);
            return self.remove_files();
        }

        let document = RecordDocument {
            version: RECORD_FORMAT_VERSION,
            best_lap: best_lap.cloned(),
            personal_bests: personal_bests.clone(),
        };
        self.write_document(&document, backup_current)
    }
}

fn record_io_error(path: &Path, source: io::Error) -> PartyLapsError {
    PartyLapsError::RecordIOError {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{LapCurve, LapRecorder, LapSample};
    use tempfile::TempDir;

    fn record(time_ms: u32, holder: &str) -> LapRecord {
        LapRecord {
            time_ms,
            holder: holder.to_string(),
            curve: LapCurve::from_samples(vec![
                LapSample::START,
                LapSample::new(0.5, time_ms / 2),
                LapSample::new(1., time_ms),
            ]),
        }
    }

    fn storage(temp_dir: &TempDir) -> FileRecordStorage {
        FileRecordStorage::for_track(temp_dir.path(), &TrackInfo::new("monza", "", "abarth500"))
    }

    #[test]
    fn test_recorded_lap_with_nan_frame_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        let mut recorder = LapRecorder::new();
        recorder.record(0.5, 5_000);
        recorder.record(f32::NAN, 5_100);
        recorder.record(0.1, 5_200);
        let record = LapRecord {
            time_ms: 10_000,
            holder: "alpha".to_string(),
            curve: recorder.finalize(10_000),
        };
        assert!(storage.save_best_lap(&record).unwrap());

        let loaded = storage.load_best_lap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.curve.len(), 3);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        assert!(storage.load_best_lap().is_none());
        assert!(storage.load_personal_bests().is_empty());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_for_track_path() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileRecordStorage::for_track(
            temp_dir.path(),
            &TrackInfo::new("spa", "gp/short", "ferrari:458"),
        );
        assert_eq!(
            storage.path(),
            temp_dir.path().join("records").join("spa [gp_short] - ferrari_458.json")
        );
        assert_eq!(
            storage.backup_path().file_name().unwrap(),
            "spa [gp_short] - ferrari_458.json.backup"
        );
    }

    #[test]
    fn test_best_lap_is_never_replaced_by_a_slower_one() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        assert!(storage.save_best_lap(&record(100_000, "alpha")).unwrap());
        assert!(!storage.save_best_lap(&record(100_001, "beta")).unwrap());
        assert_eq!(storage.load_best_lap(), Some(record(100_000, "alpha")));

        // an equal time takes over the holder
        assert!(storage.save_best_lap(&record(100_000, "beta")).unwrap());
        assert_eq!(storage.load_best_lap().unwrap().holder, "beta");

        assert!(storage.save_best_lap(&record(99_000, "gamma")).unwrap());
        assert_eq!(storage.load_best_lap(), Some(record(99_000, "gamma")));
    }

    #[test]
    fn test_document_layout() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);
        storage.save_best_lap(&record(2000, "alpha")).unwrap();

        let content = fs::read_to_string(storage.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["best_lap"]["time_ms"], 2000);
        assert_eq!(json["best_lap"]["holder"], "alpha");
        assert_eq!(
            json["best_lap"]["curve"],
            serde_json::json!([[0.0, 0], [0.5, 1000], [1.0, 2000]])
        );
        assert!(json["personal_bests"].as_object().unwrap().is_empty());
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_personal_bests_round_trip_any_driver_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        let names = [
            "O'Brien \"Bullet\" [3]",
            "Jürgen = Müller; #1",
            "佐藤 🏁",
            "[TIME]\nbest = 1",
        ];
        let table: PersonalBestTable = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), record(90_000 + i as u32, name)))
            .collect();

        storage.save_personal_bests(&table).unwrap();

        let reloaded = storage.load_personal_bests();
        assert_eq!(reloaded, table);
        assert_eq!(reloaded["佐藤 🏁"].time_ms, 90_002);
    }

    #[test]
    fn test_personal_bests_keep_the_faster_stored_lap() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        let mut table = PersonalBestTable::new();
        table.insert("alpha".to_string(), record(95_000, "alpha"));
        storage.save_personal_bests(&table).unwrap();

        table.insert("alpha".to_string(), record(97_000, "alpha"));
        table.insert("beta".to_string(), record(99_000, "beta"));
        storage.save_personal_bests(&table).unwrap();

        let reloaded = storage.load_personal_bests();
        assert_eq!(reloaded["alpha"].time_ms, 95_000);
        assert_eq!(reloaded["beta"].time_ms, 99_000);
    }

    #[test]
    fn test_best_lap_and_personal_bests_share_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        storage.save_best_lap(&record(95_000, "alpha")).unwrap();
        let mut table = PersonalBestTable::new();
        table.insert("alpha".to_string(), record(95_000, "alpha"));
        storage.save_personal_bests(&table).unwrap();

        assert_eq!(storage.load_best_lap(), Some(record(95_000, "alpha")));
        assert_eq!(storage.load_personal_bests(), table);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty_and_can_be_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(storage.path(), "{ \"version\": 1, \"best_lap\": [[[").unwrap();

        assert!(storage.load_best_lap().is_none());
        assert!(storage.load_personal_bests().is_empty());

        assert!(storage.save_best_lap(&record(120_000, "alpha")).unwrap());
        assert_eq!(storage.load_best_lap(), Some(record(120_000, "alpha")));
    }

    #[test]
    fn test_corrupt_file_recovers_from_backup() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        storage.save_best_lap(&record(100_000, "alpha")).unwrap();
        storage.save_best_lap(&record(98_000, "beta")).unwrap();
        assert!(storage.backup_path().exists());

        fs::write(storage.path(), "\0\0\0").unwrap();
        assert_eq!(storage.load_best_lap(), Some(record(100_000, "alpha")));
    }

    #[test]
    fn test_newer_format_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        let future = "{\"version\": 2, \"laps\": {}}";
        fs::write(storage.path(), future).unwrap();

        assert!(storage.load_best_lap().is_none());
        let result = storage.save_best_lap(&record(100_000, "alpha"));
        assert!(matches!(
            result,
            Err(PartyLapsError::UnsupportedRecordVersion { version: 2, .. })
        ));
        assert_eq!(fs::read_to_string(storage.path()).unwrap(), future);
    }

    #[test]
    fn test_replace_records_drops_one_driver() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);

        let mut table = PersonalBestTable::new();
        table.insert("alpha".to_string(), record(95_000, "alpha"));
        table.insert("beta".to_string(), record(96_000, "beta"));
        storage.save_best_lap(&record(95_000, "alpha")).unwrap();
        storage.save_personal_bests(&table).unwrap();

        table.remove("alpha");
        storage.replace_records(None, &table).unwrap();

        assert!(storage.load_best_lap().is_none());
        let reloaded = storage.load_personal_bests();
        assert!(!reloaded.contains_key("alpha"));
        assert_eq!(reloaded["beta"], record(96_000, "beta"));
    }

    #[test]
    fn test_replace_with_nothing_removes_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = storage(&temp_dir);
        storage.save_best_lap(&record(95_000, "alpha")).unwrap();
        storage.save_best_lap(&record(94_000, "alpha")).unwrap();

        storage
            .replace_records(None, &PersonalBestTable::new())
            .unwrap();

        assert!(!storage.path().exists());
        assert!(!storage.backup_path().exists());
        assert!(storage.load_best_lap().is_none());

        // removing an absent store is fine
        storage
            .replace_records(None, &PersonalBestTable::new())
            .unwrap();
    }
}
