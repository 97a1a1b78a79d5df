// Persistence of lap records and session logs

pub mod record_file;
pub mod session_log;

use crate::errors::PartyLapsError;
use crate::timing::{LapRecord, PersonalBestTable};

pub use record_file::{FileRecordStorage, RECORD_FORMAT_VERSION, RecordDocument};
pub use session_log::{SessionLog, SessionLogEntry};

/// Replace characters that are not allowed in file names on common filesystems
pub(crate) fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Trait defining the interface for best lap and personal best storage
///
/// Loads never fail: a missing, unreadable or corrupt store reads as "no record". Saves never
/// replace a stored record with a slower one.
pub trait LapRecordStorage {
    /// Load the all-time best lap, if one has been stored
    fn load_best_lap(&self) -> Option<LapRecord>;

    /// Store `record` unless the stored best lap is faster. Returns whether anything was written.
    fn save_best_lap(&mut self, record: &LapRecord) -> Result<bool, PartyLapsError>;

    /// Load every driver's personal best
    fn load_personal_bests(&self) -> PersonalBestTable;

    /// Merge `table` into the stored personal bests, keeping the faster lap per driver
    fn save_personal_bests(&mut self, table: &PersonalBestTable) -> Result<(), PartyLapsError>;

    /// Overwrite the stored records unconditionally. An empty record set removes the store.
    fn replace_records(
        &mut self,
        best_lap: Option<&LapRecord>,
        personal_bests: &PersonalBestTable,
    ) -> Result<(), PartyLapsError>;
}
