// Session best, all-time best and per-driver personal best tracking

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::curve::LapCurve;

/// A recorded lap: the all-time best or a driver's personal best.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LapRecord {
    pub time_ms: u32,
    #[serde(default)]
    pub holder: String,
    pub curve: LapCurve,
}

/// Personal bests keyed by driver name. A missing driver has no record.
pub type PersonalBestTable = BTreeMap<String, LapRecord>;

/// A lap that just crossed the line, as handed to [`RecordBook::complete_lap`].
#[derive(Clone, Debug)]
pub struct CompletedLap<'a> {
    pub driver: &'a str,
    pub lap_time_ms: u32,
    pub curve: LapCurve,
    pub invalidated: bool,
    pub locked: bool,
}

/// Which records a completed lap improved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LapOutcome {
    pub session_best_updated: bool,
    pub all_time_best_updated: bool,
    pub personal_best_updated: bool,
}

#[derive(Debug, Default)]
pub struct RecordBook {
    session_best_ms: u32,
    best_lap: Option<LapRecord>,
    personal_bests: PersonalBestTable,
}

fn beats(lap_time_ms: u32, record: Option<&LapRecord>) -> bool {
    match record {
        Some(record) => record.time_ms == 0 || lap_time_ms < record.time_ms,
        None => true,
    }
}

impl RecordBook {
    pub fn new(best_lap: Option<LapRecord>, personal_bests: PersonalBestTable) -> Self {
        Self {
            session_best_ms: 0,
            best_lap,
            personal_bests,
        }
    }

    /// Apply a completed lap to the session best, the all-time best and the driver's personal
    /// best. The latter two only move when the lap is neither locked nor invalidated.
    pub fn complete_lap(&mut self, lap: CompletedLap<'_>) -> LapOutcome {
        let mut outcome = LapOutcome::default();
        if lap.lap_time_ms == 0 {
            return outcome;
        }

        if self.session_best_ms == 0 || lap.lap_time_ms < self.session_best_ms {
            self.session_best_ms = lap.lap_time_ms;
            outcome.session_best_updated = true;
        }

        if lap.locked || lap.invalidated {
            debug!(
                "Lap of {} ms not eligible for records (locked: {}, invalidated: {})",
                lap.lap_time_ms, lap.locked, lap.invalidated
            );
            return outcome;
        }

        let record = LapRecord {
            time_ms: lap.lap_time_ms,
            holder: lap.driver.to_string(),
            curve: lap.curve,
        };

        if !lap.driver.is_empty() && beats(lap.lap_time_ms, self.personal_bests.get(lap.driver)) {
            info!(
                "New personal best for {}: {} ms",
                lap.driver, lap.lap_time_ms
            );
            self.personal_bests
                .insert(lap.driver.to_string(), record.clone());
            outcome.personal_best_updated = true;
        }

        if beats(lap.lap_time_ms, self.best_lap.as_ref()) {
            info!("New best lap by '{}': {} ms", lap.driver, lap.lap_time_ms);
            self.best_lap = Some(record);
            outcome.all_time_best_updated = true;
        }

        outcome
    }

    pub fn session_best_ms(&self) -> u32 {
        self.session_best_ms
    }

    pub fn reset_session_best(&mut self) {
        self.session_best_ms = 0;
    }

    pub fn best_lap(&self) -> Option<&LapRecord> {
        self.best_lap.as_ref()
    }

    /// All-time best time, 0 when unset.
    pub fn best_time_ms(&self) -> u32 {
        self.best_lap.as_ref().map_or(0, |record| record.time_ms)
    }

    pub fn best_holder(&self) -> &str {
        self.best_lap
            .as_ref()
            .map_or("", |record| record.holder.as_str())
    }

    pub fn personal_best(&self, driver: &str) -> Option<&LapRecord> {
        self.personal_bests.get(driver)
    }

    pub fn personal_bests(&self) -> &PersonalBestTable {
        &self.personal_bests
    }

    /// Forget the all-time best lap, keeping personal bests.
    pub fn clear_best_lap(&mut self) {
        self.best_lap = None;
    }

    /// Remove `driver`'s personal best, and the all-time best if they hold it. Other drivers'
    /// records are untouched.
    pub fn reset_best_lap(&mut self, driver: &str) {
        self.personal_bests.remove(driver);
        let held_by_driver = self
            .best_lap
            .as_ref()
            .is_some_and(|record| record.holder.is_empty() || record.holder == driver);
        if held_by_driver {
            self.best_lap = None;
        }
        info!("Best lap reset for driver '{}'", driver);
    }
}
