use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::PartyLapsError;
use crate::timing::ReferencePolicy;

const CONFIG_DIR_NAME: &str = "partylaps";
const CONFIG_FILE_NAME: &str = "config.json";

/// Number of lap rows the display can hold
pub const MAX_LAP_ROWS: usize = 50;

const DEFAULT_LAP_ROWS: usize = 6;
const DEFAULT_RED_AT_MS: i32 = 500;
const DEFAULT_GREEN_AT_MS: i32 = -500;
const DEFAULT_UPDATE_TIME_MS: u32 = 100;
const MAX_COLOR_THRESHOLD_MS: i32 = 10_000;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeltaColor {
    #[default]
    White,
    Yellow,
}

/// How long lap records are kept.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogBest {
    /// Records are loaded at startup and written back to disk
    #[default]
    Always,
    /// Records live for as long as the app runs
    Sessions,
    /// The best lap is forgotten at every session reset
    Never,
}

impl LogBest {
    pub fn next(self) -> Self {
        match self {
            Self::Always => Self::Sessions,
            Self::Sessions => Self::Never,
            Self::Never => Self::Always,
        }
    }
}

/// Setting changes triggered from the display. These are the only inputs the app handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClickAction {
    CycleDriver,
    ResetBestLap,
    ToggleLockBest,
    CycleReference,
    CycleLogBest,
    ToggleLogLaps,
    ToggleIgnoreInvalidation,
    ToggleDelta,
    ToggleDeltaColor,
    ToggleCurrent,
    ToggleReference,
    ToggleTotal,
    RedAtPlus,
    RedAtMinus,
    GreenAtPlus,
    GreenAtMinus,
    LapCountPlus,
    LapCountMinus,
    RefreshPlus,
    RefreshMinus,
}

impl ClickAction {
    /// Every action, in settings panel order
    pub const ALL: [ClickAction; 20] = [
        ClickAction::LapCountPlus,
        ClickAction::LapCountMinus,
        ClickAction::ToggleDelta,
        ClickAction::ToggleDeltaColor,
        ClickAction::RedAtPlus,
        ClickAction::RedAtMinus,
        ClickAction::GreenAtPlus,
        ClickAction::GreenAtMinus,
        ClickAction::ToggleCurrent,
        ClickAction::CycleReference,
        ClickAction::ToggleReference,
        ClickAction::ToggleTotal,
        ClickAction::RefreshPlus,
        ClickAction::RefreshMinus,
        ClickAction::ToggleLogLaps,
        ClickAction::CycleLogBest,
        ClickAction::ResetBestLap,
        ClickAction::ToggleLockBest,
        ClickAction::ToggleIgnoreInvalidation,
        ClickAction::CycleDriver,
    ];
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub lap_displayed_count: usize,
    pub show_delta: bool,
    pub delta_color: DeltaColor,
    pub red_at_ms: i32,
    pub green_at_ms: i32,
    pub show_current: bool,
    pub show_reference: bool,
    pub show_total: bool,
    pub reference: ReferencePolicy,
    pub update_time_ms: u32,
    pub log_laps: bool,
    pub log_best: LogBest,
    pub lock_best: bool,
    pub ignore_lap_invalidation: bool,
    pub drivers: Vec<String>,
    pub current_driver: String,
    /// Root directory for lap records and session logs, the user data directory when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lap_displayed_count: DEFAULT_LAP_ROWS,
            show_delta: true,
            delta_color: DeltaColor::White,
            red_at_ms: DEFAULT_RED_AT_MS,
            green_at_ms: DEFAULT_GREEN_AT_MS,
            show_current: true,
            show_reference: true,
            show_total: true,
            reference: ReferencePolicy::Median,
            update_time_ms: DEFAULT_UPDATE_TIME_MS,
            log_laps: true,
            log_best: LogBest::Always,
            lock_best: false,
            ignore_lap_invalidation: false,
            drivers: Vec::new(),
            current_driver: String::new(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    pub fn from_local_file() -> Option<Self> {
        Self::from_file(&Self::default_path()?)
    }

    /// Read a config file. A missing or unreadable file yields `None`.
    pub fn from_file(config_path: &Path) -> Option<Self> {
        if !config_path.exists() {
            return None;
        }

        let file = std::fs::File::open(config_path)
            .map_err(|e| warn!("Could not open config file {:?}: {}", config_path, e))
            .ok()?;
        let mut config: Self = serde_json::from_reader(file)
            .map_err(|e| warn!("Could not parse config file {:?}: {}", config_path, e))
            .ok()?;
        config.select_default_driver();
        Some(config)
    }

    pub fn save(&self) -> Result<(), PartyLapsError> {
        let config_path = Self::default_path().ok_or(PartyLapsError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PartyLapsError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PartyLapsError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PartyLapsError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PartyLapsError::ConfigSerializeError { source: e })
    }

    /// Root directory for lap records and session logs.
    pub fn data_dir(&self) -> Result<PathBuf, PartyLapsError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .ok_or(PartyLapsError::NoConfigDir)?
                .join(CONFIG_DIR_NAME)),
        }
    }

    /// Replace the driver list from comma separated text.
    pub fn set_drivers_text(&mut self, text: &str) {
        self.drivers = split_driver_list(text);
        self.select_default_driver();
    }

    pub fn drivers_text(&self) -> String {
        self.drivers.join(", ")
    }

    fn select_default_driver(&mut self) {
        if self.current_driver.is_empty() {
            if let Some(first) = self.drivers.first() {
                self.current_driver = first.clone();
            }
        }
    }

    /// Apply a settings change. Returns `false` for actions the config does not own.
    pub fn apply(&mut self, action: ClickAction) -> bool {
        match action {
            ClickAction::CycleDriver => {
                self.current_driver = cycle_driver(&self.drivers, &self.current_driver);
            }
            ClickAction::ToggleLockBest => self.lock_best = !self.lock_best,
            ClickAction::CycleReference => self.reference = self.reference.next(),
            ClickAction::CycleLogBest => self.log_best = self.log_best.next(),
            ClickAction::ToggleLogLaps => self.log_laps = !self.log_laps,
            ClickAction::ToggleIgnoreInvalidation => {
                self.ignore_lap_invalidation = !self.ignore_lap_invalidation
            }
            ClickAction::ToggleDelta => self.show_delta = !self.show_delta,
            ClickAction::ToggleDeltaColor => {
                self.delta_color = match self.delta_color {
                    DeltaColor::White => DeltaColor::Yellow,
                    DeltaColor::Yellow => DeltaColor::White,
                }
            }
            ClickAction::ToggleCurrent => self.show_current = !self.show_current,
            ClickAction::ToggleReference => self.show_reference = !self.show_reference,
            ClickAction::ToggleTotal => self.show_total = !self.show_total,
            ClickAction::RedAtPlus => self.red_at_ms = raise_threshold(self.red_at_ms),
            ClickAction::RedAtMinus => self.red_at_ms = lower_threshold(self.red_at_ms),
            ClickAction::GreenAtPlus => self.green_at_ms = -lower_threshold(-self.green_at_ms),
            ClickAction::GreenAtMinus => self.green_at_ms = -raise_threshold(-self.green_at_ms),
            ClickAction::LapCountPlus => {
                self.lap_displayed_count = (self.lap_displayed_count + 1).min(MAX_LAP_ROWS)
            }
            ClickAction::LapCountMinus => {
                self.lap_displayed_count = self.lap_displayed_count.saturating_sub(1)
            }
            ClickAction::RefreshPlus => {
                self.update_time_ms = match self.update_time_ms {
                    0 => 50,
                    50 => 100,
                    t if t < 200 => t + 100,
                    _ => 200,
                }
            }
            ClickAction::RefreshMinus => {
                self.update_time_ms = match self.update_time_ms {
                    50 => 0,
                    100 => 50,
                    t if t > 100 => t - 100,
                    _ => 0,
                }
            }
            ClickAction::ResetBestLap => return false,
        }
        true
    }
}

/// Step a positive colour threshold up: 100 ms below 1 s, 200 ms below 2 s, then 1 s up to 10 s.
fn raise_threshold(threshold_ms: i32) -> i32 {
    match threshold_ms {
        t if t < 1000 => t + 100,
        t if t < 2000 => t + 200,
        t if t < MAX_COLOR_THRESHOLD_MS => t + 1000,
        t => t,
    }
}

fn lower_threshold(threshold_ms: i32) -> i32 {
    match threshold_ms {
        t if t > 2000 => t - 1000,
        t if t > 1000 => t - 200,
        t if t > 0 => t - 100,
        t => t,
    }
}

/// Split comma separated driver names, trimming whitespace and dropping empty entries.
pub fn split_driver_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// The driver after `current` in `drivers`, wrapping around. Unknown or empty `current` selects
/// the first driver, an empty list selects nobody.
pub fn cycle_driver(drivers: &[String], current: &str) -> String {
    let next = drivers
        .iter()
        .position(|driver| driver == current)
        .and_then(|index| drivers.get(index + 1))
        .or_else(|| drivers.first());
    next.cloned().unwrap_or_default()
}
