// Application state, driven once per rendered frame by the host

use log::{debug, error, info, warn};

use crate::config::{AppConfig, ClickAction, LogBest};
use crate::display::{Display, LapsView, render_settings};
use crate::errors::PartyLapsError;
use crate::storage::{FileRecordStorage, LapRecordStorage, SessionLog};
use crate::telemetry::{TelemetrySource, TrackInfo};
use crate::timing::{RecordBook, SessionSummary, SessionTracker};

/// Outcome of one [`PartyLapsApp::update`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// Refresh interval not reached yet
    Waiting,
    Updated,
    /// The source failed, state carries over to the next frame
    Skipped,
    /// The source has no more frames
    Finished,
}

pub struct PartyLapsApp {
    track: TrackInfo,
    tracker: SessionTracker,
    view: LapsView,
    storage: Box<dyn LapRecordStorage>,
    session_log: Option<SessionLog>,
    timer_s: f64,
}

impl PartyLapsApp {
    /// App storing records and session logs under the configured data directory
    pub fn open(track: TrackInfo, config: &AppConfig) -> Result<Self, PartyLapsError> {
        let data_dir = config.data_dir()?;
        let storage = FileRecordStorage::for_track(&data_dir, &track);
        debug!("Lap records for {} in {:?}", track.record_stem(), storage.path());
        Ok(Self::with_storage(
            track,
            config,
            Box::new(storage),
            Some(SessionLog::new(&data_dir)),
        ))
    }

    pub fn with_storage(
        track: TrackInfo,
        config: &AppConfig,
        storage: Box<dyn LapRecordStorage>,
        session_log: Option<SessionLog>,
    ) -> Self {
        let records = if config.log_best == LogBest::Always {
            let records = RecordBook::new(storage.load_best_lap(), storage.load_personal_bests());
            info!(
                "Loaded best lap {} ms and {} personal bests for {}",
                records.best_time_ms(),
                records.personal_bests().len(),
                track.record_stem()
            );
            records
        } else {
            RecordBook::default()
        };

        Self {
            track,
            tracker: SessionTracker::new(records),
            view: LapsView::new(),
            storage,
            session_log,
            timer_s: 0.,
        }
    }

    pub fn track(&self) -> &TrackInfo {
        &self.track
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Register click handlers and draw the settings panel
    pub fn attach(&mut self, config: &AppConfig, display: &mut dyn Display) {
        self.view.register_clicks(display);
        render_settings(config, self.tracker.records().best_time_ms(), display);
        self.view.invalidate();
    }

    /// One host frame. `delta_t` is the time since the previous frame in seconds.
    pub fn update(
        &mut self,
        delta_t: f64,
        source: &mut dyn TelemetrySource,
        config: &AppConfig,
        display: &mut dyn Display,
    ) -> FrameStatus {
        let mut frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameStatus::Finished,
            Err(e) => {
                error!("Skipping frame: {}", e);
                return FrameStatus::Skipped;
            }
        };

        self.timer_s += delta_t;
        if self.timer_s < config.update_time_ms as f64 / 1000. {
            return FrameStatus::Waiting;
        }
        self.timer_s = 0.;

        frame.track_position = self.track.lap_position(frame.track_position);
        let events = self.tracker.update(&frame, config);

        if let Some(summary) = events.session_ended {
            self.end_session(&summary, config);
        }
        if let Some(lap) = events.completed_lap {
            if lap.outcome.all_time_best_updated {
                render_settings(config, lap.lap_time_ms, display);
            }
        }

        self.view.render(&self.tracker, config, display);
        FrameStatus::Updated
    }

    fn end_session(&mut self, summary: &SessionSummary, config: &AppConfig) {
        if let Err(e) = self.log_session(summary, config) {
            error!("Failed to log session: {}", e);
        }
        if let Err(e) = self.persist_records(config) {
            error!("Failed to save lap records: {}", e);
        }
    }

    fn log_session(&self, summary: &SessionSummary, config: &AppConfig) -> Result<(), PartyLapsError> {
        if !config.log_laps || summary.laps_ms.is_empty() {
            return Ok(());
        }
        match &self.session_log {
            Some(log) => log.append(&self.track, summary).map(|_| ()),
            None => Ok(()),
        }
    }

    fn persist_records(&mut self, config: &AppConfig) -> Result<(), PartyLapsError> {
        if config.log_best != LogBest::Always {
            return Ok(());
        }
        let records = self.tracker.records();
        if let Some(best_lap) = records.best_lap() {
            self.storage.save_best_lap(best_lap)?;
        }
        if !records.personal_bests().is_empty() {
            self.storage.save_personal_bests(records.personal_bests())?;
        }
        Ok(())
    }

    /// Apply a click. Returns whether `config` changed and should be saved.
    pub fn handle_click(
        &mut self,
        action: ClickAction,
        config: &mut AppConfig,
        display: &mut dyn Display,
    ) -> bool {
        let changed = match action {
            ClickAction::ResetBestLap => {
                if let Err(e) = self.reset_best_lap(config) {
                    error!("Failed to reset best lap: {}", e);
                }
                false
            }
            action => config.apply(action),
        };

        if action == ClickAction::CycleReference {
            self.tracker.refresh_reference(config.reference);
        }
        self.view.invalidate();
        render_settings(config, self.tracker.records().best_time_ms(), display);
        changed
    }

    /// Drop the current driver's records, in memory and on disk.
    pub fn reset_best_lap(&mut self, config: &AppConfig) -> Result<(), PartyLapsError> {
        let driver = config.current_driver.as_str();
        self.tracker.reset_best_lap(driver, config.reference);

        let mut stored = RecordBook::new(
            self.storage.load_best_lap(),
            self.storage.load_personal_bests(),
        );
        stored.reset_best_lap(driver);
        self.storage
            .replace_records(stored.best_lap(), stored.personal_bests())?;
        info!("Reset best lap for driver {:?}", driver);
        Ok(())
    }

    /// Log the running session and save records, at exit.
    pub fn shutdown(&mut self, config: &AppConfig) -> Result<(), PartyLapsError> {
        if self.tracker.is_replay() {
            warn!("Shutting down during a replay, the last live session is still saved");
        }
        if let Some(summary) = self.tracker.current_summary(config.reference) {
            self.log_session(&summary, config)?;
        }
        self.persist_records(config)
    }
}
