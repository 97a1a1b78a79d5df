// Per-frame session tracking: start/finish detection, live delta, lap completion and resets

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, LogBest};
use crate::telemetry::TelemetryFrame;

use super::curve::LapRecorder;
use super::pit_exit::PitExitTracker;
use super::records::{CompletedLap, LapOutcome, RecordBook};
use super::reference::{ReferencePolicy, reference_time};

/// A position jump backwards within this many ms of lap time is a host glitch, not a new lap
const GLITCH_WINDOW_MS: u32 = 1000;
/// Lap time below which lap 0 counts as a fresh session start
const SESSION_START_WINDOW_MS: u32 = 500;
/// Lap time after which the host's last lap time is trusted without waiting another refresh
const LAP_SETTLE_MS: u32 = 200;
/// The car has to be on the first half of the lap before its samples are trusted
const START_LINE_ZONE: f32 = 0.5;

/// Laps of a session that just ended, as written to the session log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub laps_ms: Vec<u32>,
    pub reference: ReferencePolicy,
    pub reference_ms: u32,
    pub best_ms: u32,
    pub total_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletedLapInfo {
    pub lap_number: u32,
    pub lap_time_ms: u32,
    pub invalidated: bool,
    pub outcome: LapOutcome,
}

/// What happened during one refresh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameEvents {
    pub session_ended: Option<SessionSummary>,
    pub completed_lap: Option<CompletedLapInfo>,
}

#[derive(Debug)]
pub struct SessionTracker {
    session_id: Option<i32>,
    laps: Vec<u32>,
    total_ms: u64,
    reference_ms: u32,
    sf_crossed: bool,
    just_crossed_sf: bool,
    last_lap_refreshed: Option<u32>,
    laps_done: u32,
    position: f32,
    last_position: f32,
    current_time_ms: u32,
    last_current_time_ms: u32,
    lap_invalidated: bool,
    replay: bool,
    projection_ms: f64,
    performance_ms: f64,
    personal_delta_ms: Option<f64>,
    recorder: LapRecorder,
    pit_exit: PitExitTracker,
    records: RecordBook,
}

impl SessionTracker {
    pub fn new(records: RecordBook) -> Self {
        Self {
            session_id: None,
            laps: Vec::new(),
            total_ms: 0,
            reference_ms: records.best_time_ms(),
            sf_crossed: false,
            just_crossed_sf: false,
            last_lap_refreshed: None,
            laps_done: 0,
            position: 0.,
            last_position: 0.,
            current_time_ms: 0,
            last_current_time_ms: 0,
            lap_invalidated: false,
            replay: false,
            projection_ms: 0.,
            performance_ms: 0.,
            personal_delta_ms: None,
            recorder: LapRecorder::new(),
            pit_exit: PitExitTracker::new(),
            records,
        }
    }

    /// Process one refresh worth of telemetry.
    pub fn update(&mut self, frame: &TelemetryFrame, config: &AppConfig) -> FrameEvents {
        let mut events = FrameEvents {
            session_ended: self.update_live(frame, config),
            completed_lap: None,
        };

        // the host's last lap time lags the lap counter, give it a refresh or LAP_SETTLE_MS
        if self.last_lap_refreshed != Some(self.laps_done) && !frame.is_replay {
            if self.just_crossed_sf || self.current_time_ms > LAP_SETTLE_MS {
                events.completed_lap = self.complete_lap(frame, config);
                self.refresh_reference(config.reference);
                self.just_crossed_sf = false;
            } else {
                self.just_crossed_sf = true;
            }
        }

        events
    }

    fn update_live(&mut self, frame: &TelemetryFrame, config: &AppConfig) -> Option<SessionSummary> {
        self.current_time_ms = frame.lap_time_ms;
        self.replay = frame.is_replay;
        if frame.is_replay {
            self.projection_ms = 0.;
            self.performance_ms = 0.;
            self.personal_delta_ms = None;
            return None;
        }

        self.laps_done = frame.laps_completed;
        let position = frame.track_position;
        if !position.is_finite() {
            debug!("Ignoring non-finite track position at {} ms", self.current_time_ms);
            return None;
        }

        self.pit_exit.update(
            frame.in_pit_lane,
            frame.brake,
            frame.throttle,
            self.laps_done,
            self.performance_ms,
        );

        if self.last_position > position
            && self.current_time_ms > self.last_current_time_ms
            && self.current_time_ms < self.last_current_time_ms.saturating_add(GLITCH_WINDOW_MS)
        {
            debug!(
                "Ignoring position glitch {} -> {} at {} ms",
                self.last_position, position, self.current_time_ms
            );
            return None;
        }

        self.last_current_time_ms = self.current_time_ms;
        self.position = position;
        self.last_position = position;
        self.lap_invalidated |= frame.lap_invalidated;

        let mut summary = None;
        if self.session_id != Some(frame.session_id)
            || (self.current_time_ms < SESSION_START_WINDOW_MS && self.laps_done == 0)
        {
            summary = self.reset_session(frame.session_id, config);
        }

        if !self.sf_crossed {
            if position < START_LINE_ZONE {
                debug!("Start/finish zone reached at position {}", position);
                self.sf_crossed = true;
            } else {
                return summary;
            }
        }

        self.recorder.record(position, self.current_time_ms);

        let delta = self
            .records
            .best_lap()
            .map_or(0., |best| best.curve.delta(position, self.current_time_ms));
        let best_ms = self.records.best_time_ms() as f64;
        self.projection_ms = best_ms + delta;
        // rebase the delta from the best lap onto the reference, in proportion to lap progress
        self.performance_ms = if self.reference_ms > 0 {
            delta + (best_ms - self.reference_ms as f64) * position as f64
        } else {
            delta
        };
        self.personal_delta_ms = self
            .records
            .personal_best(&config.current_driver)
            .map(|pb| pb.curve.delta(position, self.current_time_ms));

        summary
    }

    fn reset_session(&mut self, session_id: i32, config: &AppConfig) -> Option<SessionSummary> {
        let summary = (!self.laps.is_empty()).then(|| self.summary(config.reference));

        if self.session_id != Some(session_id) {
            info!(
                "New session {} (previous {:?}, {} laps)",
                session_id,
                self.session_id,
                self.laps.len()
            );
            self.pit_exit.reset();
        }

        self.session_id = Some(session_id);
        self.recorder.reset();
        self.records.reset_session_best();
        self.total_ms = 0;
        self.laps.clear();
        self.lap_invalidated = false;
        if config.log_best == LogBest::Never {
            self.records.clear_best_lap();
        }
        self.reference_ms = self.records.best_time_ms();

        // a reset can leave the car past the line, wait until it comes round again
        if self.position > START_LINE_ZONE {
            self.sf_crossed = false;
        }

        summary
    }

    fn complete_lap(&mut self, frame: &TelemetryFrame, config: &AppConfig) -> Option<CompletedLapInfo> {
        self.last_lap_refreshed = Some(self.laps_done);
        if self.laps_done == 0 {
            return None;
        }

        let lap_time_ms = frame.last_lap_time_ms();
        let invalidated = self.lap_invalidated && !config.ignore_lap_invalidation;
        let curve = self.recorder.finalize(lap_time_ms);
        self.lap_invalidated = false;

        if lap_time_ms == 0 {
            warn!("Lap {} completed without a lap time", self.laps_done);
            return None;
        }

        let outcome = self.records.complete_lap(CompletedLap {
            driver: &config.current_driver,
            lap_time_ms,
            curve,
            invalidated,
            locked: config.lock_best,
        });

        self.total_ms += lap_time_ms as u64;
        self.laps.push(lap_time_ms);
        debug!("Lap {} completed in {} ms", self.laps_done, lap_time_ms);

        Some(CompletedLapInfo {
            lap_number: self.laps_done,
            lap_time_ms,
            invalidated,
            outcome,
        })
    }

    pub fn refresh_reference(&mut self, policy: ReferencePolicy) {
        self.reference_ms = reference_time(policy, &self.laps, self.records.best_time_ms());
    }

    /// Summary of the session so far, `None` before the first lap.
    pub fn current_summary(&self, policy: ReferencePolicy) -> Option<SessionSummary> {
        (!self.laps.is_empty()).then(|| self.summary(policy))
    }

    fn summary(&self, policy: ReferencePolicy) -> SessionSummary {
        SessionSummary {
            laps_ms: self.laps.clone(),
            reference: policy,
            reference_ms: self.reference_ms,
            best_ms: self.records.session_best_ms(),
            total_ms: self.total_ms,
        }
    }

    /// Drop `driver`'s records and recompute the reference.
    pub fn reset_best_lap(&mut self, driver: &str, policy: ReferencePolicy) {
        self.records.reset_best_lap(driver);
        self.refresh_reference(policy);
    }

    pub fn laps(&self) -> &[u32] {
        &self.laps
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn reference_ms(&self) -> u32 {
        self.reference_ms
    }

    /// Projected time of the lap in progress.
    pub fn projection_ms(&self) -> f64 {
        self.projection_ms
    }

    /// Live delta against the reference time.
    pub fn performance_ms(&self) -> f64 {
        self.performance_ms
    }

    /// Live delta with the pit exit offset removed.
    pub fn adjusted_performance_ms(&self) -> f64 {
        self.pit_exit.adjusted_delta(self.performance_ms)
    }

    /// Live delta against the current driver's personal best, if they have one.
    pub fn personal_delta_ms(&self) -> Option<f64> {
        self.personal_delta_ms
    }

    pub fn has_reference_curve(&self) -> bool {
        self.records
            .best_lap()
            .is_some_and(|best| !best.curve.is_empty())
    }

    pub fn sf_crossed(&self) -> bool {
        self.sf_crossed
    }

    pub fn just_crossed_sf(&self) -> bool {
        self.just_crossed_sf
    }

    pub fn last_lap_refreshed(&self) -> Option<u32> {
        self.last_lap_refreshed
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn current_time_ms(&self) -> u32 {
        self.current_time_ms
    }

    pub fn laps_done(&self) -> u32 {
        self.laps_done
    }

    pub fn lap_invalidated(&self) -> bool {
        self.lap_invalidated
    }

    pub fn is_replay(&self) -> bool {
        self.replay
    }

    pub fn pit_exit(&self) -> &PitExitTracker {
        &self.pit_exit
    }

    pub fn records(&self) -> &RecordBook {
        &self.records
    }
}
