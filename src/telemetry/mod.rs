pub mod replay;

use serde::{Deserialize, Serialize};

use crate::PartyLapsError;

pub use replay::ReplaySource;

/// Nordschleife track and layout names for the "touristenfahrten" layout, which starts and ends at
/// the bridge instead of the start/finish line.
const NORDSCHLEIFE_TRACK: &str = "ks_nordschleife";
const TOURIST_LAYOUT: &str = "touristenfahrten";
/// Spline position of the bridge
const TOURIST_BRIDGE_POSITION: f32 = 0.9525;
/// Share of the full spline covered by the tourist layout
const TOURIST_LAYOUT_LENGTH: f32 = 0.9165;

/// One snapshot of the host's telemetry, read once per refresh.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryFrame {
    /// Host session identifier, changes on every session restart
    pub session_id: i32,
    /// Elapsed time of the lap in progress
    pub lap_time_ms: u32,
    /// Number of laps completed
    pub laps_completed: u32,
    /// Normalized position along the track spline, [0, 1)
    pub track_position: f32,
    pub in_pit_lane: bool,
    /// Brake pedal, 0=released to 1=fully pressed
    pub brake: f32,
    /// Throttle pedal, 0=off to 1=full throttle
    pub throttle: f32,
    /// Whether the host flagged the lap in progress as invalid
    pub lap_invalidated: bool,
    /// Last lap time reported by the host, 0 when not available yet
    pub last_lap_ms: u32,
    /// Split times of the last lap, used when `last_lap_ms` is not available
    pub last_splits_ms: Vec<u32>,
    /// Host is playing back a replay
    pub is_replay: bool,
}

impl TelemetryFrame {
    /// Time of the last completed lap, falling back to the sum of its splits.
    pub fn last_lap_time_ms(&self) -> u32 {
        if self.last_lap_ms > 0 {
            self.last_lap_ms
        } else {
            self.last_splits_ms
                .iter()
                .fold(0u32, |total, split| total.saturating_add(*split))
        }
    }
}

/// Track layout and car driven, which together identify a set of lap records.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub track_name: String,
    #[serde(default)]
    pub track_config: String,
    pub car_name: String,
}

impl TrackInfo {
    pub fn new(
        track_name: impl Into<String>,
        track_config: impl Into<String>,
        car_name: impl Into<String>,
    ) -> Self {
        Self {
            track_name: track_name.into(),
            track_config: track_config.into(),
            car_name: car_name.into(),
        }
    }

    /// File name stem shared by the record file and the session logs.
    pub fn record_stem(&self) -> String {
        if self.track_config.is_empty() {
            format!("{} - {}", self.track_name, self.car_name)
        } else {
            format!(
                "{} [{}] - {}",
                self.track_name, self.track_config, self.car_name
            )
        }
    }

    fn is_nordschleife_tourist(&self) -> bool {
        self.track_name == NORDSCHLEIFE_TRACK && self.track_config == TOURIST_LAYOUT
    }

    /// Map the host's spline position onto this layout's lap, 0 at the timing line.
    pub fn lap_position(&self, spline_position: f32) -> f32 {
        if !self.is_nordschleife_tourist() {
            return spline_position;
        }

        let shifted = if spline_position > TOURIST_BRIDGE_POSITION {
            spline_position - TOURIST_BRIDGE_POSITION
        } else {
            spline_position + (1. - TOURIST_BRIDGE_POSITION)
        };
        let position = shifted / TOURIST_LAYOUT_LENGTH;
        if position > 1. { 0. } else { position }
    }
}

/// The host simulator's telemetry, as seen by the lap engine.
pub trait TelemetrySource {
    fn track_info(&self) -> Result<TrackInfo, PartyLapsError>;

    /// Read the current frame. `Ok(None)` means the source has no more frames.
    fn next_frame(&mut self) -> Result<Option<TelemetryFrame>, PartyLapsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_lap_falls_back_to_splits() {
        let mut frame = TelemetryFrame {
            last_splits_ms: vec![30_000, 31_000, 29_500],
            ..TelemetryFrame::default()
        };
        assert_eq!(frame.last_lap_time_ms(), 90_500);

        frame.last_lap_ms = 90_400;
        assert_eq!(frame.last_lap_time_ms(), 90_400);
    }

    #[test]
    fn test_split_sum_saturates() {
        let frame = TelemetryFrame {
            last_splits_ms: vec![u32::MAX - 5, 30_000],
            ..TelemetryFrame::default()
        };
        assert_eq!(frame.last_lap_time_ms(), u32::MAX);
    }

    #[test]
    fn test_record_stem() {
        assert_eq!(
            TrackInfo::new("monza", "", "abarth500").record_stem(),
            "monza - abarth500"
        );
        assert_eq!(
            TrackInfo::new("spa", "gp", "ferrari_458").record_stem(),
            "spa [gp] - ferrari_458"
        );
    }

    #[test]
    fn test_lap_position_untouched_on_regular_tracks() {
        let track = TrackInfo::new("ks_nordschleife", "endurance", "bmw_m3_e30");
        assert_eq!(track.lap_position(0.42), 0.42);
    }

    #[test]
    fn test_tourist_layout_starts_at_the_bridge() {
        let track = TrackInfo::new(NORDSCHLEIFE_TRACK, TOURIST_LAYOUT, "bmw_m3_e30");

        assert!(track.lap_position(0.9526) < 0.001);
        let before_bridge = track.lap_position(0.);
        assert!((before_bridge - 0.0475 / 0.9165).abs() < 1e-6);
        // the gantry section past the end of the tourist lap wraps to 0
        assert_eq!(track.lap_position(0.95), 0.);
    }
}
