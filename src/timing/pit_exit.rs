use serde::{Deserialize, Serialize};

/// Minimum brake input marking the end of the pit exit run-out
const BRAKE_THRESHOLD: f32 = 0.1;
/// Throttle input marking the return to racing pace
const THROTTLE_THRESHOLD: f32 = 0.9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitExitState {
    #[default]
    Idle,
    InPitLane,
    /// Left the pit lane, waiting for the first braking point
    Throttle,
    /// Braking, waiting for full throttle
    Brake,
    /// Racing pace resumed, the captured offset applies until the lap ends
    ApplyOffset,
}

/// Tracks a pit exit so that the time lost at the pit limiter can be taken out of the live delta.
#[derive(Debug, Default)]
pub struct PitExitTracker {
    state: PitExitState,
    exit_lap: Option<u32>,
    offset_ms: f64,
}

impl PitExitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state machine with this frame's inputs. `current_delta_ms` is the live delta
    /// captured as the offset when racing pace resumes.
    pub fn update(
        &mut self,
        in_pit_lane: bool,
        brake: f32,
        throttle: f32,
        laps_completed: u32,
        current_delta_ms: f64,
    ) -> PitExitState {
        self.state = match self.state {
            _ if in_pit_lane => PitExitState::InPitLane,
            PitExitState::InPitLane => {
                self.exit_lap = Some(laps_completed);
                PitExitState::Throttle
            }
            PitExitState::Throttle if brake > BRAKE_THRESHOLD => PitExitState::Brake,
            PitExitState::Brake if throttle > THROTTLE_THRESHOLD => {
                self.offset_ms = current_delta_ms;
                PitExitState::ApplyOffset
            }
            PitExitState::ApplyOffset
                if self.exit_lap.is_some_and(|exit_lap| laps_completed > exit_lap) =>
            {
                PitExitState::Idle
            }
            state => state,
        };
        self.state
    }

    pub fn state(&self) -> PitExitState {
        self.state
    }

    /// Lap counter value when the car last left the pit lane.
    pub fn exit_lap(&self) -> Option<u32> {
        self.exit_lap
    }

    pub fn offset_ms(&self) -> f64 {
        self.offset_ms
    }

    /// The live delta with the pit exit offset removed while it applies.
    pub fn adjusted_delta(&self, delta_ms: f64) -> f64 {
        if self.state == PitExitState::ApplyOffset {
            delta_ms - self.offset_ms
        } else {
            delta_ms
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
