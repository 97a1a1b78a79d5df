pub mod curve;
pub mod pit_exit;
pub mod records;
pub mod reference;
pub mod session;

pub use curve::{LapCurve, LapRecorder, LapSample, delta};
pub use pit_exit::{PitExitState, PitExitTracker};
pub use records::{CompletedLap, LapOutcome, LapRecord, PersonalBestTable, RecordBook};
pub use reference::{ReferencePolicy, reference_time};
pub use session::{CompletedLapInfo, FrameEvents, SessionSummary, SessionTracker};
