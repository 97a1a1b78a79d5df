// Library interface for partylaps
// This allows integration tests to access internal modules

pub mod app;
pub mod config;
pub mod display;
pub mod errors;
pub mod storage;
pub mod telemetry;
pub mod timing;

// Re-export commonly used types
pub use app::{FrameStatus, PartyLapsApp};
pub use config::{AppConfig, ClickAction, DeltaColor, LogBest};
pub use display::{Color, ConsoleDisplay, Display, Label};
pub use errors::PartyLapsError;
pub use storage::{FileRecordStorage, LapRecordStorage, SessionLog};
pub use telemetry::{ReplaySource, TelemetryFrame, TelemetrySource, TrackInfo};
pub use timing::{LapCurve, LapRecord, LapSample, RecordBook, ReferencePolicy, SessionTracker};
