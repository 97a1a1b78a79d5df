// Error types for partylaps

use snafu::Snafu;
use std::{io, path::PathBuf};

#[derive(Debug, Snafu)]
pub enum PartyLapsError {
    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Lap record storage errors
    #[snafu(display("Error accessing lap record file {path:?}"))]
    RecordIOError { path: PathBuf, source: io::Error },
    #[snafu(display("Error serializing lap records"))]
    RecordSerializeError { source: serde_json::Error },
    #[snafu(display(
        "Lap record file {path:?} uses format version {version}, newer than this release supports"
    ))]
    UnsupportedRecordVersion { path: PathBuf, version: u32 },

    // Session log errors
    #[snafu(display("Error writing session log {path:?}"))]
    SessionLogError { path: PathBuf, source: io::Error },

    // Errors reported by the host telemetry collaborator
    #[snafu(display("Telemetry source error: {description}"))]
    TelemetrySourceError { description: String },

    // Replay errors
    #[snafu(display("Invalid telemetry file: {path}"))]
    InvalidTelemetryFile { path: String },
    #[snafu(display("Error loading telemetry file"))]
    TelemetryLoaderError { source: io::Error },
}
