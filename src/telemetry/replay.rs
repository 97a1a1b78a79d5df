use std::{io, path::Path};

use log::{debug, warn};

use crate::PartyLapsError;

use super::{TelemetryFrame, TelemetrySource, TrackInfo};

/// Plays back telemetry frames recorded as JSON lines, one [`TelemetryFrame`] per line.
pub struct ReplaySource {
    track: TrackInfo,
    frames: Box<dyn Iterator<Item = io::Result<TelemetryFrame>>>,
    frame_no: usize,
}

impl ReplaySource {
    pub fn open(path: &Path, track: TrackInfo) -> Result<Self, PartyLapsError> {
        if !path.exists() {
            return Err(PartyLapsError::InvalidTelemetryFile {
                path: format!("{:?}", path),
            });
        }
        let frames = serde_jsonlines::json_lines::<TelemetryFrame, _>(path)
            .map_err(|e| PartyLapsError::TelemetryLoaderError { source: e })?;
        debug!("Replaying telemetry from {:?}", path);

        Ok(Self::from_frames(track, frames))
    }

    pub fn from_frames(
        track: TrackInfo,
        frames: impl Iterator<Item = io::Result<TelemetryFrame>> + 'static,
    ) -> Self {
        Self {
            track,
            frames: Box::new(frames),
            frame_no: 0,
        }
    }
}

impl TelemetrySource for ReplaySource {
    fn track_info(&self) -> Result<TrackInfo, PartyLapsError> {
        Ok(self.track.clone())
    }

    fn next_frame(&mut self) -> Result<Option<TelemetryFrame>, PartyLapsError> {
        self.frame_no += 1;
        match self.frames.next() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => {
                warn!("Unreadable telemetry frame #{}: {}", self.frame_no, e);
                Err(PartyLapsError::TelemetrySourceError {
                    description: format!("frame #{}: {}", self.frame_no, e),
                })
            }
            None => Ok(None),
        }
    }
}
