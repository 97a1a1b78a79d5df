// Reference time selection

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// How the reference time a live lap is compared against is chosen.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// The all-time best lap
    Best,
    /// Median of the laps completed this session
    #[default]
    Median,
    /// Average of the fastest 25% of this session's laps
    Top25,
    Top50,
    Top75,
}

impl ReferencePolicy {
    /// Short name shown next to the reference time.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Best => "Best",
            Self::Median => "Med.",
            Self::Top25 => "25%",
            Self::Top50 => "50%",
            Self::Top75 => "75%",
        }
    }

    /// Name used in the settings panel and the session log.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Best => "Best lap",
            Self::Median => "Median",
            Self::Top25 => "Top 25%",
            Self::Top50 => "Top 50%",
            Self::Top75 => "Top 75%",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Best => Self::Median,
            Self::Median => Self::Top25,
            Self::Top25 => Self::Top50,
            Self::Top50 => Self::Top75,
            Self::Top75 => Self::Best,
        }
    }

    fn top_percent(&self) -> Option<usize> {
        match self {
            Self::Top25 => Some(25),
            Self::Top50 => Some(50),
            Self::Top75 => Some(75),
            Self::Best | Self::Median => None,
        }
    }
}

/// Reference time in milliseconds for `policy`. 0 means there is no reference yet.
///
/// Averages are truncated to whole milliseconds: the even-length median and the top-N% mean both
/// use integer division of the summed lap times.
pub fn reference_time(policy: ReferencePolicy, completed_laps: &[u32], all_time_best_ms: u32) -> u32 {
    if policy == ReferencePolicy::Best {
        return all_time_best_ms;
    }

    match completed_laps {
        [] => 0,
        [only] => *only,
        laps => {
            let sorted = laps.iter().copied().sorted_unstable().collect_vec();
            match policy.top_percent() {
                Some(percent) => top_average(&sorted, percent),
                None => median(&sorted),
            }
        }
    }
}

fn median(sorted: &[u32]) -> u32 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        ((sorted[mid - 1] as u64 + sorted[mid] as u64) / 2) as u32
    }
}

fn top_average(sorted: &[u32], percent: usize) -> u32 {
    let count = (sorted.len() + sorted.len() % 2) * percent / 100;
    if count == 0 {
        return sorted[0];
    }
    let sum: u64 = sorted.iter().take(count).map(|lap| *lap as u64).sum();
    (sum / count as u64) as u32
}
