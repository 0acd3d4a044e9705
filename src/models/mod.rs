use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One external provider of EPG data, fixed for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpgSource {
    pub name: String,
    pub url: String,
}

impl EpgSource {
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A broadcast channel as declared by an XMLTV `channel` element.
///
/// `channel_id` is the dedup key in the combined output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpgChannel {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_logo: Option<String>,
}

/// A scheduled programme belonging to a channel.
///
/// `start` and `stop` keep the raw XMLTV timestamps so the source's own
/// timezone encoding passes through to the output untouched; the parsed
/// `start_time`/`end_time` instants exist for validation and consumers that
/// want real timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpgProgram {
    pub channel_id: String,
    pub start: String,
    pub stop: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub icon: Option<String>,
}

/// The merged output: channels deduplicated by id in first-seen order,
/// programmes concatenated per source in declared source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedGuide {
    pub channels: Vec<EpgChannel>,
    pub programs: Vec<EpgProgram>,
}

impl CombinedGuide {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.programs.is_empty()
    }
}

/// A source dropped from the merge, with the reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSource {
    pub name: String,
    pub reason: String,
}

/// Accounting for one merge run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    pub sources_total: usize,
    pub sources_merged: usize,
    pub skipped: Vec<SkippedSource>,
    pub duplicate_channels: usize,
    pub malformed_elements: usize,
}

impl MergeReport {
    /// True when no source contributed anything, which callers treat as fatal.
    pub fn all_failed(&self) -> bool {
        self.sources_merged == 0
    }
}
