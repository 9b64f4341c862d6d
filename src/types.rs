//! Common types and data structures

use crate::constants::IMAGE_EXTENSIONS;
use std::time::Duration;

/// One entry of the remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub name: String,
    pub is_file: bool,
}

impl CandidateEntry {
    /// A file whose name carries a recognized image extension
    pub fn is_candidate(&self) -> bool {
        if !self.is_file {
            return false;
        }
        let lower = self.name.to_ascii_lowercase();
        IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

/// Raw listing entry as served by the contents API
#[derive(serde::Deserialize)]
pub struct ListingEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<ListingEntry> for CandidateEntry {
    fn from(entry: ListingEntry) -> Self {
        Self {
            is_file: entry.kind == "file",
            name: entry.name,
        }
    }
}

/// The parsed listing together with the number of entries that pass the
/// candidate filter. Entries are kept in response order.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    listing: Vec<CandidateEntry>,
    count: usize,
}

impl CandidateSet {
    pub fn new(listing: Vec<CandidateEntry>) -> Self {
        let count = listing.iter().filter(|e| e.is_candidate()).count();
        Self { listing, count }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entry at `index` among candidates, re-filtering the listing in order
    pub fn nth(&self, index: usize) -> Option<&CandidateEntry> {
        self.listing.iter().filter(|e| e.is_candidate()).nth(index)
    }

    pub fn listing_len(&self) -> usize {
        self.listing.len()
    }
}

/// Candidate chosen for this attempt plus its download URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedCandidate {
    pub index: usize,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Png,
}

/// Outcome of inspecting the stored asset's leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffResult {
    Recognized(FormatTag),
    Unrecognized,
}

/// States of the retry controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    FetchListing,
    SelectAndDownload,
    Verify,
    Render,
    Done,
    Backoff,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::FetchListing => "fetch_listing",
            Stage::SelectAndDownload => "select_and_download",
            Stage::Verify => "verify",
            Stage::Render => "render",
            Stage::Done => "done",
            Stage::Backoff => "backoff",
        }
    }
}

/// Failure classes, each with its own backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Network,
    EmptyResponse,
    Parse,
    EmptyDirectory,
    Storage,
    Download,
    UnsupportedFormat,
    Decode,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Network => "network",
            FailureClass::EmptyResponse => "empty_response",
            FailureClass::Parse => "parse",
            FailureClass::EmptyDirectory => "empty_directory",
            FailureClass::Storage => "storage",
            FailureClass::Download => "download",
            FailureClass::UnsupportedFormat => "unsupported_format",
            FailureClass::Decode => "decode",
        }
    }
}

/// Retry state, reset at the start of every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptCycle {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_failure: Option<FailureClass>,
}

impl AttemptCycle {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            last_failure: None,
        }
    }

    /// Record a failure. Returns true if another attempt is allowed.
    pub fn record_failure(&mut self, class: FailureClass) -> bool {
        self.attempt += 1;
        self.last_failure = Some(class);
        self.attempt < self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Done,
    Exhausted,
}

/// Summary of one outer cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Failed attempts before the cycle ended
    pub failures: u32,
    pub last_failure: Option<FailureClass>,
    pub shown: Option<String>,
    pub started_at: chrono::DateTime<chrono::Local>,
    pub elapsed: Duration,
}

/// Diagnostics from one decode-and-blit pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub image_width: u32,
    pub image_height: u32,
    pub rows_drawn: u32,
    pub elapsed: Duration,
}
