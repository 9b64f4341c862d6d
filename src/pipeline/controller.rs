//! Bounded-attempt state machine sequencing the pipeline stages

use super::clock::Sleeper;
use super::download::download_asset;
use super::listing::fetch_listing;
use super::observer::{Observer, TracingObserver};
use super::render::render_asset;
use super::select::select_candidate;
use super::sniff::sniff_asset;
use crate::constants::*;
use crate::display::Surface;
use crate::error::{PipelineError, Result};
use crate::net::Transport;
use crate::storage::AssetSlot;
use crate::types::*;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

/// Attempt bound and per-class waits
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Listing, selection, download and storage failures
    pub network_backoff: Duration,
    pub unsupported_backoff: Duration,
    pub decode_backoff: Duration,
    /// Wait between the end of one cycle and the start of the next
    pub cycle_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            network_backoff: Duration::from_secs(DEFAULT_NETWORK_RETRY_SECS),
            unsupported_backoff: Duration::from_secs(DEFAULT_UNSUPPORTED_RETRY_SECS),
            decode_backoff: Duration::from_secs(DEFAULT_DECODE_RETRY_SECS),
            cycle_interval: Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, class: FailureClass) -> Duration {
        match class {
            FailureClass::UnsupportedFormat => self.unsupported_backoff,
            FailureClass::Decode => self.decode_backoff,
            FailureClass::Network
            | FailureClass::EmptyResponse
            | FailureClass::Parse
            | FailureClass::EmptyDirectory
            | FailureClass::Storage
            | FailureClass::Download => self.network_backoff,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub listing_url: String,
    /// Prefix the candidate name is appended to
    pub raw_base_url: String,
}

enum StepError {
    Pipeline(PipelineError),
    Unsupported,
}

impl From<PipelineError> for StepError {
    fn from(e: PipelineError) -> Self {
        StepError::Pipeline(e)
    }
}

/// Data carried between stages of one attempt
#[derive(Default)]
struct AttemptState {
    listing: Option<CandidateSet>,
    selected: Option<SelectedCandidate>,
}

pub struct Controller<T: Transport, S: Surface, Z: Sleeper> {
    transport: T,
    surface: S,
    sleeper: Z,
    observer: Box<dyn Observer>,
    rng: StdRng,
    slot: AssetSlot,
    endpoints: Endpoints,
    policy: RetryPolicy,
    cycles: u64,
}

impl<T: Transport, S: Surface, Z: Sleeper> Controller<T, S, Z> {
    pub fn new(
        transport: T,
        surface: S,
        sleeper: Z,
        slot: AssetSlot,
        endpoints: Endpoints,
        policy: RetryPolicy,
        rng: StdRng,
    ) -> Self {
        Self {
            transport,
            surface,
            sleeper,
            observer: Box::new(TracingObserver),
            rng,
            slot,
            endpoints,
            policy,
            cycles: 0,
        }
    }

    #[cfg(test)]
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    /// Run cycles back to back, waiting `cycle_interval` between them.
    /// `limit` of `None` runs until storage becomes unusable.
    pub fn run(&mut self, limit: Option<u64>) -> Result<u64> {
        let mut completed = 0;
        loop {
            self.run_cycle()?;
            completed += 1;
            if limit.is_some_and(|n| completed >= n) {
                return Ok(completed);
            }
            self.sleeper.sleep(self.policy.cycle_interval);
        }
    }

    /// One outer cycle: attempts from `FetchListing` through `Render` until
    /// one succeeds or the attempt bound is reached. Only an unusable
    /// storage slot is returned as an error.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let started_at = chrono::Local::now();
        let clock = Instant::now();
        self.cycles += 1;
        self.observer.cycle_started(self.cycles);

        let mut cycle = AttemptCycle::new(self.policy.max_attempts);
        let mut state = AttemptState::default();
        let mut stage = Stage::Idle;

        let outcome = loop {
            match stage {
                Stage::Done => break CycleOutcome::Done,
                Stage::Idle | Stage::Backoff => {
                    state = AttemptState::default();
                    stage = Stage::FetchListing;
                    continue;
                }
                _ => {}
            }

            self.observer.stage_entered(stage, cycle.attempt);
            match self.step(stage, &mut state) {
                Ok(next) => stage = next,
                Err(StepError::Pipeline(e)) if e.is_fatal() => {
                    self.observer.halted(&e);
                    return Err(e);
                }
                Err(err) => {
                    let (class, detail) = match err {
                        StepError::Pipeline(e) => (e.class(), e.to_string()),
                        StepError::Unsupported => {
                            (FailureClass::UnsupportedFormat, "unrecognized header".to_string())
                        }
                    };
                    self.observer.stage_failed(stage, class, &detail, cycle.attempt);
                    if !cycle.record_failure(class) {
                        break CycleOutcome::Exhausted;
                    }
                    let delay = self.policy.backoff_for(class);
                    self.observer.backing_off(delay, cycle.attempt);
                    if !delay.is_zero() {
                        self.sleeper.sleep(delay);
                    }
                    stage = Stage::Backoff;
                }
            }
        };

        let report = CycleReport {
            outcome,
            failures: cycle.attempt,
            last_failure: cycle.last_failure,
            shown: match outcome {
                CycleOutcome::Done => state.selected.map(|s| s.name),
                CycleOutcome::Exhausted => None,
            },
            started_at,
            elapsed: clock.elapsed(),
        };
        self.observer.cycle_finished(&report);
        Ok(report)
    }

    fn step(&mut self, stage: Stage, state: &mut AttemptState) -> std::result::Result<Stage, StepError> {
        match stage {
            Stage::FetchListing => {
                let set = fetch_listing(&self.transport, &self.endpoints.listing_url)?;
                self.observer.listing_fetched(set.len(), set.listing_len());
                state.listing = Some(set);
                Ok(Stage::SelectAndDownload)
            }
            Stage::SelectAndDownload => {
                let set = state.listing.take().ok_or(PipelineError::EmptyDirectory)?;
                let selected = select_candidate(&set, &mut self.rng, &self.endpoints.raw_base_url)?;
                let bytes = download_asset(&self.transport, &selected.url, &self.slot)?;
                self.observer.downloaded(&selected, bytes);
                state.selected = Some(selected);
                Ok(Stage::Verify)
            }
            Stage::Verify => match sniff_asset(&self.slot)? {
                SniffResult::Recognized(FormatTag::Png) => Ok(Stage::Render),
                SniffResult::Unrecognized => Err(StepError::Unsupported),
            },
            Stage::Render => {
                let report = render_asset(&self.slot, &mut self.surface)?;
                self.observer.rendered(&report);
                if let Err(e) = self.surface.present() {
                    self.observer.present_failed(&e);
                }
                Ok(Stage::Done)
            }
            Stage::Idle | Stage::Backoff | Stage::Done => Ok(Stage::FetchListing),
        }
    }
}
