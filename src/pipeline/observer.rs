//! Transition hooks for the controller, with the default `tracing` sink

use crate::error::PipelineError;
use crate::types::{CycleOutcome, CycleReport, FailureClass, RenderReport, SelectedCandidate, Stage};
use crate::utils::format_bytes;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Called by the controller at well-defined points. Every hook defaults to
/// doing nothing.
#[allow(unused_variables)]
pub trait Observer {
    fn cycle_started(&mut self, cycle: u64) {}
    fn stage_entered(&mut self, stage: Stage, attempt: u32) {}
    fn listing_fetched(&mut self, candidates: usize, entries: usize) {}
    fn downloaded(&mut self, candidate: &SelectedCandidate, bytes: u64) {}
    fn rendered(&mut self, report: &RenderReport) {}
    fn present_failed(&mut self, error: &std::io::Error) {}
    fn stage_failed(&mut self, stage: Stage, class: FailureClass, detail: &str, attempt: u32) {}
    fn backing_off(&mut self, delay: Duration, next_attempt: u32) {}
    fn cycle_finished(&mut self, report: &CycleReport) {}
    fn halted(&mut self, error: &PipelineError) {}
}

pub struct TracingObserver;

impl Observer for TracingObserver {
    fn cycle_started(&mut self, cycle: u64) {
        info!(cycle, "Cycle starting");
    }

    fn stage_entered(&mut self, stage: Stage, attempt: u32) {
        debug!(stage = stage.as_str(), attempt, "Entering stage");
    }

    fn listing_fetched(&mut self, candidates: usize, entries: usize) {
        debug!(candidates, entries, "Listing fetched");
    }

    fn downloaded(&mut self, candidate: &SelectedCandidate, bytes: u64) {
        info!(
            name = %candidate.name,
            index = candidate.index,
            size = %format_bytes(bytes),
            "Asset downloaded"
        );
    }

    fn rendered(&mut self, report: &RenderReport) {
        info!(
            width = report.image_width,
            height = report.image_height,
            rows = report.rows_drawn,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Image rendered"
        );
    }

    fn present_failed(&mut self, error: &std::io::Error) {
        warn!(error = %error, "Failed to present frame");
    }

    fn stage_failed(&mut self, stage: Stage, class: FailureClass, detail: &str, attempt: u32) {
        warn!(
            stage = stage.as_str(),
            class = class.as_str(),
            attempt,
            error = %detail,
            "Stage failed"
        );
    }

    fn backing_off(&mut self, delay: Duration, next_attempt: u32) {
        debug!(delay_secs = delay.as_secs(), next_attempt, "Backing off");
    }

    fn cycle_finished(&mut self, report: &CycleReport) {
        match report.outcome {
            CycleOutcome::Done => info!(
                shown = report.shown.as_deref().unwrap_or(""),
                failures = report.failures,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Cycle done"
            ),
            CycleOutcome::Exhausted => warn!(
                failures = report.failures,
                last_failure = report.last_failure.map(|c| c.as_str()).unwrap_or(""),
                started_at = %report.started_at.format("%H:%M:%S"),
                "Cycle exhausted its attempts"
            ),
        }
    }

    fn halted(&mut self, error: &PipelineError) {
        error!(error = %error, "Storage unusable, halting");
    }
}
