//! Pipeline module - listing fetch, selection, download, verification and
//! rendering, sequenced by the retry controller

mod clock;
mod controller;
mod download;
mod listing;
mod observer;
mod render;
mod select;
mod sniff;

pub use clock::ThreadSleeper;
pub use controller::{Controller, Endpoints, RetryPolicy};
pub use select::seeded_rng;
