//! Waiting between attempts and cycles

use std::time::Duration;

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the calling thread
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;

    /// Records requested waits without waiting
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.slept.push(duration);
        }
    }
}
