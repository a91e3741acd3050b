pub mod arithmetic;
pub mod binfile;
pub mod parallel;

use std::time::Instant;

pub use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Drop-based phase timer, reported at debug level.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

pub fn start_timer(label: impl FnOnce() -> &'static str) -> Timer {
    Timer {
        label: label(),
        start: Instant::now(),
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        crate::log_debug!("{}: {:?}", self.label, self.start.elapsed());
    }
}
