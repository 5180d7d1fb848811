use chrono::{DateTime, Utc};

/// Source of uniform fractions in `[0, 1)` used for ids and simulated
/// confidence.
pub trait RandomSource: Send {
    fn next_fraction(&mut self) -> f64;
}

/// Wall clock used to stamp detections.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}
