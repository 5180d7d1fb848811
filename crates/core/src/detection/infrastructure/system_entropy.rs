use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::detection::domain::randomness::{Clock, RandomSource};

const FRACTION_MASK: u64 = (1 << 53) - 1;

/// Fractions drawn from the random bits of a fresh v4 UUID per call.
///
/// Good enough for display ids and simulated scores; not for anything that
/// needs guaranteed uniqueness.
#[derive(Debug, Default)]
pub struct UuidRandomSource;

impl RandomSource for UuidRandomSource {
    fn next_fraction(&mut self) -> f64 {
        // The low 53 bits sit below the version and variant fields and fill
        // an f64 mantissa exactly, giving a value in [0, 1).
        let bits = Uuid::new_v4().as_u128() as u64 & FRACTION_MASK;
        bits as f64 / (1u64 << 53) as f64
    }
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
