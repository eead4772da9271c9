use crate::domain::ports::FailureSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Thread-local RNG, a fresh outcome sequence on every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomFailure;

impl FailureSource for RandomFailure {
    fn should_fail(&self, rate: f64) -> bool {
        rand::thread_rng().gen_bool(clamp_rate(rate))
    }
}

/// Seeded RNG, the same seed yields the same outcome sequence.
#[derive(Debug)]
pub struct SeededFailure {
    rng: Mutex<StdRng>,
}

impl SeededFailure {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FailureSource for SeededFailure {
    fn should_fail(&self, rate: f64) -> bool {
        let rate = clamp_rate(rate);
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(rate),
            // 鎖中毒時仍可使用內部狀態
            Err(poisoned) => poisoned.into_inner().gen_bool(rate),
        }
    }
}
