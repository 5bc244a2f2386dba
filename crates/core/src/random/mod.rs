use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform random bits for the scene composer.
pub trait RandomSource {
    /// Next 64 uniformly distributed bits.
    fn next_u64(&mut self) -> u64;

    /// Uniform float in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[low, high]`. Returns `low` when `high <= low`.
    fn range_inclusive(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        match (high - low).checked_add(1) {
            Some(span) => low + self.next_u64() % span,
            None => self.next_u64(),
        }
    }

    /// Bernoulli trial that succeeds with `probability`.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

/// Xorshift64 generator; deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        let state = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Seeds from the wall clock.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos)
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}
