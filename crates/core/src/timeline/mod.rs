use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

/// Suspension primitive used between frames.
pub trait FrameClock: Send + Sync {
    /// Resolves once `duration` has passed on this clock.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Wall-clock timer backed by the tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl FrameClock for TokioClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, Default)]
struct VirtualState {
    elapsed: Duration,
    sleeps: u64,
}

/// Clock that never waits: it records the requested time and yields to the
/// scheduler so other tasks still get a turn. Clones share their totals.
#[derive(Debug, Default, Clone)]
pub struct VirtualClock {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualClock {
    /// Creates a clock at zero elapsed time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time requested across every sleep.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).elapsed
    }

    /// Number of sleeps requested.
    pub fn sleeps(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sleeps
    }

    fn advance(&self, delta: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.elapsed += delta;
        state.sleeps += 1;
    }
}

impl FrameClock for VirtualClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        tokio::task::yield_now()
    }
}
