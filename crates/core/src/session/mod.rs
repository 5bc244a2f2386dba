use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::info;

use crate::{
    random::{RandomSource, XorShift64},
    scene::SceneComposer,
    terminal::Terminal,
    timeline::FrameClock,
    Result,
};

/// Stops a running [`AnimationSession`] from another task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    running: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Asks the loop to exit. It notices on its next tick, so the current
    /// frame delay still elapses first.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Returns whether the loop has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Totals reported when an animation loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub circles: u64,
}

/// Owns the lifecycle of one animation loop: the composer, the terminal it
/// writes to and the running flag.
#[derive(Debug)]
pub struct AnimationSession<R = XorShift64> {
    composer: SceneComposer<R>,
    terminal: Terminal,
    running: Arc<AtomicBool>,
    frame_limit: Option<u64>,
}

impl<R: RandomSource> AnimationSession<R> {
    /// Creates a session that runs until stopped.
    pub fn new(composer: SceneComposer<R>, terminal: Terminal) -> Self {
        Self {
            composer,
            terminal,
            running: Arc::new(AtomicBool::new(true)),
            frame_limit: None,
        }
    }

    /// Exits on its own after `limit` frames.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Returns a handle that can stop the loop from another task.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            running: self.running.clone(),
        }
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Emits one frame per tick until stopped, sleeping on `clock` between
    /// frames.
    pub async fn run(&mut self, clock: &impl FrameClock) -> Result<SessionSummary> {
        let delay = self.composer.config().frame_delay();
        let mut summary = SessionSummary::default();
        info!(
            width = self.composer.width(),
            delay_ms = delay.as_millis() as u64,
            frame_limit = self.frame_limit,
            "animation started"
        );

        while self.running.load(Ordering::Acquire) {
            if self.frame_limit.is_some_and(|limit| summary.frames >= limit) {
                break;
            }

            let frame = self.composer.tick();
            self.terminal.write(&frame.line)?;
            summary.frames += 1;
            summary.circles += frame.circles as u64;

            clock.sleep(delay).await;
        }

        self.running.store(false, Ordering::Release);
        info!(frames = summary.frames, circles = summary.circles, "animation stopped");
        Ok(summary)
    }
}
