//! Throttled render scheduling.
//!
//! The host drives the scheduler once per display refresh (winit's
//! `RedrawRequested`). Each tick either renders or is skipped by the
//! throttle, and reports whether the host should request another tick.
//! Cancelling the scheduler's token ends the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::RenderError;
use crate::config::SchedulerConfig;

/// Shared flag that stops a render loop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What the scheduler drives each tick.
pub trait FrameTarget {
    /// Advance damped camera motion.
    fn update_controls(&mut self) -> bool;

    fn render(&mut self) -> Result<(), RenderError>;
}

/// Result of one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Too soon after the last render
    Throttled,
    Cancelled,
}

impl TickOutcome {
    /// Whether the host should schedule another tick.
    pub fn should_continue(&self) -> bool {
        !matches!(self, TickOutcome::Cancelled)
    }
}

/// Renders at most once per throttle interval.
///
/// The first tick renders unconditionally without updating the controls.
/// Later ticks render only when strictly more than the throttle interval has
/// passed since the last render, and update the controls first.
#[derive(Debug)]
pub struct RenderScheduler {
    throttle_ms: f64,
    last_render_ms: Option<f64>,
    cancel: CancelToken,
    started: Instant,
}

impl RenderScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self::with_throttle(Duration::from_secs_f64(config.throttle_ms.max(0.0) / 1000.0))
    }

    pub fn with_throttle(throttle: Duration) -> Self {
        Self {
            throttle_ms: throttle.as_secs_f64() * 1000.0,
            last_render_ms: None,
            cancel: CancelToken::new(),
            started: Instant::now(),
        }
    }

    /// Token that cancels this scheduler. Clones share the flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Timestamp of the last render, in milliseconds
    pub fn last_render_ms(&self) -> Option<f64> {
        self.last_render_ms
    }

    /// Milliseconds since the scheduler was created.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Tick at the current wall-clock time.
    pub fn tick_now<T: FrameTarget>(&mut self, target: &mut T) -> Result<TickOutcome, RenderError> {
        let now = self.elapsed_ms();
        self.tick(now, target)
    }

    /// Tick at `now_ms`. Timestamps must not go backwards.
    pub fn tick<T: FrameTarget>(
        &mut self,
        now_ms: f64,
        target: &mut T,
    ) -> Result<TickOutcome, RenderError> {
        if self.cancel.is_cancelled() {
            return Ok(TickOutcome::Cancelled);
        }

        match self.last_render_ms {
            None => {
                target.render()?;
            }
            Some(last) => {
                if now_ms - last <= self.throttle_ms {
                    return Ok(TickOutcome::Throttled);
                }
                target.update_controls();
                target.render()?;
            }
        }

        self.last_render_ms = Some(now_ms);
        Ok(TickOutcome::Rendered)
    }

    /// Drive the scheduler over a sequence of frame timestamps until it runs
    /// out or is cancelled. Returns how many frames were rendered.
    pub fn run<T, I>(&mut self, frames: I, target: &mut T) -> Result<usize, RenderError>
    where
        T: FrameTarget,
        I: IntoIterator<Item = f64>,
    {
        let mut rendered = 0;
        for now_ms in frames {
            match self.tick(now_ms, target)? {
                TickOutcome::Rendered => rendered += 1,
                TickOutcome::Throttled => {}
                TickOutcome::Cancelled => break,
            }
        }
        Ok(rendered)
    }
}
