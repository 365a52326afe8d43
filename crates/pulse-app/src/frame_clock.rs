//! Frame pacing for the propagation tick and the globe's spin.
//!
//! In [`ClockMode::PerFrame`] every presented frame runs exactly one tick and
//! advances animation time by a fixed step, so the animation speed follows
//! the display rate. [`ClockMode::FixedRate`] measures wall time and runs
//! ticks from an accumulator instead, decoupling the two.

use std::time::Instant;

use pulse_config::Config;
use tracing::warn;

/// Longest frame the fixed-rate accumulator accepts before clamping, so a
/// stall never triggers a burst of catch-up ticks.
pub const MAX_FRAME_TIME: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMode {
    /// One tick per frame, animation time advances by the frame step.
    PerFrame,
    /// Ticks run at `hz` against wall time.
    FixedRate { hz: f64 },
}

/// Result of one [`FrameClock::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAdvance {
    /// Propagation ticks to run now.
    pub ticks: u32,
    /// Seconds added to the animation time.
    pub dt: f32,
}

pub struct FrameClock {
    mode: ClockMode,
    frame_dt: f32,
    previous_time: Option<Instant>,
    accumulator: f64,
    cur_time: f32,
    frame_count: u64,
    tick_count: u64,
}

impl FrameClock {
    /// A clock starting at animation time zero. A fixed rate that is not a
    /// positive finite number falls back to per-frame pacing.
    pub fn new(mode: ClockMode, frame_dt: f32) -> Self {
        let mode = match mode {
            ClockMode::FixedRate { hz } if !(hz.is_finite() && hz > 0.0) => {
                warn!("Ignoring fixed tick rate {hz}, using one tick per frame");
                ClockMode::PerFrame
            }
            mode => mode,
        };
        Self {
            mode,
            frame_dt,
            previous_time: None,
            accumulator: 0.0,
            cur_time: 0.0,
            frame_count: 0,
            tick_count: 0,
        }
    }

    /// Pacing for `config`. Capture runs always tick once per frame so the
    /// dumped frames do not depend on how long each one took to write.
    pub fn from_config(config: &Config) -> Self {
        let mode = match config.timing.fixed_rate_hz {
            Some(hz) if !config.capture.enabled() => ClockMode::FixedRate { hz },
            _ => ClockMode::PerFrame,
        };
        Self::new(mode, config.frame_dt())
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Animation time in seconds for the frame about to be drawn.
    pub fn cur_time(&self) -> f32 {
        self.cur_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Close the current frame using the wall clock.
    pub fn advance(&mut self) -> FrameAdvance {
        let now = Instant::now();
        let frame_time = self
            .previous_time
            .map_or(0.0, |previous| now.duration_since(previous).as_secs_f64());
        self.previous_time = Some(now);
        self.advance_by(frame_time)
    }

    /// Close the current frame given its wall-clock duration in seconds.
    /// Per-frame pacing ignores the duration.
    pub fn advance_by(&mut self, frame_time: f64) -> FrameAdvance {
        let advance = match self.mode {
            ClockMode::PerFrame => FrameAdvance {
                ticks: 1,
                dt: self.frame_dt,
            },
            ClockMode::FixedRate { hz } => {
                let mut frame_time = frame_time.max(0.0);
                if frame_time > MAX_FRAME_TIME {
                    warn!(
                        "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                        frame_time * 1000.0,
                        MAX_FRAME_TIME * 1000.0
                    );
                    frame_time = MAX_FRAME_TIME;
                }

                let tick_dt = 1.0 / hz;
                self.accumulator += frame_time;
                let mut ticks = 0;
                while self.accumulator >= tick_dt {
                    self.accumulator -= tick_dt;
                    ticks += 1;
                }
                FrameAdvance {
                    ticks,
                    dt: frame_time as f32,
                }
            }
        };

        self.cur_time += advance.dt;
        self.frame_count += 1;
        self.tick_count += u64::from(advance.ticks);
        advance
    }
}
