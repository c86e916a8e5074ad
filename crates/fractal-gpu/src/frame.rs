use std::time::{Duration, Instant};

/// One iteration of the host's frame loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Milliseconds since the clock started.
    pub time_ms: f64,
    /// Milliseconds since the previous tick (0 for the first).
    pub delta_ms: f64,
    pub index: u64,
}

/// Turns host instants into `FrameTick`s.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Option<Instant>,
    index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last: None,
            index: 0,
        }
    }

    pub fn tick(&mut self) -> FrameTick {
        self.tick_at(Instant::now())
    }

    /// Instants earlier than the previous tick count as no time passing.
    pub fn tick_at(&mut self, now: Instant) -> FrameTick {
        let delta_ms = self
            .last
            .map_or(0.0, |last| millis(now.saturating_duration_since(last)));
        let tick = FrameTick {
            time_ms: millis(now.saturating_duration_since(self.start)),
            delta_ms,
            index: self.index,
        };
        self.last = Some(self.last.map_or(now, |last| last.max(now)));
        self.index += 1;
        tick
    }
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
