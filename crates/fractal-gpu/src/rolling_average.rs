use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 30;

/// Mean of the last `capacity` samples, updated in amortised O(1).
///
/// A window holding one repeated value reports exactly that value.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    /// Samples added since `sum` was last recomputed from the window.
    since_rebase: usize,
    /// Length of the trailing run of identical samples.
    run: usize,
}

impl RollingAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            since_rebase: 0,
            run: 0,
        }
    }

    pub fn add_sample(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.run = match self.samples.back() {
            Some(&last) if last == value => self.run + 1,
            _ => 1,
        };
        self.samples.push_back(value);
        self.sum += value;

        // Drop the rounding error carried by the running sum once per wrap.
        self.since_rebase += 1;
        if self.since_rebase >= self.capacity {
            self.sum = self.samples.iter().sum();
            self.since_rebase = 0;
        }
    }

    /// 0 before any sample.
    pub fn get(&self) -> f64 {
        match self.samples.back() {
            None => 0.0,
            Some(&last) if self.run >= self.samples.len() => last,
            Some(_) => self.sum / self.samples.len() as f64,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RollingAverage {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
