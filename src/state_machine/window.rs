//! Hysteresis window: the last three filtered samples of the current phase

use std::collections::VecDeque;

use crate::types::{FilteredSample, Triplet};

/// Number of consecutive samples a transition predicate must hold on.
pub const WINDOW_CAPACITY: usize = 3;

/// Fixed-capacity, oldest-first buffer of filtered samples.
///
/// Owned by exactly one state machine and emptied on every phase change, so
/// it never mixes samples from two phases.
#[derive(Debug, Clone, Default)]
pub struct HysteresisWindow {
    samples: VecDeque<FilteredSample>,
}

impl HysteresisWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    /// Append a sample, evicting the oldest once over capacity.
    pub fn push(&mut self, sample: FilteredSample) {
        if self.samples.len() == WINDOW_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// The window contents as a triplet, once it is full.
    pub fn triplet(&self) -> Option<Triplet> {
        if self.samples.len() < WINDOW_CAPACITY {
            return None;
        }
        Some(Triplet::from_samples([
            self.samples[0],
            self.samples[1],
            self.samples[2],
        ]))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilteredSample> {
        self.samples.iter()
    }
}
