//! Convergence detection for infinite-scroll feeds
//!
//! A feed is observed once per scroll. Any change in the item count resets the
//! stall counter; the feed has converged once the count stayed the same for
//! `stall_limit` consecutive observations. An optional cap ends the feed as soon
//! as enough items are rendered, regardless of growth.

/// Verdict for one observation of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The count changed; new items may be waiting
    Grew,
    /// Unchanged, but the stall limit is not reached yet
    Stalled,
    /// Unchanged for `stall_limit` observations in a row
    Converged,
    /// The cap was reached
    Capped,
}

impl Observation {
    /// Returns true if the feed should not be scrolled again
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Converged | Self::Capped)
    }
}

/// Tracks one feed's observed counts
#[derive(Debug, Clone)]
pub struct Convergence {
    stall_limit: u32,
    cap: Option<usize>,
    last: Option<usize>,
    stalls: u32,
}

impl Convergence {
    pub fn new(stall_limit: u32, cap: Option<usize>) -> Self {
        Self {
            stall_limit,
            cap,
            last: None,
            stalls: 0,
        }
    }

    /// Records the current item count
    ///
    /// The first observation always counts as growth, whatever the count.
    pub fn observe(&mut self, count: usize) -> Observation {
        if self.cap.is_some_and(|cap| count >= cap) {
            self.last = Some(count);
            return Observation::Capped;
        }

        if self.last == Some(count) {
            self.stalls += 1;
            if self.stalls >= self.stall_limit {
                Observation::Converged
            } else {
                Observation::Stalled
            }
        } else {
            self.last = Some(count);
            self.stalls = 0;
            Observation::Grew
        }
    }
}
