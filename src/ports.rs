//! Host port allocation for server-side projects
//!
//! The allocator keeps no state. Callers pass the set of ports currently assigned across all
//! project records and must hold the orchestrator's allocation lock from that read until the new
//! record is stored.

use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PORT_RANGE_START: u16 = 10000;
pub const DEFAULT_PORT_RANGE_END: u16 = 20000;
const DEFAULT_MAX_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("No available ports in range {start}-{end}")]
    Exhausted { start: u16, end: u16 },
}

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            usize::from(self.end - self.start) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_RANGE_START, DEFAULT_PORT_RANGE_END)
    }
}

#[derive(Debug, Clone)]
pub struct PortAllocator {
    range: PortRange,
    max_attempts: usize,
}

impl PortAllocator {
    pub fn new(range: PortRange) -> Self {
        Self {
            range,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Picks a port in range that is not in `existing`.
    ///
    /// Random sampling first; once the attempt budget is spent a linear scan finds any
    /// remaining gap, so only a fully saturated range fails.
    pub fn allocate(&self, existing: &HashSet<u16>) -> Result<u16, PortError> {
        let exhausted = PortError::Exhausted {
            start: self.range.start,
            end: self.range.end,
        };
        if self.range.is_empty() {
            return Err(exhausted);
        }

        let mut rng = rand::thread_rng();
        for attempt in 0..self.max_attempts {
            let port = rng.gen_range(self.range.start..=self.range.end);
            if !existing.contains(&port) {
                debug!(port, attempt, "Allocated port by sampling");
                return Ok(port);
            }
        }

        let port = (self.range.start..=self.range.end)
            .find(|p| !existing.contains(p))
            .ok_or(exhausted)?;
        debug!(port, "Allocated port by scan after sampling budget ran out");
        Ok(port)
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new(PortRange::default())
    }
}
