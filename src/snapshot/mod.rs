//! Point-in-time measurements of wall time, CPU time and allocations.
//!
//! A `Snapshot` is only ever meaningful as the difference between two
//! chronologically ordered captures, so arithmetic wraps instead of
//! panicking.

mod alloc;
mod cpu_clock;

pub use alloc::{CountingAllocator, allocated_objects};

use serde::Serialize;
use std::ops::{AddAssign, Sub};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Wall time, CPU time (both in microseconds) and the allocation counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub wall_time: u64,
    pub cpu_time: u64,
    pub allocated_objects: u64,
}

impl Snapshot {
    pub const ZERO: Snapshot = Snapshot {
        wall_time: 0,
        cpu_time: 0,
        allocated_objects: 0,
    };

    /// Snapshot with only the wall clock component set.
    pub const fn wall(wall_time: u64) -> Self {
        Snapshot {
            wall_time,
            cpu_time: 0,
            allocated_objects: 0,
        }
    }

    /// `self - earlier`, component-wise.
    pub fn diff(&self, earlier: &Snapshot) -> Snapshot {
        *self - *earlier
    }

    /// `self += delta`, component-wise.
    pub fn accumulate(&mut self, delta: &Snapshot) {
        *self += *delta;
    }
}

impl Sub for Snapshot {
    type Output = Snapshot;

    fn sub(self, rhs: Snapshot) -> Snapshot {
        Snapshot {
            wall_time: self.wall_time.wrapping_sub(rhs.wall_time),
            cpu_time: self.cpu_time.wrapping_sub(rhs.cpu_time),
            allocated_objects: self.allocated_objects.wrapping_sub(rhs.allocated_objects),
        }
    }
}

impl AddAssign for Snapshot {
    fn add_assign(&mut self, rhs: Snapshot) {
        self.wall_time = self.wall_time.wrapping_add(rhs.wall_time);
        self.cpu_time = self.cpu_time.wrapping_add(rhs.cpu_time);
        self.allocated_objects = self.allocated_objects.wrapping_add(rhs.allocated_objects);
    }
}

/// Which optional components a `SystemClock` fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub cpu_time: bool,
    pub allocations: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics {
            cpu_time: true,
            allocations: true,
        }
    }
}

/// Source of snapshots for events that do not carry their own.
pub trait Clock {
    fn capture(&self) -> Snapshot;
}

/// Process epoch for the monotonic wall clock.
static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

static CPU_CLOCK_REPORTED: AtomicBool = AtomicBool::new(false);

/// Clock backed by the monotonic wall clock, the process CPU clock and the
/// `CountingAllocator` counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    metrics: Metrics,
}

impl SystemClock {
    pub fn new(metrics: Metrics) -> Self {
        // Anchor the epoch before the first measurement.
        let _ = epoch();
        SystemClock { metrics }
    }
}

impl Clock for SystemClock {
    fn capture(&self) -> Snapshot {
        let wall_time = epoch().elapsed().as_micros() as u64;

        let cpu_time = if self.metrics.cpu_time {
            cpu_clock::process_cpu_usec().unwrap_or_else(|| {
                if !CPU_CLOCK_REPORTED.swap(true, Ordering::Relaxed) {
                    tracing::debug!("process CPU clock unavailable; recording cpu_time as 0");
                }
                0
            })
        } else {
            0
        };

        let allocated_objects = if self.metrics.allocations {
            allocated_objects()
        } else {
            0
        };

        Snapshot {
            wall_time,
            cpu_time,
            allocated_objects,
        }
    }
}
