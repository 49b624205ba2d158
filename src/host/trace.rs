//! Replay host: delivers recorded events to the installed hook.
//!
//! Traces are JSON lines, one event per line:
//!
//! ```text
//! {"kind":"call","file":"app/a.rb","line":10,"method":7,"wall_us":1000}
//! {"kind":"return","file":"app/a.rb","line":10,"method":7,"wall_us":6000}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Every event must carry
//! the same set of measurements (`wall_us`, `cpu_us`, `allocs`) as the first
//! one, and `cpu_us`/`allocs` require `wall_us`: deltas are only meaningful
//! between samples of the same clock.

use super::{EventHook, Host};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind, FrameIdentity, Location};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One recorded host event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub kind: EventKind,
    /// Caller file and line at the time of the event.
    pub file: String,
    pub line: i64,
    #[serde(default)]
    pub receiver: u64,
    #[serde(default)]
    pub method: u64,
    #[serde(default)]
    pub owner: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_us: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_us: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocs: Option<u64>,
    /// Next caller frame out, consulted for synthetic calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_line: Option<i64>,
}

impl TraceEvent {
    pub fn new(kind: EventKind, file: impl Into<String>, line: i64) -> Self {
        TraceEvent {
            kind,
            file: file.into(),
            line,
            receiver: 0,
            method: 0,
            owner: 0,
            wall_us: None,
            cpu_us: None,
            allocs: None,
            outer_file: None,
            outer_line: None,
        }
    }

    pub fn identity(mut self, receiver: u64, method: u64, owner: u64) -> Self {
        self.receiver = receiver;
        self.method = method;
        self.owner = owner;
        self
    }

    pub fn at(mut self, wall_us: u64) -> Self {
        self.wall_us = Some(wall_us);
        self
    }

    pub fn cpu(mut self, cpu_us: u64) -> Self {
        self.cpu_us = Some(cpu_us);
        self
    }

    pub fn allocs(mut self, allocs: u64) -> Self {
        self.allocs = Some(allocs);
        self
    }

    pub fn outer(mut self, file: impl Into<String>, line: i64) -> Self {
        self.outer_file = Some(file.into());
        self.outer_line = Some(line);
        self
    }

    /// Recorded measurement, present when the trace carries a wall time.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.wall_us.map(|wall_time| Snapshot {
            wall_time,
            cpu_time: self.cpu_us.unwrap_or(0),
            allocated_objects: self.allocs.unwrap_or(0),
        })
    }

    /// Which measurements the event carries: wall, cpu, allocations.
    fn measurements(&self) -> [bool; 3] {
        [
            self.wall_us.is_some(),
            self.cpu_us.is_some(),
            self.allocs.is_some(),
        ]
    }

    fn frame_identity(&self) -> FrameIdentity {
        FrameIdentity::new(self.receiver, self.method, self.owner)
    }
}

/// In-process host replaying `TraceEvent`s.
#[derive(Default)]
pub struct TraceHost {
    hook: Option<EventHook>,
    delivered: u64,
}

impl TraceHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hooked(&self) -> bool {
        self.hook.is_some()
    }

    /// Events handed to a hook so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Deliver one event. Dropped when no hook is installed.
    pub fn emit(&mut self, event: &TraceEvent) {
        let Some(hook) = self.hook.as_mut() else {
            return;
        };

        let inner = Location::new(&event.file, event.line);
        let outer = event
            .outer_file
            .as_deref()
            .zip(event.outer_line)
            .map(|(file, line)| Location::new(file, line));

        let both;
        let one;
        let frames: &[Location<'_>] = match outer {
            Some(outer) => {
                both = [inner, outer];
                &both
            }
            None => {
                one = [inner];
                &one
            }
        };

        hook(&Event {
            kind: event.kind,
            identity: event.frame_identity(),
            frames,
            snapshot: event.snapshot(),
        });
        self.delivered += 1;
    }

    pub fn replay(&mut self, events: &[TraceEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

impl Host for TraceHost {
    fn add_event_hook(&mut self, hook: EventHook) {
        self.hook = Some(hook);
    }

    fn remove_event_hook(&mut self) {
        self.hook = None;
    }
}

const MEASUREMENTS: [&str; 3] = ["wall_us", "cpu_us", "allocs"];

/// Parse a JSON-lines trace.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    // Measurements of the first event and its line number.
    let mut shape: Option<([bool; 3], usize)> = None;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| Error::TraceParse {
            line: idx + 1,
            source,
        })?;
        check_measurements(&event, idx + 1, &mut shape)?;
        events.push(event);
    }
    Ok(events)
}

fn check_measurements(
    event: &TraceEvent,
    line: usize,
    shape: &mut Option<([bool; 3], usize)>,
) -> Result<()> {
    let here = event.measurements();
    if !here[0] && (here[1] || here[2]) {
        return Err(Error::TraceShape {
            line,
            reason: "`cpu_us` and `allocs` require `wall_us`".to_string(),
        });
    }

    let (expected, first_line) = *shape.get_or_insert((here, line));
    if let Some(field) = (0..MEASUREMENTS.len()).find(|&i| here[i] != expected[i]) {
        let presence = if expected[field] { "present" } else { "absent" };
        return Err(Error::TraceShape {
            line,
            reason: format!(
                "`{}` is {} on line {} and must be on every event",
                MEASUREMENTS[field], presence, first_line
            ),
        });
    }
    Ok(())
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceEvent>> {
    let file = File::open(path).map_err(|source| Error::TraceRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(BufReader::new(file))
}
