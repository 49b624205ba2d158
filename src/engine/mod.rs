//! The call-stack accounting engine.
//!
//! Every host event goes through `Engine::on_event`: the caller's file is
//! resolved through a one-entry cache in front of the registry, untracked
//! events are dropped, and tracked ones push or unwind the shadow stack.
//! Returns hand the closed frame to the accountant.

mod accounting;

use crate::config::ProfilerConfig;
use crate::event::{Event, EventKind, FrameIdentity};
use crate::registry::{FileId, FileRegistry, Selector};
use crate::report::{Report, SessionStats};
use crate::snapshot::{Clock, Snapshot, SystemClock};
use crate::stack::{Frame, ShadowStack};

/// Highest line number attributed. Events past it are treated as untracked
/// rather than growing a line table to match.
pub const MAX_LINE: u32 = 1_000_000;

/// Most recent `(identifier, result)` lookup. Consecutive events usually
/// come from the same file.
#[derive(Debug, Default)]
struct LookupCache {
    file: String,
    result: Option<FileId>,
    valid: bool,
}

#[derive(Debug)]
pub struct Engine<C: Clock = SystemClock> {
    registry: FileRegistry,
    stack: ShadowStack,
    clock: C,
    cache: LookupCache,
    stats: SessionStats,
}

impl Engine<SystemClock> {
    pub fn new(config: &ProfilerConfig) -> Self {
        Self::with_clock(config, SystemClock::new(config.metrics))
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(config: &ProfilerConfig, clock: C) -> Self {
        Engine {
            registry: FileRegistry::new(config.line_headroom),
            stack: ShadowStack::new(config.stack_capacity),
            clock,
            cache: LookupCache::default(),
            stats: SessionStats::default(),
        }
    }

    /// Discard all state from a previous window and track `selector`.
    pub fn begin(&mut self, selector: Selector) {
        self.registry.configure(selector);
        self.stack.clear();
        self.cache = LookupCache::default();
        self.stats = SessionStats::default();
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn stack(&self) -> &ShadowStack {
        &self.stack
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            pattern_evaluations: self.registry.pattern_evaluations(),
            ..self.stats
        }
    }

    pub fn report(&self) -> Report {
        Report::collect(&self.registry, self.stats())
    }

    pub fn on_event(&mut self, event: &Event<'_>) {
        self.stats.events += 1;

        let Some(caller) = event.caller() else {
            return;
        };
        if caller.file.is_empty() {
            return;
        }
        let line = match u32::try_from(caller.line) {
            Ok(line) if line > 0 && line <= MAX_LINE => line,
            _ => return,
        };
        let Some(file) = self.resolve(caller.file) else {
            return;
        };
        self.stats.tracked_events += 1;

        let now = event.snapshot.unwrap_or_else(|| self.clock.capture());
        if event.kind.is_call() {
            self.on_call(event.kind, event.identity, file, line, now);
        } else {
            self.on_return(event.kind, &event.identity, file, line, now);
        }
    }

    fn resolve(&mut self, identifier: &str) -> Option<FileId> {
        if self.cache.valid && self.cache.file == identifier {
            return self.cache.result;
        }
        let result = self.registry.lookup(identifier);
        self.cache.file.clear();
        self.cache.file.push_str(identifier);
        self.cache.result = result;
        self.cache.valid = true;
        result
    }

    fn on_call(
        &mut self,
        kind: EventKind,
        identity: FrameIdentity,
        file: FileId,
        line: u32,
        now: Snapshot,
    ) {
        let previous = self.stack.top().map(|frame| frame.file);
        let frame = Frame {
            kind,
            identity,
            file,
            line,
            start: now,
        };

        if !self.stack.push(frame) {
            self.stats.overflowed_frames += 1;
            if self.stats.overflowed_frames == 1 {
                tracing::debug!(
                    capacity = self.stack.capacity(),
                    "shadow stack full; deeper calls are counted but not attributed"
                );
            }
            return;
        }

        self.registry.file_mut(file).enter(now);
        if let Some(previous) = previous {
            accounting::switch_files(&mut self.registry, previous, Some(file), now);
        }
    }

    fn on_return(
        &mut self,
        kind: EventKind,
        identity: &FrameIdentity,
        file: FileId,
        line: u32,
        now: Snapshot,
    ) {
        if self.stack.pop_overflow() {
            return;
        }

        // Hosts do not always report the same identity on both ends of a
        // call; fall back to the call site.
        let found = self
            .stack
            .find_match(kind, identity)
            .or_else(|| self.stack.find_site_match(kind, file, line));
        let Some(index) = found else {
            self.stats.orphan_returns += 1;
            tracing::trace!(?kind, ?identity, "return without a recorded call");
            return;
        };

        let Some(current) = self.stack.top().map(|frame| frame.file) else {
            return;
        };

        let mut matched = None;
        for frame in self.stack.unwind(index) {
            self.registry.file_mut(frame.file).leave();
            matched = Some(frame);
        }
        let Some(frame) = matched else {
            return;
        };

        let caller = self.stack.top().copied();
        accounting::switch_files(
            &mut self.registry,
            current,
            caller.map(|c| c.file),
            now,
        );
        accounting::record(&mut self.registry, &frame, now, caller.as_ref());
    }
}
