//! Call and return notifications delivered by the host engine.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Kind of host event. Native (`C*`) events come from builtin methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Call,
    CCall,
    Return,
    CReturn,
}

impl EventKind {
    pub fn is_call(self) -> bool {
        matches!(self, EventKind::Call | EventKind::CCall)
    }

    /// The call kind this return closes. `None` for call kinds.
    pub fn opening_call(self) -> Option<EventKind> {
        match self {
            EventKind::Return => Some(EventKind::Call),
            EventKind::CReturn => Some(EventKind::CCall),
            EventKind::Call | EventKind::CCall => None,
        }
    }
}

/// Opaque identity of the callee, used only to pair a return with its call.
///
/// The fields are whatever the host hands out (object ids, interned method
/// names, class ids); they are compared, never dereferenced. A zero `method`
/// marks the synthetic call the host emits once per method definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameIdentity {
    pub receiver: u64,
    pub method: u64,
    pub owner: u64,
}

impl FrameIdentity {
    pub const fn new(receiver: u64, method: u64, owner: u64) -> Self {
        FrameIdentity {
            receiver,
            method,
            owner,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.method == 0
    }
}

/// A caller source position as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    pub file: &'a str,
    pub line: i64,
}

impl<'a> Location<'a> {
    pub const fn new(file: &'a str, line: i64) -> Self {
        Location { file, line }
    }
}

/// One host notification.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub kind: EventKind,
    pub identity: FrameIdentity,
    /// Innermost caller frames, innermost first. At most two are consulted.
    pub frames: &'a [Location<'a>],
    /// Measurement taken by the host, if it supplies one.
    pub snapshot: Option<Snapshot>,
}

impl<'a> Event<'a> {
    /// Source position the event is attributed to.
    ///
    /// A synthetic call reports the method definition line as its innermost
    /// frame; the real call site is the next frame out.
    pub fn caller(&self) -> Option<&Location<'a>> {
        if self.identity.is_synthetic() && self.frames.len() >= 2 {
            self.frames.get(1)
        } else {
            self.frames.first()
        }
    }
}
