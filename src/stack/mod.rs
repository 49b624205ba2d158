//! Shadow call stack mirroring the host's tracked calls.
//!
//! `depth` counts every tracked call that has not returned yet, including
//! calls past `capacity` that have no recorded frame. Frames past capacity are
//! always the innermost ones, so while `depth > frames.len()` the next return
//! belongs to an unrecorded frame.

use crate::event::{EventKind, FrameIdentity};
use crate::registry::FileId;
use crate::snapshot::Snapshot;

/// One recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub kind: EventKind,
    pub identity: FrameIdentity,
    /// File and line of the call site.
    pub file: FileId,
    pub line: u32,
    pub start: Snapshot,
}

impl Frame {
    /// Whether a return of `kind` from `identity` closes this frame.
    pub fn is_closed_by(&self, kind: EventKind, identity: &FrameIdentity) -> bool {
        if self.identity.is_synthetic() {
            return false;
        }
        kind.opening_call() == Some(self.kind) && self.identity == *identity
    }

    /// Whether a return of `kind` observed at `file:line` closes this frame,
    /// whatever identity the host reported for it.
    pub fn is_closed_at(&self, kind: EventKind, file: FileId, line: u32) -> bool {
        if self.identity.is_synthetic() {
            return false;
        }
        kind.opening_call() == Some(self.kind) && self.file == file && self.line == line
    }

    pub fn same_site(&self, other: &Frame) -> bool {
        self.file == other.file && self.line == other.line
    }
}

#[derive(Debug)]
pub struct ShadowStack {
    frames: Vec<Frame>,
    capacity: usize,
    depth: u64,
}

impl ShadowStack {
    pub fn new(capacity: usize) -> Self {
        ShadowStack {
            frames: Vec::with_capacity(capacity.min(1024)),
            capacity,
            depth: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tracked calls that have not returned, recorded or not.
    pub fn depth(&self) -> u64 {
        self.depth
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn is_overflowing(&self) -> bool {
        self.depth > self.frames.len() as u64
    }

    /// Push a frame. Returns `false` when the stack is full and the frame was
    /// only counted.
    pub fn push(&mut self, frame: Frame) -> bool {
        self.depth += 1;
        if self.depth > self.capacity as u64 {
            return false;
        }
        self.frames.push(frame);
        true
    }

    /// Retire an unrecorded frame past capacity. Returns `false` if the top of
    /// the stack is a recorded frame.
    pub fn pop_overflow(&mut self) -> bool {
        if !self.is_overflowing() {
            return false;
        }
        self.depth -= 1;
        true
    }

    /// Index of the innermost frame closed by this return.
    pub fn find_match(&self, kind: EventKind, identity: &FrameIdentity) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.is_closed_by(kind, identity))
    }

    /// Index of the innermost frame called from `file:line` that a return of
    /// `kind` pairs with. Used when no frame carries the returned identity.
    pub fn find_site_match(&self, kind: EventKind, file: FileId, line: u32) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.is_closed_at(kind, file, line))
    }

    /// Pop the frame at `index` and every frame above it, innermost first.
    /// The matched frame is the last one yielded.
    pub fn unwind(&mut self, index: usize) -> impl Iterator<Item = Frame> + '_ {
        let index = index.min(self.frames.len());
        self.depth -= (self.frames.len() - index) as u64;
        self.frames.drain(index..).rev()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FileRegistry, Selector};

    fn file_id() -> FileId {
        let mut registry = FileRegistry::new(10);
        registry.configure(Selector::exact("a.rb").unwrap());
        registry.lookup("a.rb").unwrap()
    }

    fn frame(file: FileId, line: u32, method: u64) -> Frame {
        Frame {
            kind: EventKind::Call,
            identity: FrameIdentity::new(1, method, 2),
            file,
            line,
            start: Snapshot::ZERO,
        }
    }

    #[test]
    fn test_push_past_capacity_only_counts() {
        let file = file_id();
        let mut stack = ShadowStack::new(2);
        assert!(stack.push(frame(file, 1, 1)));
        assert!(stack.push(frame(file, 2, 2)));
        assert!(!stack.push(frame(file, 3, 3)));
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.top().map(|f| f.line), Some(2));
        assert!(stack.is_overflowing());

        assert!(stack.pop_overflow());
        assert!(!stack.pop_overflow());
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_find_match_requires_pairing_kind() {
        let file = file_id();
        let mut stack = ShadowStack::new(8);
        stack.push(frame(file, 1, 7));

        let identity = FrameIdentity::new(1, 7, 2);
        assert_eq!(stack.find_match(EventKind::Return, &identity), Some(0));
        assert_eq!(stack.find_match(EventKind::CReturn, &identity), None);
        assert_eq!(
            stack.find_match(EventKind::Return, &FrameIdentity::new(1, 8, 2)),
            None
        );
    }

    #[test]
    fn test_synthetic_frames_never_match() {
        let file = file_id();
        let mut stack = ShadowStack::new(8);
        stack.push(frame(file, 1, 7));
        stack.push(frame(file, 2, 0));

        assert_eq!(
            stack.find_match(EventKind::Return, &FrameIdentity::new(1, 0, 2)),
            None
        );
        assert_eq!(
            stack.find_match(EventKind::Return, &FrameIdentity::new(1, 7, 2)),
            Some(0)
        );
    }

    #[test]
    fn test_site_match_ignores_identity_but_not_kind() {
        let file = file_id();
        let mut stack = ShadowStack::new(8);
        stack.push(frame(file, 1, 7));
        stack.push(frame(file, 5, 8));
        stack.push(frame(file, 9, 0));

        assert_eq!(stack.find_site_match(EventKind::Return, file, 5), Some(1));
        assert_eq!(stack.find_site_match(EventKind::CReturn, file, 5), None);
        assert_eq!(stack.find_site_match(EventKind::Return, file, 3), None);
        // Synthetic frames are skipped even when the site agrees.
        assert_eq!(stack.find_site_match(EventKind::Return, file, 9), None);
    }

    #[test]
    fn test_unwind_yields_innermost_first() {
        let file = file_id();
        let mut stack = ShadowStack::new(8);
        stack.push(frame(file, 1, 1));
        stack.push(frame(file, 2, 2));
        stack.push(frame(file, 3, 3));
        stack.push(frame(file, 4, 4));

        let lines: Vec<u32> = stack.unwind(1).map(|f| f.line).collect();
        assert_eq!(lines, vec![4, 3, 2]);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top().map(|f| f.line), Some(1));
    }

    #[test]
    fn test_innermost_recursive_frame_matches_first() {
        let file = file_id();
        let mut stack = ShadowStack::new(8);
        stack.push(frame(file, 1, 5));
        stack.push(frame(file, 9, 5));

        let identity = FrameIdentity::new(1, 5, 2);
        assert_eq!(stack.find_match(EventKind::Return, &identity), Some(1));
    }
}
