//! Attribution of popped frames to line and file aggregates.

use crate::registry::{FileId, FileRegistry};
use crate::snapshot::Snapshot;
use crate::stack::Frame;

/// Close the exclusive interval of `current` when control passes to another
/// file, or leaves tracked code entirely.
pub(super) fn switch_files(
    registry: &mut FileRegistry,
    current: FileId,
    next: Option<FileId>,
    now: Snapshot,
) {
    if next == Some(current) {
        return;
    }
    registry.file_mut(current).flush_exclusive(now);
    if let Some(next) = next {
        registry.file_mut(next).exclusive_start = now;
    }
}

/// Attribute `frame`, returned at `now`, to its line and file. `caller` is the
/// frame control returns to.
pub(super) fn record(
    registry: &mut FileRegistry,
    frame: &Frame,
    now: Snapshot,
    caller: Option<&Frame>,
) {
    let headroom = registry.line_headroom();
    let delta = now - frame.start;

    let file = registry.file_mut(frame.file);
    let line = file.line_mut(frame.line, headroom);
    line.calls += 1;

    // Nested calls issued from the same line overlap the outer interval.
    if !caller.is_some_and(|c| c.same_site(frame)) {
        line.total += delta;
    }

    // Only the outermost residency counts toward the file total.
    if file.depth == 0 {
        file.total += delta;
    }

    if let Some(caller) = caller
        && caller.file != frame.file
    {
        registry.file_mut(caller.file).child += delta;
    }
}
