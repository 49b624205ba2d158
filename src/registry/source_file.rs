use crate::snapshot::Snapshot;

/// Aggregate for one source line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLine {
    /// Calls issued from this line.
    pub calls: u64,
    /// Inclusive time and allocations while those calls were active.
    pub total: Snapshot,
}

/// Aggregates for one tracked source file.
#[derive(Debug)]
pub struct SourceFile {
    name: String,
    /// Indexed by 1-based line number; slot 0 is never written.
    lines: Vec<SourceLine>,
    pub(crate) total: Snapshot,
    pub(crate) child: Snapshot,
    pub(crate) depth: u64,
    pub(crate) exclusive_start: Snapshot,
    pub(crate) exclusive: Snapshot,
}

impl SourceFile {
    pub fn new(name: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            lines: Vec::new(),
            total: Snapshot::ZERO,
            child: Snapshot::ZERO,
            depth: 0,
            exclusive_start: Snapshot::ZERO,
            exclusive: Snapshot::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The whole line table, including slot 0 and unexecuted lines.
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn line(&self, line: u32) -> Option<&SourceLine> {
        self.lines.get(line as usize)
    }

    /// Executed lines in ascending order.
    pub fn executed_lines(&self) -> impl Iterator<Item = (u32, &SourceLine)> {
        self.lines
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, line)| line.calls > 0)
            .map(|(idx, line)| (idx as u32, line))
    }

    /// Time while the file was anywhere on the active call chain.
    pub fn total(&self) -> Snapshot {
        self.total
    }

    /// Time spent in other tracked files called from this one.
    pub fn child(&self) -> Snapshot {
        self.child
    }

    /// Time spent in this file to the exclusion of all others.
    pub fn exclusive(&self) -> Snapshot {
        self.exclusive
    }

    /// Active shadow-stack frames referencing this file.
    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// Slot for `line`, growing the table to `line + headroom` when needed.
    pub(crate) fn line_mut(&mut self, line: u32, headroom: usize) -> &mut SourceLine {
        let idx = line as usize;
        if idx >= self.lines.len() {
            self.lines.resize(idx + headroom.max(1), SourceLine::default());
        }
        &mut self.lines[idx]
    }

    pub(crate) fn enter(&mut self, now: Snapshot) {
        if self.depth == 0 {
            self.exclusive_start = now;
        }
        self.depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        if self.depth == 0 {
            tracing::debug!(file = %self.name, "frame popped for a file with zero depth");
            return;
        }
        self.depth -= 1;
    }

    /// Close the current exclusive interval at `now` and open the next one.
    pub(crate) fn flush_exclusive(&mut self, now: Snapshot) {
        self.exclusive += now - self.exclusive_start;
        self.exclusive_start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_table_grows_with_headroom() {
        let mut file = SourceFile::new("a.rb");
        assert!(file.lines().is_empty());

        file.line_mut(10, 100).calls += 1;
        assert_eq!(file.lines().len(), 110);

        // Within capacity: no reallocation
        file.line_mut(109, 100).calls += 1;
        assert_eq!(file.lines().len(), 110);

        file.line_mut(250, 100).calls += 1;
        assert_eq!(file.lines().len(), 350);
        assert_eq!(file.line(10).unwrap().calls, 1);
        assert_eq!(file.line(200).unwrap().calls, 0);
    }

    #[test]
    fn test_zero_headroom_still_fits_line() {
        let mut file = SourceFile::new("a.rb");
        file.line_mut(5, 0).calls = 2;
        assert_eq!(file.line(5).unwrap().calls, 2);
    }

    #[test]
    fn test_executed_lines_skips_empty_slots() {
        let mut file = SourceFile::new("a.rb");
        file.line_mut(3, 10).calls = 1;
        file.line_mut(7, 10).calls = 4;
        let lines: Vec<u32> = file.executed_lines().map(|(n, _)| n).collect();
        assert_eq!(lines, vec![3, 7]);
    }

    #[test]
    fn test_exclusive_interval_tracking() {
        let mut file = SourceFile::new("a.rb");
        file.enter(Snapshot::wall(100));
        file.enter(Snapshot::wall(150));
        assert_eq!(file.depth(), 2);
        assert_eq!(file.exclusive_start, Snapshot::wall(100));

        file.flush_exclusive(Snapshot::wall(400));
        assert_eq!(file.exclusive().wall_time, 300);

        file.leave();
        file.leave();
        file.leave();
        assert_eq!(file.depth(), 0);
    }
}
