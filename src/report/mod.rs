//! Session results: per-file summaries and per-line totals.
//!
//! The line map is sparse: only lines that issued at least one call appear.

use crate::registry::{FileRegistry, SourceFile};
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters describing how the engine saw the event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Events delivered to the engine.
    pub events: u64,
    /// Events whose caller file was tracked.
    pub tracked_events: u64,
    /// Calls past the shadow stack capacity.
    pub overflowed_frames: u64,
    /// Returns that matched no recorded call.
    pub orphan_returns: u64,
    /// Pattern evaluations (pattern mode only).
    pub pattern_evaluations: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub total: Snapshot,
    pub child: Snapshot,
    pub exclusive: Snapshot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineReport {
    pub calls: u64,
    pub total: Snapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub summary: FileSummary,
    pub lines: BTreeMap<u32, LineReport>,
}

impl FileReport {
    fn from_source(file: &SourceFile) -> Self {
        FileReport {
            summary: FileSummary {
                total: file.total(),
                child: file.child(),
                exclusive: file.exclusive(),
            },
            lines: file
                .executed_lines()
                .map(|(number, line)| {
                    (
                        number,
                        LineReport {
                            calls: line.calls,
                            total: line.total,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn line(&self, line: u32) -> Option<&LineReport> {
        self.lines.get(&line)
    }

    /// Highest executed line, 0 when nothing ran.
    pub fn max_line(&self) -> u32 {
        self.lines.keys().next_back().copied().unwrap_or(0)
    }
}

/// A line entry flattened for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotLine<'a> {
    pub file: &'a str,
    pub line: u32,
    pub stats: &'a LineReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub files: BTreeMap<String, FileReport>,
    pub stats: SessionStats,
}

impl Report {
    pub(crate) fn collect(registry: &FileRegistry, stats: SessionStats) -> Self {
        Report {
            files: registry
                .files()
                .iter()
                .map(|file| (file.name().to_string(), FileReport::from_source(file)))
                .collect(),
            stats,
        }
    }

    pub fn file(&self, identifier: &str) -> Option<&FileReport> {
        self.files.get(identifier)
    }

    pub fn line(&self, identifier: &str, line: u32) -> Option<&LineReport> {
        self.file(identifier).and_then(|file| file.line(line))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lines across all files ordered by inclusive wall time, descending.
    pub fn hottest_lines(&self) -> Vec<HotLine<'_>> {
        let mut lines: Vec<HotLine<'_>> = self
            .files
            .iter()
            .flat_map(|(file, report)| {
                report.lines.iter().map(move |(&line, stats)| HotLine {
                    file: file.as_str(),
                    line,
                    stats,
                })
            })
            .collect();

        lines.sort_by(|a, b| {
            b.stats
                .total
                .wall_time
                .cmp(&a.stats.total.wall_time)
                .then_with(|| b.stats.calls.cmp(&a.stats.calls))
                .then_with(|| a.file.cmp(b.file))
                .then_with(|| a.line.cmp(&b.line))
        });
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(calls: u64, wall: u64) -> LineReport {
        LineReport {
            calls,
            total: Snapshot::wall(wall),
        }
    }

    #[test]
    fn test_hottest_lines_order() {
        let mut report = Report::default();
        let mut a = FileReport::default();
        a.lines.insert(3, line(1, 50));
        a.lines.insert(8, line(4, 200));
        let mut b = FileReport::default();
        b.lines.insert(1, line(2, 50));
        report.files.insert("a.rb".into(), a);
        report.files.insert("b.rb".into(), b);

        let hot: Vec<(&str, u32)> = report
            .hottest_lines()
            .iter()
            .map(|h| (h.file, h.line))
            .collect();
        assert_eq!(hot, vec![("a.rb", 8), ("b.rb", 1), ("a.rb", 3)]);
    }

    #[test]
    fn test_max_line() {
        let mut file = FileReport::default();
        assert_eq!(file.max_line(), 0);
        file.lines.insert(4, line(1, 1));
        file.lines.insert(40, line(1, 1));
        assert_eq!(file.max_line(), 40);
    }

    #[test]
    fn test_report_serializes_line_keys() {
        let mut report = Report::default();
        let mut file = FileReport::default();
        file.lines.insert(10, line(1, 5000));
        report.files.insert("a.lib".into(), file);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"]["a.lib"]["lines"]["10"]["calls"], 1);
        assert_eq!(
            json["files"]["a.lib"]["lines"]["10"]["total"]["wall_time"],
            5000
        );
    }
}
