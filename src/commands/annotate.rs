use super::{ms, replay_trace};
use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::registry::Selector;
use crate::report::{FileReport, Report};
use std::path::Path;

/// Width of the per-line cost column, separator excluded.
const GUTTER: usize = 32;

pub fn run(
    trace: &Path,
    source: &Path,
    identifier: Option<&str>,
    config: ProfilerConfig,
) -> Result<()> {
    let identifier = match identifier {
        Some(identifier) => identifier.to_string(),
        None => source.display().to_string(),
    };
    let text = std::fs::read_to_string(source)?;

    let report = replay_trace(trace, Selector::exact(identifier.as_str())?, config)?;
    print!("{}", render(&identifier, &text, &report));

    Ok(())
}

/// Source text with each executed line prefixed by
/// `cpu ms + (wall - cpu) ms (calls)`, followed by the file summary.
fn render(identifier: &str, text: &str, report: &Report) -> String {
    let mut out = String::new();
    let file = report.file(identifier);

    for (idx, line) in text.lines().enumerate() {
        let stats = u32::try_from(idx + 1)
            .ok()
            .and_then(|number| file.and_then(|f| f.line(number)))
            .filter(|stats| stats.calls > 0);

        match stats {
            Some(stats) => {
                let total = stats.total;
                out.push_str(&format!(
                    "{:>8.1}ms + {:>8.1}ms ({:>5}) | {}\n",
                    ms(total.cpu_time),
                    ms(total.wall_time.saturating_sub(total.cpu_time)),
                    stats.calls,
                    line
                ));
            }
            None => {
                out.push_str(&format!("{:width$}| {}\n", "", line, width = GUTTER));
            }
        }
    }

    out.push('\n');
    match file {
        Some(file) => push_summary(&mut out, identifier, file),
        None => out.push_str(&format!("{}\n  no calls recorded\n", identifier)),
    }
    out
}

fn push_summary(out: &mut String, identifier: &str, file: &FileReport) {
    let summary = &file.summary;
    out.push_str(identifier);
    out.push('\n');
    out.push_str(&format!(
        "  {:>10.1}ms in this file\n",
        ms(summary.exclusive.wall_time)
    ));
    out.push_str(&format!(
        "  {:>10.1}ms in this file + children\n",
        ms(summary.total.wall_time)
    ));
    out.push_str(&format!(
        "  {:>10.1}ms in children\n",
        ms(summary.child.wall_time)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LineReport;
    use crate::snapshot::Snapshot;

    #[test]
    fn test_render_annotates_executed_lines() {
        let mut file = FileReport::default();
        file.summary.total = Snapshot::wall(10_000);
        file.summary.child = Snapshot::wall(3_000);
        file.summary.exclusive = Snapshot::wall(7_000);
        file.lines.insert(
            2,
            LineReport {
                calls: 3,
                total: Snapshot {
                    wall_time: 5_000,
                    cpu_time: 1_500,
                    allocated_objects: 0,
                },
            },
        );
        let mut report = Report::default();
        report.files.insert("a.rb".into(), file);

        let out = render("a.rb", "def a\n  b\nend\n", &report);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], format!("{}| def a", " ".repeat(32)));
        assert_eq!(lines[1], "     1.5ms +      3.5ms (    3) |   b");
        assert_eq!(lines[2], format!("{}| end", " ".repeat(32)));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "a.rb");
        assert_eq!(lines[5], "         7.0ms in this file");
        assert_eq!(lines[6], "        10.0ms in this file + children");
        assert_eq!(lines[7], "         3.0ms in children");
    }

    #[test]
    fn test_render_untouched_file() {
        let out = render("a.rb", "x\n", &Report::default());
        assert!(out.starts_with(&format!("{}| x\n", " ".repeat(32))));
        assert!(out.ends_with("a.rb\n  no calls recorded\n"));
    }
}
