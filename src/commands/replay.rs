use super::{ms, replay_trace, simplify_path};
use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::registry::Selector;
use crate::report::{HotLine, Report};
use comfy_table::{CellAlignment, Table, presets};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// What to keep from the report when rendering.
#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    pub top: usize,
    pub min_wall: Option<Duration>,
    pub format: OutputFormat,
}

pub fn run(
    trace: &Path,
    selector: Selector,
    config: ProfilerConfig,
    options: ReplayOptions,
) -> Result<()> {
    let selector_text = selector.to_string();
    let report = replay_trace(trace, selector, config)?;

    let output = match options.format {
        OutputFormat::Table => {
            let cwd = std::env::current_dir().ok();
            let cwd = cwd.as_deref().and_then(|p| p.to_str());
            render_table(trace, &selector_text, &report, &options, cwd)
        }
        OutputFormat::Json => render_json(trace, &selector_text, &report, &options)?,
        OutputFormat::Csv => render_csv(&report, &options),
    };
    print!("{}", output);

    Ok(())
}

fn selected_lines<'r>(report: &'r Report, options: &ReplayOptions) -> Vec<HotLine<'r>> {
    let threshold = options
        .min_wall
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    report
        .hottest_lines()
        .into_iter()
        .filter(|hot| hot.stats.total.wall_time >= threshold)
        .take(options.top)
        .collect()
}

fn render_table(
    trace: &Path,
    selector: &str,
    report: &Report,
    options: &ReplayOptions,
    cwd: Option<&str>,
) -> String {
    let mut out = String::new();

    // Header comment
    out.push_str(&format!("# {} | tracking {}\n", trace.display(), selector));
    out.push_str(&format!(
        "# Events: {} | Tracked: {} | Files: {}\n",
        report.stats.events,
        report.stats.tracked_events,
        report.files.len()
    ));
    if report.stats.overflowed_frames > 0 || report.stats.orphan_returns > 0 {
        out.push_str(&format!(
            "# Overflowed frames: {} | Orphan returns: {}\n",
            report.stats.overflowed_frames, report.stats.orphan_returns
        ));
    }
    out.push('\n');

    if report.is_empty() {
        out.push_str("No tracked files were executed.\n");
        return out;
    }

    let mut files = Table::new();
    files.load_preset(presets::NOTHING);
    files.set_header(vec!["FILE", "TOTAL ms", "CHILD ms", "EXCL ms", "EXCL CPU ms", "ALLOCS"]);
    for (name, file) in &report.files {
        let summary = &file.summary;
        files.add_row(vec![
            simplify_path(name, cwd),
            format!("{:.1}", ms(summary.total.wall_time)),
            format!("{:.1}", ms(summary.child.wall_time)),
            format!("{:.1}", ms(summary.exclusive.wall_time)),
            format!("{:.1}", ms(summary.exclusive.cpu_time)),
            summary.total.allocated_objects.to_string(),
        ]);
    }
    align_numeric_columns(&mut files, 1..6);
    out.push_str(&files.to_string());
    out.push_str("\n\n");

    let mut lines = Table::new();
    lines.load_preset(presets::NOTHING);
    lines.set_header(vec!["WALL ms", "CPU ms", "CALLS", "LOCATION"]);
    for hot in selected_lines(report, options) {
        lines.add_row(vec![
            format!("{:.1}", ms(hot.stats.total.wall_time)),
            format!("{:.1}", ms(hot.stats.total.cpu_time)),
            hot.stats.calls.to_string(),
            format!("{}:{}", simplify_path(hot.file, cwd), hot.line),
        ]);
    }
    align_numeric_columns(&mut lines, 0..3);
    out.push_str(&lines.to_string());
    out.push('\n');

    out
}

fn align_numeric_columns(table: &mut Table, columns: std::ops::Range<usize>) {
    for idx in columns {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

#[derive(Serialize)]
struct JsonHotLine<'a> {
    file: &'a str,
    line: u32,
    calls: u64,
    wall_us: u64,
    cpu_us: u64,
    allocs: u64,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    trace: String,
    selector: &'a str,
    generated_at: String,
    report: &'a Report,
    hot_lines: Vec<JsonHotLine<'a>>,
}

fn render_json(
    trace: &Path,
    selector: &str,
    report: &Report,
    options: &ReplayOptions,
) -> Result<String> {
    let hot_lines = selected_lines(report, options)
        .into_iter()
        .map(|hot| JsonHotLine {
            file: hot.file,
            line: hot.line,
            calls: hot.stats.calls,
            wall_us: hot.stats.total.wall_time,
            cpu_us: hot.stats.total.cpu_time,
            allocs: hot.stats.total.allocated_objects,
        })
        .collect();

    let output = JsonOutput {
        trace: trace.display().to_string(),
        selector,
        generated_at: chrono::Utc::now().to_rfc3339(),
        report,
        hot_lines,
    };
    let mut json = serde_json::to_string_pretty(&output)?;
    json.push('\n');
    Ok(json)
}

fn render_csv(report: &Report, options: &ReplayOptions) -> String {
    let mut out = String::from("file,line,calls,wall_us,cpu_us,allocs\n");
    for hot in selected_lines(report, options) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(hot.file),
            hot.line,
            hot.stats.calls,
            hot.stats.total.wall_time,
            hot.stats.total.cpu_time,
            hot.stats.total.allocated_objects
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
