pub mod annotate;
pub mod replay;

use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::host::{TraceHost, load_trace};
use crate::registry::IntoSelector;
use crate::report::Report;
use crate::session::Profiler;
use std::path::Path;

/// Replay `trace` through one session tracking `selector`.
pub fn replay_trace(
    trace: &Path,
    selector: impl IntoSelector,
    config: ProfilerConfig,
) -> Result<Report> {
    let events = load_trace(trace)?;
    tracing::debug!(events = events.len(), trace = %trace.display(), "trace loaded");

    let mut profiler = Profiler::new(config);
    let mut host = TraceHost::new();
    let ((), report) = profiler.profile(&mut host, selector, |host| host.replay(&events))?;
    Ok(report)
}

/// Microseconds as fractional milliseconds.
fn ms(usec: u64) -> f64 {
    usec as f64 / 1000.0
}

/// Simplify a file identifier for display - keep the most relevant parts
fn simplify_path(path: &str, cwd: Option<&str>) -> String {
    // Host pseudo-files such as "(eval)" or "[native]"
    if path.starts_with('(') || path.starts_with('[') {
        return path.to_string();
    }

    if let Some(cwd) = cwd
        && let Some(rest) = path.strip_prefix(cwd)
        && let Some(rest) = rest.strip_prefix('/')
    {
        return rest.to_string();
    }

    // For installed packages, keep the package directory and the file
    for marker in ["/gems/", "/site-packages/", "/node_modules/"] {
        if let Some(idx) = path.rfind(marker) {
            let after = &path[idx + marker.len()..];
            if let Some((package, file)) = after.split_once('/') {
                let file = file.strip_prefix("lib/").unwrap_or(file);
                return format!("<{}>/{}", package, file);
            }
        }
    }

    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_path() {
        assert_eq!(simplify_path("(eval)", None), "(eval)");
        assert_eq!(
            simplify_path("/home/dev/app/models/user.rb", Some("/home/dev/app")),
            "models/user.rb"
        );
        assert_eq!(
            simplify_path("/home/dev/application.rb", Some("/home/dev/app")),
            "/home/dev/application.rb"
        );
        assert_eq!(
            simplify_path(
                "/usr/lib/ruby/gems/3.2.0/gems/rack-3.0.8/lib/rack/utils.rb",
                None
            ),
            "<rack-3.0.8>/rack/utils.rb"
        );
        assert_eq!(simplify_path("a.rb", None), "a.rb");
    }

    #[test]
    fn test_ms() {
        assert_eq!(ms(5000), 5.0);
        assert_eq!(ms(1500), 1.5);
    }
}
