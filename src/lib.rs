pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod host;
pub mod registry;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod stack;

pub use config::ProfilerConfig;
pub use error::{Error, Result};
pub use event::{Event, EventKind, FrameIdentity, Location};
pub use host::{EventHook, Host, TraceEvent, TraceHost};
pub use registry::{IntoSelector, Selector};
pub use report::{FileReport, FileSummary, LineReport, Report, SessionStats};
pub use session::{Profiler, Session};
pub use snapshot::{Clock, CountingAllocator, Metrics, Snapshot, SystemClock};
