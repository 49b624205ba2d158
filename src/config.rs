use crate::snapshot::Metrics;

/// Default number of frames the shadow stack records before dropping
/// attribution for deeper calls.
pub const DEFAULT_STACK_CAPACITY: usize = 32_768;

/// Extra line slots allocated past the highest line seen when a file's line
/// table grows.
pub const DEFAULT_LINE_HEADROOM: usize = 100;

/// Engine tunables. None of them change accounting semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerConfig {
    pub stack_capacity: usize,
    pub line_headroom: usize,
    pub metrics: Metrics,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            line_headroom: DEFAULT_LINE_HEADROOM,
            metrics: Metrics::default(),
        }
    }
}

impl ProfilerConfig {
    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> Self {
        self.stack_capacity = stack_capacity;
        self
    }

    pub fn with_line_headroom(mut self, line_headroom: usize) -> Self {
        self.line_headroom = line_headroom;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }
}
