//! Registration boundary with the host execution engine.

mod trace;

pub use trace::{TraceEvent, TraceHost, load_trace, parse_trace};

use crate::event::Event;

/// Callback the host invokes synchronously for every call and return.
pub type EventHook = Box<dyn FnMut(&Event<'_>)>;

/// A host engine that can deliver call/return events to one hook.
pub trait Host {
    /// Install `hook`, replacing any hook already installed.
    fn add_event_hook(&mut self, hook: EventHook);

    /// Remove the installed hook. A no-op when none is installed.
    fn remove_event_hook(&mut self);
}
