//! Measurement windows.
//!
//! A `Profiler` owns the engine across windows. `Profiler::begin` claims the
//! process-wide active flag and resets the engine; `Session::run` installs the
//! event hook on the host for the duration of the work and removes it on
//! every exit path, including panics; `Session::end` produces the report.
//!
//! The engine is shared with the installed hook through `Rc<RefCell<_>>`, so
//! profilers and sessions cannot leave the thread that created them.

use crate::config::ProfilerConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::host::Host;
use crate::registry::IntoSelector;
use crate::report::Report;
use crate::snapshot::{Clock, SystemClock};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Whether any session in this process currently holds the active flag.
pub fn is_active() -> bool {
    ACTIVE.load(Ordering::Acquire)
}

/// Ownership of the process-wide active flag, released on drop.
#[derive(Debug)]
struct ActiveToken(());

impl ActiveToken {
    fn acquire() -> Result<Self> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ActiveToken(()))
            .map_err(|_| Error::AlreadyActive)
    }
}

impl Drop for ActiveToken {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
    }
}

/// Keeps the hook installed and the session active while alive.
struct HookGuard<'h, H: Host> {
    host: &'h mut H,
    _token: ActiveToken,
}

impl<H: Host> Drop for HookGuard<'_, H> {
    fn drop(&mut self) {
        self.host.remove_event_hook();
        tracing::debug!("event hook removed");
    }
}

pub struct Profiler<C: Clock = SystemClock> {
    engine: Rc<RefCell<Engine<C>>>,
}

impl Profiler<SystemClock> {
    pub fn new(config: ProfilerConfig) -> Self {
        Profiler {
            engine: Rc::new(RefCell::new(Engine::new(&config))),
        }
    }
}

impl Default for Profiler<SystemClock> {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl<C: Clock + 'static> Profiler<C> {
    pub fn with_clock(config: ProfilerConfig, clock: C) -> Self {
        Profiler {
            engine: Rc::new(RefCell::new(Engine::with_clock(&config, clock))),
        }
    }

    /// Start a measurement window tracking `selector`.
    ///
    /// Fails with `AlreadyActive` while another session holds the active flag
    /// and with `InvalidSelector` when the selector does not validate; in
    /// both cases no state is touched.
    pub fn begin(&mut self, selector: impl IntoSelector) -> Result<Session<'_, C>> {
        let token = ActiveToken::acquire()?;
        let selector = selector.into_selector()?;
        tracing::debug!(%selector, "profiling session started");

        self.engine.borrow_mut().begin(selector);
        Ok(Session {
            engine: &self.engine,
            token: Some(token),
        })
    }

    /// `begin`, `run` and `end` in one call.
    pub fn profile<H, R>(
        &mut self,
        host: &mut H,
        selector: impl IntoSelector,
        work: impl FnOnce(&mut H) -> R,
    ) -> Result<(R, Report)>
    where
        H: Host,
    {
        let mut session = self.begin(selector)?;
        let output = session.run(host, work)?;
        Ok((output, session.end()))
    }
}

/// One measurement window.
pub struct Session<'p, C: Clock = SystemClock> {
    engine: &'p Rc<RefCell<Engine<C>>>,
    /// Taken by `run`; `None` once the window has closed.
    token: Option<ActiveToken>,
}

impl<C: Clock + 'static> Session<'_, C> {
    /// Run `work` once with the event hook installed on `host`.
    ///
    /// Whatever `work` returns is passed through untouched, errors included.
    /// A session runs at most once; later calls fail with `SessionFinished`.
    pub fn run<H, R>(&mut self, host: &mut H, work: impl FnOnce(&mut H) -> R) -> Result<R>
    where
        H: Host,
    {
        let token = self.token.take().ok_or(Error::SessionFinished)?;

        let engine = Rc::clone(self.engine);
        host.add_event_hook(Box::new(move |event: &Event<'_>| {
            // A re-entrant delivery would alias the engine; drop it.
            if let Ok(mut engine) = engine.try_borrow_mut() {
                engine.on_event(event);
            }
        }));

        let guard = HookGuard {
            host,
            _token: token,
        };
        Ok(work(&mut *guard.host))
    }

    pub fn is_finished(&self) -> bool {
        self.token.is_none()
    }

    /// Collect the aggregates of this window.
    pub fn end(self) -> Report {
        let report = self.engine.borrow().report();
        tracing::debug!(
            files = report.files.len(),
            events = report.stats.events,
            "profiling session ended"
        );
        report
    }
}
