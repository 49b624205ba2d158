//! Process CPU time via `clock_gettime(CLOCK_PROCESS_CPUTIME_ID)`, falling
//! back to the user time reported by `getrusage(RUSAGE_SELF)`.

/// Return the process CPU time in microseconds, or `None` when no CPU clock
/// can be read on this platform.
#[cfg(unix)]
pub(crate) fn process_cpu_usec() -> Option<u64> {
    use nix::sys::resource::{UsageWho, getrusage};
    use nix::time::{ClockId, clock_gettime};

    if let Ok(ts) = clock_gettime(ClockId::CLOCK_PROCESS_CPUTIME_ID) {
        return Some(ts.tv_sec() as u64 * 1_000_000 + ts.tv_nsec() as u64 / 1_000);
    }

    if let Ok(usage) = getrusage(UsageWho::RUSAGE_SELF) {
        let tv = usage.user_time();
        return Some(tv.tv_sec() as u64 * 1_000_000 + tv.tv_usec() as u64);
    }

    None
}

#[cfg(not(unix))]
pub(crate) fn process_cpu_usec() -> Option<u64> {
    None
}
