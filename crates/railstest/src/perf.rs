// perf.rs - Timing for directory scans
//
// Controlled via the RAILSTEST_PERF environment variable.
//
// Usage:
//   RAILSTEST_PERF=1 railstest toggle app/models/invoice.rb        # Log scan durations
//   RAILSTEST_PERF=verbose railstest toggle app/models/invoice.rb  # Also warn on slow scans

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// What RAILSTEST_PERF asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfMode {
    Off,
    /// Log every scan duration
    On,
    /// Also warn when a scan exceeds its budget
    Verbose,
}

impl PerfMode {
    /// Read a RAILSTEST_PERF value. Empty, `0` and `false` mean off.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            None | Some("") | Some("0") | Some("false") => PerfMode::Off,
            Some("verbose") => PerfMode::Verbose,
            Some(_) => PerfMode::On,
        }
    }
}

/// Mode for this process, read once
pub fn mode() -> PerfMode {
    static MODE: OnceLock<PerfMode> = OnceLock::new();
    *MODE.get_or_init(|| PerfMode::parse(std::env::var("RAILSTEST_PERF").ok().as_deref()))
}

/// Times one scan from creation to drop.
///
/// The drop logs `[PERF]` lines according to the mode; the elapsed time is
/// always available for the scan's own trace output.
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    budget: Duration,
    mode: PerfMode,
}

impl TimingGuard {
    /// Start timing `name`, which should finish within `budget_ms`
    pub fn new(name: &'static str, budget_ms: u64) -> Self {
        Self::with_mode(name, budget_ms, mode())
    }

    fn with_mode(name: &'static str, budget_ms: u64, mode: PerfMode) -> Self {
        Self {
            start: Instant::now(),
            name,
            budget: Duration::from_millis(budget_ms),
            mode,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the scan has run past its budget so far
    pub fn over_budget(&self) -> bool {
        self.elapsed() > self.budget
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.mode == PerfMode::Off {
            return;
        }

        let elapsed = self.elapsed();
        log::info!("[PERF] {} completed in {:?}", self.name, elapsed);

        if self.mode == PerfMode::Verbose && elapsed > self.budget {
            log::warn!(
                "[PERF] {} exceeded its budget ({}ms > {}ms)",
                self.name,
                elapsed.as_millis(),
                self.budget.as_millis()
            );
        }
    }
}
