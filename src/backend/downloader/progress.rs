//! Shared download progress.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Byte counters mutated by the reconciler and fetch workers.
#[derive(Debug, Default)]
pub struct ProgressState {
    downloaded: AtomicU64,
    validated: AtomicU64,
    total: AtomicU64,
    active: AtomicBool,
    current_file: Mutex<String>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a session as running and zeroes the counters.
    ///
    /// Returns `false` if a session was already active.
    pub fn begin(&self) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.downloaded.store(0, Ordering::Release);
        self.validated.store(0, Ordering::Release);
        self.total.store(0, Ordering::Release);
        self.set_current_file("");
        true
    }

    pub fn finish(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Seeds totals from a finished reconciliation.
    pub fn prime(&self, total: u64, validated: u64) {
        saturating_add(&self.total, total);
        saturating_add(&self.validated, validated);
    }

    pub fn add_downloaded(&self, bytes: u64) {
        saturating_add(&self.downloaded, bytes);
    }

    /// Advisory only; concurrent writers race and the last one wins.
    pub fn set_current_file(&self, label: &str) {
        let mut current = self.current_file.lock().unwrap_or_else(|e| e.into_inner());
        current.clear();
        current.push_str(label);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            downloaded: self.downloaded.load(Ordering::Acquire),
            validated: self.validated.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
            active: self.active.load(Ordering::Acquire),
            current_file: self
                .current_file
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

fn saturating_add(counter: &AtomicU64, bytes: u64) {
    // The closure never returns None, so the update cannot fail.
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
        Some(n.saturating_add(bytes))
    });
}

/// A consistent-enough copy of the progress counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub downloaded: u64,
    pub validated: u64,
    pub total: u64,
    pub active: bool,
    pub current_file: String,
}

impl ProgressSnapshot {
    /// Completion in `[0, 100]`, ignoring whether a session is active.
    pub fn fraction_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let done = self.downloaded.saturating_add(self.validated) as f64;
        (done / self.total as f64 * 100.0).min(100.0)
    }

    /// Completion as observers see it: zero whenever no session is running.
    pub fn percent(&self) -> f64 {
        if self.active {
            self.fraction_percent()
        } else {
            0.0
        }
    }
}

/// Read-only handle on a downloader's progress, cheap to clone across threads.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    state: Arc<ProgressState>,
}

impl ProgressMonitor {
    pub fn new(state: Arc<ProgressState>) -> Self {
        Self { state }
    }

    pub fn current_progress_percent(&self) -> f64 {
        self.state.snapshot().percent()
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::Acquire)
    }

    pub fn current_file_label(&self) -> String {
        self.state
            .current_file
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }
}
