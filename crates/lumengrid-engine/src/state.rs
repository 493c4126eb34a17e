//! Shared engine status for external observation.
//!
//! The engine updates this state; control surfaces read it without taking
//! the engine lock.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::schedule::SunEvent;

/// Lock-free view of the engine's lifecycle flags.
///
/// Uses atomics so observers never contend with the tick thread.
#[derive(Debug, Default)]
pub(crate) struct SharedStatus {
    running: AtomicBool,
    paused: AtomicBool,
    scheduled: AtomicBool,
}

impl SharedStatus {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::Relaxed);
    }

    pub(crate) fn set_paused(&self, value: bool) {
        self.paused.store(value, Ordering::Relaxed);
    }

    pub(crate) fn set_scheduled(&self, value: bool) {
        self.scheduled.store(value, Ordering::Relaxed);
    }
}

/// A snapshot of the engine's observable state for control surfaces.
///
/// Serializes directly as the status reply of an external control endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Whether the periodic driver is ticking.
    pub running: bool,
    /// Whether the show is paused (resumable without re-init).
    pub paused: bool,
    /// Whether the day/night auto-scheduler is armed.
    pub scheduled: bool,
    /// Name of the active program, if one is selected.
    pub program: Option<String>,
    /// The next day/night boundary, when scheduled.
    pub next_event: Option<SunEvent>,
}
