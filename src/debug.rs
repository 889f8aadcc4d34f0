//! Cooperative pause, resume and single-step control of a routing thread.
//!
//! The routing thread calls [`DebugControl::check`] before it processes a net. While the
//! control is paused, checks for nets that pass the net filter block on a condition
//! variable until another thread resumes or steps; other nets go through.

use std::{
    sync::{Condvar, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use log::debug;

use crate::settings::DebugSettings;

#[derive(Debug, Default)]
struct DebugState {
    paused: bool,
    step_pending: bool,
}

#[derive(Debug, Default)]
pub struct DebugControl {
    settings: DebugSettings,
    state: Mutex<DebugState>,
    condvar: Condvar,
}

impl DebugControl {
    /// A control starting paused if single stepping is on.
    pub fn new(settings: DebugSettings) -> Self {
        let paused = settings.single_step;

        Self {
            settings,
            state: Mutex::new(DebugState {
                paused,
                step_pending: false,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn settings(&self) -> &DebugSettings {
        &self.settings
    }

    fn state(&self) -> MutexGuard<'_, DebugState> {
        // The state stays consistent even if a holder panicked.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pause(&self) {
        self.state().paused = true;
    }

    pub fn resume(&self) {
        let mut state = self.state();
        state.paused = false;
        state.step_pending = false;
        self.condvar.notify_all();
    }

    /// Lets exactly one blocked or upcoming check through while staying paused.
    pub fn next(&self) {
        self.state().step_pending = true;
        self.condvar.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    /// Whether the net filter lets `net_no`/`net_name` stop. An empty filter lets every net
    /// stop. Entries match either the exact net name or a `Net #N` reference.
    pub fn is_net_permitted(&self, net_no: Option<usize>, net_name: Option<&str>) -> bool {
        if self.settings.net_filter.is_empty() {
            return true;
        }

        self.settings.net_filter.iter().any(|entry| {
            net_name.map_or(false, |name| name == entry)
                || net_no.map_or(false, |net_no| parse_net_reference(entry) == Some(net_no))
        })
    }

    /// Debug checkpoint before processing a net. Sleeps for the configured insertion delay
    /// and, with single stepping on, blocks while paused. Returns whether the checkpoint was
    /// of interest, i.e. debugging is on and the net passes the filter.
    pub fn check(&self, net_no: usize, net_name: &str) -> bool {
        self.check_net(Some(net_no), Some(net_name))
    }

    /// Like [`check`](Self::check), for a free-form message that may contain a `Net #N`
    /// reference, e.g. `"Net #1, Trace #456"`.
    pub fn check_message(&self, message: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match find_net_reference(message) {
            Some(net_no) => self.check_net(Some(net_no), None),
            None => self.check_net(None, None),
        }
    }

    fn is_enabled(&self) -> bool {
        self.settings.single_step || self.settings.trace_insertion_delay_ms > 0
    }

    fn check_net(&self, net_no: Option<usize>, net_name: Option<&str>) -> bool {
        if !self.is_enabled() {
            return false;
        }

        if (net_no.is_some() || net_name.is_some()) && !self.is_net_permitted(net_no, net_name) {
            return false;
        }

        if self.settings.trace_insertion_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.settings.trace_insertion_delay_ms));
        }

        if self.settings.single_step {
            let mut state = self.state();

            while state.paused && !state.step_pending {
                debug!("paused before net {:?}", net_no);
                state = self
                    .condvar
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }

            state.step_pending = false;
        }

        true
    }
}

/// `N` of an entry that is exactly `Net #N`.
fn parse_net_reference(entry: &str) -> Option<usize> {
    entry.trim().strip_prefix("Net #")?.parse().ok()
}

/// `N` of the first `Net #N` in `message`.
fn find_net_reference(message: &str) -> Option<usize> {
    let (_, rest) = message.split_once("Net #")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
