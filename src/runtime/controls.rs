use embassy_sync::{
    blocking_mutex::raw::NoopRawMutex,
    channel::{Channel, TrySendError},
    signal::Signal,
};

use crate::config::ThresholdUpdate;
use crate::confirm::UserDecision;

pub const UPDATE_QUEUE_DEPTH: usize = 4;

/// Signals from the caller into a running monitor. Shared by reference on the
/// monitor's executor.
pub struct MonitorControls {
    stop: Signal<NoopRawMutex, ()>,
    decisions: Signal<NoopRawMutex, UserDecision>,
    updates: Channel<NoopRawMutex, ThresholdUpdate, UPDATE_QUEUE_DEPTH>,
}

impl Default for MonitorControls {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorControls {
    pub const fn new() -> Self {
        Self {
            stop: Signal::new(),
            decisions: Signal::new(),
            updates: Channel::new(),
        }
    }

    pub fn stop(&self) {
        self.stop.signal(());
    }

    /// Ignored while an earlier decision is still pending.
    pub fn mark_safe(&self) {
        self.decide(UserDecision::Safe);
    }

    /// Ignored while an earlier decision is still pending.
    pub fn request_help(&self) {
        self.decide(UserDecision::NeedHelp);
    }

    fn decide(&self, decision: UserDecision) {
        if self.decisions.signaled() {
            log::debug!("controls: decision {:?} dropped, one already pending", decision);
            return;
        }
        self.decisions.signal(decision);
    }

    /// Queues a recalibration, applied between sensor ticks. Hands the update
    /// back when the queue is full.
    pub fn set_thresholds(&self, update: ThresholdUpdate) -> Result<(), ThresholdUpdate> {
        self.updates.try_send(update).map_err(|err| match err {
            TrySendError::Full(update) => update,
        })
    }

    pub(super) async fn stopped(&self) {
        self.stop.wait().await;
    }

    pub(super) async fn next_update(&self) -> ThresholdUpdate {
        self.updates.receive().await
    }

    pub(super) async fn next_decision(&self) -> UserDecision {
        self.decisions.wait().await
    }

    /// Drops a decision left over from an earlier gate.
    pub(super) fn clear_decision(&self) {
        self.decisions.reset();
    }
}
