use statig::blocking::IntoStateMachineExt as _;

use crate::config::ConfirmationConfig;
use crate::detector::FallDetection;

use super::machine::{DispatchContext, GateMachine};
use super::types::{GateApplyStatus, GateCommand, GateSnapshot, Resolution, UserDecision};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GateApplyResult {
    pub before: GateSnapshot,
    pub after: GateSnapshot,
    pub status: GateApplyStatus,
}

impl GateApplyResult {
    /// The resolution reached by this command, if it was the first one.
    pub fn resolved(self) -> Option<Resolution> {
        match self.status {
            GateApplyStatus::Resolved(resolution) => Some(resolution),
            _ => None,
        }
    }

    pub fn countdown_changed(self) -> bool {
        self.before.remaining_secs() != self.after.remaining_secs()
    }
}

/// Timed decision window for one fall detection. The first resolving command
/// wins; later commands report `AlreadyResolved` and change nothing.
pub struct ConfirmationGate {
    detection: FallDetection,
    machine: statig::blocking::StateMachine<GateMachine>,
}

impl ConfirmationGate {
    pub fn open(detection: FallDetection, now_ms: u64, config: &ConfirmationConfig) -> Self {
        let snapshot = GateSnapshot::opened(now_ms, config.timeout_ms);
        log::info!(
            "confirm: open at={} deadline={} event_at={}",
            now_ms,
            snapshot.deadline_ms,
            detection.event.timestamp_ms
        );
        Self {
            detection,
            machine: GateMachine::new(snapshot).state_machine(),
        }
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.machine.inner().snapshot
    }

    pub fn detection(&self) -> &FallDetection {
        &self.detection
    }

    pub fn into_detection(self) -> FallDetection {
        self.detection
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.snapshot().resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution().is_some()
    }

    pub fn tick(&mut self, now_ms: u64) -> GateApplyResult {
        self.apply(GateCommand::Tick { now_ms })
    }

    pub fn decide(&mut self, decision: UserDecision, now_ms: u64) -> GateApplyResult {
        self.apply(GateCommand::Decide { decision, now_ms })
    }

    pub fn apply(&mut self, command: GateCommand) -> GateApplyResult {
        let before = self.snapshot();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&command, &mut context);
        let after = self.snapshot();

        match context.status {
            GateApplyStatus::Resolved(resolution) => {
                log::info!("confirm: resolved {:?} by {:?}", resolution, command);
            }
            GateApplyStatus::AlreadyResolved => {
                log::debug!("confirm: ignored {:?} after resolution", command);
            }
            GateApplyStatus::Counting => {}
        }

        GateApplyResult {
            before,
            after,
            status: context.status,
        }
    }
}
