use statig::prelude::*;

use super::types::{
    GateApplyStatus, GateCommand, GatePhase, GateSnapshot, Resolution, UnsafeCause, UserDecision,
};

#[derive(Clone, Copy, Debug)]
pub(super) struct GateMachine {
    pub(super) snapshot: GateSnapshot,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) status: GateApplyStatus,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: GateApplyStatus::AlreadyResolved,
        }
    }
}

impl GateMachine {
    pub(super) fn new(snapshot: GateSnapshot) -> Self {
        Self { snapshot }
    }

    fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.snapshot.deadline_ms
    }

    fn resolve(&mut self, context: &mut DispatchContext, resolution: Resolution) -> Outcome<State> {
        self.snapshot.resolution = Some(resolution);
        self.snapshot.remaining_ms = 0;
        context.status = GateApplyStatus::Resolved(resolution);
        match resolution {
            Resolution::Safe => {
                self.snapshot.phase = GatePhase::ResolvedSafe;
                Transition(State::resolved_safe())
            }
            Resolution::Unsafe(_) => {
                self.snapshot.phase = GatePhase::ResolvedUnsafe;
                Transition(State::resolved_unsafe())
            }
        }
    }
}

#[state_machine(initial = "State::open()")]
impl GateMachine {
    #[state]
    fn open(&mut self, context: &mut DispatchContext, event: &GateCommand) -> Outcome<State> {
        match event {
            GateCommand::Tick { now_ms } => {
                if self.expired(*now_ms) {
                    return self.resolve(context, Resolution::Unsafe(UnsafeCause::TimedOut));
                }
                self.snapshot.remaining_ms = self.snapshot.deadline_ms.saturating_sub(*now_ms);
                context.status = GateApplyStatus::Counting;
                Handled
            }
            GateCommand::Decide { decision, now_ms } => {
                // The timer wins a tie with a late decision.
                if self.expired(*now_ms) {
                    return self.resolve(context, Resolution::Unsafe(UnsafeCause::TimedOut));
                }
                let resolution = match decision {
                    UserDecision::Safe => Resolution::Safe,
                    UserDecision::NeedHelp => Resolution::Unsafe(UnsafeCause::HelpRequested),
                };
                self.resolve(context, resolution)
            }
        }
    }

    #[state(superstate = "resolved")]
    fn resolved_safe(&mut self, context: &mut DispatchContext, event: &GateCommand) -> Outcome<State> {
        let _ = (context, event);
        Super
    }

    #[state(superstate = "resolved")]
    fn resolved_unsafe(
        &mut self,
        context: &mut DispatchContext,
        event: &GateCommand,
    ) -> Outcome<State> {
        let _ = (context, event);
        Super
    }

    #[superstate]
    fn resolved(&mut self, context: &mut DispatchContext, event: &GateCommand) -> Outcome<State> {
        let _ = event;
        context.status = GateApplyStatus::AlreadyResolved;
        Handled
    }
}
