#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserDecision {
    Safe,
    NeedHelp,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnsafeCause {
    HelpRequested,
    TimedOut,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    Safe,
    Unsafe(UnsafeCause),
}

impl Resolution {
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Safe)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum GatePhase {
    Open = 0,
    ResolvedSafe = 1,
    ResolvedUnsafe = 2,
}

impl GatePhase {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateCommand {
    Tick { now_ms: u64 },
    Decide { decision: UserDecision, now_ms: u64 },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GateSnapshot {
    pub phase: GatePhase,
    pub opened_at_ms: u64,
    pub deadline_ms: u64,
    pub remaining_ms: u64,
    pub resolution: Option<Resolution>,
}

impl GateSnapshot {
    pub(super) fn opened(now_ms: u64, timeout_ms: u64) -> Self {
        Self {
            phase: GatePhase::Open,
            opened_at_ms: now_ms,
            deadline_ms: now_ms.saturating_add(timeout_ms),
            remaining_ms: timeout_ms,
            resolution: None,
        }
    }

    /// Whole seconds left on the countdown, rounded up.
    pub fn remaining_secs(&self) -> u32 {
        let secs = self.remaining_ms.div_ceil(1_000);
        secs.min(u64::from(u32::MAX)) as u32
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateApplyStatus {
    Counting,
    Resolved(Resolution),
    AlreadyResolved,
}
