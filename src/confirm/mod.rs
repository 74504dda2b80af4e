mod gate;
mod machine;
pub mod types;

pub use gate::{ConfirmationGate, GateApplyResult};
pub use types::{
    GateApplyStatus, GateCommand, GatePhase, GateSnapshot, Resolution, UnsafeCause, UserDecision,
};
