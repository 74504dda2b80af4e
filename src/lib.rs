#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod confirm;
pub mod detector;
pub mod incident;
pub mod notify;
pub mod runtime;

pub use config::{active_config, MonitorConfig, ThresholdUpdate};
pub use confirm::{ConfirmationGate, Resolution, UserDecision};
pub use detector::{FallDetector, FallEvent, MotionReading};
pub use incident::{IncidentLog, IncidentRecord, MemoryStore, ResolutionStatus};
pub use notify::{DispatchReport, NotificationDispatcher};
pub use runtime::{FallMonitor, MonitorControls, MonitorExit};
