use crate::confirm::{GateSnapshot, UnsafeCause};
use crate::detector::{FallDetection, FallEvent};
use crate::incident::{IncidentRecord, IncidentWriteError, Settings, StoreError};

use super::sensor::SensorError;

pub const ALARM_VIBRATION_PATTERN_MS: [u16; 6] = [500, 250, 500, 250, 500, 250];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AlarmRequest {
    pub vibration_pattern_ms: Option<[u16; 6]>,
    pub sound: bool,
}

impl AlarmRequest {
    /// `None` when the user disabled both vibration and sound.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if !settings.enable_vibration && !settings.enable_sound {
            return None;
        }
        Some(Self {
            vibration_pattern_ms: settings
                .enable_vibration
                .then_some(ALARM_VIBRATION_PATTERN_MS),
            sound: settings.enable_sound,
        })
    }
}

/// Caller-facing surface of the monitor. Every hook defaults to a no-op.
pub trait MonitorHooks {
    fn unsupported(&mut self, error: SensorError) {
        let _ = error;
    }

    fn fall_detected(&mut self, detection: &FallDetection) {
        let _ = detection;
    }

    fn countdown(&mut self, snapshot: &GateSnapshot) {
        let _ = snapshot;
    }

    fn confirmed_safe(&mut self, detection: &FallDetection) {
        let _ = detection;
    }

    fn declined(&mut self, event: &FallEvent, cause: UnsafeCause) {
        let _ = (event, cause);
    }

    /// Contacts could not be read, so nobody was notified.
    fn contacts_unavailable(&mut self, error: StoreError) {
        let _ = error;
    }

    fn alarm(&mut self, alarm: AlarmRequest) {
        let _ = alarm;
    }

    fn resolved(&mut self, record: &IncidentRecord) {
        let _ = record;
    }

    fn incident_unsaved(&mut self, error: &IncidentWriteError) {
        let _ = error;
    }
}

pub struct NoopHooks;

impl MonitorHooks for NoopHooks {}
