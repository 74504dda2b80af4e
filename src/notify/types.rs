use core::fmt::{self, Write as _};

use heapless::{String, Vec};

use crate::detector::FallEvent;
use crate::incident::{Contact, ContactId, NotificationSummary, MAX_CONTACTS};

pub const ALERT_TITLE_CAPACITY: usize = 64;
pub const ALERT_BODY_CAPACITY: usize = 224;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ChannelKind {
    SystemAlert = 0,
    Email = 1,
    Sms = 2,
}

impl ChannelKind {
    pub const ALL: [Self; 3] = [Self::SystemAlert, Self::Email, Self::Sms];

    pub const fn label(self) -> &'static str {
        match self {
            Self::SystemAlert => "system-alert",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelFailure {
    Unsupported,
    PermissionDenied,
    Gateway,
    Timeout,
    InvalidAddress,
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unsupported => "channel unsupported",
            Self::PermissionDenied => "permission denied",
            Self::Gateway => "gateway error",
            Self::Timeout => "timed out",
            Self::InvalidAddress => "invalid address",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelResult {
    Delivered,
    Failed(ChannelFailure),
    Skipped,
}

impl ChannelResult {
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChannelResults {
    pub system_alert: ChannelResult,
    pub email: ChannelResult,
    pub sms: ChannelResult,
}

impl ChannelResults {
    pub fn get(&self, kind: ChannelKind) -> ChannelResult {
        match kind {
            ChannelKind::SystemAlert => self.system_alert,
            ChannelKind::Email => self.email,
            ChannelKind::Sms => self.sms,
        }
    }

    pub fn any_delivered(&self) -> bool {
        ChannelKind::ALL
            .iter()
            .any(|&kind| self.get(kind).is_delivered())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NotificationOutcome {
    pub contact_id: ContactId,
    pub channels: ChannelResults,
    pub overall_success: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DispatchReport {
    pub outcomes: Vec<NotificationOutcome, MAX_CONTACTS>,
    pub attempted: u16,
    pub reached: u16,
    pub success: bool,
}

impl DispatchReport {
    /// Callers keep to `MAX_CONTACTS` outcomes so `attempted` matches
    /// `outcomes`.
    pub(super) fn record(&mut self, outcome: NotificationOutcome) {
        let delivered = outcome.overall_success;
        if let Err(outcome) = self.outcomes.push(outcome) {
            log::warn!(
                "notify: report full, outcome for contact {} dropped",
                outcome.contact_id.0
            );
            return;
        }
        self.attempted = self.attempted.saturating_add(1);
        if delivered {
            self.reached = self.reached.saturating_add(1);
            self.success = true;
        }
    }

    pub fn outcome_for(&self, contact_id: ContactId) -> Option<&NotificationOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.contact_id == contact_id)
    }

    pub fn summary(&self) -> NotificationSummary {
        NotificationSummary {
            attempted: self.attempted,
            reached: self.reached,
        }
    }
}

/// Rendered alert for one contact.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AlertMessage {
    pub title: String<ALERT_TITLE_CAPACITY>,
    pub body: String<ALERT_BODY_CAPACITY>,
}

impl AlertMessage {
    /// Text that does not fit is cut at the last whole fragment.
    pub fn compose(contact: &Contact, event: &FallEvent) -> Self {
        let mut message = Self::default();
        let _ = write!(message.title, "Fall Detected - {}", contact.name);
        let _ = write!(
            message.body,
            "Emergency contact for potential fall at {} ms (impact {:.1})",
            event.timestamp_ms, event.acceleration_magnitude
        );
        if let Some(location) = &event.location {
            let _ = write!(message.body, ". Location: {}", location.map_link);
        }
        message
    }
}
