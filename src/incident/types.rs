use core::fmt;

use heapless::String;

use crate::detector::{DetectionMethod, FallDetection, FallEvent};

pub const NAME_CAPACITY: usize = 32;
pub const PHONE_CAPACITY: usize = 20;
pub const RELATION_CAPACITY: usize = 24;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContactId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IncidentId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldTooLong {
    pub field: &'static str,
    pub capacity: usize,
}

impl fmt::Display for FieldTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exceeds {} bytes", self.field, self.capacity)
    }
}

fn bounded<const N: usize>(value: &str, field: &'static str) -> Result<String<N>, FieldTooLong> {
    let mut out = String::new();
    out.push_str(value)
        .map_err(|()| FieldTooLong { field, capacity: N })?;
    Ok(out)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewContact {
    pub name: String<NAME_CAPACITY>,
    pub phone: String<PHONE_CAPACITY>,
    pub relation: String<RELATION_CAPACITY>,
}

impl NewContact {
    pub fn new(name: &str, phone: &str, relation: &str) -> Result<Self, FieldTooLong> {
        Ok(Self {
            name: bounded(name, "name")?,
            phone: bounded(phone, "phone")?,
            relation: bounded(relation, "relation")?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String<NAME_CAPACITY>,
    pub phone: String<PHONE_CAPACITY>,
    pub relation: String<RELATION_CAPACITY>,
}

impl Contact {
    pub fn from_new(id: ContactId, contact: NewContact) -> Self {
        Self {
            id,
            name: contact.name,
            phone: contact.phone,
            relation: contact.relation,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ResolutionStatus {
    Safe = 0,
    EmergencyNotified = 1,
    Unresolved = 2,
}

impl ResolutionStatus {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Label shown in the incident history.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Safe => "Resolved",
            Self::EmergencyNotified => "Emergency",
            Self::Unresolved => "Unresolved",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NotificationSummary {
    pub attempted: u16,
    pub reached: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IncidentRecord {
    pub event: FallEvent,
    pub status: ResolutionStatus,
    pub method: DetectionMethod,
    pub confidence: u8,
    pub notification: NotificationSummary,
}

impl IncidentRecord {
    pub fn from_detection(
        detection: FallDetection,
        status: ResolutionStatus,
        notification: NotificationSummary,
    ) -> Self {
        Self {
            event: detection.event,
            status,
            method: detection.method,
            confidence: detection.confidence,
            notification,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredIncident {
    pub id: IncidentId,
    pub record: IncidentRecord,
}
