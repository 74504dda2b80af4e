use core::fmt;

use heapless::{String, Vec};

use super::settings::SETTINGS_RECORD_LEN;
use super::types::{Contact, ContactId, IncidentId, IncidentRecord, NewContact, StoredIncident};

pub const MAX_CONTACTS: usize = 16;
pub const MAX_INCIDENTS: usize = 32;
pub const MAX_SETTINGS_KEYS: usize = 4;
pub const SETTINGS_KEY_CAPACITY: usize = 16;

pub type ContactList = Vec<Contact, MAX_CONTACTS>;
pub type IncidentList = Vec<StoredIncident, MAX_INCIDENTS>;
pub type SettingsRecord = [u8; SETTINGS_RECORD_LEN];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreError {
    Full,
    Unavailable,
    InvalidKey,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "store full"),
            Self::Unavailable => write!(f, "store unavailable"),
            Self::InvalidKey => write!(f, "invalid settings key"),
        }
    }
}

/// Storage collaborator for contacts, incident history and settings records.
/// Every call may fail; callers surface the error and never retry inside the
/// store.
#[allow(async_fn_in_trait)]
pub trait FallStore {
    async fn add_contact(&mut self, contact: NewContact) -> Result<ContactId, StoreError>;
    async fn all_contacts(&mut self) -> Result<ContactList, StoreError>;
    async fn append_incident(&mut self, record: &IncidentRecord) -> Result<IncidentId, StoreError>;
    async fn all_incidents(&mut self) -> Result<IncidentList, StoreError>;
    async fn clear_incidents(&mut self) -> Result<(), StoreError>;
    async fn load_settings(&mut self, key: &str) -> Result<Option<SettingsRecord>, StoreError>;
    async fn save_settings(&mut self, key: &str, record: SettingsRecord)
        -> Result<(), StoreError>;
}

/// Bounded in-memory store. Ids are assigned sequentially from 1 and are not
/// reused after a clear.
#[derive(Default)]
pub struct MemoryStore {
    contacts: ContactList,
    incidents: IncidentList,
    settings: Vec<(String<SETTINGS_KEY_CAPACITY>, SettingsRecord), MAX_SETTINGS_KEYS>,
    next_contact_id: u32,
    next_incident_id: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }
}

impl FallStore for MemoryStore {
    async fn add_contact(&mut self, contact: NewContact) -> Result<ContactId, StoreError> {
        let id = ContactId(self.next_contact_id.wrapping_add(1));
        self.contacts
            .push(Contact::from_new(id, contact))
            .map_err(|_| StoreError::Full)?;
        self.next_contact_id = id.0;
        Ok(id)
    }

    async fn all_contacts(&mut self) -> Result<ContactList, StoreError> {
        Ok(self.contacts.clone())
    }

    async fn append_incident(&mut self, record: &IncidentRecord) -> Result<IncidentId, StoreError> {
        let id = IncidentId(self.next_incident_id.wrapping_add(1));
        self.incidents
            .push(StoredIncident {
                id,
                record: record.clone(),
            })
            .map_err(|_| StoreError::Full)?;
        self.next_incident_id = id.0;
        Ok(id)
    }

    async fn all_incidents(&mut self) -> Result<IncidentList, StoreError> {
        Ok(self.incidents.clone())
    }

    async fn clear_incidents(&mut self) -> Result<(), StoreError> {
        self.incidents.clear();
        Ok(())
    }

    async fn load_settings(&mut self, key: &str) -> Result<Option<SettingsRecord>, StoreError> {
        Ok(self
            .settings
            .iter()
            .find(|(stored, _)| stored.as_str() == key)
            .map(|(_, record)| *record))
    }

    async fn save_settings(
        &mut self,
        key: &str,
        record: SettingsRecord,
    ) -> Result<(), StoreError> {
        if let Some(slot) = self
            .settings
            .iter_mut()
            .find(|(stored, _)| stored.as_str() == key)
        {
            slot.1 = record;
            return Ok(());
        }
        let mut owned = String::new();
        owned.push_str(key).map_err(|()| StoreError::InvalidKey)?;
        self.settings
            .push((owned, record))
            .map_err(|_| StoreError::Full)
    }
}
