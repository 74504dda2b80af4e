use core::{cmp::Reverse, fmt};

use heapless::Deque;

use super::settings::{Settings, SETTINGS_KEY};
use super::store::{ContactList, FallStore, IncidentList, StoreError};
use super::types::{ContactId, IncidentId, IncidentRecord, NewContact};

pub const MAX_UNSAVED: usize = 8;

/// A failed append. `record` is a copy for reporting only: the log keeps its
/// own copy and writes it on [`IncidentLog::retry_unsaved`], so appending
/// this one again stores the incident twice.
#[derive(Clone, Debug, PartialEq)]
pub struct IncidentWriteError {
    pub record: IncidentRecord,
    pub error: StoreError,
}

impl fmt::Display for IncidentWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "incident at {} ms not saved: {}",
            self.record.event.timestamp_ms, self.error
        )
    }
}

/// Append-only incident history on top of a [`FallStore`]. Records that fail
/// to persist are kept in memory until [`IncidentLog::retry_unsaved`]
/// succeeds or the history is cleared.
pub struct IncidentLog<S> {
    store: S,
    unsaved: Deque<IncidentRecord, MAX_UNSAVED>,
}

impl<S: FallStore> IncidentLog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            unsaved: Deque::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// On failure the record is retained for [`IncidentLog::retry_unsaved`].
    /// Callers must not append the copy in the returned error.
    pub async fn append(&mut self, record: IncidentRecord) -> Result<IncidentId, IncidentWriteError> {
        match self.store.append_incident(&record).await {
            Ok(id) => {
                log::info!(
                    "incident: saved id={} status={} at={}",
                    id.0,
                    record.status.label(),
                    record.event.timestamp_ms
                );
                Ok(id)
            }
            Err(error) => {
                log::warn!(
                    "incident: append err={:?} at={} retained={}",
                    error,
                    record.event.timestamp_ms,
                    self.unsaved.len() + 1
                );
                self.retain(record.clone());
                Err(IncidentWriteError { record, error })
            }
        }
    }

    fn retain(&mut self, record: IncidentRecord) {
        if self.unsaved.is_full() {
            if let Some(dropped) = self.unsaved.pop_front() {
                log::warn!(
                    "incident: unsaved queue full, dropping at={}",
                    dropped.event.timestamp_ms
                );
            }
        }
        let _ = self.unsaved.push_back(record);
    }

    /// Writes retained records oldest first. Stops at the first failure and
    /// keeps the remaining records. Returns how many were written.
    pub async fn retry_unsaved(&mut self) -> Result<usize, StoreError> {
        let mut written = 0;
        while let Some(record) = self.unsaved.pop_front() {
            if let Err(error) = self.store.append_incident(&record).await {
                let _ = self.unsaved.push_front(record);
                log::warn!(
                    "incident: retry err={:?} written={} pending={}",
                    error,
                    written,
                    self.unsaved.len()
                );
                return Err(error);
            }
            written += 1;
        }
        Ok(written)
    }

    pub fn unsaved(&self) -> impl Iterator<Item = &IncidentRecord> {
        self.unsaved.iter()
    }

    pub fn unsaved_len(&self) -> usize {
        self.unsaved.len()
    }

    /// Stored incidents, most recent first.
    pub async fn history(&mut self) -> Result<IncidentList, StoreError> {
        let mut incidents = self.store.all_incidents().await?;
        incidents.sort_unstable_by_key(|stored| {
            (
                Reverse(stored.record.event.timestamp_ms),
                Reverse(stored.id),
            )
        });
        Ok(incidents)
    }

    /// Bulk clear. Retained unsaved records are discarded as well.
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear_incidents().await?;
        self.unsaved.clear();
        log::info!("incident: history cleared");
        Ok(())
    }

    pub async fn contacts(&mut self) -> Result<ContactList, StoreError> {
        self.store.all_contacts().await
    }

    pub async fn add_contact(&mut self, contact: NewContact) -> Result<ContactId, StoreError> {
        let id = self.store.add_contact(contact).await?;
        log::info!("incident: contact added id={}", id.0);
        Ok(id)
    }

    /// Stored settings, or defaults when the record is missing, corrupt or
    /// unreadable.
    pub async fn load_settings(&mut self) -> Settings {
        self.stored_settings().await.unwrap_or_default()
    }

    /// Settings from a valid stored record. `None` when nothing usable is
    /// stored.
    pub async fn stored_settings(&mut self) -> Option<Settings> {
        match self.store.load_settings(SETTINGS_KEY).await {
            Ok(Some(record)) => {
                let settings = Settings::from_record(&record);
                if settings.is_none() {
                    log::warn!("incident: settings record invalid, using defaults");
                }
                settings
            }
            Ok(None) => None,
            Err(error) => {
                log::warn!("incident: settings load err={:?}, using defaults", error);
                None
            }
        }
    }

    pub async fn save_settings(&mut self, settings: Settings) -> Result<(), StoreError> {
        self.store
            .save_settings(SETTINGS_KEY, settings.record_bytes())
            .await
    }
}
