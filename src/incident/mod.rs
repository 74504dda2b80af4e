mod history;
pub mod settings;
pub mod store;
pub mod types;

pub use history::{IncidentLog, IncidentWriteError, MAX_UNSAVED};
pub use settings::{Settings, SETTINGS_KEY};
pub use store::{FallStore, MemoryStore, StoreError, MAX_CONTACTS, MAX_INCIDENTS};
pub use types::{
    Contact, ContactId, FieldTooLong, IncidentId, IncidentRecord, NewContact,
    NotificationSummary, ResolutionStatus, StoredIncident,
};
