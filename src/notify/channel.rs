use crate::incident::Contact;

use super::types::{AlertMessage, ChannelFailure, ChannelKind};

/// One independent delivery mechanism. Implementations report failure as a
/// value; the dispatcher isolates each attempt from its siblings.
#[allow(async_fn_in_trait)]
pub trait NotificationChannel {
    fn kind(&self) -> ChannelKind;

    async fn deliver(&self, contact: &Contact, alert: &AlertMessage)
        -> Result<(), ChannelFailure>;
}

/// Notification permission as granted by the platform. Passed in explicitly
/// rather than read from ambient state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Permission {
    Granted,
    Denied,
    Prompt,
    Unsupported,
}

pub struct SystemAlertChannel {
    permission: Permission,
}

impl SystemAlertChannel {
    pub const fn new(permission: Permission) -> Self {
        Self { permission }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
    }
}

impl NotificationChannel for SystemAlertChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::SystemAlert
    }

    async fn deliver(
        &self,
        contact: &Contact,
        alert: &AlertMessage,
    ) -> Result<(), ChannelFailure> {
        match self.permission {
            Permission::Granted => {
                log::info!(
                    "notify: system alert contact={} title={}",
                    contact.id.0,
                    alert.title
                );
                Ok(())
            }
            Permission::Denied | Permission::Prompt => Err(ChannelFailure::PermissionDenied),
            Permission::Unsupported => Err(ChannelFailure::Unsupported),
        }
    }
}

/// Stand-in for an email gateway. Delivery succeeds while `online`.
pub struct SimulatedEmailChannel {
    online: bool,
}

impl SimulatedEmailChannel {
    pub const fn new(online: bool) -> Self {
        Self { online }
    }
}

impl NotificationChannel for SimulatedEmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(
        &self,
        contact: &Contact,
        alert: &AlertMessage,
    ) -> Result<(), ChannelFailure> {
        if !self.online {
            return Err(ChannelFailure::Gateway);
        }
        log::info!(
            "notify: email contact={} name={} body={}",
            contact.id.0,
            contact.name,
            alert.body
        );
        Ok(())
    }
}

/// Stand-in for an SMS gateway. Requires a phone number.
pub struct SimulatedSmsChannel {
    online: bool,
}

impl SimulatedSmsChannel {
    pub const fn new(online: bool) -> Self {
        Self { online }
    }
}

impl NotificationChannel for SimulatedSmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn deliver(
        &self,
        contact: &Contact,
        alert: &AlertMessage,
    ) -> Result<(), ChannelFailure> {
        if contact.phone.trim().is_empty() {
            return Err(ChannelFailure::InvalidAddress);
        }
        if !self.online {
            return Err(ChannelFailure::Gateway);
        }
        log::info!(
            "notify: sms contact={} phone={} body={}",
            contact.id.0,
            contact.phone,
            alert.body
        );
        Ok(())
    }
}
