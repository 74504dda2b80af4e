use embassy_futures::join::{join3, join_array};
use embassy_time::{with_timeout, Duration};

use crate::config::{active_config, NotifyConfig};
use crate::detector::FallEvent;
use crate::incident::{Contact, MAX_CONTACTS};

use super::channel::NotificationChannel;
use super::types::{
    AlertMessage, ChannelFailure, ChannelResult, ChannelResults, DispatchReport,
    NotificationOutcome,
};

/// Contacts notified concurrently per batch.
pub const DISPATCH_BATCH: usize = 4;

/// Seam between the monitor loop and the delivery fan-out.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn dispatch(&self, contacts: &[Contact], event: &FallEvent) -> DispatchReport;
}

pub struct NotificationDispatcher<A, E, S> {
    system_alert: A,
    email: E,
    sms: S,
    config: NotifyConfig,
}

impl<A, E, S> NotificationDispatcher<A, E, S>
where
    A: NotificationChannel,
    E: NotificationChannel,
    S: NotificationChannel,
{
    pub fn new(system_alert: A, email: E, sms: S) -> Self {
        Self::with_config(system_alert, email, sms, active_config().notify)
    }

    pub fn with_config(system_alert: A, email: E, sms: S, config: NotifyConfig) -> Self {
        Self {
            system_alert,
            email,
            sms,
            config,
        }
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    pub fn system_alert(&self) -> &A {
        &self.system_alert
    }

    pub fn system_alert_mut(&mut self) -> &mut A {
        &mut self.system_alert
    }

    pub fn email(&self) -> &E {
        &self.email
    }

    pub fn sms(&self) -> &S {
        &self.sms
    }

    /// True iff at least one contact was reached on at least one channel.
    pub async fn notify(&self, contacts: &[Contact], event: &FallEvent) -> bool {
        self.dispatch_all(contacts, event).await.success
    }

    pub async fn dispatch_all(&self, contacts: &[Contact], event: &FallEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        if contacts.is_empty() {
            log::warn!("notify: no emergency contacts configured");
            return report;
        }
        let contacts = if contacts.len() > MAX_CONTACTS {
            log::warn!(
                "notify: {} contacts given, only the first {} are notified",
                contacts.len(),
                MAX_CONTACTS
            );
            &contacts[..MAX_CONTACTS]
        } else {
            contacts
        };

        for batch in contacts.chunks(DISPATCH_BATCH) {
            let outcomes = join_array(core::array::from_fn::<_, DISPATCH_BATCH, _>(|slot| {
                let contact = batch.get(slot);
                async move {
                    match contact {
                        Some(contact) => Some(self.notify_contact(contact, event).await),
                        None => None,
                    }
                }
            }))
            .await;

            for outcome in outcomes.into_iter().flatten() {
                report.record(outcome);
            }
        }

        log::info!(
            "notify: dispatch attempted={} reached={} success={}",
            report.attempted,
            report.reached,
            report.success
        );
        report
    }

    async fn notify_contact(&self, contact: &Contact, event: &FallEvent) -> NotificationOutcome {
        let alert = AlertMessage::compose(contact, event);
        let timeout = Duration::from_millis(self.config.channel_timeout_ms);

        let (system_alert, email, sms) = join3(
            settle(
                &self.system_alert,
                self.config.system_alert_enabled,
                timeout,
                contact,
                &alert,
            ),
            settle(&self.email, self.config.email_enabled, timeout, contact, &alert),
            settle(&self.sms, self.config.sms_enabled, timeout, contact, &alert),
        )
        .await;

        let channels = ChannelResults {
            system_alert,
            email,
            sms,
        };
        NotificationOutcome {
            contact_id: contact.id,
            channels,
            overall_success: channels.any_delivered(),
        }
    }
}

impl<A, E, S> Notifier for NotificationDispatcher<A, E, S>
where
    A: NotificationChannel,
    E: NotificationChannel,
    S: NotificationChannel,
{
    async fn dispatch(&self, contacts: &[Contact], event: &FallEvent) -> DispatchReport {
        self.dispatch_all(contacts, event).await
    }
}

/// Runs one channel attempt and captures its result as a value.
async fn settle<C: NotificationChannel>(
    channel: &C,
    enabled: bool,
    timeout: Duration,
    contact: &Contact,
    alert: &AlertMessage,
) -> ChannelResult {
    if !enabled {
        return ChannelResult::Skipped;
    }

    let failure = match with_timeout(timeout, channel.deliver(contact, alert)).await {
        Ok(Ok(())) => return ChannelResult::Delivered,
        Ok(Err(failure)) => failure,
        Err(_) => ChannelFailure::Timeout,
    };
    log::warn!(
        "notify: channel={} contact={} err={}",
        channel.kind().label(),
        contact.id.0,
        failure
    );
    ChannelResult::Failed(failure)
}
