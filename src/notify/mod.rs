pub mod channel;
mod dispatcher;
pub mod types;

pub use channel::{
    NotificationChannel, Permission, SimulatedEmailChannel, SimulatedSmsChannel,
    SystemAlertChannel,
};
pub use dispatcher::{NotificationDispatcher, Notifier, DISPATCH_BATCH};
pub use types::{
    AlertMessage, ChannelFailure, ChannelKind, ChannelResult, ChannelResults, DispatchReport,
    NotificationOutcome,
};
