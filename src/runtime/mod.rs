pub mod clock;
pub mod controls;
pub mod hooks;
pub mod location;
mod monitor;
pub mod sensor;

pub use clock::{CountdownClock, EmbassyClock};
pub use controls::{MonitorControls, UPDATE_QUEUE_DEPTH};
pub use hooks::{AlarmRequest, MonitorHooks, NoopHooks, ALARM_VIBRATION_PATTERN_MS};
pub use location::{google_maps_link, FixedLocation, LocationProvider, NoLocation};
pub use monitor::{FallMonitor, MonitorExit};
pub use sensor::{ChannelMotionSource, MotionSource, SensorError};

#[cfg(test)]
mod tests;
