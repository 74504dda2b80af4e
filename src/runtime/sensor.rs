use core::fmt;

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Receiver};

use crate::detector::MotionReading;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorError {
    Unsupported,
    PermissionDenied,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "motion sensor unsupported"),
            Self::PermissionDenied => write!(f, "motion sensor permission denied"),
        }
    }
}

/// Sensor collaborator. Support is queried before subscribing, and the
/// subscription is dropped when monitoring stops.
#[allow(async_fn_in_trait)]
pub trait MotionSource {
    fn is_supported(&self) -> bool;

    fn subscribe(&mut self) -> Result<(), SensorError>;

    fn unsubscribe(&mut self);

    /// Next reading, or `None` once the source is closed.
    async fn next_reading(&mut self) -> Option<MotionReading>;
}

/// Readings pushed by a sensor task through an embassy channel.
pub struct ChannelMotionSource<'a, M: RawMutex, const N: usize> {
    readings: Receiver<'a, M, MotionReading, N>,
    supported: bool,
    subscribed: bool,
}

impl<'a, M: RawMutex, const N: usize> ChannelMotionSource<'a, M, N> {
    pub fn new(readings: Receiver<'a, M, MotionReading, N>, supported: bool) -> Self {
        Self {
            readings,
            supported,
            subscribed: false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

impl<M: RawMutex, const N: usize> MotionSource for ChannelMotionSource<'_, M, N> {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn subscribe(&mut self) -> Result<(), SensorError> {
        if !self.supported {
            return Err(SensorError::Unsupported);
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
        while self.readings.try_receive().is_ok() {}
    }

    async fn next_reading(&mut self) -> Option<MotionReading> {
        if !self.subscribed {
            return None;
        }
        Some(self.readings.receive().await)
    }
}
