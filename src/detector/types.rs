use heapless::String;

pub const MAP_LINK_CAPACITY: usize = 96;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationRate {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

/// One raw device-motion event as delivered by the sensor collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionReading {
    pub now_ms: u64,
    pub acceleration: Acceleration,
    pub rotation: Option<RotationRate>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionSample {
    pub total_acceleration: f32,
    pub rotational_velocity: f32,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub coords: Coordinates,
    pub map_link: String<MAP_LINK_CAPACITY>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FallEvent {
    pub timestamp_ms: u64,
    pub acceleration_magnitude: f32,
    pub location: Option<Location>,
}

impl FallEvent {
    pub fn new(timestamp_ms: u64, acceleration_magnitude: f32) -> Self {
        Self {
            timestamp_ms,
            acceleration_magnitude,
            location: None,
        }
    }

    /// Attaches a location once. An event that already carries one is
    /// returned unchanged.
    pub fn with_location(mut self, location: Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum DetectionMethod {
    ThresholdDelta = 1,
    Windowed = 2,
}

impl DetectionMethod {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ThresholdDelta => "threshold-delta",
            Self::Windowed => "windowed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FallDetection {
    pub event: FallEvent,
    pub method: DetectionMethod,
    pub confidence: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
#[repr(u8)]
pub enum RejectReason {
    #[default]
    None = 0,
    BelowThreshold = 1,
    MotionRecent = 2,
    RotationWeak = 3,
    Debounced = 4,
    InFlight = 5,
}

impl RejectReason {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
#[repr(u8)]
pub enum ClassifierStateId {
    #[default]
    Idle = 0,
    Debounced = 1,
    Held = 2,
}

impl ClassifierStateId {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
