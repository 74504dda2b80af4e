mod fall_hsm;
pub mod sampler;
pub mod strategy;
pub mod trace;
pub mod types;

pub use fall_hsm::{DetectorOutput, FallDetector};
pub use sampler::MotionSampler;
pub use trace::DetectorTraceSample;
pub use types::{
    Acceleration, ClassifierStateId, Coordinates, DetectionMethod, FallDetection, FallEvent,
    Location, MotionReading, MotionSample, RejectReason, RotationRate,
};
