use super::types::{ClassifierStateId, RejectReason};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectorTraceSample {
    pub now_ms: u64,
    pub state_id: ClassifierStateId,
    pub reject_reason: RejectReason,
    pub window_len: u8,
    pub high_acceleration_count: u8,
    pub high_rotation_count: u8,
    pub candidate: u8,
    pub delta: f32,
    pub since_motion_ms: u64,
    pub total_acceleration: f32,
    pub rotational_velocity: f32,
}
