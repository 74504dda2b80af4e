use heapless::Deque;
use libm::sqrtf;

use super::types::{MotionReading, MotionSample};

pub const WINDOW_CAPACITY: usize = 128;

/// Sliding window of recent motion samples, bounded by `fall_window_ms` and
/// by [`WINDOW_CAPACITY`].
pub struct MotionSampler {
    fall_window_ms: u64,
    window: Deque<MotionSample, WINDOW_CAPACITY>,
}

pub fn total_acceleration(reading: &MotionReading) -> f32 {
    let a = reading.acceleration;
    sqrtf(a.x * a.x + a.y * a.y + a.z * a.z)
}

pub fn rotational_velocity(reading: &MotionReading) -> f32 {
    reading
        .rotation
        .map_or(0.0, |r| r.alpha.abs() + r.beta.abs() + r.gamma.abs())
}

impl MotionSampler {
    pub fn new(fall_window_ms: u64) -> Self {
        Self {
            fall_window_ms,
            window: Deque::new(),
        }
    }

    pub fn fall_window_ms(&self) -> u64 {
        self.fall_window_ms
    }

    pub fn set_fall_window_ms(&mut self, fall_window_ms: u64) {
        self.fall_window_ms = fall_window_ms;
    }

    pub fn observe(&mut self, reading: &MotionReading) -> MotionSample {
        let sample = MotionSample {
            total_acceleration: total_acceleration(reading),
            rotational_velocity: rotational_velocity(reading),
            timestamp_ms: reading.now_ms,
        };

        if self.window.is_full() {
            let _ = self.window.pop_front();
        }
        let _ = self.window.push_back(sample);
        self.prune(reading.now_ms);
        sample
    }

    fn prune(&mut self, now_ms: u64) {
        let window_ms = self.fall_window_ms;
        let mut kept = Deque::new();
        for sample in self.window.iter() {
            if now_ms.saturating_sub(sample.timestamp_ms) < window_ms {
                let _ = kept.push_back(*sample);
            }
        }
        self.window = kept;
    }

    pub fn samples(&self) -> impl Iterator<Item = &MotionSample> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
