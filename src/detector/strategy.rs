use core::cmp::min;

use crate::config::{ThresholdDeltaConfig, WindowedConfig};

use super::types::{DetectionMethod, MotionSample, RejectReason};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SignalFeatures {
    pub delta: f32,
    pub since_motion_ms: u64,
    pub window_len: u8,
    pub high_acceleration_count: u8,
    pub high_rotation_count: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateAssessment {
    pub accepted: bool,
    pub method: DetectionMethod,
    pub confidence: u8,
    pub reason: RejectReason,
}

impl CandidateAssessment {
    fn rejected(method: DetectionMethod, reason: RejectReason) -> Self {
        Self {
            accepted: false,
            method,
            confidence: 0,
            reason,
        }
    }
}

fn saturating_count(count: usize) -> u8 {
    min(count, u8::MAX as usize) as u8
}

/// Window statistics for the windowed strategy plus the consecutive-sample
/// delta for the threshold-delta strategy. Both are computed on every tick so
/// the trace carries them regardless of the active strategy.
pub fn compute_signal_features<'a>(
    window: impl Iterator<Item = &'a MotionSample>,
    current: MotionSample,
    previous_total: Option<f32>,
    last_motion_at_ms: Option<u64>,
    cfg: &WindowedConfig,
) -> SignalFeatures {
    let mut window_len = 0usize;
    let mut high_acceleration = 0usize;
    let mut high_rotation = 0usize;
    for sample in window {
        window_len += 1;
        if sample.total_acceleration > cfg.acceleration_threshold {
            high_acceleration += 1;
        }
        if sample.rotational_velocity > cfg.rotation_threshold {
            high_rotation += 1;
        }
    }

    let delta = previous_total.map_or(0.0, |prev| (current.total_acceleration - prev).abs());
    let since_motion_ms =
        last_motion_at_ms.map_or(0, |last| current.timestamp_ms.saturating_sub(last));

    SignalFeatures {
        delta,
        since_motion_ms,
        window_len: saturating_count(window_len),
        high_acceleration_count: saturating_count(high_acceleration),
        high_rotation_count: saturating_count(high_rotation),
    }
}

/// A sharp change in magnitude after a quiet period.
pub fn assess_threshold_delta(
    features: &SignalFeatures,
    cfg: &ThresholdDeltaConfig,
) -> CandidateAssessment {
    let method = DetectionMethod::ThresholdDelta;
    if features.delta <= cfg.acceleration_threshold {
        return CandidateAssessment::rejected(method, RejectReason::BelowThreshold);
    }
    if features.since_motion_ms <= cfg.inactivity_threshold_ms {
        return CandidateAssessment::rejected(method, RejectReason::MotionRecent);
    }

    let confidence = if cfg.acceleration_threshold > 0.0 {
        let ratio = 50.0 * features.delta / cfg.acceleration_threshold;
        if ratio >= 100.0 {
            100
        } else {
            ratio as u8
        }
    } else {
        100
    };

    CandidateAssessment {
        accepted: true,
        method,
        confidence,
        reason: RejectReason::None,
    }
}

/// Several high-acceleration samples together with a rotational signature
/// inside one window.
pub fn assess_windowed(features: &SignalFeatures, cfg: &WindowedConfig) -> CandidateAssessment {
    let method = DetectionMethod::Windowed;
    if features.high_acceleration_count < cfg.high_acceleration_min {
        return CandidateAssessment::rejected(method, RejectReason::BelowThreshold);
    }
    if features.high_rotation_count < cfg.high_rotation_min {
        return CandidateAssessment::rejected(method, RejectReason::RotationWeak);
    }

    let score = u32::from(features.high_acceleration_count)
        * u32::from(cfg.weights.acceleration_weight)
        + u32::from(features.high_rotation_count) * u32::from(cfg.weights.rotation_weight);

    CandidateAssessment {
        accepted: true,
        method,
        confidence: min(score, 100) as u8,
        reason: RejectReason::None,
    }
}

/// Whether the sample counts as motion for the inactivity check.
pub fn is_motion(features: &SignalFeatures, cfg: &ThresholdDeltaConfig) -> bool {
    features.delta > cfg.acceleration_threshold
}
