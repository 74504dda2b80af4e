use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::config::{active_config, ConfigError, DetectorConfig, StrategyKind};

use super::{
    sampler::MotionSampler,
    strategy::{
        assess_threshold_delta, assess_windowed, compute_signal_features, is_motion,
        CandidateAssessment,
    },
    trace::DetectorTraceSample,
    types::{
        ClassifierStateId, FallDetection, FallEvent, MotionReading, MotionSample, RejectReason,
    },
};

#[derive(Clone, Copy, Debug)]
enum FallHsmEvent {
    Tick(MotionReading),
    Hold { now_ms: u64 },
    Release { now_ms: u64 },
    Calibrate(DetectorConfig),
}

#[derive(Default)]
struct DispatchContext {
    detection: Option<FallDetection>,
}

#[derive(Clone, Debug, Default)]
pub struct DetectorOutput {
    pub sample: MotionSample,
    pub detection: Option<FallDetection>,
    pub trace: DetectorTraceSample,
}

/// Fall classifier. Emits at most one detection per debounce interval and
/// none while a previous detection is held in flight.
pub struct FallDetector {
    machine: statig::blocking::StateMachine<FallHsm>,
}

impl Default for FallDetector {
    fn default() -> Self {
        Self::new(active_config().detector)
    }
}

impl FallDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            machine: FallHsm::new(config).state_machine(),
        }
    }

    pub fn tick(&mut self, reading: MotionReading) -> DetectorOutput {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&FallHsmEvent::Tick(reading), &mut context);
        let inner = self.machine.inner();
        DetectorOutput {
            sample: inner.last_sample,
            detection: context.detection,
            trace: inner.last_trace,
        }
    }

    /// Suppresses classification while a detection is being confirmed.
    pub fn hold(&mut self, now_ms: u64) {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&FallHsmEvent::Hold { now_ms }, &mut context);
    }

    pub fn release(&mut self, now_ms: u64) {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&FallHsmEvent::Release { now_ms }, &mut context);
    }

    /// Replaces thresholds between ticks. Invalid values are rejected and the
    /// current configuration stays in place.
    pub fn calibrate(&mut self, config: DetectorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&FallHsmEvent::Calibrate(config), &mut context);
        Ok(())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.machine.inner().config
    }

    pub fn state_id(&self) -> ClassifierStateId {
        self.machine.inner().state_id
    }

    pub fn window_len(&self) -> usize {
        self.machine.inner().sampler.len()
    }
}

struct FallHsm {
    config: DetectorConfig,
    sampler: MotionSampler,
    previous_total: Option<f32>,
    last_motion_at_ms: Option<u64>,
    last_emit_at_ms: Option<u64>,
    state_id: ClassifierStateId,
    last_sample: MotionSample,
    last_trace: DetectorTraceSample,
}

impl FallHsm {
    fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            sampler: MotionSampler::new(config.sampler.fall_window_ms),
            previous_total: None,
            last_motion_at_ms: None,
            last_emit_at_ms: None,
            state_id: ClassifierStateId::Idle,
            last_sample: MotionSample::default(),
            last_trace: DetectorTraceSample::default(),
        }
    }

    fn in_debounce(&self, now_ms: u64) -> bool {
        self.last_emit_at_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.debounce_ms)
    }

    fn enter(&mut self, state_id: ClassifierStateId) {
        self.state_id = state_id;
    }

    fn reject_with_reason(&mut self, reason: RejectReason) {
        self.last_trace.reject_reason = reason;
        log::debug!(
            "detector: suppressed candidate at={} reason={:?}",
            self.last_trace.now_ms,
            reason
        );
    }

    fn apply_calibration(&mut self, config: DetectorConfig) {
        self.config = config;
        self.sampler.set_fall_window_ms(config.sampler.fall_window_ms);
        log::info!(
            "detector: calibrated strategy={:?} delta_threshold={} window_ms={} debounce_ms={}",
            config.strategy,
            config.threshold_delta.acceleration_threshold,
            config.sampler.fall_window_ms,
            config.debounce_ms
        );
    }

    fn emit(&mut self, context: &mut DispatchContext, assessment: CandidateAssessment) {
        let now_ms = self.last_sample.timestamp_ms;
        self.last_emit_at_ms = Some(now_ms);
        log::info!(
            "detector: fall at={} method={} confidence={} magnitude={}",
            now_ms,
            assessment.method.label(),
            assessment.confidence,
            self.last_sample.total_acceleration
        );
        context.detection = Some(FallDetection {
            event: FallEvent::new(now_ms, self.last_sample.total_acceleration),
            method: assessment.method,
            confidence: assessment.confidence,
        });
    }

    fn evaluate_tick(&mut self, reading: &MotionReading) -> CandidateAssessment {
        let sample = self.sampler.observe(reading);
        let features = compute_signal_features(
            self.sampler.samples(),
            sample,
            self.previous_total,
            self.last_motion_at_ms,
            &self.config.windowed,
        );

        let assessment = match self.config.strategy {
            StrategyKind::ThresholdDelta => {
                assess_threshold_delta(&features, &self.config.threshold_delta)
            }
            StrategyKind::Windowed => assess_windowed(&features, &self.config.windowed),
        };

        if self.last_motion_at_ms.is_none() || is_motion(&features, &self.config.threshold_delta)
        {
            self.last_motion_at_ms = Some(sample.timestamp_ms);
        }
        self.previous_total = Some(sample.total_acceleration);
        self.last_sample = sample;

        self.last_trace = DetectorTraceSample {
            now_ms: sample.timestamp_ms,
            state_id: self.state_id,
            reject_reason: assessment.reason,
            window_len: features.window_len,
            high_acceleration_count: features.high_acceleration_count,
            high_rotation_count: features.high_rotation_count,
            candidate: if assessment.accepted { 1 } else { 0 },
            delta: features.delta,
            since_motion_ms: features.since_motion_ms,
            total_acceleration: sample.total_acceleration,
            rotational_velocity: sample.rotational_velocity,
        };

        assessment
    }
}

#[state_machine(initial = "State::idle()")]
impl FallHsm {
    #[state(superstate = "monitoring")]
    fn idle(&mut self, context: &mut DispatchContext, event: &FallHsmEvent) -> Outcome<State> {
        match event {
            FallHsmEvent::Tick(reading) => {
                let assessment = self.evaluate_tick(reading);
                if !assessment.accepted {
                    return Handled;
                }
                // Debounce is measured in sensor time, whatever clock released us.
                if self.in_debounce(reading.now_ms) {
                    self.reject_with_reason(RejectReason::Debounced);
                } else {
                    self.emit(context, assessment);
                }
                self.enter(ClassifierStateId::Debounced);
                Transition(State::debounced())
            }
            _ => Super,
        }
    }

    #[state(superstate = "monitoring")]
    fn debounced(
        &mut self,
        context: &mut DispatchContext,
        event: &FallHsmEvent,
    ) -> Outcome<State> {
        match event {
            FallHsmEvent::Tick(reading) => {
                let assessment = self.evaluate_tick(reading);
                if self.in_debounce(reading.now_ms) {
                    if assessment.accepted {
                        self.reject_with_reason(RejectReason::Debounced);
                    }
                    return Handled;
                }

                if assessment.accepted {
                    self.emit(context, assessment);
                    return Handled;
                }
                self.enter(ClassifierStateId::Idle);
                Transition(State::idle())
            }
            _ => Super,
        }
    }

    #[state(superstate = "suppressed")]
    fn held(&mut self, context: &mut DispatchContext, event: &FallHsmEvent) -> Outcome<State> {
        let _ = context;
        match event {
            FallHsmEvent::Tick(reading) => {
                let assessment = self.evaluate_tick(reading);
                if assessment.accepted {
                    self.reject_with_reason(RejectReason::InFlight);
                }
                Handled
            }
            FallHsmEvent::Release { now_ms } => {
                if self.in_debounce(*now_ms) {
                    self.enter(ClassifierStateId::Debounced);
                    Transition(State::debounced())
                } else {
                    self.enter(ClassifierStateId::Idle);
                    Transition(State::idle())
                }
            }
            _ => Super,
        }
    }

    #[superstate]
    fn monitoring(
        &mut self,
        context: &mut DispatchContext,
        event: &FallHsmEvent,
    ) -> Outcome<State> {
        let _ = context;
        match event {
            FallHsmEvent::Hold { now_ms } => {
                log::debug!("detector: hold at={}", now_ms);
                self.enter(ClassifierStateId::Held);
                Transition(State::held())
            }
            FallHsmEvent::Calibrate(config) => {
                self.apply_calibration(*config);
                Handled
            }
            _ => Handled,
        }
    }

    #[superstate]
    fn suppressed(
        &mut self,
        context: &mut DispatchContext,
        event: &FallHsmEvent,
    ) -> Outcome<State> {
        let _ = context;
        match event {
            FallHsmEvent::Calibrate(config) => {
                self.apply_calibration(*config);
                Handled
            }
            _ => Handled,
        }
    }
}
