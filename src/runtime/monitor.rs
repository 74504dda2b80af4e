use embassy_futures::select::{select, select3, Either, Either3};

use crate::config::{ConfigError, MonitorConfig, ThresholdUpdate};
use crate::confirm::{ConfirmationGate, Resolution, UnsafeCause};
use crate::detector::{FallDetection, FallDetector};
use crate::incident::{
    FallStore, IncidentLog, IncidentRecord, NotificationSummary, ResolutionStatus, Settings,
    StoreError,
};
use crate::notify::{DispatchReport, Notifier};

use super::clock::CountdownClock;
use super::controls::MonitorControls;
use super::hooks::{AlarmRequest, MonitorHooks};
use super::location::{locate, LocationProvider};
use super::sensor::{MotionSource, SensorError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MonitorExit {
    Stopped,
    SourceClosed,
    Unsupported(SensorError),
}

enum GateOutcome {
    Resolved(Resolution),
    Abandoned,
}

/// One monitoring instance: sensor feed, classifier, confirmation window,
/// escalation and incident history.
pub struct FallMonitor<St, N, C, L, H> {
    config: MonitorConfig,
    detector: FallDetector,
    incidents: IncidentLog<St>,
    notifier: N,
    clock: C,
    location: L,
    hooks: H,
    settings: Settings,
}

impl<St, N, C, L, H> FallMonitor<St, N, C, L, H>
where
    St: FallStore,
    N: Notifier,
    C: CountdownClock,
    L: LocationProvider,
    H: MonitorHooks,
{
    pub fn new(
        config: MonitorConfig,
        store: St,
        notifier: N,
        clock: C,
        location: L,
        hooks: H,
    ) -> Self {
        Self {
            config,
            detector: FallDetector::new(config.detector),
            incidents: IncidentLog::new(store),
            notifier,
            clock,
            location,
            hooks,
            settings: Settings::default(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn detector(&self) -> &FallDetector {
        &self.detector
    }

    pub fn incidents(&mut self) -> &mut IncidentLog<St> {
        &mut self.incidents
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validates against a copy and swaps the result in, or leaves the live
    /// configuration untouched.
    pub fn apply_update(&mut self, update: &ThresholdUpdate) -> Result<(), ConfigError> {
        let next = update.applied_to(&self.config)?;
        self.detector.calibrate(next.detector)?;
        self.config = next;
        Ok(())
    }

    /// Persists user settings and recalibrates from the new sensitivity.
    pub async fn update_settings(&mut self, settings: Settings) -> Result<(), StoreError> {
        self.incidents.save_settings(settings).await?;
        self.settings = settings;
        if let Err(err) = self.apply_update(&settings.threshold_update()) {
            log::warn!("monitor: settings calibration rejected err={}", err);
        }
        Ok(())
    }

    pub async fn run<M: MotionSource>(
        &mut self,
        source: &mut M,
        controls: &MonitorControls,
    ) -> MonitorExit {
        if !source.is_supported() {
            log::warn!("monitor: motion sensor unsupported, detection disabled");
            self.hooks.unsupported(SensorError::Unsupported);
            return MonitorExit::Unsupported(SensorError::Unsupported);
        }
        if let Err(err) = source.subscribe() {
            log::warn!("monitor: subscribe err={}", err);
            self.hooks.unsupported(err);
            return MonitorExit::Unsupported(err);
        }

        // Configured thresholds stand unless the user saved a sensitivity.
        if let Some(settings) = self.incidents.stored_settings().await {
            self.settings = settings;
            if let Err(err) = self.apply_update(&settings.threshold_update()) {
                log::warn!("monitor: stored sensitivity rejected err={}", err);
            }
        }
        log::info!(
            "monitor: started strategy={:?} sensitivity={}",
            self.config.detector.strategy,
            self.settings.fall_sensitivity
        );

        let exit = self.watch(source, controls).await;
        source.unsubscribe();
        log::info!("monitor: stopped exit={:?}", exit);
        exit
    }

    async fn watch<M: MotionSource>(
        &mut self,
        source: &mut M,
        controls: &MonitorControls,
    ) -> MonitorExit {
        loop {
            let step = select3(
                controls.stopped(),
                controls.next_update(),
                source.next_reading(),
            )
            .await;

            match step {
                Either3::First(()) => return MonitorExit::Stopped,
                Either3::Second(update) => {
                    if let Err(err) = self.apply_update(&update) {
                        log::warn!("monitor: calibration rejected err={}", err);
                    }
                }
                Either3::Third(None) => return MonitorExit::SourceClosed,
                Either3::Third(Some(reading)) => {
                    let output = self.detector.tick(reading);
                    if let Some(detection) = output.detection {
                        if let Some(exit) = self.handle_fall(detection, source, controls).await {
                            return exit;
                        }
                    }
                }
            }
        }
    }

    /// Runs one detection through confirmation, escalation and the incident
    /// log. Returns an exit when the monitor should stop afterwards.
    async fn handle_fall<M: MotionSource>(
        &mut self,
        detection: FallDetection,
        source: &mut M,
        controls: &MonitorControls,
    ) -> Option<MonitorExit> {
        let opened_at_ms = self.clock.now_ms();
        self.detector.hold(opened_at_ms);
        controls.clear_decision();
        self.hooks.fall_detected(&detection);

        let mut gate = ConfirmationGate::open(detection, opened_at_ms, &self.config.confirmation);
        let mut source_closed = false;
        let outcome = match select(
            confirm(
                &mut gate,
                &mut self.clock,
                &mut self.hooks,
                controls,
                self.config.confirmation.tick_ms,
            ),
            feed_held(source, &mut self.detector, controls, &mut source_closed),
        )
        .await
        {
            Either::First(resolution) => GateOutcome::Resolved(resolution),
            Either::Second(()) => GateOutcome::Abandoned,
        };

        self.detector.release(self.clock.now_ms());
        let detection = gate.into_detection();

        let (record, exit) = match outcome {
            GateOutcome::Resolved(Resolution::Safe) => {
                self.hooks.confirmed_safe(&detection);
                let record = IncidentRecord::from_detection(
                    detection,
                    ResolutionStatus::Safe,
                    NotificationSummary::default(),
                );
                (record, None)
            }
            GateOutcome::Resolved(Resolution::Unsafe(cause)) => {
                (self.escalate(detection, cause).await, None)
            }
            GateOutcome::Abandoned => {
                log::warn!("monitor: stopped during confirmation, incident unresolved");
                let record = IncidentRecord::from_detection(
                    detection,
                    ResolutionStatus::Unresolved,
                    NotificationSummary::default(),
                );
                (record, Some(MonitorExit::Stopped))
            }
        };

        self.record(record).await;
        if exit.is_none() && source_closed {
            return Some(MonitorExit::SourceClosed);
        }
        exit
    }

    async fn escalate(&mut self, mut detection: FallDetection, cause: UnsafeCause) -> IncidentRecord {
        if let Some(location) = locate(&mut self.location).await {
            detection.event = detection.event.with_location(location);
        }
        self.hooks.declined(&detection.event, cause);

        let report = match self.incidents.contacts().await {
            Ok(contacts) => self.notifier.dispatch(&contacts, &detection.event).await,
            Err(err) => {
                log::warn!("monitor: contacts unavailable err={}, nobody notified", err);
                self.hooks.contacts_unavailable(err);
                DispatchReport::default()
            }
        };

        let status = if report.success {
            if let Some(alarm) = AlarmRequest::from_settings(&self.settings) {
                self.hooks.alarm(alarm);
            }
            ResolutionStatus::EmergencyNotified
        } else {
            log::warn!("monitor: no contact reached cause={:?}", cause);
            ResolutionStatus::Unresolved
        };
        IncidentRecord::from_detection(detection, status, report.summary())
    }

    async fn record(&mut self, record: IncidentRecord) {
        self.hooks.resolved(&record);
        match self.incidents.append(record).await {
            Ok(_) => {
                if self.incidents.unsaved_len() > 0 {
                    let _ = self.incidents.retry_unsaved().await;
                }
            }
            Err(err) => self.hooks.incident_unsaved(&err),
        }
    }
}

/// Drives the countdown until the gate resolves. A decision and a tick that
/// are ready together are applied decision first; the gate itself decides
/// whether the decision was in time.
async fn confirm<C: CountdownClock, H: MonitorHooks>(
    gate: &mut ConfirmationGate,
    clock: &mut C,
    hooks: &mut H,
    controls: &MonitorControls,
    tick_ms: u64,
) -> Resolution {
    clock.start(tick_ms);
    hooks.countdown(&gate.snapshot());

    loop {
        let result = match select(controls.next_decision(), clock.next_tick()).await {
            Either::First(decision) => gate.decide(decision, clock.now_ms()),
            Either::Second(()) => {
                let result = gate.tick(clock.now_ms());
                if result.countdown_changed() {
                    log::debug!("confirm: remaining={}s", result.after.remaining_secs());
                    hooks.countdown(&result.after);
                }
                result
            }
        };
        if let Some(resolution) = result.resolved() {
            return resolution;
        }
    }
}

/// Keeps the sensor feed flowing into the held detector. Completes only when
/// the monitor is asked to stop.
async fn feed_held<M: MotionSource>(
    source: &mut M,
    detector: &mut FallDetector,
    controls: &MonitorControls,
    source_closed: &mut bool,
) {
    while !*source_closed {
        match select(controls.stopped(), source.next_reading()).await {
            Either::First(()) => return,
            Either::Second(Some(reading)) => {
                let _ = detector.tick(reading);
            }
            Either::Second(None) => *source_closed = true,
        }
    }
    controls.stopped().await;
}
