use core::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

use embassy_futures::{block_on, yield_now};
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Channel};

use super::*;
use crate::config::{active_config, StrategyKind, ThresholdUpdate};
use crate::confirm::{GateSnapshot, UnsafeCause};
use crate::detector::{
    Acceleration, Coordinates, FallDetection, FallEvent, MotionReading, RotationRate,
};
use crate::incident::store::{ContactList, IncidentList, SettingsRecord};
use crate::incident::types::{ContactId, IncidentId};
use crate::incident::{
    Contact, FallStore, IncidentRecord, IncidentWriteError, MemoryStore, NewContact,
    ResolutionStatus, Settings, StoreError, SETTINGS_KEY,
};
use crate::notify::{DispatchReport, Notifier};

struct TestClock {
    now_ms: u64,
    period_ms: u64,
}

impl TestClock {
    fn at(now_ms: u64) -> Self {
        Self {
            now_ms,
            period_ms: 0,
        }
    }
}

impl CountdownClock for TestClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn start(&mut self, period_ms: u64) {
        self.period_ms = period_ms;
    }

    async fn next_tick(&mut self) {
        yield_now().await;
        self.now_ms += self.period_ms;
    }
}

struct ScriptedSource {
    readings: VecDeque<MotionReading>,
    supported: bool,
    close_when_empty: bool,
    subscribed: bool,
    unsubscribes: u32,
}

impl ScriptedSource {
    fn new(readings: impl IntoIterator<Item = MotionReading>, close_when_empty: bool) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            supported: true,
            close_when_empty,
            subscribed: false,
            unsubscribes: 0,
        }
    }

    fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new([], true)
        }
    }
}

impl MotionSource for ScriptedSource {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn subscribe(&mut self) -> Result<(), SensorError> {
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
        self.unsubscribes += 1;
    }

    async fn next_reading(&mut self) -> Option<MotionReading> {
        match self.readings.pop_front() {
            Some(reading) => Some(reading),
            None if self.close_when_empty => None,
            None => core::future::pending().await,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Seen {
    Unsupported(SensorError),
    Detected(u64),
    Safe,
    Declined(UnsafeCause),
    ContactsUnavailable(StoreError),
    Alarm(AlarmRequest),
    Resolved(ResolutionStatus),
    Unsaved,
}

#[derive(Clone, Copy)]
enum Script {
    Idle,
    SafeAt(u32),
    HelpAt(u32),
    StopOnDetect,
    SafeThenHelpOnDetect,
}

struct RecordingHooks<'a> {
    controls: &'a MonitorControls,
    script: Script,
    stop_after_resolved: bool,
    seen: Vec<Seen>,
    countdown: Vec<u32>,
}

impl<'a> RecordingHooks<'a> {
    fn new(controls: &'a MonitorControls, script: Script) -> Self {
        Self {
            controls,
            script,
            stop_after_resolved: false,
            seen: Vec::new(),
            countdown: Vec::new(),
        }
    }

    fn stopping(mut self) -> Self {
        self.stop_after_resolved = true;
        self
    }
}

impl MonitorHooks for RecordingHooks<'_> {
    fn unsupported(&mut self, error: SensorError) {
        self.seen.push(Seen::Unsupported(error));
    }

    fn fall_detected(&mut self, detection: &FallDetection) {
        self.seen.push(Seen::Detected(detection.event.timestamp_ms));
        match self.script {
            Script::StopOnDetect => self.controls.stop(),
            Script::SafeThenHelpOnDetect => {
                self.controls.mark_safe();
                self.controls.request_help();
            }
            _ => {}
        }
    }

    fn countdown(&mut self, snapshot: &GateSnapshot) {
        let secs = snapshot.remaining_secs();
        self.countdown.push(secs);
        match self.script {
            Script::SafeAt(at) if at == secs => self.controls.mark_safe(),
            Script::HelpAt(at) if at == secs => self.controls.request_help(),
            _ => {}
        }
    }

    fn confirmed_safe(&mut self, _detection: &FallDetection) {
        self.seen.push(Seen::Safe);
    }

    fn declined(&mut self, _event: &FallEvent, cause: UnsafeCause) {
        self.seen.push(Seen::Declined(cause));
    }

    fn contacts_unavailable(&mut self, error: StoreError) {
        self.seen.push(Seen::ContactsUnavailable(error));
    }

    fn alarm(&mut self, alarm: AlarmRequest) {
        self.seen.push(Seen::Alarm(alarm));
    }

    fn resolved(&mut self, record: &IncidentRecord) {
        self.seen.push(Seen::Resolved(record.status));
        if self.stop_after_resolved {
            self.controls.stop();
        }
    }

    fn incident_unsaved(&mut self, _error: &IncidentWriteError) {
        self.seen.push(Seen::Unsaved);
    }
}

struct FakeNotifier {
    reachable: bool,
    calls: Cell<u32>,
    last_location: Cell<bool>,
}

impl FakeNotifier {
    fn new(reachable: bool) -> Self {
        Self {
            reachable,
            calls: Cell::new(0),
            last_location: Cell::new(false),
        }
    }
}

impl Notifier for FakeNotifier {
    async fn dispatch(&self, contacts: &[Contact], event: &FallEvent) -> DispatchReport {
        self.calls.set(self.calls.get() + 1);
        self.last_location.set(event.location.is_some());
        let attempted = contacts.len() as u16;
        let reached = if self.reachable { attempted } else { 0 };
        DispatchReport {
            outcomes: Default::default(),
            attempted,
            reached,
            success: reached > 0,
        }
    }
}

/// Memory store whose contact list cannot be read.
struct UnreadableContacts(MemoryStore);

impl FallStore for UnreadableContacts {
    async fn add_contact(&mut self, contact: NewContact) -> Result<ContactId, StoreError> {
        self.0.add_contact(contact).await
    }

    async fn all_contacts(&mut self) -> Result<ContactList, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn append_incident(&mut self, record: &IncidentRecord) -> Result<IncidentId, StoreError> {
        self.0.append_incident(record).await
    }

    async fn all_incidents(&mut self) -> Result<IncidentList, StoreError> {
        self.0.all_incidents().await
    }

    async fn clear_incidents(&mut self) -> Result<(), StoreError> {
        self.0.clear_incidents().await
    }

    async fn load_settings(&mut self, key: &str) -> Result<Option<SettingsRecord>, StoreError> {
        self.0.load_settings(key).await
    }

    async fn save_settings(
        &mut self,
        key: &str,
        record: SettingsRecord,
    ) -> Result<(), StoreError> {
        self.0.save_settings(key, record).await
    }
}

fn tumbling(now_ms: u64) -> MotionReading {
    MotionReading {
        now_ms,
        acceleration: Acceleration {
            x: 6.0,
            y: 8.0,
            z: 0.0,
        },
        rotation: Some(RotationRate {
            alpha: 1.0,
            beta: -1.0,
            gamma: 1.5,
        }),
    }
}

fn fall_burst() -> [MotionReading; 3] {
    [tumbling(0), tumbling(50), tumbling(100)]
}

fn store_with_contacts(count: usize) -> MemoryStore {
    let mut store = MemoryStore::new();
    block_on(async {
        for index in 0..count {
            let relation = if index == 0 { "daughter" } else { "friend" };
            let contact = NewContact::new("Ada", "+15550100", relation).expect("fits");
            store.add_contact(contact).await.expect("room for contact");
        }
    });
    store
}

fn home() -> Coordinates {
    Coordinates {
        latitude: 52.52,
        longitude: 13.405,
        accuracy: 12.0,
    }
}

#[test]
fn timeout_escalates_and_records_emergency() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(2),
        FakeNotifier::new(true),
        TestClock::at(10_000),
        FixedLocation(home()),
        RecordingHooks::new(&controls, Script::Idle),
    );
    let mut source = ScriptedSource::new(fall_burst(), true);

    let exit = block_on(monitor.run(&mut source, &controls));
    assert_eq!(exit, MonitorExit::SourceClosed);
    assert_eq!(source.unsubscribes, 1);

    let hooks = monitor.hooks();
    assert_eq!(hooks.countdown.first(), Some(&30));
    assert_eq!(hooks.countdown.last(), Some(&0));
    assert!(hooks.countdown.windows(2).all(|pair| pair[0] > pair[1]));
    assert_eq!(
        hooks.seen,
        [
            Seen::Detected(100),
            Seen::Declined(UnsafeCause::TimedOut),
            Seen::Alarm(AlarmRequest {
                vibration_pattern_ms: Some(ALARM_VIBRATION_PATTERN_MS),
                sound: true,
            }),
            Seen::Resolved(ResolutionStatus::EmergencyNotified),
        ]
    );
    assert_eq!(monitor.notifier().calls.get(), 1);
    assert!(monitor.notifier().last_location.get());

    let history = block_on(monitor.incidents().history()).expect("history");
    assert_eq!(history.len(), 1);
    let record = &history[0].record;
    assert_eq!(record.status, ResolutionStatus::EmergencyNotified);
    assert_eq!(record.notification.attempted, 2);
    assert_eq!(record.notification.reached, 2);
    let location = record.event.location.as_ref().expect("location attached");
    assert!(location.map_link.starts_with("https://www.google.com/maps?q=52.520000,13.405000"));
}

#[test]
fn safe_decision_records_without_notifying() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(1),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::SafeAt(27)).stopping(),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    let exit = block_on(monitor.run(&mut source, &controls));
    assert_eq!(exit, MonitorExit::Stopped);
    assert_eq!(monitor.notifier().calls.get(), 0);
    assert_eq!(
        monitor.hooks().seen,
        [
            Seen::Detected(100),
            Seen::Safe,
            Seen::Resolved(ResolutionStatus::Safe),
        ]
    );
    assert_eq!(monitor.hooks().countdown, [30, 29, 28, 27]);

    let history = block_on(monitor.incidents().history()).expect("history");
    assert_eq!(history[0].record.status, ResolutionStatus::Safe);
    assert_eq!(history[0].record.notification.attempted, 0);
}

#[test]
fn help_request_escalates_before_deadline() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(1),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::HelpAt(28)).stopping(),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    assert_eq!(
        block_on(monitor.run(&mut source, &controls)),
        MonitorExit::Stopped
    );
    let seen = &monitor.hooks().seen;
    assert!(seen.contains(&Seen::Declined(UnsafeCause::HelpRequested)));
    assert_eq!(
        seen.last(),
        Some(&Seen::Resolved(ResolutionStatus::EmergencyNotified))
    );
    assert!(!monitor.notifier().last_location.get());
}

#[test]
fn unreachable_contacts_leave_incident_unresolved() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(2),
        FakeNotifier::new(false),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::HelpAt(30)).stopping(),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    let _ = block_on(monitor.run(&mut source, &controls));
    assert!(!monitor
        .hooks()
        .seen
        .iter()
        .any(|seen| matches!(seen, Seen::Alarm(_))));

    let history = block_on(monitor.incidents().history()).expect("history");
    let record = &history[0].record;
    assert_eq!(record.status, ResolutionStatus::Unresolved);
    assert_eq!(record.notification.attempted, 2);
    assert_eq!(record.notification.reached, 0);
}

#[test]
fn no_contacts_still_records_incident() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        MemoryStore::new(),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::HelpAt(30)).stopping(),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    let _ = block_on(monitor.run(&mut source, &controls));
    let history = block_on(monitor.incidents().history()).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].record.status, ResolutionStatus::Unresolved);
}

#[test]
fn unreadable_contacts_are_reported_and_nobody_is_notified() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        UnreadableContacts(store_with_contacts(2)),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::HelpAt(30)).stopping(),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    let _ = block_on(monitor.run(&mut source, &controls));
    assert_eq!(monitor.notifier().calls.get(), 0);
    assert_eq!(
        monitor.hooks().seen,
        [
            Seen::Detected(100),
            Seen::Declined(UnsafeCause::HelpRequested),
            Seen::ContactsUnavailable(StoreError::Unavailable),
            Seen::Resolved(ResolutionStatus::Unresolved),
        ]
    );

    let history = block_on(monitor.incidents().history()).expect("history");
    assert_eq!(history[0].record.status, ResolutionStatus::Unresolved);
    assert_eq!(history[0].record.notification.attempted, 0);
}

#[test]
fn stop_during_countdown_cancels_escalation() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(1),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::StopOnDetect),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    assert_eq!(
        block_on(monitor.run(&mut source, &controls)),
        MonitorExit::Stopped
    );
    assert_eq!(monitor.notifier().calls.get(), 0);
    assert_eq!(source.unsubscribes, 1);
    assert_eq!(
        monitor.detector().state_id(),
        crate::detector::ClassifierStateId::Debounced
    );

    let history = block_on(monitor.incidents().history()).expect("history");
    assert_eq!(history[0].record.status, ResolutionStatus::Unresolved);
}

#[test]
fn stale_decision_is_not_applied_to_next_gate() {
    let controls = MonitorControls::new();
    controls.mark_safe();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(1),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::Idle),
    );
    let mut source = ScriptedSource::new(fall_burst(), true);

    let _ = block_on(monitor.run(&mut source, &controls));
    assert!(monitor
        .hooks()
        .seen
        .contains(&Seen::Declined(UnsafeCause::TimedOut)));
}

#[test]
fn first_pending_decision_wins() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store_with_contacts(1),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::SafeThenHelpOnDetect).stopping(),
    );
    let mut source = ScriptedSource::new(fall_burst(), false);

    assert_eq!(
        block_on(monitor.run(&mut source, &controls)),
        MonitorExit::Stopped
    );
    assert_eq!(monitor.notifier().calls.get(), 0);
    assert_eq!(
        monitor.hooks().seen,
        [
            Seen::Detected(100),
            Seen::Safe,
            Seen::Resolved(ResolutionStatus::Safe),
        ]
    );
}

#[test]
fn unsupported_sensor_disables_detection() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        MemoryStore::new(),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        RecordingHooks::new(&controls, Script::Idle),
    );
    let mut source = ScriptedSource::unsupported();

    assert_eq!(
        block_on(monitor.run(&mut source, &controls)),
        MonitorExit::Unsupported(SensorError::Unsupported)
    );
    assert!(!source.subscribed);
    assert_eq!(
        monitor.hooks().seen,
        [Seen::Unsupported(SensorError::Unsupported)]
    );
}

#[test]
fn queued_update_recalibrates_between_readings() {
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        MemoryStore::new(),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        NoopHooks,
    );
    controls
        .set_thresholds(ThresholdUpdate {
            strategy: Some(StrategyKind::ThresholdDelta),
            ..ThresholdUpdate::default()
        })
        .expect("queue has room");
    controls
        .set_thresholds(ThresholdUpdate {
            fall_window_ms: Some(0),
            ..ThresholdUpdate::default()
        })
        .expect("queue has room");
    let mut source = ScriptedSource::new([], true);

    assert_eq!(
        block_on(monitor.run(&mut source, &controls)),
        MonitorExit::SourceClosed
    );
    assert_eq!(
        monitor.config().detector.strategy,
        StrategyKind::ThresholdDelta
    );
    assert_eq!(
        monitor.detector().config().strategy,
        StrategyKind::ThresholdDelta
    );
    assert_eq!(
        monitor.config().detector.sampler.fall_window_ms,
        active_config().detector.sampler.fall_window_ms
    );
}

#[test]
fn stored_sensitivity_sets_threshold_on_start() {
    let mut store = MemoryStore::new();
    let settings = Settings {
        fall_sensitivity: 80,
        enable_vibration: false,
        enable_sound: true,
    };
    block_on(store.save_settings(SETTINGS_KEY, settings.record_bytes())).expect("saved");

    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        *active_config(),
        store,
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        NoopHooks,
    );
    let _ = block_on(monitor.run(&mut ScriptedSource::new([], true), &controls));

    assert_eq!(monitor.settings(), &settings);
    let threshold = monitor
        .config()
        .detector
        .threshold_delta
        .acceleration_threshold;
    assert!((threshold - 1.0).abs() < 1e-6);
}

#[test]
fn configured_threshold_stands_without_stored_settings() {
    let mut config = *active_config();
    config.detector.threshold_delta.acceleration_threshold = 4.0;
    let controls = MonitorControls::new();
    let mut monitor = FallMonitor::new(
        config,
        MemoryStore::new(),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        NoopHooks,
    );
    let _ = block_on(monitor.run(&mut ScriptedSource::new([], true), &controls));

    assert_eq!(monitor.settings(), &Settings::default());
    let threshold = monitor.detector().config().threshold_delta.acceleration_threshold;
    assert!((threshold - 4.0).abs() < 1e-6);
    assert!(
        (monitor.config().detector.threshold_delta.acceleration_threshold - 4.0).abs() < 1e-6
    );
}

#[test]
fn update_settings_persists_and_recalibrates() {
    let mut monitor = FallMonitor::new(
        *active_config(),
        MemoryStore::new(),
        FakeNotifier::new(true),
        TestClock::at(0),
        NoLocation,
        NoopHooks,
    );
    let settings = Settings {
        fall_sensitivity: 20,
        ..Settings::default()
    };
    block_on(monitor.update_settings(settings)).expect("saved");

    let threshold = monitor.detector().config().threshold_delta.acceleration_threshold;
    assert!((threshold - 4.0).abs() < 1e-6);
    assert_eq!(block_on(monitor.incidents().load_settings()), settings);
}

#[test]
fn alarm_follows_user_settings() {
    let quiet = Settings {
        enable_vibration: false,
        enable_sound: false,
        ..Settings::default()
    };
    assert_eq!(AlarmRequest::from_settings(&quiet), None);

    let sound_only = Settings {
        enable_vibration: false,
        ..Settings::default()
    };
    assert_eq!(
        AlarmRequest::from_settings(&sound_only),
        Some(AlarmRequest {
            vibration_pattern_ms: None,
            sound: true,
        })
    );
}

#[test]
fn channel_source_requires_subscription() {
    let readings: Channel<NoopRawMutex, MotionReading, 4> = Channel::new();
    let mut source = ChannelMotionSource::new(readings.receiver(), true);

    readings.try_send(tumbling(0)).expect("room");
    assert_eq!(block_on(source.next_reading()), None);

    source.subscribe().expect("supported");
    assert!(source.is_subscribed());
    assert_eq!(block_on(source.next_reading()), Some(tumbling(0)));

    readings.try_send(tumbling(50)).expect("room");
    source.unsubscribe();
    assert!(!source.is_subscribed());
    assert!(readings.try_receive().is_err());
}

#[test]
fn channel_source_reports_unsupported() {
    let readings: Channel<NoopRawMutex, MotionReading, 4> = Channel::new();
    let mut source = ChannelMotionSource::new(readings.receiver(), false);
    assert!(!source.is_supported());
    assert_eq!(source.subscribe(), Err(SensorError::Unsupported));
}

#[test]
fn map_link_uses_six_decimals() {
    let link = google_maps_link(&home());
    assert_eq!(link.as_str(), "https://www.google.com/maps?q=52.520000,13.405000");
}
