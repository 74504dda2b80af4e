use super::*;

#[test]
fn compiled_defaults_match_documented_values() {
    let config = active_config();
    assert_eq!(config.detector.sampler.fall_window_ms, 500);
    assert_eq!(config.detector.threshold_delta.acceleration_threshold, 2.5);
    assert_eq!(config.detector.threshold_delta.inactivity_threshold_ms, 1_000);
    assert_eq!(config.detector.windowed.acceleration_threshold, 3.5);
    assert_eq!(config.detector.windowed.rotation_threshold, 2.0);
    assert_eq!(config.detector.strategy, StrategyKind::Windowed);
    assert_eq!(config.detector.debounce_ms, 5_000);
    assert_eq!(config.confirmation.timeout_ms, 30_000);
    assert_eq!(config.confirmation.tick_ms, 1_000);
    assert!(config.validate().is_ok());
}

#[test]
fn update_applies_only_set_fields() {
    let mut config = MonitorConfig::default();
    let update = ThresholdUpdate {
        acceleration_threshold: Some(3.0),
        debounce_ms: Some(2_000),
        ..ThresholdUpdate::default()
    };
    update.apply(&mut config).expect("update should validate");

    assert_eq!(config.detector.threshold_delta.acceleration_threshold, 3.0);
    assert_eq!(config.detector.debounce_ms, 2_000);
    assert_eq!(config.detector.windowed, active_config().detector.windowed);
    assert_eq!(config.confirmation, active_config().confirmation);
}

#[test]
fn rejected_update_leaves_config_untouched() {
    let mut config = MonitorConfig::default();
    let update = ThresholdUpdate {
        acceleration_threshold: Some(1.0),
        rotation_threshold: Some(f32::NAN),
        ..ThresholdUpdate::default()
    };
    let err = update.apply(&mut config).expect_err("NaN must be rejected");

    assert_eq!(err, ConfigError::NegativeOrNonFinite("rotation_threshold"));
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn timeout_below_tick_is_rejected() {
    let update = ThresholdUpdate {
        confirmation_timeout_ms: Some(500),
        ..ThresholdUpdate::default()
    };
    assert_eq!(
        update.applied_to(active_config()),
        Err(ConfigError::TimeoutBelowTick)
    );
}

#[test]
fn zero_window_is_rejected() {
    let update = ThresholdUpdate {
        fall_window_ms: Some(0),
        ..ThresholdUpdate::default()
    };
    assert_eq!(
        update.applied_to(active_config()),
        Err(ConfigError::ZeroDuration("fall_window_ms"))
    );
}

#[test]
fn all_channels_disabled_is_rejected() {
    let mut config = MonitorConfig::default();
    config.notify.system_alert_enabled = false;
    config.notify.email_enabled = false;
    config.notify.sms_enabled = false;
    assert_eq!(config.validate(), Err(ConfigError::NoChannels));
}

#[test]
fn sensitivity_maps_linearly_and_clamps() {
    assert_eq!(sensitivity_to_threshold(0), 5.0);
    assert_eq!(sensitivity_to_threshold(DEFAULT_FALL_SENSITIVITY), 2.5);
    assert_eq!(sensitivity_to_threshold(100), 0.0);
    assert_eq!(sensitivity_to_threshold(255), 0.0);

    let update = ThresholdUpdate::from_sensitivity(80);
    assert_eq!(update.acceleration_threshold, Some(1.0));
    assert!(!update.is_empty());
    assert!(ThresholdUpdate::default().is_empty());
}
