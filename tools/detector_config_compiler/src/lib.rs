use std::{fmt, fs, path::Path};

use serde::Deserialize;

#[derive(Debug)]
pub enum ConfigCompilerError {
    Io(String),
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigCompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "io error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigCompilerError {}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorFile {
    pub sampler: SamplerSection,
    pub threshold_delta: ThresholdDeltaSection,
    pub windowed: WindowedSection,
    pub classifier: ClassifierSection,
    pub confirmation: ConfirmationSection,
    pub notify: NotifySection,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    pub fall_window_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdDeltaSection {
    pub acceleration_threshold: f32,
    pub inactivity_threshold_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowedSection {
    pub acceleration_threshold: f32,
    pub rotation_threshold: f32,
    pub high_acceleration_min: u8,
    pub high_rotation_min: u8,
    pub weights: WindowedWeightsSection,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowedWeightsSection {
    pub acceleration_weight: u16,
    pub rotation_weight: u16,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    ThresholdDelta,
    Windowed,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierSection {
    pub strategy: StrategyName,
    pub debounce_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmationSection {
    pub timeout_ms: u64,
    pub tick_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    pub channel_timeout_ms: u64,
    pub system_alert_enabled: bool,
    pub email_enabled: bool,
    pub sms_enabled: bool,
}

pub fn parse_monitor_file(path: &Path) -> Result<MonitorFile, ConfigCompilerError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ConfigCompilerError::Io(format!("{}: {e}", path.display())))?;
    parse_monitor_str(&raw)
}

pub fn parse_monitor_str(raw: &str) -> Result<MonitorFile, ConfigCompilerError> {
    toml::from_str(raw).map_err(|e| ConfigCompilerError::Parse(e.to_string()))
}

fn threshold_ok(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

pub fn validate_config(config: &MonitorFile) -> Result<(), ConfigCompilerError> {
    let fail = |msg: &str| Err(ConfigCompilerError::Validation(msg.to_string()));

    if config.sampler.fall_window_ms == 0 {
        return fail("sampler.fall_window_ms must be > 0");
    }
    if !threshold_ok(config.threshold_delta.acceleration_threshold) {
        return fail("threshold_delta.acceleration_threshold must be finite and >= 0");
    }
    if config.threshold_delta.inactivity_threshold_ms == 0 {
        return fail("threshold_delta.inactivity_threshold_ms must be > 0");
    }
    if !threshold_ok(config.windowed.acceleration_threshold)
        || !threshold_ok(config.windowed.rotation_threshold)
    {
        return fail("windowed thresholds must be finite and >= 0");
    }
    if config.windowed.high_acceleration_min == 0 || config.windowed.high_rotation_min == 0 {
        return fail("windowed minimum counts must be >= 1");
    }
    if config.windowed.weights.acceleration_weight == 0
        && config.windowed.weights.rotation_weight == 0
    {
        return fail("windowed.weights must contain at least one non-zero weight");
    }
    if config.classifier.debounce_ms == 0 {
        return fail("classifier.debounce_ms must be > 0");
    }
    if config.confirmation.tick_ms == 0 {
        return fail("confirmation.tick_ms must be > 0");
    }
    if config.confirmation.timeout_ms < config.confirmation.tick_ms {
        return fail("confirmation.timeout_ms must be >= confirmation.tick_ms");
    }
    if config.notify.channel_timeout_ms == 0 {
        return fail("notify.channel_timeout_ms must be > 0");
    }
    if !(config.notify.system_alert_enabled || config.notify.email_enabled || config.notify.sms_enabled)
    {
        return fail("notify must enable at least one channel");
    }
    Ok(())
}

fn strategy_path(strategy: StrategyName) -> &'static str {
    match strategy {
        StrategyName::ThresholdDelta => "StrategyKind::ThresholdDelta",
        StrategyName::Windowed => "StrategyKind::Windowed",
    }
}

pub fn render_generated_config(config: &MonitorFile) -> String {
    let mut out = String::new();
    out.push_str("// @generated by detector_config_compiler. Do not edit.\n");
    out.push_str("pub const MONITOR_CONFIG: MonitorConfig = MonitorConfig {\n");
    out.push_str("    detector: DetectorConfig {\n");
    out.push_str(&format!(
        "        sampler: SamplerConfig {{ fall_window_ms: {} }},\n",
        config.sampler.fall_window_ms
    ));
    out.push_str("        threshold_delta: ThresholdDeltaConfig {\n");
    out.push_str(&format!(
        "            acceleration_threshold: {:?},\n",
        config.threshold_delta.acceleration_threshold
    ));
    out.push_str(&format!(
        "            inactivity_threshold_ms: {},\n",
        config.threshold_delta.inactivity_threshold_ms
    ));
    out.push_str("        },\n");
    out.push_str("        windowed: WindowedConfig {\n");
    out.push_str(&format!(
        "            acceleration_threshold: {:?},\n",
        config.windowed.acceleration_threshold
    ));
    out.push_str(&format!(
        "            rotation_threshold: {:?},\n",
        config.windowed.rotation_threshold
    ));
    out.push_str(&format!(
        "            high_acceleration_min: {},\n",
        config.windowed.high_acceleration_min
    ));
    out.push_str(&format!(
        "            high_rotation_min: {},\n",
        config.windowed.high_rotation_min
    ));
    out.push_str("            weights: WindowedWeightConfig {\n");
    out.push_str(&format!(
        "                acceleration_weight: {},\n",
        config.windowed.weights.acceleration_weight
    ));
    out.push_str(&format!(
        "                rotation_weight: {},\n",
        config.windowed.weights.rotation_weight
    ));
    out.push_str("            },\n");
    out.push_str("        },\n");
    out.push_str(&format!(
        "        strategy: {},\n",
        strategy_path(config.classifier.strategy)
    ));
    out.push_str(&format!(
        "        debounce_ms: {},\n",
        config.classifier.debounce_ms
    ));
    out.push_str("    },\n");
    out.push_str(&format!(
        "    confirmation: ConfirmationConfig {{ timeout_ms: {}, tick_ms: {} }},\n",
        config.confirmation.timeout_ms, config.confirmation.tick_ms
    ));
    out.push_str("    notify: NotifyConfig {\n");
    out.push_str(&format!(
        "        channel_timeout_ms: {},\n",
        config.notify.channel_timeout_ms
    ));
    out.push_str(&format!(
        "        system_alert_enabled: {},\n",
        config.notify.system_alert_enabled
    ));
    out.push_str(&format!(
        "        email_enabled: {},\n",
        config.notify.email_enabled
    ));
    out.push_str(&format!("        sms_enabled: {},\n", config.notify.sms_enabled));
    out.push_str("    },\n");
    out.push_str("};\n");
    out
}

pub fn generate_from_path(path: &Path) -> Result<String, ConfigCompilerError> {
    let config = parse_monitor_file(path)?;
    validate_config(&config)?;
    Ok(render_generated_config(&config))
}
