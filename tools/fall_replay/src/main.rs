use std::{
    cell::Cell,
    collections::VecDeque,
    env,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    process,
};

use embassy_futures::{block_on, yield_now};

use fallwatch::config::StrategyKind;
use fallwatch::confirm::{GateSnapshot, UnsafeCause};
use fallwatch::detector::{Acceleration, FallDetection, FallEvent, RotationRate};
use fallwatch::incident::{IncidentWriteError, NewContact};
use fallwatch::notify::{Permission, SimulatedEmailChannel, SimulatedSmsChannel, SystemAlertChannel};
use fallwatch::runtime::{
    AlarmRequest, CountdownClock, MonitorHooks, MotionSource, NoLocation, SensorError,
};
use fallwatch::{
    active_config, FallDetector, FallMonitor, IncidentLog, IncidentRecord, MemoryStore,
    MonitorControls, MotionReading, NotificationDispatcher, ThresholdUpdate,
};

const DECISION_DELAY_MS: u64 = 1_000;

#[derive(Clone, Copy)]
enum Respond {
    Safe,
    Help,
    Timeout,
}

/// Replay time follows the trace outside a confirmation window and the
/// countdown ticks inside one.
struct ReplayClock<'a> {
    now_ms: &'a Cell<u64>,
    period_ms: u64,
}

impl CountdownClock for ReplayClock<'_> {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn start(&mut self, period_ms: u64) {
        self.period_ms = period_ms;
    }

    async fn next_tick(&mut self) {
        yield_now().await;
        self.now_ms.set(self.now_ms.get() + self.period_ms);
    }
}

struct ReplaySource<'a> {
    readings: VecDeque<MotionReading>,
    now_ms: &'a Cell<u64>,
    gate_open: &'a Cell<bool>,
}

impl MotionSource for ReplaySource<'_> {
    fn is_supported(&self) -> bool {
        true
    }

    fn subscribe(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn unsubscribe(&mut self) {}

    async fn next_reading(&mut self) -> Option<MotionReading> {
        loop {
            let next = *self.readings.front()?;
            if self.gate_open.get() && self.now_ms.get() < next.now_ms {
                yield_now().await;
                continue;
            }
            self.readings.pop_front();
            self.now_ms.set(self.now_ms.get().max(next.now_ms));
            return Some(next);
        }
    }
}

struct ReplayHooks<'a> {
    controls: &'a MonitorControls,
    gate_open: &'a Cell<bool>,
    respond: Respond,
}

impl MonitorHooks for ReplayHooks<'_> {
    fn fall_detected(&mut self, detection: &FallDetection) {
        self.gate_open.set(true);
        println!(
            "detection,{},{},{},{:.2}",
            detection.event.timestamp_ms,
            detection.method.label(),
            detection.confidence,
            detection.event.acceleration_magnitude
        );
    }

    fn countdown(&mut self, snapshot: &GateSnapshot) {
        let timeout_ms = snapshot.deadline_ms - snapshot.opened_at_ms;
        let elapsed_ms = timeout_ms.saturating_sub(snapshot.remaining_ms);
        if elapsed_ms < DECISION_DELAY_MS {
            return;
        }
        match self.respond {
            Respond::Safe => self.controls.mark_safe(),
            Respond::Help => self.controls.request_help(),
            Respond::Timeout => {}
        }
    }

    fn confirmed_safe(&mut self, detection: &FallDetection) {
        println!("confirmed_safe,{}", detection.event.timestamp_ms);
    }

    fn declined(&mut self, event: &FallEvent, cause: UnsafeCause) {
        let cause = match cause {
            UnsafeCause::HelpRequested => "help_requested",
            UnsafeCause::TimedOut => "timed_out",
        };
        println!("declined,{},{}", event.timestamp_ms, cause);
    }

    fn alarm(&mut self, alarm: AlarmRequest) {
        println!(
            "alarm,vibrate={},sound={}",
            alarm.vibration_pattern_ms.is_some(),
            alarm.sound
        );
    }

    fn resolved(&mut self, record: &IncidentRecord) {
        self.gate_open.set(false);
        println!(
            "resolution,{},{},{}/{}",
            record.event.timestamp_ms,
            record.status.label(),
            record.notification.reached,
            record.notification.attempted
        );
    }

    fn incident_unsaved(&mut self, error: &IncidentWriteError) {
        eprintln!("warning: {error}");
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let mut trace_path: Option<PathBuf> = None;
    let mut respond = Respond::Safe;
    let mut strategy: Option<StrategyKind> = None;
    let mut expected: Option<usize> = None;
    let mut trace_only = false;

    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--respond" => {
                idx += 1;
                respond = match args.get(idx).map(String::as_str) {
                    Some("safe") => Respond::Safe,
                    Some("help") => Respond::Help,
                    Some("timeout") => Respond::Timeout,
                    Some(other) => return Err(format!("unknown response: {other}")),
                    None => return Err("missing value after --respond".into()),
                };
            }
            "--strategy" => {
                idx += 1;
                strategy = match args.get(idx).map(String::as_str) {
                    Some("threshold_delta") => Some(StrategyKind::ThresholdDelta),
                    Some("windowed") => Some(StrategyKind::Windowed),
                    Some(other) => return Err(format!("unknown strategy: {other}")),
                    None => return Err("missing value after --strategy".into()),
                };
            }
            "--expect" => {
                idx += 1;
                let Some(raw) = args.get(idx) else {
                    return Err("missing count after --expect".into());
                };
                let count = raw
                    .parse::<usize>()
                    .map_err(|e| format!("invalid --expect '{raw}': {e}"))?;
                expected = Some(count);
            }
            "--trace" => trace_only = true,
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown argument: {value}"));
            }
            value => {
                if trace_path.is_some() {
                    return Err("multiple trace paths provided".into());
                }
                trace_path = Some(PathBuf::from(value));
            }
        }
        idx += 1;
    }

    let trace_path = trace_path.ok_or_else(usage)?;
    let readings = parse_trace(&trace_path)?;

    let detections = if trace_only {
        replay_detector(&readings, strategy)?
    } else {
        replay_pipeline(readings, strategy, respond)?
    };

    if let Some(expected) = expected {
        if detections != expected {
            eprintln!("expected detections: {expected}");
            eprintln!("actual detections:   {detections}");
            return Err("detection count mismatch".into());
        }
    }

    Ok(())
}

fn replay_detector(
    readings: &[MotionReading],
    strategy: Option<StrategyKind>,
) -> Result<usize, String> {
    let mut config = active_config().detector;
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }
    let mut detector = FallDetector::new(config);
    let mut detections = 0usize;

    println!("sample,ms,state,reject,window,high_acc,high_rot,delta,total_acc,rot_vel");
    for reading in readings {
        let output = detector.tick(*reading);
        let trace = output.trace;
        println!(
            "sample,{},{:?},{:?},{},{},{},{:.3},{:.3},{:.3}",
            trace.now_ms,
            trace.state_id,
            trace.reject_reason,
            trace.window_len,
            trace.high_acceleration_count,
            trace.high_rotation_count,
            trace.delta,
            trace.total_acceleration,
            trace.rotational_velocity
        );
        if let Some(detection) = output.detection {
            detections += 1;
            println!(
                "detection,{},{},{}",
                detection.event.timestamp_ms,
                detection.method.label(),
                detection.confidence
            );
        }
    }
    Ok(detections)
}

fn replay_pipeline(
    readings: Vec<MotionReading>,
    strategy: Option<StrategyKind>,
    respond: Respond,
) -> Result<usize, String> {
    let now_ms = Cell::new(readings.first().map_or(0, |r| r.now_ms));
    let gate_open = Cell::new(false);
    let controls = MonitorControls::new();

    let mut seeded = IncidentLog::new(MemoryStore::new());
    let contact = NewContact::new("Replay Contact", "+15550100", "self")
        .map_err(|e| format!("contact: {e}"))?;
    block_on(seeded.add_contact(contact)).map_err(|e| format!("contact: {e}"))?;

    let dispatcher = NotificationDispatcher::new(
        SystemAlertChannel::new(Permission::Granted),
        SimulatedEmailChannel::new(true),
        SimulatedSmsChannel::new(true),
    );
    let mut monitor = FallMonitor::new(
        *active_config(),
        seeded.into_store(),
        dispatcher,
        ReplayClock {
            now_ms: &now_ms,
            period_ms: 0,
        },
        NoLocation,
        ReplayHooks {
            controls: &controls,
            gate_open: &gate_open,
            respond,
        },
    );
    if let Some(strategy) = strategy {
        let update = ThresholdUpdate {
            strategy: Some(strategy),
            ..ThresholdUpdate::default()
        };
        controls
            .set_thresholds(update)
            .map_err(|_| "calibration queue full".to_string())?;
    }

    let mut source = ReplaySource {
        readings: readings.into(),
        now_ms: &now_ms,
        gate_open: &gate_open,
    };
    let exit = block_on(monitor.run(&mut source, &controls));
    println!("exit,{exit:?}");

    let history = block_on(monitor.incidents().history()).map_err(|e| format!("history: {e}"))?;
    println!("incident,id,ms,status,method,confidence,attempted,reached");
    for stored in history.iter().rev() {
        let record = &stored.record;
        println!(
            "incident,{},{},{},{},{},{},{}",
            stored.id.0,
            record.event.timestamp_ms,
            record.status.label(),
            record.method.label(),
            record.confidence,
            record.notification.attempted,
            record.notification.reached
        );
    }
    Ok(history.len())
}

fn usage() -> String {
    "usage: fall_replay <trace.csv> [--respond safe|help|timeout] \
     [--strategy threshold_delta|windowed] [--trace] [--expect N]"
        .to_string()
}

fn parse_trace(path: &Path) -> Result<Vec<MotionReading>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out: Vec<MotionReading> = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("ms,") {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').collect();
        if parts.len() != 4 && parts.len() != 7 {
            return Err(format!(
                "{}:{} invalid trace line, expected 4 or 7 columns",
                path.display(),
                line_no
            ));
        }

        let now_ms = parts[0].trim().parse::<u64>().map_err(|e| {
            format!("{}:{} invalid ms '{}': {e}", path.display(), line_no, parts[0].trim())
        })?;
        let acceleration = Acceleration {
            x: parse_f32(parts[1], path, line_no, "ax")?,
            y: parse_f32(parts[2], path, line_no, "ay")?,
            z: parse_f32(parts[3], path, line_no, "az")?,
        };
        let rotation = if parts.len() == 7 {
            Some(RotationRate {
                alpha: parse_f32(parts[4], path, line_no, "alpha")?,
                beta: parse_f32(parts[5], path, line_no, "beta")?,
                gamma: parse_f32(parts[6], path, line_no, "gamma")?,
            })
        } else {
            None
        };

        out.push(MotionReading {
            now_ms,
            acceleration,
            rotation,
        });
    }

    Ok(out)
}

fn parse_f32(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<f32, String> {
    raw.trim().parse::<f32>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}
