use crate::config::{
    sensitivity_to_threshold, ThresholdUpdate, DEFAULT_FALL_SENSITIVITY, MAX_FALL_SENSITIVITY,
};

pub const SETTINGS_KEY: &str = "appSettings";
pub const SETTINGS_RECORD_LEN: usize = 8;

const SETTINGS_MAGIC: u32 = 0x5354_5746;
const SETTINGS_VERSION: u8 = 1;
const FLAG_VIBRATION: u8 = 0x01;
const FLAG_SOUND: u8 = 0x02;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settings {
    pub fall_sensitivity: u8,
    pub enable_vibration: bool,
    pub enable_sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fall_sensitivity: DEFAULT_FALL_SENSITIVITY,
            enable_vibration: true,
            enable_sound: true,
        }
    }
}

impl Settings {
    pub fn acceleration_threshold(&self) -> f32 {
        sensitivity_to_threshold(self.fall_sensitivity)
    }

    pub fn threshold_update(&self) -> ThresholdUpdate {
        ThresholdUpdate::from_sensitivity(self.fall_sensitivity)
    }

    pub fn record_bytes(self) -> [u8; SETTINGS_RECORD_LEN] {
        let mut record = [0xFFu8; SETTINGS_RECORD_LEN];
        record[0..4].copy_from_slice(&SETTINGS_MAGIC.to_le_bytes());
        record[4] = SETTINGS_VERSION;
        record[5] = self.fall_sensitivity.min(MAX_FALL_SENSITIVITY);
        let mut flags = 0u8;
        if self.enable_vibration {
            flags |= FLAG_VIBRATION;
        }
        if self.enable_sound {
            flags |= FLAG_SOUND;
        }
        record[6] = flags;
        record[SETTINGS_RECORD_LEN - 1] = checksum8(&record[..SETTINGS_RECORD_LEN - 1]);
        record
    }

    pub fn from_record(record: &[u8; SETTINGS_RECORD_LEN]) -> Option<Self> {
        if record.iter().all(|&byte| byte == 0xFF) {
            return None;
        }
        if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != SETTINGS_MAGIC {
            return None;
        }
        if record[4] != SETTINGS_VERSION {
            return None;
        }
        if checksum8(&record[..SETTINGS_RECORD_LEN - 1]) != record[SETTINGS_RECORD_LEN - 1] {
            return None;
        }
        if record[5] > MAX_FALL_SENSITIVITY {
            return None;
        }
        Some(Self {
            fall_sensitivity: record[5],
            enable_vibration: record[6] & FLAG_VIBRATION != 0,
            enable_sound: record[6] & FLAG_SOUND != 0,
        })
    }
}

fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}
