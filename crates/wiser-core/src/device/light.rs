use serde_json::{Value, json};

use wiser_api::{Family, LightRecord};

use super::{DeviceIdentity, WiserDevice};
use crate::cell::StateCell;
use crate::command::Command;

const STATE_ON: &str = "On";
const STATE_OFF: &str = "Off";

/// A light channel (dimmable or on/off).
#[derive(Debug)]
pub struct Light {
    identity: DeviceIdentity,
    pub is_dimmable: bool,
    pub current_state: StateCell<Option<String>>,
    pub current_percentage: StateCell<Option<f64>>,
    pub current_level: StateCell<Option<f64>>,
    pub target_state: StateCell<String>,
    pub target_percentage: StateCell<f64>,
}

impl Light {
    /// `true` when the hub reports the light as on.
    pub fn is_on(&self) -> bool {
        self.current_state.get().as_deref() == Some(STATE_ON)
    }

    /// Current brightness, 0 when the hub did not report one.
    pub fn brightness(&self) -> f64 {
        self.current_percentage.get().unwrap_or(0.0)
    }

    fn apply(&self, record: &LightRecord) {
        self.current_state.push(record.current_state.clone());
        self.current_percentage.push(record.current_percentage);
        self.current_level.push(record.current_level);
        self.target_state.push(record.target_state.clone());
        self.target_percentage.push(record.target_percentage);
    }
}

impl WiserDevice for Light {
    type Record = LightRecord;

    fn from_record(record: &LightRecord) -> Self {
        let light = Self {
            identity: DeviceIdentity::from(&record.base),
            is_dimmable: record.is_dimmable,
            current_state: StateCell::new(None),
            current_percentage: StateCell::new(None),
            current_level: StateCell::new(None),
            target_state: StateCell::new(STATE_OFF.to_owned()),
            target_percentage: StateCell::new(0.0),
        };
        light.apply(record);
        light
    }

    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn update(&self, record: &LightRecord) -> bool {
        if record.base.device_id != self.identity.device_id {
            return false;
        }
        self.apply(record);
        true
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// Override requests understood by lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    Power(bool),
    /// Switch on at the given percentage (0-100).
    Brightness(u8),
}

impl LightCommand {
    pub fn body(self) -> Value {
        match self {
            Self::Power(on) => json!({ "State": if on { STATE_ON } else { STATE_OFF } }),
            Self::Brightness(percentage) => json!({ "State": STATE_ON, "Percentage": percentage }),
        }
    }

    /// Override command for light `id`.
    pub fn into_command(self, id: u64) -> Command {
        Command::override_state(LightRecord::TAG, id, self.body())
    }
}
