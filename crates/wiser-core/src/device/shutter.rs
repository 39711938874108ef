use serde_json::{Value, json};
use strum::Display;

use wiser_api::{Family, ShutterRecord};

use super::{DeviceIdentity, WiserDevice};
use crate::cell::StateCell;
use crate::command::Command;

const FULLY_OPEN: f64 = 100.0;
const STOPPED: &str = "Stopped";

/// Direction of travel derived from the hub's `LiftMovement` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum LiftMotion {
    Increasing,
    Decreasing,
    #[default]
    Stopped,
}

impl LiftMotion {
    /// `Opening` and `Closing` map to a direction, anything else is stopped.
    pub fn from_movement(movement: &str) -> Self {
        match movement {
            "Opening" => Self::Increasing,
            "Closing" => Self::Decreasing,
            _ => Self::Stopped,
        }
    }
}

/// A window covering.
#[derive(Debug)]
pub struct Shutter {
    identity: DeviceIdentity,
    pub current_lift: StateCell<f64>,
    pub target_lift: StateCell<f64>,
    pub lift_movement: StateCell<String>,
    /// Follows `lift_movement`.
    pub motion: StateCell<LiftMotion>,
}

impl Shutter {
    fn apply(&self, record: &ShutterRecord) {
        self.current_lift.push(record.current_lift);
        self.target_lift.push(record.target_lift);
        self.lift_movement.push(record.lift_movement.clone());
        self.motion.push(LiftMotion::from_movement(&record.lift_movement));
    }
}

impl WiserDevice for Shutter {
    type Record = ShutterRecord;

    fn from_record(record: &ShutterRecord) -> Self {
        let shutter = Self {
            identity: DeviceIdentity::from(&record.base),
            current_lift: StateCell::new(FULLY_OPEN),
            target_lift: StateCell::new(FULLY_OPEN),
            lift_movement: StateCell::new(STOPPED.to_owned()),
            motion: StateCell::default(),
        };
        shutter.apply(record);
        shutter
    }

    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn update(&self, record: &ShutterRecord) -> bool {
        if record.base.device_id != self.identity.device_id {
            return false;
        }
        self.apply(record);
        true
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// Action requests understood by shutters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterCommand {
    /// Move to the given lift percentage (0-100).
    LiftTo(u8),
}

impl ShutterCommand {
    pub fn body(self) -> Value {
        match self {
            Self::LiftTo(percentage) => json!({ "Action": "LiftTo", "Percentage": percentage }),
        }
    }

    /// Action command for shutter `id`.
    pub fn into_command(self, id: u64) -> Command {
        Command::action(ShutterRecord::TAG, id, self.body())
    }
}
