// Hub domain API wire types
//
// Shapes of the records found in `GET /data/v2/domain/`. Field names on
// the wire are PascalCase except for the lowercase `id`. Every type here
// is only constructed after its JSON passed the checks in `validate`, so
// deserialization itself never has to be lenient.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

use crate::error::Error;
use crate::validate::{FieldKind, Fields, ValidationError, normalize_whole_numbers};

// ── Generic device metadata ──────────────────────────────────────────

/// Hardware-level metadata from the `Device` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceRecord {
    #[serde(rename = "id")]
    pub id: u64,
    pub node_id: u64,
    pub product_type: String,
    pub product_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub active_firmware_version: String,
    pub model_identifier: String,
}

impl DeviceRecord {
    pub const KIND: &'static str = "Device";

    pub fn validate(json: &Value) -> Result<(), ValidationError> {
        let fields = Fields::of(Self::KIND, json)?;
        fields.require_all(&["id", "NodeId"], FieldKind::Integer)?;
        fields.require_all(
            &[
                "ProductType",
                "ProductIdentifier",
                "ActiveFirmwareVersion",
                "ModelIdentifier",
            ],
            FieldKind::String,
        )?;
        fields.optional("SerialNumber", FieldKind::String)?;
        Ok(())
    }

    pub fn from_json(json: Value) -> Result<Self, Error> {
        Self::validate(&json)?;
        construct(json)
    }
}

// ── Family records ───────────────────────────────────────────────────

/// Fields shared by every device family record.
///
/// `device_id` links the record to a [`DeviceRecord::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WiserDeviceBase {
    #[serde(rename = "id")]
    pub id: u64,
    pub device_id: u64,
    pub endpoint: u64,
    pub name: String,
}

impl WiserDeviceBase {
    pub(crate) fn validate(fields: &Fields<'_>) -> Result<(), ValidationError> {
        fields.require_all(&["id", "DeviceId", "Endpoint"], FieldKind::Integer)?;
        fields.require("Name", FieldKind::String)?;
        Ok(())
    }
}

/// A light channel from the `Light` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LightRecord {
    #[serde(flatten)]
    pub base: WiserDeviceBase,
    pub is_dimmable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<f64>,
    pub target_state: String,
    pub target_percentage: f64,
}

/// A window covering from the `Shutter` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShutterRecord {
    #[serde(flatten)]
    pub base: WiserDeviceBase,
    pub current_lift: f64,
    pub target_lift: f64,
    pub lift_movement: String,
}

/// Any family record, as produced by the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WiserRecord {
    Light(LightRecord),
    Shutter(ShutterRecord),
}

impl WiserRecord {
    /// Family tag of this record (`"Light"`, `"Shutter"`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Light(_) => "Light",
            Self::Shutter(_) => "Shutter",
        }
    }

    pub fn base(&self) -> &WiserDeviceBase {
        match self {
            Self::Light(l) => &l.base,
            Self::Shutter(s) => &s.base,
        }
    }

    pub fn id(&self) -> u64 {
        self.base().id
    }

    pub fn device_id(&self) -> u64 {
        self.base().device_id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn as_light(&self) -> Option<&LightRecord> {
        match self {
            Self::Light(l) => Some(l),
            Self::Shutter(_) => None,
        }
    }

    pub fn as_shutter(&self) -> Option<&ShutterRecord> {
        match self {
            Self::Shutter(s) => Some(s),
            Self::Light(_) => None,
        }
    }
}

// ── Write intents ────────────────────────────────────────────────────

/// Kind of write request; renders as the final PATCH path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum RequestType {
    /// Momentary command (e.g. move a shutter to a position).
    #[strum(serialize = "RequestAction")]
    Action,
    /// Persistent target state (e.g. switch a light on).
    #[strum(serialize = "RequestOverride")]
    Override,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Deserialize an already validated value.
pub(crate) fn construct<T: DeserializeOwned>(mut json: Value) -> Result<T, Error> {
    let body = json.to_string();
    normalize_whole_numbers(&mut json);
    serde_json::from_value(json).map_err(|e| Error::Parse {
        message: e.to_string(),
        body,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn device_json() -> Value {
        json!({
            "id": 5,
            "NodeId": 1,
            "ProductType": "DimmableLight",
            "ProductIdentifier": "P",
            "ActiveFirmwareVersion": "1",
            "ModelIdentifier": "M"
        })
    }

    #[test]
    fn device_without_serial_number_loads() {
        let device = DeviceRecord::from_json(device_json()).unwrap();
        assert_eq!(device.id, 5);
        assert_eq!(device.node_id, 1);
        assert_eq!(device.product_type, "DimmableLight");
        assert!(device.serial_number.is_none());
    }

    #[test]
    fn device_accepts_whole_float_ids() {
        let mut json = device_json();
        json["id"] = json!(5.0);
        json["NodeId"] = json!(1.0);

        let device = DeviceRecord::from_json(json).unwrap();
        assert_eq!(device.id, 5);
        assert_eq!(device.node_id, 1);
    }

    #[test]
    fn device_rejects_fractional_id() {
        let mut json = device_json();
        json["id"] = json!(5.5);

        let err = DeviceRecord::from_json(json).unwrap_err();
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn device_checks_numbers_before_strings() {
        let mut json = device_json();
        json["NodeId"] = json!("one");
        json.as_object_mut().unwrap().remove("ModelIdentifier");

        let err = DeviceRecord::from_json(json).unwrap_err();
        assert_eq!(err.field(), Some("NodeId"));
    }

    #[test]
    fn device_rejects_non_string_serial() {
        let mut json = device_json();
        json["SerialNumber"] = json!(1234);

        let err = DeviceRecord::from_json(json).unwrap_err();
        assert_eq!(err.field(), Some("SerialNumber"));
    }

    #[test]
    fn request_type_path_segments() {
        assert_eq!(RequestType::Action.as_ref(), "RequestAction");
        assert_eq!(RequestType::Override.to_string(), "RequestOverride");
    }

    #[test]
    fn light_record_serializes_with_wire_names() {
        let light = LightRecord {
            base: WiserDeviceBase {
                id: 1,
                device_id: 2,
                endpoint: 0,
                name: "Hall".into(),
            },
            is_dimmable: false,
            current_state: None,
            current_percentage: None,
            current_level: None,
            target_state: "Off".into(),
            target_percentage: 0.0,
        };
        let value = serde_json::to_value(&light).unwrap();

        assert_eq!(value["id"], json!(1));
        assert_eq!(value["DeviceId"], json!(2));
        assert_eq!(value["IsDimmable"], json!(false));
        assert!(value.get("CurrentState").is_none());
    }
}
