// Hub snapshot aggregate
//
// One complete read of `GET /data/v2/domain/`. Built atomically: either
// every section validates and the whole snapshot exists, or the first
// violation is returned and nothing is produced.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::model::{DeviceRecord, LightRecord, ShutterRecord, WiserRecord};
use crate::registry::DeviceRegistry;
use crate::validate::{FieldKind, ValidationError};

const HUB_KIND: &str = "WiserHub";
const DEVICE_SECTION: &str = "Device";

/// Immutable view of everything the hub reported in one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HubSnapshot {
    pub devices: Vec<DeviceRecord>,
    pub lights: Vec<LightRecord>,
    pub shutters: Vec<ShutterRecord>,
}

impl HubSnapshot {
    /// Validate and build a snapshot from the hub's JSON document.
    ///
    /// Presence of `Device` and of every registered family section is
    /// checked before any element is looked at.
    pub fn from_json(json: Value, registry: &DeviceRegistry) -> Result<Self, Error> {
        let mut root = match json {
            Value::Object(root) => root,
            other => {
                return Err(
                    ValidationError::wrong_type(HUB_KIND, HUB_KIND, FieldKind::Object, &other)
                        .into(),
                );
            }
        };

        for section in std::iter::once(DEVICE_SECTION).chain(registry.tags()) {
            if !root.contains_key(section) {
                return Err(ValidationError::missing(HUB_KIND, section).into());
            }
        }

        let devices = take_section(&mut root, DEVICE_SECTION)?
            .into_iter()
            .map(DeviceRecord::from_json)
            .collect::<Result<Vec<_>, _>>()?;

        let mut snapshot = Self {
            devices,
            ..Self::default()
        };

        for entry in registry.entries() {
            for element in take_section(&mut root, entry.tag())? {
                snapshot.insert(entry.build(element)?);
            }
        }

        Ok(snapshot)
    }

    fn insert(&mut self, record: WiserRecord) {
        match record {
            WiserRecord::Light(light) => self.lights.push(light),
            WiserRecord::Shutter(shutter) => self.shutters.push(shutter),
        }
    }

    /// Family record with the given numeric `id`, looked up through the registry.
    pub fn find(&self, registry: &DeviceRegistry, tag: &str, id: u64) -> Result<Option<WiserRecord>, Error> {
        Ok(registry.get(tag)?.find(self, id))
    }

    /// Family record attached to a hardware device (`DeviceId == device.id`).
    ///
    /// Shutters are checked before lights.
    pub fn wiser_device_for(&self, device: &DeviceRecord) -> Option<WiserRecord> {
        self.shutters
            .iter()
            .find(|s| s.base.device_id == device.id)
            .cloned()
            .map(WiserRecord::Shutter)
            .or_else(|| {
                self.lights
                    .iter()
                    .find(|l| l.base.device_id == device.id)
                    .cloned()
                    .map(WiserRecord::Light)
            })
    }

    pub fn device(&self, id: u64) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.id == id)
    }
}

fn take_section(root: &mut Map<String, Value>, section: &str) -> Result<Vec<Value>, Error> {
    match root.remove(section) {
        Some(Value::Array(elements)) => Ok(elements),
        Some(other) => {
            Err(ValidationError::wrong_type(HUB_KIND, section, FieldKind::Array, &other).into())
        }
        None => Err(ValidationError::missing(HUB_KIND, section).into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn hub_json() -> Value {
        json!({
            "Device": [
                {"id": 5, "NodeId": 1, "ProductType": "DimmableLight", "ProductIdentifier": "P",
                 "ActiveFirmwareVersion": "1", "ModelIdentifier": "M"},
                {"id": 7, "NodeId": 2, "ProductType": "Shutter", "ProductIdentifier": "S",
                 "SerialNumber": "SN7", "ActiveFirmwareVersion": "2", "ModelIdentifier": "M2"}
            ],
            "Light": [
                {"id": 5, "DeviceId": 5, "Endpoint": 0, "Name": "Hall",
                 "IsDimmable": true, "TargetState": "On", "TargetPercentage": 80}
            ],
            "Shutter": [
                {"id": 3, "DeviceId": 7, "Endpoint": 1, "Name": "Kitchen blind",
                 "CurrentLift": 40, "TargetLift": 60, "LiftMovement": "Opening"}
            ],
            "Room": []
        })
    }

    #[test]
    fn parses_every_section() {
        let snapshot = HubSnapshot::from_json(hub_json(), &DeviceRegistry::wiser()).unwrap();

        assert_eq!(snapshot.devices.len(), 2);
        assert_eq!(snapshot.lights.len(), 1);
        assert_eq!(snapshot.shutters.len(), 1);
        assert_eq!(snapshot.devices[1].serial_number.as_deref(), Some("SN7"));
    }

    #[test]
    fn missing_section_fails_before_elements() {
        let mut json = hub_json();
        json.as_object_mut().unwrap().remove("Shutter");
        json["Device"][0]["NodeId"] = json!("broken");

        let err = HubSnapshot::from_json(json, &DeviceRegistry::wiser()).unwrap_err();
        assert_eq!(err.field(), Some("Shutter"));
    }

    #[test]
    fn section_must_be_an_array() {
        let mut json = hub_json();
        json["Light"] = json!({});

        let err = HubSnapshot::from_json(json, &DeviceRegistry::wiser()).unwrap_err();
        assert_eq!(err.field(), Some("Light"));
    }

    #[test]
    fn first_invalid_record_aborts_the_batch() {
        let mut json = hub_json();
        json["Light"][0].as_object_mut().unwrap().remove("IsDimmable");
        json["Shutter"][0].as_object_mut().unwrap().remove("Name");

        let err = HubSnapshot::from_json(json, &DeviceRegistry::wiser()).unwrap_err();
        assert_eq!(err.field(), Some("IsDimmable"));
    }

    #[test]
    fn registry_decides_which_sections_are_read() {
        let mut registry = DeviceRegistry::new();
        registry.register::<ShutterRecord>().unwrap();

        let mut json = hub_json();
        json.as_object_mut().unwrap().remove("Light");

        let snapshot = HubSnapshot::from_json(json, &registry).unwrap();
        assert!(snapshot.lights.is_empty());
        assert_eq!(snapshot.shutters.len(), 1);
        assert!(snapshot.find(&registry, "Light", 5).is_err());
    }

    #[test]
    fn whole_float_identifiers_load() {
        let mut json = hub_json();
        json["Shutter"][0]["Endpoint"] = json!(1.0);
        json["Shutter"][0]["DeviceId"] = json!(7.0);
        json["Shutter"][0]["CurrentLift"] = json!(40.5);

        let snapshot = HubSnapshot::from_json(json, &DeviceRegistry::wiser()).unwrap();
        let shutter = &snapshot.shutters[0];
        assert_eq!(shutter.base.endpoint, 1);
        assert_eq!(shutter.base.device_id, 7);
        assert!((shutter.current_lift - 40.5).abs() < f64::EPSILON);
    }

    #[test]
    fn joins_devices_to_family_records() {
        let snapshot = HubSnapshot::from_json(hub_json(), &DeviceRegistry::wiser()).unwrap();

        let light = snapshot.wiser_device_for(&snapshot.devices[0]).unwrap();
        assert_eq!(light.tag(), "Light");
        assert_eq!(light.name(), "Hall");

        let shutter = snapshot.wiser_device_for(&snapshot.devices[1]).unwrap();
        assert_eq!(shutter.tag(), "Shutter");
        assert_eq!(shutter.id(), 3);
    }

    #[test]
    fn find_uses_family_id_not_device_id() {
        let registry = DeviceRegistry::wiser();
        let snapshot = HubSnapshot::from_json(hub_json(), &registry).unwrap();

        assert!(snapshot.find(&registry, "Shutter", 3).unwrap().is_some());
        assert!(snapshot.find(&registry, "Shutter", 7).unwrap().is_none());
        assert!(snapshot.find(&registry, "Thermostat", 3).is_err());
    }
}
