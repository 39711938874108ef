// ── Domain devices ──
//
// Live, observable counterparts of the hub's family records. Each device
// owns one `StateCell` per attribute; `update` copies a fresh record into
// those cells.

mod light;
mod shutter;

use std::sync::Arc;

use wiser_api::{Family, HubSnapshot, WiserDeviceBase, WiserRecord};

pub use light::{Light, LightCommand};
pub use shutter::{LiftMotion, Shutter, ShutterCommand};

/// Immutable identity of a domain device, taken from its first record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Family record id, used in command paths.
    pub id: u64,
    /// Hardware device the record belongs to.
    pub device_id: u64,
    pub endpoint: u64,
    pub name: String,
}

impl From<&WiserDeviceBase> for DeviceIdentity {
    fn from(base: &WiserDeviceBase) -> Self {
        Self {
            id: base.id,
            device_id: base.device_id,
            endpoint: base.endpoint,
            name: base.name.clone(),
        }
    }
}

/// A device whose state follows records of one family.
pub trait WiserDevice: Send + Sync + 'static {
    type Record: Family;

    /// Build the device with defaults, then apply `record`.
    fn from_record(record: &Self::Record) -> Self
    where
        Self: Sized;

    fn identity(&self) -> &DeviceIdentity;

    /// Apply `record` if it belongs to this device (same `DeviceId`).
    ///
    /// Returns `true` if the record was applied. A match pushes every
    /// attribute, changed or not.
    fn update(&self, record: &Self::Record) -> bool;

    /// Family tag used in command paths.
    fn tag(&self) -> &'static str {
        Self::Record::TAG
    }

    /// Apply this device's record from `snapshot`, matched by family id.
    fn apply_snapshot(&self, snapshot: &HubSnapshot) -> bool {
        let id = self.identity().id;
        Self::Record::records(snapshot)
            .iter()
            .find(|record| record.base().id == id)
            .is_some_and(|record| self.update(record))
    }
}

/// Any supported domain device.
#[derive(Debug, Clone)]
pub enum DomainDevice {
    Light(Arc<Light>),
    Shutter(Arc<Shutter>),
}

impl DomainDevice {
    pub fn from_record(record: &WiserRecord) -> Self {
        match record {
            WiserRecord::Light(r) => Self::Light(Arc::new(Light::from_record(r))),
            WiserRecord::Shutter(r) => Self::Shutter(Arc::new(Shutter::from_record(r))),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        match self {
            Self::Light(d) => d.identity(),
            Self::Shutter(d) => d.identity(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Light(d) => d.tag(),
            Self::Shutter(d) => d.tag(),
        }
    }

    pub fn apply_snapshot(&self, snapshot: &HubSnapshot) -> bool {
        match self {
            Self::Light(d) => d.apply_snapshot(snapshot),
            Self::Shutter(d) => d.apply_snapshot(snapshot),
        }
    }

    /// Apply a record of any family. Records of another family are ignored.
    pub fn update(&self, record: &WiserRecord) -> bool {
        match (self, record) {
            (Self::Light(d), WiserRecord::Light(r)) => d.update(r),
            (Self::Shutter(d), WiserRecord::Shutter(r)) => d.update(r),
            _ => false,
        }
    }
}

impl From<Arc<Light>> for DomainDevice {
    fn from(light: Arc<Light>) -> Self {
        Self::Light(light)
    }
}

impl From<Arc<Shutter>> for DomainDevice {
    fn from(shutter: Arc<Shutter>) -> Self {
        Self::Shutter(shutter)
    }
}
