// wiser-api: Async Rust client for the Wiser home hub domain API

pub mod client;
pub mod error;
pub mod model;
pub mod registry;
pub mod snapshot;
pub mod transport;
pub mod validate;

pub use client::HubClient;
pub use error::Error;
pub use model::{
    DeviceRecord, LightRecord, RequestType, ShutterRecord, WiserDeviceBase, WiserRecord,
};
pub use registry::{DeviceRegistry, Family, FamilyEntry};
pub use snapshot::HubSnapshot;
pub use transport::TransportConfig;
pub use validate::{FieldKind, ValidationError, whole_number};
