// wiser-core: Shared polling cache, reactive device state and command
// dispatch between wiser-api and consumers (CLI, bridges).

pub mod cache;
pub mod cell;
pub mod client;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{FetchSnapshot, HubFetcher, SharedPollingCache};
pub use cell::{StateCell, SubscriptionId};
pub use client::{Accessory, ClientSlot, WiserClient, init, instance};
pub use command::{Command, CommandDispatcher, RetryPolicy};
pub use config::{DEFAULT_REFRESH_INTERVAL, HubConfig, SecretFn, SecretProvider, StaticSecret};
pub use device::{
    DeviceIdentity, DomainDevice, LiftMotion, Light, LightCommand, Shutter, ShutterCommand,
    WiserDevice,
};
pub use error::CoreError;
pub use stream::{DeviceBinding, SnapshotStream};

// Wire types consumers need alongside the client.
pub use wiser_api::{
    DeviceRecord, DeviceRegistry, Family, HubSnapshot, LightRecord, RequestType, ShutterRecord,
    WiserDeviceBase, WiserRecord,
};
