// Device family registry
//
// Maps a family tag ("Light", "Shutter") to the pair of functions that
// validate and construct its records. The registry decides which hub
// sections are required, the order they are parsed in, and how records
// are looked up by tag. Storage is a closed set: `WiserRecord` and
// `HubSnapshot` carry one variant and one field per family, so a new
// family needs both of those plus a `Family` impl before it can be
// registered.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::model::{LightRecord, ShutterRecord, WiserDeviceBase, WiserRecord, construct};
use crate::snapshot::HubSnapshot;
use crate::validate::{FieldKind, Fields, ValidationError};

/// A device family the hub reports in its own top-level section.
pub trait Family: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Registry key, section name, and PATCH path segment.
    const TAG: &'static str;

    /// `Device.ProductType` values that are backed by this family.
    const PRODUCT_TYPES: &'static [&'static str];

    /// Fail-fast schema check, base fields first.
    fn validate(json: &Value) -> Result<(), ValidationError>;

    /// This family's records within a snapshot.
    fn records(snapshot: &HubSnapshot) -> &[Self];

    fn into_record(self) -> WiserRecord;

    fn base(&self) -> &WiserDeviceBase;
}

impl Family for LightRecord {
    const TAG: &'static str = "Light";
    const PRODUCT_TYPES: &'static [&'static str] = &["DimmableLight", "OnOffLight"];

    fn validate(json: &Value) -> Result<(), ValidationError> {
        let fields = Fields::of(Self::TAG, json)?;
        WiserDeviceBase::validate(&fields)?;
        fields.require("TargetPercentage", FieldKind::Number)?;
        fields.optional_all(&["CurrentPercentage", "CurrentLevel"], FieldKind::Number)?;
        fields.require("TargetState", FieldKind::String)?;
        fields.optional("CurrentState", FieldKind::String)?;
        fields.require("IsDimmable", FieldKind::Boolean)?;
        Ok(())
    }

    fn records(snapshot: &HubSnapshot) -> &[Self] {
        &snapshot.lights
    }

    fn into_record(self) -> WiserRecord {
        WiserRecord::Light(self)
    }

    fn base(&self) -> &WiserDeviceBase {
        &self.base
    }
}

impl Family for ShutterRecord {
    const TAG: &'static str = "Shutter";
    const PRODUCT_TYPES: &'static [&'static str] = &["Shutter"];

    fn validate(json: &Value) -> Result<(), ValidationError> {
        let fields = Fields::of(Self::TAG, json)?;
        WiserDeviceBase::validate(&fields)?;
        fields.require_all(&["CurrentLift", "TargetLift"], FieldKind::Number)?;
        fields.require("LiftMovement", FieldKind::String)?;
        Ok(())
    }

    fn records(snapshot: &HubSnapshot) -> &[Self] {
        &snapshot.shutters
    }

    fn into_record(self) -> WiserRecord {
        WiserRecord::Shutter(self)
    }

    fn base(&self) -> &WiserDeviceBase {
        &self.base
    }
}

// ── FamilyEntry ──────────────────────────────────────────────────────

/// The `{validate, construct}` pair registered for one family tag.
#[derive(Clone, Copy)]
pub struct FamilyEntry {
    tag: &'static str,
    product_types: &'static [&'static str],
    validate: fn(&Value) -> Result<(), ValidationError>,
    construct: fn(Value) -> Result<WiserRecord, Error>,
    find: fn(&HubSnapshot, u64) -> Option<WiserRecord>,
}

impl FamilyEntry {
    fn of<F: Family>() -> Self {
        Self {
            tag: F::TAG,
            product_types: F::PRODUCT_TYPES,
            validate: F::validate,
            construct: construct_family::<F>,
            find: find_family::<F>,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn product_types(&self) -> &'static [&'static str] {
        self.product_types
    }

    pub fn validate(&self, json: &Value) -> Result<(), ValidationError> {
        (self.validate)(json)
    }

    /// Validate, then construct. Construction never runs on invalid input.
    pub fn build(&self, json: Value) -> Result<WiserRecord, Error> {
        (self.validate)(&json)?;
        (self.construct)(json)
    }

    /// Find this family's record with the given `id` in a snapshot.
    pub fn find(&self, snapshot: &HubSnapshot, id: u64) -> Option<WiserRecord> {
        (self.find)(snapshot, id)
    }
}

impl fmt::Debug for FamilyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyEntry")
            .field("tag", &self.tag)
            .field("product_types", &self.product_types)
            .finish_non_exhaustive()
    }
}

fn construct_family<F: Family>(json: Value) -> Result<WiserRecord, Error> {
    construct::<F>(json).map(F::into_record)
}

fn find_family<F: Family>(snapshot: &HubSnapshot, id: u64) -> Option<WiserRecord> {
    F::records(snapshot)
        .iter()
        .find(|record| record.base().id == id)
        .cloned()
        .map(F::into_record)
}

// ── DeviceRegistry ───────────────────────────────────────────────────

/// Ordered tag → [`FamilyEntry`] map.
///
/// Registration order is the order sections are presence-checked and
/// parsed in.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    entries: IndexMap<&'static str, FamilyEntry>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every family the hub is known to report.
    pub fn wiser() -> Self {
        let mut registry = Self::new();
        registry.entries.insert(LightRecord::TAG, FamilyEntry::of::<LightRecord>());
        registry.entries.insert(ShutterRecord::TAG, FamilyEntry::of::<ShutterRecord>());
        registry
    }

    /// Register a family. Tags are unique; a second registration is rejected.
    pub fn register<F: Family>(&mut self) -> Result<(), Error> {
        if self.entries.contains_key(F::TAG) {
            return Err(Error::DuplicateFamily(F::TAG));
        }
        self.entries.insert(F::TAG, FamilyEntry::of::<F>());
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Result<&FamilyEntry, Error> {
        self.entries
            .get(tag)
            .ok_or_else(|| Error::UnknownFamily(tag.to_owned()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FamilyEntry> {
        self.entries.values()
    }

    /// Validate and construct a record of the family registered under `tag`.
    pub fn build(&self, tag: &str, json: Value) -> Result<WiserRecord, Error> {
        self.get(tag)?.build(json)
    }

    /// The family that backs a given `Device.ProductType`, if any.
    pub fn family_for_product(&self, product_type: &str) -> Option<&FamilyEntry> {
        self.entries
            .values()
            .find(|entry| entry.product_types.contains(&product_type))
    }
}
