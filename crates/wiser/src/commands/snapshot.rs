//! Snapshot and discovery handlers.

use tabled::Tabled;
use wiser_core::{Accessory, WiserClient, WiserRecord};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Family")]
    family: &'static str,
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Device")]
    device_id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&WiserRecord> for RecordRow {
    fn from(record: &WiserRecord) -> Self {
        Self {
            family: record.tag(),
            id: record.id(),
            device_id: record.device_id(),
            name: record.name().to_owned(),
            state: summarize(record),
        }
    }
}

#[derive(Tabled)]
struct AccessoryRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
}

impl From<&Accessory> for AccessoryRow {
    fn from(a: &Accessory) -> Self {
        Self {
            id: a.device.id,
            kind: a.kind,
            name: a.name().to_owned(),
            product: a.device.product_type.clone(),
            model: a.device.model_identifier.clone(),
            firmware: a.device.active_firmware_version.clone(),
        }
    }
}

/// One-line state summary used by tables.
pub(crate) fn summarize(record: &WiserRecord) -> String {
    match record {
        WiserRecord::Light(l) => {
            if l.is_dimmable {
                format!("{} {}%", l.target_state, l.target_percentage)
            } else {
                l.target_state.clone()
            }
        }
        WiserRecord::Shutter(s) => format!("{}% ({})", s.current_lift, s.lift_movement),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_snapshot(client: &WiserClient, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = client.get_hub_snapshot().await?;

    let records: Vec<WiserRecord> = snapshot
        .lights
        .iter()
        .cloned()
        .map(WiserRecord::Light)
        .chain(snapshot.shutters.iter().cloned().map(WiserRecord::Shutter))
        .collect();

    let out = output::render_list(
        &global.output,
        &records,
        |r| RecordRow::from(r),
        |r| format!("{}/{}", r.tag(), r.id()),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_discover(client: &WiserClient, global: &GlobalOpts) -> Result<(), CliError> {
    let accessories = client.discover().await?;

    let out = output::render_list(
        &global.output,
        &accessories,
        |a| AccessoryRow::from(a),
        Accessory::uuid_seed,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
