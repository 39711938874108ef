//! Follow one device: bind it to the polling cache and print each
//! state cell as it changes, until Ctrl-C.

use std::fmt::Display;

use wiser_core::{DomainDevice, StateCell, WiserClient};

use crate::cli::{GlobalOpts, RecordArgs};
use crate::error::CliError;

fn follow<T, D>(cell: &StateCell<T>, name: &str, field: &'static str, show: fn(&T) -> D)
where
    T: Clone + Send + 'static,
    D: Display + 'static,
{
    let name = name.to_owned();
    cell.subscribe(move |value| println!("{name}  {field} = {}", show(value)));
}

fn or_dash<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".into(), ToString::to_string)
}

pub async fn handle(
    client: &WiserClient,
    args: RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let record = client.get_device(&args.tag, &args.id).await?;
    let device = DomainDevice::from_record(&record);
    let name = device.identity().name.clone();

    if !global.quiet {
        match &device {
            DomainDevice::Light(light) => {
                follow(&light.current_state, &name, "current_state", |v| {
                    or_dash(v.as_ref())
                });
                follow(&light.current_percentage, &name, "current_percentage", |v| {
                    or_dash(v.as_ref())
                });
                follow(&light.target_state, &name, "target_state", String::clone);
                follow(&light.target_percentage, &name, "target_percentage", |v| *v);
            }
            DomainDevice::Shutter(shutter) => {
                follow(&shutter.current_lift, &name, "current_lift", |v| *v);
                follow(&shutter.target_lift, &name, "target_lift", |v| *v);
                follow(&shutter.motion, &name, "motion", |v| *v);
            }
        }
    }

    let binding = client.bind(device)?;
    tracing::info!(
        tag = %args.tag,
        id = %args.id,
        interval_ms = u64::try_from(client.cache().refresh_interval().as_millis()).unwrap_or(u64::MAX),
        "watching device"
    );

    tokio::signal::ctrl_c().await?;
    binding.cancel();
    Ok(())
}
