//! Record lookup and light/shutter control handlers.

use wiser_core::{LightCommand, ShutterCommand, WiserClient, WiserRecord};

use crate::cli::{self, GlobalOpts, LightArgs, RecordArgs, ShutterArgs};
use crate::error::CliError;
use crate::output;

use super::snapshot::summarize;

fn opt<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".into(), ToString::to_string)
}

fn detail(record: &WiserRecord) -> String {
    let base = record.base();
    let mut pairs = vec![
        ("Family:", record.tag().to_owned()),
        ("ID:", base.id.to_string()),
        ("Device:", base.device_id.to_string()),
        ("Endpoint:", base.endpoint.to_string()),
        ("Name:", base.name.clone()),
    ];

    match record {
        WiserRecord::Light(l) => {
            pairs.extend([
                ("Dimmable:", l.is_dimmable.to_string()),
                ("State:", opt(l.current_state.as_ref())),
                ("Percentage:", opt(l.current_percentage.as_ref())),
                ("Level:", opt(l.current_level.as_ref())),
                ("Target:", l.target_state.clone()),
                ("Target %:", l.target_percentage.to_string()),
            ]);
        }
        WiserRecord::Shutter(s) => {
            pairs.extend([
                ("Lift:", s.current_lift.to_string()),
                ("Target lift:", s.target_lift.to_string()),
                ("Movement:", s.lift_movement.clone()),
            ]);
        }
    }

    output::detail_lines(&pairs)
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_get(
    client: &WiserClient,
    args: RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let record = client.get_device(&args.tag, &args.id).await?;
    let out = output::render_single(&global.output, &record, detail, summarize)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_light(
    client: &WiserClient,
    args: LightArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (command, message) = match args.command {
        cli::LightCommand::On => (LightCommand::Power(true), "switched on".to_owned()),
        cli::LightCommand::Off => (LightCommand::Power(false), "switched off".to_owned()),
        cli::LightCommand::Brightness { percentage } => (
            LightCommand::Brightness(percentage),
            format!("set to {percentage}%"),
        ),
    };

    client.send(command.into_command(args.id)).await?;
    output::print_output(&format!("Light {} {message}", args.id), global.quiet);
    Ok(())
}

pub async fn handle_shutter(
    client: &WiserClient,
    args: ShutterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        cli::ShutterCommand::Lift { percentage } => {
            client
                .send(ShutterCommand::LiftTo(percentage).into_command(args.id))
                .await?;
            output::print_output(
                &format!("Shutter {} moving to {percentage}%", args.id),
                global.quiet,
            );
        }
    }
    Ok(())
}
