//! Raw RequestAction / RequestOverride handlers.

use serde_json::Value;
use wiser_core::WiserClient;

use crate::cli::{GlobalOpts, RawRequestArgs};
use crate::error::CliError;
use crate::output;

fn parse_body(raw: &str) -> Result<Value, CliError> {
    let body: Value = serde_json::from_str(raw)?;
    if !body.is_object() {
        return Err(CliError::Validation {
            field: "body".into(),
            reason: "request body must be a JSON object".into(),
        });
    }
    Ok(body)
}

pub async fn handle_action(
    client: &WiserClient,
    args: RawRequestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = parse_body(&args.body)?;
    client.send_action(&args.tag, args.id, body).await?;
    output::print_output(&format!("Action sent to {} {}", args.tag, args.id), global.quiet);
    Ok(())
}

pub async fn handle_override(
    client: &WiserClient,
    args: RawRequestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let body = parse_body(&args.body)?;
    client.send_override(&args.tag, args.id, body).await?;
    output::print_output(
        &format!("Override sent to {} {}", args.tag, args.id),
        global.quiet,
    );
    Ok(())
}
