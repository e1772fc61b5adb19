use serde::Serialize;
use ttyprims_device::resolve;
use ttyprims_registry::split_uri;

use crate::cmd::{target_platform, ResolveArgs};
use crate::exit::{registry_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct ResolveOutput<'a> {
    schema_id: &'static str,
    platform: &'static str,
    scheme: &'a str,
    logical: &'a str,
    device: String,
}

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let platform = target_platform(args.platform)?;
    let uri = if args.device.contains("://") {
        args.device.clone()
    } else {
        format!("{}://{}", args.scheme, args.device)
    };
    let (scheme, _) = split_uri(&uri).map_err(|err| registry_error("invalid device", err))?;
    let address = resolve(&uri, scheme, platform);

    let output = ResolveOutput {
        schema_id: "https://schemas.3leaps.dev/ttyprims/cli/v1/device-address.schema.json",
        platform: platform.as_str(),
        scheme,
        logical: address.logical(),
        device: address.path().display().to_string(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => print_table(
            &["PLATFORM", "LOGICAL", "DEVICE"],
            vec![vec![
                output.platform.to_string(),
                output.logical.to_string(),
                output.device.clone(),
            ]],
        ),
        OutputFormat::Pretty => println!("{} -> {}", output.logical, output.device),
        OutputFormat::Raw => println!("{}", output.device),
    }

    Ok(SUCCESS)
}
