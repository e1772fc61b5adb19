use serde::Serialize;
use ttyprims_config::SerialConfig;
use ttyprims_device::{ConfigCommand, DeviceAddress, SerialConfigurator};
use ttyprims_registry::split_uri;

use crate::cmd::{target_platform, PlanArgs};
use crate::exit::{device_error, registry_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct PlanOutput {
    schema_id: &'static str,
    platform: &'static str,
    logical: String,
    device: String,
    program: String,
    args: Vec<String>,
    command: String,
    boot_delay_s: f64,
}

pub fn run(args: PlanArgs, format: OutputFormat) -> CliResult<i32> {
    let platform = target_platform(args.platform)?;
    let uri = args.serial.uri(&args.device);
    let (scheme, _) = split_uri(&uri).map_err(|err| registry_error("invalid device", err))?;
    let config = args.serial.config()?;

    let (address, command) = SerialConfigurator::for_platform(platform)
        .describe(&uri, scheme, &config)
        .map_err(|err| device_error("plan failed", err))?;

    let output = plan_output(platform.as_str(), &address, &command, &config);
    print_plan(&output, format);
    Ok(SUCCESS)
}

fn plan_output(
    platform: &'static str,
    address: &DeviceAddress,
    command: &ConfigCommand,
    config: &SerialConfig,
) -> PlanOutput {
    PlanOutput {
        schema_id: "https://schemas.3leaps.dev/ttyprims/cli/v1/config-plan.schema.json",
        platform,
        logical: address.logical().to_string(),
        device: address.path().display().to_string(),
        program: command.program().to_string(),
        args: command.args().to_vec(),
        command: command.to_string(),
        boot_delay_s: config.boot_delay().as_secs_f64(),
    }
}

fn print_plan(output: &PlanOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => print_table(
            &["FIELD", "VALUE"],
            vec![
                vec!["platform".into(), output.platform.into()],
                vec!["logical".into(), output.logical.clone()],
                vec!["device".into(), output.device.clone()],
                vec!["command".into(), output.command.clone()],
                vec!["boot delay".into(), format!("{}s", output.boot_delay_s)],
            ],
        ),
        OutputFormat::Pretty => println!(
            "platform={} device={} boot_delay={}s\n  {}",
            output.platform, output.device, output.boot_delay_s, output.command
        ),
        OutputFormat::Raw => println!("{}", output.command),
    }
}

#[cfg(test)]
mod tests {
    use ttyprims_config::Platform;

    use super::*;

    #[test]
    fn plan_output_serializes_command_and_args() {
        let configurator = SerialConfigurator::for_platform(Platform::Windows);
        let config = SerialConfig::new().with_baud_rate(38_400);
        let (address, command) = configurator
            .describe("arduino://COM12", "arduino", &config)
            .unwrap();

        let output = plan_output(Platform::Windows.as_str(), &address, &command, &config);
        assert_eq!(output.device, "com12");
        assert_eq!(output.program, "mode");
        assert_eq!(output.args[..2], ["com12", "baud=38400"]);

        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"boot_delay_s\":2.0"));
    }
}
