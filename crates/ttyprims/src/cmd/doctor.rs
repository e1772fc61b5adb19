use std::path::{Path, PathBuf};

use serde::Serialize;
use ttyprims_config::{Platform, SerialOptions};

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let platform = Platform::current();
    let checks = vec![
        platform_support_check(platform),
        config_tool_check(platform),
        serial_devices_check(),
        compiled_features_check(),
        defaults_file_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        schema_id: "https://schemas.3leaps.dev/ttyprims/cli/v1/doctor-report.schema.json",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("ttyprims doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_support_check(platform: Option<Platform>) -> CheckResult {
    match platform {
        Some(platform) => CheckResult {
            name: "platform_support".to_string(),
            status: CheckStatus::Pass,
            detail: format!("{platform} serial configurator available"),
        },
        None => CheckResult {
            name: "platform_support".to_string(),
            status: CheckStatus::Fail,
            detail: format!("no serial configurator for {}", std::env::consts::OS),
        },
    }
}

fn tool_candidates(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows => &["mode.com", "mode.exe"],
        Platform::Linux | Platform::Bsd => &["stty"],
    }
}

fn find_on_path(candidates: &[&str], path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(path_var).find_map(|dir| {
        candidates
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

// Without the tool, opens still succeed and the line keeps its current settings.
fn config_tool_check(platform: Option<Platform>) -> CheckResult {
    let Some(platform) = platform else {
        return CheckResult {
            name: "config_tool".to_string(),
            status: CheckStatus::Skip,
            detail: "platform unsupported".to_string(),
        };
    };

    let candidates = tool_candidates(platform);
    let path_var = std::env::var_os("PATH");
    match find_on_path(candidates, path_var.as_deref()) {
        Some(found) => CheckResult {
            name: "config_tool".to_string(),
            status: CheckStatus::Pass,
            detail: found.display().to_string(),
        },
        None => CheckResult {
            name: "config_tool".to_string(),
            status: CheckStatus::Warn,
            detail: format!("{} not found on PATH", candidates[0]),
        },
    }
}

fn serial_devices_check() -> CheckResult {
    #[cfg(unix)]
    {
        const PREFIXES: [&str; 5] = ["ttyACM", "ttyUSB", "cu.usb", "ttyU", "cuaU"];
        let found: Vec<String> = std::fs::read_dir("/dev")
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .filter(|name| PREFIXES.iter().any(|prefix| name.starts_with(prefix)))
                    .collect()
            })
            .unwrap_or_default();

        let detail = if found.is_empty() {
            "no USB serial devices in /dev".to_string()
        } else {
            found.join(", ")
        };
        CheckResult {
            name: "serial_devices".to_string(),
            status: CheckStatus::Info,
            detail,
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult {
            name: "serial_devices".to_string(),
            status: CheckStatus::Skip,
            detail: "device listing not implemented on this platform".to_string(),
        }
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "registry") {
        features.push("registry");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

fn defaults_file_check() -> CheckResult {
    match std::env::var_os("TTYPRIMS_DEFAULTS") {
        Some(value) => check_defaults_file(Path::new(&value)),
        None => CheckResult {
            name: "defaults_file".to_string(),
            status: CheckStatus::Skip,
            detail: "TTYPRIMS_DEFAULTS not set".to_string(),
        },
    }
}

fn check_defaults_file(path: &Path) -> CheckResult {
    let fail = |detail: String| CheckResult {
        name: "defaults_file".to_string(),
        status: CheckStatus::Fail,
        detail,
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => return fail(format!("{}: {err}", path.display())),
    };
    let options = match SerialOptions::from_json_str(&text) {
        Ok(options) => options,
        Err(err) => return fail(format!("{}: {err}", path.display())),
    };
    if let Err(err) = options.to_config().baud_rate() {
        return fail(format!("{}: {err}", path.display()));
    }

    CheckResult {
        name: "defaults_file".to_string(),
        status: CheckStatus::Pass,
        detail: format!("{} loaded successfully", path.display()),
    }
}
