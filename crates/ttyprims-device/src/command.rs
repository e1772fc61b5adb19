use std::fmt;

use ttyprims_config::{CommandPlan, ConfigError, Platform};

use crate::address::DeviceAddress;

/// A fully assembled configuration command, run without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCommand {
    program: String,
    args: Vec<String>,
}

impl ConfigCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Consume `plan` and build the command that applies it to `address`.
    ///
    /// Fails on the first invalid setting the plan reports.
    pub fn build(
        platform: Platform,
        address: &DeviceAddress,
        plan: CommandPlan,
    ) -> Result<Self, ConfigError> {
        let device = address.path().to_string_lossy().into_owned();
        let mut args = match platform {
            Platform::Linux => vec!["-F".to_string(), device],
            Platform::Bsd => vec!["-f".to_string(), device],
            Platform::Windows => vec![device],
        };
        for token in plan {
            args.push(token?.into_owned());
        }

        let program = match platform {
            Platform::Windows => "mode",
            Platform::Linux | Platform::Bsd => "stty",
        };
        Ok(Self::new(program, args))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Process builder for this command.
    pub fn to_process(&self) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for ConfigCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
