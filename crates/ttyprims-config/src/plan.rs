use std::borrow::Cow;

use tracing::debug;

use crate::config::{Parity, SerialConfig};
use crate::error::ConfigError;
use crate::platform::Platform;

/// One configuration token, as passed to `stty` or `mode`.
pub type Token = Cow<'static, str>;

/// Flow control off, raw terminal discipline.
const POSIX_DEFAULTS: &[&str] = &[
    "clocal", "-crtscts", "-ixon", "-ixoff", "ignbrk", "-brkint", "-icrnl", "-imaxbel", "-opost",
    "-onlcr", "-isig", "-icanon", "-iexten", "-echo", "-echoe", "-echok", "-echoctl", "-echoke",
    "noflsh",
];

/// Infinite timeout processing, no XON/XOFF, DTR/RTS held on.
const WINDOWS_DEFAULTS: &[&str] = &[
    "to=on", "xon=off", "odsr=off", "octs=off", "dtr=on", "rts=on", "idsr=off",
];

#[derive(Debug)]
enum Stage {
    Custom(std::vec::IntoIter<String>),
    Baud,
    Parity,
    ParityMode(&'static str),
    DataBits,
    StopBits,
    Defaults(std::slice::Iter<'static, &'static str>),
    Done,
}

/// Ordered configuration tokens for one open attempt.
///
/// Yields baud rate, parity, data bits, stop bits, then the fixed platform
/// defaults. A custom command replaces all of them. An invalid baud rate or
/// parity yields an `Err` in place of its tokens and planning continues.
///
/// The plan owns a snapshot of its config and can be consumed once.
#[derive(Debug)]
pub struct CommandPlan {
    platform: Platform,
    config: SerialConfig,
    stage: Stage,
}

/// Plan the configuration tokens for `config` on `platform`.
pub fn plan(config: &SerialConfig, platform: Platform) -> CommandPlan {
    let stage = match config.custom_command() {
        Some(tokens) => {
            debug!(%platform, tokens = tokens.len(), "using custom configuration command");
            Stage::Custom(tokens.to_vec().into_iter())
        }
        None => Stage::Baud,
    };

    CommandPlan {
        platform,
        config: config.clone(),
        stage,
    }
}

impl CommandPlan {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Collect every token, failing on the first invalid setting.
    pub fn into_tokens(self) -> crate::Result<Vec<Token>> {
        self.collect()
    }

    fn parity_tokens(&self, parity: Parity) -> (Token, Option<&'static str>) {
        match (self.platform, parity) {
            (Platform::Windows, Parity::None) => ("parity=n".into(), None),
            (Platform::Windows, Parity::Even) => ("parity=e".into(), None),
            (Platform::Windows, Parity::Odd) => ("parity=o".into(), None),
            (_, Parity::None) => ("-parenb".into(), None),
            (_, Parity::Even) => ("parenb".into(), Some("-parodd")),
            (_, Parity::Odd) => ("parenb".into(), Some("parodd")),
        }
    }

    fn data_bits_token(&self) -> Token {
        let bits = self.config.data_bits();
        match self.platform {
            Platform::Windows => format!("data={bits}").into(),
            Platform::Linux | Platform::Bsd => format!("cs{bits}").into(),
        }
    }

    fn stop_bits_token(&self) -> Token {
        let two = self.config.stop_bits() > 1;
        match (self.platform, two) {
            (Platform::Windows, true) => "stop=2".into(),
            (Platform::Windows, false) => "stop=1".into(),
            (_, true) => "cstopb".into(),
            (_, false) => "-cstopb".into(),
        }
    }

    fn defaults(&self) -> &'static [&'static str] {
        match self.platform {
            Platform::Windows => WINDOWS_DEFAULTS,
            Platform::Linux | Platform::Bsd => POSIX_DEFAULTS,
        }
    }
}

impl Iterator for CommandPlan {
    type Item = Result<Token, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.stage, Stage::Done) {
                Stage::Custom(mut tokens) => {
                    let token = tokens.next()?;
                    self.stage = Stage::Custom(tokens);
                    return Some(Ok(Cow::Owned(token)));
                }
                Stage::Baud => {
                    self.stage = Stage::Parity;
                    return Some(
                        self.config
                            .baud_rate()
                            .map(|rate| Cow::Owned(rate.token(self.platform))),
                    );
                }
                Stage::Parity => {
                    self.stage = Stage::DataBits;
                    let parity = match self.config.parity() {
                        Ok(parity) => parity,
                        Err(err) => return Some(Err(err)),
                    };
                    let (first, second) = self.parity_tokens(parity);
                    if let Some(second) = second {
                        self.stage = Stage::ParityMode(second);
                    }
                    return Some(Ok(first));
                }
                Stage::ParityMode(token) => {
                    self.stage = Stage::DataBits;
                    return Some(Ok(Cow::Borrowed(token)));
                }
                Stage::DataBits => {
                    self.stage = Stage::StopBits;
                    return Some(Ok(self.data_bits_token()));
                }
                Stage::StopBits => {
                    self.stage = Stage::Defaults(self.defaults().iter());
                    return Some(Ok(self.stop_bits_token()));
                }
                Stage::Defaults(mut rest) => match rest.next() {
                    Some(token) => {
                        self.stage = Stage::Defaults(rest);
                        return Some(Ok(Cow::Borrowed(*token)));
                    }
                    None => continue,
                },
                Stage::Done => return None,
            }
        }
    }
}

impl std::iter::FusedIterator for CommandPlan {}
