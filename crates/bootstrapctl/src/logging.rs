//! Initialisation of the console and file log subscribers.
//!
//! ```no_run
//! # use bootstrapctl::logging::{Logging, LoggingOptions, Error};
//! # fn main() -> Result<(), Error> {
//! let _logging_guard = Logging::pre_configured(LoggingOptions::default()).init()?;
//!
//! tracing::info!("log a message");
//! # Ok(())
//! # }
//! ```
//!
//! The subscribers stay installed for the lifetime of the process. The guard
//! returned by [`Logging::init`] must nevertheless be kept in scope until the
//! program exits, do not bind it to `_`.
//!
//! ## Environment variables and CLI arguments
//!
//! - `CONSOLE_LOG_DISABLED` (`--console-log-disabled`): Disables console logs.
//! - `CONSOLE_LOG_LEVEL`: Filter directives for console logs, `info` if unset.
//! - `FILE_LOG_DIRECTORY` (`--file-log-directory`): Enables JSON file logs in
//!   the given directory.
//! - `FILE_LOG_ROTATION_PERIOD` (`--file-log-rotation-period`): Rotation period
//!   of the log files.
//! - `FILE_LOG_LEVEL`: Filter directives for file logs, `info` if unset.

use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, layer::SubscriberExt};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender { source: InitError },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

/// Settings shared by all outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Environment variable holding the filter directives.
    pub environment_variable: &'static str,

    /// Level used when the environment variable is unset.
    pub default_level: LevelFilter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLogSettings {
    pub common_settings: Settings,
    pub file_log_dir: PathBuf,
    pub rotation_period: RotationPeriod,
}

/// The configured log outputs.
#[derive(Debug)]
pub struct Logging {
    console_log_settings: Option<Settings>,
    file_log_settings: Option<FileLogSettings>,
}

impl Logging {
    pub const CONSOLE_LOG_LEVEL: &str = "CONSOLE_LOG_LEVEL";
    pub const FILE_LOG_LEVEL: &str = "FILE_LOG_LEVEL";
    pub const FILE_LOG_PREFIX: &str = "bootstrapctl";
    pub const FILE_LOG_SUFFIX: &str = "tracing-rs.json";

    /// Builds the outputs described by `options`, both filtered at INFO by
    /// default.
    pub fn pre_configured(options: LoggingOptions) -> Self {
        let LoggingOptions {
            console_log_disabled,
            file_log_directory,
            file_log_rotation_period,
        } = options;

        let console_log_settings = (!console_log_disabled).then_some(Settings {
            environment_variable: Self::CONSOLE_LOG_LEVEL,
            default_level: LevelFilter::INFO,
        });

        let file_log_settings = file_log_directory.map(|file_log_dir| FileLogSettings {
            common_settings: Settings {
                environment_variable: Self::FILE_LOG_LEVEL,
                default_level: LevelFilter::INFO,
            },
            file_log_dir,
            rotation_period: file_log_rotation_period.unwrap_or_default(),
        });

        Self {
            console_log_settings,
            file_log_settings,
        }
    }

    /// Installs the configured subscribers as the global default.
    ///
    /// Console logs go to stderr, stdout is reserved for command output.
    pub fn init(self) -> Result<Self> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Sync + Send>> = Vec::new();

        if let Some(settings) = &self.console_log_settings {
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter_builder(
                        settings.environment_variable,
                        settings.default_level,
                    ))
                    .boxed(),
            );
        }

        if let Some(settings) = &self.file_log_settings {
            let file_appender = RollingFileAppender::builder()
                .rotation(settings.rotation_period.clone().into())
                .filename_prefix(Self::FILE_LOG_PREFIX)
                .filename_suffix(Self::FILE_LOG_SUFFIX)
                .build(&settings.file_log_dir)
                .context(InitRollingFileAppenderSnafu)?;

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(file_appender)
                    .with_filter(env_filter_builder(
                        settings.common_settings.environment_variable,
                        settings.common_settings.default_level,
                    ))
                    .boxed(),
            );
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        Ok(self)
    }
}

impl Drop for Logging {
    fn drop(&mut self) {
        tracing::debug!(
            console.enabled = self.console_log_settings.is_some(),
            file.enabled = self.file_log_settings.is_some(),
            "shutting down logging"
        );
    }
}

fn env_filter_builder(env_var: &str, default_directive: impl Into<Directive>) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env_var)
        .with_default_directive(default_directive.into())
        .from_env_lossy()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, clap::Args)]
pub struct LoggingOptions {
    /// Disable console logs.
    #[arg(long, env, global = true)]
    pub console_log_disabled: bool,

    /// Enable logging to files located in the specified DIRECTORY.
    #[arg(long, env, global = true, value_name = "DIRECTORY")]
    pub file_log_directory: Option<PathBuf>,

    /// Time PERIOD after which log files are rolled over.
    #[arg(long, env, global = true, value_name = "PERIOD")]
    pub file_log_rotation_period: Option<RotationPeriod>,
}

/// Supported periods when the log file is rolled over.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "PascalCase")]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn console_logs_are_enabled_by_default() {
        let logging = Logging::pre_configured(LoggingOptions::default());

        assert_eq!(
            logging.console_log_settings,
            Some(Settings {
                environment_variable: Logging::CONSOLE_LOG_LEVEL,
                default_level: LevelFilter::INFO,
            })
        );
        assert_eq!(logging.file_log_settings, None);
    }

    #[test]
    fn console_logs_can_be_disabled() {
        let logging = Logging::pre_configured(LoggingOptions {
            console_log_disabled: true,
            ..LoggingOptions::default()
        });

        assert_eq!(logging.console_log_settings, None);
    }

    #[rstest]
    #[case(None, RotationPeriod::Never)]
    #[case(Some(RotationPeriod::Hourly), RotationPeriod::Hourly)]
    fn file_logs_follow_the_directory(
        #[case] rotation_period: Option<RotationPeriod>,
        #[case] expected: RotationPeriod,
    ) {
        let logging = Logging::pre_configured(LoggingOptions {
            console_log_disabled: false,
            file_log_directory: Some(PathBuf::from("/var/log/bootstrapctl")),
            file_log_rotation_period: rotation_period,
        });

        assert_eq!(
            logging.file_log_settings,
            Some(FileLogSettings {
                common_settings: Settings {
                    environment_variable: Logging::FILE_LOG_LEVEL,
                    default_level: LevelFilter::INFO,
                },
                file_log_dir: PathBuf::from("/var/log/bootstrapctl"),
                rotation_period: expected,
            })
        );
    }

    #[rstest]
    #[case("Minutely", RotationPeriod::Minutely)]
    #[case("Daily", RotationPeriod::Daily)]
    #[case("Never", RotationPeriod::Never)]
    fn rotation_periods_parse(#[case] input: &str, #[case] expected: RotationPeriod) {
        let period: RotationPeriod = input.parse().expect("rotation period must parse");

        assert_eq!(period, expected);
        assert_eq!(period.to_string(), input);
    }
}
