//! The `bootstrapctl` command line interface.

use std::io::Write;

use clap::{Parser, Subcommand};
use snafu::{ResultExt as _, Snafu};

use crate::{
    commands::{config::ConfigCommand, join::JoinCommand, token::TokenCommand},
    logging::Logging,
};

pub mod commands;
pub mod dry_run;
pub mod logging;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitLogging { source: logging::Error },

    #[snafu(display("config command failed"))]
    Config { source: commands::config::Error },

    #[snafu(display("join command failed"))]
    Join { source: commands::join::Error },

    #[snafu(display("token command failed"))]
    Token { source: commands::token::Error },
}

#[derive(Debug, Parser)]
#[command(name = "bootstrapctl", version, about = "Bootstraps cluster nodes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // Flattened structs go last to keep the help headings in order.
    #[command(flatten)]
    pub logging: logging::LoggingOptions,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration files.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Join this machine to an existing cluster.
    #[command(subcommand)]
    Join(JoinCommand),

    /// Manage bootstrap tokens.
    #[command(subcommand)]
    Token(TokenCommand),
}

/// Initializes logging, then runs the selected command against stdout.
pub fn run(cli: Cli) -> Result<(), Error> {
    let _logging_guard = Logging::pre_configured(cli.logging)
        .init()
        .context(InitLoggingSnafu)?;

    cli.command.run(&mut std::io::stdout().lock())
}

impl Command {
    /// Runs the command, writing its output to `out`.
    pub fn run(self, out: &mut impl Write) -> Result<(), Error> {
        match self {
            Self::Config(command) => command.run(out).context(ConfigSnafu),
            Self::Join(command) => command.run(out).context(JoinSnafu),
            Self::Token(command) => command.run(out).context(TokenSnafu),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;
    use crate::{
        commands::{config::PrintCommand, join::JoinRunArguments},
        logging::RotationPeriod,
    };

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn logging_options_are_global() {
        let cli = Cli::try_parse_from([
            "bootstrapctl",
            "token",
            "generate",
            "--console-log-disabled",
            "--file-log-directory",
            "/var/log/bootstrapctl",
            "--file-log-rotation-period",
            "daily",
        ])
        .expect("arguments must parse");

        assert!(cli.logging.console_log_disabled);
        assert_eq!(
            cli.logging.file_log_rotation_period,
            Some(RotationPeriod::Daily)
        );
    }

    #[rstest]
    #[case::defaults(&["bootstrapctl", "config", "print", "init-defaults"])]
    #[case::version(&["bootstrapctl", "config", "print", "init-defaults", "--to-version", "v1alpha3"])]
    fn print_init_defaults_parses(#[case] args: &[&str]) {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("arguments must parse");

        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Print(PrintCommand::InitDefaults(_)))
        ));
    }

    #[test]
    fn join_run_collects_repeated_phases() {
        let cli = Cli::try_parse_from([
            "bootstrapctl",
            "join",
            "run",
            "--config",
            "/etc/kubeadm/join.yaml",
            "--phase",
            "control-plane-prepare/certs",
            "--phase",
            "control-plane-prepare/kubeconfig",
            "--skip-phase",
            "control-plane-prepare/download-certs",
        ])
        .expect("arguments must parse");

        let Command::Join(JoinCommand::Run(JoinRunArguments {
            phases,
            skip_phases,
            ..
        })) = cli.command
        else {
            panic!("expected the join run command");
        };
        assert_eq!(phases, [
            "control-plane-prepare/certs",
            "control-plane-prepare/kubeconfig"
        ]);
        assert_eq!(skip_phases, ["control-plane-prepare/download-certs"]);
    }

    #[test]
    fn unknown_versions_are_rejected() {
        Cli::try_parse_from([
            "bootstrapctl",
            "config",
            "print",
            "init-defaults",
            "--to-version",
            "v1",
        ])
        .expect_err("unknown version must be rejected");
    }
}
