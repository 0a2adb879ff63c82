//! `bootstrapctl config`: validation, migration and defaults of configuration
//! files.

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use bootstrap_config::{
    KubeadmVersion, default_init_configuration, load_from_file, marshal_to_bytes, migrate,
};
use clap::{Args, Subcommand};
use snafu::{ResultExt as _, Snafu};
use tracing::info;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load configuration file {path:?}"))]
    LoadConfig {
        source: bootstrap_config::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to read configuration file {path:?}"))]
    ReadConfig { source: io::Error, path: PathBuf },

    #[snafu(display("failed to migrate configuration file {path:?} to {version}"))]
    MigrateConfig {
        source: bootstrap_config::Error,
        path: PathBuf,
        version: KubeadmVersion,
    },

    #[snafu(display("failed to serialize the default configuration as {version}"))]
    MarshalDefaults {
        source: bootstrap_config::Error,
        version: KubeadmVersion,
    },

    #[snafu(display("failed to write configuration file {path:?}"))]
    WriteConfig { source: io::Error, path: PathBuf },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: io::Error },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Load, default and validate a configuration file.
    Validate(ValidateArguments),

    /// Convert a configuration file to another API version.
    Migrate(MigrateArguments),

    /// Print default configurations.
    #[command(subcommand)]
    Print(PrintCommand),
}

#[derive(Debug, Subcommand)]
pub enum PrintCommand {
    /// Print the default init configuration, together with the cluster
    /// configuration.
    InitDefaults(PrintArguments),
}

#[derive(Debug, Args)]
pub struct ValidateArguments {
    /// Path to the configuration file.
    #[arg(long, env = "BOOTSTRAP_CONFIG", value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct MigrateArguments {
    /// Path to the configuration file to migrate.
    #[arg(long, value_name = "FILE")]
    pub old_config: PathBuf,

    /// Path to write the migrated configuration to. Printed to stdout if not
    /// set.
    #[arg(long, value_name = "FILE")]
    pub new_config: Option<PathBuf>,

    /// API version to migrate to.
    #[arg(long, value_name = "VERSION", default_value_t = KubeadmVersion::LATEST)]
    pub to_version: KubeadmVersion,
}

#[derive(Debug, Args)]
pub struct PrintArguments {
    /// API version to print the configuration as.
    #[arg(long, value_name = "VERSION", default_value_t = KubeadmVersion::LATEST)]
    pub to_version: KubeadmVersion,
}

impl ConfigCommand {
    pub fn run(self, out: &mut impl Write) -> Result<()> {
        match self {
            Self::Validate(arguments) => arguments.run(out),
            Self::Migrate(arguments) => arguments.run(out),
            Self::Print(PrintCommand::InitDefaults(arguments)) => arguments.run(out),
        }
    }
}

impl ValidateArguments {
    fn run(self, out: &mut impl Write) -> Result<()> {
        let config = load_from_file(&self.config).context(LoadConfigSnafu {
            path: &self.config,
        })?;
        info!(
            node = %config.node_registration().name,
            "configuration is valid"
        );

        writeln!(out, "configuration file {:?} is valid", self.config).context(WriteOutputSnafu)
    }
}

impl MigrateArguments {
    fn run(self, out: &mut impl Write) -> Result<()> {
        let bytes = fs::read(&self.old_config).context(ReadConfigSnafu {
            path: &self.old_config,
        })?;
        let migrated = migrate(&bytes, self.to_version).context(MigrateConfigSnafu {
            path: &self.old_config,
            version: self.to_version,
        })?;

        match self.new_config {
            Some(path) => {
                fs::write(&path, migrated).context(WriteConfigSnafu { path: &path })?;
                info!(
                    path = %path.display(),
                    version = %self.to_version,
                    "wrote migrated configuration"
                );
                Ok(())
            }
            None => out.write_all(&migrated).context(WriteOutputSnafu),
        }
    }
}

impl PrintArguments {
    fn run(self, out: &mut impl Write) -> Result<()> {
        let defaults = marshal_to_bytes(&default_init_configuration(), self.to_version).context(
            MarshalDefaultsSnafu {
                version: self.to_version,
            },
        )?;

        out.write_all(&defaults).context(WriteOutputSnafu)
    }
}
