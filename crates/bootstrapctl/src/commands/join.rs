//! `bootstrapctl join`: the phases preparing this machine to join a cluster.

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use bootstrap_config::{bytes_to_internal, default_and_validate, internal::NodeConfiguration};
use bootstrap_phases::{data::JoinRunData, flags, join::join_runner};
use bootstrap_workflow::{PhaseState, RunOptions, Runner};
use clap::{Args, Subcommand};
use snafu::{ResultExt as _, Snafu};
use tracing::{info, instrument};

use crate::dry_run::DryRun;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to build the join workflow"))]
    BuildWorkflow { source: bootstrap_workflow::Error },

    #[snafu(display("invalid flags for the selected phases"))]
    CheckFlags { source: bootstrap_workflow::Error },

    #[snafu(display("failed to read configuration file {path:?}"))]
    ReadConfig { source: io::Error, path: PathBuf },

    #[snafu(display("failed to load configuration file {path:?}"))]
    LoadConfig {
        source: bootstrap_config::Error,
        path: PathBuf,
    },

    #[snafu(display("configuration file {path:?} does not contain a JoinConfiguration"))]
    NotJoinConfig { path: PathBuf },

    #[snafu(display("failed to run the join workflow"))]
    RunWorkflow { source: bootstrap_workflow::Error },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: io::Error },
}

#[derive(Debug, Subcommand)]
pub enum JoinCommand {
    /// List the phases of the join workflow.
    Phases,

    /// Run the join workflow, logging each side effect instead of performing
    /// it.
    Run(JoinRunArguments),
}

#[derive(Debug, Args)]
pub struct JoinRunArguments {
    /// Run only the phase at PATH and its children. Can be repeated.
    #[arg(long = "phase", value_name = "PATH")]
    pub phases: Vec<String>,

    /// Skip the phase at PATH and its children. Can be repeated.
    #[arg(long = "skip-phase", value_name = "PATH")]
    pub skip_phases: Vec<String>,

    /// Path to the configuration file.
    #[arg(long, env = "BOOTSTRAP_CONFIG", value_name = "FILE")]
    pub config: PathBuf,

    /// Key used to decrypt the shared control plane certificates.
    #[arg(long, env, value_name = "KEY", default_value = "", hide_env_values = true)]
    pub certificate_key: String,

    /// Overrides the node name of the configuration file.
    #[arg(long, value_name = "NAME")]
    pub node_name: Option<String>,
}

impl JoinCommand {
    pub fn run(self, out: &mut impl Write) -> Result<()> {
        let runner = join_runner::<JoinRunData>(DryRun::control_plane_prepare())
            .context(BuildWorkflowSnafu)?;

        match self {
            Self::Phases => writeln!(out, "{}", runner.help("join")).context(WriteOutputSnafu),
            Self::Run(arguments) => arguments.run(&runner, out),
        }
    }
}

impl JoinRunArguments {
    /// The names of the flags set on the command line.
    fn set_flags(&self) -> Vec<&'static str> {
        let mut set_flags = vec![flags::CONFIG];
        if !self.certificate_key.is_empty() {
            set_flags.push(flags::CERTIFICATE_KEY);
        }
        if self.node_name.is_some() {
            set_flags.push(flags::NODE_NAME);
        }
        set_flags
    }

    #[instrument(skip_all, fields(config = %self.config.display()))]
    fn run(self, runner: &Runner, out: &mut impl Write) -> Result<()> {
        let options = RunOptions::select(&self.phases).with_skip_phases(&self.skip_phases);
        runner
            .check_flags(&options, self.set_flags())
            .context(CheckFlagsSnafu)?;

        let bytes = fs::read(&self.config).context(ReadConfigSnafu {
            path: &self.config,
        })?;
        let mut cfg = bytes_to_internal(&bytes).context(LoadConfigSnafu {
            path: &self.config,
        })?;
        let NodeConfiguration::Join(join) = &mut cfg.node else {
            return NotJoinConfigSnafu { path: self.config }.fail();
        };
        if let Some(node_name) = self.node_name {
            join.node_registration.name = node_name;
            info!(node_name = %join.node_registration.name, "overriding the node name");
        }
        let cfg = default_and_validate(cfg).context(LoadConfigSnafu {
            path: &self.config,
        })?;

        let mut data = JoinRunData::new(cfg, self.certificate_key, Box::new(DryRun));
        let execution = runner.run(&options, &mut data).context(RunWorkflowSnafu)?;

        for (path, state) in execution.iter() {
            let state = match state {
                PhaseState::NotSelected => continue,
                PhaseState::Skipped => "skipped",
                PhaseState::Ran => "done",
            };
            writeln!(out, "[{path}] {state}").context(WriteOutputSnafu)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use indoc::indoc;
    use tempfile::TempDir;

    use super::*;

    const CONTROL_PLANE_JOIN: &str = indoc! {"
        apiVersion: kubeadm.k8s.io/v1beta1
        kind: JoinConfiguration
        controlPlane:
          localAPIEndpoint:
            advertiseAddress: 192.168.2.3
        discovery:
          bootstrapToken:
            apiServerEndpoint: 192.168.2.2:6443
            token: abcdef.0123456789abcdef
            unsafeSkipCAVerification: true
        nodeRegistration:
          name: control-plane-2
    "};

    fn arguments(dir: &TempDir, contents: &str) -> JoinRunArguments {
        let config = dir.path().join("join.yaml");
        fs::write(&config, contents).expect("config file must be writable");

        JoinRunArguments {
            phases: Vec::new(),
            skip_phases: Vec::new(),
            config,
            certificate_key: String::new(),
            node_name: None,
        }
    }

    fn run(command: JoinCommand) -> Result<String> {
        let mut out = Vec::new();
        command.run(&mut out)?;
        Ok(String::from_utf8(out).expect("output must be utf-8"))
    }

    #[test]
    fn phases_are_listed() {
        let help = run(JoinCommand::Phases).expect("phases must be listed");

        assert!(help.starts_with("The \"join\" command executes the following phases:\n```\n"));
        assert!(help.contains("control-plane-prepare"));
        assert!(help.contains("  /download-certs"));
        assert!(help.trim_end().ends_with("```"));
    }

    #[test]
    fn every_selected_phase_is_reported() {
        let dir = TempDir::new().expect("temp dir must be created");
        let arguments = JoinRunArguments {
            certificate_key: "secret-key".to_owned(),
            ..arguments(&dir, CONTROL_PLANE_JOIN)
        };

        let output = run(JoinCommand::Run(arguments)).expect("join must succeed");

        assert_eq!(
            output,
            indoc! {"
                [control-plane-prepare] done
                [control-plane-prepare/all] done
                [control-plane-prepare/download-certs] done
                [control-plane-prepare/certs] done
                [control-plane-prepare/kubeconfig] done
                [control-plane-prepare/manifests] done
            "}
        );
    }

    #[test]
    fn skipped_phases_are_not_reported() {
        let dir = TempDir::new().expect("temp dir must be created");
        let arguments = JoinRunArguments {
            phases: vec!["control-plane-prepare/all".to_owned()],
            skip_phases: vec!["control-plane-prepare/download-certs".to_owned()],
            node_name: Some("control-plane-3".to_owned()),
            ..arguments(&dir, CONTROL_PLANE_JOIN)
        };

        let output = run(JoinCommand::Run(arguments)).expect("join must succeed");

        assert!(!output.contains("download-certs"));
        assert!(output.contains("[control-plane-prepare/manifests] done"));
    }

    #[test]
    fn flags_unused_by_the_selection_are_rejected() {
        let dir = TempDir::new().expect("temp dir must be created");
        let arguments = JoinRunArguments {
            phases: vec!["control-plane-prepare/download-certs".to_owned()],
            node_name: Some("control-plane-3".to_owned()),
            ..arguments(&dir, CONTROL_PLANE_JOIN)
        };

        let err = run(JoinCommand::Run(arguments)).expect_err("node name must be rejected");

        assert!(matches!(err, Error::CheckFlags { .. }));
    }

    #[test]
    fn overridden_node_names_are_validated() {
        let dir = TempDir::new().expect("temp dir must be created");
        let arguments = JoinRunArguments {
            node_name: Some("Bad_Node Name!".to_owned()),
            ..arguments(&dir, CONTROL_PLANE_JOIN)
        };
        let mut out = Vec::new();

        let err = JoinCommand::Run(arguments)
            .run(&mut out)
            .expect_err("invalid node name must be rejected");

        let Error::LoadConfig { source, .. } = err else {
            panic!("expected a load failure, got {err:?}");
        };
        assert!(matches!(
            source,
            bootstrap_config::Error::ValidationFailure { .. }
        ));
        assert!(source_chain(&source).contains("nodeRegistration.name"));
        assert!(out.is_empty());
    }

    fn source_chain(error: &dyn std::error::Error) -> String {
        let mut chain = error.to_string();
        let mut source = error.source();
        while let Some(error) = source {
            chain.push_str(": ");
            chain.push_str(&error.to_string());
            source = error.source();
        }
        chain
    }

    #[test]
    fn init_configurations_are_rejected() {
        let dir = TempDir::new().expect("temp dir must be created");
        let arguments = arguments(
            &dir,
            indoc! {"
                apiVersion: kubeadm.k8s.io/v1beta1
                kind: InitConfiguration
                localAPIEndpoint:
                  advertiseAddress: 192.168.2.2
                nodeRegistration:
                  name: control-plane-1
            "},
        );

        let err = run(JoinCommand::Run(arguments)).expect_err("init configuration must fail");

        assert!(matches!(err, Error::NotJoinConfig { .. }));
    }

    #[test]
    fn unknown_phases_are_rejected() {
        let dir = TempDir::new().expect("temp dir must be created");
        let arguments = JoinRunArguments {
            phases: vec!["control-plane-prepare/etcd".to_owned()],
            ..arguments(&dir, CONTROL_PLANE_JOIN)
        };

        let err = run(JoinCommand::Run(arguments)).expect_err("unknown phase must fail");

        assert!(matches!(
            err,
            Error::CheckFlags {
                source: bootstrap_workflow::Error::UnknownPhase { .. }
            }
        ));
    }
}
