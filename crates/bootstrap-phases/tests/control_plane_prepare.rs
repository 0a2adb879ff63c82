use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    path::Path,
    rc::Rc,
};

use bootstrap_config::{InternalConfig, load_from_bytes};
use bootstrap_phases::{
    collaborators::{
        BootstrapCredentials, BoxedError, CertificateDownloader, ClientFactory, ClusterClient,
        KubeconfigWriter, ManifestWriter, PkiAssets,
    },
    data::JoinRunData,
    flags,
    join::{ControlPlanePrepare, join_runner},
};
use bootstrap_workflow::{Error, PhaseState, RunOptions, Runner};
use indoc::indoc;
use rstest::rstest;

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

const WORKER_JOIN: &str = indoc! {"
    apiVersion: kubeadm.k8s.io/v1beta1
    kind: JoinConfiguration
    discovery:
      bootstrapToken:
        apiServerEndpoint: 192.168.2.2:6443
        token: abcdef.0123456789abcdef
        unsafeSkipCAVerification: true
    nodeRegistration:
      name: worker-1
"};

type Calls = Rc<RefCell<Vec<String>>>;

#[derive(Debug)]
struct FakeClient(String);

impl ClusterClient for FakeClient {
    fn endpoint(&self) -> &str {
        &self.0
    }
}

struct FakeClientFactory {
    builds: Rc<Cell<usize>>,
}

impl ClientFactory for FakeClientFactory {
    fn build_client(
        &self,
        credentials: &BootstrapCredentials,
    ) -> Result<Box<dyn ClusterClient>, BoxedError> {
        self.builds.set(self.builds.get() + 1);
        match credentials {
            BootstrapCredentials::Token {
                api_server_endpoint,
                ..
            } => Ok(Box::new(FakeClient(api_server_endpoint.clone()))),
            BootstrapCredentials::File { .. } => Err("unexpected file discovery".into()),
        }
    }
}

/// Records every call it receives, failing the ones named in `failing`.
struct Recorder {
    calls: Calls,
    failing: Option<&'static str>,
}

impl Recorder {
    fn record(&self, call: &'static str, detail: String) -> Result<(), BoxedError> {
        if self.failing == Some(call) {
            return Err(format!("{call} is broken").into());
        }
        self.calls.borrow_mut().push(format!("{call} {detail}"));
        Ok(())
    }
}

impl PkiAssets for Recorder {
    fn create_pki_assets(&self, config: &InternalConfig) -> Result<(), BoxedError> {
        let name = &config.node_registration().name;
        self.record("certs", name.clone())
    }
}

impl KubeconfigWriter for Recorder {
    fn write_join_config_files(
        &self,
        dir: &Path,
        _config: &InternalConfig,
    ) -> Result<(), BoxedError> {
        self.record("kubeconfig", dir.display().to_string())
    }
}

impl ManifestWriter for Recorder {
    fn write_manifests(&self, dir: &Path, _config: &InternalConfig) -> Result<(), BoxedError> {
        self.record("manifests", dir.display().to_string())
    }
}

impl CertificateDownloader for Recorder {
    fn download_certs(
        &self,
        client: &dyn ClusterClient,
        _config: &InternalConfig,
        key: &str,
    ) -> Result<(), BoxedError> {
        self.record("download-certs", format!("{} {key}", client.endpoint()))
    }
}

struct Harness {
    runner: Runner,
    calls: Calls,
    builds: Rc<Cell<usize>>,
}

impl Harness {
    fn new(failing: Option<&'static str>) -> Self {
        let calls = Calls::default();
        let recorder = Rc::new(Recorder {
            calls: calls.clone(),
            failing,
        });
        let runner = join_runner::<JoinRunData>(ControlPlanePrepare::new(
            recorder.clone(),
            recorder.clone(),
            recorder.clone(),
            recorder,
        ))
        .expect("join phase tree must be valid");

        Self {
            runner,
            calls,
            builds: Rc::default(),
        }
    }

    fn data(&self, config: &str, certificate_key: &str) -> JoinRunData {
        let cfg = load_from_bytes(config.as_bytes()).expect("join configuration must load");
        JoinRunData::new(
            cfg,
            certificate_key,
            Box::new(FakeClientFactory {
                builds: self.builds.clone(),
            }),
        )
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[test]
fn workers_skip_every_step() {
    let harness = Harness::new(None);
    let mut data = harness.data(WORKER_JOIN, "secret-key");

    let execution = harness
        .runner
        .run(&RunOptions::select(["control-plane-prepare/all"]), &mut data)
        .expect("worker run must succeed");

    assert!(harness.calls().is_empty());
    assert_eq!(harness.builds.get(), 0);
    assert_eq!(
        execution.state("control-plane-prepare/manifests"),
        Some(PhaseState::Ran)
    );
}

#[test]
fn certs_are_not_downloaded_without_a_certificate_key() {
    let harness = Harness::new(None);
    let mut data = harness.data(CONTROL_PLANE_JOIN, "");

    harness
        .runner
        .run(&RunOptions::default(), &mut data)
        .expect("control plane run must succeed");

    assert_eq!(harness.calls(), [
        "certs control-plane-2",
        "kubeconfig /etc/kubernetes",
        "manifests /etc/kubernetes/manifests",
    ]);
    assert_eq!(harness.builds.get(), 0);
}

#[test]
fn certs_are_downloaded_with_the_bootstrap_client() {
    let harness = Harness::new(None);
    let mut data = harness.data(CONTROL_PLANE_JOIN, "secret-key");

    harness
        .runner
        .run(&RunOptions::select(["control-plane-prepare"]), &mut data)
        .expect("control plane run must succeed");

    assert_eq!(harness.calls(), [
        "download-certs 192.168.2.2:6443 secret-key",
        "certs control-plane-2",
        "kubeconfig /etc/kubernetes",
        "manifests /etc/kubernetes/manifests",
    ]);
    assert_eq!(harness.builds.get(), 1);
}

#[test]
fn single_phases_can_be_selected_and_skipped() {
    let harness = Harness::new(None);
    let mut data = harness.data(CONTROL_PLANE_JOIN, "secret-key");

    let options = RunOptions::select(["control-plane-prepare/all"])
        .with_skip_phases(["control-plane-prepare/download-certs", "control-plane-prepare/certs"]);
    harness
        .runner
        .run(&options, &mut data)
        .expect("control plane run must succeed");

    assert_eq!(harness.calls(), [
        "kubeconfig /etc/kubernetes",
        "manifests /etc/kubernetes/manifests",
    ]);
}

#[test]
fn output_directories_can_be_overridden() {
    let calls = Calls::default();
    let recorder = Rc::new(Recorder {
        calls: calls.clone(),
        failing: None,
    });
    let runner = join_runner::<JoinRunData>(
        ControlPlanePrepare::new(recorder.clone(), recorder.clone(), recorder.clone(), recorder)
            .with_kubernetes_dir("/tmp/kubernetes")
            .with_manifests_dir("/tmp/manifests"),
    )
    .expect("join phase tree must be valid");
    let mut data = Harness::new(None).data(CONTROL_PLANE_JOIN, "");

    runner
        .run(
            &RunOptions::select([
                "control-plane-prepare/kubeconfig",
                "control-plane-prepare/manifests",
            ]),
            &mut data,
        )
        .expect("control plane run must succeed");

    assert_eq!(*calls.borrow(), [
        "kubeconfig /tmp/kubernetes",
        "manifests /tmp/manifests",
    ]);
}

#[rstest]
#[case::download("download-certs", "control-plane-prepare/download-certs", 0)]
#[case::certs("certs", "control-plane-prepare/certs", 1)]
#[case::kubeconfig("kubeconfig", "control-plane-prepare/kubeconfig", 2)]
#[case::manifests("manifests", "control-plane-prepare/manifests", 3)]
fn failures_stop_the_run(
    #[case] failing: &'static str,
    #[case] failed_phase: &str,
    #[case] completed_calls: usize,
) {
    let harness = Harness::new(Some(failing));
    let mut data = harness.data(CONTROL_PLANE_JOIN, "secret-key");

    let err = harness
        .runner
        .run(&RunOptions::default(), &mut data)
        .expect_err("broken collaborator must fail the run");

    let Error::PhaseExecutionFailure { phase, source } = &err else {
        panic!("expected a phase failure, got {err:?}");
    };
    assert_eq!(phase, failed_phase);
    assert!(!err.is_invalid_context());
    assert!(
        std::error::Error::source(source)
            .is_some_and(|cause| cause.to_string() == format!("{failing} is broken"))
    );
    assert_eq!(harness.calls().len(), completed_calls);
}

#[test]
fn foreign_run_data_is_rejected() {
    let harness = Harness::new(None);
    let mut data = String::from("not join data");

    let err = harness
        .runner
        .run(&RunOptions::default(), &mut data)
        .expect_err("foreign run data must be rejected");

    assert!(err.is_invalid_context());
    assert!(harness.calls().is_empty());
}

#[rstest]
#[case::download("control-plane-prepare/download-certs", &[flags::CONFIG, flags::CERTIFICATE_KEY])]
#[case::certs("control-plane-prepare/certs", &[
    flags::APISERVER_ADVERTISE_ADDRESS,
    flags::APISERVER_BIND_PORT,
    flags::CONFIG,
    flags::CONTROL_PLANE,
    flags::NODE_NAME,
    flags::TOKEN_DISCOVERY,
    flags::TOKEN_DISCOVERY_CA_CERT_HASH,
    flags::TOKEN_DISCOVERY_SKIP_CA_HASH,
    flags::CERTIFICATE_KEY,
])]
#[case::parent("control-plane-prepare", &[])]
fn phases_declare_their_flags(#[case] path: &str, #[case] expected: &[&str]) {
    let harness = Harness::new(None);

    let flags = harness
        .runner
        .effective_flags(path)
        .expect("phase must exist");

    assert_eq!(flags, expected.iter().copied().collect::<BTreeSet<_>>());
}

#[test]
fn the_node_name_flag_is_rejected_for_the_download_alone() {
    let harness = Harness::new(None);

    harness
        .runner
        .check_flags(
            &RunOptions::select(["control-plane-prepare/download-certs"]),
            [flags::CERTIFICATE_KEY],
        )
        .expect("certificate key is used by the download");
    let err = harness
        .runner
        .check_flags(
            &RunOptions::select(["control-plane-prepare/download-certs"]),
            [flags::NODE_NAME],
        )
        .expect_err("node name is not used by the download");

    assert!(matches!(err, Error::UnsupportedFlag { flag } if flag == flags::NODE_NAME));
}

#[test]
fn phases_are_listed_in_order() {
    let harness = Harness::new(None);

    assert_eq!(harness.runner.phase_paths(), [
        "control-plane-prepare",
        "control-plane-prepare/all",
        "control-plane-prepare/download-certs",
        "control-plane-prepare/certs",
        "control-plane-prepare/kubeconfig",
        "control-plane-prepare/manifests",
    ]);
}
