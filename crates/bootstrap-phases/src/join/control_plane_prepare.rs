use std::{path::PathBuf, rc::Rc};

use bootstrap_workflow::{Phase, PhaseError, RunData, downcast_data};
use tracing::{debug, info};

use crate::{
    collaborators::{CertificateDownloader, KubeconfigWriter, ManifestWriter, PkiAssets},
    constants::{CERTS_SECRET, KUBERNETES_DIR, STATIC_POD_MANIFESTS_DIR},
    data::{HasJoinConfig, JoinData},
    flags::{
        APISERVER_ADVERTISE_ADDRESS, APISERVER_BIND_PORT, CERTIFICATE_KEY, CONFIG, CONTROL_PLANE,
        NODE_NAME, TOKEN_DISCOVERY, TOKEN_DISCOVERY_CA_CERT_HASH, TOKEN_DISCOVERY_SKIP_CA_HASH,
    },
};

pub const CONTROL_PLANE_PREPARE_PHASE: &str = "control-plane-prepare";

const CONTROL_PLANE_PREPARE_FLAGS: &[&str] = &[
    APISERVER_ADVERTISE_ADDRESS,
    APISERVER_BIND_PORT,
    CONFIG,
    CONTROL_PLANE,
    NODE_NAME,
    TOKEN_DISCOVERY,
    TOKEN_DISCOVERY_CA_CERT_HASH,
    TOKEN_DISCOVERY_SKIP_CA_HASH,
    CERTIFICATE_KEY,
];

/// Prepares a joining node to serve a control plane: downloads the shared
/// certificates, then generates the remaining certificates, kubeconfig files
/// and static pod manifests.
///
/// Every sub phase succeeds without doing anything when the node joins as a
/// worker.
pub struct ControlPlanePrepare {
    pki: Rc<dyn PkiAssets>,
    kubeconfig: Rc<dyn KubeconfigWriter>,
    manifests: Rc<dyn ManifestWriter>,
    certificates: Rc<dyn CertificateDownloader>,
    kubernetes_dir: PathBuf,
    manifests_dir: PathBuf,
}

impl ControlPlanePrepare {
    pub fn new(
        pki: Rc<dyn PkiAssets>,
        kubeconfig: Rc<dyn KubeconfigWriter>,
        manifests: Rc<dyn ManifestWriter>,
        certificates: Rc<dyn CertificateDownloader>,
    ) -> Self {
        Self {
            pki,
            kubeconfig,
            manifests,
            certificates,
            kubernetes_dir: PathBuf::from(KUBERNETES_DIR),
            manifests_dir: PathBuf::from(STATIC_POD_MANIFESTS_DIR),
        }
    }

    pub fn with_kubernetes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.kubernetes_dir = dir.into();
        self
    }

    pub fn with_manifests_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.manifests_dir = dir.into();
        self
    }

    /// Builds the phase tree for the run context `D`.
    pub fn into_phase<D: JoinData + 'static>(self) -> Phase {
        Phase::new(CONTROL_PLANE_PREPARE_PHASE)
            .with_short("Prepares the machine for serving a control plane.")
            .with_children([
                Phase::new("all")
                    .with_short("Prepares the machine for serving a control plane.")
                    .with_inherit_flags(CONTROL_PLANE_PREPARE_FLAGS.iter().copied())
                    .with_run_all_siblings(),
                download_certs_phase::<D>(self.certificates),
                certs_phase::<D>(self.pki),
                kubeconfig_phase::<D>(self.kubeconfig, self.kubernetes_dir),
                manifests_phase::<D>(self.manifests, self.manifests_dir),
            ])
    }
}

fn download_certs_phase<D: JoinData + 'static>(
    certificates: Rc<dyn CertificateDownloader>,
) -> Phase {
    Phase::new("download-certs")
        .with_short(format!("Download certificates from {CERTS_SECRET}"))
        .with_long(
            "Download the shared control plane certificates and keys, encrypted with the \
             certificate key.",
        )
        .with_inherit_flags([CONFIG, CERTIFICATE_KEY])
        .with_run(move |data: &mut dyn RunData| {
            let data = downcast_data::<D>(data)?;

            if !data.is_control_plane() || data.certificate_key().is_empty() {
                debug!("skipping certs download");
                return Ok(());
            }

            let cfg = data.init_cfg().map_err(|error| {
                PhaseError::failed("unable to derive the init configuration", error)
            })?;
            let client = data
                .bootstrap_client()
                .map_err(|error| PhaseError::failed("unable to access the cluster", error))?;

            certificates
                .download_certs(client, cfg, data.certificate_key())
                .map_err(|error| PhaseError::failed("error downloading certs", error))
        })
}

fn certs_phase<D: HasJoinConfig + 'static>(pki: Rc<dyn PkiAssets>) -> Phase {
    Phase::new("certs")
        .with_short("Generates the certificates for the new control plane components")
        .with_inherit_flags(CONTROL_PLANE_PREPARE_FLAGS.iter().copied())
        .with_run(move |data: &mut dyn RunData| {
            let Some(cfg) = control_plane_init_cfg::<D>(data)? else {
                return Ok(());
            };

            pki.create_pki_assets(cfg)
                .map_err(|error| PhaseError::failed("error creating PKI assets", error))
        })
}

fn kubeconfig_phase<D: HasJoinConfig + 'static>(
    kubeconfig: Rc<dyn KubeconfigWriter>,
    dir: PathBuf,
) -> Phase {
    Phase::new("kubeconfig")
        .with_short("Generates the kubeconfig for the new control plane components")
        .with_inherit_flags(CONTROL_PLANE_PREPARE_FLAGS.iter().copied())
        .with_run(move |data: &mut dyn RunData| {
            let Some(cfg) = control_plane_init_cfg::<D>(data)? else {
                return Ok(());
            };

            info!(dir = %dir.display(), "generating kubeconfig files");
            kubeconfig
                .write_join_config_files(&dir, cfg)
                .map_err(|error| {
                    PhaseError::failed("error generating kubeconfig files", error)
                })
        })
}

fn manifests_phase<D: HasJoinConfig + 'static>(
    manifests: Rc<dyn ManifestWriter>,
    dir: PathBuf,
) -> Phase {
    Phase::new("manifests")
        .with_short("Generates the manifests for the new control plane components")
        .with_inherit_flags(CONTROL_PLANE_PREPARE_FLAGS.iter().copied())
        .with_run(move |data: &mut dyn RunData| {
            let Some(cfg) = control_plane_init_cfg::<D>(data)? else {
                return Ok(());
            };

            manifests
                .write_manifests(&dir, cfg)
                .map_err(|error| {
                    PhaseError::failed("error generating static pod manifests", error)
                })
        })
}

/// Returns the init-shaped configuration, or [`None`] if the node joins as a
/// worker and the phase has nothing to do.
fn control_plane_init_cfg<D: HasJoinConfig + 'static>(
    data: &dyn RunData,
) -> Result<Option<&bootstrap_config::InternalConfig>, PhaseError> {
    let data = downcast_data::<D>(data)?;

    if !data.is_control_plane() {
        debug!("not a control plane node, skipping");
        return Ok(None);
    }

    data.init_cfg()
        .map(Some)
        .map_err(|error| PhaseError::failed("unable to derive the init configuration", error))
}
