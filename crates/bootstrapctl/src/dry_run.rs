//! Collaborators which log the side effects of the join phases instead of
//! performing them.

use std::{path::Path, rc::Rc};

use bootstrap_config::InternalConfig;
use bootstrap_phases::{
    collaborators::{
        BootstrapCredentials, BoxedError, CertificateDownloader, ClientFactory, ClusterClient,
        KubeconfigWriter, ManifestWriter, PkiAssets,
    },
    join::ControlPlanePrepare,
};
use tracing::info;

#[derive(Debug)]
pub struct DryRunClient {
    endpoint: String,
}

impl ClusterClient for DryRunClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DryRun;

impl DryRun {
    /// Wires the dry run collaborators into the control plane preparation.
    pub fn control_plane_prepare() -> ControlPlanePrepare {
        let dry_run = Rc::new(Self);
        ControlPlanePrepare::new(dry_run.clone(), dry_run.clone(), dry_run.clone(), dry_run)
    }
}

impl ClientFactory for DryRun {
    fn build_client(
        &self,
        credentials: &BootstrapCredentials,
    ) -> Result<Box<dyn ClusterClient>, BoxedError> {
        let endpoint = match credentials {
            BootstrapCredentials::Token {
                api_server_endpoint,
                unsafe_skip_ca_verification,
                ..
            } => {
                info!(
                    endpoint = %api_server_endpoint,
                    skip_ca_verification = *unsafe_skip_ca_verification,
                    "[dry-run] would authenticate with the bootstrap token"
                );
                api_server_endpoint.clone()
            }
            BootstrapCredentials::File {
                kube_config_path, ..
            } => {
                info!(
                    path = %kube_config_path,
                    "[dry-run] would authenticate with the discovery kubeconfig file"
                );
                kube_config_path.clone()
            }
        };

        Ok(Box::new(DryRunClient { endpoint }))
    }
}

impl PkiAssets for DryRun {
    fn create_pki_assets(&self, config: &InternalConfig) -> Result<(), BoxedError> {
        info!(
            dir = %config.cluster.certificates_dir,
            "[dry-run] would create the missing certificates and keys"
        );
        Ok(())
    }
}

impl KubeconfigWriter for DryRun {
    fn write_join_config_files(
        &self,
        dir: &Path,
        config: &InternalConfig,
    ) -> Result<(), BoxedError> {
        info!(
            dir = %dir.display(),
            node = %config.node_registration().name,
            "[dry-run] would write the kubeconfig files"
        );
        Ok(())
    }
}

impl ManifestWriter for DryRun {
    fn write_manifests(&self, dir: &Path, config: &InternalConfig) -> Result<(), BoxedError> {
        info!(
            dir = %dir.display(),
            kubernetes_version = %config.cluster.kubernetes_version,
            "[dry-run] would write the static pod manifests"
        );
        Ok(())
    }
}

impl CertificateDownloader for DryRun {
    fn download_certs(
        &self,
        client: &dyn ClusterClient,
        _config: &InternalConfig,
        _key: &str,
    ) -> Result<(), BoxedError> {
        info!(
            endpoint = client.endpoint(),
            "[dry-run] would download the shared control plane certificates"
        );
        Ok(())
    }
}
