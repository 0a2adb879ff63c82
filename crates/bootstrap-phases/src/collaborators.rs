//! Contracts of the components phases delegate their side effects to.
//!
//! Every collaborator is invoked by exactly one phase and reports failures as
//! a [`BoxedError`], which the phase wraps with a description of the step that
//! failed.

use std::{fmt, path::Path};

use bootstrap_config::InternalConfig;
pub use bootstrap_workflow::BoxedError;

/// A client talking to the API server of the cluster being joined.
pub trait ClusterClient: fmt::Debug {
    /// The API server endpoint the client connects to.
    fn endpoint(&self) -> &str;
}

/// The credentials a joining node authenticates to the cluster with before it
/// has certificates of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapCredentials {
    /// A bootstrap token, with the API server validated against pinned CA
    /// certificate hashes.
    Token {
        api_server_endpoint: String,
        token: String,
        ca_cert_hashes: Vec<String>,
        unsafe_skip_ca_verification: bool,
    },

    /// A kubeconfig file describing the cluster, combined with the TLS
    /// bootstrap token.
    File {
        kube_config_path: String,
        tls_bootstrap_token: String,
    },
}

pub trait ClientFactory {
    fn build_client(
        &self,
        credentials: &BootstrapCredentials,
    ) -> Result<Box<dyn ClusterClient>, BoxedError>;
}

pub trait PkiAssets {
    /// Creates every certificate and key `config` requires that does not exist
    /// yet.
    fn create_pki_assets(&self, config: &InternalConfig) -> Result<(), BoxedError>;
}

pub trait KubeconfigWriter {
    /// Writes the kubeconfig files of a joining control plane node into `dir`.
    fn write_join_config_files(&self, dir: &Path, config: &InternalConfig)
    -> Result<(), BoxedError>;
}

pub trait ManifestWriter {
    /// Writes the static pod manifests of the control plane components into
    /// `dir`.
    fn write_manifests(&self, dir: &Path, config: &InternalConfig) -> Result<(), BoxedError>;
}

pub trait CertificateDownloader {
    /// Downloads the shared control plane certificates, encrypted with `key`.
    fn download_certs(
        &self,
        client: &dyn ClusterClient,
        config: &InternalConfig,
        key: &str,
    ) -> Result<(), BoxedError>;
}
