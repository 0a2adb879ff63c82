//! Capabilities phases require from the run context, and the concrete context
//! of the join workflow.
//!
//! Each phase only asks for the capabilities it uses. The workflow runner hands
//! phases an opaque [`RunData`](bootstrap_workflow::RunData), phases recover
//! the context type they were built for and fail with an invalid context error
//! otherwise.

use std::{cell::OnceCell, fmt};

use bootstrap_config::InternalConfig;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::collaborators::{BootstrapCredentials, BoxedError, ClientFactory, ClusterClient};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("the configuration does not describe a joining node"))]
    NotJoining,

    #[snafu(display("the joining node is not a control plane node"))]
    NotControlPlane,

    #[snafu(display("the join configuration has no discovery settings"))]
    MissingDiscovery,

    #[snafu(display("failed to build the bootstrap client"))]
    BuildClient { source: BoxedError },
}

/// Access to the loaded join configuration.
pub trait HasJoinConfig {
    /// The configuration as loaded, defaulted and validated.
    fn cfg(&self) -> &InternalConfig;

    /// The init-shaped configuration a joining control plane node generates
    /// its certificates, kubeconfig files and manifests from.
    fn init_cfg(&self) -> Result<&InternalConfig>;

    /// Whether the node joins as an additional control plane node.
    fn is_control_plane(&self) -> bool {
        self.cfg()
            .join()
            .is_some_and(|join| join.control_plane.is_some())
    }
}

pub trait HasCertificateKey {
    /// The key the shared control plane certificates are encrypted with. Empty
    /// if none was given.
    fn certificate_key(&self) -> &str;
}

pub trait HasBootstrapClient {
    /// Returns the client authenticated with the bootstrap credentials,
    /// building it on first use.
    fn bootstrap_client(&self) -> Result<&dyn ClusterClient>;
}

/// Everything the join phases need.
pub trait JoinData: HasJoinConfig + HasCertificateKey + HasBootstrapClient {}

impl<T: HasJoinConfig + HasCertificateKey + HasBootstrapClient> JoinData for T {}

/// The run context of the join workflow.
///
/// The init-shaped configuration and the bootstrap client are derived lazily,
/// at most once per run.
pub struct JoinRunData {
    cfg: InternalConfig,
    certificate_key: String,
    client_factory: Box<dyn ClientFactory>,
    init_cfg: OnceCell<InternalConfig>,
    client: OnceCell<Box<dyn ClusterClient>>,
}

impl JoinRunData {
    pub fn new(
        cfg: InternalConfig,
        certificate_key: impl Into<String>,
        client_factory: Box<dyn ClientFactory>,
    ) -> Self {
        Self {
            cfg,
            certificate_key: certificate_key.into(),
            client_factory,
            init_cfg: OnceCell::new(),
            client: OnceCell::new(),
        }
    }

    /// The credentials described by the discovery settings.
    pub fn bootstrap_credentials(&self) -> Result<BootstrapCredentials> {
        let join = self.cfg.join().context(NotJoiningSnafu)?;
        let discovery = &join.discovery;

        if let Some(bootstrap_token) = &discovery.bootstrap_token {
            return Ok(BootstrapCredentials::Token {
                api_server_endpoint: bootstrap_token.api_server_endpoint.clone(),
                token: bootstrap_token.token.clone(),
                ca_cert_hashes: bootstrap_token.ca_cert_hashes.clone(),
                unsafe_skip_ca_verification: bootstrap_token.unsafe_skip_ca_verification,
            });
        }

        let file = discovery.file.as_ref().context(MissingDiscoverySnafu)?;
        Ok(BootstrapCredentials::File {
            kube_config_path: file.kube_config_path.clone(),
            tls_bootstrap_token: discovery.tls_bootstrap_token.clone(),
        })
    }
}

impl fmt::Debug for JoinRunData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinRunData")
            .field("cfg", &self.cfg)
            .field("certificate_key", &"<redacted>")
            .field("init_cfg", &self.init_cfg)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl HasJoinConfig for JoinRunData {
    fn cfg(&self) -> &InternalConfig {
        &self.cfg
    }

    fn init_cfg(&self) -> Result<&InternalConfig> {
        if let Some(init_cfg) = self.init_cfg.get() {
            return Ok(init_cfg);
        }

        self.cfg.join().context(NotJoiningSnafu)?;
        let init_cfg = self.cfg.join_as_init().context(NotControlPlaneSnafu)?;
        debug!("derived the init configuration of the joining control plane node");

        Ok(self.init_cfg.get_or_init(|| init_cfg))
    }
}

impl HasCertificateKey for JoinRunData {
    fn certificate_key(&self) -> &str {
        &self.certificate_key
    }
}

impl HasBootstrapClient for JoinRunData {
    fn bootstrap_client(&self) -> Result<&dyn ClusterClient> {
        if let Some(client) = self.client.get() {
            return Ok(client.as_ref());
        }

        let credentials = self.bootstrap_credentials()?;
        let client = self
            .client_factory
            .build_client(&credentials)
            .context(BuildClientSnafu)?;
        debug!(endpoint = client.endpoint(), "built the bootstrap client");

        Ok(self.client.get_or_init(|| client).as_ref())
    }
}
