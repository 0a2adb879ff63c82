use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    common::{
        ApiEndpoint, BootstrapToken, ExternalEtcd, Networking, NodeRegistrationOptions, is_false,
    },
    constants::DNS_ADDON_COREDNS,
    conversion::{
        ConversionError, MultipleDiscoveryServersSnafu, RemovedAuditPolicySnafu,
        UnsupportedUnifiedImageSnafu, hyperkube_image, is_hyperkube_image, join_etcd_image,
        split_etcd_image,
    },
    duration::Duration,
    internal,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct InitConfiguration {
    pub api_endpoint: ApiEndpoint,
    pub api_version: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bootstrap_tokens: Vec<BootstrapToken>,

    pub kind: String,
    pub node_registration: NodeRegistrationOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterConfiguration {
    #[serde(rename = "apiServerCertSANs", skip_serializing_if = "Vec::is_empty")]
    pub api_server_cert_sans: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub api_server_extra_args: BTreeMap<String, String>,

    pub api_version: String,

    #[serde(skip_serializing_if = "AuditPolicy::is_empty")]
    pub audit_policy: AuditPolicy,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificates_dir: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub control_plane_endpoint: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub controller_manager_extra_args: BTreeMap<String, String>,

    pub etcd: Etcd,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_repository: String,

    pub kind: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub kubernetes_version: String,

    pub networking: Networking,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scheduler_extra_args: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub unified_control_plane_image: String,
}

/// Audit settings, removed after this version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AuditPolicy {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_dir: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_max_age: Option<i32>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl AuditPolicy {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Etcd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalEtcd>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalEtcd>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LocalEtcd {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_dir: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,

    /// The full image reference, e.g. `k8s.gcr.io/etcd:3.2.24`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(rename = "peerCertSANs", skip_serializing_if = "Vec::is_empty")]
    pub peer_cert_sans: Vec<String>,

    #[serde(rename = "serverCertSANs", skip_serializing_if = "Vec::is_empty")]
    pub server_cert_sans: Vec<String>,
}

/// A join configuration with flat discovery settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<ApiEndpoint>,

    pub api_version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_cert_path: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,

    #[serde(skip_serializing_if = "is_false")]
    pub control_plane: bool,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub discovery_file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_timeout: Option<Duration>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub discovery_token: String,

    #[serde(rename = "discoveryTokenAPIServers", skip_serializing_if = "Vec::is_empty")]
    pub discovery_token_api_servers: Vec<String>,

    #[serde(
        rename = "discoveryTokenCACertHashes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub discovery_token_ca_cert_hashes: Vec<String>,

    #[serde(
        rename = "discoveryTokenUnsafeSkipCAVerification",
        skip_serializing_if = "is_false"
    )]
    pub discovery_token_unsafe_skip_ca_verification: bool,

    pub kind: String,
    pub node_registration: NodeRegistrationOptions,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub tls_bootstrap_token: String,

    /// Used for both discovery and TLS bootstrap unless these are set
    /// individually.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl From<InitConfiguration> for internal::InitConfiguration {
    fn from(value: InitConfiguration) -> Self {
        Self {
            bootstrap_tokens: value.bootstrap_tokens.into_iter().map(Into::into).collect(),
            node_registration: value.node_registration.into(),
            local_api_endpoint: value.api_endpoint.into(),
        }
    }
}

impl From<&internal::InitConfiguration> for InitConfiguration {
    fn from(value: &internal::InitConfiguration) -> Self {
        Self {
            api_endpoint: (&value.local_api_endpoint).into(),
            api_version: String::new(),
            bootstrap_tokens: value.bootstrap_tokens.iter().map(Into::into).collect(),
            kind: String::new(),
            node_registration: (&value.node_registration).into(),
        }
    }
}

impl TryFrom<ClusterConfiguration> for internal::ClusterConfiguration {
    type Error = ConversionError;

    fn try_from(value: ClusterConfiguration) -> Result<Self, Self::Error> {
        let audit_policy = value.audit_policy;
        if !audit_policy.path.is_empty() {
            return RemovedAuditPolicySnafu {
                path: audit_policy.path,
            }
            .fail();
        }
        if !audit_policy.is_empty() {
            warn!(
                log_dir = %audit_policy.log_dir,
                log_max_age = ?audit_policy.log_max_age,
                "dropping the removed auditPolicy settings"
            );
        }

        let use_hyperkube_image = match value.unified_control_plane_image.as_str() {
            "" => false,
            image if is_hyperkube_image(image) => true,
            image => return UnsupportedUnifiedImageSnafu { image }.fail(),
        };

        let local = match value.etcd.local {
            Some(local) => {
                let (image_repository, image_tag) = if local.image.is_empty() {
                    (String::new(), String::new())
                } else {
                    split_etcd_image(&local.image)?
                };

                Some(internal::LocalEtcd {
                    image_repository,
                    image_tag,
                    data_dir: local.data_dir,
                    extra_args: local.extra_args,
                    server_cert_sans: local.server_cert_sans,
                    peer_cert_sans: local.peer_cert_sans,
                })
            }
            None => None,
        };

        Ok(Self {
            etcd: internal::Etcd {
                local,
                external: value.etcd.external.map(Into::into),
            },
            networking: value.networking.into(),
            kubernetes_version: value.kubernetes_version,
            control_plane_endpoint: value.control_plane_endpoint,
            api_server: internal::ApiServer {
                extra_args: value.api_server_extra_args,
                cert_sans: value.api_server_cert_sans,
                timeout_for_control_plane: None,
            },
            controller_manager: internal::ControlPlaneComponent {
                extra_args: value.controller_manager_extra_args,
            },
            scheduler: internal::ControlPlaneComponent {
                extra_args: value.scheduler_extra_args,
            },
            dns: internal::Dns::default(),
            certificates_dir: value.certificates_dir,
            image_repository: value.image_repository,
            use_hyperkube_image,
            feature_gates: value.feature_gates,
            cluster_name: value.cluster_name,
        })
    }
}

impl TryFrom<&internal::ClusterConfiguration> for ClusterConfiguration {
    type Error = ConversionError;

    fn try_from(value: &internal::ClusterConfiguration) -> Result<Self, Self::Error> {
        if !value.dns.dns_type.is_empty() && value.dns.dns_type != DNS_ADDON_COREDNS {
            debug!(
                dns_type = %value.dns.dns_type,
                "dropping the DNS addon type, it cannot be expressed in v1alpha3"
            );
        }
        if let Some(timeout) = value.api_server.timeout_for_control_plane {
            debug!(
                %timeout,
                "dropping the control plane timeout, it cannot be expressed in v1alpha3"
            );
        }

        let local = match &value.etcd.local {
            Some(local) => Some(LocalEtcd {
                data_dir: local.data_dir.clone(),
                extra_args: local.extra_args.clone(),
                image: join_etcd_image(&local.image_repository, &local.image_tag)?
                    .unwrap_or_default(),
                peer_cert_sans: local.peer_cert_sans.clone(),
                server_cert_sans: local.server_cert_sans.clone(),
            }),
            None => None,
        };

        let unified_control_plane_image = if value.use_hyperkube_image {
            hyperkube_image(&value.image_repository, &value.kubernetes_version)
        } else {
            String::new()
        };

        Ok(Self {
            api_server_cert_sans: value.api_server.cert_sans.clone(),
            api_server_extra_args: value.api_server.extra_args.clone(),
            api_version: String::new(),
            audit_policy: AuditPolicy::default(),
            certificates_dir: value.certificates_dir.clone(),
            cluster_name: value.cluster_name.clone(),
            control_plane_endpoint: value.control_plane_endpoint.clone(),
            controller_manager_extra_args: value.controller_manager.extra_args.clone(),
            etcd: Etcd {
                external: value.etcd.external.as_ref().map(Into::into),
                local,
            },
            feature_gates: value.feature_gates.clone(),
            image_repository: value.image_repository.clone(),
            kind: String::new(),
            kubernetes_version: value.kubernetes_version.clone(),
            networking: (&value.networking).into(),
            scheduler_extra_args: value.scheduler.extra_args.clone(),
            unified_control_plane_image,
        })
    }
}

impl TryFrom<JoinConfiguration> for internal::JoinConfiguration {
    type Error = ConversionError;

    fn try_from(value: JoinConfiguration) -> Result<Self, Self::Error> {
        if !value.cluster_name.is_empty() {
            warn!(
                cluster_name = %value.cluster_name,
                "dropping clusterName from the join configuration, it is taken from the cluster"
            );
        }

        let mut servers = value.discovery_token_api_servers;
        if servers.len() > 1 {
            return MultipleDiscoveryServersSnafu {
                count: servers.len(),
                servers,
            }
            .fail();
        }
        let api_server_endpoint = servers.pop().unwrap_or_default();

        let tls_bootstrap_token = if value.tls_bootstrap_token.is_empty() {
            value.token.clone()
        } else {
            value.tls_bootstrap_token
        };

        // File discovery takes precedence, the token settings only describe
        // token discovery.
        let (bootstrap_token, file) = if value.discovery_file.is_empty() {
            let discovery_token = if value.discovery_token.is_empty() {
                value.token
            } else {
                value.discovery_token
            };
            let bootstrap_token = (!discovery_token.is_empty() || !api_server_endpoint.is_empty())
                .then(|| internal::BootstrapTokenDiscovery {
                    token: discovery_token,
                    api_server_endpoint,
                    ca_cert_hashes: value.discovery_token_ca_cert_hashes,
                    unsafe_skip_ca_verification: value.discovery_token_unsafe_skip_ca_verification,
                });
            (bootstrap_token, None)
        } else {
            if !value.discovery_token.is_empty() || !api_server_endpoint.is_empty() {
                debug!(
                    discovery_file = %value.discovery_file,
                    "ignoring the token discovery settings in favor of file discovery"
                );
            }
            let file = internal::FileDiscovery {
                kube_config_path: value.discovery_file,
            };
            (None, Some(file))
        };

        let control_plane = value.control_plane.then(|| internal::JoinControlPlane {
            local_api_endpoint: value.api_endpoint.unwrap_or_default().into(),
        });

        Ok(Self {
            node_registration: value.node_registration.into(),
            ca_cert_path: value.ca_cert_path,
            discovery: internal::Discovery {
                bootstrap_token,
                file,
                tls_bootstrap_token,
                timeout: value.discovery_timeout,
            },
            control_plane,
        })
    }
}

impl From<&internal::JoinConfiguration> for JoinConfiguration {
    fn from(value: &internal::JoinConfiguration) -> Self {
        let discovery = &value.discovery;
        let bootstrap_token = discovery.bootstrap_token.clone().unwrap_or_default();

        Self {
            api_endpoint: value
                .control_plane
                .as_ref()
                .map(|control_plane| (&control_plane.local_api_endpoint).into()),
            api_version: String::new(),
            ca_cert_path: value.ca_cert_path.clone(),
            cluster_name: String::new(),
            control_plane: value.control_plane.is_some(),
            discovery_file: discovery
                .file
                .as_ref()
                .map(|file| file.kube_config_path.clone())
                .unwrap_or_default(),
            discovery_timeout: discovery.timeout,
            discovery_token: bootstrap_token.token,
            discovery_token_api_servers: if bootstrap_token.api_server_endpoint.is_empty() {
                Vec::new()
            } else {
                vec![bootstrap_token.api_server_endpoint]
            },
            discovery_token_ca_cert_hashes: bootstrap_token.ca_cert_hashes,
            discovery_token_unsafe_skip_ca_verification: bootstrap_token
                .unsafe_skip_ca_verification,
            kind: String::new(),
            node_registration: (&value.node_registration).into(),
            tls_bootstrap_token: discovery.tls_bootstrap_token.clone(),
            token: String::new(),
        }
    }
}
