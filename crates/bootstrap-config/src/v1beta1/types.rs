use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    common::{
        ApiEndpoint, BootstrapToken, ExternalEtcd, Networking, NodeRegistrationOptions, is_false,
    },
    duration::Duration,
    internal,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct InitConfiguration {
    pub api_version: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bootstrap_tokens: Vec<BootstrapToken>,

    pub kind: String,

    #[serde(rename = "localAPIEndpoint")]
    pub local_api_endpoint: ApiEndpoint,

    pub node_registration: NodeRegistrationOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterConfiguration {
    pub api_server: ApiServer,
    pub api_version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificates_dir: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub control_plane_endpoint: String,

    pub controller_manager: ControlPlaneComponent,
    pub dns: Dns,
    pub etcd: Etcd,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_repository: String,

    pub kind: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub kubernetes_version: String,

    pub networking: Networking,
    pub scheduler: ControlPlaneComponent,

    #[serde(skip_serializing_if = "is_false")]
    pub use_hyper_kube_image: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiServer {
    #[serde(rename = "certSANs", skip_serializing_if = "Vec::is_empty")]
    pub cert_sans: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_for_control_plane: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ControlPlaneComponent {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_args: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dns {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub dns_type: String,
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

    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_repository: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_tag: String,

    #[serde(rename = "peerCertSANs", skip_serializing_if = "Vec::is_empty")]
    pub peer_cert_sans: Vec<String>,

    #[serde(rename = "serverCertSANs", skip_serializing_if = "Vec::is_empty")]
    pub server_cert_sans: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinConfiguration {
    pub api_version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_cert_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<JoinControlPlane>,

    pub discovery: Discovery,
    pub kind: String,
    pub node_registration: NodeRegistrationOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinControlPlane {
    #[serde(rename = "localAPIEndpoint")]
    pub local_api_endpoint: ApiEndpoint,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Discovery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_token: Option<BootstrapTokenDiscovery>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDiscovery>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub tls_bootstrap_token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BootstrapTokenDiscovery {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_server_endpoint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ca_cert_hashes: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,

    #[serde(rename = "unsafeSkipCAVerification", skip_serializing_if = "is_false")]
    pub unsafe_skip_ca_verification: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FileDiscovery {
    pub kube_config_path: String,
}

impl From<InitConfiguration> for internal::InitConfiguration {
    fn from(value: InitConfiguration) -> Self {
        Self {
            bootstrap_tokens: value.bootstrap_tokens.into_iter().map(Into::into).collect(),
            node_registration: value.node_registration.into(),
            local_api_endpoint: value.local_api_endpoint.into(),
        }
    }
}

impl From<&internal::InitConfiguration> for InitConfiguration {
    fn from(value: &internal::InitConfiguration) -> Self {
        Self {
            api_version: String::new(),
            bootstrap_tokens: value.bootstrap_tokens.iter().map(Into::into).collect(),
            kind: String::new(),
            local_api_endpoint: (&value.local_api_endpoint).into(),
            node_registration: (&value.node_registration).into(),
        }
    }
}

impl From<ClusterConfiguration> for internal::ClusterConfiguration {
    fn from(value: ClusterConfiguration) -> Self {
        Self {
            etcd: internal::Etcd {
                local: value.etcd.local.map(|local| internal::LocalEtcd {
                    image_repository: local.image_repository,
                    image_tag: local.image_tag,
                    data_dir: local.data_dir,
                    extra_args: local.extra_args,
                    server_cert_sans: local.server_cert_sans,
                    peer_cert_sans: local.peer_cert_sans,
                }),
                external: value.etcd.external.map(Into::into),
            },
            networking: value.networking.into(),
            kubernetes_version: value.kubernetes_version,
            control_plane_endpoint: value.control_plane_endpoint,
            api_server: internal::ApiServer {
                extra_args: value.api_server.extra_args,
                cert_sans: value.api_server.cert_sans,
                timeout_for_control_plane: value.api_server.timeout_for_control_plane,
            },
            controller_manager: internal::ControlPlaneComponent {
                extra_args: value.controller_manager.extra_args,
            },
            scheduler: internal::ControlPlaneComponent {
                extra_args: value.scheduler.extra_args,
            },
            dns: internal::Dns {
                dns_type: value.dns.dns_type,
            },
            certificates_dir: value.certificates_dir,
            image_repository: value.image_repository,
            use_hyperkube_image: value.use_hyper_kube_image,
            feature_gates: value.feature_gates,
            cluster_name: value.cluster_name,
        }
    }
}

impl From<&internal::ClusterConfiguration> for ClusterConfiguration {
    fn from(value: &internal::ClusterConfiguration) -> Self {
        Self {
            api_server: ApiServer {
                cert_sans: value.api_server.cert_sans.clone(),
                extra_args: value.api_server.extra_args.clone(),
                timeout_for_control_plane: value.api_server.timeout_for_control_plane,
            },
            api_version: String::new(),
            certificates_dir: value.certificates_dir.clone(),
            cluster_name: value.cluster_name.clone(),
            control_plane_endpoint: value.control_plane_endpoint.clone(),
            controller_manager: ControlPlaneComponent {
                extra_args: value.controller_manager.extra_args.clone(),
            },
            dns: Dns {
                dns_type: value.dns.dns_type.clone(),
            },
            etcd: Etcd {
                external: value.etcd.external.as_ref().map(Into::into),
                local: value.etcd.local.as_ref().map(|local| LocalEtcd {
                    data_dir: local.data_dir.clone(),
                    extra_args: local.extra_args.clone(),
                    image_repository: local.image_repository.clone(),
                    image_tag: local.image_tag.clone(),
                    peer_cert_sans: local.peer_cert_sans.clone(),
                    server_cert_sans: local.server_cert_sans.clone(),
                }),
            },
            feature_gates: value.feature_gates.clone(),
            image_repository: value.image_repository.clone(),
            kind: String::new(),
            kubernetes_version: value.kubernetes_version.clone(),
            networking: (&value.networking).into(),
            scheduler: ControlPlaneComponent {
                extra_args: value.scheduler.extra_args.clone(),
            },
            use_hyper_kube_image: value.use_hyperkube_image,
        }
    }
}

impl From<JoinConfiguration> for internal::JoinConfiguration {
    fn from(value: JoinConfiguration) -> Self {
        let discovery = value.discovery;

        Self {
            node_registration: value.node_registration.into(),
            ca_cert_path: value.ca_cert_path,
            discovery: internal::Discovery {
                bootstrap_token: discovery.bootstrap_token.map(|bootstrap_token| {
                    internal::BootstrapTokenDiscovery {
                        token: bootstrap_token.token,
                        api_server_endpoint: bootstrap_token.api_server_endpoint,
                        ca_cert_hashes: bootstrap_token.ca_cert_hashes,
                        unsafe_skip_ca_verification: bootstrap_token.unsafe_skip_ca_verification,
                    }
                }),
                file: discovery.file.map(|file| internal::FileDiscovery {
                    kube_config_path: file.kube_config_path,
                }),
                tls_bootstrap_token: discovery.tls_bootstrap_token,
                timeout: discovery.timeout,
            },
            control_plane: value
                .control_plane
                .map(|control_plane| internal::JoinControlPlane {
                    local_api_endpoint: control_plane.local_api_endpoint.into(),
                }),
        }
    }
}

impl From<&internal::JoinConfiguration> for JoinConfiguration {
    fn from(value: &internal::JoinConfiguration) -> Self {
        let discovery = &value.discovery;

        Self {
            api_version: String::new(),
            ca_cert_path: value.ca_cert_path.clone(),
            control_plane: value
                .control_plane
                .as_ref()
                .map(|control_plane| JoinControlPlane {
                    local_api_endpoint: (&control_plane.local_api_endpoint).into(),
                }),
            discovery: Discovery {
                bootstrap_token: discovery.bootstrap_token.as_ref().map(|bootstrap_token| {
                    BootstrapTokenDiscovery {
                        api_server_endpoint: bootstrap_token.api_server_endpoint.clone(),
                        ca_cert_hashes: bootstrap_token.ca_cert_hashes.clone(),
                        token: bootstrap_token.token.clone(),
                        unsafe_skip_ca_verification: bootstrap_token.unsafe_skip_ca_verification,
                    }
                }),
                file: discovery.file.as_ref().map(|file| FileDiscovery {
                    kube_config_path: file.kube_config_path.clone(),
                }),
                timeout: discovery.timeout,
                tls_bootstrap_token: discovery.tls_bootstrap_token.clone(),
            },
            kind: String::new(),
            node_registration: (&value.node_registration).into(),
        }
    }
}
