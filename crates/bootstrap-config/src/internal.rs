//! The version independent representation every on-disk version converts into.
//!
//! Empty strings, zero ports and empty collections mean "not set" and are
//! filled in by the [defaulter](crate::defaults). Fields where "not set" and
//! "explicitly empty" differ are modelled as [`Option`].

use std::collections::BTreeMap;

use crate::{component::ComponentConfigs, duration::Duration};

/// The aggregate configuration built from all documents of one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InternalConfig {
    /// The cluster-wide section.
    pub cluster: ClusterConfiguration,

    /// The node-local section.
    pub node: NodeConfiguration,

    /// Embedded component configurations, keyed by component.
    pub component_configs: ComponentConfigs,
}

impl InternalConfig {
    pub fn init(&self) -> Option<&InitConfiguration> {
        match &self.node {
            NodeConfiguration::Init(init) => Some(init),
            NodeConfiguration::Join(_) => None,
        }
    }

    pub fn join(&self) -> Option<&JoinConfiguration> {
        match &self.node {
            NodeConfiguration::Init(_) => None,
            NodeConfiguration::Join(join) => Some(join),
        }
    }

    /// Returns the node registration options of either node section.
    pub fn node_registration(&self) -> &NodeRegistrationOptions {
        match &self.node {
            NodeConfiguration::Init(init) => &init.node_registration,
            NodeConfiguration::Join(join) => &join.node_registration,
        }
    }

    /// Derives the init-shaped configuration a joining control plane node uses
    /// to generate its certificates, kubeconfig files and manifests.
    ///
    /// The cluster section and component configs are kept, the node section is
    /// rebuilt from the join node registration and the local API endpoint of
    /// the control plane. Returns [`None`] for init configurations and for join
    /// configurations of worker nodes.
    pub fn join_as_init(&self) -> Option<Self> {
        let join = self.join()?;
        let control_plane = join.control_plane.as_ref()?;

        Some(Self {
            cluster: self.cluster.clone(),
            node: NodeConfiguration::Init(InitConfiguration {
                bootstrap_tokens: Vec::new(),
                node_registration: join.node_registration.clone(),
                local_api_endpoint: control_plane.local_api_endpoint.clone(),
            }),
            component_configs: self.component_configs.clone(),
        })
    }
}

/// The node-local section. A file describes either a node initializing a new
/// cluster or a node joining an existing one, never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeConfiguration {
    Init(InitConfiguration),
    Join(JoinConfiguration),
}

impl Default for NodeConfiguration {
    fn default() -> Self {
        Self::Init(InitConfiguration::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitConfiguration {
    pub bootstrap_tokens: Vec<BootstrapToken>,
    pub node_registration: NodeRegistrationOptions,
    pub local_api_endpoint: ApiEndpoint,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapToken {
    pub token: String,
    pub description: String,
    pub ttl: Option<Duration>,
    pub usages: Vec<String>,
    pub groups: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeRegistrationOptions {
    pub name: String,
    pub cri_socket: String,

    /// [`None`] lets the defaulter pick the taints, an empty list means no
    /// taints at all.
    pub taints: Option<Vec<Taint>>,
    pub kubelet_extra_args: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub advertise_address: String,
    pub bind_port: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterConfiguration {
    pub etcd: Etcd,
    pub networking: Networking,
    pub kubernetes_version: String,
    pub control_plane_endpoint: String,
    pub api_server: ApiServer,
    pub controller_manager: ControlPlaneComponent,
    pub scheduler: ControlPlaneComponent,
    pub dns: Dns,
    pub certificates_dir: String,
    pub image_repository: String,
    pub use_hyperkube_image: bool,
    pub feature_gates: BTreeMap<String, bool>,
    pub cluster_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlPlaneComponent {
    pub extra_args: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiServer {
    pub extra_args: BTreeMap<String, String>,
    pub cert_sans: Vec<String>,
    pub timeout_for_control_plane: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dns {
    pub dns_type: String,
}

/// Either a local (stacked) or an external etcd cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Etcd {
    pub local: Option<LocalEtcd>,
    pub external: Option<ExternalEtcd>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalEtcd {
    pub image_repository: String,
    pub image_tag: String,
    pub data_dir: String,
    pub extra_args: BTreeMap<String, String>,
    pub server_cert_sans: Vec<String>,
    pub peer_cert_sans: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalEtcd {
    pub endpoints: Vec<String>,
    pub ca_file: String,
    pub cert_file: String,
    pub key_file: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Networking {
    pub service_subnet: String,
    pub pod_subnet: String,
    pub dns_domain: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinConfiguration {
    pub node_registration: NodeRegistrationOptions,
    pub ca_cert_path: String,
    pub discovery: Discovery,

    /// Set when the node joins as an additional control plane instance.
    pub control_plane: Option<JoinControlPlane>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Discovery {
    pub bootstrap_token: Option<BootstrapTokenDiscovery>,
    pub file: Option<FileDiscovery>,
    pub tls_bootstrap_token: String,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapTokenDiscovery {
    pub token: String,
    pub api_server_endpoint: String,
    pub ca_cert_hashes: Vec<String>,
    pub unsafe_skip_ca_verification: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileDiscovery {
    pub kube_config_path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinControlPlane {
    pub local_api_endpoint: ApiEndpoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_as_init_for_control_plane() {
        let config = InternalConfig {
            node: NodeConfiguration::Join(JoinConfiguration {
                node_registration: NodeRegistrationOptions {
                    name: "control-plane-2".to_owned(),
                    ..Default::default()
                },
                control_plane: Some(JoinControlPlane {
                    local_api_endpoint: ApiEndpoint {
                        advertise_address: "192.168.2.3".to_owned(),
                        bind_port: 6443,
                    },
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let init_config = config.join_as_init().expect("control plane join converts");
        let init = init_config.init().expect("node section must be init");
        assert_eq!(init.node_registration.name, "control-plane-2");
        assert_eq!(init.local_api_endpoint.advertise_address, "192.168.2.3");
        assert_eq!(init_config.cluster, config.cluster);
    }

    #[test]
    fn join_as_init_for_worker_is_none() {
        let config = InternalConfig {
            node: NodeConfiguration::Join(JoinConfiguration::default()),
            ..Default::default()
        };
        assert_eq!(config.join_as_init(), None);
        assert_eq!(InternalConfig::default().join_as_init(), None);
    }
}
