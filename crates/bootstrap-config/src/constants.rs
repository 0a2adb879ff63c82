//! Well-known names, paths and default values shared by the whole pipeline.

/// Separator placed between two documents of a multi-document YAML stream.
pub const YAML_DOCUMENT_SEPARATOR: &str = "---\n";

/// API group of the tool's own configuration kinds.
pub const KUBEADM_GROUP: &str = "kubeadm.k8s.io";

/// `apiVersion` of the kube-proxy component configuration.
pub const KUBE_PROXY_API_VERSION: &str = "kubeproxy.config.k8s.io/v1alpha1";

/// `apiVersion` of the kubelet component configuration.
pub const KUBELET_API_VERSION: &str = "kubelet.config.k8s.io/v1beta1";

pub const DEFAULT_KUBERNETES_VERSION: &str = "v1.13.0";
pub const DEFAULT_SERVICE_SUBNET: &str = "10.96.0.0/12";
pub const DEFAULT_DNS_DOMAIN: &str = "cluster.local";
pub const DEFAULT_CERTIFICATES_DIR: &str = "/etc/kubernetes/pki";
pub const DEFAULT_IMAGE_REPOSITORY: &str = "k8s.gcr.io";
pub const DEFAULT_CLUSTER_NAME: &str = "kubernetes";
pub const DEFAULT_ETCD_DATA_DIR: &str = "/var/lib/etcd";
pub const DEFAULT_CRI_SOCKET: &str = "/var/run/dockershim.sock";
pub const DEFAULT_API_BIND_PORT: i32 = 6443;
pub const DEFAULT_CONTROL_PLANE_TIMEOUT_SECS: u64 = 4 * 60;
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5 * 60;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// File name of the cluster CA certificate inside the certificates directory.
pub const CA_CERT_NAME: &str = "ca.crt";

pub const DNS_ADDON_COREDNS: &str = "CoreDNS";
pub const DNS_ADDON_KUBE_DNS: &str = "kube-dns";

/// Group every default bootstrap token is placed in.
pub const NODE_BOOTSTRAP_TOKEN_AUTH_GROUP: &str = "system:bootstrappers:kubeadm:default-node-token";

/// Required prefix of every extra group a bootstrap token authenticates as.
pub const BOOTSTRAP_TOKEN_GROUP_PREFIX: &str = "system:bootstrappers:";

pub const DEFAULT_TOKEN_USAGES: &[&str] = &["signing", "authentication"];
pub const KNOWN_TOKEN_USAGES: &[&str] = &["signing", "authentication"];

/// Taint placed on control plane nodes unless taints were set explicitly.
pub const CONTROL_PLANE_TAINT_KEY: &str = "node-role.kubernetes.io/master";
pub const TAINT_EFFECT_NO_SCHEDULE: &str = "NoSchedule";
pub const KNOWN_TAINT_EFFECTS: &[&str] = &["NoSchedule", "PreferNoSchedule", "NoExecute"];

/// Index of the cluster DNS service address inside the service subnet.
pub const CLUSTER_DNS_SERVICE_INDEX: u32 = 10;

/// Placeholder values used when printing the default configuration.
pub const PLACEHOLDER_TOKEN: &str = "abcdef.0123456789abcdef";
pub const PLACEHOLDER_ADVERTISE_ADDRESS: &str = "1.2.3.4";
