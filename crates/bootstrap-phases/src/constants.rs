/// Directory holding the kubeconfig files of the node.
pub const KUBERNETES_DIR: &str = "/etc/kubernetes";

/// Directory the kubelet reads static pod manifests from.
pub const STATIC_POD_MANIFESTS_DIR: &str = "/etc/kubernetes/manifests";

/// Name of the secret the control plane certificates are downloaded from.
pub const CERTS_SECRET: &str = "kubeadm-certs";
