//! Fills every field left unset by the loaded documents.
//!
//! Defaulting is idempotent, a field is only written while it still holds its
//! zero value. Besides constant values it generates bootstrap tokens, detects
//! the node name and advertise address of the local host and derives values
//! from other fields, such as the cluster DNS address of the kubelet.

use std::{
    fs,
    net::{IpAddr, Ipv4Addr, UdpSocket},
    str::FromStr,
};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::{
    bootstrap_token::BootstrapTokenString,
    component::{Component, ComponentConfigs},
    constants::{
        CA_CERT_NAME, CLUSTER_DNS_SERVICE_INDEX, CONTROL_PLANE_TAINT_KEY, DEFAULT_API_BIND_PORT,
        DEFAULT_CERTIFICATES_DIR, DEFAULT_CLUSTER_NAME, DEFAULT_CONTROL_PLANE_TIMEOUT_SECS,
        DEFAULT_CRI_SOCKET, DEFAULT_DISCOVERY_TIMEOUT_SECS, DEFAULT_DNS_DOMAIN,
        DEFAULT_ETCD_DATA_DIR, DEFAULT_IMAGE_REPOSITORY, DEFAULT_KUBERNETES_VERSION,
        DEFAULT_SERVICE_SUBNET, DEFAULT_TOKEN_TTL_SECS, DEFAULT_TOKEN_USAGES, DNS_ADDON_COREDNS,
        NODE_BOOTSTRAP_TOKEN_AUTH_GROUP, TAINT_EFFECT_NO_SCHEDULE,
    },
    duration::Duration,
    internal::{
        ApiEndpoint, BootstrapToken, ClusterConfiguration, InitConfiguration, InternalConfig,
        JoinConfiguration, LocalEtcd, NodeConfiguration, NodeRegistrationOptions, Taint,
    },
    net::Cidr,
};

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Applies all defaults to `config` in place.
pub fn set_defaults(config: &mut InternalConfig) {
    set_cluster_defaults(&mut config.cluster);

    match &mut config.node {
        NodeConfiguration::Init(init) => set_init_defaults(init),
        NodeConfiguration::Join(join) => set_join_defaults(join, &config.cluster),
    }

    set_component_defaults(&mut config.component_configs, &config.cluster);
}

fn set_default(field: &mut String, value: &str) {
    if field.is_empty() {
        value.clone_into(field);
    }
}

fn set_cluster_defaults(cluster: &mut ClusterConfiguration) {
    set_default(&mut cluster.kubernetes_version, DEFAULT_KUBERNETES_VERSION);
    set_default(&mut cluster.networking.service_subnet, DEFAULT_SERVICE_SUBNET);
    set_default(&mut cluster.networking.dns_domain, DEFAULT_DNS_DOMAIN);
    set_default(&mut cluster.certificates_dir, DEFAULT_CERTIFICATES_DIR);
    set_default(&mut cluster.image_repository, DEFAULT_IMAGE_REPOSITORY);
    set_default(&mut cluster.cluster_name, DEFAULT_CLUSTER_NAME);
    set_default(&mut cluster.dns.dns_type, DNS_ADDON_COREDNS);

    cluster
        .api_server
        .timeout_for_control_plane
        .get_or_insert(Duration::from_secs(DEFAULT_CONTROL_PLANE_TIMEOUT_SECS));

    if cluster.etcd.external.is_none() {
        let local = cluster.etcd.local.get_or_insert_with(LocalEtcd::default);
        set_default(&mut local.data_dir, DEFAULT_ETCD_DATA_DIR);
    }
}

fn set_init_defaults(init: &mut InitConfiguration) {
    if init.bootstrap_tokens.is_empty() {
        init.bootstrap_tokens.push(BootstrapToken::default());
    }
    init.bootstrap_tokens
        .iter_mut()
        .for_each(set_bootstrap_token_defaults);

    set_node_registration_defaults(&mut init.node_registration, true);
    set_api_endpoint_defaults(&mut init.local_api_endpoint);
}

fn set_bootstrap_token_defaults(token: &mut BootstrapToken) {
    if token.token.is_empty() {
        let generated = BootstrapTokenString::generate();
        debug!(token_id = generated.id(), "generated a bootstrap token");
        token.token = generated.to_string();
    }

    token
        .ttl
        .get_or_insert(Duration::from_secs(DEFAULT_TOKEN_TTL_SECS));

    if token.usages.is_empty() {
        token.usages = DEFAULT_TOKEN_USAGES
            .iter()
            .map(|usage| (*usage).to_owned())
            .collect();
    }

    if token.groups.is_empty() {
        token.groups = vec![NODE_BOOTSTRAP_TOKEN_AUTH_GROUP.to_owned()];
    }
}

fn set_node_registration_defaults(options: &mut NodeRegistrationOptions, control_plane: bool) {
    set_default(&mut options.cri_socket, DEFAULT_CRI_SOCKET);

    if options.name.is_empty() {
        options.name = detect_node_name().unwrap_or_default();
    }

    if control_plane && options.taints.is_none() {
        options.taints = Some(vec![Taint {
            key: CONTROL_PLANE_TAINT_KEY.to_owned(),
            value: String::new(),
            effect: TAINT_EFFECT_NO_SCHEDULE.to_owned(),
        }]);
    }
}

fn set_api_endpoint_defaults(endpoint: &mut ApiEndpoint) {
    if endpoint.bind_port == 0 {
        endpoint.bind_port = DEFAULT_API_BIND_PORT;
    }

    if endpoint.advertise_address.is_empty() {
        endpoint.advertise_address = detect_advertise_address().to_string();
    }
}

fn set_join_defaults(join: &mut JoinConfiguration, cluster: &ClusterConfiguration) {
    if join.ca_cert_path.is_empty() {
        join.ca_cert_path = format!(
            "{certificates_dir}/{CA_CERT_NAME}",
            certificates_dir = cluster.certificates_dir.trim_end_matches('/')
        );
    }

    let discovery = &mut join.discovery;
    discovery
        .timeout
        .get_or_insert(Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS));

    if discovery.tls_bootstrap_token.is_empty() {
        if let Some(bootstrap_token) = &discovery.bootstrap_token {
            discovery
                .tls_bootstrap_token
                .clone_from(&bootstrap_token.token);
        }
    }

    set_node_registration_defaults(&mut join.node_registration, join.control_plane.is_some());

    if let Some(control_plane) = &mut join.control_plane {
        set_api_endpoint_defaults(&mut control_plane.local_api_endpoint);
    }
}

fn set_component_defaults(components: &mut ComponentConfigs, cluster: &ClusterConfiguration) {
    if let Some(kubelet) = components.get_mut(Component::Kubelet) {
        match Cidr::from_str(&cluster.networking.service_subnet)
            .ok()
            .and_then(|subnet| subnet.nth_address(CLUSTER_DNS_SERVICE_INDEX))
        {
            Some(address) => kubelet.set_default(
                "clusterDNS",
                Value::Sequence(vec![Value::from(address.to_string())]),
            ),
            None => debug!(
                service_subnet = %cluster.networking.service_subnet,
                "cannot derive the cluster DNS address from the service subnet"
            ),
        }

        kubelet.set_default("clusterDomain", cluster.networking.dns_domain.as_str());
    }

    if let Some(kube_proxy) = components.get_mut(Component::KubeProxy) {
        kube_proxy.set_default("bindAddress", Ipv4Addr::UNSPECIFIED.to_string());

        if !cluster.networking.pod_subnet.is_empty() {
            kube_proxy.set_default("clusterCIDR", cluster.networking.pod_subnet.as_str());
        }
    }
}

/// Reads the host name of the machine, lower cased.
fn detect_node_name() -> Option<String> {
    let hostname = match fs::read_to_string(HOSTNAME_PATH) {
        Ok(hostname) => hostname,
        Err(error) => {
            warn!(%error, path = HOSTNAME_PATH, "failed to read the host name");
            std::env::var("HOSTNAME").ok()?
        }
    };

    let hostname = hostname.trim().to_lowercase();
    (!hostname.is_empty()).then_some(hostname)
}

/// Picks the address of the interface holding the default route.
///
/// Connecting a UDP socket sends no packets, it only selects the local
/// address the kernel would route through. Falls back to the loopback address
/// on hosts without a default route.
fn detect_advertise_address() -> IpAddr {
    let detected = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 53))?;
            socket.local_addr()
        })
        .map(|address| address.ip());

    match detected {
        Ok(address) if !address.is_unspecified() => address,
        Ok(_) => {
            warn!("no default route found, advertising the loopback address");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Err(error) => {
            warn!(%error, "no default route found, advertising the loopback address");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
