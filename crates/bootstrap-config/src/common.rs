//! Wire types whose shape is identical in every on-disk version.
//!
//! Fields are declared in the byte-wise order of their serialized names, so
//! the emitted documents come out with sorted keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{duration::Duration, internal};

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn is_zero(value: &i32) -> bool {
    *value == 0
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiEndpoint {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub advertise_address: String,

    #[serde(skip_serializing_if = "is_zero")]
    pub bind_port: i32,
}

impl From<ApiEndpoint> for internal::ApiEndpoint {
    fn from(value: ApiEndpoint) -> Self {
        Self {
            advertise_address: value.advertise_address,
            bind_port: value.bind_port,
        }
    }
}

impl From<&internal::ApiEndpoint> for ApiEndpoint {
    fn from(value: &internal::ApiEndpoint) -> Self {
        Self {
            advertise_address: value.advertise_address.clone(),
            bind_port: value.bind_port,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BootstrapToken {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    pub token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<String>,
}

impl From<BootstrapToken> for internal::BootstrapToken {
    fn from(value: BootstrapToken) -> Self {
        Self {
            token: value.token,
            description: value.description,
            ttl: value.ttl,
            usages: value.usages,
            groups: value.groups,
        }
    }
}

impl From<&internal::BootstrapToken> for BootstrapToken {
    fn from(value: &internal::BootstrapToken) -> Self {
        Self {
            description: value.description.clone(),
            groups: value.groups.clone(),
            token: value.token.clone(),
            ttl: value.ttl,
            usages: value.usages.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExternalEtcd {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_file: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cert_file: String,

    pub endpoints: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_file: String,
}

impl From<ExternalEtcd> for internal::ExternalEtcd {
    fn from(value: ExternalEtcd) -> Self {
        Self {
            endpoints: value.endpoints,
            ca_file: value.ca_file,
            cert_file: value.cert_file,
            key_file: value.key_file,
        }
    }
}

impl From<&internal::ExternalEtcd> for ExternalEtcd {
    fn from(value: &internal::ExternalEtcd) -> Self {
        Self {
            ca_file: value.ca_file.clone(),
            cert_file: value.cert_file.clone(),
            endpoints: value.endpoints.clone(),
            key_file: value.key_file.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Networking {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns_domain: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_subnet: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_subnet: String,
}

impl From<Networking> for internal::Networking {
    fn from(value: Networking) -> Self {
        Self {
            service_subnet: value.service_subnet,
            pod_subnet: value.pod_subnet,
            dns_domain: value.dns_domain,
        }
    }
}

impl From<&internal::Networking> for Networking {
    fn from(value: &internal::Networking) -> Self {
        Self {
            dns_domain: value.dns_domain.clone(),
            pod_subnet: value.pod_subnet.clone(),
            service_subnet: value.service_subnet.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeRegistrationOptions {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cri_socket: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub kubelet_extra_args: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Kept as an [`Option`], an explicitly empty list disables the default
    /// control plane taint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taints: Option<Vec<Taint>>,
}

impl From<NodeRegistrationOptions> for internal::NodeRegistrationOptions {
    fn from(value: NodeRegistrationOptions) -> Self {
        Self {
            name: value.name,
            cri_socket: value.cri_socket,
            taints: value
                .taints
                .map(|taints| taints.into_iter().map(Into::into).collect()),
            kubelet_extra_args: value.kubelet_extra_args,
        }
    }
}

impl From<&internal::NodeRegistrationOptions> for NodeRegistrationOptions {
    fn from(value: &internal::NodeRegistrationOptions) -> Self {
        Self {
            cri_socket: value.cri_socket.clone(),
            kubelet_extra_args: value.kubelet_extra_args.clone(),
            name: value.name.clone(),
            taints: value
                .taints
                .as_ref()
                .map(|taints| taints.iter().map(Into::into).collect()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Taint {
    pub effect: String,
    pub key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl From<Taint> for internal::Taint {
    fn from(value: Taint) -> Self {
        Self {
            key: value.key,
            value: value.value,
            effect: value.effect,
        }
    }
}

impl From<&internal::Taint> for Taint {
    fn from(value: &internal::Taint) -> Self {
        Self {
            effect: value.effect.clone(),
            key: value.key.clone(),
            value: value.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn explicit_empty_taints_survive() {
        let options: NodeRegistrationOptions =
            serde_yaml::from_str("name: worker-1\ntaints: []\n").expect("options must parse");
        let internal = internal::NodeRegistrationOptions::from(options);
        assert_eq!(internal.taints, Some(Vec::new()));

        let serialized = serde_yaml::to_string(&NodeRegistrationOptions::from(&internal))
            .expect("options must serialize");
        assert_eq!(serialized, "name: worker-1\ntaints: []\n");
    }

    #[test]
    fn keys_are_emitted_sorted() {
        let token = BootstrapToken {
            description: "initial token".to_owned(),
            groups: vec!["system:bootstrappers:kubeadm:default-node-token".to_owned()],
            token: "abcdef.0123456789abcdef".to_owned(),
            ttl: Some(Duration::from_secs(3600)),
            usages: vec!["signing".to_owned()],
        };

        let serialized = serde_yaml::to_string(&token).expect("token must serialize");
        assert_eq!(
            serialized,
            indoc! {"
                description: initial token
                groups:
                - system:bootstrappers:kubeadm:default-node-token
                token: abcdef.0123456789abcdef
                ttl: 1h0m0s
                usages:
                - signing
            "}
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        serde_yaml::from_str::<ApiEndpoint>("advertiseAddress: 10.0.0.1\nport: 6443\n")
            .expect_err("unknown field must be rejected");
    }
}
