//! The `kubeadm.k8s.io/v1alpha3` documents.
//!
//! Compared to v1beta1 this version keeps the control plane component settings
//! flat on the cluster configuration, names the init node endpoint
//! `apiEndpoint`, references the etcd image as one string and describes join
//! discovery with flat `discovery*` fields.

use crate::{
    api_version::{Kind, KubeadmVersion},
    conversion::{ConversionError, Section, VersionedDocument},
    internal,
};

mod types;

pub use types::*;

pub use crate::common::{
    ApiEndpoint, BootstrapToken, ExternalEtcd, Networking, NodeRegistrationOptions, Taint,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Document {
    Cluster(ClusterConfiguration),
    Init(InitConfiguration),
    Join(JoinConfiguration),
}

impl VersionedDocument for Document {
    const VERSION: KubeadmVersion = KubeadmVersion::V1Alpha3;

    fn decode(kind: Kind, bytes: &[u8]) -> Result<Option<Self>, serde_yaml::Error> {
        let document = match kind {
            Kind::ClusterConfiguration => Self::Cluster(serde_yaml::from_slice(bytes)?),
            Kind::InitConfiguration => Self::Init(serde_yaml::from_slice(bytes)?),
            Kind::JoinConfiguration => Self::Join(serde_yaml::from_slice(bytes)?),
            Kind::KubeProxyConfiguration | Kind::KubeletConfiguration => return Ok(None),
        };

        Ok(Some(document))
    }

    fn into_section(self) -> Result<Section, ConversionError> {
        Ok(match self {
            Self::Cluster(cluster) => {
                Section::Cluster(internal::ClusterConfiguration::try_from(cluster)?)
            }
            Self::Init(init) => Section::Init(init.into()),
            Self::Join(join) => Section::Join(internal::JoinConfiguration::try_from(join)?),
        })
    }

    fn from_section(section: &Section) -> Result<Self, ConversionError> {
        let api_version = Self::VERSION.api_version();
        let kind = section.kind().to_string();

        Ok(match section {
            Section::Cluster(cluster) => Self::Cluster(ClusterConfiguration {
                api_version,
                kind,
                ..ClusterConfiguration::try_from(cluster)?
            }),
            Section::Init(init) => Self::Init(InitConfiguration {
                api_version,
                kind,
                ..init.into()
            }),
            Section::Join(join) => Self::Join(JoinConfiguration {
                api_version,
                kind,
                ..join.into()
            }),
        })
    }

    fn kind(&self) -> Kind {
        match self {
            Self::Cluster(_) => Kind::ClusterConfiguration,
            Self::Init(_) => Kind::InitConfiguration,
            Self::Join(_) => Kind::JoinConfiguration,
        }
    }

    fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        match self {
            Self::Cluster(cluster) => serde_yaml::to_string(cluster),
            Self::Init(init) => serde_yaml::to_string(init),
            Self::Join(join) => serde_yaml::to_string(join),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn convert(kind: Kind, input: &str) -> Result<Section, ConversionError> {
        Document::decode(kind, input.as_bytes())
            .expect("document must decode")
            .expect("document is a kubeadm kind")
            .into_section()
    }

    #[test]
    fn flat_join_discovery_is_nested() {
        let input = indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: JoinConfiguration
            apiEndpoint:
              advertiseAddress: 192.168.2.3
              bindPort: 6443
            clusterName: kubernetes
            controlPlane: true
            discoveryTokenAPIServers:
            - 192.168.2.2:6443
            discoveryTokenCACertHashes:
            - sha256:7c8d3b3cbc2e8d8c0bd2a02e1a4b1e0a2e5f5e1c5b1c1e5f5e1c5b1c1e5f5e1c
            token: abcdef.0123456789abcdef
        "};

        let Section::Join(join) = convert(Kind::JoinConfiguration, input)
            .expect("join configuration must convert")
        else {
            panic!("join configuration must convert into a join section");
        };

        assert_eq!(
            join.discovery.bootstrap_token,
            Some(internal::BootstrapTokenDiscovery {
                token: "abcdef.0123456789abcdef".to_owned(),
                api_server_endpoint: "192.168.2.2:6443".to_owned(),
                ca_cert_hashes: vec![
                    "sha256:7c8d3b3cbc2e8d8c0bd2a02e1a4b1e0a2e5f5e1c5b1c1e5f5e1c5b1c1e5f5e1c"
                        .to_owned()
                ],
                unsafe_skip_ca_verification: false,
            })
        );
        assert_eq!(join.discovery.tls_bootstrap_token, "abcdef.0123456789abcdef");
        assert_eq!(join.discovery.file, None);
        assert_eq!(
            join.control_plane
                .map(|control_plane| control_plane.local_api_endpoint.advertise_address),
            Some("192.168.2.3".to_owned())
        );
    }

    #[test]
    fn etcd_image_is_split() {
        let input = indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: ClusterConfiguration
            etcd:
              local:
                image: k8s.gcr.io/etcd:3.2.24
            unifiedControlPlaneImage: k8s.gcr.io/hyperkube:v1.13.0
        "};

        let Section::Cluster(cluster) = convert(Kind::ClusterConfiguration, input)
            .expect("cluster configuration must convert")
        else {
            panic!("cluster configuration must convert into a cluster section");
        };

        let local = cluster.etcd.local.expect("local etcd must be set");
        assert_eq!(local.image_repository, "k8s.gcr.io");
        assert_eq!(local.image_tag, "3.2.24");
        assert!(cluster.use_hyperkube_image);
    }

    #[rstest]
    #[case(
        indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: ClusterConfiguration
            auditPolicy:
              path: /etc/kubernetes/audit.yaml
        "},
        Kind::ClusterConfiguration,
        ConversionError::RemovedAuditPolicy { path: "/etc/kubernetes/audit.yaml".to_owned() },
    )]
    #[case(
        indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: ClusterConfiguration
            unifiedControlPlaneImage: example.com/control-plane:v1.13.0
        "},
        Kind::ClusterConfiguration,
        ConversionError::UnsupportedUnifiedImage { image: "example.com/control-plane:v1.13.0".to_owned() },
    )]
    #[case(
        indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: ClusterConfiguration
            etcd:
              local:
                image: etcd
        "},
        Kind::ClusterConfiguration,
        ConversionError::UnsupportedEtcdImage { image: "etcd".to_owned() },
    )]
    #[case(
        indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: JoinConfiguration
            discoveryTokenAPIServers:
            - 192.168.2.2:6443
            - 192.168.2.3:6443
        "},
        Kind::JoinConfiguration,
        ConversionError::MultipleDiscoveryServers {
            count: 2,
            servers: vec!["192.168.2.2:6443".to_owned(), "192.168.2.3:6443".to_owned()],
        },
    )]
    fn unconvertible_documents(
        #[case] input: &str,
        #[case] kind: Kind,
        #[case] expected: ConversionError,
    ) {
        let err = convert(kind, input).expect_err("document must not convert");
        assert_eq!(err, expected);
    }

    #[test]
    fn internal_only_fields_are_dropped() {
        let cluster = internal::ClusterConfiguration {
            dns: internal::Dns {
                dns_type: "kube-dns".to_owned(),
            },
            etcd: internal::Etcd {
                local: Some(internal::LocalEtcd {
                    image_repository: "k8s.gcr.io".to_owned(),
                    image_tag: "3.2.24".to_owned(),
                    ..Default::default()
                }),
                external: None,
            },
            ..Default::default()
        };

        let Document::Cluster(document) = Document::from_section(&Section::Cluster(cluster))
            .expect("cluster section must convert")
        else {
            panic!("cluster section must convert into a cluster document");
        };

        let yaml = serde_yaml::to_string(&document).expect("document must serialize");
        assert_eq!(
            yaml,
            indoc! {"
                apiVersion: kubeadm.k8s.io/v1alpha3
                etcd:
                  local:
                    image: k8s.gcr.io/etcd:3.2.24
                kind: ClusterConfiguration
                networking: {}
            "}
        );
    }

    #[test]
    fn incomplete_etcd_image_fails() {
        let cluster = internal::ClusterConfiguration {
            etcd: internal::Etcd {
                local: Some(internal::LocalEtcd {
                    image_repository: "k8s.gcr.io".to_owned(),
                    ..Default::default()
                }),
                external: None,
            },
            ..Default::default()
        };

        let err = Document::from_section(&Section::Cluster(cluster))
            .expect_err("etcd image without tag must fail");
        assert!(matches!(err, ConversionError::IncompleteEtcdImage { .. }));
    }
}
