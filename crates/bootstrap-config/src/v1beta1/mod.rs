//! The `kubeadm.k8s.io/v1beta1` documents.
//!
//! This version mirrors the internal representation closely, control plane
//! component settings are nested per component and join discovery is grouped
//! under `discovery`.

use crate::{
    api_version::{Kind, KubeadmVersion},
    conversion::{ConversionError, Section, VersionedDocument},
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
    const VERSION: KubeadmVersion = KubeadmVersion::V1Beta1;

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
            Self::Cluster(cluster) => Section::Cluster(cluster.into()),
            Self::Init(init) => Section::Init(init.into()),
            Self::Join(join) => Section::Join(join.into()),
        })
    }

    fn from_section(section: &Section) -> Result<Self, ConversionError> {
        let api_version = Self::VERSION.api_version();
        let kind = section.kind().to_string();

        Ok(match section {
            Section::Cluster(cluster) => Self::Cluster(ClusterConfiguration {
                api_version,
                kind,
                ..cluster.into()
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
