//! Shared pieces of the conversions between the on-disk versions and the
//! [internal](crate::internal) representation.
//!
//! Every version converts into the internal representation and back. Two
//! on-disk versions are never converted directly into each other, upgrading a
//! document from v1alpha3 to v1beta1 goes through the internal types.

use snafu::{ResultExt, Snafu};

use crate::{
    api_version::{Kind, KubeadmVersion},
    internal::{
        ClusterConfiguration, InitConfiguration, InternalConfig, JoinConfiguration,
        NodeConfiguration,
    },
};

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConversionError {
    #[snafu(display(
        "the etcd image {image:?} cannot be converted, expected <repository>/etcd:<tag>"
    ))]
    UnsupportedEtcdImage { image: String },

    #[snafu(display(
        "the unified control plane image {image:?} is not a hyperkube image, custom control plane images are no longer supported"
    ))]
    UnsupportedUnifiedImage { image: String },

    #[snafu(display(
        "the audit policy {path:?} cannot be converted, the auditPolicy setting has been removed, use apiServer extra args and extra volumes instead"
    ))]
    RemovedAuditPolicy { path: String },

    #[snafu(display(
        "only one discovery API server is supported, got {count}: {servers:?}"
    ))]
    MultipleDiscoveryServers { count: usize, servers: Vec<String> },

    #[snafu(display(
        "the etcd image repository {repository:?} and tag {tag:?} must either both be set or both be empty"
    ))]
    IncompleteEtcdImage { repository: String, tag: String },
}

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(display("failed to convert the internal {kind} section"))]
    ConvertSection { source: ConversionError, kind: Kind },

    #[snafu(display("failed to serialize the {kind} document"))]
    SerializeDocument {
        source: serde_yaml::Error,
        kind: Kind,
    },
}

/// The part of an [`InternalConfig`](crate::InternalConfig) a single kubeadm
/// document converts into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Section {
    Cluster(ClusterConfiguration),
    Init(InitConfiguration),
    Join(JoinConfiguration),
}

impl Section {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Cluster(_) => Kind::ClusterConfiguration,
            Self::Init(_) => Kind::InitConfiguration,
            Self::Join(_) => Kind::JoinConfiguration,
        }
    }
}

/// One on-disk version of the kubeadm documents.
///
/// Implementations only know how to convert between their own documents and
/// the internal [`Section`]s.
pub trait VersionedDocument: Sized {
    const VERSION: KubeadmVersion;

    /// Deserializes a document of `kind`, rejecting unknown fields. Returns
    /// [`None`] if the version has no such kind.
    fn decode(kind: Kind, bytes: &[u8]) -> Result<Option<Self>, serde_yaml::Error>;

    /// Converts the document into the internal section it describes.
    fn into_section(self) -> Result<Section, ConversionError>;

    /// Converts an internal section into a document of this version.
    fn from_section(section: &Section) -> Result<Self, ConversionError>;

    fn kind(&self) -> Kind;

    fn to_yaml(&self) -> Result<String, serde_yaml::Error>;
}

/// Encodes the kubeadm sections of `config` as documents of version `D`.
///
/// The cluster section is always emitted, followed by the node section.
pub fn encode_sections<D: VersionedDocument>(
    config: &InternalConfig,
) -> Result<Vec<(Kind, Vec<u8>)>, EncodeError> {
    let node = match &config.node {
        NodeConfiguration::Init(init) => Section::Init(init.clone()),
        NodeConfiguration::Join(join) => Section::Join(join.clone()),
    };

    [Section::Cluster(config.cluster.clone()), node]
        .iter()
        .map(|section| -> Result<_, EncodeError> {
            let kind = section.kind();
            let document = D::from_section(section).context(ConvertSectionSnafu { kind })?;
            let yaml = document
                .to_yaml()
                .context(SerializeDocumentSnafu { kind })?;
            Ok((kind, yaml.into_bytes()))
        })
        .collect()
}

const ETCD_IMAGE_NAME: &str = "etcd";
const HYPERKUBE_IMAGE_NAME: &str = "hyperkube";

/// Splits a `<repository>/<name>:<tag>` image reference into its parts.
fn split_image(image: &str) -> Option<(&str, &str, &str)> {
    let (repository, name_tag) = image.rsplit_once('/')?;
    let (name, tag) = name_tag.split_once(':')?;

    if repository.is_empty() || name.is_empty() || tag.is_empty() {
        return None;
    }

    Some((repository, name, tag))
}

/// Splits a full etcd image reference into repository and tag.
pub(crate) fn split_etcd_image(image: &str) -> Result<(String, String), ConversionError> {
    match split_image(image) {
        Some((repository, ETCD_IMAGE_NAME, tag)) => Ok((repository.to_owned(), tag.to_owned())),
        _ => UnsupportedEtcdImageSnafu { image }.fail(),
    }
}

/// Joins repository and tag into a full etcd image reference. Returns
/// [`None`] when neither is set.
pub(crate) fn join_etcd_image(
    repository: &str,
    tag: &str,
) -> Result<Option<String>, ConversionError> {
    match (repository.is_empty(), tag.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some(format!("{repository}/{ETCD_IMAGE_NAME}:{tag}"))),
        _ => IncompleteEtcdImageSnafu { repository, tag }.fail(),
    }
}

pub(crate) fn is_hyperkube_image(image: &str) -> bool {
    matches!(split_image(image), Some((_, HYPERKUBE_IMAGE_NAME, _)))
}

pub(crate) fn hyperkube_image(repository: &str, kubernetes_version: &str) -> String {
    format!("{repository}/{HYPERKUBE_IMAGE_NAME}:{kubernetes_version}")
}
