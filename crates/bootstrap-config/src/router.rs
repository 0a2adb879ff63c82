//! Routes raw documents to the decoder of their declared version and merges
//! the converted sections into one [`InternalConfig`].
//!
//! The cluster section, the node section and every component configuration
//! may each be described by one document only. Init and join node sections
//! exclude each other. Component configurations of distinct components add
//! up.

use std::str::FromStr;

use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::debug;

use crate::{
    api_version::{GroupVersion, Kind, KubeadmVersion},
    component::{self, Component, ComponentConfig, ComponentConfigs},
    conversion::{ConversionError, Section, VersionedDocument},
    document::{Documents, RawDocument},
    internal::{ClusterConfiguration, InternalConfig, NodeConfiguration},
    v1alpha3, v1beta1,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unknown kind {kind:?} in apiVersion {api_version:?}"))]
    UnknownKind { kind: String, api_version: String },

    #[snafu(display("failed to decode the {kind} document of apiVersion {api_version:?}"))]
    DecodeDocument {
        source: serde_yaml::Error,
        kind: Kind,
        api_version: String,
    },

    #[snafu(display("failed to decode a component configuration"))]
    DecodeComponent { source: component::Error },

    #[snafu(display("failed to convert the {kind} document of apiVersion {api_version:?}"))]
    ConversionFailure {
        source: ConversionError,
        kind: Kind,
        api_version: String,
    },

    #[snafu(display(
        "the {first} and {second} documents both describe the node, only one of them is allowed"
    ))]
    ConflictingNodeSections { first: Kind, second: Kind },
}

/// Decodes and converts every document and merges the results.
///
/// Sections without a document are left at their zero value, the
/// [defaulter](crate::defaults) fills them in later.
pub fn route_documents(documents: Documents) -> Result<InternalConfig> {
    let mut cluster: Option<ClusterConfiguration> = None;
    let mut node: Option<(Kind, NodeConfiguration)> = None;
    let mut component_configs = ComponentConfigs::default();

    for document in documents.into_values() {
        let kind = Kind::from_str(&document.kind)
            .ok()
            .with_context(|| UnknownKindSnafu {
                kind: &document.kind,
                api_version: &document.api_version,
            })?;
        debug!(%kind, api_version = %document.api_version, "routing document");

        if let Some(component) = Component::from_kind(kind) {
            ensure!(
                document.api_version == component.api_version(),
                UnknownKindSnafu {
                    kind: &document.kind,
                    api_version: &document.api_version,
                }
            );

            let config =
                ComponentConfig::decode(component, &document.bytes).context(DecodeComponentSnafu)?;
            component_configs.insert(component, config);
            continue;
        }

        let version = match GroupVersion::from_str(&document.api_version) {
            Ok(group_version) => KubeadmVersion::from_group_version(&group_version),
            Err(error) => {
                debug!(%error, api_version = %document.api_version, "unparsable apiVersion");
                None
            }
        }
        .with_context(|| UnknownKindSnafu {
            kind: &document.kind,
            api_version: &document.api_version,
        })?;

        let section = match version {
            KubeadmVersion::V1Alpha3 => decode_section::<v1alpha3::Document>(kind, &document)?,
            KubeadmVersion::V1Beta1 => decode_section::<v1beta1::Document>(kind, &document)?,
        };

        match section {
            Section::Cluster(section) => cluster = Some(section),
            Section::Init(section) => set_node(&mut node, kind, NodeConfiguration::Init(section))?,
            Section::Join(section) => set_node(&mut node, kind, NodeConfiguration::Join(section))?,
        }
    }

    Ok(InternalConfig {
        cluster: cluster.unwrap_or_default(),
        node: node.map(|(_, node)| node).unwrap_or_default(),
        component_configs,
    })
}

fn decode_section<D: VersionedDocument>(kind: Kind, document: &RawDocument) -> Result<Section> {
    let decoded = D::decode(kind, &document.bytes)
        .context(DecodeDocumentSnafu {
            kind,
            api_version: &document.api_version,
        })?
        .with_context(|| UnknownKindSnafu {
            kind: &document.kind,
            api_version: &document.api_version,
        })?;

    decoded.into_section().context(ConversionFailureSnafu {
        kind,
        api_version: &document.api_version,
    })
}

fn set_node(
    node: &mut Option<(Kind, NodeConfiguration)>,
    kind: Kind,
    section: NodeConfiguration,
) -> Result<()> {
    if let Some((first, _)) = node {
        return ConflictingNodeSectionsSnafu {
            first: *first,
            second: kind,
        }
        .fail();
    }

    *node = Some((kind, section));
    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::document::split_documents;

    fn route(input: &str) -> Result<InternalConfig> {
        route_documents(split_documents(input.as_bytes()).expect("input must split"))
    }

    #[test]
    fn sections_and_components_merge() {
        let config = route(indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: InitConfiguration
            nodeRegistration:
              name: control-plane-1
            ---
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: ClusterConfiguration
            clusterName: example
            ---
            apiVersion: kubeproxy.config.k8s.io/v1alpha1
            kind: KubeProxyConfiguration
            mode: ipvs
            ---
            apiVersion: kubelet.config.k8s.io/v1beta1
            kind: KubeletConfiguration
        "})
        .expect("documents must route");

        assert_eq!(config.cluster.cluster_name, "example");
        assert_eq!(config.node_registration().name, "control-plane-1");
        assert_eq!(config.component_configs.len(), 2);
        assert!(config.component_configs.contains(Component::KubeProxy));
        assert!(config.component_configs.contains(Component::Kubelet));
    }

    #[rstest]
    #[case("apiVersion: kubeadm.k8s.io/v1beta1\nkind: MasterConfiguration\n")]
    #[case("apiVersion: kubeadm.k8s.io/v1beta9\nkind: InitConfiguration\n")]
    #[case("apiVersion: kubeadm.k8s.io/beta1\nkind: InitConfiguration\n")]
    #[case("apiVersion: kubeadm.k8s.io/\nkind: ClusterConfiguration\n")]
    #[case("apiVersion: example.com/v1beta1\nkind: InitConfiguration\n")]
    #[case("apiVersion: kubeproxy.config.k8s.io/v1beta1\nkind: KubeProxyConfiguration\n")]
    fn unknown_kinds(#[case] input: &str) {
        let err = route(input).expect_err("document must be rejected");
        assert!(matches!(err, Error::UnknownKind { .. }), "got {err:?}");
    }

    #[test]
    fn init_and_join_conflict() {
        let err = route(indoc! {"
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: JoinConfiguration
            ---
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: InitConfiguration
        "})
        .expect_err("init and join must conflict");

        assert!(matches!(
            err,
            Error::ConflictingNodeSections {
                first: Kind::InitConfiguration,
                second: Kind::JoinConfiguration,
            }
        ));
    }

    #[test]
    fn conversion_failures_name_the_document() {
        let err = route(indoc! {"
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: ClusterConfiguration
            unifiedControlPlaneImage: example.com/control-plane:v1.13.0
        "})
        .expect_err("custom unified image must fail");

        assert!(matches!(
            err,
            Error::ConversionFailure {
                kind: Kind::ClusterConfiguration,
                ..
            }
        ));
    }

    #[test]
    fn unknown_fields_fail_decoding() {
        let err = route(indoc! {"
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: ClusterConfiguration
            apiServerCertSANs:
            - 10.100.1.1
        "})
        .expect_err("v1alpha3 field must be rejected");

        assert!(matches!(err, Error::DecodeDocument { .. }));
    }
}
