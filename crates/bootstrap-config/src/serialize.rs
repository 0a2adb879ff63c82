//! Emits configurations as deterministic multi-document YAML streams.

use snafu::{ResultExt, Snafu};

use crate::{
    api_version::KubeadmVersion,
    component,
    constants::YAML_DOCUMENT_SEPARATOR,
    conversion::{EncodeError, encode_sections},
    internal::InternalConfig,
    v1alpha3, v1beta1,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to encode the configuration as {version}"))]
    EncodeSections {
        source: EncodeError,
        version: KubeadmVersion,
    },

    #[snafu(display("failed to encode a component configuration"))]
    EncodeComponent { source: component::Error },
}

/// Joins encoded documents into one stream.
///
/// Documents are ordered by the byte-wise order of their kind names, so the
/// output does not depend on the order `documents` yields them in.
pub fn join_documents<K>(documents: impl IntoIterator<Item = (K, Vec<u8>)>) -> Vec<u8>
where
    K: AsRef<str>,
{
    let mut documents: Vec<(K, Vec<u8>)> = documents.into_iter().collect();
    documents.sort_by(|(a, _), (b, _)| a.as_ref().as_bytes().cmp(b.as_ref().as_bytes()));

    let mut output = Vec::new();
    for (i, (_, mut bytes)) in documents.into_iter().enumerate() {
        if i > 0 {
            output.extend_from_slice(YAML_DOCUMENT_SEPARATOR.as_bytes());
        }
        if !bytes.ends_with(b"\n") {
            bytes.push(b'\n');
        }
        output.append(&mut bytes);
    }

    output
}

/// Encodes every section and component configuration of `config` in
/// `version` and joins them with [`join_documents`].
pub fn marshal(config: &InternalConfig, version: KubeadmVersion) -> Result<Vec<u8>> {
    let sections = match version {
        KubeadmVersion::V1Alpha3 => encode_sections::<v1alpha3::Document>(config),
        KubeadmVersion::V1Beta1 => encode_sections::<v1beta1::Document>(config),
    }
    .context(EncodeSectionsSnafu { version })?;

    let mut documents: Vec<(String, Vec<u8>)> = sections
        .into_iter()
        .map(|(kind, bytes)| (kind.to_string(), bytes))
        .collect();

    for (component, component_config) in &config.component_configs {
        let bytes = component_config
            .encode(*component)
            .context(EncodeComponentSnafu)?;
        documents.push((component.kind().to_string(), bytes));
    }

    Ok(join_documents(documents))
}
