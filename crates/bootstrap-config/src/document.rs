//! Splits a multi-document YAML stream into raw documents keyed by their
//! declared kind.
//!
//! Only `apiVersion` and `kind` are decoded here. The document bytes are kept
//! verbatim and fully decoded later by the [router](crate::router).

use std::collections::{BTreeMap, btree_map::Entry};

use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("document at index {index} is malformed"))]
    MalformedDocument {
        source: MalformedDocumentError,
        index: usize,
    },

    #[snafu(display(
        "kind {kind:?} is declared more than once, by the documents at index {first} and {second}"
    ))]
    DuplicateKind {
        kind: String,
        first: usize,
        second: usize,
    },
}

#[derive(Debug, Snafu)]
pub enum MalformedDocumentError {
    #[snafu(display("failed to read apiVersion and kind"))]
    ParseTypeMeta { source: serde_yaml::Error },

    #[snafu(display("the document does not declare a kind"))]
    MissingKind,

    #[snafu(display("the {kind} document does not declare an apiVersion"))]
    MissingApiVersion { kind: String },
}

/// One document of a YAML stream together with its declared type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDocument {
    /// The declared `kind`.
    pub kind: String,

    /// The declared `apiVersion`.
    pub api_version: String,

    /// The bytes of the document, excluding the separator lines.
    pub bytes: Vec<u8>,

    /// The position of the document in the stream, counting every chunk
    /// between two separators.
    pub index: usize,
}

/// Raw documents keyed by their declared kind.
pub type Documents = BTreeMap<String, RawDocument>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeMeta {
    api_version: Option<String>,
    kind: Option<String>,
}

/// Splits `input` on `---` separator lines.
///
/// Chunks containing nothing but whitespace and comments are ignored. Every
/// other chunk must declare a `kind` and an `apiVersion`, and no kind may be
/// declared twice.
pub fn split_documents(input: &[u8]) -> Result<Documents> {
    let mut documents = Documents::new();

    for (index, chunk) in chunks(input).into_iter().enumerate() {
        if is_blank(chunk) {
            continue;
        }

        let document = peek(chunk, index).context(MalformedDocumentSnafu { index })?;
        debug!(
            kind = %document.kind,
            api_version = %document.api_version,
            index,
            "found document"
        );

        match documents.entry(document.kind.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(document);
            }
            Entry::Occupied(entry) => {
                return DuplicateKindSnafu {
                    kind: document.kind,
                    first: entry.get().index,
                    second: index,
                }
                .fail();
            }
        }
    }

    Ok(documents)
}

fn peek(chunk: &[u8], index: usize) -> Result<RawDocument, MalformedDocumentError> {
    let type_meta: TypeMeta = serde_yaml::from_slice(chunk).context(ParseTypeMetaSnafu)?;

    let kind = type_meta
        .kind
        .filter(|kind| !kind.is_empty())
        .context(MissingKindSnafu)?;
    let api_version = type_meta
        .api_version
        .filter(|api_version| !api_version.is_empty())
        .context(MissingApiVersionSnafu { kind: &kind })?;

    Ok(RawDocument {
        kind,
        api_version,
        bytes: chunk.to_vec(),
        index,
    })
}

/// Cuts the stream into the chunks between separator lines.
fn chunks(input: &[u8]) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut line_start = 0;

    while line_start < input.len() {
        let line_end = input[line_start..]
            .iter()
            .position(|&byte| byte == b'\n')
            .map_or(input.len(), |position| line_start + position + 1);

        if is_separator(&input[line_start..line_end]) {
            chunks.push(&input[start..line_start]);
            start = line_end;
        }

        line_start = line_end;
    }

    chunks.push(&input[start..]);
    chunks
}

/// A separator line is `---`, optionally followed by whitespace and a
/// comment.
fn is_separator(line: &[u8]) -> bool {
    let Some(rest) = line.strip_prefix(b"---") else {
        return false;
    };

    match rest.first() {
        None => true,
        Some(byte) if byte.is_ascii_whitespace() => {
            let rest = rest.trim_ascii();
            rest.is_empty() || rest.starts_with(b"#")
        }
        Some(_) => false,
    }
}

fn is_blank(chunk: &[u8]) -> bool {
    chunk.split(|&byte| byte == b'\n').all(|line| {
        let line = line.trim_ascii();
        line.is_empty() || line.starts_with(b"#")
    })
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[test]
    fn split_keeps_bytes_verbatim() {
        let input = indoc! {"
            ---
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: InitConfiguration
            ---
            # cluster wide settings
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: ClusterConfiguration
            clusterName: example
        "};

        let documents = split_documents(input.as_bytes()).expect("stream must split");
        assert_eq!(documents.len(), 2);

        let cluster = &documents["ClusterConfiguration"];
        assert_eq!(cluster.api_version, "kubeadm.k8s.io/v1beta1");
        assert_eq!(cluster.index, 2);
        assert_eq!(
            cluster.bytes,
            indoc! {"
                # cluster wide settings
                apiVersion: kubeadm.k8s.io/v1beta1
                kind: ClusterConfiguration
                clusterName: example
            "}
            .as_bytes()
        );

        let init = &documents["InitConfiguration"];
        assert_eq!(init.index, 1);
    }

    #[rstest]
    #[case("")]
    #[case("---\n")]
    #[case("---\n\n---  \n# only a comment\n")]
    fn blank_streams_are_empty(#[case] input: &str) {
        let documents = split_documents(input.as_bytes()).expect("blank stream must split");
        assert!(documents.is_empty());
    }

    #[rstest]
    #[case("---\n", true)]
    #[case("---   \r\n", true)]
    #[case("--- # cluster wide settings\n", true)]
    #[case("---# not a comment\n", false)]
    #[case("----\n", false)]
    #[case("--- kind: Note\n", false)]
    #[case(" ---\n", false)]
    fn separator_lines(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_separator(line.as_bytes()), expected);
    }

    #[test]
    fn separators_may_carry_comments() {
        let input = indoc! {"
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: InitConfiguration
            --- # cluster wide settings
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: ClusterConfiguration
        "};

        let documents = split_documents(input.as_bytes()).expect("stream must split");
        assert_eq!(documents.len(), 2);
        assert_eq!(documents["ClusterConfiguration"].index, 1);
    }

    #[test]
    fn separator_requires_a_full_line() {
        let input = "apiVersion: v1\nkind: Note\ntext: ---not a separator\n";
        let documents = split_documents(input.as_bytes()).expect("stream must split");
        assert_eq!(documents.len(), 1);
    }

    #[rstest]
    #[case("apiVersion: kubeadm.k8s.io/v1beta1\n", "does not declare a kind")]
    #[case("kind: InitConfiguration\n", "does not declare an apiVersion")]
    #[case("kind: \"\"\napiVersion: v1\n", "does not declare a kind")]
    #[case("just a string\n", "failed to read apiVersion and kind")]
    fn malformed_documents(#[case] input: &str, #[case] message: &str) {
        let err = split_documents(input.as_bytes()).expect_err("document is malformed");
        let (source, index) = match err {
            Error::MalformedDocument { source, index } => (source, index),
            other => panic!("expected a malformed document error, got {other:?}"),
        };
        assert_eq!(index, 0);
        assert!(
            source.to_string().contains(message),
            "{source} must contain {message:?}"
        );
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let input = indoc! {"
            apiVersion: kubeadm.k8s.io/v1beta1
            kind: InitConfiguration
            ---
            apiVersion: kubelet.config.k8s.io/v1beta1
            kind: KubeletConfiguration
            ---
            apiVersion: kubeadm.k8s.io/v1alpha3
            kind: InitConfiguration
        "};

        let err = split_documents(input.as_bytes()).expect_err("duplicate kind");
        let (kind, first, second) = match err {
            Error::DuplicateKind {
                kind,
                first,
                second,
            } => (kind, first, second),
            other => panic!("expected a duplicate kind error, got {other:?}"),
        };
        assert_eq!(kind, "InitConfiguration");
        assert_eq!((first, second), (0, 2));
    }
}
