//! The entry points of the configuration pipeline.

use std::{
    fs,
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};
use tracing::{debug, info, instrument};

use crate::{
    api_version::KubeadmVersion,
    constants::{PLACEHOLDER_ADVERTISE_ADDRESS, PLACEHOLDER_TOKEN},
    defaults::set_defaults,
    document::{self, split_documents},
    internal::{
        ApiEndpoint, BootstrapToken, InitConfiguration, InternalConfig, NodeConfiguration,
    },
    router::{self, route_documents},
    serialize::{self, marshal},
    validation::{ValidationErrors, validate},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read the configuration file {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to split the configuration into documents"))]
    SplitDocuments { source: document::Error },

    #[snafu(display("failed to decode the configuration documents"))]
    RouteDocuments { source: router::Error },

    #[snafu(display("the configuration is invalid"))]
    ValidationFailure { source: ValidationErrors },

    #[snafu(display("failed to serialize the configuration"))]
    Marshal { source: serialize::Error },
}

/// Loads, defaults and validates the configuration file at `path`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_from_file(path: impl AsRef<Path>) -> Result<InternalConfig> {
    let path = path.as_ref();
    let bytes = fs::read(path).context(ReadFileSnafu { path })?;
    info!(bytes = bytes.len(), "read configuration file");

    load_from_bytes(&bytes)
}

/// Loads, defaults and validates a configuration stream.
pub fn load_from_bytes(bytes: &[u8]) -> Result<InternalConfig> {
    default_and_validate(bytes_to_internal(bytes)?)
}

/// Defaults and validates a decoded configuration.
///
/// Callers overriding fields of the decoded configuration, for example from
/// command line flags, apply their overrides before calling this, so the
/// overridden values are validated too.
pub fn default_and_validate(mut config: InternalConfig) -> Result<InternalConfig> {
    set_defaults(&mut config);
    validate(&config).context(ValidationFailureSnafu)?;

    Ok(config)
}

/// Decodes a configuration stream into the internal representation without
/// defaulting or validating it.
pub fn bytes_to_internal(bytes: &[u8]) -> Result<InternalConfig> {
    let documents = split_documents(bytes).context(SplitDocumentsSnafu)?;
    debug!(count = documents.len(), "split configuration stream");

    route_documents(documents).context(RouteDocumentsSnafu)
}

/// Returns a fully defaulted init configuration.
///
/// The bootstrap token and advertise address are placeholders instead of
/// generated or detected values, so the result is stable enough to print as an
/// example.
pub fn default_init_configuration() -> InternalConfig {
    let mut config = InternalConfig {
        node: NodeConfiguration::Init(InitConfiguration {
            bootstrap_tokens: vec![BootstrapToken {
                token: PLACEHOLDER_TOKEN.to_owned(),
                ..BootstrapToken::default()
            }],
            local_api_endpoint: ApiEndpoint {
                advertise_address: PLACEHOLDER_ADVERTISE_ADDRESS.to_owned(),
                bind_port: 0,
            },
            ..InitConfiguration::default()
        }),
        ..InternalConfig::default()
    };

    set_defaults(&mut config);
    config
}

/// Serializes `config` as a multi-document stream of `version`.
pub fn marshal_to_bytes(config: &InternalConfig, version: KubeadmVersion) -> Result<Vec<u8>> {
    marshal(config, version).context(MarshalSnafu)
}

/// Loads a configuration stream of any supported version and re-serializes it
/// as `version`, with all defaults filled in.
#[instrument(skip(bytes))]
pub fn migrate(bytes: &[u8], version: KubeadmVersion) -> Result<Vec<u8>> {
    let config = load_from_bytes(bytes)?;
    marshal_to_bytes(&config, version)
}
