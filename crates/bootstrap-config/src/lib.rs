//! This crate loads, upgrades, defaults, validates and re-serializes the
//! configuration documents of the cluster bootstrap tool.
//!
//! A configuration file is a YAML stream containing one or more documents, each
//! declaring an `apiVersion` and a `kind`. Loading a file runs the following
//! pipeline:
//!
//! 1. The [document splitter](document) cuts the stream into raw documents,
//!    keyed by their declared kind.
//! 2. The [router](router) decodes every raw document with the decoder of its
//!    declared version and converts it into the version independent
//!    [`InternalConfig`].
//! 3. The [defaulter](defaults) fills every optional field that was left unset.
//! 4. The [validator](validation) collects every violation in one pass.
//!
//! The [serializer](serialize) goes the opposite way and emits an
//! [`InternalConfig`] as a deterministic multi-document YAML stream in one of
//! the supported [`KubeadmVersion`]s.
//!
//! ```
//! use bootstrap_config::{KubeadmVersion, load_from_bytes, marshal_to_bytes};
//!
//! let config = load_from_bytes(
//!     b"apiVersion: kubeadm.k8s.io/v1alpha3
//! kind: InitConfiguration
//! apiEndpoint:
//!   advertiseAddress: 192.168.2.2
//! nodeRegistration:
//!   name: control-plane-1
//! ",
//! )
//! .expect("configuration must load");
//!
//! let upgraded = marshal_to_bytes(&config, KubeadmVersion::V1Beta1)
//!     .expect("configuration must serialize");
//! assert!(String::from_utf8_lossy(&upgraded).contains("localAPIEndpoint"));
//! ```

pub mod api_version;
pub mod bootstrap_token;
pub mod component;
pub mod constants;
pub mod conversion;
pub mod defaults;
pub mod document;
pub mod duration;
pub mod internal;
pub mod load;
pub mod net;
pub mod router;
pub mod serialize;
pub mod v1alpha3;
pub mod v1beta1;
pub mod validation;

mod common;

pub use api_version::{GroupVersion, Kind, KubeadmVersion};
pub use internal::InternalConfig;
pub use load::{
    Error, bytes_to_internal, default_and_validate, default_init_configuration, load_from_bytes,
    load_from_file, marshal_to_bytes, migrate,
};
pub use validation::{ValidationError, ValidationErrors};
