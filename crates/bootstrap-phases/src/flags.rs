//! Names of the command line flags phases declare they read.

pub const APISERVER_ADVERTISE_ADDRESS: &str = "apiserver-advertise-address";
pub const APISERVER_BIND_PORT: &str = "apiserver-bind-port";
pub const CONFIG: &str = "config";
pub const CONTROL_PLANE: &str = "experimental-control-plane";
pub const NODE_NAME: &str = "node-name";
pub const TOKEN_DISCOVERY: &str = "discovery-token";
pub const TOKEN_DISCOVERY_CA_CERT_HASH: &str = "discovery-token-ca-cert-hash";
pub const TOKEN_DISCOVERY_SKIP_CA_HASH: &str = "discovery-token-unsafe-skip-ca-verification";
pub const CERTIFICATE_KEY: &str = "certificate-key";
