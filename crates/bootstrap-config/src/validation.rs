//! Validates a defaulted [`InternalConfig`].
//!
//! Validation never stops at the first problem. Every field is checked and all
//! violations are returned together as [`ValidationErrors`], with at most one
//! error per field.

use std::{
    fmt::{self, Display, Write},
    net::IpAddr,
    path::Path,
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use snafu::Snafu;

use crate::{
    bootstrap_token::BOOTSTRAP_TOKEN_REGEX,
    constants::{
        BOOTSTRAP_TOKEN_GROUP_PREFIX, DNS_ADDON_COREDNS, DNS_ADDON_KUBE_DNS, KNOWN_TAINT_EFFECTS,
        KNOWN_TOKEN_USAGES,
    },
    internal::{
        ApiEndpoint, BootstrapToken, ClusterConfiguration, Discovery, Etcd, InitConfiguration,
        InternalConfig, JoinConfiguration, NodeConfiguration, NodeRegistrationOptions,
    },
    net::{Cidr, split_host_port},
};

const RFC_1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";

static RFC_1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^{RFC_1123_LABEL_FMT}(\.{RFC_1123_LABEL_FMT})*$"))
        .expect("failed to compile RFC 1123 subdomain regex")
});

static BOOTSTRAP_GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^system:bootstrappers:[a-z0-9:-]{0,255}[a-z0-9]$")
        .expect("failed to compile bootstrap group regex")
});

static CA_CERT_HASH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sha256:[0-9a-f]{64}$").expect("failed to compile CA certificate hash regex")
});

type Result<T = (), E = ValidationErrors> = std::result::Result<T, E>;

/// The dotted path of a field inside the configuration, for example
/// `bootstrapTokens[0].token`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new(name: &str) -> Self {
        Self {
            segments: vec![name.to_owned()],
        }
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Self { segments }
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => last.push_str(&format!("[{index}]")),
            None => segments.push(format!("[{index}]")),
        }
        Self { segments }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// The rule a field violates.
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
pub enum ValidationProblem {
    #[snafu(display("required value"))]
    Required,

    #[snafu(display("invalid value {value:?}: {reason}"))]
    Invalid { value: String, reason: String },

    #[snafu(display("unsupported value {value:?}, supported values: {}", supported.join(", ")))]
    NotSupported {
        value: String,
        supported: Vec<String>,
    },

    #[snafu(display("forbidden: {reason}"))]
    Forbidden { reason: String },
}

/// A single violation.
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
#[snafu(display("{field}: {problem}"))]
pub struct ValidationError {
    pub field: FieldPath,
    pub problem: ValidationProblem,
}

/// All violations found in one configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type IntoIter = std::vec::IntoIter<ValidationError>;
    type Item = ValidationError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Collects the violations of one validation pass.
#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    fn push(&mut self, field: &FieldPath, problem: ValidationProblem) {
        self.errors.push(ValidationError {
            field: field.clone(),
            problem,
        });
    }

    fn required(&mut self, field: &FieldPath) {
        self.push(field, ValidationProblem::Required);
    }

    fn invalid(&mut self, field: &FieldPath, value: impl Display, reason: impl Into<String>) {
        self.push(field, ValidationProblem::Invalid {
            value: value.to_string(),
            reason: reason.into(),
        });
    }

    fn not_supported(&mut self, field: &FieldPath, value: &str, supported: &[&str]) {
        self.push(field, ValidationProblem::NotSupported {
            value: value.to_owned(),
            supported: supported.iter().map(|value| (*value).to_owned()).collect(),
        });
    }

    fn forbidden(&mut self, field: &FieldPath, reason: impl Into<String>) {
        self.push(field, ValidationProblem::Forbidden {
            reason: reason.into(),
        });
    }

    /// Records `check`'s error for `field`, if any.
    fn check(&mut self, field: &FieldPath, value: &str, check: fn(&str) -> Option<String>) {
        if let Some(reason) = check(value) {
            self.invalid(field, value, reason);
        }
    }

    fn finish(self) -> Result {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

/// Validates the whole configuration and returns every violation.
pub fn validate(config: &InternalConfig) -> Result {
    let mut validator = Validator::default();

    validate_cluster(&mut validator, &config.cluster);
    match &config.node {
        NodeConfiguration::Init(init) => validate_init(&mut validator, init),
        NodeConfiguration::Join(join) => validate_join(&mut validator, join),
    }

    validator.finish()
}

fn validate_cluster(validator: &mut Validator, cluster: &ClusterConfiguration) {
    validator.check(
        &FieldPath::new("kubernetesVersion"),
        &cluster.kubernetes_version,
        check_kubernetes_version,
    );

    let networking = FieldPath::new("networking");
    let service_subnet = networking.child("serviceSubnet");
    if cluster.networking.service_subnet.is_empty() {
        validator.required(&service_subnet);
    } else {
        validator.check(&service_subnet, &cluster.networking.service_subnet, check_cidr);
    }
    if !cluster.networking.pod_subnet.is_empty() {
        validator.check(
            &networking.child("podSubnet"),
            &cluster.networking.pod_subnet,
            check_cidr,
        );
    }
    validator.check(
        &networking.child("dnsDomain"),
        &cluster.networking.dns_domain,
        check_subdomain,
    );

    validator.check(
        &FieldPath::new("certificatesDir"),
        &cluster.certificates_dir,
        check_absolute_path,
    );

    let cert_sans = FieldPath::new("apiServer").child("certSANs");
    validate_cert_sans(validator, &cert_sans, &cluster.api_server.cert_sans);

    if !cluster.control_plane_endpoint.is_empty() {
        validator.check(
            &FieldPath::new("controlPlaneEndpoint"),
            &cluster.control_plane_endpoint,
            check_endpoint,
        );
    }

    validate_etcd(validator, &cluster.etcd);

    let dns_type = &cluster.dns.dns_type;
    let supported_dns = [DNS_ADDON_COREDNS, DNS_ADDON_KUBE_DNS];
    if !supported_dns.contains(&dns_type.as_str()) {
        validator.not_supported(&FieldPath::new("dns").child("type"), dns_type, &supported_dns);
    }
}

fn validate_cert_sans(validator: &mut Validator, field: &FieldPath, sans: &[String]) {
    for (i, san) in sans.iter().enumerate() {
        validator.check(&field.index(i), san, check_cert_san);
    }
}

fn validate_etcd(validator: &mut Validator, etcd: &Etcd) {
    let field = FieldPath::new("etcd");

    match (&etcd.local, &etcd.external) {
        (Some(_), Some(_)) => {
            validator.forbidden(&field, "local and external etcd are mutually exclusive");
        }
        (None, None) => validator.required(&field),
        (Some(local), None) => {
            let local_field = field.child("local");
            validate_cert_sans(
                validator,
                &local_field.child("serverCertSANs"),
                &local.server_cert_sans,
            );
            validate_cert_sans(
                validator,
                &local_field.child("peerCertSANs"),
                &local.peer_cert_sans,
            );
        }
        (None, Some(external)) => {
            let external_field = field.child("external");
            if external.endpoints.is_empty() {
                validator.required(&external_field.child("endpoints"));
            }
            if external.cert_file.is_empty() != external.key_file.is_empty() {
                validator.invalid(
                    &external_field,
                    format_args!(
                        "certFile={:?}, keyFile={:?}",
                        external.cert_file, external.key_file
                    ),
                    "certFile and keyFile must either both be set or both be empty",
                );
            }
        }
    }
}

fn validate_init(validator: &mut Validator, init: &InitConfiguration) {
    let tokens = FieldPath::new("bootstrapTokens");
    for (i, token) in init.bootstrap_tokens.iter().enumerate() {
        validate_bootstrap_token(validator, &tokens.index(i), token);
    }

    validate_node_registration(
        validator,
        &FieldPath::new("nodeRegistration"),
        &init.node_registration,
    );
    validate_api_endpoint(
        validator,
        &FieldPath::new("localAPIEndpoint"),
        &init.local_api_endpoint,
    );
}

fn validate_bootstrap_token(validator: &mut Validator, field: &FieldPath, token: &BootstrapToken) {
    validator.check(&field.child("token"), &token.token, check_bootstrap_token);

    let usages = field.child("usages");
    for (i, usage) in token.usages.iter().enumerate() {
        if !KNOWN_TOKEN_USAGES.contains(&usage.as_str()) {
            validator.not_supported(&usages.index(i), usage, KNOWN_TOKEN_USAGES);
        }
    }

    let groups = field.child("groups");
    for (i, group) in token.groups.iter().enumerate() {
        if !BOOTSTRAP_GROUP_REGEX.is_match(group) {
            validator.invalid(
                &groups.index(i),
                group,
                format!(
                    "must start with {BOOTSTRAP_TOKEN_GROUP_PREFIX:?} and match {:?}",
                    BOOTSTRAP_GROUP_REGEX.as_str()
                ),
            );
        }
    }
}

fn validate_node_registration(
    validator: &mut Validator,
    field: &FieldPath,
    options: &NodeRegistrationOptions,
) {
    let name = field.child("name");
    if options.name.is_empty() {
        validator.required(&name);
    } else {
        validator.check(&name, &options.name, check_subdomain);
    }

    if options.cri_socket.is_empty() {
        validator.required(&field.child("criSocket"));
    }

    let taints = field.child("taints");
    for (i, taint) in options.taints.iter().flatten().enumerate() {
        if !KNOWN_TAINT_EFFECTS.contains(&taint.effect.as_str()) {
            validator.not_supported(
                &taints.index(i).child("effect"),
                &taint.effect,
                KNOWN_TAINT_EFFECTS,
            );
        }
    }
}

fn validate_api_endpoint(validator: &mut Validator, field: &FieldPath, endpoint: &ApiEndpoint) {
    validator.check(
        &field.child("advertiseAddress"),
        &endpoint.advertise_address,
        check_ip,
    );

    if !(1..=i32::from(u16::MAX)).contains(&endpoint.bind_port) {
        validator.invalid(
            &field.child("bindPort"),
            endpoint.bind_port,
            "must be between 1 and 65535, inclusive",
        );
    }
}

fn validate_join(validator: &mut Validator, join: &JoinConfiguration) {
    validate_discovery(validator, &FieldPath::new("discovery"), &join.discovery);

    validator.check(
        &FieldPath::new("caCertPath"),
        &join.ca_cert_path,
        check_absolute_path,
    );

    validate_node_registration(
        validator,
        &FieldPath::new("nodeRegistration"),
        &join.node_registration,
    );

    if let Some(control_plane) = &join.control_plane {
        validate_api_endpoint(
            validator,
            &FieldPath::new("controlPlane").child("localAPIEndpoint"),
            &control_plane.local_api_endpoint,
        );
    }
}

fn validate_discovery(validator: &mut Validator, field: &FieldPath, discovery: &Discovery) {
    match (&discovery.bootstrap_token, &discovery.file) {
        (Some(_), Some(_)) => validator.forbidden(
            field,
            "bootstrapToken and file discovery are mutually exclusive",
        ),
        (None, None) => validator.invalid(
            field,
            "",
            "either bootstrapToken or file discovery must be set",
        ),
        (Some(bootstrap_token), None) => {
            let bootstrap_field = field.child("bootstrapToken");

            let token = bootstrap_field.child("token");
            if bootstrap_token.token.is_empty() {
                validator.required(&token);
            } else {
                validator.check(&token, &bootstrap_token.token, check_bootstrap_token);
            }

            let endpoint = bootstrap_field.child("apiServerEndpoint");
            if bootstrap_token.api_server_endpoint.is_empty() {
                validator.required(&endpoint);
            } else {
                validator.check(&endpoint, &bootstrap_token.api_server_endpoint, check_endpoint);
            }

            let hashes = bootstrap_field.child("caCertHashes");
            if bootstrap_token.ca_cert_hashes.is_empty()
                && !bootstrap_token.unsafe_skip_ca_verification
            {
                validator.invalid(
                    &hashes,
                    "[]",
                    "at least one hash is required unless unsafeSkipCAVerification is set",
                );
            }
            for (i, hash) in bootstrap_token.ca_cert_hashes.iter().enumerate() {
                if !CA_CERT_HASH_REGEX.is_match(hash) {
                    validator.invalid(&hashes.index(i), hash, "must be sha256:<64 hex characters>");
                }
            }
        }
        (None, Some(file)) => {
            if file.kube_config_path.is_empty() {
                validator.required(&field.child("file").child("kubeConfigPath"));
            }
        }
    }

    let tls_bootstrap_token = field.child("tlsBootstrapToken");
    if discovery.tls_bootstrap_token.is_empty() {
        validator.required(&tls_bootstrap_token);
    } else {
        validator.check(
            &tls_bootstrap_token,
            &discovery.tls_bootstrap_token,
            check_bootstrap_token,
        );
    }
}

fn check_kubernetes_version(value: &str) -> Option<String> {
    let Some(version) = value.strip_prefix('v') else {
        return Some("must start with 'v' followed by a semantic version".to_owned());
    };

    semver::Version::parse(version)
        .err()
        .map(|error| format!("must be a semantic version: {error}"))
}

fn check_cidr(value: &str) -> Option<String> {
    Cidr::from_str(value).err().map(|error| error.to_string())
}

fn check_ip(value: &str) -> Option<String> {
    IpAddr::from_str(value)
        .err()
        .map(|_| "must be a valid IP address".to_owned())
}

fn check_subdomain(value: &str) -> Option<String> {
    if value.len() > RFC_1123_SUBDOMAIN_MAX_LENGTH {
        return Some(format!(
            "must be no more than {RFC_1123_SUBDOMAIN_MAX_LENGTH} characters"
        ));
    }

    (!RFC_1123_SUBDOMAIN_REGEX.is_match(value)).then(|| {
        "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character".to_owned()
    })
}

fn check_absolute_path(value: &str) -> Option<String> {
    (!Path::new(value).is_absolute()).then(|| "must be an absolute path".to_owned())
}

fn check_cert_san(value: &str) -> Option<String> {
    if IpAddr::from_str(value).is_ok() {
        return None;
    }

    let name = value.strip_prefix("*.").unwrap_or(value);
    check_subdomain(name).map(|_| "must be an IP address or a DNS name".to_owned())
}

fn check_endpoint(value: &str) -> Option<String> {
    let (host, port) = split_host_port(value);

    if IpAddr::from_str(host).is_err() && check_subdomain(host).is_some() {
        return Some("the host must be an IP address or a DNS name".to_owned());
    }

    match port.map(u16::from_str) {
        Some(Ok(0) | Err(_)) => Some("the port must be between 1 and 65535, inclusive".to_owned()),
        _ => None,
    }
}

fn check_bootstrap_token(value: &str) -> Option<String> {
    (!BOOTSTRAP_TOKEN_REGEX.is_match(value))
        .then(|| "the bootstrap token must be of the form [a-z0-9]{6}.[a-z0-9]{16}".to_owned())
}
