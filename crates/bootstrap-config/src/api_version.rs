use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{Snafu, ensure};
use strum::{AsRefStr, Display, EnumString};

use crate::constants::KUBEADM_GROUP;

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v[1-9][0-9]*(?:(?:alpha|beta)[1-9][0-9]*)?$")
        .expect("failed to compile API version regex")
});

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseGroupVersionError {
    #[snafu(display("group cannot be empty"))]
    EmptyGroup,

    #[snafu(display("{version:?} is not a valid API version, expected v<MAJOR>(alpha|beta<LEVEL>)"))]
    InvalidVersion { version: String },
}

/// A declared `apiVersion` with the `(<GROUP>/)<VERSION>` format, for example
/// `kubeadm.k8s.io/v1beta1` or `v1`.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct GroupVersion {
    pub group: Option<String>,
    pub version: String,
}

impl FromStr for GroupVersion {
    type Err = ParseGroupVersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (group, version) = match input.split_once('/') {
            Some((group, version)) => {
                ensure!(!group.is_empty(), EmptyGroupSnafu);
                (Some(group.to_owned()), version)
            }
            None => (None, input),
        };

        ensure!(VERSION_REGEX.is_match(version), InvalidVersionSnafu { version });

        Ok(Self {
            group,
            version: version.to_owned(),
        })
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{group}/{version}", version = self.version),
            None => f.write_str(&self.version),
        }
    }
}

/// The on-disk versions of the `kubeadm.k8s.io` group, ordered from oldest to
/// newest.
///
/// Every version converts to and from the internal representation. Two on-disk
/// versions are never converted directly into each other.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum KubeadmVersion {
    V1Alpha3,
    V1Beta1,
}

impl KubeadmVersion {
    pub const LATEST: Self = Self::V1Beta1;

    /// Returns the full `apiVersion` string, e.g. `kubeadm.k8s.io/v1beta1`.
    pub fn api_version(self) -> String {
        format!("{KUBEADM_GROUP}/{self}")
    }

    /// Looks up the kubeadm version declared by `group_version`, if it is one
    /// of the known ones.
    pub fn from_group_version(group_version: &GroupVersion) -> Option<Self> {
        if group_version.group.as_deref() != Some(KUBEADM_GROUP) {
            return None;
        }

        Self::from_str(&group_version.version).ok()
    }
}

/// Every document kind the router knows how to handle.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, AsRefStr, Display, EnumString)]
pub enum Kind {
    ClusterConfiguration,
    InitConfiguration,
    JoinConfiguration,
    KubeProxyConfiguration,
    KubeletConfiguration,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("kubeadm.k8s.io/v1beta1", GroupVersion { group: Some("kubeadm.k8s.io".into()), version: "v1beta1".into() })]
    #[case("kubeproxy.config.k8s.io/v1alpha1", GroupVersion { group: Some("kubeproxy.config.k8s.io".into()), version: "v1alpha1".into() })]
    #[case("v1", GroupVersion { group: None, version: "v1".into() })]
    fn valid_group_version(#[case] input: &str, #[case] expected: GroupVersion) {
        let group_version = GroupVersion::from_str(input).expect("valid group version");
        assert_eq!(group_version, expected);
        assert_eq!(group_version.to_string(), input);
    }

    #[rstest]
    #[case("/v1beta1", ParseGroupVersionError::EmptyGroup)]
    #[case("kubeadm.k8s.io/beta1", ParseGroupVersionError::InvalidVersion { version: "beta1".into() })]
    #[case("kubeadm.k8s.io/v1gamma1", ParseGroupVersionError::InvalidVersion { version: "v1gamma1".into() })]
    #[case("", ParseGroupVersionError::InvalidVersion { version: "".into() })]
    fn invalid_group_version(#[case] input: &str, #[case] expected: ParseGroupVersionError) {
        let err = GroupVersion::from_str(input).expect_err("invalid group version");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("kubeadm.k8s.io/v1alpha3", Some(KubeadmVersion::V1Alpha3))]
    #[case("kubeadm.k8s.io/v1beta1", Some(KubeadmVersion::V1Beta1))]
    #[case("kubeadm.k8s.io/v1beta2", None)]
    #[case("foo.k8s.io/v1beta1", None)]
    fn kubeadm_version_lookup(#[case] input: &str, #[case] expected: Option<KubeadmVersion>) {
        let group_version = GroupVersion::from_str(input).expect("valid group version");
        assert_eq!(KubeadmVersion::from_group_version(&group_version), expected);
    }

    #[test]
    fn versions_are_ordered_oldest_first() {
        assert!(KubeadmVersion::V1Alpha3 < KubeadmVersion::V1Beta1);
        assert_eq!(KubeadmVersion::LATEST.api_version(), "kubeadm.k8s.io/v1beta1");
    }
}
