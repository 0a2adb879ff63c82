//! Component configurations embedded next to the kubeadm documents.
//!
//! Their content is owned by the respective component. This crate only routes
//! them, fills in a few values derived from the cluster section and writes
//! them back out with sorted keys.

use std::collections::{BTreeMap, btree_map};

use serde_yaml::{Mapping, Value};
use snafu::{ResultExt, Snafu};
use strum::{AsRefStr, Display, EnumString};

use crate::{
    api_version::Kind,
    constants::{KUBE_PROXY_API_VERSION, KUBELET_API_VERSION},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to deserialize the {component} configuration"))]
    DeserializeComponent {
        source: serde_yaml::Error,
        component: Component,
    },

    #[snafu(display("the {component} configuration must be a mapping"))]
    NotAMapping { component: Component },

    #[snafu(display("failed to serialize the {component} configuration"))]
    SerializeComponent {
        source: serde_yaml::Error,
        component: Component,
    },
}

/// The components whose configuration can be embedded.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, AsRefStr, Display, EnumString)]
pub enum Component {
    #[strum(serialize = "kube-proxy")]
    KubeProxy,

    #[strum(serialize = "kubelet")]
    Kubelet,
}

impl Component {
    pub fn from_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::KubeProxyConfiguration => Some(Self::KubeProxy),
            Kind::KubeletConfiguration => Some(Self::Kubelet),
            Kind::ClusterConfiguration | Kind::InitConfiguration | Kind::JoinConfiguration => None,
        }
    }

    pub fn kind(self) -> Kind {
        match self {
            Self::KubeProxy => Kind::KubeProxyConfiguration,
            Self::Kubelet => Kind::KubeletConfiguration,
        }
    }

    /// The only `apiVersion` accepted for this component.
    pub fn api_version(self) -> &'static str {
        match self {
            Self::KubeProxy => KUBE_PROXY_API_VERSION,
            Self::Kubelet => KUBELET_API_VERSION,
        }
    }
}

/// The fields of one component configuration, without `apiVersion` and
/// `kind`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentConfig {
    fields: Mapping,
}

impl ComponentConfig {
    /// Decodes a raw document of the given component.
    pub fn decode(component: Component, bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_yaml::from_slice(bytes).context(DeserializeComponentSnafu { component })?;
        let Value::Mapping(mut fields) = value else {
            return NotAMappingSnafu { component }.fail();
        };

        fields.remove("apiVersion");
        fields.remove("kind");

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sets `key` to `value` unless the key is already present.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) {
        if !self.fields.contains_key(key) {
            self.fields.insert(key.into(), value.into());
        }
    }

    /// Encodes the configuration as a complete document of `component`, with
    /// all mapping keys sorted.
    pub fn encode(&self, component: Component) -> Result<Vec<u8>> {
        let mut document = self.fields.clone();
        document.insert("apiVersion".into(), component.api_version().into());
        document.insert("kind".into(), component.kind().to_string().into());

        serde_yaml::to_string(&sorted(Value::Mapping(document)))
            .map(String::into_bytes)
            .context(SerializeComponentSnafu { component })
    }
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => {
            let mut entries: Vec<(Value, Value)> = mapping.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| sort_key(a).cmp(&sort_key(b)));
            Value::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted(value)))
                    .collect(),
            )
        }
        Value::Sequence(sequence) => Value::Sequence(sequence.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn sort_key(key: &Value) -> String {
    match key {
        Value::String(key) => key.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

/// The component configurations of one [`InternalConfig`](crate::InternalConfig).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentConfigs(BTreeMap<Component, ComponentConfig>);

impl ComponentConfigs {
    pub fn get(&self, component: Component) -> Option<&ComponentConfig> {
        self.0.get(&component)
    }

    pub fn get_mut(&mut self, component: Component) -> Option<&mut ComponentConfig> {
        self.0.get_mut(&component)
    }

    pub fn contains(&self, component: Component) -> bool {
        self.0.contains_key(&component)
    }

    /// Inserts the configuration of `component`, returning the previous one.
    pub fn insert(
        &mut self,
        component: Component,
        config: ComponentConfig,
    ) -> Option<ComponentConfig> {
        self.0.insert(component, config)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Component, ComponentConfig> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ComponentConfigs {
    type IntoIter = btree_map::Iter<'a, Component, ComponentConfig>;
    type Item = (&'a Component, &'a ComponentConfig);

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn decode_strips_type_meta() {
        let config = ComponentConfig::decode(
            Component::Kubelet,
            indoc! {"
                apiVersion: kubelet.config.k8s.io/v1beta1
                kind: KubeletConfiguration
                clusterDomain: example.local
            "}
            .as_bytes(),
        )
        .expect("kubelet configuration must decode");

        assert_eq!(config.get("apiVersion"), None);
        assert_eq!(
            config.get("clusterDomain").and_then(Value::as_str),
            Some("example.local")
        );
    }

    #[test]
    fn encode_sorts_keys() {
        let mut config = ComponentConfig::default();
        config.set_default("mode", "ipvs");
        config.set_default("bindAddress", "0.0.0.0");
        config.set_default("bindAddress", "127.0.0.1");

        let encoded = config
            .encode(Component::KubeProxy)
            .expect("kube-proxy configuration must encode");
        assert_eq!(
            String::from_utf8(encoded).expect("output is UTF-8"),
            indoc! {"
                apiVersion: kubeproxy.config.k8s.io/v1alpha1
                bindAddress: 0.0.0.0
                kind: KubeProxyConfiguration
                mode: ipvs
            "}
        );
    }

    #[test]
    fn scalar_document_is_rejected() {
        let err = ComponentConfig::decode(Component::KubeProxy, b"just a string\n")
            .expect_err("a scalar is not a configuration");
        assert!(matches!(err, Error::NotAMapping { .. }));
    }
}
