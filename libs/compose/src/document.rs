use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

/// A parsed compose document, typed just enough to let us reason about
/// services and networks; everything else round-trips through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub services: IndexMap<String, Service>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub networks: IndexMap<String, Network>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<NetworksField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Compose accepts `environment:` as either a list of `KEY=VALUE` strings
/// or a mapping; we preserve whichever form the author used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentField {
    List(Vec<String>),
    Map(IndexMap<String, Option<String>>),
}

impl EnvironmentField {
    pub fn insert(&mut self, key: &str, value: &str) {
        match self {
            EnvironmentField::List(list) => {
                list.retain(|entry| !entry.starts_with(&format!("{key}=")));
                list.push(format!("{key}={value}"));
            }
            EnvironmentField::Map(map) => {
                map.insert(key.to_string(), Some(value.to_string()));
            }
        }
    }
}

/// Compose accepts `networks:` as either a list of network names or a
/// mapping of network name to per-service network config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworksField {
    List(Vec<String>),
    Map(IndexMap<String, Value>),
}

impl NetworksField {
    pub fn contains(&self, name: &str) -> bool {
        match self {
            NetworksField::List(list) => list.iter().any(|n| n == name),
            NetworksField::Map(map) => map.contains_key(name),
        }
    }

    pub fn attach(&mut self, name: &str) {
        if self.contains(name) {
            return;
        }
        match self {
            NetworksField::List(list) => list.push(name.to_string()),
            NetworksField::Map(map) => {
                map.insert(name.to_string(), Value::Null);
            }
        }
    }
}

impl Default for NetworksField {
    fn default() -> Self {
        NetworksField::List(Vec::new())
    }
}
