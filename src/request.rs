use crate::filter::Operand;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

pub const DEFAULT_FILTER_KEY: &str = "filter";
pub const DEFAULT_FILTER_ANY_KEY: &str = "filter_any";

/// Request keys holding the AND-combined and OR-combined filter mappings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterKeys {
    #[serde(default = "default_filter_key", rename = "filter_key")]
    pub all: String,
    #[serde(default = "default_filter_any_key", rename = "filter_any_key")]
    pub any: String,
}

fn default_filter_key() -> String {
    DEFAULT_FILTER_KEY.to_string()
}

fn default_filter_any_key() -> String {
    DEFAULT_FILTER_ANY_KEY.to_string()
}

impl Default for FilterKeys {
    fn default() -> Self {
        Self {
            all: default_filter_key(),
            any: default_filter_any_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A bare value, matched as a substring.
    Scalar(Operand),
    /// Operator keyword to operand, in request order.
    Operators(Vec<(String, Operand)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    pub key: String,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub all: Vec<FilterEntry>,
    pub any: Vec<FilterEntry>,
}

impl FilterValue {
    pub fn scalar(value: impl Into<Operand>) -> Self {
        FilterValue::Scalar(value.into())
    }

    pub fn operators<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        FilterValue::Operators(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn from_yaml(value: &YamlValue) -> Self {
        match value {
            YamlValue::Mapping(map) => FilterValue::Operators(
                map.iter()
                    .map(|(k, v)| (key_to_string(k), Operand::from_yaml(v)))
                    .collect(),
            ),
            // a list arrives keyed by position; those keys never name an operator
            YamlValue::Sequence(items) => FilterValue::Operators(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Operand::from_yaml(v)))
                    .collect(),
            ),
            YamlValue::Tagged(tagged) => Self::from_yaml(&tagged.value),
            scalar => FilterValue::Scalar(Operand::from_yaml(scalar)),
        }
    }
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.all.push(FilterEntry {
            key: key.into(),
            value,
        });
        self
    }

    pub fn with_any(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.any.push(FilterEntry {
            key: key.into(),
            value,
        });
        self
    }

    /// Pulls both filter mappings out of a decoded request.
    ///
    /// A missing key, or one holding anything but a mapping, gives an empty group.
    pub fn from_request(request: &YamlValue, keys: &FilterKeys) -> Self {
        Self {
            all: entries(request, &keys.all),
            any: entries(request, &keys.any),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }
}

fn entries(request: &YamlValue, key: &str) -> Vec<FilterEntry> {
    let Some(map) = request.get(key).and_then(YamlValue::as_mapping) else {
        return Vec::new();
    };

    map.iter()
        .map(|(k, v)| FilterEntry {
            key: key_to_string(k),
            value: FilterValue::from_yaml(v),
        })
        .collect()
}

fn key_to_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
