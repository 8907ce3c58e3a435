use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_yaml::Value as YamlValue;
use std::fmt;

/// A filter operand as it arrives from the request: a scalar or a list of operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Operand>),
}

impl Operand {
    pub fn from_yaml(value: &YamlValue) -> Self {
        match value {
            YamlValue::Null => Operand::Null,
            YamlValue::Bool(b) => Operand::Bool(*b),
            YamlValue::Number(n) => match n.as_i64() {
                Some(i) => Operand::Int(i),
                None => Operand::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            YamlValue::String(s) => Operand::String(s.clone()),
            YamlValue::Sequence(items) => {
                Operand::List(items.iter().map(Self::from_yaml).collect())
            }
            // keyed operands keep their values in order, keys are dropped
            YamlValue::Mapping(map) => Operand::List(map.values().map(Self::from_yaml).collect()),
            YamlValue::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    /// Percent-decodes every string leaf, recursing through lists.
    pub fn decode(self) -> Self {
        match self {
            Operand::String(s) => Operand::String(url_decode(&s)),
            Operand::List(items) => Operand::List(items.into_iter().map(Self::decode).collect()),
            other => other,
        }
    }

    /// Absent and empty-string values are skipped; `0` and `"0"` are not.
    pub fn is_blank(&self) -> bool {
        match self {
            Operand::Null => true,
            Operand::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn into_list(self) -> Vec<Operand> {
        match self {
            Operand::List(items) => items,
            Operand::Null => Vec::new(),
            scalar => vec![scalar],
        }
    }

    /// Text used when the operand is spliced into a `like` pattern.
    pub fn pattern_text(&self) -> Option<String> {
        match self {
            Operand::Null | Operand::Bool(false) => Some(String::new()),
            Operand::Bool(true) => Some("1".to_string()),
            Operand::Int(i) => Some(i.to_string()),
            Operand::Float(f) => Some(f.to_string()),
            Operand::String(s) => Some(s.clone()),
            Operand::List(_) => None,
        }
    }
}

/// Form-style URL decoding: `+` is a space, `%XX` is a byte, malformed escapes pass through.
pub fn url_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => write!(f, "null"),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Int(i) => write!(f, "{}", i),
            Operand::Float(x) => write!(f, "{}", x),
            Operand::String(s) => write!(f, "{:?}", s),
            Operand::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::String(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::String(s)
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Operand::Int(i)
    }
}

impl From<i32> for Operand {
    fn from(i: i32) -> Self {
        Operand::Int(i64::from(i))
    }
}

impl From<f64> for Operand {
    fn from(x: f64) -> Self {
        Operand::Float(x)
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Bool(b)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::List(items.into_iter().map(Into::into).collect())
    }
}
