use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde_yaml::Value;
use tracing::debug;

use crate::error::ConfigurationError;

/// ================================
/// Generic string-keyed configuration
/// ================================
/// Stand-in for the host application's configuration object: a flat
/// `key -> value` string map. Values can be set programmatically or
/// loaded from YAML, where nested mappings flatten to dotted keys and
/// `${VAR:default}` placeholders expand from the environment before
/// parsing.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    values: HashMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` when the key is absent.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }

    /// Integer value for `key`, or `default` when the key is absent.
    /// A present but unparseable value is a configuration error.
    pub fn get_i64(&self, key: &str, default: i64) -> Result<i64, ConfigurationError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigurationError::InvalidValue {
                    key: key.to_owned(),
                    value: raw.to_owned(),
                    reason: "expected an integer".to_owned(),
                }),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64, ConfigurationError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigurationError::InvalidValue {
                    key: key.to_owned(),
                    value: raw.to_owned(),
                    reason: "expected a number".to_owned(),
                }),
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Malformed(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML into flat dotted keys: `vault: { token: t }` becomes
    /// `vault.token = t`. Scalar leaves stringify; sequences have no
    /// place in a flat key space and are rejected.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let expanded = expand_env_vars(content);
        let root: Value = serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigurationError::Malformed(e.to_string()))?;

        let mut values = HashMap::new();
        match &root {
            Value::Null => {}
            Value::Mapping(_) => flatten("", &root, &mut values)?,
            _ => {
                return Err(ConfigurationError::Malformed(
                    "top level must be a mapping".to_owned(),
                ))
            }
        }
        debug!("loaded {} configuration entries", values.len());
        Ok(Self { values })
    }
}

fn flatten(
    prefix: &str,
    node: &Value,
    out: &mut HashMap<String, String>,
) -> Result<(), ConfigurationError> {
    match node {
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = k.as_str().ok_or_else(|| {
                    ConfigurationError::Malformed(format!("non-string key under '{prefix}'"))
                })?;
                let child = if prefix.is_empty() {
                    key.to_owned()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&child, v, out)?;
            }
        }
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_owned(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_owned(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_owned(), s.clone());
        }
        _ => {
            return Err(ConfigurationError::Malformed(format!(
                "unsupported value at '{prefix}'"
            )))
        }
    }
    Ok(())
}

fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
