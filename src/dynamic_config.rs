use serde::{de::DeserializeOwned, Serialize};

use crate::eval::{Decision, DecisionSource};

/// Value of a dynamic config (or experiment) for a user.
///
/// Getters return `None` when the key is missing or holds a value of another type.
///
/// ```
/// # fn f(client: &featuregate::Client) -> featuregate::Result<()> {
/// let config = client.get_config(&featuregate::User::new("user-42"), "homepage_banner")?;
/// let title = config.get_str("title").unwrap_or("Welcome");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicConfig {
    /// Name of the config.
    pub name: String,
    /// The config value, normally a JSON object.
    pub value: serde_json::Value,
    /// Rule that produced the value.
    #[serde(rename = "ruleID")]
    pub rule_id: String,
    /// Where the value came from.
    pub source: DecisionSource,
}

impl DynamicConfig {
    pub(crate) fn from_decision(name: &str, decision: Decision) -> DynamicConfig {
        let value = decision
            .config_value()
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        DynamicConfig {
            name: name.to_owned(),
            value,
            rule_id: decision.rule_id,
            source: decision.source,
        }
    }

    #[allow(missing_docs)]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value.get(key)?.as_str()
    }

    #[allow(missing_docs)]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.value.get(key)?.as_f64()
    }

    #[allow(missing_docs)]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.value.get(key)?.as_i64()
    }

    #[allow(missing_docs)]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.value.get(key)?.as_bool()
    }

    /// Deserialize the value under `key` into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.value.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                log::debug!(target: "featuregate",
                            config = self.name.as_str(),
                            key;
                            "config value has unexpected type: {err}");
                None
            }
        }
    }
}
