//! Gate and dynamic config definitions as served by the control plane.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Response of the `download_config_specs` endpoint.
///
/// When `has_updates` is `true`, the payload is a full replacement of every gate and config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct DownloadConfigSpecsResponse {
    #[serde(default)]
    pub has_updates: bool,
    /// Server sync time in epoch milliseconds. Becomes `sinceTime` of the next request.
    #[serde(default)]
    pub time: i64,
    /// Values are wrapped in `TryParse` so that if we fail to parse one spec (e.g., new server
    /// format), we can still serve the others.
    #[serde(default)]
    pub feature_gates: Vec<TryParse<ConfigSpec>>,
    #[serde(default)]
    pub dynamic_configs: Vec<TryParse<ConfigSpec>>,
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
///
/// The engine treats anything that failed to parse as undecidable locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}

impl<T> From<T> for TryParse<T> {
    fn from(value: T) -> TryParse<T> {
        TryParse::Parsed(value)
    }
}

/// A feature gate or dynamic config definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ConfigSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub spec_type: String,
    #[serde(default)]
    pub salt: String,
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub default_value: serde_json::Value,
}

/// One clause of a spec. Rules are evaluated in order and the first one that matches and passes
/// its percentage wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    pub id: String,
    /// Overrides the spec salt for bucketing when non-empty.
    #[serde(default)]
    pub salt: String,
    /// In `[0, 100]`, may be fractional.
    pub pass_percentage: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub return_value: serde_json::Value,
}

/// One atomic predicate of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Condition {
    /// `ParseFailed` if the type is not known to this SDK.
    #[serde(rename = "type")]
    pub condition_type: TryParse<ConditionType>,
    /// `ParseFailed` if the operator is not known to this SDK. Missing for `public` conditions.
    #[serde(default)]
    pub operator: Option<TryParse<Operator>>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub target_value: serde_json::Value,
    #[serde(default)]
    pub additional_values: HashMap<String, serde_json::Value>,
}

/// Where a condition takes its operand from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Always passes.
    Public,
    /// A named user field, custom or private attribute.
    UserField,
    /// A named entry of the merged environment.
    EnvironmentField,
    /// Current wall-clock time in epoch milliseconds.
    CurrentTime,
    /// A field derived from the user's IP (e.g., `country`).
    IpBased,
    /// A field derived from the user agent (e.g., `os_name`).
    UaBased,
    /// Passes if the gate named in `target_value` passes.
    PassGate,
    /// Passes if the gate named in `target_value` fails.
    FailGate,
    /// The user's bucket in `[0, 1000)` under `additional_values.salt`.
    UserBucket,
    /// The user's unit identifier.
    UnitId,
}

/// Comparison applied to the condition operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    VersionGt,
    VersionGte,
    VersionLt,
    VersionLte,
    VersionEq,
    VersionNeq,
    Any,
    #[serde(rename = "none")]
    NoneOf,
    AnyCaseSensitive,
    NoneCaseSensitive,
    StrStartsWithAny,
    StrEndsWithAny,
    StrContainsAny,
    StrContainsNone,
    StrMatches,
    Eq,
    Neq,
    Before,
    After,
    On,
}
