use std::{cmp::Ordering, collections::HashMap};

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;

use crate::{
    eval::{EvalContext, RemoteReason},
    sharder::USER_BUCKET_SPACE,
    spec::{Condition, ConditionType, Operator, Rule, TryParse},
    AttributeValue,
};

impl Rule {
    /// Return `true` if every condition of the rule holds.
    ///
    /// All conditions are evaluated even after one fails, so that an undecidable condition
    /// anywhere in the rule sends the lookup to the server instead of producing a guess.
    pub(crate) fn matches(&self, ctx: &EvalContext) -> Result<bool, RemoteReason> {
        let mut all_hold = true;
        for condition in &self.conditions {
            all_hold &= condition.eval(ctx)?;
        }
        Ok(all_hold)
    }
}

impl Condition {
    /// Reason this condition can never be evaluated locally, regardless of the user.
    pub(crate) fn unsupported(&self) -> Option<RemoteReason> {
        self.parsed().err()
    }

    fn parsed(&self) -> Result<(ConditionType, Option<Operator>), RemoteReason> {
        let condition_type = match &self.condition_type {
            TryParse::Parsed(condition_type) => *condition_type,
            TryParse::ParseFailed(raw) => {
                return Err(RemoteReason::UnsupportedConditionType(raw.to_string()))
            }
        };
        let operator = match &self.operator {
            Some(TryParse::Parsed(operator)) => Some(*operator),
            Some(TryParse::ParseFailed(raw)) => {
                return Err(RemoteReason::UnsupportedOperator(raw.to_string()))
            }
            None => None,
        };
        if operator.is_none() && condition_type.needs_operator() {
            return Err(RemoteReason::UnsupportedOperator("null".to_owned()));
        }
        Ok((condition_type, operator))
    }

    pub(crate) fn eval(&self, ctx: &EvalContext) -> Result<bool, RemoteReason> {
        let (condition_type, operator) = self.parsed()?;

        let field = self.field.as_deref();
        let value = match condition_type {
            ConditionType::Public => return Ok(true),
            ConditionType::PassGate | ConditionType::FailGate => {
                let Some(gate_name) = self.target_value.as_str() else {
                    return Ok(false);
                };
                let passed = ctx.eval_nested_gate(gate_name)?;
                return Ok(passed == (condition_type == ConditionType::PassGate));
            }
            ConditionType::UserField => field.and_then(|field| ctx.user.get_field(field)),
            ConditionType::EnvironmentField => {
                field.and_then(|field| ctx.user.get_environment_field(field))
            }
            ConditionType::CurrentTime => {
                Some(AttributeValue::Number(ctx.now.timestamp_millis() as f64))
            }
            ConditionType::IpBased => server_derived(ctx, field, ctx.user.ip.as_deref())?,
            ConditionType::UaBased => {
                server_derived(ctx, field, ctx.user.user_agent.as_deref())?
            }
            ConditionType::UserBucket => {
                let salt = self
                    .additional_values
                    .get("salt")
                    .and_then(|salt| salt.as_str())
                    .unwrap_or_default();
                let bucket = ctx
                    .sharder
                    .get_bucket(salt, &ctx.user.user_id, USER_BUCKET_SPACE);
                Some(AttributeValue::Number(bucket as f64))
            }
            ConditionType::UnitId => Some(ctx.user.user_id.as_str().into()),
        };

        match operator {
            Some(operator) => Ok(operator.eval(
                value.as_ref(),
                &self.target_value,
                &self.additional_values,
            )),
            None => Err(RemoteReason::UnsupportedOperator("null".to_owned())),
        }
    }
}

impl ConditionType {
    fn needs_operator(self) -> bool {
        !matches!(
            self,
            ConditionType::Public | ConditionType::PassGate | ConditionType::FailGate
        )
    }
}

/// Resolve a field that the server derives from a raw user property (IP, user agent).
///
/// An explicitly provided user field wins. Otherwise, if the raw property is present, only the
/// server can derive the value.
fn server_derived(
    ctx: &EvalContext,
    field: Option<&str>,
    raw_source: Option<&str>,
) -> Result<Option<AttributeValue>, RemoteReason> {
    let Some(field) = field else {
        return Ok(None);
    };
    if let Some(value) = ctx.user.get_field(field) {
        return Ok(Some(value));
    }
    match raw_source {
        Some(_) => Err(RemoteReason::ServerDerivedField(field.to_owned())),
        None => Ok(None),
    }
}

impl Operator {
    /// Applying `Operator` to the values. Returns `false` if the attribute is missing, the
    /// operator cannot be applied, or there's a misconfiguration.
    pub(crate) fn eval(
        &self,
        attribute: Option<&AttributeValue>,
        target: &serde_json::Value,
        additional_values: &HashMap<String, serde_json::Value>,
    ) -> bool {
        self.try_eval(attribute, target, additional_values)
            .unwrap_or(false)
    }

    /// Try applying `Operator` to the values, returning `None` if the operator cannot be applied.
    fn try_eval(
        &self,
        attribute: Option<&AttributeValue>,
        target: &serde_json::Value,
        additional_values: &HashMap<String, serde_json::Value>,
    ) -> Option<bool> {
        let attribute = attribute?;

        match self {
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                let attribute = attribute_as_number(attribute)?;
                let target = json_as_number(target)?;
                Some(match self {
                    Self::Gt => attribute > target,
                    Self::Gte => attribute >= target,
                    Self::Lt => attribute < target,
                    _ => attribute <= target,
                })
            }

            Self::VersionGt
            | Self::VersionGte
            | Self::VersionLt
            | Self::VersionLte
            | Self::VersionEq
            | Self::VersionNeq => {
                let attribute = parse_version(&attribute_as_string(attribute)?)?;
                let target = parse_version(&json_as_string(target)?)?;
                let ordering = compare_versions(&attribute, &target);
                Some(match self {
                    Self::VersionGt => ordering == Ordering::Greater,
                    Self::VersionGte => ordering != Ordering::Less,
                    Self::VersionLt => ordering == Ordering::Less,
                    Self::VersionLte => ordering != Ordering::Greater,
                    Self::VersionEq => ordering == Ordering::Equal,
                    _ => ordering != Ordering::Equal,
                })
            }

            Self::Any | Self::NoneOf | Self::AnyCaseSensitive | Self::NoneCaseSensitive => {
                let attribute = attribute_as_string(attribute)?;
                let case_sensitive = matches!(self, Self::AnyCaseSensitive | Self::NoneCaseSensitive);
                let is_one_of = targets(target).any(|target| {
                    json_as_string(target).is_some_and(|target| {
                        if case_sensitive {
                            target == attribute
                        } else {
                            eq_ignore_case(&target, &attribute)
                        }
                    })
                });
                let has_to_be_one_of = matches!(self, Self::Any | Self::AnyCaseSensitive);
                Some(is_one_of == has_to_be_one_of)
            }

            Self::StrStartsWithAny
            | Self::StrEndsWithAny
            | Self::StrContainsAny
            | Self::StrContainsNone => {
                let attribute = attribute_as_string(attribute)?.to_lowercase();
                let found = targets(target)
                    .filter_map(json_as_string)
                    .map(|target| target.to_lowercase())
                    .any(|target| match self {
                        Self::StrStartsWithAny => attribute.starts_with(&target),
                        Self::StrEndsWithAny => attribute.ends_with(&target),
                        _ => attribute.contains(&target),
                    });
                Some(if *self == Self::StrContainsNone {
                    !found
                } else {
                    found
                })
            }

            Self::StrMatches => {
                let attribute = attribute_as_string(attribute)?;
                let regex = Regex::new(target.as_str()?).ok()?;
                Some(regex.is_match(&attribute))
            }

            Self::Eq | Self::Neq => {
                let case_sensitive = additional_values
                    .get("case_sensitive")
                    .and_then(|value| value.as_bool())
                    .unwrap_or(true);
                let equal = values_equal(attribute, target, case_sensitive)?;
                Some(equal == (*self == Self::Eq))
            }

            Self::Before | Self::After | Self::On => {
                let attribute = attribute_as_time(attribute)?;
                let target = json_as_time(target)?;
                Some(match self {
                    Self::Before => attribute < target,
                    Self::After => attribute > target,
                    _ => attribute.date_naive() == target.date_naive(),
                })
            }
        }
    }
}

/// Iterate a target that is either a list of operands or a single operand.
fn targets(target: &serde_json::Value) -> Box<dyn Iterator<Item = &serde_json::Value> + '_> {
    match target {
        serde_json::Value::Array(values) => Box::new(values.iter()),
        serde_json::Value::Null => Box::new(std::iter::empty()),
        value => Box::new(std::iter::once(value)),
    }
}

fn attribute_as_number(attribute: &AttributeValue) -> Option<f64> {
    match attribute {
        AttributeValue::Number(n) => Some(*n),
        AttributeValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn attribute_as_string(attribute: &AttributeValue) -> Option<String> {
    match attribute {
        AttributeValue::String(s) => Some(s.clone()),
        AttributeValue::Number(n) => Some(n.to_string()),
        AttributeValue::Boolean(b) => Some(b.to_string()),
        AttributeValue::Null => None,
    }
}

fn json_as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_as_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        // Going through f64 so that `42` and `42.0` both render as "42", same as attributes.
        serde_json::Value::Number(n) => n.as_f64().map(|n| n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Unicode-aware, like the lowercasing done by the `str_*` operators.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn values_equal(
    attribute: &AttributeValue,
    target: &serde_json::Value,
    case_sensitive: bool,
) -> Option<bool> {
    match (attribute, target) {
        (AttributeValue::String(a), serde_json::Value::String(t)) => Some(if case_sensitive {
            a == t
        } else {
            eq_ignore_case(a, t)
        }),
        (AttributeValue::Boolean(a), serde_json::Value::Bool(t)) => Some(a == t),
        (AttributeValue::Null, _) => None,
        _ => Some(attribute_as_number(attribute)? == json_as_number(target)?),
    }
}

/// Parse a dotted version, ignoring any `-suffix`. `"1.2.3-beta"` parses as `[1, 2, 3]`.
fn parse_version(version: &str) -> Option<Vec<u64>> {
    let version = version.trim();
    let core = version.split('-').next()?;
    if core.is_empty() {
        return None;
    }
    core.split('.')
        .map(|segment| segment.parse::<u64>().ok())
        .collect()
}

/// Compare segment-wise as numbers, treating missing segments as zero (`1.2 == 1.2.0`).
fn compare_versions(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let a = a.get(i).copied().unwrap_or(0);
            let b = b.get(i).copied().unwrap_or(0);
            a.cmp(&b)
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn millis_to_time(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}

fn str_to_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(millis) = s.parse::<f64>() {
        return millis_to_time(millis);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn attribute_as_time(attribute: &AttributeValue) -> Option<DateTime<Utc>> {
    match attribute {
        AttributeValue::Number(n) => millis_to_time(*n),
        AttributeValue::String(s) => str_to_time(s),
        _ => None,
    }
}

fn json_as_time(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => millis_to_time(n.as_f64()?),
        serde_json::Value::String(s) => str_to_time(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{compare_versions, parse_version};
    use crate::{
        eval::{EvalContext, RemoteReason},
        sharder::Sha256Sharder,
        spec::{Operator, Rule},
        testing::{condition, rule, snapshot, spec},
        AttributeValue, User,
    };

    fn eval(operator: Operator, attribute: Option<AttributeValue>, target: serde_json::Value) -> bool {
        operator.eval(attribute.as_ref(), &target, &HashMap::new())
    }

    fn eval_condition(condition_json: serde_json::Value, user: &User) -> Result<bool, RemoteReason> {
        let snapshot = snapshot(vec![], vec![]);
        let ctx = EvalContext::new(&snapshot, user, Utc::now(), &Sha256Sharder);
        condition(condition_json).eval(&ctx)
    }

    #[test]
    fn numeric_comparisons() {
        assert!(eval(Operator::Gt, Some(19.0.into()), json!(18)));
        assert!(!eval(Operator::Gt, Some(18.0.into()), json!(18)));
        assert!(eval(Operator::Gte, Some(18.0.into()), json!(18)));
        assert!(eval(Operator::Lt, Some(17.0.into()), json!(18)));
        assert!(eval(Operator::Lte, Some("18".into()), json!("18.0")));
        assert!(!eval(Operator::Lt, Some("abc".into()), json!(18)));
    }

    #[test]
    fn version_comparisons_are_segment_wise() {
        assert!(eval(Operator::VersionGt, Some("1.10.0".into()), json!("1.9.0")));
        assert!(eval(Operator::VersionLt, Some("1.2".into()), json!("1.10")));
        assert!(eval(Operator::VersionEq, Some("1.2".into()), json!("1.2.0")));
        assert!(eval(Operator::VersionGte, Some("2.0.0-beta".into()), json!("2.0.0")));
        assert!(eval(Operator::VersionLte, Some("0.9.9".into()), json!("1.0.0")));
        assert!(eval(Operator::VersionNeq, Some("1.0.1".into()), json!("1.0.0")));
        assert!(!eval(Operator::VersionGt, Some("not.a.version".into()), json!("1.0.0")));
    }

    #[test]
    fn parse_and_compare_versions() {
        assert_eq!(parse_version("1.2.3-rc1"), Some(vec![1, 2, 3]));
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("1..2"), None);
        assert_eq!(
            compare_versions(&[1, 2], &[1, 2, 0, 0]),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn any_is_case_insensitive() {
        assert!(eval(Operator::Any, Some("US".into()), json!(["us", "ca"])));
        assert!(!eval(Operator::Any, Some("mx".into()), json!(["us", "ca"])));
        assert!(eval(Operator::NoneOf, Some("mx".into()), json!(["us", "ca"])));
        assert!(!eval(Operator::NoneOf, Some("US".into()), json!(["us", "ca"])));
    }

    #[test]
    fn case_insensitive_operators_fold_non_ascii() {
        let name = || Some(AttributeValue::from("Ümit"));
        assert!(eval(Operator::Any, name(), json!(["ümit"])));
        assert!(!eval(Operator::NoneOf, name(), json!(["ümit"])));
        assert!(eval(Operator::StrContainsAny, name(), json!(["ü"])));
        assert!(!eval(Operator::AnyCaseSensitive, name(), json!(["ümit"])));

        let case_insensitive = HashMap::from([("case_sensitive".to_owned(), json!(false))]);
        assert!(Operator::Eq.eval(name().as_ref(), &json!("ÜMIT"), &case_insensitive));
        assert!(!Operator::Eq.eval(name().as_ref(), &json!("ümit"), &HashMap::new()));
    }

    #[test]
    fn any_case_sensitive() {
        assert!(!eval(Operator::AnyCaseSensitive, Some("US".into()), json!(["us"])));
        assert!(eval(Operator::AnyCaseSensitive, Some("us".into()), json!(["us"])));
        assert!(eval(Operator::NoneCaseSensitive, Some("US".into()), json!(["us"])));
    }

    #[test]
    fn any_matches_numbers_and_booleans() {
        assert!(eval(Operator::Any, Some(42.0.into()), json!([42, 43])));
        assert!(eval(Operator::Any, Some(42.0.into()), json!(["42"])));
        assert!(eval(Operator::Any, Some(true.into()), json!(["true"])));
    }

    #[test]
    fn missing_attribute_is_false_for_every_operator() {
        assert!(!eval(Operator::Any, None, json!(["a"])));
        assert!(!eval(Operator::NoneOf, None, json!(["a"])));
        assert!(!eval(Operator::Neq, None, json!("a")));
        assert!(!eval(Operator::StrContainsNone, None, json!(["a"])));
    }

    #[test]
    fn string_operators() {
        let email = Some(AttributeValue::from("Jane@Example.com"));
        assert!(eval(Operator::StrStartsWithAny, email.clone(), json!(["jane"])));
        assert!(eval(Operator::StrEndsWithAny, email.clone(), json!(["@example.com"])));
        assert!(eval(Operator::StrContainsAny, email.clone(), json!(["EXAMPLE"])));
        assert!(!eval(Operator::StrContainsNone, email.clone(), json!(["example"])));
        assert!(eval(Operator::StrContainsNone, email, json!(["statsig"])));
    }

    #[test]
    fn regex_match() {
        assert!(eval(Operator::StrMatches, Some("test@example.com".into()), json!("^test.*")));
        assert!(!eval(Operator::StrMatches, Some("example@test.com".into()), json!("^test.*")));
        assert!(!eval(Operator::StrMatches, Some("anything".into()), json!("(unclosed")));
    }

    #[test]
    fn equality() {
        assert!(eval(Operator::Eq, Some("abc".into()), json!("abc")));
        assert!(!eval(Operator::Eq, Some("ABC".into()), json!("abc")));
        assert!(eval(Operator::Eq, Some(3.0.into()), json!(3)));
        assert!(eval(Operator::Eq, Some(false.into()), json!(false)));
        assert!(eval(Operator::Neq, Some("abc".into()), json!("abd")));

        let case_insensitive = HashMap::from([("case_sensitive".to_owned(), json!(false))]);
        assert!(Operator::Eq.eval(Some(&"ABC".into()), &json!("abc"), &case_insensitive));
    }

    #[test]
    fn time_operators() {
        let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let noon_ms = AttributeValue::Number(noon.timestamp_millis() as f64);

        assert!(eval(Operator::Before, Some(noon_ms.clone()), json!("2024-05-02T00:00:00Z")));
        assert!(eval(Operator::After, Some(noon_ms.clone()), json!(noon.timestamp_millis() - 1)));
        assert!(eval(Operator::On, Some(noon_ms.clone()), json!("2024-05-01T23:59:59Z")));
        assert!(!eval(Operator::On, Some(noon_ms), json!("2024-05-02T00:00:00Z")));
    }

    #[test]
    fn public_condition_always_passes() {
        assert_eq!(eval_condition(json!({"type": "public"}), &User::new("u")), Ok(true));
    }

    #[test]
    fn user_field_condition() {
        let user = User::new("u").with_email("jane@example.com");
        let condition = json!({
            "type": "user_field",
            "operator": "str_ends_with_any",
            "field": "email",
            "targetValue": ["@example.com"]
        });
        assert_eq!(eval_condition(condition.clone(), &user), Ok(true));
        assert_eq!(eval_condition(condition, &User::new("u")), Ok(false));
    }

    #[test]
    fn environment_field_condition() {
        let user = User::new("u").with_environment("tier", "staging");
        let condition = json!({
            "type": "environment_field",
            "operator": "any",
            "field": "tier",
            "targetValue": ["staging", "development"]
        });
        assert_eq!(eval_condition(condition, &user), Ok(true));
    }

    #[test]
    fn unit_id_and_user_bucket_conditions() {
        let user = User::new("user-1");
        let unit_id = json!({"type": "unit_id", "operator": "any", "targetValue": ["user-1"]});
        assert_eq!(eval_condition(unit_id, &user), Ok(true));

        // bucket_salt.user-1 lands in user bucket 403.
        let bucket = json!({
            "type": "user_bucket",
            "operator": "lt",
            "targetValue": 404,
            "additionalValues": {"salt": "bucket_salt"}
        });
        assert_eq!(eval_condition(bucket.clone(), &user), Ok(true));
        let bucket = json!({
            "type": "user_bucket",
            "operator": "lt",
            "targetValue": 403,
            "additionalValues": {"salt": "bucket_salt"}
        });
        assert_eq!(eval_condition(bucket, &user), Ok(false));
    }

    #[test]
    fn ip_based_condition() {
        let condition = json!({
            "type": "ip_based",
            "operator": "any",
            "field": "country",
            "targetValue": ["NZ"]
        });

        let explicit = User::new("u").with_country("NZ").with_ip("1.2.3.4");
        assert_eq!(eval_condition(condition.clone(), &explicit), Ok(true));

        let needs_lookup = User::new("u").with_ip("1.2.3.4");
        assert_eq!(
            eval_condition(condition.clone(), &needs_lookup),
            Err(RemoteReason::ServerDerivedField("country".to_owned()))
        );

        assert_eq!(eval_condition(condition, &User::new("u")), Ok(false));
    }

    #[test]
    fn unknown_type_or_operator_is_undecidable() {
        let user = User::new("u");
        assert!(matches!(
            eval_condition(json!({"type": "device_model", "operator": "any"}), &user),
            Err(RemoteReason::UnsupportedConditionType(_))
        ));
        assert!(matches!(
            eval_condition(
                json!({"type": "user_field", "operator": "array_contains_all", "field": "email"}),
                &user
            ),
            Err(RemoteReason::UnsupportedOperator(_))
        ));
        assert!(matches!(
            eval_condition(json!({"type": "user_field", "field": "email"}), &user),
            Err(RemoteReason::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn nested_gate_conditions() {
        let open = spec("open", "open", vec![rule("r", 100.0, vec![])]);
        let closed = spec("closed", "closed", vec![]);
        let snapshot = snapshot(vec![open, closed], vec![]);
        let user = User::new("u");
        let ctx = EvalContext::new(&snapshot, &user, Utc::now(), &Sha256Sharder);

        let pass_open = condition(json!({"type": "pass_gate", "targetValue": "open"}));
        let fail_closed = condition(json!({"type": "fail_gate", "targetValue": "closed"}));
        let pass_closed = condition(json!({"type": "pass_gate", "targetValue": "closed"}));
        let pass_missing = condition(json!({"type": "pass_gate", "targetValue": "missing"}));

        assert_eq!(pass_open.eval(&ctx), Ok(true));
        assert_eq!(fail_closed.eval(&ctx), Ok(true));
        assert_eq!(pass_closed.eval(&ctx), Ok(false));
        assert_eq!(pass_missing.eval(&ctx), Err(RemoteReason::SpecNotFound));
    }

    #[test]
    fn rule_requires_all_conditions() {
        let snapshot = snapshot(vec![], vec![]);
        let user = User::new("u").with_custom("age", 20.0);
        let ctx = EvalContext::new(&snapshot, &user, Utc::now(), &Sha256Sharder);

        let adult = rule(
            "adult",
            100.0,
            vec![
                condition(json!({"type": "user_field", "operator": "gte", "field": "age", "targetValue": 18})),
                condition(json!({"type": "user_field", "operator": "lt", "field": "age", "targetValue": 65})),
            ],
        );
        assert_eq!(adult.matches(&ctx), Ok(true));

        let empty = Rule {
            conditions: vec![],
            ..adult.clone()
        };
        assert_eq!(empty.matches(&ctx), Ok(true));

        let teen = rule(
            "teen",
            100.0,
            vec![condition(json!({"type": "user_field", "operator": "lt", "field": "age", "targetValue": 18}))],
        );
        assert_eq!(teen.matches(&ctx), Ok(false));
    }

    #[test]
    fn failed_condition_does_not_hide_undecidable_one() {
        let snapshot = snapshot(vec![], vec![]);
        let user = User::new("u").with_ip("1.2.3.4");
        let ctx = EvalContext::new(&snapshot, &user, Utc::now(), &Sha256Sharder);

        let rule = rule(
            "r",
            100.0,
            vec![
                condition(json!({"type": "user_field", "operator": "any", "field": "email", "targetValue": ["x"]})),
                condition(json!({"type": "ip_based", "operator": "any", "field": "country", "targetValue": ["US"]})),
            ],
        );
        assert!(rule.matches(&ctx).is_err());
    }
}
