//! Local evaluation of gates and configs against a [`Snapshot`].
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    sharder::{passes_percentage, Sha256Sharder, Sharder, TOTAL_BUCKETS},
    snapshot::{Snapshot, SpecKind},
    spec::{ConfigSpec, TryParse},
    User,
};

/// Rule id reported when a spec is disabled.
pub const DISABLED_RULE_ID: &str = "disabled";
/// Rule id reported when no rule matched.
pub const DEFAULT_RULE_ID: &str = "default";

/// Limit on `pass_gate`/`fail_gate` nesting. Deeper chains (and cycles) are left to the server.
pub const MAX_NESTED_GATE_DEPTH: usize = 16;

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// A rule matched locally.
    LocalRuleMatch,
    /// No rule matched, the spec's default was used.
    LocalDefault,
    /// The spec is disabled.
    Disabled,
    /// The server evaluated the spec.
    Remote,
}

impl DecisionSource {
    /// Wire name of the source, as reported in exposure metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionSource::LocalRuleMatch => "local_rule_match",
            DecisionSource::LocalDefault => "local_default",
            DecisionSource::Disabled => "disabled",
            DecisionSource::Remote => "remote",
        }
    }
}

/// Value of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionValue {
    #[allow(missing_docs)]
    Gate(bool),
    #[allow(missing_docs)]
    Config(serde_json::Value),
}

/// Outcome of evaluating a gate or config for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[allow(missing_docs)]
    pub value: DecisionValue,
    /// Id of the matching rule, [`DEFAULT_RULE_ID`], [`DISABLED_RULE_ID`], or whatever the server
    /// reported.
    #[serde(rename = "ruleID")]
    pub rule_id: String,
    #[allow(missing_docs)]
    pub source: DecisionSource,
}

impl Decision {
    /// Gate value. `false` for configs.
    pub fn passed(&self) -> bool {
        matches!(self.value, DecisionValue::Gate(true))
    }

    /// Config value. `None` for gates.
    pub fn config_value(&self) -> Option<&serde_json::Value> {
        match &self.value {
            DecisionValue::Config(value) => Some(value),
            DecisionValue::Gate(_) => None,
        }
    }

    fn fallback(spec: &ConfigSpec, kind: SpecKind, rule_id: &str, source: DecisionSource) -> Decision {
        let value = match kind {
            SpecKind::Gate => DecisionValue::Gate(false),
            SpecKind::Config => DecisionValue::Config(spec.default_value.clone()),
        };
        Decision {
            value,
            rule_id: rule_id.to_owned(),
            source,
        }
    }
}

/// Reason a lookup cannot be decided locally.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteReason {
    /// The snapshot does not contain the spec.
    #[error("spec not found in snapshot")]
    SpecNotFound,
    /// The spec is present but could not be parsed.
    #[error("spec could not be parsed")]
    SpecUnparseable,
    /// A condition type this library does not know.
    #[error("unsupported condition type: {0}")]
    UnsupportedConditionType(String),
    /// An operator this library does not know (or a missing one).
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// A field the server derives from the user's IP or user agent.
    #[error("field {0:?} is derived by the server")]
    ServerDerivedField(String),
    /// `pass_gate`/`fail_gate` nesting exceeded [`MAX_NESTED_GATE_DEPTH`].
    #[error("nested gates are too deep")]
    NestedGateTooDeep,
}

/// Result of local evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The snapshot was enough to decide.
    Decided(Decision),
    /// Only the server can decide.
    NeedsRemote(RemoteReason),
}

impl Evaluation {
    #[allow(missing_docs)]
    pub fn needs_remote(&self) -> bool {
        matches!(self, Evaluation::NeedsRemote(_))
    }
}

/// Evaluate `name` of `kind` for `user` against `snapshot`.
///
/// Evaluation is pure: it performs no I/O and does not modify the snapshot.
pub fn evaluate(snapshot: &Snapshot, user: &User, name: &str, kind: SpecKind) -> Evaluation {
    evaluate_at(snapshot, user, name, kind, Utc::now())
}

/// Same as [`evaluate`] with an explicit current time for `current_time` conditions.
pub fn evaluate_at(
    snapshot: &Snapshot,
    user: &User,
    name: &str,
    kind: SpecKind,
    now: DateTime<Utc>,
) -> Evaluation {
    let ctx = EvalContext::new(snapshot, user, now, &Sha256Sharder);
    match ctx.eval_spec(name, kind) {
        Ok(decision) => {
            log::trace!(target: "featuregate",
                        name,
                        user_id = user.user_id.as_str(),
                        kind:serde,
                        decision:serde;
                        "evaluated locally");
            Evaluation::Decided(decision)
        }
        Err(reason) => {
            log::debug!(target: "featuregate",
                        name,
                        user_id = user.user_id.as_str(),
                        kind:serde;
                        "cannot evaluate locally: {reason}");
            Evaluation::NeedsRemote(reason)
        }
    }
}

/// Everything a single evaluation (including nested gates) reads.
pub(crate) struct EvalContext<'a> {
    pub snapshot: &'a Snapshot,
    pub user: &'a User,
    pub now: DateTime<Utc>,
    pub sharder: &'a dyn Sharder,
    depth: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        snapshot: &'a Snapshot,
        user: &'a User,
        now: DateTime<Utc>,
        sharder: &'a dyn Sharder,
    ) -> EvalContext<'a> {
        EvalContext {
            snapshot,
            user,
            now,
            sharder,
            depth: 0,
        }
    }

    fn eval_spec(&self, name: &str, kind: SpecKind) -> Result<Decision, RemoteReason> {
        match self.snapshot.get(name, kind) {
            None => Err(RemoteReason::SpecNotFound),
            Some(TryParse::ParseFailed(_)) => Err(RemoteReason::SpecUnparseable),
            Some(TryParse::Parsed(spec)) => spec.eval(self, kind),
        }
    }

    /// Evaluate gate `name` on behalf of a `pass_gate`/`fail_gate` condition.
    pub fn eval_nested_gate(&self, name: &str) -> Result<bool, RemoteReason> {
        if self.depth >= MAX_NESTED_GATE_DEPTH {
            return Err(RemoteReason::NestedGateTooDeep);
        }
        let nested = EvalContext {
            depth: self.depth + 1,
            ..*self
        };
        Ok(nested.eval_spec(name, SpecKind::Gate)?.passed())
    }
}

impl ConfigSpec {
    fn eval(&self, ctx: &EvalContext, kind: SpecKind) -> Result<Decision, RemoteReason> {
        if !self.enabled {
            return Ok(Decision::fallback(
                self,
                kind,
                DISABLED_RULE_ID,
                DecisionSource::Disabled,
            ));
        }

        // A spec with anything we cannot interpret is never evaluated locally, even if an earlier
        // rule would match.
        if let Some(reason) = self
            .rules
            .iter()
            .flat_map(|rule| &rule.conditions)
            .find_map(|condition| condition.unsupported())
        {
            return Err(reason);
        }

        for rule in &self.rules {
            if !rule.matches(ctx)? {
                continue;
            }

            let salt = if rule.salt.is_empty() {
                &self.salt
            } else {
                &rule.salt
            };
            let bucket = ctx
                .sharder
                .get_bucket(salt, &ctx.user.user_id, TOTAL_BUCKETS);
            if !passes_percentage(bucket, rule.pass_percentage) {
                // Outside the rollout for this rule. Later rules may still apply.
                continue;
            }

            let value = match kind {
                SpecKind::Gate => DecisionValue::Gate(rule.return_value.as_bool().unwrap_or(true)),
                SpecKind::Config => DecisionValue::Config(rule.return_value.clone()),
            };
            return Ok(Decision {
                value,
                rule_id: rule.id.clone(),
                source: DecisionSource::LocalRuleMatch,
            });
        }

        Ok(Decision::fallback(
            self,
            kind,
            DEFAULT_RULE_ID,
            DecisionSource::LocalDefault,
        ))
    }
}
