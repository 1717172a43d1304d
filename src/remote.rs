//! Fallback to server-side evaluation for lookups the snapshot cannot decide.
use serde_json::json;

use crate::{
    eval::{Decision, DecisionSource, DecisionValue},
    network::Network,
    snapshot::SpecKind,
    User,
};

/// Decision obtained from the server, or a safe default standing in for it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RemoteDecision {
    pub decision: Decision,
    /// `true` if the server could not be reached and `decision` is a safe default.
    pub degraded: bool,
}

/// Ask the server to evaluate `name` for `user`.
///
/// Never fails: when the server cannot answer, the result is a failing gate or an empty config
/// marked as degraded.
pub(crate) fn evaluate_remotely(
    network: &dyn Network,
    user: &User,
    name: &str,
    kind: SpecKind,
) -> RemoteDecision {
    match network.remote_evaluate(user, name, kind) {
        Ok(remote) => {
            let value = match kind {
                SpecKind::Gate => DecisionValue::Gate(remote.value.as_bool().unwrap_or(false)),
                SpecKind::Config if remote.value.is_null() => DecisionValue::Config(json!({})),
                SpecKind::Config => DecisionValue::Config(remote.value),
            };
            RemoteDecision {
                decision: Decision {
                    value,
                    rule_id: remote.rule_id,
                    source: DecisionSource::Remote,
                },
                degraded: false,
            }
        }
        Err(err) => {
            log::warn!(target: "featuregate",
                       name,
                       user_id = user.user_id.as_str(),
                       kind:serde;
                       "remote evaluation failed, returning the safe default: {err}");
            let value = match kind {
                SpecKind::Gate => DecisionValue::Gate(false),
                SpecKind::Config => DecisionValue::Config(json!({})),
            };
            RemoteDecision {
                decision: Decision {
                    value,
                    rule_id: String::new(),
                    source: DecisionSource::Remote,
                },
                degraded: true,
            }
        }
    }
}
