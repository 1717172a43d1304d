//! Immutable, indexed view of the specs downloaded from the control plane.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::spec::{ConfigSpec, DownloadConfigSpecsResponse, TryParse};

/// Kind of a spec: a boolean feature gate or a dynamic config returning a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    /// Feature gate.
    Gate,
    /// Dynamic config (experiments are dynamic configs too).
    Config,
}

/// One complete, immutable set of specs as of a sync time.
///
/// A snapshot is never modified after construction. Newer specs are installed by replacing the
/// whole snapshot in [`SpecStore`](crate::spec_store::SpecStore).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Feature gates by name.
    pub gates: HashMap<String, TryParse<ConfigSpec>>,
    /// Dynamic configs by name.
    pub configs: HashMap<String, TryParse<ConfigSpec>>,
    /// Server time (epoch milliseconds) of the response the snapshot was built from. Zero for the
    /// empty snapshot.
    pub sync_time: i64,
}

impl Snapshot {
    /// Snapshot with no specs. Every lookup against it is undecidable locally.
    pub fn empty() -> Snapshot {
        Snapshot::default()
    }

    /// Build a snapshot from a full-replacement server response.
    pub fn from_response(response: DownloadConfigSpecsResponse) -> Snapshot {
        Snapshot {
            gates: index_specs(response.feature_gates, SpecKind::Gate),
            configs: index_specs(response.dynamic_configs, SpecKind::Config),
            sync_time: response.time,
        }
    }

    /// Look up a spec by name.
    pub fn get(&self, name: &str, kind: SpecKind) -> Option<&TryParse<ConfigSpec>> {
        match kind {
            SpecKind::Gate => self.gates.get(name),
            SpecKind::Config => self.configs.get(name),
        }
    }

    /// Return `true` if there are no gates and no configs.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty() && self.configs.is_empty()
    }
}

/// Key specs by name. Specs that failed to parse are kept under their name (when it can be
/// recovered) so that lookups for them are routed to remote evaluation.
fn index_specs(
    specs: Vec<TryParse<ConfigSpec>>,
    kind: SpecKind,
) -> HashMap<String, TryParse<ConfigSpec>> {
    let mut by_name = HashMap::with_capacity(specs.len());
    for spec in specs {
        let name = match &spec {
            TryParse::Parsed(spec) => spec.name.clone(),
            TryParse::ParseFailed(json) => {
                let Some(name) = json.get("name").and_then(|name| name.as_str()) else {
                    log::warn!(target: "featuregate", kind:serde; "dropping spec without a name");
                    continue;
                };
                log::warn!(target: "featuregate",
                           name,
                           kind:serde;
                           "failed to parse spec, it will be evaluated remotely");
                name.to_owned()
            }
        };
        by_name.insert(name, spec);
    }
    by_name
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Snapshot, SpecKind};
    use crate::spec::{DownloadConfigSpecsResponse, TryParse};

    #[test]
    fn indexes_gates_and_configs_separately() {
        let response: DownloadConfigSpecsResponse = serde_json::from_value(json!({
            "has_updates": true,
            "time": 1700000000000i64,
            "feature_gates": [
                {"name": "shared_name", "type": "feature_gate", "salt": "a", "enabled": true, "rules": []}
            ],
            "dynamic_configs": [
                {"name": "shared_name", "type": "dynamic_config", "salt": "b", "enabled": false, "rules": []}
            ]
        }))
        .unwrap();

        let snapshot = Snapshot::from_response(response);

        assert_eq!(snapshot.sync_time, 1700000000000);
        let Some(TryParse::Parsed(gate)) = snapshot.get("shared_name", SpecKind::Gate) else {
            panic!("gate should be parsed");
        };
        assert!(gate.enabled);
        let Some(TryParse::Parsed(config)) = snapshot.get("shared_name", SpecKind::Config) else {
            panic!("config should be parsed");
        };
        assert!(!config.enabled);
    }

    #[test]
    fn keeps_unparseable_specs_by_name() {
        let response: DownloadConfigSpecsResponse = serde_json::from_value(json!({
            "has_updates": true,
            "time": 1,
            "feature_gates": [
                {"name": "broken", "enabled": "maybe"},
                {"enabled": "no name at all"}
            ],
            "dynamic_configs": []
        }))
        .unwrap();

        let snapshot = Snapshot::from_response(response);

        assert_eq!(snapshot.gates.len(), 1);
        assert!(matches!(
            snapshot.get("broken", SpecKind::Gate),
            Some(TryParse::ParseFailed(_))
        ));
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = Snapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.sync_time, 0);
        assert!(snapshot.get("anything", SpecKind::Gate).is_none());
    }
}
