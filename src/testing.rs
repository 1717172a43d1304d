//! In-memory test doubles and spec builders shared by unit tests.
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use serde_json::json;

use crate::{
    exposure_logger::Event,
    network::{Network, RemoteEvaluation},
    snapshot::{Snapshot, SpecKind},
    spec::{Condition, ConfigSpec, DownloadConfigSpecsResponse, Rule, TryParse},
    Error, Result, User,
};

/// [`Network`] that serves queued responses and records everything it receives.
///
/// `fetch_specs` fails with a 503 once its queue runs dry.
#[derive(Default)]
pub(crate) struct FakeNetwork {
    spec_responses: Mutex<VecDeque<Result<DownloadConfigSpecsResponse>>>,
    since_times: Mutex<Vec<i64>>,
    remote: Mutex<HashMap<String, RemoteEvaluation>>,
    remote_calls: Mutex<Vec<(String, SpecKind)>>,
    fail_remote: AtomicBool,
    sent: Mutex<Vec<Event>>,
    send_calls: AtomicUsize,
    fail_send: AtomicBool,
}

impl FakeNetwork {
    pub fn new() -> FakeNetwork {
        FakeNetwork::default()
    }

    pub fn push_specs(&self, response: Result<DownloadConfigSpecsResponse>) {
        self.spec_responses.lock().unwrap().push_back(response);
    }

    pub fn since_times(&self) -> Vec<i64> {
        self.since_times.lock().unwrap().clone()
    }

    pub fn set_remote(&self, name: &str, value: serde_json::Value, rule_id: &str) {
        self.remote.lock().unwrap().insert(
            name.to_owned(),
            RemoteEvaluation {
                value,
                rule_id: rule_id.to_owned(),
            },
        );
    }

    pub fn fail_remote_evaluate(&self, fail: bool) {
        self.fail_remote.store(fail, Ordering::SeqCst);
    }

    pub fn remote_calls(&self) -> Vec<(String, SpecKind)> {
        self.remote_calls.lock().unwrap().clone()
    }

    pub fn fail_send_events(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn sent_events(&self) -> Vec<Event> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_events_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

impl Network for FakeNetwork {
    fn fetch_specs(&self, since_time: i64) -> Result<DownloadConfigSpecsResponse> {
        self.since_times.lock().unwrap().push(since_time);
        self.spec_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(Error::HttpStatus(503)))
    }

    fn remote_evaluate(
        &self,
        _user: &User,
        name: &str,
        kind: SpecKind,
    ) -> Result<RemoteEvaluation> {
        self.remote_calls
            .lock()
            .unwrap()
            .push((name.to_owned(), kind));
        if self.fail_remote.load(Ordering::SeqCst) {
            return Err(Error::HttpStatus(500));
        }
        self.remote
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(Error::HttpStatus(404))
    }

    fn send_events(&self, events: &[Event]) -> Result<()> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Error::HttpStatus(503));
        }
        self.sent.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

pub(crate) fn spec(name: &str, salt: &str, rules: Vec<Rule>) -> ConfigSpec {
    ConfigSpec {
        name: name.to_owned(),
        spec_type: "feature_gate".to_owned(),
        salt: salt.to_owned(),
        enabled: true,
        rules,
        default_value: json!(false),
    }
}

pub(crate) fn config_spec(name: &str, default_value: serde_json::Value, rules: Vec<Rule>) -> ConfigSpec {
    ConfigSpec {
        spec_type: "dynamic_config".to_owned(),
        default_value,
        ..spec(name, name, rules)
    }
}

pub(crate) fn rule(id: &str, pass_percentage: f64, conditions: Vec<Condition>) -> Rule {
    Rule {
        name: id.to_owned(),
        id: id.to_owned(),
        salt: id.to_owned(),
        pass_percentage,
        conditions,
        return_value: json!(true),
    }
}

/// Build a condition from its wire representation.
pub(crate) fn condition(json: serde_json::Value) -> Condition {
    serde_json::from_value(json).expect("condition fixture should parse")
}

pub(crate) fn response(
    time: i64,
    gates: Vec<ConfigSpec>,
    configs: Vec<ConfigSpec>,
) -> DownloadConfigSpecsResponse {
    DownloadConfigSpecsResponse {
        has_updates: true,
        time,
        feature_gates: gates.into_iter().map(TryParse::Parsed).collect(),
        dynamic_configs: configs.into_iter().map(TryParse::Parsed).collect(),
    }
}

pub(crate) fn snapshot(gates: Vec<ConfigSpec>, configs: Vec<ConfigSpec>) -> Snapshot {
    Snapshot::from_response(response(1, gates, configs))
}
