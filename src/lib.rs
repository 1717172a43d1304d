//! Server-side SDK core for feature gates and dynamic configs.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`] that decides, for a given [`User`], whether a feature gate
//! passes ([`Client::check_gate`]) and which value a dynamic config takes
//! ([`Client::get_config`]).
//!
//! Decisions are made locally against a cached [`Snapshot`] of gate and config specs, downloaded
//! from the control plane at startup and refreshed in the background. When the snapshot cannot
//! decide a lookup (the spec is unknown, or uses a condition this SDK cannot evaluate), the client
//! asks the server instead. If the server is unreachable too, gates fail closed and configs are
//! empty.
//!
//! Every decision is recorded as an exposure [`Event`] and delivered to the control plane in
//! batches by a background thread.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! Network problems never surface from evaluation calls: they are logged and the SDK falls back
//! to the last known specs or to safe defaults. Errors returned to the caller indicate misuse
//! (invalid configuration, a user without an id) and usually need the developer's attention.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages, with
//! the `featuregate` target. Consider integrating a `log`-compatible logger implementation for
//! better visibility into SDK operations.
//!
//! # Examples
//!
//! Examples can be found in the `demos` directory of the crate repository.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod config;
mod dynamic_config;
mod error;
mod exposure_logger;
mod network;
mod poller_thread;
mod remote;
mod rules;
mod spec_cache;
mod user;

pub mod eval;
pub mod global;
pub mod sharder;
pub mod snapshot;
pub mod spec;
pub mod spec_store;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::{ClientConfig, Environment, RetryPolicy, SdkMetadata};
pub use dynamic_config::DynamicConfig;
pub use error::{Error, Result};
pub use eval::{Decision, DecisionSource, DecisionValue, Evaluation, RemoteReason};
pub use exposure_logger::{Event, CONFIG_EXPOSURE_EVENT, GATE_EXPOSURE_EVENT};
pub use network::{HttpNetwork, Network, RemoteEvaluation, API_KEY_HEADER, CLIENT_TIME_HEADER};
pub use snapshot::{Snapshot, SpecKind};
pub use user::{AttributeValue, Attributes, User};
