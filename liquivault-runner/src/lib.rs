//! LiquiVault Runner: scenario orchestration around `liquivault-core`.
//!
//! This crate supplies everything the deterministic core leaves to the
//! embedder:
//! - An in-memory token bank implementing the `TokenEnv` collaborator
//! - A scripted call forwarder (honest, failing, and rogue behaviors)
//! - A shared price feed handle for driving the circuit breaker
//! - Permit verification and permit-gated order creation
//! - TOML scenario files, the step harness, and invariant audits
//! - Random scenario generation and parallel soak sweeps
//! - Artifact export (JSONL events, CSV sweep summaries, JSON reports)
//!   and snapshot persistence

pub mod bank;
pub mod export;
pub mod feed;
pub mod forwarder;
pub mod generator;
pub mod harness;
pub mod permit;
pub mod scenario;
pub mod snapshot;
pub mod sweep;

pub use bank::InMemoryBank;
pub use feed::SharedFeed;
pub use forwarder::{CallScript, ScriptedForwarder};
pub use generator::{generate, GeneratorConfig};
pub use harness::{Harness, ScenarioReport, StepMismatch};
pub use permit::{sign_permit, NonceRegistry, PermitGateway};
pub use scenario::{
    AccountSetup, Action, Expectation, OrderSpec, Scenario, ScenarioError, ScenarioStep,
};
pub use snapshot::{load_snapshot, save_snapshot};
pub use sweep::{run_sweep, SweepSummary};
