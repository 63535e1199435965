//! Domain layer: pure types and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod connection;
pub mod error;
pub mod files;
pub mod outcome;
pub mod request;
pub mod shell;

pub use config::{ExecutorConfig, ReadinessPolicy, RunPolicy};
pub use connection::{Auth, ConnectionSpec, Endpoint};
pub use error::{ConfigError, ExecError, SettingsError, Stage};
pub use files::{FileOrigin, FileSpec, MetadataStep};
pub use outcome::{CommandReport, ExecOutcome, ExecRecord, ExecutionId};
pub use request::{ExecPlan, ExecRequest, FileDecl, PrivateKey, TriggerSet};
