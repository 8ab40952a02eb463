//! Agent runtime for sandscript: the bounded executor loop, the long-lived
//! agent server, and the prompt/schema/config plumbing around them.
//!
//! # Modules
//!
//! - [`action`]    — the four-action reply model and its JSON schema
//! - [`config`]    — layered configuration resolution
//! - [`executor`]  — `Executor::{run, run_fresh, continue_run}` state machine
//! - [`server`]    — actor wrapping the executor (`start`/`cast`/`call`/`respond`)
//! - [`prompt`]    — deterministic system-prompt assembly
//! - [`tool`]      — `Tool` and `Agent` descriptor traits
//! - [`transport`] — `LlmTransport` structured-generation seam
//! - [`telemetry`] — tracing init, event emitters, metrics counters
//! - [`fakes`]     — scripted transport and tools for tests

pub mod action;
pub mod config;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod prompt;
pub mod server;
pub mod telemetry;
pub mod tool;
pub mod transport;

pub use action::{action_schema, ActionKind, ActionReply, FieldType, OutputField, OutputSchema};
pub use config::{env_overlay, resolve, Config, ConfigOverlay, SandboxLimits, SandboxOverlay};
pub use error::{CancelReason, ExecutorError, ServerError};
pub use executor::{Context, Executor, Outcome, RunReport};
pub use prompt::build_system_prompt;
pub use server::{start, AgentHandle};
pub use telemetry::{init_tracing, Metrics, METRICS};
pub use tool::{catalog_entry, Agent, FunctionSpec, Tool, ToolCatalogEntry};
pub use transport::{LlmTransport, Message, Role, TransportError};
