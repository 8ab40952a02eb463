//! Sandbox for LLM-generated sandscript code.
//!
//! The trust boundary is static-analysis-plus-allowlist: programs are parsed,
//! alias bindings are injected, the AST is walked against a composable
//! allowlist and a closed set of blocked primitives, and only then does the
//! evaluator run — in a cancellable worker under a wall-clock deadline.
//!
//! # Modules
//!
//! - [`allowlist`] — `ModulePermission::{All, Only, Except}`, builder, `check`
//! - [`analyzer`]  — pre-order AST walk, first violation wins
//! - [`blocked`]   — closed catalogs of denied modules/calls/locals
//! - [`corelib`]   — native modules backing the default allowlist
//! - [`evaluator`] — tree-walking interpreter with interrupt checks
//! - [`pipeline`]  — `Sandbox::eval`: parse → inject → analyze → evaluate
//! - [`registry`]  — explicit public-surface registry of callable modules
//! - [`vault`]     — per-evaluation tool option store
//! - [`error`]     — `SandboxError` taxonomy

pub mod allowlist;
pub mod analyzer;
pub mod blocked;
pub mod corelib;
pub mod error;
pub mod evaluator;
pub mod pipeline;
pub mod registry;
pub mod vault;

pub use allowlist::{Allowlist, AllowlistBuilder, Decision, ModulePermission};
pub use analyzer::{analyze, Violation, CORE_MODULE};
pub use corelib::{core_registry, default_allowlist};
pub use error::{SandboxError, SandboxResult};
pub use evaluator::{EvalCtx, EvalError, EvalServices};
pub use pipeline::{inject_aliases, EvalOptions, Sandbox};
pub use registry::{ModuleDef, ModuleRegistry, NativeFn};
pub use vault::{ToolOptions, ToolVault};
