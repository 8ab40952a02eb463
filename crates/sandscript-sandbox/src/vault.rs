//! Per-evaluation tool option vault.
//!
//! The executor computes every tool's options before the loop starts and
//! hands the vault to each evaluation. Native tool functions read it through
//! the evaluation context, so sandboxed code never passes (or sees) the
//! options. The binding is per evaluation, not process-global: concurrent
//! agents in one host cannot clobber each other.

use std::collections::HashMap;

use sandscript_lang::Value;

/// Options for one tool, keyed by option name.
pub type ToolOptions = HashMap<String, Value>;

/// Keyed map of `tool name → options`, written once at setup.
#[derive(Debug, Clone, Default)]
pub struct ToolVault {
    entries: HashMap<String, ToolOptions>,
}

impl ToolVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk merge at setup time; last writer wins per tool.
    pub fn merge(&mut self, entries: HashMap<String, ToolOptions>) {
        self.entries.extend(entries);
    }

    pub fn set(&mut self, tool: impl Into<String>, options: ToolOptions) {
        self.entries.insert(tool.into(), options);
    }

    /// All options for a tool; `None` when the tool never stored any.
    pub fn options(&self, tool: &str) -> Option<&ToolOptions> {
        self.entries.get(tool)
    }

    /// A single option value.
    pub fn option(&self, tool: &str, key: &str) -> Option<&Value> {
        self.entries.get(tool).and_then(|opts| opts.get(key))
    }
}
