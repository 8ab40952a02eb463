//! Tool descriptors and the agent descriptor trait.
//!
//! A tool is an externally-supplied module: native functions registered into
//! the sandbox registry, documentation metadata for the prompt builder, and
//! an allowlist contribution authorizing its surface. An agent bundles
//! tools with configuration and an output schema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sandscript_sandbox::{
    default_allowlist, Allowlist, ModuleDef, ModulePermission, ToolOptions,
};

use crate::action::OutputSchema;
use crate::config::{ConfigOverlay, SandboxOverlay};

/// Metadata for one exported tool function, gathered at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub arity: u8,
    pub doc: String,
    pub params: Vec<String>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, params: &[&str], doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: params.len() as u8,
            doc: doc.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Rendered call signature, e.g. `add(a, b)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

/// Read-only catalog record for a tool, the shape external introspection
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCatalogEntry {
    pub name: String,
    pub moduledoc: String,
    pub functions: Vec<FunctionSpec>,
    pub source_location: Option<String>,
}

/// An externally-supplied tool module.
pub trait Tool: Send + Sync {
    /// Module name as sandboxed code calls it, e.g. `Search`.
    fn name(&self) -> &str;

    fn moduledoc(&self) -> &str;

    fn functions(&self) -> Vec<FunctionSpec>;

    /// Native implementation registered into the sandbox registry.
    fn module(&self) -> ModuleDef;

    /// Allowlist entry merged into the agent's allowlist. Defaults to the
    /// tool's full registered surface.
    fn allowlist_contribution(&self) -> (String, ModulePermission) {
        (self.name().to_string(), ModulePermission::All)
    }

    /// Extra prompt documentation computed from the tool's options.
    fn dynamic_doc(&self, _opts: &ToolOptions) -> Option<String> {
        None
    }

    /// Short-name aliases injected into every evaluation, `(short, full)`.
    fn aliases(&self, _opts: &ToolOptions) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Replaces the moduledoc in the prompt when present.
    fn description_override(&self) -> Option<String> {
        None
    }
}

/// Build the read-only catalog record for a tool.
pub fn catalog_entry(tool: &dyn Tool) -> ToolCatalogEntry {
    ToolCatalogEntry {
        name: tool.name().to_string(),
        moduledoc: tool.moduledoc().to_string(),
        functions: tool.functions(),
        source_location: None,
    }
}

/// An agent descriptor: tools, output shape, prompt extras, and config
/// overrides. Implementations are cheap handles; the runtime resolves
/// everything per activation.
pub trait Agent: Send + Sync {
    /// Description leading the system prompt. Empty string selects the
    /// built-in fallback line.
    fn moduledoc(&self) -> &str {
        ""
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>>;

    fn output_schema(&self) -> OutputSchema {
        OutputSchema::default()
    }

    fn system_prompt_extra(&self) -> Option<String> {
        None
    }

    fn static_config(&self) -> ConfigOverlay {
        ConfigOverlay::default()
    }

    fn sandbox_options(&self) -> SandboxOverlay {
        SandboxOverlay::default()
    }

    /// Per-tool dynamic options, stored into the vault before the loop runs.
    fn tool_options(&self, _tool: &str) -> ToolOptions {
        ToolOptions::new()
    }

    /// Base allowlist for this agent's sandbox code; tool contributions are
    /// layered on top.
    fn base_allowlist(&self) -> Allowlist {
        default_allowlist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandscript_lang::Value;

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Echo"
        }

        fn moduledoc(&self) -> &str {
            "Echoes values back."
        }

        fn functions(&self) -> Vec<FunctionSpec> {
            vec![FunctionSpec::new("echo", &["value"], "Returns its argument.")]
        }

        fn module(&self) -> ModuleDef {
            let mut m = ModuleDef::new("Echo");
            m.register("echo", |_ctx, args| {
                Ok(args.first().cloned().unwrap_or(Value::Nil))
            });
            m
        }
    }

    #[test]
    fn test_function_spec_signature() {
        let spec = FunctionSpec::new("add", &["a", "b"], "Adds.");
        assert_eq!(spec.signature(), "add(a, b)");
        assert_eq!(spec.arity, 2);
    }

    #[test]
    fn test_catalog_entry_shape() {
        let entry = catalog_entry(&EchoTool);
        assert_eq!(entry.name, "Echo");
        assert_eq!(entry.functions.len(), 1);
        assert_eq!(entry.functions[0].name, "echo");
    }

    #[test]
    fn test_default_allowlist_contribution_is_full_surface() {
        let (module, permission) = EchoTool.allowlist_contribution();
        assert_eq!(module, "Echo");
        assert_eq!(permission, ModulePermission::All);
    }
}
