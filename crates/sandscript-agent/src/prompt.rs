//! Deterministic system-prompt assembly.
//!
//! Section order is fixed: agent description, tool documentation, response
//! format, code-execution rules, optional custom instructions. Identical
//! inputs always produce an identical prompt.

use sandscript_sandbox::ToolVault;

use crate::action::{example_result, OutputSchema};
use crate::tool::Agent;

const FALLBACK_DESCRIPTION: &str =
    "You are an AI agent that executes tasks by generating sandscript code.";

const RESPONSE_FORMAT: &str = r#"## Response format

Respond with a single JSON object containing exactly these fields: "action", "code", and "result". Choose one action per reply:

- {"action": "eval_and_continue", "code": "<sandscript>", "result": <placeholder>} — run code, observe the result, and keep working.
- {"action": "eval_and_complete", "code": "<sandscript>", "result": <placeholder>} — run code and finish with its value.
- {"action": "return", "code": "", "result": <object matching the result schema>} — finish with an explicit result.
- {"action": "done", "code": "", "result": <placeholder>} — finish with no result.

"code" is always required; send an empty string when the action does not use it."#;

const CODE_RULES: &str = r#"## Code execution rules

- Code runs in a sandbox. Only the modules documented above and the core library are callable; anything else is rejected before execution.
- Evaluations are stateless: variables do not survive from one evaluation to the next. Recompute or carry values through the conversation.
- When code fails you receive the error text; fix the code and try again.
- Evaluations may be retried, so avoid non-idempotent sequences within a single step where possible.
- Keep programs short and direct. Call tool functions module-qualified, e.g. `Search.run("query")`.
- No imports, aliases, module definitions, or process primitives; write plain expressions, `if ... do ... else ... end` conditionals, and `fn ... end` functions."#;

/// Assemble the system prompt for an agent. `vault` supplies each tool's
/// options so dynamic documentation can reflect them.
pub fn build_system_prompt(agent: &dyn Agent, vault: &ToolVault) -> String {
    let mut out = String::new();

    let description = agent.moduledoc().trim();
    if description.is_empty() {
        out.push_str(FALLBACK_DESCRIPTION);
    } else {
        out.push_str(description);
    }
    out.push_str("\n\n");

    let tools = agent.tools();
    if !tools.is_empty() {
        out.push_str("## Available tools\n\n");
        for tool in &tools {
            let empty = sandscript_sandbox::ToolOptions::new();
            let opts = vault.options(tool.name()).unwrap_or(&empty);

            out.push_str(&format!("### {}\n\n", tool.name()));
            let description = tool
                .description_override()
                .unwrap_or_else(|| tool.moduledoc().to_string());
            if !description.trim().is_empty() {
                out.push_str(description.trim());
                out.push_str("\n\n");
            }
            if let Some(dynamic) = tool.dynamic_doc(opts) {
                out.push_str(dynamic.trim());
                out.push_str("\n\n");
            }
            for function in tool.functions() {
                out.push_str(&format!("- `{}.{}`\n", tool.name(), function.signature()));
                if !function.doc.trim().is_empty() {
                    for line in function.doc.trim().lines() {
                        out.push_str(&format!("  {line}\n"));
                    }
                }
            }
            out.push('\n');
        }
    }

    out.push_str(RESPONSE_FORMAT);
    out.push_str("\n\n");

    let output_schema = agent.output_schema();
    if !output_schema.is_default() {
        out.push_str("For `return`, the \"result\" object must match this shape:\n\n```json\n");
        out.push_str(&pretty(&output_schema));
        out.push_str("\n```\n\n");
    }

    out.push_str(CODE_RULES);

    if let Some(extra) = agent.system_prompt_extra() {
        out.push_str("\n\n");
        out.push_str(extra.trim());
    }

    out.push('\n');
    out
}

fn pretty(schema: &OutputSchema) -> String {
    serde_json::to_string_pretty(&example_result(schema)).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{FieldType, OutputField};
    use crate::tool::{FunctionSpec, Tool};
    use sandscript_sandbox::ModuleDef;
    use sandscript_lang::Value;
    use std::sync::Arc;

    struct CalcTool;

    impl Tool for CalcTool {
        fn name(&self) -> &str {
            "Calc"
        }

        fn moduledoc(&self) -> &str {
            "Arithmetic helpers."
        }

        fn functions(&self) -> Vec<FunctionSpec> {
            vec![FunctionSpec::new("add", &["a", "b"], "Adds two numbers.")]
        }

        fn module(&self) -> ModuleDef {
            let mut m = ModuleDef::new("Calc");
            m.register("add", |_ctx, _args| Ok(Value::Nil));
            m
        }

        fn dynamic_doc(&self, opts: &sandscript_sandbox::ToolOptions) -> Option<String> {
            opts.get("note").map(|v| match v {
                Value::Str(s) => format!("Note: {s}"),
                other => format!("Note: {}", other.type_name()),
            })
        }
    }

    struct PlainAgent;

    impl Agent for PlainAgent {
        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            vec![Arc::new(CalcTool)]
        }
    }

    struct SchemaAgent;

    impl Agent for SchemaAgent {
        fn moduledoc(&self) -> &str {
            "Research agent."
        }

        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            Vec::new()
        }

        fn output_schema(&self) -> OutputSchema {
            OutputSchema::new(vec![
                OutputField::required("answer", FieldType::String),
                OutputField::required("confidence", FieldType::Float),
            ])
        }

        fn system_prompt_extra(&self) -> Option<String> {
            Some("Prefer primary sources.".to_string())
        }
    }

    #[test]
    fn test_fallback_description_used_when_empty() {
        let prompt = build_system_prompt(&PlainAgent, &ToolVault::new());
        assert!(prompt.starts_with(FALLBACK_DESCRIPTION));
    }

    #[test]
    fn test_tool_block_lists_signatures() {
        let prompt = build_system_prompt(&PlainAgent, &ToolVault::new());
        assert!(prompt.contains("### Calc"));
        assert!(prompt.contains("- `Calc.add(a, b)`"));
        assert!(prompt.contains("Adds two numbers."));
    }

    #[test]
    fn test_dynamic_doc_reads_vault_options() {
        let mut vault = ToolVault::new();
        vault.set(
            "Calc",
            sandscript_sandbox::ToolOptions::from([(
                "note".to_string(),
                Value::Str("precision is f64".into()),
            )]),
        );
        let prompt = build_system_prompt(&PlainAgent, &vault);
        assert!(prompt.contains("Note: precision is f64"));
    }

    #[test]
    fn test_default_schema_omits_example() {
        let prompt = build_system_prompt(&PlainAgent, &ToolVault::new());
        assert!(!prompt.contains("must match this shape"));
    }

    #[test]
    fn test_custom_schema_includes_example_and_extra_is_last() {
        let prompt = build_system_prompt(&SchemaAgent, &ToolVault::new());
        assert!(prompt.contains("must match this shape"));
        assert!(prompt.contains("\"answer\""));
        assert!(prompt.trim_end().ends_with("Prefer primary sources."));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_system_prompt(&SchemaAgent, &ToolVault::new());
        let b = build_system_prompt(&SchemaAgent, &ToolVault::new());
        assert_eq!(a, b);
    }
}
