//! Module registry: the explicit public surface of everything callable from
//! sandboxed code.
//!
//! The allowlist's exportedness check consults only this registry, never
//! host-language visibility — a module's callable surface is exactly the set
//! of names registered on it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use sandscript_lang::Value;

use crate::evaluator::{EvalCtx, EvalError};

/// A native function callable from script code.
pub type NativeFn = Arc<dyn Fn(&mut EvalCtx, &[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A named module with its exported native functions.
#[derive(Clone)]
pub struct ModuleDef {
    name: String,
    functions: HashMap<String, NativeFn>,
    exports: BTreeSet<String>,
}

impl std::fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDef")
            .field("name", &self.name)
            .field("exports", &self.exports)
            .finish()
    }
}

impl ModuleDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: HashMap::new(),
            exports: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an exported function. Later registrations under the same
    /// name replace earlier ones.
    pub fn register<F>(&mut self, function: &str, f: F)
    where
        F: Fn(&mut EvalCtx, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions.insert(function.to_string(), Arc::new(f));
        self.exports.insert(function.to_string());
    }

    /// The exported-name surface consulted by the allowlist.
    pub fn exports(&self) -> &BTreeSet<String> {
        &self.exports
    }

    pub fn lookup(&self, function: &str) -> Option<&NativeFn> {
        self.functions.get(function)
    }
}

/// All modules reachable from sandboxed code: the core library plus any
/// tool modules contributed by the agent.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleDef>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module, replacing any module with the same name.
    pub fn insert(&mut self, module: ModuleDef) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDef> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// True when `function` is an exported name on `module`.
    pub fn has_export(&self, module: &str, function: &str) -> bool {
        self.modules
            .get(module)
            .map(|m| m.exports.contains(function))
            .unwrap_or(false)
    }

    pub fn lookup(&self, module: &str, function: &str) -> Option<&NativeFn> {
        self.modules.get(module).and_then(|m| m.lookup(function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> ModuleDef {
        let mut m = ModuleDef::new("Sample");
        m.register("echo", |_ctx, args| {
            Ok(args.first().cloned().unwrap_or(Value::Nil))
        });
        m
    }

    #[test]
    fn test_exports_track_registrations() {
        let m = sample_module();
        assert!(m.exports().contains("echo"));
        assert!(!m.exports().contains("hidden"));
    }

    #[test]
    fn test_registry_has_export() {
        let mut registry = ModuleRegistry::new();
        registry.insert(sample_module());
        assert!(registry.has_export("Sample", "echo"));
        assert!(!registry.has_export("Sample", "missing"));
        assert!(!registry.has_export("Missing", "echo"));
    }

    #[test]
    fn test_insert_replaces_module() {
        let mut registry = ModuleRegistry::new();
        registry.insert(sample_module());
        let mut replacement = ModuleDef::new("Sample");
        replacement.register("other", |_ctx, _args| Ok(Value::Nil));
        registry.insert(replacement);
        assert!(!registry.has_export("Sample", "echo"));
        assert!(registry.has_export("Sample", "other"));
    }
}
