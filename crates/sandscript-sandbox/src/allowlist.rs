//! Composable module/function allowlist.
//!
//! An [`Allowlist`] maps module names to a [`ModulePermission`]; a call is
//! authorized by the decision procedure in [`Allowlist::check`]. Specs
//! compose through the builder's `extend`: child entries fully override the
//! parent's permission for a module — permissions never union per-function
//! across layers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::registry::ModuleRegistry;

/// Permission granted to a single module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModulePermission {
    /// Every exported function of the module.
    All,
    /// Only the named functions (which must also be exported).
    Only { functions: BTreeSet<String> },
    /// Every exported function except the named ones.
    Except { functions: BTreeSet<String> },
}

impl ModulePermission {
    pub fn only<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModulePermission::Only {
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn except<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModulePermission::Except {
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Authorization decision for a single call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Restricted,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// A materialized allowlist spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowlist {
    entries: BTreeMap<String, ModulePermission>,
}

impl Allowlist {
    pub fn builder() -> AllowlistBuilder {
        AllowlistBuilder::default()
    }

    /// The merged module → permission map.
    pub fn spec(&self) -> &BTreeMap<String, ModulePermission> {
        &self.entries
    }

    pub fn permission(&self, module: &str) -> Option<&ModulePermission> {
        self.entries.get(module)
    }

    /// Decide whether `(module, function, arity)` is authorized.
    ///
    /// Arity is accepted for symmetry with the call shape but the default
    /// procedure authorizes at function-name granularity. Exportedness is
    /// checked against the registry for every permission shape, so a fresh
    /// `All` grant never exposes names the module does not export.
    pub fn check(
        &self,
        registry: &ModuleRegistry,
        module: &str,
        function: &str,
        _arity: u8,
    ) -> Decision {
        let Some(permission) = self.entries.get(module) else {
            return Decision::Restricted;
        };
        let exported = registry.has_export(module, function);
        let named_ok = match permission {
            ModulePermission::All => true,
            ModulePermission::Only { functions } => functions.contains(function),
            ModulePermission::Except { functions } => !functions.contains(function),
        };
        if exported && named_ok {
            Decision::Allowed
        } else {
            Decision::Restricted
        }
    }
}

/// Builder collecting allow entries, optionally layered over a base spec.
#[derive(Debug, Clone, Default)]
pub struct AllowlistBuilder {
    base: Option<Allowlist>,
    entries: Vec<(String, ModulePermission)>,
}

impl AllowlistBuilder {
    /// Layer this builder's entries over `base`. Child entries replace the
    /// base's permission for the same module wholesale.
    pub fn extend(mut self, base: Allowlist) -> Self {
        self.base = Some(base);
        self
    }

    pub fn allow(mut self, module: impl Into<String>, permission: ModulePermission) -> Self {
        self.entries.push((module.into(), permission));
        self
    }

    pub fn build(self) -> Allowlist {
        let mut entries = self.base.map(|b| b.entries).unwrap_or_default();
        for (module, permission) in self.entries {
            entries.insert(module, permission);
        }
        Allowlist { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleDef;
    use sandscript_lang::Value;

    fn registry_with(module: &str, functions: &[&str]) -> ModuleRegistry {
        let mut def = ModuleDef::new(module);
        for f in functions {
            def.register(f, |_ctx, _args| Ok(Value::Nil));
        }
        let mut registry = ModuleRegistry::new();
        registry.insert(def);
        registry
    }

    #[test]
    fn test_absent_module_is_restricted() {
        let registry = registry_with("Text", &["upcase"]);
        let allowlist = Allowlist::builder().build();
        assert_eq!(
            allowlist.check(&registry, "Text", "upcase", 1),
            Decision::Restricted
        );
    }

    #[test]
    fn test_all_requires_exported_name() {
        let registry = registry_with("Text", &["upcase"]);
        let allowlist = Allowlist::builder()
            .allow("Text", ModulePermission::All)
            .build();
        assert!(allowlist.check(&registry, "Text", "upcase", 1).is_allowed());
        // Guessing at private names must fail even under All.
        assert_eq!(
            allowlist.check(&registry, "Text", "internal_hash", 1),
            Decision::Restricted
        );
    }

    #[test]
    fn test_only_with_nonexistent_function_is_restricted() {
        let registry = registry_with("Text", &["upcase"]);
        let allowlist = Allowlist::builder()
            .allow("Text", ModulePermission::only(["upcase", "no_such_fn"]))
            .build();
        assert!(allowlist.check(&registry, "Text", "upcase", 1).is_allowed());
        assert_eq!(
            allowlist.check(&registry, "Text", "no_such_fn", 1),
            Decision::Restricted
        );
    }

    #[test]
    fn test_except_empty_is_equivalent_to_all() {
        let registry = registry_with("Text", &["upcase", "downcase"]);
        let all = Allowlist::builder()
            .allow("Text", ModulePermission::All)
            .build();
        let except_empty = Allowlist::builder()
            .allow("Text", ModulePermission::except(Vec::<String>::new()))
            .build();
        for f in ["upcase", "downcase", "ghost"] {
            assert_eq!(
                all.check(&registry, "Text", f, 1),
                except_empty.check(&registry, "Text", f, 1),
            );
        }
    }

    #[test]
    fn test_except_blocks_named_function() {
        let registry = registry_with("Text", &["upcase", "downcase"]);
        let allowlist = Allowlist::builder()
            .allow("Text", ModulePermission::except(["downcase"]))
            .build();
        assert!(allowlist.check(&registry, "Text", "upcase", 1).is_allowed());
        assert_eq!(
            allowlist.check(&registry, "Text", "downcase", 1),
            Decision::Restricted
        );
    }

    #[test]
    fn test_extend_overrides_per_module_wholesale() {
        let base = Allowlist::builder()
            .allow("Text", ModulePermission::only(["upcase"]))
            .allow("Numbers", ModulePermission::All)
            .build();
        let child = Allowlist::builder()
            .extend(base.clone())
            .allow("Text", ModulePermission::only(["downcase"]))
            .build();

        // Child entry replaces — no union with the base's `only` set.
        assert_eq!(
            child.permission("Text"),
            Some(&ModulePermission::only(["downcase"]))
        );
        // Untouched modules fall through to the base.
        assert_eq!(child.permission("Numbers"), Some(&ModulePermission::All));
        // The extension law: child[m] = child.entries[m] if present else base[m].
        for module in ["Text", "Numbers", "Ghost"] {
            let expected = if module == "Text" {
                child.permission(module)
            } else {
                base.permission(module)
            };
            assert_eq!(child.permission(module), expected);
        }
    }

    #[test]
    fn test_allowlist_serde_roundtrip() {
        let allowlist = Allowlist::builder()
            .allow("Text", ModulePermission::only(["upcase"]))
            .allow("Numbers", ModulePermission::All)
            .build();
        let json = serde_json::to_string(&allowlist).unwrap();
        let back: Allowlist = serde_json::from_str(&json).unwrap();
        assert_eq!(allowlist, back);
    }
}
