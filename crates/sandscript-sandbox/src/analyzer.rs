//! Static AST analyzer: pre-order walk rejecting blocked primitives and any
//! call the allowlist does not authorize.
//!
//! The walk returns on the first violation. Alias bindings injected by the
//! sandbox are collected as they are encountered (they precede user code by
//! construction) and every subsequent module reference is resolved through
//! them before authorization.

use std::collections::HashMap;

use sandscript_lang::ast::{Expr, Form, ModulePath, Program};

use crate::allowlist::Allowlist;
use crate::blocked::{is_blocked_call, is_blocked_local, is_blocked_module};
use crate::registry::ModuleRegistry;

/// Name of the implicit core-library module local calls resolve to.
pub const CORE_MODULE: &str = "Kernel";

/// A single analyzer violation; the first one found aborts the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
}

impl Violation {
    fn new(message: String) -> Self {
        Self { message }
    }
}

/// Analyze a parsed program against an allowlist.
pub fn analyze(
    program: &Program,
    allowlist: &Allowlist,
    registry: &ModuleRegistry,
) -> Result<(), Violation> {
    let mut walker = Walker {
        allowlist,
        registry,
        aliases: HashMap::new(),
    };
    for expr in &program.body {
        walker.walk(expr)?;
    }
    Ok(())
}

struct Walker<'a> {
    allowlist: &'a Allowlist,
    registry: &'a ModuleRegistry,
    aliases: HashMap<String, String>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, expr: &Expr) -> Result<(), Violation> {
        match expr {
            Expr::Form(form) => self.walk_form(form),
            Expr::RemoteCall { module, function, args } => {
                let module = self.resolve(module);
                self.check_call(&module, function, args.len() as u8)?;
                self.walk_all(args)
            }
            Expr::LocalCall { name, args } => {
                self.check_local(name, args.len() as u8)?;
                self.walk_all(args)
            }
            Expr::CaptureRemote { module, function, arity } => {
                // A capture is a call of the referenced function for
                // authorization purposes.
                let module = self.resolve(module);
                self.check_call(&module, function, *arity)
            }
            Expr::CaptureLocal { name, arity } => self.check_local(name, *arity),
            Expr::Invoke { target, args } => {
                self.walk(target)?;
                self.walk_all(args)
            }
            Expr::Assign { value, .. } => self.walk(value),
            Expr::If { cond, then_body, else_body } => {
                self.walk(cond)?;
                self.walk_all(then_body)?;
                self.walk_all(else_body)
            }
            Expr::Lambda { body, .. } | Expr::Block { body } => self.walk_all(body),
            Expr::List { items } | Expr::Tuple { items } => self.walk_all(items),
            Expr::MapLit { entries } => {
                for (k, v) in entries {
                    self.walk(k)?;
                    self.walk(v)?;
                }
                Ok(())
            }
            // Literals, variables, and bare module references carry no
            // authority of their own.
            Expr::Nil
            | Expr::Bool { .. }
            | Expr::Int { .. }
            | Expr::Float { .. }
            | Expr::Str { .. }
            | Expr::Symbol { .. }
            | Expr::Var { .. }
            | Expr::ModuleRef { .. } => Ok(()),
        }
    }

    fn walk_all(&mut self, exprs: &[Expr]) -> Result<(), Violation> {
        for e in exprs {
            self.walk(e)?;
        }
        Ok(())
    }

    fn walk_form(&mut self, form: &Form) -> Result<(), Violation> {
        match form {
            Form::Alias { path, as_name, injected: true } => {
                let short = as_name
                    .clone()
                    .or_else(|| path.0.last().cloned())
                    .unwrap_or_default();
                self.aliases.insert(short, path.dotted());
                Ok(())
            }
            Form::Alias { injected: false, .. } => {
                Err(Violation::new("alias is not allowed in sandbox".into()))
            }
            Form::Import { .. } => Err(Violation::new("import is not allowed in sandbox".into())),
            Form::Require { .. } => Err(Violation::new("require is not allowed in sandbox".into())),
            Form::Receive => Err(Violation::new("receive is not allowed in sandbox".into())),
            Form::Definition { kind } => Err(Violation::new(format!(
                "{} is not allowed in sandbox",
                kind.keyword()
            ))),
        }
    }

    /// Rewrite the path head through the injected alias map.
    fn resolve(&self, path: &ModulePath) -> String {
        match self.aliases.get(path.head()) {
            Some(full) if path.0.len() == 1 => full.clone(),
            Some(full) => {
                let rest = path.0[1..].join(".");
                format!("{full}.{rest}")
            }
            None => path.dotted(),
        }
    }

    fn check_call(&self, module: &str, function: &str, arity: u8) -> Result<(), Violation> {
        if is_blocked_module(module) {
            return Err(Violation::new(format!("module {module} is restricted")));
        }
        if is_blocked_call(module, function) {
            return Err(Violation::new(format!(
                "function {module}.{function}/{arity} is restricted"
            )));
        }
        if !self
            .allowlist
            .check(self.registry, module, function, arity)
            .is_allowed()
        {
            return Err(Violation::new(format!(
                "function {module}.{function}/{arity} is restricted"
            )));
        }
        Ok(())
    }

    /// Local calls and captures implicitly resolve to the core library.
    fn check_local(&self, name: &str, arity: u8) -> Result<(), Violation> {
        if is_blocked_local(name) {
            return Err(Violation::new(format!(
                "function {CORE_MODULE}.{name}/{arity} is restricted"
            )));
        }
        if is_blocked_call(CORE_MODULE, name) {
            return Err(Violation::new(format!(
                "function {CORE_MODULE}.{name}/{arity} is restricted"
            )));
        }
        if !self
            .allowlist
            .check(self.registry, CORE_MODULE, name, arity)
            .is_allowed()
        {
            return Err(Violation::new(format!(
                "function {CORE_MODULE}.{name}/{arity} is restricted"
            )));
        }
        Ok(())
    }
}
