//! Tagged AST node variants consumed by the sandbox analyzer and evaluator.
//!
//! The analyzer discriminates on constructors, never on raw token shapes, so
//! every syntactic category the sandbox must reason about has its own
//! variant: remote/local calls, captures, fun invocation, and the blocked
//! syntactic forms (`receive`, `import`, `require`, `alias`, definitions).

use serde::{Deserialize, Serialize};

/// A dotted module path, e.g. `String` or `Agent.Tools.Search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePath(pub Vec<String>);

impl ModulePath {
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// First segment — the one alias resolution rewrites.
    pub fn head(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl std::fmt::Display for ModulePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dotted())
    }
}

/// Which definition keyword produced a [`Form::Definition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefKind {
    Function,
    Macro,
    Module,
    Struct,
    Protocol,
    Impl,
}

impl DefKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            DefKind::Function => "def",
            DefKind::Macro => "defmacro",
            DefKind::Module => "defmodule",
            DefKind::Struct => "defstruct",
            DefKind::Protocol => "defprotocol",
            DefKind::Impl => "defimpl",
        }
    }
}

/// Syntactic form markers. All of these are rejected by the analyzer except
/// alias forms the sandbox itself injected (`injected == true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Form {
    Receive,
    Import { path: ModulePath },
    Require { path: ModulePath },
    Alias {
        path: ModulePath,
        as_name: Option<String>,
        /// True only for alias bindings the sandbox injected ahead of user
        /// code; the parser always produces `false`.
        injected: bool,
    },
    Definition { kind: DefKind },
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Nil,
    Bool { value: bool },
    Int { value: i64 },
    Float { value: f64 },
    Str { value: String },
    Symbol { name: String },
    List { items: Vec<Expr> },
    Tuple { items: Vec<Expr> },
    MapLit { entries: Vec<(Expr, Expr)> },
    Var { name: String },
    Assign { name: String, value: Box<Expr> },
    /// A bare module reference used as a value, e.g. `File` in `f.(File, :read!, [])`.
    ModuleRef { module: ModulePath },
    /// `Mod.fun(args)` — also covers aliased heads before resolution.
    RemoteCall {
        module: ModulePath,
        function: String,
        args: Vec<Expr>,
    },
    /// `fun(args)` — implicitly resolves to the core library.
    LocalCall { name: String, args: Vec<Expr> },
    /// `f.(args)` — calling a fun value.
    Invoke { target: Box<Expr>, args: Vec<Expr> },
    /// `&Mod.fun/arity`.
    CaptureRemote {
        module: ModulePath,
        function: String,
        arity: u8,
    },
    /// `&fun/arity` — implicitly resolves to the core library.
    CaptureLocal { name: String, arity: u8 },
    /// `fn a, b -> body end`.
    Lambda { params: Vec<String>, body: Vec<Expr> },
    /// `if cond do … else … end`; the else branch may be empty.
    If {
        cond: Box<Expr>,
        then_body: Vec<Expr>,
        else_body: Vec<Expr>,
    },
    /// Statement block; the sandbox wraps user code in one when injecting
    /// alias bindings.
    Block { body: Vec<Expr> },
    Form(Form),
}

/// A parsed program: the top-level statement sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Expr>,
}

impl Program {
    pub fn new(body: Vec<Expr>) -> Self {
        Self { body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path_dotted() {
        let path = ModulePath(vec!["Agent".into(), "Tools".into()]);
        assert_eq!(path.dotted(), "Agent.Tools");
        assert_eq!(path.head(), "Agent");
    }

    #[test]
    fn test_expr_serde_roundtrip() {
        let expr = Expr::RemoteCall {
            module: ModulePath::single("String"),
            function: "upcase".into(),
            args: vec![Expr::Str { value: "hi".into() }],
        };
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }

    #[test]
    fn test_def_kind_keyword() {
        assert_eq!(DefKind::Module.keyword(), "defmodule");
        assert_eq!(DefKind::Function.keyword(), "def");
    }
}
