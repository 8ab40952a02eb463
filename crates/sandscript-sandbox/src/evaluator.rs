//! Tree-walking evaluator.
//!
//! Every node visit checks the shared cancel flag and the wall-clock
//! deadline, so a runaway program returns [`EvalError::Deadline`] within the
//! configured window even though evaluation is in-process. Trailing `f.(…)`
//! invocations in a closure body are executed as tail calls, which keeps
//! self-application loops at constant stack depth until the deadline fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sandscript_lang::ast::{Expr, Form, ModulePath, Program};
use sandscript_lang::value::{FunValue, Value};

use crate::analyzer::CORE_MODULE;
use crate::registry::ModuleRegistry;
use crate::vault::ToolVault;

/// Nesting limit for non-tail evaluation; generated code never approaches
/// this legitimately.
const MAX_EVAL_DEPTH: usize = 500;

/// Errors surfaced while evaluating.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    #[error("deadline exceeded")]
    Deadline,
    #[error("evaluation cancelled")]
    Cancelled,
    #[error("{0}")]
    Exception(String),
    #[error("uncaught throw")]
    Throw(Value),
}

/// Host services reachable from native tool functions, installed per
/// evaluation. The only service today is the synchronous human-input
/// round-trip to the owning agent server.
pub trait EvalServices: Send + Sync {
    fn human_input(&self, question: &str, kind: &str) -> Result<Value, EvalError>;
}

enum TailResult {
    Value(Value),
    Call(FunValue, Vec<Value>),
}

/// Evaluation context: scope stack, alias bindings, interrupt state, and the
/// per-evaluation vault/services bindings native functions read.
pub struct EvalCtx {
    registry: Arc<ModuleRegistry>,
    scopes: Vec<HashMap<String, Value>>,
    aliases: HashMap<String, String>,
    deadline: Instant,
    cancel: Arc<AtomicBool>,
    vault: ToolVault,
    services: Option<Arc<dyn EvalServices>>,
    depth: usize,
}

impl EvalCtx {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        deadline: Instant,
        cancel: Arc<AtomicBool>,
        vault: ToolVault,
        services: Option<Arc<dyn EvalServices>>,
    ) -> Self {
        Self {
            registry,
            scopes: vec![HashMap::new()],
            aliases: HashMap::new(),
            deadline,
            cancel,
            vault,
            services,
            depth: 0,
        }
    }

    /// Fail fast when cancelled or past the deadline. Called at every node
    /// visit and from long-running natives.
    pub fn check_interrupt(&self) -> Result<(), EvalError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(EvalError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(EvalError::Deadline);
        }
        Ok(())
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn vault(&self) -> &ToolVault {
        &self.vault
    }

    /// Blocking human-input round-trip; errors when no owning server
    /// installed the service (plain `run` activations).
    pub fn human_input(&self, question: &str, kind: &str) -> Result<Value, EvalError> {
        match &self.services {
            Some(services) => services.human_input(question, kind),
            None => Err(EvalError::Exception(
                "human input is not available in this context".into(),
            )),
        }
    }

    pub fn eval_program(&mut self, program: &Program) -> Result<Value, EvalError> {
        let mut last = Value::Nil;
        for expr in &program.body {
            last = self.eval(expr)?;
        }
        Ok(last)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.check_interrupt()?;
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::Exception(
                "evaluation depth limit exceeded".into(),
            ));
        }
        self.depth += 1;
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool { value } => Ok(Value::Bool(*value)),
            Expr::Int { value } => Ok(Value::Int(*value)),
            Expr::Float { value } => Ok(Value::Float(*value)),
            Expr::Str { value } => Ok(Value::Str(value.clone())),
            Expr::Symbol { name } => Ok(Value::Symbol(name.clone())),
            Expr::List { items } => Ok(Value::List(self.eval_all(items)?)),
            Expr::Tuple { items } => Ok(Value::Tuple(self.eval_all(items)?)),
            Expr::MapLit { entries } => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let key = self.eval(k)?;
                    let value = self.eval(v)?;
                    // Later duplicate keys replace earlier ones.
                    out.retain(|(existing, _): &(Value, Value)| existing != &key);
                    out.push((key, value));
                }
                Ok(Value::Map(out))
            }
            Expr::Var { name } => self.lookup_var(name),
            Expr::Assign { name, value } => {
                let value = self.eval(value)?;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value.clone());
                }
                Ok(value)
            }
            Expr::ModuleRef { module } => Ok(Value::Module(self.resolve_module(module))),
            Expr::RemoteCall { module, function, args } => {
                let module = self.resolve_module(module);
                let args = self.eval_all(args)?;
                self.call_module(&module, function, &args)
            }
            Expr::LocalCall { name, args } => self.eval_local_call(name, args),
            Expr::Invoke { target, args } => {
                let target = self.eval(target)?;
                let args = self.eval_all(args)?;
                match target {
                    Value::Fun(fun) => self.call_fun(&fun, &args),
                    other => Err(EvalError::Exception(format!(
                        "cannot invoke a {} as a function",
                        other.type_name()
                    ))),
                }
            }
            Expr::CaptureRemote { module, function, arity } => {
                Ok(Value::Fun(FunValue::Capture {
                    module: self.resolve_module(module),
                    function: function.clone(),
                    arity: *arity,
                }))
            }
            Expr::CaptureLocal { name, arity } => Ok(Value::Fun(FunValue::Capture {
                module: CORE_MODULE.to_string(),
                function: name.clone(),
                arity: *arity,
            })),
            Expr::Lambda { params, body } => {
                let mut flat: HashMap<String, Value> = HashMap::new();
                for scope in &self.scopes {
                    for (k, v) in scope {
                        flat.insert(k.clone(), v.clone());
                    }
                }
                Ok(Value::Fun(FunValue::Closure {
                    params: params.clone(),
                    body: Arc::new(body.clone()),
                    captured: flat.into_iter().collect(),
                }))
            }
            Expr::If { cond, then_body, else_body } => {
                let branch = if self.eval(cond)?.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                let mut last = Value::Nil;
                for e in branch {
                    last = self.eval(e)?;
                }
                Ok(last)
            }
            Expr::Block { body } => {
                let mut last = Value::Nil;
                for e in body {
                    last = self.eval(e)?;
                }
                Ok(last)
            }
            Expr::Form(Form::Alias { path, as_name, injected: true }) => {
                let short = as_name
                    .clone()
                    .or_else(|| path.0.last().cloned())
                    .unwrap_or_default();
                self.aliases.insert(short, path.dotted());
                Ok(Value::Nil)
            }
            // The analyzer rejects every other form before evaluation.
            Expr::Form(form) => Err(EvalError::Exception(format!(
                "blocked form {form:?} reached the evaluator"
            ))),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::with_capacity(exprs.len());
        for e in exprs {
            out.push(self.eval(e)?);
        }
        Ok(out)
    }

    fn eval_local_call(&mut self, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        // `and`/`or` short-circuit; everything else resolves to the core
        // library as an ordinary call.
        match name {
            "and" if args.len() == 2 => {
                let lhs = self.eval(&args[0])?;
                if lhs.is_truthy() {
                    self.eval(&args[1])
                } else {
                    Ok(lhs)
                }
            }
            "or" if args.len() == 2 => {
                let lhs = self.eval(&args[0])?;
                if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.eval(&args[1])
                }
            }
            _ => {
                let args = self.eval_all(args)?;
                self.call_module(CORE_MODULE, name, &args)
            }
        }
    }

    fn lookup_var(&self, name: &str) -> Result<Value, EvalError> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Ok(value.clone());
            }
        }
        Err(EvalError::Exception(format!("undefined variable {name}")))
    }

    fn resolve_module(&self, path: &ModulePath) -> String {
        match self.aliases.get(path.head()) {
            Some(full) if path.0.len() == 1 => full.clone(),
            Some(full) => format!("{full}.{}", path.0[1..].join(".")),
            None => path.dotted(),
        }
    }

    /// Dispatch a call to a registered native function.
    pub fn call_module(
        &mut self,
        module: &str,
        function: &str,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let Some(native) = self.registry.lookup(module, function).cloned() else {
            return Err(EvalError::Exception(format!(
                "undefined function {module}.{function}/{}",
                args.len()
            )));
        };
        native(self, args)
    }

    /// Call a fun value. Trailing invokes in closure bodies loop here
    /// instead of recursing.
    pub fn call_fun(&mut self, fun: &FunValue, args: &[Value]) -> Result<Value, EvalError> {
        let mut fun = fun.clone();
        let mut args = args.to_vec();
        loop {
            self.check_interrupt()?;
            match fun {
                FunValue::Capture { module, function, arity } => {
                    if args.len() != arity as usize {
                        return Err(EvalError::Exception(format!(
                            "{module}.{function}/{arity} called with {} arguments",
                            args.len()
                        )));
                    }
                    return self.call_module(&module, &function, &args);
                }
                FunValue::Closure { params, body, captured } => {
                    if args.len() != params.len() {
                        return Err(EvalError::Exception(format!(
                            "function expects {} arguments, got {}",
                            params.len(),
                            args.len()
                        )));
                    }
                    let mut frame: HashMap<String, Value> = captured.iter().cloned().collect();
                    for (p, a) in params.iter().zip(args.iter()) {
                        frame.insert(p.clone(), a.clone());
                    }
                    let saved = std::mem::replace(&mut self.scopes, vec![frame]);
                    let tail = self.eval_closure_body(&body);
                    self.scopes = saved;
                    match tail? {
                        TailResult::Value(value) => return Ok(value),
                        TailResult::Call(next_fun, next_args) => {
                            fun = next_fun;
                            args = next_args;
                        }
                    }
                }
            }
        }
    }

    fn eval_closure_body(&mut self, body: &[Expr]) -> Result<TailResult, EvalError> {
        let Some((last, init)) = body.split_last() else {
            return Ok(TailResult::Value(Value::Nil));
        };
        for e in init {
            self.eval(e)?;
        }
        if let Expr::Invoke { target, args } = last {
            let target = self.eval(target)?;
            let args = self.eval_all(args)?;
            match target {
                Value::Fun(fun) => Ok(TailResult::Call(fun, args)),
                other => Err(EvalError::Exception(format!(
                    "cannot invoke a {} as a function",
                    other.type_name()
                ))),
            }
        } else {
            Ok(TailResult::Value(self.eval(last)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corelib;
    use sandscript_lang::{DefaultParser, ScriptParser};
    use std::time::Duration;

    fn eval_with_deadline(source: &str, window: Duration) -> Result<Value, EvalError> {
        let program = DefaultParser.parse(source).expect("parse");
        let mut ctx = EvalCtx::new(
            Arc::new(corelib::core_registry()),
            Instant::now() + window,
            Arc::new(AtomicBool::new(false)),
            ToolVault::new(),
            None,
        );
        ctx.eval_program(&program)
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        eval_with_deadline(source, Duration::from_secs(2))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2").unwrap(), Value::Int(3));
        assert_eq!(eval("2 * 3 + 4").unwrap(), Value::Int(10));
        assert_eq!(eval("10 / 4").unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_variables_and_sequencing() {
        assert_eq!(eval("x = 5; y = x + 1; y * 2").unwrap(), Value::Int(12));
    }

    #[test]
    fn test_closure_captures_environment() {
        assert_eq!(
            eval("n = 10; add = fn x -> x + n end; add.(5)").unwrap(),
            Value::Int(15)
        );
    }

    #[test]
    fn test_capture_invocation() {
        assert_eq!(eval("f = &length/1; f.([1, 2, 3])").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_short_circuit_and() {
        // The right side would raise if evaluated.
        assert_eq!(eval("false and raise(\"boom\")").unwrap(), Value::Bool(false));
        assert_eq!(eval("nil or 7").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_if_branches_and_default() {
        assert_eq!(
            eval("x = 3; if x > 1 do :big else :small end").unwrap(),
            Value::Symbol("big".into())
        );
        assert_eq!(
            eval("if false do 1 end").unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_undefined_variable_raises() {
        let err = eval("ghost + 1").unwrap_err();
        assert!(matches!(err, EvalError::Exception(m) if m.contains("undefined variable")));
    }

    #[test]
    fn test_self_application_hits_deadline_not_stack() {
        let err = eval_with_deadline(
            "loop = fn f -> f.(f) end; loop.(loop)",
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Deadline));
    }

    #[test]
    fn test_non_tail_recursion_hits_depth_limit() {
        let err = eval("boom = fn f -> f.(f) + 1 end; boom.(boom)").unwrap_err();
        assert!(matches!(err, EvalError::Exception(m) if m.contains("depth limit")));
    }

    #[test]
    fn test_invoking_non_function_raises() {
        let err = eval("x = 3; x.(1)").unwrap_err();
        assert!(matches!(err, EvalError::Exception(m) if m.contains("cannot invoke")));
    }

    #[test]
    fn test_map_literal_replaces_duplicate_keys() {
        let value = eval("%{a: 1, a: 2}").unwrap();
        assert_eq!(
            value,
            Value::Map(vec![(Value::Symbol("a".into()), Value::Int(2))])
        );
    }
}
