//! The sandbox pipeline: parse → inject aliases → analyze → evaluate with a
//! wall-clock deadline in a cancellable worker.
//!
//! The worker runs on the blocking pool; the caller suspends only until the
//! worker finishes or the deadline fires. On expiry the shared cancel flag is
//! raised and the evaluator stops at its next interrupt check, so no partial
//! result ever reaches the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sandscript_lang::ast::{Expr, Form, ModulePath, Program};
use sandscript_lang::render::{render_value, RenderLimits};
use sandscript_lang::value::Value;
use sandscript_lang::{DefaultParser, ScriptParser};

use crate::allowlist::Allowlist;
use crate::analyzer::analyze;
use crate::error::{SandboxError, SandboxResult};
use crate::evaluator::{EvalCtx, EvalError, EvalServices};
use crate::registry::ModuleRegistry;
use crate::vault::ToolVault;

/// Per-evaluation options.
#[derive(Clone)]
pub struct EvalOptions {
    /// Wall-clock budget for the evaluation step.
    pub timeout: Duration,
    /// Advisory passthrough; the sandbox enforces only the timeout.
    pub max_heap_size: u64,
    /// Alias bindings injected ahead of user code, `(short, full)` pairs.
    pub aliases: Vec<(String, String)>,
    /// Tool options readable by native tool functions.
    pub vault: ToolVault,
    /// Host services (human input) for tool functions.
    pub services: Option<Arc<dyn EvalServices>>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            max_heap_size: 50_000,
            aliases: Vec::new(),
            vault: ToolVault::new(),
            services: None,
        }
    }
}

impl std::fmt::Debug for EvalOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalOptions")
            .field("timeout", &self.timeout)
            .field("max_heap_size", &self.max_heap_size)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// A configured sandbox: parser seam plus the module registry its programs
/// may call into.
#[derive(Clone)]
pub struct Sandbox {
    parser: Arc<dyn ScriptParser>,
    registry: Arc<ModuleRegistry>,
}

impl Sandbox {
    /// Sandbox over `registry` using the bundled parser.
    pub fn new(registry: ModuleRegistry) -> Self {
        Self::with_parser(registry, Arc::new(DefaultParser))
    }

    pub fn with_parser(registry: ModuleRegistry, parser: Arc<dyn ScriptParser>) -> Self {
        Self {
            parser,
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run `source` under `allowlist`. Classified errors per the sandbox
    /// taxonomy; `Ok` carries the value of the final expression.
    pub async fn eval(
        &self,
        source: &str,
        allowlist: &Allowlist,
        opts: EvalOptions,
    ) -> SandboxResult<Value> {
        let program = self
            .parser
            .parse(source)
            .map_err(|e| SandboxError::Parsing { message: e.to_string() })?;
        let program = inject_aliases(program, &opts.aliases);

        analyze(&program, allowlist, &self.registry).map_err(|v| {
            tracing::debug!(event = "sandbox.restricted", message = %v.message);
            SandboxError::Restricted { message: v.message }
        })?;

        let timeout_ms = opts.timeout.as_millis() as u64;
        let deadline = Instant::now() + opts.timeout;
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let registry = Arc::clone(&self.registry);
        let vault = opts.vault;
        let services = opts.services;

        let worker = tokio::task::spawn_blocking(move || {
            let mut ctx = EvalCtx::new(registry, deadline, worker_cancel, vault, services);
            ctx.eval_program(&program)
        });

        match tokio::time::timeout(opts.timeout, worker).await {
            Err(_elapsed) => {
                cancel.store(true, Ordering::Relaxed);
                tracing::debug!(event = "sandbox.timeout", timeout_ms);
                Err(SandboxError::Timeout { timeout_ms })
            }
            Ok(Err(join_error)) => Err(SandboxError::Exit {
                message: join_error.to_string(),
            }),
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(eval_error))) => Err(match eval_error {
                EvalError::Deadline | EvalError::Cancelled => {
                    SandboxError::Timeout { timeout_ms }
                }
                EvalError::Exception(message) => SandboxError::Exception { message },
                EvalError::Throw(value) => SandboxError::Throw {
                    message: render_value(&value, &RenderLimits::default()),
                },
            }),
        }
    }
}

/// Wrap a program in a top-level block that introduces alias bindings ahead
/// of the user code. The injected forms are exempt from the analyzer's
/// "alias is blocked" rule; user-written aliases stay rejected.
pub fn inject_aliases(program: Program, aliases: &[(String, String)]) -> Program {
    if aliases.is_empty() {
        return program;
    }
    let mut body: Vec<Expr> = aliases
        .iter()
        .map(|(short, full)| {
            Expr::Form(Form::Alias {
                path: ModulePath(full.split('.').map(str::to_string).collect()),
                as_name: Some(short.clone()),
                injected: true,
            })
        })
        .collect();
    body.extend(program.body);
    Program::new(vec![Expr::Block { body }])
}
