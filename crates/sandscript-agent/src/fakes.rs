//! Scripted fakes for executor and server tests.
//!
//! `ScriptedTransport` replays canned action replies instead of calling a
//! model; the tools here are small real tools wired through the sandbox
//! registry so tests exercise the genuine authorization and vault paths.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as Json};

use sandscript_lang::Value;
use sandscript_sandbox::{EvalError, ModuleDef, ToolOptions};

use crate::action::OutputSchema;
use crate::config::ConfigOverlay;
use crate::tool::{Agent, FunctionSpec, Tool};
use crate::transport::{LlmTransport, Message, TransportError};

/// Transport that pops canned replies off a queue, with an optional
/// repeating fallback once the queue is drained.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<Json, TransportError>>>,
    fallback: Option<Json>,
    calls: AtomicU64,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Json>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(replies.into_iter().map(Ok).collect()),
            fallback: None,
            calls: AtomicU64::new(0),
        })
    }

    /// Every request gets the same reply, forever.
    pub fn repeating(reply: Json) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Some(reply),
            calls: AtomicU64::new(0),
        })
    }

    /// The first request fails at the transport level.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::from([Err(TransportError(message.to_string()))])),
            fallback: None,
            calls: AtomicU64::new(0),
        })
    }

    /// Number of requests made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn generate_structured(
        &self,
        _model: &str,
        _messages: &[Message],
        _schema: &Json,
    ) -> Result<Json, TransportError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let popped = self.queue.lock().expect("queue lock").pop_front();
        match popped {
            Some(result) => result,
            None => match &self.fallback {
                Some(reply) => Ok(reply.clone()),
                None => Err(TransportError("scripted transport exhausted".into())),
            },
        }
    }
}

/// Shorthand for a raw action reply object.
pub fn action(action: &str, code: &str, result: Json) -> Json {
    json!({ "action": action, "code": code, "result": result })
}

/// Integer arithmetic tool.
pub struct CalcTool;

impl Tool for CalcTool {
    fn name(&self) -> &str {
        "Calc"
    }

    fn moduledoc(&self) -> &str {
        "Integer arithmetic helpers."
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        vec![
            FunctionSpec::new("add", &["a", "b"], "Adds two integers."),
            FunctionSpec::new("multiply", &["a", "b"], "Multiplies two integers."),
        ]
    }

    fn module(&self) -> ModuleDef {
        let mut m = ModuleDef::new("Calc");
        m.register("add", |_ctx, args| match (args.first(), args.get(1)) {
            (Some(Value::Int(a)), Some(Value::Int(b))) => Ok(Value::Int(a + b)),
            _ => Err(EvalError::Exception("Calc.add expects two integers".into())),
        });
        m.register("multiply", |_ctx, args| match (args.first(), args.get(1)) {
            (Some(Value::Int(a)), Some(Value::Int(b))) => Ok(Value::Int(a * b)),
            _ => Err(EvalError::Exception("Calc.multiply expects two integers".into())),
        });
        m
    }

    fn aliases(&self, _opts: &ToolOptions) -> Vec<(String, String)> {
        vec![("C".to_string(), "Calc".to_string())]
    }
}

/// Tool whose single function blocks on a human-input round-trip. Answers
/// received are recorded for assertions.
#[derive(Default)]
pub struct ConsoleTool {
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl Tool for ConsoleTool {
    fn name(&self) -> &str {
        "Console"
    }

    fn moduledoc(&self) -> &str {
        "Asks the operator for input and waits for the answer."
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        vec![FunctionSpec::new(
            "ask",
            &["question"],
            "Blocks until the operator responds; returns the answer.",
        )]
    }

    fn module(&self) -> ModuleDef {
        let received = Arc::clone(&self.received);
        let mut m = ModuleDef::new("Console");
        m.register("ask", move |ctx, args| {
            let question = match args.first() {
                Some(Value::Str(q)) => q.clone(),
                _ => return Err(EvalError::Exception("Console.ask expects a question".into())),
            };
            let answer = ctx.human_input(&question, "ask")?;
            received.lock().expect("received lock").push(answer.clone());
            Ok(answer)
        });
        m
    }
}

/// Tool that reads its own vault options, proving the back-channel works
/// without sandboxed code passing anything through.
pub struct LookupTool;

impl Tool for LookupTool {
    fn name(&self) -> &str {
        "Lookup"
    }

    fn moduledoc(&self) -> &str {
        "Reads configured lookup options."
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        vec![FunctionSpec::new(
            "option",
            &["key"],
            "Returns the configured option value for key, or nil.",
        )]
    }

    fn module(&self) -> ModuleDef {
        let mut m = ModuleDef::new("Lookup");
        m.register("option", |ctx, args| {
            let key = match args.first() {
                Some(Value::Str(k)) => k.clone(),
                _ => return Err(EvalError::Exception("Lookup.option expects a string key".into())),
            };
            Ok(ctx
                .vault()
                .option("Lookup", &key)
                .cloned()
                .unwrap_or(Value::Nil))
        });
        m
    }
}

/// Configurable agent descriptor for tests.
pub struct TestAgent {
    pub doc: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub output: OutputSchema,
    pub config: ConfigOverlay,
    pub options: HashMap<String, ToolOptions>,
}

impl Default for TestAgent {
    fn default() -> Self {
        Self {
            doc: String::new(),
            tools: Vec::new(),
            output: OutputSchema::default(),
            config: ConfigOverlay::default(),
            options: HashMap::new(),
        }
    }
}

impl Agent for TestAgent {
    fn moduledoc(&self) -> &str {
        &self.doc
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    fn output_schema(&self) -> OutputSchema {
        self.output.clone()
    }

    fn static_config(&self) -> ConfigOverlay {
        self.config.clone()
    }

    fn tool_options(&self, tool: &str) -> ToolOptions {
        self.options.get(tool).cloned().unwrap_or_default()
    }
}
