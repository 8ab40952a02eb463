//! The long-lived agent server: a single-task actor wrapping the executor.
//!
//! State mutations are serialized by one task draining a channel. Executor
//! activations run on spawned workers so the server keeps receiving messages
//! — notably human-input responses — while a run is in flight. At most one
//! worker is active and at most one human-input waiter is outstanding per
//! instance; client messages arriving during a run are queued and served in
//! arrival order when the worker completes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as Json;
use tokio::sync::{mpsc, oneshot};

use sandscript_lang::Value;
use sandscript_sandbox::{EvalError, EvalServices};

use crate::config::{resolve, Config, ConfigOverlay};
use crate::error::ServerError;
use crate::executor::{Context, Executor, Outcome, RunReport};
use crate::telemetry;
use crate::tool::Agent;
use crate::transport::LlmTransport;

const MAILBOX_CAPACITY: usize = 64;

enum Work {
    Initial { task: String },
    Message { text: String },
}

struct Pending {
    work: Work,
    reply: Option<oneshot::Sender<Result<Outcome, ServerError>>>,
}

enum ServerMsg {
    Client {
        text: String,
        reply: Option<oneshot::Sender<Result<Outcome, ServerError>>>,
    },
    Respond {
        value: Json,
        reply: oneshot::Sender<Result<(), ServerError>>,
    },
    HumanInput {
        question: String,
        kind: String,
        reply: oneshot::Sender<Value>,
    },
    WorkerDone {
        result: Result<RunReport, crate::error::ExecutorError>,
        context: Context,
    },
}

/// Cloneable client handle to a running agent server.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<ServerMsg>,
}

impl AgentHandle {
    /// Fire-and-forget message; processed after any in-flight run.
    pub async fn cast(&self, text: impl Into<String>) -> Result<(), ServerError> {
        self.tx
            .send(ServerMsg::Client { text: text.into(), reply: None })
            .await
            .map_err(|_| ServerError::Closed)
    }

    /// Blocking message: resolves when the executor reaches a terminal state
    /// for it. The timeout bounds only this client's wait — the run itself
    /// is not cancelled on expiry.
    pub async fn call(
        &self,
        text: impl Into<String>,
        timeout: Duration,
    ) -> Result<Outcome, ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ServerMsg::Client { text: text.into(), reply: Some(reply_tx) })
            .await
            .map_err(|_| ServerError::Closed)?;
        match tokio::time::timeout(timeout, reply_rx).await {
            Err(_) => Err(ServerError::CallTimeout),
            Ok(Err(_)) => Err(ServerError::Closed),
            Ok(Ok(result)) => result,
        }
    }

    /// Synchronous `call` for native tool functions, which run on blocking
    /// threads. This is the delegation path: a tool in one agent calls into
    /// another agent's server and waits for its terminal result.
    pub fn call_blocking(
        &self,
        text: impl Into<String>,
        timeout: Duration,
    ) -> Result<Outcome, ServerError> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.call(text, timeout)),
            Err(_) => Err(ServerError::Closed),
        }
    }

    /// Deliver a human-input response to the pending waiter.
    pub async fn respond(&self, value: Json, timeout: Duration) -> Result<(), ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ServerMsg::Respond { value, reply: reply_tx })
            .await
            .map_err(|_| ServerError::Closed)?;
        match tokio::time::timeout(timeout, reply_rx).await {
            Err(_) => Err(ServerError::CallTimeout),
            Ok(Err(_)) => Err(ServerError::Closed),
            Ok(Ok(result)) => result,
        }
    }
}

/// Start an agent server. Initializes config and context, then enqueues the
/// initial run before any client message is served.
pub fn start(
    agent: Arc<dyn Agent>,
    transport: Arc<dyn LlmTransport>,
    initial_task: impl Into<String>,
    call_opts: &ConfigOverlay,
) -> AgentHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let config = resolve(&agent.static_config(), &agent.sandbox_options(), call_opts);
    let server = Server {
        executor: Executor::new(transport),
        agent,
        config,
        context: None,
        pending: VecDeque::new(),
        current_reply: None,
        human_input_waiter: None,
        worker_active: false,
        tx: tx.clone(),
    };
    tokio::spawn(server.run(rx, initial_task.into()));
    AgentHandle { tx }
}

struct Server {
    executor: Executor,
    agent: Arc<dyn Agent>,
    config: Config,
    /// None while a worker owns the conversation.
    context: Option<Context>,
    pending: VecDeque<Pending>,
    current_reply: Option<oneshot::Sender<Result<Outcome, ServerError>>>,
    human_input_waiter: Option<oneshot::Sender<Value>>,
    worker_active: bool,
    tx: mpsc::Sender<ServerMsg>,
}

impl Server {
    async fn run(mut self, mut rx: mpsc::Receiver<ServerMsg>, initial_task: String) {
        self.begin(Pending {
            work: Work::Initial { task: initial_task },
            reply: None,
        });
        while let Some(msg) = rx.recv().await {
            self.handle(msg);
        }
    }

    fn handle(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Client { text, reply } => {
                self.begin(Pending { work: Work::Message { text }, reply });
            }
            ServerMsg::Respond { value, reply } => match self.human_input_waiter.take() {
                Some(waiter) => {
                    let _ = waiter.send(Value::from_json(&value));
                    telemetry::emit_human_input_received();
                    let _ = reply.send(Ok(()));
                }
                None => {
                    let _ = reply.send(Err(ServerError::NoPendingRequest));
                }
            },
            ServerMsg::HumanInput { question, kind, reply } => {
                telemetry::emit_human_input_required(&question, &kind);
                self.human_input_waiter = Some(reply);
            }
            ServerMsg::WorkerDone { result, context } => {
                self.worker_active = false;
                self.context = Some(context);
                // Drop any waiter stranded by a timed-out evaluation so the
                // blocked tool thread unblocks with an error.
                self.human_input_waiter = None;
                if let Some(reply) = self.current_reply.take() {
                    let _ = reply.send(match result {
                        Ok(report) => Ok(report.outcome),
                        Err(e) => Err(ServerError::Executor(e)),
                    });
                }
                if let Some(next) = self.pending.pop_front() {
                    self.spawn_worker(next);
                }
            }
        }
    }

    fn begin(&mut self, pending: Pending) {
        if self.worker_active {
            self.pending.push_back(pending);
        } else {
            self.spawn_worker(pending);
        }
    }

    fn spawn_worker(&mut self, pending: Pending) {
        self.worker_active = true;
        self.current_reply = pending.reply;

        let executor = self.executor.clone();
        let agent = Arc::clone(&self.agent);
        let config = self.config.clone();
        let context = self.context.take();
        let services: Arc<dyn EvalServices> = Arc::new(ServerServices { tx: self.tx.clone() });
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let (result, context) = match (pending.work, context) {
                (Work::Initial { task }, _) => {
                    executor
                        .run_fresh(agent.as_ref(), &task, &config, Some(services))
                        .await
                }
                (Work::Message { text }, Some(context)) => {
                    executor
                        .continue_run(agent.as_ref(), context, &text, &config, Some(services))
                        .await
                }
                // A message before the initial run produced a context starts
                // a fresh conversation with the text as the task.
                (Work::Message { text }, None) => {
                    executor
                        .run_fresh(agent.as_ref(), &text, &config, Some(services))
                        .await
                }
            };
            let _ = tx.send(ServerMsg::WorkerDone { result, context }).await;
        });
    }
}

/// Bridge from native tool functions (on the evaluation thread) back into
/// the owning server's mailbox. The round-trip is synchronous from the
/// tool's point of view; the server stays responsive because the request is
/// just another mailbox message.
struct ServerServices {
    tx: mpsc::Sender<ServerMsg>,
}

impl EvalServices for ServerServices {
    fn human_input(&self, question: &str, kind: &str) -> Result<Value, EvalError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(ServerMsg::HumanInput {
                question: question.to_string(),
                kind: kind.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| EvalError::Exception("agent server is unavailable".into()))?;
        reply_rx
            .blocking_recv()
            .map_err(|_| EvalError::Exception("human input request was dropped".into()))
    }
}
