//! The bounded executor loop.
//!
//! One activation: request a structured reply, dispatch on the action, route
//! code through the sandbox, feed results or errors back into the
//! conversation, and loop until a terminal action or a configured limit.
//! `iteration` counts successful evaluate-and-continue steps; `retry` counts
//! consecutive recoverable failures and resets on any success. Transport
//! failures are fatal and never counted as retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use sandscript_lang::render::{render_value, RenderLimits};
use sandscript_lang::Value;
use sandscript_sandbox::{
    core_registry, Allowlist, EvalOptions, EvalServices, Sandbox, ToolVault,
};

use crate::action::{action_schema, ActionKind, ActionReply};
use crate::config::{resolve, Config, ConfigOverlay};
use crate::error::{CancelReason, ExecutorError};
use crate::prompt::build_system_prompt;
use crate::telemetry;
use crate::tool::Agent;
use crate::transport::{LlmTransport, Message};

/// The evolving per-activation conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub messages: Vec<Message>,
    pub iteration: u32,
    pub retry: u32,
}

impl Context {
    /// Fresh conversation: exactly one system message followed by the task.
    pub fn new(system_prompt: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(task)],
            iteration: 0,
            retry: 0,
        }
    }

    /// Counter reset on `continue` entry.
    pub fn reset_counters(&mut self) {
        self.iteration = 0;
        self.retry = 0;
    }
}

/// Terminal result of an activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The model finished; carries the result value (null for `done`).
    Completed(Json),
    /// A configured limit stopped the loop.
    Cancelled(CancelReason),
}

/// Terminal report with counters and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: Outcome,
    pub iterations: u32,
    pub retries: u32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Everything resolved once per activation before the loop starts: sandbox
/// registry with tool modules, merged allowlist, vault, aliases, and the
/// reply schema.
struct Activation {
    sandbox: Sandbox,
    allowlist: Allowlist,
    vault: ToolVault,
    aliases: Vec<(String, String)>,
    schema: Json,
    services: Option<Arc<dyn EvalServices>>,
}

/// The executor: stateless over activations, owns only the transport.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn LlmTransport>,
}

impl Executor {
    pub fn new(transport: Arc<dyn LlmTransport>) -> Self {
        Self { transport }
    }

    /// One-shot entry point: fresh conversation, resolved config, no host
    /// services.
    pub async fn run(
        &self,
        agent: &dyn Agent,
        task: &str,
        call_opts: &ConfigOverlay,
    ) -> Result<RunReport, ExecutorError> {
        let config = resolve(&agent.static_config(), &agent.sandbox_options(), call_opts);
        self.run_fresh(agent, task, &config, None).await.0
    }

    /// Fresh-conversation activation. Returns the report alongside the final
    /// context so stateful callers can keep the conversation.
    pub async fn run_fresh(
        &self,
        agent: &dyn Agent,
        task: &str,
        config: &Config,
        services: Option<Arc<dyn EvalServices>>,
    ) -> (Result<RunReport, ExecutorError>, Context) {
        let activation = self.prepare(agent, services);
        let mut context = Context::new(build_system_prompt(agent, &activation.vault), task);
        let result = self.drive(&activation, &mut context, config).await;
        (result, context)
    }

    /// Continue an existing conversation: append the user message (when
    /// non-empty), reset counters, and loop again.
    pub async fn continue_run(
        &self,
        agent: &dyn Agent,
        mut context: Context,
        message: &str,
        config: &Config,
        services: Option<Arc<dyn EvalServices>>,
    ) -> (Result<RunReport, ExecutorError>, Context) {
        let activation = self.prepare(agent, services);
        if !message.trim().is_empty() {
            context.messages.push(Message::user(message));
        }
        context.reset_counters();
        let result = self.drive(&activation, &mut context, config).await;
        (result, context)
    }

    /// Vault setup and registry/allowlist assembly, once per activation.
    fn prepare(&self, agent: &dyn Agent, services: Option<Arc<dyn EvalServices>>) -> Activation {
        let mut registry = core_registry();
        let mut allowlist = Allowlist::builder().extend(agent.base_allowlist());
        let mut vault = ToolVault::new();
        let mut aliases = Vec::new();

        for tool in agent.tools() {
            let opts = agent.tool_options(tool.name());
            aliases.extend(tool.aliases(&opts));
            vault.set(tool.name(), opts);
            let (module, permission) = tool.allowlist_contribution();
            allowlist = allowlist.allow(module, permission);
            registry.insert(tool.module());
        }

        Activation {
            sandbox: Sandbox::new(registry),
            allowlist: allowlist.build(),
            vault,
            aliases,
            schema: action_schema(&agent.output_schema()),
            services,
        }
    }

    async fn drive(
        &self,
        activation: &Activation,
        context: &mut Context,
        config: &Config,
    ) -> Result<RunReport, ExecutorError> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let started_at = Utc::now();
        telemetry::emit_call_start(&run_id, &config.model);

        let outcome = loop {
            if context.iteration >= config.max_iterations {
                break Outcome::Cancelled(CancelReason::ReachedMaxIterations);
            }

            let iteration_started = Instant::now();
            telemetry::emit_iteration_start(&run_id, context.iteration, context.retry);
            telemetry::emit_llm_request_start(
                &run_id,
                &config.model,
                context.messages.len(),
                context.iteration,
                context.retry,
            );

            let request_started = Instant::now();
            let raw = match self
                .transport
                .generate_structured(&config.model, &context.messages, &activation.schema)
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    // Transport failures are fatal, not retried.
                    let err = ExecutorError::Transport(e.to_string());
                    telemetry::emit_call_exception(&run_id, &err);
                    return Err(err);
                }
            };
            telemetry::emit_llm_request_stop(&run_id, elapsed_ms(request_started), &raw);

            context.messages.push(Message::assistant(raw.to_string()));

            let reply = match ActionReply::parse(&raw) {
                Ok(reply) => reply,
                Err(detail) => {
                    let feedback = format!(
                        "Invalid response format: {detail}. \
                         Please respond with valid JSON in the expected format."
                    );
                    if let Some(reason) = note_failure(context, config, feedback) {
                        break Outcome::Cancelled(reason);
                    }
                    continue;
                }
            };

            match reply.action {
                ActionKind::EvalAndContinue => {
                    match self
                        .eval_code(activation, config, &run_id, context.iteration, &reply.code)
                        .await
                    {
                        Ok(value) => {
                            let rendered = render_value(&value, &RenderLimits::default());
                            context.messages.push(Message::user(format!(
                                "Code executed successfully. Result:\n```\n{rendered}\n```"
                            )));
                            context.iteration += 1;
                            context.retry = 0;
                            telemetry::METRICS.inc_iterations_completed();
                            telemetry::emit_iteration_stop(
                                &run_id,
                                context.iteration,
                                elapsed_ms(iteration_started),
                            );
                        }
                        Err(feedback) => {
                            if let Some(reason) = note_failure(context, config, feedback) {
                                break Outcome::Cancelled(reason);
                            }
                        }
                    }
                }
                ActionKind::EvalAndComplete => {
                    match self
                        .eval_code(activation, config, &run_id, context.iteration, &reply.code)
                        .await
                    {
                        Ok(value) => break Outcome::Completed(value.to_json()),
                        Err(feedback) => {
                            if let Some(reason) = note_failure(context, config, feedback) {
                                break Outcome::Cancelled(reason);
                            }
                        }
                    }
                }
                ActionKind::Return => break Outcome::Completed(reply.result),
                ActionKind::Done => break Outcome::Completed(Json::Null),
            }
        };

        let duration_ms = elapsed_ms(started);
        telemetry::emit_call_stop(
            &run_id,
            duration_ms,
            match &outcome {
                Outcome::Completed(_) => "completed",
                Outcome::Cancelled(CancelReason::ReachedMaxIterations) => "reached_max_iterations",
                Outcome::Cancelled(CancelReason::ReachedMaxRetries) => "reached_max_retries",
            },
        );

        Ok(RunReport {
            run_id,
            outcome,
            iterations: context.iteration,
            retries: context.retry,
            started_at,
            duration_ms,
        })
    }

    /// Run one code string through the sandbox; failures come back as the
    /// feedback text for the conversation.
    async fn eval_code(
        &self,
        activation: &Activation,
        config: &Config,
        run_id: &str,
        iteration: u32,
        code: &str,
    ) -> Result<Value, String> {
        telemetry::emit_sandbox_eval_start(run_id, iteration);
        let eval_started = Instant::now();
        let result = activation
            .sandbox
            .eval(
                code,
                &activation.allowlist,
                EvalOptions {
                    timeout: Duration::from_millis(config.sandbox.timeout_ms),
                    max_heap_size: config.sandbox.max_heap_size,
                    aliases: activation.aliases.clone(),
                    vault: activation.vault.clone(),
                    services: activation.services.clone(),
                },
            )
            .await;

        match result {
            Ok(value) => {
                telemetry::emit_sandbox_eval_stop(run_id, elapsed_ms(eval_started), "ok");
                Ok(value)
            }
            Err(e) => {
                if e.kind() == "restricted" {
                    telemetry::METRICS.inc_restricted_denials();
                }
                telemetry::emit_sandbox_eval_stop(run_id, elapsed_ms(eval_started), e.kind());
                Err(format!(
                    "Code execution failed:\n\n{e}\n\nPlease fix the error and try again."
                ))
            }
        }
    }
}

/// Retry handling: cancel when the consecutive-failure budget is exhausted,
/// otherwise append the feedback and bump `retry`. `iteration` is untouched.
fn note_failure(context: &mut Context, config: &Config, feedback: String) -> Option<CancelReason> {
    if context.retry >= config.max_retries {
        return Some(CancelReason::ReachedMaxRetries);
    }
    context.messages.push(Message::user(feedback));
    context.retry += 1;
    None
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Role;

    #[test]
    fn test_context_starts_with_system_then_user() {
        let context = Context::new("prompt", "task");
        assert_eq!(context.messages[0].role, Role::System);
        assert_eq!(context.messages[1].role, Role::User);
        assert_eq!(context.iteration, 0);
        assert_eq!(context.retry, 0);
    }

    #[test]
    fn test_note_failure_increments_retry_only() {
        let mut context = Context::new("p", "t");
        let config = Config::default();
        assert!(note_failure(&mut context, &config, "oops".into()).is_none());
        assert_eq!(context.retry, 1);
        assert_eq!(context.iteration, 0);
        assert_eq!(context.messages.last().unwrap().content, "oops");
    }

    #[test]
    fn test_note_failure_cancels_at_budget() {
        let mut context = Context::new("p", "t");
        let config = Config {
            max_retries: 0,
            ..Config::default()
        };
        assert_eq!(
            note_failure(&mut context, &config, "oops".into()),
            Some(CancelReason::ReachedMaxRetries)
        );
        // The feedback is not appended once cancelled.
        assert_eq!(context.messages.len(), 2);
    }
}
