//! Layered configuration resolution.
//!
//! Precedence, highest wins: call-site opts ⟶ agent static config ⟶
//! process environment ⟶ hard-coded defaults. Overlays merge per-field;
//! the nested sandbox section merges per-key rather than wholesale.

use serde::{Deserialize, Serialize};

/// Sandbox resource limits. Only `timeout_ms` is enforced; `max_heap_size`
/// is an advisory passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    pub timeout_ms: u64,
    pub max_heap_size: u64,
}

/// Resolved, immutable per-activation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub model: String,
    pub timeout_ms: u64,
    pub max_iterations: u32,
    pub max_retries: u32,
    pub sandbox: SandboxLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "openai:gpt-4o".to_string(),
            timeout_ms: 30_000,
            max_iterations: 10,
            max_retries: 3,
            sandbox: SandboxLimits {
                timeout_ms: 5_000,
                max_heap_size: 50_000,
            },
        }
    }
}

/// Partial overrides for the sandbox section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxOverlay {
    pub timeout_ms: Option<u64>,
    pub max_heap_size: Option<u64>,
}

impl SandboxOverlay {
    fn apply(&self, limits: &mut SandboxLimits) {
        if let Some(timeout_ms) = self.timeout_ms {
            limits.timeout_ms = timeout_ms;
        }
        if let Some(max_heap_size) = self.max_heap_size {
            limits.max_heap_size = max_heap_size;
        }
    }
}

/// A partial configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverlay {
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_iterations: Option<u32>,
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub sandbox: SandboxOverlay,
}

impl ConfigOverlay {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations.max(1);
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        self.sandbox.apply(&mut config.sandbox);
    }
}

/// Overlay sourced from `SANDSCRIPT_*` environment variables.
pub fn env_overlay() -> ConfigOverlay {
    ConfigOverlay {
        model: std::env::var("SANDSCRIPT_MODEL").ok(),
        timeout_ms: env_u64("SANDSCRIPT_TIMEOUT_MS"),
        max_iterations: env_u64("SANDSCRIPT_MAX_ITERATIONS").map(|v| v as u32),
        max_retries: env_u64("SANDSCRIPT_MAX_RETRIES").map(|v| v as u32),
        sandbox: SandboxOverlay {
            timeout_ms: env_u64("SANDSCRIPT_SANDBOX_TIMEOUT_MS"),
            max_heap_size: env_u64("SANDSCRIPT_SANDBOX_MAX_HEAP_SIZE"),
        },
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Resolve the effective configuration for an activation.
///
/// `agent_sandbox` is the agent's dedicated sandbox override hook; it layers
/// between the agent's static config and the call-site opts.
pub fn resolve(
    agent_static: &ConfigOverlay,
    agent_sandbox: &SandboxOverlay,
    call_opts: &ConfigOverlay,
) -> Config {
    let mut config = Config::default();
    env_overlay().apply(&mut config);
    agent_static.apply(&mut config);
    agent_sandbox.apply(&mut config.sandbox);
    call_opts.apply(&mut config);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_coded_defaults() {
        let config = Config::default();
        assert_eq!(config.model, "openai:gpt-4o");
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.sandbox.timeout_ms, 5_000);
        assert_eq!(config.sandbox.max_heap_size, 50_000);
    }

    #[test]
    fn test_call_opts_win_over_agent_static() {
        let agent_static = ConfigOverlay {
            max_iterations: Some(5),
            model: Some("anthropic:claude".into()),
            ..ConfigOverlay::default()
        };
        let call = ConfigOverlay {
            max_iterations: Some(2),
            ..ConfigOverlay::default()
        };
        let config = resolve(&agent_static, &SandboxOverlay::default(), &call);
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.model, "anthropic:claude");
    }

    #[test]
    fn test_sandbox_section_merges_per_key() {
        let agent_static = ConfigOverlay {
            sandbox: SandboxOverlay {
                timeout_ms: Some(1_000),
                max_heap_size: Some(99),
            },
            ..ConfigOverlay::default()
        };
        let call = ConfigOverlay {
            sandbox: SandboxOverlay {
                timeout_ms: Some(250),
                max_heap_size: None,
            },
            ..ConfigOverlay::default()
        };
        let config = resolve(&agent_static, &SandboxOverlay::default(), &call);
        // Call overrides the timeout; the heap key falls through.
        assert_eq!(config.sandbox.timeout_ms, 250);
        assert_eq!(config.sandbox.max_heap_size, 99);
    }

    #[test]
    fn test_agent_sandbox_options_layer() {
        let sandbox = SandboxOverlay {
            timeout_ms: Some(750),
            max_heap_size: None,
        };
        let config = resolve(&ConfigOverlay::default(), &sandbox, &ConfigOverlay::default());
        assert_eq!(config.sandbox.timeout_ms, 750);
        assert_eq!(config.sandbox.max_heap_size, 50_000);
    }

    #[test]
    fn test_max_iterations_floor_is_one() {
        let call = ConfigOverlay {
            max_iterations: Some(0),
            ..ConfigOverlay::default()
        };
        let config = resolve(&ConfigOverlay::default(), &SandboxOverlay::default(), &call);
        assert_eq!(config.max_iterations, 1);
    }
}
