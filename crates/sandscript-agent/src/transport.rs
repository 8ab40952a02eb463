//! Conversation messages and the structured-generation transport seam.
//!
//! The runtime never speaks HTTP itself; it hands the transport a message
//! history and a JSON schema and expects back one object conforming to it.
//! Transports own network retries — a failure that reaches the executor is
//! semantic and treated as fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Transport failure. Always fatal to the executor activation.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The single structured-generation operation the runtime depends on.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn generate_structured(
        &self,
        model: &str,
        messages: &[Message],
        schema: &Json,
    ) -> Result<Json, TransportError>;
}
