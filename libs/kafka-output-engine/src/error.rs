use std::time::Duration;

use kafka_output_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("no broker connection")]
    NotConnected,

    #[error("broker did not respond within {timeout:?} after {attempts} attempts")]
    ConnectTimeout { timeout: Duration, attempts: u32 },

    #[error("encode error: {0}")]
    Encode(PluginError),

    #[error("publish to topic '{topic}' failed: {source}")]
    Publish { topic: String, source: PluginError },
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Plugin` variant, context is added to the inner `PluginError`.
    /// For `Config`, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Plugin(e) => EngineError::Plugin(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
