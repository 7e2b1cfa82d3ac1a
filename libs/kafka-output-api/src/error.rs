use std::fmt;

/// Error kind for plugin errors.
///
/// Config errors are permanent. Io errors come from the broker and may clear
/// after a reconnect. Format errors drop the offending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration. Permanent.
    Config,
    /// Network or broker failure. Transient.
    Io,
    /// Malformed input or unserializable value.
    Format,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Format => f.write_str("format"),
        }
    }
}

/// Plugin error returned by every decode, encode and broker operation.
#[derive(Debug, Clone)]
pub struct PluginError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PluginError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PluginError {}

// ---------------------------------------------------------------------------
// From impls: codec errors → PluginError::format
// ---------------------------------------------------------------------------

impl From<serde_json::Error> for PluginError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string())
    }
}

impl From<rmpv::decode::Error> for PluginError {
    fn from(e: rmpv::decode::Error) -> Self {
        Self::format(format!("msgpack decode: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_context_keeps_kind() {
        let err = PluginError::io("connection refused").with_context("broker 'a:9092'");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.message(), "broker 'a:9092': connection refused");
        assert_eq!(err.to_string(), "io: broker 'a:9092': connection refused");
    }

    #[test]
    fn json_errors_are_format_errors() {
        let e = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(PluginError::from(e).kind(), ErrorKind::Format);
    }
}
