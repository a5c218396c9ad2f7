use crate::CacheError;

/// Formatted error with structured information for display.
#[derive(Debug, Clone, Default)]
pub struct FormattedError {
    /// Primary error message.
    pub message: String,

    /// Suggestion for how to fix the error (e.g. refresh the cache node).
    pub hint: Option<String>,

    /// Error code reported by the server (e.g. `WRONGPASS`, `NOAUTH`).
    pub code: Option<String>,
}

impl FormattedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Convert to a single-line display string.
    pub fn to_display_string(&self) -> String {
        let mut parts = vec![self.message.clone()];

        if let Some(ref hint) = self.hint {
            parts.push(format!("Hint: {}", hint));
        }

        if let Some(ref code) = self.code {
            parts.push(format!("Code: {}", code));
        }

        parts.join(". ")
    }

    /// Convert to CacheError::ConnectionFailed.
    pub fn into_connection_error(self) -> CacheError {
        CacheError::ConnectionFailed(self.to_display_string())
    }

    /// Convert to CacheError::Protocol.
    pub fn into_protocol_error(self) -> CacheError {
        CacheError::Protocol(self.to_display_string())
    }
}

/// Trait for formatting driver-specific errors into a structured format.
pub trait CommandErrorFormatter: Send + Sync {
    /// Format an error raised while executing a command.
    fn format_command_error(&self, error: &(dyn std::error::Error + 'static)) -> FormattedError;

    /// Format an error raised while connecting to `host:port`.
    fn format_connection_error(
        &self,
        error: &(dyn std::error::Error + 'static),
        host: &str,
        port: u16,
    ) -> FormattedError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_string_joins_parts() {
        let formatted = FormattedError::new("Authentication failed")
            .with_hint("Check the access key")
            .with_code("WRONGPASS");

        assert_eq!(
            formatted.to_display_string(),
            "Authentication failed. Hint: Check the access key. Code: WRONGPASS"
        );
    }

    #[test]
    fn converts_into_cache_errors() {
        let err = FormattedError::new("boom").into_connection_error();
        assert!(matches!(err, CacheError::ConnectionFailed(ref m) if m == "boom"));
        assert!(err.is_retriable());

        let err = FormattedError::new("odd reply").into_protocol_error();
        assert!(matches!(err, CacheError::Protocol(_)));
        assert!(!err.is_retriable());
    }
}
