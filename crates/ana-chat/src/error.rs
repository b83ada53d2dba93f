//! Error types for the interpreter and the chat orchestrator.

use ana_core::error::AnaError;

/// Errors from a single interpretation call.
///
/// Only the configuration class ([`is_configuration`](Self::is_configuration))
/// ever reaches callers of
/// [`MessageInterpreter::interpret`](crate::MessageInterpreter::interpret);
/// everything else is absorbed into a fallback reply.
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    #[error("API key missing: set {env_var} or llm.api_key")]
    CredentialMissing { env_var: String },
    #[error("API key rejected by the provider: {0}")]
    CredentialRejected(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("response does not match schema: {0}")]
    SchemaViolation(String),
}

impl InterpreterError {
    /// Whether this is a configuration problem the user has to fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            InterpreterError::CredentialMissing { .. } | InterpreterError::CredentialRejected(_)
        )
    }
}

impl From<reqwest::Error> for InterpreterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            InterpreterError::MalformedResponse(err.to_string())
        } else {
            InterpreterError::Transport(err.to_string())
        }
    }
}

/// Errors from the chat orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("session {0} already has a message in flight")]
    SessionBusy(uuid::Uuid),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<AnaError> for ChatError {
    fn from(err: AnaError) -> Self {
        match err {
            AnaError::SessionNotFound(id) => ChatError::SessionNotFound(id),
            other => ChatError::StorageError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_interpreter_error_display() {
        let err = InterpreterError::CredentialMissing {
            env_var: "API_KEY".to_string(),
        };
        assert_eq!(err.to_string(), "API key missing: set API_KEY or llm.api_key");

        let err = InterpreterError::Status {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned HTTP 503: overloaded");

        assert_eq!(
            InterpreterError::EmptyResponse.to_string(),
            "provider returned an empty response"
        );
    }

    #[test]
    fn test_configuration_class() {
        assert!(InterpreterError::CredentialMissing {
            env_var: "API_KEY".to_string()
        }
        .is_configuration());
        assert!(InterpreterError::CredentialRejected("API_KEY_INVALID".to_string())
            .is_configuration());

        let transient = [
            InterpreterError::Transport("connection reset".to_string()),
            InterpreterError::Status {
                status: 500,
                body: String::new(),
            },
            InterpreterError::EmptyResponse,
            InterpreterError::MalformedResponse("eof".to_string()),
            InterpreterError::SchemaViolation("reply missing".to_string()),
        ];
        for err in transient {
            assert!(!err.is_configuration(), "{} should be transient", err);
        }
    }

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        let id = Uuid::nil();
        assert_eq!(
            ChatError::SessionBusy(id).to_string(),
            format!("session {} already has a message in flight", id)
        );
    }

    #[test]
    fn test_chat_error_from_ana_error() {
        let id = Uuid::new_v4();
        let err: ChatError = AnaError::SessionNotFound(id).into();
        assert!(matches!(err, ChatError::SessionNotFound(got) if got == id));

        let err: ChatError = AnaError::Storage("disk full".to_string()).into();
        assert!(matches!(err, ChatError::StorageError(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
