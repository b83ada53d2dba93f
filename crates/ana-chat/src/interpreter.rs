//! Message interpreter: one user message in, one reply (plus extractions) out.
//!
//! Stateless per call. The only error that escapes is a configuration
//! problem with the API key; every other failure turns into
//! [`FALLBACK_REPLY`] with no extractions.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use ana_core::config::AnaConfig;
use ana_core::types::{ConversationTurn, InterpreterResult, PersonaConfig};

use crate::backend::{GenerationRequest, GenerativeBackend};
use crate::context::HistoryWindow;
use crate::credential::CredentialSource;
use crate::error::InterpreterError;
use crate::prompt::build_system_instruction;
use crate::schema::{parse_payload, response_schema};

/// Reply used whenever the backend call or its answer is unusable.
pub const FALLBACK_REPLY: &str =
    "Desculpe, não consegui processar sua mensagem agora. 😕 Pode tentar de novo?";

/// Knobs that shape requests but never control flow.
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    pub window: HistoryWindow,
    pub extract_reminders: bool,
    /// Name of the person the assistant works for; blank to omit.
    pub client_name: String,
    pub locale: String,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            window: HistoryWindow::default(),
            extract_reminders: true,
            client_name: String::new(),
            locale: "pt-BR".to_string(),
        }
    }
}

impl InterpreterOptions {
    pub fn from_config(config: &AnaConfig) -> Self {
        Self {
            window: HistoryWindow::new(config.llm.history_window),
            extract_reminders: config.llm.extract_reminders,
            client_name: config.assistant.client_name.clone(),
            locale: config.llm.locale.clone(),
        }
    }
}

/// Turns a user message plus prior turns into an [`InterpreterResult`].
#[derive(Clone)]
pub struct MessageInterpreter {
    backend: Arc<dyn GenerativeBackend>,
    credentials: CredentialSource,
    options: InterpreterOptions,
}

impl MessageInterpreter {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        credentials: CredentialSource,
        options: InterpreterOptions,
    ) -> Self {
        Self {
            backend,
            credentials,
            options,
        }
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// Build the request for `message` without sending it.
    pub fn build_request(
        &self,
        message: &str,
        history: &[ConversationTurn],
        persona: &PersonaConfig,
        today: NaiveDate,
    ) -> GenerationRequest {
        let window = self.options.window.select(history);
        let mut contents = Vec::with_capacity(window.len() + 1);
        contents.extend_from_slice(window);
        contents.push(ConversationTurn::user(message));

        GenerationRequest {
            system_instruction: build_system_instruction(
                persona,
                &self.options.client_name,
                today,
                &self.options.locale,
                self.options.extract_reminders,
            ),
            contents,
            response_schema: response_schema(self.options.extract_reminders),
        }
    }

    /// Interpret `message` in the context of `history`.
    ///
    /// Fails only with [`InterpreterError::EmptyMessage`] or a configuration
    /// error ([`InterpreterError::is_configuration`]). `history` is not modified.
    pub async fn interpret(
        &self,
        message: &str,
        history: &[ConversationTurn],
        persona: &PersonaConfig,
    ) -> Result<InterpreterResult, InterpreterError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(InterpreterError::EmptyMessage);
        }

        let api_key = self.credentials.resolve()?;
        let today = Local::now().date_naive();
        let request = self.build_request(message, history, persona, today);

        let text = match self.backend.generate(&request, &api_key).await {
            Ok(text) => text,
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Generation failed, using fallback reply");
                return Ok(Self::fallback());
            }
        };

        match parse_payload(&text, today, self.options.extract_reminders) {
            Ok(result) => {
                info!(
                    backend = self.backend.name(),
                    turns = request.contents.len(),
                    transaction = result.transaction.is_some(),
                    reminder = result.reminder.is_some(),
                    "Message interpreted"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Unusable response, using fallback reply");
                Ok(Self::fallback())
            }
        }
    }

    /// The result returned when the backend fails transiently.
    pub fn fallback() -> InterpreterResult {
        InterpreterResult::reply_only(FALLBACK_REPLY)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ana_core::types::{Role, TransactionKind};

    /// Backend replaying scripted outcomes and recording what it was sent.
    pub(crate) struct ScriptedBackend {
        outcomes: Mutex<VecDeque<Result<String, InterpreterError>>>,
        pub(crate) requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(outcomes: Vec<Result<String, InterpreterError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub(crate) fn sent(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
            _api_key: &str,
        ) -> Result<String, InterpreterError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(InterpreterError::Transport("script exhausted".into())))
        }
    }

    fn interpreter(backend: Arc<ScriptedBackend>) -> MessageInterpreter {
        MessageInterpreter::new(
            backend,
            CredentialSource::fixed("test-key"),
            InterpreterOptions::default(),
        )
    }

    fn history(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("h{}", i))
                } else {
                    ConversationTurn::assistant(format!("h{}", i))
                }
            })
            .collect()
    }

    const EXAMPLE: &str = r#"{"reply":"Anotado! ✅","extractedTransaction":{"description":"pão","amount":20,"type":"expense","category":"Alimentação"}}"#;

    #[tokio::test]
    async fn test_reference_example() {
        let backend = Arc::new(ScriptedBackend::replying(EXAMPLE));
        let result = interpreter(backend.clone())
            .interpret("gastei 20 no pão", &[], &PersonaConfig::default())
            .await
            .unwrap();

        assert_eq!(result.reply, "Anotado! ✅");
        let tx = result.transaction.unwrap();
        assert_eq!(tx.amount, 20.0);
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.description, "pão");
        assert_eq!(tx.category, "Alimentação");

        let sent = backend.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].contents, vec![ConversationTurn::user("gastei 20 no pão")]);
    }

    #[tokio::test]
    async fn test_fallback_on_every_transient_outcome() {
        let outcomes = vec![
            Ok(String::new()),
            Ok("{not json".to_string()),
            Err(InterpreterError::Transport("connection refused".to_string())),
            Err(InterpreterError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Ok(r#"{"answer":"no reply field"}"#.to_string()),
            Err(InterpreterError::EmptyResponse),
        ];
        let count = outcomes.len();
        let backend = Arc::new(ScriptedBackend::new(outcomes));
        let interp = interpreter(backend);

        for _ in 0..count {
            let result = interp
                .interpret("gastei 20 no pão", &[], &PersonaConfig::default())
                .await
                .unwrap();
            assert_eq!(result.reply, FALLBACK_REPLY);
            assert!(!result.has_extractions());
        }
    }

    #[tokio::test]
    async fn test_history_truncated_to_window() {
        let backend = Arc::new(ScriptedBackend::replying(r#"{"reply":"ok"}"#));
        let hist = history(10);
        interpreter(backend.clone())
            .interpret("novo", &hist, &PersonaConfig::default())
            .await
            .unwrap();

        let sent = &backend.sent()[0].contents;
        assert_eq!(sent.len(), 7);
        assert_eq!(&sent[..6], &hist[4..]);
        assert_eq!(sent[6], ConversationTurn::user("novo"));
        assert_eq!(sent[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_unbounded_window_forwards_everything() {
        let backend = Arc::new(ScriptedBackend::replying(r#"{"reply":"ok"}"#));
        let options = InterpreterOptions {
            window: HistoryWindow::unbounded(),
            ..InterpreterOptions::default()
        };
        let interp =
            MessageInterpreter::new(backend.clone(), CredentialSource::fixed("k"), options);
        interp
            .interpret("novo", &history(10), &PersonaConfig::default())
            .await
            .unwrap();
        assert_eq!(backend.sent()[0].contents.len(), 11);
    }

    #[tokio::test]
    async fn test_missing_credential_is_distinct() {
        let backend = Arc::new(ScriptedBackend::replying(EXAMPLE));
        let interp = MessageInterpreter::new(
            backend.clone(),
            CredentialSource::new(None, "API_KEY").with_lookup(|_| None),
            InterpreterOptions::default(),
        );

        let err = interp
            .interpret("gastei 20 no pão", &[], &PersonaConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InterpreterError::CredentialMissing { .. }));
        assert!(backend.sent().is_empty(), "no call without a credential");
    }

    #[tokio::test]
    async fn test_rejected_credential_propagates() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(
            InterpreterError::CredentialRejected("HTTP 403".to_string()),
        )]));
        let err = interpreter(backend)
            .interpret("oi", &[], &PersonaConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let backend = Arc::new(ScriptedBackend::replying(EXAMPLE));
        let err = interpreter(backend.clone())
            .interpret("   ", &[], &PersonaConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InterpreterError::EmptyMessage));
        assert!(backend.sent().is_empty());
    }

    #[tokio::test]
    async fn test_history_not_mutated() {
        let backend = Arc::new(ScriptedBackend::replying(r#"{"reply":"ok"}"#));
        let hist = history(8);
        let before = hist.clone();
        interpreter(backend)
            .interpret("oi", &hist, &PersonaConfig::default())
            .await
            .unwrap();
        assert_eq!(hist, before);
    }

    #[tokio::test]
    async fn test_reduced_feature_configuration_drops_reminder() {
        let backend = Arc::new(ScriptedBackend::replying(
            r#"{"reply":"ok","extractedReminder":{"title":"aluguel","dueDate":"2026-11-05"}}"#,
        ));
        let options = InterpreterOptions {
            extract_reminders: false,
            ..InterpreterOptions::default()
        };
        let interp = MessageInterpreter::new(backend.clone(), CredentialSource::fixed("k"), options);
        let result = interp
            .interpret("me lembra do aluguel", &[], &PersonaConfig::default())
            .await
            .unwrap();
        assert!(result.reminder.is_none());
        let sent = &backend.sent()[0];
        assert!(sent.response_schema["properties"]
            .get("extractedReminder")
            .is_none());
        assert!(!sent.system_instruction.contains("extractedReminder"));
    }

    #[test]
    fn test_build_request_includes_persona() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let persona = PersonaConfig {
            name: "Bia".to_string(),
            ..PersonaConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let request = interpreter(backend).build_request("oi", &[], &persona, today);
        assert!(request.system_instruction.contains("\"Bia\""));
        assert!(request.system_instruction.contains("16/10/2026"));
        assert_eq!(request.response_schema["required"][0], "reply");
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AnaConfig::default();
        config.llm.history_window = None;
        config.llm.extract_reminders = false;
        config.assistant.client_name = "Francimário".to_string();
        let options = InterpreterOptions::from_config(&config);
        assert_eq!(options.window, HistoryWindow::unbounded());
        assert!(!options.extract_reminders);
        assert_eq!(options.client_name, "Francimário");
    }
}
