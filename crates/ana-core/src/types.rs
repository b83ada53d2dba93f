use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user.
    User,
    /// The assistant persona.
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse the stored string form. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Direction of a money movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

/// Lifecycle of a reminder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Completed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ReminderStatus::Pending),
            "completed" => Some(ReminderStatus::Completed),
            _ => None,
        }
    }
}

/// Register the assistant persona speaks in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Professional,
    #[default]
    Friendly,
    Strict,
}

impl Tone {
    /// The word used for this tone in the outgoing instruction text.
    pub fn describe(&self) -> &'static str {
        match self {
            Tone::Professional => "profissional",
            Tone::Friendly => "amigável",
            Tone::Strict => "rígido",
        }
    }
}

// =============================================================================
// Interpreter input / output
// =============================================================================

/// One message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Descriptive parameters that shape only the outgoing instruction text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name of the assistant ("Ana").
    pub name: String,
    pub tone: Tone,
    /// Contact identifier (e.g. a WhatsApp number). Not used by any logic.
    #[serde(default)]
    pub contact: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Ana".to_string(),
            tone: Tone::Friendly,
            contact: String::new(),
        }
    }
}

/// A money movement derived from a user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTransaction {
    pub description: String,
    /// Always strictly positive; direction is carried by `kind`.
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    pub occurred_at: NaiveDate,
}

/// A bill or task reminder derived from a user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReminder {
    pub title: String,
    /// Due date as the model phrased it (usually ISO `YYYY-MM-DD`).
    pub due_date: String,
    pub status: ReminderStatus,
    pub amount: Option<f64>,
}

/// Result of interpreting one user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterpreterResult {
    /// Natural-language reply. Never empty.
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ExtractedTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ExtractedReminder>,
}

impl InterpreterResult {
    /// A reply with no extractions.
    pub fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            transaction: None,
            reminder: None,
        }
    }

    pub fn has_extractions(&self) -> bool {
        self.transaction.is_some() || self.reminder.is_some()
    }
}

// =============================================================================
// Persisted entities
// =============================================================================

/// A chat session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: u64,
}

/// A stored chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session_id: Uuid, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// The role/content pair fed back to the interpreter as history.
    pub fn to_turn(&self) -> ConversationTurn {
        ConversationTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A recorded transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub session_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_extracted(session_id: Uuid, extracted: &ExtractedTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            description: extracted.description.clone(),
            amount: extracted.amount,
            kind: extracted.kind,
            category: extracted.category.clone(),
            date: extracted.occurred_at,
            created_at: Utc::now(),
        }
    }
}

/// A recorded reminder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub session_id: Uuid,
    pub title: String,
    pub due_date: String,
    pub status: ReminderStatus,
    pub amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn from_extracted(session_id: Uuid, extracted: &ExtractedReminder) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            title: extracted.title.clone(),
            due_date: extracted.due_date.clone(),
            status: extracted.status,
            amount: extracted.amount,
            created_at: Utc::now(),
        }
    }
}

/// Totals over a session's recorded transactions and reminders.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub transaction_count: usize,
    pub pending_reminders: usize,
}

impl LedgerSummary {
    pub fn compute(transactions: &[Transaction], reminders: &[Reminder]) -> Self {
        let (income, expense) =
            transactions
                .iter()
                .fold((0.0, 0.0), |(inc, exp), tx| match tx.kind {
                    TransactionKind::Income => (inc + tx.amount, exp),
                    TransactionKind::Expense => (inc, exp + tx.amount),
                });

        Self {
            total_income: income,
            total_expense: expense,
            balance: income - expense,
            transaction_count: transactions.len(),
            pending_reminders: reminders
                .iter()
                .filter(|r| r.status == ReminderStatus::Pending)
                .count(),
        }
    }
}
