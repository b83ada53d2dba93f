//! Structured response contract.
//!
//! [`response_schema`] is sent to the provider so it answers with JSON of a
//! fixed shape; [`parse_payload`] validates what comes back and turns it into
//! an [`InterpreterResult`].

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use ana_core::types::{
    ExtractedReminder, ExtractedTransaction, InterpreterResult, ReminderStatus, TransactionKind,
};

use crate::error::InterpreterError;

/// Category used when the model leaves it blank.
pub const DEFAULT_CATEGORY: &str = "Outros";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("Invalid code fence regex")
});

/// Response schema in the provider's OpenAPI subset.
///
/// `reply` is required; the reminder object is only offered when
/// `extract_reminders` is set.
pub fn response_schema(extract_reminders: bool) -> Value {
    let mut properties = json!({
        "reply": { "type": "STRING" },
        "extractedTransaction": {
            "type": "OBJECT",
            "properties": {
                "description": { "type": "STRING" },
                "amount": { "type": "NUMBER" },
                "type": { "type": "STRING", "enum": ["income", "expense"] },
                "category": { "type": "STRING" },
                "date": { "type": "STRING", "description": "YYYY-MM-DD" }
            },
            "required": ["description", "amount", "type"]
        }
    });

    if extract_reminders {
        properties["extractedReminder"] = json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "dueDate": { "type": "STRING", "description": "YYYY-MM-DD" },
                "amount": { "type": "NUMBER" }
            },
            "required": ["title", "dueDate"]
        });
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": ["reply"]
    })
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Validate a provider answer and convert it into an [`InterpreterResult`].
///
/// A missing or blank `reply` rejects the whole payload. An invalid
/// extraction object is dropped on its own and the reply is kept.
/// `today` stamps transactions that carry no date of their own.
pub fn parse_payload(
    text: &str,
    today: NaiveDate,
    extract_reminders: bool,
) -> Result<InterpreterResult, InterpreterError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(InterpreterError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| InterpreterError::MalformedResponse(e.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        InterpreterError::SchemaViolation("top-level value is not an object".to_string())
    })?;

    let reply = obj
        .get("reply")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| InterpreterError::SchemaViolation("missing or empty reply".to_string()))?;

    let transaction = match obj.get("extractedTransaction") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let parsed = parse_transaction(raw, today);
            if parsed.is_none() {
                debug!(raw = %raw, "Dropping invalid extractedTransaction");
            }
            parsed
        }
    };

    let reminder = match obj.get("extractedReminder") {
        Some(raw) if extract_reminders && !raw.is_null() => {
            let parsed = parse_reminder(raw);
            if parsed.is_none() {
                debug!(raw = %raw, "Dropping invalid extractedReminder");
            }
            parsed
        }
        _ => None,
    };

    Ok(InterpreterResult {
        reply: reply.to_string(),
        transaction,
        reminder,
    })
}

fn non_blank_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A strictly positive, finite amount. Numeric strings ("20", "20,50") are accepted.
fn positive_amount(value: Option<&Value>) -> Option<f64> {
    let amount = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

fn parse_transaction(raw: &Value, today: NaiveDate) -> Option<ExtractedTransaction> {
    let obj = raw.as_object()?;
    let description = non_blank_str(obj, "description")?;
    let amount = positive_amount(obj.get("amount"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(TransactionKind::parse)?;
    let category = non_blank_str(obj, "category").unwrap_or(DEFAULT_CATEGORY);
    let occurred_at = non_blank_str(obj, "date")
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or(today);

    Some(ExtractedTransaction {
        description: description.to_string(),
        amount,
        kind,
        category: category.to_string(),
        occurred_at,
    })
}

fn parse_reminder(raw: &Value) -> Option<ExtractedReminder> {
    let obj = raw.as_object()?;
    let title = non_blank_str(obj, "title")?;
    let due_date = non_blank_str(obj, "dueDate")?;
    let status = non_blank_str(obj, "status")
        .and_then(ReminderStatus::parse)
        .unwrap_or_default();

    Some(ExtractedReminder {
        title: title.to_string(),
        due_date: due_date.to_string(),
        status,
        amount: positive_amount(obj.get("amount")),
    })
}
