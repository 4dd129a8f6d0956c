//! Pre-flight validation for chat requests.
//!
//! Everything here runs before any network cost is paid. Message-shape
//! violations are collected per index and reported together rather than
//! failing on the first offense.

use super::types::{ChatMessage, ChatRequest, ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_USER};
use crate::error::ValidationError;

/// Upper bound on the completion budget
pub const MAX_TOKENS_LIMIT: u32 = 20_000;

/// Validate a chat request
pub fn validate_chat_request(request: &ChatRequest) -> Result<(), ValidationError> {
    if let Some(max_tokens) = request.max_tokens {
        if !(1..=MAX_TOKENS_LIMIT).contains(&max_tokens) {
            return Err(ValidationError::OutOfRange {
                field: "max_tokens".to_string(),
                reason: format!("must be between 1 and {}", MAX_TOKENS_LIMIT),
            });
        }
    }

    validate_unit_range("temperature", request.temperature)?;
    validate_unit_range("top_p", request.top_p)?;
    validate_unit_range("presence_penalty", request.presence_penalty)?;
    validate_unit_range("frequency_penalty", request.frequency_penalty)?;

    validate_messages(&request.messages)
}

fn validate_unit_range(field: &str, value: Option<f32>) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }
    }
    Ok(())
}

/// Validate the message array shape.
///
/// Every message needs a non-empty content string and a known role, and
/// the array must end with a user-role message.
pub fn validate_messages(messages: &[ChatMessage]) -> Result<(), ValidationError> {
    if messages.is_empty() {
        return Err(ValidationError::Required {
            field: "messages".to_string(),
        });
    }

    let mut violations = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        if message.content.is_empty() {
            violations.push(format!(
                "message[{}]: content must be a non-empty string",
                index
            ));
        }
        if !matches!(
            message.role.as_str(),
            ROLE_USER | ROLE_ASSISTANT | ROLE_SYSTEM
        ) {
            violations.push(format!(
                "message[{}]: role '{}' must be one of user/assistant/system",
                index, message.role
            ));
        }
    }

    if messages
        .last()
        .map(|m| m.role != ROLE_USER)
        .unwrap_or(false)
    {
        violations.push("messages must end with user message".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidMessages(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn valid_request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("hello")])
    }

    #[test]
    fn accepts_valid_request() {
        assert!(validate_chat_request(&valid_request()).is_ok());
    }

    #[test_case(0; "zero")]
    #[test_case(20_001; "over limit")]
    fn rejects_max_tokens_out_of_range(max_tokens: u32) {
        let request = valid_request().with_max_tokens(max_tokens);
        assert!(matches!(
            validate_chat_request(&request),
            Err(ValidationError::OutOfRange { field, .. }) if field == "max_tokens"
        ));
    }

    #[test]
    fn accepts_max_tokens_bounds() {
        assert!(validate_chat_request(&valid_request().with_max_tokens(1)).is_ok());
        assert!(validate_chat_request(&valid_request().with_max_tokens(20_000)).is_ok());
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let request = valid_request().with_temperature(1.5);
        assert!(matches!(
            validate_chat_request(&request),
            Err(ValidationError::OutOfRange { field, .. }) if field == "temperature"
        ));
    }

    #[test]
    fn rejects_empty_messages() {
        let request = ChatRequest::new(vec![]);
        assert!(matches!(
            validate_chat_request(&request),
            Err(ValidationError::Required { field }) if field == "messages"
        ));
    }

    #[test]
    fn rejects_trailing_assistant_message_with_clear_reason() {
        let request = ChatRequest::new(vec![ChatMessage::assistant("hi")]);
        match validate_chat_request(&request).unwrap_err() {
            ValidationError::InvalidMessages(violations) => {
                assert!(violations
                    .iter()
                    .any(|v| v.contains("must end with user message")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn collects_all_violations_per_index() {
        let request = ChatRequest::new(vec![
            ChatMessage::new("user", ""),
            ChatMessage::new("robot", "hi"),
            ChatMessage::user("ok"),
        ]);
        match validate_chat_request(&request).unwrap_err() {
            ValidationError::InvalidMessages(violations) => {
                assert_eq!(violations.len(), 2);
                assert!(violations[0].contains("message[0]"));
                assert!(violations[1].contains("message[1]"));
                assert!(violations[1].contains("robot"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
