//! Template types and error definitions

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Role marking a chat entry that splices earlier conversation turns
pub const CHAT_HISTORY_ROLE: &str = "chat_history";

/// Parameters supplied when resolving a template
pub type ParameterMap = serde_json::Map<String, serde_json::Value>;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template has missing variable '{name}' (template: {template})")]
    MissingVariable { name: String, template: String },

    #[error("Chat history variable '{name}' must resolve to a list of messages")]
    InvalidChatHistory { name: String },
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Body of a template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    /// Single string with `{name}` placeholders
    Text(&'static str),
    /// Nested strings, objects and arrays; any string leaf may hold placeholders
    Structured(serde_json::Value),
}

/// Immutable marker wrapping a string or a document as a template.
///
/// The wrapped source is never modified by resolution, so the original
/// template stays available for reporting after it has been formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSpec {
    source: TemplateSource,
}

impl TemplateSpec {
    /// Template over static text.
    ///
    /// Only `'static` text is accepted so the placeholder set is always
    /// recoverable from the program text. Use [`text_template!`] for literals.
    ///
    /// [`text_template!`]: crate::text_template
    pub fn text(text: &'static str) -> Self {
        Self {
            source: TemplateSource::Text(text),
        }
    }

    /// Template over a JSON-like document
    pub fn structured(document: serde_json::Value) -> Self {
        Self {
            source: TemplateSource::Structured(document),
        }
    }

    /// Chat template from an ordered list of `{role, content}` entries
    pub fn chat(messages: Vec<ChatMessage>) -> Self {
        let entries = messages
            .into_iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect();
        Self::structured(serde_json::Value::Array(entries))
    }

    /// The original template body
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn is_text(&self) -> bool {
        matches!(self.source, TemplateSource::Text(_))
    }

    /// True when the template is an ordered list of chat entries
    pub fn is_chat(&self) -> bool {
        matches!(self.source, TemplateSource::Structured(serde_json::Value::Array(_)))
    }

    /// Original template as a JSON value
    pub fn to_value(&self) -> serde_json::Value {
        match &self.source {
            TemplateSource::Text(text) => serde_json::Value::String((*text).to_string()),
            TemplateSource::Structured(document) => document.clone(),
        }
    }
}

impl Serialize for TemplateSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.source {
            TemplateSource::Text(text) => serializer.serialize_str(text),
            TemplateSource::Structured(document) => document.serialize(serializer),
        }
    }
}

/// Build a text template from a string literal.
///
/// Anything other than a literal (for example a `format!` call) is rejected
/// at compile time.
///
/// ```ignore
/// let greeting = text_template!("Hello {name}");
/// ```
#[macro_export]
macro_rules! text_template {
    ($text:literal) => {
        $crate::template::TemplateSpec::text($text)
    };
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Entry that splices the history variables referenced in `content`
    pub fn history(content: impl Into<String>) -> Self {
        Self::new(CHAT_HISTORY_ROLE, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_template_keeps_source() {
        let template = crate::text_template!("Hello {name}");
        assert!(template.is_text());
        assert_eq!(template.source(), &TemplateSource::Text("Hello {name}"));
    }

    #[test]
    fn test_chat_template_shape() {
        let template = TemplateSpec::chat(vec![
            ChatMessage::new("system", "Be brief"),
            ChatMessage::history("{history}"),
        ]);

        assert!(template.is_chat());
        assert_eq!(
            template.to_value(),
            json!([
                {"role": "system", "content": "Be brief"},
                {"role": "chat_history", "content": "{history}"}
            ])
        );
    }

    #[test]
    fn test_serializes_as_source() {
        let text = serde_json::to_value(TemplateSpec::text("Hi {a}")).unwrap();
        assert_eq!(text, json!("Hi {a}"));

        let doc = serde_json::to_value(TemplateSpec::structured(json!({"q": "{a}"}))).unwrap();
        assert_eq!(doc, json!({"q": "{a}"}));
    }
}
