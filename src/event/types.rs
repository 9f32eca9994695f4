use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::ParameterMap;

/// SDK that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    Openai,
    Anthropic,
    VercelAi,
}

/// Per-call reporting options supplied alongside a model call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOptions {
    /// Reporting is disabled when absent
    pub api_key: Option<String>,
    pub prompt_template_name: Option<String>,
    /// Parameters used to resolve the template
    pub template_params: Option<ParameterMap>,
    pub chat_id: Option<String>,
    /// Groups related events; must be a UUID
    pub chain_id: Option<String>,
    pub feedback_key: Option<String>,
    pub context: Option<ParameterMap>,
    /// Deprecated name for `chain_id`
    pub parent_event_id: Option<String>,
}

impl CallOptions {
    /// Chain id, falling back to the deprecated parent event id
    pub fn effective_chain_id(&self) -> Option<&str> {
        self.chain_id
            .as_deref()
            .or(self.parent_event_id.as_deref())
    }
}

/// Event reported to the collector after a model call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Text template that produced the prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_text_id: Option<String>,

    /// Chat template that produced the prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_chat: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ParameterMap>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,

    /// Template parameters
    #[serde(default)]
    pub params: ParameterMap,

    /// Text of the model response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Raw provider response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,

    /// Response time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,

    /// Errors from the model call or from validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_errors: Option<Vec<String>>,

    /// Deprecated; always an empty object
    #[serde(default)]
    pub prompt: serde_json::Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_metrics: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
}

impl EventRecord {
    /// Record an error against this event
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.response_errors
            .get_or_insert_with(Vec::new)
            .push(error.into());
    }
}
