use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::types::{CallOptions, EventRecord, EventSource};
use crate::messages::ResolvedMessages;
use crate::template::{TemplateSource, TemplateSpec};

/// Builder for creating event records
#[derive(Debug, Clone)]
pub struct EventBuilder {
    record: EventRecord,
}

impl EventBuilder {
    /// Start an event from the call's reporting options
    pub fn new(options: &CallOptions) -> Self {
        let record = EventRecord {
            api_key: options.api_key.clone(),
            prompt_template_name: options.prompt_template_name.clone(),
            chat_id: options.chat_id.clone(),
            chain_id: options.effective_chain_id().map(str::to_string),
            feedback_key: options.feedback_key.clone(),
            context: options.context.clone(),
            params: options.template_params.clone().unwrap_or_default(),
            ..EventRecord::default()
        };
        Self { record }
    }

    /// Attach the template that produced the resolved messages
    pub fn resolved(mut self, resolved: &ResolvedMessages) -> Self {
        if let Some(template) = &resolved.template {
            self = self.template(template);
        }
        self
    }

    /// Record the original template
    pub fn template(mut self, template: &TemplateSpec) -> Self {
        match template.source() {
            TemplateSource::Text(text) => {
                self.record.prompt_template_text = Some((*text).to_string());
            }
            TemplateSource::Structured(Value::Array(entries)) => {
                self.record.prompt_template_chat = Some(entries.clone());
            }
            TemplateSource::Structured(Value::String(text)) => {
                self.record.prompt_template_text = Some(text.clone());
            }
            TemplateSource::Structured(document) => {
                self.record.prompt_template_text = Some(document.to_string());
            }
        }
        self
    }

    /// Set the API name (e.g. "chat.completions")
    pub fn api_name(mut self, api_name: impl Into<String>) -> Self {
        self.record.api_name = Some(api_name.into());
        self
    }

    /// Set the SDK that produced the event
    pub fn source(mut self, source: EventSource) -> Self {
        self.record.source = Some(source);
        self
    }

    /// Set the model parameters from a serializable value
    pub fn model_parameters<T: Serialize>(mut self, params: &T) -> Result<Self, serde_json::Error> {
        self.record.model_parameters = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    /// Set the tool definitions offered to the model
    pub fn tools(mut self, tools: Vec<Value>) -> Self {
        self.record.tools = Some(tools);
        self
    }

    /// Fill in the outcome of a completed call
    pub fn response(mut self, response: Option<String>, raw: Value, elapsed: Duration) -> Self {
        self.record.response = response;
        self.record.raw_response = Some(raw);
        self.record.response_time = Some(elapsed.as_millis() as u64);
        self
    }

    /// Record an error from the call
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.record.push_error(error);
        self
    }

    /// Build the event record
    pub fn build(self) -> EventRecord {
        self.record
    }
}
