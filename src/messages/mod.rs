//! Message resolution.
//!
//! Callers hand over either plain message content or a template. Plain
//! content passes through untouched; templates are formatted against the
//! call's parameters and returned alongside the original template so the
//! report can say which template produced the messages.

use serde_json::Value;
use thiserror::Error;

use crate::template::{format_template, ParameterMap, TemplateError, TemplateSpec};

/// Resolution error type
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Template requires params, but none were provided")]
    MissingParameters,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Message content supplied by a caller
#[derive(Debug, Clone)]
pub enum MessagePayload {
    /// Ordinary data, used as-is
    Plain(Value),
    /// Content that must be formatted before use
    Template(TemplateSpec),
}

impl From<TemplateSpec> for MessagePayload {
    fn from(template: TemplateSpec) -> Self {
        MessagePayload::Template(template)
    }
}

impl From<Value> for MessagePayload {
    fn from(value: Value) -> Self {
        MessagePayload::Plain(value)
    }
}

/// Resolved content plus the template it came from
#[derive(Debug, Clone)]
pub struct ResolvedMessages {
    pub messages: Value,
    /// `None` when the payload was not a template
    pub template: Option<TemplateSpec>,
}

/// Resolve a message payload.
///
/// Plain payloads are returned unchanged and `params` is never consulted.
/// Templates require `params`.
pub fn resolve_messages(
    payload: MessagePayload,
    params: Option<&ParameterMap>,
) -> Result<ResolvedMessages, ResolveError> {
    match payload {
        MessagePayload::Plain(messages) => Ok(ResolvedMessages {
            messages,
            template: None,
        }),
        MessagePayload::Template(template) => {
            let params = params.ok_or(ResolveError::MissingParameters)?;
            let messages = format_template(&template, params)?;
            Ok(ResolvedMessages {
                messages,
                template: Some(template),
            })
        }
    }
}
