use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use promptline::config::Settings;
use promptline::dispatch::EventDispatcher;
use promptline::error::AppError;
use promptline::event::{CallOptions, EventBuilder};
use promptline::messages::{resolve_messages, MessagePayload};
use promptline::telemetry::init_tracing;
use promptline::template::TemplateSpec;

/// Request file consumed by the binary
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    /// Template document (string or structured)
    template: Option<Value>,
    /// Plain messages, used as-is
    messages: Option<Value>,
    #[serde(default)]
    options: CallOptions,
    /// Model response text to attach to the event
    response: Option<String>,
}

impl ReportRequest {
    fn payload(&mut self) -> Result<MessagePayload, AppError> {
        match (self.template.take(), self.messages.take()) {
            (Some(template), None) => Ok(TemplateSpec::structured(template).into()),
            (None, Some(messages)) => Ok(MessagePayload::Plain(messages)),
            _ => Err(AppError::Validation(
                "request needs exactly one of 'template' or 'messages'".to_string(),
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;
    tracing::info!("Configuration loaded");

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: promptline <request.json>")?;

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mut request: ReportRequest = serde_json::from_str(&raw)?;

    let started = Instant::now();
    let resolved = resolve_messages(request.payload()?, request.options.template_params.as_ref())?;
    tracing::info!(
        templated = resolved.template.is_some(),
        "Messages resolved"
    );

    let mut builder = EventBuilder::new(&request.options)
        .resolved(&resolved)
        .api_name("promptline.cli");
    if let Some(text) = request.response.take() {
        builder = builder.response(Some(text.clone()), Value::String(text), started.elapsed());
    }
    let event = builder.build();

    let dispatcher = EventDispatcher::from_settings(&settings)?;
    let reply = dispatcher.dispatch(&event).await;

    let output = json!({
        "messages": resolved.messages,
        "reply": reply,
        "stats": dispatcher.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
