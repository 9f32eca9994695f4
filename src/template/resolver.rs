//! Variable extraction and substitution engine for templates

use std::collections::HashSet;

use serde_json::Value;

use super::scanner::{scan, variable_names, Segment};
use super::types::{
    ParameterMap, TemplateError, TemplateResult, TemplateSource, TemplateSpec, CHAT_HISTORY_ROLE,
};

/// Names of the variables a template references.
///
/// Depth-first, left to right: object values in key order, array elements in
/// index order. Each name appears once, at its first occurrence. Escaped
/// references and non-string leaves contribute nothing.
pub fn extract_variables(spec: &TemplateSpec) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();

    match spec.source() {
        TemplateSource::Text(text) => collect_text(text, &mut names, &mut seen),
        TemplateSource::Structured(document) => collect_value(document, &mut names, &mut seen),
    }

    names.into_iter().map(str::to_string).collect()
}

fn collect_value<'a>(value: &'a Value, names: &mut Vec<&'a str>, seen: &mut HashSet<&'a str>) {
    match value {
        Value::String(s) => collect_text(s, names, seen),
        Value::Array(items) => {
            for item in items {
                collect_value(item, names, seen);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_value(item, names, seen);
            }
        }
        // Numbers, booleans, null carry no placeholders
        _ => {}
    }
}

fn collect_text<'a>(text: &'a str, names: &mut Vec<&'a str>, seen: &mut HashSet<&'a str>) {
    for name in variable_names(text) {
        if seen.insert(name) {
            names.push(name);
        }
    }
}

/// Substitute every placeholder in `spec` from `params`.
///
/// The output has the template's shape: a string for a text template, the
/// same document structure for a structured one. In a chat template (an
/// array of `{role, content}` entries) a `chat_history` entry is replaced by
/// the messages of every history variable its content references.
pub fn format_template(spec: &TemplateSpec, params: &ParameterMap) -> TemplateResult<Value> {
    match spec.source() {
        TemplateSource::Text(text) => Ok(Value::String(format_text(text, params)?)),
        TemplateSource::Structured(Value::Array(entries)) => format_chat(entries, params),
        TemplateSource::Structured(document) => format_value(document, params),
    }
}

fn format_chat(entries: &[Value], params: &ParameterMap) -> TemplateResult<Value> {
    let mut rendered = Vec::with_capacity(entries.len());

    for entry in entries {
        match history_content(entry) {
            Some(content) => splice_history(content, params, &mut rendered)?,
            None => rendered.push(format_value(entry, params)?),
        }
    }

    Ok(Value::Array(rendered))
}

/// Content of a `chat_history` entry, if `entry` is one
fn history_content(entry: &Value) -> Option<&str> {
    let map = entry.as_object()?;
    if map.get("role").and_then(Value::as_str) != Some(CHAT_HISTORY_ROLE) {
        return None;
    }
    map.get("content").and_then(Value::as_str)
}

fn splice_history(content: &str, params: &ParameterMap, out: &mut Vec<Value>) -> TemplateResult<()> {
    let mut names = Vec::new();
    collect_text(content, &mut names, &mut HashSet::new());

    // Only the referenced message lists survive; surrounding text is dropped
    for name in names {
        match params.get(name) {
            Some(Value::Array(messages)) => out.extend(messages.iter().cloned()),
            Some(_) => {
                return Err(TemplateError::InvalidChatHistory {
                    name: name.to_string(),
                })
            }
            None => {
                return Err(TemplateError::MissingVariable {
                    name: name.to_string(),
                    template: content.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn format_value(value: &Value, params: &ParameterMap) -> TemplateResult<Value> {
    match value {
        Value::String(s) => Ok(Value::String(format_text(s, params)?)),
        Value::Array(items) => {
            let rendered: Result<Vec<_>, _> = items.iter().map(|v| format_value(v, params)).collect();
            Ok(Value::Array(rendered?))
        }
        Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                rendered.insert(key.clone(), format_value(item, params)?);
            }
            Ok(Value::Object(rendered))
        }
        _ => Ok(value.clone()),
    }
}

fn format_text(text: &str, params: &ParameterMap) -> TemplateResult<String> {
    let mut result = String::with_capacity(text.len());

    for segment in scan(text) {
        match segment {
            Segment::Literal(s) => result.push_str(s),
            Segment::Escaped(name) => {
                result.push('{');
                result.push_str(name);
                result.push('}');
            }
            Segment::Variable(name) => {
                let value = params.get(name).ok_or_else(|| TemplateError::MissingVariable {
                    name: name.to_string(),
                    template: text.to_string(),
                })?;
                push_scalar(&mut result, value);
            }
        }
    }

    Ok(result)
}

fn push_scalar(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        // Numbers, booleans, null, arrays and objects use their JSON text
        other => out.push_str(&other.to_string()),
    }
}
