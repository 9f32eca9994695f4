//! Prompt template system.
//!
//! This module provides:
//! - Template definition over static text or JSON-like documents ({variable} placeholders)
//! - Escaping with `\{variable\}`, rendered literally
//! - Variable extraction and substitution, including chat-history splicing
//!
//! # Example
//!
//! ```ignore
//! let template = TemplateSpec::chat(vec![
//!     ChatMessage::new("system", "You are a travel guide."),
//!     ChatMessage::history("{history}"),
//!     ChatMessage::new("user", "Where can I eat {food}?"),
//! ]);
//!
//! assert_eq!(extract_variables(&template), vec!["history", "food"]);
//!
//! let params = json!({ "history": [], "food": "pizza" });
//! let messages = format_template(&template, params.as_object().unwrap())?;
//! ```

mod resolver;
mod scanner;
mod types;

pub use resolver::{extract_variables, format_template};
pub use types::{
    ChatMessage, ParameterMap, TemplateError, TemplateResult, TemplateSource, TemplateSpec,
    CHAT_HISTORY_ROLE,
};
