//! Neutralizing markup in text values

use crate::batch::{Batch, Value};
use crate::error::Result;
use regex::{Captures, Regex};

/// Rewrites a scalar before it is loaded. Non-text values are expected to
/// pass through unchanged.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, value: Value) -> Value;
}

/// Escapes `<`, `>` and bare `&` as HTML entities.
///
/// Ampersands that already start an entity (`&amp;`, `&#39;`, `&#x27;`) are
/// left alone, so sanitizing twice gives the same text as sanitizing once.
#[derive(Debug, Clone)]
pub struct MarkupSanitizer {
    ampersand: Regex,
}

impl MarkupSanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ampersand: Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[A-Za-z][A-Za-z0-9]*;)?")?,
        })
    }

    fn escape(&self, text: &str) -> String {
        let escaped = self.ampersand.replace_all(text, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                String::from("&amp;")
            }
        });
        escaped.replace('<', "&lt;").replace('>', "&gt;")
    }
}

impl Sanitizer for MarkupSanitizer {
    fn sanitize(&self, value: Value) -> Value {
        match value {
            Value::Text(text) if text.contains(['<', '>', '&']) => Value::Text(self.escape(&text)),
            other => other,
        }
    }
}

/// Leaves every value untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSanitizer;

impl Sanitizer for PassthroughSanitizer {
    fn sanitize(&self, value: Value) -> Value {
        value
    }
}

/// Apply `sanitizer` to every value of `batch`
pub fn sanitize_batch(batch: Batch, sanitizer: &dyn Sanitizer) -> Result<Batch> {
    batch.map_values(|value| sanitizer.sanitize(value))
}
