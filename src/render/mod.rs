//! Template rendering: the [`TemplateEngine`] seam the report driver renders
//! through, the built-in substitution engine, and the output encoding
//! filters applied to substituted values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

use crate::generate::context::Context;

/// Output character-set handling, applied to every substituted value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Replace non-ASCII characters with HTML entity references.
    #[default]
    HtmlEntities,
    /// Strip non-ASCII characters entirely (NOAA-style text reports).
    StrictAscii,
    /// Pass text through unchanged.
    Utf8,
}

impl Encoding {
    /// Marker string placed in the rendering context under `encoding`.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::HtmlEntities => "html_entities",
            Encoding::StrictAscii => "strict_ascii",
            Encoding::Utf8 => "utf8",
        }
    }

    pub fn filter(self, text: &str) -> String {
        match self {
            Encoding::HtmlEntities => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    if c.is_ascii() {
                        out.push(c);
                    } else {
                        let _ = write!(out, "&#{};", c as u32);
                    }
                }
                out
            }
            Encoding::StrictAscii => text.chars().filter(|c| c.is_ascii()).collect(),
            Encoding::Utf8 => text.to_string(),
        }
    }
}

/// The rendering engine consumed by the report driver.
///
/// Given a template file and a context, produces the rendered text.
/// Failures are `Template` errors; the driver logs them and continues with
/// the next period.
pub trait TemplateEngine {
    fn render(&self, template: &Path, context: &Context, encoding: Encoding)
        -> crate::Result<String>;
}

/// Built-in engine: substitutes `$name` and `$a.b.c` references against the
/// context. `$$` renders a literal dollar sign. An unresolved reference is
/// a `Template` error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstitutionEngine;

impl TemplateEngine for SubstitutionEngine {
    fn render(
        &self,
        template: &Path,
        context: &Context,
        encoding: Encoding,
    ) -> crate::Result<String> {
        let source = std::fs::read_to_string(template).map_err(|e| {
            crate::StratusError::Template(format!(
                "cannot read template {}: {}",
                template.display(),
                e
            ))
        })?;
        substitute(&source, context, encoding).map_err(|reference| {
            crate::StratusError::Template(format!(
                "unresolved reference '${}' in {}",
                reference,
                template.display()
            ))
        })
    }
}

/// Substitute all references in `source`. Returns the unresolved reference
/// path on failure.
fn substitute(source: &str, context: &Context, encoding: Encoding) -> Result<String, String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        if let Some(stripped) = rest.strip_prefix('$') {
            out.push('$');
            rest = stripped;
            continue;
        }
        let len = reference_len(rest);
        if len == 0 {
            out.push('$');
            continue;
        }
        let reference = &rest[..len];
        rest = &rest[len..];
        match resolve(context, reference) {
            Some(value) => out.push_str(&encoding.filter(&render_value(value))),
            None => return Err(reference.to_string()),
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Length of the dotted reference at the head of `s`, zero if none.
/// Trailing dots are sentence punctuation, not path separators.
fn reference_len(s: &str) -> usize {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return 0;
    }
    let mut len = 0;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            len += c.len_utf8();
        } else {
            break;
        }
    }
    while s[..len].ends_with('.') {
        len -= 1;
    }
    len
}

/// Navigate a dotted path through the context.
fn resolve<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
