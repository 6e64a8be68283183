//! Placeholder templates for notification bodies.
//!
//! A template is plain text with `{field}` placeholders. `{{` and `}}` stand for
//! literal braces. Placeholders are rewritten into tera expressions and rendered
//! in one go, against an explicit set of fields: a name outside that set is an
//! error rather than an empty string.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tera::{Context, Tera};
use thiserror::Error;

use crate::db::entities::watchdog_entry::TemplateMap;

static TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}|[{}]").ok()
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template references undefined field '{0}'")]
    FieldMissing(String),
    #[error("Malformed template at byte {position}: {message}")]
    Malformed { position: usize, message: String },
    #[error("Failed to render template: {0}")]
    Render(String),
}

/// A template string, translated to tera syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tera_source: String,
    fields: Vec<String>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let token = TOKEN
            .as_ref()
            .ok_or_else(|| malformed(0, "placeholder pattern is unavailable"))?;

        let mut tera_source = String::with_capacity(source.len() + 8);
        let mut fields = Vec::new();
        let mut last = 0;
        for caps in token.captures_iter(source) {
            let Some(found) = caps.get(0) else { continue };
            tera_source.push_str(&source[last..found.start()]);
            last = found.end();

            match (found.as_str(), caps.get(1)) {
                (_, Some(name)) => {
                    tera_source.push_str("{{ ");
                    tera_source.push_str(name.as_str());
                    tera_source.push_str(" }}");
                    fields.push(name.as_str().to_string());
                }
                ("{{", None) => tera_source.push_str(r#"{{ "{" }}"#),
                ("}}", None) => tera_source.push_str(r#"{{ "}" }}"#),
                ("}", None) => {
                    return Err(malformed(found.start(), "single '}' outside a placeholder"));
                }
                (_, None) => {
                    return Err(malformed(found.start(), "unclosed or invalid placeholder"));
                }
            }
        }
        tera_source.push_str(&source[last..]);

        Tera::default()
            .add_raw_template("__dogwatch_template", &tera_source)
            .map_err(|e| malformed(0, &e.to_string()))?;

        Ok(Self {
            tera_source,
            fields,
        })
    }

    /// Names of all placeholders, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn render(&self, fields: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        if let Some(missing) = self.fields.iter().find(|name| !fields.contains_key(*name)) {
            return Err(TemplateError::FieldMissing(missing.clone()));
        }

        let mut tera_context = Context::new();
        for (key, value) in fields {
            tera_context.insert(key, value);
        }
        Tera::one_off(&self.tera_source, &tera_context, false)
            .map_err(|e| TemplateError::Render(e.to_string()))
    }
}

fn malformed(position: usize, message: &str) -> TemplateError {
    TemplateError::Malformed {
        position,
        message: message.to_string(),
    }
}

/// Renders every value of a template mapping, producing the notification body.
pub fn render_map(
    templates: &TemplateMap,
    fields: &BTreeMap<String, String>,
) -> Result<serde_json::Map<String, serde_json::Value>, TemplateError> {
    let mut body = serde_json::Map::new();
    for (key, source) in templates {
        let rendered = Template::parse(source)?.render(fields)?;
        body.insert(key.clone(), serde_json::Value::String(rendered));
    }
    Ok(body)
}

/// Checks that every value of a template mapping compiles.
pub fn validate_map(templates: &TemplateMap) -> Result<(), TemplateError> {
    for source in templates.values() {
        Template::parse(source)?;
    }
    Ok(())
}
