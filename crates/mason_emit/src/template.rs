//! `@{name}` text templates.

use std::collections::BTreeMap;

use crate::emitter::FileEmitter;
use crate::error::TemplateError;

const OPEN: &str = "@{";
const CLOSE: char = '}';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
}

/// A parsed template.
///
/// Text between `@{` and the next `}` names a variable. An `@{` without a
/// closing brace is kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Splits `source` into literal text and variable references.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            let after = &rest[start + OPEN.len()..];
            let Some(end) = after.find(CLOSE) else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            segments.push(Segment::Variable(after[..end].to_string()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Self { segments }
    }

    /// Names of the referenced variables, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Substitutes every variable from `variables`.
    ///
    /// Fails on the first variable missing from the mapping.
    pub fn render(&self, variables: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = variables.get(name).ok_or_else(|| {
                        TemplateError::UndeclaredVariable { name: name.clone() }
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Renders into `emitter`. Nothing is appended if rendering fails.
    pub fn emit(
        &self,
        emitter: &mut FileEmitter,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), TemplateError> {
        let text = self.render(variables)?;
        emitter.append(&text);
        Ok(())
    }
}
