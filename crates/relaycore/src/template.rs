use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Resolves `{{path.to.value}}` tokens against a context map.
///
/// A token whose path cannot be fully resolved is left in the output
/// verbatim, braces included. Downstream consumers rely on that sentinel to
/// tell "resolved to empty" apart from "never resolved".
pub struct Interpolator {
    token: Regex,
}

impl Interpolator {
    pub fn new() -> Self {
        // Braces never nest, so a token is everything up to the next `}`.
        let token = Regex::new(r"\{\{([^}]+)\}\}").expect("token pattern is valid");
        Self { token }
    }

    pub fn interpolate(&self, template: &str, context: &Map<String, Value>) -> String {
        self.token
            .replace_all(template, |caps: &Captures| {
                let path = caps[1].trim();
                match resolve(path, context) {
                    Some(value) => render(value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk a dot path into the context. No array indices, no escaping.
fn resolve<'a>(path: &str, context: &'a Map<String, Value>) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
