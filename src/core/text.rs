/// Display text resolution: localization keys and `{variable}` placeholders.
use std::collections::HashMap;

use crate::schema::content::Locale;
use crate::schema::dialogue::Text;
use crate::schema::value::Value;

/// Everything needed to turn authored text into display text.
#[derive(Debug, Clone, Copy)]
pub struct TextResolver<'a> {
    pub locale: Option<&'a Locale>,
    pub variables: &'a HashMap<String, Value>,
}

impl<'a> TextResolver<'a> {
    pub fn new(locale: Option<&'a Locale>, variables: &'a HashMap<String, Value>) -> Self {
        Self { locale, variables }
    }

    /// Resolve a parsed script text.
    pub fn text(&self, text: &Text) -> String {
        match text {
            Text::Literal(s) => interpolate(s, self.variables),
            Text::Key(key) => interpolate(&self.lookup(key), self.variables),
        }
    }

    /// Resolve a content string, where a leading `@` marks a key.
    pub fn content(&self, raw: &str) -> String {
        self.text(&Text::from_content(raw))
    }

    /// A missing key displays as the raw `@key`.
    fn lookup(&self, key: &str) -> String {
        self.locale
            .and_then(|l| l.strings.get(key))
            .cloned()
            .unwrap_or_else(|| format!("@{key}"))
    }
}

/// Substitute `{name}` with the current value of variable `name`.
///
/// Placeholders naming unset variables, empty or unclosed braces are left
/// exactly as written.
pub fn interpolate(input: &str, variables: &HashMap<String, Value>) -> String {
    if !input.contains('{') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find(['{', '}']) else {
            out.push_str(&rest[open..]);
            return out;
        };
        if after.as_bytes()[close] == b'{' {
            // Another opener before any closer: this brace is literal.
            out.push('{');
            rest = after;
            continue;
        }
        let name = &after[..close];
        match variables.get(name) {
            Some(value) if !name.is_empty() => out.push_str(&value.to_string()),
            _ => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}
