//! Markup assembly primitives. Every interpolated value goes through
//! [`push_attr`] or [`Escaping::text`].

use serde_json::{Map, Value as JsonValue};

/// Option maps keep insertion order (serde_json `preserve_order`).
pub type Options = Map<String, JsonValue>;

pub const CONTENT_PLACEHOLDER: &str = "{{content}}";

/// How interpolated values are written into the markup.
///
/// `Raw` inserts values verbatim and is the default for output parity with
/// existing templates; it does not protect against markup injection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escaping {
    #[default]
    Raw,
    Html,
}

impl Escaping {
    pub fn text<'a>(self, value: &'a str) -> std::borrow::Cow<'a, str> {
        match self {
            Escaping::Raw => value.into(),
            Escaping::Html => {
                if !value.contains(['&', '<', '>', '"', '\'']) {
                    return value.into();
                }
                let mut out = String::with_capacity(value.len() + 8);
                for ch in value.chars() {
                    match ch {
                        '&' => out.push_str("&amp;"),
                        '<' => out.push_str("&lt;"),
                        '>' => out.push_str("&gt;"),
                        '"' => out.push_str("&quot;"),
                        '\'' => out.push_str("&#39;"),
                        c => out.push(c),
                    }
                }
                out.into()
            }
        }
    }
}

/// Text for an option value; strings verbatim, everything else in JSON form.
pub fn option_text(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Writes `key='value' `.
pub fn push_attr(buf: &mut String, key: &str, value: &str, esc: Escaping) {
    buf.push_str(key);
    buf.push_str("='");
    buf.push_str(&esc.text(value));
    buf.push_str("' ");
}

/// Emits every option not listed in `exceptions`, in map order.
pub fn apply_properties(buf: &mut String, props: &Options, exceptions: &[&str], esc: Escaping) {
    for (key, value) in props {
        if exceptions.contains(&key.as_str()) {
            continue;
        }
        push_attr(buf, key, &option_text(value), esc);
    }
}

/// Replaces the placeholder in `template` with `content`, or `None` when the
/// template lacks it.
pub fn surround(template: &str, content: &str) -> Option<String> {
    if !template.contains(CONTENT_PLACEHOLDER) {
        return None;
    }
    Some(template.replace(CONTENT_PLACEHOLDER, content))
}
