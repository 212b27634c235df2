use crate::html::{Escaping, Options, CONTENT_PLACEHOLDER};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PropertySchema {
    pub name: String,
    // Declared type (int|integer|bool|string|<class>)
    #[serde(default)]
    pub r#type: Option<String>,
    // ORM column type, consulted when `type` is absent
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default = "default_true")]
    pub getter: bool,
    // Value a freshly instantiated record starts with
    #[serde(default)]
    pub default: Option<JsonValue>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TypeSchema {
    #[serde(default)]
    pub entity: bool,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    // Stored rows returned by the repository's find_all
    #[serde(default)]
    pub records: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TargetConfig {
    pub r#type: String,
    // Present: render an instance with these values. Absent: instantiate the type.
    #[serde(default)]
    pub values: Option<Map<String, JsonValue>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormConfig {
    #[serde(default = "default_action")]
    pub action: String,
    pub target: TargetConfig,
    #[serde(default)]
    pub types: HashMap<String, TypeSchema>,
    #[serde(default)]
    pub fields: HashMap<String, Options>,
    #[serde(default)]
    pub form: Options,
    // Whether ORM metadata (column types, related repositories) is available
    #[serde(default = "default_true")]
    pub orm: bool,
    #[serde(default)]
    pub escaping: Escaping,
    #[serde(default)]
    pub submit_label: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            action: default_action(),
            target: TargetConfig::default(),
            types: HashMap::new(),
            fields: HashMap::new(),
            form: Options::new(),
            orm: true,
            escaping: Escaping::Raw,
            submit_label: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_action() -> String {
    "/".to_string()
}

fn surround_ok(opts: &Options) -> bool {
    match opts.get("surround") {
        Some(JsonValue::String(s)) => s.contains(CONTENT_PLACEHOLDER),
        Some(_) => false,
        None => true,
    }
}

pub(crate) fn validate_form_config(cfg: &FormConfig) -> Result<(), String> {
    use std::collections::HashSet;
    if !cfg.types.contains_key(&cfg.target.r#type) {
        return Err(format!("target type '{}' is not declared under types", cfg.target.r#type));
    }
    for (type_name, schema) in &cfg.types {
        let mut names = HashSet::new();
        for (i, p) in schema.properties.iter().enumerate() {
            if !names.insert(&p.name) {
                return Err(format!(
                    "duplicate property '{}' in type '{}' at index {}",
                    p.name, type_name, i
                ));
            }
        }
    }
    for (name, opts) in &cfg.fields {
        if !surround_ok(opts) {
            return Err(format!("field '{name}' surround must contain '{CONTENT_PLACEHOLDER}'"));
        }
    }
    if !surround_ok(&cfg.form) {
        return Err(format!("form surround must contain '{CONTENT_PLACEHOLDER}'"));
    }
    Ok(())
}
