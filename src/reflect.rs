//! Capabilities the form engine needs from the outside world: enumerating a
//! type's properties, invoking `get<Name>` accessors, and (optionally) reading
//! ORM metadata and fetching related records.

use crate::error::AccessError;
use serde_json::Value as JsonValue;

/// A named property in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub declared_type: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, declared_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.map(|s| s.to_string()),
        }
    }
}

/// An instance whose accessors can be invoked by name.
pub trait Record {
    /// Fully qualified type name, segments separated by `\` or `::`.
    fn type_name(&self) -> &str;

    /// `None` when the accessor does not exist at all; `Some(Err(_))` when it
    /// exists but its invocation failed.
    fn call(&self, method: &str) -> Option<Result<JsonValue, AccessError>>;
}

pub trait Introspector {
    /// `None` when the type is unknown.
    fn properties(&self, type_name: &str) -> Option<Vec<Property>>;

    /// Default-construct an instance of `type_name`.
    fn instantiate(&self, type_name: &str) -> Option<Box<dyn Record>>;
}

pub trait Repository {
    fn find_all(&self) -> Vec<Box<dyn Record>>;
    fn identifier_field_name(&self) -> String;
}

/// ORM column/entity metadata. Whether a provider is present is fixed when
/// the generator is built.
pub trait MetadataProvider {
    fn column_type(&self, type_name: &str, property: &str) -> Option<String>;
    fn is_entity(&self, type_name: &str) -> bool;
    fn repository(&self, type_name: &str) -> Option<Box<dyn Repository + '_>>;
}

/// What a form is generated from.
pub enum Target {
    Type(String),
    Instance(Box<dyn Record>),
}

impl Target {
    pub fn type_name(&self) -> &str {
        match self {
            Target::Type(name) => name,
            Target::Instance(rec) => rec.type_name(),
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Type(name) => f.debug_tuple("Type").field(name).finish(),
            Target::Instance(rec) => f.debug_tuple("Instance").field(&rec.type_name()).finish(),
        }
    }
}

/// `email` -> `getEmail`
pub fn accessor_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}

/// `App\Entity\User` or `app::entity::User` -> `user`
pub fn short_class_name(type_name: &str) -> String {
    type_name
        .rsplit(['\\', ':'])
        .next()
        .unwrap_or(type_name)
        .to_lowercase()
}

/// Text of a scalar accessor result; `None` for arrays and objects.
pub fn scalar_text(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::Null => Some(String::new()),
        JsonValue::Bool(true) => Some("1".into()),
        JsonValue::Bool(false) => Some(String::new()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}
