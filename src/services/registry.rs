use crate::error::AccessError;
use crate::model::{PropertySchema, TypeSchema};
use crate::reflect::{
    accessor_name, Introspector, MetadataProvider, Property, Record, Repository,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// A record backed by a JSON object. `get<Name>` resolves to the property
/// `name` when that property declares a getter.
#[derive(Clone, Debug)]
pub struct DynamicRecord {
    type_name: String,
    getters: HashMap<String, String>,
    values: Map<String, JsonValue>,
}

impl DynamicRecord {
    pub fn new(type_name: &str, schema: &TypeSchema, values: Map<String, JsonValue>) -> Self {
        let getters = schema
            .properties
            .iter()
            .filter(|p| p.getter)
            .map(|p| (accessor_name(&p.name), p.name.clone()))
            .collect();
        Self {
            type_name: type_name.to_string(),
            getters,
            values,
        }
    }
}

impl Record for DynamicRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn call(&self, method: &str) -> Option<Result<JsonValue, AccessError>> {
        let property = self.getters.get(method)?;
        Some(
            self.values
                .get(property)
                .cloned()
                .ok_or_else(|| AccessError::Uninitialized(property.clone())),
        )
    }
}

/// Schema-driven stand-in for runtime reflection plus ORM metadata.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<String, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new(types: HashMap<String, TypeSchema>) -> Self {
        Self { types }
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: TypeSchema) {
        self.types.insert(name.into(), schema);
    }

    pub fn record(&self, type_name: &str, values: Map<String, JsonValue>) -> Option<DynamicRecord> {
        let schema = self.types.get(type_name)?;
        Some(DynamicRecord::new(type_name, schema, values))
    }

    fn property_schema(&self, type_name: &str, property: &str) -> Option<&PropertySchema> {
        self.types
            .get(type_name)?
            .properties
            .iter()
            .find(|p| p.name == property)
    }
}

impl Introspector for SchemaRegistry {
    fn properties(&self, type_name: &str) -> Option<Vec<Property>> {
        let schema = self.types.get(type_name)?;
        Some(
            schema
                .properties
                .iter()
                .map(|p| Property::new(p.name.clone(), p.r#type.as_deref()))
                .collect(),
        )
    }

    fn instantiate(&self, type_name: &str) -> Option<Box<dyn Record>> {
        let schema = self.types.get(type_name)?;
        let defaults = schema
            .properties
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        Some(Box::new(DynamicRecord::new(type_name, schema, defaults)))
    }
}

struct SchemaRepository<'a> {
    type_name: &'a str,
    schema: &'a TypeSchema,
}

impl Repository for SchemaRepository<'_> {
    fn find_all(&self) -> Vec<Box<dyn Record>> {
        self.schema
            .records
            .iter()
            .map(|values| {
                Box::new(DynamicRecord::new(self.type_name, self.schema, values.clone()))
                    as Box<dyn Record>
            })
            .collect()
    }

    fn identifier_field_name(&self) -> String {
        self.schema
            .identifier
            .clone()
            .unwrap_or_else(|| "id".to_string())
    }
}

impl MetadataProvider for SchemaRegistry {
    fn column_type(&self, type_name: &str, property: &str) -> Option<String> {
        self.property_schema(type_name, property)?.column.clone()
    }

    fn is_entity(&self, type_name: &str) -> bool {
        self.types.get(type_name).map(|s| s.entity).unwrap_or(false)
    }

    fn repository(&self, type_name: &str) -> Option<Box<dyn Repository + '_>> {
        let (name, schema) = self.types.get_key_value(type_name)?;
        if !schema.entity {
            return None;
        }
        Some(Box::new(SchemaRepository {
            type_name: name.as_str(),
            schema,
        }))
    }
}
