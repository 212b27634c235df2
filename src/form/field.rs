use crate::error::{FormError, FormResult};
use crate::html::{apply_properties, option_text, push_attr, surround, Escaping, Options};
use crate::reflect::{accessor_name, scalar_text, MetadataProvider, Property, Record};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// What a field needs from its parent form while rendering.
pub struct FieldContext<'a> {
    pub class_name: &'a str,
    pub record: &'a dyn Record,
    pub metadata: Option<&'a dyn MetadataProvider>,
    pub escaping: Escaping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Input,
    Select,
    TextArea,
}

impl ElementKind {
    pub fn closing_tag(self) -> &'static str {
        match self {
            ElementKind::Input => "/>",
            ElementKind::Select => "</select>",
            ElementKind::TextArea => "</textarea>",
        }
    }
}

/// One generated form element for one property.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    property: Property,
    options: Options,
    kind: ElementKind,
    markup: String,
}

impl FieldDescriptor {
    pub fn new(property: Property) -> Self {
        Self {
            property,
            options: Options::new(),
            kind: ElementKind::Input,
            markup: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.property.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn closing_tag(&self) -> &'static str {
        self.kind.closing_tag()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Stores `options` and re-renders the element from scratch.
    pub fn generate(&mut self, options: Options, ctx: &FieldContext<'_>) -> FormResult<()> {
        self.options = options;
        self.markup.clear();
        self.kind = ElementKind::Input;
        let esc = ctx.escaping;

        let mut content = String::new();
        match self.options.get("type").map(option_text) {
            Some(t) if t == "select" => {
                self.kind = ElementKind::Select;
                // items is either a literal list or a related type name
                if !matches!(
                    self.options.get("items"),
                    Some(JsonValue::Array(_) | JsonValue::String(_))
                ) {
                    return Err(FormError::MissingItems(self.property.name.clone()));
                }
                content.push_str("<select ");
                apply_properties(
                    &mut content,
                    &self.options,
                    &["type", "surround", "items", "optionLabel", "optionValue"],
                    esc,
                );
                self.push_default_name(&mut content, ctx);
                content.push('>');
                match &self.options["items"] {
                    JsonValue::Array(items) => {
                        for item in items {
                            let value = item.get("value").map(option_text).unwrap_or_default();
                            let label = item.get("name").map(option_text).unwrap_or_default();
                            push_option(&mut content, &value, &label, esc);
                        }
                    }
                    related => {
                        let related = option_text(related);
                        content.push_str(&self.related_options(&related, ctx)?);
                    }
                }
            }
            Some(t) if t == "textarea" => {
                self.kind = ElementKind::TextArea;
                content.push_str("<textarea ");
                apply_properties(&mut content, &self.options, &["type", "surround", "value"], esc);
                self.push_default_name(&mut content, ctx);
                content.push('>');
                if let Some(v) = self.options.get("value") {
                    content.push_str(&esc.text(&option_text(v)));
                }
            }
            Some(t) => {
                content.push_str("<input ");
                push_attr(&mut content, "type", &t, esc);
                apply_properties(&mut content, &self.options, &["type", "surround", "items"], esc);
                self.push_default_name(&mut content, ctx);
            }
            None => {
                let input_type = match self.resolve_type(ctx)?.as_str() {
                    "integer" | "int" => "number",
                    // Booleans fall through to a text input, matching the
                    // markup existing consumers already receive.
                    "bool" => "text",
                    _ => "text",
                };
                content.push_str("<input ");
                push_attr(&mut content, "type", input_type, esc);
                self.push_default_name(&mut content, ctx);
                if !self.options.contains_key("placeholder") {
                    push_attr(&mut content, "placeholder", &self.property.name, esc);
                }
                if !self.options.contains_key("value") {
                    if let Some(value) = self.current_value(ctx)? {
                        push_attr(&mut content, "value", &value, esc);
                    }
                }
                apply_properties(&mut content, &self.options, &["surround"], esc);
            }
        }

        content.push_str(self.kind.closing_tag());
        self.markup = match self.options.get("surround") {
            Some(template) => surround(&option_text(template), &content)
                .ok_or_else(|| FormError::MissingPlaceholder(self.property.name.clone()))?,
            None => content,
        };
        Ok(())
    }

    /// Appends an attribute without checking whether it already exists.
    pub fn add_attribute(&mut self, name: &str, value: &str) {
        self.options
            .insert(name.to_string(), JsonValue::String(value.to_string()));
    }

    pub fn update_attribute(&mut self, name: &str, value: &str) -> FormResult<()> {
        match self.options.get_mut(name) {
            Some(slot) => {
                *slot = JsonValue::String(value.to_string());
                Ok(())
            }
            None => Err(FormError::UnknownAttribute(name.to_string())),
        }
    }

    fn push_default_name(&self, content: &mut String, ctx: &FieldContext<'_>) {
        if !self.options.contains_key("name") {
            let name = format!("{}-{}", ctx.class_name, self.property.name);
            push_attr(content, "name", &name, ctx.escaping);
        }
    }

    /// Declared type first, then the ORM column type.
    fn resolve_type(&self, ctx: &FieldContext<'_>) -> FormResult<String> {
        if let Some(t) = &self.property.declared_type {
            return Ok(t.clone());
        }
        ctx.metadata
            .and_then(|m| m.column_type(ctx.record.type_name(), &self.property.name))
            .ok_or_else(|| FormError::UntypedProperty {
                class: ctx.class_name.to_string(),
                property: self.property.name.clone(),
            })
    }

    fn current_value(&self, ctx: &FieldContext<'_>) -> FormResult<Option<String>> {
        let method = accessor_name(&self.property.name);
        match ctx.record.call(&method) {
            None => Err(FormError::MissingAccessor {
                class: ctx.class_name.to_string(),
                method,
            }),
            Some(Ok(v)) => Ok(scalar_text(&v)),
            Some(Err(e)) => {
                warn!(field = %self.property.name, error = %e, "accessor failed, value omitted");
                Ok(None)
            }
        }
    }

    fn related_options(&self, related: &str, ctx: &FieldContext<'_>) -> FormResult<String> {
        let label_field = self
            .options
            .get("optionLabel")
            .map(option_text)
            .ok_or_else(|| FormError::MissingLabel(self.property.name.clone()))?;
        let metadata = ctx
            .metadata
            .ok_or_else(|| FormError::OrmUnavailable(related.to_string()))?;
        if !metadata.is_entity(related) {
            return Err(FormError::RelatedTypeNotIntrospectable(related.to_string()));
        }
        let repo = metadata
            .repository(related)
            .ok_or_else(|| FormError::RelatedTypeNotIntrospectable(related.to_string()))?;
        let value_field = match self.options.get("optionValue") {
            Some(v) => option_text(v),
            None => repo.identifier_field_name(),
        };
        let (value_getter, label_getter) = (accessor_name(&value_field), accessor_name(&label_field));

        let records = repo.find_all();
        debug!(field = %self.property.name, related, count = records.len(), "populating select");
        let mut out = String::new();
        for rec in &records {
            let value = invoke_text(&**rec, &value_getter)?;
            let label = invoke_text(&**rec, &label_getter)?;
            push_option(&mut out, &value, &label, ctx.escaping);
        }
        Ok(out)
    }
}

/// Accessor result on a related record. Unlike the field's own value, a
/// related accessor must exist and succeed.
fn invoke_text(rec: &dyn Record, method: &str) -> FormResult<String> {
    let missing = || FormError::MissingAccessor {
        class: crate::reflect::short_class_name(rec.type_name()),
        method: method.to_string(),
    };
    match rec.call(method) {
        Some(Ok(v)) => Ok(scalar_text(&v).unwrap_or_else(|| v.to_string())),
        _ => Err(missing()),
    }
}

fn push_option(buf: &mut String, value: &str, label: &str, esc: Escaping) {
    buf.push_str("<option value='");
    buf.push_str(&esc.text(value));
    buf.push_str("'>");
    buf.push_str(&esc.text(label));
    buf.push_str("</option>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use crate::reflect::Repository;
    use serde_json::json;
    use std::collections::HashMap;

    struct Book {
        values: HashMap<&'static str, Result<JsonValue, AccessError>>,
    }

    impl Record for Book {
        fn type_name(&self) -> &str {
            "App\\Entity\\Book"
        }
        fn call(&self, method: &str) -> Option<Result<JsonValue, AccessError>> {
            self.values.get(method).cloned()
        }
    }

    fn book() -> Book {
        let mut values = HashMap::new();
        values.insert("getTitle", Ok(json!("Dune")));
        values.insert("getPages", Ok(json!(412)));
        values.insert("getAuthor", Ok(json!({"id": 1})));
        values.insert(
            "getIsbn",
            Err(AccessError::Uninitialized("isbn".into())),
        );
        Book { values }
    }

    struct Authors;

    struct AuthorRepo;

    impl Repository for AuthorRepo {
        fn find_all(&self) -> Vec<Box<dyn Record>> {
            let mk = |id: i64, name: &str| -> Box<dyn Record> {
                let mut values = HashMap::new();
                values.insert("getId", Ok(json!(id)));
                values.insert("getName", Ok(json!(name)));
                values.insert("getCode", Ok(json!(format!("A{id}"))));
                Box::new(Book { values })
            };
            vec![mk(1, "Herbert"), mk(2, "Le Guin")]
        }
        fn identifier_field_name(&self) -> String {
            "id".into()
        }
    }

    impl MetadataProvider for Authors {
        fn column_type(&self, _type_name: &str, property: &str) -> Option<String> {
            (property == "summary").then(|| "string".to_string())
        }
        fn is_entity(&self, type_name: &str) -> bool {
            type_name == "Author"
        }
        fn repository(&self, type_name: &str) -> Option<Box<dyn Repository + '_>> {
            (type_name == "Author").then(|| Box::new(AuthorRepo) as Box<dyn Repository>)
        }
    }

    fn ctx<'a>(rec: &'a Book, metadata: Option<&'a dyn MetadataProvider>) -> FieldContext<'a> {
        FieldContext {
            class_name: "book",
            record: rec,
            metadata,
            escaping: Escaping::Raw,
        }
    }

    fn opts(v: JsonValue) -> Options {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn integer_property_renders_number_input_with_value() {
        let rec = book();
        let mut f = FieldDescriptor::new(Property::new("pages", Some("int")));
        f.generate(Options::new(), &ctx(&rec, None)).unwrap();
        assert_eq!(
            f.markup(),
            "<input type='number' name='book-pages' placeholder='pages' value='412' />"
        );
    }

    #[test]
    fn bool_property_falls_through_to_text() {
        let mut rec = book();
        rec.values.insert("getRead", Ok(json!(true)));
        let mut f = FieldDescriptor::new(Property::new("read", Some("bool")));
        f.generate(Options::new(), &ctx(&rec, None)).unwrap();
        assert!(f.markup().starts_with("<input type='text' name='book-read'"));
        assert!(f.markup().contains("value='1'"));
    }

    #[test]
    fn object_values_and_failed_accessors_omit_value() {
        let rec = book();
        let mut author = FieldDescriptor::new(Property::new("author", Some("Author")));
        author.generate(Options::new(), &ctx(&rec, None)).unwrap();
        assert!(!author.markup().contains("value="));

        let mut isbn = FieldDescriptor::new(Property::new("isbn", Some("string")));
        isbn.generate(Options::new(), &ctx(&rec, None)).unwrap();
        assert_eq!(
            isbn.markup(),
            "<input type='text' name='book-isbn' placeholder='isbn' />"
        );
    }

    #[test]
    fn missing_accessor_is_a_hard_failure() {
        let rec = book();
        let mut f = FieldDescriptor::new(Property::new("price", Some("int")));
        let err = f.generate(Options::new(), &ctx(&rec, None)).unwrap_err();
        assert_eq!(
            err,
            FormError::MissingAccessor {
                class: "book".into(),
                method: "getPrice".into()
            }
        );
    }

    #[test]
    fn untyped_property_uses_column_metadata_or_fails() {
        let mut rec = book();
        rec.values.insert("getSummary", Ok(json!("spice")));
        let mut f = FieldDescriptor::new(Property::new("summary", None));
        let err = f.generate(Options::new(), &ctx(&rec, None)).unwrap_err();
        assert!(matches!(err, FormError::UntypedProperty { .. }));

        let meta = Authors;
        f.generate(Options::new(), &ctx(&rec, Some(&meta))).unwrap();
        assert!(f.markup().contains("type='text'"));
        assert!(f.markup().contains("value='spice'"));
    }

    #[test]
    fn overrides_replace_defaults_and_pass_through() {
        let rec = book();
        let mut f = FieldDescriptor::new(Property::new("title", Some("string")));
        f.generate(
            opts(json!({"name": "t", "placeholder": "Title", "class": "wide"})),
            &ctx(&rec, None),
        )
        .unwrap();
        assert_eq!(
            f.markup(),
            "<input type='text' value='Dune' name='t' placeholder='Title' class='wide' />"
        );
    }

    #[test]
    fn explicit_input_type_and_textarea() {
        let rec = book();
        let mut email = FieldDescriptor::new(Property::new("title", None));
        email
            .generate(opts(json!({"type": "email", "required": "required"})), &ctx(&rec, None))
            .unwrap();
        assert_eq!(
            email.markup(),
            "<input type='email' required='required' name='book-title' />"
        );

        let mut area = FieldDescriptor::new(Property::new("title", None));
        area.generate(opts(json!({"type": "textarea", "value": "long"})), &ctx(&rec, None))
            .unwrap();
        assert_eq!(area.kind(), ElementKind::TextArea);
        assert_eq!(area.closing_tag(), "</textarea>");
        assert_eq!(area.markup(), "<textarea name='book-title' >long</textarea>");
    }

    #[test]
    fn select_requires_items_and_renders_literals() {
        let rec = book();
        let mut f = FieldDescriptor::new(Property::new("genre", None));
        let err = f
            .generate(opts(json!({"type": "select"})), &ctx(&rec, None))
            .unwrap_err();
        assert_eq!(err, FormError::MissingItems("genre".into()));
        let err = f
            .generate(
                opts(json!({"type": "select", "items": {"value": "1", "name": "A"}})),
                &ctx(&rec, None),
            )
            .unwrap_err();
        assert_eq!(err, FormError::MissingItems("genre".into()));
        assert_eq!(f.closing_tag(), "</select>");

        f.generate(
            opts(json!({"type": "select", "items": [
                {"value": "1", "name": "A"},
                {"value": "2", "name": "B"}
            ]})),
            &ctx(&rec, None),
        )
        .unwrap();
        assert_eq!(
            f.markup(),
            "<select name='book-genre' ><option value='1'>A</option><option value='2'>B</option></select>"
        );
    }

    #[test]
    fn relation_select_pulls_from_repository() {
        let rec = book();
        let meta = Authors;
        let mut f = FieldDescriptor::new(Property::new("author", None));
        f.generate(
            opts(json!({"type": "select", "items": "Author", "optionLabel": "name"})),
            &ctx(&rec, Some(&meta)),
        )
        .unwrap();
        assert!(f
            .markup()
            .ends_with("<option value='1'>Herbert</option><option value='2'>Le Guin</option></select>"));

        f.generate(
            opts(json!({"type": "select", "items": "Author", "optionLabel": "name", "optionValue": "code"})),
            &ctx(&rec, Some(&meta)),
        )
        .unwrap();
        assert!(f.markup().contains("<option value='A2'>Le Guin</option>"));
    }

    #[test]
    fn relation_select_failures() {
        let rec = book();
        let meta = Authors;
        let mut f = FieldDescriptor::new(Property::new("author", None));
        let no_label = opts(json!({"type": "select", "items": "Author"}));
        assert_eq!(
            f.generate(no_label, &ctx(&rec, Some(&meta))).unwrap_err(),
            FormError::MissingLabel("author".into())
        );
        let with_label = opts(json!({"type": "select", "items": "Author", "optionLabel": "name"}));
        assert_eq!(
            f.generate(with_label, &ctx(&rec, None)).unwrap_err(),
            FormError::OrmUnavailable("Author".into())
        );
        let plain = opts(json!({"type": "select", "items": "Shelf", "optionLabel": "name"}));
        assert_eq!(
            f.generate(plain, &ctx(&rec, Some(&meta))).unwrap_err(),
            FormError::RelatedTypeNotIntrospectable("Shelf".into())
        );
    }

    #[test]
    fn surround_wraps_element_and_closing_tag() {
        let rec = book();
        let mut f = FieldDescriptor::new(Property::new("pages", Some("int")));
        f.generate(
            opts(json!({"surround": "<label>{{content}}</label>"})),
            &ctx(&rec, None),
        )
        .unwrap();
        assert!(f.markup().starts_with("<label><input type='number'"));
        assert!(f.markup().ends_with("/></label>"));

        let err = f
            .generate(opts(json!({"surround": "<label></label>"})), &ctx(&rec, None))
            .unwrap_err();
        assert_eq!(err, FormError::MissingPlaceholder("pages".into()));
    }

    #[test]
    fn update_attribute_requires_existing_key() {
        let mut f = FieldDescriptor::new(Property::new("pages", Some("int")));
        assert_eq!(
            f.update_attribute("class", "x").unwrap_err(),
            FormError::UnknownAttribute("class".into())
        );
        f.add_attribute("class", "x");
        f.update_attribute("class", "y").unwrap();
        assert_eq!(f.options()["class"], json!("y"));
    }

    #[test]
    fn html_escaping_applies_to_values() {
        let mut rec = book();
        rec.values.insert("getTitle", Ok(json!("<b>'x'</b>")));
        let mut f = FieldDescriptor::new(Property::new("title", Some("string")));
        let c = FieldContext {
            escaping: Escaping::Html,
            ..ctx(&rec, None)
        };
        f.generate(Options::new(), &c).unwrap();
        assert!(f.markup().contains("value='&lt;b&gt;&#39;x&#39;&lt;/b&gt;'"));
    }
}
