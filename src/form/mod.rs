pub mod field;

use crate::error::{FormError, FormResult};
use crate::html::{apply_properties, option_text, push_attr, surround, Escaping, Options};
use crate::reflect::{short_class_name, Introspector, MetadataProvider, Target};
use field::{FieldContext, FieldDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use tracing::debug;

pub use field::ElementKind;

/// Per-field option overrides keyed by property name.
pub type FieldOptions = HashMap<String, Options>;

const DEFAULT_SUBMIT_LABEL: &str = "Valider";

/// Form-level option keys that are never emitted as attributes.
const RESERVED_FORM_KEYS: [&str; 3] = ["surround", "action", "method"];

/// Builds a `<form>` with one element per property of a target.
///
/// Every call to [`generate`](Self::generate) or an attribute mutation
/// re-renders the whole form from current state.
pub struct FormGenerator<'a> {
    introspector: &'a dyn Introspector,
    metadata: Option<&'a dyn MetadataProvider>,
    escaping: Escaping,
    submit_label: String,
    target: Option<Target>,
    action: String,
    field_options: FieldOptions,
    form_options: Options,
    class_name: String,
    fields: Vec<FieldDescriptor>,
    markup: String,
}

impl<'a> FormGenerator<'a> {
    pub fn new(
        introspector: &'a dyn Introspector,
        metadata: Option<&'a dyn MetadataProvider>,
    ) -> Self {
        Self {
            introspector,
            metadata,
            escaping: Escaping::Raw,
            submit_label: DEFAULT_SUBMIT_LABEL.to_string(),
            target: None,
            action: "/".to_string(),
            field_options: FieldOptions::new(),
            form_options: Options::new(),
            class_name: String::new(),
            fields: Vec::new(),
            markup: String::new(),
        }
    }

    pub fn with_escaping(mut self, escaping: Escaping) -> Self {
        self.escaping = escaping;
        self
    }

    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Lowercased short name of the current target's type.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Last field carrying `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().rev().find(|f| f.name() == name)
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn generate(
        &mut self,
        target: Target,
        action: &str,
        field_options: FieldOptions,
        form_options: Options,
    ) -> FormResult<&mut Self> {
        self.target = Some(target);
        self.action = action.to_string();
        self.field_options = field_options;
        self.form_options = form_options;
        self.regenerate()?;
        Ok(self)
    }

    pub fn add_attribute(&mut self, field: &str, name: &str, value: &str) -> FormResult<()> {
        self.field_mut(field)?.add_attribute(name, value);
        self.regenerate()
    }

    pub fn update_attribute(&mut self, field: &str, name: &str, value: &str) -> FormResult<()> {
        self.field_mut(field)?.update_attribute(name, value)?;
        self.regenerate()
    }

    /// Writes the markup to stdout.
    pub fn show(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_to(&mut lock)?;
        lock.flush()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self.markup.as_bytes())
    }

    fn field_mut(&mut self, name: &str) -> FormResult<&mut FieldDescriptor> {
        self.fields
            .iter_mut()
            .rev()
            .find(|f| f.name() == name)
            .ok_or_else(|| FormError::FieldNotFound(name.to_string()))
    }

    fn regenerate(&mut self) -> FormResult<()> {
        self.markup.clear();
        let markup = self.render()?;
        self.markup = markup;
        Ok(())
    }

    fn render(&mut self) -> FormResult<String> {
        let target = self
            .target
            .take()
            .ok_or_else(|| FormError::InvalidTarget(String::new()))?;
        let type_name = target.type_name().to_string();
        let Some(properties) = self.introspector.properties(&type_name) else {
            self.target = Some(target);
            return Err(FormError::InvalidTarget(type_name));
        };
        if properties.is_empty() {
            self.target = Some(target);
            return Err(FormError::NoProperties(type_name));
        }
        let record = match target {
            Target::Instance(rec) => rec,
            Target::Type(name) => match self.introspector.instantiate(&name) {
                Some(rec) => {
                    debug!(type_name = %name, "instantiated target");
                    rec
                }
                None => {
                    self.target = Some(Target::Type(name.clone()));
                    return Err(FormError::InvalidTarget(name));
                }
            },
        };
        self.class_name = short_class_name(record.type_name());

        let esc = self.escaping;
        let mut form = String::from("<form ");
        push_attr(&mut form, "method", "POST", esc);
        push_attr(&mut form, "action", &self.action, esc);
        apply_properties(&mut form, &self.form_options, &RESERVED_FORM_KEYS, esc);
        form.push('>');

        let inputs = {
            let ctx = FieldContext {
                class_name: &self.class_name,
                record: &*record,
                metadata: self.metadata,
                escaping: esc,
            };
            let mut inputs = String::new();
            let mut result = Ok(());
            for property in properties {
                let idx = match self.fields.iter().rposition(|f| f.name() == property.name) {
                    Some(idx) => {
                        let stored = self.fields[idx].options().clone();
                        result = self.fields[idx].generate(stored, &ctx);
                        idx
                    }
                    None => {
                        let opts = self.field_options.get(&property.name).cloned().unwrap_or_default();
                        let mut fd = FieldDescriptor::new(property);
                        result = fd.generate(opts, &ctx);
                        if result.is_err() {
                            break;
                        }
                        self.fields.push(fd);
                        self.fields.len() - 1
                    }
                };
                if result.is_err() {
                    break;
                }
                inputs.push_str(self.fields[idx].markup());
            }
            result.map(|_| inputs)
        };
        self.target = Some(Target::Instance(record));
        let inputs = inputs?;
        debug!(class = %self.class_name, fields = self.fields.len(), "rendered fields");

        match self.form_options.get("surround") {
            Some(template) => {
                let wrapped = surround(&option_text(template), &inputs)
                    .ok_or_else(|| FormError::MissingPlaceholder("form".to_string()))?;
                form.push_str(&wrapped);
            }
            None => form.push_str(&inputs),
        }
        form.push_str("<button type='submit'>");
        form.push_str(&esc.text(&self.submit_label));
        form.push_str("</button></form>");
        Ok(form)
    }
}

impl fmt::Debug for FormGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormGenerator")
            .field("target", &self.target)
            .field("action", &self.action)
            .field("class_name", &self.class_name)
            .field("fields", &self.fields)
            .field("has_metadata", &self.metadata.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for FormGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup)
    }
}
