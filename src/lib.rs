//! Generate HTML form markup from a record's properties.
//!
//! A [`FormGenerator`] walks the properties an [`Introspector`] reports for a
//! target, renders one [`FieldDescriptor`] per property and wraps them in a
//! `<form>`. Related-entity `<select>` fields pull their options from an
//! optional [`MetadataProvider`].

pub mod error;
pub mod form;
pub mod html;
pub mod model;
pub mod reflect;
pub mod services;

pub use error::{AccessError, FormError, FormResult};
pub use form::field::FieldDescriptor;
pub use form::{FieldOptions, FormGenerator};
pub use html::{Escaping, Options};
pub use reflect::{Introspector, MetadataProvider, Property, Record, Repository, Target};
