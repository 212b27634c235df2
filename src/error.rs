use thiserror::Error;

/// Failures raised while generating a form or mutating field attributes.
///
/// Every variant aborts the current `generate`/attribute call; nothing is
/// retried and nothing is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("first argument must be a known type or an instance, got '{0}'")]
    InvalidTarget(String),

    #[error("can't generate a form of {0} because it doesn't have any property")]
    NoProperties(String),

    #[error("property '{property}' of {class} class has no declared type and no column metadata")]
    UntypedProperty { class: String, property: String },

    #[error("the method {method} does not exist in your {class} class")]
    MissingAccessor { class: String, method: String },

    #[error("select field '{0}' needs an 'items' option")]
    MissingItems(String),

    #[error("select field '{0}' needs an 'optionLabel' option naming the displayed field")]
    MissingLabel(String),

    #[error("{0} carries no entity metadata and can't be fetched")]
    RelatedTypeNotIntrospectable(String),

    #[error("no ORM metadata provider configured, can't fetch {0}")]
    OrmUnavailable(String),

    #[error("surround option of {0} must contain '{{{{content}}}}'")]
    MissingPlaceholder(String),

    #[error("the attribute {0} does not exist")]
    UnknownAttribute(String),

    #[error("no form field named '{0}'")]
    FieldNotFound(String),
}

/// A failed accessor invocation. The field engine swallows these and simply
/// omits the `value` attribute.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("property '{0}' is not initialized")]
    Uninitialized(String),

    #[error("accessor {method} failed: {reason}")]
    Failed { method: String, reason: String },
}

pub type FormResult<T> = Result<T, FormError>;
