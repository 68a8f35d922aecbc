use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// A tracker field holds a shape that cannot be matched as text.
#[error("wrong type for field {field}: want text, object or list, have {found}")]
pub struct FieldTypeError {
    /// Field key as looked up, with the nested key for structured values
    /// (`status.value`).
    pub field: String,
    pub found: &'static str,
}
