use crate::validate::SchemaViolation;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export rejected: {0}")]
    SchemaViolation(#[from] SchemaViolation),
    #[error("invalid component name: {0}")]
    InvalidName(String),
    #[error("template placeholder '{placeholder}' has no value")]
    Template { placeholder: String },
    #[error("failed to serialize artifact data: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    /// Field violations when the export was rejected by validation.
    pub fn violations(&self) -> Option<&SchemaViolation> {
        match self {
            ExportError::SchemaViolation(violation) => Some(violation),
            _ => None,
        }
    }
}
