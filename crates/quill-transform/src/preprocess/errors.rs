use quill_core::SourceSpan;
use thiserror::Error;

/// Fatal preprocessing failures. There is no recovery mode: the first error
/// aborts the compilation unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("Malformed declaration at {span}: {message}")]
    MalformedDeclaration { message: String, span: SourceSpan },

    #[error("Invalid parameter tag '{tag}' at {span}: function value can only be string (s) or array (a)")]
    InvalidParameterTag { tag: String, span: SourceSpan },

    #[error("Array size of '{name}' must be a fixed value at {span}")]
    NonConstantArrayDimension { name: String, span: SourceSpan },

    #[error("Internal template error: {0}")]
    Template(String),
}

impl PreprocessError {
    pub fn malformed(message: impl Into<String>, span: SourceSpan) -> Self {
        PreprocessError::MalformedDeclaration {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            PreprocessError::MalformedDeclaration { span, .. }
            | PreprocessError::InvalidParameterTag { span, .. }
            | PreprocessError::NonConstantArrayDimension { span, .. } => Some(*span),
            PreprocessError::Template(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PreprocessError::MalformedDeclaration { .. } => "MalformedDeclaration",
            PreprocessError::InvalidParameterTag { .. } => "InvalidParameterTag",
            PreprocessError::NonConstantArrayDimension { .. } => "NonConstantArrayDimension",
            PreprocessError::Template(_) => "Template",
        }
    }
}

impl From<quill_parser::ParseError> for PreprocessError {
    fn from(err: quill_parser::ParseError) -> Self {
        PreprocessError::Template(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PreprocessError>;
