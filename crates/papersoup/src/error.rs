// ABOUTME: Error types for papersoup including the ErrorCode enum, SoupError and StageError.
// ABOUTME: SoupError carries the document id and stage label so batch callers can record per-document failures.

use std::fmt;

/// Error codes representing the categories of pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    StructuralNotFound,
    MetadataNotFound,
    MalformedMarkup,
    InvalidRecipe,
    Io,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::StructuralNotFound => "required container not found",
            ErrorCode::MetadataNotFound => "required metadata not found",
            ErrorCode::MalformedMarkup => "malformed markup",
            ErrorCode::InvalidRecipe => "invalid recipe",
            ErrorCode::Io => "io error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type returned by the pipeline runner.
///
/// `doc` is the caller-supplied document identifier and `stage` the label of
/// the stage that failed (`"3:focus"`, `"parse"`, ...).
#[derive(Debug, thiserror::Error)]
pub struct SoupError {
    pub code: ErrorCode,
    pub doc: String,
    pub stage: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for SoupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "papersoup: {} {}: {}", self.stage, self.doc, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl SoupError {
    fn with_code(
        code: ErrorCode,
        doc: impl Into<String>,
        stage: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            doc: doc.into(),
            stage: stage.into(),
            source,
        }
    }

    /// Create a StructuralNotFound error.
    pub fn structural_not_found(
        doc: impl Into<String>,
        stage: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::StructuralNotFound, doc, stage, source)
    }

    /// Create a MetadataNotFound error.
    pub fn metadata_not_found(
        doc: impl Into<String>,
        stage: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::MetadataNotFound, doc, stage, source)
    }

    /// Create a MalformedMarkup error.
    pub fn malformed_markup(
        doc: impl Into<String>,
        stage: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::MalformedMarkup, doc, stage, source)
    }

    /// Create an InvalidRecipe error. `doc` names the recipe source.
    pub fn invalid_recipe(
        doc: impl Into<String>,
        stage: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::InvalidRecipe, doc, stage, source)
    }

    /// Create an Io error.
    pub fn io(doc: impl Into<String>, stage: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_code(ErrorCode::Io, doc, stage, Some(source.into()))
    }

    /// Attach document and stage context to an error raised inside a stage.
    pub fn from_stage(doc: impl Into<String>, stage: impl Into<String>, err: StageError) -> Self {
        let code = err.code();
        Self::with_code(code, doc, stage, Some(err.into()))
    }

    /// Returns true if this is a StructuralNotFound error.
    pub fn is_structural_not_found(&self) -> bool {
        self.code == ErrorCode::StructuralNotFound
    }

    /// Returns true if this is a MetadataNotFound error.
    pub fn is_metadata_not_found(&self) -> bool {
        self.code == ErrorCode::MetadataNotFound
    }

    /// Returns true if this is a MalformedMarkup error.
    pub fn is_malformed_markup(&self) -> bool {
        self.code == ErrorCode::MalformedMarkup
    }

    /// Returns true if this is an InvalidRecipe error.
    pub fn is_invalid_recipe(&self) -> bool {
        self.code == ErrorCode::InvalidRecipe
    }

    /// Returns true if this is an Io error.
    pub fn is_io(&self) -> bool {
        self.code == ErrorCode::Io
    }
}

/// Fatal conditions raised by a single pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A structurally required container is absent.
    #[error("no node matches {0}")]
    StructuralNotFound(String),

    /// A required metadata field could not be located.
    #[error("metadata field {0} not found")]
    MetadataNotFound(String),
}

impl StageError {
    /// The error code this stage failure maps to.
    pub fn code(&self) -> ErrorCode {
        match self {
            StageError::StructuralNotFound(_) => ErrorCode::StructuralNotFound,
            StageError::MetadataNotFound(_) => ErrorCode::MetadataNotFound,
        }
    }
}

/// The XML builder could not turn the input into a tree.
#[derive(Debug, thiserror::Error)]
#[error("markup error at byte {position}: {message}")]
pub struct MarkupError {
    pub position: u64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stage_doc_and_source() {
        let err = SoupError::from_stage(
            "10.1063/1.3075216",
            "1:focus",
            StageError::StructuralNotFound("{name=fulltext}".to_string()),
        );
        assert!(err.is_structural_not_found());
        assert_eq!(
            err.to_string(),
            "papersoup: 1:focus 10.1063/1.3075216: required container not found: no node matches {name=fulltext}"
        );
    }

    #[test]
    fn display_without_source() {
        let err = SoupError::malformed_markup("paper.xml", "parse", None);
        assert!(err.is_malformed_markup());
        assert!(!err.is_io());
        assert_eq!(err.to_string(), "papersoup: parse paper.xml: malformed markup");
    }

    #[test]
    fn stage_error_codes() {
        assert_eq!(
            StageError::MetadataNotFound("DOI".into()).code(),
            ErrorCode::MetadataNotFound
        );
        let err = SoupError::from_stage("d", "2:metadata", StageError::MetadataNotFound("DOI".into()));
        assert!(err.is_metadata_not_found());
        assert_eq!(err.stage, "2:metadata");
    }
}
