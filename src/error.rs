//! Error types for the detection engine.
//!
//! Every failure mode is a variant of one crate-wide [`Error`] enum so
//! callers match on kind, never on message text. Errors picked up during
//! traversal are wrapped with the tree path they occurred at (the
//! [`Error::Traversal`] variant); [`Error::kind`] drills through that
//! wrapping so a wrapped error still matches its originating kind.

use serde::Serialize;

/// Result type alias for detection engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, validating, or detecting image
/// references.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Reference String Parsing Errors
    // =========================================================================
    /// Input string was empty after trimming.
    #[error("image reference string cannot be empty")]
    EmptyReference,

    /// Generic unparseable format (doubled separators, disallowed
    /// characters, unmatched grammar).
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidImageReference { reference: String, reason: String },

    /// Repository component failed syntax validation.
    #[error("invalid repository name '{name}'")]
    InvalidRepositoryName { name: String },

    /// Tag component failed syntax validation.
    #[error("invalid tag format '{tag}'")]
    InvalidTagFormat { tag: String },

    /// Digest component is not `sha256:` followed by 64 hex characters.
    #[error("invalid digest format '{digest}'")]
    InvalidDigestFormat { digest: String },

    /// Registry component failed syntax validation.
    #[error("invalid registry name '{name}'")]
    InvalidRegistryName { name: String },

    /// A reference carried both a tag and a digest, which are mutually
    /// exclusive.
    #[error("reference '{reference}' specifies both a tag and a digest")]
    TagAndDigestPresent { reference: String },

    // =========================================================================
    // Image Map Structure Errors
    // =========================================================================
    /// The `repository` field of an image-shaped map was not a string.
    #[error("image map at '{path}' has invalid repository type (must be string)")]
    InvalidImageMapRepo { path: String },

    /// The `registry` field of an image-shaped map was not a string.
    #[error("image map at '{path}' has invalid registry type (must be string)")]
    InvalidImageMapRegistryType { path: String },

    /// The `tag` field of an image-shaped map was not a string.
    #[error("image map at '{path}' has invalid tag type (must be string)")]
    InvalidImageMapTagType { path: String },

    /// The `digest` field of an image-shaped map was not a string.
    #[error("image map at '{path}' has invalid digest type (must be string)")]
    InvalidImageMapDigestType { path: String },

    // =========================================================================
    // Classification Errors
    // =========================================================================
    /// Strict mode: a string that looks image-shaped but sits at a path
    /// not known to carry images. Carries the underlying parse failure
    /// when there was one.
    #[error("string at '{path}' resembles an image reference but is at an unrecognized path")]
    AmbiguousStringPath {
        path: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// A template expression was found where a literal value was expected.
    #[error("template expression detected in '{value}'")]
    TemplateVariable { value: String },

    /// Strict mode: a structurally valid reference whose registry is not
    /// in the configured source set.
    #[error("image at '{path}' is not from a configured source registry")]
    NonSourceRegistry { path: String },

    // =========================================================================
    // Traversal Wrapping
    // =========================================================================
    /// An error from a child node, wrapped with the path it occurred at.
    #[error("error processing path '{path}': {source}")]
    Traversal {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

/// Discriminant-only view of [`Error`], used for identity matching
/// through traversal wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    EmptyReference,
    InvalidImageReference,
    InvalidRepositoryName,
    InvalidTagFormat,
    InvalidDigestFormat,
    InvalidRegistryName,
    TagAndDigestPresent,
    InvalidImageMapRepo,
    InvalidImageMapRegistryType,
    InvalidImageMapTagType,
    InvalidImageMapDigestType,
    AmbiguousStringPath,
    TemplateVariable,
    NonSourceRegistry,
}

impl Error {
    /// Returns the kind of the innermost error, drilling through any
    /// [`Error::Traversal`] wrapping added during the tree walk.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyReference => ErrorKind::EmptyReference,
            Error::InvalidImageReference { .. } => ErrorKind::InvalidImageReference,
            Error::InvalidRepositoryName { .. } => ErrorKind::InvalidRepositoryName,
            Error::InvalidTagFormat { .. } => ErrorKind::InvalidTagFormat,
            Error::InvalidDigestFormat { .. } => ErrorKind::InvalidDigestFormat,
            Error::InvalidRegistryName { .. } => ErrorKind::InvalidRegistryName,
            Error::TagAndDigestPresent { .. } => ErrorKind::TagAndDigestPresent,
            Error::InvalidImageMapRepo { .. } => ErrorKind::InvalidImageMapRepo,
            Error::InvalidImageMapRegistryType { .. } => ErrorKind::InvalidImageMapRegistryType,
            Error::InvalidImageMapTagType { .. } => ErrorKind::InvalidImageMapTagType,
            Error::InvalidImageMapDigestType { .. } => ErrorKind::InvalidImageMapDigestType,
            Error::AmbiguousStringPath { .. } => ErrorKind::AmbiguousStringPath,
            Error::TemplateVariable { .. } => ErrorKind::TemplateVariable,
            Error::NonSourceRegistry { .. } => ErrorKind::NonSourceRegistry,
            Error::Traversal { source, .. } => source.kind(),
        }
    }

    /// Wraps this error with the tree path it occurred at.
    pub fn at_path(self, path: impl Into<String>) -> Error {
        Error::Traversal {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_drills_through_wrapping() {
        let inner = Error::InvalidImageMapRepo {
            path: "app.image".to_string(),
        };
        let wrapped = inner.at_path("app").at_path("values");

        assert_eq!(wrapped.kind(), ErrorKind::InvalidImageMapRepo);
    }
}
