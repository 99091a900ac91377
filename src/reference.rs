//! # Structured Image References
//!
//! The canonical decomposition of a container image reference into
//! registry, repository, and tag-or-digest, plus the provenance fields
//! (original string, tree path, grammar flag) every detection result
//! carries.
//!
//! ## Lifecycle
//!
//! A [`Reference`] is constructed once by the parser, mutated exactly
//! once by the normalizer, and immutable afterwards. After normalization
//! the registry is always present and exactly one of tag or digest is
//! set — except for template-pending references, which are preserved
//! verbatim for round-tripping and never normalized.

use std::fmt;

use serde::Serialize;

use crate::path::TreePath;

/// A parsed container image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Registry host, possibly `host:port` before normalization.
    /// `None` until the normalizer applies the default registry.
    pub registry: Option<String>,
    /// Slash-separated repository path within the registry.
    pub repository: String,
    /// Image tag. Mutually exclusive with `digest` after normalization.
    pub tag: Option<String>,
    /// `sha256:` digest. Mutually exclusive with `tag` after normalization.
    pub digest: Option<String>,
    /// The unmodified source string this reference was parsed from.
    pub original: String,
    /// True when the strict distribution grammar produced this reference,
    /// false when the lenient heuristic fallback did.
    pub detected: bool,
    /// Location in the source tree where the reference was found.
    pub path: TreePath,
}

impl Reference {
    /// Creates a bare reference carrying only a repository.
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }
}

/// Canonical re-serialization: `registry/repository[:tag|@digest]`.
///
/// Omits the registry when unset and the tag/digest suffix when neither
/// is present, so partially-built references still render sensibly.
impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.repository)?;
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)
        } else if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)
        } else {
            Ok(())
        }
    }
}
