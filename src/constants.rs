//! # Detection Engine Constants
//!
//! Defines the canonical registry defaults and syntax bounds for the
//! detection engine. These constants are the **single source of truth**
//! for reference-syntax limits throughout the codebase.
//!
//! ## Where the Numbers Come From
//!
//! The length and component bounds follow the OCI distribution
//! specification's reference grammar; the registry defaults follow the
//! Docker Hub conventions every other container tool assumes:
//! single-component names on the default registry are implicitly
//! `library/` official images, and an untagged reference means `latest`.
//!
//! ## Cross-References
//!
//! - [`crate::parser`]: Uses syntax bounds when validating parsed components
//! - [`crate::normalize`]: Uses registry defaults for canonicalization
//! - [`crate::detector`]: Uses template markers for template-aware traversal

/// The implicit public registry applied when a reference names none.
///
/// `index.docker.io` and bare `docker.io` both collapse to this token
/// during normalization so that scope matching compares like with like.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// The implicit namespace for single-component repositories on the
/// default registry (`nginx` → `library/nginx`).
pub const LIBRARY_NAMESPACE: &str = "library";

/// The tag applied when a reference carries neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

// =============================================================================
// Syntax Bounds
// =============================================================================
//
// These limits reject pathological references before any regex work is
// done. They match the distribution specification's grammar, which every
// conforming registry enforces server-side anyway.
// =============================================================================

/// Maximum image reference length in bytes.
///
/// References longer than this are rejected outright before parsing.
/// Registry implementations may enforce lower limits.
pub const MAX_REFERENCE_LEN: usize = 512;

/// Maximum repository path length in characters.
pub const MAX_REPOSITORY_LEN: usize = 255;

/// Maximum number of `/`-separated components in a repository path.
pub const MAX_REPOSITORY_COMPONENTS: usize = 5;

/// Maximum tag length in characters, per the distribution grammar.
pub const MAX_TAG_LEN: usize = 128;

/// Number of hex characters in a sha256 digest payload.
pub const DIGEST_HEX_LEN: usize = 64;

// =============================================================================
// Template Markers
// =============================================================================

/// Opening marker of a Helm/Go template expression.
pub const TEMPLATE_OPEN: &str = "{{";

/// Closing marker of a Helm/Go template expression.
pub const TEMPLATE_CLOSE: &str = "}}";

/// Returns true if `s` contains a complete template expression marker pair.
///
/// Only the presence of both markers counts; a stray `{{` without a close
/// is treated as literal text.
pub fn contains_template(s: &str) -> bool {
    s.contains(TEMPLATE_OPEN) && s.contains(TEMPLATE_CLOSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_marker_detection() {
        assert!(contains_template("{{ .Values.registry }}/nginx"));
        assert!(contains_template("prefix-{{.Release.Name}}-suffix"));
        assert!(!contains_template("nginx:latest"));
        assert!(!contains_template("open-only {{ but no close"));
        assert!(!contains_template("close-only }} but no open"));
    }
}
