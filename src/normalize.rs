//! # Reference Normalization and Registry Scope Matching
//!
//! Canonicalization rules applied to every parsed reference, and the
//! source/exclude membership check used to decide which detections are
//! in scope for rewriting.
//!
//! ## Canonical Form
//!
//! | Rule | Before | After |
//! |------|--------|-------|
//! | Default registry | `nginx` | `docker.io/…` |
//! | Default tag | `…/nginx` | `…:latest` |
//! | Library namespace | `docker.io/nginx` | `docker.io/library/nginx` |
//! | Port stripping | `registry:5000/…` | `registry/…` |
//! | Hub aliases | `index.docker.io/…` | `docker.io/…` |
//!
//! Normalization is idempotent: applying it to an already-normalized
//! reference is a no-op. Scope matching normalizes both sides of every
//! comparison with the same rule, so `index.docker.io` matches a
//! `docker.io` source entry.

use tracing::{debug, trace};

use crate::constants::{DEFAULT_REGISTRY, DEFAULT_TAG, LIBRARY_NAMESPACE};
use crate::reference::Reference;

/// Standardizes a registry name for comparison and storage.
///
/// Lowercases, strips any path suffix and any trailing numeric port,
/// and collapses `index.docker.io` to the canonical default registry
/// token. An empty input normalizes to the default registry.
pub fn normalize_registry(registry: &str) -> String {
    let trimmed = registry.trim();
    if trimmed.is_empty() {
        return DEFAULT_REGISTRY.to_string();
    }

    let lowered = trimmed.to_ascii_lowercase();

    // hub aliases collapse before any port or path stripping
    if lowered == DEFAULT_REGISTRY || lowered == format!("index.{}", DEFAULT_REGISTRY) {
        return DEFAULT_REGISTRY.to_string();
    }

    // drop an accidental path suffix: "registry.example.com/charts"
    let mut hostname = match lowered.split_once('/') {
        Some((host, _)) => host,
        None => lowered.as_str(),
    };

    // strip a trailing numeric port: "registry:5000" -> "registry"
    if let Some((host, port)) = hostname.rsplit_once(':') {
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            hostname = host;
        }
    }

    trace!("normalized registry '{}' -> '{}'", registry, hostname);
    hostname.to_string()
}

/// Makes a registry name safe for use as a single path component.
///
/// Docker Hub variants become `dockerio`; elsewhere the port is
/// stripped and dots are removed (`registry.example.com:5000` →
/// `registryexamplecom`). Consumed by override generators that key
/// rewritten repositories by source registry.
pub fn sanitize_registry_for_path(registry: &str) -> String {
    let normalized = normalize_registry(registry);
    if normalized == DEFAULT_REGISTRY {
        return DEFAULT_REGISTRY.replace('.', "");
    }
    normalized.replace('.', "")
}

/// Applies canonicalization rules to `reference` in place.
///
/// Rules, in order: default or normalize the registry, default the tag
/// when neither tag nor digest is present, inject the library namespace
/// for single-component repositories on the default registry, and
/// reconstruct `original` when the parser left it unset. Idempotent.
pub fn normalize_reference(reference: &mut Reference) {
    reference.registry = Some(match reference.registry.as_deref() {
        None | Some("") => DEFAULT_REGISTRY.to_string(),
        Some(registry) => normalize_registry(registry),
    });

    if reference.tag.is_none() && reference.digest.is_none() {
        reference.tag = Some(DEFAULT_TAG.to_string());
    }

    if reference.registry.as_deref() == Some(DEFAULT_REGISTRY)
        && !reference.repository.contains('/')
    {
        reference.repository = format!("{}/{}", LIBRARY_NAMESPACE, reference.repository);
        debug!(
            "injected '{}/' namespace: {}",
            LIBRARY_NAMESPACE, reference.repository
        );
    }

    if reference.original.is_empty() {
        reference.original = reference.to_string();
    }
}

/// Decides whether `reference` belongs to one of the configured source
/// registries.
///
/// Both the reference's registry and every configured entry are
/// normalized with [`normalize_registry`] before comparison, and
/// comparison is exact token equality. Exclusion takes precedence: a
/// registry matching an exclude entry is out of scope even when it also
/// matches a source entry.
pub fn is_source_registry(reference: &Reference, sources: &[String], excludes: &[String]) -> bool {
    let registry = normalize_registry(reference.registry.as_deref().unwrap_or_default());

    if excludes
        .iter()
        .any(|exclude| normalize_registry(exclude) == registry)
    {
        debug!("registry '{}' is excluded", registry);
        return false;
    }

    sources
        .iter()
        .any(|source| normalize_registry(source) == registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_normalization() {
        assert_eq!(normalize_registry("docker.io"), "docker.io");
        assert_eq!(normalize_registry("index.docker.io"), "docker.io");
        assert_eq!(normalize_registry("Docker.IO"), "docker.io");
        assert_eq!(normalize_registry(""), "docker.io");
        assert_eq!(normalize_registry("registry:5000"), "registry");
        assert_eq!(normalize_registry("quay.io/org"), "quay.io");
        assert_eq!(normalize_registry("host:notaport"), "host:notaport");
    }

    #[test]
    fn test_sanitize_for_path() {
        assert_eq!(sanitize_registry_for_path("docker.io"), "dockerio");
        assert_eq!(sanitize_registry_for_path("index.docker.io"), "dockerio");
        assert_eq!(sanitize_registry_for_path(""), "dockerio");
        assert_eq!(
            sanitize_registry_for_path("registry.example.com:5000"),
            "registryexamplecom"
        );
    }
}
