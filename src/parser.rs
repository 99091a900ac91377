//! # Image Reference Parser
//!
//! Converts raw strings into structured [`Reference`] values using two
//! competing grammars:
//!
//! 1. **Strict grammar**: the anchored distribution-spec reference
//!    regular expression. References accepted here are marked
//!    `detected = true`.
//! 2. **Lenient heuristic**: ordered splitting on the last `@`, the last
//!    tag-position `:`, and the first `/`, with component validation at
//!    each step. Only consulted when the strict grammar fails and the
//!    caller did not request strict parsing.
//!
//! Both stages feed the same component validators
//! ([`crate::validation`]), so a registry or repository judged invalid in
//! one stage is invalid in the other. Every successfully parsed
//! reference is normalized before being returned (see
//! [`crate::normalize`]), so callers always observe canonical defaults.
//!
//! ## Ambiguity Rules
//!
//! - A `:` before the first `/` belongs to a `host:port` registry, never
//!   to a tag: `registry:5000/repo` has no tag.
//! - The first `/`-segment is a registry only when it contains `.` or
//!   `:` or equals `localhost`; otherwise the whole name is a repository
//!   path (`grafana/loki` lives on the default registry).
//! - A tag and a digest are mutually exclusive.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::{debug, trace};

use crate::constants::MAX_REFERENCE_LEN;
use crate::error::{Error, Result};
use crate::normalize::normalize_reference;
use crate::reference::Reference;
use crate::validation::{
    is_valid_digest, is_valid_registry_name, is_valid_repository_name, is_valid_tag,
};

/// The full distribution-spec reference grammar, anchored, with
/// capturing groups for the name, tag, and digest components.
const REFERENCE_PATTERN: &str = r"^(?P<name>(?:(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])(?:(?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))+)?(?::[0-9]+)?/)?[a-z0-9]+(?:(?:(?:[._]|__|[-]*)[a-z0-9]+)+)?(?:(?:/[a-z0-9]+(?:(?:(?:[._]|__|[-]*)[a-z0-9]+)+)?)+)?)(?::(?P<tag>[\w][\w.-]{0,127}))?(?:@(?P<digest>[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}))?$";

static REFERENCE_REGEXP: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(REFERENCE_PATTERN)
        .size_limit(10 * (1 << 21))
        .build()
        .expect("reference grammar must compile")
});

/// Characters that never appear in a well-formed reference.
const DISALLOWED_CHARS: &[char] = &[' ', '$', '?', '#', '\\'];

/// Parses `raw` into a normalized [`Reference`].
///
/// The strict grammar is attempted first; when it fails and `strict` is
/// false, the lenient heuristic retries the input. When `strict` is
/// true a strict-grammar failure is returned directly.
///
/// # Errors
///
/// - [`Error::EmptyReference`]: input empty after trimming
/// - [`Error::InvalidImageReference`]: doubled separators, disallowed
///   characters, or an unmatched grammar
/// - [`Error::InvalidDigestFormat`], [`Error::InvalidTagFormat`],
///   [`Error::InvalidRepositoryName`], [`Error::InvalidRegistryName`]:
///   component-specific syntax failures
/// - [`Error::TagAndDigestPresent`]: both suffixes present
pub fn parse(raw: &str, strict: bool) -> Result<Reference> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyReference);
    }
    if trimmed.len() > MAX_REFERENCE_LEN {
        return Err(Error::InvalidImageReference {
            reference: raw.to_string(),
            reason: format!("exceeds {} bytes", MAX_REFERENCE_LEN),
        });
    }

    let mut reference = match parse_distribution(trimmed) {
        Ok(reference) => reference,
        Err(err) if strict => {
            debug!("strict grammar rejected '{}': {}", trimmed, err);
            return Err(err);
        }
        Err(err) => {
            debug!(
                "strict grammar rejected '{}' ({}), retrying with lenient heuristic",
                trimmed, err
            );
            parse_lenient(trimmed)?
        }
    };

    reference.original = raw.to_string();
    normalize_reference(&mut reference);
    trace!("parsed '{}' as '{}'", raw, reference);
    Ok(reference)
}

/// True when `s` strictly matches a tag- or digest-shaped reference.
///
/// Used by the detector as the value-shape signal for strings at
/// unrecognized paths: a bare word like `nginx` is not image-shaped,
/// `nginx:1.25` and `repo@sha256:…` are.
pub fn looks_like_image_string(s: &str) -> bool {
    let Some(captures) = REFERENCE_REGEXP.captures(s) else {
        return false;
    };
    captures.name("tag").is_some() || captures.name("digest").is_some()
}

// =============================================================================
// Strict Grammar
// =============================================================================

fn parse_distribution(input: &str) -> Result<Reference> {
    let captures =
        REFERENCE_REGEXP
            .captures(input)
            .ok_or_else(|| Error::InvalidImageReference {
                reference: input.to_string(),
                reason: "does not match the reference grammar".to_string(),
            })?;

    let name = captures
        .name("name")
        .map(|m| m.as_str())
        .unwrap_or_default();
    let tag = captures.name("tag").map(|m| m.as_str().to_string());
    let digest = captures.name("digest").map(|m| m.as_str().to_string());

    if tag.is_some() && digest.is_some() {
        return Err(Error::TagAndDigestPresent {
            reference: input.to_string(),
        });
    }

    if let Some(digest) = &digest {
        // the grammar admits other algorithms; this engine accepts
        // sha256 only
        if !is_valid_digest(digest) {
            return Err(Error::InvalidDigestFormat {
                digest: digest.clone(),
            });
        }
    }

    let (registry, repository) = split_registry(name)?;

    let mut reference = Reference::new(repository);
    reference.registry = registry;
    reference.tag = tag;
    reference.digest = digest;
    reference.detected = true;
    Ok(reference)
}

// =============================================================================
// Lenient Heuristic
// =============================================================================

fn parse_lenient(input: &str) -> Result<Reference> {
    if input.contains("::") || input.contains("///") || input.contains("@@") {
        return Err(Error::InvalidImageReference {
            reference: input.to_string(),
            reason: "doubled separator".to_string(),
        });
    }
    if input.contains(DISALLOWED_CHARS) {
        return Err(Error::InvalidImageReference {
            reference: input.to_string(),
            reason: "disallowed character".to_string(),
        });
    }

    // digest: everything after the last '@'
    let (rest, digest) = match input.rsplit_once('@') {
        Some((rest, candidate)) => {
            if !is_valid_digest(candidate) {
                return Err(Error::InvalidDigestFormat {
                    digest: candidate.to_string(),
                });
            }
            (rest, Some(candidate.to_string()))
        }
        None => (input, None),
    };

    // tag: the last ':' after the first '/', so host:port prefixes are
    // not mistaken for tag separators
    let first_slash = rest.find('/');
    let tag_separator = rest
        .rfind(':')
        .filter(|&i| first_slash.map_or(true, |s| i > s));

    let (name, tag) = match tag_separator {
        Some(i) => {
            let candidate = &rest[i + 1..];
            if !is_valid_tag(candidate) {
                return Err(Error::InvalidTagFormat {
                    tag: candidate.to_string(),
                });
            }
            (&rest[..i], Some(candidate.to_string()))
        }
        None => (rest, None),
    };

    if tag.is_some() && digest.is_some() {
        return Err(Error::TagAndDigestPresent {
            reference: input.to_string(),
        });
    }

    let (registry, repository) = split_registry(name)?;

    let mut reference = Reference::new(repository);
    reference.registry = registry;
    reference.tag = tag;
    reference.digest = digest;
    reference.detected = false;
    Ok(reference)
}

// =============================================================================
// Shared Name Splitting
// =============================================================================

/// Splits a name into registry and repository.
///
/// The first `/`-segment is a registry only when it contains `.` or `:`
/// or equals `localhost`; otherwise the entire name is the repository
/// and no registry was specified.
fn split_registry(name: &str) -> Result<(Option<String>, String)> {
    let (registry, repository) = match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            if !is_valid_registry_name(first) {
                return Err(Error::InvalidRegistryName {
                    name: first.to_string(),
                });
            }
            (Some(first.to_string()), rest)
        }
        _ => (None, name),
    };

    if !is_valid_repository_name(repository) {
        return Err(Error::InvalidRepositoryName {
            name: repository.to_string(),
        });
    }

    Ok((registry, repository.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_shape_signal() {
        assert!(looks_like_image_string("nginx:1.25"));
        assert!(looks_like_image_string(&format!(
            "repo@sha256:{}",
            "a".repeat(64)
        )));
        assert!(looks_like_image_string("quay.io/prometheus/node-exporter:v1.7.0"));

        assert!(!looks_like_image_string("nginx"));
        assert!(!looks_like_image_string("just some words"));
        assert!(!looks_like_image_string("{{ .Values.image }}"));
    }

    #[test]
    fn test_strict_grammar_marks_provenance() {
        let reference = parse("docker.io/library/nginx:1.25", true).unwrap();
        assert!(reference.detected);

        let reference = parse("my_repo:v1", false).unwrap();
        assert_eq!(reference.repository, "library/my_repo");
        assert_eq!(reference.tag.as_deref(), Some("v1"));
    }
}
