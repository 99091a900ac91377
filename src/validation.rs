//! # Reference Component Syntax Validators
//!
//! Pure, stateless predicates over individual reference components.
//! The parser and the normalizer both call into these and must get the
//! same verdict regardless of call site, so none of them take mode flags
//! or consult any state beyond their argument.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{MAX_REPOSITORY_COMPONENTS, MAX_REPOSITORY_LEN, MAX_TAG_LEN};

/// One repository path component: lowercase alphanumeric runs joined by
/// single `.`, `_`, or `-` separators.
static REPOSITORY_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("component pattern"));

/// Tag grammar: up to 128 chars of `[A-Za-z0-9_.-]`, not starting with
/// `.` or `-`.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*$").expect("tag pattern"));

/// Digest grammar: `sha256:` followed by exactly 64 hex characters.
static DIGEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sha256:[0-9a-fA-F]{64}$").expect("digest pattern"));

/// One hostname label: alphanumeric and hyphens.
static HOST_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("host label pattern"));

/// Checks whether `name` is a plausible registry hostname.
///
/// Accepted forms:
/// - `localhost`
/// - a hostname followed by a colon-delimited numeric port
///   (`registry:5000`, `my.registry.example:443`)
/// - a dot-separated domain of two or three labels (`docker.io`,
///   `registry.example.com`), each label `[A-Za-z0-9-]+`
pub fn is_valid_registry_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name == "localhost" {
        return true;
    }

    // host:port form: numeric port, any valid host prefix (including a
    // single label, which is how "registry:5000" style names appear)
    if let Some((host, port)) = name.rsplit_once(':') {
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            return host == "localhost" || is_valid_host(host);
        }
        return false;
    }

    // bare domain: 2-3 dot-separated labels
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 || labels.len() > 3 {
        return false;
    }
    labels.iter().all(|l| HOST_LABEL.is_match(l))
}

// A host prefix before a port: 1-3 dot-separated labels.
fn is_valid_host(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.is_empty() || labels.len() > 3 {
        return false;
    }
    labels.iter().all(|l| HOST_LABEL.is_match(l))
}

/// Checks whether `repository` is a well-formed repository path.
///
/// 1-255 characters, 1-5 `/`-separated components, each component
/// lowercase, starting and ending alphanumeric, with single interior
/// `.`/`_`/`-` separators. Doubled separators (`..`, `--`, `__`) are
/// rejected.
pub fn is_valid_repository_name(repository: &str) -> bool {
    if repository.is_empty() || repository.len() > MAX_REPOSITORY_LEN {
        return false;
    }

    // the component grammar only permits single separators, but doubled
    // forms are rejected explicitly to match the reference grammar
    if repository.contains("..") || repository.contains("--") || repository.contains("__") {
        return false;
    }

    let components: Vec<&str> = repository.split('/').collect();
    if components.is_empty() || components.len() > MAX_REPOSITORY_COMPONENTS {
        return false;
    }

    components.iter().all(|c| REPOSITORY_COMPONENT.is_match(c))
}

/// Checks whether `tag` is a well-formed tag.
pub fn is_valid_tag(tag: &str) -> bool {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return false;
    }
    TAG.is_match(tag)
}

/// Checks whether `digest` is a well-formed `sha256:` digest.
pub fn is_valid_digest(digest: &str) -> bool {
    DIGEST.is_match(digest)
}
