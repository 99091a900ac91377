//! # Tree Paths and Path Heuristics
//!
//! Locations inside a values tree are sequences of key/index steps. This
//! module defines the path representation used in every detection result,
//! plus the pattern tables that decide whether a string found at a given
//! path is allowed to be treated as an image reference candidate.
//!
//! ## Pattern Precedence
//!
//! Two ordered pattern sets are consulted, non-image first:
//!
//! | Set | Examples | Verdict |
//! |-----|----------|---------|
//! | Non-image | `*.enabled`, `*.port`, `*.tag`, annotation/label maps | never a candidate |
//! | Image | exact/suffix `image`, `*.images[n]`, workload container paths | known image path |
//!
//! A path matching a non-image pattern is suppressed even when the value
//! itself looks image-shaped, so `service.ports.port: "8080:80"` is never
//! mistaken for a `repo:tag` reference. Paths matching neither set are
//! *unknown*: strings there are only considered when the value itself
//! strictly matches the reference grammar (see [`crate::detector`]).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// One step into a values tree: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathStep {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(k) => write!(f, "{}", k),
            PathStep::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Location of a value inside a tree, from the root down.
///
/// Renders as `a.b[0].image`: keys joined with `.`, indices appended in
/// brackets without a separator. The root path renders as the empty
/// string. This rendered form is what the pattern tables match against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TreePath(Vec<PathStep>);

impl TreePath {
    /// The empty path at the traversal root.
    pub fn root() -> Self {
        Self::default()
    }

    /// True for the traversal root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path extended by a mapping key.
    pub fn join_key(&self, key: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Key(key.to_string()));
        Self(steps)
    }

    /// Returns a new path extended by a sequence index.
    pub fn join_index(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(index));
        Self(steps)
    }

    /// The steps of this path, root first.
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// The final mapping key, if the path ends with one.
    pub fn last_key(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathStep::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 && matches!(step, PathStep::Key(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

impl From<Vec<PathStep>> for TreePath {
    fn from(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }
}

// =============================================================================
// Path Pattern Tables
// =============================================================================

/// Paths known to carry image references.
///
/// The generic suffix patterns cover the common Helm conventions
/// (`image`, `workerImage`, `controller.image`, `sidecars.images[0]`);
/// the explicit workload paths cover rendered Kubernetes manifests.
static IMAGE_PATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"^image$",
        r"(?i)(^|\.)[a-z0-9_-]*image$",
        r"(^|\.)images\[\d+\]$",
        r"^spec\.template\.spec\.containers\[\d+\]\.image$",
        r"^spec\.template\.spec\.initContainers\[\d+\]\.image$",
        r"^spec\.jobTemplate\.spec\.template\.spec\.containers\[\d+\]\.image$",
    ])
});

/// Paths known to carry look-alike strings that are never images.
///
/// Consulted before the image table; a match here wins.
static NON_IMAGE_PATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"\.enabled$",
        r"\.annotations\.",
        r"\.annotations$",
        r"\.labels\.",
        r"\.labels$",
        r"\.port$",
        r"\.ports\.",
        r"\.ports\[",
        r"\.timeout$",
        r"\.serviceAccountName$",
        r"\.replicas$",
        r"\.resources\.",
        r"\.env\.",
        r"\.command\[\d+\]$",
        r"\.args\[\d+\]$",
        r"\[\d+\]\.name$",
        r"\.tag$",
        r"\.registry$",
        r"\.repository$",
    ])
});

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("pattern table entry must compile"))
        .collect()
}

/// Decides whether `path` is a known image-bearing location.
///
/// Pure function of the path: non-image patterns are consulted first and
/// take precedence, then image patterns. Returns false for paths that
/// match neither set.
pub fn is_image_path(path: &TreePath) -> bool {
    if path.is_root() {
        return false;
    }
    let rendered = path.to_string();

    if is_non_image(&rendered) {
        return false;
    }

    IMAGE_PATH_PATTERNS.iter().any(|re| re.is_match(&rendered))
}

/// True when `path` matches a known non-image pattern.
///
/// Exposed separately because non-image matches suppress even
/// grammar-shaped string candidates, not just path-based ones.
pub fn matches_non_image_path(path: &TreePath) -> bool {
    is_non_image(&path.to_string())
}

fn is_non_image(rendered: &str) -> bool {
    NON_IMAGE_PATH_PATTERNS
        .iter()
        .any(|re| re.is_match(rendered))
}
