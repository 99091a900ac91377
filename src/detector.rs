//! # Structural Image Detection
//!
//! Recursive traversal of a dynamic values tree (the decoded form of a
//! Helm-style configuration document) that locates container image
//! references expressed either as single strings or as
//! `{registry, repository, tag, digest}`-shaped maps.
//!
//! ## Traversal Rules
//!
//! | Node kind | Behavior |
//! |-----------|----------|
//! | Mapping | image-map extraction, then recursion into remaining keys |
//! | Sequence | recursion with index steps; never itself an image |
//! | String | candidate when the path or the value shape says so |
//! | Other scalar | ignored |
//!
//! A mapping confirmed as an image structure is not descended into, so
//! its `tag`/`registry` fields are never re-examined as independent
//! strings. A direct `image` string key takes precedence over sibling
//! `repository`/`tag` fields at the same node.
//!
//! ## Strict vs. Lenient
//!
//! Lenient mode optimizes for recall: only confident, in-scope matches
//! are reported and all noise is silently dropped. Strict mode produces
//! a complete inventory: every ambiguous or invalid candidate becomes an
//! [`UnsupportedImage`] carrying the original error as cause, enabling
//! manual review. Only structural errors inside an unambiguous image
//! map (for example a non-string `repository` value) abort traversal.
//!
//! ## Global Registry
//!
//! A `global` map at the tree root may carry a `*registry*`-named key;
//! its value seeds [`DetectionContext::global_registry`] before the walk
//! begins and applies to any image map that names no registry of its
//! own. The override is traversal-scoped: concurrent detections over
//! different trees need independent contexts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use imagesift::{DetectionContext, Detector};
//!
//! let values: serde_yaml::Value = serde_yaml::from_str(chart_values)?;
//! let mut detector = Detector::new(DetectionContext {
//!     source_registries: vec!["docker.io".into(), "quay.io".into()],
//!     strict: true,
//!     ..Default::default()
//! });
//! let (detected, unsupported) = detector.detect(&values)?;
//! ```

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use crate::constants::{contains_template, TEMPLATE_OPEN};
use crate::error::{Error, Result};
use crate::normalize::is_source_registry;
use crate::parser::{looks_like_image_string, parse};
use crate::path::{is_image_path, matches_non_image_path, TreePath};
use crate::reference::Reference;

// =============================================================================
// Result Types
// =============================================================================

/// How an image reference was structured in the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// A `{registry, repository, tag, digest}`-shaped mapping.
    Map,
    /// A single string value such as `nginx:1.25`.
    String,
    /// A root-level global registry configuration location.
    Global,
}

/// A confirmed image reference found at a specific tree path.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedImage {
    /// The normalized reference.
    pub reference: Reference,
    /// Where in the tree it was found.
    pub path: TreePath,
    /// The structural pattern it matched.
    pub pattern: Pattern,
    /// The original raw value, preserved for round-tripping.
    pub original: Value,
}

/// Why a candidate location could not be classified as an in-scope image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsupportedKind {
    /// An image-shaped map that failed validation.
    MalformedMap,
    /// A string at an image-bearing location that failed to parse.
    MalformedString,
    /// A validly-parsing string at an unrecognized path.
    AmbiguousPath,
    /// A valid reference whose registry is outside the source set.
    NonSourceRegistry,
}

/// A candidate location that looked image-like but could not be
/// confidently classified. Only produced in strict mode.
#[derive(Debug, Serialize)]
pub struct UnsupportedImage {
    /// Where in the tree the candidate was found.
    pub path: TreePath,
    /// Classification of the failure.
    pub kind: UnsupportedKind,
    /// The underlying cause.
    #[serde(serialize_with = "serialize_error")]
    pub error: Error,
}

fn serialize_error<S: serde::Serializer>(
    error: &Error,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Configuration for one detection traversal.
///
/// `global_registry` is mutable traversal state: it is seeded from the
/// tree root by [`Detector::detect`] and must not be shared across
/// concurrent traversals.
#[derive(Debug, Clone, Default)]
pub struct DetectionContext {
    /// Registries whose images are in scope for rewriting.
    pub source_registries: Vec<String>,
    /// Registries excluded from scope even when listed as sources.
    pub exclude_registries: Vec<String>,
    /// Registry applied to references that specify none of their own.
    pub global_registry: Option<String>,
    /// Surface ambiguous and invalid candidates instead of dropping them.
    pub strict: bool,
    /// Preserve template-bearing values instead of skipping them.
    pub template_mode: bool,
}

// =============================================================================
// Detector
// =============================================================================

/// Outcome of examining a mapping that carries a `repository` key.
enum MapOutcome {
    /// A valid, in-scope image map.
    Detected(Box<DetectedImage>),
    /// A confirmed image map that could not be accepted (strict mode).
    Unsupported(UnsupportedImage),
    /// A confirmed image map dropped silently (lenient mode).
    Skip,
}

/// Recursive image reference detector over dynamic value trees.
pub struct Detector {
    context: DetectionContext,
}

impl Detector {
    /// Creates a detector with the given detection context.
    pub fn new(context: DetectionContext) -> Self {
        Self { context }
    }

    /// The context this detector runs with.
    pub fn context(&self) -> &DetectionContext {
        &self.context
    }

    /// Walks `values` and returns detected and unsupported images in
    /// pre-order traversal order.
    ///
    /// # Errors
    ///
    /// Returns an error only for structural failures inside an
    /// unambiguous image map (mis-typed `repository`/`registry`/`tag`/
    /// `digest` fields, or an assembled reference that fails component
    /// validation). All other disagreements become [`UnsupportedImage`]
    /// records and traversal continues.
    pub fn detect(&mut self, values: &Value) -> Result<(Vec<DetectedImage>, Vec<UnsupportedImage>)> {
        // the seeded override is scoped to this invocation; restore the
        // configured value so a later tree without a `global` key does
        // not inherit this tree's registry
        let configured = self.context.global_registry.clone();
        if let Value::Mapping(root) = values {
            self.seed_global_registry(root);
        }
        let result = self.walk(values, &TreePath::root());
        self.context.global_registry = configured;
        result
    }

    // Seeds the global registry override from a root-level `global` map,
    // before any node is processed.
    fn seed_global_registry(&mut self, root: &Mapping) {
        let Some(Value::Mapping(global)) = root.get("global") else {
            return;
        };
        for (key, value) in global {
            let (Some(key), Some(value)) = (key.as_str(), value.as_str()) else {
                continue;
            };
            if key.to_ascii_lowercase().contains("registry") && !value.is_empty() {
                debug!("global registry override: '{}' (from global.{})", value, key);
                self.context.global_registry = Some(value.to_string());
                return;
            }
        }
    }

    fn walk(
        &self,
        value: &Value,
        path: &TreePath,
    ) -> Result<(Vec<DetectedImage>, Vec<UnsupportedImage>)> {
        match value {
            Value::Mapping(mapping) => self.walk_mapping(mapping, path),
            Value::Sequence(sequence) => self.walk_sequence(sequence, path),
            Value::String(string) => self.walk_string(string, path),
            // booleans, numbers, nulls, tagged values: never images
            _ => Ok((Vec::new(), Vec::new())),
        }
    }

    fn walk_mapping(
        &self,
        mapping: &Mapping,
        path: &TreePath,
    ) -> Result<(Vec<DetectedImage>, Vec<UnsupportedImage>)> {
        let mut detected = Vec::new();
        let mut unsupported = Vec::new();

        // a direct `image` string key suppresses map-structure detection
        // at this node; the string itself is classified during recursion
        let has_image_string = matches!(mapping.get("image"), Some(Value::String(_)));

        if !has_image_string {
            if let Some(outcome) = self.try_extract_image_map(mapping, path)? {
                match outcome {
                    MapOutcome::Detected(image) => detected.push(*image),
                    MapOutcome::Unsupported(record) => unsupported.push(record),
                    MapOutcome::Skip => {}
                }
                // confirmed image structure: do not descend into its keys
                return Ok((detected, unsupported));
            }
        }

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                trace!("skipping non-string key under '{}'", path);
                continue;
            };
            if path.is_root() && key == "global" {
                continue;
            }
            let child_path = path.join_key(key);
            let (child_detected, child_unsupported) = self
                .walk(value, &child_path)
                .map_err(|e| e.at_path(child_path.to_string()))?;
            detected.extend(child_detected);
            unsupported.extend(child_unsupported);
        }
        Ok((detected, unsupported))
    }

    fn walk_sequence(
        &self,
        sequence: &[Value],
        path: &TreePath,
    ) -> Result<(Vec<DetectedImage>, Vec<UnsupportedImage>)> {
        let mut detected = Vec::new();
        let mut unsupported = Vec::new();

        for (index, item) in sequence.iter().enumerate() {
            let item_path = path.join_index(index);
            let (item_detected, item_unsupported) = self
                .walk(item, &item_path)
                .map_err(|e| e.at_path(item_path.to_string()))?;
            detected.extend(item_detected);
            unsupported.extend(item_unsupported);
        }
        Ok((detected, unsupported))
    }

    fn walk_string(
        &self,
        value: &str,
        path: &TreePath,
    ) -> Result<(Vec<DetectedImage>, Vec<UnsupportedImage>)> {
        let mut detected = Vec::new();
        let mut unsupported = Vec::new();

        // non-image paths win over every other signal, including a
        // value that happens to look like `repo:tag`
        if matches_non_image_path(path) {
            trace!("suppressing non-image path '{}'", path);
            return Ok((detected, unsupported));
        }

        let known_image_path = is_image_path(path);

        if contains_template(value) {
            if self.context.template_mode && known_image_path {
                detected.push(self.template_string_image(value, path));
            } else if self.context.strict && known_image_path {
                unsupported.push(UnsupportedImage {
                    path: path.clone(),
                    kind: UnsupportedKind::MalformedString,
                    error: Error::TemplateVariable {
                        value: value.to_string(),
                    },
                });
            }
            return Ok((detected, unsupported));
        }

        let image_shaped = looks_like_image_string(value);
        if !known_image_path && !image_shaped {
            return Ok((detected, unsupported));
        }

        match parse(value, self.context.strict) {
            Ok(mut reference) => {
                reference.path = path.clone();
                if self.in_scope(&reference) {
                    if !self.context.strict || known_image_path {
                        trace!("detected string image '{}' at '{}'", reference, path);
                        detected.push(DetectedImage {
                            reference,
                            path: path.clone(),
                            pattern: Pattern::String,
                            original: Value::String(value.to_string()),
                        });
                    } else {
                        unsupported.push(UnsupportedImage {
                            path: path.clone(),
                            kind: UnsupportedKind::AmbiguousPath,
                            error: Error::AmbiguousStringPath {
                                path: path.to_string(),
                                source: None,
                            },
                        });
                    }
                } else if self.context.strict {
                    unsupported.push(UnsupportedImage {
                        path: path.clone(),
                        kind: UnsupportedKind::NonSourceRegistry,
                        error: Error::NonSourceRegistry {
                            path: path.to_string(),
                        },
                    });
                }
                // lenient out-of-scope: silently ignored
            }
            Err(err) => {
                if self.context.strict {
                    let cause = if !known_image_path && image_shaped {
                        Error::AmbiguousStringPath {
                            path: path.to_string(),
                            source: Some(Box::new(err)),
                        }
                    } else {
                        err
                    };
                    unsupported.push(UnsupportedImage {
                        path: path.clone(),
                        kind: UnsupportedKind::MalformedString,
                        error: cause,
                    });
                }
                // lenient parse failure: silently ignored
            }
        }

        Ok((detected, unsupported))
    }

    // =========================================================================
    // Image Map Extraction
    // =========================================================================

    /// Examines a mapping for the `{registry, repository, tag, digest}`
    /// image structure. Returns `None` when the mapping is not an image
    /// map and normal recursion should proceed.
    fn try_extract_image_map(
        &self,
        mapping: &Mapping,
        path: &TreePath,
    ) -> Result<Option<MapOutcome>> {
        // `repository` anchors the structure; absent or null means this
        // is an ordinary mapping
        let repository = match mapping.get("repository") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(Error::InvalidImageMapRepo {
                    path: path.to_string(),
                })
            }
        };

        // source-control URLs produce repository-shaped fields in chart
        // values (argo-cd and friends); they are not images
        if is_source_control_url(repository) {
            trace!("'{}' at '{}' looks like a VCS URL, skipping", repository, path);
            return Ok(None);
        }

        let registry = optional_string_field(mapping, "registry", || {
            Error::InvalidImageMapRegistryType {
                path: path.to_string(),
            }
        })?;
        let tag = optional_string_field(mapping, "tag", || Error::InvalidImageMapTagType {
            path: path.to_string(),
        })?;
        let digest = optional_string_field(mapping, "digest", || {
            Error::InvalidImageMapDigestType {
                path: path.to_string(),
            }
        })?;

        let templated = contains_template(repository)
            || registry.is_some_and(contains_template)
            || tag.is_some_and(contains_template)
            || digest.is_some_and(contains_template);
        if templated {
            if self.context.template_mode {
                return Ok(Some(MapOutcome::Detected(Box::new(
                    self.template_map_image(mapping, repository, registry, tag, digest, path),
                ))));
            }
            if self.context.strict {
                return Ok(Some(MapOutcome::Unsupported(UnsupportedImage {
                    path: path.clone(),
                    kind: UnsupportedKind::MalformedMap,
                    error: Error::TemplateVariable {
                        value: repository.to_string(),
                    },
                })));
            }
            return Ok(Some(MapOutcome::Skip));
        }

        if repository.is_empty() {
            if self.context.strict {
                return Err(Error::InvalidRepositoryName {
                    name: String::new(),
                }
                .at_path(path.to_string()));
            }
            return Ok(Some(MapOutcome::Skip));
        }

        if tag.is_some() && digest.is_some() {
            return Err(Error::TagAndDigestPresent {
                reference: repository.to_string(),
            }
            .at_path(path.to_string()));
        }

        // registry precedence: explicit map value > registry prefix
        // embedded in the repository value > global override > default
        let embedded_registry = repository
            .split_once('/')
            .map(|(first, _)| first.contains('.') || first.contains(':') || first == "localhost")
            .unwrap_or(false);

        let mut candidate = String::new();
        match (registry, embedded_registry) {
            (Some(registry), _) => {
                candidate.push_str(registry);
                candidate.push('/');
            }
            (None, true) => {} // registry already part of the repository value
            (None, false) => {
                if let Some(global) = &self.context.global_registry {
                    debug!("applying global registry '{}' at '{}'", global, path);
                    candidate.push_str(global);
                    candidate.push('/');
                }
            }
        }
        candidate.push_str(repository);
        if let Some(tag) = tag {
            candidate.push(':');
            candidate.push_str(tag);
        } else if let Some(digest) = digest {
            candidate.push('@');
            candidate.push_str(digest);
        }

        // assembled fields always take the lenient path: the structure
        // already identified them, only component syntax remains
        let mut reference = parse(&candidate, false).map_err(|e| e.at_path(path.to_string()))?;
        reference.path = path.clone();

        if !self.in_scope(&reference) {
            if self.context.strict {
                return Ok(Some(MapOutcome::Unsupported(UnsupportedImage {
                    path: path.clone(),
                    kind: UnsupportedKind::NonSourceRegistry,
                    error: Error::NonSourceRegistry {
                        path: path.to_string(),
                    },
                })));
            }
            return Ok(Some(MapOutcome::Skip));
        }

        trace!("detected map image '{}' at '{}'", reference, path);
        Ok(Some(MapOutcome::Detected(Box::new(DetectedImage {
            reference,
            path: path.clone(),
            pattern: Pattern::Map,
            original: Value::Mapping(mapping.clone()),
        }))))
    }

    // =========================================================================
    // Template Preservation
    // =========================================================================

    /// Builds a template-pending detection for a templated string.
    ///
    /// Only the safely inferable split is performed: a literal
    /// registry/repository prefix is extracted when the template sits in
    /// the tag or digest position, and everything else is preserved
    /// verbatim. The reference is never normalized, so no default tag is
    /// invented for a value whose tag the template will supply.
    fn template_string_image(&self, value: &str, path: &TreePath) -> DetectedImage {
        let prefix_end = value.find(TEMPLATE_OPEN).unwrap_or(0);
        let prefix = &value[..prefix_end];

        let mut reference = Reference {
            original: value.to_string(),
            path: path.clone(),
            ..Reference::default()
        };

        let host_like =
            |s: &str| s.contains('.') || s.contains(':') || s == "localhost";

        if let Some(name) = prefix
            .strip_suffix(':')
            .or_else(|| prefix.strip_suffix('@'))
        {
            // template supplies the tag/digest; the name part is literal
            match name.split_once('/') {
                Some((first, rest)) if host_like(first) => {
                    reference.registry = Some(first.to_string());
                    reference.repository = rest.to_string();
                }
                _ => reference.repository = name.to_string(),
            }
        } else {
            match value.split_once('/') {
                Some((first, rest)) if host_like(first) && !first.contains(TEMPLATE_OPEN) => {
                    // literal registry, templated remainder
                    reference.registry = Some(first.to_string());
                    reference.repository = rest.to_string();
                }
                // template covers the name itself; preserve it whole
                _ => reference.repository = value.to_string(),
            }
        }

        trace!("preserving templated string at '{}'", path);
        DetectedImage {
            reference,
            path: path.clone(),
            pattern: Pattern::String,
            original: Value::String(value.to_string()),
        }
    }

    /// Builds a template-pending detection for a templated image map.
    fn template_map_image(
        &self,
        mapping: &Mapping,
        repository: &str,
        registry: Option<&str>,
        tag: Option<&str>,
        digest: Option<&str>,
        path: &TreePath,
    ) -> DetectedImage {
        let mut reference = Reference::new(repository);
        reference.registry = registry
            .map(str::to_string)
            .or_else(|| self.context.global_registry.clone());
        reference.tag = tag.map(str::to_string);
        reference.digest = digest.map(str::to_string);
        reference.original = reference.to_string();
        reference.path = path.clone();

        trace!("preserving templated map at '{}'", path);
        DetectedImage {
            reference,
            path: path.clone(),
            pattern: Pattern::Map,
            original: Value::Mapping(mapping.clone()),
        }
    }

    /// Scope check: when neither sources nor excludes are configured,
    /// everything is in scope; otherwise exclusion beats inclusion.
    fn in_scope(&self, reference: &Reference) -> bool {
        if self.context.source_registries.is_empty() && self.context.exclude_registries.is_empty() {
            return true;
        }
        is_source_registry(
            reference,
            &self.context.source_registries,
            &self.context.exclude_registries,
        )
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `repository` fields carrying source-control URLs are not images.
fn is_source_control_url(repository: &str) -> bool {
    repository.starts_with("http")
        || repository.starts_with("git@")
        || repository.ends_with(".git")
        || repository.contains("github.com")
}

/// Reads an optional string field from an image-shaped map. A missing
/// or null field is absent; any other non-string value is an authoring
/// error.
fn optional_string_field<'a>(
    mapping: &'a Mapping,
    key: &str,
    error: impl FnOnce() -> Error,
) -> Result<Option<&'a str>> {
    match mapping.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(error()),
    }
}
