//! # imagesift
//!
//! **Container Image Reference Detection for Configuration Trees**
//!
//! This crate locates, parses, validates, and canonicalizes container
//! image references embedded inside arbitrarily-nested, dynamically-typed
//! configuration trees — the kind produced by decoding Helm values
//! documents. It exists to support tooling that rewrites image references
//! to point at a different registry while leaving the rest of a
//! configuration tree untouched.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           imagesift                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                    Structural Detector                      │    │
//! │  │   values tree ──► detect() ──► (detected, unsupported)      │    │
//! │  │   map / sequence / string dispatch, path heuristics         │    │
//! │  └───────┬──────────────────┬──────────────────┬───────────────┘    │
//! │          │                  │                  │                    │
//! │  ┌───────┴──────┐   ┌───────┴───────┐   ┌──────┴────────┐           │
//! │  │    Parser    │   │  Normalizer   │   │ Scope Matcher │           │
//! │  │ strict gram. │   │ registry/tag  │   │ source/excl.  │           │
//! │  │ + lenient    │   │ defaults,     │   │ membership    │           │
//! │  │   fallback   │   │ library ns    │   │               │           │
//! │  └───────┬──────┘   └───────┬───────┘   └──────┬────────┘           │
//! │          └──────────────────┴──────────────────┘                    │
//! │                             │                                       │
//! │  ┌──────────────────────────┴──────────────────────────────────┐    │
//! │  │                   Syntax Validators                         │    │
//! │  │  registry names │ repository paths │ tags │ digests         │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Detection Model
//!
//! Image references appear in chart values in two structural shapes:
//!
//! | Shape | Example | Pattern |
//! |-------|---------|---------|
//! | String | `image: "nginx:1.25"` | [`Pattern::String`] |
//! | Map | `image: {repository: nginx, tag: "1.25"}` | [`Pattern::Map`] |
//!
//! The detector walks the tree depth-first, deciding at each string
//! whether the *path* (exact/suffix `image` keys, `images[n]` arrays,
//! workload container paths) or the *value shape* (strict tag- or
//! digest-shaped grammar match) justifies a parse attempt. Known
//! non-image paths (`*.port`, `*.enabled`, annotations, labels) always
//! win, so look-alike strings never become false positives.
//!
//! # Strict Mode
//!
//! Lenient detection surfaces only confident in-scope matches and drops
//! all noise. Strict detection produces a complete inventory: every
//! ambiguous or malformed candidate is reported as an
//! [`UnsupportedImage`] with a classified cause, so operators can review
//! everything the rewrite would not touch.
//!
//! # Concurrency
//!
//! The engine is synchronous and CPU-bound: no I/O, no network, no
//! suspension points. The only mutable traversal state is the global
//! registry override inside [`DetectionContext`], which is scoped to a
//! single [`Detector::detect`] call. Concurrent detections over
//! different trees need independent detectors.
//!
//! # Example
//!
//! ```rust,ignore
//! use imagesift::{DetectionContext, Detector};
//!
//! let values: serde_yaml::Value = serde_yaml::from_str(
//!     "image:\n  repository: nginx\n  tag: '1.25'\n",
//! )?;
//!
//! let mut detector = Detector::new(DetectionContext {
//!     source_registries: vec!["docker.io".to_string()],
//!     ..Default::default()
//! });
//!
//! let (detected, unsupported) = detector.detect(&values)?;
//! assert_eq!(detected[0].reference.to_string(), "docker.io/library/nginx:1.25");
//! ```

pub mod constants;
pub mod detector;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod path;
pub mod reference;
pub mod validation;

// Re-exports
pub use constants::{DEFAULT_REGISTRY, DEFAULT_TAG, LIBRARY_NAMESPACE};
pub use detector::{
    DetectedImage, DetectionContext, Detector, Pattern, UnsupportedImage, UnsupportedKind,
};
pub use error::{Error, ErrorKind, Result};
pub use normalize::{
    is_source_registry, normalize_reference, normalize_registry, sanitize_registry_for_path,
};
pub use parser::{looks_like_image_string, parse};
pub use path::{is_image_path, PathStep, TreePath};
pub use reference::Reference;
pub use validation::{
    is_valid_digest, is_valid_registry_name, is_valid_repository_name, is_valid_tag,
};
