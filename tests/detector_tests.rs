//! Tests for structural image detection over values trees.
//!
//! Fixtures are written as YAML documents and decoded with serde_yaml,
//! mirroring how chart values reach the detector in practice.

use imagesift::{
    DetectedImage, DetectionContext, Detector, ErrorKind, Pattern, UnsupportedImage,
    UnsupportedKind,
};
use serde_yaml::Value;

fn detect_with(
    yaml: &str,
    context: DetectionContext,
) -> (Vec<DetectedImage>, Vec<UnsupportedImage>) {
    let values: Value = serde_yaml::from_str(yaml).expect("fixture must be valid YAML");
    Detector::new(context)
        .detect(&values)
        .expect("fixture must not abort traversal")
}

fn detect(yaml: &str) -> (Vec<DetectedImage>, Vec<UnsupportedImage>) {
    detect_with(yaml, DetectionContext::default())
}

fn strict() -> DetectionContext {
    DetectionContext {
        strict: true,
        ..Default::default()
    }
}

// =============================================================================
// Map Pattern
// =============================================================================

#[test]
fn test_image_map_detection() {
    let (detected, unsupported) = detect(
        r#"
image:
  repository: nginx
  tag: "1.25"
"#,
    );

    assert!(unsupported.is_empty());
    assert_eq!(detected.len(), 1);
    let image = &detected[0];
    assert_eq!(image.pattern, Pattern::Map);
    assert_eq!(image.path.to_string(), "image");
    assert_eq!(image.reference.to_string(), "docker.io/library/nginx:1.25");
}

#[test]
fn test_image_map_with_explicit_registry() {
    let (detected, _) = detect(
        r#"
image:
  registry: quay.io
  repository: prometheus/node-exporter
  tag: v1.7.0
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(
        detected[0].reference.to_string(),
        "quay.io/prometheus/node-exporter:v1.7.0"
    );
}

#[test]
fn test_image_map_with_digest() {
    let digest = format!("sha256:{}", "ab".repeat(32));
    let yaml = format!(
        r#"
image:
  repository: nginx
  digest: "{}"
"#,
        digest
    );
    let (detected, _) = detect(&yaml);

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.digest.as_deref(), Some(digest.as_str()));
    assert_eq!(
        detected[0].reference.tag, None,
        "digest-pinned maps get no default tag"
    );
}

#[test]
fn test_image_map_keys_are_not_revisited() {
    // the tag and repository of a confirmed image map must not surface
    // again as independent string candidates
    let (detected, unsupported) = detect_with(
        r#"
app:
  image:
    repository: quay.io/org/app
    tag: v2
"#,
        strict(),
    );

    assert_eq!(detected.len(), 1);
    assert!(unsupported.is_empty());
}

#[test]
fn test_direct_image_string_suppresses_map_extraction() {
    // a direct `image` string key wins over sibling repository/tag fields
    let (detected, unsupported) = detect_with(
        r#"
app:
  image: nginx:1.25
  repository: something-else
  tag: unrelated
"#,
        strict(),
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].path.to_string(), "app.image");
    assert_eq!(detected[0].pattern, Pattern::String);
    assert_eq!(detected[0].reference.repository, "library/nginx");
    assert!(
        unsupported.is_empty(),
        "sibling repository/tag fields must be suppressed, got {:?}",
        unsupported
    );
}

#[test]
fn test_source_control_repository_is_not_an_image() {
    let (detected, unsupported) = detect_with(
        r#"
source:
  repository: https://github.com/org/repo
  tag: v1.0.0
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert!(unsupported.is_empty());
}

// =============================================================================
// Map Pattern: Structural Errors
// =============================================================================

#[test]
fn test_non_string_repository_aborts_traversal() {
    let values: Value = serde_yaml::from_str(
        r#"
app:
  image:
    repository: 123
    tag: v1
"#,
    )
    .unwrap();

    let err = Detector::new(DetectionContext::default())
        .detect(&values)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImageMapRepo);
    assert!(
        err.to_string().contains("app.image"),
        "error must carry the tree path: {}",
        err
    );
}

#[test]
fn test_non_string_tag_aborts_traversal() {
    let values: Value = serde_yaml::from_str(
        r#"
image:
  repository: nginx
  tag: 1.25
"#,
    )
    .unwrap();

    // an unquoted numeric tag decodes as a number, not a string
    let err = Detector::new(DetectionContext::default())
        .detect(&values)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImageMapTagType);
}

#[test]
fn test_map_tag_and_digest_abort_traversal() {
    let yaml = format!(
        r#"
image:
  repository: nginx
  tag: v1
  digest: "sha256:{}"
"#,
        "cd".repeat(32)
    );
    let values: Value = serde_yaml::from_str(&yaml).unwrap();

    let err = Detector::new(DetectionContext::default())
        .detect(&values)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TagAndDigestPresent);
}

#[test]
fn test_empty_repository_strict_vs_lenient() {
    let yaml = r#"
image:
  repository: ""
  tag: v1
"#;
    let (detected, unsupported) = detect(yaml);
    assert!(detected.is_empty());
    assert!(unsupported.is_empty());

    let values: Value = serde_yaml::from_str(yaml).unwrap();
    let err = Detector::new(strict()).detect(&values).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRepositoryName);
}

#[test]
fn test_null_repository_is_ordinary_mapping() {
    let (detected, unsupported) = detect_with(
        r#"
config:
  repository: null
  other: value
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert!(unsupported.is_empty());
}

// =============================================================================
// String Pattern
// =============================================================================

#[test]
fn test_image_path_string_detection() {
    let (detected, _) = detect(
        r#"
sidecar:
  image: busybox
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].path.to_string(), "sidecar.image");
    assert_eq!(
        detected[0].reference.to_string(),
        "docker.io/library/busybox:latest"
    );
    assert_eq!(detected[0].original, Value::String("busybox".to_string()));
}

#[test]
fn test_kubernetes_container_paths() {
    let (detected, unsupported) = detect_with(
        r#"
spec:
  template:
    spec:
      containers:
        - name: app
          image: nginx:1.25
        - name: helper
          image: quay.io/org/helper:v3
"#,
        strict(),
    );

    assert!(unsupported.is_empty());
    assert_eq!(detected.len(), 2);
    assert_eq!(
        detected[0].path.to_string(),
        "spec.template.spec.containers[0].image"
    );
    assert_eq!(
        detected[1].path.to_string(),
        "spec.template.spec.containers[1].image"
    );
}

#[test]
fn test_non_image_paths_win_over_value_shape() {
    // each value would parse as repo:tag, but the path says otherwise
    let (detected, unsupported) = detect_with(
        r#"
db:
  port: "5432:5432"
app:
  annotations:
    checksum/config: abc123
  labels:
    app.kubernetes.io/name: web
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert!(
        unsupported.is_empty(),
        "suppressed paths must not surface even in strict mode: {:?}",
        unsupported
    );
}

#[test]
fn test_ambiguous_string_strict() {
    let (detected, unsupported) = detect_with(
        r#"
app:
  weirdField: foo:bar
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].kind, UnsupportedKind::AmbiguousPath);
    assert_eq!(unsupported[0].path.to_string(), "app.weirdField");
}

#[test]
fn test_ambiguous_string_lenient_is_detected() {
    // lenient mode trusts the value shape when the path says nothing
    let (detected, unsupported) = detect(
        r#"
app:
  weirdField: foo:bar
"#,
    );

    assert!(unsupported.is_empty());
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.repository, "library/foo");
}

#[test]
fn test_plain_prose_is_ignored() {
    let (detected, unsupported) = detect_with(
        r#"
app:
  description: a web server
  replicaCount: 3
  enabled: true
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert!(unsupported.is_empty());
}

#[test]
fn test_malformed_string_at_image_path_strict() {
    let (detected, unsupported) = detect_with(
        r#"
app:
  image: "bad image ref"
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].kind, UnsupportedKind::MalformedString);
    assert_eq!(
        unsupported[0].error.kind(),
        ErrorKind::InvalidImageReference
    );
}

#[test]
fn test_malformed_string_at_image_path_lenient() {
    let (detected, unsupported) = detect(
        r#"
app:
  image: "bad image ref"
"#,
    );

    assert!(detected.is_empty());
    assert!(unsupported.is_empty());
}

// =============================================================================
// Registry Scope
// =============================================================================

fn scoped(sources: &[&str], excludes: &[&str]) -> DetectionContext {
    DetectionContext {
        source_registries: sources.iter().map(|s| s.to_string()).collect(),
        exclude_registries: excludes.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn test_source_registry_filtering() {
    let yaml = r#"
first:
  image: docker.io/library/nginx:1.25
second:
  image: quay.io/org/app:v1
"#;

    let (detected, _) = detect_with(yaml, scoped(&["docker.io"], &[]));
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].path.to_string(), "first.image");
}

#[test]
fn test_index_docker_io_matches_docker_io_source() {
    let (detected, _) = detect_with(
        r#"
app:
  image: index.docker.io/library/nginx:1.25
"#,
        scoped(&["docker.io"], &[]),
    );

    assert_eq!(detected.len(), 1);
}

#[test]
fn test_exclusion_beats_inclusion() {
    let (detected, _) = detect_with(
        r#"
app:
  image: quay.io/org/app:v1
"#,
        scoped(&["quay.io"], &["quay.io"]),
    );

    assert!(detected.is_empty());
}

#[test]
fn test_out_of_scope_strict_is_reported() {
    let mut context = scoped(&["docker.io"], &[]);
    context.strict = true;

    let (detected, unsupported) = detect_with(
        r#"
app:
  image: quay.io/org/app:v1
"#,
        context,
    );

    assert!(detected.is_empty());
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].kind, UnsupportedKind::NonSourceRegistry);
}

#[test]
fn test_out_of_scope_map_strict_is_reported() {
    let mut context = scoped(&["docker.io"], &[]);
    context.strict = true;

    let (detected, unsupported) = detect_with(
        r#"
image:
  registry: quay.io
  repository: org/app
  tag: v1
"#,
        context,
    );

    assert!(detected.is_empty());
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].kind, UnsupportedKind::NonSourceRegistry);
}

// =============================================================================
// Global Registry
// =============================================================================

#[test]
fn test_global_registry_applies_to_bare_maps() {
    let (detected, _) = detect(
        r#"
global:
  imageRegistry: registry.example.com
app:
  image:
    repository: org/app
    tag: v1
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(
        detected[0].reference.registry.as_deref(),
        Some("registry.example.com")
    );
}

#[test]
fn test_explicit_registry_beats_global() {
    let (detected, _) = detect(
        r#"
global:
  imageRegistry: registry.example.com
app:
  image:
    registry: quay.io
    repository: org/app
    tag: v1
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.registry.as_deref(), Some("quay.io"));
}

#[test]
fn test_embedded_registry_beats_global() {
    let (detected, _) = detect(
        r#"
global:
  imageRegistry: registry.example.com
app:
  image:
    repository: quay.io/org/app
    tag: v1
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.registry.as_deref(), Some("quay.io"));
}

#[test]
fn test_global_registry_does_not_apply_to_strings() {
    // bare strings still default to docker.io; the override only fills
    // in for maps that name no registry
    let (detected, _) = detect(
        r#"
global:
  imageRegistry: registry.example.com
app:
  image: nginx:1.25
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.registry.as_deref(), Some("docker.io"));
}

#[test]
fn test_global_registry_does_not_outlive_its_tree() {
    let with_global: Value = serde_yaml::from_str(
        r#"
global:
  imageRegistry: registry.example.com
app:
  image:
    repository: org/app
    tag: v1
"#,
    )
    .unwrap();
    let without_global: Value = serde_yaml::from_str(
        r#"
app:
  image:
    repository: org/app
    tag: v1
"#,
    )
    .unwrap();

    let mut detector = Detector::new(DetectionContext::default());

    let (detected, _) = detector.detect(&with_global).unwrap();
    assert_eq!(
        detected[0].reference.registry.as_deref(),
        Some("registry.example.com")
    );

    let (detected, _) = detector.detect(&without_global).unwrap();
    assert_eq!(
        detected[0].reference.registry.as_deref(),
        Some("docker.io"),
        "a seeded override must not carry over to the next traversal"
    );
}

#[test]
fn test_configured_global_registry_survives_detection() {
    let context = DetectionContext {
        global_registry: Some("configured.example.com".to_string()),
        ..Default::default()
    };
    let values: Value = serde_yaml::from_str(
        r#"
app:
  image:
    repository: org/app
    tag: v1
"#,
    )
    .unwrap();

    let mut detector = Detector::new(context);
    detector.detect(&values).unwrap();

    assert_eq!(
        detector.context().global_registry.as_deref(),
        Some("configured.example.com"),
        "detection must restore the caller-configured override"
    );
}

#[test]
fn test_non_root_global_is_ignored() {
    let (detected, _) = detect(
        r#"
app:
  global:
    imageRegistry: registry.example.com
  image:
    repository: org/app
    tag: v1
"#,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.registry.as_deref(), Some("docker.io"));
}

// =============================================================================
// Templates
// =============================================================================

#[test]
fn test_templated_string_skipped_leniently() {
    let (detected, unsupported) = detect(
        r#"
app:
  image: "docker.io/nginx:{{ .Values.tag }}"
"#,
    );

    assert!(detected.is_empty());
    assert!(unsupported.is_empty());
}

#[test]
fn test_templated_string_reported_strictly() {
    let (detected, unsupported) = detect_with(
        r#"
app:
  image: "docker.io/nginx:{{ .Values.tag }}"
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].kind, UnsupportedKind::MalformedString);
    assert_eq!(unsupported[0].error.kind(), ErrorKind::TemplateVariable);
}

#[test]
fn test_template_mode_preserves_templated_tag() {
    let context = DetectionContext {
        template_mode: true,
        ..Default::default()
    };
    let (detected, _) = detect_with(
        r#"
app:
  image: "docker.io/nginx:{{ .Values.tag }}"
"#,
        context,
    );

    assert_eq!(detected.len(), 1);
    let reference = &detected[0].reference;
    assert_eq!(reference.registry.as_deref(), Some("docker.io"));
    assert_eq!(reference.repository, "nginx");
    assert_eq!(
        reference.tag, None,
        "no default tag may be invented for a template-supplied tag"
    );
    assert_eq!(reference.original, "docker.io/nginx:{{ .Values.tag }}");
    assert!(!reference.detected);
}

#[test]
fn test_template_mode_preserves_fully_templated_value() {
    let context = DetectionContext {
        template_mode: true,
        ..Default::default()
    };
    let (detected, _) = detect_with(
        r#"
app:
  image: "{{ .Values.image }}"
"#,
        context,
    );

    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].reference.repository, "{{ .Values.image }}");
}

#[test]
fn test_template_mode_preserves_templated_map() {
    let context = DetectionContext {
        template_mode: true,
        ..Default::default()
    };
    let (detected, _) = detect_with(
        r#"
global:
  imageRegistry: registry.example.com
app:
  image:
    repository: org/app
    tag: "{{ .Chart.AppVersion }}"
"#,
        context,
    );

    assert_eq!(detected.len(), 1);
    let reference = &detected[0].reference;
    assert_eq!(reference.registry.as_deref(), Some("registry.example.com"));
    assert_eq!(reference.repository, "org/app");
    assert_eq!(reference.tag.as_deref(), Some("{{ .Chart.AppVersion }}"));
}

#[test]
fn test_templated_map_strict_without_template_mode() {
    let (detected, unsupported) = detect_with(
        r#"
app:
  image:
    repository: org/app
    tag: "{{ .Chart.AppVersion }}"
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].kind, UnsupportedKind::MalformedMap);
    assert_eq!(unsupported[0].error.kind(), ErrorKind::TemplateVariable);
}

// =============================================================================
// Traversal Order
// =============================================================================

#[test]
fn test_results_are_in_document_order() {
    let (detected, _) = detect(
        r#"
alpha:
  image: nginx:1.25
beta:
  sidecars:
    - image: busybox:1.36
    - image: alpine:3.19
gamma:
  image:
    repository: org/app
    tag: v1
"#,
    );

    let paths: Vec<String> = detected.iter().map(|d| d.path.to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "alpha.image",
            "beta.sidecars[0].image",
            "beta.sidecars[1].image",
            "gamma.image",
        ]
    );
}

// =============================================================================
// Result Serialization
// =============================================================================

#[test]
fn test_detection_results_serialize_to_json() {
    let (detected, unsupported) = detect_with(
        r#"
app:
  image: nginx:1.25
  weirdField: foo:bar
"#,
        strict(),
    );

    let json = serde_json::to_value(&detected[0]).unwrap();
    assert_eq!(json["pattern"], "string");
    assert_eq!(json["path"], serde_json::json!(["app", "image"]));
    assert_eq!(json["reference"]["repository"], "library/nginx");
    assert_eq!(json["original"], "nginx:1.25");

    let json = serde_json::to_value(&unsupported[0]).unwrap();
    assert_eq!(json["kind"], "ambiguous-path");
    assert!(json["error"].is_string());
}

#[test]
fn test_scalar_leaves_are_ignored() {
    let (detected, unsupported) = detect_with(
        r#"
replicas: 3
enabled: true
threshold: 0.5
nothing: null
"#,
        strict(),
    );

    assert!(detected.is_empty());
    assert!(unsupported.is_empty());
}
