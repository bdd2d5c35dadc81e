use insta::assert_snapshot;
use openapi_bundle::{
    BundleError, BundleOptions, CollisionPolicy, Format, FsSink, FsSource, MemorySource, bundle_source,
    bundle_to,
};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn bundles_components_into_the_entrypoint() {
    let source: MemorySource = [
        (
            "api.yml",
            r#"
openapi: 3.0.3
paths:
  /health:
    get:
      responses:
        default:
          $ref: 'common.yml#/components/responses/Problem'
"#,
        ),
        (
            "common.yml",
            r#"
components:
  responses:
    Problem:
      description: Something went wrong
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/Detail'
  schemas:
    Detail:
      type: object
"#,
        ),
    ]
    .into_iter()
    .collect();

    let bundle = bundle_source(&source, Path::new(""), &BundleOptions::new("api.yml")).unwrap();
    assert!(bundle.report.is_clean());

    let rendered = bundle.render(Format::Json).unwrap();
    assert_snapshot!(rendered.trim_end(), @r##"
    {
      "openapi": "3.0.3",
      "paths": {
        "/health": {
          "get": {
            "responses": {
              "default": {
                "$ref": "#/components/responses/common_Problem"
              }
            }
          }
        }
      },
      "components": {
        "responses": {
          "common_Problem": {
            "description": "Something went wrong",
            "content": {
              "application/json": {
                "schema": {
                  "$ref": "#/components/schemas/common_Detail"
                }
              }
            }
          }
        },
        "schemas": {
          "common_Detail": {
            "type": "object"
          }
        }
      }
    }
    "##);
}

#[test]
fn writes_the_bundle_through_the_sink() {
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("dist").join("openapi.json");

    let report = bundle_to(
        &FsSource::new(fixture("petstore")),
        Path::new(""),
        &BundleOptions::new("api.yml"),
        &FsSink,
        &output,
        Format::Json,
    )
    .unwrap();

    assert_eq!(report.diagnostics.documents_loaded, 5);
    assert_eq!(report.diagnostics.refs_inlined, 2);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let mut parameters: Vec<_> = written["components"]["parameters"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    parameters.sort();
    assert_eq!(parameters, vec!["PetId", "common_Limit"]);
}

#[test]
fn bundling_a_bundle_changes_nothing() {
    let first = bundle_source(
        &FsSource::new(fixture("petstore")),
        Path::new(""),
        &BundleOptions::new("api.yml"),
    )
    .unwrap();
    let rendered = first.render(Format::Yaml).unwrap();

    let source: MemorySource = [("api.yml", rendered.as_str())].into_iter().collect();
    let second = bundle_source(&source, Path::new(""), &BundleOptions::new("api.yml")).unwrap();

    assert_eq!(second.document, first.document);
    assert_eq!(second.report.diagnostics.refs_inlined, 0);
}

#[test]
fn collision_policy_error_aborts_the_run() {
    let source: MemorySource = [
        (
            "api.yml",
            r#"
x-first: {$ref: 'v1/common.yml#/components/schemas/Id'}
x-second: {$ref: 'v2/common.yml#/components/schemas/Id'}
"#,
        ),
        ("v1/common.yml", "components: {schemas: {Id: {type: integer}}}"),
        ("v2/common.yml", "components: {schemas: {Id: {type: string}}}"),
    ]
    .into_iter()
    .collect();

    let options = BundleOptions::new("api.yml").with_collision_policy(CollisionPolicy::Error);
    let err = bundle_source(&source, Path::new(""), &options).unwrap_err();
    assert!(matches!(err, BundleError::NameCollision { ref name, .. } if name == "common_Id"));

    let bundle = bundle_source(&source, Path::new(""), &BundleOptions::new("api.yml")).unwrap();
    assert_eq!(bundle.report.collisions.len(), 1);
}

#[test]
fn missing_root_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = FsSource::new(dir.path().join("nope"));
    let err = bundle_source(&source, Path::new(""), &BundleOptions::new("api.yml")).unwrap_err();
    assert!(matches!(err, BundleError::Source(_)));
}
