use std::{cell::RefCell, rc::Rc};

use serde_json::{Value, json};

use super::support::assert_contains;
use crate::generator::{
  config::ConvertorConfig,
  errors::{ConversionError, WarningKind},
  orchestrator::Orchestrator,
};

fn catalogue(schemas: Value) -> Value {
  json!({
    "openapi": "3.0.3",
    "info": { "title": "Catalogue", "version": "2.1.0", "description": "Item catalogue\nwith search" },
    "paths": {
      "/items": {
        "get": {
          "operationId": "listItems",
          "parameters": [
            { "name": "sort", "in": "query", "schema": { "type": "string", "enum": ["asc", "desc"] } }
          ],
          "responses": {
            "200": {
              "description": "OK",
              "content": {
                "application/json": {
                  "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Item" } }
                }
              }
            },
            "default": {
              "description": "Failure",
              "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
            }
          }
        }
      }
    },
    "components": { "schemas": schemas }
  })
}

fn catalogue_schemas() -> Value {
  json!({
    "Item": { "type": "object", "properties": { "id": { "type": "integer" } } },
    "Error": { "type": "object", "properties": { "message": { "type": "string" } } },
    "Unused": { "type": "object", "properties": { "flag": { "type": "boolean" } } }
  })
}

#[test]
fn test_generate_with_header() {
  let mut orchestrator = Orchestrator::new(catalogue(catalogue_schemas()), ConvertorConfig::default());
  let output = orchestrator.generate_with_header("catalogue.json").expect("generation succeeds");

  assert!(
    output.code.starts_with(
      "/**\n * AUTO-GENERATED CODE - DO NOT EDIT!\n *\n * Catalogue\n * Source: catalogue.json\n * Version: 2.1.0\n * Generated by `oapi3ts`\n *\n * Item catalogue\n * with search\n */\n\n"
    ),
    "unexpected header:\n{}",
    output.code
  );
  assert!(
    output.code.ends_with(";\n") && !output.code.ends_with("\n\n"),
    "output ends with one newline"
  );
  assert!(!output.code.contains("\n\n\n"), "no runs of blank lines");
}

#[test]
fn test_only_reachable_models_by_default() {
  let mut orchestrator = Orchestrator::new(catalogue(catalogue_schemas()), ConvertorConfig::default());
  let output = orchestrator.generate().expect("generation succeeds");

  assert_contains(&output.code, "export interface Item {", "referenced model");
  assert!(!output.code.contains("Unused"), "unreferenced schema is skipped:\n{}", output.code);
  assert_eq!(output.operations.len(), 1);
  assert_eq!(output.operations[0].response_model_name.as_deref(), Some("ListItemsResponse"));
}

#[test]
fn test_include_all_schemas() {
  let config = ConvertorConfig::builder().include_all_schemas(true).build();
  let mut orchestrator = Orchestrator::new(catalogue(catalogue_schemas()), config);
  let output = orchestrator.generate().expect("generation succeeds");

  assert_contains(&output.code, "export interface Unused {\n  flag?: boolean;\n}", "unreferenced schema");
  assert_eq!(
    output.code.matches("export interface Item {").count(),
    1,
    "a component reached twice is emitted once"
  );
}

#[test]
fn test_component_colliding_with_entry_point_is_renamed() {
  let mut schemas = catalogue_schemas();
  schemas["ListItemsResponse"] = json!({ "type": "object", "properties": { "legacy": { "type": "boolean" } } });
  let config = ConvertorConfig::builder().include_all_schemas(true).build();
  let mut orchestrator = Orchestrator::new(catalogue(schemas), config);
  let output = orchestrator.generate().expect("generation succeeds");

  assert_contains(&output.code, "export type ListItemsResponse<", "entry point keeps its name");
  assert_contains(&output.code, "export interface ListItemsResponse2 {", "component gets a suffix");
}

#[test]
fn test_generation_stats() {
  let mut orchestrator = Orchestrator::new(catalogue(catalogue_schemas()), ConvertorConfig::default());
  let stats = orchestrator.generate().expect("generation succeeds").stats;

  assert_eq!(stats.operations_converted, 1);
  assert_eq!(stats.models_generated, 5, "parameters, sort enum, item, error, response");
  assert_eq!(stats.interfaces_generated, 3);
  assert_eq!(stats.enums_generated, 1);
  assert_eq!(stats.type_aliases_generated, 1);
  assert_eq!(stats.models_by_kind.get("object"), Some(&3));
  assert_eq!(stats.models_by_kind.get("generic"), Some(&1));
  assert_eq!(stats.cycles_detected, 0);
  assert!(stats.warnings.is_empty());
}

#[test]
fn test_cycles_are_reported() {
  let schemas = json!({
    "Item": { "type": "object", "properties": { "parent": { "$ref": "#/components/schemas/Item" } } },
    "Error": { "type": "object", "properties": { "cause": { "$ref": "#/components/schemas/Cause" } } },
    "Cause": { "type": "object", "properties": { "error": { "$ref": "#/components/schemas/Error" } } }
  });
  let mut orchestrator = Orchestrator::new(catalogue(schemas), ConvertorConfig::default());
  let output = orchestrator.generate().expect("generation succeeds");

  assert_eq!(output.stats.cycles_detected, 2);
  assert_eq!(
    output.stats.cycle_details,
    vec![vec!["Cause".to_string(), "ErrorModel".to_string()], vec!["Item".to_string()]]
  );
  assert_contains(&output.code, "  parent?: Item;", "self reference");
}

#[test]
fn test_warnings_reach_sink_and_stats() {
  let mut document = catalogue(catalogue_schemas());
  document["paths"]["/broken"] = json!("not a path item");
  let seen = Rc::new(RefCell::new(Vec::new()));
  let sink_seen = Rc::clone(&seen);

  let mut orchestrator = Orchestrator::new(document, ConvertorConfig::default())
    .with_warning_sink(Box::new(move |warning| sink_seen.borrow_mut().push(warning.kind)));
  let output = orchestrator.generate().expect("generation succeeds");

  assert_eq!(*seen.borrow(), vec![WarningKind::InvalidPathItem]);
  assert_eq!(output.stats.warnings.len(), 1);
  assert_eq!(output.stats.warnings[0].json_path, "#/paths/~1broken");
}

#[test]
fn test_fatal_warnings_abort_generation() {
  let mut document = catalogue(catalogue_schemas());
  document["paths"]["/broken"] = json!("not a path item");
  let config = ConvertorConfig::builder().warnings_fatal(true).build();

  let err = Orchestrator::new(document, config).generate().unwrap_err();
  assert!(
    matches!(err.downcast_ref::<ConversionError>(), Some(ConversionError::FatalWarning(_))),
    "got {err:?}"
  );
}

#[test]
fn test_metadata_requires_info() {
  let orchestrator = Orchestrator::new(json!({ "openapi": "3.0.3", "paths": {} }), ConvertorConfig::default());
  assert!(orchestrator.metadata().is_err());

  let orchestrator = Orchestrator::new(catalogue(json!({})), ConvertorConfig::default());
  let metadata = orchestrator.metadata().expect("info parses");
  assert_eq!(metadata.title, "Catalogue");
  assert_eq!(metadata.version, "2.1.0");
}
