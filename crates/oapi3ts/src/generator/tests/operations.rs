use http::Method;
use serde_json::{Value, json};

use super::support::{assert_contains, new_context, render_code};
use crate::generator::{
  config::ConvertorConfig,
  context::ConversionContext,
  convertor::{ConvertedOperation, Convertor},
  descriptor::DescriptorKind,
  errors::{ConversionError, Diagnostics, WarningKind},
  operations::OperationExtractor,
};

fn api(paths: Value) -> Value {
  json!({
    "openapi": "3.0.3",
    "info": { "title": "Items", "version": "1.0.0" },
    "paths": paths,
    "components": {
      "schemas": {
        "Item": { "type": "object", "properties": { "id": { "type": "integer" } } },
        "Error": { "type": "object", "properties": { "message": { "type": "string" } } }
      },
      "parameters": {
        "Limit": { "name": "limit", "in": "query", "schema": { "type": "integer" } }
      }
    }
  })
}

fn convert_operations(document: &Value, config: &ConvertorConfig) -> (ConversionContext, Vec<ConvertedOperation>) {
  let convertor = Convertor::new(document, config);
  let mut ctx = new_context(config);
  let operations = convertor.get_entry_points(&mut ctx).expect("operations convert");
  (ctx, operations)
}

fn warning_kinds(diagnostics: &Diagnostics) -> Vec<WarningKind> {
  diagnostics.warnings().iter().map(|warning| warning.kind).collect()
}

fn listing_document() -> Value {
  let mut document = api(json!({
    "/": {
      "get": {
        "operationId": "listItems",
        "summary": "List items",
        "tags": ["items"],
        "parameters": [
          { "name": "q", "in": "query", "required": true, "schema": { "type": "string" } },
          { "name": "cursor", "in": "query", "schema": { "type": "string", "nullable": true } },
          {
            "name": "sort",
            "in": "query",
            "description": "Sort order",
            "schema": { "type": "string", "enum": ["asc", "desc"] }
          }
        ],
        "responses": {
          "200": {
            "description": "A page of items",
            "content": {
              "application/json": {
                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Item" } }
              }
            }
          },
          "default": {
            "description": "Unexpected error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
          }
        }
      }
    }
  }));
  document["servers"] = json!([{ "url": "https://api.example.com/v1" }]);
  document
}

#[test]
fn test_listing_operation_end_to_end() {
  let document = listing_document();
  let config = ConvertorConfig::default();
  let (ctx, operations) = convert_operations(&document, &config);

  assert_eq!(operations.len(), 1);
  let operation = &operations[0];
  assert_eq!(operation.entry_points.len(), 2, "parameters and response only");

  let meta = &operation.meta;
  assert_eq!(meta.operation_id, "listItems");
  assert_eq!(meta.base_type_name, "ListItems");
  assert_eq!(meta.method, Method::GET);
  assert_eq!(meta.path, "/");
  assert_eq!(meta.query_params, vec!["q", "cursor", "sort"]);
  assert_eq!(meta.servers.len(), 1);
  assert_eq!(meta.servers[0].url, "https://api.example.com/v1");
  assert_eq!(meta.parameters_model_name.as_deref(), Some("ListItemsParameters"));
  assert_eq!(meta.response_model_name.as_deref(), Some("ListItemsResponse"));
  assert_eq!(meta.request_model_name, None);
  assert_eq!(meta.headers_model_name, None);
  assert_eq!(meta.summary.as_deref(), Some("List items"));
  assert_eq!(meta.tags, vec!["items"]);

  let parameters = ctx.get(operation.entry_points[0]);
  assert_eq!(parameters.model_name.as_deref(), Some("ListItemsParameters"));
  assert_eq!(parameters.schema.required, vec!["q"]);

  let response = ctx.get(operation.entry_points[1]);
  let DescriptorKind::Generic(shape) = &response.kind else {
    panic!("expected a generic response, got {}", response.kind.label());
  };
  let keys = shape.branches.iter().map(|branch| branch.key.as_str()).collect::<Vec<_>>();
  assert_eq!(keys, vec!["200", "default"]);
  assert_eq!(shape.default_key.as_deref(), Some("200"));

  let code = render_code(&ctx, &operation.entry_points);
  assert_contains(
    &code,
    "export interface ListItemsParameters {\n  q: string;\n  cursor?: string | null;\n  /** Sort order */\n  sort?: ListItemsParametersSort;\n}",
    "parameters interface",
  );
  assert_contains(
    &code,
    "export enum ListItemsParametersSort {\n  Asc = 'asc',\n  Desc = 'desc',\n}",
    "hoisted parameter enum",
  );
  assert_contains(
    &code,
    "export type ListItemsResponse<\n  TCode extends 200 | 'default' = 200,\n  TContentType extends 'application/json' = 'application/json',\n> = TCode extends 200\n  ? (TContentType extends 'application/json' ? Array<Item> : any) /* OK */\n  : TCode extends 'default'\n  ? (TContentType extends 'application/json' ? ErrorModel : any)\n  : any;",
    "response generic",
  );
  assert_contains(&code, "export interface Item {", "referenced item model");
  assert_contains(&code, "export interface ErrorModel {", "referenced error model");
}

#[test]
fn test_meta_info_serializes_camel_case() {
  let document = listing_document();
  let config = ConvertorConfig::default();
  let (_, operations) = convert_operations(&document, &config);

  let meta = serde_json::to_value(&operations[0].meta).expect("meta serializes");
  assert_eq!(meta["operationId"], json!("listItems"));
  assert_eq!(meta["method"], json!("GET"));
  assert_eq!(meta["queryParams"], json!(["q", "cursor", "sort"]));
  assert_eq!(meta["responseModelName"], json!("ListItemsResponse"));
  assert!(meta.get("requestModelName").is_none());
  assert_eq!(meta["servers"][0]["url"], json!("https://api.example.com/v1"));
}

#[test]
fn test_request_body_headers_and_empty_content() {
  let document = api(json!({
    "/pets": {
      "post": {
        "operationId": "createPet",
        "requestBody": {
          "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/Item" } },
            "text/plain": { "schema": { "type": "string" } }
          }
        },
        "responses": {
          "201": {
            "description": "Created",
            "headers": {
              "X-Rate-Limit": { "description": "Calls left", "required": true, "schema": { "type": "integer" } }
            }
          }
        }
      }
    }
  }));
  let config = ConvertorConfig::default();
  let (ctx, operations) = convert_operations(&document, &config);
  let operation = &operations[0];

  assert_eq!(operation.entry_points.len(), 3);
  assert_eq!(operation.meta.request_model_name.as_deref(), Some("CreatePetRequest"));
  assert_eq!(operation.meta.headers_model_name.as_deref(), Some("CreatePetHeaders"));
  assert!(operation.meta.query_params.is_empty());

  let code = render_code(&ctx, &operation.entry_points);
  assert_contains(
    &code,
    "export type CreatePetRequest<\n  TContentType extends 'application/json' | 'text/plain' = 'application/json',\n> = TContentType extends 'application/json'\n  ? Item\n  : TContentType extends 'text/plain'\n  ? string\n  : any;",
    "request generic",
  );
  assert_contains(
    &code,
    "  ? (TContentType extends 'application/json' ? /* Created */ null : any) /* Created */",
    "empty content falls back to documented null",
  );
  assert_contains(
    &code,
    "export interface CreatePetHeaders {\n  /** Calls left */\n  'X-Rate-Limit': number;\n}",
    "headers interface",
  );
}

#[test]
fn test_parameter_merge_and_references() {
  let document = api(json!({
    "/pets/{petId}": {
      "parameters": [
        { "name": "petId", "in": "path", "schema": { "type": "string" } },
        { "name": "verbose", "in": "query", "schema": { "type": "boolean" } }
      ],
      "get": {
        "operationId": "getPet",
        "parameters": [
          { "name": "verbose", "in": "query", "required": true, "schema": { "type": "boolean" } },
          { "$ref": "#/components/parameters/Limit" }
        ],
        "responses": { "200": { "description": "OK" } }
      }
    }
  }));
  let config = ConvertorConfig::default();
  let (ctx, operations) = convert_operations(&document, &config);
  let operation = &operations[0];

  assert_eq!(operation.meta.query_params, vec!["verbose", "limit"]);
  let parameters = ctx.get(operation.entry_points[0]);
  assert_eq!(parameters.schema.required, vec!["petId", "verbose"]);

  let code = render_code(&ctx, &operation.entry_points[..1]);
  assert_eq!(
    code,
    "export interface GetPetParameters {\n  petId: string;\n  verbose: boolean;\n  limit?: number;\n}"
  );
}

#[test]
fn test_servers_fall_back_and_override() {
  let document = api(json!({
    "/a": { "get": { "operationId": "getA" } },
    "/b": {
      "servers": [{ "url": "https://b.example.com" }],
      "get": { "operationId": "getB" },
      "put": { "operationId": "putB", "servers": [{ "url": "https://put.example.com" }] }
    }
  }));
  let config = ConvertorConfig::default();
  let operations = OperationExtractor::new(&document, &config)
    .extract(&mut Diagnostics::default())
    .expect("extraction succeeds");

  let urls = operations
    .iter()
    .map(|operation| (operation.meta.operation_id.as_str(), operation.meta.servers[0].url.as_str()))
    .collect::<Vec<_>>();
  assert_eq!(
    urls,
    vec![
      ("getA", "/"),
      ("getB", "https://b.example.com"),
      ("putB", "https://put.example.com"),
    ]
  );
}

#[test]
fn test_server_without_url_aborts() {
  let mut document = api(json!({ "/a": { "get": { "operationId": "getA" } } }));
  document["servers"] = json!([{ "description": "no url" }]);
  let config = ConvertorConfig::default();

  let err = OperationExtractor::new(&document, &config)
    .extract(&mut Diagnostics::default())
    .unwrap_err();
  assert_eq!(
    err,
    ConversionError::MissingServerUrl {
      json_path: "#/servers/0".to_string()
    }
  );
}

#[test]
fn test_non_list_servers_warn() {
  let mut document = api(json!({ "/a": { "get": { "operationId": "getA" } } }));
  document["servers"] = json!({ "url": "https://example.com" });
  let config = ConvertorConfig::default();
  let mut diagnostics = Diagnostics::default();

  let operations = OperationExtractor::new(&document, &config)
    .extract(&mut diagnostics)
    .expect("extraction succeeds");
  assert_eq!(warning_kinds(&diagnostics), vec![WarningKind::InvalidServers]);
  assert_eq!(operations[0].meta.servers[0].url, "/");
}

#[test]
fn test_missing_paths_aborts() {
  let document = json!({ "openapi": "3.0.3", "info": { "title": "Empty", "version": "1" } });
  let config = ConvertorConfig::default();

  let err = OperationExtractor::new(&document, &config)
    .extract(&mut Diagnostics::default())
    .unwrap_err();
  assert_eq!(err, ConversionError::MissingPaths);
}

#[test]
fn test_malformed_path_items_are_skipped() {
  let document = api(json!({
    "": { "get": { "operationId": "nothing" } },
    "/text": "not a path item",
    "/b": { "get": 5, "post": { "operationId": "createB" } }
  }));
  let config = ConvertorConfig::default();
  let mut diagnostics = Diagnostics::default();

  let operations = OperationExtractor::new(&document, &config)
    .extract(&mut diagnostics)
    .expect("extraction succeeds");
  assert_eq!(
    warning_kinds(&diagnostics),
    vec![
      WarningKind::EmptyPathKey,
      WarningKind::InvalidPathItem,
      WarningKind::InvalidOperation,
    ]
  );
  assert!(diagnostics.warnings().iter().all(|warning| warning.is_skipped_item()));
  assert_eq!(operations.len(), 1);
  assert_eq!(operations[0].meta.operation_id, "createB");
}

#[test]
fn test_fatal_warnings_abort_extraction() {
  let document = api(json!({ "/text": "not a path item" }));
  let config = ConvertorConfig::builder().warnings_fatal(true).build();

  let err = OperationExtractor::new(&document, &config)
    .extract(&mut Diagnostics::new(true))
    .unwrap_err();
  assert!(
    matches!(err, ConversionError::FatalWarning(ref warning) if warning.kind == WarningKind::InvalidPathItem),
    "got {err:?}"
  );
}

#[test]
fn test_fatal_parameter_ref_names_the_operation() {
  let document = api(json!({
    "/a": {
      "get": {
        "operationId": "getA",
        "parameters": [{ "$ref": "#/components/parameters/Missing" }]
      }
    }
  }));
  let config = ConvertorConfig::builder().warnings_fatal(true).build();

  let err = OperationExtractor::new(&document, &config)
    .extract(&mut Diagnostics::new(true))
    .unwrap_err();
  match err {
    ConversionError::Operation { operation, json_path, source } => {
      assert_eq!(operation, "getA");
      assert_eq!(json_path, "#/paths/~1a/get");
      assert!(
        matches!(
          *source,
          ConversionError::FatalWarning(ref warning)
            if warning.kind == WarningKind::UnresolvedRef && warning.json_path == "#/paths/~1a/get/parameters/0"
        ),
        "got {source:?}"
      );
    }
    other => panic!("expected an operation error, got {other:?}"),
  }
}

#[test]
fn test_missing_operation_id_is_synthesized() {
  let document = api(json!({ "/pets/{petId}": { "get": { "responses": {} } } }));
  let config = ConvertorConfig::default();
  let mut diagnostics = Diagnostics::default();

  let operations = OperationExtractor::new(&document, &config)
    .extract(&mut diagnostics)
    .expect("extraction succeeds");
  assert_eq!(warning_kinds(&diagnostics), vec![WarningKind::MissingOperationId]);
  assert_eq!(operations[0].meta.base_type_name, "GetPetsByPetId");
  assert_eq!(operations[0].meta.operation_id, "GetPetsByPetId");
  assert!(operations[0].response.is_none(), "no responses means no response schema");
}

#[test]
fn test_duplicate_operation_names_get_suffixes() {
  let document = api(json!({
    "/a": { "get": { "operationId": "getThing", "responses": { "200": { "description": "OK" } } } },
    "/b": { "get": { "operationId": "getThing", "responses": { "200": { "description": "OK" } } } }
  }));
  let config = ConvertorConfig::default();
  let (ctx, operations) = convert_operations(&document, &config);

  let names = operations
    .iter()
    .map(|operation| operation.meta.response_model_name.clone().unwrap_or_default())
    .collect::<Vec<_>>();
  assert_eq!(names, vec!["GetThingResponse", "GetThing2Response"]);
  assert_eq!(warning_kinds(&ctx.diagnostics), vec![WarningKind::DuplicateModelName]);
}

#[test]
fn test_invalid_status_keys_are_skipped() {
  let document = api(json!({
    "/a": {
      "get": {
        "operationId": "getA",
        "responses": {
          "2XX": { "description": "Success" },
          "often": { "description": "Not a status" }
        }
      }
    }
  }));
  let config = ConvertorConfig::default();
  let (ctx, operations) = convert_operations(&document, &config);

  assert_eq!(warning_kinds(&ctx.diagnostics), vec![WarningKind::InvalidStatusCode]);
  let code = render_code(&ctx, &operations[0].entry_points);
  assert_contains(&code, "  TCode extends '2XX' = '2XX',", "range key");
  assert!(!code.contains("often"), "invalid key is dropped:\n{code}");
}

#[test]
fn test_conversion_errors_name_the_operation() {
  let document = api(json!({
    "/remote": {
      "get": {
        "operationId": "getRemote",
        "responses": {
          "200": {
            "description": "OK",
            "content": { "application/json": { "schema": { "$ref": "shared.yaml#/Thing" } } }
          }
        }
      }
    }
  }));
  let config = ConvertorConfig::default();
  let convertor = Convertor::new(&document, &config);
  let mut ctx = new_context(&config);

  let err = convertor.get_entry_points(&mut ctx).unwrap_err();
  match err {
    ConversionError::Operation { operation, json_path, source } => {
      assert_eq!(operation, "getRemote");
      assert_eq!(json_path, "#/paths/~1remote/get");
      assert!(matches!(*source, ConversionError::MissingForeignResolver { .. }), "got {source:?}");
    }
    other => panic!("expected an operation error, got {other:?}"),
  }
}
