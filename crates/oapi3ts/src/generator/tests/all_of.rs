use serde_json::json;

use super::support::{assert_contains, components, convert_component, new_context, render_components, single};
use crate::generator::{
  config::ConvertorConfig,
  convertor::Convertor,
  descriptor::{AllOfShape, DescriptorKind},
};

#[test]
fn test_anonymous_members_merge_into_one_interface() {
  let document = components(json!({
    "Combined": {
      "allOf": [
        { "type": "object", "properties": { "a": { "type": "string" } } },
        { "type": "object", "properties": { "b": { "type": "number" } }, "required": ["a"] }
      ]
    }
  }));
  let code = render_components(&document, &["Combined"]);
  assert_eq!(code, "export interface Combined {\n  a: string;\n  b?: number;\n}");
}

#[test]
fn test_required_member_sharpens_inherited_property() {
  let document = components(json!({
    "Base": {
      "type": "object",
      "properties": { "x": { "type": "string" }, "y": { "type": "string" } }
    },
    "Derived": {
      "allOf": [{ "$ref": "#/components/schemas/Base" }, { "required": ["x"] }]
    }
  }));
  let code = render_components(&document, &["Derived"]);

  assert_contains(&code, "export interface Derived extends Base {\n  x: string;\n}", "sharpened override");
  assert_contains(&code, "export interface Base {\n  x?: string;\n  y?: string;\n}", "untouched base");
}

#[test]
fn test_named_members_become_extends_targets() {
  let document = components(json!({
    "Named": { "type": "object", "properties": { "name": { "type": "string" } } },
    "Aged": { "type": "object", "properties": { "age": { "type": "integer" } } },
    "Person": {
      "description": "A person",
      "allOf": [
        { "$ref": "#/components/schemas/Named" },
        { "$ref": "#/components/schemas/Aged" },
        { "properties": { "email": { "type": "string" } } }
      ]
    }
  }));
  let code = render_components(&document, &["Person"]);

  assert_contains(
    &code,
    "/** A person */\nexport interface Person extends Named, Aged {\n  email?: string;\n}",
    "multiple inheritance",
  );
}

#[test]
fn test_sibling_keywords_fold_into_local_object() {
  let document = components(json!({
    "Base": { "type": "object", "properties": { "id": { "type": "integer" } } },
    "Extended": {
      "allOf": [{ "$ref": "#/components/schemas/Base" }],
      "properties": { "label": { "type": "string" } },
      "required": ["label", "id"]
    }
  }));
  let code = render_components(&document, &["Extended"]);

  assert_contains(
    &code,
    "export interface Extended extends Base {\n  label: string;\n  id: number;\n}",
    "sibling properties and required names",
  );
}

#[test]
fn test_nested_all_of_flattens() {
  let document = components(json!({
    "Flat": {
      "allOf": [
        {
          "allOf": [
            { "properties": { "a": { "type": "string" } } },
            { "properties": { "b": { "type": "string" } } }
          ]
        },
        { "properties": { "c": { "type": "string" } } }
      ]
    }
  }));
  let code = render_components(&document, &["Flat"]);
  assert_eq!(code, "export interface Flat {\n  a?: string;\n  b?: string;\n  c?: string;\n}");
}

#[test]
fn test_one_of_member_multiplies_property_sets() {
  let document = components(json!({
    "Shape": {
      "allOf": [
        { "properties": { "id": { "type": "string" } } },
        {
          "oneOf": [
            { "properties": { "radius": { "type": "number" } } },
            { "properties": { "side": { "type": "number" } } }
          ]
        }
      ]
    }
  }));
  let code = render_components(&document, &["Shape"]);
  assert_eq!(
    code,
    "export type Shape = {\n  id?: string;\n  radius?: number;\n} | {\n  id?: string;\n  side?: number;\n};"
  );
}

#[test]
fn test_unmergeable_member_becomes_union_branch() {
  let document = components(json!({
    "Status": { "type": "string", "description": "Lifecycle state", "enum": ["active", "retired"] },
    "Mixed": {
      "allOf": [
        { "$ref": "#/components/schemas/Status" },
        { "properties": { "note": { "type": "string" } } }
      ]
    }
  }));
  let code = render_components(&document, &["Mixed"]);

  assert_contains(
    &code,
    "export type Mixed = {\n  note?: string;\n} | Status /* Lifecycle state */;",
    "union with trailing member comment",
  );
}

#[test]
fn test_documentation_only_member_vanishes() {
  let document = components(json!({
    "Base": { "type": "object", "properties": { "id": { "type": "integer" } } },
    "Wrapped": {
      "allOf": [{ "$ref": "#/components/schemas/Base" }, { "description": "Wrapped base" }]
    }
  }));
  let config = ConvertorConfig::default();
  let convertor = Convertor::new(&document, &config);
  let mut ctx = new_context(&config);
  let wrapped = single(&convert_component(&convertor, &mut ctx, "Wrapped"));

  let DescriptorKind::AllOf(AllOfShape { local, extends, members }) = &ctx.get(wrapped).kind else {
    panic!("expected an allOf descriptor");
  };
  assert!(local.is_none(), "nothing is declared locally");
  assert!(members.is_empty(), "the documentation member is dropped");
  assert_eq!(extends.len(), 1);
  assert_eq!(ctx.get(extends[0]).model_name.as_deref(), Some("Base"));
}
