//! TypeScript rendering of descriptors.
//!
//! [`Renderer::render`] turns one descriptor into source text and records every named
//! descriptor it refers to; [`Renderer::render_recursive`] walks those dependencies so
//! that each model is emitted once, after everything it depends on.

use std::collections::HashSet;

use itertools::Itertools;
use serde_json::Value;
use strum::Display;

use super::{
  context::ConversionContext,
  descriptor::{
    AdditionalShape, AllOfShape, ArrayItems, Descriptor, DescriptorId, DescriptorKind, EnumShape, GenericShape,
    ObjectShape, PropertySet,
  },
  errors::ConversionError,
  naming::identifiers::property_key,
  schema::Discriminant,
};
use crate::utils::text::{doc_block, indent_all, inline_comment, quote_literal};

const INDENT: &str = "  ";
const FALLBACK_TYPE: &str = "any";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeclarationKind {
  Interface,
  Enum,
  #[strum(to_string = "type")]
  TypeAlias,
}

/// One emitted model, handed to the [`Renderer::render_recursive`] callback.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedModel {
  pub id: DescriptorId,
  pub name: Option<String>,
  pub code: String,
  pub dependencies: Vec<DescriptorId>,
  pub declaration: DeclarationKind,
  pub kind: &'static str,
}

/// Type parameter of a generic declaration with every key it dispatches on.
#[derive(Debug, Clone)]
struct TypeParameter {
  discriminant: Discriminant,
  keys: Vec<String>,
  default_key: Option<String>,
}

pub struct Renderer<'c> {
  ctx: &'c ConversionContext,
}

impl<'c> Renderer<'c> {
  pub fn new(ctx: &'c ConversionContext) -> Self {
    Self { ctx }
  }

  /// Renders every root not yet in `rendered`, its dependencies first.
  ///
  /// A descriptor is marked before its dependencies are visited, so mutual references
  /// terminate; `on_rendered` runs after the dependencies' callbacks.
  pub fn render_recursive(
    &self,
    roots: &[DescriptorId],
    rendered: &mut HashSet<DescriptorId>,
    on_rendered: &mut dyn FnMut(RenderedModel),
  ) -> Result<(), ConversionError> {
    for root in roots {
      for id in self.ctx.resolve(*root) {
        if !rendered.insert(id) {
          continue;
        }

        let mut dependencies = Vec::new();
        let code = self.render(id, &mut dependencies, true)?;
        let dependencies = dependencies.into_iter().unique().collect::<Vec<_>>();
        let pending = dependencies
          .iter()
          .copied()
          .filter(|dependency| !rendered.contains(dependency))
          .collect::<Vec<_>>();
        self.render_recursive(&pending, rendered, on_rendered)?;

        let descriptor = self.ctx.get(id);
        on_rendered(RenderedModel {
          id,
          name: descriptor.model_name.clone(),
          code,
          dependencies,
          declaration: self.declaration_kind(id),
          kind: descriptor.kind.label(),
        });
      }
    }
    Ok(())
  }

  /// Renders one descriptor.
  ///
  /// At root level a named descriptor becomes a declaration; an anonymous object, array
  /// or allOf cannot be exported and fails. Below root level named descriptors render as
  /// their name and are pushed onto `dependencies`.
  pub fn render(
    &self,
    id: DescriptorId,
    dependencies: &mut Vec<DescriptorId>,
    root_level: bool,
  ) -> Result<String, ConversionError> {
    if !root_level {
      return Ok(self.type_expr(id, dependencies));
    }

    let resolved = self.ctx.resolve(id);
    let [id] = resolved.as_slice() else {
      return Ok(self.union(&resolved, dependencies));
    };
    let descriptor = self.ctx.get(*id);
    match &descriptor.model_name {
      Some(name) => Ok(self.declaration(name, descriptor, dependencies)),
      None if descriptor.kind.is_model() => Err(ConversionError::AnonymousRootModel {
        kind: descriptor.kind.label().to_string(),
        json_path: descriptor.original_path.clone().unwrap_or_else(|| "#".to_string()),
      }),
      None => Ok(self.inline(descriptor, dependencies)),
    }
  }

  pub fn declaration_kind(&self, id: DescriptorId) -> DeclarationKind {
    let descriptor = self.ctx.get(id);
    match &descriptor.kind {
      DescriptorKind::Enum(EnumShape { members: Some(_), .. }) => DeclarationKind::Enum,
      DescriptorKind::Object(shape) if shape.single_set().is_some() && self.all_extendable(&descriptor.ancestors) => {
        DeclarationKind::Interface
      }
      DescriptorKind::AllOf(shape) if self.renders_as_interface(shape) => DeclarationKind::Interface,
      _ => DeclarationKind::TypeAlias,
    }
  }

  fn declaration(&self, name: &str, descriptor: &Descriptor, dependencies: &mut Vec<DescriptorId>) -> String {
    let body = match &descriptor.kind {
      DescriptorKind::Object(shape) => self.object_declaration(name, descriptor, shape, dependencies),
      DescriptorKind::Enum(shape) => enum_declaration(name, shape),
      DescriptorKind::AllOf(shape) => self.all_of_declaration(name, descriptor, shape, dependencies),
      DescriptorKind::Generic(shape) => self.generic_declaration(name, shape, dependencies),
      _ => format!("export type {name} = {};", self.inline(descriptor, dependencies)),
    };

    match doc_block(&descriptor.get_comments()) {
      Some(docs) => format!("{docs}\n{body}"),
      None => body,
    }
  }

  fn object_declaration(
    &self,
    name: &str,
    descriptor: &Descriptor,
    shape: &ObjectShape,
    dependencies: &mut Vec<DescriptorId>,
  ) -> String {
    let ancestors = self.resolve_all(&descriptor.ancestors);
    if let Some(set) = shape.single_set()
      && self.all_extendable(&ancestors)
    {
      let extends = self.extends_clause(&ancestors, dependencies);
      let body = self.object_body(set, shape.additional.as_ref(), dependencies);
      return format!("export interface {name}{extends} {body}");
    }

    let mut parts = ancestors
      .iter()
      .map(|ancestor| self.type_expr(*ancestor, dependencies))
      .collect::<Vec<_>>();
    parts.push(self.object_literal(shape, dependencies, !ancestors.is_empty()));
    format!("export type {name} = {};", parts.join(" & "))
  }

  fn all_of_declaration(
    &self,
    name: &str,
    descriptor: &Descriptor,
    shape: &AllOfShape,
    dependencies: &mut Vec<DescriptorId>,
  ) -> String {
    let extends = self.resolve_all(&shape.extends);
    let local = shape.local.map(|local| self.ctx.get(local));

    if self.renders_as_interface(shape) {
      let clause = self.extends_clause(&extends, dependencies);
      let body = match local.map(|local| &local.kind) {
        Some(DescriptorKind::Object(object)) => {
          let empty = PropertySet::new();
          let set = object.single_set().unwrap_or(&empty);
          self.object_body(set, object.additional.as_ref(), dependencies)
        }
        _ => "{}".to_string(),
      };
      return format!("export interface {name}{clause} {body}");
    }

    let mut merged = extends
      .iter()
      .map(|extended| self.type_expr(*extended, dependencies))
      .collect::<Vec<_>>();
    if let Some(DescriptorKind::Object(object)) = local.map(|local| &local.kind) {
      merged.push(self.object_literal(object, dependencies, !extends.is_empty()));
    }

    let parent_comments = descriptor.get_comments();
    let mut branches = Vec::new();
    if !merged.is_empty() {
      branches.push(merged.join(" & "));
    }
    for member in &shape.members {
      let member_descriptor = self.ctx.get(*member);
      let comments = member_descriptor.get_comments();
      let expr = self.type_expr(*member, dependencies);
      let trailing = (!comments.is_empty() && comments != parent_comments)
        .then(|| inline_comment(&comments.join("\n")))
        .flatten();
      branches.push(match trailing {
        Some(comment) => format!("{expr} {comment}"),
        None => expr,
      });
    }

    if branches.is_empty() {
      return format!("export type {name} = {FALLBACK_TYPE};");
    }
    format!("export type {name} = {};", branches.join(" | "))
  }

  fn generic_declaration(&self, name: &str, shape: &GenericShape, dependencies: &mut Vec<DescriptorId>) -> String {
    if shape.branches.is_empty() {
      return format!("export type {name} = {FALLBACK_TYPE};");
    }

    let mut parameters = Vec::<TypeParameter>::new();
    self.collect_parameters(shape, &mut parameters);
    let parameter_lines = parameters
      .iter()
      .map(|parameter| {
        let constraint = parameter
          .keys
          .iter()
          .map(|key| discriminant_literal(parameter.discriminant, key))
          .join(" | ");
        let default = parameter
          .default_key
          .as_deref()
          .map(|key| format!(" = {}", discriminant_literal(parameter.discriminant, key)))
          .unwrap_or_default();
        format!("{INDENT}{} extends {constraint}{default},", parameter.discriminant.type_parameter())
      })
      .join("\n");

    let type_parameter = shape.discriminant.type_parameter();
    let mut lines = Vec::new();
    for (index, branch) in shape.branches.iter().enumerate() {
      let test = format!(
        "{type_parameter} extends {}",
        discriminant_literal(shape.discriminant, &branch.key)
      );
      let consequence = hang(&self.branch_expr(&branch.types, dependencies), INDENT);
      let reason = match shape.discriminant {
        Discriminant::StatusCode => status_reason(&branch.key).map(|reason| format!(" /* {reason} */")),
        Discriminant::ContentType => None,
      };
      if index == 0 {
        lines.push(format!("> = {test}"));
      } else {
        lines.push(format!("{INDENT}: {test}"));
      }
      lines.push(format!("{INDENT}? {consequence}{}", reason.unwrap_or_default()));
    }
    lines.push(format!("{INDENT}: {FALLBACK_TYPE};"));

    format!("export type {name}<\n{parameter_lines}\n{}", lines.join("\n"))
  }

  /// Gathers the type parameters of a generic and of the anonymous generics nested in its branches.
  fn collect_parameters(&self, shape: &GenericShape, parameters: &mut Vec<TypeParameter>) {
    let keys = shape.branches.iter().map(|branch| branch.key.clone());
    match parameters
      .iter_mut()
      .find(|parameter| parameter.discriminant == shape.discriminant)
    {
      Some(parameter) => {
        for key in keys {
          if !parameter.keys.contains(&key) {
            parameter.keys.push(key);
          }
        }
        if parameter.default_key.is_none() {
          parameter.default_key.clone_from(&shape.default_key);
        }
      }
      None => parameters.push(TypeParameter {
        discriminant: shape.discriminant,
        keys: keys.collect(),
        default_key: shape.default_key.clone(),
      }),
    }

    for branch in &shape.branches {
      for id in self.resolve_all(&branch.types) {
        let descriptor = self.ctx.get(id);
        if let DescriptorKind::Generic(nested) = &descriptor.kind
          && !descriptor.is_named()
        {
          self.collect_parameters(nested, parameters);
        }
      }
    }
  }

  /// Consequence of one conditional branch. Anonymous `null` keeps its documentation
  /// inline; nested conditionals are parenthesized.
  fn branch_expr(&self, types: &[DescriptorId], dependencies: &mut Vec<DescriptorId>) -> String {
    let resolved = self.resolve_all(types);
    if let [single] = resolved.as_slice() {
      let descriptor = self.ctx.get(*single);
      if !descriptor.is_named() {
        match &descriptor.kind {
          DescriptorKind::Null => {
            let comments = descriptor.get_comments();
            return match inline_comment(&comments.join("\n")) {
              Some(comment) => format!("{comment} null"),
              None => "null".to_string(),
            };
          }
          DescriptorKind::Generic(_) => return format!("({})", self.type_expr(*single, dependencies)),
          _ => {}
        }
      }
    }
    self.union(&resolved, dependencies)
  }

  /// Inline expression of a descriptor, or its name when it is named.
  fn type_expr(&self, id: DescriptorId, dependencies: &mut Vec<DescriptorId>) -> String {
    let resolved = self.ctx.resolve(id);
    match resolved.as_slice() {
      [] => FALLBACK_TYPE.to_string(),
      [single] => {
        let descriptor = self.ctx.get(*single);
        match &descriptor.model_name {
          Some(name) => {
            dependencies.push(*single);
            name.clone()
          }
          None => self.inline(descriptor, dependencies),
        }
      }
      many => self.union(many, dependencies),
    }
  }

  fn union(&self, ids: &[DescriptorId], dependencies: &mut Vec<DescriptorId>) -> String {
    if ids.is_empty() {
      return FALLBACK_TYPE.to_string();
    }
    ids
      .iter()
      .map(|id| self.type_expr(*id, dependencies))
      .unique()
      .join(" | ")
  }

  fn inline(&self, descriptor: &Descriptor, dependencies: &mut Vec<DescriptorId>) -> String {
    match &descriptor.kind {
      DescriptorKind::Object(shape) => {
        let ancestors = self.resolve_all(&descriptor.ancestors);
        let mut parts = ancestors
          .iter()
          .map(|ancestor| self.type_expr(*ancestor, dependencies))
          .collect::<Vec<_>>();
        parts.push(self.object_literal(shape, dependencies, !ancestors.is_empty()));
        parts.join(" & ")
      }
      DescriptorKind::Array(items) => self.array_expr(items, dependencies),
      DescriptorKind::String => "string".to_string(),
      DescriptorKind::Number => "number".to_string(),
      DescriptorKind::Boolean => "boolean".to_string(),
      DescriptorKind::Null => "null".to_string(),
      DescriptorKind::Enum(shape) => literal_union(&shape.values),
      DescriptorKind::AllOf(shape) => {
        let mut parts = self
          .resolve_all(&shape.extends)
          .iter()
          .map(|extended| self.type_expr(*extended, dependencies))
          .collect::<Vec<_>>();
        if let Some(local) = shape.local
          && let DescriptorKind::Object(object) = &self.ctx.get(local).kind
        {
          parts.push(self.object_literal(object, dependencies, true));
        }
        let members = shape
          .members
          .iter()
          .map(|member| parenthesize(self.type_expr(*member, dependencies)))
          .collect::<Vec<_>>();
        let merged = (!parts.is_empty()).then(|| parts.join(" & "));
        match (merged, members.is_empty()) {
          (Some(merged), true) => merged,
          (Some(merged), false) => format!("{merged} | {}", members.join(" | ")),
          (None, false) => members.join(" | "),
          (None, true) => FALLBACK_TYPE.to_string(),
        }
      }
      DescriptorKind::SomeOf(shape) => {
        let options = self.union(&shape.options, dependencies);
        if shape.base.is_empty() {
          return options;
        }
        let base = self.union(&shape.base, dependencies);
        format!("{} & ({options})", parenthesize(base))
      }
      DescriptorKind::Generic(shape) => {
        let type_parameter = shape.discriminant.type_parameter();
        let mut chain = String::new();
        for branch in &shape.branches {
          let consequence = self.branch_expr(&branch.types, dependencies);
          chain.push_str(&format!(
            "{type_parameter} extends {} ? {consequence} : ",
            discriminant_literal(shape.discriminant, &branch.key)
          ));
        }
        chain.push_str(FALLBACK_TYPE);
        chain
      }
      DescriptorKind::InstanceOf(native) => native.clone(),
      DescriptorKind::Any | DescriptorKind::Forward(_) => FALLBACK_TYPE.to_string(),
    }
  }

  fn array_expr(&self, items: &ArrayItems, dependencies: &mut Vec<DescriptorId>) -> String {
    match items {
      ArrayItems::Any => format!("Array<{FALLBACK_TYPE}>"),
      ArrayItems::Single(types) => format!("Array<{}>", self.union(types, dependencies)),
      ArrayItems::Tuple(items) => {
        let items = items
          .iter()
          .map(|types| self.union(types, dependencies))
          .join(", ");
        format!("[{items}]")
      }
    }
  }

  /// Object literal; alternative property sets render as a union, parenthesized when
  /// the literal is part of an intersection.
  fn object_literal(&self, shape: &ObjectShape, dependencies: &mut Vec<DescriptorId>, in_intersection: bool) -> String {
    let additional = shape.additional.as_ref();
    match shape.property_sets.as_slice() {
      [] => self.object_body(&PropertySet::new(), additional, dependencies),
      [set] => self.object_body(set, additional, dependencies),
      sets => {
        let union = sets
          .iter()
          .map(|set| self.object_body(set, additional, dependencies))
          .join(" | ");
        if in_intersection { format!("({union})") } else { union }
      }
    }
  }

  fn object_body(
    &self,
    set: &PropertySet,
    additional: Option<&AdditionalShape>,
    dependencies: &mut Vec<DescriptorId>,
  ) -> String {
    let mut members = Vec::new();
    for (key, property) in set {
      let mut docs = property.comment.clone();
      if let Some(default) = &property.default_value {
        docs.push(format!("@default {}", json_literal(default)));
      }
      if let Some(example) = &property.example {
        docs.push(format!("@example {}", json_literal(example)));
      }
      let readonly = if property.read_only { "readonly " } else { "" };
      let optional = if property.required { "" } else { "?" };
      let types = self.union(&property.types, dependencies);
      let line = format!("{readonly}{}{optional}: {types};", property_key(key));
      members.push(match doc_block(&docs) {
        Some(docs) => format!("{docs}\n{line}"),
        None => line,
      });
    }

    match additional {
      Some(AdditionalShape::Any) => members.push(format!("[key: string]: {FALLBACK_TYPE};")),
      Some(AdditionalShape::Types(types)) => {
        members.push(format!("[key: string]: {};", self.union(types, dependencies)));
      }
      None => {}
    }

    if members.is_empty() {
      return "{}".to_string();
    }
    format!("{{\n{}\n}}", indent_all(&members.join("\n"), INDENT))
  }

  fn extends_clause(&self, ancestors: &[DescriptorId], dependencies: &mut Vec<DescriptorId>) -> String {
    if ancestors.is_empty() {
      return String::new();
    }
    let names = ancestors
      .iter()
      .map(|ancestor| self.type_expr(*ancestor, dependencies))
      .unique()
      .join(", ");
    format!(" extends {names}")
  }

  fn renders_as_interface(&self, shape: &AllOfShape) -> bool {
    let local_is_single = shape.local.is_none_or(|local| match &self.ctx.get(local).kind {
      DescriptorKind::Object(object) => object.property_sets.len() <= 1,
      _ => false,
    });
    shape.members.is_empty() && local_is_single && self.all_extendable(&self.resolve_all(&shape.extends))
  }

  /// Only named types with statically known members can follow `extends`.
  fn all_extendable(&self, ids: &[DescriptorId]) -> bool {
    ids.iter().all(|id| {
      self.ctx.resolve(*id).iter().all(|resolved| {
        let descriptor = self.ctx.get(*resolved);
        descriptor.is_named()
          && match &descriptor.kind {
            DescriptorKind::Object(shape) => shape.single_set().is_some(),
            DescriptorKind::AllOf(shape) => shape.members.is_empty(),
            _ => false,
          }
      })
    })
  }

  fn resolve_all(&self, ids: &[DescriptorId]) -> Vec<DescriptorId> {
    ids.iter().flat_map(|id| self.ctx.resolve(*id)).unique().collect()
  }
}

fn enum_declaration(name: &str, shape: &EnumShape) -> String {
  match &shape.members {
    Some(members) => {
      let body = members
        .iter()
        .zip(&shape.values)
        .map(|(member, value)| format!("{INDENT}{member} = {},", json_literal(value)))
        .join("\n");
      format!("export enum {name} {{\n{body}\n}}")
    }
    None => format!("export type {name} = {};", literal_union(&shape.values)),
  }
}

fn literal_union(values: &[Value]) -> String {
  if values.is_empty() {
    return "never".to_string();
  }
  values.iter().map(json_literal).unique().join(" | ")
}

/// A JSON value as a TypeScript literal; strings use single quotes.
fn json_literal(value: &Value) -> String {
  match value {
    Value::String(text) => quote_literal(text),
    other => other.to_string(),
  }
}

fn discriminant_literal(discriminant: Discriminant, key: &str) -> String {
  match discriminant {
    Discriminant::StatusCode if key.len() == 3 && key.bytes().all(|b| b.is_ascii_digit()) => key.to_string(),
    _ => quote_literal(key),
  }
}

fn status_reason(key: &str) -> Option<&'static str> {
  key
    .parse::<u16>()
    .ok()
    .and_then(|code| http::StatusCode::from_u16(code).ok())
    .and_then(|status| status.canonical_reason())
}

fn parenthesize(expr: String) -> String {
  if expr.contains(" | ") || expr.contains(" & ") {
    format!("({expr})")
  } else {
    expr
  }
}

/// Indents every line after the first, so a multi-line expression stays under the line it starts on.
fn hang(text: &str, pad: &str) -> String {
  match text.split_once('\n') {
    Some((head, tail)) => format!("{head}\n{}", indent_all(tail, pad)),
    None => text.to_string(),
  }
}
