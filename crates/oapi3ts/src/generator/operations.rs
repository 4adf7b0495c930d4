//! Extraction of per-operation schemas from the `paths` object.
//!
//! Every operation yields an [`ApiMetaInfo`] record plus up to four synthesized
//! schemas: a parameters object, a request body keyed by content type, a response
//! keyed by status code then content type, and an object of response headers.

use std::collections::BTreeSet;

use http::Method;
use indexmap::IndexMap;
use oas3::spec::Server;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::{
  config::ConvertorConfig,
  errors::{ConversionError, Diagnostics, ParsingWarning, WarningKind},
  naming::{operations::operation_base_name, registry::ensure_unique},
  schema::{Discriminant, GenericSchema, SchemaNode, deep_merge, null_schema},
};
use crate::utils::refs::{child_path, ref_of, resolve_pointer};

pub(crate) const HTTP_METHODS: [Method; 8] = [
  Method::GET,
  Method::PUT,
  Method::POST,
  Method::DELETE,
  Method::OPTIONS,
  Method::HEAD,
  Method::PATCH,
  Method::TRACE,
];

/// Metadata of one API operation, written out alongside the generated types.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetaInfo {
  pub operation_id: String,
  pub base_type_name: String,
  #[serde(serialize_with = "serialize_method")]
  pub method: Method,
  pub path: String,
  pub servers: Vec<Server>,
  pub query_params: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parameters_model_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_model_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response_model_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub headers_model_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(method.as_str())
}

/// Schemas synthesized for one operation, before conversion.
#[derive(Debug, Clone)]
pub struct OperationFragments {
  pub meta: ApiMetaInfo,
  pub json_path: String,
  pub parameters: Option<Value>,
  pub request: Option<GenericSchema>,
  pub response: Option<GenericSchema>,
  pub headers: Option<Value>,
}

impl OperationFragments {
  pub fn parameters_node(&self) -> Option<SchemaNode> {
    self.parameters.clone().map(SchemaNode::from)
  }

  pub fn request_node(&self) -> Option<SchemaNode> {
    self.request.clone().map(SchemaNode::from)
  }

  pub fn response_node(&self) -> Option<SchemaNode> {
    self.response.clone().map(SchemaNode::from)
  }

  pub fn headers_node(&self) -> Option<SchemaNode> {
    self.headers.clone().map(SchemaNode::from)
  }
}

/// A parameter after `$ref` resolution, keyed by `name` and `in`.
#[derive(Debug, Clone)]
struct ParameterEntry {
  name: String,
  location: String,
  required: bool,
  schema: Value,
}

pub struct OperationExtractor<'a> {
  document: &'a Value,
  config: &'a ConvertorConfig,
}

impl<'a> OperationExtractor<'a> {
  pub fn new(document: &'a Value, config: &'a ConvertorConfig) -> Self {
    Self { document, config }
  }

  /// Walks `paths` in document order and collects every operation.
  ///
  /// Malformed path items and operations are skipped with a warning; a missing
  /// `paths` object or a server without `url` aborts. Failures inside one operation
  /// come back as [`ConversionError::Operation`].
  pub fn extract(&self, diagnostics: &mut Diagnostics) -> Result<Vec<OperationFragments>, ConversionError> {
    let root = self.document.as_object().ok_or_else(|| ConversionError::InvalidDocument {
      message: "the document root is not an object".to_string(),
    })?;
    let paths = root
      .get("paths")
      .and_then(Value::as_object)
      .ok_or(ConversionError::MissingPaths)?;

    let root_servers = self.servers(diagnostics, root.get("servers"), "#/servers")?;
    let mut base_names = BTreeSet::new();
    let mut operations = Vec::new();

    for (path, item) in paths {
      let item_path = child_path("#/paths", path);
      if path.trim().is_empty() {
        diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::EmptyPathKey)
            .message("empty path key, path item skipped")
            .json_path(&item_path)
            .build(),
        )?;
        continue;
      }

      let Some(item) = item.as_object() else {
        diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::InvalidPathItem)
            .message(format!("path item '{path}' is not an object, skipped"))
            .json_path(&item_path)
            .build(),
        )?;
        continue;
      };

      let path_servers = match item.get("servers") {
        Some(servers) => self.servers(diagnostics, Some(servers), &format!("{item_path}/servers"))?,
        None => root_servers.clone(),
      };
      let path_parameters = self.parameters(diagnostics, item.get("parameters"), &format!("{item_path}/parameters"))?;

      for method in &HTTP_METHODS {
        let key = method.as_str().to_ascii_lowercase();
        let Some(operation) = item.get(&key) else {
          continue;
        };
        let operation_path = format!("{item_path}/{key}");
        let Some(operation) = operation.as_object() else {
          diagnostics.warn(
            ParsingWarning::builder()
              .kind(WarningKind::InvalidOperation)
              .message(format!("{method} {path} is not an object, skipped"))
              .json_path(&operation_path)
              .build(),
          )?;
          continue;
        };

        let operation_name = operation
          .get("operationId")
          .and_then(Value::as_str)
          .map_or_else(|| format!("{method} {path}"), str::to_string);
        let fragments = self
          .operation(
            diagnostics,
            OperationSite {
              method,
              path,
              json_path: &operation_path,
              servers: &path_servers,
              parameters: &path_parameters,
            },
            operation,
            &mut base_names,
          )
          .map_err(|err| err.within_operation(&operation_name, &operation_path))?;
        operations.push(fragments);
      }
    }

    Ok(operations)
  }

  fn operation(
    &self,
    diagnostics: &mut Diagnostics,
    site: OperationSite<'_>,
    operation: &Map<String, Value>,
    base_names: &mut BTreeSet<String>,
  ) -> Result<OperationFragments, ConversionError> {
    let json_path = site.json_path;
    let explicit_id = operation
      .get("operationId")
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|id| !id.is_empty());

    if explicit_id.is_none() {
      diagnostics.warn(
        ParsingWarning::builder()
          .kind(WarningKind::MissingOperationId)
          .message(format!("{} {} has no operationId, a name is synthesized", site.method, site.path))
          .json_path(json_path)
          .build(),
      )?;
    }

    let requested = operation_base_name(site.method.as_str(), site.path, explicit_id);
    let base_type_name = ensure_unique(&requested, base_names);
    if base_type_name != requested {
      diagnostics.warn(
        ParsingWarning::builder()
          .kind(WarningKind::DuplicateModelName)
          .message(format!("operation name '{requested}' is taken, using '{base_type_name}'"))
          .json_path(json_path)
          .build(),
      )?;
    }
    base_names.insert(base_type_name.clone());

    let servers = match operation.get("servers") {
      Some(servers) => self.servers(diagnostics, Some(servers), &format!("{json_path}/servers"))?,
      None => site.servers.to_vec(),
    };

    let own_parameters = self.parameters(diagnostics, operation.get("parameters"), &format!("{json_path}/parameters"))?;
    let parameters = merge_parameters(site.parameters, own_parameters);
    let query_params = parameters
      .iter()
      .filter(|parameter| parameter.location == "query")
      .map(|parameter| parameter.name.clone())
      .collect();

    let request = match operation.get("requestBody") {
      Some(body) => self.request_body(diagnostics, body, &format!("{json_path}/requestBody"))?,
      None => None,
    };
    let (response, headers) = match operation.get("responses") {
      Some(responses) => self.responses(diagnostics, responses, &format!("{json_path}/responses"))?,
      None => (None, None),
    };

    let meta = ApiMetaInfo {
      operation_id: explicit_id.map_or_else(|| base_type_name.clone(), str::to_string),
      base_type_name,
      method: site.method.clone(),
      path: site.path.to_string(),
      servers,
      query_params,
      parameters_model_name: None,
      request_model_name: None,
      response_model_name: None,
      headers_model_name: None,
      summary: string_field(operation, "summary"),
      description: string_field(operation, "description"),
      tags: operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default(),
    };

    Ok(OperationFragments {
      meta,
      json_path: json_path.to_string(),
      parameters: parameters_schema(&parameters),
      request,
      response,
      headers,
    })
  }

  /// Parses a `servers` list. A non-array value is a warning and counts as empty;
  /// an empty list falls back to the configured default server.
  fn servers(
    &self,
    diagnostics: &mut Diagnostics,
    servers: Option<&Value>,
    json_path: &str,
  ) -> Result<Vec<Server>, ConversionError> {
    let entries = match servers {
      None => vec![],
      Some(Value::Array(entries)) => entries.clone(),
      Some(_) => {
        diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::InvalidServers)
            .message("servers is not a list, using the default server")
            .json_path(json_path)
            .build(),
        )?;
        vec![]
      }
    };

    let entries = if entries.is_empty() {
      vec![json!({ "url": self.config.default_server_url })]
    } else {
      entries
    };

    entries
      .into_iter()
      .enumerate()
      .map(|(index, entry)| {
        let entry_path = format!("{json_path}/{index}");
        if entry.get("url").and_then(Value::as_str).is_none() {
          return Err(ConversionError::MissingServerUrl { json_path: entry_path });
        }
        serde_json::from_value::<Server>(entry).map_err(|err| ConversionError::InvalidDocument {
          message: format!("server at {entry_path}: {err}"),
        })
      })
      .collect()
  }

  fn parameters(
    &self,
    diagnostics: &mut Diagnostics,
    parameters: Option<&Value>,
    json_path: &str,
  ) -> Result<Vec<ParameterEntry>, ConversionError> {
    let Some(parameters) = parameters.and_then(Value::as_array) else {
      return Ok(vec![]);
    };

    let mut entries = Vec::with_capacity(parameters.len());
    for (index, parameter) in parameters.iter().enumerate() {
      let parameter_path = format!("{json_path}/{index}");
      let Some(parameter) = self.dereference(diagnostics, parameter, &parameter_path)? else {
        continue;
      };
      let (Some(name), Some(location)) = (
        parameter.get("name").and_then(Value::as_str),
        parameter.get("in").and_then(Value::as_str),
      ) else {
        diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::MalformedSchema)
            .message("parameter without 'name' or 'in', skipped")
            .json_path(&parameter_path)
            .build(),
        )?;
        continue;
      };

      let schema = parameter
        .get("schema")
        .cloned()
        .or_else(|| first_media_schema(parameter.get("content")))
        .unwrap_or_else(|| json!({}));
      let schema = match parameter.get("description") {
        Some(description) if schema.get("description").is_none() && ref_of(&schema).is_none() => {
          deep_merge(schema, &json!({ "description": description }))
        }
        _ => schema,
      };

      entries.push(ParameterEntry {
        name: name.to_string(),
        location: location.to_string(),
        required: location == "path" || parameter.get("required").and_then(Value::as_bool).unwrap_or(false),
        schema,
      });
    }
    Ok(entries)
  }

  fn request_body(
    &self,
    diagnostics: &mut Diagnostics,
    body: &Value,
    json_path: &str,
  ) -> Result<Option<GenericSchema>, ConversionError> {
    let Some(body) = self.dereference(diagnostics, body, json_path)? else {
      return Ok(None);
    };
    let description = string_value(&body, "description");
    let mut generic = self.content(body.get("content"), description.as_deref());
    generic.description = description;
    Ok(Some(generic))
  }

  /// Builds the response generic and the object of response headers.
  fn responses(
    &self,
    diagnostics: &mut Diagnostics,
    responses: &Value,
    json_path: &str,
  ) -> Result<(Option<GenericSchema>, Option<Value>), ConversionError> {
    let Some(responses) = responses.as_object() else {
      return Ok((None, None));
    };

    let mut generic = GenericSchema::new(Discriminant::StatusCode);
    let mut headers = IndexMap::<String, (Value, bool)>::new();

    for (status, response) in responses {
      let response_path = child_path(json_path, status);
      let Some(response) = self.dereference(diagnostics, response, &response_path)? else {
        continue;
      };
      let description = string_value(&response, "description");
      let mut content = self.content(response.get("content"), description.as_deref());
      content.description = description;
      generic.branches.insert(status.clone(), SchemaNode::Generic(content));

      if let Some(declared) = response.get("headers").and_then(Value::as_object) {
        for (name, header) in declared {
          let header_path = child_path(&format!("{response_path}/headers"), name);
          let Some(header) = self.dereference(diagnostics, header, &header_path)? else {
            continue;
          };
          let mut schema = header.get("schema").cloned().unwrap_or_else(|| json!({}));
          if let Some(description) = header.get("description")
            && schema.get("description").is_none()
            && ref_of(&schema).is_none()
          {
            schema = deep_merge(schema, &json!({ "description": description }));
          }
          let required = header.get("required").and_then(Value::as_bool).unwrap_or(false);
          headers.entry(name.clone()).or_insert((schema, required));
        }
      }
    }

    let response = (!generic.branches.is_empty()).then_some(generic);
    let headers = (!headers.is_empty()).then(|| {
      object_schema(
        headers
          .into_iter()
          .map(|(name, (schema, required))| (name, schema, required)),
      )
    });
    Ok((response, headers))
  }

  /// Content map of a body or response. Missing or empty content is an explicit
  /// `null` under the default content type, keeping the description.
  fn content(&self, content: Option<&Value>, description: Option<&str>) -> GenericSchema {
    let mut generic = GenericSchema::new(Discriminant::ContentType);
    if let Some(content) = content.and_then(Value::as_object) {
      for (media_type, media) in content {
        let schema = media.get("schema").cloned().unwrap_or_else(|| null_schema(description));
        generic.branches.insert(media_type.clone(), SchemaNode::Fragment(schema));
      }
    }

    if generic.branches.is_empty() {
      generic.branches.insert(
        self.config.default_content_type.clone(),
        SchemaNode::Fragment(null_schema(description)),
      );
    }
    generic
  }

  /// Follows a local `$ref` to a parameter, body, response or header object.
  fn dereference(
    &self,
    diagnostics: &mut Diagnostics,
    value: &Value,
    json_path: &str,
  ) -> Result<Option<Value>, ConversionError> {
    let mut current = value;
    let mut seen = BTreeSet::new();
    while let Some(reference) = ref_of(current) {
      let target = reference
        .strip_prefix('#')
        .filter(|_| seen.insert(reference.to_string()))
        .and_then(|pointer| resolve_pointer(self.document, pointer));
      let Some(target) = target else {
        diagnostics.warn(
          ParsingWarning::builder()
            .kind(WarningKind::UnresolvedRef)
            .message("reference cannot be followed, element skipped")
            .json_path(json_path)
            .related_ref(reference)
            .build(),
        )?;
        return Ok(None);
      };
      current = target;
    }

    Ok(current.is_object().then(|| current.clone()))
  }
}

#[derive(Clone, Copy)]
struct OperationSite<'s> {
  method: &'s Method,
  path: &'s str,
  json_path: &'s str,
  servers: &'s [Server],
  parameters: &'s [ParameterEntry],
}

/// Operation parameters replace path-level ones with the same `name` and `in`.
fn merge_parameters(path_level: &[ParameterEntry], operation_level: Vec<ParameterEntry>) -> Vec<ParameterEntry> {
  let mut merged = path_level
    .iter()
    .filter(|inherited| {
      !operation_level
        .iter()
        .any(|own| own.name == inherited.name && own.location == inherited.location)
    })
    .cloned()
    .collect::<Vec<_>>();
  merged.extend(operation_level);
  merged
}

fn parameters_schema(parameters: &[ParameterEntry]) -> Option<Value> {
  if parameters.is_empty() {
    return None;
  }
  Some(object_schema(
    parameters
      .iter()
      .map(|parameter| (parameter.name.clone(), parameter.schema.clone(), parameter.required)),
  ))
}

fn object_schema(properties: impl Iterator<Item = (String, Value, bool)>) -> Value {
  let mut map = Map::new();
  let mut required = Vec::new();
  for (name, schema, is_required) in properties {
    if is_required {
      required.push(Value::String(name.clone()));
    }
    map.insert(name, schema);
  }

  let mut schema = Map::new();
  schema.insert("type".to_string(), Value::String("object".to_string()));
  schema.insert("properties".to_string(), Value::Object(map));
  if !required.is_empty() {
    schema.insert("required".to_string(), Value::Array(required));
  }
  Value::Object(schema)
}

fn first_media_schema(content: Option<&Value>) -> Option<Value> {
  content?
    .as_object()?
    .values()
    .find_map(|media| media.get("schema").cloned())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
  map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_value(value: &Value, key: &str) -> Option<String> {
  value.get(key).and_then(Value::as_str).map(str::to_string)
}
