use std::{collections::BTreeSet, path::Path};

use regex::Regex;
use serde_json::Value;

const REF_KEY: &str = "$ref";

/// A `$ref` split into the document it names and the JSON pointer inside that document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RefPointer {
  pub document: Option<String>,
  pub pointer: String,
}

impl RefPointer {
  /// Splits `reference` with the configured pattern: group 1 is the document, group 2 the pointer.
  ///
  /// A reference without a `#` names a whole document.
  pub(crate) fn parse(reference: &str, pattern: &Regex) -> Self {
    let (document, pointer) = match pattern.captures(reference) {
      Some(captures) => (
        captures.get(1).map_or("", |m| m.as_str()),
        captures.get(2).map_or("", |m| m.as_str()),
      ),
      None => (reference, ""),
    };

    Self {
      document: Some(document.trim()).filter(|doc| !doc.is_empty()).map(str::to_string),
      pointer: pointer.to_string(),
    }
  }

  pub(crate) fn is_external(&self) -> bool {
    self.document.is_some()
  }

  /// Canonical memo key of the target, `document#pointer` (document empty when local).
  pub(crate) fn canonical(&self) -> String {
    format!("{}#{}", self.document.as_deref().unwrap_or_default(), self.pointer)
  }

  /// Raw name of the referenced model: the last pointer segment, or the document's file stem.
  pub(crate) fn model_name(&self) -> Option<String> {
    let from_pointer = self
      .pointer
      .rsplit('/')
      .next()
      .filter(|segment| !segment.is_empty())
      .map(unescape_segment);

    from_pointer.or_else(|| {
      self
        .document
        .as_deref()
        .and_then(|doc| Path::new(doc).file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
    })
  }
}

/// Escapes one JSON pointer segment (`~` -> `~0`, `/` -> `~1`).
pub(crate) fn escape_segment(segment: &str) -> String {
  segment.replace('~', "~0").replace('/', "~1")
}

pub(crate) fn unescape_segment(segment: &str) -> String {
  segment.replace("~1", "/").replace("~0", "~")
}

/// Appends an escaped segment to a JSON pointer path.
pub(crate) fn child_path(parent: &str, segment: &str) -> String {
  format!("{parent}/{}", escape_segment(segment))
}

/// Looks up a JSON pointer (`/components/schemas/Pet`) inside `document`.
pub(crate) fn resolve_pointer<'a>(document: &'a Value, pointer: &str) -> Option<&'a Value> {
  if pointer.is_empty() {
    return Some(document);
  }
  document.pointer(pointer)
}

/// Returns the `$ref` string of a fragment, if it has one.
pub(crate) fn ref_of(value: &Value) -> Option<&str> {
  value.get(REF_KEY).and_then(Value::as_str)
}

/// Re-bases every `$ref` inside a fragment loaded from `document`.
///
/// Local refs (`#/...`) are qualified with `document`; refs naming another document are
/// made relative to the root document instead of to `document`.
pub(crate) fn rebase_refs(value: &mut Value, document: &str, pattern: &Regex) {
  match value {
    Value::Object(map) => {
      for (key, child) in map.iter_mut() {
        match child {
          Value::String(reference) if key == REF_KEY => {
            let parsed = RefPointer::parse(reference, pattern);
            let target = parsed
              .document
              .as_deref()
              .map_or_else(|| document.to_string(), |other| join_document(document, other));
            *reference = format!("{target}#{}", parsed.pointer);
          }
          _ => rebase_refs(child, document, pattern),
        }
      }
    }
    Value::Array(items) => items.iter_mut().for_each(|item| rebase_refs(item, document, pattern)),
    _ => {}
  }
}

/// Resolves `relative` against the directory of `base`, normalising `.` and `..` components.
pub(crate) fn join_document(base: &str, relative: &str) -> String {
  let mut parts = base.split('/').collect::<Vec<_>>();
  parts.pop();

  for segment in relative.split('/') {
    match segment {
      "" | "." => {}
      ".." if parts.last().is_some_and(|last| *last != "..") => {
        parts.pop();
      }
      other => parts.push(other),
    }
  }

  parts.join("/")
}

/// Collects the documents named by external `$ref`s anywhere inside `value`.
pub(crate) fn collect_external_documents(value: &Value, pattern: &Regex) -> BTreeSet<String> {
  let mut documents = BTreeSet::new();
  collect_into(value, pattern, &mut documents);
  documents
}

fn collect_into(value: &Value, pattern: &Regex, documents: &mut BTreeSet<String>) {
  match value {
    Value::Object(map) => {
      for (key, child) in map {
        if key == REF_KEY
          && let Some(reference) = child.as_str()
          && let Some(document) = RefPointer::parse(reference, pattern).document
        {
          documents.insert(document);
        } else {
          collect_into(child, pattern, documents);
        }
      }
    }
    Value::Array(items) => items.iter().for_each(|item| collect_into(item, pattern, documents)),
    _ => {}
  }
}
