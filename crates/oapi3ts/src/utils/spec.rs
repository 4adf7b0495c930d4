use std::{
  collections::{BTreeMap, VecDeque},
  ffi::OsStr,
  path::{Path, PathBuf},
};

use anyhow::Context;
use fmmap::tokio::{AsyncMmapFile, AsyncMmapFileExt};
use regex::Regex;
use serde_json::Value;

use crate::{
  generator::convertor::ForeignSchemaResolver,
  utils::refs::{RefPointer, collect_external_documents, rebase_refs, resolve_pointer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecFormat {
  #[default]
  Json,
  Yaml,
}

impl SpecFormat {
  #[must_use]
  pub fn from_extension(ext: &str) -> Self {
    match ext {
      "yaml" | "yml" => Self::Yaml,
      _ => Self::Json,
    }
  }

  #[must_use]
  pub fn from_path(path: &Path) -> Self {
    path
      .extension()
      .and_then(OsStr::to_str)
      .map_or(Self::default(), Self::from_extension)
  }
}

pub struct SpecLoader {
  file: AsyncMmapFile,
  format: SpecFormat,
}

impl SpecLoader {
  pub async fn open(path: &Path) -> anyhow::Result<Self> {
    let format = SpecFormat::from_path(path);
    let file = AsyncMmapFile::open(path)
      .await
      .with_context(|| format!("failed to open {}", path.display()))?;

    Ok(Self { file, format })
  }

  /// Parses the document into a generic JSON tree; YAML is converted on the way in.
  pub fn parse(&self) -> anyhow::Result<Value> {
    match self.format {
      SpecFormat::Json => Ok(serde_json::from_slice::<Value>(self.file.as_slice())?),
      SpecFormat::Yaml => {
        let content = std::str::from_utf8(self.file.as_slice())?;
        Ok(serde_yaml::from_str::<Value>(content)?)
      }
    }
  }
}

/// Foreign documents referenced from the root document, loaded ahead of conversion.
///
/// Keys are document paths relative to the root document's directory. Every `$ref` inside a
/// loaded document is re-based so it can be resolved without knowing where it came from.
#[derive(Debug, Default)]
pub struct ExternalDocuments {
  documents: BTreeMap<String, Value>,
}

impl ExternalDocuments {
  /// Loads every document reachable through external `$ref`s of `root`, transitively.
  pub async fn preload(root_path: &Path, root: &Value, pattern: &Regex) -> anyhow::Result<Self> {
    let base_dir = root_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut documents = BTreeMap::new();
    let mut pending = collect_external_documents(root, pattern)
      .into_iter()
      .collect::<VecDeque<_>>();

    while let Some(key) = pending.pop_front() {
      if documents.contains_key(&key) {
        continue;
      }

      let path: PathBuf = base_dir.join(&key);
      let mut document = SpecLoader::open(&path).await?.parse()?;
      rebase_refs(&mut document, &key, pattern);

      pending.extend(
        collect_external_documents(&document, pattern)
          .into_iter()
          .filter(|next| !documents.contains_key(next)),
      );
      documents.insert(key, document);
    }

    Ok(Self { documents })
  }

  pub fn len(&self) -> usize {
    self.documents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.documents.is_empty()
  }

  #[cfg(test)]
  pub(crate) fn from_documents(documents: impl IntoIterator<Item = (String, Value)>) -> Self {
    Self {
      documents: documents.into_iter().collect(),
    }
  }
}

impl ForeignSchemaResolver for ExternalDocuments {
  fn resolve(&self, pointer: &RefPointer) -> anyhow::Result<Value> {
    let document = pointer.document.as_deref().context("reference does not name a document")?;
    let loaded = self
      .documents
      .get(document)
      .with_context(|| format!("document '{document}' was not loaded"))?;

    resolve_pointer(loaded, &pointer.pointer)
      .cloned()
      .with_context(|| format!("'{}' not found in '{document}'", pointer.pointer))
  }
}
