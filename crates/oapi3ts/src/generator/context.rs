use std::collections::HashMap;

use super::{
  descriptor::{Descriptor, DescriptorId, DescriptorKind},
  errors::Diagnostics,
  naming::registry::NameRegistry,
};

/// Where a path stands in the memo table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoState {
  Fresh,
  InProgress,
  Complete(Vec<DescriptorId>),
}

/// Mutable state of one conversion run: the descriptor arena, the memo table keyed
/// by canonical path, the name registry and the collected warnings.
///
/// A fresh context is needed per document.
#[derive(Debug, Default)]
pub struct ConversionContext {
  descriptors: Vec<Descriptor>,
  complete: HashMap<String, Vec<DescriptorId>>,
  in_progress: HashMap<String, Option<DescriptorId>>,
  pub names: NameRegistry,
  pub diagnostics: Diagnostics,
}

impl ConversionContext {
  pub fn new(diagnostics: Diagnostics) -> Self {
    Self {
      diagnostics,
      ..Self::default()
    }
  }

  pub fn insert(&mut self, descriptor: Descriptor) -> DescriptorId {
    let id = DescriptorId(self.descriptors.len());
    self.descriptors.push(descriptor);
    id
  }

  pub fn get(&self, id: DescriptorId) -> &Descriptor {
    &self.descriptors[id.0]
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.descriptors.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.descriptors.is_empty()
  }

  pub fn memo_state(&self, path: &str) -> MemoState {
    if let Some(ids) = self.complete.get(path) {
      MemoState::Complete(ids.clone())
    } else if self.in_progress.contains_key(path) {
      MemoState::InProgress
    } else {
      MemoState::Fresh
    }
  }

  pub fn begin(&mut self, path: &str) {
    self.in_progress.insert(path.to_string(), None);
  }

  /// Placeholder standing in for `path` until its conversion completes.
  ///
  /// Allocated once per path and only when a cycle actually reaches it.
  pub fn forward(&mut self, path: &str) -> DescriptorId {
    if let Some(Some(id)) = self.in_progress.get(path) {
      return *id;
    }
    let id = self.insert(
      Descriptor::builder()
        .kind(DescriptorKind::Forward(path.to_string()))
        .original_path(path)
        .build(),
    );
    self.in_progress.insert(path.to_string(), Some(id));
    id
  }

  pub fn finish(&mut self, path: &str, ids: Vec<DescriptorId>) {
    self.in_progress.remove(path);
    self.complete.insert(path.to_string(), ids);
  }

  pub fn abandon(&mut self, path: &str) {
    self.in_progress.remove(path);
  }

  pub fn completed(&self, path: &str) -> Option<&[DescriptorId]> {
    self.complete.get(path).map(Vec::as_slice)
  }

  /// Follows forward placeholders to the descriptors they stand for.
  pub fn resolve(&self, id: DescriptorId) -> Vec<DescriptorId> {
    self.resolve_guarded(id, 0)
  }

  fn resolve_guarded(&self, id: DescriptorId, depth: usize) -> Vec<DescriptorId> {
    match &self.get(id).kind {
      DescriptorKind::Forward(path) if depth < self.descriptors.len() => self
        .completed(path)
        .map(|ids| ids.iter().flat_map(|next| self.resolve_guarded(*next, depth + 1)).collect())
        .unwrap_or_default(),
      DescriptorKind::Forward(_) => vec![],
      _ => vec![id],
    }
  }
}
