use std::collections::{BTreeSet, HashMap};

/// Per-run allocator of exported declaration names.
///
/// Every name that ends up as a top-level declaration passes through the registry, so two
/// anonymous types hoisted under the same suggested name get `Name` and `Name2`.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameRegistry {
  used: BTreeSet<String>,
  assigned: HashMap<String, String>,
}

impl NameRegistry {
  /// Returns the name bound to `key`, claiming one derived from `base` on first use.
  ///
  /// Keys are canonical schema paths, so every reference to one schema gets the same name.
  pub(crate) fn assign(&mut self, key: &str, base: &str) -> String {
    if let Some(name) = self.assigned.get(key) {
      return name.clone();
    }
    let name = self.claim(base);
    self.assigned.insert(key.to_string(), name.clone());
    name
  }

  /// Claims the first free name among `base`, `base2`, `base3`, ...
  pub(crate) fn claim(&mut self, base: &str) -> String {
    let name = ensure_unique(base, &self.used);
    self.used.insert(name.clone());
    name
  }
}

/// Ensures a name is unique within a set of used names, appending a numeric suffix if needed.
pub(crate) fn ensure_unique(base_name: &str, used_names: &BTreeSet<String>) -> String {
  if !used_names.contains(base_name) {
    return base_name.to_string();
  }
  (2..)
    .map(|i| format!("{base_name}{i}"))
    .find(|candidate| !used_names.contains(candidate))
    .unwrap_or_else(|| base_name.to_string())
}
