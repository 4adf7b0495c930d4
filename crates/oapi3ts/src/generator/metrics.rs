use std::collections::BTreeMap;

use petgraph::{algo::kosaraju_scc, graphmap::DiGraphMap};

use super::{
  descriptor::DescriptorId,
  errors::ParsingWarning,
  render::{DeclarationKind, RenderedModel},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationStats {
  pub models_generated: usize,
  pub interfaces_generated: usize,
  pub enums_generated: usize,
  pub type_aliases_generated: usize,
  /// Rendered models per descriptor kind label (`object`, `allOf`, `generic`, ...).
  pub models_by_kind: BTreeMap<&'static str, usize>,
  pub operations_converted: usize,
  pub cycles_detected: usize,
  pub cycle_details: Vec<Vec<String>>,
  pub warnings: Vec<ParsingWarning>,
}

impl GenerationStats {
  pub fn record_model(&mut self, model: &RenderedModel) {
    self.models_generated += 1;
    match model.declaration {
      DeclarationKind::Interface => self.interfaces_generated += 1,
      DeclarationKind::Enum => self.enums_generated += 1,
      DeclarationKind::TypeAlias => self.type_aliases_generated += 1,
    }
    *self.models_by_kind.entry(model.kind).or_default() += 1;
  }

  pub fn record_operations(&mut self, count: usize) {
    self.operations_converted += count;
  }

  pub fn record_cycle(&mut self, cycle: Vec<String>) {
    self.cycles_detected += 1;
    self.cycle_details.push(cycle);
  }

  pub fn record_cycles(&mut self, cycles: Vec<Vec<String>>) {
    for cycle in cycles {
      self.record_cycle(cycle);
    }
  }

  pub fn record_warnings(&mut self, warnings: impl IntoIterator<Item = ParsingWarning>) {
    self.warnings.extend(warnings);
  }
}

/// Finds reference cycles among rendered models.
///
/// Every strongly connected component with more than one model, or a model that refers
/// to itself, is one cycle; model names inside a cycle are sorted.
pub fn detect_cycles(models: &[RenderedModel]) -> Vec<Vec<String>> {
  let names = models
    .iter()
    .filter_map(|model| model.name.as_deref().map(|name| (model.id, name)))
    .collect::<BTreeMap<_, _>>();

  let mut graph = DiGraphMap::<usize, ()>::new();
  for model in models {
    if !names.contains_key(&model.id) {
      continue;
    }
    graph.add_node(model.id.0);
    for dependency in &model.dependencies {
      if names.contains_key(dependency) {
        graph.add_edge(model.id.0, dependency.0, ());
      }
    }
  }

  let mut cycles = kosaraju_scc(&graph)
    .into_iter()
    .filter(|component| component.len() > 1 || component.iter().any(|node| graph.contains_edge(*node, *node)))
    .map(|component| {
      let mut cycle = component
        .iter()
        .filter_map(|node| names.get(&DescriptorId(*node)).map(|name| (*name).to_string()))
        .collect::<Vec<_>>();
      cycle.sort();
      cycle
    })
    .collect::<Vec<_>>();
  cycles.sort();
  cycles
}
