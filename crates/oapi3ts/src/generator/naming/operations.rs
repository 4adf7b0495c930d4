use inflections::Inflect;
use itertools::Itertools;

use super::identifiers::to_type_name;

/// Builds the base type name of an operation.
///
/// An explicit operation id is camel-cased with an upper first letter. Without one the
/// name is synthesized from the method and path, turning `{param}` segments into `By<Param>`.
pub(crate) fn operation_base_name(method: &str, path: &str, operation_id: Option<&str>) -> String {
  match operation_id.map(str::trim).filter(|id| !id.is_empty()) {
    Some(id) => to_type_name(id),
    None => to_type_name(&synthesize_operation_id(method, path)),
  }
}

/// Synthesizes an operation id from the method and path (`get_pets_by_pet_id`).
pub(crate) fn synthesize_operation_id(method: &str, path: &str) -> String {
  let segments = path
    .split('/')
    .filter(|segment| !segment.is_empty())
    .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
      Some(param) => format!("by_{}", param.to_snake_case()),
      None => segment.to_snake_case(),
    })
    .collect::<Vec<_>>();

  let method = method.to_ascii_lowercase();
  if segments.is_empty() {
    method
  } else {
    format!("{method}_{}", segments.iter().join("_"))
  }
}
