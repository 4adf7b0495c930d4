use std::sync::LazyLock;

use regex::Regex;

pub(crate) const DEFAULT_JSON_PATH_PATTERN: &str = r"^([^#]*)#(.*)$";

static DEFAULT_JSON_PATH_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(DEFAULT_JSON_PATH_PATTERN).expect("static regex"));

/// Keywords that never make two schemas meaningfully different.
pub(crate) const DEFAULT_EXCLUDED_COMPARISON_KEYS: &[&str] = &[
  "title",
  "description",
  "example",
  "examples",
  "default",
  "externalDocs",
  "deprecated",
];

const NAME_PLACEHOLDER: &str = "{name}";

/// Settings of one conversion run.
#[derive(Debug, Clone, bon::Builder)]
pub struct ConvertorConfig {
  /// Splits `$ref` values: group 1 is the document, group 2 the pointer inside it.
  #[builder(default = DEFAULT_JSON_PATH_RE.clone())]
  pub json_path_regex: Regex,
  /// When set, a named ref-only schema is replaced by its target instead of extending it.
  #[builder(default)]
  pub implicit_types_ref_replacement: bool,
  #[builder(into, default = "{name}Parameters".to_string())]
  pub parameters_model_name: String,
  #[builder(into, default = "{name}Request".to_string())]
  pub request_model_name: String,
  #[builder(into, default = "{name}Response".to_string())]
  pub response_model_name: String,
  #[builder(into, default = "{name}Headers".to_string())]
  pub headers_model_name: String,
  #[builder(default = DEFAULT_EXCLUDED_COMPARISON_KEYS.iter().map(ToString::to_string).collect())]
  pub excluded_comparison_keys: Vec<String>,
  #[builder(into, default = "application/json".to_string())]
  pub default_content_type: String,
  #[builder(into, default = "/".to_string())]
  pub default_server_url: String,
  #[builder(default)]
  pub warnings_fatal: bool,
  /// Also render every `components.schemas` entry, referenced or not.
  #[builder(default)]
  pub include_all_schemas: bool,
}

impl Default for ConvertorConfig {
  fn default() -> Self {
    Self::builder().build()
  }
}

impl ConvertorConfig {
  pub fn parameters_name(&self, base: &str) -> String {
    fill_template(&self.parameters_model_name, base)
  }

  pub fn request_name(&self, base: &str) -> String {
    fill_template(&self.request_model_name, base)
  }

  pub fn response_name(&self, base: &str) -> String {
    fill_template(&self.response_model_name, base)
  }

  pub fn headers_name(&self, base: &str) -> String {
    fill_template(&self.headers_model_name, base)
  }

  pub fn is_excluded_key(&self, key: &str) -> bool {
    self.excluded_comparison_keys.iter().any(|excluded| excluded == key)
  }
}

fn fill_template(template: &str, base: &str) -> String {
  if template.contains(NAME_PLACEHOLDER) {
    template.replace(NAME_PLACEHOLDER, base)
  } else {
    format!("{base}{template}")
  }
}
