use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

static BLANK_RUNS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

#[inline]
#[must_use]
fn process_doc_text(input: &str) -> String {
  input.replace("\\n", "\n").replace("*/", "*\\/")
}

/// Splits documentation text into trimmed lines, dropping leading and trailing blank lines.
#[must_use]
pub(crate) fn doc_lines(input: &str) -> Vec<String> {
  let lines = process_doc_text(input)
    .lines()
    .map(|line| line.trim_end().to_string())
    .collect::<Vec<_>>();

  let start = lines.iter().position(|line| !line.trim().is_empty()).unwrap_or(lines.len());
  let end = lines
    .iter()
    .rposition(|line| !line.trim().is_empty())
    .map_or(start, |index| index + 1);

  lines[start..end].to_vec()
}

/// Renders documentation lines as a JSDoc block.
///
/// A single line collapses into `/** line */`; anything longer uses the
/// multi-line form with a leading ` * ` on each line.
#[must_use]
pub(crate) fn doc_block(lines: &[String]) -> Option<String> {
  match lines {
    [] => None,
    [single] => Some(format!("/** {single} */")),
    _ => {
      let body = lines
        .iter()
        .map(|line| {
          if line.is_empty() {
            " *".to_string()
          } else {
            format!(" * {line}")
          }
        })
        .join("\n");
      Some(format!("/**\n{body}\n */"))
    }
  }
}

/// Renders text as an inline block comment, flattening line breaks.
#[must_use]
pub(crate) fn inline_comment(input: &str) -> Option<String> {
  let text = doc_lines(input).iter().map(|line| line.trim()).join(" ");
  if text.is_empty() {
    None
  } else {
    Some(format!("/* {text} */"))
  }
}

/// Prefixes every non-empty line of `text` with `pad`.
#[must_use]
pub(crate) fn indent_all(text: &str, pad: &str) -> String {
  text
    .lines()
    .map(|line| {
      if line.is_empty() {
        String::new()
      } else {
        format!("{pad}{line}")
      }
    })
    .join("\n")
}

/// Quotes a string as a single-quoted TypeScript literal.
#[must_use]
pub(crate) fn quote_literal(value: &str) -> String {
  let escaped = value
    .replace('\\', "\\\\")
    .replace('\'', "\\'")
    .replace('\n', "\\n")
    .replace('\r', "\\r");
  format!("'{escaped}'")
}

/// Normalises whitespace of the concatenated declarations.
///
/// Trailing whitespace is stripped, runs of blank lines collapse into one and the
/// output ends with exactly one newline. Runs after rendering, never during it.
#[must_use]
pub(crate) fn format_output(input: &str) -> String {
  let trimmed = input.lines().map(str::trim_end).join("\n");
  let collapsed = BLANK_RUNS_RE.replace_all(&trimmed, "\n\n");
  let body = collapsed.trim_matches('\n');
  if body.is_empty() {
    String::new()
  } else {
    format!("{body}\n")
  }
}
