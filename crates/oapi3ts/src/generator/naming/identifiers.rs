use std::{
  char::{ToLowercase, ToUppercase},
  collections::HashSet,
  iter::Peekable,
  sync::LazyLock,
};

use any_ascii::any_ascii;
use regex::Regex;

use crate::utils::text::quote_literal;

pub(crate) static RESERVED_WORDS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
  [
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do", "else", "enum",
    "export", "extends", "false", "finally", "for", "function", "if", "import", "in", "instanceof", "new", "null",
    "return", "super", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "as",
    "implements", "interface", "let", "package", "private", "protected", "public", "static", "yield", "any",
    "boolean", "constructor", "declare", "get", "module", "require", "number", "set", "string", "symbol", "type",
    "from", "of", "never", "unknown", "object", "keyof", "readonly", "infer", "is", "asserts", "await", "async",
  ]
  .into_iter()
  .collect()
});

/// Global TypeScript type names a generated declaration must not shadow.
static RESERVED_TYPE_NAMES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
  [
    "Array", "Boolean", "Date", "Error", "Function", "Map", "Number", "Object", "Partial", "Promise", "Readonly",
    "Record", "Set", "String", "Symbol",
  ]
  .into_iter()
  .collect()
});

static IDENTIFIER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex"));

/// Returns true when `name` is a syntactically valid identifier that is not a reserved word.
pub(crate) fn is_valid_identifier(name: &str) -> bool {
  IDENTIFIER_RE.is_match(name) && !RESERVED_WORDS.contains(name)
}

/// Renders an object property key, quoting it when it is not a bare identifier.
///
/// Reserved words are legal property names, so only the syntax is checked.
pub(crate) fn property_key(name: &str) -> String {
  if IDENTIFIER_RE.is_match(name) {
    name.to_string()
  } else {
    quote_literal(name)
  }
}

/// Converts a string into a valid TypeScript type name (`PascalCase`).
///
/// # Rules:
/// 1. Input that already mixes upper and lowercase without separators keeps its capitalization.
/// 2. Otherwise words split on separators and case boundaries are capitalized and joined.
/// 3. Global type names such as `Record` or `Promise` get a `Model` suffix.
/// 4. A result starting with a digit is prefixed with `T`.
/// 5. An empty result becomes `Unnamed`.
pub(crate) fn to_type_name(name: &str) -> String {
  let ascii = any_ascii(name);

  let has_separators = ascii.contains(['-', '_', '.', ' ', '/']);
  let has_upper = ascii.chars().any(|c| c.is_ascii_uppercase());
  let has_lower = ascii.chars().any(|c| c.is_ascii_lowercase());
  let appears_mixed_case = !has_separators && has_upper && has_lower;

  let mut ident: String = if appears_mixed_case {
    let cleaned = ascii.chars().filter(char::is_ascii_alphanumeric).collect::<String>();
    let mut chars = cleaned.chars();
    match chars.next() {
      None => String::new(),
      Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
    }
  } else {
    ascii
      .chars()
      .capitalize_words_with_boundaries()
      .filter(char::is_ascii_alphanumeric)
      .collect()
  };

  if ident.is_empty() {
    return "Unnamed".to_string();
  }

  if RESERVED_TYPE_NAMES.contains(ident.as_str()) {
    ident.push_str("Model");
  }

  if ident.starts_with(|c: char| c.is_ascii_digit()) {
    ident.insert(0, 'T');
  }
  ident
}

/// Converts an enum value into an enum member name.
///
/// Returns `None` when the value carries no letters to build a name from or would
/// start with a digit, in which case the enum cannot be declared as a closed enumeration.
pub(crate) fn to_member_name(value: &str) -> Option<String> {
  let ascii = any_ascii(value);
  let first = ascii.chars().find(char::is_ascii_alphanumeric)?;
  if first.is_ascii_digit() {
    return None;
  }

  let member = to_type_name(value);
  is_valid_identifier(&member).then_some(member)
}

/// Builds the suggested name of an anonymous property type: parent name plus the property in `PascalCase`.
pub(crate) fn property_suggestion(parent: &str, property: &str) -> String {
  format!("{parent}{}", to_type_name(property))
}

/// Builds the suggested name of an anonymous array item type.
///
/// Plural parent names are singularized (`Pets` -> `Pet`); anything else gets an `Item` suffix.
pub(crate) fn item_suggestion(parent: &str) -> String {
  let singular = cruet::to_singular(parent);
  if singular.is_empty() || singular == parent {
    format!("{parent}Item")
  } else {
    to_type_name(&singular)
  }
}

/// An extension trait for char iterators to add word capitalization.
pub trait CapitalizeWordsExt: Iterator<Item = char> {
  fn capitalize_words_with_boundaries(self) -> CapitalizeWordsWithBoundaries<Self>
  where
    Self: Sized;
}

impl<I> CapitalizeWordsExt for I
where
  I: Iterator<Item = char>,
{
  fn capitalize_words_with_boundaries(self) -> CapitalizeWordsWithBoundaries<Self>
  where
    Self: Sized,
  {
    CapitalizeWordsWithBoundaries {
      iter: self.peekable(),
      capitalize_next: true,
      prev_was_lower: false,
      pending_upper: None,
      pending_lower: None,
    }
  }
}

/// Capitalizes the first letter of each word and lowercases the rest.
///
/// A word starts after any non-alphanumeric character, at a lower-to-upper
/// transition, or at the last capital of an acronym followed by lowercase (`XMLParser`).
pub struct CapitalizeWordsWithBoundaries<I>
where
  I: Iterator<Item = char>,
{
  iter: Peekable<I>,
  capitalize_next: bool,
  prev_was_lower: bool,
  pending_upper: Option<ToUppercase>,
  pending_lower: Option<ToLowercase>,
}

impl<I> Iterator for CapitalizeWordsWithBoundaries<I>
where
  I: Iterator<Item = char>,
{
  type Item = char;

  fn next(&mut self) -> Option<Self::Item> {
    if let Some(upper) = self.pending_upper.as_mut() {
      if let Some(c) = upper.next() {
        return Some(c);
      }
      self.pending_upper = None;
    }

    if let Some(lower) = self.pending_lower.as_mut() {
      if let Some(c) = lower.next() {
        return Some(c);
      }
      self.pending_lower = None;
    }

    let c = self.iter.next()?;

    if !c.is_ascii_alphanumeric() {
      self.capitalize_next = true;
      self.prev_was_lower = false;
      return Some(c);
    }

    let is_lower = c.is_ascii_lowercase();
    let is_upper = c.is_ascii_uppercase();

    let should_capitalize = self.capitalize_next
      || (self.prev_was_lower && is_upper)
      || (is_upper && self.iter.peek().is_some_and(char::is_ascii_lowercase));

    self.prev_was_lower = is_lower;
    self.capitalize_next = false;

    if should_capitalize {
      self.pending_upper.insert(c.to_uppercase()).next()
    } else {
      self.pending_lower.insert(c.to_lowercase()).next()
    }
  }
}
