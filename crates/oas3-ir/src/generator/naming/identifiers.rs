use std::{collections::BTreeSet, sync::LazyLock};

use any_ascii::any_ascii;
use inflections::Inflect;
use regex::Regex;

static INVALID_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());
static MULTI_UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());
static PATH_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{(.+)\}$").unwrap());

/// Transliterates to ASCII, replaces invalid characters with underscores,
/// collapses consecutive underscores and trims them from both ends.
pub(crate) fn sanitize(input: &str) -> String {
  if input.is_empty() {
    return String::new();
  }

  let ascii = any_ascii(input);
  let replaced = INVALID_CHARS_RE.replace_all(&ascii, "_");
  let collapsed = MULTI_UNDERSCORE_RE.replace_all(&replaced, "_");

  collapsed.trim_matches('_').to_string()
}

/// Converts a component, property or operation name into a `PascalCase`
/// type name.
///
/// Names that are already mixed case without separators (`PetOwner`) keep
/// their capitalization. An empty result becomes `Unnamed`; a leading digit
/// is prefixed with `T`.
pub fn to_type_name(name: &str) -> String {
  let has_separators = name.contains(['-', '_', '.', ' ', '/']);
  let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
  let has_lower = name.chars().any(|c| c.is_ascii_lowercase());

  let mut ident = if !has_separators && has_upper && has_lower {
    let cleaned: String = any_ascii(name).chars().filter(char::is_ascii_alphanumeric).collect();
    let mut chars = cleaned.chars();
    match chars.next() {
      None => String::new(),
      Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
    }
  } else {
    sanitize(name).to_pascal_case()
  };

  if ident.is_empty() {
    return "Unnamed".to_string();
  }
  if ident.starts_with(|c: char| c.is_ascii_digit()) {
    ident.insert(0, 'T');
  }
  ident
}

/// Builds the name of an inline schema from its owner's name and the
/// position it occupies (`Pet` + `owner` → `PetOwner`).
pub fn inline_name(owner: &str, position: &str) -> String {
  format!("{}{}", to_type_name(owner), to_type_name(position))
}

/// Name for the items of an array: the singular of the array's name, or
/// `{name}Item` when singularizing changes nothing.
pub fn singular_item_name(array_name: &str) -> String {
  let singular = cruet::to_singular(array_name);
  if singular.is_empty() || singular == array_name {
    format!("{array_name}Item")
  } else {
    to_type_name(&singular)
  }
}

/// Ensures a name is unique within a set of used names, appending a numeric
/// suffix if needed.
pub(crate) fn ensure_unique(base_name: &str, used_names: &BTreeSet<String>) -> String {
  if !used_names.contains(base_name) {
    return base_name.to_string();
  }
  let mut i = 2;
  loop {
    let new_name = format!("{base_name}{i}");
    if !used_names.contains(&new_name) {
      return new_name;
    }
    i += 1;
  }
}

/// Derives a `snake_case` name for an operation without `operationId`.
///
/// `GET /pets/{id}` becomes `get_pets_by_id`.
pub fn generate_operation_id(method: &str, path: &str) -> String {
  let mut parts = vec![method.to_lowercase()];
  for segment in path.split('/').filter(|segment| !segment.is_empty()) {
    match PATH_PARAM_RE.captures(segment).and_then(|captures| captures.get(1)) {
      Some(param) => {
        parts.push("by".to_string());
        parts.push(sanitize(param.as_str()).to_snake_case());
      }
      None => parts.push(sanitize(segment).to_snake_case()),
    }
  }
  parts.retain(|part| !part.is_empty());
  parts.join("_")
}
