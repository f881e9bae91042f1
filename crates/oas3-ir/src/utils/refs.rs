pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Stable identity of a schema node: the `$ref` pointer of a named component,
/// or the JSON pointer of the location an inline schema occupies.
pub type NodeId = String;

/// Parses a schema `$ref` path and extracts the referenced component name.
///
/// Returns `None` unless the pointer designates a direct child of
/// `#/components/schemas`; nested pointers such as
/// `#/components/schemas/Pet/properties/owner` are inline locations, not
/// named components.
pub fn parse_schema_ref_path(ref_path: &str) -> Option<String> {
  let name = ref_path.strip_prefix(SCHEMA_REF_PREFIX)?;
  if name.is_empty() || name.contains('/') {
    return None;
  }
  Some(unescape_segment(name))
}

/// Builds the `$ref` pointer for a named schema component.
pub fn schema_ref(name: &str) -> String {
  format!("{SCHEMA_REF_PREFIX}{}", escape_segment(name))
}

/// Escapes one JSON pointer segment (`~` → `~0`, `/` → `~1`).
pub fn escape_segment(segment: &str) -> String {
  segment.replace('~', "~0").replace('/', "~1")
}

pub fn unescape_segment(segment: &str) -> String {
  segment.replace("~1", "/").replace("~0", "~")
}

/// Appends one or more raw segments to a pointer, escaping each.
pub fn join_pointer<I, S>(base: &str, segments: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut pointer = base.to_string();
  for segment in segments {
    pointer.push('/');
    pointer.push_str(&escape_segment(segment.as_ref()));
  }
  pointer
}

/// Converts a `#/a/b` reference into the `/a/b` form `serde_json` expects.
pub fn to_json_pointer(reference: &str) -> Option<&str> {
  match reference.strip_prefix('#') {
    Some("") => Some(""),
    Some(pointer) if pointer.starts_with('/') => Some(pointer),
    _ => None,
  }
}
