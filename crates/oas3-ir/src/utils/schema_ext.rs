use oas3::spec::Discriminator;
use serde_json::{Map, Value};
use strum::Display;

pub const REF_KEY: &str = "$ref";
pub const X_OMIT: &str = "x-omit";
pub const X_PICK: &str = "x-pick";
pub const X_EXTENSIBLE_ENUM: &str = "x-extensible-enum";
pub const X_DISCRIMINATOR_VALUES: &str = "x-discriminator-values";

const PRIMITIVE_TYPES: [&str; 4] = ["string", "number", "integer", "boolean"];

/// Closed classification of a raw schema node, computed once per node.
///
/// Variants are listed in classification priority: the first matching shape
/// wins (an `enum` of strings is an `Enum`, not a `Primitive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SchemaKind {
  Enum,
  Union,
  Primitive,
  Array,
  Extended,
  Object,
  Opaque,
}

/// Extension methods for raw schema values to query their shape conveniently.
pub trait SchemaExt {
  /// Returns the `$ref` pointer if the node is a reference.
  fn ref_path(&self) -> Option<&str>;

  fn is_ref(&self) -> bool {
    self.ref_path().is_some()
  }

  fn all_of(&self) -> Option<&[Value]>;

  fn one_of(&self) -> Option<&[Value]>;

  fn any_of(&self) -> Option<&[Value]>;

  /// Returns the `oneOf` members, falling back to `anyOf`.
  fn union_members(&self) -> Option<&[Value]> {
    self.one_of().or_else(|| self.any_of())
  }

  fn properties(&self) -> Option<&Map<String, Value>>;

  /// Returns the names listed in `required`, ignoring non-string entries.
  fn required_names(&self) -> Vec<&str>;

  fn is_required(&self, property: &str) -> bool {
    self.required_names().contains(&property)
  }

  fn items(&self) -> Option<&Value>;

  fn enum_values(&self) -> Option<&[Value]>;

  /// Returns the declared type, skipping `"null"` in a type array.
  fn schema_type(&self) -> Option<&str>;

  /// True for OpenAPI 3.0 `nullable: true` or a type array containing `"null"`.
  fn is_nullable(&self) -> bool;

  fn discriminator(&self) -> Option<Discriminator>;

  fn has_discriminator(&self) -> bool;

  /// Returns true if the schema carries an `x-omit` or `x-pick` directive.
  fn has_directive(&self) -> bool;

  fn schema_kind(&self) -> SchemaKind;
}

impl SchemaExt for Value {
  fn ref_path(&self) -> Option<&str> {
    self.get(REF_KEY).and_then(Value::as_str)
  }

  fn all_of(&self) -> Option<&[Value]> {
    self.get("allOf").and_then(Value::as_array).map(Vec::as_slice)
  }

  fn one_of(&self) -> Option<&[Value]> {
    self.get("oneOf").and_then(Value::as_array).map(Vec::as_slice)
  }

  fn any_of(&self) -> Option<&[Value]> {
    self.get("anyOf").and_then(Value::as_array).map(Vec::as_slice)
  }

  fn properties(&self) -> Option<&Map<String, Value>> {
    self.get("properties").and_then(Value::as_object)
  }

  fn required_names(&self) -> Vec<&str> {
    self
      .get("required")
      .and_then(Value::as_array)
      .map(|names| names.iter().filter_map(Value::as_str).collect())
      .unwrap_or_default()
  }

  fn items(&self) -> Option<&Value> {
    self.get("items").filter(|items| items.is_object())
  }

  fn enum_values(&self) -> Option<&[Value]> {
    self.get("enum").and_then(Value::as_array).map(Vec::as_slice)
  }

  fn schema_type(&self) -> Option<&str> {
    match self.get("type")? {
      Value::String(schema_type) => Some(schema_type.as_str()),
      Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
      _ => None,
    }
  }

  fn is_nullable(&self) -> bool {
    if self.get("nullable").and_then(Value::as_bool).unwrap_or(false) {
      return true;
    }
    self
      .get("type")
      .and_then(Value::as_array)
      .is_some_and(|types| types.iter().any(|t| t.as_str() == Some("null")))
  }

  fn discriminator(&self) -> Option<Discriminator> {
    self
      .get("discriminator")
      .and_then(|raw| serde_json::from_value::<Discriminator>(raw.clone()).ok())
  }

  fn has_discriminator(&self) -> bool {
    self.get("discriminator").is_some_and(Value::is_object)
  }

  fn has_directive(&self) -> bool {
    self.get(X_OMIT).is_some() || self.get(X_PICK).is_some()
  }

  fn schema_kind(&self) -> SchemaKind {
    if let Some(values) = self.enum_values()
      && !values.is_empty()
      && values.iter().all(is_primitive_value)
    {
      return SchemaKind::Enum;
    }
    if self.union_members().is_some() {
      return SchemaKind::Union;
    }
    if self.schema_type().is_some_and(|t| PRIMITIVE_TYPES.contains(&t)) {
      return SchemaKind::Primitive;
    }
    if self.items().is_some() || self.schema_type() == Some("array") {
      return SchemaKind::Array;
    }
    if self.all_of().is_some() {
      return SchemaKind::Extended;
    }
    if self.schema_type() == Some("object") || self.properties().is_some() {
      return SchemaKind::Object;
    }
    SchemaKind::Opaque
  }
}

/// Returns true for JSON values a literal enum may hold (strings, numbers,
/// booleans and `null`).
pub fn is_primitive_value(value: &Value) -> bool {
  !matches!(value, Value::Array(_) | Value::Object(_))
}
