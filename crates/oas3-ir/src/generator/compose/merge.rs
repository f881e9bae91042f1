use serde_json::{Map, Value};

use super::directives::Directive;
use crate::{
  error::{PipelineError, Result},
  generator::resolver::Resolver,
  utils::{
    SchemaExt,
    schema_ext::{X_OMIT, X_PICK},
  },
};

const LOWER_BOUNDS: [&str; 5] = ["minimum", "exclusiveMinimum", "minLength", "minItems", "minProperties"];
const UPPER_BOUNDS: [&str; 5] = ["maximum", "exclusiveMaximum", "maxLength", "maxItems", "maxProperties"];

/// Generic JSON-schema merge used to collapse `allOf` element chains.
///
/// `required` is unioned, `properties` merge per key, `enum` is intersected,
/// bounds tighten, and any other keyword takes the later element's value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SchemaMerger<'a> {
  resolver: Resolver<'a>,
}

impl<'a> SchemaMerger<'a> {
  pub(crate) fn new(resolver: Resolver<'a>) -> Self {
    Self { resolver }
  }

  /// Merges `next` into `acc`.
  pub(crate) fn merge(&self, acc: &mut Value, next: &Value) -> Result<()> {
    let Some(next_map) = next.as_object() else {
      return Ok(());
    };
    if !acc.is_object() {
      *acc = Value::Object(Map::new());
    }
    let Some(acc_map) = acc.as_object_mut() else {
      return Ok(());
    };

    for (key, value) in next_map {
      match key.as_str() {
        "required" => merge_required(acc_map, value),
        "properties" => self.merge_properties(acc_map, value)?,
        "items" | "additionalProperties" => self.merge_subschema(acc_map, key, value)?,
        "allOf" => concat_array(acc_map, key, value),
        "type" => merge_type(acc_map, value)?,
        "enum" => merge_enum(acc_map, value)?,
        X_OMIT => merge_directive(acc_map, Directive::Omit, value),
        X_PICK => merge_directive(acc_map, Directive::Pick, value),
        bound if LOWER_BOUNDS.contains(&bound) => tighten_bound(acc_map, key, value, f64::max),
        bound if UPPER_BOUNDS.contains(&bound) => tighten_bound(acc_map, key, value, f64::min),
        _ => {
          acc_map.insert(key.clone(), value.clone());
        }
      }
    }
    Ok(())
  }

  fn merge_properties(&self, acc_map: &mut Map<String, Value>, next: &Value) -> Result<()> {
    let Some(next_properties) = next.as_object() else {
      return Ok(());
    };
    let properties = acc_map
      .entry("properties")
      .or_insert_with(|| Value::Object(Map::new()));
    let Some(properties) = properties.as_object_mut() else {
      return Ok(());
    };

    for (name, value) in next_properties {
      let merged = match properties.get(name) {
        Some(existing) => self.merge_property(existing, value)?,
        None => value.clone(),
      };
      properties.insert(name.clone(), merged);
    }
    Ok(())
  }

  fn merge_subschema(&self, acc_map: &mut Map<String, Value>, key: &str, next: &Value) -> Result<()> {
    let merged = match acc_map.get(key) {
      Some(existing) if existing.is_object() && next.is_object() => self.merge_property(existing, next)?,
      _ => next.clone(),
    };
    acc_map.insert(key.to_string(), merged);
    Ok(())
  }

  /// Merges two values of the same property.
  ///
  /// When either side is a reference, both sides are resolved and merged; the
  /// reference is kept if the merge left its target unchanged, otherwise the
  /// merged schema is inlined in its place.
  pub(crate) fn merge_property(&self, left: &Value, right: &Value) -> Result<Value> {
    if left == right {
      return Ok(left.clone());
    }

    if left.is_ref() || right.is_ref() {
      let left_target = self.resolver.resolve_cloned(left, "")?.schema;
      let right_target = self.resolver.resolve_cloned(right, "")?.schema;
      let mut merged = left_target.clone();
      self.merge(&mut merged, &right_target)?;

      if left.is_ref() && merged == left_target {
        return Ok(left.clone());
      }
      if right.is_ref() && merged == right_target {
        return Ok(right.clone());
      }
      return Ok(merged);
    }

    let mut merged = left.clone();
    self.merge(&mut merged, right)?;
    Ok(merged)
  }
}

fn merge_required(acc_map: &mut Map<String, Value>, next: &Value) {
  let Some(next_names) = next.as_array() else {
    return;
  };
  let required = acc_map.entry("required").or_insert_with(|| Value::Array(vec![]));
  if let Some(required) = required.as_array_mut() {
    for name in next_names {
      if !required.contains(name) {
        required.push(name.clone());
      }
    }
  }
}

fn concat_array(acc_map: &mut Map<String, Value>, key: &str, next: &Value) {
  let Some(next_values) = next.as_array() else {
    return;
  };
  match acc_map.get_mut(key).and_then(Value::as_array_mut) {
    Some(values) => values.extend(next_values.iter().cloned()),
    None => {
      acc_map.insert(key.to_string(), next.clone());
    }
  }
}

fn merge_type(acc_map: &mut Map<String, Value>, next: &Value) -> Result<()> {
  let Some(existing) = acc_map.get("type").cloned() else {
    acc_map.insert("type".to_string(), next.clone());
    return Ok(());
  };
  if existing == *next {
    return Ok(());
  }

  let left = single_type(&existing);
  let right = single_type(next);
  match (left, right) {
    (Some(l), Some(r)) if l == r => Ok(()),
    (Some("integer"), Some("number")) => Ok(()),
    (Some("number"), Some("integer")) => {
      acc_map.insert("type".to_string(), next.clone());
      Ok(())
    }
    _ => Err(PipelineError::IncompatibleMerge {
      keyword: "type".to_string(),
      left: existing.to_string(),
      right: next.to_string(),
    }),
  }
}

fn single_type(value: &Value) -> Option<&str> {
  match value {
    Value::String(schema_type) => Some(schema_type),
    Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
    _ => None,
  }
}

fn merge_enum(acc_map: &mut Map<String, Value>, next: &Value) -> Result<()> {
  let Some(next_values) = next.as_array() else {
    return Ok(());
  };
  let Some(existing) = acc_map.get("enum").and_then(Value::as_array) else {
    acc_map.insert("enum".to_string(), next.clone());
    return Ok(());
  };

  let intersection: Vec<Value> = existing.iter().filter(|v| next_values.contains(v)).cloned().collect();
  if intersection.is_empty() {
    return Err(PipelineError::IncompatibleMerge {
      keyword: "enum".to_string(),
      left: Value::Array(existing.clone()).to_string(),
      right: next.to_string(),
    });
  }
  acc_map.insert("enum".to_string(), Value::Array(intersection));
  Ok(())
}

fn tighten_bound(acc_map: &mut Map<String, Value>, key: &str, next: &Value, pick: fn(f64, f64) -> f64) {
  let tightened = match (acc_map.get(key).and_then(Value::as_f64), next.as_f64()) {
    (Some(existing), Some(candidate)) if pick(existing, candidate) == existing => return,
    _ => next.clone(),
  };
  acc_map.insert(key.to_string(), tightened);
}

/// Combines two `x-omit`/`x-pick` annotations that meet during a merge.
///
/// Arrays concatenate, object maps merge shallowly, and booleans are OR'd
/// for `x-omit` while the later boolean wins for `x-pick`.
fn merge_directive(acc_map: &mut Map<String, Value>, directive: Directive, next: &Value) {
  let key = directive.key();
  let Some(existing) = acc_map.get_mut(key) else {
    acc_map.insert(key.to_string(), next.clone());
    return;
  };

  match (existing, next) {
    (Value::Bool(left), Value::Bool(right)) => *left = combine_flags(directive, *left, *right),
    (Value::Object(left), Value::Object(right)) => {
      for (field, value) in right {
        match (left.get_mut(field), value) {
          (Some(Value::Array(names)), Value::Array(more)) => {
            for name in more {
              if !names.contains(name) {
                names.push(name.clone());
              }
            }
          }
          (Some(Value::Bool(flag)), Value::Bool(other)) => *flag = combine_flags(directive, *flag, *other),
          (Some(Value::Object(entries)), Value::Object(more)) => {
            entries.extend(more.iter().map(|(k, v)| (k.clone(), v.clone())));
          }
          _ => {
            left.insert(field.clone(), value.clone());
          }
        }
      }
    }
    (slot, _) => *slot = next.clone(),
  }
}

fn combine_flags(directive: Directive, left: bool, right: bool) -> bool {
  match directive {
    Directive::Omit => left || right,
    Directive::Pick => right,
  }
}
