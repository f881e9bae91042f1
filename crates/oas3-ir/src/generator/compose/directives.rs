use serde_json::{Map, Value};
use strum::Display;

use crate::{
  error::{PipelineError, Result, SchemaContext},
  generator::{metrics::PipelineStats, resolver::Resolver},
  utils::{
    SchemaExt,
    refs::join_pointer,
    schema_ext::{X_OMIT, X_PICK},
  },
};

/// Nesting limit for directives that recurse through referenced properties.
pub const MAX_DIRECTIVE_DEPTH: usize = 10;

/// A field-filtering annotation attached to a schema or an `allOf` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Directive {
  #[strum(to_string = "x-omit")]
  Omit,
  #[strum(to_string = "x-pick")]
  Pick,
}

impl Directive {
  pub const ALL: [Directive; 2] = [Directive::Omit, Directive::Pick];

  pub fn key(self) -> &'static str {
    match self {
      Self::Omit => X_OMIT,
      Self::Pick => X_PICK,
    }
  }

  /// Removes both directives from a schema, in application order.
  pub(crate) fn take_all(schema: &mut Value) -> Vec<(Directive, Value)> {
    let Some(map) = schema.as_object_mut() else {
      return vec![];
    };
    Self::ALL
      .into_iter()
      .filter_map(|directive| map.shift_remove(directive.key()).map(|spec| (directive, spec)))
      .collect()
  }
}

/// Applies `x-omit`/`x-pick` directives to schemas.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldFilter<'a> {
  resolver: Resolver<'a>,
}

impl<'a> FieldFilter<'a> {
  pub(crate) fn new(resolver: Resolver<'a>) -> Self {
    Self { resolver }
  }

  /// Consumes every directive the schema carries and applies it to the schema.
  ///
  /// Returns the number of directives applied.
  pub(crate) fn apply_own(&self, schema: &mut Value) -> Result<usize> {
    self.apply_own_at(schema, 0)
  }

  fn apply_own_at(&self, schema: &mut Value, depth: usize) -> Result<usize> {
    let directives = Directive::take_all(schema);
    for (directive, spec) in &directives {
      self.apply(*directive, schema, spec, depth)?;
    }
    Ok(directives.len())
  }

  /// Filters `schema` through one directive value.
  pub(crate) fn apply(&self, directive: Directive, schema: &mut Value, spec: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DIRECTIVE_DEPTH {
      return Err(PipelineError::DirectiveDepthExceeded {
        directive: directive.key(),
        limit: MAX_DIRECTIVE_DEPTH,
      });
    }

    if self.resolver.resolve_in_place(schema)?.is_some() {
      self.apply_own_at(schema, depth + 1)?;
    }

    match (directive, spec) {
      (Directive::Omit, Value::Bool(true)) => {
        remove_keys(schema, &["properties", "required"]);
        Ok(())
      }
      (Directive::Pick, Value::Bool(false)) => {
        remove_keys(schema, &["properties", "required"]);
        Ok(())
      }
      (_, Value::Bool(_)) => Ok(()),
      (_, Value::Object(fields)) => self.apply_fields(directive, schema, fields, depth),
      (_, other) => Err(PipelineError::InvalidDirective {
        directive: directive.key(),
        message: format!("expected an object or boolean, found {other}"),
      }),
    }
  }

  fn apply_fields(
    &self,
    directive: Directive,
    schema: &mut Value,
    fields: &Map<String, Value>,
    depth: usize,
  ) -> Result<()> {
    if let Some(properties) = fields.get("properties") {
      self.filter_properties(directive, schema, properties, depth)?;
    }

    match fields.get("required") {
      Some(required) => filter_required(directive, schema, required)?,
      None if directive == Directive::Pick && fields.contains_key("properties") => retain_present_required(schema),
      None => {}
    }

    for (keyword, flag) in fields {
      if keyword == "properties" || keyword == "required" {
        continue;
      }
      let remove = match (directive, flag) {
        (Directive::Omit, Value::Bool(flag)) => *flag,
        (Directive::Pick, Value::Bool(flag)) => !*flag,
        _ => {
          return Err(PipelineError::InvalidDirective {
            directive: directive.key(),
            message: format!("flag '{keyword}' must be a boolean"),
          });
        }
      };
      if remove {
        remove_keys(schema, &[keyword.as_str()]);
      }
    }
    Ok(())
  }

  fn filter_properties(&self, directive: Directive, schema: &mut Value, spec: &Value, depth: usize) -> Result<()> {
    let entries = match spec {
      Value::Bool(all) => {
        if matches!((directive, *all), (Directive::Omit, true) | (Directive::Pick, false)) {
          remove_keys(schema, &["properties", "required"]);
        }
        return Ok(());
      }
      Value::Object(entries) => entries,
      other => {
        return Err(PipelineError::InvalidDirective {
          directive: directive.key(),
          message: format!("'properties' must be an object or boolean, found {other}"),
        });
      }
    };

    let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) else {
      return Ok(());
    };

    let mut removed = vec![];
    match directive {
      Directive::Omit => {
        for (name, entry) in entries {
          match entry {
            Value::Bool(true) => {
              if properties.shift_remove(name).is_some() {
                removed.push(name.clone());
              }
            }
            Value::Object(_) => {
              if let Some(property) = properties.get_mut(name) {
                self.apply(directive, property, entry, depth + 1)?;
              }
            }
            _ => {}
          }
        }
      }
      Directive::Pick => {
        let kept: Vec<&String> = entries
          .iter()
          .filter(|(_, entry)| matches!(entry, Value::Bool(true) | Value::Object(_)))
          .map(|(name, _)| name)
          .collect();
        removed = properties
          .keys()
          .filter(|name| !kept.contains(name))
          .cloned()
          .collect();
        for name in &removed {
          properties.shift_remove(name);
        }
        for (name, entry) in entries {
          if entry.is_object()
            && let Some(property) = properties.get_mut(name)
          {
            self.apply(directive, property, entry, depth + 1)?;
          }
        }
      }
    }

    if !removed.is_empty() {
      drop_required(schema, |name| removed.iter().any(|r| r == name));
    }
    Ok(())
  }
}

fn filter_required(directive: Directive, schema: &mut Value, spec: &Value) -> Result<()> {
  match (directive, spec) {
    (Directive::Omit, Value::Bool(true)) | (Directive::Pick, Value::Bool(false)) => {
      remove_keys(schema, &["required"]);
    }
    (_, Value::Bool(_)) => {}
    (Directive::Omit, Value::Array(names)) => {
      drop_required(schema, |name| names.iter().any(|n| n.as_str() == Some(name)));
    }
    (Directive::Pick, Value::Array(names)) => {
      drop_required(schema, |name| !names.iter().any(|n| n.as_str() == Some(name)));
    }
    (_, other) => {
      return Err(PipelineError::InvalidDirective {
        directive: directive.key(),
        message: format!("'required' must be a string array or boolean, found {other}"),
      });
    }
  }
  Ok(())
}

fn retain_present_required(schema: &mut Value) {
  let present: Vec<String> = schema
    .properties()
    .map(|properties| properties.keys().cloned().collect())
    .unwrap_or_default();
  drop_required(schema, |name| !present.iter().any(|p| p == name));
}

fn drop_required(schema: &mut Value, should_drop: impl Fn(&str) -> bool) {
  let Some(map) = schema.as_object_mut() else {
    return;
  };
  let now_empty = match map.get_mut("required").and_then(Value::as_array_mut) {
    Some(required) => {
      required.retain(|name| !name.as_str().is_some_and(&should_drop));
      required.is_empty()
    }
    None => false,
  };
  if now_empty {
    map.shift_remove("required");
  }
}

fn remove_keys(schema: &mut Value, keys: &[&str]) {
  if let Some(map) = schema.as_object_mut() {
    for key in keys {
      map.shift_remove(*key);
    }
  }
}

/// Applies every directive left in the document outside `allOf` chains,
/// most commonly `{ "$ref": ..., "x-omit": ... }` property overrides.
///
/// References carrying a directive are replaced by a filtered inline copy of
/// their target. No directive survives into the returned document.
pub fn apply_field_filters(document: &Value, stats: &mut PipelineStats) -> Result<Value> {
  let mut working = document.clone();
  let filter = FieldFilter::new(Resolver::new(document));
  filter_node(&filter, &mut working, "#", stats)?;
  Ok(working)
}

fn filter_node(filter: &FieldFilter<'_>, node: &mut Value, pointer: &str, stats: &mut PipelineStats) -> Result<()> {
  if node.is_object() && node.has_directive() {
    let applied = filter.apply_own(node).in_schema(pointer)?;
    for _ in 0..applied {
      stats.record_directive();
    }
  }

  match node {
    Value::Object(map) => {
      for (key, child) in map.iter_mut() {
        if key == "example" || key == "examples" {
          continue;
        }
        filter_node(filter, child, &join_pointer(pointer, [key]), stats)?;
      }
    }
    Value::Array(values) => {
      for (index, child) in values.iter_mut().enumerate() {
        filter_node(filter, child, &join_pointer(pointer, [index.to_string()]), stats)?;
      }
    }
    _ => {}
  }
  Ok(())
}
