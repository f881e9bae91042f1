use std::collections::HashSet;

use serde_json::{Value, json};

use crate::{
  error::{PipelineError, Result},
  generator::{metrics::PipelineStats, resolver::Resolver},
  utils::{
    SchemaExt, parse_schema_ref_path, schema_ref,
    refs::{join_pointer, to_json_pointer},
    schema_ext::{X_DISCRIMINATOR_VALUES, X_EXTENSIBLE_ENUM},
  },
};

/// Where a discriminator property was found while searching a union member.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PropertyOwner {
  /// Pointer of the schema whose `properties` declare the discriminator.
  pointer: String,
  /// True when the owner was reached through a `$ref`, i.e. an ancestor.
  inherited: bool,
}

/// Makes every mapped member of a discriminated `oneOf` carry a string
/// discriminator property holding the literal it is mapped from.
///
/// Literal values accumulate under `x-discriminator-values`. A property
/// inherited from a referenced ancestor is widened to a plain string on the
/// ancestor and redeclared on the member itself.
///
/// Every union is processed even if an earlier one fails; the failures are
/// returned together as [`PipelineError::Many`].
pub fn ensure_discriminator_values(document: &Value, stats: &mut PipelineStats) -> Result<Value> {
  let resolver = Resolver::new(document);
  let mut working = document.clone();

  let mut unions = vec![];
  collect_unions(document, "#".to_string(), &mut unions);

  let mut failures = vec![];
  for (pointer, union) in unions {
    let propagator = Propagator {
      resolver,
      working: &mut working,
      stats: &mut *stats,
    };
    if let Err(error) = propagator.propagate(union) {
      failures.push(error.in_schema(pointer));
    }
  }

  if failures.is_empty() {
    Ok(working)
  } else {
    Err(PipelineError::Many(failures))
  }
}

fn collect_unions<'a>(node: &'a Value, pointer: String, out: &mut Vec<(String, &'a Value)>) {
  match node {
    Value::Object(map) => {
      if node.one_of().is_some() && node.has_discriminator() {
        out.push((pointer.clone(), node));
      }
      for (key, child) in map {
        if key == "example" || key == "examples" || key.starts_with("x-") {
          continue;
        }
        collect_unions(child, join_pointer(&pointer, [key]), out);
      }
    }
    Value::Array(values) => {
      for (index, child) in values.iter().enumerate() {
        collect_unions(child, join_pointer(&pointer, [index.to_string()]), out);
      }
    }
    _ => {}
  }
}

/// Mapping of literal value to member pointer.
///
/// Without an explicit `mapping`, members referencing a component are mapped
/// from the component name. Bare names in a mapping are read as component
/// names.
pub(crate) fn discriminator_mapping(union: &Value) -> Vec<(String, String)> {
  let explicit = union
    .discriminator()
    .and_then(|discriminator| discriminator.mapping)
    .filter(|mapping| !mapping.is_empty());

  match explicit {
    Some(mapping) => mapping
      .into_iter()
      .map(|(value, target)| {
        let target = if target.starts_with('#') { target } else { schema_ref(&target) };
        (value, target)
      })
      .collect(),
    None => union
      .one_of()
      .unwrap_or_default()
      .iter()
      .filter_map(SchemaExt::ref_path)
      .filter_map(|reference| parse_schema_ref_path(reference).map(|name| (name, reference.to_string())))
      .collect(),
  }
}

struct Propagator<'a, 'w> {
  resolver: Resolver<'a>,
  working: &'w mut Value,
  stats: &'w mut PipelineStats,
}

impl Propagator<'_, '_> {
  fn propagate(mut self, union: &Value) -> Result<()> {
    let property = union
      .discriminator()
      .map(|discriminator| discriminator.property_name)
      .filter(|name| !name.is_empty())
      .ok_or_else(|| PipelineError::MissingDiscriminatorProperty {
        property: String::new(),
        schema: describe(union),
      })?;

    let mapping = discriminator_mapping(union);
    if mapping.is_empty() {
      return Err(PipelineError::MissingMapping {
        schema: describe(union),
      });
    }

    for (value, reference) in mapping {
      let target = self.resolver.target_pointer(&reference)?;
      self.propagate_value(&target, &property, &value)?;
    }
    Ok(())
  }

  fn propagate_value(&mut self, target: &str, property: &str, value: &str) -> Result<()> {
    let owner = find_owner(self.resolver, self.working, target, property, false, &mut HashSet::new())?;
    match owner {
      Some(PropertyOwner { pointer, inherited: false }) => self.ensure_literal(&pointer, property, value),
      Some(PropertyOwner { pointer, inherited: true }) => {
        self.widen(&pointer, property)?;
        let mut declaration = node_mut(self.working, &property_pointer(&pointer, property))?.clone();
        if let Some(map) = declaration.as_object_mut() {
          map.shift_remove(X_DISCRIMINATOR_VALUES);
          map.shift_remove("example");
        }
        let slot = self.leaf_slot(target)?;
        self.declare(&slot, property, declaration)?;
        self.ensure_literal(&slot, property, value)
      }
      None => {
        let schema = node_mut(self.working, target)?;
        Err(PipelineError::MissingDiscriminatorProperty {
          property: property.to_string(),
          schema: describe(schema),
        })
      }
    }
  }

  /// Turns the property into a string carrying `value` among its literals.
  fn ensure_literal(&mut self, owner: &str, property: &str, value: &str) -> Result<()> {
    let node = self.resolved_property(owner, property)?;
    check_string_type(node, property)?;

    let Some(map) = node.as_object_mut() else {
      return Ok(());
    };
    map.insert("type".to_string(), json!("string"));
    map.shift_remove("enum");
    map.shift_remove(X_EXTENSIBLE_ENUM);

    let values = map.entry(X_DISCRIMINATOR_VALUES).or_insert_with(|| json!([]));
    if !values.is_array() {
      *values = json!([]);
    }
    if let Some(values) = values.as_array_mut()
      && !values.iter().any(|existing| existing.as_str() == Some(value))
    {
      values.push(json!(value));
    }
    map.entry("example").or_insert_with(|| json!(value));

    self.stats.record_discriminator_value();
    Ok(())
  }

  /// Relaxes an ancestor's discriminator property so it can serve every
  /// member's literal.
  fn widen(&mut self, owner: &str, property: &str) -> Result<()> {
    let node = self.resolved_property(owner, property)?;
    check_string_type(node, property)?;
    if let Some(map) = node.as_object_mut() {
      map.insert("type".to_string(), json!("string"));
      map.shift_remove("enum");
      map.shift_remove(X_EXTENSIBLE_ENUM);
    }
    Ok(())
  }

  /// Resolves a referenced property in place so edits stay local to `owner`.
  fn resolved_property(&mut self, owner: &str, property: &str) -> Result<&mut Value> {
    let node = node_mut(self.working, &property_pointer(owner, property))?;
    self.resolver.resolve_in_place(node)?;
    if !node.is_object() {
      return Err(PipelineError::EmptyDiscriminatorProperty {
        property: property.to_string(),
        schema: owner.to_string(),
      });
    }
    Ok(node)
  }

  /// The schema within a member that holds the member's own properties: its
  /// last inline `allOf` element, a new element, or the member itself.
  fn leaf_slot(&mut self, target: &str) -> Result<String> {
    let leaf = node_mut(self.working, target)?;
    let Some(members) = leaf.get_mut("allOf").and_then(Value::as_array_mut) else {
      return Ok(target.to_string());
    };

    let index = match members.iter().rposition(|member| !member.is_ref()) {
      Some(index) => index,
      None => {
        members.push(json!({ "type": "object", "properties": {} }));
        members.len() - 1
      }
    };
    Ok(join_pointer(target, ["allOf".to_string(), index.to_string()]))
  }

  /// Declares `property` on `owner` unless present, and marks it required.
  fn declare(&mut self, owner: &str, property: &str, declaration: Value) -> Result<()> {
    let node = node_mut(self.working, owner)?;
    let Some(map) = node.as_object_mut() else {
      return Err(PipelineError::MissingDiscriminatorProperty {
        property: property.to_string(),
        schema: owner.to_string(),
      });
    };

    let properties = map.entry("properties").or_insert_with(|| json!({}));
    if let Some(properties) = properties.as_object_mut() {
      properties.entry(property).or_insert(declaration);
    }

    let required = map.entry("required").or_insert_with(|| json!([]));
    if let Some(required) = required.as_array_mut()
      && !required.iter().any(|name| name.as_str() == Some(property))
    {
      required.push(json!(property));
    }
    Ok(())
  }
}

/// Searches `properties` first, then `allOf` and `oneOf` members, following
/// references.
fn find_owner(
  resolver: Resolver<'_>,
  working: &Value,
  pointer: &str,
  property: &str,
  inherited: bool,
  visited: &mut HashSet<String>,
) -> Result<Option<PropertyOwner>> {
  if !visited.insert(pointer.to_string()) {
    return Ok(None);
  }
  let schema = to_json_pointer(pointer)
    .and_then(|json_pointer| working.pointer(json_pointer))
    .ok_or_else(|| PipelineError::DanglingReference {
      pointer: pointer.to_string(),
    })?;

  if schema.properties().is_some_and(|properties| properties.contains_key(property)) {
    return Ok(Some(PropertyOwner {
      pointer: pointer.to_string(),
      inherited,
    }));
  }

  for keyword in ["allOf", "oneOf"] {
    let Some(members) = schema.get(keyword).and_then(Value::as_array) else {
      continue;
    };
    for (index, member) in members.iter().enumerate() {
      let found = match member.ref_path() {
        Some(reference) => {
          let target = resolver.target_pointer(reference)?;
          find_owner(resolver, working, &target, property, true, visited)?
        }
        None => {
          let inline = join_pointer(pointer, [keyword.to_string(), index.to_string()]);
          find_owner(resolver, working, &inline, property, inherited, visited)?
        }
      };
      if found.is_some() {
        return Ok(found);
      }
    }
  }
  Ok(None)
}

fn check_string_type(node: &Value, property: &str) -> Result<()> {
  let Some(declared) = node.get("type") else {
    return Ok(());
  };
  if node.schema_type() == Some("string") {
    return Ok(());
  }
  Err(PipelineError::WrongDiscriminatorType {
    property: property.to_string(),
    found: declared.to_string(),
    schema: describe(node),
  })
}

fn node_mut<'v>(working: &'v mut Value, pointer: &str) -> Result<&'v mut Value> {
  to_json_pointer(pointer)
    .and_then(|json_pointer| working.pointer_mut(json_pointer))
    .ok_or_else(|| PipelineError::DanglingReference {
      pointer: pointer.to_string(),
    })
}

fn property_pointer(owner: &str, property: &str) -> String {
  join_pointer(owner, ["properties", property])
}

fn describe(schema: &Value) -> String {
  serde_json::to_string(schema).unwrap_or_default()
}
