//! Collapsing of `allOf` compositions.
//!
//! Every `allOf` in the document is flattened into a list of non-composed
//! elements. Elements referencing a schema that declares a discriminator are
//! kept as referenced parents (unless `force_merge` is set); everything else
//! is merged structurally, applying `x-omit`/`x-pick` directives as the chain
//! is folded.

pub(crate) mod directives;
pub(crate) mod discriminator;
pub(crate) mod merge;

use serde_json::{Map, Value, json};

pub use self::{directives::apply_field_filters, discriminator::ensure_discriminator_values};
use self::{
  directives::{Directive, FieldFilter},
  merge::SchemaMerger,
};
use crate::{
  error::{PipelineError, Result, SchemaContext},
  generator::{
    metrics::{PipelineStats, PipelineWarning},
    resolver::Resolver,
  },
  utils::{SchemaExt, refs::join_pointer, schema_ext::REF_KEY},
};

/// One flattened `allOf` element.
#[derive(Debug, Clone)]
struct Element {
  /// Pointer of the component the element was referenced from.
  pointer: Option<String>,
  schema: Value,
}

impl Element {
  fn is_discriminated_parent(&self) -> bool {
    self.pointer.is_some() && self.schema.has_discriminator() && !self.schema.has_directive()
  }
}

/// Collapses every `allOf` in the document.
///
/// Returns a new document; the input is left untouched.
pub fn merge_all_of(document: &Value, force_merge: bool, stats: &mut PipelineStats) -> Result<Value> {
  let mut working = document.clone();
  let merger = AllOfMerger::new(Resolver::new(document), force_merge);
  merger.walk(&mut working, "#", stats)?;
  Ok(working)
}

struct AllOfMerger<'a> {
  resolver: Resolver<'a>,
  merger: SchemaMerger<'a>,
  filter: FieldFilter<'a>,
  force_merge: bool,
}

impl<'a> AllOfMerger<'a> {
  fn new(resolver: Resolver<'a>, force_merge: bool) -> Self {
    Self {
      resolver,
      merger: SchemaMerger::new(resolver),
      filter: FieldFilter::new(resolver),
      force_merge,
    }
  }

  fn walk(&self, node: &mut Value, pointer: &str, stats: &mut PipelineStats) -> Result<()> {
    if node.all_of().is_some() {
      self.merge_node(node, pointer, stats).in_schema(pointer)?;
      stats.record_merge();
    }

    match node {
      Value::Object(map) => {
        for (key, child) in map.iter_mut() {
          if key == "example" || key == "examples" || key.starts_with("x-") {
            continue;
          }
          self.walk(child, &join_pointer(pointer, [key]), stats)?;
        }
      }
      Value::Array(values) => {
        for (index, child) in values.iter_mut().enumerate() {
          self.walk(child, &join_pointer(pointer, [index.to_string()]), stats)?;
        }
      }
      _ => {}
    }
    Ok(())
  }

  fn merge_node(&self, node: &mut Value, pointer: &str, stats: &mut PipelineStats) -> Result<()> {
    let Some(map) = node.as_object_mut() else {
      return Ok(());
    };
    let mut members = match map.shift_remove("allOf") {
      Some(Value::Array(members)) => members,
      _ => return Ok(()),
    };

    if let Some(dangling) = take_dangling(map) {
      stats.record_warning(PipelineWarning::DanglingProperties {
        schema: pointer.to_string(),
      });
      members.push(dangling);
    }
    if members.len() == 1 {
      stats.record_warning(PipelineWarning::SingleElementAllOf {
        schema: pointer.to_string(),
      });
    }

    let own_directives: Map<String, Value> = Directive::ALL
      .into_iter()
      .filter_map(|directive| map.shift_remove(directive.key()).map(|spec| (directive.key().to_string(), spec)))
      .collect();
    let flat = self.force_merge || !own_directives.is_empty();

    let mut elements = vec![];
    let mut composing = vec![];
    for member in &members {
      self.flatten(member, flat, &mut elements, &mut composing, pointer, stats)?;
    }
    if let Some(element) = elements.iter().find(|e| e.schema.union_members().is_some()) {
      let keyword = if element.schema.one_of().is_some() { "oneOf" } else { "anyOf" };
      return Err(PipelineError::UnsupportedComposition { keyword });
    }

    let composed = if flat {
      if !own_directives.is_empty() {
        elements.push(Element {
          pointer: None,
          schema: Value::Object(own_directives),
        });
      }
      self.merge_chain(elements, stats)?
    } else {
      let (parents, rest): (Vec<Element>, Vec<Element>) =
        elements.into_iter().partition(Element::is_discriminated_parent);
      let remainder = if rest.is_empty() {
        None
      } else {
        Some(self.merge_chain(rest, stats)?)
      };
      nest_parents(parents, remainder)
    };

    let siblings = std::mem::take(map);
    *node = overlay(composed, siblings);
    Ok(())
  }

  /// Resolves an element and expands nested `allOf` compositions in place.
  fn flatten(
    &self,
    member: &Value,
    flat: bool,
    out: &mut Vec<Element>,
    composing: &mut Vec<String>,
    schema_pointer: &str,
    stats: &mut PipelineStats,
  ) -> Result<()> {
    let resolved = self.resolver.resolve_cloned(member, "")?;
    let element = Element {
      pointer: resolved.pointer,
      schema: resolved.schema,
    };

    if let Some(pointer) = &element.pointer {
      if composing.contains(pointer) {
        return Err(PipelineError::CompositionCycle {
          pointer: pointer.clone(),
        });
      }
      if !flat && element.schema.has_discriminator() && element.schema.has_directive() {
        stats.record_warning(PipelineWarning::DirectiveOnReferencedParent {
          schema: schema_pointer.to_string(),
          parent: pointer.clone(),
        });
      }
    }

    let keep_as_parent = !flat && element.is_discriminated_parent();
    if keep_as_parent || element.schema.all_of().is_none() {
      out.push(element);
      return Ok(());
    }

    let Element { pointer, mut schema } = element;
    let Some(map) = schema.as_object_mut() else {
      return Ok(());
    };
    let members = match map.shift_remove("allOf") {
      Some(Value::Array(members)) => members,
      _ => vec![],
    };

    if let Some(pointer) = &pointer {
      composing.push(pointer.clone());
    }
    for nested in &members {
      self.flatten(nested, flat, out, composing, schema_pointer, stats)?;
    }
    if pointer.is_some() {
      composing.pop();
    }

    if !map.is_empty() {
      out.push(Element { pointer: None, schema });
    }
    Ok(())
  }

  /// Folds elements pairwise in document order.
  ///
  /// An element's directives filter the accumulated result right after that
  /// element is merged, so a field can be dropped before a later element
  /// redefines it incompatibly.
  fn merge_chain(&self, elements: Vec<Element>, stats: &mut PipelineStats) -> Result<Value> {
    let mut acc = Value::Object(Map::new());
    for Element { mut schema, .. } in elements {
      let directives = Directive::take_all(&mut schema);
      self.merger.merge(&mut acc, &schema)?;
      for (directive, spec) in &directives {
        self.filter.apply(*directive, &mut acc, spec, 0)?;
        stats.record_directive();
      }
    }
    Ok(acc)
  }
}

/// Removes `properties`/`required` written beside `allOf` so they can be merged
/// as one more element.
fn take_dangling(map: &mut Map<String, Value>) -> Option<Value> {
  let mut dangling = Map::new();
  for key in ["properties", "required"] {
    if let Some(value) = map.shift_remove(key) {
      dangling.insert(key.to_string(), value);
    }
  }
  (!dangling.is_empty()).then_some(Value::Object(dangling))
}

/// Wraps the merged remainder in one `allOf` per discriminated parent,
/// innermost first.
fn nest_parents(parents: Vec<Element>, remainder: Option<Value>) -> Value {
  let mut seen: Vec<String> = vec![];
  let mut composed = remainder;

  for parent in parents {
    let Some(pointer) = parent.pointer else {
      continue;
    };
    if seen.contains(&pointer) {
      continue;
    }
    let mut members = vec![json!({ REF_KEY: pointer })];
    members.extend(composed.take());
    composed = Some(json!({ "allOf": members }));
    seen.push(pointer);
  }

  composed.unwrap_or_else(|| Value::Object(Map::new()))
}

/// Puts the composed schema under the keywords the original node kept.
fn overlay(composed: Value, siblings: Map<String, Value>) -> Value {
  match composed {
    Value::Object(mut map) => {
      for (key, value) in siblings {
        map.insert(key, value);
      }
      Value::Object(map)
    }
    other => other,
  }
}
