use std::collections::HashSet;

use serde_json::Value;

use crate::{
  error::{PipelineError, Result},
  utils::{
    NodeId, SchemaExt,
    refs::to_json_pointer,
    schema_ext::REF_KEY,
  },
};

/// A node reached through [`Resolver::resolve`], borrowed from the document.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
  /// Identity of the resolved node: the final `$ref` target, or the location
  /// the node was found at when it was not a reference.
  pub id: NodeId,
  /// The pointer the node was reached through, if it was a reference.
  pub pointer: Option<String>,
  pub schema: &'a Value,
}

/// A deep copy of a resolved node that the caller is free to mutate.
#[derive(Debug, Clone)]
pub struct ResolvedOwned {
  pub id: NodeId,
  pub pointer: Option<String>,
  pub schema: Value,
}

/// Resolves `#/...` reference pointers within one bundled document.
///
/// The document is expected to contain internal pointers only; anything that
/// does not resolve is a broken bundle and fails with
/// [`PipelineError::DanglingReference`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
  document: &'a Value,
}

impl<'a> Resolver<'a> {
  pub fn new(document: &'a Value) -> Self {
    Self { document }
  }

  pub fn document(&self) -> &'a Value {
    self.document
  }

  /// Looks up a single pointer without following further references.
  pub fn lookup(&self, reference: &str) -> Result<&'a Value> {
    to_json_pointer(reference)
      .and_then(|pointer| self.document.pointer(pointer))
      .ok_or_else(|| PipelineError::DanglingReference {
        pointer: reference.to_string(),
      })
  }

  /// Non-mutating resolution: follows a `$ref` chain to its target.
  ///
  /// A node that is not a reference is returned unchanged with `location` as
  /// its identity.
  pub fn resolve(&self, node: &'a Value, location: &str) -> Result<Resolved<'a>> {
    match node.ref_path() {
      Some(reference) => {
        let (pointer, schema) = self.follow(reference)?;
        Ok(Resolved {
          id: pointer.clone(),
          pointer: Some(pointer),
          schema,
        })
      }
      None => Ok(Resolved {
        id: location.to_string(),
        pointer: None,
        schema: node,
      }),
    }
  }

  /// Deep-clone resolution: the returned schema is detached from the document
  /// so later mutation cannot corrupt shared components.
  ///
  /// Keywords written beside the `$ref` (an `x-omit`, a `description`) are
  /// carried over onto the copy and take precedence over the target's.
  pub fn resolve_cloned(&self, node: &Value, location: &str) -> Result<ResolvedOwned> {
    let Some(reference) = node.ref_path() else {
      return Ok(ResolvedOwned {
        id: location.to_string(),
        pointer: None,
        schema: node.clone(),
      });
    };

    let (pointer, target) = self.follow(reference)?;
    let mut schema = target.clone();
    overlay_siblings(&mut schema, node);

    Ok(ResolvedOwned {
      id: pointer.clone(),
      pointer: Some(pointer),
      schema,
    })
  }

  /// Mutable resolution: replaces a reference node in place with a copy of
  /// its target and strips the `$ref` marker.
  ///
  /// Returns the pointer the node referred to, or `None` if it was already
  /// inline. `node` must not live inside the resolver's document.
  pub fn resolve_in_place(&self, node: &mut Value) -> Result<Option<String>> {
    if !node.is_ref() {
      return Ok(None);
    }
    let resolved = self.resolve_cloned(node, "")?;
    *node = resolved.schema;
    Ok(resolved.pointer)
  }

  /// Returns the pointer a `$ref` chain starting at `reference` ends at.
  pub fn target_pointer(&self, reference: &str) -> Result<String> {
    self.follow(reference).map(|(pointer, _)| pointer)
  }

  /// Walks a `$ref` chain, returning the final pointer and its node.
  fn follow(&self, reference: &str) -> Result<(String, &'a Value)> {
    let mut seen = HashSet::new();
    let mut pointer = reference.to_string();
    loop {
      if !seen.insert(pointer.clone()) {
        return Err(PipelineError::ReferenceCycle {
          pointer: reference.to_string(),
        });
      }
      let target = self.lookup(&pointer)?;
      match target.ref_path() {
        Some(next) => pointer = next.to_string(),
        None => return Ok((pointer, target)),
      }
    }
  }
}

/// Copies every key of `reference_node` except `$ref` onto `target`.
pub(crate) fn overlay_siblings(target: &mut Value, reference_node: &Value) {
  let (Some(target), Some(siblings)) = (target.as_object_mut(), reference_node.as_object()) else {
    return;
  };
  for (key, value) in siblings {
    if key != REF_KEY {
      target.insert(key.clone(), value.clone());
    }
  }
}
