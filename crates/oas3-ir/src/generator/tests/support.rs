use serde_json::{Value, json};

use crate::{
  generator::{
    context::ResolutionContext,
    ir::{IrArena, IrId, IrKind, IrNode},
  },
  utils::schema_ref,
};

pub(crate) fn document(schemas: Value) -> Value {
  document_with_paths(json!({}), schemas)
}

pub(crate) fn document_with_paths(paths: Value, schemas: Value) -> Value {
  json!({
    "openapi": "3.0.3",
    "info": { "title": "Test", "version": "1.0.0" },
    "paths": paths,
    "components": { "schemas": schemas }
  })
}

pub(crate) fn component<'a>(document: &'a Value, name: &str) -> &'a Value {
  document
    .pointer(&format!("/components/schemas/{name}"))
    .unwrap_or_else(|| panic!("component {name} missing"))
}

pub(crate) fn pointer(name: &str) -> String {
  schema_ref(name)
}

/// Transpiles every component, returning the finished arena and the roots.
pub(crate) fn transpile(document: Value) -> (IrArena, Vec<IrId>) {
  let context = ResolutionContext::new(document).expect("graph builds");
  let mut transpiler = context.transpiler();
  let roots = transpiler.transpile_components().expect("transpiles");
  let (arena, _) = transpiler.finish();
  (arena, roots)
}

pub(crate) fn named(arena: &IrArena, name: &str) -> IrId {
  arena
    .find_named(name)
    .unwrap_or_else(|| panic!("no named IR node {name}"))
}

pub(crate) fn property(arena: &IrArena, owner: IrId, name: &str) -> IrId {
  arena
    .get(owner)
    .as_object()
    .and_then(|object| object.property(name))
    .map(|property| property.value)
    .unwrap_or_else(|| panic!("{} has no property {name}", arena.name(owner)))
}

pub(crate) fn kind(arena: &IrArena, id: IrId) -> &IrKind {
  &arena.get(id).kind
}

pub(crate) fn node(arena: &IrArena, id: IrId) -> &IrNode {
  arena.get(id)
}
