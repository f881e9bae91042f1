use std::collections::{BTreeSet, HashSet};

use petgraph::{algo::toposort, graphmap::DiGraphMap};

use super::{IrArena, IrId, IrKind};
use crate::error::{PipelineError, Result};

/// Orders `roots` so that every non-circular dependency comes before the
/// nodes that depend on it.
///
/// Dependencies are collected through inline nodes down to the nearest named
/// node. Edges touching a circular node are left out; a cycle among what
/// remains is a [`PipelineError::DependencyCycle`].
pub fn sort_schemas(arena: &IrArena, roots: &[IrId]) -> Result<Vec<IrId>> {
  let root_set: HashSet<IrId> = roots.iter().copied().collect();
  let mut graph = DiGraphMap::<IrId, ()>::new();
  for &root in roots {
    graph.add_node(root);
  }

  for &root in roots {
    if arena.get(root).is_circular {
      continue;
    }
    for dependency in dependencies(arena, root) {
      if dependency == root || !root_set.contains(&dependency) || arena.get(dependency).is_circular {
        continue;
      }
      graph.add_edge(dependency, root, ());
    }
  }

  toposort(&graph, None).map_err(|cycle| PipelineError::DependencyCycle {
    node: arena.name(cycle.node_id()).to_string(),
  })
}

/// Named nodes `id` depends on structurally.
pub fn dependencies(arena: &IrArena, id: IrId) -> BTreeSet<IrId> {
  let mut found = BTreeSet::new();
  let mut visited = HashSet::from([id]);
  collect_children(arena, id, &mut found, &mut visited);
  found
}

fn collect_children(arena: &IrArena, id: IrId, found: &mut BTreeSet<IrId>, visited: &mut HashSet<IrId>) {
  let children: Vec<IrId> = match &arena.get(id).kind {
    IrKind::Object(object) => object
      .properties
      .iter()
      .map(|property| property.value)
      .filter(|value| !matches!(arena.get(*value).kind, IrKind::DiscriminatorProperty { .. }))
      .chain(object.parent)
      .chain(object.additional_properties)
      .collect(),
    IrKind::Union(union) => union.members.clone(),
    IrKind::Array { items } => vec![*items],
    IrKind::Enum { .. } | IrKind::Primitive { .. } | IrKind::Opaque | IrKind::DiscriminatorProperty { .. } => vec![],
  };

  for child in children {
    if !visited.insert(child) {
      continue;
    }
    if arena.get(child).component.is_named() {
      found.insert(child);
    } else {
      collect_children(arena, child, found, visited);
    }
  }
}
