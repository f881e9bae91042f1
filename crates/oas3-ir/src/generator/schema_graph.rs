use std::collections::{BTreeMap, BTreeSet, HashSet};

use petgraph::{algo::kosaraju_scc, graphmap::DiGraphMap};
use serde_json::Value;

use crate::{
  error::Result,
  generator::resolver::Resolver,
  utils::{
    NodeId, SchemaExt, SchemaKind,
    refs::{join_pointer, schema_ref},
  },
};

const SCHEMA_OCCURRENCE_KEY: &str = "schema";
const SKIPPED_KEYS: [&str; 2] = ["example", "examples"];

/// Graph of structural dependencies between schema nodes.
///
/// Nodes are named components and inline schemas, identified by pointer.
/// Arrays are transparent: `Node.children: Node[]` yields the edge
/// `Node -> Node`.
#[derive(Debug, Default)]
pub struct SchemaGraph {
  /// Acyclic dependency edges: node -> children it depends on
  edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
  /// Every direct child, including the back-references left out of `edges`
  references: BTreeMap<NodeId, BTreeSet<NodeId>>,
  /// Nodes that were re-entered while still on the traversal path
  circles: BTreeSet<NodeId>,
}

struct Traversal<'a> {
  resolver: Resolver<'a>,
  path: Vec<NodeId>,
  expanded: HashSet<NodeId>,
}

impl SchemaGraph {
  /// Walks every named component and every inline `schema` occurrence.
  pub fn build(document: &Value) -> Result<Self> {
    let mut graph = Self::default();
    let mut traversal = Traversal {
      resolver: Resolver::new(document),
      path: vec![],
      expanded: HashSet::new(),
    };

    if let Some(schemas) = component_schemas(document) {
      for (name, schema) in schemas {
        graph.visit(&mut traversal, schema, &schema_ref(name), None)?;
      }
    }

    for (location, schema) in schema_occurrences(document) {
      graph.visit(&mut traversal, schema, &location, None)?;
    }

    Ok(graph)
  }

  fn visit<'a>(
    &mut self,
    traversal: &mut Traversal<'a>,
    node: &'a Value,
    location: &str,
    owner: Option<&str>,
  ) -> Result<()> {
    let resolved = traversal.resolver.resolve(node, location)?;
    let schema = resolved.schema;

    let id = resolved.id;
    if schema.schema_kind() == SchemaKind::Array {
      return self.visit_array(traversal, schema, id, owner);
    }

    self.edges.entry(id.clone()).or_default();
    if let Some(owner) = owner {
      self.references.entry(owner.to_string()).or_default().insert(id.clone());
    }

    if traversal.path.contains(&id) {
      self.circles.insert(id);
      return Ok(());
    }

    if let Some(owner) = owner {
      self.edges.entry(owner.to_string()).or_default().insert(id.clone());
    }

    if !traversal.expanded.insert(id.clone()) {
      return Ok(());
    }

    traversal.path.push(id.clone());
    let result = self.visit_children(traversal, schema, &id);
    traversal.path.pop();
    result
  }

  /// Arrays pass their item edges on to the owner. A top-level array (a named
  /// alias such as `Nodes = Node[]`) owns its items itself.
  fn visit_array<'a>(
    &mut self,
    traversal: &mut Traversal<'a>,
    schema: &'a Value,
    id: NodeId,
    owner: Option<&str>,
  ) -> Result<()> {
    if traversal.path.contains(&id) {
      if let Some(owner) = owner {
        self.references.entry(owner.to_string()).or_default().insert(id.clone());
      }
      self.circles.insert(id);
      return Ok(());
    }

    let owner = match owner {
      Some(owner) => owner.to_string(),
      None => {
        self.edges.entry(id.clone()).or_default();
        id.clone()
      }
    };
    let Some(items) = schema.items() else {
      return Ok(());
    };

    traversal.path.push(id.clone());
    let result = self.visit(traversal, items, &join_pointer(&id, ["items"]), Some(&owner));
    traversal.path.pop();
    result
  }

  fn visit_children<'a>(&mut self, traversal: &mut Traversal<'a>, schema: &'a Value, id: &str) -> Result<()> {
    for (keyword, members) in [("oneOf", schema.one_of()), ("anyOf", schema.any_of()), ("allOf", schema.all_of())] {
      for (index, member) in members.into_iter().flatten().enumerate() {
        let location = join_pointer(id, [keyword, index.to_string().as_str()]);
        self.visit(traversal, member, &location, Some(id))?;
      }
    }

    if let Some(properties) = schema.properties() {
      for (name, property) in properties {
        let location = join_pointer(id, ["properties", name]);
        self.visit(traversal, property, &location, Some(id))?;
      }
    }

    if let Some(additional) = schema.get("additionalProperties").filter(|v| v.is_object()) {
      let location = join_pointer(id, ["additionalProperties"]);
      self.visit(traversal, additional, &location, Some(id))?;
    }

    Ok(())
  }

  /// All nodes with their acyclic dependency edges.
  pub fn edges(&self) -> &BTreeMap<NodeId, BTreeSet<NodeId>> {
    &self.edges
  }

  pub fn children(&self, id: &str) -> impl Iterator<Item = &NodeId> {
    self.edges.get(id).into_iter().flatten()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.edges.contains_key(id)
  }

  pub fn circles(&self) -> &BTreeSet<NodeId> {
    &self.circles
  }

  /// Check if a node was found on its own traversal path
  pub fn is_circular(&self, id: &str) -> bool {
    self.circles.contains(id)
  }

  /// True if the node is circular or references a circular node directly.
  ///
  /// Such nodes need deferred (lazy) evaluation in generated code.
  pub fn is_or_has_circular(&self, id: &str) -> bool {
    self.is_circular(id)
      || self
        .references
        .get(id)
        .is_some_and(|children| children.iter().any(|child| self.is_circular(child)))
  }

  /// Strongly connected components of the full reference graph, back-edges included.
  pub fn cycles(&self) -> Vec<Vec<String>> {
    let mut graph = DiGraphMap::<&str, ()>::new();
    for (node, children) in &self.references {
      graph.add_node(node.as_str());
      for child in children {
        graph.add_edge(node.as_str(), child.as_str(), ());
      }
    }

    kosaraju_scc(&graph)
      .into_iter()
      .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
      .map(|scc| {
        let mut cycle: Vec<String> = scc.into_iter().map(String::from).collect();
        cycle.sort();
        cycle
      })
      .collect()
  }
}

/// The `components.schemas` map of a document, if present.
pub fn component_schemas(document: &Value) -> Option<&serde_json::Map<String, Value>> {
  document.pointer("/components/schemas").and_then(Value::as_object)
}

/// Finds every inline `schema` occurrence outside `components.schemas`:
/// parameter, media type and header schemas wherever they appear.
pub fn schema_occurrences(document: &Value) -> Vec<(NodeId, &Value)> {
  let mut found = vec![];
  collect_occurrences(document, "#", &mut found);
  found
}

fn collect_occurrences<'a>(node: &'a Value, pointer: &str, found: &mut Vec<(NodeId, &'a Value)>) {
  match node {
    Value::Object(map) => {
      for (key, value) in map {
        if SKIPPED_KEYS.contains(&key.as_str()) || key.starts_with("x-") {
          continue;
        }
        let child = join_pointer(pointer, [key]);
        if child == "#/components/schemas" {
          continue;
        }
        if key == SCHEMA_OCCURRENCE_KEY && value.is_object() {
          found.push((child, value));
        } else {
          collect_occurrences(value, &child, found);
        }
      }
    }
    Value::Array(values) => {
      for (index, value) in values.iter().enumerate() {
        collect_occurrences(value, &join_pointer(pointer, [index.to_string()]), found);
      }
    }
    _ => {}
  }
}
