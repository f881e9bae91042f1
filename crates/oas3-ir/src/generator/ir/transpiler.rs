use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;

use super::{Component, IrArena, IrId, IrKind, IrNode, ObjectIr, ObjectProperty, PrimitiveType, UnionDiscriminator, UnionIr};
use crate::{
  error::{PipelineError, Result, SchemaContext},
  generator::{
    compose::discriminator::discriminator_mapping,
    metrics::PipelineWarning,
    naming::identifiers::{ensure_unique, inline_name, singular_item_name, to_type_name},
    resolver::Resolver,
    schema_graph::{SchemaGraph, component_schemas},
  },
  utils::{
    NodeId, SchemaExt, SchemaKind, parse_schema_ref_path, schema_ref,
    refs::join_pointer,
  },
};

/// Stand-in for a missing sub-schema (`type: array` without `items`,
/// `additionalProperties: true`).
static ANY_SCHEMA: Value = Value::Null;

/// A discriminator literal waiting to be attached to a union member once
/// every node is built.
#[derive(Debug)]
struct PendingLiteral {
  union: NodeId,
  member: IrId,
  property_name: String,
  value: String,
}

/// Converts resolved schema nodes into IR.
///
/// Every distinct node (by [`NodeId`]) yields exactly one IR node; a node
/// reached again, including through a cycle, returns the cached id.
pub struct Transpiler<'a> {
  resolver: Resolver<'a>,
  graph: &'a SchemaGraph,
  arena: IrArena,
  memo: HashMap<NodeId, IrId>,
  /// Nodes allocated but not yet classified.
  pending: HashSet<IrId>,
  component_names: HashMap<NodeId, String>,
  used_names: BTreeSet<String>,
  literals: Vec<PendingLiteral>,
  warnings: Vec<PipelineWarning>,
}

impl<'a> Transpiler<'a> {
  pub fn new(document: &'a Value, graph: &'a SchemaGraph) -> Self {
    let mut used_names = BTreeSet::new();
    let mut component_names = HashMap::new();
    for name in component_schemas(document).into_iter().flat_map(|schemas| schemas.keys()) {
      let type_name = ensure_unique(&to_type_name(name), &used_names);
      used_names.insert(type_name.clone());
      component_names.insert(schema_ref(name), type_name);
    }

    Self {
      resolver: Resolver::new(document),
      graph,
      arena: IrArena::default(),
      memo: HashMap::new(),
      pending: HashSet::new(),
      component_names,
      used_names,
      literals: vec![],
      warnings: vec![],
    }
  }

  pub fn resolver(&self) -> Resolver<'a> {
    self.resolver
  }

  pub fn arena(&self) -> &IrArena {
    &self.arena
  }

  /// Transpiles every entry of `components.schemas`, in document order.
  pub fn transpile_components(&mut self) -> Result<Vec<IrId>> {
    let Some(schemas) = component_schemas(self.resolver.document()) else {
      return Ok(vec![]);
    };

    let mut ids = Vec::with_capacity(schemas.len());
    for (name, schema) in schemas {
      let pointer = schema_ref(name);
      ids.push(self.transpile(name, schema, &pointer).in_schema(&pointer)?);
    }
    Ok(ids)
  }

  /// Returns the IR node for `node`, creating it on first sight.
  ///
  /// `name` is only used if the node turns out to be inline; `location` is
  /// its identity in that case.
  pub fn transpile(&mut self, name: &str, node: &'a Value, location: &str) -> Result<IrId> {
    let resolved = self.resolver.resolve(node, location)?;
    let node_id = resolved.id;
    let schema = resolved.schema;

    if let Some(&id) = self.memo.get(&node_id) {
      let cached = self.arena.get_mut(id);
      cached.is_circular = self.graph.is_circular(&node_id);
      cached.is_lazy = self.graph.is_or_has_circular(&node_id);
      return Ok(id);
    }

    let component = match (parse_schema_ref_path(&node_id), self.component_names.get(&node_id)) {
      (Some(_), Some(type_name)) => Component::Named {
        id: node_id.clone(),
        name: type_name.clone(),
      },
      _ => Component::Inline {
        name: self.claim_name(&to_type_name(name)),
      },
    };
    let own_name = component.name().to_string();

    let id = self.arena.push(IrNode {
      component,
      is_circular: self.graph.is_circular(&node_id),
      is_lazy: self.graph.is_or_has_circular(&node_id),
      nullable: schema.is_nullable(),
      kind: IrKind::Opaque,
    });
    self.memo.insert(node_id.clone(), id);
    self.pending.insert(id);

    let kind = self.classify(&own_name, &node_id, schema)?;
    self.arena.get_mut(id).kind = kind;
    self.pending.remove(&id);
    Ok(id)
  }

  /// Applies the discriminator literals collected from unions and hands back
  /// the arena.
  pub fn finish(mut self) -> (IrArena, Vec<PipelineWarning>) {
    for literal in std::mem::take(&mut self.literals) {
      self.attach_literal(literal);
    }
    (self.arena, self.warnings)
  }

  fn classify(&mut self, name: &str, id: &str, schema: &'a Value) -> Result<IrKind> {
    let kind = match schema.schema_kind() {
      SchemaKind::Enum => IrKind::Enum {
        values: schema.enum_values().unwrap_or_default().to_vec(),
      },
      SchemaKind::Union => IrKind::Union(self.union(name, id, schema)?),
      SchemaKind::Primitive => IrKind::Primitive {
        primitive: schema
          .schema_type()
          .and_then(PrimitiveType::from_schema_type)
          .unwrap_or(PrimitiveType::String),
        format: schema.get("format").and_then(Value::as_str).map(String::from),
      },
      SchemaKind::Array => {
        let items = schema.items().unwrap_or(&ANY_SCHEMA);
        let items = self.transpile(&singular_item_name(name), items, &join_pointer(id, ["items"]))?;
        IrKind::Array { items }
      }
      SchemaKind::Extended => IrKind::Object(self.extended(name, id, schema)?),
      SchemaKind::Object => IrKind::Object(self.object(name, id, schema)?),
      SchemaKind::Opaque => IrKind::Opaque,
    };
    Ok(kind)
  }

  fn union(&mut self, name: &str, id: &str, schema: &'a Value) -> Result<UnionIr> {
    let keyword = if schema.one_of().is_some() { "oneOf" } else { "anyOf" };
    let mut members = vec![];
    for (index, member) in schema.union_members().unwrap_or_default().iter().enumerate() {
      let location = join_pointer(id, [keyword.to_string(), index.to_string()]);
      let member_name = format!("{name}Option{}", index + 1);
      members.push(self.transpile(&member_name, member, &location)?);
    }

    let discriminator = match schema.discriminator() {
      Some(discriminator) if keyword == "oneOf" => {
        let mut mapping = IndexMap::new();
        for (value, reference) in discriminator_mapping(schema) {
          let target = self.resolver.target_pointer(&reference)?;
          let member = self
            .memo
            .get(&target)
            .copied()
            .filter(|member| members.contains(member))
            .ok_or_else(|| PipelineError::DiscriminatorTargetNotMember {
              value: value.clone(),
              pointer: target.clone(),
            })?;

          self.literals.push(PendingLiteral {
            union: id.to_string(),
            member,
            property_name: discriminator.property_name.clone(),
            value: value.clone(),
          });
          mapping.insert(value, member);
        }
        Some(UnionDiscriminator {
          property_name: discriminator.property_name,
          mapping,
        })
      }
      _ => None,
    };

    Ok(UnionIr { members, discriminator })
  }

  /// Single inheritance: one referenced named parent plus the node's own
  /// properties.
  fn extended(&mut self, name: &str, id: &str, schema: &'a Value) -> Result<ObjectIr> {
    let elements = schema.all_of().unwrap_or_default();
    if elements.len() > 2 {
      return Err(PipelineError::AllOfTooLong { len: elements.len() });
    }

    let parent_index = elements.iter().position(SchemaExt::is_ref).ok_or_else(|| PipelineError::InvalidParent {
      pointer: join_pointer(id, ["allOf", "0"]),
    })?;
    let parent_location = join_pointer(id, ["allOf".to_string(), parent_index.to_string()]);
    let parent = self.transpile(name, &elements[parent_index], &parent_location)?;
    if !self.is_named_object(parent, &elements[parent_index]) {
      return Err(PipelineError::InvalidParent {
        pointer: elements[parent_index].ref_path().unwrap_or(&parent_location).to_string(),
      });
    }

    let mut object = ObjectIr {
      parent: Some(parent),
      ..ObjectIr::default()
    };
    self.object_properties(name, id, schema, &[], &mut object)?;

    if let Some((index, remainder)) = elements.iter().enumerate().find(|(index, _)| *index != parent_index) {
      let location = join_pointer(id, ["allOf".to_string(), index.to_string()]);
      let resolved = self.resolver.resolve(remainder, &location)?;
      if resolved.schema.schema_kind() == SchemaKind::Extended {
        let base = self.transpile(&format!("{name}Base"), remainder, &location)?;
        self.fold_inherited(base, &schema.required_names(), &mut object);
      } else {
        self.object_properties(name, &resolved.id, resolved.schema, &schema.required_names(), &mut object)?;
        if object.additional_properties.is_none() {
          object.additional_properties = self.additional_properties(name, &resolved.id, resolved.schema)?;
        }
      }
    }
    if object.additional_properties.is_none() {
      object.additional_properties = self.additional_properties(name, id, schema)?;
    }

    Ok(object)
  }

  fn object(&mut self, name: &str, id: &str, schema: &'a Value) -> Result<ObjectIr> {
    let mut object = ObjectIr::default();
    self.object_properties(name, id, schema, &[], &mut object)?;
    object.additional_properties = self.additional_properties(name, id, schema)?;
    Ok(object)
  }

  /// Appends `schema`'s properties to `object`, skipping names already there.
  ///
  /// A property is required if `schema` or `extra_required` lists it.
  fn object_properties(
    &mut self,
    owner: &str,
    id: &str,
    schema: &'a Value,
    extra_required: &[&str],
    object: &mut ObjectIr,
  ) -> Result<()> {
    let Some(properties) = schema.properties() else {
      return Ok(());
    };
    for (property_name, property) in properties {
      if object.property(property_name).is_some() {
        continue;
      }
      let location = join_pointer(id, ["properties", property_name]);
      let value = self.transpile(&inline_name(owner, property_name), property, &location)?;
      object.properties.push(ObjectProperty {
        name: property_name.clone(),
        required: schema.is_required(property_name) || extra_required.contains(&property_name.as_str()),
        value,
      });
    }
    Ok(())
  }

  fn additional_properties(&mut self, owner: &str, id: &str, schema: &'a Value) -> Result<Option<IrId>> {
    let location = join_pointer(id, ["additionalProperties"]);
    let value_name = format!("{owner}Value");
    match schema.get("additionalProperties") {
      Some(Value::Bool(true)) => Ok(Some(self.transpile(&value_name, &ANY_SCHEMA, &location)?)),
      Some(additional @ Value::Object(_)) => Ok(Some(self.transpile(&value_name, additional, &location)?)),
      _ => Ok(None),
    }
  }

  /// Copies the properties of `base` and of every ancestor above it into
  /// `object`, for a remainder that carries its own parent (the nested
  /// multi-parent shape). `base` keeps the link to that parent.
  fn fold_inherited(&self, base: IrId, extra_required: &[&str], object: &mut ObjectIr) {
    let mut seen = HashSet::new();
    let mut next = Some(base);
    while let Some(id) = next.filter(|id| seen.insert(*id)) {
      let Some(inherited) = self.arena.get(id).as_object() else {
        break;
      };
      for property in &inherited.properties {
        if object.property(&property.name).is_none() {
          object.properties.push(ObjectProperty {
            name: property.name.clone(),
            required: property.required || extra_required.contains(&property.name.as_str()),
            value: property.value,
          });
        }
      }
      if object.additional_properties.is_none() {
        object.additional_properties = inherited.additional_properties;
      }
      next = inherited.parent;
    }
  }

  /// A parent still being built counts as an object if its raw shape is one.
  fn is_named_object(&self, id: IrId, reference: &'a Value) -> bool {
    let node = self.arena.get(id);
    if !node.component.is_named() {
      return false;
    }
    if self.pending.contains(&id) {
      return self
        .resolver
        .resolve(reference, "")
        .is_ok_and(|resolved| matches!(resolved.schema.schema_kind(), SchemaKind::Object | SchemaKind::Extended));
    }
    matches!(node.kind, IrKind::Object(_))
  }

  fn attach_literal(&mut self, literal: PendingLiteral) {
    let PendingLiteral {
      union,
      member,
      property_name,
      value,
    } = literal;

    let existing = match &self.arena.get(member).kind {
      IrKind::Object(object) => object.property(&property_name).map(|property| property.value),
      _ => {
        self
          .warnings
          .push(PipelineWarning::UnresolvedDiscriminatorMember { schema: union, value });
        return;
      }
    };

    if let Some(existing) = existing
      && let IrKind::DiscriminatorProperty { values, .. } = &mut self.arena.get_mut(existing).kind
    {
      if !values.contains(&value) {
        values.push(value);
      }
      return;
    }

    let base_name = inline_name(self.arena.name(member), &property_name);
    let property_type = self.claim_name(&base_name);
    let literal_node = self.arena.push(IrNode {
      component: Component::Inline { name: property_type },
      is_circular: false,
      is_lazy: false,
      nullable: false,
      kind: IrKind::DiscriminatorProperty {
        property_name: property_name.clone(),
        values: vec![value],
      },
    });

    if let IrKind::Object(object) = &mut self.arena.get_mut(member).kind {
      match object.properties.iter_mut().find(|property| property.name == property_name) {
        Some(property) => {
          property.value = literal_node;
          property.required = true;
        }
        None => object.properties.push(ObjectProperty {
          name: property_name,
          required: true,
          value: literal_node,
        }),
      }
    }
  }

  fn claim_name(&mut self, base_name: &str) -> String {
    let name = ensure_unique(base_name, &self.used_names);
    self.used_names.insert(name.clone());
    name
  }
}
