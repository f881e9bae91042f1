//! Typed intermediate representation of resolved schemas.
//!
//! IR nodes live in an [`IrArena`] and refer to each other by [`IrId`], so
//! cyclic schemas become cyclic id references rather than recursive values.

pub mod endpoints;
pub mod toposort;
pub mod transpiler;

use serde::Serialize;
use serde_json::Value;
use strum::Display;

use crate::utils::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IrId(pub usize);

/// Where an IR node came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Component {
  /// A schema declared under `components.schemas`.
  Named { id: NodeId, name: String },
  /// A schema written inline, named after its owner.
  Inline { name: String },
}

impl Component {
  pub fn name(&self) -> &str {
    match self {
      Self::Named { name, .. } | Self::Inline { name } => name,
    }
  }

  pub fn is_named(&self) -> bool {
    matches!(self, Self::Named { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrNode {
  pub component: Component,
  pub is_circular: bool,
  /// Circular itself or directly references a circular node; generated code
  /// must evaluate it lazily.
  pub is_lazy: bool,
  pub nullable: bool,
  pub kind: IrKind,
}

impl IrNode {
  pub fn name(&self) -> &str {
    self.component.name()
  }

  pub fn as_object(&self) -> Option<&ObjectIr> {
    match &self.kind {
      IrKind::Object(object) => Some(object),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IrKind {
  Object(ObjectIr),
  Union(UnionIr),
  Array {
    items: IrId,
  },
  Enum {
    values: Vec<Value>,
  },
  Primitive {
    primitive: PrimitiveType,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
  },
  /// Schema with no usable shape; generated code boxes an arbitrary value.
  Opaque,
  /// A string property whose legal values are the accumulated literals of a
  /// discriminator mapping.
  DiscriminatorProperty {
    property_name: String,
    values: Vec<String>,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectIr {
  pub properties: Vec<ObjectProperty>,
  /// Single-inheritance parent, always a named object.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent: Option<IrId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub additional_properties: Option<IrId>,
}

impl ObjectIr {
  pub fn property(&self, name: &str) -> Option<&ObjectProperty> {
    self.properties.iter().find(|property| property.name == name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectProperty {
  pub name: String,
  pub required: bool,
  pub value: IrId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionIr {
  pub members: Vec<IrId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discriminator: Option<UnionDiscriminator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionDiscriminator {
  pub property_name: String,
  pub mapping: indexmap::IndexMap<String, IrId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveType {
  String,
  Number,
  Integer,
  Boolean,
}

impl PrimitiveType {
  pub fn from_schema_type(schema_type: &str) -> Option<Self> {
    match schema_type {
      "string" => Some(Self::String),
      "number" => Some(Self::Number),
      "integer" => Some(Self::Integer),
      "boolean" => Some(Self::Boolean),
      _ => None,
    }
  }
}

/// Owner of every IR node created during one transpilation run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct IrArena {
  nodes: Vec<IrNode>,
}

impl IrArena {
  pub fn push(&mut self, node: IrNode) -> IrId {
    self.nodes.push(node);
    IrId(self.nodes.len() - 1)
  }

  /// # Panics
  /// If `id` was not allocated by this arena.
  pub fn get(&self, id: IrId) -> &IrNode {
    &self.nodes[id.0]
  }

  pub(crate) fn get_mut(&mut self, id: IrId) -> &mut IrNode {
    &mut self.nodes[id.0]
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (IrId, &IrNode)> {
    self.nodes.iter().enumerate().map(|(index, node)| (IrId(index), node))
  }

  /// Looks up a named component by its type name.
  pub fn find_named(&self, name: &str) -> Option<IrId> {
    self
      .iter()
      .find(|(_, node)| node.component.is_named() && node.name() == name)
      .map(|(id, _)| id)
  }

  pub fn name(&self, id: IrId) -> &str {
    self.get(id).name()
  }
}

#[cfg(test)]
mod tests;
