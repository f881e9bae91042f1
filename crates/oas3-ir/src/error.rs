use thiserror::Error;

use crate::utils::NodeId;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal failures of the resolution pipeline.
///
/// Every variant is deterministic for a given input document: a dangling
/// pointer or an incompatible composition fails the same way on every run,
/// so nothing here is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("dangling reference '{pointer}': the bundled document has no node at this pointer")]
  DanglingReference { pointer: String },

  #[error("reference chain starting at '{pointer}' loops back on itself")]
  ReferenceCycle { pointer: String },

  #[error("allOf composition of '{pointer}' includes itself")]
  CompositionCycle { pointer: String },

  #[error("'{keyword}' is not supported as an allOf element")]
  UnsupportedComposition { keyword: &'static str },

  #[error("cannot merge '{keyword}': {left} conflicts with {right}")]
  IncompatibleMerge {
    keyword: String,
    left: String,
    right: String,
  },

  #[error("allOf has {len} elements after merging; pre-process with a composing bundler first")]
  AllOfTooLong { len: usize },

  #[error("allOf parent '{pointer}' must be a named object schema")]
  InvalidParent { pointer: String },

  #[error("{directive} recursion exceeded the depth limit of {limit}")]
  DirectiveDepthExceeded { directive: &'static str, limit: usize },

  #[error("invalid {directive} directive: {message}")]
  InvalidDirective { directive: &'static str, message: String },

  #[error("discriminator property '{property}' could not be placed on {schema}")]
  MissingDiscriminatorProperty { property: String, schema: String },

  #[error("discriminated union has no mapping and no referenced members: {schema}")]
  MissingMapping { schema: String },

  #[error("discriminator property '{property}' must be a string but is '{found}' in {schema}")]
  WrongDiscriminatorType {
    property: String,
    found: String,
    schema: String,
  },

  #[error("discriminator property '{property}' resolved to an empty schema in {schema}")]
  EmptyDiscriminatorProperty { property: String, schema: String },

  #[error("discriminator value '{value}' maps to '{pointer}', which is not a member of the union")]
  DiscriminatorTargetNotMember { value: String, pointer: String },

  #[error("dependency cycle among non-circular schemas at '{node}'")]
  DependencyCycle { node: String },

  #[error("schema '{id}': {source}")]
  Schema {
    id: NodeId,
    #[source]
    source: Box<PipelineError>,
  },

  #[error("{} schemas failed:\n{}", .0.len(), .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
  Many(Vec<PipelineError>),
}

impl PipelineError {
  /// Wraps an error with the identifier of the schema being processed.
  pub fn in_schema(self, id: impl Into<NodeId>) -> Self {
    Self::Schema {
      id: id.into(),
      source: Box::new(self),
    }
  }

  /// Returns the innermost error, unwrapping schema context layers.
  pub fn root_cause(&self) -> &PipelineError {
    match self {
      Self::Schema { source, .. } => source.root_cause(),
      other => other,
    }
  }
}

/// Attaches schema context to a fallible result.
pub trait SchemaContext<T> {
  fn in_schema(self, id: &str) -> Result<T>;
}

impl<T> SchemaContext<T> for Result<T> {
  fn in_schema(self, id: &str) -> Result<T> {
    self.map_err(|error| error.in_schema(id))
  }
}
