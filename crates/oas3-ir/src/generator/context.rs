use serde_json::Value;

use crate::{
  error::Result,
  generator::{ir::transpiler::Transpiler, resolver::Resolver, schema_graph::SchemaGraph},
};

/// A composed document together with its schema graph, shared by the
/// transpilation stages.
#[derive(Debug)]
pub struct ResolutionContext {
  document: Value,
  graph: SchemaGraph,
}

impl ResolutionContext {
  pub fn new(document: Value) -> Result<Self> {
    let graph = SchemaGraph::build(&document)?;
    Ok(Self { document, graph })
  }

  pub fn document(&self) -> &Value {
    &self.document
  }

  pub fn graph(&self) -> &SchemaGraph {
    &self.graph
  }

  pub fn resolver(&self) -> Resolver<'_> {
    Resolver::new(&self.document)
  }

  pub fn transpiler(&self) -> Transpiler<'_> {
    Transpiler::new(&self.document, &self.graph)
  }

  pub fn into_document(self) -> Value {
    self.document
  }
}
