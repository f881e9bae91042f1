//! Runs the resolution pipeline end to end.
//!
//! ```no_run
//! use oas3_ir::generator::{config::PipelineConfig, orchestrator::Orchestrator};
//!
//! # fn example(document: serde_json::Value) -> oas3_ir::error::Result<()> {
//! let output = Orchestrator::new(PipelineConfig::default()).run(&document)?;
//! for id in &output.schemas {
//!   println!("{}", output.arena.name(*id));
//! }
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::{
  error::Result,
  generator::{
    compose::{apply_field_filters, ensure_discriminator_values, merge_all_of},
    config::PipelineConfig,
    context::ResolutionContext,
    ir::{IrArena, IrId, endpoints::{Endpoint, EndpointTranspiler}, toposort::sort_schemas},
    metrics::PipelineStats,
  },
};

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
  /// The input with `allOf` collapsed, directives applied and discriminators
  /// completed.
  pub document: Value,
  pub arena: IrArena,
  /// Named schemas in dependency order.
  pub schemas: Vec<IrId>,
  pub endpoints: Vec<Endpoint>,
  pub stats: PipelineStats,
}

/// Serialized form of the IR handed to code generators.
#[derive(Debug, Serialize)]
pub struct IrDocument<'a> {
  pub order: &'a [IrId],
  pub nodes: &'a IrArena,
  pub endpoints: &'a [Endpoint],
}

impl PipelineOutput {
  pub fn ir(&self) -> IrDocument<'_> {
    IrDocument {
      order: &self.schemas,
      nodes: &self.arena,
      endpoints: &self.endpoints,
    }
  }
}

pub struct Orchestrator {
  config: PipelineConfig,
}

impl Orchestrator {
  pub fn new(config: PipelineConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// Runs every pass over a private copy of `input`.
  ///
  /// Passes run strictly in order: `allOf` merge, field filtering,
  /// discriminator propagation, graph construction, schema transpilation,
  /// endpoint transpilation and finally the topological sort.
  ///
  /// # Errors
  ///
  /// Returns the first fatal [`crate::error::PipelineError`], wrapped with
  /// the identifier of the schema it occurred in.
  pub fn run(&self, input: &Value) -> Result<PipelineOutput> {
    let mut stats = PipelineStats::default();

    let merged = merge_all_of(input, self.config.force_merge, &mut stats)?;
    let filtered = apply_field_filters(&merged, &mut stats)?;
    let document = if self.config.propagate_discriminators {
      ensure_discriminator_values(&filtered, &mut stats)?
    } else {
      filtered
    };

    let context = ResolutionContext::new(document)?;
    stats.record_cycles(context.graph().cycles());

    let mut transpiler = context.transpiler();
    let roots = transpiler.transpile_components()?;
    let endpoints = if self.config.include_endpoints {
      let (endpoints, warnings) = EndpointTranspiler::new(&mut transpiler).transpile_all()?;
      for warning in warnings {
        stats.record_warning(warning);
      }
      endpoints
    } else {
      vec![]
    };

    let (arena, warnings) = transpiler.finish();
    for warning in warnings {
      stats.record_warning(warning);
    }
    let schemas = sort_schemas(&arena, &roots)?;

    stats.record_ir_nodes(arena.len());
    stats.record_named_schemas(schemas.len());
    stats.record_endpoints(endpoints.len());

    Ok(PipelineOutput {
      document: context.into_document(),
      arena,
      schemas,
      endpoints,
      stats,
    })
  }
}
