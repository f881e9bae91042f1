use strum::Display;

/// Counters and soft diagnostics collected while running the pipeline.
///
/// Passes receive the stats sink explicitly; nothing in the pipeline writes to
/// a global logger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineStats {
  pub schemas_merged: usize,
  pub directives_applied: usize,
  pub discriminator_values_propagated: usize,
  pub ir_nodes_created: usize,
  pub named_schemas: usize,
  pub endpoints_converted: usize,
  pub cycles_detected: usize,
  pub cycle_details: Vec<Vec<String>>,
  pub warnings: Vec<PipelineWarning>,
}

impl PipelineStats {
  pub fn record_merge(&mut self) {
    self.schemas_merged += 1;
  }

  pub fn record_directive(&mut self) {
    self.directives_applied += 1;
  }

  pub fn record_discriminator_value(&mut self) {
    self.discriminator_values_propagated += 1;
  }

  pub fn record_ir_nodes(&mut self, count: usize) {
    self.ir_nodes_created += count;
  }

  pub fn record_named_schemas(&mut self, count: usize) {
    self.named_schemas += count;
  }

  pub fn record_endpoints(&mut self, count: usize) {
    self.endpoints_converted += count;
  }

  pub fn record_cycle(&mut self, cycle: Vec<String>) {
    self.cycles_detected += 1;
    self.cycle_details.push(cycle);
  }

  pub fn record_cycles(&mut self, cycles: Vec<Vec<String>>) {
    for cycle in cycles {
      self.record_cycle(cycle);
    }
  }

  pub fn record_warning(&mut self, warning: PipelineWarning) {
    self.warnings.push(warning);
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum PipelineWarning {
  #[strum(to_string = "Schema '{schema}': allOf has a single element")]
  SingleElementAllOf { schema: String },
  #[strum(to_string = "Schema '{schema}': properties beside allOf were folded into the composition")]
  DanglingProperties { schema: String },
  #[strum(to_string = "Schema '{schema}': directive on discriminated parent '{parent}' forces it to be inlined")]
  DirectiveOnReferencedParent { schema: String, parent: String },
  #[strum(to_string = "Union '{schema}': member for discriminator value '{value}' is not an object yet")]
  UnresolvedDiscriminatorMember { schema: String, value: String },
  #[strum(to_string = "Operation '{method} {path}': '{location}' content is not JSON and was skipped")]
  NonJsonContent {
    method: String,
    path: String,
    location: String,
  },
}

impl PipelineWarning {
  /// Warnings about input the pipeline rewrote rather than merely observed.
  pub fn is_auto_fix(&self) -> bool {
    matches!(
      self,
      Self::DanglingProperties { .. } | Self::DirectiveOnReferencedParent { .. }
    )
  }
}
