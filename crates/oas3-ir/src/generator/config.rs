/// Options controlling which passes run and how `allOf` compositions collapse.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct PipelineConfig {
  /// Merge every `allOf`, discriminated parents included, into one flat object.
  #[builder(default)]
  pub force_merge: bool,
  #[builder(default = true)]
  pub propagate_discriminators: bool,
  #[builder(default = true)]
  pub include_endpoints: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self::builder().build()
  }
}
