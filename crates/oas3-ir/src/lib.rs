//! Resolution pipeline for bundled OpenAPI 3.0 documents.
//!
//! The pipeline collapses `allOf` compositions, applies `x-omit`/`x-pick`
//! field filters, completes discriminator mappings and transpiles every
//! schema into a cycle-aware IR ordered for single-pass code emission.

pub mod error;
pub mod generator;
pub mod utils;

pub use error::{PipelineError, Result};
pub use generator::{
  config::PipelineConfig,
  orchestrator::{Orchestrator, PipelineOutput},
};
