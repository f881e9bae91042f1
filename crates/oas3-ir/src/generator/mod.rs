pub mod compose;
pub mod config;
pub mod context;
pub mod ir;
pub mod metrics;
pub(crate) mod naming;
pub mod orchestrator;
pub mod resolver;
pub mod schema_graph;

#[cfg(test)]
mod tests;
