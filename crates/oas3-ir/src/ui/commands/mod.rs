pub mod list;
pub mod resolve;

pub use list::list_endpoints;
pub use resolve::{ResolveConfig, resolve_document};
