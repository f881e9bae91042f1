pub mod refs;
pub mod schema_ext;
pub mod spec;

pub use refs::{NodeId, SCHEMA_REF_PREFIX, parse_schema_ref_path, schema_ref};
pub use schema_ext::{SchemaExt, SchemaKind};
