pub mod resolve_batch;

pub use resolve_batch::{resolve_and_enrich_batch, BatchCollaborators};
