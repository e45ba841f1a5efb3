pub mod ports;
pub mod use_cases;

pub use ports::{Enricher, ResolveError, ResolvedAnswer, Resolver, ThreatIntelProbe, WhoisInvoker};
pub use use_cases::{resolve_and_enrich_batch, BatchCollaborators};
