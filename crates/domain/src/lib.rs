pub mod config;
pub mod errors;
pub mod model;

pub use config::{CliOverrides, Config, ConfigBuilder, WhoisConfig};
pub use errors::{ConfigError, DomainError, LookupErrorKind};
pub use model::{AsnInfo, Family, GeoInfo, HostResult, IpEnriched};
