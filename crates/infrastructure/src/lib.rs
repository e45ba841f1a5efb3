pub mod cache;
pub mod geoip;
pub mod resolver;
pub mod threat_intel;
pub mod whois;

pub use cache::IpEnrichmentCache;
pub use geoip::{CachedGeoIpEnricher, GeoIpReaders};
pub use resolver::RoundRobinResolver;
pub use threat_intel::Quad9Probe;
pub use whois::{PrivateSuffixEntry, WhoisCli};
