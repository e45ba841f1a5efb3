use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use netenrich_domain::IpEnriched;

/// Raw result of one DNS lookup: the addresses returned (in wire order) and
/// the upstream that served the answer.
#[derive(Debug, Clone)]
pub struct ResolvedAnswer {
    pub addresses: Vec<IpAddr>,
    pub server: String,
}

/// Transport-level failure from a resolve attempt, already carrying enough
/// structure for the classifier (§4.2) to prefer structured codes over
/// substring matching, falling back to the raw message only for the
/// catch-all bucket.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// The lookup did not complete within its deadline.
    Timeout,
    /// Structured DNS response code observed on the wire.
    Nxdomain,
    ServFail,
    Refused,
    /// Anything else: transport failure, malformed response, no upstream
    /// reachable. Carries the original message for the substring fallback
    /// and for logging.
    Other(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Timeout => write!(f, "i/o timeout"),
            ResolveError::Nxdomain => write!(f, "no such host"),
            ResolveError::ServFail => write!(f, "server misbehaving"),
            ResolveError::Refused => write!(f, "refused"),
            ResolveError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Round-robin resolver seam (§4.1). One call performs one dial against one
/// atomically-selected upstream, issuing A (and conditionally AAAA) queries.
/// The per-host timeout is enforced by the caller wrapping this call in
/// `tokio::time::timeout` (the "child context" of the algorithm), not by the
/// resolver itself.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        hostname: &str,
        prefer_ipv6: bool,
    ) -> Result<ResolvedAnswer, ResolveError>;
}

/// Threat-intel probe seam (§4.5).
#[async_trait]
pub trait ThreatIntelProbe: Send + Sync {
    async fn check_malicious_domain(
        &self,
        domain: &str,
        primary_resolved: bool,
        timeout: Duration,
    ) -> bool;
}

/// GeoIP/ASN enrichment seam (§4.4). Implementations own the reader handles
/// and the IP cache; callers never see cache internals.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich_ip(&self, ip: IpAddr) -> IpEnriched;
}

/// WHOIS subprocess seam (§4.6). One call resolves the whole batch's unique
/// hostnames at once.
#[async_trait]
pub trait WhoisInvoker: Send + Sync {
    /// On success, returns the domain → record mapping. On failure, returns
    /// a single descriptive error string attached to every row lacking an
    /// entry.
    async fn lookup_batch(
        &self,
        domains: &[String],
        timeout: Duration,
    ) -> Result<std::collections::HashMap<String, serde_json::Value>, String>;
}
