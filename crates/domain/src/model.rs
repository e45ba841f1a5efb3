use serde::Serialize;

/// IP address family tag, serialized exactly as `v4`/`v6` (spec §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    V4,
    V6,
}

/// Geographic enrichment for one IP. Every field is omitted from the JSON
/// output when empty/zero, per spec §3.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GeoInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_iso: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeoInfo {
    pub fn is_empty(&self) -> bool {
        self.country_iso.is_none()
            && self.country_name.is_none()
            && self.region.is_none()
            && self.city.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}

/// Autonomous-system enrichment for one IP. Omitted from JSON when zero.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AsnInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl AsnInfo {
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.organization.is_none()
    }
}

/// One enriched IP address, as it appears in a `HostResult.ips` entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IpEnriched {
    pub ip: String,
    pub family: Family,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<AsnInfo>,
}

impl IpEnriched {
    pub fn bare(ip: std::net::IpAddr) -> Self {
        let family = match ip {
            std::net::IpAddr::V4(_) => Family::V4,
            std::net::IpAddr::V6(_) => Family::V6,
        };
        Self {
            ip: ip.to_string(),
            family,
            geo: None,
            asn: None,
        }
    }
}

/// The per-input result record (spec §3, §6).
#[derive(Debug, Clone, Serialize)]
pub struct HostResult {
    pub domain: String,
    pub resolved: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_server: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub malicious: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<IpEnriched>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostResult {
    /// The canonical empty/unresolvable row (spec §8 boundary behavior:
    /// whitespace-only or lone-dot input).
    pub fn empty_lookup_failed() -> Self {
        Self {
            domain: String::new(),
            resolved: false,
            dns_server: None,
            malicious: None,
            ips: Vec::new(),
            whois: None,
            whois_error: None,
            error: Some(crate::errors::LookupErrorKind::LookupFailed.to_string()),
        }
    }
}
