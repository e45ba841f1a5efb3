//! Open/close and query the two optional MMDB readers (§4.4). Errors from
//! either reader are swallowed here: absent enrichment data is preferable to
//! failing an otherwise-successful row.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::geoip2;
use netenrich_application::Enricher;
use netenrich_domain::errors::maxminddb_error;
use netenrich_domain::{AsnInfo, DomainError, GeoInfo, IpEnriched};
use tracing::warn;

use crate::cache::IpEnrichmentCache;

/// Holds the two optional, independent MMDB reader handles. Either may be
/// absent; callers must not conflate "reader missing" with "reader present
/// but lookup failed" (spec Design Notes).
pub struct GeoIpReaders {
    city: Option<maxminddb::Reader<Vec<u8>>>,
    asn: Option<maxminddb::Reader<Vec<u8>>>,
}

impl GeoIpReaders {
    /// Opens the city database (if configured) then the ASN database (if
    /// configured). On any failure, already-open readers are dropped and
    /// the error surfaces as batch-fatal.
    pub fn open(
        city_db_path: Option<&str>,
        asn_db_path: Option<&str>,
    ) -> Result<Self, DomainError> {
        let city = match city_db_path {
            Some(path) => Some(maxminddb::Reader::open_readfile(path).map_err(|e| {
                DomainError::CityDbOpen {
                    path: path.to_string(),
                    source: maxminddb_error::Error(e.to_string()),
                }
            })?),
            None => None,
        };

        let asn = match asn_db_path {
            Some(path) => match maxminddb::Reader::open_readfile(path) {
                Ok(reader) => Some(reader),
                Err(e) => {
                    // `city` (if any) is dropped here on the error path.
                    return Err(DomainError::AsnDbOpen {
                        path: path.to_string(),
                        source: maxminddb_error::Error(e.to_string()),
                    });
                }
            },
            None => None,
        };

        Ok(Self { city, asn })
    }

    fn query_city(&self, ip: IpAddr) -> Option<GeoInfo> {
        let reader = self.city.as_ref()?;
        let record: geoip2::City = match reader.lookup(ip) {
            Ok(record) => record,
            Err(e) => {
                warn!(%ip, error = %e, "GeoIP city lookup failed");
                return None;
            }
        };

        let country_iso = record.country.as_ref().and_then(|c| c.iso_code).map(str::to_string);
        let country_name = record
            .country
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string());
        let region = record
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| sub.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string());
        let city = record
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|s| s.to_string());
        let latitude = record.location.as_ref().and_then(|loc| loc.latitude);
        let longitude = record.location.as_ref().and_then(|loc| loc.longitude);

        let geo = GeoInfo {
            country_iso,
            country_name,
            region,
            city,
            latitude,
            longitude,
        };
        if geo.is_empty() {
            None
        } else {
            Some(geo)
        }
    }

    fn query_asn(&self, ip: IpAddr) -> Option<AsnInfo> {
        let reader = self.asn.as_ref()?;
        let record: geoip2::Asn = match reader.lookup(ip) {
            Ok(record) => record,
            Err(e) => {
                warn!(%ip, error = %e, "GeoIP ASN lookup failed");
                return None;
            }
        };

        let asn = AsnInfo {
            number: record.autonomous_system_number,
            organization: record.autonomous_system_organization.map(|s| s.to_string()),
        };
        if asn.is_empty() {
            None
        } else {
            Some(asn)
        }
    }
}

/// Cache-backed `Enricher`: on miss, queries both readers concurrently-safe
/// (MMDB reads are lock-free for concurrent readers) and stores the result;
/// on hit, returns the cached record without touching either reader.
pub struct CachedGeoIpEnricher {
    readers: Arc<GeoIpReaders>,
    cache: Arc<IpEnrichmentCache>,
}

impl CachedGeoIpEnricher {
    pub fn new(readers: Arc<GeoIpReaders>, cache: Arc<IpEnrichmentCache>) -> Self {
        Self { readers, cache }
    }
}

#[async_trait]
impl Enricher for CachedGeoIpEnricher {
    async fn enrich_ip(&self, ip: IpAddr) -> IpEnriched {
        let key = ip.to_string();
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let mut enriched = IpEnriched::bare(ip);
        enriched.geo = self.readers.query_city(ip);
        enriched.asn = self.readers.query_asn(ip);

        self.cache.insert(key, enriched.clone());
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_configured_databases_yields_no_geo_no_asn() {
        let readers = GeoIpReaders::open(None, None).unwrap();
        assert!(readers.query_city("1.2.3.4".parse().unwrap()).is_none());
        assert!(readers.query_asn("1.2.3.4".parse().unwrap()).is_none());
    }

    #[tokio::test]
    async fn enricher_caches_bare_ip_when_no_databases_configured() {
        let readers = Arc::new(GeoIpReaders::open(None, None).unwrap());
        let cache = Arc::new(IpEnrichmentCache::new(10, std::time::Duration::from_secs(60)));
        let enricher = CachedGeoIpEnricher::new(readers, cache.clone());

        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        let first = enricher.enrich_ip(ip).await;
        assert!(first.geo.is_none());
        assert!(first.asn.is_none());
        assert!(cache.get("1.2.3.4").is_some());
    }
}
