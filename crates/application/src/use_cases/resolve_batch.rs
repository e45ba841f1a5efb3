use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use netenrich_domain::{config, Config, HostResult, LookupErrorKind};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::ports::{Enricher, ResolveError, Resolver, ThreatIntelProbe, WhoisInvoker};

const WHOIS_MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// The collaborators a batch run needs, bundled so call sites don't thread
/// four `Arc`s through every function signature.
#[derive(Clone)]
pub struct BatchCollaborators {
    pub resolver: Arc<dyn Resolver>,
    pub probe: Arc<dyn ThreatIntelProbe>,
    pub enricher: Arc<dyn Enricher>,
    pub whois: Option<Arc<dyn WhoisInvoker>>,
}

/// Outcome of the once-per-batch WHOIS invocation (§4.6, §4.7 step 3).
enum WhoisOutcome {
    /// WHOIS disabled, or no non-IP hostnames in this batch.
    NotInvoked,
    Succeeded(HashMap<String, serde_json::Value>),
    Failed(String),
}

/// Strips surrounding whitespace and one trailing dot (spec §3).
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

/// Maps a transport/DNS error to the closed taxonomy, preferring the
/// structured variant from `ResolveError` and falling back to substring
/// matching only for the catch-all bucket (§4.2, REDESIGN FLAGS).
fn classify(err: &ResolveError) -> String {
    match err {
        ResolveError::Timeout => LookupErrorKind::Timeout.to_string(),
        ResolveError::Nxdomain => LookupErrorKind::NxDomain.to_string(),
        ResolveError::ServFail => LookupErrorKind::ServFail.to_string(),
        ResolveError::Refused => LookupErrorKind::Refused.to_string(),
        ResolveError::Other(msg) => classify_by_substring(msg),
    }
}

fn classify_by_substring(msg: &str) -> String {
    let lower = msg.to_lowercase();
    if lower.contains("no such host") {
        LookupErrorKind::NxDomain.to_string()
    } else if lower.contains("server misbehaving") {
        LookupErrorKind::ServFail.to_string()
    } else if lower.contains("refused") {
        LookupErrorKind::Refused.to_string()
    } else if lower.contains("i/o timeout") {
        LookupErrorKind::Timeout.to_string()
    } else {
        LookupErrorKind::LookupFailed.to_string()
    }
}

/// Runs the once-per-batch WHOIS invocation over the unique non-IP
/// hostnames (§4.6, §4.7 step 3).
async fn load_whois(
    collaborators: &BatchCollaborators,
    inputs: &[String],
    config: &Config,
) -> WhoisOutcome {
    if !config.whois.enabled || config.whois.tool_path.is_empty() {
        return WhoisOutcome::NotInvoked;
    }
    let Some(whois) = &collaborators.whois else {
        return WhoisOutcome::NotInvoked;
    };

    let mut seen = HashSet::new();
    let mut unique_hostnames = Vec::new();
    for raw in inputs {
        let normalized = normalize(raw);
        if normalized.is_empty() || IpAddr::from_str(&normalized).is_ok() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            unique_hostnames.push(normalized);
        }
    }
    if unique_hostnames.is_empty() {
        return WhoisOutcome::NotInvoked;
    }

    // The configured whois timeout doubles as the per-domain floor; there is
    // no separate floor constant to take a max against.
    let compound = config
        .whois
        .timeout
        .saturating_mul(unique_hostnames.len() as u32)
        .min(WHOIS_MAX_TIMEOUT);

    match whois.lookup_batch(&unique_hostnames, compound).await {
        Ok(map) => WhoisOutcome::Succeeded(map),
        Err(err) => WhoisOutcome::Failed(err),
    }
}

/// The batch orchestrator (§4.7): fans out bounded-parallelism work over
/// `inputs`, returning one `HostResult` per input in input order.
pub async fn resolve_and_enrich_batch(
    collaborators: &BatchCollaborators,
    inputs: Vec<String>,
    cfg: &Config,
) -> Vec<HostResult> {
    if inputs.is_empty() {
        return Vec::new();
    }

    let timeout = if cfg.timeout.is_zero() {
        config::DEFAULT_TIMEOUT
    } else {
        cfg.timeout
    };
    let parallelism = if cfg.parallelism == 0 {
        config::DEFAULT_PARALLELISM
    } else {
        cfg.parallelism
    };

    let whois_outcome = Arc::new(load_whois(collaborators, &inputs, cfg).await);
    let semaphore = Arc::new(Semaphore::new(parallelism));

    let mut handles = Vec::with_capacity(inputs.len());
    for (i, raw) in inputs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let resolver = Arc::clone(&collaborators.resolver);
        let probe = Arc::clone(&collaborators.probe);
        let enricher = Arc::clone(&collaborators.enricher);
        let whois_outcome = Arc::clone(&whois_outcome);
        let cfg = cfg.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed during a batch");
            let result = resolve_one(
                raw,
                resolver.as_ref(),
                probe.as_ref(),
                enricher.as_ref(),
                &whois_outcome,
                &cfg,
                timeout,
            )
            .await;
            (i, result)
        }));
    }

    let mut results: Vec<Option<HostResult>> = (0..handles.len()).map(|_| None).collect();
    for handle in handles {
        match handle.await {
            Ok((i, result)) => results[i] = Some(result),
            Err(join_err) => warn!(error = %join_err, "batch worker task panicked"),
        }
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or_else(HostResult::empty_lookup_failed))
        .collect()
}

async fn resolve_one(
    raw: String,
    resolver: &dyn Resolver,
    probe: &dyn ThreatIntelProbe,
    enricher: &dyn Enricher,
    whois_outcome: &WhoisOutcome,
    cfg: &Config,
    timeout: Duration,
) -> HostResult {
    let domain = normalize(&raw);

    if domain.is_empty() {
        return HostResult {
            domain,
            ..HostResult::empty_lookup_failed()
        };
    }

    if let Ok(ip) = IpAddr::from_str(&domain) {
        let enriched = enricher.enrich_ip(ip).await;
        return HostResult {
            domain,
            resolved: true,
            dns_server: None,
            malicious: None,
            ips: vec![enriched],
            whois: None,
            whois_error: None,
            error: None,
        };
    }

    let outcome = tokio::time::timeout(timeout, resolver.resolve(&domain, cfg.prefer_ipv6)).await;

    let (addresses, dns_server, mut error) = match outcome {
        Err(_elapsed) => (Vec::new(), None, Some(LookupErrorKind::Timeout.to_string())),
        Ok(Err(resolve_err)) => (Vec::new(), None, Some(classify(&resolve_err))),
        Ok(Ok(answer)) => (answer.addresses, Some(answer.server), None),
    };

    if error.is_none() && addresses.is_empty() {
        error = Some(LookupErrorKind::NoRecords.to_string());
    }
    let resolved = error.is_none();

    let malicious = if cfg.check_malicious && resolved {
        Some(
            probe
                .check_malicious_domain(&domain, resolved, cfg.timeout)
                .await,
        )
    } else {
        None
    };

    let mut seen = HashSet::new();
    let mut ips = Vec::new();
    for addr in addresses {
        if addr.is_ipv6() && !cfg.prefer_ipv6 {
            continue;
        }
        if seen.insert(addr.to_string()) {
            ips.push(enricher.enrich_ip(addr).await);
        }
    }

    let (whois, whois_error) = match whois_outcome {
        WhoisOutcome::NotInvoked => (None, None),
        WhoisOutcome::Succeeded(map) => match map.get(&domain) {
            Some(record) => (Some(record.clone()), None),
            None => (None, Some(String::new())),
        },
        WhoisOutcome::Failed(err) => (None, Some(err.clone())),
    };

    HostResult {
        domain,
        resolved,
        dns_server,
        malicious,
        ips,
        whois,
        whois_error,
        error,
    }
}
