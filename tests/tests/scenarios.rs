//! End-to-end scenarios composing the real batch orchestrator with stubbed
//! network-facing collaborators, one test per scenario.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use netenrich_application::{
    resolve_and_enrich_batch, BatchCollaborators, Enricher, ResolveError, ResolvedAnswer,
    Resolver, ThreatIntelProbe,
};
use netenrich_domain::{Config, IpEnriched};

struct ScriptedResolver {
    answers: Mutex<HashMap<String, Result<ResolvedAnswer, ResolveError>>>,
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(
        &self,
        hostname: &str,
        _prefer_ipv6: bool,
    ) -> Result<ResolvedAnswer, ResolveError> {
        self.answers
            .lock()
            .unwrap()
            .get(hostname)
            .cloned()
            .unwrap_or(Err(ResolveError::Other("no stub registered".into())))
    }
}

struct SlowResolver {
    delay: Duration,
    addresses: Vec<IpAddr>,
}

#[async_trait]
impl Resolver for SlowResolver {
    async fn resolve(
        &self,
        _hostname: &str,
        _prefer_ipv6: bool,
    ) -> Result<ResolvedAnswer, ResolveError> {
        tokio::time::sleep(self.delay).await;
        Ok(ResolvedAnswer {
            addresses: self.addresses.clone(),
            server: "8.8.8.8:53".to_string(),
        })
    }
}

struct ScriptedProbe {
    blocked: bool,
}

#[async_trait]
impl ThreatIntelProbe for ScriptedProbe {
    async fn check_malicious_domain(
        &self,
        _domain: &str,
        primary_resolved: bool,
        _timeout: Duration,
    ) -> bool {
        primary_resolved && self.blocked
    }
}

struct BareEnricher;

#[async_trait]
impl Enricher for BareEnricher {
    async fn enrich_ip(&self, ip: IpAddr) -> IpEnriched {
        IpEnriched::bare(ip)
    }
}

fn collaborators(resolver: impl Resolver + 'static, blocked: bool) -> BatchCollaborators {
    BatchCollaborators {
        resolver: std::sync::Arc::new(resolver),
        probe: std::sync::Arc::new(ScriptedProbe { blocked }),
        enricher: std::sync::Arc::new(BareEnricher),
        whois: None,
    }
}

fn answer(ips: &[&str], server: &str) -> Result<ResolvedAnswer, ResolveError> {
    Ok(ResolvedAnswer {
        addresses: ips.iter().map(|s| s.parse().unwrap()).collect(),
        server: server.to_string(),
    })
}

#[tokio::test]
async fn scenario_mixed_inputs_geoip_off_ipv6_on() {
    let mut answers = HashMap::new();
    answers.insert(
        "example.com".to_string(),
        answer(&["93.184.216.34"], "8.8.8.8:53"),
    );
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let cfg = Config::default();
    let results = resolve_and_enrich_batch(
        &collab,
        vec!["example.com".to_string(), "8.8.8.8".to_string()],
        &cfg,
    )
    .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].resolved);
    assert_eq!(results[0].dns_server.as_deref(), Some("8.8.8.8:53"));
    assert_eq!(results[0].ips.len(), 1);
    assert_eq!(results[0].ips[0].ip, "93.184.216.34");

    assert!(results[1].resolved);
    assert_eq!(results[1].domain, "8.8.8.8");
    assert!(results[1].dns_server.is_none());
    assert_eq!(results[1].ips.len(), 1);
}

#[tokio::test]
async fn scenario_nxdomain() {
    let mut answers = HashMap::new();
    answers.insert(
        "nxdomain.invalid".to_string(),
        Err(ResolveError::Other("no such host".to_string())),
    );
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let cfg = Config::default();
    let results =
        resolve_and_enrich_batch(&collab, vec!["nxdomain.invalid".to_string()], &cfg).await;
    assert!(!results[0].resolved);
    assert_eq!(results[0].error.as_deref(), Some("nxdomain"));
    assert!(results[0].ips.is_empty());
}

#[tokio::test]
async fn scenario_no_records() {
    let mut answers = HashMap::new();
    answers.insert("empty.example".to_string(), answer(&[], "8.8.8.8:53"));
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let cfg = Config::default();
    let results =
        resolve_and_enrich_batch(&collab, vec!["empty.example".to_string()], &cfg).await;
    assert!(!results[0].resolved);
    assert_eq!(results[0].error.as_deref(), Some("no_records"));
}

#[tokio::test]
async fn scenario_timeout() {
    let collab = collaborators(
        SlowResolver {
            delay: Duration::from_millis(50),
            addresses: vec!["1.2.3.4".parse().unwrap()],
        },
        false,
    );
    let mut cfg = Config::default();
    cfg.timeout = Duration::from_millis(1);
    let results =
        resolve_and_enrich_batch(&collab, vec!["slow.example".to_string()], &cfg).await;
    assert!(!results[0].resolved);
    assert_eq!(results[0].error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn scenario_threat_intel_blocked() {
    let mut answers = HashMap::new();
    answers.insert("blocked.test".to_string(), answer(&["1.2.3.4"], "8.8.8.8:53"));
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        true,
    );
    let mut cfg = Config::default();
    cfg.check_malicious = true;
    let results = resolve_and_enrich_batch(&collab, vec!["blocked.test".to_string()], &cfg).await;
    assert!(results[0].resolved);
    assert_eq!(results[0].malicious, Some(true));
    assert_eq!(results[0].ips.len(), 1);
}

#[tokio::test]
async fn scenario_threat_intel_clean() {
    let mut answers = HashMap::new();
    answers.insert("good.test".to_string(), answer(&["1.2.3.4"], "8.8.8.8:53"));
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let mut cfg = Config::default();
    cfg.check_malicious = true;
    let results = resolve_and_enrich_batch(&collab, vec!["good.test".to_string()], &cfg).await;
    assert!(results[0].resolved);
    assert_eq!(results[0].malicious, Some(false));
}

#[tokio::test]
async fn scenario_dedup_and_v6_suppression() {
    let mut answers = HashMap::new();
    answers.insert(
        "dual.test".to_string(),
        answer(&["1.2.3.4", "::1", "1.2.3.4"], "8.8.8.8:53"),
    );
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let mut cfg = Config::default();
    cfg.prefer_ipv6 = false;
    let results = resolve_and_enrich_batch(&collab, vec!["dual.test".to_string()], &cfg).await;
    assert_eq!(results[0].ips.len(), 1);
    assert_eq!(results[0].ips[0].ip, "1.2.3.4");
    assert_eq!(results[0].ips[0].family, netenrich_domain::Family::V4);
}

#[tokio::test]
async fn boundary_empty_input_sequence() {
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(HashMap::new()),
        },
        false,
    );
    let cfg = Config::default();
    let results = resolve_and_enrich_batch(&collab, Vec::new(), &cfg).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn boundary_whitespace_and_lone_dot_inputs() {
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(HashMap::new()),
        },
        false,
    );
    let cfg = Config::default();
    let results = resolve_and_enrich_batch(
        &collab,
        vec!["   ".to_string(), ".".to_string(), "\t\n".to_string()],
        &cfg,
    )
    .await;
    assert_eq!(results.len(), 3);
    for row in &results {
        assert_eq!(row.domain, "");
        assert!(!row.resolved);
        assert_eq!(row.error.as_deref(), Some("lookup_failed"));
        assert!(row.ips.is_empty());
    }
}

#[tokio::test]
async fn boundary_non_positive_timeout_and_parallelism_clamp_to_defaults() {
    let mut answers = HashMap::new();
    answers.insert("host.test".to_string(), answer(&["1.2.3.4"], "8.8.8.8:53"));
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let mut cfg = Config::default();
    cfg.timeout = Duration::from_secs(0);
    cfg.parallelism = 0;
    let results = resolve_and_enrich_batch(&collab, vec!["host.test".to_string()], &cfg).await;
    assert!(results[0].resolved);
}

#[tokio::test]
async fn output_order_matches_input_order_under_bounded_parallelism() {
    let mut answers = HashMap::new();
    for i in 0..50 {
        answers.insert(format!("host{i}.test"), answer(&["1.2.3.4"], "8.8.8.8:53"));
    }
    let collab = collaborators(
        ScriptedResolver {
            answers: Mutex::new(answers),
        },
        false,
    );
    let mut cfg = Config::default();
    cfg.parallelism = 3;
    let inputs: Vec<String> = (0..50).map(|i| format!("host{i}.test")).collect();
    let results = resolve_and_enrich_batch(&collab, inputs.clone(), &cfg).await;
    assert_eq!(results.len(), inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        assert_eq!(&results[i].domain, input);
    }
}
