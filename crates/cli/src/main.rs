//! Bulk DNS resolution & IP-enrichment engine — command-line entry point.
//!
//! Reads hostnames/IP literals (positional arguments, or one per line from
//! stdin when none are given), resolves and enriches them concurrently, and
//! prints one JSON object per input to stdout.

use std::io::{self, BufRead, IsTerminal};
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use netenrich_application::BatchCollaborators;
use netenrich_domain::{CliOverrides, Config};
use netenrich_infrastructure::{
    CachedGeoIpEnricher, GeoIpReaders, IpEnrichmentCache, Quad9Probe, RoundRobinResolver, WhoisCli,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "netenrich")]
#[command(version)]
#[command(about = "Bulk DNS resolution and IP-enrichment engine")]
struct Cli {
    /// Hostnames or IP literals to resolve. Reads stdin (one per line) when omitted.
    inputs: Vec<String>,

    /// Path to a key=value configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Comma-separated upstream DNS servers (host:port).
    #[arg(long)]
    servers: Option<String>,

    /// Per-host lookup timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum number of concurrent lookups.
    #[arg(long)]
    parallelism: Option<usize>,

    /// Suppress AAAA queries and drop v6 addresses from output.
    #[arg(long)]
    no_ipv6: bool,

    /// Probe a secondary threat-intel resolver for resolved domains.
    #[arg(long)]
    check_malicious: bool,

    /// Path to a GeoIP2 City MMDB file.
    #[arg(long)]
    city_db: Option<String>,

    /// Path to a GeoIP2 ASN MMDB file.
    #[arg(long)]
    asn_db: Option<String>,

    /// Path to a WHOIS helper script (enables WHOIS enrichment).
    #[arg(long)]
    whois_tool: Option<String>,

    /// Interpreter used to invoke the WHOIS helper.
    #[arg(long, default_value = "python3")]
    whois_interpreter: String,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn read_stdin_inputs() -> Vec<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Vec::new();
    }
    stdin
        .lock()
        .lines()
        .map_while(Result::ok)
        .filter(|line| !line.trim().is_empty())
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let overrides = CliOverrides {
        upstream_servers: cli
            .servers
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect()),
        timeout_ms: cli.timeout_ms,
        parallelism: cli.parallelism,
        prefer_ipv6: if cli.no_ipv6 { Some(false) } else { None },
        check_malicious: if cli.check_malicious { Some(true) } else { None },
        whois_tool_path: cli.whois_tool,
        whois_interpreter_path: Some(cli.whois_interpreter),
        city_db_path: cli.city_db,
        asn_db_path: cli.asn_db,
    };

    let mut config = Config::load(cli.config.as_deref(), overrides)?;
    config.validate()?;

    info!(
        servers = ?config.upstream_servers,
        parallelism = config.parallelism,
        prefer_ipv6 = config.prefer_ipv6,
        check_malicious = config.check_malicious,
        whois_enabled = config.whois.enabled,
        "configuration loaded"
    );

    let inputs = if cli.inputs.is_empty() {
        read_stdin_inputs()
    } else {
        cli.inputs
    };

    let readers = Arc::new(GeoIpReaders::open(
        config.city_db_path.as_deref(),
        config.asn_db_path.as_deref(),
    )?);
    let cache = Arc::new(IpEnrichmentCache::new(
        config.cache_capacity,
        config.cache_ttl,
    ));
    let enricher = Arc::new(CachedGeoIpEnricher::new(readers, cache));

    let servers: Vec<SocketAddr> = config
        .upstream_servers
        .iter()
        .map(|s| s.parse())
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow::anyhow!("invalid upstream server address: {e}"))?;
    let resolver = Arc::new(RoundRobinResolver::new(servers));
    let probe = Arc::new(Quad9Probe::default());

    let whois: Option<Arc<dyn netenrich_application::WhoisInvoker>> = if config.whois.enabled {
        match WhoisCli::validate(&config.whois.interpreter_path, &config.whois.tool_path).await {
            Ok(cli) => Some(Arc::new(cli)),
            Err(e) => {
                error!(error = %e, "whois path validation failed");
                return Err(e.into());
            }
        }
    } else {
        None
    };

    let collaborators = BatchCollaborators {
        resolver,
        probe,
        enricher,
        whois,
    };

    let results =
        netenrich_application::resolve_and_enrich_batch(&collaborators, inputs, &config).await;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
