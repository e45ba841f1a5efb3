use std::time::Duration;

use crate::errors::ConfigError;

/// WHOIS/RDAP subprocess configuration (spec §3, §4.6).
#[derive(Debug, Clone)]
pub struct WhoisConfig {
    pub enabled: bool,
    pub tool_path: String,
    pub interpreter_path: String,
    pub timeout: Duration,
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tool_path: String::new(),
            interpreter_path: "python3".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Batch-wide, immutable-after-construction configuration (spec §3).
#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_servers: Vec<String>,
    pub timeout: Duration,
    pub parallelism: usize,
    pub prefer_ipv6: bool,
    pub check_malicious: bool,
    pub whois: WhoisConfig,
    pub city_db_path: Option<String>,
    pub asn_db_path: Option<String>,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PARALLELISM: usize = 64;
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_servers: vec!["8.8.8.8:53".to_string(), "8.8.4.4:53".to_string()],
            timeout: DEFAULT_TIMEOUT,
            parallelism: DEFAULT_PARALLELISM,
            prefer_ipv6: true,
            check_malicious: false,
            whois: WhoisConfig::default(),
            city_db_path: None,
            asn_db_path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Builder mirroring the teacher's `Config::builder()` convention.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Clamps non-positive timeout/parallelism to their defaults (spec §4.7
    /// step 1), then checks config-time-fatal invariants.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.parallelism == 0 {
            self.parallelism = DEFAULT_PARALLELISM;
        }
        if self.cache_capacity == 0 {
            self.cache_capacity = DEFAULT_CACHE_CAPACITY;
        }
        if self.cache_ttl.is_zero() {
            self.cache_ttl = DEFAULT_CACHE_TTL;
        }

        if self.upstream_servers.is_empty() {
            return Err(ConfigError::NoUpstreamServers);
        }
        for server in &self.upstream_servers {
            if server.to_socket_addrs_check().is_err() {
                return Err(ConfigError::InvalidUpstreamAddress(server.clone()));
            }
        }
        if self.whois.enabled && self.whois.tool_path.is_empty() {
            return Err(ConfigError::WhoisEnabledWithoutTool);
        }
        Ok(())
    }
}

impl ConfigBuilder {
    pub fn upstream_servers(mut self, servers: Vec<String>) -> Self {
        self.config.upstream_servers = servers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.config.parallelism = parallelism;
        self
    }

    pub fn prefer_ipv6(mut self, prefer: bool) -> Self {
        self.config.prefer_ipv6 = prefer;
        self
    }

    pub fn check_malicious(mut self, check: bool) -> Self {
        self.config.check_malicious = check;
        self
    }

    pub fn whois(mut self, whois: WhoisConfig) -> Self {
        self.config.whois = whois;
        self
    }

    pub fn city_db_path(mut self, path: Option<String>) -> Self {
        self.config.city_db_path = path;
        self
    }

    pub fn asn_db_path(mut self, path: Option<String>) -> Self {
        self.config.asn_db_path = path;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// CLI-supplied overrides applied on top of a loaded file, the way the
/// teacher's `Config::load(path, overrides)` layers flags over a parsed
/// config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub upstream_servers: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
    pub parallelism: Option<usize>,
    pub prefer_ipv6: Option<bool>,
    pub check_malicious: Option<bool>,
    pub whois_tool_path: Option<String>,
    pub whois_interpreter_path: Option<String>,
    pub city_db_path: Option<String>,
    pub asn_db_path: Option<String>,
}

impl Config {
    /// Loads a minimal `key=value` config file (one assignment per line,
    /// `#` comments, blank lines ignored), then applies `overrides` on top.
    /// `path == None` yields `Config::default()` plus overrides.
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::parse_file(path)?,
            None => Config::default(),
        };

        if let Some(servers) = overrides.upstream_servers {
            config.upstream_servers = servers;
        }
        if let Some(ms) = overrides.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(p) = overrides.parallelism {
            config.parallelism = p;
        }
        if let Some(v6) = overrides.prefer_ipv6 {
            config.prefer_ipv6 = v6;
        }
        if let Some(check) = overrides.check_malicious {
            config.check_malicious = check;
        }
        if let Some(tool) = overrides.whois_tool_path {
            config.whois.enabled = true;
            config.whois.tool_path = tool;
        }
        if let Some(interp) = overrides.whois_interpreter_path {
            config.whois.interpreter_path = interp;
        }
        if let Some(path) = overrides.city_db_path {
            config.city_db_path = Some(path);
        }
        if let Some(path) = overrides.asn_db_path {
            config.asn_db_path = Some(path);
        }

        Ok(config)
    }

    fn parse_file(path: &str) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            source: e,
        })?;

        let mut config = Config::default();
        for (line_no, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line_no: line_no + 1,
                    line: raw_line.to_string(),
                });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "upstream_servers" => {
                    config.upstream_servers =
                        value.split(',').map(|s| s.trim().to_string()).collect();
                }
                "timeout_ms" => {
                    let ms: u64 = value.parse().map_err(|_| ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    })?;
                    config.timeout = Duration::from_millis(ms);
                }
                "parallelism" => {
                    config.parallelism = value.parse().map_err(|_| ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    })?;
                }
                "prefer_ipv6" => {
                    config.prefer_ipv6 = value.parse().map_err(|_| ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    })?;
                }
                "check_malicious" => {
                    config.check_malicious =
                        value.parse().map_err(|_| ConfigError::MalformedLine {
                            line_no: line_no + 1,
                            line: raw_line.to_string(),
                        })?;
                }
                "whois_enabled" => {
                    config.whois.enabled = value.parse().map_err(|_| ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    })?;
                }
                "whois_tool_path" => config.whois.tool_path = value.to_string(),
                "whois_interpreter_path" => config.whois.interpreter_path = value.to_string(),
                "whois_timeout_ms" => {
                    let ms: u64 = value.parse().map_err(|_| ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    })?;
                    config.whois.timeout = Duration::from_millis(ms);
                }
                "city_db_path" => config.city_db_path = Some(value.to_string()),
                "asn_db_path" => config.asn_db_path = Some(value.to_string()),
                "cache_capacity" => {
                    config.cache_capacity =
                        value.parse().map_err(|_| ConfigError::MalformedLine {
                            line_no: line_no + 1,
                            line: raw_line.to_string(),
                        })?;
                }
                "cache_ttl_ms" => {
                    let ms: u64 = value.parse().map_err(|_| ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    })?;
                    config.cache_ttl = Duration::from_millis(ms);
                }
                _ => {
                    return Err(ConfigError::MalformedLine {
                        line_no: line_no + 1,
                        line: raw_line.to_string(),
                    });
                }
            }
        }
        Ok(config)
    }
}

/// Local helper trait so `Config::validate` can reject a malformed
/// `host:port` string without pulling a DNS resolution dependency into the
/// domain crate (validation is purely syntactic — it never dials).
trait SocketAddrSyntax {
    fn to_socket_addrs_check(&self) -> Result<(), ()>;
}

impl SocketAddrSyntax for String {
    fn to_socket_addrs_check(&self) -> Result<(), ()> {
        let (host, port) = self.rsplit_once(':').ok_or(())?;
        if host.is_empty() {
            return Err(());
        }
        port.parse::<u16>().map(|_| ()).map_err(|_| ())
    }
}
