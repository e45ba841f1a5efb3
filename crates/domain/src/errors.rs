use thiserror::Error;

/// The closed, observable error taxonomy a per-row lookup failure is
/// classified into. Every variant's `Display` output is part of the wire
/// contract (spec §7) and must never change.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupErrorKind {
    #[error("timeout")]
    Timeout,

    #[error("nxdomain")]
    NxDomain,

    #[error("servfail")]
    ServFail,

    #[error("refused")]
    Refused,

    #[error("no_records")]
    NoRecords,

    #[error("lookup_failed")]
    LookupFailed,
}

/// Batch-fatal errors: configuration invalid, or a required reader/resource
/// could not be opened before the batch starts. Never raised per-row.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open GeoIP city database at {path}: {source}")]
    CityDbOpen {
        path: String,
        #[source]
        source: maxminddb_error::Error,
    },

    #[error("failed to open GeoIP ASN database at {path}: {source}")]
    AsnDbOpen {
        path: String,
        #[source]
        source: maxminddb_error::Error,
    },

    #[error("whois path validation failed: {0}")]
    WhoisPathInvalid(String),
}

/// Local shim so `netenrich-domain` does not need a direct dependency on
/// `maxminddb` just to name its error type in `DomainError`. Infrastructure
/// converts real `maxminddb::MaxMindDbError` values into this via `From`.
pub mod maxminddb_error {
    use std::fmt;

    #[derive(Debug)]
    pub struct Error(pub String);

    impl fmt::Display for Error {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for Error {}
}

/// Errors raised while loading/validating a `Config`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no upstream DNS servers configured")]
    NoUpstreamServers,

    #[error("invalid upstream server address '{0}'")]
    InvalidUpstreamAddress(String),

    #[error("whois is enabled but no tool path was configured")]
    WhoisEnabledWithoutTool,

    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config line {line_no}: '{line}'")]
    MalformedLine { line_no: usize, line: String },
}
