//! WHOIS/RDAP subprocess invocation (§4.6). Path validation happens before
//! any execution and is the security boundary of this module: an attacker
//! controlling `Config.whois.tool_path` must not be able to turn this into
//! arbitrary command execution.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use netenrich_application::WhoisInvoker;
use netenrich_domain::DomainError;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const INTERPRETER_ALLOWLIST: &[&str] = &[
    "python3",
    "python",
    "/usr/bin/python3",
    "/usr/bin/python",
    "/usr/local/bin/python3",
    "/usr/local/bin/python",
];

const BANNER_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// A validated, ready-to-invoke WHOIS helper.
pub struct WhoisCli {
    interpreter_path: String,
    tool_path: String,
}

impl WhoisCli {
    /// Validates the interpreter and tool paths per §4.6 before returning a
    /// usable invoker. Never call `lookup_batch`/`private_suffix_list` with
    /// an unvalidated instance — this constructor is the only entry point.
    pub async fn validate(
        interpreter_path: &str,
        tool_path: &str,
    ) -> Result<Self, DomainError> {
        Self::validate_interpreter(interpreter_path).await?;
        Self::validate_tool(tool_path)?;
        Ok(Self {
            interpreter_path: interpreter_path.to_string(),
            tool_path: tool_path.to_string(),
        })
    }

    async fn validate_interpreter(interpreter_path: &str) -> Result<(), DomainError> {
        if INTERPRETER_ALLOWLIST.contains(&interpreter_path) {
            return Ok(());
        }

        let path = Path::new(interpreter_path);
        if !path.is_absolute() {
            return Err(DomainError::WhoisPathInvalid(format!(
                "interpreter '{interpreter_path}' is neither allowlisted nor absolute"
            )));
        }
        let metadata = std::fs::metadata(path).map_err(|_| {
            DomainError::WhoisPathInvalid(format!(
                "interpreter '{interpreter_path}' does not exist"
            ))
        })?;
        if metadata.is_dir() {
            return Err(DomainError::WhoisPathInvalid(format!(
                "interpreter '{interpreter_path}' is a directory"
            )));
        }

        let output = timeout(
            BANNER_CHECK_TIMEOUT,
            Command::new(interpreter_path)
                .arg("--version")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| {
            DomainError::WhoisPathInvalid(format!(
                "interpreter '{interpreter_path}' did not respond to --version in time"
            ))
        })?
        .map_err(|e| {
            DomainError::WhoisPathInvalid(format!(
                "failed to execute interpreter '{interpreter_path}': {e}"
            ))
        })?;

        let banner = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
        .to_lowercase();
        if !banner.contains("python") {
            return Err(DomainError::WhoisPathInvalid(format!(
                "interpreter '{interpreter_path}' did not print a python banner"
            )));
        }
        Ok(())
    }

    fn validate_tool(tool_path: &str) -> Result<(), DomainError> {
        if tool_path.is_empty() {
            return Err(DomainError::WhoisPathInvalid("tool path is empty".into()));
        }
        if !tool_path.contains(std::path::MAIN_SEPARATOR) && !tool_path.contains('/') {
            return Err(DomainError::WhoisPathInvalid(format!(
                "tool path '{tool_path}' must contain a path separator"
            )));
        }
        if !tool_path.ends_with(".py") {
            return Err(DomainError::WhoisPathInvalid(format!(
                "tool path '{tool_path}' must end in .py"
            )));
        }
        let metadata = std::fs::metadata(tool_path).map_err(|_| {
            DomainError::WhoisPathInvalid(format!("tool path '{tool_path}' does not exist"))
        })?;
        if !metadata.is_file() {
            return Err(DomainError::WhoisPathInvalid(format!(
                "tool path '{tool_path}' is not a regular file"
            )));
        }
        Ok(())
    }

    async fn run(&self, args: &[String], timeout_budget: Duration) -> Result<String, String> {
        let mut child = Command::new(&self.interpreter_path)
            .arg(&self.tool_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn whois helper: {e}"))?;

        let output = match timeout(timeout_budget, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| format!("whois helper I/O error: {e}"))?,
            Err(_) => {
                return Err("whois helper timed out".to_string());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if stdout.trim().is_empty() && !stderr.trim().is_empty() {
            return Err(format!("whois helper produced no output: {stderr}"));
        }
        if stdout.trim().is_empty() {
            return Err("whois helper produced no output".to_string());
        }
        Ok(stdout)
    }
}

#[async_trait]
impl WhoisInvoker for WhoisCli {
    async fn lookup_batch(
        &self,
        domains: &[String],
        timeout_budget: Duration,
    ) -> Result<HashMap<String, serde_json::Value>, String> {
        let joined = domains.join(",");
        let seconds = timeout_budget.as_secs().max(1).to_string();
        let args = vec![
            "--list".to_string(),
            joined,
            "--timeout".to_string(),
            seconds,
        ];

        let stdout = self.run(&args, timeout_budget).await?;
        let records: Vec<serde_json::Value> = match serde_json::from_str(&stdout) {
            Ok(records) => records,
            Err(e) => return Err(format!("failed to parse whois output: {e}")),
        };

        let mut map = HashMap::new();
        for record in records {
            let domain = record
                .get("domain")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if domain.is_empty() {
                continue;
            }
            map.insert(domain.to_string(), record);
        }
        debug!(count = map.len(), "whois batch lookup parsed");
        Ok(map)
    }
}

/// A private-suffix-list entry, e.g. `{"suffix":"duckdns.org","owner":"Duck DNS"}`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PrivateSuffixEntry {
    pub suffix: String,
    pub owner: String,
}

impl WhoisCli {
    /// Fetches the PSL "private" section via the same subprocess helper
    /// (§4.6 second entry point).
    pub async fn private_suffix_list(
        &self,
        timeout_budget: Duration,
    ) -> Result<Vec<PrivateSuffixEntry>, String> {
        let seconds = timeout_budget.as_secs().max(1).to_string();
        let args = vec![
            "--psl-private-list".to_string(),
            "--timeout".to_string(),
            seconds,
        ];
        let stdout = self.run(&args, timeout_budget).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            warn!(error = %e, "failed to parse private suffix list");
            format!("failed to parse private suffix list: {e}")
        })
    }
}
