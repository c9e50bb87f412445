//! Process configuration: CLI flags with environment fallbacks.
//! Everything is fixed at startup; there is no hot-reload.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9001;
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8443";
pub const DEFAULT_NAMESPACE: &str = "upstat";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the exposition endpoint listens on.
    pub port: u16,
    /// Base URL of the monitored application, without a trailing slash.
    pub upstream_url: String,
    /// Prefix for every exported metric name.
    pub namespace: String,
    /// Per-request timeout for upstream calls.
    pub timeout: Duration,
}

impl Config {
    pub fn load() -> Self {
        Self::from_args(std::env::args())
    }

    /// Flags win over environment variables; both fall back to defaults.
    /// Accepts `--flag value`, `-f value`, and `--flag=value` forms.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut it = args.into_iter();
        let _ = it.next(); // program name

        let mut port = env_var("UPSTAT_PORT");
        let mut upstream = env_var("UPSTAT_UPSTREAM_URL");
        let mut namespace = env_var("UPSTAT_NAMESPACE");

        while let Some(a) = it.next() {
            match a.as_str() {
                "--port" | "-p" => port = it.next(),
                "--upstream" | "-u" => upstream = it.next(),
                "--namespace" | "-n" => namespace = it.next(),
                _ if a.starts_with("--port=") => port = split_value(&a),
                _ if a.starts_with("--upstream=") => upstream = split_value(&a),
                _ if a.starts_with("--namespace=") => namespace = split_value(&a),
                _ => {}
            }
        }

        let timeout_secs = env_var("UPSTAT_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Config {
            port: port.and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_PORT),
            upstream_url: upstream
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            namespace: namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn split_value(arg: &str) -> Option<String> {
    arg.split_once('=').map(|(_, v)| v.to_string())
}
