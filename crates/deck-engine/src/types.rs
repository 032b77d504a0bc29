//! Container records and host configuration.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Name of the default host when none is configured.
pub const LOCAL_HOST_NAME: &str = "local";

/// One container as listed by an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container ID.
    pub id: String,
    /// Container names, each with a leading `/`.
    pub names: Vec<String>,
    /// Image reference.
    pub image: String,
    /// Image ID.
    pub image_id: String,
    /// Command line.
    pub command: String,
    /// Creation time, Unix seconds.
    pub created: i64,
    /// Short state (`running`, `exited`, ...).
    pub state: String,
    /// Human readable status.
    pub status: String,
    /// Labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Name of the host the container was listed from.
    #[serde(default)]
    pub host: String,
}

impl ContainerInfo {
    /// Returns true if the container is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Read-only details of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Container ID.
    pub id: String,
    /// Name without the leading `/`.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Short state (`running`, `exited`, ...).
    pub state: String,
    /// Creation time as reported by the engine.
    pub created: Option<String>,
    /// Number of restarts.
    pub restart_count: i64,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Name of the host the container lives on.
    #[serde(default)]
    pub host: String,
}

/// A named engine endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Unique host name used in requests.
    pub name: String,
    /// Endpoint URL, or `local` for the platform default.
    pub host: String,
}

impl HostConfig {
    /// Creates a host entry.
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
        }
    }

    /// The platform default engine, named `local`.
    #[must_use]
    pub fn local() -> Self {
        Self::new(LOCAL_HOST_NAME, LOCAL_HOST_NAME)
    }

    /// Parses a `name=url` entry.
    pub fn parse(entry: &str) -> EngineResult<Self> {
        let invalid = |reason: &str| EngineError::InvalidHostConfig {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (name, host) = entry
            .split_once('=')
            .ok_or_else(|| invalid("expected name=url"))?;
        let (name, host) = (name.trim(), host.trim());
        if name.is_empty() {
            return Err(invalid("host name is empty"));
        }
        if name.contains(':') {
            return Err(invalid("host name must not contain ':'"));
        }
        if host.is_empty() {
            return Err(invalid("host url is empty"));
        }
        Ok(Self::new(name, host))
    }

    /// Parses a comma-separated list of `name=url` entries.
    ///
    /// Empty entries are skipped; names must be unique.
    pub fn parse_list(list: &str) -> EngineResult<Vec<Self>> {
        let hosts = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::parse)
            .collect::<EngineResult<Vec<_>>>()?;
        ensure_unique(&hosts)?;
        Ok(hosts)
    }

    /// Classifies the endpoint URL.
    pub fn endpoint(&self) -> EngineResult<Endpoint> {
        Endpoint::parse(&self.host)
    }
}

impl fmt::Display for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.host)
    }
}

/// Checks that host names do not repeat.
pub fn ensure_unique(hosts: &[HostConfig]) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for host in hosts {
        if !seen.insert(host.name.as_str()) {
            return Err(EngineError::InvalidHostConfig {
                entry: host.to_string(),
                reason: format!("duplicate host name {:?}", host.name),
            });
        }
    }
    Ok(())
}

/// How to reach an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The platform default socket.
    Local,
    /// A Unix socket path.
    Unix(String),
    /// Plain HTTP, `tcp://` or `http://`.
    Http(String),
}

impl Endpoint {
    /// Parses an endpoint URL.
    pub fn parse(url: &str) -> EngineResult<Self> {
        if url.is_empty() || url == LOCAL_HOST_NAME {
            return Ok(Self::Local);
        }
        if let Some(path) = url.strip_prefix("unix://") {
            return Ok(Self::Unix(path.to_string()));
        }
        if url.starts_with("tcp://") || url.starts_with("http://") {
            return Ok(Self::Http(url.to_string()));
        }

        let reason = match url.split_once("://") {
            Some(("ssh", _)) => "ssh transport is not available".to_string(),
            Some(("https", _)) => "TLS endpoints are not available".to_string(),
            Some((scheme, _)) => format!("unknown scheme {scheme:?}"),
            None => "expected unix://, tcp:// or http://".to_string(),
        };
        Err(EngineError::UnsupportedHost {
            endpoint: url.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn container_info_json() {
        let info = ContainerInfo {
            id: "abc".to_string(),
            names: vec!["/web".to_string()],
            image: "nginx:1.25".to_string(),
            image_id: "sha256:1".to_string(),
            command: "nginx -g".to_string(),
            created: 1_700_000_000,
            state: "running".to_string(),
            status: "Up 2 hours".to_string(),
            labels: BTreeMap::new(),
            host: "local".to_string(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["image_id"], "sha256:1");
        assert_eq!(value["created"], 1_700_000_000);
        assert!(value.get("labels").is_none());
        assert!(info.is_running());
    }

    #[test]
    fn parse_host_entry() {
        let host = HostConfig::parse(" edge = tcp://10.0.0.5:2375 ").unwrap();
        assert_eq!(host.name, "edge");
        assert_eq!(host.host, "tcp://10.0.0.5:2375");
        assert_eq!(host.to_string(), "edge=tcp://10.0.0.5:2375");
    }

    #[test_case("no-separator" ; "missing equals")]
    #[test_case("=tcp://x:1" ; "empty name")]
    #[test_case("edge=" ; "empty url")]
    #[test_case("a:b=tcp://x:1" ; "colon in name")]
    fn parse_rejects_entry(entry: &str) {
        assert!(matches!(
            HostConfig::parse(entry),
            Err(EngineError::InvalidHostConfig { .. })
        ));
    }

    #[test]
    fn parse_list_skips_blanks() {
        let hosts = HostConfig::parse_list("local=local, ,edge=tcp://edge:2375,").unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].name, "edge");
    }

    #[test]
    fn parse_list_rejects_duplicates() {
        let err = HostConfig::parse_list("a=local,a=tcp://x:1").unwrap_err();
        assert!(err.to_string().contains("duplicate host name"));
    }

    #[test_case("local", Endpoint::Local ; "local keyword")]
    #[test_case("", Endpoint::Local ; "empty")]
    #[test_case("unix:///var/run/docker.sock", Endpoint::Unix("/var/run/docker.sock".into()) ; "unix")]
    #[test_case("tcp://10.0.0.5:2375", Endpoint::Http("tcp://10.0.0.5:2375".into()) ; "tcp")]
    #[test_case("http://edge:2375", Endpoint::Http("http://edge:2375".into()) ; "http")]
    fn endpoint_parses(url: &str, expected: Endpoint) {
        assert_eq!(Endpoint::parse(url).unwrap(), expected);
    }

    #[test_case("ssh://user@box" ; "ssh")]
    #[test_case("https://edge:2376" ; "https")]
    #[test_case("npipe:////./pipe/docker" ; "named pipe")]
    #[test_case("edge:2375" ; "no scheme")]
    fn endpoint_rejects(url: &str) {
        assert!(matches!(
            Endpoint::parse(url),
            Err(EngineError::UnsupportedHost { .. })
        ));
    }
}
